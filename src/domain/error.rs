//! Domain error types.

/// Top-level error type for steptrader.
#[derive(Debug, thiserror::Error)]
pub enum SteptraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{owner} references unknown {kind} '{name}'")]
    UnknownReference {
        owner: String,
        kind: &'static str,
        name: String,
    },

    #[error("{owner} expects a {expected} signal but '{name}' is a {found} signal")]
    ReferenceKind {
        owner: String,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SteptraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SteptraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        SteptraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&SteptraderError> for std::process::ExitCode {
    fn from(err: &SteptraderError) -> Self {
        let code: u8 = match err {
            SteptraderError::Io(_) | SteptraderError::Report { .. } => 1,
            SteptraderError::ConfigParse { .. }
            | SteptraderError::ConfigMissing { .. }
            | SteptraderError::ConfigInvalid { .. } => 2,
            SteptraderError::Data { .. } => 3,
            SteptraderError::UnknownReference { .. }
            | SteptraderError::ReferenceKind { .. }
            | SteptraderError::DuplicateName { .. } => 4,
            SteptraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reference_message_names_owner_and_target() {
        let err = SteptraderError::UnknownReference {
            owner: "signal 'momentum'".into(),
            kind: "feature",
            name: "ma50".into(),
        };
        assert_eq!(
            err.to_string(),
            "signal 'momentum' references unknown feature 'ma50'"
        );
    }

    #[test]
    fn config_invalid_helper() {
        let err = SteptraderError::invalid("backtest", "fee_rate", "must be non-negative");
        assert!(matches!(
            err,
            SteptraderError::ConfigInvalid { ref section, ref key, .. }
                if section == "backtest" && key == "fee_rate"
        ));
        assert_eq!(
            err.to_string(),
            "invalid config value [backtest] fee_rate: must be non-negative"
        );
    }
}
