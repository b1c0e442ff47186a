use serde::Serialize;

/// Messages produced while preparing a run that callers may want to show.
///
/// The engine also emits `tracing` events; feedback is the subset meant for
/// the person running the sync (the CLI prints it, library users may not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "message", rename_all = "lowercase")]
pub enum Feedback {
    Info(String),
    Warning(String),
}

impl Feedback {
    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info(msg.into())
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::Warning(msg.into())
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Info(msg) | Self::Warning(msg) => msg,
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info(msg) => write!(f, "{msg}"),
            Self::Warning(msg) => write!(f, "warning: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_warnings_only() {
        assert_eq!(Feedback::info("msg").to_string(), "msg");
        assert_eq!(Feedback::warning("msg").to_string(), "warning: msg");
        assert!(!Feedback::info("msg").is_warning());
    }

    #[test]
    fn serializes_with_level_tag() {
        let json = serde_json::to_value(Feedback::warning("careful")).unwrap();
        assert_eq!(json, serde_json::json!({ "level": "warning", "message": "careful" }));
    }
}
