//! Log categories understood by the backend's category filter.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Status;

/// Category attached to every log message the kernel emits.
///
/// The predefined categories use the names of the co-simulation standard;
/// anything else is carried verbatim as [`LogCategory::UserDefined`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogCategory {
    Events,
    SingularLinearSystems,
    NonlinearSystems,
    DynamicStateSelection,
    StatusWarning,
    StatusDiscard,
    StatusError,
    StatusFatal,
    BackendMessages,
    UserDefined(String),
}

impl LogCategory {
    pub fn as_str(&self) -> &str {
        match self {
            LogCategory::Events => "logEvents",
            LogCategory::SingularLinearSystems => "logSingularLinearSystems",
            LogCategory::NonlinearSystems => "logNonlinearSystems",
            LogCategory::DynamicStateSelection => "logDynamicStateSelection",
            LogCategory::StatusWarning => "logStatusWarning",
            LogCategory::StatusDiscard => "logStatusDiscard",
            LogCategory::StatusError => "logStatusError",
            LogCategory::StatusFatal => "logStatusFatal",
            LogCategory::BackendMessages => "logBackendMessages",
            LogCategory::UserDefined(name) => name,
        }
    }

    /// The category a message of the given status is filed under.
    pub fn for_status(status: Status) -> LogCategory {
        match status {
            Status::Warning => LogCategory::StatusWarning,
            Status::Discard => LogCategory::StatusDiscard,
            Status::Error => LogCategory::StatusError,
            Status::Fatal => LogCategory::StatusFatal,
            Status::Ok | Status::Pending => LogCategory::Events,
        }
    }
}

impl Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LogCategory {
    fn from(name: &str) -> Self {
        match name {
            "logEvents" => LogCategory::Events,
            "logSingularLinearSystems" => LogCategory::SingularLinearSystems,
            "logNonlinearSystems" => LogCategory::NonlinearSystems,
            "logDynamicStateSelection" => LogCategory::DynamicStateSelection,
            "logStatusWarning" => LogCategory::StatusWarning,
            "logStatusDiscard" => LogCategory::StatusDiscard,
            "logStatusError" => LogCategory::StatusError,
            "logStatusFatal" => LogCategory::StatusFatal,
            "logBackendMessages" => LogCategory::BackendMessages,
            other => LogCategory::UserDefined(other.to_string()),
        }
    }
}

impl From<String> for LogCategory {
    fn from(name: String) -> Self {
        LogCategory::from(name.as_str())
    }
}

impl From<LogCategory> for String {
    fn from(category: LogCategory) -> Self {
        category.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("logEvents" => LogCategory::Events; "events")]
    #[test_case("logStatusWarning" => LogCategory::StatusWarning; "warning")]
    #[test_case("logStatusFatal" => LogCategory::StatusFatal; "fatal")]
    #[test_case("myCategory" => LogCategory::UserDefined("myCategory".to_string()); "user defined")]
    fn parse_category(name: &str) -> LogCategory {
        let category = LogCategory::from(name);
        assert_eq!(category.as_str(), name);
        category
    }

    #[test]
    fn status_categories() {
        assert_eq!(LogCategory::for_status(Status::Warning), LogCategory::StatusWarning);
        assert_eq!(LogCategory::for_status(Status::Error), LogCategory::StatusError);
        assert_eq!(LogCategory::for_status(Status::Ok), LogCategory::Events);
    }

    #[test]
    fn serializes_as_standard_name() {
        let json = serde_json::to_string(&LogCategory::StatusDiscard).expect("serialize");
        assert_eq!(json, "\"logStatusDiscard\"");
        let back: LogCategory = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, LogCategory::StatusDiscard);
    }
}
