use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a notification, unique among the active ones.
///
/// Derived from the creation time in microseconds since the Unix epoch and
/// bumped when two notifications land in the same microsecond, so ids also
/// sort in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NotificationId(#[cfg_attr(feature = "ts", ts(type = "number"))] pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A transient, user-visible message. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_for_ui() {
        let record = NotificationRecord {
            id: NotificationId(1_700_000_000_000_001),
            kind: NotificationKind::Success,
            message: "Saved".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1_700_000_000_000_001u64,
                "kind": "success",
                "message": "Saved"
            })
        );
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(NotificationKind::Info.to_string(), "info");
        assert_eq!(NotificationKind::Error.label(), "error");
        let kind: NotificationKind = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(kind, NotificationKind::Warning);
    }
}
