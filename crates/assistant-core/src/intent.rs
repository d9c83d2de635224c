//! Intent Classification
//!
//! Maps a raw label attached to an assistant message onto a fixed set of
//! handling categories. Decoding is lenient: an unrecognised label is never an
//! error, it becomes [`IntentKind::Illegal`].

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

/// Handling category of a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum IntentKind {
    /// Store something the user said
    Record,
    /// Run an analysis over stored context
    Analyze,
    /// Plain conversation
    Chat,
    /// Unrecognised or rejected label
    Illegal,
}

impl IntentKind {
    /// All kinds, in wire order
    pub const ALL: [Self; 4] = [Self::Record, Self::Analyze, Self::Chat, Self::Illegal];

    /// Wire encoding
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Analyze => "analyze",
            Self::Chat => "chat",
            Self::Illegal => "illegal",
        }
    }

    /// Whether downstream handlers should act on this intent
    pub const fn is_actionable(self) -> bool {
        !matches!(self, Self::Illegal)
    }
}

/// Classify a raw label. Total: case-insensitive exact match, otherwise `Illegal`.
pub fn classify(raw_label: &str) -> IntentKind {
    IntentKind::ALL
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(raw_label))
        .unwrap_or_else(|| {
            if !raw_label.is_empty() {
                tracing::debug!(label = %raw_label, "Unrecognised intent label");
            }
            IntentKind::Illegal
        })
}

impl FromStr for IntentKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(classify(s))
    }
}

impl From<&str> for IntentKind {
    fn from(s: &str) -> Self {
        classify(s)
    }
}

impl From<String> for IntentKind {
    fn from(s: String) -> Self {
        classify(&s)
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels_any_case() {
        assert_eq!(classify("RECORD"), IntentKind::Record);
        assert_eq!(classify("Chat"), IntentKind::Chat);
        assert_eq!(classify("analyze"), IntentKind::Analyze);
        assert_eq!(classify("IlLeGaL"), IntentKind::Illegal);
    }

    #[test]
    fn test_unknown_labels_are_illegal() {
        for label in ["", " chat", "recordx", "analyse", "\u{0}", "聊天", "CHAT\n"] {
            assert_eq!(classify(label), IntentKind::Illegal, "label {label:?}");
        }
    }

    #[test]
    fn test_only_illegal_is_not_actionable() {
        assert!(IntentKind::Record.is_actionable());
        assert!(IntentKind::Analyze.is_actionable());
        assert!(IntentKind::Chat.is_actionable());
        assert!(!IntentKind::Illegal.is_actionable());
    }

    #[test]
    fn test_serde_is_lenient() {
        let kind: IntentKind = serde_json::from_str("\"Analyze\"").unwrap();
        assert_eq!(kind, IntentKind::Analyze);

        let kind: IntentKind = serde_json::from_str("\"drop table\"").unwrap();
        assert_eq!(kind, IntentKind::Illegal);

        assert_eq!(serde_json::to_string(&IntentKind::Chat).unwrap(), "\"chat\"");
    }

    #[test]
    fn test_from_str_never_fails() {
        let kind: IntentKind = "whatever".parse().unwrap();
        assert_eq!(kind, IntentKind::Illegal);
        assert_eq!(IntentKind::from("Record").to_string(), "record");
    }
}
