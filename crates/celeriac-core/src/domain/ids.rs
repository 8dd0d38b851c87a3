//! Domain identifiers.
//!
//! wire 上はどちらも単なる文字列ですが、取り違えを防ぐため newtype にしています。
//! - `TaskId`: メッセージごとに一意（producer 側で UUID v4 を採番）
//! - `TaskName`: consumer 側で呼び出す callable の名前（例: `tasks.add`）

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a Task message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Name of the callable the consumer dispatches to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::new("7f1c2f0e-0000-4000-8000-000000000001");
        let name = TaskName::from("tasks.add");

        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"7f1c2f0e-0000-4000-8000-000000000001\""
        );
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"tasks.add\"");
    }

    #[test]
    fn display_is_the_raw_value() {
        assert_eq!(TaskId::new("abc").to_string(), "abc");
        assert_eq!(TaskName::new("tasks.add").to_string(), "tasks.add");
    }
}
