//models.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Node id, creation-timestamp-derived (unix milliseconds).
pub type Id = i64;

/// Numeric field that tolerates non-numeric input. `None` is the sentinel
/// left behind by a failed parse; it serializes as JSON `null` and reads
/// as 0 everywhere downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumField(pub Option<i64>);

impl NumField {
    pub fn new(n: i64) -> Self {
        NumField(Some(n))
    }

    /// Parse free text: a trimmed (optionally signed) integer, anything
    /// else becomes the sentinel.
    pub fn parse(text: &str) -> Self {
        NumField(text.trim().parse::<i64>().ok())
    }

    pub fn get(self) -> i64 {
        self.0.unwrap_or(0)
    }

    pub fn is_sentinel(self) -> bool {
        self.0.is_none()
    }
}

impl Default for NumField {
    fn default() -> Self {
        NumField(Some(0))
    }
}

impl fmt::Display for NumField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{}", n),
            None => Ok(()),
        }
    }
}

/// Countdown display, minutes then zero-padded seconds.
pub fn format_clock(total_secs: u32) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: NumField,
    #[serde(default)]
    pub extra_value: NumField,
    /// Minutes as typed by the user before start, `M:SS` while counting
    /// down, empty when idle.
    #[serde(default)]
    pub timer: String,
    #[serde(default)]
    pub timer_running: bool,
    #[serde(default)]
    pub remaining_time: u32,
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default)]
    pub sub_categories: Vec<SubCategory>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: Id,
    #[serde(default)]
    pub value: NumField,
    #[serde(default)]
    pub extra_value: NumField,
}
