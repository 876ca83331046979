//! The fixed sequence of type labels requested at each depth.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LEVELS: [&str; 3] = ["root", "application", "service"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("level progression must name at least one level")]
pub struct EmptyProgressionError;

/// Type labels by depth: depth 0 is the root.
///
/// The progression is known up front by the caller; it is never discovered
/// from remote data. Depths past the end reuse the last label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LevelProgression(Vec<String>);

impl LevelProgression {
    pub fn new<I, S>(labels: I) -> Result<Self, EmptyProgressionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() || labels.iter().any(|label| label.trim().is_empty()) {
            return Err(EmptyProgressionError);
        }
        Ok(Self(labels))
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.0[0]
    }

    #[must_use]
    pub fn label(&self, depth: usize) -> &str {
        let last = self.0.len() - 1;
        &self.0[depth.min(last)]
    }

    /// Label of the last listed level.
    #[must_use]
    pub fn deepest(&self) -> &str {
        self.label(self.0.len() - 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for LevelProgression {
    fn default() -> Self {
        Self(DEFAULT_LEVELS.iter().map(ToString::to_string).collect())
    }
}

impl TryFrom<Vec<String>> for LevelProgression {
    type Error = EmptyProgressionError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LevelProgression> for Vec<String> {
    fn from(value: LevelProgression) -> Self {
        value.0
    }
}
