//! Warnings accumulated across multi-step operations

use std::fmt;
use std::ops::Deref;

/// Ordered, append-only list of human readable warnings.
///
/// Every step of an operation hands back its own warnings; the caller appends
/// them before looking at the step's result, so nothing gathered before a
/// failure is lost. Warnings are never deduplicated or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings(Vec<String>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single warning
    pub fn push(&mut self, warning: impl Into<String>) {
        self.0.push(warning.into());
    }

    /// Append another list of warnings, keeping their order
    pub fn append(&mut self, other: impl Into<Warnings>) {
        self.0.extend(other.into().0);
    }

    /// Record the warnings of a step and hand back its result, ready to be
    /// chained with `?`
    pub fn absorb<T, E, W>(&mut self, (result, warnings): (Result<T, E>, W)) -> Result<T, E>
    where
        W: Into<Warnings>,
    {
        self.append(warnings);
        result
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Deref for Warnings {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for Warnings {
    fn from(warnings: Vec<String>) -> Self {
        Self(warnings)
    }
}

impl From<Vec<&str>> for Warnings {
    fn from(warnings: Vec<&str>) -> Self {
        Self(warnings.into_iter().map(String::from).collect())
    }
}

impl FromIterator<String> for Warnings {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Warnings {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("\n"))
    }
}
