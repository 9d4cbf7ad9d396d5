//! Assertion operators.

use std::fmt;
use std::str::FromStr;

use crmcheck_core::AssertionError;
use serde::{Deserialize, Serialize};

/// Comparison operator named by a validation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    /// Loose equality
    Be,
    NotBe,
    /// Substring
    Contain,
    NotContain,
    /// Chronological or numeric ordering
    BeGreaterThan,
    BeLessThan,
    /// Non-null and non-empty
    BeSet,
    NotBeSet,
    /// Membership in a comma-delimited list
    BeOneOf,
    NotBeOneOf,
    /// Regular expression
    Match,
    NotMatch,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::Be,
        Operator::NotBe,
        Operator::Contain,
        Operator::NotContain,
        Operator::BeGreaterThan,
        Operator::BeLessThan,
        Operator::BeSet,
        Operator::NotBeSet,
        Operator::BeOneOf,
        Operator::NotBeOneOf,
        Operator::Match,
        Operator::NotMatch,
    ];

    /// Name as written in a step.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Be => "be",
            Operator::NotBe => "not be",
            Operator::Contain => "contain",
            Operator::NotContain => "not contain",
            Operator::BeGreaterThan => "be greater than",
            Operator::BeLessThan => "be less than",
            Operator::BeSet => "be set",
            Operator::NotBeSet => "not be set",
            Operator::BeOneOf => "be one of",
            Operator::NotBeOneOf => "not be one of",
            Operator::Match => "match",
            Operator::NotMatch => "not match",
        }
    }

    /// Unary operators ignore the expected value.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::BeSet | Operator::NotBeSet)
    }

    /// Comma-separated list of every operator name.
    pub fn valid_operators() -> String {
        Self::ALL
            .iter()
            .map(Operator::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; runs of whitespace count as one space.
impl FromStr for Operator {
    type Err = AssertionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| AssertionError::UnknownOperator {
                operator: s.to_string(),
                valid: Self::valid_operators(),
            })
    }
}

impl TryFrom<String> for Operator {
    type Error = AssertionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}
