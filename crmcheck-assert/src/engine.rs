//! Assertion evaluation and message formatting.
//!
//! [`assert`] is a pure function: it parses the operator, evaluates it on the
//! true operand values, and renders a pass or fail message. Redaction is
//! applied only while rendering, so it can never change the verdict.

use std::cmp::Ordering;

use crmcheck_core::{AssertionError, CrmResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operator::Operator;
use crate::value::{alternatives, compare, is_set, loose_eq, string_form};

/// Shown in place of operand values when PII suppression is on.
pub const REDACTED: &str = "[REDACTED]";

const ORDERING_OPERANDS: &str = "Operator only supports numeric or date format values";

/// How much of the operands a message may reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suppression {
    #[default]
    None,
    /// Replace actual and expected values with [`REDACTED`].
    Pii,
}

/// One comparison to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionRequest {
    pub operator: String,
    pub field: String,
    pub actual: Value,
    /// Absent for unary operators.
    #[serde(default)]
    pub expected: Option<Value>,
    #[serde(default)]
    pub suppression: Suppression,
}

impl AssertionRequest {
    pub fn new(operator: impl Into<String>, field: impl Into<String>, actual: Value) -> Self {
        Self {
            operator: operator.into(),
            field: field.into(),
            actual,
            expected: None,
            suppression: Suppression::None,
        }
    }

    pub fn expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn suppress_pii(mut self) -> Self {
        self.suppression = Suppression::Pii;
        self
    }

    pub fn evaluate(&self) -> CrmResult<AssertionResult> {
        assert(
            &self.operator,
            &self.actual,
            self.expected.as_ref(),
            &self.field,
            self.suppression,
        )
    }
}

/// Verdict and human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub valid: bool,
    pub message: String,
}

/// Evaluate `actual <operator> expected` for `field`.
///
/// # Errors
///
/// - `AssertionError::UnknownOperator` for a name outside [`Operator::ALL`]
/// - `AssertionError::InvalidOperand` when a binary operator has no expected
///   value, an ordering operator gets operands that are neither both dates
///   nor both numbers, or a match pattern does not compile
pub fn assert(
    operator: &str,
    actual: &Value,
    expected: Option<&Value>,
    field: &str,
    suppression: Suppression,
) -> CrmResult<AssertionResult> {
    let op: Operator = operator.parse()?;

    let valid = match (op, expected) {
        (Operator::BeSet, _) => is_set(actual),
        (Operator::NotBeSet, _) => !is_set(actual),
        (_, None) => {
            return Err(invalid_operand(op, "Operator requires an expected value").into());
        }
        (Operator::Be, Some(expected)) => loose_eq(actual, expected),
        (Operator::NotBe, Some(expected)) => !loose_eq(actual, expected),
        (Operator::Contain, Some(expected)) => contains(actual, expected),
        (Operator::NotContain, Some(expected)) => !contains(actual, expected),
        (Operator::BeGreaterThan, Some(expected)) => ordered(op, actual, expected)?.is_gt(),
        (Operator::BeLessThan, Some(expected)) => ordered(op, actual, expected)?.is_lt(),
        (Operator::BeOneOf, Some(expected)) => one_of(actual, expected),
        (Operator::NotBeOneOf, Some(expected)) => !one_of(actual, expected),
        (Operator::Match, Some(expected)) => matches_pattern(op, actual, expected, suppression)?,
        (Operator::NotMatch, Some(expected)) => {
            !matches_pattern(op, actual, expected, suppression)?
        }
    };

    let (shown_actual, shown_expected) = match suppression {
        Suppression::Pii => (REDACTED.to_string(), REDACTED.to_string()),
        Suppression::None => (
            string_form(actual),
            expected.map(string_form).unwrap_or_default(),
        ),
    };
    let message = render(template(op, valid), field, &shown_expected, &shown_actual);

    Ok(AssertionResult { valid, message })
}

fn invalid_operand(op: Operator, reason: &str) -> AssertionError {
    AssertionError::InvalidOperand {
        operator: op.as_str().to_string(),
        reason: reason.to_string(),
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    string_form(actual).contains(&string_form(expected))
}

fn ordered(op: Operator, actual: &Value, expected: &Value) -> Result<Ordering, AssertionError> {
    compare(actual, expected).ok_or_else(|| invalid_operand(op, ORDERING_OPERANDS))
}

fn one_of(actual: &Value, expected: &Value) -> bool {
    let list = string_form(expected);
    let found = alternatives(&list).any(|alt| loose_eq(actual, &Value::from(alt)));
    found
}

// The regex error text quotes the pattern, so it is dropped under PII suppression.
fn matches_pattern(
    op: Operator,
    actual: &Value,
    pattern: &Value,
    suppression: Suppression,
) -> Result<bool, AssertionError> {
    let regex = Regex::new(&string_form(pattern)).map_err(|e| match suppression {
        Suppression::Pii => invalid_operand(op, "Invalid pattern"),
        Suppression::None => invalid_operand(op, &format!("Invalid pattern: {e}")),
    })?;
    Ok(regex.is_match(&string_form(actual)))
}

/// Message template for an operator and verdict.
///
/// Placeholders: `{field}`, `{expected}`, `{actual}`.
fn template(op: Operator, valid: bool) -> &'static str {
    match (op, valid) {
        (Operator::Be, true) => "The {field} field was set to {expected}, as expected.",
        (Operator::Be, false) => {
            "Expected {field} field to be {expected}, but it was actually {actual}."
        }
        (Operator::NotBe, true) => "The {field} field was {actual}, not {expected}, as expected.",
        (Operator::NotBe, false) => "Expected {field} field not to be {expected}, but it was.",
        (Operator::Contain, true) => "The {field} field contains {expected}, as expected.",
        (Operator::Contain, false) => {
            "Expected {field} field to contain {expected}, but its value was {actual}."
        }
        (Operator::NotContain, true) => {
            "The {field} field does not contain {expected}, as expected."
        }
        (Operator::NotContain, false) => {
            "Expected {field} field not to contain {expected}, but its value was {actual}."
        }
        (Operator::BeGreaterThan, true) => {
            "The {field} field was {actual}, which is greater than {expected}, as expected."
        }
        (Operator::BeGreaterThan, false) => {
            "Expected {field} field to be greater than {expected}, but it was {actual}."
        }
        (Operator::BeLessThan, true) => {
            "The {field} field was {actual}, which is less than {expected}, as expected."
        }
        (Operator::BeLessThan, false) => {
            "Expected {field} field to be less than {expected}, but it was {actual}."
        }
        (Operator::BeSet, true) => "The {field} field was set, as expected.",
        (Operator::BeSet, false) => "Expected {field} field to be set, but it was empty.",
        (Operator::NotBeSet, true) => "The {field} field was not set, as expected.",
        (Operator::NotBeSet, false) => {
            "Expected {field} field not to be set, but it was set to {actual}."
        }
        (Operator::BeOneOf, true) => {
            "The {field} field was {actual}, which is one of {expected}, as expected."
        }
        (Operator::BeOneOf, false) => {
            "Expected {field} field to be one of {expected}, but it was {actual}."
        }
        (Operator::NotBeOneOf, true) => {
            "The {field} field was {actual}, which is not one of {expected}, as expected."
        }
        (Operator::NotBeOneOf, false) => {
            "Expected {field} field not to be one of {expected}, but it was {actual}."
        }
        (Operator::Match, true) => "The {field} field matches the pattern {expected}, as expected.",
        (Operator::Match, false) => {
            "Expected {field} field to match the pattern {expected}, but its value was {actual}."
        }
        (Operator::NotMatch, true) => {
            "The {field} field does not match the pattern {expected}, as expected."
        }
        (Operator::NotMatch, false) => {
            "Expected {field} field not to match the pattern {expected}, but its value was {actual}."
        }
    }
}

/// Single-pass placeholder substitution; interpolated text is never rescanned.
fn render(template: &str, field: &str, expected: &str, actual: &str) -> String {
    let mut out = String::with_capacity(template.len() + field.len() + expected.len() + actual.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let (value, consumed) = if tail.starts_with("{field}") {
            (field, "{field}".len())
        } else if tail.starts_with("{expected}") {
            (expected, "{expected}".len())
        } else if tail.starts_with("{actual}") {
            (actual, "{actual}".len())
        } else {
            ("{", 1)
        };
        out.push_str(value);
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}
