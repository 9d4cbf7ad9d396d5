//! crmcheck Assert - Field Assertion Engine
//!
//! Compares a retrieved field value against an expected value with one of
//! twelve named operators, coercing operands to dates or numbers where the
//! operator needs ordering, and formats a pass or fail message that can hide
//! personal data.
//!
//! ```
//! use crmcheck_assert::{assert, Suppression};
//! use serde_json::json;
//!
//! let result = assert("be greater than", &json!("10"), Some(&json!("5")), "Score__c", Suppression::None).unwrap();
//! assert!(result.valid);
//! ```

pub mod engine;
pub mod operator;
pub mod outcome;
pub mod value;

pub use engine::{assert, AssertionRequest, AssertionResult, Suppression, REDACTED};
pub use operator::Operator;
pub use outcome::StepOutcome;
