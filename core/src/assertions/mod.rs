//! Field-level expectations evaluated against an extracted value.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::order::{parse_time, NOT_PROVIDED};

mod path;

pub use path::{FieldPath, PathError, Segment};

const MAX_SHOWN_CHARS: usize = 60;

/// How many expectations get evaluated once one fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Stop at the first failed expectation
    FailEarly,
    /// Evaluate every expectation and report all failures
    #[default]
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
    Null,
    /// A string holding an ISO 8601 calendar date
    Date,
    /// A string holding a time of day
    Time,
    /// A string holding an ISO 8601 date-time
    DateTime,
}

impl ValueKind {
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Boolean => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
            Self::Date => value.as_str().is_some_and(|s| s.parse::<NaiveDate>().is_ok()),
            Self::Time => value.as_str().and_then(parse_time).is_some(),
            Self::DateTime => value.as_str().is_some_and(|s| {
                s.parse::<NaiveDateTime>().is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
            }),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date-time",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Exact literal equality
    Equals(Value),
    /// Type conformance
    Kind(ValueKind),
    /// Not null, not blank, not the "None" sentinel, not an empty collection
    NotEmpty,
    /// Every word starts with an uppercase letter followed by lowercase ones
    TitleCase,
    /// Integers at the path add up to the given total
    SumEquals(i64),
    /// Number of values at a wildcard path, or length of the array at a plain one
    LenEquals(usize),
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(v) => write!(f, "== {v}"),
            Self::Kind(k) => write!(f, "is {k}"),
            Self::NotEmpty => f.write_str("is not empty"),
            Self::TitleCase => f.write_str("is title case"),
            Self::SumEquals(n) => write!(f, "sums to {n}"),
            Self::LenEquals(n) => write!(f, "has {n} element(s)"),
        }
    }
}

fn is_not_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty() && s != NOT_PROVIDED,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn is_title_case(s: &str) -> bool {
    let mut cased = false;
    for word in s.split(|c: char| !c.is_alphabetic()).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        let Some(first) = chars.next() else { continue };
        if !first.is_uppercase() || chars.any(char::is_uppercase) {
            return false;
        }
        cased = true;
    }
    cased
}

impl Check {
    /// Returns whether the check passed and the actual value to report
    fn evaluate(&self, values: &[&Value], wildcard: bool) -> (bool, Value) {
        let shown = if wildcard {
            Value::Array(values.iter().map(|v| (*v).clone()).collect())
        } else {
            values.first().map_or(Value::Null, |v| (*v).clone())
        };
        match self {
            Self::Equals(expected) => (values.iter().all(|v| *v == expected), shown),
            Self::Kind(kind) => (values.iter().all(|v| kind.matches(v)), shown),
            Self::NotEmpty => (values.iter().all(|v| is_not_empty(v)), shown),
            Self::TitleCase => (
                values
                    .iter()
                    .all(|v| v.as_str().is_some_and(is_title_case)),
                shown,
            ),
            Self::SumEquals(expected) => {
                let items: Vec<&Value> = match (wildcard, values) {
                    (false, [Value::Array(items)]) => items.iter().collect(),
                    _ => values.to_vec(),
                };
                let sum = items
                    .iter()
                    .map(|v| v.as_i64())
                    .try_fold(0i64, |acc, n| n.and_then(|n| acc.checked_add(n)));
                match sum {
                    Some(sum) => (sum == *expected, Value::from(sum)),
                    None => (false, shown),
                }
            }
            Self::LenEquals(expected) => {
                let len = match (wildcard, values) {
                    (true, _) => Some(values.len()),
                    (false, [Value::Array(items)]) => Some(items.len()),
                    _ => None,
                };
                match len {
                    Some(len) => (len == *expected, Value::from(len)),
                    None => (false, shown),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub path: String,
    pub check: Check,
}

/// An ordered list of expectations, built fluently:
///
/// ```
/// use orderly::assertions::{Expectations, ValueKind};
///
/// let expectations = Expectations::new()
///     .equals("name", "Jason")
///     .kind("is_repeat_order", ValueKind::Boolean)
///     .sum("order.order_list[*].quantity", 5);
/// assert_eq!(expectations.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expectations(Vec<Expectation>);

impl Expectations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn expect(mut self, path: impl Into<String>, check: Check) -> Self {
        self.0.push(Expectation {
            path: path.into(),
            check,
        });
        self
    }

    #[must_use]
    pub fn equals(self, path: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.expect(path, Check::Equals(expected.into()))
    }

    #[must_use]
    pub fn kind(self, path: impl Into<String>, kind: ValueKind) -> Self {
        self.expect(path, Check::Kind(kind))
    }

    #[must_use]
    pub fn not_empty(self, path: impl Into<String>) -> Self {
        self.expect(path, Check::NotEmpty)
    }

    #[must_use]
    pub fn title_case(self, path: impl Into<String>) -> Self {
        self.expect(path, Check::TitleCase)
    }

    #[must_use]
    pub fn sum(self, path: impl Into<String>, total: i64) -> Self {
        self.expect(path, Check::SumEquals(total))
    }

    #[must_use]
    pub fn len_equals(self, path: impl Into<String>, len: usize) -> Self {
        self.expect(path, Check::LenEquals(len))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expectation> {
        self.0.iter()
    }

    /// Evaluates every expectation against `root`; pure, so repeated calls agree.
    #[must_use]
    pub fn evaluate(&self, root: &Value, strategy: ExecutionStrategy) -> ValidationReport {
        let mut outcomes = Vec::with_capacity(self.0.len());
        for expectation in &self.0 {
            let outcome = evaluate_one(expectation, root);
            let failed = !outcome.passed;
            outcomes.push(outcome);
            if failed && strategy == ExecutionStrategy::FailEarly {
                break;
            }
        }
        ValidationReport {
            outcomes,
            expected: self.0.len(),
        }
    }
}

fn evaluate_one(expectation: &Expectation, root: &Value) -> AssertionOutcome {
    let failed = |actual, detail: String| AssertionOutcome {
        path: expectation.path.clone(),
        check: expectation.check.clone(),
        actual,
        passed: false,
        detail: Some(detail),
    };

    let path = match expectation.path.parse::<FieldPath>() {
        Ok(path) => path,
        Err(e) => return failed(None, e.to_string()),
    };
    let Some(values) = path.resolve(root) else {
        return failed(None, "no value at this path".to_string());
    };
    let (passed, actual) = expectation.check.evaluate(&values, path.has_wildcard());
    AssertionOutcome {
        path: expectation.path.clone(),
        check: expectation.check.clone(),
        actual: Some(actual),
        passed,
        detail: None,
    }
}

/// Result of one expectation
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionOutcome {
    pub path: String,
    pub check: Check,
    /// `None` when nothing was found at `path`
    pub actual: Option<Value>,
    pub passed: bool,
    pub detail: Option<String>,
}

fn shorten(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > MAX_SHOWN_CHARS {
        let head: String = text.chars().take(MAX_SHOWN_CHARS).collect();
        format!("{head}...")
    } else {
        text
    }
}

impl fmt::Display for AssertionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "[{status}] {} {}", self.path, self.check)?;
        match &self.actual {
            Some(actual) => write!(f, " (actual: {})", shorten(actual))?,
            None => f.write_str(" (actual: <absent>)")?,
        }
        if let Some(detail) = &self.detail {
            write!(f, " - {detail}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    outcomes: Vec<AssertionOutcome>,
    expected: usize,
}

impl ValidationReport {
    #[must_use]
    pub fn outcomes(&self) -> &[AssertionOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &AssertionOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// Expectations left unevaluated after a fail-early stop
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.expected - self.outcomes.len()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.skipped() == 0 && self.outcomes.iter().all(|o| o.passed)
    }

    /// Turns a report with failures into an [`AssertionFailure`]
    pub fn into_result(self) -> Result<Self, AssertionFailure> {
        if self.is_success() {
            return Ok(self);
        }
        Err(AssertionFailure {
            failures: self.failures().cloned().collect(),
            evaluated: self.outcomes.len(),
            skipped: self.skipped(),
        })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, outcome) in self.outcomes.iter().enumerate() {
            writeln!(f, "{}. {outcome}", i + 1)?;
        }
        let passed = self.outcomes.iter().filter(|o| o.passed).count();
        write!(f, "{passed}/{} passed", self.expected)?;
        if self.skipped() > 0 {
            write!(f, ", {} skipped", self.skipped())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AssertionFailure {
    pub failures: Vec<AssertionOutcome>,
    pub evaluated: usize,
    pub skipped: usize,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} evaluated assertion(s) failed",
            self.failures.len(),
            self.evaluated
        )?;
        if self.skipped > 0 {
            write!(f, " ({} skipped)", self.skipped)?;
        }
        let failures: Vec<_> = self.failures.iter().map(ToString::to_string).collect();
        write!(f, ": {}", failures.join("; "))
    }
}

impl std::error::Error for AssertionFailure {}

/// Snapshots `result` and evaluates `expectations` against it.
pub fn validate<T: Serialize>(
    result: &T,
    expectations: &Expectations,
    strategy: ExecutionStrategy,
) -> Result<ValidationReport, crate::error::Error> {
    let snapshot = serde_json::to_value(result)?;
    Ok(expectations.evaluate(&snapshot, strategy))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn answer() -> Value {
        json!({
            "chain_of_thought": "Two Hawaiian, three Pepperoni.",
            "name": "Jason",
            "is_repeat_order": false,
            "order": {
                "delivery_date": "2024-07-04T00:00:00",
                "delivery_time": "16:00:00",
                "order_list": [
                    {"name": "Hawaiian", "size": "large", "quantity": 2},
                    {"name": "Pepperoni", "size": "medium", "quantity": 3}
                ]
            },
            "address": {"city": "Dubai", "area_name": "None", "locator": -1}
        })
    }

    #[test]
    fn test_equality_and_kinds() {
        let report = Expectations::new()
            .equals("name", "Jason")
            .equals("order.order_list[1].quantity", 3)
            .equals("address.locator", -1)
            .kind("is_repeat_order", ValueKind::Boolean)
            .kind("order.delivery_date", ValueKind::DateTime)
            .kind("order.delivery_time", ValueKind::Time)
            .kind("address.area_name", ValueKind::String)
            .evaluate(&answer(), ExecutionStrategy::BestEffort);
        assert!(report.is_success(), "{report}");
        assert_eq!(report.outcomes().len(), 7);
    }

    #[test]
    fn test_time_kind_accepts_offsets() {
        for raw in ["16:00", "16:00:00", "16:00:00Z", "16:00:00+04:00"] {
            assert!(ValueKind::Time.matches(&json!(raw)), "{raw}");
        }
        assert!(!ValueKind::Time.matches(&json!("4pm")));
        assert!(ValueKind::DateTime.matches(&json!("2024-07-04T00:00:00Z")));
        assert!(!ValueKind::DateTime.matches(&json!("2024-07-04")));
    }

    #[test]
    fn test_aggregates_over_wildcards() {
        let report = Expectations::new()
            .sum("order.order_list[*].quantity", 5)
            .len_equals("order.order_list", 2)
            .len_equals("order.order_list[*]", 2)
            .title_case("order.order_list[*].name")
            .not_empty("chain_of_thought")
            .evaluate(&answer(), ExecutionStrategy::BestEffort);
        assert!(report.is_success(), "{report}");
        assert_eq!(report.outcomes()[0].actual, Some(json!(5)));
    }

    #[test]
    fn test_best_effort_reports_every_failure() {
        let report = Expectations::new()
            .equals("name", "Jack")
            .equals("order.order_list[0].size", "large")
            .not_empty("address.area_name")
            .equals("address.country", "United Arab Emirates")
            .evaluate(&answer(), ExecutionStrategy::BestEffort);
        let failed: Vec<_> = report.failures().map(|o| o.path.as_str()).collect();
        assert_eq!(failed, vec!["name", "address.area_name", "address.country"]);
        assert_eq!(report.outcomes()[3].actual, None);

        let failure = report.into_result().unwrap_err();
        assert_eq!(failure.failures.len(), 3);
        assert_eq!(failure.evaluated, 4);
        assert!(failure.to_string().starts_with("3 of 4 evaluated assertion(s) failed: "));
    }

    #[test]
    fn test_fail_early_stops_at_first_failure() {
        let report = Expectations::new()
            .equals("name", "Jason")
            .equals("is_repeat_order", true)
            .equals("address.city", "Dubai")
            .evaluate(&answer(), ExecutionStrategy::FailEarly);
        assert_eq!(report.outcomes().len(), 2);
        assert_eq!(report.skipped(), 1);
        assert!(!report.is_success());
        assert!(report.to_string().ends_with("1/3 passed, 1 skipped"));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let expectations = Expectations::new()
            .equals("name", "Jason")
            .sum("order.order_list[*].quantity", 6)
            .equals("order..name", "x");
        let root = answer();
        let first = expectations.evaluate(&root, ExecutionStrategy::BestEffort);
        let second = expectations.evaluate(&root, ExecutionStrategy::BestEffort);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_path_is_a_failed_outcome() {
        let report = Expectations::new()
            .equals("order[", 1)
            .evaluate(&answer(), ExecutionStrategy::BestEffort);
        let outcome = &report.outcomes()[0];
        assert!(!outcome.passed);
        assert!(outcome
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("invalid segment")));
    }

    #[test]
    fn test_title_case() {
        assert!(is_title_case("Hawaiian"));
        assert!(is_title_case("Four Cheese"));
        assert!(!is_title_case("BBQ Chicken"));
        assert!(!is_title_case("pepperoni"));
        assert!(!is_title_case("42"));
    }

    #[test]
    fn test_validate_snapshots_serializable_values() {
        #[derive(Serialize)]
        struct Small {
            flag: bool,
        }
        let report = validate(
            &Small { flag: true },
            &Expectations::new().equals("flag", true),
            ExecutionStrategy::default(),
        )
        .unwrap();
        assert!(report.is_success());
    }

    #[test]
    fn test_outcome_display_shortens_long_values() {
        let root = json!({"text": "x".repeat(200)});
        let report = Expectations::new()
            .not_empty("text")
            .evaluate(&root, ExecutionStrategy::BestEffort);
        let line = report.outcomes()[0].to_string();
        assert!(line.starts_with("[PASS] text is not empty (actual: \""));
        assert!(line.ends_with("...)"));
    }
}
