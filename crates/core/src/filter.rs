//! Filter DSL for querying in-memory record collections.
//!
//! A [`Filter`] is pure data: an ordered list of field conditions,
//! optional `since`/`until` time bounds, a single optional ordering,
//! and optional pagination. It is fully serializable and has no side
//! effects; construction is builder-style and the value is discarded
//! after use.
//!
//! Two evaluation entry points:
//!
//! - [`Filter::matches`] tests a single record against conditions and
//!   time bounds only (no ordering, no pagination), which makes it
//!   usable for per-record checks such as subscription filtering.
//! - [`Filter::apply`] runs the full, fixed pipeline over a
//!   collection: filter by conditions+bounds, stable-sort by the
//!   `order_by` field if present, drop `offset`, take `limit` -
//!   in exactly that order. The pipeline is not commutative.
//!
//! ## Comparison rules
//!
//! No implicit type coercion. Numbers compare numerically across
//! int/float, strings lexicographically, booleans false < true.
//! An ordered comparison across differing types is undefined and the
//! condition evaluates to false. A missing field fails every operator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

use crate::record::Record;

/// Comparison operator for a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Field equals value.
    Eq,
    /// Field does not equal value.
    Neq,
    /// Field is greater than value.
    Gt,
    /// Field is greater than or equal to value.
    Gte,
    /// Field is less than value.
    Lt,
    /// Field is less than or equal to value.
    Lte,
    /// Field is a member of the value array.
    In,
    /// Field (string) contains the value substring, or field (array)
    /// contains the value as an element.
    Contains,
}

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// A single `(field, operator, value)` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Top-level field of `record.data` to test.
    pub field: String,
    /// Comparison operator.
    pub op: Operator,
    /// Value to compare against.
    pub value: JsonValue,
}

/// A pure query description over records.
///
/// # Example
///
/// ```
/// use ledger_core::{Direction, Filter, Operator};
/// use serde_json::json;
///
/// let filter = Filter::new()
///     .where_("status", Operator::Eq, json!("active"))
///     .where_("score", Operator::Gte, json!(10))
///     .order_by("score", Direction::Desc)
///     .limit(20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Conditions, all of which must hold (conjunction).
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Inclusive lower bound on `record.inserted_at`.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `record.inserted_at`.
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    /// Single `(field, direction)` ordering applied by `apply`.
    #[serde(default)]
    pub order_by: Option<(String, Direction)>,
    /// Maximum number of records returned by `apply`.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of records dropped by `apply` after sorting.
    #[serde(default)]
    pub offset: Option<usize>,
}

impl Filter {
    /// An empty filter that matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn where_(mut self, field: impl Into<String>, op: Operator, value: JsonValue) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value,
        });
        self
    }

    /// Only match records inserted at or after `ts`.
    pub fn since(mut self, ts: DateTime<Utc>) -> Self {
        self.since = Some(ts);
        self
    }

    /// Only match records inserted at or before `ts`.
    pub fn until(mut self, ts: DateTime<Utc>) -> Self {
        self.until = Some(ts);
        self
    }

    /// Sort results by a field.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Bound the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip results after sorting.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Test a single record against conditions and time bounds.
    ///
    /// Ordering and pagination are ignored here; they only apply to
    /// collections via [`Filter::apply`].
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(since) = self.since {
            if record.inserted_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.inserted_at > until {
                return false;
            }
        }
        self.conditions.iter().all(|cond| {
            record
                .field(&cond.field)
                .is_some_and(|value| eval_condition(value, cond.op, &cond.value))
        })
    }

    /// Run the full pipeline over a collection.
    ///
    /// Order is fixed: filter, stable sort, offset, limit. Records
    /// missing the `order_by` field sort after records that have it,
    /// with their relative order preserved.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut results: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        if let Some((field, direction)) = &self.order_by {
            results.sort_by(|a, b| {
                let ord = match (a.field(field), b.field(field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match direction {
                    Direction::Asc => ord,
                    // Missing-field records still sort last under Desc.
                    Direction::Desc => match (a.field(field), b.field(field)) {
                        (Some(_), Some(_)) => ord.reverse(),
                        _ => ord,
                    },
                }
            });
        }

        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        results.into_iter().skip(offset).take(limit).collect()
    }
}

/// Evaluate one condition against a field value.
fn eval_condition(field: &JsonValue, op: Operator, target: &JsonValue) -> bool {
    match op {
        Operator::Eq => field == target,
        Operator::Neq => field != target,
        Operator::Gt => compare_values(field, target) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            compare_values(field, target),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => compare_values(field, target) == Some(Ordering::Less),
        Operator::Lte => matches!(
            compare_values(field, target),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::In => target
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| c == field)),
        Operator::Contains => match field {
            JsonValue::String(s) => target.as_str().is_some_and(|needle| s.contains(needle)),
            JsonValue::Array(items) => items.iter().any(|item| item == target),
            _ => false,
        },
    }
}

/// Ordered comparison of two JSON values.
///
/// Numbers compare numerically (int and float unified), strings
/// lexicographically, booleans false < true. Any other pairing is
/// undefined and returns `None`.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let x = x.as_f64()?;
            let y = y.as_f64()?;
            x.partial_cmp(&y)
        }
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
