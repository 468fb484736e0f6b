//! Backend-neutral filter expressions.
//!
//! A [`Filter`] is pure data: a conjunction of per-field conditions drawn
//! from a closed operator set. Translation into backend-native query syntax
//! lives in [`crate::db::translate`].

use serde_json::Value;

use crate::db::models::ID_FIELD;
use crate::db::{DbError, DbResult};

/// One predicate applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    In(Vec<Value>),
    Like(String),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Field is absent or null.
    IsNull,
}

/// A field/condition pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub condition: Condition,
}

/// Conjunction of clauses. The empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching a single identifier.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq(ID_FIELD, id.into())
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            condition,
        });
        self
    }

    /// Equality; a `null` value becomes [`Condition::IsNull`].
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => self.with(field, Condition::IsNull),
            value => self.with(field, Condition::Equals(value)),
        }
    }

    pub fn is_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.with(field, Condition::In(values))
    }

    pub fn like(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.with(field, Condition::Like(pattern.into()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gt(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gte(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lt(value.into()))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lte(value.into()))
    }

    pub fn is_null(self, field: impl Into<String>) -> Self {
        self.with(field, Condition::IsNull)
    }

    /// Parse the JSON filter form used at the service boundary.
    ///
    /// Each field maps to a literal (equality), `null`, or an operator object
    /// such as `{"gte": 200, "lte": 400}`. Unknown operators are rejected.
    pub fn from_json(value: &Value) -> DbResult<Self> {
        let map = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(map) => map,
            other => {
                return Err(DbError::translation(format!(
                    "filter must be an object, got {}",
                    other
                )));
            }
        };

        let mut filter = Self::new();
        for (field, spec) in map {
            filter = match spec {
                Value::Object(ops) => parse_operators(filter, field, ops)?,
                literal => filter.eq(field.as_str(), literal.clone()),
            };
        }
        Ok(filter)
    }
}

fn parse_operators(
    mut filter: Filter,
    field: &str,
    ops: &serde_json::Map<String, Value>,
) -> DbResult<Filter> {
    if ops.is_empty() {
        return Err(DbError::translation(format!(
            "empty operator object on field '{}'",
            field
        )));
    }

    for (op, operand) in ops {
        let condition = match op.as_str() {
            "eq" if operand.is_null() => Condition::IsNull,
            "eq" => Condition::Equals(operand.clone()),
            "in" => match operand {
                Value::Array(values) => Condition::In(values.clone()),
                _ => {
                    return Err(DbError::translation(format!(
                        "'in' on field '{}' expects an array",
                        field
                    )));
                }
            },
            "like" => match operand {
                Value::String(pattern) => Condition::Like(pattern.clone()),
                _ => {
                    return Err(DbError::translation(format!(
                        "'like' on field '{}' expects a string pattern",
                        field
                    )));
                }
            },
            "gt" => Condition::Gt(operand.clone()),
            "gte" => Condition::Gte(operand.clone()),
            "lt" => Condition::Lt(operand.clone()),
            "lte" => Condition::Lte(operand.clone()),
            unknown => {
                return Err(DbError::translation(format!(
                    "unknown operator '{}' on field '{}'",
                    unknown, field
                )));
            }
        };
        filter = filter.with(field, condition);
    }
    Ok(filter)
}

/// A `like` pattern split into its anchoring and literal text.
///
/// Only leading and trailing `%` are wildcards; `_` is literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LikePattern {
    pub leading_wildcard: bool,
    pub trailing_wildcard: bool,
    pub text: String,
}

impl LikePattern {
    pub(crate) fn parse(field: &str, pattern: &str) -> DbResult<Self> {
        let (leading_wildcard, rest) = match pattern.strip_prefix('%') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        let (trailing_wildcard, text) = match rest.strip_suffix('%') {
            Some(text) => (true, text),
            None => (false, rest),
        };
        if text.contains('%') {
            return Err(DbError::translation(format!(
                "'like' pattern on field '{}' may only use '%' at its ends",
                field
            )));
        }
        Ok(Self {
            leading_wildcard,
            trailing_wildcard,
            text: text.to_string(),
        })
    }
}
