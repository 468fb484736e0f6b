//! Filter translation into backend-native query fragments.
//!
//! Both targets bind every operand as a parameter; no filter value is ever
//! written into query text. Field names are only emitted after they have
//! been checked against the collection catalog, which restricts them to
//! plain identifiers.
//!
//! Comparison semantics are aligned across backends:
//! - ordering comparisons never match absent fields,
//! - `like` only matches text values, case-sensitively, and supports `%`
//!   at either end of the pattern,
//! - `in` with an empty list matches nothing.

use serde_json::{Map, Value};

use crate::db::codec::{SqlValue, encode_field};
use crate::db::filter::{Clause, Condition, Filter, LikePattern};
use crate::db::models::{CREATED_AT_FIELD, ID_FIELD, QueryOptions, SortDirection};
use crate::db::schema::CollectionSchema;
use crate::db::{DbError, DbResult};

// =============================================================================
// Relational target
// =============================================================================

/// A parameterized SQL WHERE clause. `binds` line up with the `?`
/// placeholders in `clause`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlWhere {
    pub clause: String,
    pub binds: Vec<SqlValue>,
}

impl SqlWhere {
    /// The clause with its `WHERE` keyword, or empty for a match-all filter.
    pub fn to_sql(&self) -> String {
        if self.clause.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clause)
        }
    }
}

pub fn to_sql_where(schema: &CollectionSchema, filter: &Filter) -> DbResult<SqlWhere> {
    let mut parts = Vec::with_capacity(filter.clauses().len());
    let mut binds = Vec::new();

    for Clause { field, condition } in filter.clauses() {
        schema.check_query_field(field)?;
        let column = quote_sql(field);
        let part = match condition {
            Condition::Equals(value) => {
                binds.push(sql_operand(schema, field, value)?);
                format!("{} = ?", column)
            }
            Condition::In(values) if values.is_empty() => "0 = 1".to_string(),
            Condition::In(values) => {
                for value in values {
                    binds.push(sql_operand(schema, field, value)?);
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({})", column, placeholders)
            }
            Condition::Like(pattern) => {
                let pattern = LikePattern::parse(field, pattern)?;
                binds.push(SqlValue::Text(sql_glob_pattern(&pattern)));
                format!("(typeof({col}) = 'text' AND {col} GLOB ?)", col = column)
            }
            Condition::Gt(value) => sql_compare(schema, field, &column, ">", value, &mut binds)?,
            Condition::Gte(value) => sql_compare(schema, field, &column, ">=", value, &mut binds)?,
            Condition::Lt(value) => sql_compare(schema, field, &column, "<", value, &mut binds)?,
            Condition::Lte(value) => sql_compare(schema, field, &column, "<=", value, &mut binds)?,
            Condition::IsNull => format!("{} IS NULL", column),
        };
        parts.push(part);
    }

    Ok(SqlWhere {
        clause: parts.join(" AND "),
        binds,
    })
}

fn sql_compare(
    schema: &CollectionSchema,
    field: &str,
    column: &str,
    op: &str,
    value: &Value,
    binds: &mut Vec<SqlValue>,
) -> DbResult<String> {
    binds.push(sql_operand(schema, field, value)?);
    Ok(format!("{} {} ?", column, op))
}

fn sql_operand(schema: &CollectionSchema, field: &str, value: &Value) -> DbResult<SqlValue> {
    reject_null_operand(field, value)?;
    Ok(encode_field(schema, field, value))
}

/// `like` as a case-sensitive GLOB pattern with `*?[` taken literally.
fn sql_glob_pattern(pattern: &LikePattern) -> String {
    let mut out = String::with_capacity(pattern.text.len() + 2);
    if pattern.leading_wildcard {
        out.push('*');
    }
    for c in pattern.text.chars() {
        match c {
            '*' | '?' | '[' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }
    if pattern.trailing_wildcard {
        out.push('*');
    }
    out
}

/// `ORDER BY` clause; `id` is always the final tiebreaker.
pub fn sql_order_clause(schema: &CollectionSchema, options: &QueryOptions) -> DbResult<String> {
    order_terms(schema, options, quote_sql).map(|terms| format!(" ORDER BY {}", terms))
}

/// `LIMIT`/`OFFSET` clause. Explicit zeros are kept.
/// SQLite requires LIMIT when using OFFSET, so a missing limit becomes -1.
pub fn sql_page_clause(options: &QueryOptions) -> String {
    let mut clause = String::new();
    match options.limit {
        Some(limit) => clause.push_str(&format!(" LIMIT {}", clamp(limit))),
        None if options.skip.is_some() => clause.push_str(" LIMIT -1"),
        None => {}
    }
    if let Some(skip) = options.skip {
        clause.push_str(&format!(" OFFSET {}", clamp(skip)));
    }
    clause
}

pub(crate) fn quote_sql(field: &str) -> String {
    format!("\"{}\"", field)
}

// =============================================================================
// Document target
// =============================================================================

/// A SurrealQL condition with its bound variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurqlWhere {
    pub clause: String,
    pub vars: Map<String, Value>,
}

impl SurqlWhere {
    pub fn to_surql(&self) -> String {
        if self.clause.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clause)
        }
    }
}

pub fn to_surql_where(schema: &CollectionSchema, filter: &Filter) -> DbResult<SurqlWhere> {
    let mut parts = Vec::with_capacity(filter.clauses().len());
    let mut vars = Map::new();

    for Clause { field, condition } in filter.clauses() {
        schema.check_query_field(field)?;
        let target = surql_field(field);
        let part = match condition {
            Condition::Equals(value) => {
                reject_null_operand(field, value)?;
                let var = bind_var(&mut vars, value.clone());
                format!("{} = {}", target, var)
            }
            Condition::In(values) => {
                for value in values {
                    reject_null_operand(field, value)?;
                }
                let var = bind_var(&mut vars, Value::Array(values.clone()));
                format!("{} IN {}", target, var)
            }
            Condition::Like(pattern) => {
                let pattern = LikePattern::parse(field, pattern)?;
                let var = bind_var(&mut vars, Value::String(pattern.text.clone()));
                let test = match (pattern.leading_wildcard, pattern.trailing_wildcard) {
                    (true, true) => format!("string::contains({}, {})", target, var),
                    (true, false) => format!("string::ends_with({}, {})", target, var),
                    (false, true) => format!("string::starts_with({}, {})", target, var),
                    (false, false) => format!("{} = {}", target, var),
                };
                format!("(type::is::string({}) AND {})", target, test)
            }
            Condition::Gt(value) => surql_compare(field, &target, ">", value, &mut vars)?,
            Condition::Gte(value) => surql_compare(field, &target, ">=", value, &mut vars)?,
            Condition::Lt(value) => surql_compare(field, &target, "<", value, &mut vars)?,
            Condition::Lte(value) => surql_compare(field, &target, "<=", value, &mut vars)?,
            Condition::IsNull => format!("({f} = NONE OR {f} = NULL)", f = target),
        };
        parts.push(part);
    }

    Ok(SurqlWhere {
        clause: parts.join(" AND "),
        vars,
    })
}

fn surql_compare(
    field: &str,
    target: &str,
    op: &str,
    value: &Value,
    vars: &mut Map<String, Value>,
) -> DbResult<String> {
    reject_null_operand(field, value)?;
    let var = bind_var(vars, value.clone());
    Ok(format!(
        "({f} != NONE AND {f} != NULL AND {f} {op} {var})",
        f = target,
        op = op,
        var = var
    ))
}

fn bind_var(vars: &mut Map<String, Value>, value: Value) -> String {
    let name = format!("w{}", vars.len());
    let placeholder = format!("${}", name);
    vars.insert(name, value);
    placeholder
}

/// Field reference inside SurrealQL. The native record id is compared
/// through its key so callers filter on plain string ids.
pub(crate) fn surql_field(field: &str) -> String {
    if field == ID_FIELD {
        "record::id(id)".to_string()
    } else {
        format!("`{}`", field)
    }
}

pub fn surql_order_clause(schema: &CollectionSchema, options: &QueryOptions) -> DbResult<String> {
    order_terms(schema, options, |f| format!("`{}`", f)).map(|terms| format!(" ORDER BY {}", terms))
}

/// `LIMIT`/`START` clause.
pub fn surql_page_clause(options: &QueryOptions) -> String {
    let mut clause = String::new();
    if let Some(limit) = options.limit {
        clause.push_str(&format!(" LIMIT {}", clamp(limit)));
    }
    if let Some(skip) = options.skip {
        clause.push_str(&format!(" START {}", clamp(skip)));
    }
    clause
}

// =============================================================================
// Shared
// =============================================================================

fn order_terms(
    schema: &CollectionSchema,
    options: &QueryOptions,
    quote: impl Fn(&str) -> String,
) -> DbResult<String> {
    let mut terms = Vec::with_capacity(options.sort.len() + 1);
    let default_sort = [(CREATED_AT_FIELD.to_string(), SortDirection::Asc)];
    let sort = if options.sort.is_empty() {
        &default_sort[..]
    } else {
        &options.sort[..]
    };

    for (field, direction) in sort {
        schema.check_query_field(field)?;
        terms.push(format!("{} {}", quote(field), direction.keyword()));
    }
    if !sort.iter().any(|(field, _)| field == ID_FIELD) {
        terms.push(format!("{} ASC", quote(ID_FIELD)));
    }
    Ok(terms.join(", "))
}

fn reject_null_operand(field: &str, value: &Value) -> DbResult<()> {
    if value.is_null() {
        return Err(DbError::translation(format!(
            "null operand on field '{}'; use an is-null condition instead",
            field
        )));
    }
    Ok(())
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
