//! Checks a filter against an entity's columns and normalizes its values.
//!
//! After [`normalize`] every predicate value has the JSON shape the entity
//! serializes to (integers as numbers, dates as `YYYY-MM-DD` strings), so the
//! SQL builder and the in-memory evaluator see the same thing.

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable};
use serde_json::Value;

use super::{Clause, Filter, FilterError, Predicate, Where};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Look up a column by its serialized name.
pub fn column<E: EntityTrait>(name: &str) -> Result<E::Column, FilterError> {
    E::Column::iter()
        .find(|c| c.as_str() == name)
        .ok_or_else(|| FilterError::UnknownField(name.to_string()))
}

/// Names of every column of `E`, in declaration order.
pub fn field_names<E: EntityTrait>() -> Vec<String> {
    E::Column::iter().map(|c| c.as_str().to_string()).collect()
}

/// Validate field names and coerce values; `include` is left to the caller.
pub fn normalize<E: EntityTrait>(filter: &Filter) -> Result<Filter, FilterError> {
    let mut out = filter.clone();
    if let Some(w) = &filter.where_ {
        out.where_ = Some(normalize_where::<E>(w)?);
    }
    if let Some(fields) = &filter.fields {
        for name in fields.names() {
            column::<E>(name)?;
        }
    }
    for term in filter.order_terms() {
        column::<E>(&term.field)?;
    }
    Ok(out)
}

pub fn normalize_where<E: EntityTrait>(w: &Where) -> Result<Where, FilterError> {
    check_fields::<E>(w)?;
    w.try_map_values(&mut |field, v| {
        let col = column::<E>(field)?;
        coerce(field, col.def().get_column_type(), v)
    })
}

fn check_fields<E: EntityTrait>(w: &Where) -> Result<(), FilterError> {
    for clause in w.clauses() {
        match clause {
            Clause::And(items) | Clause::Or(items) => {
                for item in items {
                    check_fields::<E>(item)?;
                }
            }
            Clause::Field { field, predicate } => {
                let col = column::<E>(field)?;
                if matches!(predicate, Predicate::Like(_) | Predicate::NLike(_)) && !is_text(col.def().get_column_type()) {
                    return Err(FilterError::InvalidValue {
                        field: field.clone(),
                        reason: "`like` only applies to text fields".into(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn is_text(ty: &ColumnType) -> bool {
    matches!(ty, ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_))
}

fn is_integer(ty: &ColumnType) -> bool {
    matches!(ty, ColumnType::BigInteger | ColumnType::Integer | ColumnType::SmallInteger | ColumnType::TinyInteger)
}

/// Coerce a filter value to the canonical JSON form of a column type.
pub fn coerce(field: &str, ty: &ColumnType, v: &Value) -> Result<Value, FilterError> {
    let invalid = |reason: &str| FilterError::InvalidValue { field: field.to_string(), reason: reason.to_string() };
    if v.is_null() {
        return Ok(Value::Null);
    }
    if is_integer(ty) {
        return match v {
            Value::Number(n) => n.as_i64().map(Value::from).ok_or_else(|| invalid("expected an integer")),
            Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| invalid("expected an integer")),
            _ => Err(invalid("expected an integer")),
        };
    }
    if is_text(ty) {
        return match v {
            Value::String(_) => Ok(v.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(invalid("expected a string")),
        };
    }
    match ty {
        ColumnType::Date => match v {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
                .map_err(|_| invalid("expected a date formatted YYYY-MM-DD")),
            _ => Err(invalid("expected a date formatted YYYY-MM-DD")),
        },
        ColumnType::Boolean => match v {
            Value::Bool(_) => Ok(v.clone()),
            Value::String(s) if s == "true" || s == "false" => Ok(Value::Bool(s == "true")),
            _ => Err(invalid("expected a boolean")),
        },
        ColumnType::Double | ColumnType::Float => match v {
            Value::Number(_) => Ok(v.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| invalid("expected a number")),
            _ => Err(invalid("expected a number")),
        },
        _ => Err(invalid("filtering on this column type is not supported")),
    }
}
