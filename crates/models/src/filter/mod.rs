//! Query filters accepted by the collection endpoints.
//!
//! A filter is a JSON document:
//!
//! ```json
//! {"where": {"lastname": "Lee", "id": {"gt": 3}},
//!  "fields": ["id", "firstname"],
//!  "order": ["lastname ASC", "id DESC"],
//!  "limit": 10, "skip": 20,
//!  "include": [{"relation": "role", "scope": {"fields": ["name"]}}]}
//! ```
//!
//! Parsing only checks the document shape. Field names and value types are
//! checked against an entity by [`typed`], SQL is produced by [`sql`] and
//! in-memory evaluation lives in [`eval`].

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod eval;
pub mod sql;
pub mod typed;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("unknown relation `{0}`")]
    UnknownRelation(String),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("invalid order clause `{0}`")]
    InvalidOrder(String),
    #[error("malformed filter: {0}")]
    Malformed(String),
}

impl FilterError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue { field: field.to_string(), reason: reason.into() }
    }
}

/// Conjunction of clauses; an empty `Where` matches every record.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "Value")]
pub struct Where {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    And(Vec<Where>),
    Or(Vec<Where>),
    Field { field: String, predicate: Predicate },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `null` means IS NULL
    Eq(Value),
    /// `null` means IS NOT NULL
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Inq(Vec<Value>),
    Nin(Vec<Value>),
    Between(Value, Value),
    Like(String),
    NLike(String),
}

impl Predicate {
    fn parse(field: &str, value: Value) -> Result<Self, FilterError> {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Array(_) => return Err(FilterError::invalid(field, "arrays need an operator such as `inq`")),
            scalar => return Ok(Predicate::Eq(scalar)),
        };
        if obj.len() != 1 {
            return Err(FilterError::invalid(field, "expected exactly one operator"));
        }
        let Some((op, operand)) = obj.into_iter().next() else {
            return Err(FilterError::invalid(field, "expected exactly one operator"));
        };
        let pred = match op.as_str() {
            "eq" => Predicate::Eq(scalar(field, operand, true)?),
            "neq" => Predicate::Neq(scalar(field, operand, true)?),
            "gt" => Predicate::Gt(scalar(field, operand, false)?),
            "gte" => Predicate::Gte(scalar(field, operand, false)?),
            "lt" => Predicate::Lt(scalar(field, operand, false)?),
            "lte" => Predicate::Lte(scalar(field, operand, false)?),
            "inq" => Predicate::Inq(scalars(field, operand)?),
            "nin" => Predicate::Nin(scalars(field, operand)?),
            "between" => {
                let mut bounds = scalars(field, operand)?;
                if bounds.len() != 2 {
                    return Err(FilterError::invalid(field, "`between` takes exactly two values"));
                }
                let hi = bounds.pop().unwrap_or(Value::Null);
                let lo = bounds.pop().unwrap_or(Value::Null);
                Predicate::Between(lo, hi)
            }
            "like" => Predicate::Like(pattern(field, operand)?),
            "nlike" => Predicate::NLike(pattern(field, operand)?),
            other => return Err(FilterError::UnknownOperator(other.to_string())),
        };
        Ok(pred)
    }
}

fn scalar(field: &str, v: Value, allow_null: bool) -> Result<Value, FilterError> {
    match v {
        Value::Array(_) | Value::Object(_) => Err(FilterError::invalid(field, "expected a scalar")),
        Value::Null if !allow_null => Err(FilterError::invalid(field, "null is only allowed with `eq` / `neq`")),
        v => Ok(v),
    }
}

fn scalars(field: &str, v: Value) -> Result<Vec<Value>, FilterError> {
    match v {
        Value::Array(items) => items.into_iter().map(|i| scalar(field, i, false)).collect(),
        _ => Err(FilterError::invalid(field, "expected an array")),
    }
}

fn pattern(field: &str, v: Value) -> Result<String, FilterError> {
    match v {
        Value::String(s) => Ok(s),
        _ => Err(FilterError::invalid(field, "pattern must be a string")),
    }
}

impl Where {
    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { clauses: vec![Clause::Field { field: field.into(), predicate: Predicate::Eq(value.into()) }] }
    }

    /// Conjunction of `self` and `other`.
    pub fn and(mut self, other: Where) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn from_json_str(s: &str) -> Result<Self, FilterError> {
        let v: Value = serde_json::from_str(s).map_err(|e| FilterError::Malformed(e.to_string()))?;
        Self::try_from(v)
    }

    /// Rewrite every predicate value with `f`, keeping the structure.
    pub(crate) fn try_map_values<F>(&self, f: &mut F) -> Result<Where, FilterError>
    where
        F: FnMut(&str, &Value) -> Result<Value, FilterError>,
    {
        let mut clauses = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            let mapped = match clause {
                Clause::And(items) => Clause::And(map_all(items, f)?),
                Clause::Or(items) => Clause::Or(map_all(items, f)?),
                Clause::Field { field, predicate } => Clause::Field {
                    field: field.clone(),
                    predicate: map_predicate(field, predicate, f)?,
                },
            };
            clauses.push(mapped);
        }
        Ok(Where { clauses })
    }
}

fn map_all<F>(items: &[Where], f: &mut F) -> Result<Vec<Where>, FilterError>
where
    F: FnMut(&str, &Value) -> Result<Value, FilterError>,
{
    let mut out = Vec::with_capacity(items.len());
    for w in items {
        out.push(w.try_map_values(f)?);
    }
    Ok(out)
}

fn map_predicate<F>(field: &str, predicate: &Predicate, f: &mut F) -> Result<Predicate, FilterError>
where
    F: FnMut(&str, &Value) -> Result<Value, FilterError>,
{
    let mut one = |v: &Value| f(field, v);
    let mapped = match predicate {
        Predicate::Eq(v) => Predicate::Eq(one(v)?),
        Predicate::Neq(v) => Predicate::Neq(one(v)?),
        Predicate::Gt(v) => Predicate::Gt(one(v)?),
        Predicate::Gte(v) => Predicate::Gte(one(v)?),
        Predicate::Lt(v) => Predicate::Lt(one(v)?),
        Predicate::Lte(v) => Predicate::Lte(one(v)?),
        Predicate::Inq(vs) => Predicate::Inq(vs.iter().map(|v| one(v)).collect::<Result<_, _>>()?),
        Predicate::Nin(vs) => Predicate::Nin(vs.iter().map(|v| one(v)).collect::<Result<_, _>>()?),
        Predicate::Between(lo, hi) => {
            let lo = one(lo)?;
            Predicate::Between(lo, one(hi)?)
        }
        Predicate::Like(p) => Predicate::Like(p.clone()),
        Predicate::NLike(p) => Predicate::NLike(p.clone()),
    };
    Ok(mapped)
}

impl TryFrom<Value> for Where {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Null => return Ok(Where::default()),
            _ => return Err(FilterError::Malformed("`where` must be an object".into())),
        };
        let mut clauses = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            let clause = match key.as_str() {
                "and" => Clause::And(nested(&key, value)?),
                "or" => Clause::Or(nested(&key, value)?),
                _ => {
                    let predicate = Predicate::parse(&key, value)?;
                    Clause::Field { field: key, predicate }
                }
            };
            clauses.push(clause);
        }
        Ok(Where { clauses })
    }
}

fn nested(key: &str, value: Value) -> Result<Vec<Where>, FilterError> {
    let Value::Array(items) = value else {
        return Err(FilterError::Malformed(format!("`{key}` must be an array")));
    };
    if items.is_empty() {
        return Err(FilterError::Malformed(format!("`{key}` must not be empty")));
    }
    items.into_iter().map(Where::try_from).collect()
}

/// Field selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum Fields {
    /// Keep only these.
    Only(Vec<String>),
    /// Keep everything but these.
    Except(Vec<String>),
}

impl Fields {
    pub fn names(&self) -> &[String] {
        match self {
            Fields::Only(n) | Fields::Except(n) => n,
        }
    }

    /// Drop the keys of `record` that are not selected.
    pub fn apply(&self, record: &mut Map<String, Value>) {
        match self {
            Fields::Only(keep) => record.retain(|k, _| keep.iter().any(|f| f == k)),
            Fields::Except(drop) => record.retain(|k, _| !drop.iter().any(|f| f == k)),
        }
    }
}

impl TryFrom<Value> for Fields {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|i| match i {
                    Value::String(s) => Ok(s),
                    other => Err(FilterError::Malformed(format!("field name must be a string, got {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Fields::Only),
            Value::Object(obj) => {
                let mut keep = Vec::new();
                let mut drop = Vec::new();
                for (name, flag) in obj {
                    match flag {
                        Value::Bool(true) => keep.push(name),
                        Value::Bool(false) => drop.push(name),
                        other => return Err(FilterError::Malformed(format!("`fields.{name}` must be a boolean, got {other}"))),
                    }
                }
                if keep.is_empty() { Ok(Fields::Except(drop)) } else { Ok(Fields::Only(keep)) }
            }
            _ => Err(FilterError::Malformed("`fields` must be an array or an object".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: String,
    pub direction: Direction,
}

impl std::str::FromStr for OrderTerm {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let field = parts.next().ok_or_else(|| FilterError::InvalidOrder(s.to_string()))?;
        let direction = match parts.next().map(|d| d.to_ascii_uppercase()) {
            None => Direction::Asc,
            Some(d) if d == "ASC" => Direction::Asc,
            Some(d) if d == "DESC" => Direction::Desc,
            Some(_) => return Err(FilterError::InvalidOrder(s.to_string())),
        };
        if parts.next().is_some() {
            return Err(FilterError::InvalidOrder(s.to_string()));
        }
        Ok(OrderTerm { field: field.to_string(), direction })
    }
}

/// `"field DESC"` or `["a ASC", "b DESC"]`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "Value")]
pub struct OrderBy(pub Vec<OrderTerm>);

impl TryFrom<Value> for OrderBy {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(OrderBy(vec![s.parse()?])),
            Value::Array(items) => items
                .into_iter()
                .map(|i| match i {
                    Value::String(s) => s.parse(),
                    other => Err(FilterError::InvalidOrder(other.to_string())),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(OrderBy),
            other => Err(FilterError::InvalidOrder(other.to_string())),
        }
    }
}

/// One requested relation, with an optional filter applied to the related record.
#[derive(Debug, Clone, PartialEq)]
pub struct Inclusion {
    pub relation: String,
    pub scope: Option<Box<Filter>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "Value")]
pub struct Includes(pub Vec<Inclusion>);

impl Inclusion {
    fn parse(value: Value) -> Result<Self, FilterError> {
        match value {
            Value::String(relation) => Ok(Inclusion { relation, scope: None }),
            Value::Object(mut obj) => {
                let relation = match obj.remove("relation") {
                    Some(Value::String(r)) => r,
                    _ => return Err(FilterError::Malformed("`include` entries need a `relation` name".into())),
                };
                let scope = match obj.remove("scope") {
                    None | Some(Value::Null) => None,
                    Some(s) => Some(Box::new(Filter::try_from(s)?)),
                };
                if let Some(extra) = obj.keys().next() {
                    return Err(FilterError::Malformed(format!("unexpected key `{extra}` in `include`")));
                }
                Ok(Inclusion { relation, scope })
            }
            other => Err(FilterError::Malformed(format!("invalid `include` entry {other}"))),
        }
    }
}

impl TryFrom<Value> for Includes {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => items.into_iter().map(Inclusion::parse).collect::<Result<_, _>>().map(Includes),
            single => Ok(Includes(vec![Inclusion::parse(single)?])),
        }
    }
}

/// A full query: predicate plus projection, ordering, paging and inclusion.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    #[serde(rename = "where", default)]
    pub where_: Option<Where>,
    #[serde(default)]
    pub fields: Option<Fields>,
    #[serde(default)]
    pub order: Option<OrderBy>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default, alias = "offset")]
    pub skip: Option<u64>,
    #[serde(default)]
    pub include: Option<Includes>,
}

impl Filter {
    pub fn from_json_str(s: &str) -> Result<Self, FilterError> {
        serde_json::from_str(s).map_err(|e| FilterError::Malformed(e.to_string()))
    }

    pub fn with_where(mut self, w: Where) -> Self {
        self.where_ = Some(w);
        self
    }

    pub fn order_terms(&self) -> &[OrderTerm] {
        self.order.as_ref().map(|o| o.0.as_slice()).unwrap_or(&[])
    }

    pub fn inclusions(&self) -> &[Inclusion] {
        self.include.as_ref().map(|i| i.0.as_slice()).unwrap_or(&[])
    }

    /// Requested order with `id ASC` appended as the final tiebreak.
    pub fn order_with_tiebreak(&self, id: &str) -> Vec<OrderTerm> {
        let mut terms = self.order_terms().to_vec();
        if !terms.iter().any(|t| t.field == id) {
            terms.push(OrderTerm { field: id.to_string(), direction: Direction::Asc });
        }
        terms
    }
}

impl TryFrom<Value> for Filter {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(|e| FilterError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_means_equality_and_keys_are_anded() {
        let w = Where::try_from(json!({"lastname": "Lee", "customerid": null})).unwrap();
        assert_eq!(w.clauses().len(), 2);
        assert!(w.clauses().contains(&Clause::Field { field: "lastname".into(), predicate: Predicate::Eq(json!("Lee")) }));
        assert!(w.clauses().contains(&Clause::Field { field: "customerid".into(), predicate: Predicate::Eq(Value::Null) }));
    }

    #[test]
    fn operators_parse() {
        let w = Where::try_from(json!({"id": {"between": [1, 5]}})).unwrap();
        assert_eq!(w.clauses()[0], Clause::Field { field: "id".into(), predicate: Predicate::Between(json!(1), json!(5)) });

        let w = Where::try_from(json!({"or": [{"firstname": {"like": "A%"}}, {"id": {"inq": [1, 2]}}]})).unwrap();
        match &w.clauses()[0] {
            Clause::Or(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected clause {other:?}"),
        }
    }

    #[test]
    fn bad_operators_are_rejected() {
        assert_eq!(
            Where::try_from(json!({"id": {"regexp": "x"}})),
            Err(FilterError::UnknownOperator("regexp".into()))
        );
        assert!(matches!(Where::try_from(json!({"id": {"gt": 1, "lt": 3}})), Err(FilterError::InvalidValue { .. })));
        assert!(matches!(Where::try_from(json!({"id": {"between": [1]}})), Err(FilterError::InvalidValue { .. })));
        assert!(matches!(Where::try_from(json!({"id": [1, 2]})), Err(FilterError::InvalidValue { .. })));
        assert!(matches!(Where::try_from(json!({"id": {"gt": null}})), Err(FilterError::InvalidValue { .. })));
        assert!(matches!(Where::try_from(json!({"or": []})), Err(FilterError::Malformed(_))));
        assert!(matches!(Where::try_from(json!([1])), Err(FilterError::Malformed(_))));
    }

    #[test]
    fn full_filter_document() {
        let f = Filter::from_json_str(
            r#"{"where":{"id":{"gte":2}},"fields":{"email":false},"order":"lastname DESC",
                "limit":5,"offset":1,"include":["role",{"relation":"customer","scope":{"fields":["name"]}}]}"#,
        )
        .unwrap();
        assert_eq!(f.limit, Some(5));
        assert_eq!(f.skip, Some(1));
        assert_eq!(f.fields, Some(Fields::Except(vec!["email".into()])));
        assert_eq!(f.order_terms(), &[OrderTerm { field: "lastname".into(), direction: Direction::Desc }]);
        let inc = f.inclusions();
        assert_eq!(inc.len(), 2);
        assert_eq!(inc[0].relation, "role");
        assert_eq!(inc[1].scope.as_ref().and_then(|s| s.fields.clone()), Some(Fields::Only(vec!["name".into()])));
    }

    #[test]
    fn unknown_filter_keys_fail() {
        assert!(matches!(Filter::from_json_str(r#"{"wehre":{}}"#), Err(FilterError::Malformed(_))));
        assert!(matches!(Filter::from_json_str(r#"{"limit":-1}"#), Err(FilterError::Malformed(_))));
        assert!(matches!(Filter::from_json_str("not json"), Err(FilterError::Malformed(_))));
    }

    #[test]
    fn order_clause_parsing() {
        assert_eq!("id".parse::<OrderTerm>().unwrap().direction, Direction::Asc);
        assert_eq!("id desc".parse::<OrderTerm>().unwrap().direction, Direction::Desc);
        assert!("id sideways".parse::<OrderTerm>().is_err());
        assert!("id ASC extra".parse::<OrderTerm>().is_err());
    }

    #[test]
    fn fields_object_with_true_keeps_only_true() {
        let f = Fields::try_from(json!({"id": true, "email": false, "firstname": true})).unwrap();
        let mut rec = json!({"id": 1, "email": "a@b", "firstname": "Ann", "lastname": "Lee"}).as_object().cloned().unwrap();
        f.apply(&mut rec);
        assert_eq!(Value::Object(rec), json!({"id": 1, "firstname": "Ann"}));
    }

    #[test]
    fn and_merges_clauses() {
        let w = Where::eq("userid", 7).and(Where::try_from(json!({"name": "admin"})).unwrap());
        assert_eq!(w.clauses().len(), 2);
        assert!(Where::default().is_empty());
    }
}
