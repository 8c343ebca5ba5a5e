//! Translate filters into sea-orm conditions and select modifiers.

use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, ColumnType, Condition, EntityTrait, IdenStatic, QueryFilter, QueryOrder, QuerySelect, Select,
    Value as DbValue,
};
use serde_json::Value;

use super::typed::column;
use super::{Clause, Direction, Filter, FilterError, Predicate, Where};

/// Build the `WHERE` condition for `w`. Values should already be normalized.
pub fn condition<E: EntityTrait>(w: &Where) -> Result<Condition, FilterError> {
    let mut all = Condition::all();
    for clause in w.clauses() {
        all = all.add(clause_condition::<E>(clause)?);
    }
    Ok(all)
}

fn clause_condition<E: EntityTrait>(clause: &Clause) -> Result<Condition, FilterError> {
    match clause {
        Clause::And(items) => {
            let mut cond = Condition::all();
            for w in items {
                cond = cond.add(condition::<E>(w)?);
            }
            Ok(cond)
        }
        Clause::Or(items) => {
            let mut cond = Condition::any();
            for w in items {
                cond = cond.add(condition::<E>(w)?);
            }
            Ok(cond)
        }
        Clause::Field { field, predicate } => {
            let col = column::<E>(field)?;
            let def = col.def();
            let ty = def.get_column_type();
            let v = |value: &Value| db_value(field, ty, value);
            let expr = match predicate {
                Predicate::Eq(Value::Null) => col.is_null(),
                Predicate::Neq(Value::Null) => col.is_not_null(),
                Predicate::Eq(x) => col.eq(v(x)?),
                Predicate::Neq(x) => col.ne(v(x)?),
                Predicate::Gt(x) => col.gt(v(x)?),
                Predicate::Gte(x) => col.gte(v(x)?),
                Predicate::Lt(x) => col.lt(v(x)?),
                Predicate::Lte(x) => col.lte(v(x)?),
                Predicate::Inq(xs) => col.is_in(xs.iter().map(v).collect::<Result<Vec<_>, _>>()?),
                // an empty list still excludes NULLs, like `<>` does
                Predicate::Nin(xs) if xs.is_empty() => col.is_not_null(),
                Predicate::Nin(xs) => col.is_not_in(xs.iter().map(v).collect::<Result<Vec<_>, _>>()?),
                Predicate::Between(lo, hi) => col.between(v(lo)?, v(hi)?),
                Predicate::Like(p) => col.like(p.as_str()),
                Predicate::NLike(p) => col.not_like(p.as_str()),
            };
            Ok(Condition::all().add(expr))
        }
    }
}

fn db_value(field: &str, ty: &ColumnType, v: &Value) -> Result<DbValue, FilterError> {
    let invalid = || FilterError::InvalidValue { field: field.to_string(), reason: format!("cannot bind {v}") };
    let out = match (ty, v) {
        (ColumnType::Date, Value::String(s)) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?.into()
        }
        (_, Value::String(s)) => s.clone().into(),
        (_, Value::Bool(b)) => (*b).into(),
        (_, Value::Number(n)) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().ok_or_else(invalid)?.into(),
        },
        _ => return Err(invalid()),
    };
    Ok(out)
}

/// Apply `where`, `order`, `limit` and `skip` to a select.
///
/// Ordering always ends with `id ASC` so paging is stable.
pub fn apply<E: EntityTrait>(mut select: Select<E>, filter: &Filter, id: E::Column) -> Result<Select<E>, FilterError> {
    if let Some(w) = &filter.where_ {
        select = select.filter(condition::<E>(w)?);
    }
    for term in filter.order_with_tiebreak(id.as_str()) {
        let col = column::<E>(&term.field)?;
        select = match term.direction {
            Direction::Asc => select.order_by_asc(col),
            Direction::Desc => select.order_by_desc(col),
        };
    }
    if let Some(limit) = filter.limit {
        select = select.limit(limit);
    }
    if let Some(skip) = filter.skip {
        select = select.offset(skip);
    }
    Ok(select)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::typed::normalize;
    use crate::user;
    use sea_orm::{DbBackend, QueryTrait};
    use serde_json::json;

    fn sql(v: Value) -> String {
        let f = normalize::<user::Entity>(&Filter::try_from(v).unwrap()).unwrap();
        apply(user::Entity::find(), &f, user::Column::Id)
            .unwrap()
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn where_clause_renders_operators() {
        let s = sql(json!({"where": {
            "lastname": "Lee",
            "email": null,
            "dob": {"gte": "1990-01-02"},
            "or": [{"firstname": {"like": "A%"}}, {"id": {"inq": [1, 2]}}]
        }}));
        assert!(s.contains(r#""users"."lastname" = 'Lee'"#), "{s}");
        assert!(s.contains(r#""users"."email" IS NULL"#), "{s}");
        assert!(s.contains(r#""users"."dob" >= '1990-01-02'"#), "{s}");
        assert!(s.contains(r#""users"."firstname" LIKE 'A%'"#), "{s}");
        assert!(s.contains(r#""users"."id" IN (1, 2)"#), "{s}");
        assert!(s.contains(" OR "), "{s}");
    }

    #[test]
    fn order_gets_id_tiebreak_and_paging() {
        let s = sql(json!({"order": "lastname DESC", "limit": 5, "skip": 1}));
        assert!(s.contains(r#"ORDER BY "users"."lastname" DESC, "users"."id" ASC"#), "{s}");
        assert!(s.contains("LIMIT 5"), "{s}");
        assert!(s.contains("OFFSET 1"), "{s}");
    }

    #[test]
    fn explicit_id_order_is_not_duplicated() {
        let s = sql(json!({"order": ["id DESC"]}));
        assert!(s.contains(r#"ORDER BY "users"."id" DESC"#), "{s}");
        assert!(!s.contains(r#""users"."id" ASC"#), "{s}");
    }
}
