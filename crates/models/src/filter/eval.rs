//! In-memory evaluation of normalized filters over serialized records.
//!
//! Semantics follow PostgreSQL: comparisons against NULL never match,
//! `ASC` sorts NULLs last and `DESC` sorts them first.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::{Clause, Direction, OrderTerm, Predicate, Where};

type Record = Map<String, Value>;

impl Where {
    /// Whether `record` satisfies every clause.
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses().iter().all(|c| clause_matches(c, record))
    }
}

fn clause_matches(clause: &Clause, record: &Record) -> bool {
    match clause {
        Clause::And(items) => items.iter().all(|w| w.matches(record)),
        Clause::Or(items) => items.iter().any(|w| w.matches(record)),
        Clause::Field { field, predicate } => {
            let value = record.get(field).unwrap_or(&Value::Null);
            predicate_matches(predicate, value)
        }
    }
}

fn predicate_matches(predicate: &Predicate, value: &Value) -> bool {
    if let Predicate::Eq(Value::Null) = predicate {
        return value.is_null();
    }
    if let Predicate::Neq(Value::Null) = predicate {
        return !value.is_null();
    }
    if value.is_null() {
        return false;
    }
    match predicate {
        Predicate::Eq(v) => equal(value, v),
        Predicate::Neq(v) => !equal(value, v),
        Predicate::Gt(v) => compare(value, v) == Some(Ordering::Greater),
        Predicate::Gte(v) => matches!(compare(value, v), Some(Ordering::Greater | Ordering::Equal)),
        Predicate::Lt(v) => compare(value, v) == Some(Ordering::Less),
        Predicate::Lte(v) => matches!(compare(value, v), Some(Ordering::Less | Ordering::Equal)),
        Predicate::Inq(vs) => vs.iter().any(|v| equal(value, v)),
        Predicate::Nin(vs) => !vs.iter().any(|v| v.is_null() || equal(value, v)),
        Predicate::Between(lo, hi) => {
            matches!(compare(value, lo), Some(Ordering::Greater | Ordering::Equal))
                && matches!(compare(value, hi), Some(Ordering::Less | Ordering::Equal))
        }
        Predicate::Like(p) => value.as_str().is_some_and(|s| like(p, s)),
        Predicate::NLike(p) => value.as_str().is_some_and(|s| !like(p, s)),
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}

/// Order two non-null scalars of the same JSON type.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

enum Token {
    Any,
    One,
    Lit(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '%' if matches!(out.last(), Some(Token::Any)) => continue,
            '%' => Token::Any,
            '_' => Token::One,
            // a trailing `\` matches itself
            '\\' => Token::Lit(chars.next().unwrap_or('\\')),
            c => Token::Lit(c),
        };
        out.push(token);
    }
    out
}

/// SQL `LIKE`: `%` matches any run, `_` one character, `\` escapes.
///
/// Single pass that backtracks only to the last `%`, so the cost is
/// bounded by `pattern.len() * text.len()`.
pub fn like(pattern: &str, text: &str) -> bool {
    let p = tokenize(pattern);
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // pattern index after the last `%`, and the text index it resumes from
    let mut resume: Option<(usize, usize)> = None;
    while ti < t.len() {
        match p.get(pi) {
            Some(Token::Any) => {
                pi += 1;
                resume = Some((pi, ti));
                continue;
            }
            Some(Token::One) => {
                pi += 1;
                ti += 1;
                continue;
            }
            Some(Token::Lit(c)) if *c == t[ti] => {
                pi += 1;
                ti += 1;
                continue;
            }
            _ => {}
        }
        match resume {
            Some((rp, rt)) => {
                pi = rp;
                ti = rt + 1;
                resume = Some((rp, rt + 1));
            }
            None => return false,
        }
    }
    p[pi..].iter().all(|tok| matches!(tok, Token::Any))
}

/// Stable sort of `records` by `terms`.
pub fn sort(records: &mut [Record], terms: &[OrderTerm]) {
    if terms.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for term in terms {
            let x = a.get(&term.field).unwrap_or(&Value::Null);
            let y = b.get(&term.field).unwrap_or(&Value::Null);
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                // nulls sort as the largest value
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => compare(x, y).unwrap_or(Ordering::Equal),
            };
            let ord = match term.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn w(v: Value) -> Where {
        Where::try_from(v).unwrap()
    }

    #[test]
    fn null_semantics_match_sql() {
        let r = rec(json!({"id": 1, "email": null}));
        assert!(w(json!({"email": null})).matches(&r));
        assert!(!w(json!({"email": {"neq": "x@y"}})).matches(&r));
        assert!(!w(json!({"email": {"nin": ["x@y"]}})).matches(&r));
        assert!(w(json!({"id": {"neq": null}})).matches(&r));
        // missing keys read as null
        assert!(w(json!({"phone": null})).matches(&r));
    }

    #[test]
    fn comparisons_and_ranges() {
        let r = rec(json!({"id": 5, "dob": "1990-05-01"}));
        assert!(w(json!({"id": {"gt": 4}})).matches(&r));
        assert!(!w(json!({"id": {"lt": 5}})).matches(&r));
        assert!(w(json!({"id": {"between": [5, 9]}})).matches(&r));
        assert!(w(json!({"dob": {"lte": "1990-12-31"}})).matches(&r));
        assert!(w(json!({"id": {"inq": [1, 5]}})).matches(&r));
        assert!(!w(json!({"id": {"nin": [5]}})).matches(&r));
    }

    #[test]
    fn boolean_combinators() {
        let r = rec(json!({"firstname": "Ann", "lastname": "Lee"}));
        assert!(w(json!({"or": [{"firstname": "Bob"}, {"lastname": "Lee"}]})).matches(&r));
        assert!(!w(json!({"and": [{"firstname": "Ann"}, {"lastname": "Kim"}]})).matches(&r));
        assert!(Where::default().matches(&r));
    }

    #[test]
    fn like_patterns() {
        assert!(like("A%", "Ann"));
        assert!(like("%n_", "Anna"));
        assert!(!like("A_", "Ann"));
        assert!(like("100\\%", "100%"));
        assert!(!like("100\\%", "1000"));
        assert!(like("%", ""));
        assert!(like("a%%b", "ab"));
        assert!(like("%a%b", "xaxab"));
        assert!(!like("%a%b", "xaxa"));
        assert!(like("a\\", "a\\"));
    }

    #[test]
    fn like_stays_linear_on_many_wildcards() {
        let text = "a".repeat(2_000);
        let started = std::time::Instant::now();
        assert!(!like("%a%a%a%a%a%a%a%a%b", &text));
        assert!(like("%a%a%a%a%a%a%a%a%", &text));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn sort_puts_nulls_last_ascending() {
        let mut rows = vec![
            rec(json!({"id": 1, "lastname": null})),
            rec(json!({"id": 2, "lastname": "Lee"})),
            rec(json!({"id": 3, "lastname": "Kim"})),
        ];
        sort(&mut rows, &["lastname ASC".parse::<OrderTerm>().unwrap()]);
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(3), json!(2), json!(1)]);

        sort(&mut rows, &["lastname DESC".parse::<OrderTerm>().unwrap()]);
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
    }
}
