use bson::RawDocument;
use regex::Regex;
use sieve_codec::{Document, Value};

use crate::error::QueryError;
use crate::expression::{Condition, Expression, Filter};
use crate::path::normalize_path;

impl Filter {
    /// Parse a BSON filter document.
    ///
    /// Follows MongoDB query shape:
    /// - the top-level document is an implicit AND of its entries
    /// - `{ "field": value }` is implicit `$eq`
    /// - `{ "field": { "$gt": v, "$lt": w } }` conjoins operators
    /// - `{ "$or": [...] }` / `{ "$and": [...] }` hold nested filters
    /// - `{ "field": { "$regex": "pattern", "$options": "i" } }`
    ///
    /// Unknown operators parse but never match.
    pub fn parse(doc: &RawDocument) -> Result<Self, QueryError> {
        let doc = Document::from_bytes(doc.as_bytes())?;
        Self::from_document(&doc)
    }

    pub fn from_document(doc: &Document) -> Result<Self, QueryError> {
        Ok(Self::from_expression(parse_expression(doc)?))
    }
}

fn parse_expression(doc: &Document) -> Result<Expression, QueryError> {
    let mut children = Vec::with_capacity(doc.len());
    for (key, value) in doc.iter() {
        let child = match key {
            "$and" => Expression::And(parse_logical_array(key, value)?),
            "$or" => Expression::Or(parse_logical_array(key, value)?),
            k if k.starts_with('$') => Expression::Unsupported(k.to_string()),
            _ => parse_field_condition(key, value)?,
        };
        children.push(child);
    }
    Ok(match <[Expression; 1]>::try_from(children) {
        Ok([only]) => only,
        Err(children) => Expression::And(children),
    })
}

fn parse_logical_array(op: &str, value: &Value) -> Result<Vec<Expression>, QueryError> {
    let Value::Array(items) = value else {
        return Err(QueryError::InvalidFilter(format!("{op} value must be an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Value::Document(sub) => parse_expression(sub),
            _ => Err(QueryError::InvalidFilter(format!(
                "{op} array elements must be documents"
            ))),
        })
        .collect()
}

/// A sub-document whose keys all start with `$` is an operator document;
/// any other value is an implicit `$eq`.
fn parse_field_condition(field: &str, value: &Value) -> Result<Expression, QueryError> {
    let path = normalize_path(field)?;
    let conditions = match value {
        Value::Document(sub) if !sub.is_empty() && sub.keys().all(|k| k.starts_with('$')) => {
            parse_operator_doc(sub)?
        }
        _ => vec![Condition::Eq(value.clone())],
    };
    Ok(Expression::Field { path, conditions })
}

fn parse_operator_doc(doc: &Document) -> Result<Vec<Condition>, QueryError> {
    let mut conditions = Vec::with_capacity(doc.len());
    let mut pattern: Option<(&str, &str)> = None;
    let mut options: Option<&str> = None;

    for (op, value) in doc.iter() {
        let condition = match op {
            "$eq" => Condition::Eq(value.clone()),
            "$ne" => Condition::Ne(value.clone()),
            "$gt" => Condition::Gt(value.clone()),
            "$gte" => Condition::Gte(value.clone()),
            "$lt" => Condition::Lt(value.clone()),
            "$lte" => Condition::Lte(value.clone()),
            "$in" => Condition::In(list_operand(op, value)?),
            "$nin" => Condition::Nin(list_operand(op, value)?),
            "$regex" => {
                pattern = Some(match value {
                    Value::String(s) => (s.as_str(), ""),
                    Value::Regex {
                        pattern: p,
                        options: o,
                    } => (p.as_str(), o.as_str()),
                    _ => {
                        return Err(QueryError::InvalidFilter(
                            "$regex value must be a string".into(),
                        ));
                    }
                });
                continue;
            }
            "$options" => {
                options = Some(value.as_str().ok_or_else(|| {
                    QueryError::InvalidFilter("$options value must be a string".into())
                })?);
                continue;
            }
            k => Condition::Unsupported(k.to_string()),
        };
        conditions.push(condition);
    }

    match (pattern, options) {
        (Some((pat, inline)), opts) => {
            conditions.push(Condition::Regex(build_regex(pat, opts.unwrap_or(inline))?))
        }
        (None, Some(_)) => {
            return Err(QueryError::InvalidFilter("$options without $regex".into()));
        }
        (None, None) => {}
    }
    Ok(conditions)
}

fn list_operand(op: &str, value: &Value) -> Result<Vec<Value>, QueryError> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(QueryError::InvalidFilter(format!("{op} value must be an array"))),
    }
}

/// Compile `pattern` with MongoDB-style flags folded into an inline group.
fn build_regex(pattern: &str, options: &str) -> Result<Regex, QueryError> {
    let full = if options.is_empty() {
        pattern.to_string()
    } else {
        let mut full = String::with_capacity(3 + options.len() + pattern.len());
        full.push_str("(?");
        for ch in options.chars() {
            match ch {
                'i' | 'm' | 's' | 'x' => full.push(ch),
                c => {
                    return Err(QueryError::InvalidFilter(format!("unknown regex option: {c}")));
                }
            }
        }
        full.push(')');
        full.push_str(pattern);
        full
    };
    Regex::new(&full).map_err(|source| QueryError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::rawdoc;

    fn parse(doc: &bson::RawDocumentBuf) -> Expression {
        Filter::parse(doc).unwrap().expression
    }

    #[test]
    fn bare_field_implicit_eq() {
        let expr = parse(&rawdoc! { "status": "active" });
        match expr {
            Expression::Field { path, conditions } => {
                assert_eq!(path, "status");
                assert!(matches!(&conditions[..], [Condition::Eq(Value::String(s))] if s == "active"));
            }
            _ => panic!("expected Field, got {expr:?}"),
        }
    }

    #[test]
    fn multiple_bare_fields_become_and() {
        let expr = parse(&rawdoc! { "status": "active", "age": 30_i32 });
        match expr {
            Expression::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0], Expression::Field { path, .. } if path == "status"));
                assert!(matches!(&children[1], Expression::Field { path, .. } if path == "age"));
            }
            _ => panic!("expected And"),
        }
    }

    #[test]
    fn operators_on_one_field_are_conjoined() {
        let expr = parse(&rawdoc! { "score": { "$gt": 50_i32, "$lte": 100_i32 } });
        match expr {
            Expression::Field { conditions, .. } => {
                assert!(matches!(
                    &conditions[..],
                    [Condition::Gt(Value::Int32(50)), Condition::Lte(Value::Int32(100))]
                ));
            }
            _ => panic!("expected Field"),
        }
    }

    #[test]
    fn nested_or_containing_and() {
        let expr = parse(&rawdoc! {
            "$or": [
                { "status": "active" },
                { "$and": [{ "score": { "$gt": 90_i32 } }, { "verified": true }] }
            ]
        });
        match expr {
            Expression::Or(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0], Expression::Field { .. }));
                assert!(matches!(&children[1], Expression::And(inner) if inner.len() == 2));
            }
            _ => panic!("expected Or"),
        }
    }

    #[test]
    fn empty_logical_arrays_parse() {
        assert!(matches!(parse(&rawdoc! { "$and": [] }), Expression::And(c) if c.is_empty()));
        assert!(matches!(parse(&rawdoc! { "$or": [] }), Expression::Or(c) if c.is_empty()));
    }

    #[test]
    fn in_and_nin_take_arrays() {
        let expr = parse(&rawdoc! { "k": { "$in": [1_i32, "x"], "$nin": [] } });
        match expr {
            Expression::Field { conditions, .. } => {
                assert!(matches!(&conditions[0], Condition::In(v) if v.len() == 2));
                assert!(matches!(&conditions[1], Condition::Nin(v) if v.is_empty()));
            }
            _ => panic!("expected Field"),
        }

        let err = Filter::parse(&rawdoc! { "k": { "$in": 1_i32 } }).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter(m) if m.contains("$in")));
    }

    #[test]
    fn regex_with_options() {
        let expr = parse(&rawdoc! { "name": { "$regex": "^john", "$options": "i" } });
        match expr {
            Expression::Field { conditions, .. } => match &conditions[..] {
                [Condition::Regex(re)] => assert_eq!(re.as_str(), "(?i)^john"),
                other => panic!("expected Regex, got {other:?}"),
            },
            _ => panic!("expected Field"),
        }
    }

    #[test]
    fn options_before_regex_still_apply() {
        let expr = parse(&rawdoc! { "name": { "$options": "mx", "$regex": "a b" } });
        match expr {
            Expression::Field { conditions, .. } => {
                assert!(matches!(&conditions[..], [Condition::Regex(re)] if re.as_str() == "(?mx)a b"));
            }
            _ => panic!("expected Field"),
        }
    }

    #[test]
    fn regex_errors() {
        let err = Filter::parse(&rawdoc! { "name": { "$regex": "[invalid" } }).unwrap_err();
        assert!(matches!(err, QueryError::InvalidRegex { .. }), "{err}");

        let err = Filter::parse(&rawdoc! { "name": { "$regex": 5_i32 } }).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter(_)), "{err}");

        let err = Filter::parse(&rawdoc! { "name": { "$regex": "a", "$options": "u" } }).unwrap_err();
        assert!(err.to_string().contains("unknown regex option"), "{err}");

        let err = Filter::parse(&rawdoc! { "name": { "$options": "i" } }).unwrap_err();
        assert!(err.to_string().contains("$options without $regex"), "{err}");
    }

    #[test]
    fn unknown_operators_parse_as_unsupported() {
        let expr = parse(&rawdoc! { "age": { "$between": 10_i32 } });
        assert!(matches!(
            expr,
            Expression::Field { conditions, .. }
                if matches!(&conditions[..], [Condition::Unsupported(op)] if op == "$between")
        ));

        let expr = parse(&rawdoc! { "$nor": [{ "a": 1_i32 }] });
        assert!(matches!(expr, Expression::Unsupported(op) if op == "$nor"));
    }

    #[test]
    fn mixed_sub_document_is_an_equality_value() {
        let expr = parse(&rawdoc! { "address": { "$city": "Austin", "state": "TX" } });
        assert!(matches!(
            expr,
            Expression::Field { conditions, .. } if matches!(&conditions[..], [Condition::Eq(Value::Document(_))])
        ));
    }

    #[test]
    fn logical_shape_errors() {
        let err = Filter::parse(&rawdoc! { "$and": { "a": 1_i32 } }).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter(_)));

        let err = Filter::parse(&rawdoc! { "$or": [1_i32] }).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter(_)));
    }

    #[test]
    fn field_paths_are_normalized_and_indexed() {
        let filter = Filter::parse(&rawdoc! {
            "items[0].qty": { "$gt": 1_i32 },
            "$or": [{ "name": "x" }, { "items.0.qty": 3_i32 }],
        })
        .unwrap();
        assert_eq!(filter.paths(), ["items.0.qty", "name"]);
        assert!(filter.index().get("items.0.qty").unwrap().is_terminal());

        let err = Filter::parse(&rawdoc! { "a..b": 1_i32 }).unwrap_err();
        assert!(matches!(err, QueryError::InvalidPath { .. }));
    }

    #[test]
    fn from_document_matches_parse() {
        let doc = Document::new().with("age", Document::new().with("$gte", 21_i32));
        let filter = Filter::from_document(&doc).unwrap();
        assert_eq!(filter.paths(), ["age"]);
    }
}
