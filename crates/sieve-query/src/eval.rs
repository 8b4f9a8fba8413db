use std::cmp::Ordering;
use std::collections::HashMap;

use sieve_codec::Value;

use crate::compare::{compare, values_equal};
use crate::expression::{Condition, Expression, Filter};

/// Values collected for one evaluation, keyed by normalized path.
pub type ValueMap = HashMap<String, Value>;

impl Filter {
    /// Evaluate against the values gathered for this filter's paths.
    /// Paths absent from `values` count as missing fields.
    pub fn matches(&self, values: &ValueMap) -> bool {
        self.expression.matches(values)
    }
}

impl Expression {
    pub fn matches(&self, values: &ValueMap) -> bool {
        match self {
            Expression::And(children) => children.iter().all(|c| c.matches(values)),
            Expression::Or(children) => children.iter().any(|c| c.matches(values)),
            Expression::Field { path, conditions } => {
                let value = values.get(path);
                conditions.iter().all(|c| c.matches(value))
            }
            Expression::Unsupported(_) => false,
        }
    }
}

impl Condition {
    /// A missing field satisfies only `$ne` and `$nin`.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return matches!(self, Condition::Ne(_) | Condition::Nin(_));
        };
        match self {
            Condition::Eq(operand) => values_equal(value, operand),
            Condition::Ne(operand) => !values_equal(value, operand),
            Condition::Gt(operand) => compare(value, operand) == Some(Ordering::Greater),
            Condition::Gte(operand) => matches!(
                compare(value, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(operand) => compare(value, operand) == Some(Ordering::Less),
            Condition::Lte(operand) => matches!(
                compare(value, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::In(list) => list.iter().any(|v| values_equal(value, v)),
            Condition::Nin(list) => !list.iter().any(|v| values_equal(value, v)),
            Condition::Regex(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Condition::Unsupported(_) => false,
        }
    }
}
