use regex::Regex;
use sieve_codec::Value;

use crate::index::PathIndex;

/// Parsed filter tree.
#[derive(Debug, Clone)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    /// All conditions must hold for the value at `path`.
    Field {
        path: String,
        conditions: Vec<Condition>,
    },
    /// A top-level `$` key with no meaning here. Never matches.
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Regex(Regex),
    /// Operator not recognized. Never matches.
    Unsupported(String),
}

/// A compiled filter: the expression tree plus an index of every path it
/// reads, so the engine can collect those values during its walk.
#[derive(Debug, Clone)]
pub struct Filter {
    pub(crate) expression: Expression,
    pub(crate) paths: Vec<String>,
    pub(crate) index: PathIndex,
}

impl Filter {
    pub(crate) fn from_expression(expression: Expression) -> Self {
        let mut paths = Vec::new();
        collect_paths(&expression, &mut paths);
        let index = PathIndex::new(&paths);
        Self {
            expression,
            paths,
            index,
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Normalized paths the filter reads, in first-reference order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }
}

fn collect_paths(expression: &Expression, out: &mut Vec<String>) {
    match expression {
        Expression::And(children) | Expression::Or(children) => {
            for child in children {
                collect_paths(child, out);
            }
        }
        Expression::Field { path, .. } => {
            if !out.contains(path) {
                out.push(path.clone());
            }
        }
        Expression::Unsupported(_) => {}
    }
}
