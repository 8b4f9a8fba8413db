use std::cmp::Ordering;

use sieve_codec::Value;

/// Order two values for the comparison operators.
///
/// Same-kind scalars use their natural order. Numbers of different kinds
/// compare as `f64`. Other same-kind values only answer equality, and
/// values of different kinds are neither equal nor ordered.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int32(x), Value::Int32(y)) => Some(x.cmp(y)),
        (Value::Int64(x), Value::Int64(y)) => Some(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        _ if a.is_number() && b.is_number() => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => {
            Some(x.timestamp_millis().cmp(&y.timestamp_millis()))
        }
        (Value::ObjectId(x), Value::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        _ if a.element_type() == b.element_type() => (a == b).then_some(Ordering::Equal),
        _ => None,
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}
