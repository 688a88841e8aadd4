//! The domain value model: a tagged union distinct from the generated
//! `pb::Value` wire message, per the `Value.value_type` oneof.
//!
//! `Value::from_proto`/`Value::into_proto` are the hand-written half of
//! the wire codec — the generated `prost` types do the byte-level framing,
//! this module does the byte-level-to-domain translation.

use std::collections::HashMap;

use crate::geo_point::GeoPoint;
use crate::pb;
use crate::timestamp::Timestamp;

/// A Firestore field value. Exactly one variant is ever held; there is no
/// "unset" state once a `Value` exists.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The `null` variant.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit float.
    Double(f64),
    /// A timestamp.
    Timestamp(Timestamp),
    /// A UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A document reference, stored as its canonical resource name.
    Reference(String),
    /// A geographic point.
    GeoPoint(GeoPoint),
    /// An ordered array. Distinguished from `Map`/`Null`; an empty array
    /// is a valid, non-null value.
    Array(Vec<Value>),
    /// A map, preserving insertion order on this side even though the
    /// wire's `map<string, Value>` does not guarantee it. An empty map is
    /// a valid, non-null value distinct from `Array(vec![])`.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Decode a generated `pb::Value` into the domain representation.
    ///
    /// A `Value` with no oneof arm set at all (which the public schema
    /// forbids but which a buggy client could still send) decodes to
    /// `Value::Null` rather than failing the whole request.
    pub fn from_proto(value: pb::Value) -> Value {
        use pb::value::ValueType;
        match value.value_type {
            None => Value::Null,
            Some(ValueType::NullValue(_)) => Value::Null,
            Some(ValueType::BooleanValue(b)) => Value::Bool(b),
            Some(ValueType::IntegerValue(i)) => Value::Integer(i),
            Some(ValueType::DoubleValue(d)) => Value::Double(d),
            Some(ValueType::TimestampValue(ts)) => Value::Timestamp(Timestamp::from_proto(ts)),
            Some(ValueType::StringValue(s)) => Value::String(s),
            Some(ValueType::BytesValue(b)) => Value::Bytes(b),
            Some(ValueType::ReferenceValue(r)) => Value::Reference(r),
            Some(ValueType::GeoPointValue(ll)) => Value::GeoPoint(GeoPoint::from_proto(ll)),
            Some(ValueType::ArrayValue(arr)) => {
                Value::Array(arr.values.into_iter().map(Value::from_proto).collect())
            }
            Some(ValueType::MapValue(map)) => Value::Map(map_from_proto(map)),
        }
    }

    /// Encode the domain representation back into a generated `pb::Value`.
    pub fn into_proto(self) -> pb::Value {
        use pb::value::ValueType;
        let value_type = match self {
            Value::Null => ValueType::NullValue(0),
            Value::Bool(b) => ValueType::BooleanValue(b),
            Value::Integer(i) => ValueType::IntegerValue(i),
            Value::Double(d) => ValueType::DoubleValue(d),
            Value::Timestamp(ts) => ValueType::TimestampValue(ts.into_proto()),
            Value::String(s) => ValueType::StringValue(s),
            Value::Bytes(b) => ValueType::BytesValue(b),
            Value::Reference(r) => ValueType::ReferenceValue(r),
            Value::GeoPoint(gp) => ValueType::GeoPointValue(gp.into_proto()),
            Value::Array(values) => ValueType::ArrayValue(pb::ArrayValue {
                values: values.into_iter().map(Value::into_proto).collect(),
            }),
            Value::Map(fields) => ValueType::MapValue(map_into_proto(fields)),
        };
        pb::Value {
            value_type: Some(value_type),
        }
    }

    /// Type-ordering rank, used to compare values of different variants:
    /// `null < bool < number < timestamp < string < bytes < reference <
    /// geo < array < map`.
    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) | Value::Double(_) => 2,
            Value::Timestamp(_) => 3,
            Value::String(_) => 4,
            Value::Bytes(_) => 5,
            Value::Reference(_) => 6,
            Value::GeoPoint(_) => 7,
            Value::Array(_) => 8,
            Value::Map(_) => 9,
        }
    }

    /// Compare two values per the query engine's ordering rules. Mixed
    /// int/double comparisons convert both sides to `f64`.
    pub fn compare(&self, other: &Value) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        use Value::*;

        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Integer(a), Double(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Double(a), Integer(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Timestamp(a), Timestamp(b)) => a.as_nanos().cmp(&b.as_nanos()),
            (String(a), String(b)) => a.cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (Reference(a), Reference(b)) => a.cmp(b),
            (GeoPoint(a), GeoPoint(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Array(a), Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Null, Null) => Ordering::Equal,
            (Map(_), Map(_)) => Ordering::Equal,
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// Descend into a dot-separated field path (`addr.city`), only
    /// descending through `Map` variants.
    pub fn get_path<'a>(&'a self, field_path: &str) -> Option<&'a Value> {
        let mut current = self;
        for segment in field_path.split('.') {
            match current {
                Value::Map(fields) => {
                    current = fields.iter().find(|(k, _)| k == segment).map(|(_, v)| v)?;
                }
                _ => return None,
            }
        }
        Some(current)
    }
}

fn map_from_proto(map: pb::MapValue) -> Vec<(String, Value)> {
    let mut fields: Vec<(String, Value)> = map
        .fields
        .into_iter()
        .map(|(k, v)| (k, Value::from_proto(v)))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
}

fn map_into_proto(fields: Vec<(String, Value)>) -> pb::MapValue {
    pb::MapValue {
        fields: fields
            .into_iter()
            .map(|(k, v)| (k, v.into_proto()))
            .collect::<HashMap<_, _>>(),
    }
}

/// Look up a (possibly dotted) field path in a document's top-level field
/// map, descending into nested `Map` values.
pub fn get_field<'a>(fields: &'a [(String, Value)], field_path: &str) -> Option<&'a Value> {
    let mut segments = field_path.split('.');
    let first = segments.next()?;
    let mut current = fields.iter().find(|(k, _)| k == first).map(|(_, v)| v)?;
    for segment in segments {
        match current {
            Value::Map(inner) => {
                current = inner.iter().find(|(k, _)| k == segment).map(|(_, v)| v)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_roundtrips() {
        let v = Value::Null;
        assert_eq!(Value::from_proto(v.clone().into_proto()), v);
    }

    #[test]
    fn empty_array_is_distinct_from_null_and_empty_map() {
        let arr = Value::Array(vec![]);
        let map = Value::Map(vec![]);
        assert_ne!(arr, Value::Null);
        assert_ne!(arr, map);
        assert_eq!(Value::from_proto(arr.clone().into_proto()), arr);
        assert_eq!(Value::from_proto(map.clone().into_proto()), map);
    }

    #[test]
    fn integer_roundtrips() {
        let v = Value::Integer(-42);
        assert_eq!(Value::from_proto(v.clone().into_proto()), v);
    }

    #[test]
    fn timestamp_roundtrips() {
        let v = Value::Timestamp(Timestamp {
            seconds: 1_700_000_000,
            nanos: 500_000_000,
        });
        assert_eq!(Value::from_proto(v.clone().into_proto()), v);
    }

    #[test]
    fn nested_array_of_maps_roundtrips() {
        let v = Value::Array(vec![Value::Map(vec![("a".to_string(), Value::Integer(1))])]);
        assert_eq!(Value::from_proto(v.clone().into_proto()), v);
    }

    #[test]
    fn type_ordering_follows_the_documented_rank() {
        assert_eq!(Value::Null.compare(&Value::Bool(false)), std::cmp::Ordering::Less);
        assert_eq!(
            Value::Bool(true).compare(&Value::Integer(0)),
            std::cmp::Ordering::Less
        );
        assert_eq!(
            Value::Integer(5).compare(&Value::Timestamp(Timestamp { seconds: 0, nanos: 0 })),
            std::cmp::Ordering::Less
        );
        assert_eq!(
            Value::String("a".into()).compare(&Value::Bytes(vec![])),
            std::cmp::Ordering::Less
        );
    }

    #[test]
    fn mixed_int_double_compares_numerically() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Double(2.0)),
            std::cmp::Ordering::Equal
        );
        assert_eq!(
            Value::Integer(1).compare(&Value::Double(1.5)),
            std::cmp::Ordering::Less
        );
    }

    #[test]
    fn get_path_descends_through_maps() {
        let fields = vec![(
            "addr".to_string(),
            Value::Map(vec![("city".to_string(), Value::String("NYC".into()))]),
        )];
        assert_eq!(
            get_field(&fields, "addr.city"),
            Some(&Value::String("NYC".into()))
        );
        assert_eq!(get_field(&fields, "addr.zip"), None);
        assert_eq!(get_field(&fields, "missing"), None);
    }
}
