//! The filter / order / pagination / aggregation engine.
//!
//! Operates directly on the generated `pb::StructuredQuery` and
//! `pb::StructuredAggregationQuery` types — there is no intermediate
//! query DSL, since the server has nothing to express beyond what it
//! already received on the wire.

use std::collections::HashMap;

use crate::document::Document;
use crate::error::EmulatorError;
use crate::pb;
use crate::pb::structured_query::field_filter::Operator as FieldOp;
use crate::pb::structured_query::filter::FilterType;
use crate::pb::structured_query::unary_filter::Operator as UnaryOp;
use crate::pb::structured_query::Direction;
use crate::value::Value;

const NAME_FIELD: &str = "__name__";

fn field_value<'a>(doc: &'a Document, field_path: &str) -> Option<std::borrow::Cow<'a, Value>> {
    if field_path == NAME_FIELD {
        Some(std::borrow::Cow::Owned(Value::Reference(doc.name.clone())))
    } else {
        doc.get(field_path).map(std::borrow::Cow::Borrowed)
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a.compare(b) == std::cmp::Ordering::Equal
}

fn matches_field_filter(doc: &Document, filter: &pb::structured_query::FieldFilter) -> bool {
    let Some(field_ref) = &filter.field else {
        return false;
    };
    let probe = filter.value.clone().map(Value::from_proto).unwrap_or(Value::Null);
    let field = field_value(doc, &field_ref.field_path);

    let op = FieldOp::try_from(filter.op).unwrap_or(FieldOp::Unspecified);
    match op {
        FieldOp::Equal => field.map(|v| values_equal(&v, &probe)).unwrap_or(false),
        FieldOp::NotEqual => field.map(|v| !values_equal(&v, &probe)).unwrap_or(true),
        FieldOp::LessThan => field
            .map(|v| v.compare(&probe) == std::cmp::Ordering::Less)
            .unwrap_or(false),
        FieldOp::LessThanOrEqual => field
            .map(|v| v.compare(&probe) != std::cmp::Ordering::Greater)
            .unwrap_or(false),
        FieldOp::GreaterThan => field
            .map(|v| v.compare(&probe) == std::cmp::Ordering::Greater)
            .unwrap_or(false),
        FieldOp::GreaterThanOrEqual => field
            .map(|v| v.compare(&probe) != std::cmp::Ordering::Less)
            .unwrap_or(false),
        FieldOp::ArrayContains => match field.as_deref() {
            Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, &probe)),
            _ => false,
        },
        FieldOp::In => match (&field, &probe) {
            (Some(v), Value::Array(candidates)) => {
                candidates.iter().any(|c| values_equal(v.as_ref(), c))
            }
            _ => false,
        },
        FieldOp::ArrayContainsAny => match (field.as_deref(), &probe) {
            (Some(Value::Array(items)), Value::Array(candidates)) => items
                .iter()
                .any(|item| candidates.iter().any(|c| values_equal(item, c))),
            _ => false,
        },
        FieldOp::NotIn => match (&field, &probe) {
            (Some(v), Value::Array(candidates)) => {
                !candidates.iter().any(|c| values_equal(v.as_ref(), c))
            }
            _ => false,
        },
        FieldOp::Unspecified => false,
    }
}

fn matches_unary_filter(doc: &Document, filter: &pb::structured_query::UnaryFilter) -> bool {
    let field_path = match &filter.operand_type {
        Some(pb::structured_query::unary_filter::OperandType::Field(f)) => &f.field_path,
        _ => return false,
    };
    let field = field_value(doc, field_path);
    let op = UnaryOp::try_from(filter.op).unwrap_or(UnaryOp::Unspecified);
    match op {
        UnaryOp::IsNull => matches!(field.as_deref(), Some(Value::Null)),
        UnaryOp::IsNotNull => matches!(field.as_deref(), Some(v) if *v != Value::Null),
        UnaryOp::IsNan => matches!(field.as_deref(), Some(Value::Double(d)) if d.is_nan()),
        UnaryOp::IsNotNan => {
            matches!(field.as_deref(), Some(v) if !matches!(v, Value::Double(d) if d.is_nan()))
        }
        UnaryOp::Unspecified => false,
    }
}

fn matches_filter(doc: &Document, filter: &pb::structured_query::Filter) -> bool {
    match &filter.filter_type {
        None => true,
        Some(FilterType::FieldFilter(f)) => matches_field_filter(doc, f),
        Some(FilterType::UnaryFilter(f)) => matches_unary_filter(doc, f),
        Some(FilterType::CompositeFilter(composite)) => {
            use crate::pb::structured_query::composite_filter::Operator as CompositeOp;
            let op = CompositeOp::try_from(composite.op).unwrap_or(CompositeOp::Unspecified);
            match op {
                CompositeOp::Or => composite.filters.iter().any(|f| matches_filter(doc, f)),
                _ => composite.filters.iter().all(|f| matches_filter(doc, f)),
            }
        }
    }
}

fn order_key<'a>(doc: &'a Document, order: &pb::structured_query::Order) -> Option<std::borrow::Cow<'a, Value>> {
    let field_path = order.field.as_ref()?.field_path.as_str();
    field_value(doc, field_path)
}

fn apply_order(mut docs: Vec<Document>, order_by: &[pb::structured_query::Order]) -> Vec<Document> {
    docs.sort_by(|a, b| {
        for order in order_by {
            let direction = Direction::try_from(order.direction).unwrap_or(Direction::Ascending);
            let a_val = order_key(a, order);
            let b_val = order_key(b, order);
            let ord = match (a_val, b_val) {
                (Some(a), Some(b)) => a.compare(&b),
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            };
            let ord = if direction == Direction::Descending {
                ord.reverse()
            } else {
                ord
            };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
    docs
}

fn apply_pagination(docs: Vec<Document>, offset: i32, limit: Option<i32>) -> Vec<Document> {
    let offset = offset.max(0) as usize;
    let skipped: Vec<Document> = docs.into_iter().skip(offset).collect();
    match limit {
        Some(limit) if limit > 0 => skipped.into_iter().take(limit as usize).collect(),
        _ => skipped,
    }
}

/// Run a `StructuredQuery`'s filter/order/pagination pipeline over a
/// collection's documents.
pub fn execute(query: &pb::StructuredQuery, docs: Vec<Document>) -> Result<Vec<Document>, EmulatorError> {
    let filtered: Vec<Document> = match &query.r#where {
        Some(filter) => docs.into_iter().filter(|d| matches_filter(d, filter)).collect(),
        None => docs,
    };
    let ordered = apply_order(filtered, &query.order_by);
    Ok(apply_pagination(ordered, query.offset, query.limit))
}

/// Run an aggregation query: execute the inner `structured_query`'s full
/// pipeline, then reduce. `sum`/`avg` are documented stubs returning `0`
/// and `0.0` respectively.
pub fn aggregate(
    query: &pb::StructuredAggregationQuery,
    docs: Vec<Document>,
) -> Result<HashMap<String, Value>, EmulatorError> {
    let matched = match &query.query_type {
        Some(pb::structured_aggregation_query::QueryType::StructuredQuery(sq)) => {
            execute(sq, docs)?
        }
        None => {
            return Err(EmulatorError::invalid_argument(
                "RunAggregationQuery requires structured_query",
            ))
        }
    };

    let mut results = HashMap::new();
    for (idx, aggregation) in query.aggregations.iter().enumerate() {
        let alias = if aggregation.alias.is_empty() {
            format!("field_{}", idx + 1)
        } else {
            aggregation.alias.clone()
        };
        use pb::structured_aggregation_query::aggregation::Operator as AggOp;
        let value = match &aggregation.operator {
            Some(AggOp::Count(_)) => Value::Integer(matched.len() as i64),
            Some(AggOp::Sum(_)) => Value::Integer(0),
            Some(AggOp::Avg(_)) => Value::Double(0.0),
            None => Value::Integer(matched.len() as i64),
        };
        results.insert(alias, value);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;

    fn doc(name: &str, fields: Vec<(&str, Value)>) -> Document {
        Document {
            name: name.to_string(),
            fields: fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            create_time: Timestamp::now(),
            update_time: Timestamp::now(),
        }
    }

    fn field_filter(path: &str, op: FieldOp, value: Value) -> pb::structured_query::Filter {
        pb::structured_query::Filter {
            filter_type: Some(FilterType::FieldFilter(pb::structured_query::FieldFilter {
                field: Some(pb::structured_query::FieldReference {
                    field_path: path.to_string(),
                }),
                op: op as i32,
                value: Some(value.into_proto()),
            })),
        }
    }

    #[test]
    fn composite_and_matches_only_intersecting_docs() {
        let docs = vec![
            doc("a", vec![("a", Value::Integer(1)), ("b", Value::Integer(2))]),
            doc("b", vec![("a", Value::Integer(1)), ("b", Value::Integer(9))]),
            doc("c", vec![("a", Value::Integer(2)), ("b", Value::Integer(2))]),
        ];
        let query = pb::StructuredQuery {
            r#where: Some(pb::structured_query::Filter {
                filter_type: Some(FilterType::CompositeFilter(
                    pb::structured_query::CompositeFilter {
                        op: pb::structured_query::composite_filter::Operator::And as i32,
                        filters: vec![
                            field_filter("a", FieldOp::Equal, Value::Integer(1)),
                            field_filter("b", FieldOp::Equal, Value::Integer(2)),
                        ],
                    },
                )),
            }),
            ..Default::default()
        };
        let result = execute(&query, docs).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "a");
    }

    #[test]
    fn missing_field_fails_equal_but_passes_not_equal() {
        let docs = vec![doc("a", vec![])];
        let eq = execute(
            &pb::StructuredQuery {
                r#where: Some(field_filter("missing", FieldOp::Equal, Value::Integer(1))),
                ..Default::default()
            },
            docs.clone(),
        )
        .unwrap();
        assert!(eq.is_empty());

        let ne = execute(
            &pb::StructuredQuery {
                r#where: Some(field_filter("missing", FieldOp::NotEqual, Value::Integer(1))),
                ..Default::default()
            },
            docs,
        )
        .unwrap();
        assert_eq!(ne.len(), 1);
    }

    #[test]
    fn order_by_descending_reverses_order() {
        let docs = vec![
            doc("a", vec![("n", Value::Integer(1))]),
            doc("b", vec![("n", Value::Integer(3))]),
            doc("c", vec![("n", Value::Integer(2))]),
        ];
        let query = pb::StructuredQuery {
            order_by: vec![pb::structured_query::Order {
                field: Some(pb::structured_query::FieldReference {
                    field_path: "n".to_string(),
                }),
                direction: Direction::Descending as i32,
            }],
            ..Default::default()
        };
        let result = execute(&query, docs).unwrap();
        assert_eq!(
            result.iter().map(|d| d.name.clone()).collect::<Vec<_>>(),
            vec!["b", "c", "a"]
        );
    }

    #[test]
    fn offset_and_limit_clamp_negatives_to_zero() {
        let docs = (0..5)
            .map(|i| doc(&i.to_string(), vec![("n", Value::Integer(i))]))
            .collect::<Vec<_>>();
        let query = pb::StructuredQuery {
            offset: -5,
            limit: Some(-1),
            ..Default::default()
        };
        let result = execute(&query, docs).unwrap();
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn array_contains_requires_array_field() {
        let docs = vec![doc(
            "a",
            vec![(
                "items",
                Value::Array(vec![Value::String("x".into()), Value::String("y".into())]),
            )],
        )];
        let query = pb::StructuredQuery {
            r#where: Some(field_filter(
                "items",
                FieldOp::ArrayContains,
                Value::String("y".into()),
            )),
            ..Default::default()
        };
        assert_eq!(execute(&query, docs).unwrap().len(), 1);
    }

    #[test]
    fn count_aggregation_reflects_filtered_set() {
        let docs = vec![
            doc("a", vec![("n", Value::Integer(1))]),
            doc("b", vec![("n", Value::Integer(2))]),
        ];
        let query = pb::StructuredAggregationQuery {
            query_type: Some(pb::structured_aggregation_query::QueryType::StructuredQuery(
                pb::StructuredQuery {
                    r#where: Some(field_filter("n", FieldOp::Equal, Value::Integer(1))),
                    ..Default::default()
                },
            )),
            aggregations: vec![pb::structured_aggregation_query::Aggregation {
                operator: Some(
                    pb::structured_aggregation_query::aggregation::Operator::Count(
                        pb::structured_aggregation_query::aggregation::Count { up_to: None },
                    ),
                ),
                alias: "total".to_string(),
            }],
        };
        let result = aggregate(&query, docs).unwrap();
        assert_eq!(result.get("total"), Some(&Value::Integer(1)));
    }
}
