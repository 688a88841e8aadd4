//! `Commit` write application: merge semantics, update masks, and field
//! transforms.

use crate::document::Document;
use crate::error::EmulatorError;
use crate::pb;
use crate::store::Store;
use crate::timestamp::Timestamp;
use crate::value::Value;

fn set_field(fields: &mut Vec<(String, Value)>, key: &str, value: Value) {
    if let Some(entry) = fields.iter_mut().find(|(k, _)| k == key) {
        entry.1 = value;
    } else {
        fields.push((key.to_string(), value));
    }
}

fn remove_field(fields: &mut Vec<(String, Value)>, key: &str) {
    fields.retain(|(k, _)| k != key);
}

/// Merge `new_fields` on top of `existing` (or an empty document),
/// honoring an optional update mask: when present, any masked field path
/// not re-supplied in `new_fields` is cleared from the result.
fn merge_fields(
    existing: Option<&[(String, Value)]>,
    new_fields: &[(String, Value)],
    update_mask: Option<&pb::DocumentMask>,
) -> Vec<(String, Value)> {
    let mut merged: Vec<(String, Value)> = existing.map(|f| f.to_vec()).unwrap_or_default();
    for (k, v) in new_fields {
        set_field(&mut merged, k, v.clone());
    }
    if let Some(mask) = update_mask {
        for field_path in &mask.field_paths {
            if !new_fields.iter().any(|(k, _)| k == field_path) {
                remove_field(&mut merged, field_path);
            }
        }
    }
    merged
}

fn apply_field_transform(
    fields: &mut Vec<(String, Value)>,
    transform: &pb::document_transform::FieldTransform,
    now: Timestamp,
) -> Value {
    use pb::document_transform::field_transform::TransformType;
    let result = match &transform.transform_type {
        Some(TransformType::SetToServerValue(_)) => Value::Timestamp(now),
        Some(TransformType::Increment(v)) => {
            let delta = Value::from_proto(v.clone());
            let current = fields
                .iter()
                .find(|(k, _)| *k == transform.field_path)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Integer(0));
            numeric_add(&current, &delta)
        }
        Some(TransformType::Maximum(v)) => {
            let candidate = Value::from_proto(v.clone());
            let current = fields
                .iter()
                .find(|(k, _)| *k == transform.field_path)
                .map(|(_, v)| v.clone());
            match current {
                Some(c) if c.compare(&candidate) == std::cmp::Ordering::Greater => c,
                _ => candidate,
            }
        }
        Some(TransformType::Minimum(v)) => {
            let candidate = Value::from_proto(v.clone());
            let current = fields
                .iter()
                .find(|(k, _)| *k == transform.field_path)
                .map(|(_, v)| v.clone());
            match current {
                Some(c) if c.compare(&candidate) == std::cmp::Ordering::Less => c,
                _ => candidate,
            }
        }
        Some(TransformType::AppendMissingElements(arr)) => {
            let to_append: Vec<Value> = arr.values.clone().into_iter().map(Value::from_proto).collect();
            let mut current = match fields.iter().find(|(k, _)| *k == transform.field_path) {
                Some((_, Value::Array(items))) => items.clone(),
                _ => Vec::new(),
            };
            for item in to_append {
                if !current.iter().any(|existing| existing.compare(&item) == std::cmp::Ordering::Equal) {
                    current.push(item);
                }
            }
            Value::Array(current)
        }
        Some(TransformType::RemoveAllFromArray(arr)) => {
            let to_remove: Vec<Value> = arr.values.clone().into_iter().map(Value::from_proto).collect();
            let current = match fields.iter().find(|(k, _)| *k == transform.field_path) {
                Some((_, Value::Array(items))) => items.clone(),
                _ => Vec::new(),
            };
            Value::Array(
                current
                    .into_iter()
                    .filter(|item| !to_remove.iter().any(|r| r.compare(item) == std::cmp::Ordering::Equal))
                    .collect(),
            )
        }
        None => Value::Null,
    };
    set_field(fields, &transform.field_path, result.clone());
    result
}

fn numeric_add(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Value::Integer(x + y),
        (Value::Double(x), Value::Double(y)) => Value::Double(x + y),
        (Value::Integer(x), Value::Double(y)) => Value::Double(*x as f64 + y),
        (Value::Double(x), Value::Integer(y)) => Value::Double(x + *y as f64),
        _ => b.clone(),
    }
}

/// Apply a single `Write` to the store, returning its `WriteResult`.
pub fn apply_write(store: &Store, write: pb::Write) -> Result<pb::WriteResult, EmulatorError> {
    let now = Timestamp::now();
    match write.operation {
        Some(pb::write::Operation::Update(doc)) => {
            let parsed = crate::path::parse_document_path(&doc.name)?;
            let new_fields: Vec<(String, Value)> = doc
                .fields
                .into_iter()
                .map(|(k, v)| (k, Value::from_proto(v)))
                .collect();
            let existing = store.get(
                &parsed.project_id,
                &parsed.database_id,
                &parsed.collection_path,
                &parsed.doc_id,
            );
            let mut merged = merge_fields(
                existing.as_ref().map(|d| d.fields.as_slice()),
                &new_fields,
                write.update_mask.as_ref(),
            );

            let mut transform_results = Vec::new();
            for transform in &write.update_transforms {
                transform_results.push(apply_field_transform(&mut merged, transform, now).into_proto());
            }

            let create_time = existing.map(|d| d.create_time).unwrap_or(now);
            let new_doc = Document {
                name: doc.name,
                fields: merged,
                create_time,
                update_time: now,
            };
            store.set(
                &parsed.project_id,
                &parsed.database_id,
                &parsed.collection_path,
                &parsed.doc_id,
                new_doc,
            );
            Ok(pb::WriteResult {
                update_time: Some(now.into_proto()),
                transform_results,
            })
        }
        Some(pb::write::Operation::Delete(name)) => {
            let parsed = crate::path::parse_document_path(&name)?;
            store.delete(
                &parsed.project_id,
                &parsed.database_id,
                &parsed.collection_path,
                &parsed.doc_id,
            );
            Ok(pb::WriteResult {
                update_time: Some(now.into_proto()),
                transform_results: vec![],
            })
        }
        Some(pb::write::Operation::Transform(transform)) => {
            let parsed = crate::path::parse_document_path(&transform.document)?;
            let existing = store.get(
                &parsed.project_id,
                &parsed.database_id,
                &parsed.collection_path,
                &parsed.doc_id,
            );
            let mut fields = existing
                .as_ref()
                .map(|d| d.fields.clone())
                .unwrap_or_default();
            let create_time = existing.map(|d| d.create_time).unwrap_or(now);

            let mut transform_results = Vec::new();
            for field_transform in &transform.field_transforms {
                transform_results
                    .push(apply_field_transform(&mut fields, field_transform, now).into_proto());
            }

            store.set(
                &parsed.project_id,
                &parsed.database_id,
                &parsed.collection_path,
                &parsed.doc_id,
                Document {
                    name: transform.document,
                    fields,
                    create_time,
                    update_time: now,
                },
            );
            Ok(pb::WriteResult {
                update_time: Some(now.into_proto()),
                transform_results,
            })
        }
        None => Err(EmulatorError::invalid_argument("write has no operation set")),
    }
}
