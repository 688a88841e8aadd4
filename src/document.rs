//! The domain `Document` type and its conversion to/from the generated
//! `pb::Document` message.

use crate::pb;
use crate::timestamp::Timestamp;
use crate::value::Value;

/// A Firestore document: a canonical name, its fields, and two
/// timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// `projects/{p}/databases/{d}/documents/{collectionPath}/{docId}`.
    pub name: String,
    /// The document's fields, insertion-ordered.
    pub fields: Vec<(String, Value)>,
    /// Set at first creation, preserved across updates.
    pub create_time: Timestamp,
    /// Refreshed on every write.
    pub update_time: Timestamp,
}

impl Document {
    /// Look up a top-level or dotted field path.
    pub fn get(&self, field_path: &str) -> Option<&Value> {
        crate::value::get_field(&self.fields, field_path)
    }

    /// Set a top-level field, replacing it if already present.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        if let Some(existing) = self.fields.iter_mut().find(|(k, _)| *k == field) {
            existing.1 = value;
        } else {
            self.fields.push((field, value));
        }
    }

    /// Remove a top-level field, if present.
    pub fn remove(&mut self, field: &str) {
        self.fields.retain(|(k, _)| k != field);
    }

    /// Decode a generated `pb::Document`.
    pub fn from_proto(doc: pb::Document) -> Document {
        let mut fields: Vec<(String, Value)> = doc
            .fields
            .into_iter()
            .map(|(k, v)| (k, Value::from_proto(v)))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        Document {
            name: doc.name,
            fields,
            create_time: doc
                .create_time
                .map(Timestamp::from_proto)
                .unwrap_or_else(Timestamp::now),
            update_time: doc
                .update_time
                .map(Timestamp::from_proto)
                .unwrap_or_else(Timestamp::now),
        }
    }

    /// Encode into a generated `pb::Document`.
    pub fn into_proto(self) -> pb::Document {
        pb::Document {
            name: self.name,
            fields: self
                .fields
                .into_iter()
                .map(|(k, v)| (k, v.into_proto()))
                .collect(),
            create_time: Some(self.create_time.into_proto()),
            update_time: Some(self.update_time.into_proto()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document {
            name: "projects/p/databases/(default)/documents/users/u1".to_string(),
            fields: vec![("name".to_string(), Value::String("Alice".into()))],
            create_time: Timestamp::now(),
            update_time: Timestamp::now(),
        }
    }

    #[test]
    fn roundtrips_through_proto() {
        let d = doc();
        let decoded = Document::from_proto(d.clone().into_proto());
        assert_eq!(decoded.name, d.name);
        assert_eq!(decoded.fields, d.fields);
    }

    #[test]
    fn set_replaces_existing_field() {
        let mut d = doc();
        d.set("name", Value::String("Bob".into()));
        assert_eq!(d.get("name"), Some(&Value::String("Bob".into())));
        assert_eq!(d.fields.len(), 1);
    }

    #[test]
    fn remove_drops_the_field() {
        let mut d = doc();
        d.remove("name");
        assert_eq!(d.get("name"), None);
    }
}
