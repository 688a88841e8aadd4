//! Parsing and building of Firestore resource names.
//!
//! `projects/{projectId}/databases/{databaseId}/documents/{collectionPath}/{docId}`
//! Pure functions, no I/O — the store and the RPC handlers both go through
//! here rather than splitting strings themselves.

use crate::error::EmulatorError;

/// A parsed document resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    /// `projectId`.
    pub project_id: String,
    /// `databaseId`, normalized so `default` and `(default)` compare equal.
    pub database_id: String,
    /// Slash-joined segments between `documents/` and the document id.
    pub collection_path: String,
    /// The final path segment.
    pub doc_id: String,
}

/// A parsed collection (or collection-group-free parent) resource name,
/// i.e. everything up to but not including a document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentPath {
    /// `projectId`.
    pub project_id: String,
    /// `databaseId`, normalized.
    pub database_id: String,
    /// `databaseId` exactly as it appeared in the resource name, e.g.
    /// `"default"` rather than the normalized `"(default)"`. Use this, not
    /// `database_id`, when echoing a resource name back to the caller.
    pub raw_database_id: String,
    /// Slash-joined segments under `documents/`, possibly empty (the
    /// database root).
    pub collection_path: String,
}

/// Normalize a database id: `"default"` and `"(default)"` denote the same
/// database.
pub fn normalize_database_id(database_id: &str) -> String {
    if database_id == "default" {
        "(default)".to_string()
    } else {
        database_id.to_string()
    }
}

/// Split a path into its `/`-separated segments, rejecting empty segments
/// (which would indicate a leading, trailing, or doubled slash).
fn segments(path: &str) -> Result<Vec<&str>, EmulatorError> {
    if path.is_empty() {
        return Err(EmulatorError::invalid_argument("empty resource path"));
    }
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|s| s.is_empty()) {
        return Err(EmulatorError::invalid_argument(format!(
            "malformed resource path: {path}"
        )));
    }
    Ok(parts)
}

/// Locate `projects`, `{projectId}`, `databases`, `{databaseId}`,
/// `documents` at the front of `parts` and return the remaining segments
/// (the part of the path under `documents/`, possibly empty).
fn split_documents_prefix<'a>(
    path: &str,
    parts: &'a [&'a str],
) -> Result<(String, String, String, &'a [&'a str]), EmulatorError> {
    match parts {
        ["projects", project_id, "databases", database_id, "documents", rest @ ..] => Ok((
            project_id.to_string(),
            normalize_database_id(database_id),
            database_id.to_string(),
            rest,
        )),
        _ => Err(EmulatorError::invalid_argument(format!(
            "resource path must match projects/{{p}}/databases/{{d}}/documents/..., got: {path}"
        ))),
    }
}

/// Parse a full document resource name.
pub fn parse_document_path(path: &str) -> Result<DocumentPath, EmulatorError> {
    let parts = segments(path)?;
    let (project_id, database_id, _raw_database_id, rest) = split_documents_prefix(path, &parts)?;
    if rest.len() < 2 {
        return Err(EmulatorError::invalid_argument(format!(
            "document path must have at least one collection and a document id, got: {path}"
        )));
    }
    let (doc_id, collection_segments) = rest.split_last().expect("checked len >= 2 above");
    Ok(DocumentPath {
        project_id,
        database_id,
        collection_path: collection_segments.join("/"),
        doc_id: doc_id.to_string(),
    })
}

/// Parse a parent resource name: either the documents root or a
/// (sub)collection path, i.e. any path under `documents/` including the
/// empty one.
pub fn parse_parent_path(path: &str) -> Result<ParentPath, EmulatorError> {
    let parts = segments(path)?;
    let (project_id, database_id, raw_database_id, rest) = split_documents_prefix(path, &parts)?;
    Ok(ParentPath {
        project_id,
        database_id,
        raw_database_id,
        collection_path: rest.join("/"),
    })
}

/// Build the canonical resource name for a document.
pub fn build_document_name(
    project_id: &str,
    database_id: &str,
    collection_path: &str,
    doc_id: &str,
) -> String {
    format!(
        "projects/{project_id}/databases/{database_id}/documents/{collection_path}/{doc_id}"
    )
}

/// Join a parent's collection path with a trailing collection id, the way
/// `RunQuery`/`ListDocuments` resolve `parent` + `collectionId` into the
/// full collection path to look up in the store.
pub fn join_collection(parent_collection_path: &str, collection_id: &str) -> String {
    if parent_collection_path.is_empty() {
        collection_id.to_string()
    } else {
        format!("{parent_collection_path}/{collection_id}")
    }
}
