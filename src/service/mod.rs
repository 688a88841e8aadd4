//! RPC dispatch: one method per RPC grouped under a single
//! `FirestoreService`, implementing the generated server trait over a
//! shared store and config.

mod commit;
mod stubs;

use std::pin::Pin;
use std::sync::Arc;

use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status};

use crate::config::Config;
use crate::document::Document;
use crate::error::EmulatorError;
use crate::path;
use crate::pb;
use crate::pb::firestore_server::Firestore;
use crate::store::Store;
use crate::timestamp::Timestamp;

/// Implements `google.firestore.v1.Firestore` over an in-memory [`Store`].
pub struct FirestoreService {
    store: Arc<Store>,
    config: Arc<Config>,
}

impl FirestoreService {
    /// Build a service sharing the given store and config.
    pub fn new(store: Arc<Store>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    fn log_request(&self, method: &str) {
        if self.config.verbose_grpc_logs {
            tracing::debug!(method, "handling request");
        }
    }
}

type BoxStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

#[tonic::async_trait]
impl Firestore for FirestoreService {
    async fn get_document(
        &self,
        request: Request<pb::GetDocumentRequest>,
    ) -> Result<Response<pb::Document>, Status> {
        self.log_request("GetDocument");
        let req = request.into_inner();
        let parsed = path::parse_document_path(&req.name)?;
        let doc = self
            .store
            .get(&parsed.project_id, &parsed.database_id, &parsed.collection_path, &parsed.doc_id)
            .ok_or_else(|| EmulatorError::not_found(format!("document {} not found", req.name)))?;
        Ok(Response::new(doc.into_proto()))
    }

    async fn list_documents(
        &self,
        request: Request<pb::ListDocumentsRequest>,
    ) -> Result<Response<pb::ListDocumentsResponse>, Status> {
        self.log_request("ListDocuments");
        let req = request.into_inner();
        if req.collection_id.is_empty() {
            return Err(EmulatorError::invalid_argument("collection_id must not be empty").into());
        }
        let parent = path::parse_parent_path(&req.parent)?;
        let collection_path = path::join_collection(&parent.collection_path, &req.collection_id);
        let docs = self
            .store
            .list(&parent.project_id, &parent.database_id, &collection_path);
        let (page, next_page_token) = paginate(docs, req.page_size, &req.page_token)?;
        Ok(Response::new(pb::ListDocumentsResponse {
            documents: page.into_iter().map(Document::into_proto).collect(),
            next_page_token,
        }))
    }

    async fn create_document(
        &self,
        request: Request<pb::CreateDocumentRequest>,
    ) -> Result<Response<pb::Document>, Status> {
        self.log_request("CreateDocument");
        let req = request.into_inner();
        let parent = path::parse_parent_path(&req.parent)?;
        let doc_id = if req.document_id.is_empty() {
            crate::id::generate_doc_id()
        } else {
            req.document_id
        };
        let collection_path = path::join_collection(&parent.collection_path, &req.collection_id);
        // Echo back whichever spelling of the database id the client used
        // (`default` vs `(default)`); the normalized form is only for
        // looking the collection up in the store below.
        let name = path::build_document_name(
            &parent.project_id,
            &parent.raw_database_id,
            &collection_path,
            &doc_id,
        );
        let now = Timestamp::now();
        let fields = req
            .document
            .map(|d| {
                d.fields
                    .into_iter()
                    .map(|(k, v)| (k, crate::value::Value::from_proto(v)))
                    .collect()
            })
            .unwrap_or_default();
        let doc = Document {
            name: name.clone(),
            fields,
            create_time: now,
            update_time: now,
        };
        self.store.set(
            &parent.project_id,
            &parent.database_id,
            &collection_path,
            &doc_id,
            doc.clone(),
        );
        Ok(Response::new(doc.into_proto()))
    }

    async fn update_document(
        &self,
        request: Request<pb::UpdateDocumentRequest>,
    ) -> Result<Response<pb::Document>, Status> {
        self.log_request("UpdateDocument");
        let req = request.into_inner();
        let doc = req
            .document
            .ok_or_else(|| EmulatorError::invalid_argument("document must be set"))?;
        let parsed = path::parse_document_path(&doc.name)?;
        let existing = self.store.get(
            &parsed.project_id,
            &parsed.database_id,
            &parsed.collection_path,
            &parsed.doc_id,
        );
        let new_fields: Vec<(String, crate::value::Value)> = doc
            .fields
            .into_iter()
            .map(|(k, v)| (k, crate::value::Value::from_proto(v)))
            .collect();
        let now = Timestamp::now();
        let fields = if let Some(mask) = &req.update_mask {
            let mut merged = existing
                .as_ref()
                .map(|d| d.fields.clone())
                .unwrap_or_default();
            for (k, v) in &new_fields {
                if let Some(entry) = merged.iter_mut().find(|(existing_k, _)| existing_k == k) {
                    entry.1 = v.clone();
                } else {
                    merged.push((k.clone(), v.clone()));
                }
            }
            for field_path in &mask.field_paths {
                if !new_fields.iter().any(|(k, _)| k == field_path) {
                    merged.retain(|(k, _)| k != field_path);
                }
            }
            merged
        } else {
            new_fields
        };
        let create_time = existing.map(|d| d.create_time).unwrap_or(now);
        let updated = Document {
            name: doc.name,
            fields,
            create_time,
            update_time: now,
        };
        self.store.set(
            &parsed.project_id,
            &parsed.database_id,
            &parsed.collection_path,
            &parsed.doc_id,
            updated.clone(),
        );
        Ok(Response::new(updated.into_proto()))
    }

    async fn delete_document(
        &self,
        request: Request<pb::DeleteDocumentRequest>,
    ) -> Result<Response<()>, Status> {
        self.log_request("DeleteDocument");
        let req = request.into_inner();
        let parsed = path::parse_document_path(&req.name)?;
        let removed = self.store.delete(
            &parsed.project_id,
            &parsed.database_id,
            &parsed.collection_path,
            &parsed.doc_id,
        );
        if !removed {
            return Err(EmulatorError::not_found(format!("document {} not found", req.name)).into());
        }
        Ok(Response::new(()))
    }

    async fn commit(
        &self,
        request: Request<pb::CommitRequest>,
    ) -> Result<Response<pb::CommitResponse>, Status> {
        self.log_request("Commit");
        let req = request.into_inner();
        let mut write_results = Vec::with_capacity(req.writes.len());
        for write in req.writes {
            let result = commit::apply_write(&self.store, write).map_err(Status::from)?;
            write_results.push(result);
        }
        Ok(Response::new(pb::CommitResponse {
            write_results,
            commit_time: Some(Timestamp::now().into_proto()),
        }))
    }

    type BatchGetDocumentsStream = BoxStream<pb::BatchGetDocumentsResponse>;

    async fn batch_get_documents(
        &self,
        request: Request<pb::BatchGetDocumentsRequest>,
    ) -> Result<Response<Self::BatchGetDocumentsStream>, Status> {
        self.log_request("BatchGetDocuments");
        let req = request.into_inner();
        let store = self.store.clone();
        let read_time = Timestamp::now().into_proto();

        let responses: Vec<Result<pb::BatchGetDocumentsResponse, Status>> = req
            .documents
            .into_iter()
            .map(|name| {
                let response = match path::parse_document_path(&name) {
                    Ok(parsed) => match store.get(
                        &parsed.project_id,
                        &parsed.database_id,
                        &parsed.collection_path,
                        &parsed.doc_id,
                    ) {
                        Some(doc) => pb::BatchGetDocumentsResponse {
                            result: Some(pb::batch_get_documents_response::Result::Found(
                                doc.into_proto(),
                            )),
                            transaction: vec![],
                            read_time: Some(read_time.clone()),
                        },
                        None => pb::BatchGetDocumentsResponse {
                            result: Some(pb::batch_get_documents_response::Result::Missing(name)),
                            transaction: vec![],
                            read_time: Some(read_time.clone()),
                        },
                    },
                    Err(_) => pb::BatchGetDocumentsResponse {
                        result: Some(pb::batch_get_documents_response::Result::Missing(name)),
                        transaction: vec![],
                        read_time: Some(read_time.clone()),
                    },
                };
                Ok(response)
            })
            .collect();

        let stream = tokio_stream::iter(responses);
        Ok(Response::new(Box::pin(stream)))
    }

    type RunQueryStream = BoxStream<pb::RunQueryResponse>;

    async fn run_query(
        &self,
        request: Request<pb::RunQueryRequest>,
    ) -> Result<Response<Self::RunQueryStream>, Status> {
        self.log_request("RunQuery");
        let req = request.into_inner();
        let structured_query = match req.query_type {
            Some(pb::run_query_request::QueryType::StructuredQuery(q)) => q,
            None => {
                return Err(EmulatorError::invalid_argument("structured_query must be set").into())
            }
        };
        let parent = path::parse_parent_path(&req.parent)?;
        let collection_id = structured_query
            .from
            .first()
            .map(|s| s.collection_id.clone())
            .ok_or_else(|| EmulatorError::invalid_argument("query must select a collection"))?;
        let collection_path = path::join_collection(&parent.collection_path, &collection_id);
        let docs = self
            .store
            .list(&parent.project_id, &parent.database_id, &collection_path);
        let matched = crate::query::execute(&structured_query, docs).map_err(Status::from)?;
        let read_time = Timestamp::now().into_proto();

        let responses: Vec<Result<pb::RunQueryResponse, Status>> = if matched.is_empty() {
            vec![Ok(pb::RunQueryResponse {
                transaction: vec![],
                document: None,
                read_time: Some(read_time),
                skipped_results: 0,
            })]
        } else {
            matched
                .into_iter()
                .map(|doc| {
                    Ok(pb::RunQueryResponse {
                        transaction: vec![],
                        document: Some(doc.into_proto()),
                        read_time: Some(read_time.clone()),
                        skipped_results: 0,
                    })
                })
                .collect()
        };

        Ok(Response::new(Box::pin(tokio_stream::iter(responses))))
    }

    type RunAggregationQueryStream = BoxStream<pb::RunAggregationQueryResponse>;

    async fn run_aggregation_query(
        &self,
        request: Request<pb::RunAggregationQueryRequest>,
    ) -> Result<Response<Self::RunAggregationQueryStream>, Status> {
        self.log_request("RunAggregationQuery");
        let req = request.into_inner();
        let aggregation_query = match req.query_type {
            Some(pb::run_aggregation_query_request::QueryType::StructuredAggregationQuery(q)) => q,
            None => {
                return Err(
                    EmulatorError::invalid_argument("structured_aggregation_query must be set").into(),
                )
            }
        };
        let parent = path::parse_parent_path(&req.parent)?;
        let structured_query = match &aggregation_query.query_type {
            Some(pb::structured_aggregation_query::QueryType::StructuredQuery(q)) => q,
            None => return Err(EmulatorError::invalid_argument("structured_query must be set").into()),
        };
        let collection_id = structured_query
            .from
            .first()
            .map(|s| s.collection_id.clone())
            .ok_or_else(|| EmulatorError::invalid_argument("query must select a collection"))?;
        let collection_path = path::join_collection(&parent.collection_path, &collection_id);
        let docs = self
            .store
            .list(&parent.project_id, &parent.database_id, &collection_path);
        let aggregate_fields = crate::query::aggregate(&aggregation_query, docs)
            .map_err(Status::from)?
            .into_iter()
            .map(|(k, v)| (k, v.into_proto()))
            .collect();
        let read_time = Timestamp::now().into_proto();
        let response = pb::RunAggregationQueryResponse {
            result: Some(pb::AggregationResult { aggregate_fields }),
            transaction: vec![],
            read_time: Some(read_time),
        };
        Ok(Response::new(Box::pin(tokio_stream::iter(vec![Ok(response)]))))
    }

    async fn list_collection_ids(
        &self,
        request: Request<pb::ListCollectionIdsRequest>,
    ) -> Result<Response<pb::ListCollectionIdsResponse>, Status> {
        self.log_request("ListCollectionIds");
        let req = request.into_inner();
        let parent = path::parse_parent_path(&req.parent)?;
        let mut ids = self
            .store
            .list_collection_ids(&parent.project_id, &parent.database_id, &parent.collection_path);
        ids.sort();
        let (page, next_page_token) = paginate_strings(ids, req.page_size, &req.page_token)?;
        Ok(Response::new(pb::ListCollectionIdsResponse {
            collection_ids: page,
            next_page_token,
        }))
    }

    async fn batch_write(
        &self,
        request: Request<pb::BatchWriteRequest>,
    ) -> Result<Response<pb::BatchWriteResponse>, Status> {
        stubs::unimplemented_unary(&self.config, "BatchWrite", request)
    }

    async fn begin_transaction(
        &self,
        request: Request<pb::BeginTransactionRequest>,
    ) -> Result<Response<pb::BeginTransactionResponse>, Status> {
        stubs::unimplemented_unary(&self.config, "BeginTransaction", request)
    }

    async fn rollback(&self, request: Request<pb::RollbackRequest>) -> Result<Response<()>, Status> {
        stubs::unimplemented_unary(&self.config, "Rollback", request)
    }

    type WriteStream = BoxStream<pb::WriteResponse>;

    async fn write(
        &self,
        request: Request<tonic::Streaming<pb::WriteRequest>>,
    ) -> Result<Response<Self::WriteStream>, Status> {
        stubs::unimplemented_stream(&self.config, "Write", request)
    }

    type ListenStream = BoxStream<pb::ListenResponse>;

    async fn listen(
        &self,
        request: Request<tonic::Streaming<pb::ListenRequest>>,
    ) -> Result<Response<Self::ListenStream>, Status> {
        stubs::unimplemented_stream(&self.config, "Listen", request)
    }
}

/// Shared pagination for string-keyed listings (`ListCollectionIds`).
fn paginate_strings(
    items: Vec<String>,
    page_size: i32,
    page_token: &str,
) -> Result<(Vec<String>, String), Status> {
    let start = parse_page_token(page_token)?;
    let items = items.into_iter().skip(start).collect::<Vec<_>>();
    if page_size <= 0 {
        return Ok((items, String::new()));
    }
    let page_size = page_size as usize;
    if items.len() > page_size {
        let next_token = (start + page_size).to_string();
        let page = items.into_iter().take(page_size).collect();
        Ok((page, next_token))
    } else {
        Ok((items, String::new()))
    }
}

/// Shared pagination for document listings (`ListDocuments`).
fn paginate(
    items: Vec<Document>,
    page_size: i32,
    page_token: &str,
) -> Result<(Vec<Document>, String), Status> {
    let start = parse_page_token(page_token)?;
    let items = items.into_iter().skip(start).collect::<Vec<_>>();
    if page_size <= 0 {
        return Ok((items, String::new()));
    }
    let page_size = page_size as usize;
    if items.len() > page_size {
        let next_token = (start + page_size).to_string();
        let page = items.into_iter().take(page_size).collect();
        Ok((page, next_token))
    } else {
        Ok((items, String::new()))
    }
}

fn parse_page_token(token: &str) -> Result<usize, Status> {
    if token.is_empty() {
        return Ok(0);
    }
    token
        .parse()
        .map_err(|_| EmulatorError::invalid_argument("malformed page_token").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_document_returns_not_found_for_missing_doc() {
        let service = FirestoreService::new(Arc::new(Store::new()), Arc::new(Config::default()));
        let request = Request::new(pb::GetDocumentRequest {
            name: "projects/p/databases/(default)/documents/users/u1".to_string(),
            mask: None,
            consistency_selector: None,
        });
        let status = service.get_document(request).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let service = FirestoreService::new(Arc::new(Store::new()), Arc::new(Config::default()));
        let create_request = Request::new(pb::CreateDocumentRequest {
            parent: "projects/p/databases/(default)/documents".to_string(),
            collection_id: "users".to_string(),
            document_id: "u1".to_string(),
            document: Some(pb::Document {
                name: String::new(),
                fields: std::collections::HashMap::from([(
                    "name".to_string(),
                    crate::value::Value::String("Alice".into()).into_proto(),
                )]),
                create_time: None,
                update_time: None,
            }),
            mask: None,
        });
        let created = service.create_document(create_request).await.unwrap().into_inner();
        assert_eq!(
            created.name,
            "projects/p/databases/(default)/documents/users/u1"
        );

        let get_request = Request::new(pb::GetDocumentRequest {
            name: created.name,
            mask: None,
            consistency_selector: None,
        });
        let fetched = service.get_document(get_request).await.unwrap().into_inner();
        assert_eq!(
            fetched.fields.get("name"),
            Some(&crate::value::Value::String("Alice".into()).into_proto())
        );
    }

    #[tokio::test]
    async fn create_document_echoes_the_clients_literal_database_id_spelling() {
        let service = FirestoreService::new(Arc::new(Store::new()), Arc::new(Config::default()));
        let create_request = Request::new(pb::CreateDocumentRequest {
            parent: "projects/p/databases/default/documents".to_string(),
            collection_id: "users".to_string(),
            document_id: "u1".to_string(),
            document: Some(pb::Document {
                name: String::new(),
                fields: Default::default(),
                create_time: None,
                update_time: None,
            }),
            mask: None,
        });
        let created = service.create_document(create_request).await.unwrap().into_inner();
        assert_eq!(created.name, "projects/p/databases/default/documents/users/u1");

        let get_request = Request::new(pb::GetDocumentRequest {
            name: "projects/p/databases/(default)/documents/users/u1".to_string(),
            mask: None,
            consistency_selector: None,
        });
        assert!(service.get_document(get_request).await.is_ok());
    }

    #[tokio::test]
    async fn run_query_on_empty_collection_emits_a_single_chunk() {
        let service = FirestoreService::new(Arc::new(Store::new()), Arc::new(Config::default()));
        let request = Request::new(pb::RunQueryRequest {
            parent: "projects/p/databases/(default)/documents".to_string(),
            query_type: Some(pb::run_query_request::QueryType::StructuredQuery(
                pb::StructuredQuery {
                    from: vec![pb::structured_query::CollectionSelector {
                        collection_id: "users".to_string(),
                        all_descendants: false,
                    }],
                    ..Default::default()
                },
            )),
            consistency_selector: None,
        });
        let mut stream = service.run_query(request).await.unwrap().into_inner();
        let mut count = 0;
        while let Some(response) = stream.next().await {
            let response = response.unwrap();
            assert!(response.document.is_none());
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn begin_transaction_is_unimplemented() {
        let service = FirestoreService::new(Arc::new(Store::new()), Arc::new(Config::default()));
        let request = Request::new(pb::BeginTransactionRequest {
            database: "projects/p/databases/(default)".to_string(),
            options: None,
        });
        let err = service.begin_transaction(request).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unimplemented);
    }
}
