//! [`VectorStore`] backed by a Qdrant collection.

use super::{StoreError, StoredFragment, VectorStore, ensure_dimension, validate_batch};
use crate::qdrant::{PointInsert, QdrantService, payload::payload_text};
use async_trait::async_trait;

/// Durable store persisting one named cosine collection in Qdrant.
pub struct QdrantStore {
    service: QdrantService,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Connect to Qdrant and create the collection on first use.
    ///
    /// An existing collection built for a different vector size is rejected with
    /// [`StoreError::DimensionMismatch`] rather than adopted.
    pub async fn connect(
        service: QdrantService,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, StoreError> {
        let collection = collection.into();
        tracing::debug!(collection = %collection, dimension, "Ensuring collection");
        let existing = service
            .create_collection_if_not_exists(&collection, dimension as u64)
            .await?;
        if let Some(existing) = existing
            && existing != dimension as u64
        {
            tracing::error!(
                collection = %collection,
                existing,
                configured = dimension,
                "Collection dimension does not match configuration"
            );
            return Err(StoreError::DimensionMismatch {
                expected: existing as usize,
                actual: dimension,
            });
        }
        tracing::debug!(collection = %collection, "Collection ready");
        Ok(Self {
            service,
            collection,
            dimension,
        })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add(
        &self,
        fragments: Vec<String>,
        vectors: Vec<Vec<f32>>,
        ids: Vec<String>,
    ) -> Result<usize, StoreError> {
        validate_batch(&fragments, &vectors, &ids, self.dimension)?;
        let points = fragments
            .into_iter()
            .zip(vectors)
            .zip(ids)
            .map(|((text, vector), id)| PointInsert { id, text, vector })
            .collect();
        let written = self
            .service
            .upsert_points(&self.collection, points)
            .await?;
        Ok(written)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<StoredFragment>, StoreError> {
        ensure_dimension(vector, self.dimension)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let points = self
            .service
            .search_points(&self.collection, vector, k)
            .await?;
        let fragments = points
            .into_iter()
            .filter_map(|point| {
                let text = payload_text(point.payload.as_ref());
                if text.is_none() {
                    tracing::warn!(id = %point.id, "Skipping point without text payload");
                }
                text.map(|text| StoredFragment {
                    id: point.id,
                    text,
                    score: point.score,
                })
            })
            .collect();
        Ok(fragments)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.service.delete_collection(&self.collection).await?;
        self.service
            .create_collection(&self.collection, self.dimension as u64)
            .await?;
        tracing::info!(collection = %self.collection, "Collection cleared");
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.service.count_points(&self.collection).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{DELETE, GET, POST, PUT},
        MockServer,
    };
    use serde_json::json;

    async fn store_for(server: &MockServer, dimension: usize) -> QdrantStore {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/docs");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        let service = QdrantService::new(&server.base_url(), None).expect("service");
        QdrantStore::connect(service, "docs", dimension)
            .await
            .expect("store")
    }

    #[tokio::test]
    async fn add_rejects_mismatched_batches_before_any_request() {
        let server = MockServer::start_async().await;
        let store = store_for(&server, 2).await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/docs/points");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;

        let error = store
            .add(vec!["a".into()], vec![], vec!["id-1".into()])
            .await
            .unwrap_err();

        assert!(matches!(error, StoreError::ContractViolation { .. }));
        assert_eq!(upsert.hits_async().await, 0);
    }

    #[tokio::test]
    async fn query_maps_payload_text_in_rank_order() {
        let server = MockServer::start_async().await;
        let store = store_for(&server, 2).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/docs/points/query");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [
                            { "id": "b", "score": 0.9, "payload": { "text": "closest" } },
                            { "id": "x", "score": 0.5, "payload": {} },
                            { "id": "a", "score": 0.1, "payload": { "text": "farthest" } }
                        ]
                    }
                }));
            })
            .await;

        let hits = store.query(&[1.0, 0.0], 3).await.expect("query");
        let texts: Vec<_> = hits.iter().map(|hit| hit.text.as_str()).collect();
        assert_eq!(texts, vec!["closest", "farthest"]);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn query_with_wrong_dimension_fails() {
        let server = MockServer::start_async().await;
        let store = store_for(&server, 4).await;
        let error = store.query(&[1.0, 0.0], 3).await.unwrap_err();
        assert!(matches!(
            error,
            StoreError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn clear_recreates_collection_and_is_repeatable() {
        let server = MockServer::start_async().await;
        let store = store_for(&server, 2).await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/collections/docs");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/docs")
                    .json_body(json!({ "vectors": { "size": 2, "distance": "Cosine" } }));
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;

        store.clear().await.expect("first clear");
        store.clear().await.expect("second clear");

        assert_eq!(delete.hits_async().await, 2);
        assert_eq!(create.hits_async().await, 2);
    }

    #[tokio::test]
    async fn connect_rejects_collection_with_other_dimension() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/docs");
                then.status(200).json_body(json!({
                    "result": {
                        "config": {
                            "params": { "vectors": { "size": 1024, "distance": "Cosine" } }
                        }
                    }
                }));
            })
            .await;
        let recreate = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/docs");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        let service = QdrantService::new(&server.base_url(), None).expect("service");

        let error = QdrantStore::connect(service, "docs", 768)
            .await
            .err()
            .expect("mismatch");

        assert!(matches!(
            error,
            StoreError::DimensionMismatch {
                expected: 1024,
                actual: 768
            }
        ));
        assert_eq!(recreate.hits_async().await, 0);
    }

    #[tokio::test]
    async fn connect_accepts_collection_with_same_dimension() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/docs");
                then.status(200).json_body(json!({
                    "result": {
                        "config": { "params": { "vectors": { "size": 768, "distance": "Cosine" } } }
                    }
                }));
            })
            .await;
        let service = QdrantService::new(&server.base_url(), None).expect("service");

        let store = QdrantStore::connect(service, "docs", 768)
            .await
            .expect("store");
        assert_eq!(store.collection(), "docs");
    }

    #[tokio::test]
    async fn unavailable_backend_surfaces_store_error() {
        let service = QdrantService::new("http://127.0.0.1:9", None).expect("service");
        let error = QdrantStore::connect(service, "docs", 2).await.err().expect("error");
        assert!(matches!(error, StoreError::Unavailable(_)));
    }
}
