use crate::error::RagError;
use crate::models::{IndexedPoint, ScoredPoint};
use crate::traits::{ScrollPage, VectorIndex};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use url::Url;

pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

/// Qdrant REST client owning the collection the corpus is indexed into.
pub struct QdrantStore {
    endpoint: String,
    api_key: Option<String>,
    collection: String,
    client: Client,
    vector_size: usize,
    batch_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Result<Self, RagError> {
        let parsed = Url::parse(endpoint)?;

        Ok(Self {
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
            api_key,
            collection: collection.into(),
            client: Client::new(),
            vector_size,
            batch_size: DEFAULT_UPSERT_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.endpoint, self.collection, suffix)
    }

    fn backend_error(details: impl Into<String>) -> RagError {
        RagError::BackendResponse {
            backend: "qdrant".to_string(),
            details: details.into(),
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), RagError> {
        if dimensions != self.vector_size {
            return Err(RagError::Request(format!(
                "configured vector size {} does not match requested {}",
                self.vector_size, dimensions
            )));
        }

        let response = self
            .request(self.client.get(self.collection_url("")))
            .send()
            .await?;

        // An existing collection is left untouched, whatever its schema.
        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Err(Self::backend_error(response.status().to_string()));
        }

        let response = self
            .request(self.client.put(self.collection_url("")))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(format!(
                "collection setup failed with {}",
                response.status()
            )));
        }

        tracing::info!(collection = %self.collection, size = self.vector_size, "created collection");
        Ok(())
    }

    async fn upsert(&self, points: &[IndexedPoint]) -> Result<(), RagError> {
        for point in points {
            if point.vector.len() != self.vector_size {
                return Err(RagError::Request(format!(
                    "embedding dimension {} != {}",
                    point.vector.len(),
                    self.vector_size
                )));
            }
        }

        for batch in points.chunks(self.batch_size) {
            let payload_points = batch
                .iter()
                .map(|point| {
                    Ok(json!({
                        "id": point.id,
                        "vector": point.vector,
                        "payload": serde_json::to_value(&point.payload)?,
                    }))
                })
                .collect::<Result<Vec<_>, serde_json::Error>>()?;

            let response = self
                .request(self.client.put(self.collection_url("/points?wait=true")))
                .json(&json!({ "points": payload_points }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::backend_error(response.status().to_string()));
            }

            tracing::debug!(count = batch.len(), collection = %self.collection, "upserted batch");
        }

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, RagError> {
        if query_vector.len() != self.vector_size {
            return Err(RagError::Request(format!(
                "query vector dim {} is not {}",
                query_vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .request(self.client.post(self.collection_url("/points/search")))
            .json(&json!({
                "vector": query_vector,
                "limit": top_k,
                "score_threshold": score_threshold,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status().to_string()));
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            result.push(ScoredPoint {
                id: hit.pointer("/id").and_then(Value::as_u64).unwrap_or(0),
                payload: hit.pointer("/payload").cloned().unwrap_or(Value::Null),
                score: hit
                    .pointer("/score")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0) as f32,
            });
        }

        Ok(result)
    }

    async fn scroll(
        &self,
        section_filter: Option<&str>,
        page_size: usize,
        cursor: Option<Value>,
    ) -> Result<ScrollPage, RagError> {
        let mut body = json!({
            "limit": page_size,
            "with_payload": true,
        });

        if let Some(filter_text) = section_filter {
            body["filter"] = json!({
                "must": [
                    {
                        "key": "section_id",
                        "match": { "text": filter_text },
                    }
                ]
            });
        }
        if let Some(offset) = cursor {
            body["offset"] = offset;
        }

        let response = self
            .request(self.client.post(self.collection_url("/points/scroll")))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status().to_string()));
        }

        let parsed: Value = response.json().await?;
        let points = parsed
            .pointer("/result/points")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|point| ScoredPoint {
                id: point.pointer("/id").and_then(Value::as_u64).unwrap_or(0),
                payload: point.pointer("/payload").cloned().unwrap_or(Value::Null),
                score: 0.0,
            })
            .collect();

        let next_cursor = parsed
            .pointer("/result/next_page_offset")
            .filter(|offset| !offset.is_null())
            .cloned();

        Ok((points, next_cursor))
    }

    async fn is_connected(&self) -> bool {
        let probe = self
            .request(self.client.get(format!("{}/collections", self.endpoint)))
            .send()
            .await;

        match probe {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn delete_collection(&self) -> Result<(), RagError> {
        let response = self
            .request(self.client.delete(self.collection_url("")))
            .send()
            .await?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(Self::backend_error(response.status().to_string()));
        }

        Ok(())
    }
}
