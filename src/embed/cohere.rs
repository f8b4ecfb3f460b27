//! Cohere embedding client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EmbeddingProvider, InputType};
use crate::constants::{COHERE_BATCH_SIZE, COHERE_EMBED_URL};
use crate::error::{Result, ShelfDbError};

/// HTTP client for the Cohere embed API. Requests are sent in batches of
/// [`COHERE_BATCH_SIZE`], the API's documented limit.
pub struct CohereClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    async fn embed_batch(&self, batch: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            texts: batch,
            model: &self.model,
            input_type: input_type.as_str(),
        };

        let response = self
            .client
            .post(COHERE_EMBED_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ShelfDbError::embedding(format!("cohere request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShelfDbError::embedding(format!(
                "cohere returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ShelfDbError::embedding(format!("cohere response malformed: {e}")))?;

        if parsed.embeddings.len() != batch.len() {
            return Err(ShelfDbError::embedding(format!(
                "cohere returned {} embeddings for {} texts",
                parsed.embeddings.len(),
                batch.len()
            )));
        }

        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for CohereClient {
    async fn get_embeddings(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(COHERE_BATCH_SIZE) {
            let embeddings = self.embed_batch(batch, input_type).await?;
            all_embeddings.extend(embeddings);
        }
        Ok(all_embeddings)
    }
}
