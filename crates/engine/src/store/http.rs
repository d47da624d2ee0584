//! REST-backed document store.
//!
//! Maps the abstract store operations onto a plain JSON-over-HTTP surface:
//!
//! - `POST   {base}/{collection}`            -> `{"id": "..."}`
//! - `PATCH  {base}/{document}`              merge fields
//! - `DELETE {base}/{document}`
//! - `POST   {base}/batchDelete`             `{"documents": [...]}`
//! - `GET    {base}/{collection}?orderBy=..&limit=..` -> `[{"id", "fields"}]`

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::paths::{CollectionPath, DocumentPath};
use crate::store::{Document, DocumentStore, StoreError};

/// Document store speaking the dashboard's REST surface.
pub struct HttpDocumentStore {
    client: Client,
    base: Url,
}

#[derive(Deserialize)]
struct AddResponse {
    id: String,
}

#[derive(Deserialize)]
struct WireDocument {
    id: String,
    fields: Value,
}

impl HttpDocumentStore {
    pub fn new(base: Url) -> Self {
        Self {
            client: Client::new(),
            base,
        }
    }

    pub fn with_client(base: Url, client: Client) -> Self {
        Self { client, base }
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base
            .join(path)
            .map_err(|error| StoreError::InvalidArgument(format!("bad path '{path}': {error}")))
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => StoreError::PermissionDenied,
            StatusCode::NOT_FOUND => StoreError::NotFound,
            StatusCode::BAD_REQUEST => StoreError::InvalidArgument(body),
            StatusCode::SERVICE_UNAVAILABLE => StoreError::Unavailable,
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => StoreError::DeadlineExceeded,
            _ => StoreError::Http {
                status: status.as_u16(),
                body,
            },
        })
    }
}

fn transport_error(error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::DeadlineExceeded
    } else {
        StoreError::Network(error.to_string())
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn add(&self, collection: &CollectionPath, fields: Value) -> Result<String, StoreError> {
        let url = self.endpoint(collection.as_str())?;
        let response = self.client.post(url).json(&fields).send().await.map_err(transport_error)?;
        let response = Self::check(response).await?;
        let body: AddResponse = response.json().await.map_err(transport_error)?;
        Ok(body.id)
    }

    async fn update(&self, document: &DocumentPath, fields: Value) -> Result<(), StoreError> {
        let url = self.endpoint(document.as_str())?;
        let response = self.client.patch(url).json(&fields).send().await.map_err(transport_error)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, document: &DocumentPath) -> Result<(), StoreError> {
        let url = self.endpoint(document.as_str())?;
        let response = self.client.delete(url).send().await.map_err(transport_error)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_batch(&self, documents: &[DocumentPath]) -> Result<(), StoreError> {
        let url = self.endpoint("batchDelete")?;
        let payload = serde_json::json!({
            "documents": documents.iter().map(DocumentPath::as_str).collect::<Vec<_>>(),
        });
        let response = self.client.post(url).json(&payload).send().await.map_err(transport_error)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_many(&self, collection: &CollectionPath, order_by: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        let url = self.endpoint(collection.as_str())?;
        let response = self
            .client
            .get(url)
            .query(&[("orderBy", order_by), ("limit", &limit.to_string())])
            .send()
            .await
            .map_err(transport_error)?;
        let response = Self::check(response).await?;
        let documents: Vec<WireDocument> = response.json().await.map_err(transport_error)?;
        Ok(documents
            .into_iter()
            .map(|doc| Document {
                id: doc.id,
                fields: doc.fields,
            })
            .collect())
    }
}
