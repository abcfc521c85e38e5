use super::{DocumentMeta, DocumentStore, StoreError};
use crate::app_config::StoreConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

const ALL_DOCUMENTS: &str = "FOR doc IN @@collection RETURN doc";
const DOCUMENT_BY_KEY: &str = "FOR doc IN @@collection FILTER doc._key == @key LIMIT 1 RETURN doc";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorResponse {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
}

/// ArangoDB collection accessed over its HTTP API
#[derive(Debug, Clone)]
pub struct ArangoStore {
    client: Client,
    db_url: Url,
    collection: String,
    username: String,
    password: String,
}

impl ArangoStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &StoreConfig) -> Result<Self, StoreError> {
        info!(
            url = %config.url,
            database = %config.database,
            collection = %config.collection,
            "Creating ArangoDB store"
        );

        let invalid = |reason: String| StoreError::InvalidUrl(format!("{}: {reason}", config.url));
        let mut db_url = Url::parse(&config.url).map_err(|e| invalid(e.to_string()))?;
        db_url
            .path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["_db", config.database.as_str()]);

        Ok(Self {
            client,
            db_url,
            collection: config.collection.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Database URL extended by percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.db_url.clone();
        // db_url was checked to be a base in with_client
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn documents_url(&self) -> Url {
        self.endpoint(&["_api", "document", &self.collection])
    }

    fn document_url(&self, key: &str) -> Url {
        self.endpoint(&["_api", "document", &self.collection, key])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        Err(StoreError::from_response(status, &raw))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        Ok(self.send(request).await?.json().await?)
    }

    /// Run an AQL query and drain its cursor
    async fn query(&self, aql: &str, bind_vars: Value) -> Result<Vec<Value>, StoreError> {
        let mut page: CursorResponse = self
            .send_json(self.client.post(self.endpoint(&["_api", "cursor"])).json(&json!({
                "query": aql,
                "bindVars": bind_vars,
            })))
            .await?;

        let mut documents = std::mem::take(&mut page.result);
        while page.has_more {
            let Some(id) = page.id.take() else { break };
            debug!(cursor = %id, fetched = documents.len(), "Fetching next cursor batch");
            page = self
                .send_json(self.client.put(self.endpoint(&["_api", "cursor", &id])))
                .await?;
            documents.append(&mut page.result);
        }

        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for ArangoStore {
    async fn all(&self) -> Result<Vec<Value>, StoreError> {
        self.query(ALL_DOCUMENTS, json!({ "@collection": self.collection }))
            .await
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let documents = self
            .query(
                DOCUMENT_BY_KEY,
                json!({ "@collection": self.collection, "key": key }),
            )
            .await?;
        Ok(documents.into_iter().next())
    }

    async fn insert(&self, document: &Value) -> Result<DocumentMeta, StoreError> {
        self.send_json(self.client.post(self.documents_url()).json(document))
            .await
    }

    async fn update(&self, key: &str, patch: &Value) -> Result<DocumentMeta, StoreError> {
        self.send_json(self.client.patch(self.document_url(key)).json(patch))
            .await
    }

    async fn remove(&self, key: &str) -> Result<DocumentMeta, StoreError> {
        self.send_json(self.client.delete(self.document_url(key)))
            .await
    }
}
