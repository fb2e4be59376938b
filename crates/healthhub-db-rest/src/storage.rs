//! PostgREST implementation of the `RecordStore` trait.

use async_trait::async_trait;
use healthhub_storage::{Filter, Page, Query, RecordStore, StorageError};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::RestStoreConfig;
use crate::error::{from_response, from_transport};
use crate::filter::{encode_filter, encode_query, parse_content_range_total};

const BACKEND: &str = "rest";

/// Record store backed by a PostgREST endpoint.
///
/// Every call is a single HTTP request, except a conditional `update_where`
/// that matched nothing: it issues a follow-up read to tell a missing row
/// from a row whose current values did not match.
#[derive(Debug, Clone)]
pub struct RestStore {
    http: reqwest::Client,
    config: RestStoreConfig,
}

impl RestStore {
    /// Creates a new store for the given endpoint.
    pub fn new(config: RestStoreConfig) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StorageError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RestStoreConfig {
        &self.config
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let profile = if method == Method::GET {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        self.http
            .request(method, self.config.table_url(table))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header(profile, &self.config.schema)
    }

    /// Sends a request and maps transport failures and error statuses.
    async fn execute(
        &self,
        req: RequestBuilder,
        operation: &'static str,
        table: &str,
        id: Option<&str>,
    ) -> Result<Response, StorageError> {
        let result = match req.send().await {
            Err(e) => Err(from_transport(&e)),
            Ok(resp) if resp.status().is_success() => Ok(resp),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                Err(from_response(status, &body, table, id))
            }
        };
        result.inspect_err(|e| e.trace(BACKEND, operation, table))
    }

    /// Reads a representation body as a list of rows.
    async fn rows(resp: Response) -> Result<Vec<Value>, StorageError> {
        let body = resp.text().await.map_err(|e| from_transport(&e))?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&body) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(row @ Value::Object(_)) => Ok(vec![row]),
            Ok(other) => Err(StorageError::internal(format!(
                "Unexpected response body: {other}"
            ))),
            Err(e) => Err(StorageError::internal(format!(
                "Failed to parse response JSON: {e}"
            ))),
        }
    }

    fn fail<T>(
        err: StorageError,
        operation: &'static str,
        table: &str,
    ) -> Result<T, StorageError> {
        err.trace(BACKEND, operation, table);
        Err(err)
    }
}

#[async_trait]
impl RecordStore for RestStore {
    #[instrument(level = "debug", skip(self, record))]
    async fn insert(&self, table: &str, record: &Value) -> Result<Value, StorageError> {
        if !record.is_object() {
            return Self::fail(
                StorageError::invalid_record("record must be a JSON object"),
                "insert",
                table,
            );
        }
        let id = record.get("id").and_then(Value::as_str);
        let req = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(record);
        let resp = self.execute(req, "insert", table, id).await?;
        match Self::rows(resp).await?.into_iter().next() {
            Some(row) => Ok(row),
            None => Self::fail(
                StorageError::internal("insert returned no representation"),
                "insert",
                table,
            ),
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_by_id(&self, table: &str, id: &str) -> Result<Value, StorageError> {
        let req = self
            .request(Method::GET, table)
            .query(&encode_query(&Query::new().with_filter(Filter::by_id(id))));
        let resp = self.execute(req, "get_by_id", table, Some(id)).await?;
        match Self::rows(resp).await?.into_iter().next() {
            Some(row) => Ok(row),
            None => Self::fail(StorageError::not_found(table, id), "get_by_id", table),
        }
    }

    #[instrument(level = "debug", skip(self, filter, patch))]
    async fn update_where(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Value,
    ) -> Result<Value, StorageError> {
        let Some(id) = filter.id() else {
            return Self::fail(
                StorageError::invalid_record("update_where requires an id condition"),
                "update_where",
                table,
            );
        };
        if !patch.is_object() {
            return Self::fail(
                StorageError::invalid_record("patch must be a JSON object"),
                "update_where",
                table,
            );
        }

        let req = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(&encode_filter(filter))
            .json(patch);
        let resp = self.execute(req, "update_where", table, Some(id)).await?;
        if let Some(row) = Self::rows(resp).await?.into_iter().next() {
            return Ok(row);
        }

        // Nothing matched: either the row is gone or its values moved on.
        if !filter.is_conditional() {
            return Self::fail(StorageError::not_found(table, id), "update_where", table);
        }
        self.get_by_id(table, id).await?;
        debug!(backend = BACKEND, table, id, "conditional update matched no row");
        Self::fail(StorageError::condition_failed(table, id), "update_where", table)
    }

    #[instrument(level = "debug", skip(self, query))]
    async fn select(&self, table: &str, query: &Query) -> Result<Page, StorageError> {
        let mut req = self.request(Method::GET, table).query(&encode_query(query));
        if query.count {
            req = req.header("Prefer", "count=exact");
        }
        let resp = self.execute(req, "select", table, None).await?;
        let total = resp
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let page = Page::new(Self::rows(resp).await?);
        Ok(match total {
            Some(total) if query.count => page.with_total(total),
            _ => page,
        })
    }

    #[instrument(level = "debug", skip(self, filter))]
    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<u64, StorageError> {
        if filter.is_empty() {
            return Self::fail(
                StorageError::invalid_record("delete_where requires at least one condition"),
                "delete_where",
                table,
            );
        }
        let req = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=representation")
            .query(&encode_filter(filter));
        let resp = self.execute(req, "delete_where", table, filter.id()).await?;
        Ok(Self::rows(resp).await?.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
