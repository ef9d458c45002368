//! REST gateway for a hosted PostgREST-style backend with object storage.
//!
//! CRUD goes to `/rest/v1/{collection}` with `column=eq.value` filters and an
//! `order=` clause; media goes to `/storage/v1/object/{bucket}/{name}` and is
//! served back from the public object path. Remote failures keep the backend
//! message and map onto `AppError` by status.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::error::{AppError, AppResult};

use super::{Collection, Filter, Gateway, Order};

/// Low-level transport failures, separated from the remote's own error
/// responses (which carry an HTTP status and are mapped by status instead).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("gateway unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("undecodable gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Http(e) => AppError::gateway("gateway_unreachable", &e.to_string()),
            TransportError::Decode(e) => AppError::internal("decode_error", &e.to_string()),
        }
    }
}

pub struct RestGateway {
    base: Url,
    bucket: String,
    client: reqwest::Client,
    headers: HeaderMap,
}

impl RestGateway {
    /// Build a gateway client from the service URL, API key and media bucket.
    pub fn new(base: &str, api_key: &str, bucket: &str) -> AppResult<Self> {
        let base = Url::parse(base)
            .map_err(|e| AppError::user("bad_gateway_url", &format!("invalid gateway URL: {}", e)))?;
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| AppError::user("bad_api_key", "API key contains invalid header characters"))?;
        headers.insert("apikey", key);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| AppError::user("bad_api_key", "API key contains invalid header characters"))?;
        bearer.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::gateway("client_build", &e.to_string()))?;
        Ok(Self { base, bucket: bucket.to_string(), client, headers })
    }

    fn rest_url(&self, collection: Collection) -> AppResult<Url> {
        self.base
            .join(&format!("/rest/v1/{}", collection.as_str()))
            .map_err(|e| AppError::internal("bad_url", &e.to_string()))
    }

    fn apply_filter(url: &mut Url, filter: &Filter, order: Option<&Order>) {
        let mut qp = url.query_pairs_mut();
        for (col, val) in &filter.eq {
            qp.append_pair(col, &format!("eq.{}", val));
        }
        if let Some(o) = order {
            let dir = if o.ascending { "asc" } else { "desc" };
            qp.append_pair("order", &format!("{}.{}", o.column, dir));
        }
    }

    /// Issue a request and decode the body, mapping non-2xx statuses onto the
    /// application error taxonomy with the remote message preserved.
    async fn send_json(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        prefer: Option<&str>,
    ) -> AppResult<Value> {
        let mut req = self.client.request(method.clone(), url.clone()).headers(self.headers.clone());
        if let Some(p) = prefer {
            req = req.header("Prefer", p);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        debug!(target: "gateway", %method, %url, "gateway request");
        let resp = req.send().await.map_err(TransportError::Http)?;
        let status = resp.status();
        let text = resp.text().await.map_err(TransportError::Http)?;
        if !status.is_success() {
            return Err(AppError::from_gateway_status(status.as_u16(), remote_message(status, &text)));
        }
        if status == StatusCode::NO_CONTENT || text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).map_err(TransportError::Decode)?)
    }
}

/// Prefer the backend's own `message` field, falling back to the raw body.
fn remote_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(|s| s.to_string()))
        .unwrap_or_else(|| {
            if body.is_empty() { format!("HTTP {}", status) } else { body.to_string() }
        })
}

/// Unwrap the single-element array the backend returns for writes issued with
/// `Prefer: return=representation`.
fn first_row(v: Value) -> AppResult<Value> {
    match v {
        Value::Array(mut rows) if !rows.is_empty() => Ok(rows.remove(0)),
        Value::Array(_) => Err(AppError::not_found("empty_result", "gateway returned no rows")),
        other => Ok(other),
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn create(&self, collection: Collection, fields: Value) -> AppResult<Value> {
        let url = self.rest_url(collection)?;
        let v = self.send_json(Method::POST, url, Some(&fields), Some("return=representation")).await?;
        first_row(v)
    }

    async fn read(&self, collection: Collection, filter: Filter, order: Option<Order>) -> AppResult<Vec<Value>> {
        let mut url = self.rest_url(collection)?;
        Self::apply_filter(&mut url, &filter, order.as_ref());
        let v = self.send_json(Method::GET, url, None, None).await?;
        match v {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    async fn read_one(&self, collection: Collection, id: &str) -> AppResult<Value> {
        let mut url = self.rest_url(collection)?;
        Self::apply_filter(&mut url, &Filter::by("id", id), None);
        let v = self.send_json(Method::GET, url, None, None).await?;
        match v {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.remove(0)),
            _ => Err(AppError::not_found(
                "not_found",
                &format!("{} {} does not exist", collection.as_str(), id),
            )),
        }
    }

    async fn update(&self, collection: Collection, id: &str, fields: Value) -> AppResult<Value> {
        let mut url = self.rest_url(collection)?;
        Self::apply_filter(&mut url, &Filter::by("id", id), None);
        let v = self.send_json(Method::PATCH, url, Some(&fields), Some("return=representation")).await?;
        first_row(v)
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        let mut url = self.rest_url(collection)?;
        Self::apply_filter(&mut url, &Filter::by("id", id), None);
        self.send_json(Method::DELETE, url, None, None).await?;
        Ok(())
    }

    async fn upsert(&self, collection: Collection, key_column: &str, fields: Value) -> AppResult<Value> {
        let mut url = self.rest_url(collection)?;
        url.query_pairs_mut().append_pair("on_conflict", key_column);
        let v = self
            .send_json(
                Method::POST,
                url,
                Some(&fields),
                Some("resolution=merge-duplicates,return=representation"),
            )
            .await?;
        first_row(v)
    }

    async fn upload_media(&self, name: &str, content_type: &str, bytes: Vec<u8>) -> AppResult<String> {
        // Encode each path segment but keep the separators.
        let encoded: String = name
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = self
            .base
            .join(&format!("/storage/v1/object/{}/{}", self.bucket, encoded))
            .map_err(|e| AppError::internal("bad_url", &e.to_string()))?;
        debug!(target: "gateway", %url, size = bytes.len(), "media upload");
        let resp = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(TransportError::Http)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::from_gateway_status(status.as_u16(), remote_message(status, &text)));
        }
        let public = self
            .base
            .join(&format!("/storage/v1/object/public/{}/{}", self.bucket, encoded))
            .map_err(|e| AppError::internal("bad_url", &e.to_string()))?;
        Ok(public.to_string())
    }
}
