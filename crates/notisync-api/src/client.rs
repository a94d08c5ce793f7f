// Async HTTP client for the notification Fetch and Mutation APIs.
//
// Base path: {api_url}/users/notifications
// Auth: Authorization: Bearer <token>, read from a credential watch on
// every request so a token refresh takes effect without rebuilding.

use std::future::Future;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;
use url::Url;

use crate::credential::Credential;
use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{Ack, Mutation, PageQuery, PageResponse, QuickCheckResponse};

// ── Contract ─────────────────────────────────────────────────────────

/// Request/response contract the sync engine consumes.
///
/// [`NotificationClient`] is the HTTP implementation; tests substitute
/// scripted in-memory doubles.
pub trait NotificationApi: Send + Sync + 'static {
    /// Fetch one page of the inbox with the given filter criteria.
    fn fetch_page(
        &self,
        query: &PageQuery,
    ) -> impl Future<Output = Result<PageResponse, Error>> + Send;

    /// Ask whether anything changed relative to the last known counters.
    fn quick_check(
        &self,
        last_count: u64,
        last_unread: u64,
    ) -> impl Future<Output = Result<QuickCheckResponse, Error>> + Send;

    /// Apply a mutation server-side.
    fn mutate(&self, mutation: &Mutation) -> impl Future<Output = Result<Ack, Error>> + Send;
}

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// REST client for the notification endpoints.
pub struct NotificationClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: watch::Receiver<Option<Credential>>,
}

impl NotificationClient {
    /// Build from the API root URL and a transport config.
    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        credentials: watch::Receiver<Option<Credential>>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, http, credentials)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        base_url: &str,
        http: reqwest::Client,
        credentials: watch::Receiver<Option<Credential>>,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Convenience for one-shot callers holding a single token.
    pub fn with_credential(
        base_url: &str,
        transport: &TransportConfig,
        credential: Credential,
    ) -> Result<Self, Error> {
        let (_tx, rx) = watch::channel(Some(credential));
        Self::new(base_url, transport, rx)
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ensure the base path ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn auth_header(&self) -> Result<HeaderValue, Error> {
        let bearer = self
            .credentials
            .borrow()
            .as_ref()
            .map(Credential::bearer)
            .ok_or(Error::MissingCredential)?;
        let mut value = HeaderValue::from_str(&bearer).map_err(|e| Error::Unauthorized {
            message: format!("invalid token header value: {e}"),
        })?;
        value.set_sensitive(true);
        Ok(value)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let auth = self.auth_header()?;
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, auth)
            .query(params)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn send_mutation(&self, method: reqwest::Method, path: &str) -> Result<Ack, Error> {
        let auth = self.auth_header()?;
        let url = self.url(path)?;
        debug!("{method} {url}");

        let resp = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        self.handle_ack(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    /// Any 2xx acknowledges; a JSON `{ message }` body is kept if present.
    async fn handle_ack(&self, resp: reqwest::Response) -> Result<Ack, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            Ok(serde_json::from_str(&body).unwrap_or_default())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Unauthorized { message };
        }

        Error::Http {
            status: status.as_u16(),
            message,
        }
    }
}

// ── Endpoints ────────────────────────────────────────────────────────

impl NotificationApi for NotificationClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, Error> {
        self.get("users/notifications", &query.to_params()).await
    }

    async fn quick_check(
        &self,
        last_count: u64,
        last_unread: u64,
    ) -> Result<QuickCheckResponse, Error> {
        self.get(
            "users/notifications/quick-check",
            &[
                ("lastCount", last_count.to_string()),
                ("lastUnread", last_unread.to_string()),
            ],
        )
        .await
    }

    async fn mutate(&self, mutation: &Mutation) -> Result<Ack, Error> {
        use reqwest::Method;

        match mutation {
            Mutation::MarkRead(id) => {
                self.send_mutation(Method::PATCH, &format!("users/notifications/{id}/read"))
                    .await
            }
            Mutation::MarkUnread(id) => {
                self.send_mutation(Method::PATCH, &format!("users/notifications/{id}/unread"))
                    .await
            }
            Mutation::Delete(id) => {
                self.send_mutation(Method::DELETE, &format!("users/notifications/{id}"))
                    .await
            }
            Mutation::MarkAllRead => {
                self.send_mutation(Method::PATCH, "users/notifications/mark-all-read")
                    .await
            }
            Mutation::ClearAll => {
                self.send_mutation(Method::POST, "users/clear-notifications")
                    .await
            }
        }
    }
}
