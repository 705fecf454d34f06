//! REST gateway over `reqwest`.
//!
//! Maps [`Resource`]/[`Operation`] pairs onto the backend's HTTP routes and
//! backend status codes onto [`GatewayError`]. The session token is held by
//! the gateway value itself and sent as a bearer token on every request.

use super::{Gateway, Operation, Resource};
use crate::config::EngineConfig;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use sync_types::{GatewayError, Page, PageParams};

/// Credentials for one authenticated session.
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl Session {
    /// Wrap an access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The raw access token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// An HTTP method plus path, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    method: Method,
    path: String,
}

impl Route {
    fn new(method: Method, path: String) -> Self {
        Self { method, path }
    }
}

/// Gateway talking to the live backend.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl RestGateway {
    /// Build a gateway for `config.base_url` authenticated as `session`.
    pub fn new(config: &EngineConfig, session: Session) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn request(&self, route: &Route) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, route.path);
        self.client
            .request(route.method.clone(), url)
            .bearer_auth(self.session.token())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Option<Value>, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            let error = error_for_status(status, &body);
            tracing::debug!(status, error = %error, "request rejected");
            return Err(error);
        }
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn fetch_page(
        &self,
        resource: &Resource,
        params: &PageParams,
    ) -> Result<Page<Value>, GatewayError> {
        let route = Route::new(Method::GET, collection_path(resource));
        let request = self.request(&route).query(&query_pairs(params));

        let body = self
            .send(request)
            .await?
            .ok_or_else(|| GatewayError::Decode(format!("empty page body for {}", resource)))?;
        serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn mutate(
        &self,
        resource: &Resource,
        id: u64,
        operation: Operation,
        body: Option<Value>,
    ) -> Result<Option<Value>, GatewayError> {
        let route = entity_route(resource, id, operation).ok_or_else(|| {
            tracing::warn!(%resource, %operation, "no route for operation");
            GatewayError::NotFound
        })?;
        let request = self.request(&route);
        let request = match body {
            Some(body) => request.json(&body),
            None => request.json(&serde_json::json!({})),
        };
        self.send(request).await
    }

    async fn create(&self, resource: &Resource, body: Value) -> Result<Value, GatewayError> {
        let route = create_route(resource).ok_or_else(|| {
            tracing::warn!(%resource, "resource does not accept creates");
            GatewayError::NotFound
        })?;
        self.send(self.request(&route).json(&body))
            .await?
            .ok_or_else(|| GatewayError::Decode(format!("empty create body for {}", resource)))
    }
}

fn query_pairs(params: &PageParams) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("limit".to_string(), params.limit.to_string()),
        ("offset".to_string(), params.offset.to_string()),
    ];
    pairs.extend(params.filters.iter().cloned());
    pairs
}

fn collection_path(resource: &Resource) -> String {
    match resource {
        Resource::Posts => "/api/posts".to_string(),
        Resource::Comments { post } => format!("/api/posts/{}/comments/", post),
        Resource::FriendRequests => "/api/friends/requests/".to_string(),
        Resource::Friends => "/api/friends/".to_string(),
        Resource::Subscriptions => "/api/friends/subscriptions".to_string(),
        Resource::Dialogs => "/api/messages".to_string(),
        Resource::Messages { peer } => format!("/api/messages/{}", peer),
        Resource::Members => "/api/members/".to_string(),
    }
}

fn entity_route(resource: &Resource, id: u64, operation: Operation) -> Option<Route> {
    let route = match (resource, operation) {
        (Resource::Posts, Operation::Like) => {
            Route::new(Method::POST, format!("/api/posts/{}/like", id))
        }
        (Resource::Posts, Operation::Unlike) => {
            Route::new(Method::POST, format!("/api/posts/{}/unlike", id))
        }
        (Resource::Posts, Operation::Repost) => {
            Route::new(Method::POST, format!("/api/posts/{}/repost/", id))
        }
        (Resource::Posts, Operation::Delete) => {
            Route::new(Method::DELETE, format!("/api/posts/{}", id))
        }
        (Resource::Comments { post }, Operation::Delete) => Route::new(
            Method::DELETE,
            format!("/api/posts/{}/comments/{}/", post, id),
        ),
        (Resource::FriendRequests, Operation::Accept) => Route::new(
            Method::POST,
            format!("/api/friends/requests/{}/accept/", id),
        ),
        (Resource::FriendRequests, Operation::Decline) => Route::new(
            Method::POST,
            format!("/api/friends/requests/{}/decline/", id),
        ),
        (Resource::Friends, Operation::Delete) => {
            Route::new(Method::DELETE, format!("/api/friends/{}/", id))
        }
        (Resource::Subscriptions, Operation::Subscribe) => {
            Route::new(Method::POST, format!("/api/friends/subscriptions/{}", id))
        }
        (Resource::Subscriptions, Operation::Unsubscribe) => {
            Route::new(Method::DELETE, format!("/api/friends/subscriptions/{}", id))
        }
        (Resource::Dialogs, Operation::MarkRead) => {
            Route::new(Method::POST, format!("/api/messages/{}/read", id))
        }
        _ => return None,
    };
    Some(route)
}

fn create_route(resource: &Resource) -> Option<Route> {
    match resource {
        Resource::Posts
        | Resource::Comments { .. }
        | Resource::FriendRequests
        | Resource::Dialogs => Some(Route::new(Method::POST, collection_path(resource))),
        Resource::Messages { .. } => Some(Route::new(Method::POST, "/api/messages".to_string())),
        Resource::Friends | Resource::Subscriptions | Resource::Members => None,
    }
}

/// Map a non-2xx response onto the gateway taxonomy.
fn error_for_status(status: u16, body: &str) -> GatewayError {
    match status {
        401 => GatewayError::Unauthorized,
        404 => GatewayError::NotFound,
        400 | 422 => GatewayError::ValidationFailed {
            fields: validation_fields(body),
        },
        _ => GatewayError::Network(format!("HTTP {}: {}", status, snippet(body))),
    }
}

/// Field errors from a validation body.
///
/// Accepts `{"field": ["msg", ..]}`, `{"field": "msg"}` and
/// `{"detail": "msg"}`; anything else lands under `non_field_errors`.
fn validation_fields(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut fields = BTreeMap::new();

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            for (field, value) in map {
                let messages = match value {
                    Value::Array(items) => items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect(),
                    Value::String(s) => vec![s],
                    other => vec![other.to_string()],
                };
                fields.insert(field, messages);
            }
        }
        _ => {
            fields.insert("non_field_errors".to_string(), vec![snippet(body)]);
        }
    }
    fields
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
