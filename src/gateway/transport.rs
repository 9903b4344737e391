//! HTTP plumbing underneath the gateway.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use super::GatewayError;

/// A request relative to the API base.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, GatewayError> {
        let bytes = serde_json::to_vec(body).map_err(|e| GatewayError::Encode(e.to_string()))?;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_slice(&self.body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// Sends one request. Implementations must carry cookies between calls so the
/// refresh cookie set by login comes back on refresh.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError>;
}

/// Transport over a real HTTP connection.
#[derive(Clone)]
pub struct ReqwestTransport {
    base: Url,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base: &str) -> Result<Self, GatewayError> {
        let base = Url::parse(base).map_err(|e| GatewayError::Transport(e.to_string()))?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { base, client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let url = self
            .base
            .join(&request.path)
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_request() {
        let request = ApiRequest::post("/auth/login")
            .json(&serde_json::json!({"email": "a@x.com"}))
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(request.body.unwrap(), r#"{"email":"a@x.com"}"#);
    }

    #[test]
    fn test_unserializable_body_is_encode_error() {
        // JSON object keys must be strings
        let body: std::collections::HashMap<(u8, u8), u8> = [((1, 2), 3)].into_iter().collect();

        let result = ApiRequest::post("/auth/login").json(&body);

        assert!(matches!(result, Err(GatewayError::Encode(_))));
    }

    #[test]
    fn test_response_json() {
        let response = ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(br#"{"status":"ok"}"#),
        };
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["status"], "ok");

        let broken = ApiResponse {
            body: Bytes::from_static(b"not json"),
            ..response
        };
        assert!(matches!(
            broken.json::<serde_json::Value>(),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ReqwestTransport::new("not a url").is_err());
    }
}
