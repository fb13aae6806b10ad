//! HTTP transport for the share API

use super::versions::ApiVersion;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use url::Url;

/// Negotiated microversion, sent with every request
pub const API_VERSION_HEADER: &str = "X-OpenStack-Manila-API-Version";

/// Marks a request as targeting an experimental API
pub const EXPERIMENTAL_HTTP_HEADER: &str = "X-OpenStack-Manila-API-Experimental";

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

pub const REQUEST_ID_HEADER: &str = "X-OpenStack-Request-ID";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the human readable message out of a fault body
///
/// The service wraps faults as `{"itemNotFound": {"code": 404, "message": "..."}}`.
fn fault_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.as_object()?
                .values()
                .find_map(|fault| fault.get("message")?.as_str().map(String::from))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        })
}

/// Per-request options that must not leak into other requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Send the experimental API header with this request only
    pub experimental: bool,
}

impl RequestOptions {
    pub fn experimental() -> Self {
        Self { experimental: true }
    }
}

/// Status and parsed body of a completed request
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// `Value::Null` when the service returned no body
    pub body: Value,
}

/// HTTP client wrapper for share API calls
///
/// Default headers are fixed at construction and shared by every request.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    endpoint: Url,
    default_headers: HeaderMap,
}

impl HttpClient {
    /// Create a new HTTP client for `endpoint`, e.g. `http://host:8786/v2/<project>`
    pub fn new(endpoint: &str, token: Option<&str>, version: ApiVersion) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::invalid_input(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::invalid_input(format!(
                "endpoint '{}' cannot be used as a base URL",
                endpoint
            )));
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(
            HeaderName::from_static("x-openstack-manila-api-version"),
            header_value(&version.to_string(), "API version")?,
        );
        if let Some(token) = token {
            let mut value = header_value(token, "auth token")?;
            value.set_sensitive(true);
            default_headers.insert(HeaderName::from_static("x-auth-token"), value);
        }

        let client = Client::builder()
            .user_agent(concat!("manila-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            default_headers,
        })
    }

    /// Headers sent with every request issued by this client
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build the absolute URL for an API path such as `/shares/detail?x=y`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.as_str().trim_end_matches('/'), path)
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.send(Method::GET, path, None, options).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        self.send(Method::POST, path, body, options).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        self.send(Method::PUT, path, body, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.send(Method::DELETE, path, None, options).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let url = self.url(path);
        let request_id = format!("req-{}", uuid::Uuid::new_v4());
        tracing::debug!(
            "{} {} (request_id={}, experimental={})",
            method,
            url,
            request_id,
            options.experimental
        );

        let mut request = self
            .client
            .request(method, &url)
            .headers(self.default_headers.clone())
            .header(REQUEST_ID_HEADER, request_id);

        if options.experimental {
            request = request.header(EXPERIMENTAL_HTTP_HEADER, "true");
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            let message = fault_message(status, &response_body);
            if status == StatusCode::NOT_FOUND {
                return Err(Error::NotFound(message));
            }
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        // Handle empty response
        if response_body.trim().is_empty() {
            return Ok(ApiResponse {
                status,
                body: Value::Null,
            });
        }

        Ok(ApiResponse {
            status,
            body: serde_json::from_str(&response_body)?,
        })
    }
}

/// The raw value is never echoed back; it may be a credential
fn header_value(raw: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|_| Error::invalid_input(format!("{} is not a valid header value", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_endpoint_and_path() {
        let http = HttpClient::new("http://manila:8786/v2/abc/", None, ApiVersion::new(2, 7)).unwrap();
        assert_eq!(
            http.url("/shares/detail?is_public=True"),
            "http://manila:8786/v2/abc/shares/detail?is_public=True"
        );
    }

    #[test]
    fn test_default_headers_carry_version_and_token() {
        let http = HttpClient::new("http://manila:8786/v2/abc", Some("secret"), ApiVersion::new(2, 56))
            .unwrap();
        let headers = http.default_headers();
        assert_eq!(headers.get(API_VERSION_HEADER).unwrap(), "2.56");
        assert_eq!(headers.get(AUTH_TOKEN_HEADER).unwrap(), "secret");
        assert!(headers.get(EXPERIMENTAL_HTTP_HEADER).is_none());
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let err = HttpClient::new("not a url", None, ApiVersion::new(2, 7)).err().unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_token_is_not_echoed() {
        let token = "s3cret\nvalue";
        let err = HttpClient::new("http://manila:8786/v2/abc", Some(token), ApiVersion::new(2, 7))
            .err()
            .unwrap();
        let message = err.to_string();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(message.contains("auth token"));
        assert!(!message.contains("s3cret"));
        assert!(!crate::error::format_error(&err).contains("s3cret"));
    }

    #[test]
    fn test_fault_message_extraction() {
        let body = r#"{"itemNotFound": {"code": 404, "message": "Share abc could not be found."}}"#;
        assert_eq!(
            fault_message(StatusCode::NOT_FOUND, body),
            "Share abc could not be found."
        );
        assert_eq!(fault_message(StatusCode::BAD_GATEWAY, "<html>"), "Bad Gateway");
    }

    #[test]
    fn test_sanitize_for_log_truncates() {
        let long = "a".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
        assert_eq!(sanitize_for_log("line\nbreak"), "linebreak");
    }
}
