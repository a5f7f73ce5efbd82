//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest`, with middleware that
//! retries transient failures using exponential backoff and a standardized
//! JSON response container.

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Transient failures are retried this many times before giving up.
const MAX_RETRIES: u32 = 3;

/// Errors raised while building or executing a request.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("base url '{0}' cannot carry path segments")]
    NotABase(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    #[error("failed to read response body: {0}")]
    Body(#[from] reqwest::Error),
}

/// A standardized container for API responses.
///
/// Wraps the deserialized data along with the status and headers of the
/// HTTP transaction.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles a base URL, an optional
/// bearer token, and automatic retries.
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL that endpoints are built from.
    base_url: Url,
    /// An optional Bearer token used for authorization.
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a new `ApiClient` instance with a retry policy.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL for the API (e.g., "https://sheets.googleapis.com/v4").
    /// * `auth_token` - An optional string for the Authorization header.
    ///
    /// # Errors
    /// Returns `HttpError::Url` if `base_url` is not a valid absolute URL.
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self, HttpError> {
        let url = Url::parse(base_url)?;
        if url.cannot_be_a_base() {
            return Err(HttpError::NotABase(base_url.to_string()));
        }

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
            auth_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base URL path, percent-encoding each one.
    ///
    /// Segments may contain characters such as `/` or spaces, which `Url::join`
    /// would otherwise interpret.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, HttpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| HttpError::NotABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GETs an absolute URL and decodes a JSON body.
    ///
    /// # Arguments
    /// * `url` - The full URL, usually from [`ApiClient::endpoint`].
    ///
    /// # Errors
    /// Network failures (after retries) and undecodable success bodies. A
    /// non-2xx status is not an error; it comes back with `success == false`.
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<ApiResponse<T>, HttpError> {
        let mut req = self.inner.get(url);
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = req.send().await?;
        let status = response.status();
        let resp_headers = response.headers().clone();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_and_opaque_base_urls() {
        assert!(matches!(ApiClient::new("/v4", None), Err(HttpError::Url(_))));
        assert!(matches!(ApiClient::new("mailto:me@example.com", None), Err(HttpError::NotABase(_))));
    }

    #[test]
    fn endpoint_encodes_each_segment() {
        let client = ApiClient::new("https://sheets.example.com/v4", None).unwrap();
        let url = client.endpoint(&["spreadsheets", "abc", "values", "Sheet 1!A1:Z"]).unwrap();
        assert_eq!(url.as_str(), "https://sheets.example.com/v4/spreadsheets/abc/values/Sheet%201!A1:Z");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = ApiClient::new("https://sheets.example.com/v4/", None).unwrap();
        let url = client.endpoint(&["a/b"]).unwrap();
        assert_eq!(url.path(), "/v4/a%2Fb");
    }
}
