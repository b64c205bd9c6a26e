//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::error::ClientError;
use crate::warnings::{parse_warnings, Warnings};

/// Client options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub request_timeout: Duration,

    /// Interval between job status requests
    pub job_polling_interval: Duration,

    /// Overall bound on waiting for a job
    pub job_timeout: Duration,

    /// Accept invalid TLS certificates
    pub skip_ssl_validation: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            job_polling_interval: Duration::from_secs(3),
            job_timeout: Duration::from_secs(15 * 60),
            skip_ssl_validation: false,
        }
    }
}

/// HTTP client for the Cloud Controller v3 API
pub struct HttpClient {
    client: Client,
    base_url: String,
    access_token: SecretString,
    options: ClientOptions,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: &str,
        access_token: SecretString,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .danger_accept_invalid_certs(options.skip_ssl_validation)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            options,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the client options
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Make a GET request against an API path
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> (Result<T, ClientError>, Warnings) {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let request = self.client.get(&url).query(query);
        self.execute_json(request).await
    }

    /// Make a GET request against an absolute URL (e.g. a job link)
    pub async fn get_url<T: DeserializeOwned>(&self, url: &str) -> (Result<T, ClientError>, Warnings) {
        debug!("GET {}", url);

        let request = self.client.get(url);
        self.execute_json(request).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> (Result<T, ClientError>, Warnings) {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let request = self.client.post(&url).json(body);
        self.execute_json(request).await
    }

    /// Make a POST request whose response body is ignored
    pub async fn post_action<B: Serialize>(&self, path: &str, body: &B) -> (Result<(), ClientError>, Warnings) {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let request = self.client.post(&url).json(body);
        let (response, warnings) = self.execute(request).await;
        (response.map(|_| ()), warnings)
    }

    /// Make a DELETE request, returning the raw response for header access
    pub async fn delete(&self, path: &str) -> (Result<Response, ClientError>, Warnings) {
        let url = format!("{}{}", self.base_url, path);
        debug!("DELETE {}", url);

        let request = self.client.delete(&url);
        self.execute(request).await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> (Result<T, ClientError>, Warnings) {
        let (response, warnings) = self.execute(request).await;
        let body = match response {
            Ok(response) => response.json::<T>().await.map_err(ClientError::from),
            Err(e) => Err(e),
        };
        (body, warnings)
    }

    async fn execute(&self, request: RequestBuilder) -> (Result<Response, ClientError>, Warnings) {
        let response = match request
            .header(
                header::AUTHORIZATION,
                format!("bearer {}", self.access_token.expose_secret()),
            )
            .header(header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return (Err(e.into()), Warnings::new()),
        };

        let warnings = parse_warnings(response.headers());

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Cloud Controller request failed: {} - {}", status, body);
            return (Err(ClientError::from_response(status, &body)), warnings);
        }

        (Ok(response), warnings)
    }
}
