//! HTTP client for the Kubernetes API server

use super::config::{Auth, KubeConfig};
use crate::client::{ApiClient, ClientPool};
use crate::error::{CallError, ConfigError, Error, Result};
use crate::request::{ApiRequest, ConfigMap};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Certificate, Identity, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Cap on how much of an error body ends up in a log line.
const MAX_ERROR_BODY: usize = 512;

/// One API server connection. Performs no client-side throttling; the
/// dispatcher owns the request rate.
pub struct KubeClient {
    http: reqwest::Client,
    server: Url,
    token: Option<String>,
}

impl KubeClient {
    pub fn new(config: &KubeConfig) -> std::result::Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify);

        if let Some(ca) = &config.ca_pem {
            builder = builder.add_root_certificate(Certificate::from_pem(ca)?);
        }

        let token = match &config.auth {
            Auth::None => None,
            Auth::Token(token) => Some(token.clone()),
            Auth::ClientCertificate(pem) => {
                builder = builder.identity(Identity::from_pem(pem)?);
                None
            }
        };

        Ok(Self {
            http: builder.build()?,
            server: config.server.clone(),
            token,
        })
    }

    fn url(&self, path: &str) -> std::result::Result<Url, CallError> {
        // Keep any path prefix the server URL carries (e.g. behind a proxy).
        let base = self.server.as_str().trim_end_matches('/');
        Url::parse(&format!("{}{}", base, path))
            .map_err(|e| CallError::Encode(format!("invalid request path {}: {}", path, e)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl ApiClient for KubeClient {
    async fn execute(
        &self,
        request: &ApiRequest,
        timeout: Duration,
    ) -> std::result::Result<(), CallError> {
        let url = self.url(&request.path())?;

        let builder = match request {
            ApiRequest::Create { object_size, .. } => {
                let object = ConfigMap::random(*object_size);
                let body =
                    sonic_rs::to_string(&object).map_err(|e| CallError::Encode(e.to_string()))?;
                debug!("Creating object {}", object.metadata.name);
                self.http
                    .post(url)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body)
            }
            ApiRequest::List { page_size: 0, .. } => self.http.get(url),
            ApiRequest::List { page_size, .. } => {
                self.http.get(url).query(&[("limit", page_size.to_string())])
            }
        };

        let response = self.authorize(builder).timeout(timeout).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        // Drain the body so the connection goes back to the pool.
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            chunk?;
        }
        Ok(())
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> CallError {
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    CallError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Build `size` independent clients. Any failure fails the whole pool.
pub fn build_pool(config: &KubeConfig, size: usize) -> Result<ClientPool> {
    let mut clients: Vec<Arc<dyn ApiClient>> = Vec::with_capacity(size);
    for index in 0..size {
        let client =
            KubeClient::new(config).map_err(|source| Error::ClientBuild { index, source })?;
        clients.push(Arc::new(client));
    }
    ClientPool::new(clients).ok_or(Error::Config(ConfigError::EmptyPool))
}
