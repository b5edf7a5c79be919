//! Network access used by the agent for misses, passthrough and install.

use url::{Origin, Url};

use crate::errors::NetworkError;
use crate::http::{Method, Request, RequestMode, Response, ResponseType};

/// Async network capability.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. An `Err` means no response at all; HTTP error
    /// statuses are successful fetches.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// [`Network`] backed by a `reqwest` client.
///
/// Responses whose final URL (after redirects) shares the agent's origin are
/// tagged [`ResponseType::Basic`]; cross-origin ones are `Cors`, or `Opaque`
/// with status 0 and no body for `no-cors` requests.
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: Origin,
}

impl HttpNetwork {
    pub fn new(origin: &Url) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| NetworkError::Failed {
                url: origin.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            origin: origin.origin(),
        })
    }

    fn response_type(&self, final_url: &Url, mode: RequestMode) -> ResponseType {
        if final_url.origin() == self.origin {
            ResponseType::Basic
        } else if mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait::async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let failed = |e: reqwest::Error| NetworkError::Failed {
            url: request.url.to_string(),
            reason: e.to_string(),
        };

        let resp = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone())
            .send()
            .await
            .map_err(failed)?;

        let response_type = self.response_type(resp.url(), request.mode);
        if response_type == ResponseType::Opaque {
            return Ok(Response::new(0, ResponseType::Opaque, Vec::new()));
        }

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await.map_err(failed)?.to_vec();

        Ok(Response {
            status,
            response_type,
            headers,
            body,
        })
    }
}
