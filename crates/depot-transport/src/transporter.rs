//! The `Transporter` trait: the narrow, protocol-specific seam between
//! the connector and the wire (spec.md §4.C, §6 "External interfaces").
//! `HttpTransporter` is the one concrete implementation this crate ships;
//! embedders add others (e.g. file://, S3) by implementing the trait.

use std::path::Path;
use std::time::Duration;

use depot_core::repository::RemoteRepository;
use depot_util::errors::DepotError;
use tracing::{debug, instrument};

/// One GET/PUT/HEAD operation against a repository-relative path.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub path: String,
}

/// The bytes and metadata returned by a successful `get`.
pub struct GetResponse {
    pub data: Vec<u8>,
    pub content_length: Option<u64>,
}

/// Resumable/partial download support: range requests are optional, and
/// a transporter that cannot resume simply restarts from zero (spec.md
/// §4.H "resumable downloads").
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeRequest {
    pub resume_from: u64,
}

/// The protocol boundary a `RepositoryConnector` drives. Implementations
/// are responsible for auth/proxy application, connection reuse, and
/// translating protocol errors into [`DepotError`] variants the
/// connector can act on (not-found vs transfer error vs checksum
/// failure never originates here — only in the connector, which has the
/// checksum material).
#[async_trait::async_trait]
pub trait Transporter: Send + Sync {
    /// Fetch the full content at `request.path`.
    async fn get(&self, repository: &RemoteRepository, request: &TransportRequest) -> miette::Result<GetResponse>;

    /// Fetch content starting at `range.resume_from`, for resuming a
    /// partial download. Implementations that cannot resume should
    /// return the full content instead of erroring.
    async fn get_resumable(
        &self,
        repository: &RemoteRepository,
        request: &TransportRequest,
        range: RangeRequest,
    ) -> miette::Result<GetResponse>;

    /// Check existence/metadata without downloading the body (HEAD).
    async fn peek(&self, repository: &RemoteRepository, request: &TransportRequest) -> miette::Result<bool>;

    /// Upload `data` to `request.path` (deploy/publish path, component O).
    async fn put(
        &self,
        repository: &RemoteRepository,
        request: &TransportRequest,
        data: &[u8],
    ) -> miette::Result<()>;
}

/// A `reqwest`-backed HTTP/HTTPS transporter: the default, and only,
/// concrete transporter this crate provides.
pub struct HttpTransporter {
    client: reqwest::Client,
}

impl HttpTransporter {
    pub fn new(connect_timeout: Duration, request_timeout: Duration, user_agent: &str) -> miette::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| DepotError::Transfer {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    fn url_for(&self, repository: &RemoteRepository, path: &str) -> String {
        let base = repository.url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder, repository: &RemoteRepository) -> reqwest::RequestBuilder {
        match &repository.authentication {
            Some(auth) if auth.username.is_some() => {
                builder.basic_auth(auth.username.clone().unwrap_or_default(), auth.password.clone())
            }
            _ => builder,
        }
    }
}

#[async_trait::async_trait]
impl Transporter for HttpTransporter {
    #[instrument(skip(self), fields(url))]
    async fn get(&self, repository: &RemoteRepository, request: &TransportRequest) -> miette::Result<GetResponse> {
        let url = self.url_for(repository, &request.path);
        debug!(url = %url, "fetching");
        let builder = self.apply_auth(self.client.get(&url), repository);
        let response = builder.send().await.map_err(|e| DepotError::Transfer {
            message: format!("GET {url} failed: {e}"),
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DepotError::NotFound {
                message: format!("{url} not found"),
            }
            .into());
        }
        if !response.status().is_success() {
            return Err(DepotError::Transfer {
                message: format!("GET {url} returned {}", response.status()),
            }
            .into());
        }

        let content_length = response.content_length();
        let data = response
            .bytes()
            .await
            .map_err(|e| DepotError::Transfer {
                message: format!("reading body of {url} failed: {e}"),
            })?
            .to_vec();

        Ok(GetResponse { data, content_length })
    }

    async fn get_resumable(
        &self,
        repository: &RemoteRepository,
        request: &TransportRequest,
        range: RangeRequest,
    ) -> miette::Result<GetResponse> {
        if range.resume_from == 0 {
            return self.get(repository, request).await;
        }
        let url = self.url_for(repository, &request.path);
        let builder = self.apply_auth(self.client.get(&url), repository);
        let builder = builder.header("Range", format!("bytes={}-", range.resume_from));
        let response = builder.send().await.map_err(|e| DepotError::Transfer {
            message: format!("ranged GET {url} failed: {e}"),
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DepotError::NotFound {
                message: format!("{url} not found"),
            }
            .into());
        }
        // A server that ignores Range and returns 200 (full body) is
        // handled by the connector, which compares returned length
        // against the expected remainder and restarts if they disagree.
        if !response.status().is_success() && response.status() != reqwest::StatusCode::PARTIAL_CONTENT {
            return Err(DepotError::Transfer {
                message: format!("ranged GET {url} returned {}", response.status()),
            }
            .into());
        }

        let content_length = response.content_length();
        let data = response
            .bytes()
            .await
            .map_err(|e| DepotError::Transfer {
                message: format!("reading ranged body of {url} failed: {e}"),
            })?
            .to_vec();

        Ok(GetResponse { data, content_length })
    }

    async fn peek(&self, repository: &RemoteRepository, request: &TransportRequest) -> miette::Result<bool> {
        let url = self.url_for(repository, &request.path);
        let builder = self.apply_auth(self.client.head(&url), repository);
        let response = builder.send().await.map_err(|e| DepotError::Transfer {
            message: format!("HEAD {url} failed: {e}"),
        })?;
        Ok(response.status().is_success())
    }

    async fn put(
        &self,
        repository: &RemoteRepository,
        request: &TransportRequest,
        data: &[u8],
    ) -> miette::Result<()> {
        let url = self.url_for(repository, &request.path);
        let builder = self.apply_auth(self.client.put(&url), repository);
        let response = builder
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| DepotError::Transfer {
                message: format!("PUT {url} failed: {e}"),
            })?;
        if !response.status().is_success() {
            return Err(DepotError::Transfer {
                message: format!("PUT {url} returned {}", response.status()),
            }
            .into());
        }
        Ok(())
    }
}

/// Write a `GetResponse`'s body to `path` atomically. A small convenience
/// used by the connector after checksum validation succeeds.
pub fn write_response_to_file(path: &Path, response: &GetResponse) -> miette::Result<()> {
    depot_util::fs::write_atomic_checked(path, &response.data)?;
    Ok(())
}
