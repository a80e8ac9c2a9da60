use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::model::{AirportCode, ResourceKind};

pub mod checkwx;

pub use checkwx::CheckWxProvider;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl UpstreamError {
    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
        }
    }
}

/// Upstream service returning decoded report bodies.
///
/// Implementations return the raw JSON body of a successful response; decoding
/// into records happens in the fetcher so every source is judged the same way.
#[async_trait]
pub trait ReportSource: Send + Sync + Debug {
    async fn fetch_decoded(
        &self,
        kind: ResourceKind,
        code: &AirportCode,
    ) -> Result<String, UpstreamError>;
}
