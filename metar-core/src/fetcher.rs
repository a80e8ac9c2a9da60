use chrono::Duration;
use std::{marker::PhantomData, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    cache::{DEFAULT_TTL_MINUTES, TtlCache},
    model::{AirportCode, CacheKey, ErrorKind, FetchState, ResourceKind},
    provider::{ReportSource, UpstreamError},
    report::{Envelope, ForecastRecord, MetarRecord, Report},
};

pub type MetarFetcher = ResourceFetcher<MetarRecord>;
pub type TafFetcher = ResourceFetcher<ForecastRecord>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No {kind} or airport found for {code}. Please try a different airport by ICAO, eg EGKK")]
    NotFound {
        kind: ResourceKind,
        code: AirportCode,
    },

    #[error("There was an error getting the {kind} data from the server{}", detail_suffix(.detail))]
    Network {
        kind: ResourceKind,
        detail: Option<String>,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::NotFound { .. } => ErrorKind::NotFound,
            FetchError::Network { .. } => ErrorKind::NetworkError,
        }
    }

    fn upstream(kind: ResourceKind, err: &UpstreamError) -> Self {
        let detail = match err {
            UpstreamError::Status { status, body } if !body.is_empty() => {
                Some(format!("HTTP {status}: {body}"))
            }
            other => other.status().map(|status| format!("HTTP {status}")),
        };
        FetchError::Network { kind, detail }
    }

    fn malformed(kind: ResourceKind, err: &serde_json::Error) -> Self {
        FetchError::Network {
            kind,
            detail: Some(format!("malformed response: {err}")),
        }
    }

    pub fn into_state<R>(self) -> FetchState<R> {
        FetchState::Failed {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
}

/// Cache-first retrieval of one report kind.
#[derive(Debug)]
pub struct ResourceFetcher<R> {
    source: Arc<dyn ReportSource>,
    cache: TtlCache,
    ttl: Duration,
    _report: PhantomData<fn() -> R>,
}

impl<R: Report> ResourceFetcher<R> {
    pub fn new(source: Arc<dyn ReportSource>, cache: TtlCache) -> Self {
        Self {
            source,
            cache,
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            _report: PhantomData,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        R::KIND
    }

    /// Resolve `code` to a terminal state (`Ready` or `Failed`).
    ///
    /// Errors never escape; they are folded into [`FetchState::Failed`].
    pub async fn fetch(&self, code: &AirportCode) -> FetchState<R> {
        match self.try_fetch(code).await {
            Ok(record) => FetchState::Ready(record),
            Err(err) => {
                warn!(kind = %R::KIND, %code, error = %err, "fetch failed");
                err.into_state()
            }
        }
    }

    async fn try_fetch(&self, code: &AirportCode) -> Result<R, FetchError> {
        let key = CacheKey::new(R::KIND, code);

        if let Some(cached) = self.cache.get::<R>(&key) {
            if cached.icao() == code.as_str() {
                debug!(%key, "cache hit");
                return Ok(cached);
            }
            debug!(
                %key,
                cached_icao = cached.icao(),
                "cache entry belongs to another airport"
            );
        }

        info!(%key, "cache miss, fetching from upstream");
        let body = self
            .source
            .fetch_decoded(R::KIND, code)
            .await
            .map_err(|err| FetchError::upstream(R::KIND, &err))?;

        let envelope: Envelope<R> =
            serde_json::from_str(&body).map_err(|err| FetchError::malformed(R::KIND, &err))?;

        let record = envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound {
                kind: R::KIND,
                code: code.clone(),
            })?;

        self.cache.set(&key, &record, self.ttl);
        Ok(record)
    }
}
