use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::{ReportSource, UpstreamError};
use crate::model::{AirportCode, ResourceKind};

pub const DEFAULT_BASE_URL: &str = "https://api.checkwx.com";
pub const API_KEY_HEADER: &str = "X-API-Key";

/// CheckWX decoded METAR/TAF endpoints.
#[derive(Debug, Clone)]
pub struct CheckWxProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl CheckWxProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn endpoint(&self, kind: ResourceKind, code: &AirportCode) -> String {
        format!("{}/{}/{}/decoded", self.base_url, kind.path_segment(), code)
    }
}

#[async_trait]
impl ReportSource for CheckWxProvider {
    async fn fetch_decoded(
        &self,
        kind: ResourceKind,
        code: &AirportCode,
    ) -> Result<String, UpstreamError> {
        let url = self.endpoint(kind, code);
        info!(%kind, %code, "requesting decoded report");

        let res = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        debug!(%kind, %code, bytes = body.len(), "received decoded report");
        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    // Local test servers must not be routed through a proxy from the environment.
    fn provider(base_url: &str) -> CheckWxProvider {
        CheckWxProvider {
            api_key: "KEY".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::builder().no_proxy().build().unwrap(),
        }
    }

    /// Answers one HTTP request with `status_line` and `body`, returning the raw request head.
    async fn serve_once(
        status_line: &'static str,
        body: String,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before request head");
                head.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(head).unwrap()
        });

        (base_url, server)
    }

    fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
        head.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
    }

    #[test]
    fn endpoint_uses_kind_and_code() {
        let provider = provider("https://api.checkwx.com/");
        let code = AirportCode::parse("eham").unwrap();

        assert_eq!(
            provider.endpoint(ResourceKind::Metar, &code),
            "https://api.checkwx.com/metar/EHAM/decoded"
        );
        assert_eq!(
            provider.endpoint(ResourceKind::Taf, &code),
            "https://api.checkwx.com/taf/EHAM/decoded"
        );
    }

    #[tokio::test]
    async fn request_carries_api_key_header() {
        let (base_url, server) = serve_once("200 OK", r#"{"data":[]}"#.to_string()).await;
        let code = AirportCode::parse("EHAM").unwrap();

        let body = provider(&base_url)
            .fetch_decoded(ResourceKind::Metar, &code)
            .await
            .unwrap();
        let head = server.await.unwrap();

        assert_eq!(body, r#"{"data":[]}"#);
        assert!(
            head.starts_with("GET /metar/EHAM/decoded HTTP/1.1\r\n"),
            "head: {head}"
        );
        assert_eq!(header(&head, API_KEY_HEADER), Some("KEY"));
    }

    #[tokio::test]
    async fn error_status_keeps_truncated_body() {
        let (base_url, server) = serve_once("401 Unauthorized", "x".repeat(500)).await;
        let code = AirportCode::parse("EGKK").unwrap();

        let err = provider(&base_url)
            .fetch_decoded(ResourceKind::Taf, &code)
            .await
            .unwrap_err();
        let head = server.await.unwrap();

        assert!(head.starts_with("GET /taf/EGKK/decoded "));
        assert_eq!(err.status(), Some(401));
        match err {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, format!("{}...", "x".repeat(200)));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundary() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }

    #[test]
    fn short_bodies_are_kept() {
        assert_eq!(truncate_body("Unauthorized"), "Unauthorized");
    }
}
