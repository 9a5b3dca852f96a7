//! Single-attempt stream probes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use strum::Display;
use tokio::time::timeout;
use tracing::debug;

use super::retry::is_success_status;
use crate::config::LivenessConfig;
use crate::errors::AppResult;
use crate::utils::url::UrlUtils;

/// Kind of network-level failure, recorded in the outcome's `error` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FailureKind {
    Timeout,
    ConnectError,
    RedirectError,
    BodyError,
    DecodeError,
    RequestError,
    RequestException,
}

impl From<&reqwest::Error> for FailureKind {
    fn from(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            FailureKind::Timeout
        } else if error.is_connect() {
            FailureKind::ConnectError
        } else if error.is_redirect() {
            FailureKind::RedirectError
        } else if error.is_body() {
            FailureKind::BodyError
        } else if error.is_decode() {
            FailureKind::DecodeError
        } else if error.is_request() {
            FailureKind::RequestError
        } else {
            FailureKind::RequestException
        }
    }
}

/// What one attempt observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeAttempt {
    /// Response status outside the success set
    Status(u16),
    /// Successful status; `has_data` is whether the first body chunk carried bytes
    Body { status: u16, has_data: bool },
    Failed(FailureKind),
}

#[async_trait]
pub trait StreamProber: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeAttempt;
}

/// reqwest-backed prober sharing one client across all probes of a run
pub struct HttpStreamProber {
    client: Client,
    read_timeout: Duration,
}

impl HttpStreamProber {
    pub fn new(config: &LivenessConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            read_timeout: config.timeout,
        })
    }

    fn failed(url: &str, error: &reqwest::Error) -> ProbeAttempt {
        let kind = FailureKind::from(error);
        debug!(
            "Probe of {} failed ({}): {}",
            UrlUtils::obfuscate_credentials(url),
            kind,
            UrlUtils::obfuscate_credentials(&error.to_string())
        );
        ProbeAttempt::Failed(kind)
    }
}

#[async_trait]
impl StreamProber for HttpStreamProber {
    async fn probe(&self, url: &str) -> ProbeAttempt {
        let mut response = match timeout(self.read_timeout, self.client.get(url).send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Self::failed(url, &e),
            Err(_) => return ProbeAttempt::Failed(FailureKind::Timeout),
        };

        let status = response.status().as_u16();
        if !is_success_status(status) {
            return ProbeAttempt::Status(status);
        }

        match timeout(self.read_timeout, response.chunk()).await {
            Ok(Ok(chunk)) => ProbeAttempt::Body {
                status,
                has_data: chunk.is_some_and(|bytes| !bytes.is_empty()),
            },
            Ok(Err(e)) => Self::failed(url, &e),
            Err(_) => ProbeAttempt::Failed(FailureKind::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> LivenessConfig {
        LivenessConfig {
            timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            ..LivenessConfig::default()
        }
    }

    #[tokio::test]
    async fn test_probe_reads_first_chunk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live.ts"))
            .and(header("accept", "*/*"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x47u8; 188]))
            .mount(&server)
            .await;

        let prober = HttpStreamProber::new(&test_config()).unwrap();
        let attempt = prober.probe(&format!("{}/live.ts", server.uri())).await;
        assert_eq!(
            attempt,
            ProbeAttempt::Body {
                status: 200,
                has_data: true
            }
        );
    }

    #[tokio::test]
    async fn test_probe_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpStreamProber::new(&test_config()).unwrap();
        let attempt = prober.probe(&format!("{}/empty", server.uri())).await;
        assert_eq!(
            attempt,
            ProbeAttempt::Body {
                status: 200,
                has_data: false
            }
        );
    }

    #[tokio::test]
    async fn test_probe_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let prober = HttpStreamProber::new(&test_config()).unwrap();
        let attempt = prober.probe(&format!("{}/gone", server.uri())).await;
        assert_eq!(attempt, ProbeAttempt::Status(404));
    }

    #[tokio::test]
    async fn test_probe_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = LivenessConfig {
            timeout: Duration::from_millis(200),
            ..test_config()
        };
        let prober = HttpStreamProber::new(&config).unwrap();
        let attempt = prober.probe(&format!("{}/slow", server.uri())).await;
        assert_eq!(attempt, ProbeAttempt::Failed(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_probe_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = HttpStreamProber::new(&test_config()).unwrap();
        let attempt = prober.probe(&format!("http://127.0.0.1:{port}/x")).await;
        assert!(matches!(attempt, ProbeAttempt::Failed(_)));
    }
}
