//! Readiness, health and shutdown signaling towards the fleet orchestrator.

use crate::error::OrchestrationError;
use async_trait::async_trait;
use log::info;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_SDK_PORT: u16 = 9358;
const SDK_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The orchestration channel consumed by the session.
#[async_trait]
pub trait LivenessSignal: Send + Sync {
    /// Marks the game server as ready to accept players.
    async fn ready(&self) -> Result<(), OrchestrationError>;

    /// Reports that the game server is still alive.
    async fn health(&self) -> Result<(), OrchestrationError>;

    /// Asks the orchestrator to shut this game server down.
    async fn shutdown(&self) -> Result<(), OrchestrationError>;
}

#[derive(Serialize)]
struct Empty {}

/// Client for the orchestrator sidecar's HTTP gateway.
///
/// Each call is a `POST /<call>` with an empty JSON object; any
/// non-success status is treated as a failure.
pub struct SdkLiveness {
    client: reqwest::Client,
    base_url: String,
}

impl SdkLiveness {
    pub fn new(sdk_port: u16) -> Result<Self, OrchestrationError> {
        Self::with_base_url(format!("http://localhost:{}", sdk_port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, OrchestrationError> {
        let client = reqwest::Client::builder()
            .timeout(SDK_REQUEST_TIMEOUT)
            .build()
            .map_err(|source| OrchestrationError::Request {
                call: "connect",
                source,
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, call: &'static str) -> Result<(), OrchestrationError> {
        let url = format!("{}/{}", self.base_url, call);
        let response = self
            .client
            .post(url)
            .json(&Empty {})
            .send()
            .await
            .map_err(|source| OrchestrationError::Request { call, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrchestrationError::Status {
                call,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LivenessSignal for SdkLiveness {
    async fn ready(&self) -> Result<(), OrchestrationError> {
        self.post("ready").await
    }

    async fn health(&self) -> Result<(), OrchestrationError> {
        self.post("health").await
    }

    async fn shutdown(&self) -> Result<(), OrchestrationError> {
        self.post("shutdown").await
    }
}

/// Signal used when running without an orchestrator. Only logs.
#[derive(Debug, Default)]
pub struct LocalLiveness;

#[async_trait]
impl LivenessSignal for LocalLiveness {
    async fn ready(&self) -> Result<(), OrchestrationError> {
        info!("Local mode: ready");
        Ok(())
    }

    async fn health(&self) -> Result<(), OrchestrationError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), OrchestrationError> {
        info!("Local mode: shutdown");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves a single HTTP request with `status` and hands back its request line.
    async fn one_shot_sidecar(status: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (line_tx, line_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut read = 0;
            // The request body is always `{}`; read it fully before replying.
            while !buf[..read].ends_with(b"\r\n\r\n{}") {
                let n = stream.read(&mut buf[read..]).await.unwrap();
                if n == 0 {
                    break;
                }
                read += n;
            }

            let request = String::from_utf8_lossy(&buf[..read]).to_string();
            let line = request.lines().next().unwrap_or_default().to_string();
            let _ = line_tx.send(line);

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}",
                status
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        (base_url, line_rx)
    }

    #[tokio::test]
    async fn test_ready_posts_to_sidecar() {
        let (base_url, line_rx) = one_shot_sidecar("200 OK").await;
        let signal = SdkLiveness::with_base_url(base_url).unwrap();

        signal.ready().await.unwrap();
        assert_eq!(line_rx.await.unwrap(), "POST /ready HTTP/1.1");
    }

    #[tokio::test]
    async fn test_health_posts_to_sidecar() {
        let (base_url, line_rx) = one_shot_sidecar("200 OK").await;
        let signal = SdkLiveness::with_base_url(format!("{}/", base_url)).unwrap();

        signal.health().await.unwrap();
        assert_eq!(line_rx.await.unwrap(), "POST /health HTTP/1.1");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (base_url, _line_rx) = one_shot_sidecar("500 Internal Server Error").await;
        let signal = SdkLiveness::with_base_url(base_url).unwrap();

        match signal.shutdown().await {
            Err(OrchestrationError::Status { call, status }) => {
                assert_eq!(call, "shutdown");
                assert_eq!(status, 500);
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_sidecar_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let signal = SdkLiveness::with_base_url(base_url).unwrap();
        assert!(matches!(
            signal.ready().await,
            Err(OrchestrationError::Request { call: "ready", .. })
        ));
    }

    #[tokio::test]
    async fn test_local_liveness_always_succeeds() {
        let signal = LocalLiveness;
        assert!(signal.ready().await.is_ok());
        assert!(signal.health().await.is_ok());
        assert!(signal.shutdown().await.is_ok());
    }
}
