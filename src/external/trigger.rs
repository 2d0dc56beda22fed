//! Remote poll trigger: asks a running service to poll its cron jobs.

use serde_json::json;

use crate::api::dto::CronRunResponse;
use crate::external::fetch::{BackoffClient, FetchError};

pub const RUN_PATH: &str = "/api/cron/run";

#[derive(Clone)]
pub struct CronTriggerClient {
    client: BackoffClient,
}

impl CronTriggerClient {
    pub fn new(client: BackoffClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BackoffClient {
        &self.client
    }

    /// `POST /api/cron/run` and decode the poll report.
    ///
    /// Non-2xx answers become `FetchError::Status` carrying the response body.
    pub async fn run(&self) -> Result<CronRunResponse, FetchError> {
        let response = self.client.post(RUN_PATH, &json!({})).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await?;
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<CronRunResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackoffConfig;
    use crate::external::backoff::BackoffState;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn trigger(base: &str) -> CronTriggerClient {
        let client = BackoffClient::new(
            reqwest::Client::new(),
            base,
            BackoffState::new(BackoffConfig::default()),
        )
        .unwrap()
        .with_access_token("token-1");
        CronTriggerClient::new(client)
    }

    #[tokio::test]
    async fn test_run_decodes_report() {
        let router = Router::new().route(
            RUN_PATH,
            post(|headers: HeaderMap| async move {
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer token-1")
                );
                axum::Json(serde_json::json!({
                    "success": true,
                    "summary": { "total_jobs": 2, "executed": 1, "skipped": 1, "failed": 0 },
                    "results": [
                        {
                            "job_id": 1,
                            "job_name": "Activity reminders",
                            "status": "executed",
                            "next_run": "2025-01-01T00:05:00Z"
                        },
                        { "job_id": 2, "job_name": "Daily digest", "status": "skipped" }
                    ],
                    "duration_ms": 4
                }))
            }),
        );
        let base = spawn_server(router).await;

        let report = trigger(&base).run().await.unwrap();
        assert!(report.success);
        assert_eq!(report.summary.executed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.results.len(), 2);
        assert!(report.results[1].next_run.is_none());
    }

    #[tokio::test]
    async fn test_forbidden_becomes_status_error() {
        let router = Router::new().route(
            RUN_PATH,
            post(|| async { (StatusCode::FORBIDDEN, "admin role required") }),
        );
        let base = spawn_server(router).await;

        match trigger(&base).run().await {
            Err(FetchError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.contains("admin"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_truncated_error_body_is_transport_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"{}") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            // advertises more body than is sent before the connection closes
            socket
                .write_all(b"HTTP/1.1 403 Forbidden\r\ncontent-length: 64\r\n\r\nadmin")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let err = trigger(&format!("http://{addr}")).run().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_rate_limited_run_then_cooling() {
        let router = Router::new().route(
            RUN_PATH,
            post(|| async { StatusCode::TOO_MANY_REQUESTS }),
        );
        let base = spawn_server(router).await;

        let trigger = trigger(&base);
        let first = trigger.run().await.unwrap_err();
        assert!(matches!(first, FetchError::Status { status: 429, .. }));
        assert!(trigger.run().await.unwrap_err().is_cooling());
    }
}
