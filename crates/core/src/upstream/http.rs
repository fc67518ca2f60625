//! JSON-over-HTTP implementations of the upstream boundaries.

use super::{Decision, RankedFacility, RankingClient, RankingContext, ReasoningClient, UpstreamError};
use crate::profile::Profile;
use crate::{CarePlanError, CarePlanResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Shared POST/JSON plumbing with the failure classification used by both clients.
#[derive(Clone, Debug)]
struct JsonEndpoint {
    client: reqwest::Client,
    url: String,
    timeout_ms: u64,
}

impl JsonEndpoint {
    fn new(url: impl Into<String>, timeout: Duration) -> CarePlanResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(CarePlanError::InvalidInput(
                "upstream URL cannot be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CarePlanError::HttpClient)?;
        Ok(Self {
            client,
            url,
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            UpstreamError::Connection(err.to_string())
        }
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        body: &B,
    ) -> Result<T, UpstreamError> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&bytes).trim().to_string();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(UpstreamError::Unavailable {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(UpstreamError::Rejected(format!("HTTP {status}: {message}")));
        }

        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Malformed(e.to_string()))
    }
}

/// Reasoning service client: POSTs the profile snapshot, expects a [`Decision`].
#[derive(Clone, Debug)]
pub struct HttpReasoningClient {
    endpoint: JsonEndpoint,
}

impl HttpReasoningClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> CarePlanResult<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(url, timeout)?,
        })
    }
}

#[async_trait]
impl ReasoningClient for HttpReasoningClient {
    async fn decide(&self, profile: &Profile) -> Result<Decision, UpstreamError> {
        self.endpoint.post(profile).await
    }
}

/// Ranking service client: POSTs `{disease_type, treatment_type}`, expects a facility list.
#[derive(Clone, Debug)]
pub struct HttpRankingClient {
    endpoint: JsonEndpoint,
}

impl HttpRankingClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> CarePlanResult<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(url, timeout)?,
        })
    }
}

#[async_trait]
impl RankingClient for HttpRankingClient {
    async fn rank(&self, context: &RankingContext) -> Result<Vec<RankedFacility>, UpstreamError> {
        self.endpoint.post(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Answer, ProfileField};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per connection and return the base URL.
    async fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/")
    }

    fn profile() -> Profile {
        let mut profile = Profile::new();
        profile.apply(&Answer::new(ProfileField::DiseaseType, "Breast Cancer"));
        profile
    }

    #[tokio::test]
    async fn decodes_successful_decision() {
        let url = serve(
            "200 OK",
            r#"{"diseaseType":"Breast Cancer","treatmentType":"Chemotherapy","timeline":"6 months","notes":""}"#,
        )
        .await;
        let client = HttpReasoningClient::new(url, Duration::from_secs(5)).unwrap();

        let decision = client.decide(&profile()).await.unwrap();
        assert_eq!(decision.treatment_type, "Chemotherapy");
    }

    #[tokio::test]
    async fn empty_ranking_is_success() {
        let url = serve("200 OK", "[]").await;
        let client = HttpRankingClient::new(url, Duration::from_secs(5)).unwrap();

        let context = RankingContext {
            disease_type: "Breast Cancer".into(),
            treatment_type: "Surgery".into(),
        };
        assert!(client.rank(&context).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let url = serve("503 Service Unavailable", r#"{"error":"busy"}"#).await;
        let client = HttpReasoningClient::new(url, Duration::from_secs(5)).unwrap();

        let err = client.decide(&profile()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn client_errors_are_rejections() {
        let url = serve("422 Unprocessable Entity", r#"{"error":"incomplete"}"#).await;
        let client = HttpReasoningClient::new(url, Duration::from_secs(5)).unwrap();

        let err = client.decide(&profile()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Rejected(ref msg) if msg.contains("422")));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn unparseable_body_is_malformed() {
        let url = serve("200 OK", r#"{"diseaseType":"#).await;
        let client = HttpReasoningClient::new(url, Duration::from_secs(5)).unwrap();

        let err = client.decide(&profile()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpReasoningClient::new(format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
        let err = client.decide(&profile()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Connection(_)));
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            HttpRankingClient::new("  ", Duration::from_secs(1)),
            Err(CarePlanError::InvalidInput(_))
        ));
    }
}
