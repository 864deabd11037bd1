//! HTTP client for a running decision service.
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use trolley_sim::{
    CompareOutcome, CompareRequest, DecisionService, SingleDecision, SingleRequest,
    TransportError,
};

pub const DECIDE_PATH: &str = "/decide_v2";
pub const COMPARE_PATH: &str = "/compare";

#[derive(Debug, Clone)]
pub struct HttpDecisionService {
    client: Client,
    base_url: String,
}

impl HttpDecisionService {
    /// Client for the service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Network(format!("failed to create HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("POST {}", self.url(path));
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?
            .error_for_status()
            .map_err(|err| TransportError::Status(err.status().map_or(0, |s| s.as_u16())))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

#[async_trait(?Send)]
impl DecisionService for HttpDecisionService {
    async fn decide(&self, request: &SingleRequest) -> Result<SingleDecision, TransportError> {
        self.post(DECIDE_PATH, request).await
    }

    async fn compare(&self, request: &CompareRequest) -> Result<CompareOutcome, TransportError> {
        self.post(COMPARE_PATH, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use trolley_sim::{
        AgeCategory, Mode, ModeSet, PersonRecord, RoleCategory, Scenario, TrackId, build_compare,
        build_single,
    };

    /// Serve one canned response and hand back the raw request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (format!("http://{addr}/"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    fn scenario() -> Scenario {
        let mut scenario = Scenario::default();
        scenario.add_person(
            TrackId::One,
            PersonRecord::new(AgeCategory::Teen, RoleCategory::Student),
        );
        scenario.add_person(
            TrackId::Two,
            PersonRecord::new(AgeCategory::Adult, RoleCategory::Nurse),
        );
        scenario
    }

    #[tokio::test]
    async fn decide_posts_payload_and_parses_response() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"chosen_track":2,"reason":"Lower loss.","track1_count":1,"track2_count":1}"#,
        )
        .await;
        let service = HttpDecisionService::new(url, Duration::from_secs(5)).unwrap();
        let request = build_single(&scenario(), Mode::Utilitarian).unwrap();

        let decision = service.decide(&request).await.unwrap();
        assert_eq!(decision.chosen_track, TrackId::Two);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /decide_v2 "));
        assert!(raw.contains(r#""mode":"utilitarian""#));
    }

    #[tokio::test]
    async fn compare_hits_compare_endpoint() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"results":{"utilitarian":{"chosen_track":1,"reason":"x"}},"manual":{"manual_choice":null,"agreements":{}},"stats":{"total_manual_decisions":0,"total_ai_agreements":0,"agreement_rate":null}}"#,
        )
        .await;
        let service = HttpDecisionService::new(url, Duration::from_secs(5)).unwrap();
        let request = build_compare(&scenario(), ModeSet::all()).unwrap();

        let outcome = service.compare(&request).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert!(server.await.unwrap().starts_with("POST /compare "));
    }

    #[tokio::test]
    async fn error_status_maps_to_status_error() {
        let (url, _server) = serve_once("503 Service Unavailable", "{}").await;
        let service = HttpDecisionService::new(url, Duration::from_secs(5)).unwrap();
        let request = build_single(&scenario(), Mode::Ml).unwrap();
        assert_eq!(
            service.decide(&request).await,
            Err(TransportError::Status(503))
        );
    }

    #[tokio::test]
    async fn malformed_body_maps_to_decode_error() {
        let (url, _server) = serve_once("200 OK", r#"{"chosen_track":0}"#).await;
        let service = HttpDecisionService::new(url, Duration::from_secs(5)).unwrap();
        let request = build_single(&scenario(), Mode::Ml).unwrap();
        assert!(matches!(
            service.decide(&request).await,
            Err(TransportError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_service_maps_to_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let service =
            HttpDecisionService::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let request = build_single(&scenario(), Mode::Ml).unwrap();
        assert!(matches!(
            service.decide(&request).await,
            Err(TransportError::Network(_))
        ));
    }
}
