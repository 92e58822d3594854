//! Sequential SQL injection sweep

use super::{check_reachable, PayloadProbe, SqlErrorProbe};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{PayloadResult, ProbeConfig, Target};
use tracing::{info, warn};

/// Sweeps every endpoint with the SQL injection corpus and returns the first hit
pub async fn sweep(target: &Target, config: &ProbeConfig) -> Result<Option<PayloadResult>> {
    let client = HttpClient::from_config(config)?;
    check_reachable(&client, target).await?;

    let probe = SqlErrorProbe::new(client, target.clone(), &config.injection_field);
    let hit = run_sequential(&probe, &config.endpoints, &config.sqli_payloads).await;

    info!(
        "SQLi: sweep finished after {} requests, {}",
        probe.client().request_count(),
        if hit.is_some() { "vulnerable" } else { "no signal" }
    );
    Ok(hit)
}

/// Walks endpoints (outer) and payloads (inner) in order, one request at a time.
/// Stops at the first match; failed requests are logged and skipped.
pub async fn run_sequential(
    probe: &dyn PayloadProbe,
    endpoints: &[String],
    payloads: &[String],
) -> Option<PayloadResult> {
    for endpoint in endpoints {
        for payload in payloads {
            match probe.probe(endpoint, payload).await {
                Ok(true) => {
                    warn!("SQL injection signal on {endpoint} with payload: {payload}");
                    return Some(PayloadResult {
                        payload: payload.clone(),
                        endpoint: endpoint.clone(),
                        matched: true,
                    });
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("SQLi probe of {endpoint} with payload {payload} failed: {e}");
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records calls and answers from a fixed script
    struct ScriptedProbe {
        calls: Mutex<Vec<(String, String)>>,
        hit: Option<(&'static str, &'static str)>,
        broken_payload: Option<&'static str>,
    }

    impl ScriptedProbe {
        fn new(hit: Option<(&'static str, &'static str)>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                hit,
                broken_payload: None,
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl PayloadProbe for ScriptedProbe {
        async fn probe(&self, endpoint: &str, payload: &str) -> Result<bool> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((endpoint.to_string(), payload.to_string()));
            }
            if self.broken_payload == Some(payload) {
                return Err(ProbeError::Config("connection reset".to_string()));
            }
            Ok(self.hit == Some((endpoint, payload)))
        }
    }

    fn corpus(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("p{i}")).collect()
    }

    #[tokio::test]
    async fn test_short_circuits_on_first_hit() {
        let probe = ScriptedProbe::new(Some(("/login", "p3")));
        let endpoints = vec!["/login".to_string()];

        let hit = run_sequential(&probe, &endpoints, &corpus(8)).await;

        assert_eq!(
            hit,
            Some(PayloadResult {
                payload: "p3".to_string(),
                endpoint: "/login".to_string(),
                matched: true,
            })
        );
        assert_eq!(probe.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_endpoints_are_the_outer_loop() {
        let probe = ScriptedProbe::new(Some(("/login", "p1")));
        let endpoints = vec!["/".to_string(), "/login".to_string()];

        let hit = run_sequential(&probe, &endpoints, &corpus(4)).await;

        assert_eq!(hit.map(|h| h.endpoint), Some("/login".to_string()));
        let calls = probe.calls();
        assert_eq!(calls.len(), 5);
        assert!(calls[..4].iter().all(|(endpoint, _)| endpoint == "/"));
    }

    #[tokio::test]
    async fn test_failed_requests_do_not_abort() {
        let mut probe = ScriptedProbe::new(Some(("/", "p4")));
        probe.broken_payload = Some("p2");
        let endpoints = vec!["/".to_string()];

        let hit = run_sequential(&probe, &endpoints, &corpus(5)).await;

        assert_eq!(hit.map(|h| h.payload), Some("p4".to_string()));
    }

    #[tokio::test]
    async fn test_exhausted_corpus_is_none() {
        let probe = ScriptedProbe::new(None);
        let endpoints = vec!["/".to_string(), "/login".to_string()];

        assert!(run_sequential(&probe, &endpoints, &corpus(3)).await.is_none());
        assert_eq!(probe.calls().len(), 6);
    }
}
