//! End-to-end tests for run_probes and the JSON report

mod common;

use common::{form_page, test_config};
use std::collections::BTreeSet;
use webprobe::models::{Category, VerdictStatus};
use webprobe::report::json;
use webprobe::scanner::csrf::CsrfProbe;
use webprobe::{run_probes, ProbeConfig, ProbeError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(form_page("static-token")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>login</p>"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_empty_selection_sends_no_requests() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let result = run_probes(&server.uri(), &BTreeSet::new(), &test_config()).await;

    assert!(matches!(result, Err(ProbeError::EmptyCategorySelection)));
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_invalid_target_is_rejected() {
    let all: BTreeSet<Category> = Category::ALL.into_iter().collect();
    for target in ["", "example.com", "mailto:someone@example.com"] {
        let result = run_probes(target, &all, &test_config()).await;
        assert!(
            matches!(result, Err(ProbeError::InvalidTarget(_))),
            "{target:?} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_invalid_config_sends_no_requests() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let config = ProbeConfig {
        endpoints: Vec::new(),
        ..test_config()
    };
    let all: BTreeSet<Category> = Category::ALL.into_iter().collect();
    let result = run_probes(&server.uri(), &all, &config).await;

    assert!(matches!(result, Err(ProbeError::Config(_))));
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_full_run_report_shape() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let all: BTreeSet<Category> = Category::ALL.into_iter().collect();
    let report = run_probes(&server.uri(), &all, &test_config())
        .await
        .expect("run");

    assert_eq!(report.len(), 3);
    let csrf = report.csrf().expect("csrf entry");
    assert_eq!(csrf.probes.len(), CsrfProbe::SUITE.len());
    assert_eq!(
        csrf.verdict(CsrfProbe::TokenReuse).map(|v| v.status),
        Some(VerdictStatus::Fail)
    );
    assert_eq!(
        report.sweep(Category::Xss).map(|s| s.status),
        Some(VerdictStatus::Pass)
    );
    assert_eq!(
        report.sweep(Category::SqlInjection).map(|s| s.status),
        Some(VerdictStatus::Pass)
    );
    assert!(report.has_failures());

    let rendered = json::to_string(&report).expect("render");
    let value: serde_json::Value = serde_json::from_str(&rendered).expect("parse");
    let keys: Vec<&String> = value.as_object().expect("object").keys().collect();
    assert_eq!(keys.len(), 3);
    for key in ["csrf", "xss", "sql_injection"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["xss"]["count"], 0);
    assert_eq!(value["xss"]["payloads"], serde_json::json!([]));
    assert!(value["xss"].get("partial").is_none());
    assert_eq!(value["csrf"]["token_presence"]["status"], "pass");

    let category_positions: Vec<usize> = ["\"csrf\"", "\"xss\"", "\"sql_injection\""]
        .iter()
        .map(|key| rendered.find(key).expect("category key"))
        .collect();
    assert!(category_positions.windows(2).all(|w| w[0] < w[1]));

    let probe_positions: Vec<usize> = CsrfProbe::SUITE
        .iter()
        .map(|p| rendered.find(&format!("\"{}\"", p.name())).expect("probe key"))
        .collect();
    assert!(probe_positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_single_category_report() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let only_csrf: BTreeSet<Category> = ["csrf".parse::<Category>().expect("category")]
        .into_iter()
        .collect();
    let report = run_probes(&server.uri(), &only_csrf, &test_config())
        .await
        .expect("run");

    assert_eq!(report.len(), 1);
    assert!(report.csrf().is_some());
    assert!(report.get(Category::Xss).is_none());

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.iter().all(|r| r.url.query_pairs().all(|(k, _)| k != "q")));
}

#[test]
fn test_category_aliases() {
    assert_eq!("sqli".parse::<Category>().ok(), Some(Category::SqlInjection));
    assert_eq!("SQL".parse::<Category>().ok(), Some(Category::SqlInjection));
    assert!(matches!(
        "rce".parse::<Category>(),
        Err(ProbeError::UnknownCategory(_))
    ));
}
