//! Integration tests for the SQL injection and XSS sweeps

mod common;

use common::{count_method, form_body, query_param, test_config};
use std::collections::HashSet;
use std::time::Duration;
use webprobe::models::{Category, PayloadResult, Target, VerdictStatus};
use webprobe::scanner::injection::{default_sqli_payloads, sqli, xss};
use webprobe::{run_probes, ProbeConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn mount_home(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>home</h1>"))
        .mount(server)
        .await;
}

/// Echoes `q` back only when it contains "reflect"
async fn mount_reflector(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(|req: &Request| match query_param(req, "q") {
            Some(q) if q.contains("reflect") => {
                ResponseTemplate::new(200).set_body_string(format!("<p>Results for {q}</p>"))
            }
            Some(_) => ResponseTemplate::new(200).set_body_string("<p>No results</p>"),
            None => ResponseTemplate::new(200).set_body_string("<h1>home</h1>"),
        })
        .mount(server)
        .await;
}

fn match_set(matches: &[PayloadResult]) -> HashSet<(String, String)> {
    matches
        .iter()
        .map(|m| (m.endpoint.clone(), m.payload.clone()))
        .collect()
}

#[tokio::test]
async fn test_sqli_stops_at_first_error_signal() {
    let server = MockServer::start().await;
    mount_home(&server).await;

    let trigger = default_sqli_payloads()[2].clone();
    let expected = trigger.clone();
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(move |req: &Request| {
            let body = form_body(req);
            if body.get("username") == Some(&trigger) {
                ResponseTemplate::new(500)
                    .set_body_string("You have an error in your SQL syntax near 'UNION'")
            } else {
                ResponseTemplate::new(200).set_body_string("Invalid credentials")
            }
        })
        .mount(&server)
        .await;

    let config = ProbeConfig {
        endpoints: vec!["/login".to_string()],
        ..test_config()
    };
    let categories = [Category::SqlInjection].into_iter().collect();
    let report = run_probes(&server.uri(), &categories, &config)
        .await
        .expect("run");

    let sqli = report.sweep(Category::SqlInjection).expect("sqli entry");
    assert_eq!(sqli.status, VerdictStatus::Fail);
    assert_eq!(sqli.count, 1);
    assert_eq!(sqli.payloads[0].payload, expected);
    assert_eq!(sqli.payloads[0].endpoint, "/login");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(count_method(&requests, "POST"), 3);
    assert!(requests
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .all(|r| form_body(r).get("password").map(String::as_str) == Some("any")));
}

#[tokio::test]
async fn test_sqli_clean_target_tries_every_payload() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome"))
        .mount(&server)
        .await;

    let config = test_config();
    let target = Target::parse(&server.uri()).expect("target");
    let hit = sqli::sweep(&target, &config).await.expect("sweep");

    assert!(hit.is_none());
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(
        count_method(&requests, "POST"),
        config.endpoints.len() * config.sqli_payloads.len()
    );
}

#[tokio::test]
async fn test_sqli_unreachable_target_is_an_error() {
    let config = test_config();
    let target = Target::parse("http://127.0.0.1:1").expect("target");
    assert!(sqli::sweep(&target, &config).await.is_err());
}

#[tokio::test]
async fn test_xss_matches_independent_of_worker_count() {
    let server = MockServer::start().await;
    mount_reflector(&server).await;

    let payloads: Vec<String> = (0..5)
        .map(|i| {
            if i % 2 == 0 && i > 0 {
                format!("<i>reflect-{i}</i>")
            } else {
                format!("<i>plain-{i}</i>")
            }
        })
        .collect();
    let target = Target::parse(&server.uri()).expect("target");

    let mut observed = Vec::new();
    for workers in [1, 10] {
        let config = ProbeConfig {
            worker_count: workers,
            endpoints: vec!["/search".to_string(), "/page".to_string()],
            payload_corpus: payloads.clone(),
            ..test_config()
        };
        let sweep = xss::sweep(&target, &config).await.expect("sweep");
        assert_eq!(sweep.attempted, 10);
        assert!(!sweep.deadline_exceeded);
        observed.push(match_set(&sweep.matches));
    }

    let expected: HashSet<(String, String)> = ["/search", "/page"]
        .iter()
        .flat_map(|endpoint| {
            [2, 4]
                .into_iter()
                .map(move |i| (endpoint.to_string(), format!("<i>reflect-{i}</i>")))
        })
        .collect();
    assert_eq!(observed[0], expected);
    assert_eq!(observed[1], expected);
}

#[tokio::test]
async fn test_xss_every_task_reported_once() {
    let server = MockServer::start().await;
    mount_reflector(&server).await;

    let payloads: Vec<String> = (0..100).map(|i| format!("reflect-{i}")).collect();
    let config = ProbeConfig {
        worker_count: 20,
        endpoints: vec!["/".to_string()],
        payload_corpus: payloads,
        ..test_config()
    };
    let target = Target::parse(&server.uri()).expect("target");

    let sweep = xss::sweep(&target, &config).await.expect("sweep");

    assert_eq!(sweep.matches.len(), 100);
    assert_eq!(match_set(&sweep.matches).len(), 100);

    let requests = server.received_requests().await.expect("recording enabled");
    let probes = requests
        .iter()
        .filter(|r| query_param(r, "q").is_some())
        .count();
    assert_eq!(probes, 100);
}

#[tokio::test]
async fn test_xss_slow_endpoint_yields_no_matches() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<script>alert(1)</script>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ProbeConfig {
        timeout_secs: 1,
        worker_count: 8,
        endpoints: vec!["/slow".to_string()],
        ..test_config()
    };
    let target = Target::parse(&server.uri()).expect("target");

    let sweep = xss::sweep(&target, &config).await.expect("sweep");
    assert!(sweep.matches.is_empty());
    assert_eq!(sweep.attempted, config.payload_corpus.len());
}

#[tokio::test]
async fn test_xss_deadline_marks_report_partial() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("nothing here")
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let config = ProbeConfig {
        worker_count: 1,
        endpoints: vec!["/search".to_string()],
        sweep_deadline_secs: Some(0.5),
        ..test_config()
    };
    let categories = [Category::Xss].into_iter().collect();
    let report = run_probes(&server.uri(), &categories, &config)
        .await
        .expect("run");

    let entry = report.sweep(Category::Xss).expect("xss entry");
    assert_eq!(entry.status, VerdictStatus::Pass);
    assert!(entry.partial);
}

#[tokio::test]
async fn test_xss_unreachable_target_reports_error() {
    let categories = [Category::Xss].into_iter().collect();
    let report = run_probes("http://127.0.0.1:1", &categories, &test_config())
        .await
        .expect("run");

    let entry = report.sweep(Category::Xss).expect("xss entry");
    assert_eq!(entry.status, VerdictStatus::Error);
    assert!(entry.error.is_some());
    assert_eq!(entry.count, 0);
}
