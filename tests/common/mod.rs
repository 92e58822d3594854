//! Common test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use webprobe::models::ProbeConfig;
use wiremock::Request;

/// Fast, deterministic config for probing a wiremock server
pub fn test_config() -> ProbeConfig {
    ProbeConfig {
        timeout_secs: 2,
        worker_count: 4,
        cooldown_secs: 0.0,
        retries: 0,
        token_grace_secs: 0.0,
        user_agent: "webprobe-test/0.1.0".to_string(),
        ..ProbeConfig::default()
    }
}

/// Decodes an urlencoded request body
pub fn form_body(req: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&req.body)
        .into_owned()
        .collect()
}

/// Value of a query parameter
pub fn query_param(req: &Request, name: &str) -> Option<String> {
    req.url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Number of requests received with the given verb
pub fn count_method(requests: &[Request], verb: &str) -> usize {
    requests
        .iter()
        .filter(|r| r.method.as_str() == verb)
        .count()
}

/// Login page with a single POST form carrying a hidden token
pub fn form_page(token: &str) -> String {
    format!(
        r#"<html><body>
        <form action="/submit" method="post">
            <input type="hidden" name="csrf_token" value="{token}">
            <input type="text" name="comment" value="hello">
        </form>
        </body></html>"#
    )
}
