//! Core data models for webprobe

use crate::error::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// The site under test. Immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    base_url: Url,
}

impl Target {
    /// Validates a caller-supplied target. Only absolute http(s) URLs are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProbeError::InvalidTarget("target is empty".to_string()));
        }

        let base_url = Url::parse(trimmed)
            .map_err(|e| ProbeError::InvalidTarget(format!("{trimmed}: {e}")))?;

        if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
            return Err(ProbeError::InvalidTarget(format!(
                "{trimmed}: expected an http(s) URL with a host"
            )));
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a path (or absolute URL) against the base URL
    pub fn join(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

/// Probe category selectable by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Csrf,
    Xss,
    SqlInjection,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Csrf, Category::Xss, Category::SqlInjection];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Csrf => "csrf",
            Category::Xss => "xss",
            Category::SqlInjection => "sql_injection",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csrf" => Ok(Category::Csrf),
            "xss" => Ok(Category::Xss),
            "sql_injection" | "sql" | "sqli" => Ok(Category::SqlInjection),
            other => Err(ProbeError::UnknownCategory(other.to_string())),
        }
    }
}

/// HTTP verb a form is submitted with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl FormMethod {
    /// Parses the `method` attribute of a form. A missing or blank attribute means POST.
    pub fn from_markup(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(FormMethod::Post),
            Some(value) => value.parse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormMethod::Get => "GET",
            FormMethod::Post => "POST",
            FormMethod::Put => "PUT",
            FormMethod::Patch => "PATCH",
        }
    }
}

impl FromStr for FormMethod {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(FormMethod::Get),
            "POST" => Ok(FormMethod::Post),
            "PUT" => Ok(FormMethod::Put),
            "PATCH" => Ok(FormMethod::Patch),
            _ => Err(ProbeError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for FormMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FormMethod> for reqwest::Method {
    fn from(method: FormMethod) -> Self {
        match method {
            FormMethod::Get => reqwest::Method::GET,
            FormMethod::Post => reqwest::Method::POST,
            FormMethod::Put => reqwest::Method::PUT,
            FormMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// The first form of a page, normalized. Derived fresh from each fetch and
/// never mutated: callers that need different fields copy `fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    /// Absolute URL the form submits to
    pub action: String,
    pub method: FormMethod,
    pub fields: BTreeMap<String, String>,
}

/// Where a CSRF token was found
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TokenSource {
    MetaTag,
    HiddenField,
    Absent,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::MetaTag => write!(f, "meta-tag"),
            TokenSource::HiddenField => write!(f, "hidden-field"),
            TokenSource::Absent => write!(f, "absent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    pub value: String,
    pub source: TokenSource,
}

impl CsrfToken {
    pub fn absent() -> Self {
        Self {
            value: String::new(),
            source: TokenSource::Absent,
        }
    }

    pub fn is_present(&self) -> bool {
        self.source != TokenSource::Absent
    }
}

/// Outcome of one probe or sweep
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    /// No vulnerability found
    Pass,
    /// Vulnerability confirmed
    Fail,
    /// The probe could not complete. Never a pass.
    Error,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictStatus::Pass => write!(f, "pass"),
            VerdictStatus::Fail => write!(f, "fail"),
            VerdictStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evidence {
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::Text(text) => f.write_str(text),
            Evidence::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<String> for Evidence {
    fn from(s: String) -> Self {
        Evidence::Text(s)
    }
}

impl From<&str> for Evidence {
    fn from(s: &str) -> Self {
        Evidence::Text(s.to_string())
    }
}

impl From<Vec<String>> for Evidence {
    fn from(items: Vec<String>) -> Self {
        Evidence::List(items)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            status: VerdictStatus::Pass,
            evidence: None,
        }
    }

    pub fn fail() -> Self {
        Self {
            status: VerdictStatus::Fail,
            evidence: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Error,
            evidence: Some(Evidence::Text(message.into())),
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<Evidence>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status == VerdictStatus::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.status == VerdictStatus::Fail
    }
}

/// One outcome of the payload sweep engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayloadResult {
    pub payload: String,
    pub endpoint: String,
    pub matched: bool,
}

/// Options recognized by a probe run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// XSS worker pool size
    pub worker_count: usize,
    /// Delay between successive requests of one XSS worker
    pub cooldown_secs: f64,
    /// Paths probed by the sweeps, in order
    pub endpoints: Vec<String>,
    /// XSS corpus
    pub payload_corpus: Vec<String>,
    /// SQL injection corpus
    pub sqli_payloads: Vec<String>,
    /// Extra attempts after a transport failure or HTTP 429
    pub retries: u32,
    pub user_agent: String,
    pub follow_redirects: bool,
    /// Headers sent with every request
    pub headers: HashMap<String, String>,
    /// Page holding the form the CSRF suite exercises
    pub csrf_page: String,
    /// Name of the hidden input / cookie carrying the CSRF token
    pub csrf_field: String,
    pub session_cookie: String,
    pub attacker_session_id: String,
    /// Wait between the two submissions of `token_expiration`
    pub token_grace_secs: f64,
    /// Query parameter receiving XSS payloads
    pub xss_param: String,
    /// Form field receiving SQL injection payloads
    pub injection_field: String,
    /// Also count an HTML-escaped reflection as an XSS match
    pub match_escaped: bool,
    /// Overall XSS sweep deadline. Collected matches survive expiry.
    pub sweep_deadline_secs: Option<f64>,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        secs_to_duration(self.cooldown_secs)
    }

    pub fn token_grace(&self) -> Duration {
        secs_to_duration(self.token_grace_secs)
    }

    pub fn sweep_deadline(&self) -> Option<Duration> {
        self.sweep_deadline_secs.map(secs_to_duration)
    }

    /// Rejects option combinations no run can honor
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(ProbeError::Config("worker_count must be at least 1".to_string()));
        }
        if self.endpoints.is_empty() {
            return Err(ProbeError::Config("at least one endpoint is required".to_string()));
        }
        let intervals = [
            ("cooldown_secs", Some(self.cooldown_secs)),
            ("token_grace_secs", Some(self.token_grace_secs)),
            ("sweep_deadline_secs", self.sweep_deadline_secs),
        ];
        for (name, value) in intervals {
            if let Some(secs) = value {
                if !secs.is_finite() || secs < 0.0 {
                    return Err(ProbeError::Config(format!(
                        "{name} must be a finite, non-negative number of seconds, got {secs}"
                    )));
                }
            }
        }
        if self.csrf_field.is_empty() || self.session_cookie.is_empty() {
            return Err(ProbeError::Config(
                "csrf_field and session_cookie must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Negative and NaN map to zero, anything too large for a Duration saturates
fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            worker_count: 10,
            cooldown_secs: 0.5,
            endpoints: vec!["/".to_string(), "/login".to_string()],
            payload_corpus: crate::scanner::injection::default_xss_payloads(),
            sqli_payloads: crate::scanner::injection::default_sqli_payloads(),
            retries: 1,
            user_agent: "webprobe/0.1.0".to_string(),
            follow_redirects: true,
            headers: HashMap::new(),
            csrf_page: "/".to_string(),
            csrf_field: "csrf_token".to_string(),
            session_cookie: "PHPSESSID".to_string(),
            attacker_session_id: "attacker_session_id_12345".to_string(),
            token_grace_secs: 5.0,
            xss_param: "q".to_string(),
            injection_field: "username".to_string(),
            match_escaped: false,
            sweep_deadline_secs: None,
        }
    }
}
