//! Configuration management for webprobe

use crate::error::{ProbeError, Result};
use crate::models::ProbeConfig;
use crate::scanner::injection::load_payloads;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File-based configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    http: Option<HttpSection>,
    csrf: Option<CsrfSection>,
    sweep: Option<SweepSection>,
    payloads: Option<PayloadsSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpSection {
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
    retries: Option<u32>,
    follow_redirects: Option<bool>,
    headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CsrfSection {
    page: Option<String>,
    field: Option<String>,
    session_cookie: Option<String>,
    attacker_session_id: Option<String>,
    grace_secs: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SweepSection {
    workers: Option<usize>,
    cooldown_secs: Option<f64>,
    endpoints: Option<Vec<String>>,
    deadline_secs: Option<f64>,
    xss_param: Option<String>,
    injection_field: Option<String>,
    match_escaped: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PayloadsSection {
    xss_file: Option<PathBuf>,
    sqli_file: Option<PathBuf>,
}

/// Loads configuration from a TOML file and merges with defaults.
/// Payload file paths are resolved relative to the config file.
pub fn load_config(path: &Path) -> Result<ProbeConfig> {
    let content = std::fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    build_config(&content, base_dir)
}

/// Parses TOML configuration text. Relative payload paths resolve against
/// the working directory.
pub fn parse_config(content: &str) -> Result<ProbeConfig> {
    build_config(content, Path::new("."))
}

fn build_config(content: &str, base_dir: &Path) -> Result<ProbeConfig> {
    let file_config: FileConfig = toml::from_str(content)?;
    let mut config = ProbeConfig::default();

    if let Some(http) = file_config.http {
        if let Some(timeout) = http.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(ua) = http.user_agent {
            config.user_agent = ua;
        }
        if let Some(retries) = http.retries {
            config.retries = retries;
        }
        if let Some(follow) = http.follow_redirects {
            config.follow_redirects = follow;
        }
        if let Some(headers) = http.headers {
            config.headers.extend(headers);
        }
    }

    if let Some(csrf) = file_config.csrf {
        if let Some(page) = csrf.page {
            config.csrf_page = page;
        }
        if let Some(field) = csrf.field {
            config.csrf_field = field;
        }
        if let Some(cookie) = csrf.session_cookie {
            config.session_cookie = cookie;
        }
        if let Some(id) = csrf.attacker_session_id {
            config.attacker_session_id = id;
        }
        if let Some(grace) = csrf.grace_secs {
            config.token_grace_secs = grace;
        }
    }

    if let Some(sweep) = file_config.sweep {
        if let Some(workers) = sweep.workers {
            config.worker_count = workers;
        }
        if let Some(cooldown) = sweep.cooldown_secs {
            config.cooldown_secs = cooldown;
        }
        if let Some(endpoints) = sweep.endpoints {
            config.endpoints = endpoints;
        }
        if let Some(deadline) = sweep.deadline_secs {
            config.sweep_deadline_secs = Some(deadline);
        }
        if let Some(param) = sweep.xss_param {
            config.xss_param = param;
        }
        if let Some(field) = sweep.injection_field {
            config.injection_field = field;
        }
        if let Some(escaped) = sweep.match_escaped {
            config.match_escaped = escaped;
        }
    }

    if let Some(payloads) = file_config.payloads {
        if let Some(file) = payloads.xss_file {
            config.payload_corpus = load_payloads(&base_dir.join(file))?;
        }
        if let Some(file) = payloads.sqli_file {
            config.sqli_payloads = load_payloads(&base_dir.join(file))?;
        }
    }

    Ok(config)
}

/// Merges CLI arguments into an existing ProbeConfig
#[allow(clippy::too_many_arguments)]
pub fn merge_cli_args(
    config: &mut ProbeConfig,
    workers: Option<usize>,
    timeout: Option<u64>,
    cooldown: Option<f64>,
    endpoints: Option<Vec<String>>,
    xss_payloads: Option<PathBuf>,
    sqli_payloads: Option<PathBuf>,
    deadline: Option<f64>,
    headers: Option<Vec<String>>,
) -> Result<()> {
    if let Some(w) = workers {
        config.worker_count = w;
    }
    if let Some(t) = timeout {
        config.timeout_secs = t;
    }
    if let Some(c) = cooldown {
        config.cooldown_secs = c;
    }
    if let Some(e) = endpoints {
        config.endpoints = e;
    }
    if let Some(path) = xss_payloads {
        config.payload_corpus = load_payloads(&path)?;
    }
    if let Some(path) = sqli_payloads {
        config.sqli_payloads = load_payloads(&path)?;
    }
    if let Some(d) = deadline {
        config.sweep_deadline_secs = Some(d);
    }
    if let Some(h) = headers {
        for header in h {
            let (key, value) = header.split_once(':').ok_or_else(|| {
                ProbeError::Config(format!("header '{header}' is not in 'Key: Value' form"))
            })?;
            config
                .headers
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(())
}
