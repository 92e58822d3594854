//! CSRF probe suite
//!
//! Nine probes run in a fixed order against one [`SessionState`]. Several of
//! them submit forms and so change what the server will answer next; each
//! probe therefore fetches its own form immediately before acting and never
//! reuses another probe's snapshot.

pub mod forms;
pub mod session;
pub mod token;

use crate::http::SessionState;
use crate::models::{Category, ProbeConfig, Target, Verdict};
use crate::report::CategoryOutcome;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// One named CSRF check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CsrfProbe {
    TokenPresence,
    TokenReuse,
    SessionFixation,
    UnsafeGet,
    MissingTokenOnPost,
    DoubleSubmitCookie,
    TokenExpiration,
    TokenFormat,
    DynamicToken,
}

impl CsrfProbe {
    /// Suite order. Probes that submit forms depend on running in this order.
    pub const SUITE: [CsrfProbe; 9] = [
        CsrfProbe::TokenPresence,
        CsrfProbe::TokenReuse,
        CsrfProbe::SessionFixation,
        CsrfProbe::UnsafeGet,
        CsrfProbe::MissingTokenOnPost,
        CsrfProbe::DoubleSubmitCookie,
        CsrfProbe::TokenExpiration,
        CsrfProbe::TokenFormat,
        CsrfProbe::DynamicToken,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CsrfProbe::TokenPresence => "token_presence",
            CsrfProbe::TokenReuse => "token_reuse",
            CsrfProbe::SessionFixation => "session_fixation",
            CsrfProbe::UnsafeGet => "unsafe_get",
            CsrfProbe::MissingTokenOnPost => "missing_token_on_post",
            CsrfProbe::DoubleSubmitCookie => "double_submit_cookie",
            CsrfProbe::TokenExpiration => "token_expiration",
            CsrfProbe::TokenFormat => "token_format",
            CsrfProbe::DynamicToken => "dynamic_token",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CsrfProbe::TokenPresence => "page exposes a CSRF token (meta tag or hidden field)",
            CsrfProbe::TokenReuse => "token rotates after a tokenless submission",
            CsrfProbe::SessionFixation => "session id is regenerated, attacker id is dropped",
            CsrfProbe::UnsafeGet => "no state-changing action is reachable by GET form",
            CsrfProbe::MissingTokenOnPost => "every POST form carries a hidden token",
            CsrfProbe::DoubleSubmitCookie => "token cookie matches the form token",
            CsrfProbe::TokenExpiration => "a used token cannot be replayed",
            CsrfProbe::TokenFormat => "token is well formed, or malformed tokens are refused",
            CsrfProbe::DynamicToken => "token changes after a normal submission",
        }
    }

    /// Runs the probe. Fetch, parse, and transport failures become an `error`
    /// verdict here and never reach sibling probes.
    pub async fn run(self, session: &mut SessionState, config: &ProbeConfig) -> Verdict {
        let result = match self {
            CsrfProbe::TokenPresence => token::token_presence(session, config).await,
            CsrfProbe::TokenReuse => token::token_reuse(session, config).await,
            CsrfProbe::SessionFixation => session::session_fixation(session, config).await,
            CsrfProbe::UnsafeGet => forms::unsafe_get(session, config).await,
            CsrfProbe::MissingTokenOnPost => forms::missing_token_on_post(session, config).await,
            CsrfProbe::DoubleSubmitCookie => session::double_submit_cookie(session, config).await,
            CsrfProbe::TokenExpiration => token::token_expiration(session, config).await,
            CsrfProbe::TokenFormat => token::token_format(session, config).await,
            CsrfProbe::DynamicToken => token::dynamic_token(session, config).await,
        };

        match result {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("CSRF probe '{}' could not complete: {e}", self.name());
                Verdict::error(e.to_string())
            }
        }
    }
}

impl fmt::Display for CsrfProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs `probes` one after another on the same session, preserving their order
pub async fn run_suite(
    session: &mut SessionState,
    config: &ProbeConfig,
    probes: &[CsrfProbe],
) -> Vec<(CsrfProbe, Verdict)> {
    let mut verdicts = Vec::with_capacity(probes.len());

    for &probe in probes {
        info!("CSRF: running {probe}");
        let verdict = probe.run(session, config).await;
        info!("CSRF: {probe} -> {}", verdict.status);
        verdicts.push((probe, verdict));
    }

    verdicts
}

/// CSRF category scanner: one session per run, suite order
pub struct CsrfScanner;

#[async_trait]
impl super::Scanner for CsrfScanner {
    fn category(&self) -> Category {
        Category::Csrf
    }

    fn description(&self) -> &str {
        "CSRF suite: token presence, rotation, expiry, format, session fixation, form audits"
    }

    async fn scan(&self, target: &Target, config: &ProbeConfig) -> CategoryOutcome {
        let verdicts = match SessionState::open(target.clone(), config) {
            Ok(mut session) => {
                let verdicts = run_suite(&mut session, config, &CsrfProbe::SUITE).await;
                info!(
                    "CSRF: suite finished after {} requests",
                    session.request_count()
                );
                verdicts
            }
            Err(e) => {
                warn!("CSRF: could not open session: {e}");
                CsrfProbe::SUITE
                    .iter()
                    .map(|&probe| (probe, Verdict::error(e.to_string())))
                    .collect()
            }
        };

        CategoryOutcome::Csrf(verdicts)
    }
}
