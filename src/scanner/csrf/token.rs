//! Token lifecycle probes: presence, rotation, expiry, and format

use crate::error::Result;
use crate::http::SessionState;
use crate::models::{CsrfToken, FormSnapshot, ProbeConfig, Verdict};
use regex::Regex;
use std::collections::BTreeMap;
use tokio::time::sleep;
use tracing::debug;

/// Shape a well-formed token must have
const TOKEN_PATTERN: &str = r"^[A-Za-z0-9]{32}$";

/// Value submitted when checking that malformed tokens are refused
pub const MALFORMED_TOKEN: &str = "invalid_format_token";

/// Fails when the page carries no CSRF token at all
pub async fn token_presence(session: &mut SessionState, config: &ProbeConfig) -> Result<Verdict> {
    let page = session.fetch(&config.csrf_page).await?;
    let token = session.extract_token(&page.body, &config.csrf_field);
    Ok(judge_presence(&token, &config.csrf_field))
}

/// Submits the form without its token and checks the server issued a new one afterward
pub async fn token_reuse(session: &mut SessionState, config: &ProbeConfig) -> Result<Verdict> {
    let page = session.fetch(&config.csrf_page).await?;
    let before = session.extract_token(&page.body, &config.csrf_field);
    if !before.is_present() {
        return Ok(missing_token());
    }
    let form = session.extract_form(&page.body)?;

    let mut fields = form.fields.clone();
    fields.remove(&config.csrf_field);
    let submitted = session.submit(&form, &fields).await?;
    debug!("Tokenless submission answered {}", submitted.status);

    let page = session.fetch(&config.csrf_page).await?;
    let after = session.extract_token(&page.body, &config.csrf_field);

    Ok(judge_rotation(&before.value, present_value(&after)))
}

/// Submits the form with its token and checks the token changed afterward
pub async fn dynamic_token(session: &mut SessionState, config: &ProbeConfig) -> Result<Verdict> {
    let Some((form, before)) = tokened_form(session, config).await? else {
        return Ok(missing_token());
    };

    let fields = fields_with_token(&form, &config.csrf_field, &before.value);
    let submitted = session.submit(&form, &fields).await?;
    debug!("Tokened submission answered {}", submitted.status);

    let page = session.fetch(&config.csrf_page).await?;
    let after = session.extract_token(&page.body, &config.csrf_field);

    Ok(judge_rotation(&before.value, present_value(&after)))
}

/// Replays a used token after the grace interval; acceptance means it never expired
pub async fn token_expiration(
    session: &mut SessionState,
    config: &ProbeConfig,
) -> Result<Verdict> {
    let Some((form, token)) = tokened_form(session, config).await? else {
        return Ok(missing_token());
    };

    let fields = fields_with_token(&form, &config.csrf_field, &token.value);
    let first = session.submit(&form, &fields).await?;
    debug!("First submission answered {}", first.status);

    sleep(config.token_grace()).await;

    let replay = session.submit(&form, &fields).await?;

    Ok(judge_replay(replay.status, "replayed token"))
}

/// Well-formed tokens pass outright; otherwise a malformed value must be refused
pub async fn token_format(session: &mut SessionState, config: &ProbeConfig) -> Result<Verdict> {
    let Some((form, token)) = tokened_form(session, config).await? else {
        return Ok(missing_token());
    };

    if is_well_formed_token(&token.value) {
        return Ok(Verdict::pass().with_evidence(format!(
            "{} token is 32 alphanumeric characters",
            token.source
        )));
    }

    let fields = fields_with_token(&form, &config.csrf_field, MALFORMED_TOKEN);
    let response = session.submit(&form, &fields).await?;

    Ok(judge_replay(response.status, "malformed token"))
}

/// Fetches the CSRF page and returns its first form with the page's token,
/// wherever the page exposes it. `None` when the page carries no token.
async fn tokened_form(
    session: &mut SessionState,
    config: &ProbeConfig,
) -> Result<Option<(FormSnapshot, CsrfToken)>> {
    let (page, form) = session.fetch_form(&config.csrf_page).await?;
    let token = session.extract_token(&page.body, &config.csrf_field);
    Ok(token.is_present().then_some((form, token)))
}

/// Form fields with `field` set to `value`, whether or not the markup had it
pub fn fields_with_token(
    form: &FormSnapshot,
    field: &str,
    value: &str,
) -> BTreeMap<String, String> {
    let mut fields = form.fields.clone();
    fields.insert(field.to_string(), value.to_string());
    fields
}

pub fn is_well_formed_token(token: &str) -> bool {
    Regex::new(TOKEN_PATTERN)
        .map(|re| re.is_match(token))
        .unwrap_or(false)
}

pub fn judge_presence(token: &CsrfToken, field: &str) -> Verdict {
    if token.is_present() {
        Verdict::pass().with_evidence(format!("{} token: {}", token.source, token.value))
    } else {
        Verdict::fail().with_evidence(format!(
            "no csrf-token meta tag and no hidden '{field}' input in the first form"
        ))
    }
}

/// A token observed before a submission must differ from the one observed after
pub fn judge_rotation(before: &str, after: Option<&str>) -> Verdict {
    match after {
        Some(after) if after == before => Verdict::fail()
            .with_evidence(format!("token unchanged after submission: {before}")),
        Some(after) => Verdict::pass().with_evidence(format!("token rotated to {after}")),
        None => Verdict::pass().with_evidence("token no longer issued after submission"),
    }
}

/// A resubmission that should be refused fails the probe when answered 2xx
pub fn judge_replay(status: u16, what: &str) -> Verdict {
    if (200..300).contains(&status) {
        Verdict::fail().with_evidence(format!("{what} accepted with HTTP {status}"))
    } else {
        Verdict::pass().with_evidence(format!("{what} rejected with HTTP {status}"))
    }
}

fn present_value(token: &CsrfToken) -> Option<&str> {
    token.is_present().then_some(token.value.as_str())
}

fn missing_token() -> Verdict {
    Verdict::fail().with_evidence("no CSRF token issued, nothing to test")
}
