//! Cookie-bound probes: session fixation and double-submit cookies

use crate::error::Result;
use crate::extractor::{self, FormListing};
use crate::http::SessionState;
use crate::models::{ProbeConfig, Verdict};
use tracing::debug;

/// Plants an attacker-chosen session id, submits the form, and checks the
/// server issued a fresh one.
pub async fn session_fixation(
    session: &mut SessionState,
    config: &ProbeConfig,
) -> Result<Verdict> {
    let (_, form) = session.fetch_form(&config.csrf_page).await?;

    let before = session.cookie(&config.session_cookie);
    debug!("Session cookie before fixation attempt: {before:?}");

    session.set_cookie(&config.session_cookie, &config.attacker_session_id);
    let submitted = session.submit(&form, &form.fields).await?;
    debug!("Submission with planted session id answered {}", submitted.status);

    let after = session.cookie(&config.session_cookie);

    Ok(judge_fixation(
        &config.session_cookie,
        before.as_deref(),
        &config.attacker_session_id,
        after.as_deref(),
    ))
}

/// Compares the token cookie with the hidden token of the first POST form
pub async fn double_submit_cookie(
    session: &mut SessionState,
    config: &ProbeConfig,
) -> Result<Verdict> {
    let page = session.fetch(&config.csrf_page).await?;
    let cookie = session.cookie(&config.csrf_field);
    let forms = extractor::extract_forms(session.target().base_url(), &page.body);
    let first_post = forms.iter().find(|form| form.method == "POST");

    Ok(judge_double_submit(&config.csrf_field, cookie.as_deref(), first_post))
}

pub fn judge_fixation(
    cookie_name: &str,
    before: Option<&str>,
    attacker: &str,
    after: Option<&str>,
) -> Verdict {
    if after == Some(attacker) {
        return Verdict::fail().with_evidence(format!(
            "server kept attacker-chosen {cookie_name}={attacker}"
        ));
    }
    if after == before {
        return Verdict::fail().with_evidence(format!(
            "{cookie_name} not regenerated after submission: {}",
            after.unwrap_or("<unset>")
        ));
    }
    Verdict::pass().with_evidence(format!(
        "{cookie_name} regenerated to {}",
        after.unwrap_or("<unset>")
    ))
}

pub fn judge_double_submit(
    field: &str,
    cookie: Option<&str>,
    first_post: Option<&FormListing>,
) -> Verdict {
    let Some(cookie) = cookie else {
        return Verdict::fail().with_evidence(format!("no '{field}' cookie set"));
    };
    let Some(form) = first_post else {
        return Verdict::fail().with_evidence("no POST form to compare the cookie against");
    };
    let Some(form_value) = form.hidden_fields.get(field) else {
        return Verdict::fail().with_evidence(format!(
            "POST form {} has no hidden '{field}' field",
            form.action
        ));
    };

    if form_value == cookie {
        Verdict::pass().with_evidence(format!("cookie and form token match: {cookie}"))
    } else {
        Verdict::fail().with_evidence(format!(
            "cookie token {cookie} differs from form token {form_value}"
        ))
    }
}
