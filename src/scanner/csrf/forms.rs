//! Whole-page form audits

use crate::error::Result;
use crate::extractor::{self, FormListing};
use crate::http::SessionState;
use crate::models::{ProbeConfig, Verdict};
use url::Url;

/// Verbs in a GET action that suggest the request changes server state
const STATE_CHANGING_VERBS: &[&str] = &["delete", "update", "edit"];

/// Flags GET forms whose action looks state-changing
pub async fn unsafe_get(session: &mut SessionState, config: &ProbeConfig) -> Result<Verdict> {
    let page = session.fetch(&config.csrf_page).await?;
    let forms = extractor::extract_forms(session.target().base_url(), &page.body);
    Ok(verdict_for("GET forms", forms.len(), unsafe_get_actions(&forms)))
}

/// Flags POST forms without a hidden token field
pub async fn missing_token_on_post(
    session: &mut SessionState,
    config: &ProbeConfig,
) -> Result<Verdict> {
    let page = session.fetch(&config.csrf_page).await?;
    let forms = extractor::extract_forms(session.target().base_url(), &page.body);
    Ok(verdict_for(
        "POST forms",
        forms.len(),
        unprotected_post_actions(&forms, &config.csrf_field),
    ))
}

pub fn unsafe_get_actions(forms: &[FormListing]) -> Vec<String> {
    forms
        .iter()
        .filter(|form| form.method == "GET" && is_state_changing(&form.action))
        .map(|form| form.action.clone())
        .collect()
}

pub fn unprotected_post_actions(forms: &[FormListing], field: &str) -> Vec<String> {
    forms
        .iter()
        .filter(|form| form.method == "POST" && !form.has_hidden(field))
        .map(|form| form.action.clone())
        .collect()
}

/// Only the path and query are inspected so hostnames like `credit.example.com` don't match
fn is_state_changing(action: &str) -> bool {
    let haystack = match Url::parse(action) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or("")),
        Err(_) => action.to_string(),
    }
    .to_lowercase();

    STATE_CHANGING_VERBS
        .iter()
        .any(|verb| haystack.contains(verb))
}

fn verdict_for(kind: &str, checked: usize, offenders: Vec<String>) -> Verdict {
    if offenders.is_empty() {
        Verdict::pass().with_evidence(format!("{checked} forms checked, no vulnerable {kind}"))
    } else {
        Verdict::fail().with_evidence(offenders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(method: &str, action: &str, hidden: &[&str]) -> FormListing {
        FormListing {
            action: action.to_string(),
            method: method.to_string(),
            hidden_fields: hidden
                .iter()
                .map(|name| (name.to_string(), "v".to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_unsafe_get_actions() {
        let forms = vec![
            form("GET", "https://example.com/account/delete?id=4", &[]),
            form("GET", "https://example.com/search", &[]),
            form("GET", "https://example.com/profile/Edit", &[]),
            form("POST", "https://example.com/update", &[]),
            form("GET", "https://credit.example.com/search", &[]),
        ];
        assert_eq!(
            unsafe_get_actions(&forms),
            vec![
                "https://example.com/account/delete?id=4".to_string(),
                "https://example.com/profile/Edit".to_string(),
            ]
        );
    }

    #[test]
    fn test_unprotected_post_actions() {
        let forms = vec![
            form("POST", "https://example.com/a", &["csrf_token"]),
            form("POST", "https://example.com/b", &["other"]),
            form("GET", "https://example.com/c", &[]),
            form("PUT", "https://example.com/d", &[]),
        ];
        assert_eq!(
            unprotected_post_actions(&forms, "csrf_token"),
            vec!["https://example.com/b".to_string()]
        );
    }

    #[test]
    fn test_verdict_evidence_shapes() {
        assert!(verdict_for("GET forms", 2, Vec::new()).is_pass());

        let verdict = verdict_for("GET forms", 2, vec!["https://example.com/x".to_string()]);
        assert!(verdict.is_fail());
        assert_eq!(
            verdict.evidence,
            Some(crate::models::Evidence::List(vec!["https://example.com/x".to_string()]))
        );
    }
}
