//! Form and CSRF token extraction from HTML responses

use crate::error::{ProbeError, Result};
use crate::models::{CsrfToken, FormMethod, FormSnapshot, TokenSource};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// Lightweight view of one form, used by probes that scan every form on a
/// page. Unlike [`FormSnapshot`] the method is kept as written (uppercased,
/// POST when missing) so unusual verbs do not fail the whole page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormListing {
    pub action: String,
    pub method: String,
    pub hidden_fields: BTreeMap<String, String>,
}

impl FormListing {
    pub fn has_hidden(&self, name: &str) -> bool {
        self.hidden_fields.contains_key(name)
    }
}

/// Snapshots the first form of the document
pub fn extract_form(base_url: &Url, html: &str) -> Result<FormSnapshot> {
    let document = Html::parse_document(html);
    let form_selector = selector("form")?;

    let form = document
        .select(&form_selector)
        .next()
        .ok_or(ProbeError::NoFormFound)?;

    let method = FormMethod::from_markup(form.value().attr("method"))?;
    let action = resolve_action(base_url, form.value().attr("action"))?;

    let mut fields = BTreeMap::new();
    for input in form.select(&selector("input[name]")?) {
        if let Some(name) = input.value().attr("name") {
            let value = input.value().attr("value").unwrap_or("");
            fields.insert(name.to_string(), value.to_string());
        }
    }
    for textarea in form.select(&selector("textarea[name]")?) {
        if let Some(name) = textarea.value().attr("name") {
            fields.insert(name.to_string(), textarea.text().collect());
        }
    }

    Ok(FormSnapshot {
        action,
        method,
        fields,
    })
}

/// Lists every form of the document
pub fn extract_forms(base_url: &Url, html: &str) -> Vec<FormListing> {
    let document = Html::parse_document(html);
    let mut forms = Vec::new();

    let (Ok(form_selector), Ok(input_selector)) = (selector("form"), selector("input[name]"))
    else {
        return forms;
    };

    for form in document.select(&form_selector) {
        let method = form
            .value()
            .attr("method")
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("post")
            .to_uppercase();

        let raw_action = form.value().attr("action");
        let action = resolve_action(base_url, raw_action)
            .unwrap_or_else(|_| raw_action.unwrap_or_default().to_string());

        let hidden_fields = form
            .select(&input_selector)
            .filter(|input| is_hidden(input))
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or("");
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        forms.push(FormListing {
            action,
            method,
            hidden_fields,
        });
    }

    forms
}

/// Finds the CSRF token: `<meta name="csrf-token">` first, then a hidden
/// input named `field` inside the first form.
pub fn extract_token(html: &str, field: &str) -> CsrfToken {
    let document = Html::parse_document(html);

    if let Ok(meta_selector) = selector(r#"meta[name="csrf-token"]"#) {
        let meta_content = document
            .select(&meta_selector)
            .find_map(|meta| meta.value().attr("content"));
        if let Some(content) = meta_content {
            return CsrfToken {
                value: content.to_string(),
                source: TokenSource::MetaTag,
            };
        }
    }

    let Ok(form_selector) = selector("form") else {
        return CsrfToken::absent();
    };
    let Some(form) = document.select(&form_selector).next() else {
        return CsrfToken::absent();
    };

    hidden_value(form, field)
        .map(|value| CsrfToken {
            value,
            source: TokenSource::HiddenField,
        })
        .unwrap_or_else(CsrfToken::absent)
}

/// Resolves a form action against the base URL. Missing, empty, and
/// fragment-only actions submit to the base URL itself.
pub fn resolve_action(base_url: &Url, raw: Option<&str>) -> Result<String> {
    let trimmed = raw.map(str::trim).unwrap_or("");
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(base_url.to_string());
    }

    let mut resolved = base_url.join(trimmed)?;
    resolved.set_fragment(None);
    Ok(resolved.to_string())
}

fn hidden_value(form: ElementRef<'_>, field: &str) -> Option<String> {
    let input_selector = selector("input[name]").ok()?;
    form.select(&input_selector)
        .filter(|input| is_hidden(input))
        .find(|input| input.value().attr("name") == Some(field))
        .map(|input| input.value().attr("value").unwrap_or("").to_string())
}

fn is_hidden(input: &ElementRef<'_>) -> bool {
    input
        .value()
        .attr("type")
        .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ProbeError::Config(format!("bad selector '{css}': {e}")))
}
