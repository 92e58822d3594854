//! Per-target session state shared by the sequential CSRF suite
//!
//! A `SessionState` owns exactly one [`HttpClient`] and therefore one cookie
//! jar. Every request mutates the jar, so network methods take `&mut self`:
//! holding a session is the proof that no other probe is in flight on it.

use crate::error::{ProbeError, Result};
use crate::extractor;
use crate::http::HttpClient;
use crate::models::{CsrfToken, FormSnapshot, ProbeConfig, Target};
use reqwest::Response;
use std::collections::BTreeMap;
use tracing::debug;

/// A fetched or submitted page
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    async fn read(response: Response) -> Result<Self> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Self { status, body })
    }
}

pub struct SessionState {
    target: Target,
    client: HttpClient,
}

impl SessionState {
    /// Opens a fresh session with an empty cookie jar
    pub fn open(target: Target, config: &ProbeConfig) -> Result<Self> {
        let client = HttpClient::from_config(config)?;
        Ok(Self { target, client })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// GETs `path`. Non-2xx answers are reported as `HttpStatus` errors.
    pub async fn fetch(&mut self, path: &str) -> Result<Page> {
        let url = self.target.join(path)?;
        let page = Page::read(self.client.get(url.as_str()).await?).await?;
        debug!("Fetched {url}: {}", page.status);

        if !page.is_success() {
            return Err(ProbeError::HttpStatus {
                status: page.status,
                url: url.to_string(),
            });
        }
        Ok(page)
    }

    /// Fetches `path` and snapshots its first form
    pub async fn fetch_form(&mut self, path: &str) -> Result<(Page, FormSnapshot)> {
        let page = self.fetch(path).await?;
        let form = self.extract_form(&page.body)?;
        Ok((page, form))
    }

    pub fn extract_form(&self, body: &str) -> Result<FormSnapshot> {
        extractor::extract_form(self.target.base_url(), body)
    }

    pub fn extract_token(&self, body: &str, field: &str) -> CsrfToken {
        extractor::extract_token(body, field)
    }

    /// Submits `fields` through the verb recorded on `form`. The status code is
    /// returned as-is: whether a rejection is signal is up to the caller.
    pub async fn submit(
        &mut self,
        form: &FormSnapshot,
        fields: &BTreeMap<String, String>,
    ) -> Result<Page> {
        debug!("Submitting {} {} ({} fields)", form.method, form.action, fields.len());
        let response = self
            .client
            .send_form(form.method.into(), &form.action, fields)
            .await?;
        let page = Page::read(response).await?;
        debug!("Submission to {} answered {}", form.action, page.status);
        Ok(page)
    }

    /// Current value of a cookie scoped to the target
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.client.cookie(self.target.base_url(), name)
    }

    /// Overwrites a cookie scoped to the target
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.client.set_cookie(self.target.base_url(), name, value);
    }

    pub fn request_count(&self) -> u64 {
        self.client.request_count()
    }
}
