//! HTTP client wrapper with an owned cookie jar, retries, and request tracking

use crate::error::{ProbeError, Result};
use crate::models::ProbeConfig;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, Response, StatusCode};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

const INITIAL_BACKOFF_MS: u64 = 500;

/// HTTP client wrapper. Every instance owns an independent cookie jar, so two
/// clients built from the same config never share session identity.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    jar: Arc<Jar>,
    request_count: Arc<AtomicU64>,
    retries: u32,
    default_headers: Vec<(String, String)>,
}

impl HttpClient {
    /// Creates a new HttpClient from probe configuration
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        let mut default_headers: Vec<(String, String)> = config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        default_headers.sort();

        Ok(Self {
            client,
            jar,
            request_count: Arc::new(AtomicU64::new(0)),
            retries: config.retries,
            default_headers,
        })
    }

    /// Sends a GET request
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request_with_retry(|| self.client.get(url)).await
    }

    /// Sends a POST request with an urlencoded form body
    pub async fn post_form(&self, url: &str, fields: &BTreeMap<String, String>) -> Result<Response> {
        self.request_with_retry(|| self.client.post(url).form(fields))
            .await
    }

    /// Sends form fields with the given verb: query string for GET, urlencoded
    /// body for everything else
    pub async fn send_form(
        &self,
        method: Method,
        url: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<Response> {
        self.request_with_retry(|| {
            let req = self.client.request(method.clone(), url);
            if method == Method::GET {
                req.query(fields)
            } else {
                req.form(fields)
            }
        })
        .await
    }

    /// Reads a cookie the jar would send to `url`
    pub fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.jar.cookies(url)?;
        let raw = header.to_str().ok()?;
        raw.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    /// Stores a cookie as if `url` had set it, replacing any cookie of the same name and path
    pub fn set_cookie(&self, url: &Url, name: &str, value: &str) {
        self.jar
            .add_cookie_str(&format!("{name}={value}; Path=/"), url);
    }

    /// Returns the total number of requests made
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Executes a request with retry logic. Transport failures and HTTP 429 are
    /// retried with exponential backoff.
    async fn request_with_retry<F>(&self, build_request: F) -> Result<Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1));
                debug!("Retry attempt {attempt}, waiting {backoff:?}");
                sleep(backoff).await;
            }

            self.request_count.fetch_add(1, Ordering::Relaxed);

            let mut req = build_request();
            for (key, value) in &self.default_headers {
                req = req.header(key.as_str(), value.as_str());
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!("Response: {status} for {}", response.url());

                    if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.retries {
                        warn!("Rate limited by server, backing off");
                        continue;
                    }

                    return Ok(response);
                }
                Err(e) => {
                    warn!("Request failed (attempt {attempt}): {e}");
                    last_error = Some(ProbeError::Network(e));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProbeError::Config("request was never attempted".to_string())))
    }
}
