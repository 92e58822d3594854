//! Probe engine and scanner trait definitions

pub mod csrf;
pub mod injection;

use crate::error::{ProbeError, Result};
use crate::models::{Category, ProbeConfig, Target};
use crate::report::{self, CategoryOutcome, Report};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// One probe category. Implementations turn every failure into an outcome
/// rather than an error, so one category can never abort another.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Category this scanner reports under
    fn category(&self) -> Category;

    /// Returns a description of what this scanner checks
    fn description(&self) -> &str;

    /// Probes the target
    async fn scan(&self, target: &Target, config: &ProbeConfig) -> CategoryOutcome;
}

/// Runs the registered scanners for the selected categories
pub struct ProbeEngine {
    scanners: Vec<Arc<dyn Scanner>>,
}

impl ProbeEngine {
    /// Creates a new ProbeEngine with no registered scanners
    pub fn new() -> Self {
        Self {
            scanners: Vec::new(),
        }
    }

    /// Creates a ProbeEngine with the CSRF, SQL injection, and XSS scanners.
    /// Registration order is execution order.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register(Arc::new(csrf::CsrfScanner));
        engine.register(Arc::new(injection::SqlInjectionScanner));
        engine.register(Arc::new(injection::XssScanner));
        engine
    }

    /// Registers a new scanner
    pub fn register(&mut self, scanner: Arc<dyn Scanner>) {
        self.scanners.push(scanner);
    }

    /// Returns the category and description of every registered scanner
    pub fn list_modules(&self) -> Vec<(Category, &str)> {
        self.scanners
            .iter()
            .map(|s| (s.category(), s.description()))
            .collect()
    }

    /// Validates the request, then runs the selected scanners one after another.
    ///
    /// Caller-input errors are returned before any network activity. After
    /// that the run always produces a report with an entry per requested
    /// category.
    pub async fn run(
        &self,
        target: &str,
        categories: &BTreeSet<Category>,
        config: &ProbeConfig,
    ) -> Result<Report> {
        let target = Target::parse(target)?;
        if categories.is_empty() {
            return Err(ProbeError::EmptyCategorySelection);
        }
        config.validate()?;

        info!(
            "Probing {target} for: {}",
            categories
                .iter()
                .map(Category::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut outcomes = Vec::new();
        for scanner in self
            .scanners
            .iter()
            .filter(|s| categories.contains(&s.category()))
        {
            info!("Executing category: {}", scanner.category());
            let outcome = scanner.scan(&target, config).await;
            info!("Category '{}' completed", scanner.category());
            outcomes.push(outcome);
        }

        Ok(report::aggregate(outcomes, categories))
    }
}

impl Default for ProbeEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Probes `target` for every category in `categories` with the default scanners
pub async fn run_probes(
    target: &str,
    categories: &BTreeSet<Category>,
    config: &ProbeConfig,
) -> Result<Report> {
    ProbeEngine::with_defaults()
        .run(target, categories, config)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_order() {
        let engine = ProbeEngine::with_defaults();
        let categories: Vec<Category> = engine.list_modules().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            categories,
            vec![Category::Csrf, Category::SqlInjection, Category::Xss]
        );
    }

    #[tokio::test]
    async fn test_input_errors_come_first() {
        let all: BTreeSet<Category> = Category::ALL.into_iter().collect();
        let config = ProbeConfig::default();

        assert!(matches!(
            run_probes("", &all, &config).await,
            Err(ProbeError::InvalidTarget(_))
        ));
        assert!(matches!(
            run_probes("http://127.0.0.1:9", &BTreeSet::new(), &config).await,
            Err(ProbeError::EmptyCategorySelection)
        ));

        let bad_config = ProbeConfig {
            worker_count: 0,
            ..ProbeConfig::default()
        };
        assert!(matches!(
            run_probes("http://127.0.0.1:9", &all, &bad_config).await,
            Err(ProbeError::Config(_))
        ));
    }
}
