//! Report aggregation
//!
//! [`aggregate`] is a pure transform from per-category outcomes to the
//! serializable [`Report`]. CSRF verdicts keep suite order; sweep payload
//! lists keep the order their engine produced them in.

pub mod json;

use crate::models::{Category, PayloadResult, Verdict, VerdictStatus};
use crate::scanner::csrf::CsrfProbe;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// What one category scanner produced
#[derive(Debug, Clone)]
pub enum CategoryOutcome {
    Csrf(Vec<(CsrfProbe, Verdict)>),
    SqlInjection(SweepOutcome),
    Xss(SweepOutcome),
}

impl CategoryOutcome {
    pub fn category(&self) -> Category {
        match self {
            CategoryOutcome::Csrf(_) => Category::Csrf,
            CategoryOutcome::SqlInjection(_) => Category::SqlInjection,
            CategoryOutcome::Xss(_) => Category::Xss,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SweepOutcome {
    Completed {
        matches: Vec<PayloadResult>,
        /// The sweep was cut short by its deadline
        partial: bool,
    },
    /// The sweep could not start (target unreachable, client setup failed)
    Failed(String),
}

/// Final artifact of a run, keyed by category
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Report {
    categories: BTreeMap<Category, CategoryReport>,
}

impl Report {
    pub fn get(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.get(&category)
    }

    pub fn csrf(&self) -> Option<&CsrfReport> {
        match self.categories.get(&Category::Csrf) {
            Some(CategoryReport::Csrf(report)) => Some(report),
            _ => None,
        }
    }

    pub fn sweep(&self, category: Category) -> Option<&SweepReport> {
        match self.categories.get(&category) {
            Some(CategoryReport::Sweep(report)) => Some(report),
            _ => None,
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = (&Category, &CategoryReport)> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// True if any probe or sweep confirmed a vulnerability
    pub fn has_failures(&self) -> bool {
        self.categories.values().any(|report| match report {
            CategoryReport::Csrf(csrf) => csrf.probes.iter().any(|(_, v)| v.is_fail()),
            CategoryReport::Sweep(sweep) => sweep.status == VerdictStatus::Fail,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CategoryReport {
    Csrf(CsrfReport),
    Sweep(SweepReport),
}

/// Probe name to verdict, serialized as an object in suite order
#[derive(Debug, Clone)]
pub struct CsrfReport {
    pub probes: Vec<(CsrfProbe, Verdict)>,
}

impl CsrfReport {
    pub fn verdict(&self, probe: CsrfProbe) -> Option<&Verdict> {
        self.probes
            .iter()
            .find(|(p, _)| *p == probe)
            .map(|(_, v)| v)
    }
}

impl Serialize for CsrfReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.probes.iter().map(|(probe, verdict)| (probe, verdict)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub status: VerdictStatus,
    pub count: usize,
    pub payloads: Vec<PayloadResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl From<SweepOutcome> for SweepReport {
    fn from(outcome: SweepOutcome) -> Self {
        match outcome {
            SweepOutcome::Completed { matches, partial } => {
                let matches: Vec<PayloadResult> =
                    matches.into_iter().filter(|m| m.matched).collect();
                Self {
                    status: if matches.is_empty() {
                        VerdictStatus::Pass
                    } else {
                        VerdictStatus::Fail
                    },
                    count: matches.len(),
                    payloads: matches,
                    error: None,
                    partial,
                }
            }
            SweepOutcome::Failed(message) => Self {
                status: VerdictStatus::Error,
                count: 0,
                payloads: Vec::new(),
                error: Some(message),
                partial: false,
            },
        }
    }
}

/// Assembles the report. Every requested category gets an entry; one that
/// produced no outcome is reported as `error`.
pub fn aggregate(outcomes: Vec<CategoryOutcome>, requested: &BTreeSet<Category>) -> Report {
    let mut categories = BTreeMap::new();

    for outcome in outcomes {
        let category = outcome.category();
        let report = match outcome {
            CategoryOutcome::Csrf(probes) => CategoryReport::Csrf(CsrfReport { probes }),
            CategoryOutcome::SqlInjection(sweep) | CategoryOutcome::Xss(sweep) => {
                CategoryReport::Sweep(sweep.into())
            }
        };
        categories.entry(category).or_insert(report);
    }

    for &category in requested {
        categories
            .entry(category)
            .or_insert_with(|| not_evaluated(category));
    }

    Report { categories }
}

fn not_evaluated(category: Category) -> CategoryReport {
    let message = format!("no scanner evaluated category '{category}'");
    match category {
        Category::Csrf => CategoryReport::Csrf(CsrfReport {
            probes: CsrfProbe::SUITE
                .iter()
                .map(|&probe| (probe, Verdict::error(message.clone())))
                .collect(),
        }),
        Category::Xss | Category::SqlInjection => {
            CategoryReport::Sweep(SweepOutcome::Failed(message).into())
        }
    }
}
