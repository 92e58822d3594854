//! Concurrent reflected XSS sweep
//!
//! A fixed pool of workers drains a shared queue of (endpoint, payload) tasks.
//! Each worker owns its own HTTP client so no cookie state leaks between
//! workers or into the CSRF session. Outcomes flow through a channel, which
//! keeps them in completion order and lets a deadline cut the sweep short
//! without losing what was already collected.

use super::{check_reachable, PayloadProbe, ReflectionProbe, SweepTask};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{PayloadResult, ProbeConfig, Target};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Result of a full or deadline-truncated sweep
#[derive(Debug, Clone, Default)]
pub struct XssSweep {
    /// Matched outcomes in completion order
    pub matches: Vec<PayloadResult>,
    /// Tasks that produced an outcome
    pub attempted: usize,
    pub total: usize,
    pub deadline_exceeded: bool,
}

/// Sweeps every configured endpoint with every payload of the corpus
pub async fn sweep(target: &Target, config: &ProbeConfig) -> Result<XssSweep> {
    let reachability = HttpClient::from_config(config)?;
    check_reachable(&reachability, target).await?;

    let tasks: VecDeque<SweepTask> = config
        .endpoints
        .iter()
        .flat_map(|endpoint| {
            config.payload_corpus.iter().map(move |payload| SweepTask {
                endpoint: endpoint.clone(),
                payload: payload.clone(),
            })
        })
        .collect();
    let total = tasks.len();
    if total == 0 {
        info!("XSS: empty corpus, nothing to sweep");
        return Ok(XssSweep::default());
    }

    let pool_size = config.worker_count.clamp(1, total);
    let mut probes = Vec::with_capacity(pool_size);
    for _ in 0..pool_size {
        probes.push(ReflectionProbe::new(
            HttpClient::from_config(config)?,
            target.clone(),
            &config.xss_param,
            config.match_escaped,
        ));
    }

    info!("XSS: {total} tasks across {pool_size} workers");
    let sweep = run_pool(probes, tasks, config.cooldown(), config.sweep_deadline()).await;
    info!(
        "XSS: {} of {} tasks completed, {} reflections",
        sweep.attempted,
        sweep.total,
        sweep.matches.len()
    );
    Ok(sweep)
}

/// Runs one worker per probe until the queue is drained or the deadline passes
pub async fn run_pool<P>(
    probes: Vec<P>,
    tasks: VecDeque<SweepTask>,
    cooldown: Duration,
    deadline: Option<Duration>,
) -> XssSweep
where
    P: PayloadProbe + 'static,
{
    let total = tasks.len();
    let queue = Arc::new(Mutex::new(tasks));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut workers = JoinSet::new();
    for (id, probe) in probes.into_iter().enumerate() {
        workers.spawn(worker(id, probe, Arc::clone(&queue), tx.clone(), cooldown));
    }
    drop(tx);

    let drain = async {
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("XSS worker task failed: {e}");
            }
        }
    };

    let deadline_exceeded = match deadline {
        Some(limit) => timeout(limit, drain).await.is_err(),
        None => {
            drain.await;
            false
        }
    };

    if deadline_exceeded {
        warn!("XSS: sweep deadline reached, abandoning in-flight tasks");
        workers.abort_all();
    }

    let mut sweep = XssSweep {
        total,
        deadline_exceeded,
        ..XssSweep::default()
    };
    while let Ok(result) = rx.try_recv() {
        sweep.attempted += 1;
        if result.matched {
            sweep.matches.push(result);
        }
    }
    sweep
}

async fn worker<P: PayloadProbe>(
    id: usize,
    probe: P,
    queue: Arc<Mutex<VecDeque<SweepTask>>>,
    results: mpsc::UnboundedSender<PayloadResult>,
    cooldown: Duration,
) {
    let mut first = true;

    loop {
        let Some(task) = queue.lock().await.pop_front() else {
            break;
        };

        if !first && !cooldown.is_zero() {
            sleep(cooldown).await;
        }
        first = false;

        let matched = match probe.probe(&task.endpoint, &task.payload).await {
            Ok(matched) => matched,
            Err(e) => {
                debug!("XSS worker {id}: {} failed: {e}", task.endpoint);
                false
            }
        };
        if matched {
            info!("XSS: payload reflected on {}: {}", task.endpoint, task.payload);
        }

        let outcome = PayloadResult {
            payload: task.payload,
            endpoint: task.endpoint,
            matched,
        };
        if results.send(outcome).is_err() {
            break;
        }
    }

    debug!("XSS worker {id} finished");
}
