//! Shared fakes for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use opsbuddy_healthcheck::{OutageTracker, ProductSource, Prober};
use opsbuddy_store::products::ProbeTarget;

/// Probe outcomes played back in order; panics when the script runs dry.
pub struct ScriptedProber {
    script: Mutex<VecDeque<bool>>,
}

impl ScriptedProber {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into_iter().collect()),
        })
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _url: &str) -> bool {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("probe script exhausted")
    }
}

/// Always-healthy prober that counts probes per URL.
#[derive(Default)]
pub struct CountingProber {
    counts: Mutex<HashMap<String, u32>>,
}

impl CountingProber {
    pub fn count_for(&self, url: &str) -> u32 {
        self.counts.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Prober for CountingProber {
    async fn probe(&self, url: &str) -> bool {
        *self.counts.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        true
    }
}

/// Outage transition observed by the recording tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Down(i64),
    Up(i64),
}

#[derive(Default)]
pub struct RecordingTracker {
    transitions: Mutex<Vec<Transition>>,
}

impl RecordingTracker {
    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutageTracker for RecordingTracker {
    async fn mark_service_down(&self, product_id: i64) -> opsbuddy_healthcheck::Result<()> {
        self.transitions
            .lock()
            .unwrap()
            .push(Transition::Down(product_id));
        Ok(())
    }

    async fn mark_service_up(&self, product_id: i64) -> opsbuddy_healthcheck::Result<()> {
        self.transitions
            .lock()
            .unwrap()
            .push(Transition::Up(product_id));
        Ok(())
    }
}

/// In-memory stand-in for the product catalogue.
pub struct SeededSource {
    rows: Mutex<Vec<(DateTime<Utc>, ProbeTarget)>>,
}

impl SeededSource {
    pub fn with_initial(targets: Vec<ProbeTarget>) -> Arc<Self> {
        let created = Utc::now() - chrono::Duration::hours(1);
        Arc::new(Self {
            rows: Mutex::new(targets.into_iter().map(|t| (created, t)).collect()),
        })
    }

    /// Register a product as of now, as the CRUD collaborator would.
    pub fn add(&self, target: ProbeTarget) {
        self.rows.lock().unwrap().push((Utc::now(), target));
    }
}

#[async_trait]
impl ProductSource for SeededSource {
    async fn probe_targets(&self) -> opsbuddy_healthcheck::Result<Vec<ProbeTarget>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn probe_targets_created_after(
        &self,
        since: DateTime<Utc>,
    ) -> opsbuddy_healthcheck::Result<Vec<ProbeTarget>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(created, _)| *created > since)
            .map(|(_, t)| t.clone())
            .collect())
    }
}

pub fn target(id: i64, url: &str) -> ProbeTarget {
    ProbeTarget {
        id,
        health_api: url.to_string(),
    }
}
