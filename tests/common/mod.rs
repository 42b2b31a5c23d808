#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tempfile::TempDir;
use tokio::sync::Notify;
use tripsync_lib::{
    enrichment::Enricher,
    models::{Coordinates, EnrichmentResult, FieldPatch},
    queue::QueueStore,
    records::RecordStore,
    Database,
};

pub fn open_db(dir: &TempDir) -> Database {
    Database::new(dir.path().join("tripsync.sqlite3")).expect("database opens")
}

pub fn open_store(dir: &TempDir) -> QueueStore {
    QueueStore::new(open_db(dir))
}

pub fn full_result(place: &str, aqi: i64, temp: f64) -> EnrichmentResult {
    EnrichmentResult {
        place_name: Some(place.to_string()),
        air_quality_index: Some(aqi),
        temperature_celsius: Some(temp),
    }
}

/// Returns a fixed result and remembers every coordinate it was asked about.
pub struct StubEnricher {
    result: EnrichmentResult,
    calls: Mutex<Vec<Coordinates>>,
    gate: Option<Gate>,
}

pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl StubEnricher {
    pub fn returning(result: EnrichmentResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Blocks each call until `gate.release` is notified.
    pub fn gated(result: EnrichmentResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(Vec::new()),
            gate: Some(Gate {
                entered: Notify::new(),
                release: Notify::new(),
            }),
        })
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("stub was built with a gate")
    }

    pub fn calls(&self) -> Vec<Coordinates> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Enricher for StubEnricher {
    async fn enrich(&self, coordinates: Coordinates) -> EnrichmentResult {
        self.calls.lock().unwrap().push(coordinates);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.result.clone()
    }
}

/// In-memory record store that applies patches the way a document database
/// would and records every call.
#[derive(Default)]
pub struct MemoryRecords {
    patches: Mutex<Vec<(String, FieldPatch)>>,
    documents: Mutex<HashMap<String, Map<String, Value>>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl MemoryRecords {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let records = Self::default();
        records.failing.store(true, Ordering::SeqCst);
        Arc::new(records)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn insert_document(&self, id: &str, fields: Value) {
        let Value::Object(map) = fields else {
            panic!("document must be an object");
        };
        self.documents.lock().unwrap().insert(id.to_string(), map);
    }

    pub fn document(&self, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .map(Value::Object)
    }

    pub fn patches(&self) -> Vec<(String, FieldPatch)> {
        self.patches.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn patch_fields(&self, record_id: &str, patch: &FieldPatch) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("record store unavailable");
        }

        self.patches
            .lock()
            .unwrap()
            .push((record_id.to_string(), patch.clone()));

        let Value::Object(fields) = serde_json::to_value(patch)? else {
            bail!("patch did not serialize to an object");
        };
        let mut documents = self.documents.lock().unwrap();
        let document = documents.entry(record_id.to_string()).or_default();
        for (key, value) in fields {
            document.insert(key, value);
        }
        Ok(())
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
