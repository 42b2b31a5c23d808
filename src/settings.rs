use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sync::RetirePolicy;

pub const SETTINGS_FILE: &str = "settings.json";

const DEFAULT_USER_AGENT: &str = concat!("tripsync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LookupEndpoints {
    pub reverse_geocode_url: String,
    pub air_quality_url: String,
    pub weather_url: String,
}

impl Default for LookupEndpoints {
    fn default() -> Self {
        Self {
            reverse_geocode_url: "https://nominatim.openstreetmap.org/reverse".into(),
            air_quality_url: "https://air-quality-api.open-meteo.com/v1/air-quality".into(),
            weather_url: "https://api.open-meteo.com/v1/forecast".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FirestoreSettings {
    pub base_url: String,
    pub project_id: String,
    pub collection: String,
    pub api_key: Option<String>,
    /// Only ever taken from `TRIPSYNC_FIRESTORE_TOKEN`.
    #[serde(skip)]
    pub bearer_token: Option<String>,
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            base_url: "https://firestore.googleapis.com/v1".into(),
            project_id: String::new(),
            collection: "trip_updates".into(),
            api_key: None,
            bearer_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectivitySettings {
    pub check_url: String,
    pub check_interval_secs: u64,
    pub check_timeout_secs: u64,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            check_url: "https://www.gstatic.com/generate_204".into(),
            check_interval_secs: 5,
            check_timeout_secs: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncSettings {
    pub lookups: LookupEndpoints,
    pub firestore: FirestoreSettings,
    pub connectivity: ConnectivitySettings,
    pub lookup_timeout_secs: u64,
    pub user_agent: String,
    /// Keep a task queued when its record patch fails instead of dropping it.
    pub retain_on_patch_failure: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lookups: LookupEndpoints::default(),
            firestore: FirestoreSettings::default(),
            connectivity: ConnectivitySettings::default(),
            lookup_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.into(),
            retain_on_patch_failure: false,
        }
    }
}

impl SyncSettings {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs.max(1))
    }

    pub fn retire_policy(&self) -> RetirePolicy {
        if self.retain_on_patch_failure {
            RetirePolicy::RetainOnPatchFailure
        } else {
            RetirePolicy::Always
        }
    }

    /// Apply `TRIPSYNC_*` environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("TRIPSYNC_FIRESTORE_TOKEN") {
            if !token.is_empty() {
                self.firestore.bearer_token = Some(token);
            }
        }
        if let Ok(project) = std::env::var("TRIPSYNC_FIRESTORE_PROJECT") {
            if !project.is_empty() {
                self.firestore.project_id = project;
            }
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<SyncSettings>,
}

impl SettingsStore {
    /// Load settings from `path`, writing the defaults there on first launch so
    /// they can be edited.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            let defaults = SyncSettings::default();
            persist(&path, &defaults)?;
            defaults
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> SyncSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: SyncSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        persist(&self.path, &settings)?;
        *guard = settings;
        Ok(())
    }
}

fn persist(path: &Path, data: &SyncSettings) -> Result<()> {
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}
