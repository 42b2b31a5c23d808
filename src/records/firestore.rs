//! Firestore REST implementation of [`RecordStore`].
//!
//! A patch becomes `PATCH .../documents/{collection}/{id}` with one
//! `updateMask.fieldPaths` entry per present field, so fields outside the mask
//! keep their values. `currentDocument.exists=true` makes a missing record an
//! error instead of creating it.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::{models::FieldPatch, settings::FirestoreSettings};

use super::RecordStore;

#[derive(Clone)]
pub struct FirestoreRecordStore {
    http: reqwest::Client,
    settings: FirestoreSettings,
}

impl FirestoreRecordStore {
    pub fn new(http: reqwest::Client, settings: FirestoreSettings) -> Self {
        Self { http, settings }
    }

    fn document_url(&self, record_id: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.project_id,
            self.settings.collection,
            record_id
        )
    }
}

/// Firestore typed-value encoding of the patch fields.
pub fn document_fields(patch: &FieldPatch) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(name) = &patch.location_name {
        fields.insert("locationName".into(), json!({ "stringValue": name }));
    }
    if let Some(aqi) = patch.aqi {
        // Firestore carries int64 as a decimal string.
        fields.insert("aqi".into(), json!({ "integerValue": aqi.to_string() }));
    }
    if let Some(temp) = patch.temp {
        fields.insert("temp".into(), json!({ "doubleValue": temp }));
    }
    fields
}

#[async_trait]
impl RecordStore for FirestoreRecordStore {
    async fn patch_fields(&self, record_id: &str, patch: &FieldPatch) -> Result<()> {
        if self.settings.project_id.is_empty() {
            bail!("firestore project id is not configured");
        }

        let mut query: Vec<(&str, String)> = patch
            .field_names()
            .into_iter()
            .map(|name| ("updateMask.fieldPaths", name.to_string()))
            .collect();
        query.push(("currentDocument.exists", "true".to_string()));
        if let Some(key) = &self.settings.api_key {
            query.push(("key", key.clone()));
        }

        let mut request = self
            .http
            .patch(self.document_url(record_id))
            .query(&query)
            .json(&json!({ "fields": document_fields(patch) }));
        if let Some(token) = &self.settings.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("failed to send patch for record {record_id}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "patch for record {record_id} rejected with {status}: {body}"
            ));
        }

        Ok(())
    }
}
