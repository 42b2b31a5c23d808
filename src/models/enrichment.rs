//! Enrichment output and the record patch derived from it.

use serde::{Deserialize, Serialize};

/// Whatever the three lookups produced. Each field is independent; `None`
/// means that lookup failed or had no usable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub place_name: Option<String>,
    pub air_quality_index: Option<i64>,
    pub temperature_celsius: Option<f64>,
}

impl EnrichmentResult {
    pub fn is_empty(&self) -> bool {
        self.place_name.is_none()
            && self.air_quality_index.is_none()
            && self.temperature_celsius.is_none()
    }
}

/// Partial update applied to a trip update record. Absent fields are omitted
/// from the serialized form, never written as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aqi: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
}

impl FieldPatch {
    /// `None` when the result carries nothing worth writing.
    pub fn from_result(result: &EnrichmentResult) -> Option<Self> {
        if result.is_empty() {
            return None;
        }

        Some(Self {
            location_name: result.place_name.clone(),
            aqi: result.air_quality_index,
            temp: result.temperature_celsius,
        })
    }

    /// Record field names present in this patch, in write order.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if self.location_name.is_some() {
            names.push("locationName");
        }
        if self.aqi.is_some() {
            names.push("aqi");
        }
        if self.temp.is_some() {
            names.push("temp");
        }
        names
    }
}

/// US AQI bands as the dashboard labels them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiCategory {
    Good,
    Moderate,
    Sensitive,
    Unhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn from_index(aqi: i64) -> Self {
        match aqi {
            i64::MIN..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=150 => AqiCategory::Sensitive,
            151..=200 => AqiCategory::Unhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Sensitive => "Sensitive",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}
