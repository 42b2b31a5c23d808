use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{
    models::{Coordinates, EnrichmentResult},
    settings::{LookupEndpoints, SyncSettings},
};

use super::{
    responses::{AirQualityResponse, ReverseGeocodeResponse, WeatherResponse},
    Enricher,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// HTTP client for the reverse-geocode, air-quality and weather lookups.
#[derive(Clone)]
pub struct EnrichmentClient {
    http: reqwest::Client,
    endpoints: LookupEndpoints,
    timeout: Duration,
}

impl EnrichmentClient {
    pub fn new(settings: &SyncSettings) -> Result<Self> {
        let timeout = settings.lookup_timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .context("failed to create lookup HTTP client")?;

        Ok(Self {
            http,
            endpoints: settings.lookups.clone(),
            timeout,
        })
    }

    pub async fn reverse_geocode(&self, coordinates: Coordinates) -> Option<String> {
        let query = [
            ("format", "json".to_string()),
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
        ];
        self.get_json::<ReverseGeocodeResponse>(
            "reverse geocode",
            &self.endpoints.reverse_geocode_url,
            &query,
        )
        .await?
        .place_name()
    }

    pub async fn fetch_air_quality(&self, coordinates: Coordinates) -> Option<i64> {
        let query = [
            ("latitude", coordinates.latitude.to_string()),
            ("longitude", coordinates.longitude.to_string()),
            ("current", "us_aqi".to_string()),
        ];
        self.get_json::<AirQualityResponse>("air quality", &self.endpoints.air_quality_url, &query)
            .await?
            .us_aqi()
    }

    pub async fn fetch_temperature(&self, coordinates: Coordinates) -> Option<f64> {
        let query = [
            ("latitude", coordinates.latitude.to_string()),
            ("longitude", coordinates.longitude.to_string()),
            ("current", "temperature_2m".to_string()),
        ];
        self.get_json::<WeatherResponse>("temperature", &self.endpoints.weather_url, &query)
            .await?
            .temperature_celsius()
    }

    /// One attempt, bounded by the lookup timeout. Any failure is logged and
    /// turned into `None`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        lookup: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Option<T> {
        match tokio::time::timeout(self.timeout, self.request::<T>(url, query)).await {
            Ok(Ok(body)) => Some(body),
            Ok(Err(err)) => {
                log_warn!("{lookup} lookup failed: {err:#}");
                None
            }
            Err(_) => {
                log_warn!("{lookup} lookup timed out after {}s", self.timeout.as_secs());
                None
            }
        }
    }

    async fn request<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .context("request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("unexpected status {status}"));
        }

        response
            .json::<T>()
            .await
            .context("response body was not the expected JSON")
    }
}

#[async_trait]
impl Enricher for EnrichmentClient {
    async fn enrich(&self, coordinates: Coordinates) -> EnrichmentResult {
        let (place_name, air_quality_index, temperature_celsius) = tokio::join!(
            self.reverse_geocode(coordinates),
            self.fetch_air_quality(coordinates),
            self.fetch_temperature(coordinates),
        );

        let result = EnrichmentResult {
            place_name,
            air_quality_index,
            temperature_celsius,
        };
        log_debug!(
            "enrichment for ({}, {}): {:?}",
            coordinates.latitude,
            coordinates.longitude,
            result
        );
        result
    }
}
