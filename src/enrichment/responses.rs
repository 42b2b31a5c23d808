//! Response bodies of the three public lookup services and the value each one
//! contributes.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
}

impl ReverseGeocodeResponse {
    /// City, then town, then village, then the first segment of the display
    /// name. Blank candidates are skipped.
    pub fn place_name(&self) -> Option<String> {
        let address = self.address.as_ref();
        address
            .and_then(|a| non_blank(a.city.as_deref()))
            .or_else(|| address.and_then(|a| non_blank(a.town.as_deref())))
            .or_else(|| address.and_then(|a| non_blank(a.village.as_deref())))
            .or_else(|| {
                self.display_name
                    .as_deref()
                    .and_then(|name| non_blank(name.split(',').next()))
            })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
pub struct AirQualityResponse {
    #[serde(default)]
    pub current: Option<AirQualityCurrent>,
}

#[derive(Debug, Deserialize)]
pub struct AirQualityCurrent {
    #[serde(default)]
    pub us_aqi: Option<f64>,
}

impl AirQualityResponse {
    pub fn us_aqi(&self) -> Option<i64> {
        self.current
            .as_ref()
            .and_then(|current| current.us_aqi)
            .filter(|aqi| aqi.is_finite() && *aqi >= 0.0)
            .map(|aqi| aqi.round() as i64)
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherResponse {
    #[serde(default)]
    pub current: Option<WeatherCurrent>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherCurrent {
    #[serde(default)]
    pub temperature_2m: Option<f64>,
}

impl WeatherResponse {
    pub fn temperature_celsius(&self) -> Option<f64> {
        self.current
            .as_ref()
            .and_then(|current| current.temperature_2m)
            .filter(|temp| temp.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocode(body: &str) -> Option<String> {
        serde_json::from_str::<ReverseGeocodeResponse>(body)
            .unwrap()
            .place_name()
    }

    #[test]
    fn city_wins_over_town_and_village() {
        let body = r#"{"address":{"city":"Bengaluru","town":"T","village":"V"},"display_name":"A, B"}"#;
        assert_eq!(geocode(body).as_deref(), Some("Bengaluru"));
    }

    #[test]
    fn falls_through_blank_and_missing_fields() {
        let body = r#"{"address":{"city":"","village":"Hampi"},"display_name":"A, B"}"#;
        assert_eq!(geocode(body).as_deref(), Some("Hampi"));

        let body = r#"{"address":{},"display_name":"Cubbon Park, Bengaluru, India"}"#;
        assert_eq!(geocode(body).as_deref(), Some("Cubbon Park"));
    }

    #[test]
    fn nothing_usable_is_none() {
        assert_eq!(geocode(r#"{"error":"Unable to geocode"}"#), None);
        assert_eq!(geocode(r#"{"address":{},"display_name":""}"#), None);
    }

    #[test]
    fn aqi_is_rounded_and_zero_kept() {
        let parse = |body: &str| {
            serde_json::from_str::<AirQualityResponse>(body)
                .unwrap()
                .us_aqi()
        };
        assert_eq!(parse(r#"{"current":{"us_aqi":41.6}}"#), Some(42));
        assert_eq!(parse(r#"{"current":{"us_aqi":0}}"#), Some(0));
        assert_eq!(parse(r#"{"current":{"us_aqi":null}}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }

    #[test]
    fn temperature_reads_current_block() {
        let parse = |body: &str| {
            serde_json::from_str::<WeatherResponse>(body)
                .unwrap()
                .temperature_celsius()
        };
        assert_eq!(parse(r#"{"current":{"temperature_2m":27.5}}"#), Some(27.5));
        assert_eq!(parse(r#"{"current":{"temperature_2m":0.0}}"#), Some(0.0));
        assert_eq!(parse(r#"{"current":{}}"#), None);
    }
}
