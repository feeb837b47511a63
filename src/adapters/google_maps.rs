use crate::domain::model::{Coordinate, GeocodeResult, ParkingPlace, Viewport};
use crate::domain::ports::{ConfigProvider, MapsProvider};
use crate::utils::error::{MapperError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Google Maps Web Services key. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Reads the key from `GOOGLE_MAPS_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_value(std::env::var(API_KEY_ENV).ok())
    }

    /// Accepts a key from any source. Empty values and unresolved `${VAR}`
    /// placeholders count as missing.
    pub fn from_value(value: Option<String>) -> Result<Self> {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() && !(v.starts_with("${") && v.ends_with('}')) => Ok(Self(v)),
            _ => Err(MapperError::MissingApiKey {
                var: API_KEY_ENV.to_string(),
            }),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        write!(f, "ApiKey(***{})", tail)
    }
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<LatLng> for Coordinate {
    fn from(p: LatLng) -> Self {
        Coordinate::new(p.lat, p.lng)
    }
}

#[derive(Debug, Deserialize)]
struct ViewportDto {
    northeast: LatLng,
    southwest: LatLng,
}

#[derive(Debug, Deserialize)]
struct GeometryDto {
    location: LatLng,
    viewport: Option<ViewportDto>,
}

#[derive(Debug, Deserialize)]
struct GeocodeItem {
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    place_id: String,
    geometry: GeometryDto,
}

#[derive(Debug, Deserialize)]
struct NearbyItem {
    name: Option<String>,
    #[serde(default)]
    place_id: String,
    geometry: GeometryDto,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    error_message: Option<String>,
}

pub struct GoogleMapsClient {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    timeout: Duration,
}

impl GoogleMapsClient {
    pub fn new(api_key: ApiKey, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config<C: ConfigProvider>(api_key: ApiKey, config: &C) -> Self {
        Self::new(api_key, config.api_base_url(), config.request_timeout())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<ApiResponse<T>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!("Calling Google Maps endpoint: {}", url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.expose())])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Google Maps response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_status_error(status, body));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn http_status_error(status: StatusCode, body: String) -> MapperError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => MapperError::RateLimited {
            status: status.as_u16().to_string(),
            message: body,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MapperError::InvalidApiKey { message: body },
        _ => MapperError::Provider {
            status: format!("HTTP {}", status.as_u16()),
            message: body,
        },
    }
}

/// Maps a non-OK provider status onto the crate error.
fn status_error(status: &str, message: Option<String>, query: &str) -> MapperError {
    let message = message.unwrap_or_else(|| format!("status {}", status));
    match status {
        "ZERO_RESULTS" => MapperError::NotFound {
            query: query.to_string(),
        },
        "REQUEST_DENIED" => MapperError::InvalidApiKey { message },
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => MapperError::RateLimited {
            status: status.to_string(),
            message,
        },
        other => MapperError::Provider {
            status: other.to_string(),
            message,
        },
    }
}

#[async_trait]
impl MapsProvider for GoogleMapsClient {
    async fn geocode(&self, query: &str) -> Result<GeocodeResult> {
        if query.trim().is_empty() {
            return Err(MapperError::Provider {
                status: "INVALID_REQUEST".to_string(),
                message: "empty geocoding query".to_string(),
            });
        }

        let response: ApiResponse<GeocodeItem> = self
            .call("geocode/json", &[("address", query.to_string())])
            .await?;

        if response.status != "OK" {
            tracing::warn!("Geocoding failed for '{}': {}", query, response.status);
            return Err(status_error(&response.status, response.error_message, query));
        }

        let item = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| MapperError::NotFound {
                query: query.to_string(),
            })?;

        Ok(GeocodeResult {
            coordinate: item.geometry.location.into(),
            formatted_address: item.formatted_address,
            place_id: item.place_id,
            viewport: item.geometry.viewport.map(|v| Viewport {
                northeast: v.northeast.into(),
                southwest: v.southwest.into(),
            }),
        })
    }

    async fn nearby_parking(
        &self,
        center: Coordinate,
        radius_meters: u32,
    ) -> Result<Vec<ParkingPlace>> {
        let location = format!("{},{}", center.latitude, center.longitude);
        let response: ApiResponse<NearbyItem> = self
            .call(
                "place/nearbysearch/json",
                &[
                    ("location", location.clone()),
                    ("radius", radius_meters.to_string()),
                    ("type", "parking".to_string()),
                ],
            )
            .await?;

        match response.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            status => {
                return Err(status_error(status, response.error_message, &location));
            }
        }

        Ok(response
            .results
            .into_iter()
            .map(|item| ParkingPlace {
                name: item.name.unwrap_or_else(|| "Unknown Parking".to_string()),
                place_id: item.place_id,
                coordinate: item.geometry.location.into(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> GoogleMapsClient {
        GoogleMapsClient::new(
            ApiKey::from_value(Some("test-key".to_string())).unwrap(),
            server.base_url(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_api_key_rejects_empty_and_placeholder() {
        assert!(ApiKey::from_value(None).is_err());
        assert!(ApiKey::from_value(Some("   ".to_string())).is_err());
        assert!(ApiKey::from_value(Some("${GOOGLE_MAPS_API_KEY}".to_string())).is_err());
        assert!(ApiKey::from_value(Some("AIzaSyExample".to_string())).is_ok());
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::from_value(Some("AIzaSySecretValue1234".to_string())).unwrap();
        let printed = format!("{:?}", key);
        assert_eq!(printed, "ApiKey(***1234)");
    }

    #[tokio::test]
    async fn test_geocode_returns_first_result() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/geocode/json")
                .query_param("address", "Red Rocks Amphitheatre, Morrison, CO")
                .query_param("key", "test-key");
            then.status(200).json_body(serde_json::json!({
                "status": "OK",
                "results": [{
                    "formatted_address": "18300 W Alameda Pkwy, Morrison, CO 80465, USA",
                    "place_id": "ChIJmdL4Yqlga4cRp0Rsb0gTzj4",
                    "geometry": {
                        "location": {"lat": 39.6654, "lng": -105.2057},
                        "viewport": {
                            "northeast": {"lat": 39.6668, "lng": -105.2043},
                            "southwest": {"lat": 39.6641, "lng": -105.2070}
                        }
                    }
                }, {
                    "formatted_address": "Somewhere else",
                    "place_id": "other",
                    "geometry": {"location": {"lat": 1.0, "lng": 2.0}}
                }]
            }));
        });

        let result = client(&server)
            .geocode("Red Rocks Amphitheatre, Morrison, CO")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(result.coordinate, Coordinate::new(39.6654, -105.2057));
        assert_eq!(result.place_id, "ChIJmdL4Yqlga4cRp0Rsb0gTzj4");
        assert!(result.viewport.is_some());
    }

    #[tokio::test]
    async fn test_geocode_status_mapping() {
        let cases = [
            ("ZERO_RESULTS", "not_found"),
            ("REQUEST_DENIED", "invalid_key"),
            ("OVER_QUERY_LIMIT", "rate_limited"),
            ("OVER_DAILY_LIMIT", "rate_limited"),
            ("INVALID_REQUEST", "provider"),
            ("UNKNOWN_ERROR", "provider"),
        ];

        for (status, expected) in cases {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/geocode/json");
                then.status(200).json_body(serde_json::json!({
                    "status": status,
                    "results": [],
                    "error_message": "provider said no"
                }));
            });

            let err = client(&server).geocode("Somewhere").await.unwrap_err();
            let kind = match err {
                MapperError::NotFound { .. } => "not_found",
                MapperError::InvalidApiKey { .. } => "invalid_key",
                MapperError::RateLimited { .. } => "rate_limited",
                MapperError::Provider { .. } => "provider",
                other => panic!("unexpected error for {}: {:?}", status, other),
            };
            assert_eq!(kind, expected, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_http_429_is_rate_limited() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/geocode/json");
            then.status(429).body("slow down");
        });

        let err = client(&server).geocode("Somewhere").await.unwrap_err();
        assert!(matches!(err, MapperError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_http_403_is_invalid_key_and_500_is_provider() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/geocode/json").query_param("address", "Forbidden Hall");
            then.status(403).body("API key not authorized");
        });
        server.mock(|when, then| {
            when.method(GET).path("/geocode/json").query_param("address", "Broken Hall");
            then.status(500).body("backend error");
        });

        let maps = client(&server);
        match maps.geocode("Forbidden Hall").await.unwrap_err() {
            MapperError::InvalidApiKey { message } => assert_eq!(message, "API key not authorized"),
            other => panic!("expected InvalidApiKey, got {:?}", other),
        }
        match maps.geocode("Broken Hall").await.unwrap_err() {
            MapperError::Provider { status, .. } => assert_eq!(status, "HTTP 500"),
            other => panic!("expected Provider, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected_without_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/geocode/json");
            then.status(200);
        });

        let err = client(&server).geocode("   ").await.unwrap_err();
        assert!(matches!(err, MapperError::Provider { .. }));
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_nearby_parking() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/place/nearbysearch/json")
                .query_param("location", "39.6654,-105.2057")
                .query_param("radius", "800")
                .query_param("type", "parking");
            then.status(200).json_body(serde_json::json!({
                "status": "OK",
                "results": [
                    {"name": "Lower North Lot", "place_id": "p1",
                     "geometry": {"location": {"lat": 39.667, "lng": -105.206}}},
                    {"place_id": "p2",
                     "geometry": {"location": {"lat": 39.664, "lng": -105.204}}}
                ]
            }));
        });

        let places = client(&server)
            .nearby_parking(Coordinate::new(39.6654, -105.2057), 800)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].name, "Lower North Lot");
        assert_eq!(places[1].name, "Unknown Parking");
    }

    #[tokio::test]
    async fn test_nearby_zero_results_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/place/nearbysearch/json");
            then.status(200)
                .json_body(serde_json::json!({"status": "ZERO_RESULTS", "results": []}));
        });

        let places = client(&server)
            .nearby_parking(Coordinate::new(10.0, 10.0), 800)
            .await
            .unwrap();
        assert!(places.is_empty());
    }
}
