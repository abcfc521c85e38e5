use super::{ADDRESS_UNAVAILABLE, AddressResolver};
use crate::app_config::GeocodingConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("geocoding service answered with status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("geocoding response contains no formatted address")]
    NoAddress,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

/// Google Maps Geocoding API client
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &GeocodingConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Look up the first formatted address for the coordinates
    pub async fn lookup(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let latlng = format!("{latitude},{longitude}");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(GeocodeError::UnexpectedStatus(response.status()));
        }

        let body: GeocodeResponse = response.json().await?;
        body.results
            .into_iter()
            .next()
            .map(|result| result.formatted_address)
            .ok_or(GeocodeError::NoAddress)
    }
}

#[async_trait]
impl AddressResolver for GoogleGeocoder {
    async fn resolve_address(&self, latitude: f64, longitude: f64) -> String {
        match self.lookup(latitude, longitude).await {
            Ok(address) => {
                debug!(latitude, longitude, %address, "Resolved address");
                address
            }
            Err(e) => {
                warn!(latitude, longitude, error = %e, "Address lookup failed");
                ADDRESS_UNAVAILABLE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;

    fn geocoder(server_url: &str) -> GoogleGeocoder {
        GoogleGeocoder::with_client(
            Client::new(),
            &GeocodingConfig {
                base_url: format!("{server_url}/maps/api/geocode/json"),
                api_key: "maps-key".to_string(),
                concurrency: 1,
            },
        )
    }

    #[tokio::test]
    async fn resolves_the_first_formatted_address() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/maps/api/geocode/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("latlng".into(), "43.6532,-79.3832".into()),
                Matcher::UrlEncoded("key".into(), "maps-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "results": [
                        { "formatted_address": "100 Queen St W, Toronto, ON, Canada" },
                        { "formatted_address": "Toronto, ON, Canada" }
                    ],
                    "status": "OK"
                }"#,
            )
            .create_async()
            .await;

        let address = geocoder(&server.url()).resolve_address(43.6532, -79.3832).await;

        mock.assert_async().await;
        assert_eq!(address, "100 Queen St W, Toronto, ON, Canada");
    }

    #[tokio::test]
    async fn non_ok_status_degrades_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/maps/api/geocode/json")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let address = geocoder(&server.url()).resolve_address(1.0, 2.0).await;

        assert_eq!(address, ADDRESS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn empty_results_degrade_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/maps/api/geocode/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{ "results": [], "status": "ZERO_RESULTS" }"#)
            .create_async()
            .await;

        let geocoder = geocoder(&server.url());

        assert!(matches!(geocoder.lookup(0.0, 0.0).await, Err(GeocodeError::NoAddress)));
        assert_eq!(geocoder.resolve_address(0.0, 0.0).await, ADDRESS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unparseable_body_degrades_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/maps/api/geocode/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let address = geocoder(&server.url()).resolve_address(1.0, 2.0).await;

        assert_eq!(address, ADDRESS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_unavailable() {
        // Nothing listens on the discard port
        let address = geocoder("http://127.0.0.1:9").resolve_address(1.0, 2.0).await;

        assert_eq!(address, ADDRESS_UNAVAILABLE);
    }
}
