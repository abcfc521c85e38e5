use crate::geocoding::AddressResolver;
use crate::storage::DocumentStore;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::warn;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub geocoder: Arc<dyn AddressResolver>,
    pub geocode_concurrency: usize,
}

/// Fields a new location must carry
pub const REQUIRED_FIELDS: [&str; 4] = ["description", "longitude", "latitude", "elevation"];

/// One dated observation of where the product was.
///
/// Fields other than `address` are kept as sent, so an update never fails on
/// an odd entry; entries without usable coordinates get
/// [`crate::geocoding::ADDRESS_UNAVAILABLE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub longitude: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub latitude: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub elevation: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub datetime: Value,
    /// Recomputed on every write
    #[serde(default, deserialize_with = "discard_address")]
    pub address: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn discard_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    IgnoredAny::deserialize(deserializer)?;
    Ok(String::new())
}

/// Numbers and numeric strings
fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

impl LocationEntry {
    /// `(latitude, longitude)` when both are usable
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((coordinate(&self.latitude)?, coordinate(&self.longitude)?))
    }

    fn sort_key(&self) -> Option<String> {
        match &self.datetime {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Ascending by `datetime`, entries without one last
    pub fn chronological(a: &Self, b: &Self) -> Ordering {
        match (a.sort_key(), b.sort_key()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Body of `POST /data`
#[derive(Debug, Deserialize)]
pub struct NewLocationRequest {
    #[serde(rename = "_key", default)]
    pub key: Option<String>,
    pub description: String,
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: f64,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stored shape of a product's location history
#[derive(Debug, Serialize)]
pub struct LocationRecord {
    #[serde(rename = "_key", skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub description: String,
    pub datetime: String,
    pub locations: Vec<LocationEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewLocationRequest {
    /// Move the coordinates into a single location entry
    pub fn into_record(self, address: String) -> LocationRecord {
        let datetime = non_empty(self.datetime).unwrap_or_else(current_timestamp);
        let mut extra = self.extra;
        // The only record field the passthrough map can carry
        extra.remove("locations");

        LocationRecord {
            key: self.key,
            description: self.description,
            locations: vec![LocationEntry {
                longitude: Value::from(self.longitude),
                latitude: Value::from(self.latitude),
                elevation: Value::from(self.elevation),
                datetime: Value::from(datetime.clone()),
                address,
                extra: Map::new(),
            }],
            datetime,
            extra,
        }
    }
}

/// Body of `PATCH /data/{key}`; unknown fields pass through to the store
#[derive(Debug, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<LocationEntry>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocationPatch {
    pub fn default_datetime(&mut self) {
        self.datetime = Some(non_empty(self.datetime.take()).unwrap_or_else(current_timestamp));
    }
}

/// Milliseconds since the Unix epoch, as a string
pub fn current_timestamp() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Response of `GET /`
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
    pub routes: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Store error document passed through with the store's status
    Relay { status: StatusCode, body: Value },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse {
                    error: status.to_string(),
                    message,
                }))
                .into_response()
            }
            AppError::Relay { status, body } => {
                warn!(%status, "Relaying store error");
                (status, Json(body)).into_response()
            }
        }
    }
}
