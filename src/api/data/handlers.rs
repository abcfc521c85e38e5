use crate::api::models::*;
use crate::geocoding::{ADDRESS_UNAVAILABLE, AddressResolver};
use crate::storage::{DocumentMeta, StoreError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use futures::{stream, StreamExt};
use serde_json::Value;
use tracing::{error, info};

fn non_empty_key(key: Option<Path<String>>) -> Option<String> {
    key.map(|Path(key)| key).filter(|key| !key.is_empty())
}

const MISSING_PROPS: &str = "does not have all required props (description, longitude, latitude, elevation)";

fn post_failure(reason: &str) -> AppError {
    AppError::BadRequest(format!("failed to post - {reason}"))
}

fn put_failure(reason: &str) -> AppError {
    AppError::BadRequest(format!("failed to put - {reason}"))
}

/// Resolve every entry's address, keeping entry order
async fn resolve_addresses(geocoder: &dyn AddressResolver, entries: &mut [LocationEntry], concurrency: usize) {
    let coordinates: Vec<Option<(f64, f64)>> = entries.iter().map(LocationEntry::coordinates).collect();

    let addresses: Vec<String> = stream::iter(coordinates)
        .map(|coordinates| async move {
            match coordinates {
                Some((latitude, longitude)) => geocoder.resolve_address(latitude, longitude).await,
                None => ADDRESS_UNAVAILABLE.to_string(),
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for (entry, address) in entries.iter_mut().zip(addresses) {
        entry.address = address;
    }
}

pub async fn list_locations(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    match state.store.all().await {
        Ok(documents) if !documents.is_empty() => {
            info!(count = documents.len(), "Listed documents");
            Ok(Json(documents))
        }
        Ok(_) => {
            info!("Collection is empty");
            Err(AppError::BadRequest("could not retrieve data".to_string()))
        }
        Err(e) => {
            error!(error = %e, "Failed to list documents");
            Err(AppError::BadRequest("could not retrieve data".to_string()))
        }
    }
}

/// An empty key is rejected before the store is queried, so each request
/// gets exactly one response.
pub async fn get_location(
    State(state): State<AppState>,
    key: Option<Path<String>>,
) -> Result<Json<Value>, AppError> {
    let Some(key) = non_empty_key(key) else {
        return Err(AppError::BadRequest("no key provided".to_string()));
    };

    match state.store.find_by_key(&key).await {
        Ok(Some(document)) => Ok(Json(document)),
        Ok(None) => Err(AppError::BadRequest(format!("could not find document with key: {key}"))),
        Err(e) => {
            error!(%key, error = %e, "Failed to query document");
            Err(AppError::BadRequest(format!("could not find document with key: {key}")))
        }
    }
}

pub async fn create_location(
    State(state): State<AppState>,
    key: Option<Path<String>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<DocumentMeta>), AppError> {
    let Value::Object(body) = body else {
        return Err(post_failure(MISSING_PROPS));
    };
    if REQUIRED_FIELDS.iter().any(|field| !body.contains_key(*field)) {
        return Err(post_failure(MISSING_PROPS));
    }

    let mut request: NewLocationRequest =
        serde_json::from_value(Value::Object(body)).map_err(|e| post_failure(&e.to_string()))?;
    if let Some(key) = non_empty_key(key) {
        request.key = Some(key);
    }

    info!(key = ?request.key, "Adding location");

    let address = state
        .geocoder
        .resolve_address(request.latitude, request.longitude)
        .await;
    let record = request.into_record(address);
    let document = serde_json::to_value(&record).map_err(|e| post_failure(&e.to_string()))?;

    match state.store.insert(&document).await {
        Ok(meta) => {
            info!(key = %meta.key, "Location added");
            Ok((StatusCode::CREATED, Json(meta)))
        }
        Err(e) => {
            error!(error = %e, "Failed to insert document");
            Err(relay_insert_error(e))
        }
    }
}

/// Structured store errors keep their status and body
fn relay_insert_error(e: StoreError) -> AppError {
    let Some(body) = e.body() else {
        return post_failure("");
    };

    let status = StatusCode::from_u16(body.code).unwrap_or(StatusCode::BAD_REQUEST);
    match serde_json::to_value(body) {
        Ok(body) => AppError::Relay { status, body },
        Err(_) => post_failure(""),
    }
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<DocumentMeta>, AppError> {
    if !body.is_object() {
        return Err(put_failure("body must be a JSON object"));
    }
    let mut patch: LocationPatch = serde_json::from_value(body).map_err(|e| put_failure(&e.to_string()))?;
    patch.key = Some(key.clone());
    patch.default_datetime();

    if let Some(locations) = patch.locations.as_mut().filter(|l| !l.is_empty()) {
        locations.sort_by(LocationEntry::chronological);
        resolve_addresses(state.geocoder.as_ref(), locations, state.geocode_concurrency).await;
        info!(%key, entries = locations.len(), "Resolved location addresses");
    }

    let document = serde_json::to_value(&patch).map_err(|e| put_failure(&e.to_string()))?;

    state.store.update(&key, &document).await.map(Json).map_err(|e| {
        error!(%key, error = %e, "Failed to update document");
        AppError::BadRequest("failed to put".to_string())
    })
}

pub async fn delete_location(
    State(state): State<AppState>,
    key: Option<Path<String>>,
) -> Result<Json<MessageResponse>, AppError> {
    let Some(key) = non_empty_key(key) else {
        return Err(AppError::BadRequest("failed to delete".to_string()));
    };

    match state.store.remove(&key).await {
        Ok(_) => {
            info!(%key, "Location removed");
            Ok(Json(MessageResponse {
                message: "Document removed".to_string(),
            }))
        }
        Err(e) => {
            error!(%key, error = %e, "Failed to remove document");
            Err(AppError::BadRequest("failed to delete".to_string()))
        }
    }
}
