use crate::api::data::handlers::{
    create_location, delete_location, get_location, list_locations, update_location,
};
use crate::api::models::AppState;
use axum::{routing::get, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/data", get(list_locations).post(create_location))
        // Empty key: answered by the handlers' missing-key branches
        .route("/data/", get(get_location).delete(delete_location))
        .route(
            "/data/{key}",
            get(get_location)
                .post(create_location)
                .patch(update_location)
                .delete(delete_location),
        )
}
