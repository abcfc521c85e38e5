pub mod google;

pub use google::GoogleGeocoder;

use async_trait::async_trait;

/// Address reported when a lookup fails for any reason
pub const ADDRESS_UNAVAILABLE: &str = "N/A";

/// Reverse geocoding: coordinates to a human-readable address.
///
/// Implementations never fail; they degrade to [`ADDRESS_UNAVAILABLE`].
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve_address(&self, latitude: f64, longitude: f64) -> String;
}
