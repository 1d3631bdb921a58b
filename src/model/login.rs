use serde::{Deserialize, Serialize};

use crate::model::GeoRecord;

/// Sentinel meaning "no usable source IP"; rows carrying it are dropped
/// before resolution.
pub const SENTINEL_IP: &str = "0.0.0.0";

/// One login-history row: a distinct (client_ip, user_name) pair with the
/// number of logins observed in the requested time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLoginRow {
    pub client_ip: String,
    pub user_name: String,
    pub login_count: u64,
}

/// A login row merged with its resolved geography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub client_ip: String,
    pub user_name: String,
    pub login_count: u64,
    pub country_code: String,
    pub country_name: String,
    pub city: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl EnrichedRow {
    /// Flattens a raw row and its geo record. Returns `None` when either
    /// coordinate is missing; such rows never enter the output set.
    pub fn merge(raw: &RawLoginRow, geo: &GeoRecord) -> Option<Self> {
        let latitude = geo.latitude?;
        let longitude = geo.longitude?;
        Some(Self {
            client_ip: raw.client_ip.clone(),
            user_name: raw.user_name.clone(),
            login_count: raw.login_count,
            country_code: geo.country_code.clone(),
            country_name: geo.country_name.clone(),
            city: geo.city.clone(),
            region: geo.region.clone(),
            latitude,
            longitude,
        })
    }
}

/// Aggregated login count for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryTotal {
    pub country_name: String,
    pub login_count: u64,
}

/// Headline numbers computed over the retained enriched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub num_countries: usize,
    pub num_users: usize,
    pub num_logins: u64,
}
