use serde::{Deserialize, Serialize};

/// Resolved geographic attributes for one IP address.
///
/// `latitude`/`longitude` are `None` only when resolution failed; every
/// other field degrades to the literal `"Unknown"` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub country_code: String,
    pub country_name: String,
    pub city: String,
    pub region: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl GeoRecord {
    /// Fallback record used when the geolocation lookup fails or echoes
    /// the sentinel IP.
    pub fn unknown() -> Self {
        Self {
            country_code: "Unknown".to_string(),
            country_name: "Unknown".to_string(),
            city: "Unknown".to_string(),
            region: "Unknown".to_string(),
            latitude: None,
            longitude: None,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Raw record exposed by the underlying geolocation database, before any
/// normalization. Field layout mirrors what the lookup backend returns.
#[derive(Debug, Clone)]
pub struct GeoLookupRecord {
    pub ip: String,
    pub country_short: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_record_shape() {
        let rec = GeoRecord::unknown();
        assert_eq!(rec.country_code, "Unknown");
        assert_eq!(rec.country_name, "Unknown");
        assert_eq!(rec.city, "Unknown");
        assert_eq!(rec.region, "Unknown");
        assert!(rec.latitude.is_none());
        assert!(rec.longitude.is_none());
        assert!(!rec.has_coordinates());
    }
}
