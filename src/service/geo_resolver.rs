use anyhow::{Context, Result};
use maxminddb::geoip2;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::warn;

use crate::model::{GeoLookupRecord, GeoRecord, SENTINEL_IP};
use crate::service::country;

/// Opaque boundary to the geolocation database: one IP string in, one raw
/// record out, or an error on failure.
pub trait GeoLookup {
    fn lookup(&self, ip: &str) -> Result<GeoLookupRecord>;
}

/// GeoLookup backed by a MaxMind City database.
#[derive(Clone)]
pub struct MaxmindLookup {
    reader: Arc<maxminddb::Reader<Vec<u8>>>,
}

impl MaxmindLookup {
    pub fn open(db_path: &str) -> Result<Self> {
        let reader = maxminddb::Reader::open_readfile(db_path)
            .with_context(|| format!("Failed to open GeoIP database at {}", db_path))?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }
}

impl GeoLookup for MaxmindLookup {
    fn lookup(&self, ip: &str) -> Result<GeoLookupRecord> {
        let addr: IpAddr = ip
            .parse()
            .with_context(|| format!("Invalid IP address: {}", ip))?;
        let city = self
            .reader
            .lookup::<geoip2::City>(addr)
            .with_context(|| format!("GeoIP lookup failed for {}", ip))?;

        let country_short = city
            .country
            .as_ref()
            .and_then(|c| c.iso_code)
            .map(|s| s.to_string());
        let city_name = city
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|names| names.get("en"))
            .map(|s| s.to_string());
        let region = city
            .subdivisions
            .as_ref()
            .and_then(|subs| subs.first())
            .and_then(|sub| sub.names.as_ref())
            .and_then(|names| names.get("en"))
            .map(|s| s.to_string());
        let (latitude, longitude) = city
            .location
            .as_ref()
            .map(|loc| (loc.latitude, loc.longitude))
            .unwrap_or((None, None));

        Ok(GeoLookupRecord {
            ip: ip.to_string(),
            country_short,
            city: city_name,
            region,
            latitude,
            longitude,
        })
    }
}

/// Normalizes the raw lookup into a [`GeoRecord`], absorbing every failure
/// into the Unknown record. Never returns an error.
pub struct GeoResolver {
    lookup: Box<dyn GeoLookup>,
}

impl GeoResolver {
    pub fn new(lookup: Box<dyn GeoLookup>) -> Self {
        Self { lookup }
    }

    /// Resolves one IP. Lookup errors and sentinel-echo records both fall
    /// back to [`GeoRecord::unknown`] with a warning; callers are expected
    /// to filter the sentinel IP itself before calling.
    pub fn resolve(&self, ip: &str) -> GeoRecord {
        let rec = match self.lookup.lookup(ip) {
            Ok(rec) => rec,
            Err(e) => {
                warn!("Error retrieving geolocation for IP {}: {}", ip, e);
                return GeoRecord::unknown();
            }
        };

        if rec.ip == SENTINEL_IP {
            warn!("Geolocation database returned {} for IP: {}", SENTINEL_IP, ip);
            return GeoRecord::unknown();
        }

        let country_code = rec.country_short.unwrap_or_else(|| "Unknown".to_string());
        let country_name = country::full_name(&country_code);
        GeoRecord {
            country_code,
            country_name,
            city: rec.city.unwrap_or_else(|| "Unknown".to_string()),
            region: rec.region.unwrap_or_else(|| "Unknown".to_string()),
            latitude: rec.latitude,
            longitude: rec.longitude,
        }
    }
}
