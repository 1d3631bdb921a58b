mod geo;
mod login;

pub use geo::{GeoLookupRecord, GeoRecord};
pub use login::{CountryTotal, EnrichedRow, RawLoginRow, SummaryMetrics, SENTINEL_IP};
