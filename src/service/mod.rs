pub mod aggregate;
pub mod country;
mod geo_resolver;
mod pipeline;

pub use geo_resolver::{GeoLookup, GeoResolver, MaxmindLookup};
pub use pipeline::EnrichmentPipeline;
