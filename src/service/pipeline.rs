use std::collections::HashMap;
use tracing::debug;

use crate::model::{EnrichedRow, GeoRecord, RawLoginRow, SENTINEL_IP};
use crate::service::GeoResolver;

/// Turns raw login rows into geolocated rows.
///
/// Rows carrying the sentinel IP are dropped before resolution; rows whose
/// geography lacks coordinates are dropped after. Input order is preserved
/// and per-row failures never abort the run.
pub struct EnrichmentPipeline {
    resolver: GeoResolver,
}

impl EnrichmentPipeline {
    pub fn new(resolver: GeoResolver) -> Self {
        Self { resolver }
    }

    pub fn enrich(&self, rows: &[RawLoginRow]) -> Vec<EnrichedRow> {
        // Per-run memo cache: each distinct IP hits the resolver once,
        // regardless of how many rows share it. Discarded on return.
        let mut cache: HashMap<String, GeoRecord> = HashMap::new();
        let mut enriched = Vec::with_capacity(rows.len());

        for row in rows {
            if row.client_ip == SENTINEL_IP {
                debug!("Skipping row for {} with sentinel IP", row.user_name);
                continue;
            }

            let geo = cache
                .entry(row.client_ip.clone())
                .or_insert_with(|| self.resolver.resolve(&row.client_ip));

            if let Some(merged) = EnrichedRow::merge(row, geo) {
                enriched.push(merged);
            }
        }

        debug!(
            "Enriched {} of {} rows ({} distinct IPs resolved)",
            enriched.len(),
            rows.len(),
            cache.len()
        );
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoLookupRecord;
    use crate::service::GeoLookup;
    use anyhow::{anyhow, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test double that counts invocations to observe memoization.
    struct CountingLookup {
        records: Vec<GeoLookupRecord>,
        calls: Arc<AtomicUsize>,
    }

    impl GeoLookup for CountingLookup {
        fn lookup(&self, ip: &str) -> Result<GeoLookupRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.records
                .iter()
                .find(|r| r.ip == ip)
                .cloned()
                .ok_or_else(|| anyhow!("no record for {}", ip))
        }
    }

    fn record(ip: &str, country: &str) -> GeoLookupRecord {
        GeoLookupRecord {
            ip: ip.to_string(),
            country_short: Some(country.to_string()),
            city: Some("Lyon".to_string()),
            region: Some("Auvergne".to_string()),
            latitude: Some(45.76),
            longitude: Some(4.83),
        }
    }

    fn raw(ip: &str, user: &str, count: u64) -> RawLoginRow {
        RawLoginRow {
            client_ip: ip.to_string(),
            user_name: user.to_string(),
            login_count: count,
        }
    }

    fn pipeline_with(records: Vec<GeoLookupRecord>) -> (EnrichmentPipeline, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = CountingLookup {
            records,
            calls: calls.clone(),
        };
        (
            EnrichmentPipeline::new(GeoResolver::new(Box::new(lookup))),
            calls,
        )
    }

    #[test]
    fn test_sentinel_ip_rows_skipped_before_resolution() {
        let (pipeline, calls) = pipeline_with(vec![record("1.1.1.1", "US")]);
        let rows = vec![raw("1.1.1.1", "alice", 3), raw("0.0.0.0", "bob", 5)];

        let enriched = pipeline.enrich(&rows);
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].user_name, "alice");
        assert_eq!(enriched[0].country_code, "US");
        assert_eq!(enriched[0].login_count, 3);
        // The sentinel row never reached the lookup.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shared_ip_resolved_once() {
        let (pipeline, calls) = pipeline_with(vec![record("2.2.2.2", "FR")]);
        let rows = vec![raw("2.2.2.2", "x", 1), raw("2.2.2.2", "y", 2)];

        let enriched = pipeline.enrich(&rows);
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].country_name, "France");
        assert_eq!(enriched[1].country_name, "France");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_not_shared_across_runs() {
        let (pipeline, calls) = pipeline_with(vec![record("2.2.2.2", "FR")]);
        let rows = vec![raw("2.2.2.2", "x", 1)];

        pipeline.enrich(&rows);
        pipeline.enrich(&rows);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_resolution_rows_dropped_without_error() {
        let (pipeline, _) = pipeline_with(vec![]);
        let rows = vec![raw("3.3.3.3", "z", 4)];

        // Lookup fails, row degrades to the Unknown record and is dropped
        // by the coordinate filter.
        let enriched = pipeline.enrich(&rows);
        assert!(enriched.is_empty());
    }

    #[test]
    fn test_input_order_preserved() {
        let (pipeline, _) = pipeline_with(vec![
            record("1.1.1.1", "US"),
            record("2.2.2.2", "FR"),
            record("4.4.4.4", "DE"),
        ]);
        let rows = vec![
            raw("4.4.4.4", "c", 1),
            raw("3.3.3.3", "dropped", 9),
            raw("1.1.1.1", "a", 2),
            raw("2.2.2.2", "b", 3),
        ];

        let users: Vec<String> = pipeline
            .enrich(&rows)
            .into_iter()
            .map(|r| r.user_name)
            .collect();
        assert_eq!(users, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_input() {
        let (pipeline, calls) = pipeline_with(vec![]);
        assert!(pipeline.enrich(&[]).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
