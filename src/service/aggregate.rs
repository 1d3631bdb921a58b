use std::collections::{HashMap, HashSet};

use crate::model::{CountryTotal, EnrichedRow, SummaryMetrics};

/// Computes the headline metrics and the per-country login totals.
///
/// Totals exclude zero-sum groups and come back sorted by login count
/// descending; ties keep first-seen order, so output is deterministic for
/// a given input ordering. Empty input yields zeroed metrics and no totals.
pub fn summarize(rows: &[EnrichedRow]) -> (SummaryMetrics, Vec<CountryTotal>) {
    let mut countries: HashSet<&str> = HashSet::new();
    let mut users: HashSet<&str> = HashSet::new();
    let mut num_logins: u64 = 0;

    // Group totals keyed by country name, kept in first-seen order so the
    // later stable sort breaks ties deterministically.
    let mut totals: Vec<CountryTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        countries.insert(&row.country_name);
        users.insert(&row.user_name);
        num_logins += row.login_count;

        match index.get(&row.country_name) {
            Some(&i) => totals[i].login_count += row.login_count,
            None => {
                index.insert(row.country_name.clone(), totals.len());
                totals.push(CountryTotal {
                    country_name: row.country_name.clone(),
                    login_count: row.login_count,
                });
            }
        }
    }

    totals.retain(|t| t.login_count > 0);
    totals.sort_by(|a, b| b.login_count.cmp(&a.login_count));

    let metrics = SummaryMetrics {
        num_countries: countries.len(),
        num_users: users.len(),
        num_logins,
    };
    (metrics, totals)
}

/// Detail view for tabular display: the full row set sorted by login count
/// descending (stable, so equal counts keep input order).
pub fn sort_by_logins(mut rows: Vec<EnrichedRow>) -> Vec<EnrichedRow> {
    rows.sort_by(|a, b| b.login_count.cmp(&a.login_count));
    rows
}
