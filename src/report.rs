//! Report shaping and export.
//!
//! The three shaped results the presentation layer consumes: summary
//! metrics, country totals sorted by login count, and the full detail
//! table sorted the same way.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::AppError;
use crate::model::{CountryTotal, EnrichedRow, SummaryMetrics};
use crate::service::aggregate;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Full report as one JSON document
    Json,
    /// Detail rows as CSV
    Csv,
    /// Detail rows as newline-delimited JSON
    NdJson,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginReport {
    pub summary: SummaryMetrics,
    pub country_totals: Vec<CountryTotal>,
    pub detail: Vec<EnrichedRow>,
}

impl LoginReport {
    pub fn build(enriched: Vec<EnrichedRow>) -> Self {
        let (summary, country_totals) = aggregate::summarize(&enriched);
        let detail = aggregate::sort_by_logins(enriched);
        Self {
            summary,
            country_totals,
            detail,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W, format: ReportFormat) -> Result<(), AppError> {
        match format {
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, self)?;
                writeln!(writer)?;
            }
            ReportFormat::Csv => self.write_csv(&mut writer)?,
            ReportFormat::NdJson => {
                for row in &self.detail {
                    serde_json::to_writer(&mut writer, row)?;
                    writeln!(writer)?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn write_csv<W: Write>(&self, writer: &mut W) -> Result<(), AppError> {
        writeln!(
            writer,
            "client_ip,user_name,login_count,country_code,country_name,city,region,latitude,longitude"
        )?;
        for row in &self.detail {
            writeln!(
                writer,
                "{},{},{},{},{},{},{},{},{}",
                csv_escape(&row.client_ip),
                csv_escape(&row.user_name),
                row.login_count,
                csv_escape(&row.country_code),
                csv_escape(&row.country_name),
                csv_escape(&row.city),
                csv_escape(&row.region),
                row.latitude,
                row.longitude,
            )?;
        }
        Ok(())
    }
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
