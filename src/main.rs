mod cli;
mod dao;
mod error;
mod model;
mod report;
mod service;

use anyhow::Result;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter};
use tracing::{info, Level};

use cli::Args;
use dao::LoginDb;
use report::LoginReport;
use service::{EnrichmentPipeline, GeoResolver, MaxmindLookup};

fn main() -> Result<()> {
    let args = Args::parse().merge_with_config()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let start_date = args.start_date();
    let end_date = args.end_date();

    info!("login-geo starting");
    info!(
        "Config: database={}, geoip_db={}, window={} to {}, user={}, format={:?}",
        args.database(),
        args.geoip_db(),
        start_date,
        end_date,
        args.user_name.as_deref().unwrap_or("<all>"),
        args.format,
    );

    let db = LoginDb::new(args.database())?;
    let rows = db.fetch_login_history(start_date, end_date, args.user_name.as_deref())?;
    info!("Fetched {} login rows", rows.len());

    let lookup = MaxmindLookup::open(args.geoip_db())?;
    let pipeline = EnrichmentPipeline::new(GeoResolver::new(Box::new(lookup)));
    let enriched = pipeline.enrich(&rows);
    info!("Retained {} geolocated rows", enriched.len());

    let report = LoginReport::build(enriched);
    info!("Countries: {}", report.summary.num_countries);
    info!("Users: {}", report.summary.num_users);
    info!("Logins: {}", report.summary.num_logins);

    match &args.output {
        Some(path) => {
            let file = File::create(path)?;
            report.write(BufWriter::new(file), args.format)?;
            info!("Report written to {}", path);
        }
        None => {
            let stdout = io::stdout();
            report.write(stdout.lock(), args.format)?;
        }
    }

    Ok(())
}
