// src/main.rs
use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::fs::File;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod accounts;
mod api;
mod api_tests;
mod attendance;
mod clock;
mod config;
mod dashboard;
mod employees;
mod error;
mod leave;
mod master_data;
mod models;
mod org_tree;
mod seed;
mod session;
mod storage;
mod store;
mod validation;

use crate::api::{router, AppState};
use crate::attendance::{monthly_summary, write_summary_csv, MonthPeriod};
use crate::clock::Clock;
use crate::config::{AppConfig, Cli, Command};
use crate::org_tree::build_org_chart;
use crate::storage::FileStorage;
use crate::store::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()
        .context("Failed to read SIMPEG_* configuration")?
        .with_overrides(&cli);

    let storage = Arc::new(FileStorage::new(config.data_dir.clone()));
    let mut store = RecordStore::open(storage, Clock::system())
        .with_context(|| format!("Failed to open record store in {:?}", config.data_dir))?;

    match cli.command {
        None | Some(Command::Serve { .. }) => serve(store, config).await,
        Some(Command::OrgChart { json }) => {
            let db = store.read();
            let chart = build_org_chart(&db.positions, &db.employees, &db.units);
            if json {
                let forest = serde_json::to_string_pretty(&chart.to_forest())
                    .context("Failed to serialize organization chart")?;
                println!("{}", forest);
            } else {
                print!("{}", chart.render_outline());
            }
            Ok(())
        }
        Some(Command::Report { month, csv }) => {
            let period = MonthPeriod::parse(&month).context("Invalid --month")?;
            let rows = monthly_summary(store.read(), period);
            match csv {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {:?}", path))?;
                    write_summary_csv(&rows, file).context("Failed to write CSV report")?;
                    info!("Wrote {} rows for {} to {:?}", rows.len(), period, path);
                }
                None => {
                    println!("Laporan presensi {}", period);
                    println!("{:<30} {:>6} {:>6} {:>6} {:>6} {:>6}", "Nama Pegawai", "Hadir", "Sakit", "Izin", "Cuti", "Alpha");
                    for row in &rows {
                        let c = &row.counts;
                        println!(
                            "{:<30} {:>6} {:>6} {:>6} {:>6} {:>6}",
                            row.name, c.hadir, c.sakit, c.izin, c.cuti, c.alpha
                        );
                    }
                }
            }
            Ok(())
        }
        Some(Command::Reset) => {
            store.reset_to_seed().context("Failed to restore sample data")?;
            info!("Record store reset to sample data");
            Ok(())
        }
    }
}

async fn serve(store: RecordStore, config: AppConfig) -> Result<()> {
    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_addr()))?;
    let tls_paths = config.tls_paths();
    let app = router(AppState::new(store, config));

    match tls_paths {
        Some((cert, key)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert, &key)
                .await
                .with_context(|| format!("Failed to load TLS cert/key from {:?} and {:?}", cert, key))?;
            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        }
        None => {
            warn!("No TLS certificate configured, serving plain HTTP");
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Starting server on http://{}", addr);
            axum::serve(listener, app).await.context("HTTP server failed")?;
        }
    }
    Ok(())
}
