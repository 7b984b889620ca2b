use std::env;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use nasdesk::{config::AppConfig, db, state::AppState};

const USAGE: &str = "Usage: maintenance <sync-properties|check-nas>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("sync-properties") => sync_properties().await?,
        Some("check-nas") => check_nas().await?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn connect() -> Result<AppState> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        "loaded backend configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    AppState::from_pool(pool, config)
}

async fn sync_properties() -> Result<()> {
    let state = connect()?;
    let nas = state.nas().await.map_err(|err| anyhow::anyhow!("{}", err.message()))?;
    let property_ids = state.entities.property_ids().await?;

    if property_ids.is_empty() {
        println!("No properties found.");
        return Ok(());
    }

    println!("Syncing {} properties…", property_ids.len());

    let (mut images, mut documents, mut failed) = (0, 0, 0);
    for property_id in property_ids {
        match nas.sync_property(property_id).await {
            Ok(summary) => {
                images += summary.new_images;
                documents += summary.new_documents;
                for error in &summary.errors {
                    eprintln!("Property {property_id}: {error}");
                }
            }
            Err(err) => {
                failed += 1;
                eprintln!("Property {property_id}: sync failed: {err}");
            }
        }
    }

    println!("Imported {images} images and {documents} documents ({failed} properties failed).");
    Ok(())
}

async fn check_nas() -> Result<()> {
    let state = connect()?;
    let nas = state.nas().await.map_err(|err| anyhow::anyhow!("{}", err.message()))?;
    let reports = nas.check_connectivity().await;

    if reports.is_empty() {
        println!("No NAS store is configured.");
        std::process::exit(1);
    }

    let mut all_ok = true;
    for report in &reports {
        match &report.message {
            None => println!("{} ({}): ok", report.role, report.protocol),
            Some(message) => {
                all_ok = false;
                println!("{} ({}): FAILED {}", report.role, report.protocol, message);
            }
        }
    }

    if !all_ok {
        std::process::exit(2);
    }
    Ok(())
}
