//! Run one scrape over the configured sources and print the summary as JSON.
//! Exits non-zero when the run is aborted (bad credentials, store unreachable).

use anyhow::{Context, Result};

use grant_scout::config::{load_sources_default, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    grant_scout::init_tracing();

    let cfg = AppConfig::from_env()?;
    let sources = load_sources_default().context("loading source list")?;
    let pipeline = grant_scout::build_pipeline(&cfg, sources)?;

    let summary = pipeline.run().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    for p in &summary.new_records {
        println!("NEW [{}] {} ({}) {}", p.agency, p.title, p.end_date, p.link);
    }
    Ok(())
}
