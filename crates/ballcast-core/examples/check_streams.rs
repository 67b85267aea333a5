//! Stream availability example
//!
//! Loads a config file, runs one refresh cycle and prints every playable feed.
//!
//! Run with: cargo run -p ballcast-core --example check_streams -- config.json

use ballcast_core::{
    http_client, AvailabilityAggregator, Config, HttpManifestFetcher, RefreshLoop,
    StatsApiCatalog, StreamProber,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let mut config = Config::load(&path)?;
    config.check_streams = true;

    let prober_config = config.prober_config();
    prober_config.validate()?;

    let client = http_client(&prober_config)?;
    let catalog = StatsApiCatalog::new(client.clone(), &config);
    let prober = StreamProber::new(
        Arc::new(HttpManifestFetcher::with_client(client)),
        prober_config,
    );
    let refresher = RefreshLoop::new(
        Arc::new(catalog),
        Some(AvailabilityAggregator::new(prober)),
        config.refresh_interval(),
    );

    let state = refresher.refresh_once(&CancellationToken::new()).await?;

    println!("Ballcast Core - Stream Check");
    println!("============================\n");
    println!("Schedule for {}: {} games", state.schedule.date, state.schedule.events.len());

    for event in &state.schedule.events {
        let streams = state.snapshot.streams_for(event.id);
        if streams.is_empty() {
            continue;
        }
        println!("\n{} vs {}", event.matchup.away, event.matchup.home);
        for stream in streams {
            println!("  {:>8}  {}", stream.feed_id, stream);
        }
    }

    let stats = state.snapshot.stats();
    println!(
        "\n{} of {} active feeds playable",
        stats.available, stats.probed
    );

    Ok(())
}
