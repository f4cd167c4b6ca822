#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line host that streams tiles around an observer.
//!
//! The host plays the part of the rendering environment: it feeds one observer
//! position per tick into the tracker, starts the fetches the tracker asks
//! for and logs the notifications a renderer would draw.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use landstream_bundle::ManifestDecoder;
use landstream_http::{build_client, AssumeClaimed, HttpContentSource, RpcClaimSource};
use landstream_system_expansion::{self as expansion, Expansion};
use landstream_system_fetch::{self as fetch, ClaimSource, TileContentResolver, TileFetcher};
use landstream_system_tracking::{initial_tile_from_query, PositionTracker};
use landstream_world::WorldGrid;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod route;
mod session;

use config::{Args, Settings};
use route::{parse_position, Wander};
use session::Session;

const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Entry point for the Landstream command-line interface.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::resolve(&args)?;
    let transform = settings.transform()?;
    let initial = initial_tile_from_query(&args.start);

    let client = build_client(settings.fetch.timeout())?;
    let claims: Arc<dyn ClaimSource> = match &settings.claim.url {
        Some(url) => Arc::new(RpcClaimSource::new(
            client.clone(),
            url.as_str(),
            settings.claim.method.as_str(),
        )),
        None => {
            warn!("no claim endpoint configured; treating every tile as claimed");
            Arc::new(AssumeClaimed)
        }
    };
    let content = Arc::new(HttpContentSource::new(
        client,
        settings.content.base_url(),
    ));
    info!(content = content.base_url(), "content host selected");
    let resolver = TileContentResolver::new(claims, content, Arc::new(ManifestDecoder));

    let grid = Arc::new(WorldGrid::new());
    let (sender, receiver) = mpsc::unbounded_channel();
    let fetcher = TileFetcher::new(
        fetch::Config::new(settings.fetch.max_in_flight),
        Arc::clone(&grid),
        resolver,
        transform,
        sender,
    );
    let expansion = Expansion::new(expansion::Config::new(settings.world.expansion_radius));
    let tracker = PositionTracker::new(transform, expansion, initial);
    let start = tracker.observer().position;

    let mut session = Session::new(grid, tracker, fetcher, receiver);
    session.start();

    match args.wander {
        Some(steps) => {
            for position in Wander::new(start, steps, args.step, args.seed) {
                session.tick(position).await?;
                tokio::time::sleep(TICK_INTERVAL).await;
            }
        }
        None => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .context("failed to read observer position from stdin")?
            {
                match parse_position(&line) {
                    Some(position) => session.tick(position).await?,
                    None if line.trim().is_empty() => session.drain_notifications(),
                    None => warn!(%line, "ignoring malformed observer position"),
                }
            }
        }
    }

    let (label, summary) = session.finish().await?;
    info!(
        named = summary.named,
        unclaimed_pending = summary.unclaimed_pending,
        unclaimed_empty = summary.unclaimed_empty,
        failed = summary.failed,
        visited = summary.visited,
        "session finished"
    );
    println!("{label}");
    Ok(())
}
