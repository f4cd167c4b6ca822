use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use landstream_core::{TileTransform, DEFAULT_TILE_SIZE};
use landstream_http::{ClaimConfig, ContentConfig, ContentHost};
use landstream_system_expansion::DEFAULT_RADIUS;
use serde::Deserialize;

/// Command-line arguments accepted by the `landstream` binary.
#[derive(Debug, Parser)]
#[command(
    name = "landstream",
    about = "Streams world tiles around a moving observer"
)]
pub(crate) struct Args {
    /// TOML settings file.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Starting tile as a query string, e.g. `x=12&y=-3`.
    #[arg(long, default_value = "")]
    pub(crate) start: String,
    /// Fetch payloads from the local debug host.
    #[arg(long)]
    pub(crate) debug_host: bool,
    /// Tile edge length in world units.
    #[arg(long)]
    pub(crate) tile_size: Option<f32>,
    /// Maximum number of tiles resolving at once.
    #[arg(long)]
    pub(crate) max_in_flight: Option<usize>,
    /// Walk randomly for this many ticks instead of reading positions from stdin.
    #[arg(long)]
    pub(crate) wander: Option<u32>,
    /// Seed for the random walk.
    #[arg(long, default_value_t = 0x6c61_6e64)]
    pub(crate) seed: u64,
    /// Distance covered per tick by the random walk.
    #[arg(long, default_value_t = 12.0)]
    pub(crate) step: f32,
}

/// Settings loaded from `landstream.toml`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) world: WorldSettings,
    pub(crate) content: ContentConfig,
    pub(crate) claim: ClaimConfig,
    pub(crate) fetch: FetchSettings,
}

/// The `[world]` table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldSettings {
    pub(crate) tile_size: f32,
    pub(crate) expansion_radius: u32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            expansion_radius: DEFAULT_RADIUS,
        }
    }
}

/// The `[fetch]` table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FetchSettings {
    pub(crate) timeout_ms: Option<u64>,
    pub(crate) max_in_flight: Option<usize>,
}

impl FetchSettings {
    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Settings {
    /// Loads the configured file, if any, and applies command-line overrides.
    pub(crate) fn resolve(args: &Args) -> Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(args);
        Ok(settings)
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub(crate) fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse settings toml contents")
    }

    pub(crate) fn apply_overrides(&mut self, args: &Args) {
        if args.debug_host {
            self.content.host = ContentHost::Debug;
        }
        if let Some(tile_size) = args.tile_size {
            self.world.tile_size = tile_size;
        }
        if let Some(limit) = args.max_in_flight {
            self.fetch.max_in_flight = Some(limit);
        }
    }

    pub(crate) fn transform(&self) -> Result<TileTransform> {
        TileTransform::new(self.world.tile_size).context("invalid [world] tile_size")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::from_toml("").expect("parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.world.tile_size, 40.0);
        assert_eq!(settings.world.expansion_radius, 2);
        assert_eq!(settings.content.host, ContentHost::Production);
        assert_eq!(settings.fetch.timeout(), None);
    }

    #[test]
    fn parses_every_table() {
        let settings = Settings::from_toml(
            r#"
            [world]
            tile_size = 10.0
            expansion_radius = 3

            [content]
            host = "debug"

            [claim]
            url = "http://localhost:8545"
            method = "parcelHash"

            [fetch]
            timeout_ms = 1500
            max_in_flight = 6
            "#,
        )
        .expect("parse");

        assert_eq!(settings.world.tile_size, 10.0);
        assert_eq!(settings.world.expansion_radius, 3);
        assert_eq!(settings.content.base_url(), "http://lvh.me/tiles");
        assert_eq!(settings.claim.url.as_deref(), Some("http://localhost:8545"));
        assert_eq!(settings.claim.method, "parcelHash");
        assert_eq!(settings.fetch.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(settings.fetch.max_in_flight, Some(6));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::from_toml("[world]\nsize = 3.0\n").is_err());
        assert!(Settings::from_toml("[content]\nhost = \"staging\"\n").is_err());
    }

    #[test]
    fn command_line_overrides_file() {
        let args = Args::parse_from([
            "landstream",
            "--debug-host",
            "--tile-size",
            "20",
            "--max-in-flight",
            "4",
        ]);
        let mut settings = Settings::default();
        settings.apply_overrides(&args);

        assert_eq!(settings.content.host, ContentHost::Debug);
        assert_eq!(settings.world.tile_size, 20.0);
        assert_eq!(settings.fetch.max_in_flight, Some(4));
    }

    #[test]
    fn rejects_non_positive_tile_size() {
        let mut settings = Settings::default();
        settings.world.tile_size = 0.0;
        assert!(settings.transform().is_err());
    }
}
