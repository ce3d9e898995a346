//! stratavox - deterministic voxel world generation
//!
//! Headless host: builds a world from configuration, streams in the region
//! around the origin, runs sample block picks and prints a report.

mod config;

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::DVec3;
use serde::Serialize;
use stratavox_world::{ChunkPos, StoreStats, World, CHUNK_SIZE_X, CHUNK_SIZE_Z};
use tracing::info;

use config::{load_world_config, Overrides, DEFAULT_WORLD_CONFIG_PATH};

/// Summary printed after a run.
#[derive(Debug, Serialize)]
struct Report {
    seed: u64,
    chunks: usize,
    generation_ms: u128,
    surface_min: i32,
    surface_max: i32,
    biomes: BTreeMap<&'static str, usize>,
    picks: PickReport,
    store: StoreStats,
}

#[derive(Debug, Default, Serialize)]
struct PickReport {
    cast: usize,
    hits: usize,
    blocks: BTreeMap<String, usize>,
}

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting stratavox v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WORLD_CONFIG_PATH));
    let config = cli.overrides.apply(load_world_config(&config_path));
    let world = World::new(config).context("invalid world configuration")?;

    let report = run(&world)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run(world: &World) -> Result<Report> {
    let radius = world.config().load_radius;
    let center = ChunkPos::new(0, 0);

    let start = Instant::now();
    world.update_interest(&[DVec3::new(8.0, 64.0, 8.0)]);
    let chunks = world
        .preload(center, radius)
        .context("generating the initial region")?;
    let generation_ms = start.elapsed().as_millis();
    info!(chunks, generation_ms, "region ready");

    let generator = world.generator();
    let mut biomes = BTreeMap::new();
    let mut surface_min = i32::MAX;
    let mut surface_max = i32::MIN;
    let mut picks = PickReport::default();

    for pos in center.square_around(radius) {
        let (ox, oz) = pos.origin();
        for z in 0..CHUNK_SIZE_Z as i32 {
            for x in 0..CHUNK_SIZE_X as i32 {
                let column = generator.column(ox + x, oz + z);
                *biomes.entry(column.biome.as_str()).or_insert(0) += 1;
                surface_min = surface_min.min(column.surface_y);
                surface_max = surface_max.max(column.surface_y);
            }
        }

        // Look down at the chunk centre from just above the surface.
        let (cx, cz) = (ox + CHUNK_SIZE_X as i32 / 2, oz + CHUNK_SIZE_Z as i32 / 2);
        let eye = DVec3::new(
            cx as f64 + 0.5,
            generator.surface_height(cx, cz) as f64 + 2.6,
            cz as f64 + 0.5,
        );
        for direction in [DVec3::NEG_Y, DVec3::new(1.0, -1.0, 0.5)] {
            picks.cast += 1;
            if let Some(hit) = world.pick(eye, direction).context("picking a block")? {
                picks.hits += 1;
                let block = world.get_block(hit.block.x, hit.block.y, hit.block.z)?;
                let name = world.catalog().get(block).display_name.clone();
                *picks.blocks.entry(name).or_insert(0) += 1;
            }
        }
    }

    Ok(Report {
        seed: world.seed(),
        chunks,
        generation_ms,
        surface_min,
        surface_max,
        biomes,
        picks,
        store: world.stats(),
    })
}

fn print_report(report: &Report) {
    println!("seed {}", report.seed);
    println!(
        "generated {} chunks in {} ms, surface y {}..={}",
        report.chunks, report.generation_ms, report.surface_min, report.surface_max
    );
    println!("biomes:");
    for (biome, columns) in &report.biomes {
        println!("  {biome:<10} {columns}");
    }
    println!("picks: {}/{} hit", report.picks.hits, report.picks.cast);
    for (block, count) in &report.picks.blocks {
        println!("  {block:<10} {count}");
    }
    let stats = &report.store;
    println!(
        "store: {} resident, {} generating, {} generations, {} evictions",
        stats.resident, stats.generating, stats.generations, stats.evictions
    );
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    overrides: Overrides,
    json: bool,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--seed" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.overrides.seed = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--seed must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--seed requires an integer");
                    }
                }
                "--radius" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<i32>() {
                            Ok(value) => opts.overrides.radius = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--radius must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--radius requires an integer");
                    }
                }
                "--workers" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<usize>() {
                            Ok(value) => opts.overrides.workers = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--workers must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--workers requires an integer");
                    }
                }
                "--json" => opts.json = true,
                other => {
                    tracing::warn!(arg = %other, "ignoring unknown argument");
                }
            }
        }

        opts
    }

    #[cfg(test)]
    fn config_path(&self) -> &std::path::Path {
        self.config
            .as_deref()
            .unwrap_or_else(|| std::path::Path::new(DEFAULT_WORLD_CONFIG_PATH))
    }
}
