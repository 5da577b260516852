use clap::{Parser, Subcommand};
use college_cache::GeoResultCache;
use college_cache::seed::seed_sample_locations;
use college_service::config::cache_config;
use common::models::{CacheStats, LocationSummary};
use common::tracing::init_tracing_cli;
use std::path::PathBuf;
use std::process::ExitCode;

/// Inspect and maintain the college cache file.
#[derive(Debug, Parser)]
#[command(name = "cache-admin", version)]
struct Cli {
    /// Cache file to operate on
    #[arg(long, env = "CACHE_FILE")]
    cache_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the bundled sample locations into the cache
    Populate,
    /// Show totals and the most accessed locations
    Stats,
    /// Free-text search over cached place and college names
    Search {
        query: String,
        #[arg(default_value = "all")]
        stream: String,
    },
    /// List every cached location
    Locations,
    /// Remove every entry
    Clear {
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
    /// Remove entries older than the given number of days
    Cleanup { days: Option<u32> },
}

fn main() -> ExitCode {
    init_tracing_cli();
    let cli = Cli::parse();

    let mut config = cache_config(&|key| std::env::var(key).ok());
    if let Some(path) = cli.cache_file {
        config.path = path;
    }
    let mut cache = GeoResultCache::open(config);

    let result = run(&mut cache, cli.command);
    if let Err(e) = cache.flush() {
        eprintln!("error: failed to write cache file: {}", e);
        return ExitCode::FAILURE;
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cache: &mut GeoResultCache, command: Command) -> Result<(), String> {
    match command {
        Command::Populate => {
            let seeded = seed_sample_locations(cache).map_err(|e| e.to_string())?;
            println!("Populated {} sample locations", seeded);
            print_stats(&cache.stats());
        }
        Command::Stats => {
            print_stats(&cache.stats());
            let locations = cache.list_locations();
            if !locations.is_empty() {
                println!();
                println!("Most accessed:");
                for location in locations.iter().take(5) {
                    println!("  {:>5}  {}", location.access_count, location.location_name);
                }
            }
        }
        Command::Search { query, stream } => {
            if query.trim().is_empty() {
                return Err("query must not be empty".to_string());
            }
            let found = cache.search(&query, &stream);
            println!("{} colleges match '{}'", found.len(), query);
            for hit in &found {
                println!("  {}  ({}, {})", hit.college.name, hit.cached_location, hit.cache_key);
            }
        }
        Command::Locations => {
            let locations = cache.list_locations();
            println!("{} cached locations", locations.len());
            for location in &locations {
                print_location(location);
            }
        }
        Command::Clear { yes } => {
            if !yes {
                return Err("refusing to clear the cache without --yes".to_string());
            }
            let removed = cache.len();
            cache.clear();
            println!("Removed {} cached locations", removed);
        }
        Command::Cleanup { days } => {
            let days = days.unwrap_or(cache.config().freshness_days);
            let removed = cache.purge_expired(days);
            println!("Removed {} entries older than {} days", removed, days);
            print_stats(&cache.stats());
        }
    }
    Ok(())
}

fn print_stats(stats: &CacheStats) {
    println!("Locations: {}", stats.total_cached_locations);
    println!("Colleges:  {}", stats.total_cached_colleges);
    println!("Accesses:  {}", stats.total_accesses);
    if let Some(name) = &stats.most_popular_location {
        println!("Most popular: {} ({} accesses)", name, stats.most_popular_access_count);
    }
    println!("File size: {} bytes", stats.cache_file_size);
}

fn print_location(location: &LocationSummary) {
    println!(
        "  {}  [{} km, {}]  {} colleges, {} accesses, cached {}",
        location.location_name,
        location.radius / 1000,
        location.stream,
        location.college_count,
        location.access_count,
        location.timestamp.format("%Y-%m-%d %H:%M UTC"),
    );
}
