use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use geohash_locator::client::LocatorClient;
use geohash_locator::config::Config;
use geohash_locator::geo::select_precision;
use geohash_locator::location::{LocationStore, MemoryStore, NewLocation, QueryParameters};
use geohash_locator::Locator;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Geohash Locator: index points and find everything within a radius.
///
/// Examples:
///   locator serve --bind 0.0.0.0:8080
///   locator add --id A --name Cafe --lat 40.7128 --lon -74.0060
///   locator find --lat 40.7128 --lon -74.0060 --radius 1
///   locator cells --lat 40.7128 --lon -74.0060 --radius 1
#[derive(Parser)]
#[command(name = "locator", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Bind address (overrides LOCATOR_BIND_ADDR).
        #[arg(long)]
        bind: Option<String>,

        /// JSON-lines location log (overrides LOCATOR_DATA_FILE).
        #[arg(long)]
        data_file: Option<PathBuf>,

        /// Keep locations in memory only.
        #[arg(long, conflicts_with = "data_file")]
        in_memory: bool,

        /// Deadline for one query's cell lookups, in milliseconds.
        #[arg(long)]
        query_timeout_ms: Option<u64>,
    },

    /// Add a location through a running server.
    Add {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        /// Latitude (-90 to 90).
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude (-180 to 180).
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },

    /// Find locations within a radius through a running server.
    Find {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in kilometers.
        #[arg(long)]
        radius: f64,

        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },

    /// Print the precision and candidate cells a query would scan (offline).
    Cells {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long)]
        radius: f64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve {
            bind,
            data_file,
            in_memory,
            query_timeout_ms,
        } => {
            let mut config = Config::from_env();
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if data_file.is_some() {
                config.data_file = data_file;
            }
            if in_memory {
                config.data_file = None;
            }
            if let Some(ms) = query_timeout_ms {
                config.query_timeout_ms = ms;
            }
            serve(config)
        }
        Command::Add {
            id,
            name,
            lat,
            lon,
            server,
        } => {
            let new = NewLocation {
                id,
                name,
                latitude: lat,
                longitude: lon,
            };
            LocatorClient::new(&server)
                .add_location(&new)
                .map(|message| eprintln!("  {}", message))
                .map_err(|e| e.to_string())
        }
        Command::Find {
            lat,
            lon,
            radius,
            server,
        } => LocatorClient::new(&server)
            .find_locations(lat, lon, radius)
            .map_err(|e| e.to_string())
            .and_then(|found| print_json(&found)),
        Command::Cells { lat, lon, radius } => {
            let params = QueryParameters { lat, lon, radius };
            Locator::candidate_cells(&params)
                .map_err(|e| e.to_string())
                .and_then(|cells| {
                    eprintln!(
                        "  radius {} km -> precision {}, {} distinct cells",
                        radius,
                        select_precision(radius),
                        cells.distinct().len()
                    );
                    print_json(&cells)
                })
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn serve(config: Config) -> Result<(), String> {
    let store: Arc<dyn LocationStore> = match &config.data_file {
        Some(path) => Arc::new(MemoryStore::open(path.clone())),
        None => {
            tracing::info!("persistence disabled, locations kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let locator = Locator::new(store).with_query_timeout(config.query_timeout());

    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("cannot start runtime: {}", e))?;
    runtime
        .block_on(geohash_locator::server::start(&config.bind_addr, locator))
        .map_err(|e| format!("server on {}: {}", config.bind_addr, e))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "locator",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--in-memory",
            "--query-timeout-ms",
            "250",
        ])
        .unwrap();
        match cli.command {
            Command::Serve {
                bind,
                data_file,
                in_memory,
                query_timeout_ms,
            } => {
                assert_eq!(bind.as_deref(), Some("0.0.0.0:9000"));
                assert!(data_file.is_none());
                assert!(in_memory);
                assert_eq!(query_timeout_ms, Some(250));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_data_file_conflicts_with_in_memory() {
        let parsed = Cli::try_parse_from(["locator", "serve", "--data-file", "x.jsonl", "--in-memory"]);
        assert!(parsed.is_err());
        assert!(Cli::try_parse_from(["locator", "serve", "--host", "0.0.0.0"]).is_err());
    }

    #[test]
    fn test_negative_coordinates_parse() {
        let cli = Cli::try_parse_from(["locator", "cells", "--lat", "-33.86", "--lon", "151.2", "--radius", "1"]).unwrap();
        assert!(matches!(cli.command, Command::Cells { lat, .. } if lat == -33.86));
    }
}
