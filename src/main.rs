use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use itunesdb_codec::model::Database;
use itunesdb_codec::{device, diff, validation};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "itunesdb")]
#[command(about = "Inspect, compare, and verify iTunesDB files", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of a database file
    Info {
        /// Path to the database file
        database: String,

        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two database files field by field
    Diff {
        /// Reference database
        left: String,

        /// Database to compare against the reference
        right: String,

        /// Emit the full divergence report as JSON
        #[arg(long)]
        json: bool,

        /// Maximum divergences to print in text mode
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Decode a database, re-encode it, and verify byte identity
    Verify {
        /// Path to the database file
        database: String,
    },

    /// Find the database file under a mounted device
    Locate {
        /// Device mount point
        mount: String,
    },
}

#[derive(Debug, Serialize)]
struct DatabaseSummary {
    format_version: u32,
    database_id: String,
    sections: usize,
    tracks: usize,
    playlists: usize,
    albums: usize,
    playlist_names: Vec<String>,
    warnings: usize,
}

impl DatabaseSummary {
    fn new(db: &Database, warnings: usize) -> DatabaseSummary {
        DatabaseSummary {
            format_version: db.format_version(),
            database_id: format!("{:#018x}", db.database_id()),
            sections: db.section_count(),
            tracks: db.tracks().count(),
            playlists: db.playlists().count(),
            albums: db.album_list().map(|l| l.len()).unwrap_or(0),
            playlist_names: db
                .playlists()
                .map(|p| p.name().unwrap_or("(unnamed)").to_string())
                .collect(),
            warnings,
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match args.command {
        Command::Info { database, json } => {
            let out = device::load_database(&expand(&database))?;
            let summary = DatabaseSummary::new(&out.database, out.warnings.len());
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Format version: 0x{:02x}", summary.format_version);
                println!("Database id:    {}", summary.database_id);
                println!("Sections:       {}", summary.sections);
                println!("Tracks:         {}", summary.tracks);
                println!("Albums:         {}", summary.albums);
                println!("Playlists:      {}", summary.playlists);
                for name in &summary.playlist_names {
                    println!("  - {name}");
                }
                if summary.warnings > 0 {
                    println!("Warnings:       {} (rerun with -v for details)", summary.warnings);
                }
            }
        }

        Command::Diff {
            left,
            right,
            json,
            limit,
        } => {
            let left_path = expand(&left);
            let right_path = expand(&right);
            let left_bytes = std::fs::read(&left_path)
                .with_context(|| format!("Failed to read {:?}", left_path))?;
            let right_bytes = std::fs::read(&right_path)
                .with_context(|| format!("Failed to read {:?}", right_path))?;

            let report = diff(&left_bytes, &right_bytes);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_empty() {
                println!("Databases are structurally identical");
            } else {
                for d in report.iter().take(limit) {
                    println!(
                        "{} at offset {}: {} expected {}, got {}",
                        d.path, d.offset, d.field, d.expected, d.actual
                    );
                }
                if report.len() > limit {
                    println!("... and {} more", report.len() - limit);
                }
            }
            if !report.is_empty() {
                anyhow::bail!("{} divergence(s) found", report.len());
            }
        }

        Command::Verify { database } => {
            validation::verify_file(&expand(&database))?;
            log::info!("✅ Verification passed");
        }

        Command::Locate { mount } => {
            let path = device::locate_database(&expand(&mount))?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
