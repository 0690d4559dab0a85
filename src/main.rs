use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use evidence_pack::pack::{self, DomCheckpoint, LoadedPack, NetworkCapture, PackCapture};
use evidence_pack::{util, Config};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "evidence-pack", version)]
#[command(about = "Write, inspect and normalize evidence packs of recorded ad-enabled page runs")]
struct Cli {
    /// Data directory for config and logs (default: $EVIDENCE_PACK_HOME or ~/.evidence-pack)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a pack from a capture manifest (JSON) and print its paths
    Write {
        capture: PathBuf,
        /// Directory the pack is created under (default: configured packs dir)
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
    /// Load a pack directory and summarize it
    Inspect {
        pack: PathBuf,
        /// Print the full canonical record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the artifact paths of a run
    Paths {
        run_id: String,
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
    /// List run ids with loadable packs
    List {
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
    /// Normalize a standalone iframes/tags/events file and print canonical JSON
    Normalize {
        file: PathBuf,
        #[arg(long, value_enum)]
        kind: RecordKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RecordKind {
    Iframes,
    Tags,
    Events,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_data_dir(cli.data_dir.clone());
    let config = Config::load();

    // Initialize logging to file (~/.evidence-pack/logs/evidence-pack.log)
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())
        .with_context(|| format!("opening {}", util::log_file_path().display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false) // Disable ANSI colors in log file
        .init();

    run(cli.command, &config)
}

fn run(command: Command, config: &Config) -> Result<()> {
    let base_dir = |dir: Option<PathBuf>| dir.unwrap_or_else(|| config.packs_dir.clone());

    match command {
        Command::Write { capture: manifest, base_dir: dir } => {
            let raw = fs::read(&manifest)
                .with_context(|| format!("reading capture manifest {}", manifest.display()))?;
            let capture: PackCapture = serde_json::from_slice(&raw)
                .with_context(|| format!("parsing capture manifest {}", manifest.display()))?;
            let paths = pack::write_evidence_pack(&base_dir(dir), &capture)?;
            print_json(&paths, config.pretty_output)
        }
        Command::Inspect { pack: pack_path, json } => {
            let loaded = pack::load_evidence_pack(&pack_path)
                .with_context(|| format!("no evidence pack at {}", pack_path.display()))?;
            if json {
                print_json(&loaded, config.pretty_output)
            } else {
                print_summary(&pack_path, &loaded);
                Ok(())
            }
        }
        Command::Paths { run_id, base_dir: dir } => {
            let paths = pack::EvidencePackPaths::new(&base_dir(dir), &run_id);
            print_json(&paths, config.pretty_output)
        }
        Command::List { base_dir: dir } => {
            for run_id in pack::list_runs(&base_dir(dir))? {
                println!("{run_id}");
            }
            Ok(())
        }
        Command::Normalize { file, kind } => {
            let raw = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let doc: serde_json::Value = serde_json::from_slice(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;
            let missing = || format!("{} has no recognizable record array", file.display());
            match kind {
                RecordKind::Iframes => {
                    let records = pack::normalize_iframes(&doc).with_context(missing)?;
                    print_json(&records, config.pretty_output)
                }
                RecordKind::Tags => {
                    let records = pack::normalize_tags(&doc).with_context(missing)?;
                    print_json(&records, config.pretty_output)
                }
                RecordKind::Events => {
                    let records = pack::normalize_gpt_events(&doc).with_context(missing)?;
                    print_json(&records, config.pretty_output)
                }
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

fn print_summary(path: &Path, loaded: &LoadedPack) {
    let meta = &loaded.metadata;
    println!("pack:        {}", path.display());
    println!("run:         {}", meta.run_id);
    println!("url:         {}", meta.url);
    if let Some(duration) = meta.duration() {
        println!(
            "duration:    {:.1}s",
            duration.num_milliseconds() as f64 / 1000.0
        );
    }

    let network = match &loaded.network {
        Some(NetworkCapture::Structured(_)) => "structured".to_string(),
        Some(NetworkCapture::Raw(text)) => format!("raw text ({} bytes)", text.len()),
        None => "absent".to_string(),
    };
    println!("network:     {network}");

    let checkpoints: Vec<&str> = DomCheckpoint::ALL
        .into_iter()
        .filter(|c| loaded.dom.get(*c).is_some())
        .map(|c| c.as_str())
        .collect();
    println!("dom:         {}", list_or_absent(&checkpoints));

    let shots = &loaded.screenshots;
    println!(
        "screenshots: {}full, {} crop(s)",
        if shots.full.is_some() { "" } else { "no " },
        shots.crops.len()
    );

    match &loaded.iframes {
        Some(frames) => {
            let ads = frames.iter().filter(|f| f.is_ad.is_yes()).count();
            println!("iframes:     {} ({} flagged ad)", frames.len(), ads);
        }
        None => println!("iframes:     absent"),
    }
    match &loaded.tags {
        Some(tags) => println!("tags:        {}", tags.len()),
        None => println!("tags:        absent"),
    }
    match &loaded.gpt_events {
        Some(events) => println!("gpt events:  {}", events.len()),
        None => println!("gpt events:  absent"),
    }
}

fn list_or_absent(items: &[&str]) -> String {
    if items.is_empty() {
        "absent".to_string()
    } else {
        items.join(", ")
    }
}
