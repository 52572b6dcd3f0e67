//! acidstep - 303-style step sequencer in the terminal
//!
//! Run with: cargo run -- [play] / export-midi out.mid / export-json out.json /
//! sheet / template / random / save / delete / list

mod app;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use acidstep::{
    config::EngineConfig,
    io::{midi, Fallback, JsonFileStorage, Library, LibraryEntry, Preset, Td3Sheet, TrackSheet},
    runtime::TrackChain,
    sequencing::{
        generate::{random_pattern_in, Scale},
        Pattern,
    },
};

#[derive(Debug, Parser)]
#[command(name = "acidstep", version, about = "303-style step sequencer")]
struct Cli {
    /// TOML engine config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tempo override
    #[arg(long, global = true)]
    bpm: Option<f64>,

    /// Pattern JSON to start from instead of the autosaved one
    #[arg(long, global = true)]
    pattern: Option<PathBuf>,

    /// Library directory override
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Log file for the terminal UI
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Edit and play in the terminal UI (default)
    Play {
        /// Library ids played end to end by the track key
        #[arg(long = "track", value_name = "ID")]
        track: Vec<String>,
    },
    /// Write the pattern as a Standard MIDI File
    ExportMidi { out: PathBuf },
    /// Write the pattern as a library entry file, or a preset with --preset
    ExportJson {
        out: PathBuf,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        preset: bool,
    },
    /// Print the TD-3 programming sheet
    Sheet {
        /// Library ids; prints one sheet per pattern of the track
        #[arg(long = "track", value_name = "ID")]
        track: Vec<String>,
    },
    /// Print the empty pattern JSON
    Template,
    /// Print a random pattern as JSON
    Random {
        #[arg(long, value_enum, default_value_t = ScaleArg::Minor)]
        scale: ScaleArg,
        #[arg(long, default_value_t = 1)]
        pages: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Save the pattern to the library
    Save {
        name: String,
        /// Also write the new entry to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Remove a saved pattern
    Delete { id: String },
    /// List saved patterns
    List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScaleArg {
    Minor,
    Major,
    Phrygian,
    Blues,
}

impl From<ScaleArg> for Scale {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Minor => Scale::Minor,
            ScaleArg::Major => Scale::Major,
            ScaleArg::Phrygian => Scale::Phrygian,
            ScaleArg::Blues => Scale::Blues,
        }
    }
}

pub type Storage = Fallback<JsonFileStorage>;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Command::Play { .. }));
    init_logging(interactive, cli.log.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(bpm) = cli.bpm {
        config.bpm = bpm;
    }
    if let Some(dir) = &cli.storage {
        config.storage_dir = Some(dir.clone());
    }
    let config = config.clamped();

    let mut library = Library::open(open_storage(&config));
    let pattern = match &cli.pattern {
        Some(path) => read_pattern(path)?,
        None => library.load_current().unwrap_or_default(),
    };

    match cli.command.unwrap_or(Command::Play { track: Vec::new() }) {
        Command::Play { track } => app::run(config, library, pattern, track),
        Command::ExportMidi { out } => {
            midi::write_pattern(&pattern, config.bpm, &out)
                .wrap_err_with(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "MIDI exported");
            Ok(())
        }
        Command::ExportJson { out, name, preset } => {
            let now = SystemTime::now();
            let written = if preset {
                Preset::new(&name, config.bpm, pattern, now).write_to(&out)
            } else {
                LibraryEntry::new(&name, config.bpm, pattern, now, &mut rand::thread_rng()).write_to(&out)
            };
            written.wrap_err_with(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), preset, "pattern exported");
            Ok(())
        }
        Command::Sheet { track } if track.is_empty() => {
            print!("{}", Td3Sheet::build(&pattern));
            Ok(())
        }
        Command::Sheet { track } => {
            let chain = TrackChain::from_library(&track, library.entries());
            if chain.is_empty() {
                warn!(selected = track.len(), "Track chain empty");
            } else {
                print!("{}", TrackSheet::build(&chain));
            }
            Ok(())
        }
        Command::Template => {
            println!("{}", Pattern::template_json());
            Ok(())
        }
        Command::Random { scale, pages, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            println!("{}", random_pattern_in(&mut rng, scale.into(), pages).to_json_pretty());
            Ok(())
        }
        Command::Save { name, out } => {
            let entry = library.save_pattern(&name, config.bpm, &pattern)?;
            println!("{}  {}", entry.id, entry.name);
            if let Some(out) = out {
                entry
                    .write_to(&out)
                    .wrap_err_with(|| format!("failed to write {}", out.display()))?;
            }
            Ok(())
        }
        Command::Delete { id } => {
            if library.remove(&id)? {
                println!("removed {id}");
            } else {
                warn!(id = %id, "no saved pattern with that id");
            }
            Ok(())
        }
        Command::List => {
            for entry in library.entries() {
                println!(
                    "{}  {:<20} {:>5.1} BPM  {} page(s)  {}",
                    entry.id,
                    entry.name,
                    entry.bpm,
                    entry.pattern.pages(),
                    entry.created_at
                );
            }
            Ok(())
        }
    }
}

fn open_storage(config: &EngineConfig) -> Storage {
    match &config.storage_dir {
        Some(dir) => Fallback::new(JsonFileStorage::new(dir)),
        None => Fallback::memory_only(),
    }
}

fn read_pattern(path: &Path) -> EyreResult<Pattern> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    Pattern::from_json_str(&text).wrap_err_with(|| format!("{} is not JSON", path.display()))
}

/// The terminal UI owns stdout, so it logs to a file (or nowhere)
fn init_logging(interactive: bool, log: Option<&Path>) -> EyreResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match (interactive, log) {
        (_, Some(path)) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        (true, None) => {}
        (false, None) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
