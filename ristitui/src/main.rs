use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use log::info;
use ristikko::{AdvancePolicy, Alphabet, Config, Puzzle, Session};

mod app;
mod file_storage;
mod remote;

use app::App;
use file_storage::FileStorage;
use remote::HttpEndpoint;

/// Solve a solution-word crossword in your terminal.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
  /// Path or http(s) URL of the puzzle JSON document.
  puzzle: String,

  /// JSON file with alphabet, advance and solution settings.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Where answers are saved between runs.
  #[arg(long)]
  state_file: Option<PathBuf>,

  /// URL that finished puzzles are posted to.
  #[arg(long)]
  endpoint: Option<String>,

  /// Keep advancing past the end of a word while typing.
  #[arg(long)]
  continuous: bool,

  /// Regex character class of accepted letters, e.g. "[A-ZÅÄÖ]".
  #[arg(long)]
  alphabet: Option<String>,

  /// Write logs here. The terminal belongs to the UI, so nothing is logged otherwise
  /// unless RUST_LOG is set.
  #[arg(long)]
  log_file: Option<PathBuf>,
}

/// Why the grid could not be shown.
#[derive(Debug, thiserror::Error)]
enum LoadError {
  #[error("could not read {path}: {source}")]
  Read { path: String, source: io::Error },
  #[error("could not download the puzzle: {0}")]
  Fetch(#[from] reqwest::Error),
  #[error(transparent)]
  Puzzle(#[from] ristikko::Error),
}

fn main() -> io::Result<()> {
  let args = Args::parse();
  init_logging(args.log_file.as_deref())?;

  let session = start(&args);
  if let Err(e) = &session {
    log::error!("{e}");
  }
  let endpoint = args.endpoint.clone().map(HttpEndpoint::new);
  let app = App::new(session.map_err(|e| e.to_string()), endpoint);

  let terminal = ratatui::init();
  execute!(io::stdout(), EnableMouseCapture)?;
  let result = app.run(terminal);
  execute!(io::stdout(), DisableMouseCapture)?;
  ratatui::restore();
  result
}

fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
  let default_level = if log_file.is_some() { "info" } else { "off" };
  let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
  if let Some(path) = log_file {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    builder.target(env_logger::Target::Pipe(Box::new(file)));
  }
  builder.init();
  Ok(())
}

fn start(args: &Args) -> Result<Session, LoadError> {
  let config = load_config(args)?;
  let raw = remote::fetch_puzzle(&args.puzzle)?;
  let puzzle = Puzzle::load(&raw)?;

  let state_file = args.state_file.clone().unwrap_or_else(default_state_file);
  info!("saving answers to {}", state_file.display());
  Ok(Session::new(puzzle, &config, Box::new(FileStorage::new(state_file)))?)
}

fn load_config(args: &Args) -> Result<Config, LoadError> {
  let mut config = match &args.config {
    Some(path) => {
      let json = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.display().to_string(),
        source,
      })?;
      Config::from_json(&json)?
    }
    None => Config::default(),
  };
  if args.continuous {
    config.advance = AdvancePolicy::Continuous;
  }
  if let Some(class) = &args.alphabet {
    config.alphabet = Alphabet::new(class)?;
  }
  Ok(config)
}

fn default_state_file() -> PathBuf {
  dirs::data_local_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("ristikko")
    .join("answers.json")
}
