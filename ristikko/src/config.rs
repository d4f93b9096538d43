use crate::{AdvancePolicy, Alphabet, Coord, Error, Puzzle, SolutionSpec};

use serde::Deserialize;

/// Settings that vary between deployments of the same puzzle app.
///
/// ```json
/// {
///   "alphabet": "[A-ZÅÄÖ]",
///   "advance": "word-bounded",
///   "solution": {"kind": "static", "word": "SINAPPI", "coords": [[7, 0], [3, 2]]}
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub alphabet: Alphabet,
  pub advance: AdvancePolicy,
  pub solution: SolutionSource,
}

impl Config {
  pub fn from_json(json: &str) -> Result<Self, Error> {
    Ok(serde_json::from_str(json)?)
  }
}

/// Where the solution word comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SolutionSource {
  /// The word the puzzle document flags with `ratkaisusana`.
  #[default]
  FlaggedWord,
  /// A fixed word read from the given cells, in top-left coordinates.
  Static {
    word: String,
    coords: Vec<(usize, usize)>,
  },
}

impl SolutionSource {
  pub fn resolve(&self, puzzle: &Puzzle) -> Result<SolutionSpec, Error> {
    match self {
      Self::FlaggedWord => SolutionSpec::from_puzzle(puzzle),
      Self::Static { word, coords } => {
        let coords: Vec<Coord> = coords.iter().copied().map(Coord::from).collect();
        if let Some(bad) = coords.iter().find(|&&c| !puzzle.is_fillable(c)) {
          return Err(Error::Config(format!("solution cell {bad} does not accept input")));
        }
        SolutionSpec::new(coords, word)
      }
    }
  }
}
