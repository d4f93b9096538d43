//! This crate is meant to be used as the foundation for a solution-word crossword app.
//! It provides no UI itself, but see `ristitui` for an example of how you can use it
//! to produce a crossword app.
//!
//! Puzzles are loaded from a JSON document listing cells and word spans. The user fills
//! in letters, and once the designated solution word is correct they may submit their
//! contact details to a remote endpoint.
//!
//! Everything that changes during a run lives in a [Session], which is driven by
//! [InputEvent]s and a handful of button actions.

use Direction::{Across, Down};
use std::fmt::{self, Display};
use std::ops::Not;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod answers;
mod config;
mod highlight;
mod navigator;
mod puzzle;
mod session;
mod solution;
mod storage;
pub mod submission;

#[cfg(test)]
mod testing;

pub use answers::{Alphabet, AnswerStore};
pub use config::{Config, SolutionSource};
pub use highlight::{CellStyle, HighlightController};
pub use navigator::{AdvancePolicy, Navigator};
pub use puzzle::{Cell, Puzzle, Word, flip_y};
pub use session::{CheckReport, InputEvent, NavigationDirection, Session};
pub use solution::{Score, SolutionSpec};
pub use storage::{MemoryStorage, Storage};

/// The two crossword directions: `Across` and `Down`
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, PartialOrd, Ord)]
pub enum Direction {
  Across,
  Down,
}

impl Not for Direction {
  type Output = Self;
  fn not(self) -> Self {
    match self {
      Across => Down,
      Down => Across,
    }
  }
}

impl FromStr for Direction {
  type Err = Error;

  /// Case-insensitive: `"across"`, `"Across"` and `"ACROSS"` are all accepted.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "across" => Ok(Across),
      "down" => Ok(Down),
      _ => Err(Error::Parse(format!("unrecognized direction {s:?}"))),
    }
  }
}

impl Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Across => write!(f, "across"),
      Down => write!(f, "down"),
    }
  }
}

/// A position in the grid. The origin is the top-left corner, `x` grows to the right
/// and `y` grows downwards.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
  pub x: usize,
  pub y: usize,
}

impl Coord {
  pub const fn new(x: usize, y: usize) -> Self {
    Self { x, y }
  }

  /// The neighbouring position one step along `direction`, i.e. to the right for
  /// `Across` and below for `Down`.
  pub fn step_forward(self, direction: Direction) -> Self {
    match direction {
      Across => Self::new(self.x + 1, self.y),
      Down => Self::new(self.x, self.y + 1),
    }
  }

  /// The neighbouring position one step against `direction`, or `None` on the top or
  /// left edge of the grid.
  pub fn step_back(self, direction: Direction) -> Option<Self> {
    match direction {
      Across => self.x.checked_sub(1).map(|x| Self::new(x, self.y)),
      Down => self.y.checked_sub(1).map(|y| Self::new(self.x, y)),
    }
  }
}

impl From<(usize, usize)> for Coord {
  fn from((x, y): (usize, usize)) -> Self {
    Self::new(x, y)
  }
}

/// The `"x,y"` form used as the key of persisted answers.
impl Display for Coord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{},{}", self.x, self.y)
  }
}

impl FromStr for Coord {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let bad = || Error::Format(format!("invalid coordinate key {s:?}"));
    let (x, y) = s.split_once(',').ok_or_else(bad)?;
    let x = x.trim().parse().map_err(|_| bad())?;
    let y = y.trim().parse().map_err(|_| bad())?;
    Ok(Self::new(x, y))
  }
}

/// The errors that may be produced by functions in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The puzzle document or configuration was not valid JSON, or had the wrong shape.
  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),
  /// The puzzle document was well-formed JSON but describes an impossible puzzle.
  #[error("invalid puzzle: {0}")]
  Parse(String),
  /// Persisted answers could not be read back.
  #[error("invalid saved answers: {0}")]
  Format(String),
  /// The character is not part of the configured alphabet.
  #[error("{0:?} is not an accepted letter")]
  InvalidLetter(char),
  /// The cell is blocked, blank, or not part of the puzzle.
  #[error("cell {0} does not accept input")]
  NotFillable(Coord),
  /// A solution word and its coordinate list disagree in length.
  #[error("solution word has {letters} letters but {coords} coordinates")]
  SolutionLength { letters: usize, coords: usize },
  /// The configuration is inconsistent with the puzzle.
  #[error("invalid configuration: {0}")]
  Config(String),
}
