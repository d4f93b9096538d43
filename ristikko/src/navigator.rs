use crate::{Coord, Puzzle, Word};

use log::trace;
use serde::Deserialize;

/// How far the cursor may travel while typing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvancePolicy {
  /// Stop at the first and last cell of the active word.
  #[default]
  WordBounded,
  /// Keep going in the active word's direction as long as there is a fillable cell,
  /// even past the end of the word.
  Continuous,
}

/// Computes where the cursor goes when the user types or navigates within the
/// active word.
#[derive(Debug, Default, Clone, Copy)]
pub struct Navigator {
  pub policy: AdvancePolicy,
}

impl Navigator {
  pub fn new(policy: AdvancePolicy) -> Self {
    Self { policy }
  }

  /// The cell after `from` in the active word's direction, or `None` at the end of
  /// the word (or of the fillable run, for [AdvancePolicy::Continuous]).
  pub fn next(&self, puzzle: &Puzzle, active: Option<&Word>, from: Coord) -> Option<Coord> {
    let word = active?;
    let to = from.step_forward(word.direction);
    let allowed = match self.policy {
      AdvancePolicy::WordBounded => word.contains(from) && word.contains(to),
      AdvancePolicy::Continuous => true,
    };
    self.land(puzzle, allowed, from, to)
  }

  /// The cell before `from` in the active word's direction, or `None` at the start
  /// of the word (or of the fillable run, for [AdvancePolicy::Continuous]).
  pub fn prev(&self, puzzle: &Puzzle, active: Option<&Word>, from: Coord) -> Option<Coord> {
    let word = active?;
    let to = from.step_back(word.direction)?;
    let allowed = match self.policy {
      AdvancePolicy::WordBounded => word.contains(from) && word.contains(to),
      AdvancePolicy::Continuous => true,
    };
    self.land(puzzle, allowed, from, to)
  }

  fn land(&self, puzzle: &Puzzle, allowed: bool, from: Coord, to: Coord) -> Option<Coord> {
    if allowed && puzzle.is_fillable(to) {
      trace!("cursor {from} -> {to}");
      Some(to)
    } else {
      trace!("cursor stays at {from}");
      None
    }
  }
}
