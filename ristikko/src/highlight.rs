use crate::{Coord, Direction, Puzzle, Word};

use log::debug;

/// Indicates how a particular cell should look. For instance, [Standard](Self::Standard)
/// might map to white, [Selected](Self::Selected) to red, and [Word](Self::Word) to yellow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
  /// Default styling
  Standard,
  /// The cursor is positioned on this cell.
  Selected,
  /// The cursor is not on this cell, but the active word includes this cell.
  Word,
}

/// Tracks the active word and toggles between crossing words when the same cell is
/// clicked repeatedly.
#[derive(Debug, Default, Clone)]
pub struct HighlightController {
  /// Index of the active word in [Puzzle::words].
  active: Option<usize>,
  last_clicked: Option<Coord>,
}

impl HighlightController {
  pub fn new() -> Self {
    Self::default()
  }

  /// Handles a click on `coord`. The first click on a cell activates the first word
  /// containing it; clicking the same cell again moves on to the next word through it.
  ///
  /// Returns whether anything changed. Clicks on cells outside every word are ignored.
  pub fn on_cell_click(&mut self, puzzle: &Puzzle, coord: Coord) -> bool {
    let candidates = Self::candidates(puzzle, coord);

    let Some(&first) = candidates.first() else {
      return false;
    };

    let repeat = self.last_clicked == Some(coord);
    let next = if !repeat || candidates.len() == 1 {
      first
    } else {
      match self.active.and_then(|a| candidates.iter().position(|&c| c == a)) {
        Some(pos) => candidates[(pos + 1) % candidates.len()],
        None => first,
      }
    };

    let changed = self.active != Some(next) || self.last_clicked != Some(coord);
    self.active = Some(next);
    self.last_clicked = Some(coord);
    if let Some(word) = self.active_word(puzzle) {
      debug!("active word {} ({}) after click on {coord}", word.index, word.direction);
    }
    changed
  }

  /// Puts the cursor on `coord` without toggling, activating the word through it that
  /// runs in `prefer` if there is one, or its first word otherwise. A later click on
  /// the same cell toggles from there.
  pub fn focus(&mut self, puzzle: &Puzzle, coord: Coord, prefer: Option<Direction>) -> bool {
    let candidates = Self::candidates(puzzle, coord);
    let words = puzzle.words();
    let Some(&chosen) = candidates
      .iter()
      .find(|&&i| Some(words[i].direction) == prefer)
      .or(candidates.first())
    else {
      return false;
    };
    self.active = Some(chosen);
    self.last_clicked = Some(coord);
    true
  }

  /// The currently highlighted word.
  pub fn active_word<'a>(&self, puzzle: &'a Puzzle) -> Option<&'a Word> {
    self.active.and_then(|i| puzzle.words().get(i))
  }

  pub fn last_clicked(&self) -> Option<Coord> {
    self.last_clicked
  }

  /// The cells of the active word, in reading order.
  pub fn highlighted(&self, puzzle: &Puzzle) -> Vec<Coord> {
    self
      .active_word(puzzle)
      .map(|w| w.coords().collect())
      .unwrap_or_default()
  }

  /// Determines how the cell at `coord` should be styled, given the cell the cursor is on.
  pub fn cell_style(&self, puzzle: &Puzzle, coord: Coord, selected: Option<Coord>) -> CellStyle {
    if selected == Some(coord) {
      return CellStyle::Selected;
    }
    match self.active_word(puzzle) {
      Some(word) if word.contains(coord) => CellStyle::Word,
      _ => CellStyle::Standard,
    }
  }

  /// Positions in [Puzzle::words] of the words through `coord`.
  fn candidates(puzzle: &Puzzle, coord: Coord) -> Vec<usize> {
    puzzle
      .words()
      .iter()
      .enumerate()
      .filter(|(_, w)| w.contains(coord))
      .map(|(i, _)| i)
      .collect()
  }

  /// Forgets the active word and the last click.
  pub fn reset(&mut self) {
    *self = Self::default();
  }
}
