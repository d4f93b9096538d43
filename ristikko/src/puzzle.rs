use crate::Direction::{Across, Down};
use crate::{Coord, Direction, Error};
use std::collections::{HashMap, HashSet};

use log::{debug, info};
use serde::Deserialize;

/// Largest coordinate or word length accepted from a document.
const MAX_EXTENT: usize = u16::MAX as usize;

/// The puzzle document as published: Y grows upwards from the bottom-left corner.
#[derive(Debug, Deserialize)]
struct RawPuzzle {
  cells: Vec<RawCell>,
  words: Vec<RawWord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCell {
  x: usize,
  y: usize,
  #[serde(default)]
  letter: Option<String>,
  #[serde(default)]
  is_blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWord {
  #[serde(rename = "wordindex")]
  index: u32,
  start_x: usize,
  start_y: usize,
  length: usize,
  direction: String,
  #[serde(default)]
  answer: Option<String>,
  #[serde(default, rename = "ratkaisusana")]
  is_solution: bool,
}

/// Converts between the bottom-left origin of the puzzle document and the top-left
/// origin of the model. Applying it twice with the same `max_y` gives back `y`.
/// Returns `None` if `y` lies below the bottom row.
pub fn flip_y(y: usize, max_y: usize) -> Option<usize> {
  max_y.checked_sub(y)
}

/// A square in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
  pub coord: Coord,
  /// The expected answer, uppercased. `None` for blank cells.
  pub letter: Option<char>,
  pub is_blocked: bool,
}

impl Cell {
  /// Whether the user can write a letter into this cell.
  pub fn is_fillable(&self) -> bool {
    !self.is_blocked && self.letter.is_some()
  }
}

/// A word span: `length` contiguous cells from `start` along `direction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
  pub index: u32,
  pub start: Coord,
  pub length: usize,
  pub direction: Direction,
  pub answer: Option<String>,
  /// Whether this is the designated solution word.
  pub is_solution: bool,
}

impl Word {
  /// Whether `coord` is one of the cells of this word.
  pub fn contains(&self, coord: Coord) -> bool {
    let Coord { x, y } = coord;
    let Coord { x: sx, y: sy } = self.start;
    let within = |at: usize, from: usize| at.checked_sub(from).is_some_and(|d| d < self.length);
    match self.direction {
      Across => y == sy && within(x, sx),
      Down => x == sx && within(y, sy),
    }
  }

  /// The cells of this word, in reading order.
  pub fn coords(&self) -> impl Iterator<Item = Coord> {
    let Coord { x, y } = self.start;
    let direction = self.direction;
    (0..self.length).map(move |i| match direction {
      Across => Coord::new(x + i, y),
      Down => Coord::new(x, y + i),
    })
  }

  /// The last cell of this word.
  pub fn end(&self) -> Coord {
    let last = self.length.saturating_sub(1);
    match self.direction {
      Across => Coord::new(self.start.x + last, self.start.y),
      Down => Coord::new(self.start.x, self.start.y + last),
    }
  }
}

/// A loaded puzzle. It is never modified after [Puzzle::load]; the answers the user
/// types live in an [AnswerStore](crate::AnswerStore).
#[derive(Debug)]
pub struct Puzzle {
  cells: Vec<Cell>,
  /// Sorted across before down, then by index.
  words: Vec<Word>,
  by_coord: HashMap<Coord, usize>,
  width: usize,
  height: usize,
}

impl Puzzle {
  /// Parses a puzzle document and moves its origin from the bottom-left to the
  /// top-left corner.
  pub fn load(raw_json: &str) -> Result<Self, Error> {
    let raw: RawPuzzle = serde_json::from_str(raw_json)?;
    if let Some(c) = raw.cells.iter().find(|c| c.x > MAX_EXTENT || c.y > MAX_EXTENT) {
      return Err(Error::Parse(format!("cell {},{} is outside the supported grid", c.x, c.y)));
    }

    let Some(max_y) = raw.cells.iter().map(|c| c.y).max() else {
      return Err(Error::Parse("puzzle has no cells".to_string()));
    };
    let max_x = raw.cells.iter().map(|c| c.x).max().unwrap_or(0);

    let mut cells = Vec::with_capacity(raw.cells.len());
    let mut by_coord = HashMap::with_capacity(raw.cells.len());
    for raw_cell in raw.cells {
      let cell = Self::parse_cell(raw_cell, max_y)?;
      if by_coord.insert(cell.coord, cells.len()).is_some() {
        return Err(Error::Parse(format!("duplicate cell at {}", cell.coord)));
      }
      cells.push(cell);
    }

    let mut words = raw
      .words
      .into_iter()
      .map(|w| Self::parse_word(w, max_y))
      .collect::<Result<Vec<_>, _>>()?;
    words.sort_by_key(|w| (w.direction, w.index));

    let puzzle = Self {
      cells,
      words,
      by_coord,
      width: max_x + 1,
      height: max_y + 1,
    };
    puzzle.validate()?;

    info!(
      "loaded {}x{} puzzle with {} cells ({} fillable) and {} words",
      puzzle.width,
      puzzle.height,
      puzzle.cells.len(),
      puzzle.total_fillable_cells(),
      puzzle.words.len()
    );
    Ok(puzzle)
  }

  fn parse_cell(raw: RawCell, max_y: usize) -> Result<Cell, Error> {
    let y = flip_y(raw.y, max_y).ok_or_else(|| Error::Parse(format!("cell y {} out of range", raw.y)))?;
    let text = raw.letter.as_deref().map(str::trim).unwrap_or("");
    let mut chars = text.chars();
    let letter = match (chars.next(), chars.next()) {
      (None, _) => None,
      (Some(c), None) => c.to_uppercase().next(),
      (Some(_), Some(_)) => {
        return Err(Error::Parse(format!(
          "cell {},{} has more than one letter: {text:?}",
          raw.x, raw.y
        )));
      }
    };
    Ok(Cell {
      coord: Coord::new(raw.x, y),
      letter,
      is_blocked: raw.is_blocked,
    })
  }

  fn parse_word(raw: RawWord, max_y: usize) -> Result<Word, Error> {
    let direction: Direction = raw.direction.parse()?;
    if raw.length == 0 {
      return Err(Error::Parse(format!("word {} has no cells", raw.index)));
    }
    if raw.start_x > MAX_EXTENT || raw.length > MAX_EXTENT {
      return Err(Error::Parse(format!("word {} is outside the supported grid", raw.index)));
    }
    let start_y = flip_y(raw.start_y, max_y)
      .ok_or_else(|| Error::Parse(format!("word {} starts outside the grid", raw.index)))?;
    Ok(Word {
      index: raw.index,
      start: Coord::new(raw.start_x, start_y),
      length: raw.length,
      direction,
      answer: raw.answer.map(|a| a.trim().to_uppercase()),
      is_solution: raw.is_solution,
    })
  }

  /// Every word lies on fillable cells, and every fillable cell is covered by a word.
  fn validate(&self) -> Result<(), Error> {
    let mut seen = HashSet::new();
    let mut covered = HashSet::new();
    for word in &self.words {
      if !seen.insert(word.index) {
        return Err(Error::Parse(format!("duplicate word index {}", word.index)));
      }
      for coord in word.coords() {
        if !self.is_fillable(coord) {
          return Err(Error::Parse(format!(
            "word {} ({}) covers {coord}, which does not accept input",
            word.index, word.direction
          )));
        }
        covered.insert(coord);
      }
    }

    if let Some(orphan) = self
      .cells
      .iter()
      .find(|c| c.is_fillable() && !covered.contains(&c.coord))
    {
      return Err(Error::Parse(format!("cell {} belongs to no word", orphan.coord)));
    }
    Ok(())
  }

  /// Returns the cell at `coord`, if the puzzle has one there.
  pub fn cell_at(&self, coord: Coord) -> Option<&Cell> {
    self.by_coord.get(&coord).map(|&i| &self.cells[i])
  }

  pub fn is_fillable(&self, coord: Coord) -> bool {
    self.cell_at(coord).is_some_and(Cell::is_fillable)
  }

  /// The words that `coord` belongs to, across words first, then by index. The order is
  /// what direction toggling cycles through.
  pub fn words_containing(&self, coord: Coord) -> Vec<&Word> {
    let words: Vec<&Word> = self.words.iter().filter(|w| w.contains(coord)).collect();
    debug!("{coord} belongs to {} word(s)", words.len());
    words
  }

  /// The number of cells the user is expected to fill in.
  pub fn total_fillable_cells(&self) -> usize {
    self.cells.iter().filter(|c| c.is_fillable()).count()
  }

  /// Positions of all fillable cells.
  pub fn fillable_coords(&self) -> impl Iterator<Item = Coord> {
    self.cells.iter().filter(|c| c.is_fillable()).map(|c| c.coord)
  }

  pub fn cells(&self) -> &[Cell] {
    &self.cells
  }

  pub fn words(&self) -> &[Word] {
    &self.words
  }

  pub fn word_by_index(&self, index: u32) -> Option<&Word> {
    self.words.iter().find(|w| w.index == index)
  }

  /// The word flagged as the solution word, if the document flags one.
  pub fn solution_word(&self) -> Option<&Word> {
    self.words.iter().find(|w| w.is_solution)
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }
}
