use crate::{AnswerStore, Coord, Error, Puzzle, Word};

use log::debug;

/// Where the letters of the solution word are read from, and what they should spell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionSpec {
  coords: Vec<Coord>,
  /// Always uppercase.
  word: String,
}

impl SolutionSpec {
  /// A solution read from an explicit list of cells, one per letter of `word`.
  pub fn new(coords: Vec<Coord>, word: &str) -> Result<Self, Error> {
    let word = word.trim().to_uppercase();
    let letters = word.chars().count();
    if letters != coords.len() {
      return Err(Error::SolutionLength {
        letters,
        coords: coords.len(),
      });
    }
    Ok(Self { coords, word })
  }

  /// A solution spelled by the cells of `word`, which should read `expected`.
  pub fn from_word(word: &Word, expected: &str) -> Result<Self, Error> {
    Self::new(word.coords().collect(), expected)
  }

  /// A solution spelled by the word the puzzle flags as its solution word, which must
  /// carry its answer.
  pub fn from_puzzle(puzzle: &Puzzle) -> Result<Self, Error> {
    let word = puzzle
      .solution_word()
      .ok_or_else(|| Error::Config("the puzzle does not flag a solution word".to_string()))?;
    let answer = word
      .answer
      .as_deref()
      .ok_or_else(|| Error::Config(format!("solution word {} has no answer", word.index)))?;
    Self::from_word(word, answer)
  }

  pub fn coords(&self) -> &[Coord] {
    &self.coords
  }

  pub fn word(&self) -> &str {
    &self.word
  }

  /// Whether the letters at the solution cells spell the solution word. Empty cells
  /// contribute nothing, so a partial solution never matches.
  pub fn check(&self, answers: &AnswerStore) -> bool {
    let letters: String = self.coords.iter().filter_map(|&c| answers.get(c)).collect();
    let correct = letters.to_uppercase() == self.word;
    debug!("solution attempt {letters:?} is {}", if correct { "correct" } else { "incorrect" });
    correct
  }

  /// The letters at the solution cells with a space for each empty cell, as reported
  /// to the submission endpoint.
  pub fn attempt(&self, answers: &AnswerStore) -> String {
    self
      .coords
      .iter()
      .map(|&c| answers.get(c).unwrap_or(' '))
      .collect()
  }
}

/// How much of the grid has been filled in correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
  pub correct: usize,
  pub total: usize,
  /// Rounded to the nearest whole percent.
  pub percentage: u8,
}

impl Score {
  /// Compares every fillable cell of `puzzle` with the letter entered there.
  pub fn of(puzzle: &Puzzle, answers: &AnswerStore) -> Self {
    let total = puzzle.total_fillable_cells();
    let correct = puzzle
      .cells()
      .iter()
      .filter(|c| c.is_fillable())
      .filter(|c| answers.get(c.coord).is_some() && answers.get(c.coord) == c.letter)
      .count();
    let percentage = if total == 0 {
      0
    } else {
      ((correct * 100) as f64 / total as f64).round() as u8
    };
    Self {
      correct,
      total,
      percentage,
    }
  }
}
