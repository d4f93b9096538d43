use crate::storage::Storage;
use crate::submission::{
  ContactDetails, Endpoint, EndpointResponse, SubmissionCoordinator, SubmitError, SubmitState, Submission,
  TransportError,
};
use crate::{
  AnswerStore, CellStyle, Config, Coord, Direction, Error, HighlightController, Navigator, Puzzle, Score,
  SolutionSpec, Word,
};

use log::{debug, info};

/// Which way to move within the active word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDirection {
  Forward,
  Backward,
}

/// Everything the user can do to the grid itself. Each event names the cell it
/// happened on; for keyboard events that is the cell with the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
  /// A cell was clicked.
  CellClicked { at: Coord },
  /// A letter was typed into a cell.
  CharacterTyped { at: Coord, ch: char },
  /// The cursor should move within the active word.
  NavigationKey { at: Coord, direction: NavigationDirection },
  /// Backspace: empties a filled cell, or steps back from an empty one.
  Erase { at: Coord },
}

/// The answer to the "check puzzle" button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
  pub score: Score,
  pub solution_correct: bool,
}

/// One user's run of a puzzle: the puzzle itself, their answers, what is highlighted,
/// where the cursor is and how far the submission has got.
#[derive(Debug)]
pub struct Session {
  puzzle: Puzzle,
  answers: AnswerStore,
  highlight: HighlightController,
  navigator: Navigator,
  solution: SolutionSpec,
  submission: SubmissionCoordinator,
  cursor: Option<Coord>,
}

impl Session {
  /// Starts a session, restoring any answers saved in `storage`.
  pub fn new(puzzle: Puzzle, config: &Config, storage: Box<dyn Storage>) -> Result<Self, Error> {
    let solution = config.solution.resolve(&puzzle)?;
    let answers = AnswerStore::open(&puzzle, config.alphabet.clone(), storage);
    info!(
      "session started with {} saved answer(s), {:?} advance",
      answers.len(),
      config.advance
    );
    Ok(Self {
      puzzle,
      answers,
      highlight: HighlightController::new(),
      navigator: Navigator::new(config.advance),
      solution,
      submission: SubmissionCoordinator::new(),
      cursor: None,
    })
  }

  pub fn puzzle(&self) -> &Puzzle {
    &self.puzzle
  }

  pub fn answers(&self) -> &AnswerStore {
    &self.answers
  }

  pub fn solution(&self) -> &SolutionSpec {
    &self.solution
  }

  /// The cell receiving typed letters, if any.
  pub fn cursor(&self) -> Option<Coord> {
    self.cursor
  }

  pub fn active_word(&self) -> Option<&Word> {
    self.highlight.active_word(&self.puzzle)
  }

  /// Determines how the cell at `coord` should be drawn.
  pub fn cell_style(&self, coord: Coord) -> CellStyle {
    self.highlight.cell_style(&self.puzzle, coord, self.cursor)
  }

  /// Applies one input event. Returns whether anything visible changed.
  pub fn handle(&mut self, event: InputEvent) -> bool {
    debug!("{event:?}");
    match event {
      InputEvent::CellClicked { at } => {
        let changed = self.highlight.on_cell_click(&self.puzzle, at);
        if self.puzzle.is_fillable(at) && self.cursor != Some(at) {
          self.cursor = Some(at);
          return true;
        }
        changed
      }
      InputEvent::CharacterTyped { at, ch } => {
        if let Err(e) = self.answers.set(at, ch) {
          debug!("ignoring input: {e}");
          return false;
        }
        self.cursor = Some(self.next(at).unwrap_or(at));
        true
      }
      InputEvent::NavigationKey { at, direction } => {
        let to = match direction {
          NavigationDirection::Forward => self.next(at),
          NavigationDirection::Backward => self.prev(at),
        };
        self.move_cursor(to)
      }
      InputEvent::Erase { at } => {
        if self.answers.get(at).is_some() {
          self.answers.clear(at);
          true
        } else {
          let to = self.prev(at);
          self.move_cursor(to)
        }
      }
    }
  }

  fn next(&self, from: Coord) -> Option<Coord> {
    self.navigator.next(&self.puzzle, self.active_word(), from)
  }

  fn prev(&self, from: Coord) -> Option<Coord> {
    self.navigator.prev(&self.puzzle, self.active_word(), from)
  }

  fn move_cursor(&mut self, to: Option<Coord>) -> bool {
    match to {
      Some(to) => {
        self.cursor = Some(to);
        true
      }
      None => false,
    }
  }

  /// Puts the cursor on the first fillable cell, reading left to right and top to
  /// bottom, as if it had been clicked.
  pub fn focus_first(&mut self) -> bool {
    let first = self.puzzle.fillable_coords().min_by_key(|c| (c.y, c.x));
    match first {
      Some(at) => self.handle(InputEvent::CellClicked { at }),
      None => false,
    }
  }

  /// Moves the cursor to the nearest fillable cell in the given grid direction,
  /// skipping cells without input, and activates a word through it that runs along
  /// the same axis when there is one.
  pub fn jump(&mut self, direction: Direction, backwards: bool) -> bool {
    let Some(mut at) = self.cursor else {
      return self.focus_first();
    };
    let (width, height) = (self.puzzle.width(), self.puzzle.height());
    loop {
      let step = if backwards {
        at.step_back(direction)
      } else {
        Some(at.step_forward(direction))
      };
      match step {
        Some(to) if to.x < width && to.y < height => at = to,
        _ => return false,
      }
      if self.puzzle.is_fillable(at) {
        self.highlight.focus(&self.puzzle, at, Some(direction));
        self.cursor = Some(at);
        return true;
      }
    }
  }

  /// Switches the active word at the cursor to the next word crossing it, the same
  /// as clicking the cursor's cell again.
  pub fn toggle_direction(&mut self) -> bool {
    let Some(at) = self.cursor else {
      return false;
    };
    if self.highlight.last_clicked() != Some(at) {
      let current = self.active_word().map(|w| w.direction);
      self.highlight.focus(&self.puzzle, at, current);
    }
    self.handle(InputEvent::CellClicked { at })
  }

  /// The direction of the active word, for display.
  pub fn direction(&self) -> Option<Direction> {
    self.active_word().map(|w| w.direction)
  }

  /// The "check puzzle" button: how much is right, and whether the solution word is.
  pub fn check_puzzle(&self) -> CheckReport {
    CheckReport {
      score: Score::of(&self.puzzle, &self.answers),
      solution_correct: self.check_solution(),
    }
  }

  /// The "check solution word" button.
  pub fn check_solution(&self) -> bool {
    self.solution.check(&self.answers)
  }

  /// Wipes every answer and forgets the highlight and the cursor. A finished submission
  /// is forgotten too; one still in flight is not.
  pub fn clear(&mut self) {
    info!("clearing the grid");
    self.answers.clear_all();
    self.highlight.reset();
    self.submission.reset();
    self.cursor = None;
  }

  pub fn can_submit(&self) -> bool {
    self.submission.can_submit()
  }

  pub fn submit_state(&self) -> SubmitState {
    self.submission.state()
  }

  /// Validates and builds a submission for the caller to send. Until
  /// [finish_submission](Self::finish_submission) is called, further submissions are
  /// refused.
  pub fn begin_submission(&mut self, details: &ContactDetails) -> Result<Submission, SubmitError> {
    self
      .submission
      .begin(&self.puzzle, &self.answers, &self.solution, details)
  }

  pub fn finish_submission(&mut self, result: Result<EndpointResponse, TransportError>) -> Result<(), SubmitError> {
    self.submission.finish(result)
  }

  /// Submits and waits for the endpoint's answer.
  pub fn submit(&mut self, endpoint: &dyn Endpoint, details: &ContactDetails) -> Result<(), SubmitError> {
    self
      .submission
      .submit(endpoint, &self.puzzle, &self.answers, &self.solution, details)
  }
}
