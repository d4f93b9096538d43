use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use log::{debug, info};
use ratatui::{
  DefaultTerminal, Frame,
  buffer::Buffer,
  layout::{Constraint, Flex, Layout, Rect},
  style::{Color, Modifier, Style, Stylize},
  text::{Line, Text},
  widgets::{Block, Clear, Padding, Paragraph, Widget, Wrap},
};
use ristikko::Direction::{self, Across, Down};
use ristikko::submission::{ContactDetails, Endpoint, EndpointResponse, SubmitError, SubmitState, TransportError};
use ristikko::{Cell, CellStyle, InputEvent, NavigationDirection, Session};

use crate::remote::HttpEndpoint;

const SQUARE_WIDTH: u16 = 5;
const SQUARE_HEIGHT: u16 = 3;
const COLUMN_GAP: u16 = 1;
const ROW_GAP: u16 = 0;

/// How long to wait for input before checking on an outstanding submission.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const HELP: &str = "\
Click a cell or use the arrow keys to move around, and type letters to fill it in.
Clicking the same cell again, or pressing Tab or Space, switches between the words crossing it.
Backspace empties a cell, or steps back if it is already empty.

F1  these instructions
F2  check the puzzle
F3  check the solution word
F4  clear the grid
F5  submit your answer
Esc quit";

fn square_style(style: CellStyle) -> Style {
  let base_style = match style {
    CellStyle::Standard => Style::new().bg(Color::White),
    CellStyle::Selected => Style::new().bg(Color::LightRed),
    CellStyle::Word => Style::new().bg(Color::LightYellow),
  };
  base_style.fg(Color::Black).add_modifier(Modifier::BOLD)
}

type Reply = Result<EndpointResponse, TransportError>;

/// A popup drawn over the grid. While one is open it receives every key.
#[derive(Debug)]
enum Overlay {
  None,
  Help,
  ConfirmClear,
  Form(ContactForm),
  Notice { title: &'static str, text: String },
}

fn notice(title: &'static str, text: impl Into<String>) -> Overlay {
  Overlay::Notice {
    title,
    text: text.into(),
  }
}

const FIELDS: [&str; 4] = ["Name", "Email", "Phone", "Organization (optional)"];

/// The contact form shown before submitting.
#[derive(Debug, Default)]
struct ContactForm {
  values: [String; 4],
  focus: usize,
  error: Option<String>,
}

impl ContactForm {
  fn details(&self) -> ContactDetails {
    let [name, email, phone, organization] = self.values.clone();
    ContactDetails {
      name,
      email,
      phone,
      organization: Some(organization),
    }
  }

  fn on_key(&mut self, code: KeyCode) {
    match code {
      KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % FIELDS.len(),
      KeyCode::BackTab | KeyCode::Up => self.focus = (self.focus + FIELDS.len() - 1) % FIELDS.len(),
      KeyCode::Backspace => {
        self.values[self.focus].pop();
      }
      KeyCode::Char(c) => self.values[self.focus].push(c),
      _ => {}
    }
  }

  fn lines(&self) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    for (i, (label, value)) in FIELDS.iter().zip(&self.values).enumerate() {
      if i == self.focus {
        lines.push(Line::from(vec![format!("> {label}: ").bold(), value.as_str().into(), "_".slow_blink()]));
      } else {
        lines.push(Line::from(vec![format!("  {label}: ").into(), value.as_str().into()]));
      }
    }
    lines.push(Line::from(""));
    match &self.error {
      Some(error) => lines.push(Line::from(error.as_str().red())),
      None => lines.push(Line::from("Enter sends, Tab moves between fields, Esc cancels.".dim())),
    }
    lines
  }
}

#[derive(Debug)]
pub struct App {
  /// The running session, or why the puzzle could not be loaded.
  session: Result<Session, String>,
  endpoint: Option<HttpEndpoint>,
  overlay: Overlay,
  status: String,
  /// Where the grid was last drawn, for turning mouse clicks into cells.
  grid_area: Rect,
  replies: Receiver<Reply>,
  reply_sender: Sender<Reply>,
  running: bool,
}

impl App {
  pub fn new(session: Result<Session, String>, endpoint: Option<HttpEndpoint>) -> Self {
    let (reply_sender, replies) = mpsc::channel();
    Self {
      session,
      endpoint,
      overlay: Overlay::None,
      status: String::new(),
      grid_area: Rect::default(),
      replies,
      reply_sender,
      running: true,
    }
  }

  pub fn run(mut self, mut terminal: DefaultTerminal) -> io::Result<()> {
    self.running = true;
    while self.running {
      terminal.draw(|frame| self.draw(frame))?;
      self.handle_crossterm_events()?;
      self.collect_replies();
    }
    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    self.grid_area = self.areas(frame.area()).grid;
    frame.render_widget(&*self, frame.area());
  }

  /// Reads one crossterm event, if any arrives within [POLL_INTERVAL], and updates the
  /// state of [`App`].
  fn handle_crossterm_events(&mut self) -> io::Result<()> {
    if !event::poll(POLL_INTERVAL)? {
      return Ok(());
    }
    match event::read()? {
      // it's important to check KeyEventKind::Press to avoid handling key release events
      Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
      Event::Mouse(mouse) => self.on_mouse_event(mouse),
      _ => {}
    }
    Ok(())
  }

  fn on_key_event(&mut self, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c' | 'C')) {
      return self.quit();
    }
    if self.session.is_err() {
      if key.code == KeyCode::Esc {
        self.quit();
      }
      return;
    }
    match self.overlay {
      Overlay::None => self.on_grid_key(key),
      Overlay::Form(_) => self.on_form_key(key),
      Overlay::ConfirmClear => self.on_confirm_key(key),
      Overlay::Help | Overlay::Notice { .. } => {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::F(1)) {
          self.overlay = Overlay::None;
        }
      }
    }
  }

  fn on_grid_key(&mut self, key: KeyEvent) {
    let Ok(session) = &mut self.session else {
      return;
    };
    match key.code {
      KeyCode::Esc => self.running = false,
      KeyCode::F(1) => self.overlay = Overlay::Help,
      KeyCode::F(2) => {
        let report = session.check_puzzle();
        let solution = if report.solution_correct {
          "The solution word is correct."
        } else {
          "The solution word is not correct yet."
        };
        self.overlay = notice(
          "Check puzzle",
          format!(
            "{}/{} letters correct ({}%).\n{solution}",
            report.score.correct, report.score.total, report.score.percentage
          ),
        );
      }
      KeyCode::F(3) => {
        self.overlay = if session.check_solution() {
          notice("Check solution", "The solution word is correct!")
        } else {
          notice("Check solution", "Not quite, the solution word is not correct yet.")
        };
      }
      KeyCode::F(4) => self.overlay = Overlay::ConfirmClear,
      KeyCode::F(5) => {
        self.overlay = if self.endpoint.is_none() {
          notice("Submit", "No submission endpoint is configured. Start with --endpoint URL.")
        } else if !session.can_submit() {
          let reason = match session.submit_state() {
            SubmitState::InFlight => SubmitError::Busy,
            _ => SubmitError::AlreadySubmitted,
          };
          notice("Submit", reason.to_string())
        } else if !session.check_solution() {
          notice("Submit", SubmitError::SolutionIncorrect.to_string())
        } else {
          Overlay::Form(ContactForm::default())
        };
      }
      KeyCode::Tab | KeyCode::Char(' ') => {
        session.toggle_direction();
      }
      KeyCode::Left => arrow(session, Across, true),
      KeyCode::Right => arrow(session, Across, false),
      KeyCode::Up => arrow(session, Down, true),
      KeyCode::Down => arrow(session, Down, false),
      KeyCode::Backspace => {
        if let Some(at) = session.cursor() {
          session.handle(InputEvent::Erase { at });
        }
      }
      KeyCode::Char(ch) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
        if session.cursor().is_none() {
          session.focus_first();
        }
        let Some(at) = session.cursor() else {
          return;
        };
        if session.handle(InputEvent::CharacterTyped { at, ch }) {
          self.status.clear();
        } else {
          self.status = format!("{ch:?} is not accepted here");
        }
      }
      _ => {}
    }
  }

  fn on_confirm_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('y' | 'Y') => {
        if let Ok(session) = &mut self.session {
          session.clear();
        }
        self.status = "Grid cleared".to_string();
        self.overlay = Overlay::None;
      }
      KeyCode::Char('n' | 'N') | KeyCode::Esc => self.overlay = Overlay::None,
      _ => {}
    }
  }

  fn on_form_key(&mut self, key: KeyEvent) {
    let Overlay::Form(form) = &mut self.overlay else {
      return;
    };
    match key.code {
      KeyCode::Esc => self.overlay = Overlay::None,
      KeyCode::Enter => {
        let details = form.details();
        self.send(details);
      }
      code => form.on_key(code),
    }
  }

  fn on_mouse_event(&mut self, mouse: MouseEvent) {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) || !matches!(self.overlay, Overlay::None) {
      return;
    }
    let Some(at) = cell_at(self.grid_area, mouse.column, mouse.row) else {
      return;
    };
    if let Ok(session) = &mut self.session {
      session.handle(InputEvent::CellClicked { at });
    }
  }

  /// Starts a submission on a worker thread. The reply is picked up by
  /// [collect_replies](Self::collect_replies).
  fn send(&mut self, details: ContactDetails) {
    let (Ok(session), Some(endpoint)) = (&mut self.session, &self.endpoint) else {
      return;
    };
    match session.begin_submission(&details) {
      Ok(submission) => {
        let endpoint = endpoint.clone();
        let replies = self.reply_sender.clone();
        thread::spawn(move || {
          if replies.send(endpoint.post(&submission)).is_err() {
            debug!("reply arrived after the app closed");
          }
        });
        info!("submission sent");
        self.overlay = Overlay::None;
        self.status = "Sending...".to_string();
      }
      Err(SubmitError::Validation(e)) => {
        if let Overlay::Form(form) = &mut self.overlay {
          form.error = Some(e.to_string());
        }
      }
      Err(e) => self.overlay = notice("Submit", e.to_string()),
    }
  }

  fn collect_replies(&mut self) {
    let Ok(session) = &mut self.session else {
      return;
    };
    while let Ok(reply) = self.replies.try_recv() {
      self.overlay = match session.finish_submission(reply) {
        Ok(()) => notice("Thank you", "Your answer has been received."),
        Err(e) if e.is_retryable() => notice("Submit", format!("Sending failed ({e}). Press F5 to try again.")),
        Err(e) => notice("Submit", e.to_string()),
      };
      self.status.clear();
    }
  }

  /// Set running to false to quit the application.
  fn quit(&mut self) {
    self.running = false;
  }

  fn areas(&self, area: Rect) -> Areas {
    let [title, main, status] = ratatui_macros::vertical![==2, *=1, ==1].areas(area);
    let [grid, side] = ratatui_macros::horizontal![*=1, ==40].areas(main);

    let (width, height) = match &self.session {
      Ok(session) => (session.puzzle().width(), session.puzzle().height()),
      Err(_) => (0, 0),
    };
    let grid = center(
      grid,
      Constraint::Length(span(width, SQUARE_WIDTH + COLUMN_GAP)),
      Constraint::Length(span(height, SQUARE_HEIGHT + ROW_GAP)),
    );
    Areas {
      title,
      grid,
      side,
      status,
    }
  }

  fn render_square(&self, session: &Session, cell: &Cell, square_area: Rect, buf: &mut Buffer) {
    if !cell.is_fillable() {
      let bg = if cell.is_blocked { Color::Black } else { Color::DarkGray };
      Block::new().style(Style::new().bg(bg)).render(square_area, buf);
      return;
    }
    let letter = session.answers().get(cell.coord).map(String::from).unwrap_or_default();
    let mut style = square_style(session.cell_style(cell.coord));
    if session.solution().coords().contains(&cell.coord) {
      style = style.add_modifier(Modifier::UNDERLINED);
    }
    Paragraph::new(letter)
      .block(Block::new().style(style).padding(Padding::top(1)))
      .centered()
      .render(square_area, buf);
  }

  fn render_side(&self, session: &Session, area: Rect, buf: &mut Buffer) {
    let mut lines = Vec::new();
    match session.active_word() {
      Some(word) => lines.push(Line::from(vec![
        format!("{} {}", word.index, word.direction).bold(),
        format!(", {} letters", word.length).into(),
      ])),
      None => lines.push(Line::from("Click a cell to start".italic())),
    }
    lines.push(Line::from(""));
    let attempt = session.solution().attempt(session.answers()).replace(' ', "·");
    lines.push(Line::from(vec!["Solution word: ".into(), attempt.bold()]));
    let filled = session.answers().len();
    let total = session.puzzle().total_fillable_cells();
    lines.push(Line::from(format!("{filled}/{total} cells filled")));
    lines.push(Line::from(""));
    lines.push(Line::from("F1 help  F2 check  F3 solution".dim()));
    lines.push(Line::from("F4 clear  F5 submit  Esc quit".dim()));

    Paragraph::new(lines)
      .wrap(Wrap { trim: true })
      .block(
        Block::bordered()
          .title(Line::from("Current word").centered())
          .padding(Padding::uniform(1)),
      )
      .render(area, buf);
  }

  fn render_overlay(&self, area: Rect, buf: &mut Buffer) {
    let (title, text): (&str, Text) = match &self.overlay {
      Overlay::None => return,
      Overlay::Help => ("Instructions", Text::from(HELP)),
      Overlay::ConfirmClear => ("Clear", Text::from("Erase every answer? (y/n)")),
      Overlay::Form(form) => ("Your details", Text::from(form.lines())),
      Overlay::Notice { title, text } => (*title, Text::from(text.as_str())),
    };
    let popup = center(area, Constraint::Percentage(60), Constraint::Length(text.height() as u16 + 4));
    Clear.render(popup, buf);
    Paragraph::new(text)
      .wrap(Wrap { trim: false })
      .block(
        Block::bordered()
          .title(Line::from(title).centered())
          .padding(Padding::horizontal(1)),
      )
      .render(popup, buf);
  }
}

struct Areas {
  title: Rect,
  grid: Rect,
  side: Rect,
  status: Rect,
}

impl Widget for &App {
  fn render(self, area: Rect, buf: &mut Buffer) {
    let areas = self.areas(area);

    let title = ratatui_macros::line!["Ristikko".bold().blue(), ": ".bold(), "solution-word crossword".bold()].centered();
    title.render(areas.title, buf);

    let session = match &self.session {
      Ok(session) => session,
      Err(message) => {
        let text = vec![
          Line::from("Could not load the puzzle".bold().red()),
          Line::from(""),
          Line::from(message.as_str()),
          Line::from(""),
          Line::from("Press Esc to quit.".dim()),
        ];
        let error_area = center(area, Constraint::Percentage(60), Constraint::Length(9));
        Paragraph::new(text)
          .wrap(Wrap { trim: true })
          .block(Block::bordered().padding(Padding::uniform(1)))
          .render(error_area, buf);
        return;
      }
    };

    for cell in session.puzzle().cells() {
      let square_area = Rect {
        x: areas.grid.x.saturating_add(span(cell.coord.x, SQUARE_WIDTH + COLUMN_GAP)),
        y: areas.grid.y.saturating_add(span(cell.coord.y, SQUARE_HEIGHT + ROW_GAP)),
        width: SQUARE_WIDTH,
        height: SQUARE_HEIGHT,
      };
      // Squares that do not fit on screen are skipped.
      let square_area = square_area.intersection(area);
      if square_area.is_empty() {
        continue;
      }
      self.render_square(session, cell, square_area, buf);
    }

    self.render_side(session, areas.side, buf);
    Line::from(self.status.as_str()).render(areas.status, buf);
    self.render_overlay(area, buf);
  }
}

/// Moves the cursor with an arrow key. Along the active word this steps within the
/// word; across it, the cursor jumps to the nearest cell in that direction.
fn arrow(session: &mut Session, axis: Direction, backwards: bool) {
  let Some(at) = session.cursor() else {
    session.focus_first();
    return;
  };
  if session.direction() == Some(axis) {
    let direction = if backwards {
      NavigationDirection::Backward
    } else {
      NavigationDirection::Forward
    };
    if session.handle(InputEvent::NavigationKey { at, direction }) {
      return;
    }
  }
  session.jump(axis, backwards);
}

/// Finds the grid cell under a screen position, if any.
fn cell_at(grid: Rect, column: u16, row: u16) -> Option<ristikko::Coord> {
  if column < grid.x || row < grid.y {
    return None;
  }
  let (dx, dy) = (column - grid.x, row - grid.y);
  let (step_x, step_y) = (SQUARE_WIDTH + COLUMN_GAP, SQUARE_HEIGHT + ROW_GAP);
  if dx % step_x >= SQUARE_WIDTH || dy % step_y >= SQUARE_HEIGHT {
    return None;
  }
  Some(ristikko::Coord::new((dx / step_x).into(), (dy / step_y).into()))
}

/// Screen cells taken by `count` squares of `step` cells each.
fn span(count: usize, step: u16) -> u16 {
  u16::try_from(count)
    .ok()
    .and_then(|count| count.checked_mul(step))
    .unwrap_or(u16::MAX)
}

/// https://ratatui.rs/recipes/layout/center-a-widget/
fn center(area: Rect, horizontal: Constraint, vertical: Constraint) -> Rect {
  let [area] = Layout::horizontal([horizontal])
    .flex(Flex::Center)
    .areas(area);
  let [area] = Layout::vertical([vertical]).flex(Flex::Center).areas(area);
  area
}

#[cfg(test)]
mod tests {
  use super::*;
  use ristikko::{Config, Coord, MemoryStorage, Puzzle};

  /// KISSA across the top row, flagged as the solution word.
  const PUZZLE: &str = r#"{
    "cells": [
      {"x": 0, "y": 0, "letter": "K", "isBlocked": false},
      {"x": 1, "y": 0, "letter": "I", "isBlocked": false},
      {"x": 2, "y": 0, "letter": "S", "isBlocked": false},
      {"x": 3, "y": 0, "letter": "S", "isBlocked": false},
      {"x": 4, "y": 0, "letter": "A", "isBlocked": false}
    ],
    "words": [
      {"wordindex": 1, "startX": 0, "startY": 0, "length": 5, "direction": "across",
       "answer": "KISSA", "ratkaisusana": true}
    ]
  }"#;

  fn app() -> App {
    let puzzle = Puzzle::load(PUZZLE).unwrap();
    let session = Session::new(puzzle, &Config::default(), Box::new(MemoryStorage::default())).unwrap();
    App::new(Ok(session), None)
  }

  fn press(app: &mut App, code: KeyCode) {
    app.on_key_event(KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn session(app: &App) -> &Session {
    app.session.as_ref().unwrap()
  }

  #[test]
  fn clicks_map_to_squares_but_not_gaps() {
    let grid = Rect::new(10, 5, 30, 3);
    assert_eq!(cell_at(grid, 10, 5), Some(Coord::new(0, 0)));
    assert_eq!(cell_at(grid, 14, 7), Some(Coord::new(0, 0)));
    // The column gap between the first and second square.
    assert_eq!(cell_at(grid, 15, 5), None);
    assert_eq!(cell_at(grid, 16, 5), Some(Coord::new(1, 0)));
    assert_eq!(cell_at(grid, 16, 8), Some(Coord::new(1, 1)));
    assert_eq!(cell_at(grid, 9, 5), None);
  }

  #[test]
  fn typing_fills_the_word() {
    let mut app = app();
    for ch in "kissa".chars() {
      press(&mut app, KeyCode::Char(ch));
    }
    let session = session(&app);
    assert!(session.check_solution());
    assert_eq!(session.check_puzzle().score.percentage, 100);
    assert!(app.status.is_empty());
  }

  #[test]
  fn rejected_letters_show_a_status() {
    let mut app = app();
    press(&mut app, KeyCode::Char('7'));
    assert_eq!(app.status, "'7' is not accepted here");
    assert!(session(&app).answers().is_empty());
  }

  #[test]
  fn clearing_asks_first() {
    let mut app = app();
    press(&mut app, KeyCode::Char('k'));
    press(&mut app, KeyCode::F(4));
    press(&mut app, KeyCode::Char('n'));
    assert_eq!(session(&app).answers().len(), 1);

    press(&mut app, KeyCode::F(4));
    press(&mut app, KeyCode::Char('y'));
    assert!(session(&app).answers().is_empty());
    assert!(matches!(app.overlay, Overlay::None));
  }

  #[test]
  fn arrows_move_along_the_word() {
    let mut app = app();
    press(&mut app, KeyCode::Right);
    assert_eq!(session(&app).cursor(), Some(Coord::new(0, 0)));
    press(&mut app, KeyCode::Right);
    press(&mut app, KeyCode::Right);
    assert_eq!(session(&app).cursor(), Some(Coord::new(2, 0)));
    press(&mut app, KeyCode::Left);
    assert_eq!(session(&app).cursor(), Some(Coord::new(1, 0)));
    // Nothing below the top row.
    press(&mut app, KeyCode::Down);
    assert_eq!(session(&app).cursor(), Some(Coord::new(1, 0)));
  }

  #[test]
  fn submit_without_an_endpoint_explains_why() {
    let mut app = app();
    press(&mut app, KeyCode::F(5));
    assert!(matches!(app.overlay, Overlay::Notice { title: "Submit", .. }));
    press(&mut app, KeyCode::Esc);
    assert!(matches!(app.overlay, Overlay::None));
    assert!(app.running);
  }

  #[test]
  fn form_collects_contact_details() {
    let mut form = ContactForm::default();
    for ch in "Ada".chars() {
      form.on_key(KeyCode::Char(ch));
    }
    form.on_key(KeyCode::Tab);
    for ch in "ada@example.com".chars() {
      form.on_key(KeyCode::Char(ch));
    }
    form.on_key(KeyCode::Backspace);
    form.on_key(KeyCode::BackTab);
    form.on_key(KeyCode::BackTab);
    assert_eq!(form.focus, 3);

    let details = form.details();
    assert_eq!(details.name, "Ada");
    assert_eq!(details.email, "ada@example.co");
    assert_eq!(details.validate().unwrap().organization, None);
  }

  #[test]
  fn load_errors_only_allow_quitting() {
    let mut app = App::new(Err("bad puzzle".to_string()), None);
    press(&mut app, KeyCode::Char('a'));
    press(&mut app, KeyCode::F(1));
    assert!(matches!(app.overlay, Overlay::None));
    press(&mut app, KeyCode::Esc);
    assert!(!app.running);
  }
}
