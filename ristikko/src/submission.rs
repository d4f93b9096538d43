//! Sending a finished puzzle to the contest endpoint.
//!
//! Submission is gated on the solution word being correct. The contact details are
//! validated locally before a single request is made; a rejected or failed request can
//! be retried by submitting again, but nothing is retried automatically.

use crate::{AnswerStore, Puzzle, Score, SolutionSpec};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Shown when a 429 response carries no message of its own.
pub const RATE_LIMITED_FALLBACK: &str = "A response has already been submitted.";

/// What the user types into the submission form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
  pub name: String,
  pub email: String,
  pub phone: String,
  pub organization: Option<String>,
}

impl ContactDetails {
  /// Trims every field and checks that the required ones are present and that the
  /// email address looks like `local@domain.tld`. An empty organization becomes `None`.
  pub fn validate(&self) -> Result<Self, ValidationError> {
    let name = self.name.trim();
    let email = self.email.trim();
    let phone = self.phone.trim();
    for (field, value) in [("name", name), ("email", email), ("phone", phone)] {
      if value.is_empty() {
        return Err(ValidationError::MissingField(field));
      }
    }
    if !EMAIL.is_match(email) {
      return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(Self {
      name: name.to_string(),
      email: email.to_string(),
      phone: phone.to_string(),
      organization: self
        .organization
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("{0} is required")]
  MissingField(&'static str),
  #[error("{0:?} is not a valid email address")]
  InvalidEmail(String),
}

/// The JSON body posted to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  pub name: String,
  pub email: String,
  pub phone: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub organization: Option<String>,
  pub correct_percentage: u8,
  /// The letters at the solution cells, a space for each empty one.
  pub solution_word: String,
  pub submission_time: DateTime<Utc>,
}

/// What came back from the endpoint, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
  pub status: u16,
  pub body: String,
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The remote collaborator that receives submissions.
pub trait Endpoint {
  fn post(&self, submission: &Submission) -> Result<EndpointResponse, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
  #[error("the solution word is not correct yet")]
  SolutionIncorrect,
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("a submission is already in progress")]
  Busy,
  #[error("this puzzle has already been submitted")]
  AlreadySubmitted,
  /// The endpoint answered 429; the message is the server's own.
  #[error("{0}")]
  RateLimited(String),
  #[error("the server answered with status {0}")]
  Server(u16),
  #[error("network error: {0}")]
  Network(String),
}

impl SubmitError {
  /// Whether submitting again might succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Server(_) | Self::Network(_))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitState {
  #[default]
  Idle,
  /// A request has been handed to the endpoint and has not come back yet.
  InFlight,
  Accepted,
  Failed,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Walks a submission from the solution gate to the endpoint's answer.
#[derive(Debug, Default)]
pub struct SubmissionCoordinator {
  state: SubmitState,
}

impl SubmissionCoordinator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> SubmitState {
    self.state
  }

  /// Whether the submit action should be enabled.
  pub fn can_submit(&self) -> bool {
    matches!(self.state, SubmitState::Idle | SubmitState::Failed)
  }

  /// Checks the solution word and the contact details and builds the request body.
  /// On success the coordinator is in flight until [finish](Self::finish) is called.
  pub fn begin(
    &mut self,
    puzzle: &Puzzle,
    answers: &AnswerStore,
    solution: &SolutionSpec,
    details: &ContactDetails,
  ) -> Result<Submission, SubmitError> {
    match self.state {
      SubmitState::InFlight => return Err(SubmitError::Busy),
      SubmitState::Accepted => return Err(SubmitError::AlreadySubmitted),
      SubmitState::Idle | SubmitState::Failed => {}
    }
    if !solution.check(answers) {
      return Err(SubmitError::SolutionIncorrect);
    }
    let details = details.validate()?;

    let submission = Submission {
      name: details.name,
      email: details.email,
      phone: details.phone,
      organization: details.organization,
      correct_percentage: Score::of(puzzle, answers).percentage,
      solution_word: solution.attempt(answers),
      submission_time: Utc::now(),
    };
    info!("submitting ({}% correct)", submission.correct_percentage);
    self.state = SubmitState::InFlight;
    Ok(submission)
  }

  /// Interprets the endpoint's answer to the request made after [begin](Self::begin).
  pub fn finish(&mut self, result: Result<EndpointResponse, TransportError>) -> Result<(), SubmitError> {
    if self.state != SubmitState::InFlight {
      warn!("submission result arrived while {:?}", self.state);
    }
    let outcome = match result {
      Ok(response) if (200..300).contains(&response.status) => Ok(()),
      Ok(response) if response.status == 429 => {
        let message = serde_json::from_str::<ErrorBody>(&response.body)
          .map(|b| b.error)
          .ok()
          .filter(|m| !m.trim().is_empty())
          .unwrap_or_else(|| RATE_LIMITED_FALLBACK.to_string());
        Err(SubmitError::RateLimited(message))
      }
      Ok(response) => Err(SubmitError::Server(response.status)),
      Err(TransportError(message)) => Err(SubmitError::Network(message)),
    };

    match &outcome {
      Ok(()) => {
        info!("submission accepted");
        self.state = SubmitState::Accepted;
      }
      Err(e) => {
        warn!("submission failed: {e}");
        self.state = SubmitState::Failed;
      }
    }
    outcome
  }

  /// [begin](Self::begin), post and [finish](Self::finish) in one blocking call.
  pub fn submit(
    &mut self,
    endpoint: &dyn Endpoint,
    puzzle: &Puzzle,
    answers: &AnswerStore,
    solution: &SolutionSpec,
    details: &ContactDetails,
  ) -> Result<(), SubmitError> {
    let submission = self.begin(puzzle, answers, solution, details)?;
    let result = endpoint.post(&submission);
    self.finish(result)
  }

  /// Back to idle, as after clearing the grid. A request that is still outstanding
  /// stays in flight until [finish](Self::finish) hears back.
  pub fn reset(&mut self) {
    if self.state == SubmitState::InFlight {
      debug!("keeping the outstanding submission in flight");
      return;
    }
    self.state = SubmitState::Idle;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Coord;
  use crate::testing::{memory_store, sample_puzzle};
  use std::cell::RefCell;

  /// Replies with a canned response and records what it was sent.
  struct FakeEndpoint {
    reply: Result<EndpointResponse, TransportError>,
    sent: RefCell<Vec<Submission>>,
  }

  impl FakeEndpoint {
    fn replying(status: u16, body: &str) -> Self {
      Self {
        reply: Ok(EndpointResponse {
          status,
          body: body.to_string(),
        }),
        sent: RefCell::new(vec![]),
      }
    }

    fn unreachable() -> Self {
      Self {
        reply: Err(TransportError("connection refused".to_string())),
        sent: RefCell::new(vec![]),
      }
    }
  }

  impl Endpoint for FakeEndpoint {
    fn post(&self, submission: &Submission) -> Result<EndpointResponse, TransportError> {
      self.sent.borrow_mut().push(submission.clone());
      self.reply.clone()
    }
  }

  fn details() -> ContactDetails {
    ContactDetails {
      name: " Tove ".to_string(),
      email: "tove@example.fi".to_string(),
      phone: "040 123 4567".to_string(),
      organization: Some("  ".to_string()),
    }
  }

  fn solved() -> (Puzzle, AnswerStore, SolutionSpec) {
    let puzzle = sample_puzzle();
    let spec = SolutionSpec::from_puzzle(&puzzle).unwrap();
    let (mut answers, _) = memory_store(&puzzle);
    for (&coord, letter) in spec.coords().iter().zip(spec.word().chars()) {
      answers.set(coord, letter).unwrap();
    }
    (puzzle, answers, spec)
  }

  #[test]
  fn validation_requires_name_email_and_phone() {
    let mut d = details();
    assert_eq!(d.validate().unwrap().name, "Tove");
    assert_eq!(d.validate().unwrap().organization, None);

    d.phone = "   ".to_string();
    assert_eq!(d.validate(), Err(ValidationError::MissingField("phone")));

    let mut d = details();
    for bad in ["tove", "tove@example", "@example.fi", "to ve@example.fi"] {
      d.email = bad.to_string();
      assert!(matches!(d.validate(), Err(ValidationError::InvalidEmail(_))), "{bad}");
    }
  }

  #[test]
  fn incorrect_solution_blocks_the_request() {
    let (puzzle, mut answers, spec) = solved();
    answers.clear(Coord::new(5, 0));
    let endpoint = FakeEndpoint::replying(200, "");
    let mut coordinator = SubmissionCoordinator::new();

    let result = coordinator.submit(&endpoint, &puzzle, &answers, &spec, &details());
    assert_eq!(result, Err(SubmitError::SolutionIncorrect));
    assert!(endpoint.sent.borrow().is_empty());
    assert!(coordinator.can_submit());
  }

  #[test]
  fn invalid_details_block_the_request() {
    let (puzzle, answers, spec) = solved();
    let endpoint = FakeEndpoint::replying(200, "");
    let mut coordinator = SubmissionCoordinator::new();
    let mut d = details();
    d.name.clear();

    let result = coordinator.submit(&endpoint, &puzzle, &answers, &spec, &d);
    assert_eq!(result, Err(SubmitError::Validation(ValidationError::MissingField("name"))));
    assert!(endpoint.sent.borrow().is_empty());
  }

  #[test]
  fn accepted_submission_carries_the_payload() {
    let (puzzle, answers, spec) = solved();
    let endpoint = FakeEndpoint::replying(201, r#"{"ok": true}"#);
    let mut coordinator = SubmissionCoordinator::new();

    coordinator.submit(&endpoint, &puzzle, &answers, &spec, &details()).unwrap();
    assert_eq!(coordinator.state(), SubmitState::Accepted);
    assert!(!coordinator.can_submit());

    let submission = endpoint.sent.borrow()[0].clone();
    assert_eq!(submission.solution_word, "TASAN");
    // 5 of 14 cells.
    assert_eq!(submission.correct_percentage, 36);

    let json = serde_json::to_value(&submission).unwrap();
    assert_eq!(json["name"], "Tove");
    assert_eq!(json["correctPercentage"], 36);
    assert_eq!(json["solutionWord"], "TASAN");
    assert!(json.get("organization").is_none());
    let time = json["submissionTime"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(time).is_ok());

    // Nothing more is sent once accepted.
    let again = coordinator.submit(&endpoint, &puzzle, &answers, &spec, &details());
    assert_eq!(again, Err(SubmitError::AlreadySubmitted));
    assert_eq!(endpoint.sent.borrow().len(), 1);
  }

  #[test]
  fn rate_limit_surfaces_the_server_message() {
    let (puzzle, answers, spec) = solved();
    let endpoint = FakeEndpoint::replying(429, r#"{"error": "Olet jo lähettänyt vastauksen."}"#);
    let mut coordinator = SubmissionCoordinator::new();

    let result = coordinator.submit(&endpoint, &puzzle, &answers, &spec, &details());
    assert_eq!(result, Err(SubmitError::RateLimited("Olet jo lähettänyt vastauksen.".to_string())));
    assert!(coordinator.can_submit());

    let endpoint = FakeEndpoint::replying(429, "slow down");
    let result = coordinator.submit(&endpoint, &puzzle, &answers, &spec, &details());
    assert_eq!(result, Err(SubmitError::RateLimited(RATE_LIMITED_FALLBACK.to_string())));
  }

  #[test]
  fn server_and_network_failures_allow_retry() {
    let (puzzle, answers, spec) = solved();
    let mut coordinator = SubmissionCoordinator::new();

    let result = coordinator.submit(&FakeEndpoint::replying(500, ""), &puzzle, &answers, &spec, &details());
    assert_eq!(result, Err(SubmitError::Server(500)));
    assert!(result.unwrap_err().is_retryable());
    assert_eq!(coordinator.state(), SubmitState::Failed);

    let result = coordinator.submit(&FakeEndpoint::unreachable(), &puzzle, &answers, &spec, &details());
    assert!(matches!(result, Err(SubmitError::Network(_))));
    assert!(coordinator.can_submit());

    coordinator.submit(&FakeEndpoint::replying(200, ""), &puzzle, &answers, &spec, &details()).unwrap();
    assert_eq!(coordinator.state(), SubmitState::Accepted);
  }

  #[test]
  fn second_submission_is_refused_while_in_flight() {
    let (puzzle, answers, spec) = solved();
    let mut coordinator = SubmissionCoordinator::new();

    coordinator.begin(&puzzle, &answers, &spec, &details()).unwrap();
    assert!(!coordinator.can_submit());
    assert_eq!(
      coordinator.begin(&puzzle, &answers, &spec, &details()),
      Err(SubmitError::Busy)
    );

    let result = coordinator.finish(Ok(EndpointResponse { status: 503, body: String::new() }));
    assert_eq!(result, Err(SubmitError::Server(503)));
    assert!(coordinator.can_submit());
  }
}
