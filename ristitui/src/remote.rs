//! Everything that talks to the network: fetching the puzzle and posting submissions.

use std::fmt::Display;
use std::fs;

use log::{info, warn};
use reqwest::blocking::Client;
use ristikko::submission::{Endpoint, EndpointResponse, Submission, TransportError};

use crate::LoadError;

/// Reads the puzzle document from a local file, or downloads it when `source` is an
/// http(s) URL.
pub fn fetch_puzzle(source: &str) -> Result<String, LoadError> {
  if source.starts_with("http://") || source.starts_with("https://") {
    info!("downloading puzzle from {source}");
    let response = reqwest::blocking::get(source)?.error_for_status()?;
    return Ok(response.text()?);
  }
  fs::read_to_string(source).map_err(|source_err| LoadError::Read {
    path: source.to_string(),
    source: source_err,
  })
}

/// Posts submissions as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
  url: String,
  client: Client,
}

impl HttpEndpoint {
  pub fn new(url: String) -> Self {
    Self {
      url,
      client: Client::new(),
    }
  }
}

impl Endpoint for HttpEndpoint {
  fn post(&self, submission: &Submission) -> Result<EndpointResponse, TransportError> {
    let response = self
      .client
      .post(&self.url)
      .json(submission)
      .send()
      .map_err(|e| {
        warn!("posting to {} failed: {e}", self.url);
        TransportError(e.to_string())
      })?;
    let status = response.status().as_u16();
    let body = read_body(status, response.text());
    info!("endpoint answered {status}");
    Ok(EndpointResponse { status, body })
  }
}

/// The response body, or nothing if it could not be read. A 429 without its body
/// falls back to a generic message later on.
fn read_body(status: u16, body: Result<String, impl Display>) -> String {
  body.unwrap_or_else(|e| {
    warn!("could not read the body of the {status} response: {e}");
    String::new()
  })
}
