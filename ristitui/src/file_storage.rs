use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;

use ristikko::Storage;

/// Keeps the saved answers in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
  path: PathBuf,
}

impl FileStorage {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }
}

impl Storage for FileStorage {
  fn read(&self) -> io::Result<Option<String>> {
    match fs::read_to_string(&self.path) {
      Ok(contents) => Ok(Some(contents)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  fn write(&mut self, value: &str) -> io::Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, value)
  }

  fn remove(&mut self) -> io::Result<()> {
    match fs::remove_file(&self.path) {
      Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
      _ => Ok(()),
    }
  }
}
