//! The durable home of the user's answers: a single string-valued entry.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// A single persisted entry. Implementations decide where it lives; the front end
/// uses a file, tests use [MemoryStorage].
pub trait Storage {
  /// Returns the stored value, or `None` if nothing has been stored yet.
  fn read(&self) -> io::Result<Option<String>>;

  fn write(&mut self, value: &str) -> io::Result<()>;

  /// Removes the entry. Removing an absent entry is not an error.
  fn remove(&mut self) -> io::Result<()>;
}

/// Keeps the entry in memory. Clones share the same entry, so a test can hand one
/// clone to an [AnswerStore](crate::AnswerStore) and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage(Rc<RefCell<Option<String>>>);

impl MemoryStorage {
  pub fn with_value(value: &str) -> Self {
    Self(Rc::new(RefCell::new(Some(value.to_string()))))
  }

  /// The current value of the entry.
  pub fn value(&self) -> Option<String> {
    self.0.borrow().clone()
  }
}

impl Storage for MemoryStorage {
  fn read(&self) -> io::Result<Option<String>> {
    Ok(self.value())
  }

  fn write(&mut self, value: &str) -> io::Result<()> {
    *self.0.borrow_mut() = Some(value.to_string());
    Ok(())
  }

  fn remove(&mut self) -> io::Result<()> {
    self.0.borrow_mut().take();
    Ok(())
  }
}
