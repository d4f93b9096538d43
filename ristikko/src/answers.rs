use crate::storage::Storage;
use crate::{Coord, Error, Puzzle};
use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Debug, Display};

use log::{debug, error, trace, warn};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The letters a user may enter, given as a regex character class such as `[A-Z]`.
/// Letters are uppercased before they are matched.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Alphabet {
  class: String,
  regex: Regex,
}

impl Alphabet {
  pub const LATIN: &'static str = "[A-Z]";
  pub const FINNISH: &'static str = "[A-ZÅÄÖ]";

  pub fn new(class: &str) -> Result<Self, Error> {
    let regex = Regex::new(&format!("^(?:{class})$"))
      .map_err(|e| Error::Config(format!("invalid alphabet {class:?}: {e}")))?;
    Ok(Self {
      class: class.to_string(),
      regex,
    })
  }

  /// Basic Latin plus Å, Ä and Ö.
  pub fn finnish() -> Self {
    Self::new(Self::FINNISH).expect("FINNISH is a valid character class")
  }

  /// Uppercases `letter` and returns it if it belongs to this alphabet.
  pub fn normalize(&self, letter: char) -> Option<char> {
    let mut upper = letter.to_uppercase();
    let (Some(c), None) = (upper.next(), upper.next()) else {
      return None;
    };
    let mut buf = [0; 4];
    self.regex.is_match(c.encode_utf8(&mut buf)).then_some(c)
  }
}

impl Default for Alphabet {
  fn default() -> Self {
    Self::new(Self::LATIN).expect("LATIN is a valid character class")
  }
}

impl TryFrom<String> for Alphabet {
  type Error = Error;
  fn try_from(class: String) -> Result<Self, Self::Error> {
    Self::new(&class)
  }
}

impl Debug for Alphabet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Alphabet").field(&self.class).finish()
  }
}

impl Display for Alphabet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.class)
  }
}

/// The letters the user has entered so far, keyed by cell. Every change is written
/// through to a [Storage] entry as a JSON object such as `{"0,0":"A","1,0":"S"}`.
pub struct AnswerStore {
  entries: BTreeMap<Coord, char>,
  fillable: HashSet<Coord>,
  alphabet: Alphabet,
  storage: Box<dyn Storage>,
}

impl Debug for AnswerStore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AnswerStore")
      .field("entries", &self.entries)
      .field("alphabet", &self.alphabet)
      .finish()
  }
}

impl AnswerStore {
  /// Creates an empty store. Nothing is read from `storage`; see [AnswerStore::open].
  pub fn new(puzzle: &Puzzle, alphabet: Alphabet, storage: Box<dyn Storage>) -> Self {
    Self {
      entries: BTreeMap::new(),
      fillable: puzzle.fillable_coords().collect(),
      alphabet,
      storage,
    }
  }

  /// Creates a store holding whatever `storage` has saved. A missing entry gives an
  /// empty store; so does a corrupted one, which is also removed from `storage`.
  pub fn open(puzzle: &Puzzle, alphabet: Alphabet, storage: Box<dyn Storage>) -> Self {
    let mut store = Self::new(puzzle, alphabet, storage);
    match store.storage.read() {
      Ok(Some(saved)) => match store.hydrate(&saved) {
        Ok(()) => debug!("restored {} saved answer(s)", store.len()),
        Err(e) => {
          warn!("discarding saved answers: {e}");
          if let Err(e) = store.storage.remove() {
            error!("could not remove saved answers: {e}");
          }
        }
      },
      Ok(None) => debug!("no saved answers"),
      Err(e) => warn!("could not read saved answers: {e}"),
    }
    store
  }

  pub fn alphabet(&self) -> &Alphabet {
    &self.alphabet
  }

  /// The letter entered at `coord`, if any.
  pub fn get(&self, coord: Coord) -> Option<char> {
    self.entries.get(&coord).copied()
  }

  /// Writes `letter`, uppercased, into the cell at `coord`.
  pub fn set(&mut self, coord: Coord, letter: char) -> Result<(), Error> {
    if !self.fillable.contains(&coord) {
      return Err(Error::NotFillable(coord));
    }
    let letter = self.alphabet.normalize(letter).ok_or(Error::InvalidLetter(letter))?;
    trace!("{coord} = {letter}");
    self.entries.insert(coord, letter);
    self.persist();
    Ok(())
  }

  /// Empties the cell at `coord`.
  pub fn clear(&mut self, coord: Coord) {
    if self.entries.remove(&coord).is_some() {
      trace!("{coord} cleared");
      self.persist();
    }
  }

  /// Empties every cell and removes the saved entry.
  pub fn clear_all(&mut self) {
    self.entries.clear();
    debug!("all answers cleared");
    if let Err(e) = self.storage.remove() {
      error!("could not remove saved answers: {e}");
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// All entries, ordered by coordinate.
  pub fn iter(&self) -> impl Iterator<Item = (Coord, char)> {
    self.entries.iter().map(|(&coord, &letter)| (coord, letter))
  }

  /// The persisted form: a JSON object from `"x,y"` keys to one-letter strings.
  pub fn serialize(&self) -> String {
    let map: Map<String, Value> = self
      .entries
      .iter()
      .map(|(coord, letter)| (coord.to_string(), Value::String(letter.to_string())))
      .collect();
    Value::Object(map).to_string()
  }

  /// Replaces the contents of this store with a previously [serialized](Self::serialize)
  /// form. On error the store is left empty.
  ///
  /// Entries for cells that do not accept input are dropped, and empty strings are
  /// treated as absent.
  pub fn hydrate(&mut self, saved: &str) -> Result<(), Error> {
    match self.parse(saved) {
      Ok(entries) => {
        self.entries = entries;
        Ok(())
      }
      Err(e) => {
        self.entries.clear();
        Err(e)
      }
    }
  }

  fn parse(&self, saved: &str) -> Result<BTreeMap<Coord, char>, Error> {
    let map: Map<String, Value> =
      serde_json::from_str(saved).map_err(|e| Error::Format(e.to_string()))?;

    let mut entries = BTreeMap::new();
    for (key, value) in map {
      let coord: Coord = key.parse()?;
      let Value::String(text) = value else {
        return Err(Error::Format(format!("value for {key} is not a string")));
      };
      let mut chars = text.chars();
      let letter = match (chars.next(), chars.next()) {
        (None, _) => continue,
        (Some(c), None) => self
          .alphabet
          .normalize(c)
          .ok_or_else(|| Error::Format(format!("{c:?} at {key} is not an accepted letter")))?,
        _ => return Err(Error::Format(format!("{text:?} at {key} is not a single letter"))),
      };
      if !self.fillable.contains(&coord) {
        debug!("dropping saved answer for {coord}, which does not accept input");
        continue;
      }
      entries.insert(coord, letter);
    }
    Ok(entries)
  }

  fn persist(&mut self) {
    let serialized = self.serialize();
    if let Err(e) = self.storage.write(&serialized) {
      error!("could not save answers: {e}");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::MemoryStorage;
  use crate::testing::{memory_store, sample_puzzle};
  use proptest::prelude::*;

  #[test]
  fn set_uppercases_and_persists() {
    let puzzle = sample_puzzle();
    let (mut store, storage) = memory_store(&puzzle);

    store.set(Coord::new(1, 0), 's').unwrap();
    assert_eq!(store.get(Coord::new(1, 0)), Some('S'));
    assert_eq!(storage.value().as_deref(), Some(r#"{"1,0":"S"}"#));
  }

  #[test]
  fn set_rejects_letters_outside_the_alphabet() {
    let puzzle = sample_puzzle();
    let (mut store, storage) = memory_store(&puzzle);

    assert!(matches!(store.set(Coord::new(0, 0), '7'), Err(Error::InvalidLetter('7'))));
    assert!(matches!(store.set(Coord::new(0, 0), 'ä'), Err(Error::InvalidLetter('ä'))));
    assert!(store.is_empty());
    assert_eq!(storage.value(), None);
  }

  #[test]
  fn finnish_alphabet_accepts_umlauts() {
    let puzzle = sample_puzzle();
    let mut store = AnswerStore::new(&puzzle, Alphabet::finnish(), Box::new(MemoryStorage::default()));
    store.set(Coord::new(0, 0), 'ä').unwrap();
    assert_eq!(store.get(Coord::new(0, 0)), Some('Ä'));
    assert!(store.set(Coord::new(0, 0), 'ß').is_err());
  }

  #[test]
  fn set_rejects_cells_without_input() {
    let puzzle = sample_puzzle();
    let (mut store, _) = memory_store(&puzzle);

    // Blocked, blank, and outside the grid.
    for coord in [Coord::new(4, 0), Coord::new(5, 5), Coord::new(30, 30)] {
      assert!(matches!(store.set(coord, 'A'), Err(Error::NotFillable(c)) if c == coord));
    }
  }

  #[test]
  fn clear_removes_the_entry() {
    let puzzle = sample_puzzle();
    let (mut store, storage) = memory_store(&puzzle);

    store.set(Coord::new(0, 0), 'A').unwrap();
    store.set(Coord::new(1, 0), 'S').unwrap();
    store.clear(Coord::new(0, 0));
    assert_eq!(store.get(Coord::new(0, 0)), None);
    assert_eq!(storage.value().as_deref(), Some(r#"{"1,0":"S"}"#));

    store.clear_all();
    assert!(store.is_empty());
    assert_eq!(storage.value(), None);
  }

  #[test]
  fn corrupted_state_leaves_the_store_empty() {
    let puzzle = sample_puzzle();
    let (mut store, _) = memory_store(&puzzle);
    store.set(Coord::new(0, 0), 'A').unwrap();

    assert!(matches!(store.hydrate("{not json"), Err(Error::Format(_))));
    assert!(store.is_empty());

    // A single bad entry spoils the whole document.
    assert!(store.hydrate(r#"{"0,0":"A","1,0":"SS"}"#).is_err());
    assert!(store.is_empty());
    assert!(store.hydrate(r#"{"0,0":"A","x":"S"}"#).is_err());
    assert!(store.is_empty());
    assert!(store.hydrate(r#"["A"]"#).is_err());
    assert!(store.is_empty());
  }

  #[test]
  fn open_recovers_silently_from_corruption() {
    let puzzle = sample_puzzle();
    let storage = MemoryStorage::with_value("{not json");
    let store = AnswerStore::open(&puzzle, Alphabet::default(), Box::new(storage.clone()));
    assert!(store.is_empty());
    assert_eq!(storage.value(), None);
  }

  #[test]
  fn open_restores_saved_answers() {
    let puzzle = sample_puzzle();
    let storage = MemoryStorage::with_value(r#"{"0,0":"a","1,0":"","4,0":"X"}"#);
    let store = AnswerStore::open(&puzzle, Alphabet::default(), Box::new(storage));
    assert_eq!(store.iter().collect::<Vec<_>>(), vec![(Coord::new(0, 0), 'A')]);
  }

  #[test]
  fn open_without_saved_state_is_empty() {
    let puzzle = sample_puzzle();
    let store = AnswerStore::open(&puzzle, Alphabet::default(), Box::new(MemoryStorage::default()));
    assert!(store.is_empty());
  }

  proptest! {
    #[test]
    fn hydrate_reproduces_serialized_store(
      picks in proptest::collection::vec((0usize..14, proptest::char::range('A', 'Z')), 0..30)
    ) {
      let puzzle = sample_puzzle();
      let coords: Vec<Coord> = puzzle.fillable_coords().collect();
      let (mut store, _) = memory_store(&puzzle);
      for (i, letter) in picks {
        store.set(coords[i % coords.len()], letter.to_ascii_lowercase()).unwrap();
      }

      let (mut copy, _) = memory_store(&puzzle);
      copy.hydrate(&store.serialize()).unwrap();
      prop_assert_eq!(copy.iter().collect::<Vec<_>>(), store.iter().collect::<Vec<_>>());
      prop_assert_eq!(copy.serialize(), store.serialize());
    }
  }
}
