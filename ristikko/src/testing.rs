//! Shared fixtures for unit tests.

use crate::{Alphabet, AnswerStore, MemoryStorage, Puzzle};

/// The top-left corner of a larger puzzle, in document coordinates (Y grows upwards).
///
/// ```text
/// ASKO■TASAN
/// L
/// A
/// J
/// A    ·
/// T
/// ```
///
/// Word 2 (TASAN) is flagged as the solution word; `·` is a blank cell.
pub const SAMPLE_PUZZLE: &str = r#"{
  "words": [
    {"wordindex": 1, "startX": 0, "startY": 11, "length": 4, "direction": "across", "answer": "ASKO"},
    {"wordindex": 2, "startX": 5, "startY": 11, "length": 5, "direction": "across", "answer": "TASAN", "ratkaisusana": true},
    {"wordindex": 3, "startX": 0, "startY": 11, "length": 6, "direction": "down", "answer": "ALAJAT"}
  ],
  "cells": [
    {"x": 0, "y": 11, "letter": "A", "isBlocked": false},
    {"x": 1, "y": 11, "letter": "S", "isBlocked": false},
    {"x": 2, "y": 11, "letter": "K", "isBlocked": false},
    {"x": 3, "y": 11, "letter": "O", "isBlocked": false},
    {"x": 4, "y": 11, "letter": " ", "isBlocked": true},
    {"x": 5, "y": 11, "letter": "T", "isBlocked": false},
    {"x": 6, "y": 11, "letter": "A", "isBlocked": false},
    {"x": 7, "y": 11, "letter": "S", "isBlocked": false},
    {"x": 8, "y": 11, "letter": "A", "isBlocked": false},
    {"x": 9, "y": 11, "letter": "N", "isBlocked": false},
    {"x": 0, "y": 10, "letter": "L", "isBlocked": false},
    {"x": 0, "y": 9, "letter": "A", "isBlocked": false},
    {"x": 0, "y": 8, "letter": "J", "isBlocked": false},
    {"x": 0, "y": 7, "letter": "A", "isBlocked": false},
    {"x": 0, "y": 6, "letter": "T", "isBlocked": false},
    {"x": 5, "y": 6, "letter": " ", "isBlocked": false}
  ]
}"#;

/// A single across word ABCD on row 0.
pub const SINGLE_WORD_PUZZLE: &str = r#"{
  "cells": [
    {"x": 0, "y": 0, "letter": "A", "isBlocked": false},
    {"x": 1, "y": 0, "letter": "B", "isBlocked": false},
    {"x": 2, "y": 0, "letter": "C", "isBlocked": false},
    {"x": 3, "y": 0, "letter": "D", "isBlocked": false}
  ],
  "words": [
    {"wordindex": 1, "startX": 0, "startY": 0, "length": 4, "direction": "across"}
  ]
}"#;

pub fn sample_puzzle() -> Puzzle {
  Puzzle::load(SAMPLE_PUZZLE).unwrap()
}

pub fn single_word_puzzle() -> Puzzle {
  Puzzle::load(SINGLE_WORD_PUZZLE).unwrap()
}

/// An answer store over `puzzle` persisting to a fresh in-memory entry, returned so
/// tests can inspect what was written.
pub fn memory_store(puzzle: &Puzzle) -> (AnswerStore, MemoryStorage) {
  let storage = MemoryStorage::default();
  let store = AnswerStore::new(puzzle, Alphabet::default(), Box::new(storage.clone()));
  (store, storage)
}
