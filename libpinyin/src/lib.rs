//! imsession-pinyin crate root
//!
//! A small table-driven pinyin engine for `imsession-core`, plus the pieces
//! of the `imsession` console host.
//!
//! Public API exported here:
//! - `TableEngine` and `TableContext` from `engine`
//! - `Dictionary` from `dictionary`
//! - `Parser` and `Syllable` from `parser`
//! - `FuzzyMap` from `fuzzy`
//! - `JsonSink` from `sink`

pub mod dictionary;
pub mod engine;
pub mod fuzzy;
pub mod parser;
pub mod script;
pub mod sink;

pub use dictionary::{Dictionary, Entry};
pub use engine::{Conversion, Segment, TableContext, TableEngine};
pub use fuzzy::FuzzyMap;
pub use parser::{Parser, Syllable, PINYIN_SYLLABLES};
pub use script::{parse_line, Command};
pub use sink::{JsonSink, SinkEvent};

pub use imsession_core::{Config, Session, SessionHost};
