#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Gramcat
//!
//! Gramcat identifies the language of a text with character n-grams and a multinomial naive
//! Bayes classifier.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{prelude::*, stdin, BufReader};
//!
//! use gramcat::{LanguageIdentifier, Model, DEFAULT_MAX_FEATURES};
//!
//! let mut f = BufReader::new(File::open("model.bin").unwrap());
//! let model = Model::read(&mut f).unwrap();
//! let identifier = LanguageIdentifier::new(model, DEFAULT_MAX_FEATURES).unwrap();
//!
//! for line in stdin().lock().lines() {
//!     let results = identifier.identify(&line.unwrap());
//!     println!("{}", results[0].category());
//! }
//! ```
//!
//! Models are trained with [`Trainer`]. Training several languages in parallel requires
//! **crate feature** `multithreading` (enabled by default).

mod utils;

mod classifier;
mod distribution;
mod identifier;
mod language;
mod model;
mod ngram;
mod ring_buffer;
mod trainer;

pub mod errors;

pub use classifier::{Classification, NaiveBayesClassifier};
pub use distribution::{Distribution, DistributionBuilder};
pub use errors::GramcatError;
pub use identifier::{LanguageIdentifier, DEFAULT_MAX_FEATURES};
pub use language::{LanguageInfo, LanguageModel};
pub use model::Model;
pub use ngram::{NgramGenerator, Ngrams, BOUNDARY_MARKER, MAX_NGRAM_LENGTH};
pub use trainer::{Trainer, DEFAULT_MAX_DISTRIBUTION_SIZE};
pub use utils::ReadChars;
