use std::io::Read;

use crate::classifier::{Classification, NaiveBayesClassifier};
use crate::errors::Result;
use crate::language::LanguageInfo;
use crate::model::Model;
use crate::ngram::NgramGenerator;
use crate::utils::ReadChars;

/// Default number of leading n-grams scored for each text.
pub const DEFAULT_MAX_FEATURES: usize = 1000;

/// Language identifier.
///
/// # Examples
///
/// ```
/// use gramcat::{LanguageIdentifier, LanguageInfo, Trainer, DEFAULT_MAX_FEATURES};
///
/// let model = Trainer::new(3)
///     .unwrap()
///     .train([
///         (LanguageInfo::from_label("eng"), "the cat sat on the mat".as_bytes()),
///         (LanguageInfo::from_label("deu"), "die katze sitzt auf der matte".as_bytes()),
///     ])
///     .unwrap();
/// let identifier = LanguageIdentifier::new(model, DEFAULT_MAX_FEATURES).unwrap();
///
/// let results = identifier.identify("the mat");
/// assert_eq!("eng", results[0].category().iso639_3());
/// ```
pub struct LanguageIdentifier {
    classifier: NaiveBayesClassifier<LanguageInfo>,
    generator: NgramGenerator,
}

impl LanguageIdentifier {
    /// Creates a new identifier from a model.
    ///
    /// # Arguments
    ///
    /// * `model` - A model. Texts are split with the n-gram length stored in it.
    /// * `max_features` - The number of leading n-grams scored for each text.
    ///
    /// # Errors
    ///
    /// [`GramcatError::InvalidArgument`](crate::GramcatError::InvalidArgument) will be returned
    /// if the model has no language, if all its distributions are empty, or if `max_features`
    /// is 0.
    pub fn new(model: Model, max_features: usize) -> Result<Self> {
        let generator = NgramGenerator::new(model.max_ngram_length())?;
        let classifier = NaiveBayesClassifier::new(
            model
                .into_language_models()
                .into_iter()
                .map(|lm| {
                    let (language, _, features) = lm.into_parts();
                    (language, features)
                }),
            max_features,
        )?;
        Ok(Self {
            classifier,
            generator,
        })
    }

    /// Reads only the first `max_lines` lines of each text.
    pub fn max_lines(mut self, max_lines: u64) -> Self {
        self.generator = self.generator.max_lines(max_lines);
        self
    }

    pub fn max_ngram_length(&self) -> usize {
        self.generator.max_ngram_length()
    }

    pub fn max_features(&self) -> usize {
        self.classifier.max_features()
    }

    /// Gets the languages in model order.
    pub fn languages(&self) -> &[LanguageInfo] {
        self.classifier.categories()
    }

    /// Ranks all languages for a text.
    ///
    /// # Returns
    ///
    /// One entry per language, the most likely first.
    pub fn identify(&self, text: &str) -> Vec<Classification<LanguageInfo>> {
        self.classifier
            .classify(self.generator.features_from_str(text))
    }

    /// Ranks all languages for a UTF-8 text read from `rdr`.
    ///
    /// Reading stops once enough n-grams have been generated.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error or the text is not valid UTF-8,
    /// [`GramcatError::IOError`](crate::GramcatError::IOError) will be returned.
    pub fn identify_reader<R>(&self, rdr: R) -> Result<Vec<Classification<LanguageInfo>>>
    where
        R: Read,
    {
        let mut chars = ReadChars::new(rdr);
        let results = self
            .classifier
            .classify(self.generator.features_from_reader(&mut chars));
        if let Some(e) = chars.take_error() {
            return Err(e.into());
        }
        Ok(results)
    }
}
