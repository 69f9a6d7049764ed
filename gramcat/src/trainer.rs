use std::io::Read;

#[cfg(feature = "multithreading")]
use std::thread;

use crate::distribution::{Distribution, DistributionBuilder};
use crate::errors::{GramcatError, Result};
use crate::language::{LanguageInfo, LanguageModel};
use crate::model::Model;
use crate::ngram::NgramGenerator;
use crate::utils::ReadChars;

/// Default maximum number of distinct n-grams kept in each distribution.
pub const DEFAULT_MAX_DISTRIBUTION_SIZE: usize = 4000;

/// Trainer of language models.
///
/// Each language is trained independently: its text is split into n-grams, all of them are
/// counted, rare n-grams are optionally pruned by count, and finally only the most frequent ones
/// are kept.
///
/// # Examples
///
/// ```
/// use gramcat::{LanguageInfo, Trainer};
///
/// let trainer = Trainer::new(3).unwrap().max_distribution_size(100);
/// let model = trainer
///     .train([
///         (LanguageInfo::from_label("eng"), "the cat sat on the mat".as_bytes()),
///         (LanguageInfo::from_label("deu"), "die katze sitzt auf der matte".as_bytes()),
///     ])
///     .unwrap();
///
/// assert_eq!(2, model.language_models().len());
/// assert_eq!(3, model.max_ngram_length());
/// ```
#[derive(Clone, Debug)]
pub struct Trainer {
    generator: NgramGenerator,
    max_distribution_size: usize,
    min_count_threshold: u64,

    #[cfg(feature = "multithreading")]
    n_threads: usize,
}

impl Trainer {
    /// Creates a new trainer.
    ///
    /// # Arguments
    ///
    /// * `max_ngram_length` - The maximum length of n-grams in characters.
    ///
    /// # Errors
    ///
    /// If `max_ngram_length` is zero or greater than [`MAX_NGRAM_LENGTH`](crate::MAX_NGRAM_LENGTH),
    /// an error variant will be returned.
    pub fn new(max_ngram_length: usize) -> Result<Self> {
        Ok(Self {
            generator: NgramGenerator::new(max_ngram_length)?,
            max_distribution_size: DEFAULT_MAX_DISTRIBUTION_SIZE,
            min_count_threshold: 0,

            #[cfg(feature = "multithreading")]
            n_threads: 1,
        })
    }

    /// Sets the maximum number of distinct n-grams kept in each distribution.
    pub fn max_distribution_size(mut self, max_distribution_size: usize) -> Self {
        self.max_distribution_size = max_distribution_size;
        self
    }

    /// Prunes n-grams occurring at most `min_count_threshold` times before ranking.
    ///
    /// 0 disables this pruning.
    pub fn min_count_threshold(mut self, min_count_threshold: u64) -> Self {
        self.min_count_threshold = min_count_threshold;
        self
    }

    /// Reads only the first `max_lines` lines of each text.
    pub fn max_lines(mut self, max_lines: u64) -> Self {
        self.generator = self.generator.max_lines(max_lines);
        self
    }

    /// Sets the number of threads training languages in parallel.
    ///
    /// # Errors
    ///
    /// If `n_threads` is zero, an error variant will be returned.
    #[cfg(feature = "multithreading")]
    #[cfg_attr(docsrs, doc(cfg(feature = "multithreading")))]
    pub fn n_threads(mut self, n_threads: usize) -> Result<Self> {
        if n_threads == 0 {
            return Err(GramcatError::invalid_argument(
                "n_threads",
                "must be a positive integer",
            ));
        }
        self.n_threads = n_threads;
        Ok(self)
    }

    pub fn max_ngram_length(&self) -> usize {
        self.generator.max_ngram_length()
    }

    /// Builds a pruned n-gram distribution from a UTF-8 text.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error or the text is not valid UTF-8,
    /// [`GramcatError::IOError`] will be returned.
    pub fn train_distribution<R>(&self, rdr: R) -> Result<Distribution>
    where
        R: Read,
    {
        let mut chars = ReadChars::new(rdr);
        let mut builder = DistributionBuilder::new();
        builder.add_events(self.generator.features_from_reader(&mut chars));
        if let Some(e) = chars.take_error() {
            return Err(e.into());
        }
        log::debug!(
            "counted {} n-grams ({} distinct)",
            builder.total(),
            builder.len()
        );
        let mut distribution = if self.min_count_threshold > 0 {
            builder.prune_by_count(self.min_count_threshold)
        } else {
            builder.seal()
        };
        distribution.prune_by_rank(self.max_distribution_size);
        Ok(distribution)
    }

    /// Trains the model of a single language.
    ///
    /// # Errors
    ///
    /// See [`Trainer::train_distribution()`].
    pub fn train_language_model<R>(&self, language: LanguageInfo, rdr: R) -> Result<LanguageModel>
    where
        R: Read,
    {
        log::info!("training {}", language.any_name().unwrap_or("(unnamed)"));
        let features = self.train_distribution(rdr)?;
        log::info!(
            "trained {}: {} n-grams kept, {} pruned",
            language.any_name().unwrap_or("(unnamed)"),
            features.distinct_represented_count(),
            features.distinct_noise_count(),
        );
        Ok(LanguageModel::new(language, features))
    }

    /// Trains one language model per input.
    ///
    /// Inputs are trained in parallel when more than one thread is configured. The language
    /// models are always stored in the order of `inputs`.
    ///
    /// # Errors
    ///
    /// If training some language fails, the error of the first such input is returned.
    pub fn train<I, R>(&self, inputs: I) -> Result<Model>
    where
        I: IntoIterator<Item = (LanguageInfo, R)>,
        R: Read + Send,
    {
        let inputs: Vec<(LanguageInfo, R)> = inputs.into_iter().collect();

        #[cfg(feature = "multithreading")]
        let language_models = if self.n_threads > 1 && inputs.len() > 1 {
            self.train_parallel(inputs)?
        } else {
            self.train_sequential(inputs)?
        };

        #[cfg(not(feature = "multithreading"))]
        let language_models = self.train_sequential(inputs)?;

        Model::new(
            self.max_ngram_length(),
            self.max_distribution_size,
            language_models,
        )
    }

    fn train_sequential<R>(&self, inputs: Vec<(LanguageInfo, R)>) -> Result<Vec<LanguageModel>>
    where
        R: Read,
    {
        inputs
            .into_iter()
            .map(|(language, rdr)| self.train_language_model(language, rdr))
            .collect()
    }

    #[cfg(feature = "multithreading")]
    fn train_parallel<R>(&self, inputs: Vec<(LanguageInfo, R)>) -> Result<Vec<LanguageModel>>
    where
        R: Read + Send,
    {
        let n_inputs = inputs.len();
        let n_threads = self.n_threads.min(n_inputs);
        log::debug!("training {} languages with {} threads", n_inputs, n_threads);

        let mut slots: Vec<Option<Result<LanguageModel>>> = (0..n_inputs).map(|_| None).collect();
        thread::scope(|s| {
            let (result_tx, result_rx) = crossbeam_channel::unbounded();
            let (task_tx, task_rx) = crossbeam_channel::unbounded::<(usize, (LanguageInfo, R))>();
            for _ in 0..n_threads {
                let result_tx = result_tx.clone();
                let task_rx = task_rx.clone();
                s.spawn(move || {
                    for (i, (language, rdr)) in task_rx {
                        let result = self.train_language_model(language, rdr);
                        if result_tx.send((i, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);
            drop(task_rx);

            for task in inputs.into_iter().enumerate() {
                if task_tx.send(task).is_err() {
                    break;
                }
            }
            drop(task_tx);

            for (i, result) in result_rx {
                slots[i] = Some(result);
            }
        });

        // A worker can only skip a slot by panicking, which the scope has already propagated.
        slots.into_iter().flatten().collect()
    }
}
