use std::borrow::Borrow;

use hashbrown::HashMap;

use crate::distribution::Distribution;
use crate::errors::{GramcatError, Result};
use crate::utils::{FeatureMap, SplitMix64Builder};

/// A category paired with its score.
#[derive(Clone, Debug)]
pub struct Classification<'a, C> {
    category: &'a C,
    score: f64,
}

impl<'a, C> Classification<'a, C> {
    /// Gets the category.
    pub fn category(&self) -> &'a C {
        self.category
    }

    /// Gets the log-space score. Scores are only comparable with each other.
    pub fn score(&self) -> f64 {
        self.score
    }
}

/// Multinomial naive Bayes classifier with Laplace smoothing.
///
/// The classifier holds, for each feature observed in any category, one smoothed
/// log-probability per category. Features never observed in a category fall back to that
/// category's unseen-feature log-probability.
pub struct NaiveBayesClassifier<C> {
    categories: Vec<C>,
    priors: Vec<f64>,
    unseen: Vec<f64>,
    log_probs: FeatureMap<Vec<f64>>,
    max_features: usize,
}

impl<C> NaiveBayesClassifier<C> {
    /// Creates a new classifier.
    ///
    /// # Arguments
    ///
    /// * `categories` - Pairs of a category and its distribution.
    /// * `max_features` - The number of leading features scored in each classification.
    ///
    /// # Errors
    ///
    /// [`GramcatError::InvalidArgument`] will be returned if `categories` is empty,
    /// if every distribution is empty, or if `max_features` is 0.
    pub fn new<I, D>(categories: I, max_features: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (C, D)>,
        D: Borrow<Distribution>,
    {
        if max_features == 0 {
            return Err(GramcatError::invalid_argument(
                "max_features",
                "must be greater than 0",
            ));
        }
        let (categories, distributions): (Vec<C>, Vec<D>) = categories.into_iter().unzip();
        if categories.is_empty() {
            return Err(GramcatError::invalid_argument(
                "categories",
                "must contain at least one category",
            ));
        }
        let totals: Vec<u64> = distributions
            .iter()
            .map(|d| d.borrow().total_with_noise())
            .collect();
        let grand_total = totals
            .iter()
            .try_fold(0u64, |acc, &total| acc.checked_add(total))
            .ok_or_else(|| {
                GramcatError::invalid_argument("categories", "the total count overflows")
            })?;
        if grand_total == 0 {
            return Err(GramcatError::invalid_argument(
                "categories",
                "all distributions are empty",
            ));
        }
        let log_grand_total = (grand_total as f64).ln();

        let priors: Vec<f64> = totals
            .iter()
            .map(|&total| (total as f64).ln() - log_grand_total)
            .collect();
        let log_denoms: Vec<f64> = totals
            .iter()
            .map(|&total| (total as f64 + 1.).ln())
            .collect();
        let unseen: Vec<f64> = log_denoms.iter().map(|&d| -d).collect();

        let mut log_probs: FeatureMap<Vec<f64>> = FeatureMap::default();
        for (i, distribution) in distributions.iter().enumerate() {
            for (feature, count) in distribution.borrow().iter() {
                let log_prob = (count as f64 + 1.).ln() - log_denoms[i];
                if let Some(row) = log_probs.get_mut(feature) {
                    row[i] = log_prob;
                } else {
                    let mut row = unseen.clone();
                    row[i] = log_prob;
                    log_probs.insert(feature.to_string(), row);
                }
            }
        }
        log::debug!(
            "classifier built with {} categories and {} features",
            categories.len(),
            log_probs.len(),
        );

        Ok(Self {
            categories,
            priors,
            unseen,
            log_probs,
            max_features,
        })
    }

    /// Scores the leading features against every category.
    ///
    /// Only the first [`Self::max_features()`] items of `features` are consumed.
    ///
    /// # Returns
    ///
    /// One entry per category, in descending order of score. Ties keep the order in which
    /// categories were given to [`Self::new()`].
    pub fn classify<I, S>(&self, features: I) -> Vec<Classification<C>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let features: Vec<S> = features.into_iter().take(self.max_features).collect();
        let mut occurrences: HashMap<&str, u64, SplitMix64Builder> = HashMap::default();
        for feature in &features {
            *occurrences.entry(feature.as_ref()).or_insert(0) += 1;
        }

        let mut scores = self.priors.clone();
        for (feature, n) in occurrences {
            let log_probs = self
                .log_probs
                .get(feature)
                .map_or(self.unseen.as_slice(), Vec::as_slice);
            let n = n as f64;
            for (score, &log_prob) in scores.iter_mut().zip(log_probs) {
                *score += n * log_prob;
            }
        }

        let mut results: Vec<Classification<C>> = self
            .categories
            .iter()
            .zip(scores)
            .map(|(category, score)| Classification { category, score })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }

    /// Gets the categories in construction order.
    pub fn categories(&self) -> &[C] {
        &self.categories
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Gets the number of distinct features with a stored log-probability.
    pub fn n_features(&self) -> usize {
        self.log_probs.len()
    }
}
