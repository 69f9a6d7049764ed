use std::io::{Read, Write};

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::errors::{GramcatError, Result};
use crate::language::{LanguageInfo, LanguageModel};
use crate::ngram::MAX_NGRAM_LENGTH;

const MODEL_MAGIC: &[u8] = b"GramcatModel 0.1\n";

/// Collection of language models sharing the same n-gram parameters.
#[derive(Clone, Debug)]
pub struct Model {
    max_ngram_length: usize,
    max_distribution_size: usize,
    language_models: Vec<LanguageModel>,
}

impl Model {
    /// Creates a new model.
    ///
    /// # Arguments
    ///
    /// * `max_ngram_length` - The maximum n-gram length the distributions were built with.
    /// * `max_distribution_size` - The maximum number of distinct n-grams in each distribution.
    /// * `language_models` - Language models.
    ///
    /// # Errors
    ///
    /// If `max_ngram_length` is zero or greater than [`MAX_NGRAM_LENGTH`], an error variant will
    /// be returned.
    pub fn new(
        max_ngram_length: usize,
        max_distribution_size: usize,
        language_models: Vec<LanguageModel>,
    ) -> Result<Self> {
        if max_ngram_length == 0 {
            return Err(GramcatError::invalid_argument(
                "max_ngram_length",
                "must be a positive integer",
            ));
        }
        if max_ngram_length > MAX_NGRAM_LENGTH {
            return Err(GramcatError::invalid_argument(
                "max_ngram_length",
                "must not be greater than 255",
            ));
        }
        Ok(Self {
            max_ngram_length,
            max_distribution_size,
            language_models,
        })
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;
        let config = bincode::config::standard();
        bincode::encode_into_std_write(self, wtr, config)?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is.
    /// [`GramcatError::InvalidModel`] will be returned if the data is not a model or is
    /// inconsistent.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0; MODEL_MAGIC.len()];
        rdr.read_exact(&mut magic)?;
        if magic != MODEL_MAGIC {
            return Err(GramcatError::invalid_model(
                "model version mismatch or not a model file",
            ));
        }
        let config = bincode::config::standard();
        let model: Self = bincode::decode_from_std_read(rdr, config)?;
        if model.max_ngram_length == 0 {
            return Err(GramcatError::invalid_model(
                "max_ngram_length must be a positive integer",
            ));
        }
        if model.max_ngram_length > MAX_NGRAM_LENGTH {
            return Err(GramcatError::invalid_model(
                "max_ngram_length must not be greater than 255",
            ));
        }
        log::info!(
            "loaded {} language models (max_ngram_length={}, max_distribution_size={})",
            model.language_models.len(),
            model.max_ngram_length,
            model.max_distribution_size,
        );
        Ok(model)
    }

    pub fn max_ngram_length(&self) -> usize {
        self.max_ngram_length
    }

    pub fn max_distribution_size(&self) -> usize {
        self.max_distribution_size
    }

    pub fn language_models(&self) -> &[LanguageModel] {
        &self.language_models
    }

    pub fn into_language_models(self) -> Vec<LanguageModel> {
        self.language_models
    }

    /// Keeps only the language models for which `f` returns `true`.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&LanguageModel) -> bool,
    {
        let n_before = self.language_models.len();
        self.language_models.retain(f);
        log::debug!(
            "kept {} of {} language models",
            self.language_models.len(),
            n_before
        );
    }

    /// Re-prunes every distribution so that it holds at most `max_distinct_allowed` n-grams.
    ///
    /// The stored maximum distribution size is lowered accordingly; it is never raised since
    /// pruned n-grams cannot be restored.
    pub fn prune_by_rank(&mut self, max_distinct_allowed: usize) {
        for language_model in &mut self.language_models {
            language_model
                .features_mut()
                .prune_by_rank(max_distinct_allowed);
        }
        self.max_distribution_size = self.max_distribution_size.min(max_distinct_allowed);
    }

    /// Finds a naming scheme in which every language has a non-blank name.
    ///
    /// The ISO 639-2/T codes, the ISO 639-3 codes, the English names, the local names and
    /// finally any available name are tried in this order.
    ///
    /// # Returns
    ///
    /// The description of the scheme and the names of all languages, or `None` if some language
    /// has no name at all.
    pub fn language_names(&self) -> Option<(&'static str, Vec<&str>)> {
        let schemes: [(&'static str, fn(&LanguageInfo) -> Option<&str>); 5] = [
            ("ISO 639-2-T", |l| Some(l.iso639_2t())),
            ("ISO 639-3", |l| Some(l.iso639_3())),
            ("English name", |l| Some(l.english_name())),
            ("local name", |l| Some(l.local_name())),
            ("any name available", LanguageInfo::any_name),
        ];
        schemes.into_iter().find_map(|(scheme, get_name)| {
            self.language_models
                .iter()
                .map(|lm| get_name(lm.language()).filter(|name| !name.trim().is_empty()))
                .collect::<Option<Vec<_>>>()
                .map(|names| (scheme, names))
        })
    }
}

impl Encode for Model {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&(self.max_ngram_length as u64), encoder)?;
        Encode::encode(&(self.max_distribution_size as u64), encoder)?;
        Encode::encode(&self.language_models, encoder)?;
        Ok(())
    }
}

impl<Context> Decode<Context> for Model {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let max_ngram_length: u64 = Decode::decode(decoder)?;
        let max_distribution_size: u64 = Decode::decode(decoder)?;
        Ok(Self {
            max_ngram_length: usize::try_from(max_ngram_length)
                .map_err(|_| DecodeError::Other("max_ngram_length is too large"))?,
            max_distribution_size: usize::try_from(max_distribution_size)
                .map_err(|_| DecodeError::Other("max_distribution_size is too large"))?,
            language_models: Decode::decode(decoder)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use crate::distribution::DistributionBuilder;

    fn language_model(info: LanguageInfo, text: &str) -> LanguageModel {
        let mut builder = DistributionBuilder::new();
        builder.add_events(text.chars().map(String::from));
        LanguageModel::new(info, builder.prune_by_rank(3))
    }

    fn sample_model() -> Model {
        Model::new(
            2,
            3,
            vec![
                language_model(LanguageInfo::new("eng", "eng", "English", ""), "aaabbcd"),
                language_model(LanguageInfo::new("", "fin", "Finnish", "suomi"), "xxyyyz"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let model = sample_model();
        let mut data = vec![];
        model.write(&mut data).unwrap();
        let restored = Model::read(&mut data.as_slice()).unwrap();

        assert_eq!(2, restored.max_ngram_length());
        assert_eq!(3, restored.max_distribution_size());
        assert_eq!(2, restored.language_models().len());
        for (expected, actual) in model.language_models().iter().zip(restored.language_models()) {
            assert_eq!(expected.language(), actual.language());
            for (feature, count) in expected.features().iter() {
                assert_eq!(count, actual.features().get(feature));
            }
            assert_eq!(
                expected.features().total_with_noise(),
                actual.features().total_with_noise()
            );
            assert_eq!(
                expected.features().distinct_with_noise_count(),
                actual.features().distinct_with_noise_count()
            );
        }
    }

    #[test]
    fn test_read_rejects_other_data() {
        let result = Model::read(&mut &b"<?xml version=\"1.0\"?><LanguageIdentificationProfile/>"[..]);

        assert!(matches!(result, Err(GramcatError::InvalidModel(_))));
    }

    #[test]
    fn test_read_rejects_zero_ngram_length() {
        let mut data = MODEL_MAGIC.to_vec();
        let config = bincode::config::standard();
        bincode::encode_into_std_write((0u64, 10u64, Vec::<LanguageModel>::new()), &mut data, config)
            .unwrap();

        let result = Model::read(&mut data.as_slice());
        assert!(matches!(result, Err(GramcatError::InvalidModel(_))));
    }

    #[test]
    fn test_read_rejects_too_long_ngram_length() {
        let mut data = MODEL_MAGIC.to_vec();
        let config = bincode::config::standard();
        bincode::encode_into_std_write(
            (1u64 << 40, 10u64, Vec::<LanguageModel>::new()),
            &mut data,
            config,
        )
        .unwrap();

        let result = Model::read(&mut data.as_slice());
        assert!(matches!(result, Err(GramcatError::InvalidModel(_))));
    }

    #[test]
    fn test_read_rejects_count_overflow() {
        let mut data = MODEL_MAGIC.to_vec();
        let config = bincode::config::standard();
        let distribution: (Vec<(String, u64)>, u64, u64) =
            (vec![("a".to_string(), u64::MAX)], 1, 0);
        let language_models = vec![(
            LanguageInfo::new("eng", "eng", "English", ""),
            BTreeMap::<String, String>::new(),
            distribution,
        )];
        bincode::encode_into_std_write((3u64, 10u64, language_models), &mut data, config)
            .unwrap();

        let result = Model::read(&mut data.as_slice());
        assert!(matches!(result, Err(GramcatError::DecodeError(_))));
    }

    #[test]
    fn test_new_rejects_zero_ngram_length() {
        let result = Model::new(0, 10, vec![]);

        assert!(matches!(result, Err(GramcatError::InvalidArgument(_))));
    }

    #[test]
    fn test_new_rejects_too_long_ngram_length() {
        assert!(Model::new(MAX_NGRAM_LENGTH, 10, vec![]).is_ok());

        let result = Model::new(MAX_NGRAM_LENGTH + 1, 10, vec![]);
        assert!(matches!(result, Err(GramcatError::InvalidArgument(_))));
    }

    #[test]
    fn test_retain() {
        let mut model = sample_model();
        model.retain(|lm| lm.language().matches("fin"));

        assert_eq!(1, model.language_models().len());
        assert_eq!("Finnish", model.language_models()[0].language().english_name());
    }

    #[test]
    fn test_prune_by_rank() {
        let mut model = sample_model();
        model.prune_by_rank(1);

        assert_eq!(1, model.max_distribution_size());
        for lm in model.language_models() {
            assert_eq!(1, lm.features().distinct_represented_count());
        }
        assert_eq!(3, model.language_models()[0].features().get("a"));
        assert_eq!(3, model.language_models()[1].features().get("y"));

        model.prune_by_rank(10);
        assert_eq!(1, model.max_distribution_size());
    }

    #[test]
    fn test_language_names() {
        let model = sample_model();
        assert_eq!(
            Some(("ISO 639-3", vec!["eng", "fin"])),
            model.language_names()
        );

        let model = Model::new(
            2,
            3,
            vec![
                language_model(LanguageInfo::new("", "", "English", ""), "ab"),
                language_model(LanguageInfo::new("", "", "", "suomi"), "ab"),
            ],
        )
        .unwrap();
        assert_eq!(
            Some(("any name available", vec!["English", "suomi"])),
            model.language_names()
        );

        let model = Model::new(
            2,
            3,
            vec![language_model(LanguageInfo::default(), "ab")],
        )
        .unwrap();
        assert_eq!(None, model.language_names());
    }
}
