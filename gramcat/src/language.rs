use std::collections::BTreeMap;
use std::fmt;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::distribution::Distribution;

/// Names and codes of a language. Any of them may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Decode, Encode)]
pub struct LanguageInfo {
    iso639_2t: String,
    iso639_3: String,
    english_name: String,
    local_name: String,
}

impl LanguageInfo {
    pub fn new<S1, S2, S3, S4>(iso639_2t: S1, iso639_3: S2, english_name: S3, local_name: S4) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
    {
        Self {
            iso639_2t: iso639_2t.into(),
            iso639_3: iso639_3.into(),
            english_name: english_name.into(),
            local_name: local_name.into(),
        }
    }

    /// Creates a language known only by a label, stored as its ISO 639-3 code.
    pub fn from_label<S>(label: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            iso639_3: label.into(),
            ..Self::default()
        }
    }

    /// ISO 639-2 (part 2/T) code.
    pub fn iso639_2t(&self) -> &str {
        &self.iso639_2t
    }

    /// ISO 639-3 code.
    pub fn iso639_3(&self) -> &str {
        &self.iso639_3
    }

    pub fn english_name(&self) -> &str {
        &self.english_name
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Gets the first non-blank identifier, trying the ISO 639-2/T code, the ISO 639-3 code, the
    /// English name and the local name in this order.
    pub fn any_name(&self) -> Option<&str> {
        [
            self.iso639_2t(),
            self.iso639_3(),
            self.english_name(),
            self.local_name(),
        ]
        .into_iter()
        .find(|name| !name.trim().is_empty())
    }

    /// Checks whether `label` equals any of the identifiers.
    pub fn matches(&self, label: &str) -> bool {
        !label.is_empty()
            && [
                self.iso639_2t(),
                self.iso639_3(),
                self.english_name(),
                self.local_name(),
            ]
            .contains(&label)
    }
}

impl fmt::Display for LanguageInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ISO639-2-T: {}, ISO639-3: {}, EnglishName: {}, LocalName: {}",
            self.iso639_2t, self.iso639_3, self.english_name, self.local_name,
        )
    }
}

/// N-gram distribution of one language with its metadata.
#[derive(Clone, Debug)]
pub struct LanguageModel {
    language: LanguageInfo,
    metadata: BTreeMap<String, String>,
    features: Distribution,
}

impl LanguageModel {
    pub fn new(language: LanguageInfo, features: Distribution) -> Self {
        Self::with_metadata(language, BTreeMap::new(), features)
    }

    pub fn with_metadata(
        language: LanguageInfo,
        metadata: BTreeMap<String, String>,
        features: Distribution,
    ) -> Self {
        Self {
            language,
            metadata,
            features,
        }
    }

    pub fn language(&self) -> &LanguageInfo {
        &self.language
    }

    /// Free-form key-value pairs attached to the model.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn features(&self) -> &Distribution {
        &self.features
    }

    /// Splits the model into its language, metadata and distribution.
    pub fn into_parts(self) -> (LanguageInfo, BTreeMap<String, String>, Distribution) {
        (self.language, self.metadata, self.features)
    }

    pub(crate) fn features_mut(&mut self) -> &mut Distribution {
        &mut self.features
    }
}

impl Encode for LanguageModel {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.language, encoder)?;
        Encode::encode(&self.metadata, encoder)?;
        Encode::encode(&self.features, encoder)?;
        Ok(())
    }
}

impl<Context> Decode<Context> for LanguageModel {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self {
            language: Decode::decode(decoder)?,
            metadata: Decode::decode(decoder)?,
            features: Decode::decode(decoder)?,
        })
    }
}
