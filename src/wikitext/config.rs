//! Parser configuration data.

use super::Error;
use phf::Set;
use serde::Deserialize;
use std::collections::HashSet;
use unicase::UniCase;

/// The default limit on nested parse attempts.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Site specific configuration of a wiki.
#[derive(Debug)]
pub struct ConfigurationSource {
    /// Tag names of registered parser extension tags, lowercased.
    pub extension_tags: Set<&'static str>,
}

/// Processed configuration data for the parser.
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Extension tags registered at runtime, in addition to those in `source`.
    extra_extension_tags: HashSet<UniCase<String>>,
    /// The maximum number of nested parse attempts. Constructs nested deeper
    /// than this are treated as plain text.
    pub max_depth: usize,
    /// Configuration source.
    source: &'static ConfigurationSource,
}

impl core::ops::Deref for Configuration {
    type Target = ConfigurationSource;

    fn deref(&self) -> &Self::Target {
        self.source
    }
}

/// The on-disk format of a configuration override.
///
/// ```json
/// { "extension_tags": ["score", "mapframe"], "max_depth": 128 }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigurationFile {
    /// Additional extension tag names.
    #[serde(default)]
    extension_tags: Vec<String>,
    /// Nesting limit override.
    max_depth: Option<usize>,
}

impl Configuration {
    /// Allocates and returns a new configuration based on the given site
    /// specific configuration.
    #[must_use]
    pub fn new(source: &'static ConfigurationSource) -> Self {
        Self {
            extra_extension_tags: HashSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            source,
        }
    }

    /// Creates a new configuration from `source`, overridden by the JSON
    /// document `json`.
    pub fn from_json(source: &'static ConfigurationSource, json: &str) -> Result<Self, Error> {
        let file = serde_json::from_str::<ConfigurationFile>(json)?;
        let mut this = Self::new(source).with_extension_tags(file.extension_tags)?;
        if let Some(max_depth) = file.max_depth {
            this.max_depth = max_depth;
        }
        Ok(this)
    }

    /// Registers additional parser extension tag names.
    ///
    /// A tag name must be non-empty and must not contain whitespace or `>`.
    pub fn with_extension_tags<I, S>(mut self, names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '>') {
                return Err(Error::InvalidTagName(name));
            }
            self.extra_extension_tags.insert(UniCase::new(name));
        }
        Ok(self)
    }

    /// Sets the maximum number of nested parse attempts.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns true if `name` is a parser extension tag, whose content is raw
    /// text instead of Wikitext.
    pub fn is_parser_extension_tag(&self, name: &str) -> bool {
        contains_ignore_case(&self.extension_tags, name)
            || self
                .extra_extension_tags
                .contains(&UniCase::new(name.to_string()))
    }
}

/// Returns true if any `candidates` case-insensitively match `value`.
#[inline]
fn contains_ignore_case(candidates: &Set<&str>, value: &str) -> bool {
    candidates.contains(&value.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    static SOURCE: ConfigurationSource = ConfigurationSource {
        extension_tags: phf::phf_set! { "ref", "nowiki" },
    };

    #[test]
    fn classify() {
        let config = Configuration::new(&SOURCE);
        assert!(config.is_parser_extension_tag("ref"));
        assert!(config.is_parser_extension_tag("NoWiki"));
        assert!(!config.is_parser_extension_tag("b"));
    }

    #[test]
    fn extra_tags() {
        let config = Configuration::new(&SOURCE)
            .with_extension_tags(["Score"])
            .unwrap();
        assert!(config.is_parser_extension_tag("score"));
        assert!(config.is_parser_extension_tag("SCORE"));

        let config = Configuration::new(&SOURCE)
            .with_extension_tags(["a/b"])
            .unwrap();
        assert!(config.is_parser_extension_tag("a/b"));

        assert!(matches!(
            Configuration::new(&SOURCE).with_extension_tags(["a>"]),
            Err(Error::InvalidTagName(_))
        ));
        assert!(matches!(
            Configuration::new(&SOURCE).with_extension_tags(["a b"]),
            Err(Error::InvalidTagName(name)) if name == "a b"
        ));
        assert!(matches!(
            Configuration::new(&SOURCE).with_extension_tags([""]),
            Err(Error::InvalidTagName(_))
        ));
    }

    #[test]
    fn json() {
        let config =
            Configuration::from_json(&SOURCE, r#"{"extension_tags":["poem"],"max_depth":9}"#)
                .unwrap();
        assert!(config.is_parser_extension_tag("poem"));
        assert_eq!(config.max_depth, 9);

        let config = Configuration::from_json(&SOURCE, "{}").unwrap();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);

        assert!(matches!(
            Configuration::from_json(&SOURCE, r#"{"tags":[]}"#),
            Err(Error::Json(_))
        ));
    }
}
