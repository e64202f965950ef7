//! MediaWiki configuration.
//!
//! Wikitext documents are not self-encapsulated and cannot be parsed without
//! out-of-band configuration data. The parser core only needs to know which
//! tags are parser extension tags, whose content is opaque to Wikitext.

use crate::wikitext::{Configuration, ConfigurationSource};
use std::sync::LazyLock;

/// The static source configuration for a stock Wikimedia installation.
pub static CONFIG_SOURCE: ConfigurationSource = ConfigurationSource {
    extension_tags: phf::phf_set! {
        "pre", "nowiki", "gallery", "indicator", "langconvert", "graph", "timeline",
        "hiero", "charinsert", "ref", "references", "inputbox", "imagemap", "source",
        "syntaxhighlight", "poem", "categorytree", "section", "score", "templatestyles",
        "templatedata", "math", "ce", "chem", "maplink", "mapframe", "page-collection",
        "phonos"
    },
};

/// The installation configuration, suitable for runtime use.
pub static CONFIG: LazyLock<Configuration> = LazyLock::new(|| Configuration::new(&CONFIG_SOURCE));
