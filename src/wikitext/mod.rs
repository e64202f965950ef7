//! Wikitext parser.
//!
//! Wikitext has no context-free grammar. Brace runs, XML-like tags, and
//! attribute values are all locally ambiguous, so the parser resolves them by
//! trial: each production runs inside a transaction which either commits or
//! rolls the cursor back so that the caller can try the next alternative. See
//! [`context`] for the transaction engine and [`terminator`] for the stop
//! conditions that tell nested parses where to end.

pub use codemap::{FileMap, LineCol, Span, Spanned};
pub use config::{Configuration, ConfigurationSource, DEFAULT_MAX_DEPTH};
pub use helpers::{Serializer, TextContent, to_wikitext};
use serde::Serialize;
pub use terminator::Matchers;

mod codemap;
mod config;
mod context;
pub mod helpers;
mod parser;
mod terminator;
#[cfg(test)]
mod tests;
pub mod visit;

/// A configuration error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An extension tag name could never match the tag grammar.
    #[error("invalid extension tag name {0:?}")]
    InvalidTagName(String),

    /// A configuration file could not be decoded.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// A Wikitext parser.
///
/// A parser can be used for any number of documents. Cloning a parser, or
/// creating one with [`Parser::with_matchers`], shares its compiled pattern
/// cache, so parsers on different threads do not each recompile the closing
/// tag matchers for the same tags.
#[derive(Clone, Debug)]
pub struct Parser<'c> {
    /// The configuration for the parser.
    config: &'c Configuration,
    /// The compiled pattern cache.
    matchers: Matchers,
    /// Terminators used by the grammar productions.
    terminators: terminator::Terminators,
}

impl<'c> Parser<'c> {
    /// Creates a new parser with the given configuration.
    pub fn new(config: &'c Configuration) -> Self {
        Self::with_matchers(config, Matchers::new())
    }

    /// Creates a new parser with the given configuration which uses an
    /// existing pattern cache.
    pub fn with_matchers(config: &'c Configuration, matchers: Matchers) -> Self {
        let terminators = terminator::Terminators::new(&matchers);
        Self {
            config,
            matchers,
            terminators,
        }
    }

    /// The compiled pattern cache used by this parser.
    pub fn matchers(&self) -> &Matchers {
        &self.matchers
    }

    /// Parses Wikitext from `source` into a syntax tree.
    ///
    /// Parsing never fails. Malformed constructs become plain text, and
    /// unterminated comments run to the end of the input.
    pub fn parse<'a>(&self, source: &'a str) -> Output<'a> {
        let mut grammar = parser::Grammar::new(self, source);
        let root = grammar.parse_document();
        let stats = grammar.finish();
        log::debug!(
            "parsed {} bytes into {} nodes ({} memoised failures, {} reused, {} closing tag matchers cached)",
            source.len(),
            root.len(),
            stats.failures,
            stats.failure_hits,
            self.matchers.closing_tag_count(),
        );
        Output { root, stats }
    }
}

/// The parser output.
#[derive(Debug)]
pub struct Output<'a> {
    /// The syntax tree.
    pub root: Wikitext<'a>,
    /// Information about the work done by the parser.
    pub stats: Stats,
}

/// Information about the work done by the parser for one document.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// The number of distinct production failures that were memoised.
    pub failures: usize,
    /// The number of times a memoised failure was reused instead of
    /// reparsing.
    pub failure_hits: usize,
    /// The number of parse attempts refused because the nesting limit was
    /// reached.
    pub depth_refusals: usize,
}

/// A sequence of Wikitext nodes.
pub type Wikitext<'a> = Vec<Spanned<Node<'a>>>;

/// A sequence of inline nodes parsed with a restricted grammar, such as a
/// template name.
pub type Run<'a> = Vec<Spanned<Node<'a>>>;

/// A Wikitext syntax node.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Node<'a> {
    /// A template argument reference.
    ///
    /// ```wikitext
    /// {{{name|default}}}
    /// ```
    ArgumentReference {
        /// The argument name.
        name: Wikitext<'a>,
        /// The default value, if one was given. Any further `|`-separated
        /// segments are parsed but not retained.
        default: Option<Wikitext<'a>>,
    },
    /// An HTML comment.
    Comment {
        /// The raw contents of the comment.
        content: &'a str,
        /// Whether the comment ran to the end of the input without a `-->`.
        unclosed: bool,
    },
    /// An XML-like tag.
    Tag(Box<Tag<'a>>),
    /// A template transclusion.
    ///
    /// ```wikitext
    /// {{name|value|key=value}}
    /// ```
    Template {
        /// The template name.
        name: Run<'a>,
        /// The template arguments.
        arguments: Vec<Spanned<TemplateArgument<'a>>>,
    },
    /// A run of plain text.
    Text(&'a str),
}

/// A template argument.
///
/// ```wikitext
/// {{name|value|key=value}}
///        ^^^^^ ^^^^^^^^^
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TemplateArgument<'a> {
    /// The argument name, if the argument contained a `=`.
    pub name: Option<Wikitext<'a>>,
    /// The argument value.
    pub value: Wikitext<'a>,
}

/// An XML-like tag, with its content and closing tag.
///
/// ```wikitext
/// <name attr="value" >content</Name >
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Tag<'a> {
    /// The tag name, as spelled in the opening tag.
    pub name: &'a str,
    /// The tag attributes.
    pub attributes: Vec<Spanned<TagAttribute<'a>>>,
    /// Whether the opening tag ended with `/>`.
    pub self_closing: bool,
    /// Whitespace between the last attribute (or the name) and the end of the
    /// opening tag.
    pub trailing_whitespace: Option<&'a str>,
    /// The tag content.
    pub content: TagContent<'a>,
    /// The closing tag name, only if it is spelled differently from `name`.
    pub closing_tag_name: Option<&'a str>,
    /// Whitespace between the closing tag name and its `>`.
    pub closing_tag_trailing_whitespace: Option<&'a str>,
}

impl Tag<'_> {
    /// Returns true if this is a parser extension tag.
    #[inline]
    pub fn is_parser_tag(&self) -> bool {
        matches!(self.content, TagContent::Parser(_))
    }
}

/// The kind and content of an XML-like tag. The content is `None` when the
/// tag is self-closing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum TagContent<'a> {
    /// A parser extension tag, whose content is not Wikitext.
    ///
    /// ```wikitext
    /// <ref>raw [[text]]</ref>
    /// ```
    Parser(Option<&'a str>),
    /// An HTML tag, whose content is Wikitext.
    ///
    /// ```wikitext
    /// <span>''parsed'' {{text}}</span>
    /// ```
    Html(Option<Wikitext<'a>>),
}

/// The quotation style of a tag attribute value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum ValueQuote {
    /// `name=value`
    #[default]
    None,
    /// `name='value'`
    Single,
    /// `name="value"`
    Double,
}

impl ValueQuote {
    /// The quote character.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueQuote::None => "",
            ValueQuote::Single => "'",
            ValueQuote::Double => "\"",
        }
    }
}

/// An XML-like tag attribute.
///
/// ```wikitext
/// <tag name = "value">
///     ^^^^^^^^^^^^^^^
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TagAttribute<'a> {
    /// The attribute name. This is only `None` for the malformed `<tag =value>`.
    pub name: Option<Run<'a>>,
    /// The attribute value, excluding quotes, if there was a `=`.
    pub value: Option<Wikitext<'a>>,
    /// The quotation style of the value.
    pub quote: ValueQuote,
    /// The whitespace which separates the attribute from whatever precedes it.
    pub leading_whitespace: &'a str,
    /// The whitespace between the name and the `=`.
    pub whitespace_before_eq: Option<&'a str>,
    /// The whitespace between the `=` and the value.
    pub whitespace_after_eq: Option<&'a str>,
}
