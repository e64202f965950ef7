//! Compiled stop conditions for nested parses.
//!
//! A [`Terminator`] answers one question: does the text at a given offset
//! match the pattern? Patterns are compiled once per distinct pattern string
//! and kept in a [`Matchers`] cache, which is owned by a
//! [`Parser`](super::Parser) and can be shared by any number of parses,
//! including parses running on other threads.

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// An immutable compiled pattern that is anchored to the position it is tested
/// against.
#[derive(Clone, Debug)]
pub(crate) struct Terminator {
    /// A unique identifier for the pattern within its cache.
    id: usize,
    /// The anchored pattern.
    pattern: Arc<Regex>,
}

impl Terminator {
    /// The unique identifier of the pattern within the cache that created it.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns true if the text at `pos` in `source` matches this terminator.
    #[inline]
    pub fn is_match_at(&self, source: &str, pos: usize) -> bool {
        self.pattern.is_match(&source[pos..])
    }
}

impl PartialEq for Terminator {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Terminator {}

/// A closing tag found in the source text.
///
/// ```wikitext
/// <b>text</B >
///        ^^^^^
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ClosingTagMatch<'a> {
    /// The offset of the `<`.
    pub start: usize,
    /// The offset after the `>`.
    pub end: usize,
    /// The tag name, as spelled in the source.
    pub name: &'a str,
    /// The whitespace between the tag name and the `>`.
    pub trailing_whitespace: &'a str,
}

/// A case-insensitive matcher for `</name\s*>`.
#[derive(Clone, Debug)]
pub(crate) struct ClosingTag {
    /// The anchored form of the pattern, for use as a content terminator and
    /// for consuming the closing tag at the cursor.
    terminator: Terminator,
    /// The unanchored form of the pattern, for searching ahead.
    search: Arc<Regex>,
}

impl ClosingTag {
    /// The terminator which stops a nested parse at this closing tag.
    #[inline]
    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }

    /// Matches the closing tag exactly at `pos`.
    pub fn match_at<'a>(&self, source: &'a str, pos: usize) -> Option<ClosingTagMatch<'a>> {
        Self::to_match(&self.terminator.pattern, source, pos)
    }

    /// Finds the first closing tag at or after `pos`.
    pub fn find<'a>(&self, source: &'a str, pos: usize) -> Option<ClosingTagMatch<'a>> {
        Self::to_match(&self.search, source, pos)
    }

    /// Returns true if a closing tag exists anywhere at or after `pos`.
    #[inline]
    pub fn occurs_after(&self, source: &str, pos: usize) -> bool {
        self.search.is_match(&source[pos..])
    }

    /// Converts the captures of `pattern` into a [`ClosingTagMatch`] with
    /// offsets relative to the start of `source`.
    fn to_match<'a>(pattern: &Regex, source: &'a str, pos: usize) -> Option<ClosingTagMatch<'a>> {
        let captures = pattern.captures(&source[pos..])?;
        let whole = captures.get(0)?;
        let name = captures.get(1)?;
        let trailing_whitespace = captures.get(2)?;
        Some(ClosingTagMatch {
            start: pos + whole.start(),
            end: pos + whole.end(),
            name: &source[pos + name.start()..pos + name.end()],
            trailing_whitespace: &source
                [pos + trailing_whitespace.start()..pos + trailing_whitespace.end()],
        })
    }
}

/// A cache of compiled terminators and closing tag matchers.
///
/// Cloning a `Matchers` produces a handle to the same cache. Lookups take a
/// shared lock; a miss compiles the pattern outside of the lock and then takes
/// an exclusive lock to insert it, so two threads racing on the same new
/// pattern both succeed and the first insertion wins.
#[derive(Clone, Debug, Default)]
pub struct Matchers {
    /// The shared cache state.
    inner: Arc<Inner>,
}

/// Shared state for [`Matchers`].
#[derive(Debug, Default)]
struct Inner {
    /// Closing tag matchers, keyed by lowercased tag name.
    closing_tags: RwLock<HashMap<String, ClosingTag>>,
    /// The next unused terminator identifier.
    next_id: AtomicUsize,
    /// Terminators, keyed by pattern string.
    terminators: RwLock<HashMap<String, Terminator>>,
}

impl Matchers {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of distinct closing tag matchers compiled so far.
    pub fn closing_tag_count(&self) -> usize {
        self.inner.closing_tags.read().len()
    }

    /// The number of distinct terminators compiled so far, excluding closing
    /// tag matchers.
    pub fn terminator_count(&self) -> usize {
        self.inner.terminators.read().len()
    }

    /// Gets the terminator for `pattern`, compiling it on first use.
    ///
    /// # Panics
    ///
    /// If `pattern` is not a valid regular expression. Only patterns built
    /// into the grammar are passed here.
    pub(crate) fn terminator(&self, pattern: &str) -> Terminator {
        if let Some(terminator) = self.inner.terminators.read().get(pattern) {
            return terminator.clone();
        }

        let terminator = Terminator {
            id: self.next_id(),
            pattern: Arc::new(anchored(pattern, false)),
        };
        log::trace!("compiled terminator {pattern:?}");
        self.inner
            .terminators
            .write()
            .entry(pattern.to_string())
            .or_insert(terminator)
            .clone()
    }

    /// Gets the closing tag matcher for a lowercased tag name, compiling it on
    /// first use.
    pub(crate) fn closing_tag(&self, lowercased_name: &str) -> ClosingTag {
        debug_assert_eq!(lowercased_name, lowercased_name.to_lowercase());

        if let Some(matcher) = self.inner.closing_tags.read().get(lowercased_name) {
            return matcher.clone();
        }

        let pattern = format!(r"</({})(\s*)>", regex::escape(lowercased_name));
        let matcher = ClosingTag {
            terminator: Terminator {
                id: self.next_id(),
                pattern: Arc::new(anchored(&pattern, true)),
            },
            search: Arc::new(build(&pattern, true)),
        };
        log::trace!("compiled closing tag matcher for <{lowercased_name}>");
        self.inner
            .closing_tags
            .write()
            .entry(lowercased_name.to_string())
            .or_insert(matcher)
            .clone()
    }

    /// Allocates a new terminator identifier.
    #[inline]
    fn next_id(&self) -> usize {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Compiles `pattern` so that it only matches at the start of the haystack.
fn anchored(pattern: &str, case_insensitive: bool) -> Regex {
    build(&format!("^(?:{pattern})"), case_insensitive)
}

/// Compiles `pattern`.
fn build(pattern: &str, case_insensitive: bool) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .unwrap()
}

/// The fixed set of terminators used by the grammar productions.
#[derive(Clone, Debug)]
pub(crate) struct Terminators {
    /// `{{{name|default}}}`
    pub argument_reference: Terminator,
    /// `<tag name=value>`
    pub attribute_name: Terminator,
    /// `<tag name="value">`
    pub double_quoted_value: Terminator,
    /// `<tag name='value'>`
    pub single_quoted_value: Terminator,
    /// `{{name|arg}}`
    pub template: Terminator,
    /// `{{name|key=value}}`
    pub template_argument: Terminator,
    /// `<tag name=value>`
    pub unquoted_value: Terminator,
}

impl Terminators {
    /// Compiles (or retrieves) the grammar terminators from `matchers`.
    pub fn new(matchers: &Matchers) -> Self {
        Self {
            argument_reference: matchers.terminator(r"\}\}\}|\|"),
            attribute_name: matchers.terminator(r"/?>|[\s=]"),
            double_quoted_value: matchers.terminator(r#"[>"]|/>"#),
            single_quoted_value: matchers.terminator(r"[>']|/>"),
            template: matchers.terminator(r"\}\}|\|"),
            template_argument: matchers.terminator("="),
            unquoted_value: matchers.terminator(r"[>\s]|/>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_is_anchored() {
        let matchers = Matchers::new();
        let t = matchers.terminator(r"\}\}|\|");
        assert!(t.is_match_at("a}}", 1));
        assert!(t.is_match_at("a|b", 1));
        assert!(!t.is_match_at("a}}", 0));
        assert!(!t.is_match_at("a}b", 1));
    }

    #[test]
    fn terminators_are_cached() {
        let matchers = Matchers::new();
        let a = matchers.terminator("=");
        let b = matchers.clone().terminator("=");
        let c = matchers.terminator(r"\|");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(matchers.terminator_count(), 2);
    }

    #[test]
    fn closing_tag_is_case_insensitive() {
        let matchers = Matchers::new();
        let closing = matchers.closing_tag("b");
        let source = "x</B >y";
        assert_eq!(
            closing.match_at(source, 1),
            Some(ClosingTagMatch {
                start: 1,
                end: 6,
                name: "B",
                trailing_whitespace: " ",
            })
        );
        assert!(closing.terminator().is_match_at(source, 1));
        assert_eq!(closing.match_at(source, 0), None);
        assert_eq!(closing.find(source, 0).map(|m| m.start), Some(1));
        assert!(closing.occurs_after(source, 1));
        assert!(!closing.occurs_after(source, 2));
        assert_eq!(matchers.closing_tag_count(), 1);
        matchers.closing_tag("b");
        assert_eq!(matchers.closing_tag_count(), 1);
    }

    #[test]
    fn closing_tag_name_is_escaped() {
        let matchers = Matchers::new();
        let closing = matchers.closing_tag("a.b");
        assert!(closing.match_at("</A.B>", 0).is_some());
        assert!(closing.match_at("</axb>", 0).is_none());
    }

    #[test]
    fn matchers_are_shared_across_threads() {
        let matchers = Matchers::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let matchers = matchers.clone();
                scope.spawn(move || {
                    matchers.closing_tag("ref");
                    matchers.terminator("=");
                });
            }
        });
        assert_eq!(matchers.closing_tag_count(), 1);
        assert_eq!(matchers.terminator_count(), 1);
    }
}
