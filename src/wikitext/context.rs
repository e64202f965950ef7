//! The parse transaction engine.
//!
//! Every grammar production wraps its attempt in exactly one transaction:
//! [`ContextStack::begin`] captures the cursor, and the production ends with
//! either [`ContextStack::commit`] (the cursor stays where it advanced to) or
//! [`ContextStack::rollback`] (the cursor returns to the captured position).
//! Because productions nest, a failure anywhere unwinds one level at a time
//! and the cursor is never left at an intermediate offset.

use super::{
    Spanned,
    terminator::{ClosingTag, ClosingTagMatch, Terminator},
};
use core::hash::{Hash as _, Hasher as _};
use std::hash::DefaultHasher;

/// An in-flight parse attempt.
#[derive(Clone, Debug)]
pub(super) struct ParseContext {
    /// The cursor position when the attempt began.
    pub start_position: usize,
    /// The stop condition added by this attempt.
    pub terminator: Option<Terminator>,
    /// If true, the terminators of enclosing attempts also apply. Otherwise,
    /// this context’s terminator is the only one that applies to its subtree.
    pub reuse_terminator: bool,
}

/// The shared cursor and the stack of in-flight parse attempts for a single
/// document.
#[derive(Debug)]
pub(super) struct ContextStack<'a> {
    /// The input text.
    source: &'a str,
    /// The cursor.
    position: usize,
    /// In-flight parse attempts, innermost last.
    stack: Vec<ParseContext>,
    /// The maximum number of in-flight parse attempts.
    max_depth: usize,
    /// The number of times an attempt was refused because the stack was full.
    depth_refusals: usize,
    /// The deepest nesting reached since the last call to
    /// [`Self::track_peak_depth`].
    peak_depth: usize,
}

impl<'a> ContextStack<'a> {
    /// Creates a new context stack at the start of `source`.
    pub fn new(source: &'a str, max_depth: usize) -> Self {
        Self {
            source,
            position: 0,
            stack: Vec::new(),
            max_depth,
            depth_refusals: 0,
            peak_depth: 0,
        }
    }

    /// The input text.
    #[inline]
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// The cursor.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The number of in-flight parse attempts.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The maximum number of in-flight parse attempts.
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Starts measuring the deepest nesting reached from the current depth,
    /// returning the measurement in progress, which must be passed back to
    /// [`Self::restore_peak_depth`].
    #[inline]
    pub fn track_peak_depth(&mut self) -> usize {
        core::mem::replace(&mut self.peak_depth, self.stack.len())
    }

    /// Ends a measurement started by [`Self::track_peak_depth`], returning the
    /// deepest nesting reached during it.
    #[inline]
    pub fn restore_peak_depth(&mut self, previous: usize) -> usize {
        let peak = self.peak_depth;
        self.peak_depth = previous.max(peak);
        peak
    }

    /// The number of times an attempt was refused because the stack was full.
    #[inline]
    pub fn depth_refusals(&self) -> usize {
        self.depth_refusals
    }

    /// The unconsumed input.
    #[inline]
    pub fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    /// Returns true if the cursor is at the end of the input.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.position >= self.source.len()
    }

    /// Starts a new parse attempt at the cursor.
    ///
    /// Returns `None` without starting an attempt if the stack is full, in
    /// which case the caller must fail.
    #[must_use]
    pub fn begin(&mut self, terminator: Option<&Terminator>, reuse_terminator: bool) -> Option<()> {
        if self.stack.len() >= self.max_depth {
            if self.depth_refusals == 0 {
                log::warn!(
                    "nesting limit of {} reached at offset {}; remaining constructs at this depth are plain text",
                    self.max_depth,
                    self.position
                );
            }
            self.depth_refusals += 1;
            return None;
        }

        self.stack.push(ParseContext {
            start_position: self.position,
            terminator: terminator.cloned(),
            reuse_terminator,
        });
        self.peak_depth = self.peak_depth.max(self.stack.len());
        Some(())
    }

    /// Replaces the terminator of the innermost attempt.
    pub fn set_terminator(&mut self, terminator: Option<&Terminator>) {
        let context = self.stack.last_mut().expect("no parse attempt in progress");
        context.terminator = terminator.cloned();
    }

    /// Ends the innermost attempt successfully, keeping the cursor where it is,
    /// and returns `node` spanning the consumed text.
    pub fn commit<T>(&mut self, node: T) -> Option<Spanned<T>> {
        let context = self.stack.pop().expect("commit without a parse attempt");
        debug_assert!(context.start_position <= self.position);
        Some(Spanned::new(node, context.start_position, self.position))
    }

    /// Ends the innermost attempt successfully without producing a node.
    pub fn accept(&mut self) {
        let context = self.stack.pop().expect("accept without a parse attempt");
        debug_assert!(context.start_position <= self.position);
    }

    /// Ends the innermost attempt unsuccessfully, restoring the cursor to where
    /// it was when the attempt began.
    pub fn rollback<T>(&mut self) -> Option<T> {
        let context = self.stack.pop().expect("rollback without a parse attempt");
        self.position = context.start_position;
        None
    }

    /// Returns true if a nested parse should stop consuming text at the
    /// cursor.
    ///
    /// Terminators are checked from the innermost attempt outwards, stopping
    /// after the first attempt which does not reuse enclosing terminators. The
    /// end of the input always terminates.
    pub fn is_terminated(&self) -> bool {
        if self.is_eof() {
            return true;
        }

        for context in self.stack.iter().rev() {
            if let Some(terminator) = &context.terminator
                && terminator.is_match_at(self.source, self.position)
            {
                return true;
            }
            if !context.reuse_terminator {
                break;
            }
        }

        false
    }

    /// Returns a value which identifies the set of terminators currently in
    /// effect. Two positions with equal fingerprints are subject to the same
    /// stop conditions.
    pub fn terminator_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for context in self.stack.iter().rev() {
            if let Some(terminator) = &context.terminator {
                terminator.id().hash(&mut hasher);
            }
            if !context.reuse_terminator {
                usize::MAX.hash(&mut hasher);
                break;
            }
        }
        hasher.finish()
    }

    /// Returns the next character without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consumes `token` if the input at the cursor starts with it.
    pub fn consume(&mut self, token: &str) -> Option<&'a str> {
        let rest = self.rest();
        if rest.starts_with(token) {
            self.position += token.len();
            Some(&rest[..token.len()])
        } else {
            None
        }
    }

    /// Returns the longest non-empty run of characters matching `predicate` at
    /// the cursor, without consuming it.
    pub fn look_ahead_while(&self, predicate: impl Fn(char) -> bool) -> Option<&'a str> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(_, c)| !predicate(*c))
            .map_or(rest.len(), |(index, _)| index);
        (len != 0).then(|| &rest[..len])
    }

    /// Consumes the longest non-empty run of characters matching `predicate`.
    pub fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> Option<&'a str> {
        let token = self.look_ahead_while(predicate)?;
        self.position += token.len();
        Some(token)
    }

    /// Consumes a non-empty run of whitespace.
    #[inline]
    pub fn consume_whitespace(&mut self) -> Option<&'a str> {
        self.consume_while(char::is_whitespace)
    }

    /// Consumes `quote` if it is immediately followed by whitespace or `>`.
    pub fn consume_closing_quote(&mut self, quote: char) -> Option<&'a str> {
        let mut chars = self.rest().chars();
        if chars.next() == Some(quote)
            && chars.next().is_some_and(|c| c == '>' || c.is_whitespace())
        {
            let start = self.position;
            self.position += quote.len_utf8();
            Some(&self.source[start..self.position])
        } else {
            None
        }
    }

    /// Consumes the closing tag matched by `matcher` at the cursor.
    pub fn consume_closing_tag(&mut self, matcher: &ClosingTag) -> Option<ClosingTagMatch<'a>> {
        let found = matcher.match_at(self.source, self.position)?;
        self.position = found.end;
        Some(found)
    }

    /// Consumes everything up to and including the next closing tag matched by
    /// `matcher`, returning the skipped text and the closing tag.
    pub fn consume_through_closing_tag(
        &mut self,
        matcher: &ClosingTag,
    ) -> Option<(&'a str, ClosingTagMatch<'a>)> {
        let found = matcher.find(self.source, self.position)?;
        let skipped = &self.source[self.position..found.start];
        self.position = found.end;
        Some((skipped, found))
    }

    /// Moves the cursor forward by `len` bytes.
    #[inline]
    pub fn advance(&mut self, len: usize) {
        debug_assert!(self.source.is_char_boundary(self.position + len));
        self.position += len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikitext::terminator::Matchers;

    #[test]
    fn rollback_restores_position() {
        let mut stack = ContextStack::new("{{{a}}}", 8);
        stack.begin(None, true).unwrap();
        assert_eq!(stack.consume("{{{"), Some("{{{"));
        stack.begin(None, true).unwrap();
        assert_eq!(stack.consume("a"), Some("a"));
        assert_eq!(stack.rollback::<()>(), None);
        assert_eq!(stack.position(), 3);
        assert_eq!(stack.rollback::<()>(), None);
        assert_eq!(stack.position(), 0);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn commit_spans_consumed_text() {
        let mut stack = ContextStack::new("ab", 8);
        stack.consume("a");
        stack.begin(None, true).unwrap();
        stack.consume("b");
        let node = stack.commit("b").unwrap();
        assert_eq!((node.span.start, node.span.end), (1, 2));
        assert_eq!(stack.position(), 2);
    }

    #[test]
    fn terminators_chain_until_override() {
        let matchers = Matchers::new();
        let pipe = matchers.terminator(r"\|");
        let equals = matchers.terminator("=");
        let mut stack = ContextStack::new("|=x", 8);

        stack.begin(Some(&pipe), false).unwrap();
        stack.begin(Some(&equals), true).unwrap();
        assert!(stack.is_terminated());
        stack.advance(1);
        assert!(stack.is_terminated());
        stack.advance(1);
        assert!(!stack.is_terminated());

        stack.position = 0;
        stack.begin(Some(&equals), false).unwrap();
        assert!(!stack.is_terminated());
        stack.set_terminator(None);
        assert!(!stack.is_terminated());
    }

    #[test]
    fn transparent_context_inherits() {
        let matchers = Matchers::new();
        let pipe = matchers.terminator(r"\|");
        let mut stack = ContextStack::new("|", 8);
        stack.begin(Some(&pipe), false).unwrap();
        let outer = stack.terminator_fingerprint();
        stack.begin(None, true).unwrap();
        assert!(stack.is_terminated());
        assert_eq!(stack.terminator_fingerprint(), outer);
    }

    #[test]
    fn eof_terminates() {
        let stack = ContextStack::new("", 8);
        assert!(stack.is_terminated());
    }

    #[test]
    fn depth_limit() {
        let mut stack = ContextStack::new("", 2);
        assert!(stack.begin(None, true).is_some());
        assert!(stack.begin(None, true).is_some());
        assert!(stack.begin(None, true).is_none());
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.depth_refusals(), 1);
    }

    #[test]
    fn peak_depth() {
        let mut stack = ContextStack::new("", 8);
        stack.begin(None, true).unwrap();
        let outer = stack.track_peak_depth();
        stack.begin(None, true).unwrap();
        stack.begin(None, true).unwrap();
        stack.rollback::<()>();
        stack.rollback::<()>();
        assert_eq!(stack.restore_peak_depth(outer), 3);
        stack.accept();
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn closing_quote_needs_boundary() {
        let mut stack = ContextStack::new("'x' '>'", 8);
        assert_eq!(stack.consume_closing_quote('\''), None);
        stack.advance(2);
        assert_eq!(stack.consume_closing_quote('\''), Some("'"));
        stack.advance(1);
        assert_eq!(stack.consume_closing_quote('\''), Some("'"));
        stack.advance(1);
        // End of input is not a boundary
        assert_eq!(stack.consume_closing_quote('\''), None);
    }
}
