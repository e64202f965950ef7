//! Grammar productions for Wikitext documents.
//!
//! Each production is a method which returns `Some` node and leaves the
//! cursor after the consumed text, or returns `None` and leaves the cursor
//! exactly where it was. Callers treat `None` as “try the next alternative”;
//! it is not an error.

use super::{
    Configuration, Node, Parser, Run, Spanned, Stats, Tag, TagAttribute, TagContent,
    TemplateArgument, ValueQuote, Wikitext,
    context::ContextStack,
    terminator::{Matchers, Terminators},
};
use std::collections::{HashMap, HashSet};

/// The restricted inline grammars.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum RunMode {
    /// Any inline construct.
    Run,
    /// Only plain text, comments, and brace constructs. Used for template
    /// names.
    ExpandableText,
}

/// Productions whose failures are memoised.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Production {
    /// `{{{name}}}`
    ArgumentReference,
    /// `<name>`
    Tag,
    /// `{{name}}`
    Template,
}

/// A production that failed at an offset under a set of terminators.
type FailureKey = (Production, usize, u64);

/// Parser state for a single document.
pub(super) struct Grammar<'p, 'a> {
    /// The parser configuration.
    config: &'p Configuration,
    /// The compiled pattern cache.
    matchers: &'p Matchers,
    /// Terminators used by the productions.
    terminators: &'p Terminators,
    /// The cursor and in-flight parse attempts.
    stack: ContextStack<'a>,
    /// Productions known to fail, and how many levels of nesting they used.
    ///
    /// A production is a pure function of the cursor, the terminators in
    /// effect, and the nesting depth, so a failure can be reused whenever the
    /// same production is attempted again at the same offset under the same
    /// terminators with enough room left to nest just as deeply. Without this,
    /// inputs like `{{a|{{a|{{a|…` with no closing braces take exponential
    /// time.
    failures: HashMap<FailureKey, usize>,
    /// Productions known to fail at a specific depth because the nesting limit
    /// was reached.
    limited_failures: HashSet<(FailureKey, usize)>,
    /// The number of times an entry in `failures` was reused.
    failure_hits: usize,
}

impl<'p, 'a> Grammar<'p, 'a> {
    /// Creates parser state for `source`.
    pub fn new(parser: &'p Parser<'_>, source: &'a str) -> Self {
        Self {
            config: parser.config,
            matchers: &parser.matchers,
            terminators: &parser.terminators,
            stack: ContextStack::new(source, parser.config.max_depth),
            failures: HashMap::new(),
            limited_failures: HashSet::new(),
            failure_hits: 0,
        }
    }

    /// The cursor.
    #[cfg(test)]
    #[inline]
    pub fn position(&self) -> usize {
        self.stack.position()
    }

    /// Consumes the parser state and returns statistics about the parse.
    pub fn finish(self) -> Stats {
        Stats {
            failures: self.failures.len() + self.limited_failures.len(),
            failure_hits: self.failure_hits,
            depth_refusals: self.stack.depth_refusals(),
        }
    }

    /// Parses the whole document.
    pub fn parse_document(&mut self) -> Wikitext<'a> {
        let root = self.parse_wikitext();
        debug_assert!(self.stack.is_eof());
        debug_assert_eq!(self.stack.depth(), 0);
        root
    }

    /// Parses Wikitext until the terminators in effect match or the input ends.
    /// This never fails, but may return an empty list.
    pub fn parse_wikitext(&mut self) -> Wikitext<'a> {
        self.parse_inline_nodes(RunMode::Run)
    }

    /// Parses a non-empty run of inline content using the restricted grammar
    /// `mode`.
    pub fn parse_run(&mut self, mode: RunMode) -> Option<Run<'a>> {
        self.stack.begin(None, true)?;
        let nodes = self.parse_inline_nodes(mode);
        if nodes.is_empty() {
            self.stack.rollback()
        } else {
            self.stack.commit(nodes).map(|run| run.node)
        }
    }

    /// Parses inline nodes until the terminators in effect match.
    fn parse_inline_nodes(&mut self, mode: RunMode) -> Wikitext<'a> {
        let mut nodes = Vec::new();
        while !self.stack.is_terminated() {
            if let Some(node) = self.parse_inline(mode) {
                self.push_node(&mut nodes, node);
            } else {
                self.parse_plain_text(&mut nodes);
            }
        }
        nodes
    }

    /// Tries every construct that could start at the cursor.
    fn parse_inline(&mut self, mode: RunMode) -> Option<Spanned<Node<'a>>> {
        match self.stack.peek()? {
            '<' => self.parse_comment().or_else(|| {
                if mode == RunMode::Run {
                    self.parse_tag()
                } else {
                    None
                }
            }),
            '{' => self.parse_braces(),
            _ => None,
        }
    }

    /// Appends `node` to `nodes`, merging it into the previous node if both are
    /// contiguous text.
    fn push_node(&self, nodes: &mut Wikitext<'a>, node: Spanned<Node<'a>>) {
        if matches!(node.node, Node::Text(_))
            && let Some(last) = nodes.last_mut()
            && matches!(last.node, Node::Text(_))
            && last.span.end == node.span.start
        {
            last.span.end = node.span.end;
            last.node = Node::Text(&self.stack.source()[last.span.into_range()]);
        } else {
            nodes.push(node);
        }
    }

    /// Consumes at least one character of plain text, then continues up to the
    /// next character that could start another construct.
    fn parse_plain_text(&mut self, nodes: &mut Wikitext<'a>) {
        let start = self.stack.position();
        let Some(first) = self.stack.peek() else {
            return;
        };
        self.stack.advance(first.len_utf8());
        while !self.stack.is_terminated()
            && let Some(c) = self.stack.peek()
            && !matches!(c, '<' | '{')
        {
            self.stack.advance(c.len_utf8());
        }

        let end = self.stack.position();
        let text = Node::Text(&self.stack.source()[start..end]);
        self.push_node(nodes, Spanned::new(text, start, end));
    }

    /// An HTML comment. An unterminated comment runs to the end of the input.
    ///
    /// ```wikitext
    /// <!-- content -->
    /// ```
    pub fn parse_comment(&mut self) -> Option<Spanned<Node<'a>>> {
        self.stack.begin(None, true)?;
        if self.stack.consume("<!--").is_none() {
            return self.stack.rollback();
        }

        let rest = self.stack.rest();
        let node = if let Some(end) = memchr::memmem::find(rest.as_bytes(), b"-->") {
            self.stack.advance(end + "-->".len());
            Node::Comment {
                content: &rest[..end],
                unclosed: false,
            }
        } else {
            self.stack.advance(rest.len());
            Node::Comment {
                content: rest,
                unclosed: true,
            }
        };
        self.stack.commit(node)
    }

    /// Resolves a run of `{` into an argument reference, a template, or plain
    /// text.
    ///
    /// The run is only looked at, not consumed. Declining (returning `None`)
    /// makes the caller consume one `{` as plain text and try again at the
    /// next brace, which reduces a run of 4 to a run of 3:
    ///
    /// ```text
    /// 4:   {{{{·}}}}   →   {·{{{·}}}·}
    /// 5:  {{{{{·}}}}}  →  {{·{{{·}}}·}}  (if that fails, 4 and then 3)
    /// 6+: {{{{{{·…     →  printed as-is
    /// ```
    ///
    /// Precedence: argument references win over templates.
    pub fn parse_braces(&mut self) -> Option<Spanned<Node<'a>>> {
        let braces = self.stack.look_ahead_while(|c| c == '{')?.len();
        match braces {
            0 | 1 | 4 => None,
            2 | 3 => self
                .parse_argument_reference()
                .or_else(|| self.parse_template()),
            5 => self.parse_template(),
            _ => {
                self.stack.begin(None, true)?;
                match self.stack.consume_while(|c| c == '{') {
                    Some(braces) => self.stack.commit(Node::Text(braces)),
                    None => self.stack.rollback(),
                }
            }
        }
    }

    /// A template argument reference.
    ///
    /// ```wikitext
    /// {{{name|default|discarded}}}
    /// ```
    pub fn parse_argument_reference(&mut self) -> Option<Spanned<Node<'a>>> {
        self.memoize(Production::ArgumentReference, |this| {
            let terminators = this.terminators;
            this.stack
                .begin(Some(&terminators.argument_reference), false)?;
            if this.stack.consume("{{{").is_none() {
                return this.stack.rollback();
            }

            let name = this.parse_wikitext();
            let default = this.stack.consume("|").map(|_| this.parse_wikitext());
            // Extra segments are still parsed so that something like
            // `{{{a|b|c{{d}}}}}` consumes `{{d}}` before looking for `}}}`
            while this.stack.consume("|").is_some() {
                let _ = this.parse_wikitext();
            }

            if this.stack.consume("}}}").is_none() {
                return this.stack.rollback();
            }
            this.stack.commit(Node::ArgumentReference { name, default })
        })
    }

    /// A template.
    ///
    /// ```wikitext
    /// {{name|value|key=value}}
    /// ```
    pub fn parse_template(&mut self) -> Option<Spanned<Node<'a>>> {
        self.memoize(Production::Template, |this| {
            let terminators = this.terminators;
            this.stack.begin(Some(&terminators.template), false)?;
            if this.stack.consume("{{").is_none() {
                return this.stack.rollback();
            }

            let Some(name) = this.parse_run(RunMode::ExpandableText) else {
                return this.stack.rollback();
            };

            let mut arguments = Vec::new();
            while this.stack.consume("|").is_some() {
                let Some(argument) = this.parse_template_argument() else {
                    return this.stack.rollback();
                };
                arguments.push(argument);
            }

            if this.stack.consume("}}").is_none() {
                return this.stack.rollback();
            }
            debug_assert!(!name.is_empty());
            this.stack.commit(Node::Template { name, arguments })
        })
    }

    /// A template argument. Fails only if the nesting limit is reached.
    ///
    /// ```wikitext
    /// {{name|value|key=value}}
    ///        ^^^^^ ^^^^^^^^^
    /// ```
    pub fn parse_template_argument(&mut self) -> Option<Spanned<TemplateArgument<'a>>> {
        let terminators = self.terminators;
        self.stack
            .begin(Some(&terminators.template_argument), true)?;
        let segment = self.parse_wikitext();
        if self.stack.consume("=").is_some() {
            // Only the first `=` separates the name from the value
            self.stack.set_terminator(None);
            let value = self.parse_wikitext();
            self.stack.commit(TemplateArgument {
                name: Some(segment),
                value,
            })
        } else {
            self.stack.commit(TemplateArgument {
                name: None,
                value: segment,
            })
        }
    }

    /// An XML-like tag.
    ///
    /// ```wikitext
    /// <name attr="value">content</name>
    /// <name attr="value" />
    /// ```
    pub fn parse_tag(&mut self) -> Option<Spanned<Node<'a>>> {
        self.memoize(Production::Tag, |this| {
            this.stack.begin(None, true)?;
            if this.stack.consume("<").is_none() {
                return this.stack.rollback();
            }

            let Some(name) = this.consume_tag_name() else {
                return this.stack.rollback();
            };
            let is_parser_tag = this.config.is_parser_extension_tag(name);

            let mut attributes = Vec::new();
            let mut whitespace = this.stack.consume_whitespace();
            let self_closing = loop {
                if this.stack.consume("/>").is_some() {
                    break true;
                } else if this.stack.consume(">").is_some() {
                    break false;
                }

                // Attributes must be separated by whitespace, and something
                // must be consumed, or else this is not a tag.
                let Some(leading_whitespace) = whitespace else {
                    return this.stack.rollback();
                };
                let Some(attribute) = this.parse_tag_attribute(leading_whitespace) else {
                    return this.stack.rollback();
                };
                attributes.push(attribute);
                whitespace = this.stack.consume_whitespace();
            };

            let mut tag = Tag {
                name,
                attributes,
                self_closing,
                trailing_whitespace: whitespace,
                content: if is_parser_tag {
                    TagContent::Parser(None)
                } else {
                    TagContent::Html(None)
                },
                closing_tag_name: None,
                closing_tag_trailing_whitespace: None,
            };

            if self_closing {
                return this.stack.commit(Node::Tag(Box::new(tag)));
            }

            let closing = this.matchers.closing_tag(&name.to_lowercase());
            let found = if is_parser_tag {
                let Some((content, found)) = this.stack.consume_through_closing_tag(&closing)
                else {
                    return this.stack.rollback();
                };
                tag.content = TagContent::Parser(Some(content));
                found
            } else {
                if !closing.occurs_after(this.stack.source(), this.stack.position())
                    || this.stack.begin(Some(closing.terminator()), false).is_none()
                {
                    return this.stack.rollback();
                }
                let content = this.parse_wikitext();
                this.stack.accept();

                let Some(found) = this.stack.consume_closing_tag(&closing) else {
                    return this.stack.rollback();
                };
                tag.content = TagContent::Html(Some(content));
                found
            };

            tag.closing_tag_name = (found.name != name).then_some(found.name);
            tag.closing_tag_trailing_whitespace = Some(found.trailing_whitespace);
            this.stack.commit(Node::Tag(Box::new(tag)))
        })
    }

    /// Consumes a tag name, which runs up to whitespace, `>`, or the `/` of a
    /// `/>`.
    ///
    /// ```wikitext
    /// <a/b>content</a/b>
    ///  ^^^
    /// <br/>
    ///  ^^
    /// ```
    fn consume_tag_name(&mut self) -> Option<&'a str> {
        let rest = self.stack.rest();
        let len = rest
            .char_indices()
            .find(|&(index, c)| {
                c == '>' || c.is_whitespace() || (c == '/' && rest[index + 1..].starts_with('>'))
            })
            .map_or(rest.len(), |(index, _)| index);
        if len == 0 {
            return None;
        }
        self.stack.advance(len);
        Some(&rest[..len])
    }

    /// A tag attribute. The whitespace before the attribute has already been
    /// consumed by the caller and is stored, but is not part of the span.
    ///
    /// ```wikitext
    /// <name attr = "value">
    ///       ^^^^^^^^^^^^^^
    /// ```
    pub fn parse_tag_attribute(
        &mut self,
        leading_whitespace: &'a str,
    ) -> Option<Spanned<TagAttribute<'a>>> {
        self.stack.begin(None, true)?;
        let mut attribute = TagAttribute {
            name: self.parse_attribute_name(),
            value: None,
            quote: ValueQuote::None,
            leading_whitespace,
            whitespace_before_eq: None,
            whitespace_after_eq: None,
        };

        let before_eq = self.stack.look_ahead_while(char::is_whitespace);
        let before_eq_len = before_eq.map_or(0, str::len);
        if self.stack.rest()[before_eq_len..].starts_with('=') {
            self.stack.advance(before_eq_len + "=".len());
            attribute.whitespace_before_eq = before_eq;
            attribute.whitespace_after_eq = self.stack.consume_whitespace();

            let Some((value, quote)) = [ValueQuote::Single, ValueQuote::Double, ValueQuote::None]
                .into_iter()
                .find_map(|quote| self.parse_attribute_value(quote).map(|value| (value, quote)))
            else {
                return self.stack.rollback();
            };
            attribute.value = Some(value);
            attribute.quote = quote;
        } else if attribute.name.is_none() {
            return self.stack.rollback();
        }

        self.stack.commit(attribute)
    }

    /// A tag attribute name.
    ///
    /// ```wikitext
    /// <name attr="value">
    ///       ^^^^
    /// ```
    pub fn parse_attribute_name(&mut self) -> Option<Run<'a>> {
        let terminators = self.terminators;
        self.stack.begin(Some(&terminators.attribute_name), true)?;
        match self.parse_run(RunMode::Run) {
            Some(name) => self.stack.commit(name).map(|name| name.node),
            None => self.stack.rollback(),
        }
    }

    /// A tag attribute value using the quotation style `quote`.
    ///
    /// Unquoted values always succeed, possibly with an empty value. Quoted
    /// values fail unless the closing quote is immediately followed by
    /// whitespace or `>`, so `attr='value'value` is left for the unquoted
    /// style to consume as a whole.
    pub fn parse_attribute_value(&mut self, quote: ValueQuote) -> Option<Wikitext<'a>> {
        let terminators = self.terminators;
        // Values stop only at their own terminators, never at an enclosing `=`
        self.stack.begin(None, false)?;

        let (quote_char, terminator) = match quote {
            ValueQuote::None => {
                self.stack.set_terminator(Some(&terminators.unquoted_value));
                let value = self.parse_wikitext();
                return self.stack.commit(value).map(|value| value.node);
            }
            ValueQuote::Single => ('\'', &terminators.single_quoted_value),
            ValueQuote::Double => ('"', &terminators.double_quoted_value),
        };

        if self.stack.consume(quote.as_str()).is_some() {
            // No right angle brackets are allowed, even quoted
            self.stack.set_terminator(Some(terminator));
            let value = self.parse_wikitext();
            if self.stack.consume_closing_quote(quote_char).is_some() {
                return self.stack.commit(value).map(|value| value.node);
            }
        }

        self.stack.rollback()
    }

    /// Runs `production`, reusing a known failure for the same production,
    /// offset, and terminators instead of running it again.
    fn memoize<T>(
        &mut self,
        production: Production,
        f: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        let key = (
            production,
            self.stack.position(),
            self.stack.terminator_fingerprint(),
        );
        let depth = self.stack.depth();
        if self
            .failures
            .get(&key)
            .is_some_and(|&headroom| depth + headroom <= self.stack.max_depth())
            || self.limited_failures.contains(&(key, depth))
        {
            self.failure_hits += 1;
            return None;
        }

        let refusals = self.stack.depth_refusals();
        let peak = self.stack.track_peak_depth();
        let result = f(self);
        let headroom = self.stack.restore_peak_depth(peak) - depth;

        if result.is_none() {
            log::trace!("{production:?} failed at {}", key.1);
            if self.stack.depth_refusals() == refusals {
                self.failures
                    .entry(key)
                    .and_modify(|known| *known = (*known).min(headroom))
                    .or_insert(headroom);
            } else {
                self.limited_failures.insert((key, depth));
            }
        }
        result
    }
}
