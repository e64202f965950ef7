//! Wikitext parser helpers.

use super::{Node, Span, Spanned, Tag, TagAttribute, TagContent, TemplateArgument, visit::Visitor};
use core::fmt;

/// Writes a syntax tree back out as Wikitext.
///
/// Only the fields of the tree are used, not the spans, so the output
/// reproduces the input exactly except for the discarded extra segments of
/// an argument reference like `{{{a|b|discarded}}}`.
pub struct Serializer<W>
where
    W: fmt::Write,
{
    /// The output.
    out: W,
}

impl<W> Serializer<W>
where
    W: fmt::Write,
{
    /// Creates a new serializer which writes to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the output, consuming the serializer.
    pub fn finish(self) -> W {
        self.out
    }
}

impl<'tt, W> Visitor<'tt, fmt::Error> for Serializer<W>
where
    W: fmt::Write,
{
    fn visit_argument_reference(
        &mut self,
        _span: Span,
        name: &'tt [Spanned<Node<'tt>>],
        default: Option<&'tt [Spanned<Node<'tt>>]>,
    ) -> fmt::Result {
        self.out.write_str("{{{")?;
        self.visit_nodes(name)?;
        if let Some(default) = default {
            self.out.write_char('|')?;
            self.visit_nodes(default)?;
        }
        self.out.write_str("}}}")
    }

    fn visit_comment(&mut self, _span: Span, content: &'tt str, unclosed: bool) -> fmt::Result {
        write!(self.out, "<!--{content}")?;
        if !unclosed {
            self.out.write_str("-->")?;
        }
        Ok(())
    }

    fn visit_tag(&mut self, _span: Span, tag: &'tt Tag<'tt>) -> fmt::Result {
        write!(self.out, "<{}", tag.name)?;
        for attribute in &tag.attributes {
            self.visit_tag_attribute(attribute.span, attribute)?;
        }
        if let Some(whitespace) = tag.trailing_whitespace {
            self.out.write_str(whitespace)?;
        }
        if tag.self_closing {
            return self.out.write_str("/>");
        }
        self.out.write_char('>')?;

        match &tag.content {
            TagContent::Parser(content) => self.out.write_str(content.unwrap_or_default())?,
            TagContent::Html(content) => {
                if let Some(content) = content {
                    self.visit_nodes(content)?;
                }
            }
        }

        write!(
            self.out,
            "</{}{}>",
            tag.closing_tag_name.unwrap_or(tag.name),
            tag.closing_tag_trailing_whitespace.unwrap_or_default()
        )
    }

    fn visit_tag_attribute(
        &mut self,
        _span: Span,
        attribute: &'tt TagAttribute<'tt>,
    ) -> fmt::Result {
        self.out.write_str(attribute.leading_whitespace)?;
        if let Some(name) = &attribute.name {
            self.visit_nodes(name)?;
        }
        if let Some(value) = &attribute.value {
            write!(
                self.out,
                "{}={}{}",
                attribute.whitespace_before_eq.unwrap_or_default(),
                attribute.whitespace_after_eq.unwrap_or_default(),
                attribute.quote.as_str()
            )?;
            self.visit_nodes(value)?;
            self.out.write_str(attribute.quote.as_str())?;
        }
        Ok(())
    }

    fn visit_template(
        &mut self,
        _span: Span,
        name: &'tt [Spanned<Node<'tt>>],
        arguments: &'tt [Spanned<TemplateArgument<'tt>>],
    ) -> fmt::Result {
        self.out.write_str("{{")?;
        self.visit_nodes(name)?;
        for argument in arguments {
            self.out.write_char('|')?;
            self.visit_template_argument(argument.span, argument)?;
        }
        self.out.write_str("}}")
    }

    fn visit_template_argument(
        &mut self,
        _span: Span,
        argument: &'tt TemplateArgument<'tt>,
    ) -> fmt::Result {
        if let Some(name) = &argument.name {
            self.visit_nodes(name)?;
            self.out.write_char('=')?;
        }
        self.visit_nodes(&argument.value)
    }

    fn visit_text(&mut self, _span: Span, text: &'tt str) -> fmt::Result {
        self.out.write_str(text)
    }
}

/// Converts a syntax tree back into Wikitext.
pub fn to_wikitext<'tt>(nodes: &'tt [Spanned<Node<'tt>>]) -> String {
    let mut serializer = Serializer::new(String::new());
    // Writing to a `String` cannot fail
    let _ = serializer.visit_nodes(nodes);
    serializer.finish()
}

/// Extracts the plain text from a syntax tree.
///
/// Comments, tag attributes, parser tag content, and unexpanded templates
/// and argument references produce no text.
pub struct TextContent<W>
where
    W: fmt::Write,
{
    /// The accumulated text.
    content: W,
}

impl<W> TextContent<W>
where
    W: fmt::Write,
{
    /// Creates a new text content extractor with the given output.
    pub fn new(content: W) -> Self {
        Self { content }
    }

    /// Returns the text content, consuming the extractor.
    pub fn finish(self) -> W {
        self.content
    }
}

impl<'tt, W> Visitor<'tt, fmt::Error> for TextContent<W>
where
    W: fmt::Write,
{
    fn visit_argument_reference(
        &mut self,
        _span: Span,
        _name: &'tt [Spanned<Node<'tt>>],
        _default: Option<&'tt [Spanned<Node<'tt>>]>,
    ) -> fmt::Result {
        Ok(())
    }
    fn visit_tag_attribute(
        &mut self,
        _span: Span,
        _attribute: &'tt TagAttribute<'tt>,
    ) -> fmt::Result {
        Ok(())
    }
    fn visit_template(
        &mut self,
        _span: Span,
        _name: &'tt [Spanned<Node<'tt>>],
        _arguments: &'tt [Spanned<TemplateArgument<'tt>>],
    ) -> fmt::Result {
        Ok(())
    }
    fn visit_text(&mut self, _span: Span, text: &'tt str) -> fmt::Result {
        self.content.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikitext::ValueQuote;

    #[test]
    fn serialize_fields() {
        let attribute = TagAttribute {
            name: Some(vec![Spanned::new(Node::Text("a"), 0, 0)]),
            value: Some(vec![Spanned::new(Node::Text("v"), 0, 0)]),
            quote: ValueQuote::Double,
            leading_whitespace: "  ",
            whitespace_before_eq: Some(" "),
            whitespace_after_eq: None,
        };
        let tag = Tag {
            name: "span",
            attributes: vec![Spanned::new(attribute, 0, 0)],
            self_closing: false,
            trailing_whitespace: None,
            content: TagContent::Html(Some(vec![Spanned::new(Node::Text("x"), 0, 0)])),
            closing_tag_name: Some("SPAN"),
            closing_tag_trailing_whitespace: Some(""),
        };
        let nodes = [Spanned::new(Node::Tag(Box::new(tag)), 0, 0)];
        assert_eq!(to_wikitext(&nodes), r#"<span  a ="v">x</SPAN>"#);
    }

    #[test]
    fn text_content() {
        let nodes = [
            Spanned::new(Node::Text("a"), 0, 1),
            Spanned::new(
                Node::Template {
                    name: vec![Spanned::new(Node::Text("t"), 3, 4)],
                    arguments: vec![],
                },
                1,
                6,
            ),
            Spanned::new(
                Node::Comment {
                    content: "c",
                    unclosed: false,
                },
                6,
                14,
            ),
            Spanned::new(Node::Text("b"), 14, 15),
        ];
        let mut text = TextContent::new(String::new());
        text.visit_nodes(&nodes).unwrap();
        assert_eq!(text.finish(), "ab");
    }
}
