//! Helper trait for implementing syntax tree visitors.

use super::{Node, Output, Span, Spanned, Tag, TagAttribute, TagContent, TemplateArgument};

/// A trait for visiting the nodes of a syntax tree.
pub trait Visitor<'tt, E> {
    /// Visits a [`Node::ArgumentReference`].
    #[inline]
    fn visit_argument_reference(
        &mut self,
        span: Span,
        name: &'tt [Spanned<Node<'tt>>],
        default: Option<&'tt [Spanned<Node<'tt>>]>,
    ) -> Result<(), E> {
        visit_argument_reference(self, span, name, default)
    }

    /// Visits a [`Node::Comment`].
    #[inline]
    fn visit_comment(&mut self, _span: Span, _content: &'tt str, _unclosed: bool) -> Result<(), E> {
        Ok(())
    }

    /// Visits a [`Node`].
    #[inline]
    fn visit_node(&mut self, node: &'tt Spanned<Node<'tt>>) -> Result<(), E> {
        visit_node(self, node)
    }

    /// Visits a list of [`Node`]s.
    #[inline]
    fn visit_nodes(&mut self, nodes: &'tt [Spanned<Node<'tt>>]) -> Result<(), E> {
        visit_nodes(self, nodes)
    }

    /// Visits an [`Output`].
    #[inline]
    fn visit_output(&mut self, output: &'tt Output<'tt>) -> Result<(), E> {
        visit_output(self, output)
    }

    /// Visits a [`Node::Tag`].
    #[inline]
    fn visit_tag(&mut self, span: Span, tag: &'tt Tag<'tt>) -> Result<(), E> {
        visit_tag(self, span, tag)
    }

    /// Visits a [`TagAttribute`].
    #[inline]
    fn visit_tag_attribute(
        &mut self,
        span: Span,
        attribute: &'tt TagAttribute<'tt>,
    ) -> Result<(), E> {
        visit_tag_attribute(self, span, attribute)
    }

    /// Visits a [`Node::Template`].
    #[inline]
    fn visit_template(
        &mut self,
        span: Span,
        name: &'tt [Spanned<Node<'tt>>],
        arguments: &'tt [Spanned<TemplateArgument<'tt>>],
    ) -> Result<(), E> {
        visit_template(self, span, name, arguments)
    }

    /// Visits a [`TemplateArgument`].
    #[inline]
    fn visit_template_argument(
        &mut self,
        span: Span,
        argument: &'tt TemplateArgument<'tt>,
    ) -> Result<(), E> {
        visit_template_argument(self, span, argument)
    }

    /// Visits a [`Node::Text`].
    #[inline]
    fn visit_text(&mut self, _span: Span, _text: &'tt str) -> Result<(), E> {
        Ok(())
    }
}

/// Default implementation of [`Visitor::visit_argument_reference`].
#[inline]
pub fn visit_argument_reference<'tt, V, E>(
    visitor: &mut V,
    _span: Span,
    name: &'tt [Spanned<Node<'tt>>],
    default: Option<&'tt [Spanned<Node<'tt>>]>,
) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_nodes(name)?;
    if let Some(default) = default {
        visitor.visit_nodes(default)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_node`].
pub fn visit_node<'tt, V, E>(visitor: &mut V, node: &'tt Spanned<Node<'tt>>) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    match &node.node {
        Node::ArgumentReference { name, default } => {
            visitor.visit_argument_reference(node.span, name, default.as_deref())
        }
        Node::Comment { content, unclosed } => {
            visitor.visit_comment(node.span, content, *unclosed)
        }
        Node::Tag(tag) => visitor.visit_tag(node.span, tag),
        Node::Template { name, arguments } => visitor.visit_template(node.span, name, arguments),
        Node::Text(text) => visitor.visit_text(node.span, text),
    }
}

/// Default implementation of [`Visitor::visit_nodes`].
#[inline]
pub fn visit_nodes<'tt, V, E>(visitor: &mut V, nodes: &'tt [Spanned<Node<'tt>>]) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    for node in nodes {
        visitor.visit_node(node)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_output`].
#[inline]
pub fn visit_output<'tt, V, E>(visitor: &mut V, output: &'tt Output<'tt>) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_nodes(&output.root)
}

/// Default implementation of [`Visitor::visit_tag`].
pub fn visit_tag<'tt, V, E>(visitor: &mut V, _span: Span, tag: &'tt Tag<'tt>) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    for attribute in &tag.attributes {
        visitor.visit_tag_attribute(attribute.span, attribute)?;
    }
    if let TagContent::Html(Some(content)) = &tag.content {
        visitor.visit_nodes(content)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_tag_attribute`].
#[inline]
pub fn visit_tag_attribute<'tt, V, E>(
    visitor: &mut V,
    _span: Span,
    attribute: &'tt TagAttribute<'tt>,
) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    if let Some(name) = &attribute.name {
        visitor.visit_nodes(name)?;
    }
    if let Some(value) = &attribute.value {
        visitor.visit_nodes(value)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_template`].
#[inline]
pub fn visit_template<'tt, V, E>(
    visitor: &mut V,
    _span: Span,
    name: &'tt [Spanned<Node<'tt>>],
    arguments: &'tt [Spanned<TemplateArgument<'tt>>],
) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    visitor.visit_nodes(name)?;
    for argument in arguments {
        visitor.visit_template_argument(argument.span, argument)?;
    }
    Ok(())
}

/// Default implementation of [`Visitor::visit_template_argument`].
#[inline]
pub fn visit_template_argument<'tt, V, E>(
    visitor: &mut V,
    _span: Span,
    argument: &'tt TemplateArgument<'tt>,
) -> Result<(), E>
where
    V: Visitor<'tt, E> + ?Sized,
{
    if let Some(name) = &argument.name {
        visitor.visit_nodes(name)?;
    }
    visitor.visit_nodes(&argument.value)
}
