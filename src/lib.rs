//! A concrete syntax tree parser for the expandable subset of MediaWiki
//! Wikitext: templates, template argument references, XML-like tags, and
//! comments.
//!
//! ```
//! use wikitext_cst::{config::CONFIG, wikitext::{Node, Parser, to_wikitext}};
//!
//! let source = "Hello, {{name|default={{{1}}}}}!";
//! let output = Parser::new(&CONFIG).parse(source);
//! assert!(matches!(output.root[1].node, Node::Template { .. }));
//! assert_eq!(to_wikitext(&output.root), source);
//! ```

pub mod config;
pub mod wikitext;
