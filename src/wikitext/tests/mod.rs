use super::*;
use crate::{
    config::{CONFIG, CONFIG_SOURCE},
    wikitext::parser::Grammar,
};


/// Parses `input` and checks that the tree serializes back to the input.
#[track_caller]
fn run_test(input: &str) -> Output<'_> {
    run_test_with_config(&CONFIG, input)
}

#[track_caller]
fn run_test_with_config<'a>(config: &Configuration, input: &'a str) -> Output<'a> {
    let output = parse(config, input);
    assert_eq!(to_wikitext(&output.root), input);
    output
}

/// Parses `input` without checking the round trip.
#[track_caller]
fn parse<'a>(config: &Configuration, input: &'a str) -> Output<'a> {
    let _ = env_logger::try_init();
    let output = Parser::new(config).parse(input);
    log::trace!("{:#?}", output.root);
    output
}

/// Runs a single production against `input`.
fn with_grammar<'a, R>(input: &'a str, f: impl FnOnce(&mut Grammar<'_, 'a>) -> R) -> R {
    let _ = env_logger::try_init();
    let parser = Parser::new(&CONFIG);
    let mut grammar = Grammar::new(&parser, input);
    f(&mut grammar)
}

fn text(text: &str, start: usize, end: usize) -> Spanned<Node<'_>> {
    Spanned::new(Node::Text(text), start, end)
}

#[test]
fn plain_text() {
    let output = run_test("hello, world");
    assert_eq!(output.root, vec![text("hello, world", 0, 12)]);
    assert_eq!(output.stats, Stats::default());

    let output = run_test("");
    assert!(output.root.is_empty());
}

#[test]
fn stray_punctuation_is_text() {
    for input in ["{", "}", "}}}", "|", "=", "<", ">", "< b>", "</b>", "<!-", "a{b}c"] {
        let output = run_test(input);
        assert_eq!(output.root, vec![text(input, 0, input.len())], "{input:?}");
    }
}

#[test]
fn multibyte_text() {
    let output = run_test("é{{ü}}");
    assert_eq!(output.root[0], text("é", 0, 2));
    assert_eq!(
        output.root[1],
        Spanned::new(
            Node::Template {
                name: vec![text("ü", 4, 6)],
                arguments: vec![],
            },
            2,
            8
        )
    );
}

#[test]
fn comment() {
    let output = run_test("a<!-- b -->c");
    assert_eq!(
        output.root,
        vec![
            text("a", 0, 1),
            Spanned::new(
                Node::Comment {
                    content: " b ",
                    unclosed: false,
                },
                1,
                11
            ),
            text("c", 11, 12),
        ]
    );
}

#[test]
fn unterminated_comment() {
    let output = run_test("<!-- never closes");
    assert_eq!(
        output.root,
        vec![Spanned::new(
            Node::Comment {
                content: " never closes",
                unclosed: true,
            },
            0,
            17
        )]
    );
}

#[test]
fn comment_in_template_name() {
    let output = run_test("{{a<!--x-->b}}");
    let Node::Template { name, .. } = &output.root[0].node else {
        panic!("expected template, got {:?}", output.root);
    };
    assert_eq!(name.len(), 3);
    assert!(matches!(name[1].node, Node::Comment { content: "x", .. }));
}

#[test]
fn json_output() {
    let output = run_test("hi");
    let json = serde_json::to_value(&output.root).unwrap();
    assert_eq!(json[0]["node"]["Text"], "hi");
    assert_eq!(json[0]["span"]["end"], 2);
}

#[test]
fn text_content() {
    let output = run_test("a<!--c-->b<span title=x>c</span>{{t}}{{{1}}}");
    let mut extractor = TextContent::new(String::new());
    visit::Visitor::visit_output(&mut extractor, &output).unwrap();
    assert_eq!(extractor.finish(), "abc");
}

#[test]
fn shared_matchers() {
    let parser = Parser::new(&CONFIG);
    let other = Parser::with_matchers(&CONFIG, parser.matchers().clone());
    parser.parse("<b>x</b>");
    other.parse("<i>x</i><B>y</B>");
    assert_eq!(parser.matchers().closing_tag_count(), 2);
    assert_eq!(other.matchers().closing_tag_count(), 2);
}

#[test]
fn custom_extension_tags() {
    let config = Configuration::new(&CONFIG_SOURCE)
        .with_extension_tags(["mytag"])
        .unwrap();
    let output = run_test_with_config(&config, "<mytag>{{raw}}</mytag>");
    let Node::Tag(tag) = &output.root[0].node else {
        panic!("expected tag, got {:?}", output.root);
    };
    assert_eq!(tag.content, TagContent::Parser(Some("{{raw}}")));
}
