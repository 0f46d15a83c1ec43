//! Comprehensive tests for vellum-html
//!
//! Tree building and error recovery over realistic markup.

use vellum_dom::{DomTree, NodeId};
use vellum_html::{parse, parse_bytes, ParseError, StrSource, Token, Tokenizer};

fn child_tags(tree: &DomTree, parent: NodeId) -> Vec<String> {
    tree.children(parent)
        .filter_map(|(_, n)| n.as_element().map(|e| e.tag.clone()))
        .collect()
}

#[test]
fn test_parse_empty() {
    let out = parse("");
    assert_eq!(out.tree.tag(out.root), Some("html"));
    assert!(out.errors.is_empty());
}

#[test]
fn test_implicit_tbody() {
    let out = parse("<table><tr><td>x</td></tr></table>");
    let table = out.tree.find_first("table").unwrap();
    assert_eq!(child_tags(&out.tree, table), vec!["tbody"]);
    let tbody = out.tree.find_first("tbody").unwrap();
    assert_eq!(child_tags(&out.tree, tbody), vec!["tr"]);
    let td = out.tree.find_first("td").unwrap();
    assert_eq!(out.tree.text_content(td), "x");
}

#[test]
fn test_implicit_row_for_bare_cells() {
    let out = parse("<table><td>a<td>b</table>");
    let tr = out.tree.find_first("tr").unwrap();
    assert_eq!(child_tags(&out.tree, tr), vec!["td", "td"]);
}

#[test]
fn test_cells_close_on_omitted_end_tags() {
    let out = parse("<table><tr><td>1<td>2<tr><td>3</table>");
    let rows = out.tree.find_all("tr");
    assert_eq!(rows.len(), 2);
    assert_eq!(child_tags(&out.tree, rows[0]), vec!["td", "td"]);
    assert_eq!(child_tags(&out.tree, rows[1]), vec!["td"]);
    assert_eq!(out.tree.find_all("tbody").len(), 1);
}

#[test]
fn test_list_items_close_each_other() {
    let out = parse("<ul><li>one<li>two<ul><li>inner</ul><li>three</ul>");
    let outer = out.tree.find_first("ul").unwrap();
    assert_eq!(child_tags(&out.tree, outer), vec!["li", "li", "li"]);
}

#[test]
fn test_paragraph_closed_by_block() {
    let out = parse("<p>para<div>block</div>");
    let body = out.tree.find_first("body").unwrap();
    assert_eq!(child_tags(&out.tree, body), vec!["p", "div"]);
}

#[test]
fn test_head_and_body() {
    let out = parse(
        "<html lang=en><head><title>T</title><style>p{}</style></head><body class=main><p>x</body></html>",
    );
    let tree = &out.tree;
    assert_eq!(child_tags(tree, out.root), vec!["head", "body"]);
    assert_eq!(tree.element(out.root).unwrap().get_attr("lang"), Some("en"));
    let body = tree.find_first("body").unwrap();
    assert!(tree.element(body).unwrap().has_class("main"));
    let style = tree.find_first("style").unwrap();
    assert_eq!(tree.text_content(style), "p{}");
}

#[test]
fn test_content_after_head_leaves_head() {
    let out = parse("<head><title>T</title><div>x</div>");
    assert_eq!(child_tags(&out.tree, out.root), vec!["head", "body"]);
}

#[test]
fn test_mismatched_end_unwinds() {
    let out = parse("<div><span><b>x</div>after");
    let body = out.tree.find_first("body").unwrap();
    let ids: Vec<_> = out.tree.children(body).map(|(id, _)| id).collect();
    assert_eq!(ids.len(), 2);
    assert!(out.tree.get(ids[1]).unwrap().is_text());
}

#[test]
fn test_stray_end_tag_ignored() {
    let out = parse("<p>a</span>b</p>");
    let p = out.tree.find_first("p").unwrap();
    assert_eq!(out.tree.text_content(p), "ab");
    assert!(matches!(out.errors[0], ParseError::StrayEndTag { ref tag, .. } if tag == "span"));
}

#[test]
fn test_unterminated_comment_degrades() {
    let out = parse("<p>before<!-- text with no closing");
    assert!(out.errors.iter().any(|e| matches!(e, ParseError::Unterminated { .. })));
    let p = out.tree.find_first("p").unwrap();
    assert_eq!(out.tree.text_content(p), "before");
}

#[test]
fn test_whitespace_and_words_are_separate_leaves() {
    let out = parse("<p>a b</p>");
    let p = out.tree.find_first("p").unwrap();
    let flags: Vec<bool> = out
        .tree
        .children(p)
        .map(|(_, n)| n.as_text().unwrap().is_whitespace)
        .collect();
    assert_eq!(flags, vec![false, true, false]);
}

#[test]
fn test_parse_bytes_utf8() {
    let out = parse_bytes("<p>caf\u{e9}</p>".as_bytes());
    let p = out.tree.find_first("p").unwrap();
    assert_eq!(out.tree.text_content(p), "café");
}

#[test]
fn test_tokenizer_end_is_sticky() {
    let mut tok = Tokenizer::new(StrSource::new("<a href=x>"));
    assert_eq!(tok.next_token(), Token::TagStart("a".into()));
    assert_eq!(tok.next_token(), Token::Attribute("href".into(), "x".into()));
    for _ in 0..3 {
        assert_eq!(tok.next_token(), Token::End);
    }
}

#[test]
fn test_malformed_soup_never_panics() {
    let inputs = [
        "<<<>>>",
        "</>",
        "<a <b c=\"d>",
        "<table><caption>c<tr><td><table><td>x",
        "<![CDATA[ unterminated",
        "<script>never closed",
        "&#xFFFFFFFF; &; &#;",
    ];
    for input in inputs {
        let out = parse(input);
        assert!(out.tree.len() >= 2, "{input}");
    }
}
