use markdown_math::{cook, extract_spans, parse, render_html, Context, MathSettings};
use pretty_assertions::assert_eq;

fn cooked(input: &str) -> String {
    cook(input, &MathSettings::default(), Context::Post)
}

#[test]
fn handles_inline_math() {
    assert_eq!(
        cooked(r"I like $\{a,b\}\$<a>$ etc"),
        r#"<p>I like <span class="math">\{a,b\}\$&lt;a&gt;</span> etc</p>"#
    );
}

#[test]
fn ignores_bad_blocks() {
    let input = "$$a\na\n$$\"\n";
    assert_eq!(cooked(input), "<p>$$a<br>\na<br>\n$$\"</p>");
}

#[test]
fn handles_inline_edge_cases() {
    assert!(!cooked(r",$+500\$").contains("math"));
    assert!(cooked("$+500$").contains("math"));
    assert!(cooked(",$+500$,").contains("math"));
    assert!(!cooked("200$ + 500$").contains("math"));
    assert!(!cooked(",$+500$x").contains("math"));
    assert!(!cooked("y$+500$").contains("math"));
    assert!(cooked("($ +500 $)").contains("math"));
}

#[test]
fn spaced_span_keeps_its_spaces() {
    assert_eq!(cooked("($ +500 $)"), r#"<p>(<span class="math"> +500 </span>)</p>"#);
}

#[test]
fn handles_block_math() {
    let input = "I like\n$$\n{a,b}$<a>\n$$\netc\n";
    assert_eq!(
        cooked(input),
        "<p>I like</p>\n<div class=\"math\">\n{a,b}$&lt;a&gt;\n</div>\n<p>etc</p>"
    );
}

#[test]
fn block_math_keeps_blank_lines() {
    let input = "$$\n\\begin{aligned}\na &= b\n\n\\\\ c &= d\n\\end{aligned}\n$$";
    assert_eq!(
        cooked(input),
        "<div class=\"math\">\n\\begin{aligned}\na &amp;= b\n\n\\\\ c &amp;= d\n\\end{aligned}\n</div>"
    );
}

#[test]
fn malformed_block_does_not_swallow_later_prose() {
    assert_eq!(
        cooked("$$\na $$ b\n$$\nplain prose here\n$$"),
        "<p>$$<br>\na $$ b<br>\n$$<br>\nplain prose here<br>\n$$</p>"
    );
}

#[test]
fn prices_are_not_math() {
    assert_eq!(cooked("I paid $5 and got $"), "<p>I paid $5 and got $</p>");
    assert!(cooked("$2x + 1$").contains("math"));
}

#[test]
fn unterminated_block_is_never_consumed() {
    assert_eq!(cooked("$$\nx^2\n\nmore"), "<p>$$<br>\nx^2</p>\n<p>more</p>");
}

#[test]
fn escaped_dollars_are_literal() {
    assert_eq!(cooked(r"costs \$5 or \$6"), "<p>costs $5 or $6</p>");
}

#[test]
fn extraction_is_idempotent() {
    let mut doc = parse("a $x$ b\n\n$$\ny\n$$\n\n200$ + 500$");
    extract_spans(&mut doc);
    let once = render_html(&doc);
    let snapshot = doc.clone();

    extract_spans(&mut doc);
    assert_eq!(doc, snapshot);
    assert_eq!(render_html(&doc), once);
    assert!(!once.contains("class=\"math\"><span"));
}
