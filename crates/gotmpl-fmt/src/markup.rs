/*
 * markup.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Markup formatting.
//!
//! The embedder hands the literal markup of every container, with template
//! nodes replaced by placeholders, to a [`MarkupFormatter`]. Hosts can plug
//! in their own implementation; [`HtmlFormatter`] is the built-in one.

use crate::doc::Doc;
use crate::error::FormatResult;
use regex::Regex;
use std::sync::LazyLock;

/// Options passed to a [`MarkupFormatter`] for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkupOptions {
    /// The markup is the body of a template block rather than a document.
    pub embedded: bool,
}

/// Formats template-free markup into a [`Doc`].
///
/// Implementations must keep placeholder tokens intact as words and end the
/// document with a hard line.
pub trait MarkupFormatter {
    fn format(&self, markup: &str, options: &MarkupOptions) -> FormatResult<Doc>;
}

/// An opening or closing tag, possibly spanning lines. Quoted attribute
/// values may contain `>`.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<(?P<close>/)?(?P<name>[A-Za-z][\w:-]*)(?:\s(?:"[^"]*"|'[^']*'|[^'">])*)?/?>"#,
    )
    .expect("Invalid regex pattern for HTML tags")
});

static COMMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid regex pattern for comments"));

/// Script and style elements; their bodies are not markup.
static RAW_TEXT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>(?P<body>.*?)</(?:script|style)\s*>")
        .expect("Invalid regex pattern for raw text elements")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose body is kept verbatim.
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea"];

/// Line-oriented HTML re-indenter.
///
/// Every line is trimmed and indented by the number of elements open before
/// it. Lines starting with closing tags are dedented, and the continuation
/// lines of a tag spanning several lines are indented one level below it.
/// Comments never open or close elements. Blank line runs collapse to one,
/// and blank lines at either end are dropped. The bodies of `<pre>` and
/// `<textarea>` elements are kept as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFormatter;

impl MarkupFormatter for HtmlFormatter {
    fn format(&self, markup: &str, options: &MarkupOptions) -> FormatResult<Doc> {
        let markup = markup.replace("\r\n", "\n");
        if options.embedded && !markup.contains('\n') {
            return Ok(format_single_line(&markup));
        }

        let masked = mask_opaque(&markup);
        let tags = scan_tags(&masked);
        let mut next_tag = 0;

        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut pending_blank = false;
        let mut preformatted: Option<&str> = None;
        let mut spanning: Option<SpanningTag> = None;
        let mut line_start = 0;

        for raw in markup.split('\n') {
            let line_end = line_start + raw.len();
            let first_tag = next_tag;
            while tags.get(next_tag).is_some_and(|tag| tag.start < line_end) {
                next_tag += 1;
            }
            let line_tags = &tags[first_tag..next_tag];
            let masked_line = &masked[line_start..line_end];
            let continuation = spanning.filter(|tag| tag.end > line_start);
            let offset = line_start;
            line_start = line_end + 1;

            if let Some(name) = preformatted {
                parts.push(Doc::literalline());
                parts.push(Doc::text(raw.trim_end()));
                if line_tags.iter().any(|tag| tag.closing && tag.name == name) {
                    preformatted = None;
                    depth = depth.saturating_sub(1);
                }
                continue;
            }

            let line = raw.trim();
            if line.is_empty() {
                pending_blank = !parts.is_empty();
                continue;
            }

            let summary = summarize_line(masked_line, offset, line_tags, continuation.is_some());
            let line_depth = match continuation {
                Some(tag) => tag.depth,
                None => depth.saturating_sub(summary.leading_closes),
            };
            if parts.is_empty() {
                parts.push(Doc::text(line));
            } else {
                if pending_blank {
                    parts.push(Doc::hardline());
                }
                parts.push(Doc::indent_by(
                    line_depth,
                    Doc::concat([Doc::hardline(), Doc::text(line)]),
                ));
            }
            pending_blank = false;

            depth = (depth as isize + summary.delta).max(0) as usize;
            preformatted = summary.unclosed_preformatted;
            spanning = match line_tags.last() {
                Some(tag) if tag.end > line_end => Some(SpanningTag {
                    end: tag.end,
                    depth: line_depth + 1,
                }),
                _ => continuation.filter(|tag| tag.end > line_end),
            };
        }

        parts.push(Doc::hardline());
        Ok(Doc::concat(parts))
    }
}

/// A block body that fits on one line. Edge whitespace is kept as a line
/// break so it survives when the block stays flat.
fn format_single_line(markup: &str) -> Doc {
    let text = markup.trim();
    if text.is_empty() {
        return Doc::hardline();
    }
    let leading = markup.starts_with(char::is_whitespace);
    let trailing = markup.ends_with(char::is_whitespace);
    Doc::concat([
        if leading { Doc::line() } else { Doc::Empty },
        Doc::text(text),
        if trailing { Doc::line() } else { Doc::Empty },
        Doc::hardline(),
    ])
}

/// Blank out comments and script/style bodies so their text is never read
/// as tags. Byte offsets and line breaks are kept.
fn mask_opaque(markup: &str) -> String {
    let comments = COMMENT_PATTERN.find_iter(markup).map(|m| m.range());
    let bodies = RAW_TEXT_PATTERN
        .captures_iter(markup)
        .filter_map(|caps| caps.name("body"))
        .map(|m| m.range());

    let mut bytes = markup.as_bytes().to_vec();
    for range in comments.chain(bodies) {
        for byte in &mut bytes[range] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
    }
    // Masked ranges cover whole characters, so this never replaces anything.
    String::from_utf8_lossy(&bytes).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    /// Byte offsets in the whole markup.
    start: usize,
    end: usize,
    /// Lowercased element name.
    name: String,
    closing: bool,
    /// Increases the element depth: not void, self-closing or closing.
    opens: bool,
}

/// A tag that continues past the end of the line it starts on.
#[derive(Debug, Clone, Copy)]
struct SpanningTag {
    end: usize,
    /// Depth of its continuation lines.
    depth: usize,
}

fn scan_tags(masked: &str) -> Vec<Tag> {
    TAG_PATTERN
        .captures_iter(masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.name("name")?.as_str().to_ascii_lowercase();
            let closing = caps.name("close").is_some();
            let opens = !closing
                && !whole.as_str().ends_with("/>")
                && !VOID_ELEMENTS.contains(&name.as_str());
            Some(Tag {
                start: whole.start(),
                end: whole.end(),
                name,
                closing,
                opens,
            })
        })
        .collect()
}

#[derive(Debug, Default, PartialEq)]
struct LineTags {
    /// Net change in element depth.
    delta: isize,
    /// Closing tags before any other content on the line.
    leading_closes: usize,
    /// A preformatted element opened but not closed on this line.
    unclosed_preformatted: Option<&'static str>,
}

/// Summarize the tags starting on one line. `offset` is the line's position
/// in the markup.
fn summarize_line(line: &str, offset: usize, tags: &[Tag], continuation: bool) -> LineTags {
    let mut summary = LineTags::default();
    let mut leading = !continuation;
    let mut previous_end = 0;

    for tag in tags {
        let start = tag.start - offset;
        if !line[previous_end..start].trim().is_empty() {
            leading = false;
        }
        previous_end = (tag.end - offset).min(line.len());

        if tag.closing {
            summary.delta -= 1;
            if leading {
                summary.leading_closes += 1;
            }
            if summary.unclosed_preformatted == Some(tag.name.as_str()) {
                summary.unclosed_preformatted = None;
            }
            continue;
        }

        leading = false;
        if !tag.opens {
            continue;
        }
        summary.delta += 1;
        if let Some(pre) = PREFORMATTED_ELEMENTS.iter().copied().find(|pre| *pre == tag.name) {
            summary.unclosed_preformatted = Some(pre);
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::RenderOptions;
    use pretty_assertions::assert_eq;

    fn format(markup: &str, embedded: bool) -> String {
        HtmlFormatter
            .format(markup, &MarkupOptions { embedded })
            .unwrap()
            .render(&RenderOptions::default())
    }

    #[test]
    fn test_reindents_nested_elements() {
        let input = "<div>\n<ul>\n      <li>one</li>\n<li>two</li>\n</ul>\n</div>";
        assert_eq!(
            format(input, false),
            "<div>\n  <ul>\n    <li>one</li>\n    <li>two</li>\n  </ul>\n</div>\n"
        );
    }

    #[test]
    fn test_void_and_self_closing_elements() {
        let input = "<div>\n<img src=\"a.png\">\n<br/>\n<x-icon />\n<p>text</p>\n</div>";
        assert_eq!(
            format(input, false),
            "<div>\n  <img src=\"a.png\">\n  <br/>\n  <x-icon />\n  <p>text</p>\n</div>\n"
        );
    }

    #[test]
    fn test_blank_lines_collapse_and_edges_drop() {
        let input = "\n\n<p>a</p>\n\n\n\n<p>b</p>\n\n";
        assert_eq!(format(input, false), "<p>a</p>\n\n<p>b</p>\n");
    }

    #[test]
    fn test_comments_do_not_count() {
        let input = "<div>\n<!-- <span> -->\ntext\n</div>";
        assert_eq!(format(input, false), "<div>\n  <!-- <span> -->\n  text\n</div>\n");
    }

    #[test]
    fn test_preformatted_body_is_verbatim() {
        let input = "<div>\n<pre>\n   keep   \n  this\n</pre>\n<p>x</p>\n</div>";
        assert_eq!(
            format(input, false),
            "<div>\n  <pre>\n   keep\n  this\n</pre>\n  <p>x</p>\n</div>\n"
        );
    }

    fn summarize(line: &str) -> LineTags {
        summarize_line(line, 0, &scan_tags(line), false)
    }

    #[test]
    fn test_attribute_with_angle_bracket() {
        let tags = summarize(r#"<div title="a>b">"#);
        assert_eq!(tags.delta, 1);
        assert_eq!(tags.leading_closes, 0);
    }

    #[test]
    fn test_leading_closes() {
        let tags = summarize("</span></div> tail <b>");
        assert_eq!(tags.leading_closes, 2);
        assert_eq!(tags.delta, -1);
    }

    #[test]
    fn test_comparison_is_not_a_tag() {
        assert_eq!(scan_tags("if (a<b) {\n}\n</p>").len(), 1);
    }

    #[test]
    fn test_multiline_comment_does_not_count() {
        let input = "<div>\n<!--\n<span>\n-->\n<p>x</p>\n</div>";
        assert_eq!(
            format(input, false),
            "<div>\n  <!--\n  <span>\n  -->\n  <p>x</p>\n</div>\n"
        );
        assert_eq!(
            format("<!--\n<div>\n-->\n<p>x</p>\n", false),
            "<!--\n<div>\n-->\n<p>x</p>\n"
        );
    }

    #[test]
    fn test_multiline_open_tag() {
        let input = "<div\nclass=\"a\"\n      id=\"b\">\n<p>x</p>\n</div>";
        assert_eq!(
            format(input, false),
            "<div\n  class=\"a\"\n  id=\"b\">\n  <p>x</p>\n</div>\n"
        );
    }

    #[test]
    fn test_multiline_void_tag() {
        assert_eq!(
            format("<img\nsrc=\"a.png\">\n<p>x</p>", false),
            "<img\n  src=\"a.png\">\n<p>x</p>\n"
        );
    }

    #[test]
    fn test_script_body_is_not_markup() {
        let input = "<div>\n<script>\nif (a<b) { x = \"<div>\"; }\n</script>\n<p>x</p>\n</div>";
        assert_eq!(
            format(input, false),
            "<div>\n  <script>\n    if (a<b) { x = \"<div>\"; }\n  </script>\n  <p>x</p>\n</div>\n"
        );
    }

    #[test]
    fn test_preformatted_blank_lines_are_kept() {
        let input = "<pre>\nline1\n\n\nline2\n</pre>\n";
        assert_eq!(format(input, false), input);
    }

    #[test]
    fn test_embedded_single_line_keeps_edges() {
        let doc = HtmlFormatter
            .format(" row-span-1 ", &MarkupOptions { embedded: true })
            .unwrap();
        assert_eq!(
            doc,
            Doc::Concat(vec![
                Doc::line(),
                Doc::text("row-span-1"),
                Doc::line(),
                Doc::hardline()
            ])
        );
    }

    #[test]
    fn test_root_single_line_is_trimmed() {
        assert_eq!(format("  <p>x</p>  ", false), "<p>x</p>\n");
    }

    #[test]
    fn test_crlf_normalized() {
        assert_eq!(format("<p>\r\na\r\n</p>\r\n", false), "<p>\n  a\n</p>\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(format("", false), "");
        assert_eq!(format("   \n  ", true), "");
    }

    #[test]
    fn test_placeholders_are_kept() {
        assert_eq!(
            format("<p>\n_gt0_ and _gt1_\n</p>", false),
            "<p>\n  _gt0_ and _gt1_\n</p>\n"
        );
    }
}
