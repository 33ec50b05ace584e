/*
 * printer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Printing of template actions, `else` chains and verbatim regions.
//!
//! Blocks and the root are handled by the embedder; everything here turns a
//! single node into a [`Doc`] without consulting the markup formatter.

use crate::ast::{EndDelimiter, Inline, NodeId, StartDelimiter, Tree};
use crate::doc::Doc;
use crate::error::{FormatError, FormatResult};
use crate::plugin::{PrintChild, PrintContext};
use regex::Regex;
use std::sync::LazyLock;

/// A blank line followed, after more whitespace, by another action.
static EMPTY_LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*\r?\n[ \t]*\r?\n\s*\{\{").expect("Invalid regex pattern for empty lines")
});

/// Print an action node.
///
/// Standalone actions keep a line break when they were alone on their
/// source line and keep one blank line when one followed them.
pub fn print_inline(ctx: &PrintContext<'_>, id: NodeId) -> FormatResult<Doc> {
    let tree = ctx.tree;
    let inline = tree
        .inline(id)
        .ok_or_else(|| FormatError::embed("expected a template action", tree.node(id).span))?;
    let action = print_action(inline, ctx.options.bracket_spacing);

    if inline.is_block_delimiter() {
        return Ok(Doc::group(action));
    }
    Ok(Doc::group_with_break(
        Doc::concat([action, empty_line(tree, id)]),
        has_node_linebreak(tree, id),
    ))
}

/// `{{` + delimiters + statement + `}}`.
pub fn print_action(inline: &Inline, bracket_spacing: bool) -> Doc {
    let start = inline.delimiters.start;
    let end = inline.delimiters.end;
    // `{{-3}}` is a number, not a trim marker
    let pad_start = bracket_spacing || start == StartDelimiter::Trim;
    let pad_end = bracket_spacing || end == EndDelimiter::Trim;

    Doc::concat([
        Doc::text("{{"),
        Doc::text(start.as_str()),
        print_statement(&inline.statement, pad_start, pad_end),
        Doc::text(end.as_str()),
        Doc::text("}}"),
    ])
}

/// Print a statement. Multi-line statements keep their line structure with
/// every line after the first indented and the closing braces on their own
/// line; they get no padding.
pub fn print_statement(statement: &str, pad_start: bool, pad_end: bool) -> Doc {
    let lines: Vec<&str> = statement.lines().map(str::trim).collect();
    match lines.as_slice() {
        [] => Doc::Empty,
        [line] => Doc::concat([
            Doc::text(if pad_start { " " } else { "" }),
            Doc::text(*line),
            Doc::text(if pad_end { " " } else { "" }),
        ]),
        [first, rest @ ..] => {
            let mut parts = vec![Doc::text(*first)];
            parts.extend(
                rest.iter()
                    .map(|line| Doc::indent(Doc::concat([Doc::hardline(), Doc::text(*line)]))),
            );
            parts.push(Doc::hardline());
            Doc::concat(parts)
        }
    }
}

/// Print an `else` chain as one group over its branches.
pub fn print_multi_block(
    ctx: &PrintContext<'_>,
    id: NodeId,
    print_child: &mut PrintChild<'_>,
) -> FormatResult<Doc> {
    let tree = ctx.tree;
    let chain = tree
        .multi_block(id)
        .ok_or_else(|| FormatError::embed("expected an else chain", tree.node(id).span))?;
    let branches = chain
        .branches
        .iter()
        .map(|branch| print_child(*branch))
        .collect::<FormatResult<Vec<_>>>()?;
    let should_break = chain
        .branches
        .last()
        .is_some_and(|last| closer_starts_line(tree, *last));

    Ok(Doc::concat([
        Doc::group_with_break(Doc::concat(branches), should_break),
        empty_line(tree, id),
    ]))
}

/// Print a node as it appears in the source, followed by a kept blank line.
pub fn print_unformattable(tree: &Tree, id: NodeId) -> Doc {
    Doc::concat([print_verbatim(tree, id), empty_line(tree, id)])
}

/// The node's source text, line by line with trailing whitespace removed.
/// Blank lines are kept as written.
///
/// Continuation lines lose as much leading whitespace as the line the node
/// starts on had, so the region can be re-indented at its new depth.
pub fn print_verbatim(tree: &Tree, id: NodeId) -> Doc {
    let source = tree.source();
    let span = tree.node(id).span;
    let indentation = line_prefix(source, span.index)
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .count();

    let mut parts = Vec::new();
    for (i, line) in tree.text(id).split('\n').enumerate() {
        let line = line.trim_end();
        if i == 0 {
            parts.push(Doc::text(line));
        } else {
            parts.push(Doc::verbatimline());
            parts.push(Doc::text(dedent(line, indentation)));
        }
    }
    Doc::concat(parts)
}

/// A soft line when the source has a blank line after the node and another
/// action follows it.
pub fn empty_line(tree: &Tree, id: NodeId) -> Doc {
    if is_followed_by_empty_line(tree.source(), tree.node(id).span.end()) {
        Doc::softline()
    } else {
        Doc::Empty
    }
}

pub fn is_followed_by_empty_line(source: &str, offset: usize) -> bool {
    EMPTY_LINE_PATTERN.is_match(&source[offset..])
}

/// Whether the node is the only thing on its source line.
pub fn has_node_linebreak(tree: &Tree, id: NodeId) -> bool {
    let source = tree.source();
    let span = tree.node(id).span;
    let after = &source[span.end()..];
    let line_end = after.find('\n').unwrap_or(after.len());
    line_prefix(source, span.index).trim().is_empty() && after[..line_end].trim().is_empty()
}

/// Whether the action closing a block (its `end`, or the next branch's
/// `else`) begins a new source line.
pub fn closer_starts_line(tree: &Tree, id: NodeId) -> bool {
    let Some(block) = tree.block(id) else {
        return false;
    };
    let closer = match block.end() {
        Some(end) => tree.node(end).span.index,
        None => tree.node(id).span.end(),
    };
    let gap = &tree.source()[block.body.content_start()..closer];
    gap.rfind('\n')
        .is_some_and(|newline| gap[newline + 1..].trim().is_empty())
}

/// Text between the start of the line containing `offset` and `offset`.
fn line_prefix(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    &source[line_start..offset]
}

/// Remove up to `width` leading spaces or tabs.
fn dedent(line: &str, width: usize) -> &str {
    let strip = line
        .bytes()
        .take(width)
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count();
    &line[strip..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Delimiters, InlineRole};
    use crate::builder::parse;
    use crate::doc::RenderOptions;
    use crate::options::FormatOptions;
    use pretty_assertions::assert_eq;

    fn inline(statement: &str, start: StartDelimiter, end: EndDelimiter) -> Inline {
        Inline {
            statement: statement.to_string(),
            keyword: None,
            delimiters: Delimiters { start, end },
            role: InlineRole::Standalone,
        }
    }

    fn render(doc: &Doc) -> String {
        doc.render(&RenderOptions::default())
    }

    #[test]
    fn test_bracket_spacing() {
        let action = inline(".Title", StartDelimiter::None, EndDelimiter::None);
        assert_eq!(render(&print_action(&action, true)), "{{ .Title }}");
        assert_eq!(render(&print_action(&action, false)), "{{.Title}}");
    }

    #[test]
    fn test_delimiters_preserved() {
        let trim = inline(r#"define "p""#, StartDelimiter::Trim, EndDelimiter::Trim);
        assert_eq!(render(&print_action(&trim, true)), r#"{{- define "p" -}}"#);
        assert_eq!(render(&print_action(&trim, false)), r#"{{- define "p" -}}"#);

        let shortcode = inline("figure", StartDelimiter::AngleBracket, EndDelimiter::AngleBracket);
        assert_eq!(render(&print_action(&shortcode, true)), "{{< figure >}}");

        let comment = inline("note", StartDelimiter::Comment, EndDelimiter::Comment);
        assert_eq!(render(&print_action(&comment, false)), "{{/*note*/}}");
    }

    #[test]
    fn test_empty_statement() {
        let empty = inline("", StartDelimiter::None, EndDelimiter::None);
        assert_eq!(render(&print_action(&empty, true)), "{{}}");
    }

    #[test]
    fn test_multiline_statement() {
        let action = inline(
            "dict\n      \"a\" 1\n   \"b\" 2",
            StartDelimiter::None,
            EndDelimiter::None,
        );
        assert_eq!(
            render(&print_action(&action, true)),
            "{{dict\n  \"a\" 1\n  \"b\" 2\n}}"
        );
    }

    #[test]
    fn test_has_node_linebreak() {
        let tree = parse("<p>\n  {{ .a }}  \n</p>{{ .b }}\n").unwrap();
        let children: Vec<_> = tree.children(tree.root()).collect();
        assert!(has_node_linebreak(&tree, children[0]));
        assert!(!has_node_linebreak(&tree, children[1]));
    }

    #[test]
    fn test_is_followed_by_empty_line() {
        assert!(is_followed_by_empty_line("x\n\n  {{ .b }}", 1));
        assert!(is_followed_by_empty_line("x \r\n \n\n{{", 1));
        assert!(!is_followed_by_empty_line("x\n{{ .b }}", 1));
        assert!(!is_followed_by_empty_line("x\n\n<p>", 1));
        assert!(!is_followed_by_empty_line("x\n\n", 1));
    }

    #[test]
    fn test_closer_starts_line() {
        let tree = parse("{{ if .a }}\n  x\n{{ end }}{{ with .b }} y {{ end }}").unwrap();
        let children: Vec<_> = tree.children(tree.root()).collect();
        assert!(closer_starts_line(&tree, children[0]));
        assert!(!closer_starts_line(&tree, children[1]));
    }

    #[test]
    fn test_verbatim_reindents_relative_lines() {
        let source = "<div>\n    <script>\n      let a = {{ .a }};\n    </script>\n</div>";
        let tree = parse(source).unwrap();
        let script = tree.children(tree.root()).next().unwrap();
        let doc = Doc::indent(Doc::concat([Doc::hardline(), print_verbatim(&tree, script)]));
        assert_eq!(
            render(&doc),
            "<script>\n    let a = {{ .a }};\n  </script>"
        );
    }

    #[test]
    fn test_verbatim_keeps_blank_line_runs() {
        let source = "<script>\nlet a = {{ .a }};\n\n\nlet b;\n</script>";
        let tree = parse(source).unwrap();
        let script = tree.children(tree.root()).next().unwrap();
        assert_eq!(render(&print_verbatim(&tree, script)), source);
    }

    #[test]
    fn test_print_inline_keeps_blank_line() {
        let tree = parse("{{ .a }}\n\n\n{{ .b }}").unwrap();
        let options = FormatOptions::default();
        let ctx = PrintContext {
            tree: &tree,
            options: &options,
        };
        let first = tree.children(tree.root()).next().unwrap();
        let doc = Doc::concat([print_inline(&ctx, first).unwrap(), Doc::text("next")]);
        assert_eq!(render(&doc), "{{ .a }}\nnext");
    }
}
