/*
 * embed.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Embedding of containers.
//!
//! The aliased content of a root or block goes through the markup formatter.
//! Every placeholder in the resulting text leaves is then replaced by the
//! printed child it stands for. A block wraps the result between its start
//! and end actions.

use crate::ast::{Block, Container, Keyword, NodeId, NodeKind, Span};
use crate::doc::{Doc, Line};
use crate::error::{FormatError, FormatResult};
use crate::markup::{MarkupFormatter, MarkupOptions};
use crate::plugin::{PrintChild, PrintContext};
use crate::printer::{closer_starts_line, empty_line, print_verbatim};
use indexmap::IndexMap;

/// Embed a root or block node. Returns `None` for every other node kind.
pub fn embed_node(
    ctx: &PrintContext<'_>,
    id: NodeId,
    print_child: &mut PrintChild<'_>,
    markup: &dyn MarkupFormatter,
) -> FormatResult<Option<Doc>> {
    let node = ctx.tree.node(id);
    match &node.kind {
        NodeKind::Root(container) => {
            let options = MarkupOptions { embedded: false };
            let content = embed_container(container, node.span, &options, print_child, markup)?;
            Ok(Some(Doc::concat([content, Doc::hardline()])))
        }
        NodeKind::Block(block) => embed_block(ctx, id, block, print_child, markup).map(Some),
        _ => Ok(None),
    }
}

fn embed_block(
    ctx: &PrintContext<'_>,
    id: NodeId,
    block: &Block,
    print_child: &mut PrintChild<'_>,
    markup: &dyn MarkupFormatter,
) -> FormatResult<Doc> {
    let tree = ctx.tree;
    let node = tree.node(id);
    if node.ignored {
        return Ok(Doc::concat([print_verbatim(tree, id), empty_line(tree, id)]));
    }

    let start = print_child(block.start)?;
    let end = block.end().map(&mut *print_child).transpose()?;

    if block.keyword == Keyword::PrettierIgnoreStart {
        let body = &tree.source()[block.body.content.clone()];
        return Ok(Doc::concat([
            print_ignored_region(start, body, end.unwrap_or_default()),
            empty_line(tree, id),
        ]));
    }

    let (leading, body, trailing) = if block.body.aliased_content.trim().is_empty() {
        (Line::Soft, Doc::Empty, Line::Soft)
    } else {
        let options = MarkupOptions { embedded: true };
        let content = embed_container(&block.body, node.span, &options, print_child, markup)?;
        split_edge_lines(content)
    };

    let body = if body.is_empty() {
        Doc::Empty
    } else if block.keyword == Keyword::Define {
        Doc::concat([Doc::Line(leading), body])
    } else {
        Doc::indent(Doc::concat([Doc::Line(leading), body]))
    };
    let doc = Doc::concat([start, body, Doc::Line(trailing), end.unwrap_or_default()]);

    if tree.is_branch(id) {
        return Ok(doc);
    }
    Ok(Doc::concat([
        Doc::group_with_break(doc, closer_starts_line(tree, id)),
        empty_line(tree, id),
    ]))
}

/// Format a container's aliased content and splice its children back in.
fn embed_container(
    container: &Container,
    span: Span,
    options: &MarkupOptions,
    print_child: &mut PrintChild<'_>,
    markup: &dyn MarkupFormatter,
) -> FormatResult<Doc> {
    tracing::debug!(
        index = span.index,
        children = container.children.len(),
        embedded = options.embedded,
        "embedding container"
    );
    let doc = markup
        .format(&container.aliased_content, options)?
        .strip_trailing_hardline()
        .merge_text();
    splice(doc, &container.children, span, print_child)
}

/// Replace every placeholder in the text leaves of `doc` by its printed child.
///
/// Each child must be found exactly once.
pub fn splice(
    doc: Doc,
    children: &IndexMap<String, NodeId>,
    span: Span,
    print_child: &mut PrintChild<'_>,
) -> FormatResult<Doc> {
    let mut counts = vec![0usize; children.len()];
    let doc = doc.try_map_text(&mut |text| {
        splice_text(&text, children, &mut counts, &mut *print_child)
    })?;

    for ((placeholder, _), count) in children.iter().zip(&counts) {
        if *count != 1 {
            return Err(FormatError::embed(
                format!("placeholder {placeholder} resolved {count} times"),
                span,
            ));
        }
    }
    Ok(doc)
}

fn splice_text(
    text: &str,
    children: &IndexMap<String, NodeId>,
    counts: &mut [usize],
    print_child: &mut PrintChild<'_>,
) -> FormatResult<Doc> {
    let mut parts = Vec::new();
    let mut rest = text;
    loop {
        let next = children
            .keys()
            .enumerate()
            .filter_map(|(index, key)| rest.find(key.as_str()).map(|pos| (pos, index)))
            .min();
        let Some((pos, index)) = next else {
            parts.push(Doc::text(rest));
            break;
        };
        let Some((placeholder, child)) = children.get_index(index) else {
            break;
        };
        parts.push(Doc::text(&rest[..pos]));
        parts.push(print_child(*child)?);
        counts[index] += 1;
        rest = &rest[pos + placeholder.len()..];
    }
    Ok(Doc::concat(parts))
}

/// Take edge `Line::Normal` breaks off a block body so they replace the soft
/// lines around it.
fn split_edge_lines(doc: Doc) -> (Line, Doc, Line) {
    let Doc::Concat(mut parts) = doc else {
        return (Line::Soft, doc, Line::Soft);
    };
    let leading = if parts.first() == Some(&Doc::line()) {
        parts.remove(0);
        Line::Normal
    } else {
        Line::Soft
    };
    let trailing = if parts.last() == Some(&Doc::line()) {
        parts.pop();
        Line::Normal
    } else {
        Line::Soft
    };
    (leading, Doc::concat(parts), trailing)
}

/// The body of a `prettier-ignore-start` block: raw lines between the
/// actions, without blank first and last lines.
fn print_ignored_region(start: Doc, body: &str, end: Doc) -> Doc {
    let mut lines: Vec<&str> = body.split('\n').map(str::trim_end).collect();
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    if lines.first().is_some_and(|line| line.is_empty()) {
        lines.remove(0);
    }

    let mut parts = vec![start.remove_lines()];
    for line in lines {
        parts.push(Doc::literalline());
        parts.push(Doc::text(line));
    }
    parts.push(Doc::hardline());
    parts.push(end);
    Doc::concat(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::RenderOptions;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_splice_replaces_adjacent_placeholders() {
        let mut children = IndexMap::new();
        children.insert("_gt0_".to_string(), NodeId(1));
        children.insert("_gt1_".to_string(), NodeId(2));
        let doc = Doc::concat([Doc::text("a _gt1__gt0_ b")]);
        let mut print_child =
            |id: NodeId| -> FormatResult<Doc> { Ok(Doc::text(format!("<{}>", id.index()))) };
        let spliced = splice(doc, &children, Span::default(), &mut print_child).unwrap();
        assert_eq!(
            spliced.render(&RenderOptions::default()),
            "a <2><1> b"
        );
    }

    #[test]
    fn test_splice_missing_placeholder_fails() {
        let mut children = IndexMap::new();
        children.insert("_gt0_".to_string(), NodeId(1));
        let mut print_child = |_: NodeId| -> FormatResult<Doc> { Ok(Doc::text("x")) };
        let err = splice(Doc::text("nothing"), &children, Span::new(0, 7), &mut print_child)
            .unwrap_err();
        assert!(matches!(err, FormatError::EmbedFailure { .. }));
        assert_eq!(err.span(), Some(Span::new(0, 7)));
    }

    #[test]
    fn test_splice_duplicate_placeholder_fails() {
        let mut children = IndexMap::new();
        children.insert("_gt0_".to_string(), NodeId(1));
        let mut print_child = |_: NodeId| -> FormatResult<Doc> { Ok(Doc::text("x")) };
        let doc = Doc::concat([Doc::text("_gt0_"), Doc::hardline(), Doc::text("_gt0_")]);
        assert!(splice(doc, &children, Span::default(), &mut print_child).is_err());
    }

    #[test]
    fn test_split_edge_lines() {
        let doc = Doc::Concat(vec![Doc::line(), Doc::text("a"), Doc::line()]);
        let (leading, body, trailing) = split_edge_lines(doc);
        assert_eq!(leading, Line::Normal);
        assert_eq!(body, Doc::text("a"));
        assert_eq!(trailing, Line::Normal);

        let (leading, body, trailing) = split_edge_lines(Doc::text("b"));
        assert_eq!((leading, trailing), (Line::Soft, Line::Soft));
        assert_eq!(body, Doc::text("b"));
    }

    #[test]
    fn test_ignored_region_keeps_raw_lines() {
        let doc = print_ignored_region(
            Doc::text("{{ prettier-ignore-start }}"),
            "\n  <p>   keep  </p>\n\n<b>x</b>\n",
            Doc::text("{{ prettier-ignore-end }}"),
        );
        assert_eq!(
            doc.render(&RenderOptions::default()),
            "{{ prettier-ignore-start }}\n  <p>   keep  </p>\n\n<b>x</b>\n{{ prettier-ignore-end }}"
        );
    }
}
