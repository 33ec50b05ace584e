/*
 * plugin.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Formatter plugin entry points and language registry.
//!
//! A host drives formatting through three calls: [`GoTemplatePlugin::parse`]
//! builds the tree, and for every node it first tries
//! [`GoTemplatePlugin::embed`], falling back to [`GoTemplatePlugin::print`]
//! when that returns `None`. Both receive a callback that prints a child node
//! the same way. [`crate::format::format_with`] is the default host.

use crate::ast::{NodeId, NodeKind, Tree};
use crate::builder;
use crate::doc::Doc;
use crate::embed;
use crate::error::{FormatError, FormatResult};
use crate::markup::MarkupFormatter;
use crate::options::FormatOptions;
use crate::printer;
use std::path::Path;

/// Shared state for printing one tree.
#[derive(Debug, Clone, Copy)]
pub struct PrintContext<'a> {
    pub tree: &'a Tree,
    pub options: &'a FormatOptions,
}

/// Callback that prints a child node.
pub type PrintChild<'p> = dyn FnMut(NodeId) -> FormatResult<Doc> + 'p;

/// The template formatter plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoTemplatePlugin;

impl GoTemplatePlugin {
    /// Parser name registered with hosts.
    pub const PARSER_NAME: &'static str = "go-template";

    pub fn parse(text: &str, _options: &FormatOptions) -> FormatResult<Tree> {
        builder::parse(text)
    }

    /// Print a node that is not embedded: actions, `else` chains and
    /// unformattable regions.
    pub fn print(
        ctx: &PrintContext<'_>,
        id: NodeId,
        print_child: &mut PrintChild<'_>,
    ) -> FormatResult<Doc> {
        let tree = ctx.tree;
        let node = tree.node(id);
        match &node.kind {
            NodeKind::Inline(_) | NodeKind::MultiBlock(_) if node.ignored => {
                Ok(printer::print_unformattable(tree, id))
            }
            NodeKind::Inline(_) => printer::print_inline(ctx, id),
            NodeKind::MultiBlock(_) => printer::print_multi_block(ctx, id, print_child),
            NodeKind::Unformattable => Ok(printer::print_unformattable(tree, id)),
            NodeKind::Root(_) | NodeKind::Block(_) => Err(FormatError::embed(
                "roots and blocks are printed by embedding",
                node.span,
            )),
        }
    }

    /// Embed a root or block through the markup formatter. Returns `None`
    /// for nodes that [`GoTemplatePlugin::print`] handles.
    pub fn embed(
        ctx: &PrintContext<'_>,
        id: NodeId,
        print_child: &mut PrintChild<'_>,
        markup: &dyn MarkupFormatter,
    ) -> FormatResult<Option<Doc>> {
        embed::embed_node(ctx, id, print_child, markup)
    }
}

/// A language served by the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub parsers: &'static [&'static str],
    pub extensions: &'static [&'static str],
    /// Editor language identifiers.
    pub language_ids: &'static [&'static str],
}

pub static LANGUAGES: &[Language] = &[Language {
    name: "GoTemplate",
    parsers: &[GoTemplatePlugin::PARSER_NAME],
    extensions: &[
        ".go.html",
        ".gohtml",
        ".gotmpl",
        ".go.tmpl",
        ".tmpl",
        ".tpl",
        ".html.tmpl",
        ".html.tpl",
    ],
    language_ids: &["gotemplate", "gohtml", "GoTemplate", "GoHTML"],
}];

/// Whether the file name ends with a registered extension.
pub fn is_supported_path(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .flat_map(|language| language.extensions)
        .any(|extension| name.ends_with(extension) && name.len() > extension.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_paths() {
        assert!(is_supported_path(Path::new("layouts/_default/single.go.html")));
        assert!(is_supported_path(Path::new("partials/head.gohtml")));
        assert!(is_supported_path(Path::new("Page.TMPL")));
        assert!(is_supported_path(Path::new("x.html.tpl")));
        assert!(!is_supported_path(Path::new("index.html")));
        assert!(!is_supported_path(Path::new(".tmpl")));
        assert!(!is_supported_path(Path::new("templates")));
    }

    #[test]
    fn test_print_rejects_blocks() {
        let tree = GoTemplatePlugin::parse("{{ if .a }}x{{ end }}", &FormatOptions::default())
            .unwrap();
        let options = FormatOptions::default();
        let ctx = PrintContext {
            tree: &tree,
            options: &options,
        };
        let block = tree.children(tree.root()).next().unwrap();
        let mut print_child = |_: NodeId| -> FormatResult<Doc> { Ok(Doc::Empty) };
        let err = GoTemplatePlugin::print(&ctx, block, &mut print_child).unwrap_err();
        assert!(matches!(err, FormatError::EmbedFailure { .. }));
    }

    #[test]
    fn test_embed_skips_inline() {
        let tree = GoTemplatePlugin::parse("{{ .a }}", &FormatOptions::default()).unwrap();
        let options = FormatOptions::default();
        let ctx = PrintContext {
            tree: &tree,
            options: &options,
        };
        let inline = tree.children(tree.root()).next().unwrap();
        let mut print_child = |_: NodeId| -> FormatResult<Doc> { Ok(Doc::Empty) };
        let embedded =
            GoTemplatePlugin::embed(&ctx, inline, &mut print_child, &crate::HtmlFormatter)
                .unwrap();
        assert!(embedded.is_none());
    }
}
