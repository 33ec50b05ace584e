/*
 * format.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Formatting driver.

use crate::ast::NodeId;
use crate::doc::Doc;
use crate::error::{FormatError, FormatResult};
use crate::id::IdGenerator;
use crate::markup::{HtmlFormatter, MarkupFormatter};
use crate::options::{EmbedErrorPolicy, FormatOptions};
use crate::plugin::{GoTemplatePlugin, PrintContext};
use crate::printer::print_verbatim;

/// Format a template document with the built-in HTML formatter.
///
/// # Errors
///
/// Returns a parse error for malformed template structure, or
/// [`FormatError::EmbedFailure`] when a node could not be embedded and the
/// options ask for strict handling.
///
/// # Example
///
/// ```
/// use gotmpl_fmt::{format, FormatOptions};
///
/// let output = format("{{   define \"p\"}}\n{{   . }}\n{{end}} ", &FormatOptions::default())?;
/// assert_eq!(output, "{{ define \"p\" }}\n{{ . }}\n{{ end }}\n");
/// # Ok::<(), gotmpl_fmt::FormatError>(())
/// ```
pub fn format(text: &str, options: &FormatOptions) -> FormatResult<String> {
    format_with(text, options, &HtmlFormatter)
}

/// Format a template document with a custom markup formatter.
pub fn format_with(
    text: &str,
    options: &FormatOptions,
    markup: &dyn MarkupFormatter,
) -> FormatResult<String> {
    tracing::debug!(bytes = text.len(), "formatting template");
    let tree = GoTemplatePlugin::parse(text, options)?;
    let ctx = PrintContext {
        tree: &tree,
        options,
    };

    let doc = print_node(&ctx, tree.root(), markup).inspect_err(|err| {
        tracing::error!(error = %err, "failed to format template");
    })?;
    let output = doc.render(&options.render_options());

    let prefix = IdGenerator::new(text);
    if let Some(pos) = output.find(prefix.prefix()) {
        tracing::error!(offset = pos, "placeholder left in output");
        return Err(FormatError::embed("placeholder left in output", None));
    }
    Ok(output)
}

/// Embed the node if it is a container, print it otherwise.
fn print_node(
    ctx: &PrintContext<'_>,
    id: NodeId,
    markup: &dyn MarkupFormatter,
) -> FormatResult<Doc> {
    let mut print_child = |child: NodeId| print_node(ctx, child, markup);
    match GoTemplatePlugin::embed(ctx, id, &mut print_child, markup) {
        Ok(Some(doc)) => Ok(doc),
        Ok(None) => GoTemplatePlugin::print(ctx, id, &mut print_child),
        Err(err) if ctx.options.embed_errors == EmbedErrorPolicy::Passthrough => {
            tracing::warn!(
                node = id.index(),
                error = %err,
                "keeping original text of node that failed to embed"
            );
            let verbatim = print_verbatim(ctx.tree, id);
            if id == ctx.tree.root() {
                Ok(Doc::concat([verbatim, Doc::hardline()]))
            } else {
                Ok(verbatim)
            }
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::MarkupOptions;
    use pretty_assertions::assert_eq;

    /// Drops every placeholder it is given.
    struct LossyFormatter;

    impl MarkupFormatter for LossyFormatter {
        fn format(&self, markup: &str, _options: &MarkupOptions) -> FormatResult<Doc> {
            let kept: String = markup
                .split_whitespace()
                .filter(|word| !word.contains("_gt"))
                .collect::<Vec<_>>()
                .join(" ");
            Ok(Doc::concat([Doc::text(kept), Doc::hardline()]))
        }
    }

    #[test]
    fn test_strict_policy_fails() {
        let err = format_with("<p> {{ .a }} </p>", &FormatOptions::default(), &LossyFormatter)
            .unwrap_err();
        assert!(matches!(err, FormatError::EmbedFailure { .. }));
    }

    #[test]
    fn test_passthrough_policy_keeps_source() {
        let options = FormatOptions {
            embed_errors: EmbedErrorPolicy::Passthrough,
            ..FormatOptions::default()
        };
        let output = format_with("<p> {{ .a }}   </p>", &options, &LossyFormatter).unwrap();
        assert_eq!(output, "<p> {{ .a }}   </p>\n");
    }

    #[test]
    fn test_parse_errors_are_not_swallowed() {
        let options = FormatOptions {
            embed_errors: EmbedErrorPolicy::Passthrough,
            ..FormatOptions::default()
        };
        assert!(format("{{ end }}", &options).is_err());
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(format("", &FormatOptions::default()).unwrap(), "");
        assert_eq!(format(" \n\n ", &FormatOptions::default()).unwrap(), "");
    }
}
