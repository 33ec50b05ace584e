/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Formatter for HTML documents with embedded Go template actions.
//!
//! Template actions (`{{ ... }}`) are normalized and re-indented while the
//! surrounding markup is handed to a markup formatter. It supports:
//!
//! - Actions with trim (`{{- -}}`), percent (`{{% %}}`), shortcode
//!   (`{{< >}}`) and comment (`{{/* */}}`) delimiters
//! - Blocks: `if`, `range`, `block`, `with`, `define`, with `else` chains
//! - Ignore pragmas: `<!-- prettier-ignore -->`, `{{/* prettier-ignore */}}`
//!   and `{{ prettier-ignore-start }}...{{ prettier-ignore-end }}`
//! - `<script>` and `<style>` bodies with template syntax, kept verbatim
//!
//! # Architecture
//!
//! The [`scanner`] splits the source into actions and verbatim regions. The
//! [`builder`] pairs blocks into an arena [`Tree`] where every container
//! keeps its literal content with children replaced by placeholder tokens.
//! The [`embed`] step formats that aliased content with a
//! [`MarkupFormatter`] and splices the printed children back in, producing a
//! [`Doc`] that is rendered to the final string.
//!
//! # Example
//!
//! ```
//! use gotmpl_fmt::{format, FormatOptions};
//!
//! let output = format("<div>\n{{if .Show}}\n<p>{{.Text}}</p>\n{{end}}\n</div>", &FormatOptions::default())?;
//! assert_eq!(output, "<div>\n  {{ if .Show }}\n    <p>{{ .Text }}</p>\n  {{ end }}\n</div>\n");
//! # Ok::<(), gotmpl_fmt::FormatError>(())
//! ```

pub mod ast;
pub mod builder;
pub mod doc;
pub mod embed;
pub mod error;
pub mod format;
pub mod id;
pub mod markup;
pub mod options;
pub mod plugin;
pub mod printer;
pub mod scanner;

// Re-export main types at crate root
pub use ast::{Keyword, Node, NodeId, NodeKind, Span, Tree};
pub use builder::parse;
pub use doc::{Doc, RenderOptions};
pub use error::{FormatError, FormatResult};
pub use format::{format, format_with};
pub use markup::{HtmlFormatter, MarkupFormatter, MarkupOptions};
pub use options::{CONFIG_FILE_NAME, EmbedErrorPolicy, FormatOptions};
pub use plugin::{GoTemplatePlugin, LANGUAGES, Language, PrintContext, is_supported_path};
