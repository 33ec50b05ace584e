/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Formatting options and configuration files.
//!
//! Options are read from TOML with kebab-case keys:
//!
//! ```toml
//! bracket-spacing = true
//! print-width = 100
//! tab-width = 4
//! use-tabs = false
//! embed-errors = "passthrough"
//! ```
//!
//! Missing keys fall back to their defaults; unknown keys are rejected.

use crate::doc::RenderOptions;
use crate::error::FormatResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up by front ends.
pub const CONFIG_FILE_NAME: &str = ".gotmpl-fmt.toml";

/// What to do when a node cannot be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedErrorPolicy {
    /// Fail the whole document.
    #[default]
    Strict,
    /// Keep the node's source text and continue.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct FormatOptions {
    /// Put a space between `{{` / `}}` and the statement.
    pub bracket_spacing: bool,
    pub print_width: usize,
    pub tab_width: usize,
    pub use_tabs: bool,
    pub embed_errors: EmbedErrorPolicy,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            bracket_spacing: true,
            print_width: 80,
            tab_width: 2,
            use_tabs: false,
            embed_errors: EmbedErrorPolicy::Strict,
        }
    }
}

impl FormatOptions {
    /// Parse options from TOML text.
    pub fn from_toml_str(text: &str) -> FormatResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> FormatResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let options = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(options)
    }

    /// Settings for the `Doc` renderer.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            print_width: self.print_width,
            tab_width: self.tab_width,
            use_tabs: self.use_tabs,
        }
    }
}
