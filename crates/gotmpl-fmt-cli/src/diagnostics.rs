/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Terminal rendering of formatting errors.

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use gotmpl_fmt::FormatError;
use std::ops::Range;

/// Render an error for `path`, with a source snippet when the error has a
/// location.
pub fn render_error(path: &str, source: &str, err: &FormatError, color: bool) -> String {
    let Some(span) = err.span() else {
        return format!("Error: {path}: {err}\n");
    };
    let range = char_range(source, span.index, span.end());

    let report = Report::build(ReportKind::Error, path.to_string(), range.start)
        .with_config(Config::default().with_color(color))
        .with_message(err.to_string())
        .with_label(
            Label::new((path.to_string(), range))
                .with_message(label_message(err))
                .with_color(Color::Red),
        )
        .finish();

    let mut output = Vec::new();
    if report
        .write((path.to_string(), Source::from(source)), &mut output)
        .is_err()
    {
        return format!("Error: {path}: {err}\n");
    }
    String::from_utf8_lossy(&output).into_owned()
}

fn label_message(err: &FormatError) -> String {
    match err {
        FormatError::UnterminatedBlock { keyword, .. } => {
            format!("this {keyword} block is never closed")
        }
        FormatError::UnexpectedEnd { keyword, .. } => {
            format!("no open block for this {keyword}")
        }
        FormatError::UnexpectedElse { .. } => "no open block for this else".to_string(),
        FormatError::MissingStatement { .. } => "empty action".to_string(),
        FormatError::NestingTooDeep { .. } => "nested too deeply".to_string(),
        FormatError::EmbedFailure { .. } => "while formatting this".to_string(),
        FormatError::Config(_) | FormatError::Io(_) => err.to_string(),
    }
}

/// Labels are positioned in characters, spans are in bytes.
fn char_range(source: &str, start: usize, end: usize) -> Range<usize> {
    let clamp = |offset: usize| {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        source[..offset].chars().count()
    };
    clamp(start)..clamp(end)
}
