/*
 * scanner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Single-pass scanner over template source.
//!
//! The scanner yields two kinds of tokens, in source order and never
//! overlapping:
//!
//! - template actions: `{{` + optional start delimiter + statement +
//!   optional end delimiter + `}}`, with the leading control keyword (if any)
//!   split out;
//! - unformattable regions: `<script>` / `<style>` elements whose body
//!   contains `{{`. Actions inside such a region are not reported.
//!
//! Scanning never fails. Structural validation happens in the tree builder,
//! which only depends on [`Token`] and [`Scanner::next_token`].

use crate::ast::{Delimiters, EndDelimiter, Keyword, Span, StartDelimiter};
use regex::Regex;
use std::sync::LazyLock;

/// A template action:
/// - `start`: `-`, `<`, `%` or `/*` directly after `{{`
/// - `statement`: the action body, with the control keyword captured
///   separately when followed by a word boundary
/// - `end`: `-`, `>`, `%` or `*/` directly before `}}`
///
/// The statement ends at the first `}}`, even inside a string literal:
/// `{{ "}}" }}` scans as the action `{{ "}}` followed by text.
static ACTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\{\{(?P<start>-|<|%|/\*)?\s*(?P<statement>(?:(?P<keyword>prettier-ignore-start|prettier-ignore-end|if|range|block|with|define|end|else)\b)?(?s:.*?))\s*(?P<end>-|>|%|\*/)?\}\}",
    )
    .expect("Invalid regex pattern for template actions")
});

/// Opening `<script>` or `<style>` tag. Quoted attribute values may contain `>`.
static RAW_TEXT_OPEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?P<tag>script|style)\b(?:"[^"]*"|'[^']*'|[^'">])*>"#)
        .expect("Invalid regex pattern for script/style tags")
});

/// A scanned template action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action<'a> {
    /// Span of the whole action, braces included.
    pub span: Span,
    /// The statement, trimmed. `None` only if the grammar failed to capture it.
    pub statement: Option<&'a str>,
    pub keyword: Option<Keyword>,
    pub delimiters: Delimiters,
}

/// A lexeme produced by the [`Scanner`].
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Action(Action<'a>),
    /// A script/style element passed through verbatim.
    Unformattable(Span),
}

impl Token<'_> {
    pub fn span(&self) -> Span {
        match self {
            Token::Action(action) => action.span,
            Token::Unformattable(span) => *span,
        }
    }
}

/// Tokenizer over a template document.
#[derive(Debug)]
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    /// Next unformattable region at or after `pos`, once searched for.
    next_region: Option<Option<Span>>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            next_region: None,
        }
    }

    /// Return the next token, or `None` at the end of the input.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        let region = self.peek_region();
        let action = ACTION_PATTERN.captures_at(self.source, self.pos);
        let action_start = action
            .as_ref()
            .and_then(|caps| caps.get(0))
            .map(|m| m.start());

        let token = match (action_start, region) {
            (Some(start), Some(region)) if region.index < start => Token::Unformattable(region),
            (None, Some(region)) => Token::Unformattable(region),
            (Some(_), _) => {
                let caps = action?;
                let whole = caps.get(0)?;
                let keyword = caps
                    .name("keyword")
                    .and_then(|m| Keyword::from_source(m.as_str()));
                Token::Action(Action {
                    span: Span::from_bounds(whole.start(), whole.end()),
                    statement: caps.name("statement").map(|m| m.as_str().trim()),
                    keyword,
                    delimiters: Delimiters {
                        start: caps
                            .name("start")
                            .map(|m| StartDelimiter::from_source(m.as_str()))
                            .unwrap_or_default(),
                        end: caps
                            .name("end")
                            .map(|m| EndDelimiter::from_source(m.as_str()))
                            .unwrap_or_default(),
                    },
                })
            }
            (None, None) => return None,
        };

        self.pos = token.span().end();
        Some(token)
    }

    /// The next unformattable region that starts at or after `pos`.
    fn peek_region(&mut self) -> Option<Span> {
        if let Some(Some(region)) = self.next_region {
            if region.index < self.pos {
                self.next_region = None;
            }
        }
        if self.next_region.is_none() {
            self.next_region = Some(find_raw_text_region(self.source, self.pos));
        }
        self.next_region.flatten()
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Find the first `<script>`/`<style>` element at or after `from` whose body
/// contains template syntax before its closing tag.
fn find_raw_text_region(source: &str, from: usize) -> Option<Span> {
    let mut search = from;
    while let Some(caps) = RAW_TEXT_OPEN_PATTERN.captures_at(source, search) {
        let (Some(open), Some(tag)) = (caps.get(0), caps.name("tag")) else {
            break;
        };
        let body_start = open.end();
        let closing = format!("</{}", tag.as_str());

        if let Some(offset) = source[body_start..].find(&closing) {
            let close_start = body_start + offset;
            if source[body_start..close_start].contains("{{") {
                if let Some(gt) = source[close_start..].find('>') {
                    return Some(Span::from_bounds(open.start(), close_start + gt + 1));
                }
            }
        }
        search = body_start;
    }
    None
}
