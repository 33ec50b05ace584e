/*
 * doc.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Print tree for formatted output.
//!
//! A `Doc` describes output structurally: text, concatenation, indentation,
//! groups and line breaks. The renderer decides per group whether it fits on
//! the remaining line ("flat") or has to be broken, in the style of Wadler's
//! "prettier printer".
//!
//! Line breaks come in five flavors:
//! - `Soft`: nothing when flat, a newline when broken
//! - `Normal`: a space when flat, a newline when broken
//! - `Hard`: always a newline, and forces every enclosing group to break
//! - `Verbatim`: like `Hard`, but never merged into a run of blank lines
//! - `Literal`: like `Verbatim`, and the next line starts at column 0
//!
//! Runs of blank lines made of the first three collapse to one. The last two
//! carry source text that is reproduced as written.
//!
//! Call [`Doc::propagate_breaks`] once before rendering so groups containing
//! hard lines are marked as broken. [`Doc::render`] does this itself.

use crate::error::FormatResult;

/// Kind of line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Soft,
    Normal,
    Hard,
    Verbatim,
    Literal,
}

/// A structured document representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Doc {
    /// Empty document (produces no output).
    #[default]
    Empty,

    /// Literal text. Never contains a newline.
    Text(String),

    /// Concatenation of documents.
    Concat(Vec<Doc>),

    /// Increase the indentation of line breaks inside by one level.
    Indent(Box<Doc>),

    /// A unit that is printed flat if it fits on the line.
    Group { contents: Box<Doc>, should_break: bool },

    /// A line break.
    Line(Line),
}

/// Renderer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Preferred maximum line width.
    pub print_width: usize,
    /// Width of one indentation level.
    pub tab_width: usize,
    /// Indent with tabs instead of spaces.
    pub use_tabs: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            print_width: 80,
            tab_width: 2,
            use_tabs: false,
        }
    }
}

impl Doc {
    /// Create a text document from a string.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() { Doc::Empty } else { Doc::Text(s) }
    }

    /// Concatenate documents, dropping empty ones.
    pub fn concat(docs: impl IntoIterator<Item = Doc>) -> Self {
        let mut parts: Vec<Doc> = docs.into_iter().filter(|d| !d.is_empty()).collect();
        match parts.len() {
            0 => Doc::Empty,
            1 => parts.pop().unwrap_or_default(),
            _ => Doc::Concat(parts),
        }
    }

    pub fn indent(inner: Doc) -> Self {
        if inner.is_empty() {
            Doc::Empty
        } else {
            Doc::Indent(Box::new(inner))
        }
    }

    /// Indent `inner` by `levels` levels.
    pub fn indent_by(levels: usize, inner: Doc) -> Self {
        (0..levels).fold(inner, |doc, _| Doc::indent(doc))
    }

    pub fn group(contents: Doc) -> Self {
        Doc::group_with_break(contents, false)
    }

    /// A group that is broken regardless of its width when `should_break`.
    pub fn group_with_break(contents: Doc, should_break: bool) -> Self {
        Doc::Group {
            contents: Box::new(contents),
            should_break,
        }
    }

    pub fn softline() -> Self {
        Doc::Line(Line::Soft)
    }

    pub fn line() -> Self {
        Doc::Line(Line::Normal)
    }

    pub fn hardline() -> Self {
        Doc::Line(Line::Hard)
    }

    pub fn verbatimline() -> Self {
        Doc::Line(Line::Verbatim)
    }

    pub fn literalline() -> Self {
        Doc::Line(Line::Literal)
    }

    /// Check if this document produces no output.
    pub fn is_empty(&self) -> bool {
        match self {
            Doc::Empty => true,
            Doc::Text(s) => s.is_empty(),
            Doc::Concat(docs) => docs.iter().all(Doc::is_empty),
            Doc::Indent(inner) => inner.is_empty(),
            Doc::Group { contents, .. } => contents.is_empty(),
            Doc::Line(_) => false,
        }
    }

    /// Rebuild the document, replacing every text leaf with `f(text)`.
    pub fn map_text(self, f: &mut impl FnMut(String) -> Doc) -> Doc {
        match self {
            Doc::Text(s) => f(s),
            Doc::Concat(docs) => Doc::Concat(docs.into_iter().map(|d| d.map_text(f)).collect()),
            Doc::Indent(inner) => Doc::Indent(Box::new(inner.map_text(f))),
            Doc::Group {
                contents,
                should_break,
            } => Doc::Group {
                contents: Box::new(contents.map_text(f)),
                should_break,
            },
            other => other,
        }
    }

    /// Fallible [`Doc::map_text`]. Stops at the first error.
    pub fn try_map_text(
        self,
        f: &mut impl FnMut(String) -> FormatResult<Doc>,
    ) -> FormatResult<Doc> {
        Ok(match self {
            Doc::Text(s) => f(s)?,
            Doc::Concat(docs) => Doc::Concat(
                docs.into_iter()
                    .map(|d| d.try_map_text(f))
                    .collect::<FormatResult<Vec<_>>>()?,
            ),
            Doc::Indent(inner) => Doc::Indent(Box::new(inner.try_map_text(f)?)),
            Doc::Group {
                contents,
                should_break,
            } => Doc::Group {
                contents: Box::new(contents.try_map_text(f)?),
                should_break,
            },
            other => other,
        })
    }

    /// Remove a final hard line, looking through trailing concatenations.
    pub fn strip_trailing_hardline(self) -> Doc {
        match self {
            Doc::Line(Line::Hard | Line::Verbatim | Line::Literal) => Doc::Empty,
            Doc::Concat(mut docs) => {
                while matches!(docs.last(), Some(d) if d.is_empty()) {
                    docs.pop();
                }
                if let Some(last) = docs.pop() {
                    docs.push(last.strip_trailing_hardline());
                }
                Doc::concat(docs)
            }
            Doc::Indent(inner) => Doc::indent(inner.strip_trailing_hardline()),
            Doc::Group {
                contents,
                should_break,
            } => Doc::Group {
                contents: Box::new(contents.strip_trailing_hardline()),
                should_break,
            },
            other => other,
        }
    }

    /// Join adjacent text leaves into one.
    pub fn merge_text(self) -> Doc {
        match self {
            Doc::Concat(docs) => {
                let mut merged: Vec<Doc> = Vec::with_capacity(docs.len());
                for doc in docs.into_iter().map(Doc::merge_text) {
                    let doc = match doc {
                        Doc::Concat(inner) => inner,
                        other => vec![other],
                    };
                    for part in doc {
                        match (merged.last_mut(), part) {
                            (Some(Doc::Text(prev)), Doc::Text(next)) => prev.push_str(&next),
                            (_, part) => merged.push(part),
                        }
                    }
                }
                Doc::concat(merged)
            }
            Doc::Indent(inner) => Doc::indent(inner.merge_text()),
            Doc::Group {
                contents,
                should_break,
            } => Doc::Group {
                contents: Box::new(contents.merge_text()),
                should_break,
            },
            other => other,
        }
    }

    /// Replace line breaks by their flat rendering: soft lines vanish, the
    /// others become a single space.
    pub fn remove_lines(self) -> Doc {
        match self {
            Doc::Line(Line::Soft) => Doc::Empty,
            Doc::Line(_) => Doc::text(" "),
            Doc::Concat(docs) => Doc::concat(docs.into_iter().map(Doc::remove_lines)),
            Doc::Indent(inner) => Doc::indent(inner.remove_lines()),
            Doc::Group { contents, .. } => Doc::group(contents.remove_lines()),
            other => other,
        }
    }

    /// Mark every group that contains a hard line or a broken group as
    /// broken. Returns whether `self` forces a break.
    pub fn propagate_breaks(&mut self) -> bool {
        match self {
            Doc::Line(Line::Hard | Line::Verbatim | Line::Literal) => true,
            Doc::Concat(docs) => {
                let mut breaks = false;
                for doc in docs.iter_mut() {
                    breaks |= doc.propagate_breaks();
                }
                breaks
            }
            Doc::Indent(inner) => inner.propagate_breaks(),
            Doc::Group {
                contents,
                should_break,
            } => {
                if contents.propagate_breaks() {
                    *should_break = true;
                }
                *should_break
            }
            Doc::Empty | Doc::Text(_) | Doc::Line(_) => false,
        }
    }

    /// Render this document to a string.
    ///
    /// Trailing whitespace is removed from every line, no output starts with
    /// a newline, and runs of blank lines collapse to one unless they come
    /// from verbatim or literal lines.
    pub fn render(&self, options: &RenderOptions) -> String {
        let mut doc = self.clone();
        doc.propagate_breaks();
        Renderer::new(options).run(&doc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flat,
    Break,
}

#[derive(Debug, Clone, Copy)]
struct Command<'d> {
    indent: usize,
    mode: Mode,
    doc: &'d Doc,
}

struct Renderer<'o> {
    options: &'o RenderOptions,
    out: String,
    /// Width of the current line so far.
    column: usize,
}

impl<'o> Renderer<'o> {
    fn new(options: &'o RenderOptions) -> Self {
        Self {
            options,
            out: String::new(),
            column: 0,
        }
    }

    fn run(mut self, doc: &Doc) -> String {
        let mut stack = vec![Command {
            indent: 0,
            mode: Mode::Break,
            doc,
        }];

        while let Some(Command { indent, mode, doc }) = stack.pop() {
            match doc {
                Doc::Empty => {}
                Doc::Text(s) => {
                    self.out.push_str(s);
                    self.column += s.chars().count();
                }
                Doc::Concat(docs) => {
                    stack.extend(docs.iter().rev().map(|doc| Command { indent, mode, doc }));
                }
                Doc::Indent(inner) => stack.push(Command {
                    indent: indent + 1,
                    mode,
                    doc: inner,
                }),
                Doc::Group {
                    contents,
                    should_break,
                } => {
                    let flat = Command {
                        indent,
                        mode: Mode::Flat,
                        doc: contents,
                    };
                    let mode = match mode {
                        Mode::Flat if !should_break => Mode::Flat,
                        Mode::Flat => Mode::Break,
                        Mode::Break => {
                            let width = self.options.print_width as isize - self.column as isize;
                            if !should_break && fits(flat, &stack, width) {
                                Mode::Flat
                            } else {
                                Mode::Break
                            }
                        }
                    };
                    stack.push(Command { mode, ..flat });
                }
                Doc::Line(line) => match (mode, line) {
                    (Mode::Flat, Line::Soft) => {}
                    (Mode::Flat, Line::Normal) => {
                        self.out.push(' ');
                        self.column += 1;
                    }
                    (_, Line::Literal) => self.newline(0, false),
                    (_, Line::Verbatim) => self.newline(indent, false),
                    _ => self.newline(indent, true),
                },
            }
        }

        trim_trailing_whitespace(&mut self.out);
        self.out
    }

    /// Start a new line. With `collapse`, no break is added after a blank
    /// line.
    fn newline(&mut self, indent: usize, collapse: bool) {
        trim_trailing_whitespace(&mut self.out);
        if !self.out.is_empty() && !(collapse && self.out.ends_with("\n\n")) {
            self.out.push('\n');
        }
        self.column = 0;
        if self.out.is_empty() {
            return;
        }
        if self.options.use_tabs {
            self.out.extend(std::iter::repeat_n('\t', indent));
        } else {
            self.out
                .extend(std::iter::repeat_n(' ', indent * self.options.tab_width));
        }
        self.column = indent * self.options.tab_width;
    }
}

/// Whether `next` fits in `width` columns when printed flat. The rest of the
/// stack counts up to its first line break.
fn fits(next: Command<'_>, rest: &[Command<'_>], mut width: isize) -> bool {
    let mut rest_index = rest.len();
    let mut cmds = vec![(next.mode, next.doc)];

    while width >= 0 {
        let Some((mode, doc)) = cmds.pop() else {
            if rest_index == 0 {
                return true;
            }
            rest_index -= 1;
            cmds.push((rest[rest_index].mode, rest[rest_index].doc));
            continue;
        };
        match doc {
            Doc::Empty => {}
            Doc::Text(s) => width -= s.chars().count() as isize,
            Doc::Concat(docs) => cmds.extend(docs.iter().rev().map(|d| (mode, d))),
            Doc::Indent(inner) => cmds.push((mode, inner)),
            Doc::Group {
                contents,
                should_break,
            } => {
                let mode = if *should_break { Mode::Break } else { mode };
                cmds.push((mode, contents));
            }
            Doc::Line(line) => {
                if mode == Mode::Break || matches!(line, Line::Hard | Line::Verbatim | Line::Literal) {
                    return true;
                }
                if *line == Line::Normal {
                    width -= 1;
                }
            }
        }
    }
    false
}

fn trim_trailing_whitespace(out: &mut String) {
    let trimmed = out.trim_end_matches([' ', '\t']).len();
    out.truncate(trimmed);
}

/// Concatenate multiple documents.
pub fn concat_docs(docs: impl IntoIterator<Item = Doc>) -> Doc {
    Doc::concat(docs)
}

/// Intersperse documents with a separator.
pub fn intersperse_docs(docs: Vec<Doc>, sep: Doc) -> Doc {
    let mut result = Vec::with_capacity(docs.len() * 2);
    for doc in docs {
        if doc.is_empty() {
            continue;
        }
        if !result.is_empty() {
            result.push(sep.clone());
        }
        result.push(doc);
    }
    Doc::concat(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(doc: &Doc) -> String {
        doc.render(&RenderOptions::default())
    }

    fn narrow(width: usize) -> RenderOptions {
        RenderOptions {
            print_width: width,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_text_and_concat() {
        let doc = Doc::concat([Doc::text("Hello, "), Doc::Empty, Doc::text("world")]);
        assert_eq!(render(&doc), "Hello, world");
        assert_eq!(Doc::text(""), Doc::Empty);
        assert_eq!(Doc::concat([Doc::Empty, Doc::text("x")]), Doc::text("x"));
    }

    #[test]
    fn test_group_fits_flat() {
        let doc = Doc::group(Doc::concat([
            Doc::text("{{ if x }}"),
            Doc::indent(Doc::concat([Doc::softline(), Doc::text("a")])),
            Doc::softline(),
            Doc::text("{{ end }}"),
        ]));
        assert_eq!(render(&doc), "{{ if x }}a{{ end }}");
        assert_eq!(doc.render(&narrow(10)), "{{ if x }}\n  a\n{{ end }}");
    }

    #[test]
    fn test_forced_group_break() {
        let doc = Doc::group_with_break(
            Doc::concat([Doc::text("a"), Doc::line(), Doc::text("b")]),
            true,
        );
        assert_eq!(render(&doc), "a\nb");
    }

    #[test]
    fn test_hardline_breaks_enclosing_groups() {
        let inner = Doc::group(Doc::concat([Doc::text("x"), Doc::hardline(), Doc::text("y")]));
        let mut doc = Doc::group(Doc::concat([Doc::text("a"), Doc::softline(), inner]));
        assert!(doc.propagate_breaks());
        assert_eq!(render(&doc), "a\nx\ny");
        match doc {
            Doc::Group { should_break, .. } => assert!(should_break),
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_propagation_visits_every_child() {
        let mut doc = Doc::concat([
            Doc::hardline(),
            Doc::group(Doc::concat([Doc::text("a"), Doc::hardline()])),
        ]);
        doc.propagate_breaks();
        match &doc {
            Doc::Concat(docs) => {
                assert!(matches!(docs[1], Doc::Group { should_break: true, .. }))
            }
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn test_line_is_space_when_flat() {
        let doc = Doc::group(Doc::concat([Doc::text("a"), Doc::line(), Doc::text("b")]));
        assert_eq!(render(&doc), "a b");
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let doc = Doc::concat([
            Doc::text("a  "),
            Doc::indent(Doc::concat([Doc::hardline(), Doc::hardline(), Doc::text("b")])),
            Doc::text(" "),
        ]);
        assert_eq!(render(&doc), "a\n\n  b");
    }

    #[test]
    fn test_blank_lines_collapse() {
        let doc = Doc::concat([
            Doc::text("a"),
            Doc::hardline(),
            Doc::hardline(),
            Doc::hardline(),
            Doc::hardline(),
            Doc::text("b"),
            Doc::hardline(),
        ]);
        assert_eq!(render(&doc), "a\n\nb\n");
    }

    #[test]
    fn test_verbatim_blank_lines_are_kept() {
        let doc = Doc::indent(Doc::concat([
            Doc::text("a"),
            Doc::verbatimline(),
            Doc::verbatimline(),
            Doc::verbatimline(),
            Doc::text("b"),
            Doc::literalline(),
            Doc::literalline(),
            Doc::literalline(),
            Doc::text("c"),
            Doc::hardline(),
            Doc::hardline(),
            Doc::text("d"),
        ]));
        assert_eq!(render(&doc), "a\n\n\n  b\n\n\nc\n\n  d");
    }

    #[test]
    fn test_no_leading_newline() {
        let doc = Doc::concat([Doc::hardline(), Doc::hardline(), Doc::text("a")]);
        assert_eq!(render(&doc), "a");
    }

    #[test]
    fn test_literal_line_ignores_indentation() {
        let doc = Doc::indent(Doc::concat([
            Doc::text("<pre>"),
            Doc::literalline(),
            Doc::text(" raw"),
            Doc::hardline(),
            Doc::text("x"),
        ]));
        assert_eq!(render(&doc), "<pre>\n raw\n  x");
    }

    #[test]
    fn test_tabs() {
        let doc = Doc::indent(Doc::concat([Doc::text("a"), Doc::hardline(), Doc::text("b")]));
        let options = RenderOptions {
            use_tabs: true,
            ..RenderOptions::default()
        };
        assert_eq!(doc.render(&options), "a\n\tb");
    }

    #[test]
    fn test_fits_considers_rest_of_line() {
        let doc = Doc::concat([
            Doc::group(Doc::concat([Doc::text("aaaa"), Doc::softline(), Doc::text("bb")])),
            Doc::text("cccc"),
        ]);
        assert_eq!(doc.render(&narrow(10)), "aaaabbcccc");
        assert_eq!(doc.render(&narrow(9)), "aaaa\nbbcccc");
    }

    #[test]
    fn test_map_text() {
        let doc = Doc::concat([Doc::text("a-b"), Doc::hardline(), Doc::text("c")]);
        let mapped = doc.map_text(&mut |s| Doc::text(s.replace('-', "+")));
        assert_eq!(render(&mapped), "a+b\nc");
    }

    #[test]
    fn test_try_map_text_propagates_error() {
        let doc = Doc::concat([Doc::text("ok"), Doc::text("bad")]);
        let result = doc.try_map_text(&mut |s| {
            if s == "bad" {
                Err(crate::error::FormatError::embed("bad leaf", None))
            } else {
                Ok(Doc::text(s))
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_trailing_hardline() {
        let doc = Doc::concat([
            Doc::text("a"),
            Doc::indent(Doc::concat([Doc::hardline(), Doc::text("b")])),
            Doc::hardline(),
        ]);
        assert_eq!(render(&doc.strip_trailing_hardline()), "a\n  b");
        assert_eq!(Doc::hardline().strip_trailing_hardline(), Doc::Empty);
        assert_eq!(Doc::text("x").strip_trailing_hardline(), Doc::text("x"));
    }

    #[test]
    fn test_merge_text() {
        let doc = Doc::concat([
            Doc::text("_g"),
            Doc::concat([Doc::text("t0"), Doc::text("_")]),
            Doc::hardline(),
            Doc::text("x"),
        ]);
        assert_eq!(
            doc.merge_text(),
            Doc::Concat(vec![Doc::text("_gt0_"), Doc::hardline(), Doc::text("x")])
        );
    }

    #[test]
    fn test_remove_lines() {
        let doc = Doc::concat([
            Doc::text("{{"),
            Doc::softline(),
            Doc::text("a"),
            Doc::hardline(),
            Doc::text("b"),
            Doc::text("}}"),
        ]);
        assert_eq!(render(&doc.remove_lines()), "{{a b}}");
    }

    #[test]
    fn test_intersperse_docs() {
        let doc = intersperse_docs(
            vec![Doc::text("a"), Doc::Empty, Doc::text("b")],
            Doc::text(", "),
        );
        assert_eq!(render(&doc), "a, b");
        assert_eq!(render(&concat_docs(vec![Doc::text("x"), Doc::text("y")])), "xy");
    }
}
