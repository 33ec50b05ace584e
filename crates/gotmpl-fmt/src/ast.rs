/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template document tree.
//!
//! Nodes live in a flat arena ([`Tree`]) and refer to each other through
//! [`NodeId`]s. Ownership flows from the root to the children; the `parent`
//! field is a lookup handle only.
//!
//! Every node records its span in the original source so the printer can
//! re-extract verbatim text and inspect the surrounding whitespace.

use indexmap::IndexMap;
use std::fmt;
use std::ops::Range;

/// Index of a node in the [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A byte range in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Offset of the first byte.
    pub index: usize,
    /// Length in bytes.
    pub length: usize,
}

impl Span {
    pub fn new(index: usize, length: usize) -> Self {
        Self { index, length }
    }

    /// Span covering `start..end`.
    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            index: start,
            length: end.saturating_sub(start),
        }
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> usize {
        self.index + self.length
    }

    pub fn range(&self) -> Range<usize> {
        self.index..self.end()
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.index <= other.index && other.end() <= self.end()
    }
}

/// Control keywords recognized at the start of an action's statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Range,
    Block,
    With,
    Define,
    Else,
    End,
    PrettierIgnoreStart,
    PrettierIgnoreEnd,
}

impl Keyword {
    /// Parse a keyword as it appears in the source.
    pub fn from_source(word: &str) -> Option<Self> {
        Some(match word {
            "if" => Keyword::If,
            "range" => Keyword::Range,
            "block" => Keyword::Block,
            "with" => Keyword::With,
            "define" => Keyword::Define,
            "else" => Keyword::Else,
            "end" => Keyword::End,
            "prettier-ignore-start" => Keyword::PrettierIgnoreStart,
            "prettier-ignore-end" => Keyword::PrettierIgnoreEnd,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Range => "range",
            Keyword::Block => "block",
            Keyword::With => "with",
            Keyword::Define => "define",
            Keyword::Else => "else",
            Keyword::End => "end",
            Keyword::PrettierIgnoreStart => "prettier-ignore-start",
            Keyword::PrettierIgnoreEnd => "prettier-ignore-end",
        }
    }

    /// Whether this keyword closes the current block.
    pub fn is_closer(self) -> bool {
        matches!(self, Keyword::End | Keyword::PrettierIgnoreEnd)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delimiter written between `{{` and the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartDelimiter {
    #[default]
    None,
    /// `{{-` trims preceding whitespace.
    Trim,
    /// `{{%`
    Percent,
    /// `{{<` shortcode
    AngleBracket,
    /// `{{/*` comment
    Comment,
}

impl StartDelimiter {
    pub fn from_source(text: &str) -> Self {
        match text {
            "-" => StartDelimiter::Trim,
            "%" => StartDelimiter::Percent,
            "<" => StartDelimiter::AngleBracket,
            "/*" => StartDelimiter::Comment,
            _ => StartDelimiter::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StartDelimiter::None => "",
            StartDelimiter::Trim => "-",
            StartDelimiter::Percent => "%",
            StartDelimiter::AngleBracket => "<",
            StartDelimiter::Comment => "/*",
        }
    }
}

/// Delimiter written between the statement and `}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndDelimiter {
    #[default]
    None,
    /// `-}}` trims following whitespace.
    Trim,
    /// `%}}`
    Percent,
    /// `>}}` shortcode
    AngleBracket,
    /// `*/}}` comment
    Comment,
}

impl EndDelimiter {
    pub fn from_source(text: &str) -> Self {
        match text {
            "-" => EndDelimiter::Trim,
            "%" => EndDelimiter::Percent,
            ">" => EndDelimiter::AngleBracket,
            "*/" => EndDelimiter::Comment,
            _ => EndDelimiter::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndDelimiter::None => "",
            EndDelimiter::Trim => "-",
            EndDelimiter::Percent => "%",
            EndDelimiter::AngleBracket => ">",
            EndDelimiter::Comment => "*/",
        }
    }
}

/// The pair of delimiters an action was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delimiters {
    pub start: StartDelimiter,
    pub end: EndDelimiter,
}

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Placeholder token standing in for this node in its parent's aliased
    /// content. Empty for the root.
    pub placeholder: String,
    /// Span in the original source.
    pub span: Span,
    /// Enclosing node; `None` for the root.
    pub parent: Option<NodeId>,
    /// Set when an ignore pragma precedes this node.
    pub ignored: bool,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root(Container),
    Block(Block),
    MultiBlock(MultiBlock),
    Inline(Inline),
    Unformattable,
}

/// Literal content of a root or block, with its children aliased.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Container {
    /// Byte range of the literal content in the source.
    pub content: Range<usize>,
    /// `content` with every direct child replaced by its placeholder.
    pub aliased_content: String,
    /// Direct children keyed by placeholder, in source order.
    pub children: IndexMap<String, NodeId>,
}

impl Container {
    pub(crate) fn new(content_start: usize) -> Self {
        Self {
            content: content_start..content_start,
            aliased_content: String::new(),
            children: IndexMap::new(),
        }
    }

    /// Offset where the literal content begins.
    pub fn content_start(&self) -> usize {
        self.content.start
    }
}

/// How a block was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockClose {
    /// Closed by its own `end` action.
    End(NodeId),
    /// Closed by the `else` action opening the next branch of its chain.
    Branch,
}

/// A paired control-flow region, e.g. `{{ if x }}...{{ end }}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub keyword: Keyword,
    /// The opening action (an [`Inline`] with role [`InlineRole::BlockStart`]).
    pub start: NodeId,
    pub close: BlockClose,
    pub body: Container,
}

impl Block {
    /// The closing action, if this block owns one.
    pub fn end(&self) -> Option<NodeId> {
        match self.close {
            BlockClose::End(id) => Some(id),
            BlockClose::Branch => None,
        }
    }
}

/// An `if/else/.../end` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiBlock {
    /// Branch blocks in source order; always at least two.
    pub branches: Vec<NodeId>,
}

/// Where an inline action sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineRole {
    Standalone,
    BlockStart,
    BlockEnd,
}

/// A single template action.
#[derive(Debug, Clone, PartialEq)]
pub struct Inline {
    /// The action body without braces, delimiters or surrounding whitespace.
    pub statement: String,
    pub keyword: Option<Keyword>,
    pub delimiters: Delimiters,
    pub role: InlineRole,
}

impl Inline {
    /// Whether this action opens or closes a block.
    pub fn is_block_delimiter(&self) -> bool {
        self.role != InlineRole::Standalone
    }
}

/// A parsed template document.
#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) source: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

impl Tree {
    /// The original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Number of nodes in the arena, including block start/end actions.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// The node's original source text.
    pub fn text(&self, id: NodeId) -> &str {
        &self.source[self.node(id).span.range()]
    }

    /// The container of a root or block node.
    pub fn container(&self, id: NodeId) -> Option<&Container> {
        match &self.node(id).kind {
            NodeKind::Root(container) => Some(container),
            NodeKind::Block(block) => Some(&block.body),
            _ => None,
        }
    }

    /// The literal content of a root or block.
    pub fn content(&self, id: NodeId) -> Option<&str> {
        self.container(id)
            .map(|container| &self.source[container.content.clone()])
    }

    pub fn block(&self, id: NodeId) -> Option<&Block> {
        match &self.node(id).kind {
            NodeKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn inline(&self, id: NodeId) -> Option<&Inline> {
        match &self.node(id).kind {
            NodeKind::Inline(inline) => Some(inline),
            _ => None,
        }
    }

    pub fn multi_block(&self, id: NodeId) -> Option<&MultiBlock> {
        match &self.node(id).kind {
            NodeKind::MultiBlock(multi) => Some(multi),
            _ => None,
        }
    }

    /// Direct children of a root or block, in source order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.container(id)
            .into_iter()
            .flat_map(|container| container.children.values().copied())
    }

    /// Whether the node is a branch of an `else` chain.
    pub fn is_branch(&self, id: NodeId) -> bool {
        self.parent(id)
            .is_some_and(|parent| self.multi_block(parent).is_some())
    }

    /// Iterate over all nodes in the arena.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }
}
