/*
 * builder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tree builder.
//!
//! A stack machine over the scanner's tokens. The stack starts with the root;
//! block openers push a frame, `end` pops it, and `else` swaps the frame's
//! current branch for a new one while remembering the finished branches.
//!
//! Blocks are attached to their parent only once they are closed, so an
//! `if` followed by `else` never has to be rewritten into a chain after the
//! fact: the frame's pending branches decide at `end` whether a plain block
//! or a [`MultiBlock`] is attached.

use crate::ast::{
    Block, BlockClose, Container, Inline, InlineRole, Keyword, MultiBlock, Node, NodeId,
    NodeKind, Span, Tree,
};
use crate::error::{FormatError, FormatResult};
use crate::id::IdGenerator;
use crate::scanner::{Action, Scanner, Token};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Maximum number of simultaneously open blocks.
pub const MAX_NESTING_DEPTH: usize = 256;

/// A markup comment containing `prettier-ignore` that ends the line directly
/// above the node.
static IGNORE_COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--[^\n]*?prettier-ignore[^\n]*?-->[ \t]*\r?\n[ \t]*$")
        .expect("Invalid regex pattern for ignore comments")
});

/// Whitespace containing exactly one line break.
static SINGLE_LINE_BREAK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*\r?\n[ \t]*$").expect("Invalid regex pattern for line breaks")
});

/// Parse a template document into a [`Tree`].
///
/// # Errors
///
/// Fails with [`FormatError::UnexpectedEnd`], [`FormatError::UnexpectedElse`],
/// [`FormatError::UnterminatedBlock`], [`FormatError::MissingStatement`] or
/// [`FormatError::NestingTooDeep`] on malformed input.
pub fn parse(source: &str) -> FormatResult<Tree> {
    TreeBuilder::new(source).build()
}

/// An open block on the parse stack.
#[derive(Debug)]
struct Frame {
    /// The block currently receiving children (the last branch of a chain).
    block: NodeId,
    /// Closed branches of an `else` chain that precede `block`.
    branches: Vec<NodeId>,
}

struct TreeBuilder<'a> {
    source: &'a str,
    ids: IdGenerator,
    nodes: Vec<Node>,
    stack: Vec<Frame>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        let root = Node {
            placeholder: String::new(),
            span: Span::new(0, source.len()),
            parent: None,
            ignored: false,
            kind: NodeKind::Root(Container::new(0)),
        };
        Self {
            source,
            ids: IdGenerator::new(source),
            nodes: vec![root],
            stack: vec![Frame {
                block: NodeId(0),
                branches: Vec::new(),
            }],
        }
    }

    fn build(mut self) -> FormatResult<Tree> {
        let mut scanner = Scanner::new(self.source);
        while let Some(token) = scanner.next_token() {
            match token {
                Token::Unformattable(span) => {
                    tracing::trace!(index = span.index, length = span.length, "unformattable");
                    let current = self.current();
                    let id = self.push_node(span, NodeKind::Unformattable, Some(current));
                    self.attach(current, id);
                }
                Token::Action(action) => {
                    tracing::trace!(
                        index = action.span.index,
                        keyword = action.keyword.map(Keyword::as_str),
                        "action"
                    );
                    self.action(action)?;
                }
            }
        }

        if self.stack.len() > 1 {
            let open = self.current();
            let (keyword, span) = match &self.nodes[open.0].kind {
                NodeKind::Block(block) => (block.keyword, self.nodes[block.start.0].span),
                _ => (Keyword::End, self.nodes[open.0].span),
            };
            return Err(FormatError::UnterminatedBlock { keyword, span });
        }

        let root = NodeId(0);
        let content = 0..self.source.len();
        let aliased = self.alias(root, content.clone());
        if let NodeKind::Root(container) = &mut self.nodes[0].kind {
            container.content = content;
            container.aliased_content = aliased;
        }

        tracing::debug!(nodes = self.nodes.len(), "parsed template");
        Ok(Tree {
            source: self.source.to_string(),
            nodes: self.nodes,
            root,
        })
    }

    fn current(&self) -> NodeId {
        self.stack.last().map_or(NodeId(0), |frame| frame.block)
    }

    fn action(&mut self, action: Action<'_>) -> FormatResult<()> {
        let span = action.span;
        let statement = action
            .statement
            .ok_or(FormatError::MissingStatement { span })?;
        let current = self.current();
        let inline = Inline {
            statement: statement.to_string(),
            keyword: action.keyword,
            delimiters: action.delimiters,
            role: InlineRole::Standalone,
        };

        match action.keyword {
            Some(keyword) if keyword.is_closer() => {
                if self.stack.len() == 1 {
                    return Err(FormatError::UnexpectedEnd { keyword, span });
                }
                let end = self.push_node(
                    span,
                    NodeKind::Inline(Inline {
                        role: InlineRole::BlockEnd,
                        ..inline
                    }),
                    Some(current),
                );
                self.close_block(current, span.index, span.end(), BlockClose::End(end));

                let Some(mut frame) = self.stack.pop() else {
                    return Err(FormatError::UnexpectedEnd { keyword, span });
                };
                let finished = if frame.branches.is_empty() {
                    current
                } else {
                    frame.branches.push(current);
                    self.finish_chain(frame.branches)
                };
                let parent = self.current();
                self.attach(parent, finished);
            }
            Some(Keyword::Else) => {
                if self.stack.len() == 1 {
                    return Err(FormatError::UnexpectedElse { span });
                }
                self.close_block(current, span.index, span.index, BlockClose::Branch);
                let parent = self.nodes[current.0].parent;
                let branch = self.open_block(Keyword::Else, span, inline, parent);
                if let Some(frame) = self.stack.last_mut() {
                    frame.branches.push(current);
                    frame.block = branch;
                }
            }
            Some(keyword) => {
                if self.stack.len() > MAX_NESTING_DEPTH {
                    return Err(FormatError::NestingTooDeep {
                        max_depth: MAX_NESTING_DEPTH,
                        span,
                    });
                }
                let block = self.open_block(keyword, span, inline, Some(current));
                self.stack.push(Frame {
                    block,
                    branches: Vec::new(),
                });
            }
            None => {
                let id = self.push_node(span, NodeKind::Inline(inline), Some(current));
                self.attach(current, id);
            }
        }
        Ok(())
    }

    fn push_node(&mut self, span: Span, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            placeholder: self.ids.next_id(),
            span,
            parent,
            ignored: false,
            kind,
        });
        id
    }

    /// Create a block and its start action. The block is not attached yet.
    fn open_block(
        &mut self,
        keyword: Keyword,
        span: Span,
        start: Inline,
        parent: Option<NodeId>,
    ) -> NodeId {
        let block = NodeId(self.nodes.len());
        let start_id = NodeId(self.nodes.len() + 1);
        self.push_node(
            span,
            NodeKind::Block(Block {
                keyword,
                start: start_id,
                close: BlockClose::Branch,
                body: Container::new(span.end()),
            }),
            parent,
        );
        self.push_node(
            span,
            NodeKind::Inline(Inline {
                role: InlineRole::BlockStart,
                ..start
            }),
            Some(block),
        );
        block
    }

    /// Record where a block's content ends and compute its aliased content.
    fn close_block(&mut self, id: NodeId, content_end: usize, span_end: usize, close: BlockClose) {
        let content_start = match &self.nodes[id.0].kind {
            NodeKind::Block(block) => block.body.content_start(),
            _ => return,
        };
        let content = content_start..content_end;
        let aliased = self.alias(id, content.clone());

        let node = &mut self.nodes[id.0];
        node.span = Span::from_bounds(node.span.index, span_end);
        if let NodeKind::Block(block) = &mut node.kind {
            block.close = close;
            block.body.content = content;
            block.body.aliased_content = aliased;
        }

        let span = self.nodes[id.0].span;
        debug_assert!(
            self.container(id).is_none_or(|body| body
                .children
                .values()
                .all(|child| span.contains(&self.nodes[child.0].span))),
            "block child outside the block's span"
        );
    }

    /// Wrap the branches of an `else` chain into a multi-block.
    fn finish_chain(&mut self, branches: Vec<NodeId>) -> NodeId {
        let first = self.nodes[branches[0].0].span.index;
        let last = branches
            .last()
            .map_or(first, |last| self.nodes[last.0].span.end());
        let parent = self.nodes[branches[0].0].parent;
        let chain = self.push_node(
            Span::from_bounds(first, last),
            NodeKind::MultiBlock(MultiBlock {
                branches: branches.clone(),
            }),
            parent,
        );
        for branch in branches {
            self.nodes[branch.0].parent = Some(chain);
        }
        chain
    }

    /// Add a finished node to a container's children.
    fn attach(&mut self, container: NodeId, child: NodeId) {
        let ignored = self.follows_ignore_pragma(container, child);
        let placeholder = self.nodes[child.0].placeholder.clone();
        let node = &mut self.nodes[child.0];
        node.ignored = ignored;
        node.parent = Some(container);
        if let Some(container) = self.container_mut(container) {
            container.children.insert(placeholder, child);
        }
    }

    /// Whether the line directly above `child` holds an ignore pragma, either
    /// as a markup comment or as the previous sibling action.
    fn follows_ignore_pragma(&self, container: NodeId, child: NodeId) -> bool {
        let span = self.nodes[child.0].span;
        if !self.source[span.index..].starts_with("{{") {
            return false;
        }
        let Some(body) = self.container(container) else {
            return false;
        };

        let previous = body.children.last().map(|(_, id)| *id);
        let gap_start = previous.map_or(body.content_start(), |p| self.nodes[p.0].span.end());
        let gap = &self.source[gap_start.min(span.index)..span.index];
        if IGNORE_COMMENT_PATTERN.is_match(gap) {
            return true;
        }

        match previous.map(|p| &self.nodes[p.0].kind) {
            Some(NodeKind::Inline(inline)) => {
                inline.statement.contains("prettier-ignore")
                    && SINGLE_LINE_BREAK_PATTERN.is_match(gap)
            }
            _ => false,
        }
    }

    fn container(&self, id: NodeId) -> Option<&Container> {
        match &self.nodes[id.0].kind {
            NodeKind::Root(container) => Some(container),
            NodeKind::Block(block) => Some(&block.body),
            _ => None,
        }
    }

    fn container_mut(&mut self, id: NodeId) -> Option<&mut Container> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Root(container) => Some(container),
            NodeKind::Block(block) => Some(&mut block.body),
            _ => None,
        }
    }

    fn alias(&self, id: NodeId, content: Range<usize>) -> String {
        let children = self
            .container(id)
            .into_iter()
            .flat_map(|container| container.children.values())
            .map(|child| {
                let node = &self.nodes[child.0];
                (node.span, node.placeholder.as_str())
            });
        alias_content(self.source, content, children)
    }
}

/// Replace every child span inside `content` with the child's placeholder.
///
/// Children are spliced in descending source order so the offsets of the
/// children not yet processed stay valid.
pub(crate) fn alias_content<'p>(
    source: &str,
    content: Range<usize>,
    children: impl IntoIterator<Item = (Span, &'p str)>,
) -> String {
    let mut children: Vec<(Span, &str)> = children.into_iter().collect();
    children.sort_by(|a, b| b.0.index.cmp(&a.0.index));

    let mut result = source[content.clone()].to_string();
    for (span, placeholder) in children {
        let start = span.index - content.start;
        result.replace_range(start..start + span.length, placeholder);
    }
    result
}
