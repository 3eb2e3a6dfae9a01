//! The lossless concrete syntax tree produced by the parser (C2).
//!
//! Nodes live in a flat arena (`CstTree`) indexed by `u32` id, following the
//! "arena with index-based parent pointers" guidance for avoiding owning
//! cycles between parent and child. IDs are assigned in document order at
//! parse time and are never reused, so an id doubles as a stable handle a
//! later pass (AST, IR) can carry forward.

use canopy_diagnostics::Span;

use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Program,
    TreeDef,
    Selector,
    Sequence,
    Parallel,
    Guard,
    If,
    Invert,
    Repeat,
    Timeout,
    Cooldown,
    While,
    Reactive,
    ReactiveSelect,
    Check,
    Call,
    MemberAccess,
    BlackboardAccess,
    Binary,
    Unary,
    Logic,
    LiteralInt,
    LiteralFloat,
    LiteralBool,
    LiteralString,
    LiteralNull,
    LiteralEnum,
    Defdec,
    DefdecCall,
    Defmacro,
    BodyPlaceholder,
    Ref,
    Import,
    ParallelPolicy,
    Argument,
    KeywordArgument,
    /// A token wrapped directly as a CST leaf (e.g. a bare identifier used
    /// as a parallel policy keyword).
    Token,
    /// Unexpected input collected at node position; see parser recovery
    /// policy (a).
    Error,
    /// Zero-length placeholder for a required-but-absent token; see parser
    /// recovery policy (b).
    Missing,
}

/// Either a child node or a bare token, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CstElement {
    Node(u32),
    Token(u32),
}

#[derive(Debug, Clone)]
pub struct CstNodeData {
    pub id: u32,
    pub kind: SyntaxKind,
    pub parent: Option<u32>,
    pub children: Vec<CstElement>,
}

/// The arena owning every node and token of one parsed file.
#[derive(Debug, Clone, Default)]
pub struct CstTree {
    nodes: Vec<CstNodeData>,
    tokens: Vec<Token>,
    /// Maps a token's arena index to the CST node id that owns it, for
    /// parent lookups from a bare token.
    token_parent: Vec<Option<u32>>,
    root: u32,
}

impl CstTree {
    #[must_use]
    pub fn node(&self, id: u32) -> &CstNodeData {
        &self.nodes[id as usize]
    }

    #[must_use]
    pub fn token(&self, id: u32) -> &Token {
        &self.tokens[id as usize]
    }

    #[must_use]
    pub fn root(&self) -> u32 {
        self.root
    }

    /// Number of nodes in the arena; every valid node id is `< node_count()`.
    #[must_use]
    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    #[must_use]
    pub fn token_parent(&self, token_id: u32) -> Option<u32> {
        self.token_parent[token_id as usize]
    }

    #[must_use]
    pub fn children(&self, id: u32) -> &[CstElement] {
        &self.node(id).children
    }

    #[must_use]
    pub fn parent(&self, id: u32) -> Option<u32> {
        self.node(id).parent
    }

    /// Every token under `id`, in document order, including its own leaves.
    #[must_use]
    pub fn descendant_tokens(&self, id: u32) -> Vec<u32> {
        let mut out = Vec::new();
        self.collect_tokens(id, &mut out);
        out
    }

    fn collect_tokens(&self, id: u32, out: &mut Vec<u32>) {
        for child in &self.node(id).children {
            match child {
                CstElement::Token(t) => out.push(*t),
                CstElement::Node(n) => self.collect_tokens(*n, out),
            }
        }
    }

    /// Span of `id` excluding trivia: the covering span of its first and
    /// last descendant token's own (non-trivia) spans.
    #[must_use]
    pub fn span(&self, id: u32) -> Span {
        let tokens = self.descendant_tokens(id);
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => {
                self.token(*first).span.cover(self.token(*last).span)
            }
            _ => Span::empty_at(0),
        }
    }

    /// Span of `id` including leading/trailing trivia of its boundary
    /// tokens.
    #[must_use]
    pub fn full_span(&self, id: u32) -> Span {
        let tokens = self.descendant_tokens(id);
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => self
                .token(*first)
                .full_span()
                .cover(self.token(*last).full_span()),
            _ => Span::empty_at(0),
        }
    }

    /// Reconstructs the exact source text spanned by `id`, trivia included.
    /// `source == tree.to_full_string(tree.root())` must hold for any
    /// successfully parsed tree.
    #[must_use]
    pub fn to_full_string(&self, id: u32) -> String {
        self.descendant_tokens(id)
            .iter()
            .map(|t| self.token(*t).full_text())
            .collect()
    }

    #[must_use]
    pub fn text(&self, id: u32) -> String {
        self.descendant_tokens(id)
            .iter()
            .map(|t| self.token(*t).text.clone())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Incrementally builds a `CstTree`, assigning each node its id at
/// `start_node` time (the order the parser *encounters* constructs reading
/// left to right, top to bottom) so ids increase in document order even
/// though nodes are only fully populated once their children have been
/// parsed (`finish_node`, which always happens later than the id
/// assignment of every descendant... except the node's own id, which is
/// smaller than all of its descendants').
#[derive(Default)]
pub struct CstBuilder {
    tree: CstTree,
    next_id: u32,
    slots: Vec<Option<CstNodeData>>,
    /// Stack of (node id, kind, children accumulated so far).
    stack: Vec<(u32, SyntaxKind, Vec<CstElement>)>,
}

impl CstBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_tokens(&mut self, tokens: Vec<Token>) {
        self.tree.tokens = tokens;
        self.tree.token_parent = vec![None; self.tree.tokens.len()];
    }

    #[must_use]
    pub fn token(&self, id: u32) -> &Token {
        &self.tree.tokens[id as usize]
    }

    #[must_use]
    pub fn token_count(&self) -> u32 {
        self.tree.tokens.len() as u32
    }

    /// Begins a new node, immediately assigning its id.
    pub fn start_node(&mut self, kind: SyntaxKind) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.stack.push((id, kind, Vec::new()));
        id
    }

    /// Attaches `token_id` as a leaf of the node currently being built.
    pub fn token_leaf(&mut self, token_id: u32) {
        if let Some((id, _, children)) = self.stack.last_mut() {
            children.push(CstElement::Token(token_id));
            self.tree.token_parent[token_id as usize] = Some(*id);
        }
    }

    /// Closes the current node, recording parent/child links and storing it
    /// by its (already-assigned) id.
    pub fn finish_node(&mut self) -> u32 {
        let (id, kind, children) = self.stack.pop().expect("finish_node without start_node");
        for child in &children {
            if let CstElement::Node(n) = child {
                if let Some(slot) = self.slots.get_mut(*n as usize).and_then(Option::as_mut) {
                    slot.parent = Some(id);
                }
            }
        }
        if self.slots.len() <= id as usize {
            self.slots.resize(id as usize + 1, None);
        }
        self.slots[id as usize] = Some(CstNodeData {
            id,
            kind,
            parent: None,
            children,
        });
        if let Some((_, _, parent_children)) = self.stack.last_mut() {
            parent_children.push(CstElement::Node(id));
        }
        id
    }

    #[must_use]
    pub fn finish(mut self, root: u32) -> CstTree {
        self.tree.nodes = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| panic!("CST node {i} was started but never finished"))
            })
            .collect();
        self.tree.root = root;
        self.tree
    }
}
