//! Borrowed views over the tree and the child-to-parent map.
//!
//! The tree itself stores no back-references. [`ParentMap::seal`] walks it once and records
//! every `child -> parent` edge, keyed by node identity (kind and address), so lookups work on
//! the exact nodes and tokens a consumer is holding.

use std::{collections::HashMap, iter, ptr};

use crate::{
    ast::{
        AnyToken, ArrayNode, ConditionNode, ConditionValue, ErrorToken, ExpressionNode,
        GroupNode, GroupPrefix, Node, Position, PropertyNode, TokenType, ValidToken,
        VariableNode,
    },
    error::AstError,
};

/// A borrowed token.
#[derive(Debug, Clone, Copy)]
pub enum TokenRef<'a> {
    /// A matched token.
    Valid(&'a ValidToken),
    /// A missing token.
    Error(&'a ErrorToken),
}

impl<'a> TokenRef<'a> {
    /// Source range.
    pub fn pos(self) -> Position {
        match self {
            Self::Valid(t) => t.pos,
            Self::Error(t) => t.pos,
        }
    }

    /// Returns true for matched tokens.
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The matched token, if any.
    pub const fn as_valid(self) -> Option<&'a ValidToken> {
        match self {
            Self::Valid(t) => Some(t),
            Self::Error(_) => None,
        }
    }

    /// The missing token, if any.
    pub const fn as_error(self) -> Option<&'a ErrorToken> {
        match self {
            Self::Valid(_) => None,
            Self::Error(t) => Some(t),
        }
    }

    /// Token type of a matched token.
    pub fn kind(self) -> Option<TokenType> {
        self.as_valid().map(|t| t.kind)
    }

    /// Returns true if both refer to the same token in the same tree.
    pub fn same(self, other: Self) -> bool {
        NodeRef::Token(self).key() == NodeRef::Token(other).key()
    }
}

impl<'a> From<&'a AnyToken> for TokenRef<'a> {
    fn from(token: &'a AnyToken) -> Self {
        match token {
            AnyToken::Valid(t) => Self::Valid(t),
            AnyToken::Error(t) => Self::Error(t),
        }
    }
}

/// A borrowed view over any node or token of the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// Binary boolean expression.
    Expression(&'a ExpressionNode),
    /// Condition.
    Condition(&'a ConditionNode),
    /// Group.
    Group(&'a GroupNode),
    /// Variable.
    Variable(&'a VariableNode),
    /// Array.
    Array(&'a ArrayNode),
    /// Token.
    Token(TokenRef<'a>),
}

/// Identity of a node: its kind plus its address. A struct and its first field can share an
/// address, the kind tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    /// Node kind name.
    kind: &'static str,
    /// Address of the node.
    addr: usize,
}

impl<'a> NodeRef<'a> {
    /// View over a parse result.
    pub fn from_node(node: &'a Node) -> Self {
        match node {
            Node::Expression(n) => Self::Expression(n),
            Node::Condition(n) => Self::Condition(n),
            Node::Group(n) => Self::Group(n),
            Node::Error(e) => Self::Token(TokenRef::Error(e)),
        }
    }

    /// Kind name, as used in error messages.
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Expression(_) => "expression",
            Self::Condition(_) => "condition",
            Self::Group(_) => "group",
            Self::Variable(_) => "variable",
            Self::Array(_) => "array",
            Self::Token(_) => "token",
        }
    }

    /// Identity of this node.
    pub fn key(self) -> NodeKey {
        let addr = match self {
            Self::Expression(n) => ptr::from_ref(n).addr(),
            Self::Condition(n) => ptr::from_ref(n).addr(),
            Self::Group(n) => ptr::from_ref(n).addr(),
            Self::Variable(n) => ptr::from_ref(n).addr(),
            Self::Array(n) => ptr::from_ref(n).addr(),
            Self::Token(TokenRef::Valid(t)) => ptr::from_ref(t).addr(),
            Self::Token(TokenRef::Error(t)) => ptr::from_ref(t).addr(),
        };
        NodeKey {
            kind: self.kind(),
            addr,
        }
    }

    /// Source range.
    pub fn pos(self) -> Position {
        match self {
            Self::Expression(n) => n.pos(),
            Self::Condition(n) => n.pos(),
            Self::Group(n) => n.pos(),
            Self::Variable(n) => n.pos(),
            Self::Array(n) => n.pos(),
            Self::Token(t) => t.pos(),
        }
    }

    /// Returns true if both refer to the same node.
    pub fn same(self, other: Self) -> bool {
        self.key() == other.key()
    }

    /// Direct children in source order.
    pub fn children(self) -> Vec<Self> {
        let mut out = Vec::new();
        match self {
            Self::Expression(n) => {
                out.push(Self::from_node(n.left()));
                out.push(Self::Token(n.operator().into()));
                out.push(Self::from_node(n.right()));
            }
            Self::Condition(n) => {
                if let Some(op) = n.operator() {
                    out.push(Self::Token(TokenRef::Valid(op)));
                }
                match n.property() {
                    Some(PropertyNode::Variable(v)) => out.push(Self::Variable(v)),
                    Some(PropertyNode::Error(e)) => out.push(Self::Token(TokenRef::Error(e))),
                    None => {}
                }
                if let Some(left) = n.sep().and_then(|s| s.left.as_ref()) {
                    out.push(Self::Token(left.into()));
                }
                if let Some(op) = n.property_operator() {
                    out.push(Self::Token(op.into()));
                }
                if let Some(right) = n.sep().and_then(|s| s.right.as_ref()) {
                    out.push(Self::Token(right.into()));
                }
                out.push(match n.value() {
                    ConditionValue::Variable(v) => Self::Variable(v),
                    ConditionValue::Array(a) => Self::Array(a),
                    ConditionValue::Group(g) => Self::Group(g),
                    ConditionValue::Error(e) => Self::Token(TokenRef::Error(e)),
                });
            }
            Self::Group(n) => {
                match n.prefix() {
                    Some(GroupPrefix::Condition(c)) => out.push(Self::Condition(c)),
                    Some(GroupPrefix::Not(t)) => out.push(Self::Token(TokenRef::Valid(t))),
                    None => {}
                }
                if let Some(left) = n.paren().and_then(|p| p.left.as_ref()) {
                    out.push(Self::Token(TokenRef::Valid(left)));
                }
                out.push(Self::from_node(n.expression()));
                if let Some(paren) = n.paren() {
                    out.push(Self::Token((&paren.right).into()));
                }
            }
            Self::Variable(n) => {
                if let Some(prefix) = n.prefix() {
                    out.push(Self::Token(TokenRef::Valid(prefix)));
                }
                if let Some(quote) = n.quote() {
                    out.push(Self::Token(TokenRef::Valid(&quote.left)));
                }
                out.push(Self::Token(n.value().into()));
                if let Some(quote) = n.quote() {
                    out.push(Self::Token((&quote.right).into()));
                    if let Some(flags) = &quote.flags {
                        out.push(Self::Token(TokenRef::Valid(flags)));
                    }
                }
            }
            Self::Array(n) => {
                out.push(Self::Token(TokenRef::Valid(&n.bracket().left)));
                out.extend(n.values().iter().map(Self::Variable));
                out.push(Self::Token((&n.bracket().right).into()));
            }
            Self::Token(_) => {}
        }
        out
    }
}

/// Every token of the tree in source order.
pub fn flatten(root: &Node) -> Vec<TokenRef<'_>> {
    let mut tokens = Vec::new();
    let mut stack = vec![NodeRef::from_node(root)];
    while let Some(node) = stack.pop() {
        match node {
            NodeRef::Token(token) => tokens.push(token),
            _ => stack.extend(node.children().into_iter().rev()),
        }
    }
    tokens
}

/// Child-to-parent edges of one tree.
#[derive(Debug, Default)]
pub struct ParentMap<'a> {
    /// Parent of each node, keyed by the child's identity.
    parents: HashMap<NodeKey, NodeRef<'a>>,
}

impl<'a> ParentMap<'a> {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the parent of every node below `root`.
    ///
    /// Parents are write-once. If any node already has one (the tree was sealed before), this
    /// fails without recording anything.
    pub fn seal(&mut self, root: &'a Node) -> Result<(), AstError> {
        let edges = edges(root);
        if let Some((_, child, _)) = edges
            .iter()
            .find(|(key, _, _)| self.parents.contains_key(key))
        {
            return Err(AstError::AlreadySealed {
                kind: child.kind(),
                pos: child.pos(),
            });
        }
        self.parents
            .extend(edges.into_iter().map(|(key, _, parent)| (key, parent)));
        Ok(())
    }

    /// The parent of `node`, `None` for the root or nodes of another tree.
    pub fn parent(&self, node: NodeRef<'a>) -> Option<NodeRef<'a>> {
        self.parents.get(&node.key()).copied()
    }

    /// The parent of a token.
    pub fn token_parent(&self, token: TokenRef<'a>) -> Option<NodeRef<'a>> {
        self.parent(NodeRef::Token(token))
    }

    /// Parents of `node`, nearest first.
    pub fn ancestors(&self, node: NodeRef<'a>) -> impl Iterator<Item = NodeRef<'a>> + '_ {
        iter::successors(self.parent(node), |n| self.parent(*n))
    }

    /// Number of recorded edges.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Returns true if nothing has been sealed.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Every `(child key, child, parent)` edge below `root`.
fn edges(root: &Node) -> Vec<(NodeKey, NodeRef<'_>, NodeRef<'_>)> {
    let mut edges = Vec::new();
    let mut stack = vec![NodeRef::from_node(root)];
    while let Some(parent) = stack.pop() {
        for child in parent.children() {
            edges.push((child.key(), child, parent));
            stack.push(child);
        }
    }
    edges
}

/// Builds a fresh parent map for `root`.
pub fn generate_parents_map(root: &Node) -> ParentMap<'_> {
    ParentMap {
        parents: edges(root)
            .into_iter()
            .map(|(key, _, parent)| (key, parent))
            .collect(),
    }
}
