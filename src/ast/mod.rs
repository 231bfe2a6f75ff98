//! Abstract syntax tree for BASIC programs
//!
//! All nodes live by value in a [`NodeArena`] and refer to each other through
//! [`NodeId`] handles. The grammar is acyclic, so a node only ever points at
//! nodes allocated before it.

use std::fmt::{self, Write};

/// Handle to a node in a [`NodeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        !matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The node variants: statements first, then expressions
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Start of a numbered program line
    Label(u32),
    /// PRINT expr expr ...
    Print(Vec<NodeId>),
    /// LET name = expr
    Let { name: String, value: NodeId },
    /// IF condition statement
    If { condition: NodeId, then: NodeId },
    /// GOTO line
    Goto(u32),
    /// GOSUB line
    Gosub(u32),
    /// RETURN
    Return,
    /// INPUT name
    Input(String),
    /// CLEAR
    Clear,
    /// LIST
    List,
    /// RUN
    Run,
    /// END
    End,

    NumberLiteral(f64),
    StringLiteral(String),
    VariableRef(String),
    BinaryOp {
        op: BinaryOperator,
        lhs: NodeId,
        rhs: NodeId,
    },
}

impl NodeKind {
    /// Direct expression operands, in evaluation order
    pub fn operands(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Print(exprs) => exprs.clone(),
            NodeKind::Let { value, .. } => vec![*value],
            NodeKind::If { condition, .. } => vec![*condition],
            NodeKind::BinaryOp { lhs, rhs, .. } => vec![*lhs, *rhs],
            _ => Vec::new(),
        }
    }

    /// Number of direct expression operands
    pub fn operand_count(&self) -> usize {
        match self {
            NodeKind::Print(exprs) => exprs.len(),
            NodeKind::Let { .. } | NodeKind::If { .. } => 1,
            NodeKind::BinaryOp { .. } => 2,
            _ => 0,
        }
    }

    /// Check if this node is an expression rather than a statement
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::NumberLiteral(_)
                | NodeKind::StringLiteral(_)
                | NodeKind::VariableRef(_)
                | NodeKind::BinaryOp { .. }
        )
    }
}

/// One AST node with the source position it was parsed from. The text of
/// the line itself is kept once per line by the [`Program`](crate::program::Program).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// 1-based source line
    pub line: usize,
    /// 1-based source column
    pub column: usize,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    /// One for the node itself plus one per direct operand. For a statement
    /// this is the number of instruction slots it occupies.
    pub fn size(&self) -> usize {
        1 + self.kind.operand_count()
    }
}

/// Owner of every node in a program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Look up a node. Ids are only minted by `alloc`, so they are always
    /// in range for the arena that produced them.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render a node and its children, one line per node, children indented
    /// two columns deeper than their parent
    pub fn dump_node(&self, id: NodeId, indent: usize, out: &mut String) {
        let mut pending = vec![(id, indent)];

        while let Some((id, indent)) = pending.pop() {
            let node = self.get(id);
            let pad = "";
            // Writing to a String cannot fail
            let _ = match &node.kind {
                NodeKind::Label(line) => writeln!(out, "{pad:indent$}Label: {line}"),
                NodeKind::Print(_) => writeln!(out, "{pad:indent$}Print:"),
                NodeKind::Let { name, .. } => writeln!(out, "{pad:indent$}Let: {name}"),
                NodeKind::If { .. } => writeln!(out, "{pad:indent$}If:"),
                NodeKind::Goto(target) => writeln!(out, "{pad:indent$}Goto: {target}"),
                NodeKind::Gosub(target) => writeln!(out, "{pad:indent$}Gosub: {target}"),
                NodeKind::Return => writeln!(out, "{pad:indent$}Return"),
                NodeKind::Input(name) => writeln!(out, "{pad:indent$}Input: {name}"),
                NodeKind::Clear => writeln!(out, "{pad:indent$}Clear"),
                NodeKind::List => writeln!(out, "{pad:indent$}List"),
                NodeKind::Run => writeln!(out, "{pad:indent$}Run"),
                NodeKind::End => writeln!(out, "{pad:indent$}End"),
                NodeKind::NumberLiteral(value) => {
                    writeln!(out, "{pad:indent$}NumberLiteral: {value}")
                }
                NodeKind::StringLiteral(text) => {
                    writeln!(out, "{pad:indent$}StringLiteral: {text:?}")
                }
                NodeKind::VariableRef(name) => writeln!(out, "{pad:indent$}VariableRef: {name}"),
                NodeKind::BinaryOp { op, .. } => writeln!(out, "{pad:indent$}BinaryOp: {op}"),
            };

            let children = match &node.kind {
                NodeKind::If { condition, then } => vec![*condition, *then],
                kind => kind.operands(),
            };
            // Reversed so the first child is rendered first
            pending.extend(children.into_iter().rev().map(|child| (child, indent + 2)));
        }
    }
}
