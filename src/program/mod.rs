//! Program storage and label resolution
//!
//! A [`Program`] is the finished, immutable result of parsing: the node arena,
//! the instruction stream in program order, and the label table mapping BASIC
//! line numbers to instruction indices.
//!
//! In the instruction stream every statement is followed by one slot per
//! direct expression operand, so a statement occupies exactly [`Node::size`]
//! slots and advancing the program counter by a statement's size lands on the
//! next statement. Operand slots always take a single slot, whatever their own
//! size; nested operands of a `BinaryOp` get no slot at all.

use crate::ast::{Node, NodeArena, NodeId, NodeKind};
use crate::error::{SyntaxError, SyntaxErrorKind};
use std::collections::HashMap;

/// Parsed program with its label table
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    arena: NodeArena,
    instructions: Vec<NodeId>,
    labels: HashMap<u32, usize>,
    // Raw source text, one entry per 1-based line
    source_lines: Vec<String>,
}

impl Program {
    /// Build a program from top-level statements in program order.
    ///
    /// Fails with `DuplicateLabel` if two lines share a line number.
    pub fn new(arena: NodeArena, statements: Vec<NodeId>) -> Result<Self, SyntaxError> {
        let mut instructions = Vec::new();
        for id in statements {
            instructions.push(id);
            instructions.extend(arena.get(id).kind.operands());
        }

        let labels = build_label_table(&arena, &instructions)?;

        Ok(Self {
            arena,
            instructions,
            labels,
            source_lines: Vec::new(),
        })
    }

    /// Attach the source text the program was parsed from
    pub fn with_source_lines(mut self, source_lines: Vec<String>) -> Self {
        self.source_lines = source_lines;
        self
    }

    /// Raw text of a 1-based source line, without its line break
    pub fn source_line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|index| self.source_lines.get(index))
            .map(String::as_str)
    }

    /// Sum of every instruction's own size
    pub fn size(&self) -> usize {
        self.instructions
            .iter()
            .map(|&id| self.arena.get(id).size())
            .sum()
    }

    /// Number of slots in the instruction stream
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction stream
    pub fn nodes(&self) -> &[NodeId] {
        &self.instructions
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    /// Node stored at an instruction index
    pub fn node_at(&self, index: usize) -> Option<&Node> {
        self.instructions.get(index).map(|&id| self.arena.get(id))
    }

    /// Instruction index following the label for `line_number`
    pub fn resolve(&self, line_number: u32) -> Option<usize> {
        self.labels.get(&line_number).copied()
    }

    /// Top-level statements with their instruction index
    pub fn statements(&self) -> Statements<'_> {
        Statements {
            program: self,
            index: 0,
        }
    }

    /// Indented tree of the whole program, one line per node
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (_, id) in self.statements() {
            self.arena.dump_node(id, 0, &mut out);
        }
        out
    }
}

/// Iterator over top-level statements, stepping by node size
pub struct Statements<'a> {
    program: &'a Program,
    index: usize,
}

impl Iterator for Statements<'_> {
    type Item = (usize, NodeId);

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.program.instructions.get(self.index)?;
        let index = self.index;
        self.index += self.program.arena.get(id).size();
        Some((index, id))
    }
}

/// One pass over the finished instruction stream recording each label's
/// successor index
fn build_label_table(
    arena: &NodeArena,
    instructions: &[NodeId],
) -> Result<HashMap<u32, usize>, SyntaxError> {
    let mut labels = HashMap::new();
    let mut index = 0;

    while let Some(&id) = instructions.get(index) {
        let node = arena.get(id);
        if let NodeKind::Label(line_number) = node.kind {
            if labels.insert(line_number, index + node.size()).is_some() {
                return Err(SyntaxError::new(
                    SyntaxErrorKind::DuplicateLabel(line_number),
                    node.line,
                    node.column,
                ));
            }
        }
        index += node.size();
    }

    Ok(labels)
}
