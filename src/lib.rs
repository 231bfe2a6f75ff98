//! Tiny BASIC Interpreter
//!
//! A small line-numbered BASIC dialect. Source text is scanned into tokens,
//! parsed into an ordered program of AST nodes and executed by a tree-walking
//! interpreter that addresses lines through a label table.
//!
//! The interpreter never touches the file system or the process streams
//! itself: the host hands it the source text plus an input/output pair.

pub mod ast;
pub mod config;
pub mod executor;
pub mod os;
pub mod parser;
pub mod program;
pub mod tokenizer;
pub mod variables;

// Re-export core types for convenience
pub use crate::error::{
    BasicError, Result, RuntimeError, RuntimeErrorKind, SyntaxError, SyntaxErrorKind,
};
pub use ast::{BinaryOperator, Node, NodeId, NodeKind};
pub use config::InterpreterConfig;
pub use executor::Interpreter;
pub use os::{CapturedOutput, InputSource, LineReader, LineWriter, OutputSink, ScriptedInput};
pub use parser::generate_ast;
pub use program::Program;
pub use tokenizer::{tokenize, Token, TokenCategory, TokenKind};
pub use variables::{Value, VariableStore};

/// Core error handling types for the interpreter
pub mod error {
    use thiserror::Error;

    /// Result type for whole-pipeline operations
    pub type Result<T> = std::result::Result<T, BasicError>;

    /// Any failure the interpreter can report to its host
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum BasicError {
        #[error(transparent)]
        Syntax(#[from] SyntaxError),
        #[error(transparent)]
        Runtime(#[from] RuntimeError),
    }

    /// A parse-time failure, located at the offending token
    #[derive(Debug, Clone, PartialEq, Error)]
    #[error("Syntax error at line {line}, column {column}: {kind}")]
    pub struct SyntaxError {
        pub kind: SyntaxErrorKind,
        pub line: usize,
        pub column: usize,
    }

    impl SyntaxError {
        pub fn new(kind: SyntaxErrorKind, line: usize, column: usize) -> Self {
            Self { kind, line, column }
        }
    }

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum SyntaxErrorKind {
        #[error("expected line number")]
        ExpectedLineNumber,
        #[error("invalid line number '{0}'")]
        InvalidLineNumber(String),
        #[error("unexpected token in expression list: '{0}'")]
        UnexpectedToken(String),
        #[error("expected expression, found '{0}'")]
        ExpectedExpression(String),
        #[error("expected variable name, found '{0}'")]
        ExpectedIdentifier(String),
        #[error("expected '=', found '{0}'")]
        ExpectedEquals(String),
        #[error("unknown statement '{0}'")]
        UnknownStatement(String),
        #[error("unexpected '{0}' after statement")]
        TrailingTokens(String),
        #[error("missing ')', found '{0}'")]
        UnclosedParen(String),
        #[error("nested deeper than {0} levels")]
        NestingTooDeep(usize),
        #[error("unterminated string literal")]
        UnterminatedString,
        #[error("duplicate line number {0}")]
        DuplicateLabel(u32),
    }

    /// A failure raised while executing, tagged with the program counter and
    /// the source line of the statement being executed
    #[derive(Debug, Clone, PartialEq, Error)]
    #[error("Runtime error at line {line} (instruction {pc}): {kind}")]
    pub struct RuntimeError {
        pub kind: RuntimeErrorKind,
        pub pc: usize,
        pub line: usize,
    }

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum RuntimeErrorKind {
        #[error("undefined line number {0}")]
        UndefinedLabel(u32),
        #[error("undefined variable {0}")]
        UndefinedVariable(String),
        #[error("type mismatch: cannot apply '{op}' to {lhs} and {rhs}")]
        TypeMismatch {
            op: &'static str,
            lhs: &'static str,
            rhs: &'static str,
        },
        #[error("division by zero")]
        DivisionByZero,
        #[error("RETURN without GOSUB")]
        StackUnderflow,
        #[error("input stream closed")]
        InputClosed,
        #[error("I/O failed: {0}")]
        Io(String),
        #[error("node {0} is a statement, not an expression")]
        NotAnExpression(usize),
        #[error("step limit of {0} statements exceeded")]
        StepLimitExceeded(u64),
    }
}
