//! Execution engine for BASIC programs
//!
//! Walks the program's instruction stream one statement at a time. The
//! program counter advances by each statement's size unless the statement
//! redirects control flow; `GOSUB` return addresses live on an explicit call
//! stack.

use crate::ast::{BinaryOperator, NodeId, NodeKind};
use crate::config::InterpreterConfig;
use crate::error::{Result, RuntimeError, RuntimeErrorKind};
use crate::os::{InputSource, OutputSink};
use crate::parser::generate_ast;
use crate::program::Program;
use crate::tokenizer::tokenize;
use crate::variables::{Value, VariableStore};
use tracing::{debug, info};

/// What a statement does to the program counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Advance,
    Jump(usize),
    Halt,
}

/// Pending work while evaluating an expression
#[derive(Debug, Clone, Copy)]
enum Task {
    Visit(NodeId),
    Apply(BinaryOperator),
}

/// BASIC interpreter over one program and one input/output pair
#[derive(Debug)]
pub struct Interpreter<I, O> {
    program: Program,
    config: InterpreterConfig,
    variables: VariableStore,
    // Return addresses pushed by GOSUB
    call_stack: Vec<usize>,
    pc: usize,
    halted: bool,
    executed: u64,
    input: I,
    output: O,
}

impl<I: InputSource, O: OutputSink> Interpreter<I, O> {
    /// Tokenize and parse `source` into a ready-to-run interpreter
    pub fn create(source: &str, input: I, output: O) -> Result<Self> {
        Self::with_config(source, InterpreterConfig::default(), input, output)
    }

    pub fn with_config(
        source: &str,
        config: InterpreterConfig,
        input: I,
        output: O,
    ) -> Result<Self> {
        let tokens = tokenize(source);
        let program = generate_ast(&tokens)?;
        Ok(Self::from_program(program, config, input, output))
    }

    pub fn from_program(program: Program, config: InterpreterConfig, input: I, output: O) -> Self {
        Self {
            program,
            config,
            variables: VariableStore::new(),
            call_stack: Vec::new(),
            pc: 0,
            halted: false,
            executed: 0,
            input,
            output,
        }
    }

    /// Execute statements until `END` or the end of the program
    pub fn run(&mut self) -> std::result::Result<(), RuntimeError> {
        info!(instructions = self.program.len(), "running program");
        debug!("program:\n{}", self.program.dump());

        let mut steps: u64 = 0;
        loop {
            if let Some(limit) = self.config.step_limit {
                if steps >= limit && !self.halted {
                    return Err(self.error_here(RuntimeErrorKind::StepLimitExceeded(limit)));
                }
            }
            if self.step()? {
                info!(executed = self.executed, "program halted");
                return Ok(());
            }
            steps += 1;
        }
    }

    /// Execute exactly one statement; returns whether execution has halted
    pub fn step(&mut self) -> std::result::Result<bool, RuntimeError> {
        if self.halted {
            return Ok(true);
        }

        let Some(&id) = self.program.nodes().get(self.pc) else {
            self.halted = true;
            return Ok(true);
        };

        let next = self.pc + self.program.node(id).size();
        self.executed += 1;

        match self.execute(id, next) {
            Ok(Flow::Advance) => self.pc = next,
            Ok(Flow::Jump(target)) => self.pc = target,
            Ok(Flow::Halt) => self.halted = true,
            Err(kind) => return Err(self.error_at(kind, id)),
        }

        if self.pc >= self.program.len() {
            self.halted = true;
        }
        Ok(self.halted)
    }

    /// Execute one statement node; `next` is the instruction after it
    fn execute(&mut self, id: NodeId, next: usize) -> std::result::Result<Flow, RuntimeErrorKind> {
        let kind = &self.program.node(id).kind;
        debug!(pc = self.pc, statement = ?kind, "exec");

        match kind {
            // Already folded into the label table
            NodeKind::Label(_) => Ok(Flow::Advance),
            NodeKind::Print(exprs) => {
                if exprs.is_empty() {
                    emit(&mut self.output, "")?;
                }
                for &expr in exprs {
                    let value = self.evaluate(expr)?;
                    emit(&mut self.output, &value.to_string())?;
                }
                Ok(Flow::Advance)
            }
            NodeKind::Let { name, value } => {
                let value = self.evaluate(*value)?;
                self.variables.set(name.as_str(), value);
                Ok(Flow::Advance)
            }
            NodeKind::If { condition, then } => {
                let then = *then;
                if self.evaluate(*condition)?.is_truthy() {
                    self.execute(then, next)
                } else {
                    Ok(Flow::Advance)
                }
            }
            NodeKind::Goto(target) => Ok(Flow::Jump(self.resolve(*target)?)),
            NodeKind::Gosub(target) => {
                let address = self.resolve(*target)?;
                self.call_stack.push(next);
                Ok(Flow::Jump(address))
            }
            NodeKind::Return => self
                .call_stack
                .pop()
                .map(Flow::Jump)
                .ok_or(RuntimeErrorKind::StackUnderflow),
            NodeKind::Input(name) => {
                let line = self
                    .input
                    .read_line()
                    .map_err(|e| RuntimeErrorKind::Io(e.to_string()))?
                    .ok_or(RuntimeErrorKind::InputClosed)?;
                self.variables.set(name.as_str(), Value::from_input(&line));
                Ok(Flow::Advance)
            }
            NodeKind::Clear => {
                self.variables.clear();
                Ok(Flow::Advance)
            }
            NodeKind::List => {
                let listing = self.program.dump();
                for line in listing.lines() {
                    emit(&mut self.output, line)?;
                }
                Ok(Flow::Advance)
            }
            NodeKind::Run => {
                self.call_stack.clear();
                if self.config.reset_variables_on_run {
                    self.variables.clear();
                }
                Ok(Flow::Jump(0))
            }
            NodeKind::End => Ok(Flow::Halt),
            // Operand slots are never fetched as statements
            NodeKind::NumberLiteral(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::VariableRef(_)
            | NodeKind::BinaryOp { .. } => Ok(Flow::Advance),
        }
    }

    /// Evaluate an expression node. Operands are visited left to right off
    /// an explicit work stack, so chains of any length are safe.
    fn evaluate(&self, id: NodeId) -> std::result::Result<Value, RuntimeErrorKind> {
        let mut tasks = vec![Task::Visit(id)];
        let mut values: Vec<Value> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(id) => match &self.program.node(id).kind {
                    NodeKind::NumberLiteral(n) => values.push(Value::Number(*n)),
                    NodeKind::StringLiteral(s) => values.push(Value::Text(s.clone())),
                    NodeKind::VariableRef(name) => {
                        let value = self
                            .variables
                            .get(name)
                            .cloned()
                            .ok_or_else(|| RuntimeErrorKind::UndefinedVariable(name.clone()))?;
                        values.push(value);
                    }
                    NodeKind::BinaryOp { op, lhs, rhs } => {
                        tasks.push(Task::Apply(*op));
                        tasks.push(Task::Visit(*rhs));
                        tasks.push(Task::Visit(*lhs));
                    }
                    _ => return Err(RuntimeErrorKind::NotAnExpression(id.index())),
                },
                Task::Apply(op) => {
                    // Both operands were pushed by the visits scheduled above
                    let (Some(rhs), Some(lhs)) = (values.pop(), values.pop()) else {
                        return Err(RuntimeErrorKind::NotAnExpression(id.index()));
                    };
                    values.push(lhs.apply(op, &rhs)?);
                }
            }
        }

        values
            .pop()
            .ok_or(RuntimeErrorKind::NotAnExpression(id.index()))
    }

    fn resolve(&self, line_number: u32) -> std::result::Result<usize, RuntimeErrorKind> {
        self.program
            .resolve(line_number)
            .ok_or(RuntimeErrorKind::UndefinedLabel(line_number))
    }

    fn error_at(&self, kind: RuntimeErrorKind, id: NodeId) -> RuntimeError {
        RuntimeError {
            kind,
            pc: self.pc,
            line: self.program.node(id).line,
        }
    }

    fn error_here(&self, kind: RuntimeErrorKind) -> RuntimeError {
        let line = self.program.node_at(self.pc).map_or(0, |node| node.line);
        RuntimeError {
            kind,
            pc: self.pc,
            line,
        }
    }
}

fn emit<O: OutputSink>(output: &mut O, text: &str) -> std::result::Result<(), RuntimeErrorKind> {
    output
        .write_line(text)
        .map_err(|e| RuntimeErrorKind::Io(e.to_string()))
}

impl<I, O> Interpreter<I, O> {
    /// Index of the next instruction to execute
    pub fn program_counter(&self) -> usize {
        self.pc
    }

    /// Statements executed so far
    pub fn executed_instructions(&self) -> u64 {
        self.executed
    }

    /// Number of pending GOSUB return addresses
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Give back the input/output collaborators
    pub fn into_parts(self) -> (I, O) {
        (self.input, self.output)
    }
}
