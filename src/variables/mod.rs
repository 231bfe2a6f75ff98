//! Runtime values and the variable environment
//!
//! Values are dynamically typed but never coerced: arithmetic is defined on
//! numbers, `+` additionally concatenates two strings, and every other mix is
//! a type mismatch.

use crate::ast::BinaryOperator;
use crate::error::RuntimeErrorKind;
use std::collections::HashMap;
use std::fmt;

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
        }
    }

    /// Non-zero numbers and non-empty strings are true
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
        }
    }

    /// Interpret a line of user input: a number if it parses as one,
    /// otherwise the text as typed
    pub fn from_input(line: &str) -> Self {
        let trimmed = line.trim();
        // Keep words like "inf" and "NaN" as text
        let numeric = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
        match trimmed.parse::<f64>() {
            Ok(n) if numeric => Value::Number(n),
            _ => Value::Text(line.to_string()),
        }
    }

    /// Apply a binary operator
    pub fn apply(&self, op: BinaryOperator, rhs: &Value) -> Result<Value, RuntimeErrorKind> {
        use BinaryOperator::*;

        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => match op {
                Add => Ok(Value::Number(a + b)),
                Subtract => Ok(Value::Number(a - b)),
                Multiply => Ok(Value::Number(a * b)),
                Divide => {
                    if *b == 0.0 {
                        Err(RuntimeErrorKind::DivisionByZero)
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }
                _ => Ok(compare(op, a.partial_cmp(b))),
            },
            (Value::Text(a), Value::Text(b)) => match op {
                Add => Ok(Value::Text(format!("{a}{b}"))),
                op if op.is_comparison() => Ok(compare(op, Some(a.cmp(b)))),
                _ => Err(self.mismatch(op, rhs)),
            },
            _ => Err(self.mismatch(op, rhs)),
        }
    }

    fn mismatch(&self, op: BinaryOperator, rhs: &Value) -> RuntimeErrorKind {
        RuntimeErrorKind::TypeMismatch {
            op: op.symbol(),
            lhs: self.type_name(),
            rhs: rhs.type_name(),
        }
    }
}

fn compare(op: BinaryOperator, ordering: Option<std::cmp::Ordering>) -> Value {
    use std::cmp::Ordering::*;

    let result = match (op, ordering) {
        // NaN compares unequal to everything
        (BinaryOperator::NotEqual, None) => true,
        (_, None) => false,
        (BinaryOperator::Equal, Some(o)) => o == Equal,
        (BinaryOperator::NotEqual, Some(o)) => o != Equal,
        (BinaryOperator::LessThan, Some(o)) => o == Less,
        (BinaryOperator::LessThanOrEqual, Some(o)) => o != Greater,
        (BinaryOperator::GreaterThan, Some(o)) => o == Greater,
        (BinaryOperator::GreaterThanOrEqual, Some(o)) => o != Less,
        (_, Some(_)) => false,
    };
    Value::Number(if result { 1.0 } else { 0.0 })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Variable environment
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: HashMap<String, Value>,
}

impl VariableStore {
    /// Create a new variable store
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Clear all variables
    pub fn clear(&mut self) {
        self.variables.clear();
    }
}
