//! Interpreter configuration

/// Policy knobs for an [`Interpreter`](crate::executor::Interpreter)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Whether `RUN` also clears every variable. Classic BASIC does.
    pub reset_variables_on_run: bool,
    /// Upper bound on statements executed by a single `run()`
    pub step_limit: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            reset_variables_on_run: true,
            step_limit: None,
        }
    }
}

impl InterpreterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reset_variables_on_run(mut self, reset: bool) -> Self {
        self.reset_variables_on_run = reset;
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }
}
