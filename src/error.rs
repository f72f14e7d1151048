//! Centralised error hierarchy for the **glox** interpreter.
//!
//! Every stage (scanner, parser, resolver, interpreter) converts its failure
//! modes into one of the [`LoxError`] variants defined here.  Stages that keep
//! going after an error (the scanner, parser and resolver) hand each error to a
//! [`Reporter`] sink instead of stopping at the first one.
//!
//! The module **does not** decide what a failure means for the process; the
//! host maps a [`Failure`] onto an exit code.

use std::fmt;

use log::{error, info};
use thiserror::Error;

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Lexer,
    Parser,
    Resolver,
    Interpreter,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Stage::Lexer => "lexer",
            Stage::Parser => "parser",
            Stage::Resolver => "resolver",
            Stage::Interpreter => "interpreter",
        };

        f.write_str(tag)
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis failure, e.g. reading a local in its own initializer.
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error.
    #[error("[line {line}] Runtime error: {message}")]
    Runtime { message: String, line: usize },
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Build the error variant belonging to `stage`.
    pub fn at_stage<S: Into<String>>(stage: Stage, line: usize, msg: S) -> Self {
        match stage {
            Stage::Lexer => Self::lex(line, msg),
            Stage::Parser => Self::parse(line, msg),
            Stage::Resolver => Self::resolve(line, msg),
            Stage::Interpreter => Self::runtime(line, msg),
        }
    }

    /// Stage that produced the error.
    pub fn stage(&self) -> Stage {
        match self {
            LoxError::Lex { .. } => Stage::Lexer,
            LoxError::Parse { .. } => Stage::Parser,
            LoxError::Resolve { .. } => Stage::Resolver,
            LoxError::Runtime { .. } => Stage::Interpreter,
        }
    }

    /// Source line of the diagnostic.
    pub fn line(&self) -> usize {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => *line,
        }
    }

    /// Bare message without the `[line N]` prefix.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolve { message, .. }
            | LoxError::Runtime { message, .. } => message.clone(),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Why a pipeline run stopped before producing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Failure {
    /// Lexical, syntax or resolution errors; nothing was evaluated.
    #[error("compile error")]
    Compile,

    /// Evaluation started and was aborted by a runtime error.
    #[error("runtime error")]
    Runtime,
}

impl Failure {
    /// Conventional `sysexits` code for the failure.
    pub fn exit_code(self) -> i32 {
        match self {
            Failure::Compile => 65,
            Failure::Runtime => 70,
        }
    }
}

/// Diagnostics sink every stage reports into.
pub trait Reporter {
    fn report(&mut self, error: &LoxError);

    fn has_error(&self) -> bool;

    fn clear(&mut self);

    /// Build and report a diagnostic in one step.
    fn error(&mut self, line: usize, stage: Stage, message: &str) {
        self.report(&LoxError::at_stage(stage, line, message));
    }
}

/// Writes each diagnostic to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    had_error: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, err: &LoxError) {
        error!("{} diagnostic: {}", err.stage(), err);

        eprintln!("{}", err);

        self.had_error = true;
    }

    fn has_error(&self) -> bool {
        self.had_error
    }

    fn clear(&mut self) {
        self.had_error = false;
    }
}

/// Keeps every diagnostic so callers can inspect them afterwards.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    errors: Vec<LoxError>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[LoxError] {
        &self.errors
    }

    /// Rendered diagnostics, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, err: &LoxError) {
        self.errors.push(err.clone());
    }

    fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    fn clear(&mut self) {
        self.errors.clear();
    }
}
