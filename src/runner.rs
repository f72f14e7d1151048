//! Source text in, value out: the four stages wired together.

use std::io::Write;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::{Failure, Reporter};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::scanner::Scanner;
use crate::token::Token;
use crate::value::Value;

/// An interpreter session.  Globals survive from one [`Lox::run`] to the
/// next, which is what a REPL needs.
pub struct Lox {
    interpreter: Interpreter,
    next_id: usize,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// Session whose `print` statements write to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::with_interpreter(Interpreter::with_output(out))
    }

    fn with_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            next_id: 0,
        }
    }

    /// Scan, parse, resolve and interpret `source`.
    ///
    /// Lexical and syntax errors are all reported before giving up, so one run
    /// can surface several of them.  Nothing is evaluated when any compile
    /// stage reported an error.  A runtime error is reported too and stops
    /// the program; effects of statements that already ran remain.
    ///
    /// The session's resolution table only grows: each run adds the entries
    /// for its own nodes and keeps earlier ones, since functions declared by
    /// earlier runs may still be called.  Memory use is proportional to the
    /// total source fed to the session, which is fine for a REPL.
    pub fn run(&mut self, source: &str, reporter: &mut dyn Reporter) -> Result<Value, Failure> {
        reporter.clear();

        let tokens: Vec<Token> = Scanner::new(source).scan_tokens(reporter);
        debug!("Scanned {} tokens", tokens.len());

        // Ids keep counting across runs so resolver entries from earlier
        // lines never collide with this one's.
        let mut parser = Parser::with_first_id(&tokens, self.next_id);
        let statements: Vec<Stmt> = parser.parse(reporter);
        self.next_id = parser.next_id();

        if reporter.has_error() {
            info!("Compile errors after parsing, skipping evaluation");
            return Err(Failure::Compile);
        }

        let locals: Locals = Resolver::new().resolve(&statements, reporter);

        if reporter.has_error() {
            info!("Resolution errors, skipping evaluation");
            return Err(Failure::Compile);
        }

        self.interpreter.add_locals(locals);

        match self.interpreter.interpret(&statements) {
            Ok(value) => {
                debug!("Program finished with value {}", value);
                Ok(value)
            }
            Err(err) => {
                reporter.report(&err);
                Err(Failure::Runtime)
            }
        }
    }
}
