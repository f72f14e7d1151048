//! Things a call expression can invoke: host‑side natives and user functions.

use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, trace};

use crate::ast::FunctionDecl;
use crate::environment::{Environment, SharedEnv};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// A value that can be called with a fixed number of arguments.
pub trait Callable: fmt::Debug + fmt::Display {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    /// Invoke with already evaluated arguments; `arguments.len() == arity()`
    /// has been checked by the caller.  `line` locates the call site.
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, line: usize) -> Result<Value>;
}

/// Signature of a host‑side implementation.
pub type NativeFn = fn(&[Value]) -> std::result::Result<Value, String>;

/// A function implemented by the host.
pub struct NativeFunction {
    name: &'static str,
    arity: usize,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, func: NativeFn) -> Self {
        Self { name, arity, func }
    }

    /// `clock()`: seconds since the Unix epoch, with millisecond precision.
    pub fn clock() -> Self {
        Self::new("clock", 0, |_args: &[Value]| {
            let millis: i64 = Utc::now().timestamp_millis();

            Ok(Value::Number(millis as f64 / 1000.0))
        })
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _interpreter: &mut Interpreter, arguments: Vec<Value>, line: usize) -> Result<Value> {
        trace!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|msg| LoxError::runtime(line, msg))
    }
}

/// A user‑defined function together with the frame it was declared in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: SharedEnv,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: SharedEnv) -> Self {
        Self {
            declaration,
            closure,
        }
    }
}

impl fmt::Debug for LoxFunction {
    // The closure is left out: it usually contains this very function.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.declaration.name.lexeme)
            .field("arity", &self.declaration.params.len())
            .finish()
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

impl Callable for LoxFunction {
    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, line: usize) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        // Parented at the closure, not at the caller's frame.
        let frame: SharedEnv = Environment::child_of(&self.closure);

        for (param, value) in self.declaration.params.iter().zip(arguments) {
            frame.borrow_mut().define(&param.lexeme, value);
        }

        match interpreter.execute_statements(&self.declaration.body, &frame)? {
            Flow::Normal => Ok(Value::Nil),
            Flow::Return(value) => Ok(value),
            Flow::Break | Flow::Continue => Err(LoxError::runtime(
                line,
                format!("Loop control escaped function '{}'.", self.name()),
            )),
        }
    }
}
