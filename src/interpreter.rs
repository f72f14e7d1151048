//! Tree‑walking evaluator.
//!
//! The active frame is threaded through `execute`/`evaluate` as a parameter
//! instead of living in a field, so leaving a block (normally, through a
//! `break`/`continue`/`return` signal, or through an error) can never leave the
//! interpreter pointing at the wrong scope.

use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info, trace};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{LoxFunction, NativeFunction};
use crate::environment::{Environment, SharedEnv};
use crate::error::{LoxError, Result};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.  Anything but `Normal` unwinds enclosing
/// statements until a loop (`Break`, `Continue`) or a call (`Return`) takes it.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter {
    globals: SharedEnv,
    locals: Locals,
    last_value: Value,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout, with native functions such
    /// as `clock` bound in the global frame.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Same as [`Interpreter::new`] but `print` writes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: SharedEnv = Environment::new_global();

        debug!("Defining native function 'clock'");

        globals
            .borrow_mut()
            .define("clock", Value::Callable(Rc::new(NativeFunction::clock())));

        Self {
            globals,
            locals: Locals::new(),
            last_value: Value::Nil,
            out,
        }
    }

    /// Add resolver findings for a program about to be interpreted.  Entries
    /// are never removed: closures from earlier programs keep using theirs.
    pub fn add_locals(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Value of the most recent expression statement, print statement or
    /// variable declaration.
    pub fn last_value(&self) -> &Value {
        &self.last_value
    }

    /// Interprets a list of statements (a "program") in the global frame and
    /// returns the last computed value.  A runtime error stops execution;
    /// effects of statements already executed remain.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<Value> {
        debug!("Interpreting {} statements", statements.len());

        self.last_value = Value::Nil;
        let globals: SharedEnv = Rc::clone(&self.globals);

        for stmt in statements {
            match self.execute(stmt, &globals)? {
                Flow::Normal => {}
                escaped => {
                    return Err(LoxError::runtime(
                        stmt.line(),
                        format!("{:?} signal escaped to top level.", escaped),
                    ));
                }
            }
        }

        info!("Interpretation completed successfully");

        Ok(self.last_value.clone())
    }

    /// Execute `statements` in order in `env`, stopping at the first signal.
    pub(crate) fn execute_statements(&mut self, statements: &[Stmt], env: &SharedEnv) -> Result<Flow> {
        for stmt in statements {
            let flow: Flow = self.execute(stmt, env)?;

            if flow != Flow::Normal {
                return Ok(flow);
            }
        }

        Ok(Flow::Normal)
    }

    /// Executes a single statement.
    fn execute(&mut self, stmt: &Stmt, env: &SharedEnv) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.last_value = self.evaluate(expr, env)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr, env)?;

                writeln!(self.out, "{}", value)
                    .map_err(|e| LoxError::runtime(expr.line(), format!("print failed: {}", e)))?;

                trace!("Printed value: {}", value);
                self.last_value = value;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                env.borrow_mut().define(&name.lexeme, value.clone());
                self.last_value = value;
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let frame: SharedEnv = Environment::child_of(env);
                self.execute_statements(statements, &frame)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let value: Value = self.evaluate(condition, env)?;

                if self.is_truthy(&value, condition.line())? {
                    self.execute(then_branch, env)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt, env)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                debug!("Entering while loop at line {}", condition.line());

                loop {
                    let value: Value = self.evaluate(condition, env)?;
                    if !self.is_truthy(&value, condition.line())? {
                        break;
                    }

                    match self.execute(body, env)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }

                    if let Some(increment) = increment {
                        self.last_value = self.evaluate(increment, env)?;
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Continue(_) => Ok(Flow::Continue),

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(env));

                env.borrow_mut()
                    .define(&decl.name.lexeme, Value::Callable(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }
        }
    }

    /// Evaluates an expression and returns a Value.
    fn evaluate(&mut self, expr: &Expr, env: &SharedEnv) -> Result<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner, env),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right, env)?;
                self.evaluate_unary(operator, &right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left, env)?;
                let right: Value = self.evaluate(right, env)?;
                evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val: Value = self.evaluate(left, env)?;
                let truthy: bool = self.is_truthy(&left_val, operator.line)?;

                let short_circuits: bool = match operator.token_type {
                    TokenType::OR => truthy,
                    _ => !truthy,
                };

                if short_circuits {
                    Ok(left_val)
                } else {
                    self.evaluate(right, env)
                }
            }

            Expr::Conditional {
                condition,
                question,
                then_branch,
                else_branch,
            } => {
                let value: Value = self.evaluate(condition, env)?;

                if self.is_truthy(&value, question.line)? {
                    self.evaluate(then_branch, env)
                } else {
                    self.evaluate(else_branch, env)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name, env),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value, env)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        env,
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name.line)?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val: Value = self.evaluate(callee, env)?;

                let mut arg_values: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg, env)?);
                }

                let Value::Callable(function) = callee_val else {
                    return Err(LoxError::runtime(
                        paren.line,
                        "Can only call functions.",
                    ));
                };

                if arg_values.len() != function.arity() {
                    return Err(LoxError::runtime(
                        paren.line,
                        format!(
                            "Expected {} arguments but got {}.",
                            function.arity(),
                            arg_values.len()
                        ),
                    ));
                }

                function.call(self, arg_values, paren.line)
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token, env: &SharedEnv) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(env, distance, &name.lexeme, name.line),
            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    fn evaluate_unary(&self, op: &Token, right: &Value) -> Result<Value> {
        match op.token_type {
            TokenType::MINUS => match right.as_number() {
                Some(n) => Ok(Value::Number(-n)),
                None => Err(LoxError::runtime(op.line, "Operand must be a number.")),
            },
            TokenType::BANG => Ok(Value::Bool(!self.is_truthy(right, op.line)?)),
            _ => Err(LoxError::runtime(
                op.line,
                format!("Invalid unary operator '{}'.", op.lexeme),
            )),
        }
    }

    fn is_truthy(&self, value: &Value, line: usize) -> Result<bool> {
        value.truthy().ok_or_else(|| {
            LoxError::runtime(
                line,
                format!("Can't use a {} as a condition.", value.type_name()),
            )
        })
    }
}

fn evaluate_binary(op: &Token, left: Value, right: Value) -> Result<Value> {
    trace!("Binary '{}' on {} and {}", op.lexeme, left, right);

    match op.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            _ => Err(LoxError::runtime(
                op.line,
                "Operands must be two numbers or two strings.",
            )),
        },

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => {
            let (a, b) = match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(LoxError::runtime(op.line, "Operands must be numbers.")),
            };

            match op.token_type {
                TokenType::MINUS => Ok(Value::Number(a - b)),
                TokenType::STAR => Ok(Value::Number(a * b)),
                TokenType::SLASH => Ok(Value::Number(a / b)),
                TokenType::GREATER => Ok(Value::Bool(a > b)),
                TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                TokenType::LESS => Ok(Value::Bool(a < b)),
                TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(
                    op.line,
                    format!("Invalid binary operator '{}'.", op.lexeme),
                )),
            }
        }
    }
}
