pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod runner;
pub mod scanner;
pub mod token;
pub mod value;

pub use error::{CollectingReporter, ConsoleReporter, Failure, LoxError, Reporter, Stage};
pub use runner::Lox;
pub use value::Value;
