use crate::error::{LoxError, Result};
use crate::value::Value;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A scope frame shared between the code running in it and every closure
/// that captured it.
pub type SharedEnv = Rc<RefCell<Environment>>;

/// One level of the lexical scope chain.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<SharedEnv>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: SharedEnv) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// A fresh, shareable global frame.
    pub fn new_global() -> SharedEnv {
        Rc::new(RefCell::new(Environment::new()))
    }

    /// A fresh, shareable frame nested inside `parent`.
    pub fn child_of(parent: &SharedEnv) -> SharedEnv {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(parent))))
    }

    pub fn enclosing(&self) -> Option<SharedEnv> {
        self.enclosing.clone()
    }

    /// Bind `name` in this frame, shadowing or overwriting any earlier binding.
    pub fn define(&mut self, name: &str, value: Value) {
        trace!("define '{}' = {}", name, value);

        self.values.insert(name.to_string(), value);
    }

    /// Whether `name` is bound in this frame (enclosing frames are not searched).
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(undefined(name, line))
        }
    }

    /// Overwrite the nearest existing binding of `name`.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(undefined(name, line))
        }
    }

    /// The frame `distance` links outward from `env` (`0` is `env` itself).
    pub fn ancestor(env: &SharedEnv, distance: usize) -> Option<SharedEnv> {
        let mut current: SharedEnv = Rc::clone(env);

        for _ in 0..distance {
            let parent: SharedEnv = current.borrow().enclosing.clone()?;
            current = parent;
        }

        Some(current)
    }

    /// Read `name` exactly `distance` frames out, without searching further.
    pub fn get_at(env: &SharedEnv, distance: usize, name: &str, line: usize) -> Result<Value> {
        let frame: SharedEnv = Self::ancestor(env, distance).ok_or_else(|| undefined(name, line))?;
        let value: Option<Value> = frame.borrow().values.get(name).cloned();

        value.ok_or_else(|| undefined(name, line))
    }

    /// Write `name` exactly `distance` frames out; the binding must already exist there.
    pub fn assign_at(
        env: &SharedEnv,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<()> {
        let target: SharedEnv = Self::ancestor(env, distance).ok_or_else(|| undefined(name, line))?;
        let mut frame = target.borrow_mut();

        let result = match frame.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined(name, line)),
        };

        result
    }
}

fn undefined(name: &str, line: usize) -> LoxError {
    LoxError::runtime(line, format!("Undefined variable '{}'.", name))
}
