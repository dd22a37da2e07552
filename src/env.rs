use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, Literal};

/// Variable bindings known during one evaluation pass.
///
/// Cloning is cheap: clones share storage until one of them is written,
/// so a branch body can work on its own copy without touching the
/// bindings of its siblings or of the code after the conditional.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: Rc<HashMap<String, Expr>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.bindings.get(name)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Expr) {
        Rc::make_mut(&mut self.bindings).insert(name.into(), value);
    }

    /// Binds `name` to an identifier standing for its own unknown value.
    pub fn bind_placeholder(&mut self, name: &str, line: usize) {
        self.bind(name, Expr::identifier(name, line));
    }

    pub fn bind_literal(&mut self, name: &str, value: Literal, line: usize) {
        self.bind(name, Expr::literal(value, line));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether both environments still share the same storage.
    pub fn shares_storage_with(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.bindings, &other.bindings)
    }
}
