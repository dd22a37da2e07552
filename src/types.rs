use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::ast::Literal;
use crate::error::{Error, Result};

// Node ids live in two namespaces: statement ids come from the build counter,
// junction ids mark post-conditional merge points and render as negatives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Statement(u32), // Block, decision and loop-entry nodes
    Junction(u32),  // Merge point after an if/else chain
}

impl NodeId {
    pub fn as_signed(&self) -> i64 {
        match self {
            NodeId::Statement(n) => i64::from(*n),
            NodeId::Junction(n) => -i64::from(*n),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_signed())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_signed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Block,    // Straight-line statements
    Decision, // Conditional test
    Junction, // Merge point or loop entry
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColor {
    Default,
    Highlighted, // On the concrete execution path
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Unconditional,
    TrueBranch,
    FalseBranch,
}

// Encapsulate node information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    pub shape: NodeShape,
    pub color: NodeColor,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// Nodes plus the three edge lists produced by one build pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlFlowGraph {
    pub nodes: Vec<GraphNode>,
    pub always: Vec<Edge>,
    pub on_true: Vec<Edge>,
    pub on_false: Vec<Edge>,
}

impl ControlFlowGraph {
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.always
            .iter()
            .chain(self.on_true.iter())
            .chain(self.on_false.iter())
    }

    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges().filter(move |e| e.from == id)
    }

    pub fn nodes_with_shape(&self, shape: NodeShape) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.shape == shape)
    }

    pub(crate) fn push_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        let edge = Edge { from, to, kind };
        match kind {
            EdgeKind::Unconditional => self.always.push(edge),
            EdgeKind::TrueBranch => self.on_true.push(edge),
            EdgeKind::FalseBranch => self.on_false.push(edge),
        }
    }
}

/// Concrete parameter values for one run, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentVector(BTreeMap<String, Literal>);

impl ArgumentVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Literal) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Parses a JSON object such as `{"x": 5, "flag": true, "s": "a"}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::InvalidArguments(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| Error::InvalidArguments("expected a JSON object".to_string()))?;

        let mut args = ArgumentVector::new();
        for (name, value) in object {
            let literal = match value {
                serde_json::Value::Number(n) => {
                    Literal::Number(n.as_f64().unwrap_or(f64::NAN))
                }
                serde_json::Value::Bool(b) => Literal::Bool(*b),
                serde_json::Value::String(s) => Literal::Str(s.clone()),
                other => {
                    return Err(Error::InvalidArguments(format!(
                        "unsupported value for `{}`: {}",
                        name, other
                    )));
                }
            };
            args.0.insert(name.clone(), literal);
        }
        Ok(args)
    }
}

impl FromIterator<(String, Literal)> for ArgumentVector {
    fn from_iter<I: IntoIterator<Item = (String, Literal)>>(iter: I) -> Self {
        ArgumentVector(iter.into_iter().collect())
    }
}
