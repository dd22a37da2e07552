use std::borrow::Cow;
use std::io;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde_json::json;

use crate::colorer::LineClassification;
use crate::graph_builder::to_digraph;
use crate::types::{ControlFlowGraph, EdgeKind, GraphNode, NodeColor, NodeShape};

/// vis.js-shaped `{nodes, edges}` document.
pub fn format_graph_as_json(cfg: &ControlFlowGraph) -> String {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for node in &cfg.nodes {
        let shape = match node.shape {
            NodeShape::Block => "box",
            NodeShape::Decision => "diamond",
            NodeShape::Junction => "ellipse",
        };
        let background = match node.color {
            NodeColor::Highlighted => "MediumSeaGreen",
            NodeColor::Default => "white",
        };

        nodes.push(json!({
            "id": node.id,
            "label": node.label,
            "shape": shape,
            "color": {
                "background": background,
                "border": "black"
            },
            "line": node.line
        }));
    }

    for edge in cfg.edges() {
        edges.push(json!({
            "from": edge.from,
            "to": edge.to,
            "label": edge_label(edge.kind),
            "arrows": "to",
            "color": "black"
        }));
    }

    let result = json!({
        "nodes": nodes,
        "edges": edges
    });

    format!("{:#}", result)
}

pub fn format_lines_as_json(classification: &LineClassification) -> String {
    let result = json!({
        "executed": classification.executed,
        "skipped": classification.skipped
    });

    format!("{:#}", result)
}

/// Graphviz rendering of the graph.
pub fn format_graph_as_dot(cfg: &ControlFlowGraph) -> io::Result<String> {
    let (graph, _) = to_digraph(cfg);
    let view = DotView { graph };

    let mut output = Vec::new();
    dot::render(&view, &mut output)?;
    String::from_utf8(output).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn edge_label(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Unconditional => "",
        EdgeKind::TrueBranch => "T",
        EdgeKind::FalseBranch => "F",
    }
}

struct DotView {
    graph: DiGraph<GraphNode, EdgeKind>,
}

impl<'a> dot::Labeller<'a, NodeIndex, EdgeIndex> for DotView {
    fn graph_id(&'a self) -> dot::Id<'a> {
        dot::Id::new("cfg").unwrap()
    }

    // Signed ids are not valid DOT identifiers, so nodes are named by index
    fn node_id(&'a self, n: &NodeIndex) -> dot::Id<'a> {
        dot::Id::new(format!("N{}", n.index())).unwrap()
    }

    fn node_label(&'a self, n: &NodeIndex) -> dot::LabelText<'a> {
        dot::LabelText::LabelStr(Cow::Owned(self.graph[*n].label.clone()))
    }

    fn node_shape(&'a self, n: &NodeIndex) -> Option<dot::LabelText<'a>> {
        let shape = match self.graph[*n].shape {
            NodeShape::Block => "box",
            NodeShape::Decision => "diamond",
            NodeShape::Junction => "ellipse",
        };
        Some(dot::LabelText::LabelStr(shape.into()))
    }

    fn node_style(&'a self, _n: &NodeIndex) -> dot::Style {
        dot::Style::Filled
    }

    fn node_color(&'a self, n: &NodeIndex) -> Option<dot::LabelText<'a>> {
        let color = match self.graph[*n].color {
            NodeColor::Highlighted => "palegreen",
            NodeColor::Default => "white",
        };
        Some(dot::LabelText::LabelStr(color.into()))
    }

    fn edge_label(&'a self, e: &EdgeIndex) -> dot::LabelText<'a> {
        dot::LabelText::LabelStr(edge_label(self.graph[*e]).into())
    }
}

impl<'a> dot::GraphWalk<'a, NodeIndex, EdgeIndex> for DotView {
    fn nodes(&'a self) -> dot::Nodes<'a, NodeIndex> {
        self.graph.node_indices().collect::<Vec<_>>().into()
    }

    fn edges(&'a self) -> dot::Edges<'a, EdgeIndex> {
        self.graph.edge_indices().collect::<Vec<_>>().into()
    }

    fn source(&'a self, e: &EdgeIndex) -> NodeIndex {
        self.graph.raw_edges()[e.index()].source()
    }

    fn target(&'a self, e: &EdgeIndex) -> NodeIndex {
        self.graph.raw_edges()[e.index()].target()
    }
}
