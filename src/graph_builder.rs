use std::collections::HashMap;

use log::debug;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::ast::*;
use crate::colorer::LineClassification;
use crate::error::{Error, Result};
use crate::render::{render_expression, render_statement};
use crate::types::{ControlFlowGraph, EdgeKind, GraphNode, NodeColor, NodeId, NodeShape};
use crate::utils::{clean_label, first_line, number_label};

/// An id promised to the next statement node before that node exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedId(u32);

impl ReservedId {
    pub fn id(&self) -> NodeId {
        NodeId::Statement(self.0)
    }
}

#[derive(Debug)]
struct IdCounter {
    next: u32,
}

impl IdCounter {
    fn next_statement(&mut self) -> NodeId {
        let id = NodeId::Statement(self.next);
        self.next += 1;
        id
    }

    /// Merge node id for a conditional starting at the current counter value.
    /// Never `Junction(0)`, which would render as the same signed id as `Statement(0)`.
    fn junction(&self) -> NodeId {
        NodeId::Junction(self.next.max(1))
    }

    fn reserve(&self) -> ReservedId {
        ReservedId(self.next)
    }
}

/// Builds the control-flow graph of a function body.
///
/// Ids start at `first_id`; when `classification` is given, nodes on the
/// concrete execution path are highlighted.
pub fn build_cfg(
    body: &[Stmt],
    first_id: u32,
    classification: Option<&LineClassification>,
) -> Result<ControlFlowGraph> {
    let mut builder = CfgBuilder::new(first_id, classification);
    builder.walk(body)?;
    Ok(builder.finish())
}

pub struct CfgBuilder<'a> {
    graph: ControlFlowGraph,
    counter: IdCounter,
    pending: Option<ReservedId>,
    classification: Option<&'a LineClassification>,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(first_id: u32, classification: Option<&'a LineClassification>) -> Self {
        CfgBuilder {
            graph: ControlFlowGraph::default(),
            counter: IdCounter { next: first_id },
            pending: None,
            classification,
        }
    }

    pub fn walk(&mut self, body: &[Stmt]) -> Result<()> {
        let mut index = 0;
        let mut last: Option<NodeId> = None;

        while index < body.len() {
            let stmt = &body[index];
            match &stmt.kind {
                StmtKind::While(while_stmt) => {
                    reject_nested_functions(&while_stmt.body)?;
                    self.add_loop(stmt, while_stmt, last);
                    last = None;
                    index += 1;
                }
                StmtKind::If(if_stmt) => {
                    reject_nested_functions(stmt)?;
                    last = Some(self.add_conditional(if_stmt, last));
                    index += 1;
                }
                StmtKind::Return(_) => {
                    self.add_block(&body[index..=index], last);
                    self.drop_unreachable(&body[index + 1..]);
                    return Ok(());
                }
                _ => {
                    let end = plain_run_end(body, index)?;
                    // a return closing the run joins its block
                    if matches!(body.get(end), Some(Stmt { kind: StmtKind::Return(_), .. })) {
                        self.add_block(&body[index..=end], last);
                        self.drop_unreachable(&body[end + 1..]);
                        return Ok(());
                    }
                    last = Some(self.add_block(&body[index..end], last));
                    index = end;
                }
            }
        }

        Ok(())
    }

    /// Materializes a node still owed to a loop exit, then hands back the graph.
    pub fn finish(mut self) -> ControlFlowGraph {
        if self.pending.is_some() {
            let id = self.allocate();
            let color = self.junction_color();
            self.push_node(id, number_label(id, "exit"), NodeShape::Junction, color, None);
        }
        self.graph
    }

    fn allocate(&mut self) -> NodeId {
        let id = self.counter.next_statement();
        if let Some(reserved) = self.pending.take() {
            assert_eq!(
                reserved.id(),
                id,
                "forward reference resolved to a different node"
            );
        }
        id
    }

    fn add_block(&mut self, stmts: &[Stmt], last: Option<NodeId>) -> NodeId {
        let id = self.allocate();
        let text = stmts
            .iter()
            .map(render_statement)
            .collect::<Vec<_>>()
            .join("\n");
        let line = stmts.first().map(|s| s.line);
        let color = self.line_color(line);
        self.push_node(id, number_label(id, &clean_label(&text)), NodeShape::Block, color, line);
        if let Some(last) = last {
            self.graph.push_edge(last, id, EdgeKind::Unconditional);
        }
        id
    }

    fn add_loop(&mut self, stmt: &Stmt, while_stmt: &WhileStmt, last: Option<NodeId>) {
        let junction = self.allocate();
        let color = self.junction_color();
        self.push_node(
            junction,
            number_label(junction, "NULL"),
            NodeShape::Junction,
            color,
            Some(stmt.line),
        );

        let decision = self.add_decision(&while_stmt.test);

        let body = self.allocate();
        let label = clean_label(&render_statement(&while_stmt.body));
        self.push_node(
            body,
            number_label(body, &label),
            NodeShape::Block,
            NodeColor::Default,
            Some(first_line(&while_stmt.body)),
        );

        if let Some(last) = last {
            self.graph.push_edge(last, junction, EdgeKind::Unconditional);
        }
        self.graph.push_edge(junction, decision, EdgeKind::Unconditional);
        self.graph.push_edge(body, junction, EdgeKind::Unconditional);
        self.graph.push_edge(decision, body, EdgeKind::TrueBranch);

        let exit = self.counter.reserve();
        self.graph.push_edge(decision, exit.id(), EdgeKind::FalseBranch);
        self.pending = Some(exit);
    }

    /// Emits an if/else-if/else chain and returns its merge node.
    fn add_conditional(&mut self, if_stmt: &IfStmt, last: Option<NodeId>) -> NodeId {
        let junction = self.counter.junction();
        let color = self.junction_color();
        self.push_node(junction, String::new(), NodeShape::Junction, color, None);

        let mut decision = self.add_branch(if_stmt, junction);
        if let Some(last) = last {
            self.graph.push_edge(last, decision, EdgeKind::Unconditional);
        }

        let mut alternate = if_stmt.alternate.as_deref();
        loop {
            match alternate {
                None => {
                    self.graph.push_edge(decision, junction, EdgeKind::FalseBranch);
                    break;
                }
                Some(Stmt {
                    kind: StmtKind::If(inner),
                    ..
                }) => {
                    let next = self.add_branch(inner, junction);
                    self.graph.push_edge(decision, next, EdgeKind::FalseBranch);
                    decision = next;
                    alternate = inner.alternate.as_deref();
                }
                Some(otherwise) => {
                    let node = self.add_body(otherwise);
                    self.graph.push_edge(decision, node, EdgeKind::FalseBranch);
                    self.graph.push_edge(node, junction, EdgeKind::Unconditional);
                    break;
                }
            }
        }

        junction
    }

    /// Test and consequent of one link in an if chain; returns the decision node.
    fn add_branch(&mut self, if_stmt: &IfStmt, junction: NodeId) -> NodeId {
        let decision = self.add_decision(&if_stmt.test);
        let consequent = self.add_body(&if_stmt.consequent);
        self.graph.push_edge(consequent, junction, EdgeKind::Unconditional);
        self.graph.push_edge(decision, consequent, EdgeKind::TrueBranch);
        decision
    }

    fn add_decision(&mut self, test: &Expr) -> NodeId {
        let id = self.allocate();
        let color = self.line_color(Some(test.line));
        let label = clean_label(&render_expression(test));
        self.push_node(id, number_label(id, &label), NodeShape::Decision, color, Some(test.line));
        id
    }

    fn add_body(&mut self, stmt: &Stmt) -> NodeId {
        let id = self.allocate();
        let line = first_line(stmt);
        let color = self.line_color(Some(line));
        let label = clean_label(&render_statement(stmt));
        self.push_node(id, number_label(id, &label), NodeShape::Block, color, Some(line));
        id
    }

    fn push_node(
        &mut self,
        id: NodeId,
        label: String,
        shape: NodeShape,
        color: NodeColor,
        line: Option<usize>,
    ) {
        debug!("node {} ({:?}): {:?}", id, shape, label);
        self.graph.nodes.push(GraphNode {
            id,
            label,
            shape,
            color,
            line,
        });
    }

    fn line_color(&self, line: Option<usize>) -> NodeColor {
        match (self.classification, line) {
            (Some(classification), Some(line)) if classification.executed.contains(&line) => {
                NodeColor::Highlighted
            }
            _ => NodeColor::Default,
        }
    }

    fn junction_color(&self) -> NodeColor {
        if self.classification.is_some() {
            NodeColor::Highlighted
        } else {
            NodeColor::Default
        }
    }

    fn drop_unreachable(&self, rest: &[Stmt]) {
        if !rest.is_empty() {
            debug!("dropping {} unreachable statement(s) after return", rest.len());
        }
    }
}

/// Index one past the run of plain statements starting at `start`.
fn plain_run_end(body: &[Stmt], start: usize) -> Result<usize> {
    let mut end = start;
    while let Some(stmt) = body.get(end) {
        match &stmt.kind {
            StmtKind::If(_) | StmtKind::While(_) | StmtKind::Return(_) => break,
            StmtKind::Function(func) => {
                return Err(Error::unsupported(
                    stmt.line,
                    format!("nested function declaration `{}`", func.name),
                ));
            }
            _ => end += 1,
        }
    }
    Ok(end)
}

/// Bodies that end up inside one opaque node may not hide a function declaration.
fn reject_nested_functions(stmt: &Stmt) -> Result<()> {
    match &stmt.kind {
        StmtKind::Function(func) => Err(Error::unsupported(
            stmt.line,
            format!("nested function declaration `{}`", func.name),
        )),
        StmtKind::Block(body) => body.iter().try_for_each(reject_nested_functions),
        StmtKind::If(if_stmt) => {
            reject_nested_functions(&if_stmt.consequent)?;
            match &if_stmt.alternate {
                Some(alternate) => reject_nested_functions(alternate),
                None => Ok(()),
            }
        }
        StmtKind::While(while_stmt) => reject_nested_functions(&while_stmt.body),
        StmtKind::Expression(_) | StmtKind::Variable(_) | StmtKind::Return(_) => Ok(()),
    }
}

/// The graph as a petgraph digraph, plus where each node id landed.
pub fn to_digraph(
    cfg: &ControlFlowGraph,
) -> (DiGraph<GraphNode, EdgeKind>, HashMap<NodeId, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut node_map: HashMap<NodeId, NodeIndex> = HashMap::new();

    for node in &cfg.nodes {
        let idx = graph.add_node(node.clone());
        node_map.insert(node.id, idx);
    }

    for edge in cfg.edges() {
        if let (Some(&from), Some(&to)) = (node_map.get(&edge.from), node_map.get(&edge.to)) {
            graph.add_edge(from, to, edge.kind);
        }
    }

    (graph, node_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::types::Edge;

    use test_log::test;

    fn build(source: &str) -> ControlFlowGraph {
        let program = parse(source).unwrap();
        build_cfg(&program.expect_single_function().unwrap().body, 1, None).unwrap()
    }

    fn pairs(edges: &[Edge]) -> Vec<(i64, i64)> {
        edges
            .iter()
            .map(|e| (e.from.as_signed(), e.to.as_signed()))
            .collect()
    }

    #[test]
    fn test_straight_line_is_one_block() {
        let cfg = build("function f(a, b) {\n let c = a + b;\n c = c * 2;\n}");
        assert_eq!(cfg.nodes.len(), 1);
        assert_eq!(cfg.nodes[0].label, "1: c = a + b\nc = c * 2");
        assert_eq!(cfg.nodes[0].shape, NodeShape::Block);
        assert_eq!(cfg.edges().count(), 0);
    }

    #[test]
    fn test_if_else_chain_numbering() {
        let cfg = build(
            "function f(x) {\n\
             let a = 0;\n\
             if (x < 0) {\n\
             a = 1;\n\
             } else if (x < 10) {\n\
             a = 2;\n\
             } else {\n\
             a = 3;\n\
             }\n\
             return a;\n\
             }",
        );
        let ids: Vec<i64> = cfg.nodes.iter().map(|n| n.id.as_signed()).collect();
        assert_eq!(ids, vec![1, -2, 2, 3, 4, 5, 6, 7]);
        assert_eq!(pairs(&cfg.always), vec![(3, -2), (1, 2), (5, -2), (6, -2), (-2, 7)]);
        assert_eq!(pairs(&cfg.on_true), vec![(2, 3), (4, 5)]);
        assert_eq!(pairs(&cfg.on_false), vec![(2, 4), (4, 6)]);
        assert_eq!(cfg.node(NodeId::Statement(2)).unwrap().label, "2: x < 0");
        assert_eq!(cfg.node(NodeId::Statement(7)).unwrap().label, "7: return a");
    }

    #[test]
    fn test_if_without_else_falls_to_junction() {
        let cfg = build("function f(x) {\n x = 1;\n if (x) {\n x = 2;\n }\n x = 3;\n}");
        assert_eq!(pairs(&cfg.on_false), vec![(2, -2)]);
        assert!(cfg.on_false[0].to.as_signed() < 0);
        assert_eq!(
            cfg.node(NodeId::Junction(2)).map(|n| n.shape),
            Some(NodeShape::Junction)
        );
        assert_eq!(pairs(&cfg.always), vec![(3, -2), (1, 2), (-2, 4)]);
    }

    #[test]
    fn test_while_wires_back_edge_and_forward_exit() {
        let cfg = build(
            "function f(n) {\n\
             let i = 0;\n\
             while (i < n) {\n\
             i = i + 1;\n\
             }\n\
             return i;\n\
             }",
        );
        let ids: Vec<i64> = cfg.nodes.iter().map(|n| n.id.as_signed()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(pairs(&cfg.always), vec![(1, 2), (2, 3), (4, 2)]);
        assert_eq!(pairs(&cfg.on_true), vec![(3, 4)]);
        assert_eq!(pairs(&cfg.on_false), vec![(3, 5)]);
        assert_eq!(cfg.node(NodeId::Statement(2)).unwrap().label, "2: NULL");
        assert_eq!(cfg.node(NodeId::Statement(4)).unwrap().label, "4: i = i + 1");
        assert_eq!(cfg.node(NodeId::Statement(5)).unwrap().label, "5: return i");
    }

    #[test]
    fn test_trailing_loop_gets_exit_node() {
        let cfg = build("function f(n) {\n while (n > 0) {\n n = n - 1;\n }\n}");
        let exit = cfg.node(NodeId::Statement(4)).unwrap();
        assert_eq!(exit.shape, NodeShape::Junction);
        assert_eq!(exit.label, "4: exit");
        assert_eq!(pairs(&cfg.on_false), vec![(2, 4)]);
    }

    #[test]
    fn test_loop_then_conditional_uses_reserved_id() {
        let cfg = build(
            "function f(n) {\n\
             while (n > 0) {\n\
             n = n - 1;\n\
             }\n\
             if (n) {\n\
             n = 5;\n\
             }\n\
             }",
        );
        assert_eq!(pairs(&cfg.on_false), vec![(2, 4), (4, -4)]);
        assert_eq!(cfg.node(NodeId::Statement(4)).unwrap().shape, NodeShape::Decision);
    }

    #[test]
    fn test_leading_return_has_no_predecessor() {
        let cfg = build("function f() {\n return 1;\n x = 2;\n}");
        assert_eq!(cfg.nodes.len(), 1);
        assert_eq!(cfg.nodes[0].label, "1: return 1");
        assert_eq!(cfg.edges().count(), 0);
    }

    #[test]
    fn test_first_id_zero_skips_label_prefix() {
        let program = parse("function f() {\n let a = 1;\n}").unwrap();
        let cfg = build_cfg(&program.expect_single_function().unwrap().body, 0, None).unwrap();
        assert_eq!(cfg.nodes[0].id, NodeId::Statement(0));
        assert_eq!(cfg.nodes[0].label, "a = 1");
    }

    #[test]
    fn test_empty_body_builds_empty_graph() {
        let cfg = build("function f() {}");
        assert!(cfg.nodes.is_empty());
    }

    #[test]
    fn test_first_id_zero_keeps_junction_negative() {
        let program = parse("function f(x) {\n if (x) {\n x = 1;\n }\n}").unwrap();
        let cfg = build_cfg(&program.expect_single_function().unwrap().body, 0, None).unwrap();
        let ids: Vec<i64> = cfg.nodes.iter().map(|n| n.id.as_signed()).collect();
        assert_eq!(ids, vec![-1, 0, 1]);
        assert_eq!(pairs(&cfg.on_false), vec![(0, -1)]);
        assert!(cfg.on_false[0].to.as_signed() < 0);
    }

    #[test]
    fn test_function_inside_branch_is_rejected() {
        let program = parse("function f(x) {\n if (x) {\n function g() {}\n }\n}").unwrap();
        let err = build_cfg(&program.expect_single_function().unwrap().body, 1, None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruct { line: 3, .. }));
    }

    #[test]
    fn test_function_inside_loop_body_is_rejected() {
        let program =
            parse("function f(x) {\n while (x) {\n x = 0;\n function g() {}\n }\n}").unwrap();
        let err = build_cfg(&program.expect_single_function().unwrap().body, 1, None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruct { line: 4, .. }));
    }

    #[test]
    fn test_nested_function_is_rejected() {
        let program = parse("function f() {\n function g() {}\n}").unwrap();
        let err = build_cfg(&program.expect_single_function().unwrap().body, 1, None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruct { line: 2, .. }));
    }

    #[test]
    fn test_highlighting_follows_classification() {
        let program = parse("function f(x) {\n if (x) {\n x = 1;\n } else {\n x = 2;\n }\n}").unwrap();
        let classification = LineClassification {
            executed: [2, 3].into_iter().collect(),
            skipped: [5].into_iter().collect(),
        };
        let cfg = build_cfg(
            &program.expect_single_function().unwrap().body,
            1,
            Some(&classification),
        )
        .unwrap();
        let color = |id| cfg.node(id).unwrap().color;
        assert_eq!(color(NodeId::Junction(1)), NodeColor::Highlighted);
        assert_eq!(color(NodeId::Statement(1)), NodeColor::Highlighted);
        assert_eq!(color(NodeId::Statement(2)), NodeColor::Highlighted);
        assert_eq!(color(NodeId::Statement(3)), NodeColor::Default);
    }

    #[test]
    fn test_to_digraph_keeps_every_edge() {
        let cfg = build("function f(n) {\n while (n > 0) {\n n = n - 1;\n }\n}");
        let (graph, node_map) = to_digraph(&cfg);
        assert_eq!(graph.node_count(), cfg.nodes.len());
        assert_eq!(graph.edge_count(), cfg.edges().count());
        let decision = node_map[&NodeId::Statement(2)];
        assert_eq!(graph.edges(decision).count(), 2);
    }
}
