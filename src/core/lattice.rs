//! Dependency lattice.
//!
//! A directed graph whose vertices are package spec strings and whose edges
//! run from a package to each package satisfying one of its dependency
//! patterns. Building the lattice proves acyclicity; the topological order
//! it yields puts dependencies before their dependents.

use crate::core::package::PackageRef;
use crate::error::{Result, SpockError};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
pub struct DependencyLattice {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    ordinals: HashMap<String, usize>,
}

impl DependencyLattice {
    /// Build the lattice over a package list: one vertex per distinct spec
    /// string, one edge per satisfied dependency pattern (parallel edges
    /// collapse). Fails with a conflict when the dependencies form a cycle.
    pub fn build(packages: &[PackageRef]) -> Result<DependencyLattice> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();

        for pkg in packages {
            let spec = pkg.to_string();
            index
                .entry(spec.clone())
                .or_insert_with(|| graph.add_node(spec));
        }
        for pkg in packages {
            let from = index[&pkg.to_string()];
            for pattern in pkg.dependency_patterns() {
                for other in packages {
                    if pattern.matches(other) {
                        let to = index[&other.to_string()];
                        graph.update_edge(from, to, ());
                    }
                }
            }
        }

        let ordinals = kahn_ordinals(&graph)?;
        Ok(DependencyLattice {
            graph,
            index,
            ordinals,
        })
    }

    pub fn contains(&self, spec: &str) -> bool {
        self.index.contains_key(spec)
    }

    /// Reorder packages so every dependency comes before its dependents.
    pub fn sort_packages(&self, packages: &mut [PackageRef]) {
        packages.sort_by(|a, b| {
            let oa = self.ordinals.get(&a.to_string()).copied().unwrap_or(0);
            let ob = self.ordinals.get(&b.to_string()).copied().unwrap_or(0);
            ob.cmp(&oa)
        });
    }

    /// Everything that directly or transitively depends on `spec`,
    /// including `spec` itself, in discovery order.
    pub fn dependents_of(&self, spec: &str) -> Vec<String> {
        let Some(&start) = self.index.get(spec) else {
            return Vec::new();
        };
        let mut visited = vec![false; self.graph.node_count()];
        let mut stack = vec![start];
        let mut retval = Vec::new();
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut visited[node.index()], true) {
                continue;
            }
            retval.push(self.graph[node].clone());
            for pred in self.graph.neighbors_directed(node, Direction::Incoming) {
                if !visited[pred.index()] {
                    stack.push(pred);
                }
            }
        }
        retval
    }

    /// Standard `digraph` rendering for visualization.
    pub fn to_graphviz(&self) -> String {
        let mut out = String::from("digraph dependencies {\n");
        for node in self.graph.node_indices() {
            out.push_str(&format!(
                "    {} [ label = \"{}\" ]\n",
                node.index(),
                self.graph[node]
            ));
        }
        for edge in self.graph.edge_references() {
            out.push_str(&format!(
                "    {} -> {}\n",
                edge.source().index(),
                edge.target().index()
            ));
        }
        out.push_str("}\n");
        out
    }
}

// Kahn's algorithm. A vertex whose last incoming edge disappears goes to
// the *front* of the worklist, giving a depth-first flavored (but still
// topological) order. High ordinals are deep dependencies.
fn kahn_ordinals(graph: &DiGraph<String, ()>) -> Result<HashMap<String, usize>> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut worklist: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();

    let mut ordinals = HashMap::new();
    let mut next_ordinal = 0;
    while let Some(node) = worklist.pop_front() {
        ordinals.insert(graph[node].clone(), next_ordinal);
        next_ordinal += 1;
        for succ in graph.neighbors_directed(node, Direction::Outgoing) {
            in_degree[succ.index()] -= 1;
            if in_degree[succ.index()] == 0 {
                worklist.push_front(succ);
            }
        }
    }

    if next_ordinal != graph.node_count() {
        let stuck: Vec<&str> = graph
            .node_indices()
            .filter(|n| !ordinals.contains_key(&graph[*n]))
            .map(|n| graph[n].as_str())
            .collect();
        return Err(SpockError::Conflict(format!(
            "dependency cycle among: {}",
            stuck.join(" ")
        )));
    }
    Ok(ordinals)
}
