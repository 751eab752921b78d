use std::collections::BTreeSet;

use crate::network::{Edge, Network, Node};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ViewFilter {
    #[default]
    All,
    ByYear(i32),
    ByMatchSet(BTreeSet<String>),
}

impl ViewFilter {
    fn keeps(&self, node: &Node) -> bool {
        match self {
            Self::All => true,
            Self::ByYear(year) => node.year() == *year,
            Self::ByMatchSet(ids) => ids.contains(&node.id),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => "All connections".to_owned(),
            Self::ByYear(year) => format!("Connected in {year}"),
            Self::ByMatchSet(ids) => format!("AI matches ({})", ids.len()),
        }
    }
}

/// Projection of the canonical set. The owner is always `nodes[0]` and every
/// other node has exactly one edge back to it.
#[derive(Clone, Debug)]
pub struct WorkingView {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl WorkingView {
    pub const OWNER_INDEX: usize = 0;

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    pub fn same_population(&self, other: &WorkingView) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(left, right)| left.id == right.id)
    }
}

/// Ids absent from the canonical set are ignored by construction: the
/// predicate is evaluated against canonical nodes only.
pub fn compute_working_view(network: &Network, filter: &ViewFilter) -> WorkingView {
    let mut nodes = Vec::with_capacity(network.nodes().len());
    nodes.push(network.owner().clone());
    nodes.extend(
        network
            .connections()
            .iter()
            .filter(|node| filter.keeps(node))
            .cloned(),
    );

    let edges = (1..nodes.len())
        .map(|target| Edge {
            source: WorkingView::OWNER_INDEX,
            target,
        })
        .collect();

    WorkingView { nodes, edges }
}
