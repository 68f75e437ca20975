use std::collections::{hash_map, HashMap, HashSet};

use super::osm::{BoundingBox, Node, OsmId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl From<&Node> for GeoPoint {
    fn from(value: &Node) -> Self {
        GeoPoint {
            lon: value.lon,
            lat: value.lat,
        }
    }
}

/// One way tagged as a road, with the node ids it passes through in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Road {
    pub id: OsmId,
    pub nodes: Vec<OsmId>,
}

/// Undirected graph of road connectivity. Every edge is stored in both directions.
#[derive(Debug, Default, Clone)]
pub struct AdjacencyGraph {
    edges: HashMap<OsmId, HashSet<OsmId>>,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers both ends as graph members and links them. Repeated edges are idempotent and
    /// `a == b` only registers the node.
    pub fn add_edge(&mut self, a: OsmId, b: OsmId) {
        self.edges.entry(a).or_default();
        self.edges.entry(b).or_default();
        if a == b {
            return;
        }
        if let Some(neighbours) = self.edges.get_mut(&a) {
            neighbours.insert(b);
        }
        if let Some(neighbours) = self.edges.get_mut(&b) {
            neighbours.insert(a);
        }
    }

    pub fn contains(&self, id: OsmId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn has_edge(&self, a: OsmId, b: OsmId) -> bool {
        self.edges.get(&a).map_or(false, |neighbours| neighbours.contains(&b))
    }

    /// Neighbours of `id` in unspecified order. Unknown ids have none.
    pub fn neighbours(&self, id: OsmId) -> impl Iterator<Item = OsmId> + '_ {
        self.edges.get(&id).into_iter().flatten().copied()
    }

    pub fn node_ids(&self) -> hash_map::Keys<'_, OsmId, HashSet<OsmId>> {
        self.edges.keys()
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|neighbours| neighbours.len()).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Everything the router and the renderer need from one map, built once per run.
#[derive(Debug, Default, Clone)]
pub struct MapGraph {
    pub bounds: Option<BoundingBox>,
    pub roads: Vec<Road>,
    pub adjacency: AdjacencyGraph,
    /// Coordinates of the nodes that are members of `adjacency`. Nodes on no road segment are
    /// not kept.
    pub nodes: HashMap<OsmId, GeoPoint>,
}
