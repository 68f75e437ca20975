use std::collections::{HashMap, HashSet};

use log::{info, warn};

use crate::data::graph::{AdjacencyGraph, GeoPoint, MapGraph, Road};
use crate::data::osm::OsmId;
use crate::data::OsmMapData;
use crate::errors::Result;

use super::Etl;

pub const ETL_NAME: &str = "road_graph";

/// Any way carrying this tag is a road, whatever its value.
pub const ROAD_TAG: &str = "highway";

pub struct RoadGraphEtl {
}

impl RoadGraphEtl {
    pub fn new() -> RoadGraphEtl {
        RoadGraphEtl {}
    }
}

impl Default for RoadGraphEtl {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the road network of `map`.
///
/// Only the first road way with a given id counts, even when it has no nodes. Edges are added per way as its nodes are
/// walked. Coordinates are kept for graph members only.
pub fn build_road_graph(map: &OsmMapData) -> MapGraph {
    let mut road_ids: HashSet<OsmId> = HashSet::new();
    let mut roads: Vec<Road> = Vec::new();
    let mut adjacency = AdjacencyGraph::new();

    for way in &map.ways {
        if !way.has_tag(ROAD_TAG) || !road_ids.insert(way.id) {
            continue;
        }
        // Claims the id, but a road needs at least one node.
        if way.node_refs.is_empty() {
            continue;
        }
        for pair in way.node_refs.windows(2) {
            adjacency.add_edge(pair[0], pair[1]);
        }
        roads.push(Road {
            id: way.id,
            nodes: way.node_refs.clone(),
        });
    }

    let nodes: HashMap<OsmId, GeoPoint> = adjacency.node_ids()
        .filter_map(|id| map.nodes.get(id).map(|node| (*id, GeoPoint::from(node))))
        .collect();

    let unresolved = adjacency.node_count() - nodes.len();
    if unresolved > 0 {
        warn!(etl_name = ETL_NAME, unresolved = unresolved; "Road nodes missing from the document");
    }

    MapGraph {
        bounds: map.bounds,
        roads,
        adjacency,
        nodes,
    }
}

impl Etl for RoadGraphEtl {
    type Source = OsmMapData;
    type Input = OsmMapData;
    type Output = MapGraph;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, source: OsmMapData) -> Result<Self::Input> {
        Ok(source)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        Ok(build_road_graph(&input))
    }

    fn load(&mut self, output: &Self::Output) -> Result<()> {
        if output.roads.is_empty() {
            warn!(etl_name = ETL_NAME; "Map contains no roads");
        }
        info!(
            etl_name = ETL_NAME,
            roads = output.roads.len(),
            graph_nodes = output.adjacency.node_count(),
            graph_edges = output.adjacency.edge_count();
            "Built road graph"
        );
        Ok(())
    }
}
