use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::data::graph::AdjacencyGraph;
use crate::data::osm::OsmId;
use crate::errors::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Destination,
}

/// Outcome of a route query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResult {
    /// Node ids from source to destination, both included.
    Found(Vec<OsmId>),
    /// The endpoint is not a member of the road graph.
    InvalidNode { id: OsmId, endpoint: Endpoint },
    /// Both endpoints are on roads, but not on connected ones.
    Unreachable { src: OsmId, dest: OsmId },
}

impl RouteResult {
    pub fn nodes(&self) -> Option<&[OsmId]> {
        match self {
            RouteResult::Found(nodes) => Some(nodes.as_slice()),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Vec<OsmId>> {
        match self {
            RouteResult::Found(nodes) => Ok(nodes),
            RouteResult::InvalidNode { .. } => Err(Error::new(ErrorKind::InvalidNode, self.to_string())),
            RouteResult::Unreachable { .. } => Err(Error::new(ErrorKind::Unreachable, self.to_string())),
        }
    }
}

impl fmt::Display for RouteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteResult::Found(nodes) => write!(f, "route with {} nodes", nodes.len()),
            RouteResult::InvalidNode { id, endpoint: Endpoint::Source } => {
                write!(f, "invalid source node id {}", id)
            },
            RouteResult::InvalidNode { id, endpoint: Endpoint::Destination } => {
                write!(f, "invalid destination node id {}", id)
            },
            RouteResult::Unreachable { src, dest } => {
                write!(f, "no road connects node {} to node {}", src, dest)
            },
        }
    }
}

/// Breadth-first search for the route with the fewest road segments from `src` to `dest`.
///
/// Neighbours are visited in the graph's iteration order, so among several equally short
/// routes any one may be returned.
pub fn find_path(graph: &AdjacencyGraph, src: OsmId, dest: OsmId) -> RouteResult {
    if !graph.contains(dest) {
        return RouteResult::InvalidNode { id: dest, endpoint: Endpoint::Destination };
    }
    if !graph.contains(src) {
        return RouteResult::InvalidNode { id: src, endpoint: Endpoint::Source };
    }

    let mut seen = HashSet::from([src]);
    let mut queue = VecDeque::from([src]);
    let mut parents: HashMap<OsmId, Option<OsmId>> = HashMap::from([(src, None)]);

    while let Some(vertex) = queue.pop_front() {
        if vertex == dest {
            return RouteResult::Found(backtrace(dest, &parents));
        }
        for next in graph.neighbours(vertex) {
            if seen.insert(next) {
                parents.insert(next, Some(vertex));
                queue.push_back(next);
            }
        }
    }

    RouteResult::Unreachable { src, dest }
}

fn backtrace(dest: OsmId, parents: &HashMap<OsmId, Option<OsmId>>) -> Vec<OsmId> {
    let mut route = vec![dest];
    let mut current = dest;
    while let Some(&Some(parent)) = parents.get(&current) {
        route.push(parent);
        current = parent;
    }
    route.reverse();
    route
}
