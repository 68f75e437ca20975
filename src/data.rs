use std::collections::HashMap;

use self::osm::{BoundingBox, Node, OsmId, Way};

pub mod graph;
pub mod osm;

/// Map data as defined in the .osm file. Relations and unknown elements are discarded,
/// everything else is kept without any processing.
#[derive(Debug, Default, Clone)]
pub struct OsmMapData {
    /// First `<bounds>` declaration of the document, if any.
    pub bounds: Option<BoundingBox>,
    pub nodes: HashMap<OsmId, Node>,
    /// Ways in document order. Repeated ids are kept so consumers can decide which one wins.
    pub ways: Vec<Way>,
}
