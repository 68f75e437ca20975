use std::collections::HashMap;

/// OSM element id. Negative ids appear in files exported from editors before upload.
pub type OsmId = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: OsmId,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: OsmId,
    pub node_refs: Vec<OsmId>,
    pub tags: HashMap<String, String>,
}

impl Way {
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// True when the box has a strictly positive, finite extent on both axes.
    pub fn is_valid(&self) -> bool {
        let width = self.max_lon - self.min_lon;
        let height = self.max_lat - self.min_lat;
        width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0
    }
}
