pub mod data;
pub mod errors;
pub mod etl;
pub mod projection;
pub mod route;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde::Deserialize;

use crate::data::osm::OsmId;
use crate::errors::{Error, ErrorKind, Result};
use crate::etl::draw_map::{DrawMapEtl, Theme};
use crate::etl::parse_osm::ParseOsmEtl;
use crate::etl::road_graph::RoadGraphEtl;
use crate::etl::Etl;
use crate::route::{find_path, RouteResult};

pub const DEFAULT_MAP_PATH: &str = "map.osm";
pub const DEFAULT_OUTPUT_PATH: &str = "output.pgm";

/// Presentation settings. Every field may be omitted from the JSON file.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UserConfig {
    /// Width and height of the square output image, in pixels.
    pub canvas_size: u32,
    pub road_width: f32,
    pub route_width: f32,
    pub theme: Theme,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            canvas_size: 1000,
            road_width: 3.0,
            route_width: 3.0,
            theme: Theme::default(),
        }
    }
}

pub fn load_user_config(path: &Path) -> Result<UserConfig> {
    let file = File::open(path).map_err(|err| {
        Error::new(ErrorKind::Config, format!("Could not open config file {}: {}", path.display(), err))
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub struct RouteRequest {
    pub src: OsmId,
    pub dest: OsmId,
    pub map_path: PathBuf,
    pub output_path: PathBuf,
}

impl RouteRequest {
    pub fn new(src: OsmId, dest: OsmId) -> Self {
        RouteRequest {
            src,
            dest,
            map_path: PathBuf::from(DEFAULT_MAP_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub route: RouteResult,
    pub output_path: PathBuf,
}

/// Loads the map, finds the route and writes the image.
///
/// Fails when the map cannot be loaded, its bounds are unusable or the image cannot be written.
/// A route that cannot be found is not an error: the roads are still drawn and the outcome is
/// returned in the report.
pub fn run(user_config: &UserConfig, request: &RouteRequest) -> Result<RunReport> {
    let map_data = ParseOsmEtl::new(&request.map_path).process(())?;
    let graph = RoadGraphEtl::new().process(map_data)?;

    let route = find_path(&graph.adjacency, request.src, request.dest);
    match &route {
        RouteResult::Found(nodes) => {
            info!(src = request.src, dest = request.dest, hops = nodes.len() - 1; "Found route");
        },
        RouteResult::InvalidNode { id, endpoint } => {
            error!(node_id = *id, endpoint:? = endpoint; "Invalid node id entered, drawing roads only");
        },
        RouteResult::Unreachable { src, dest } => {
            error!(src = *src, dest = *dest; "No route between nodes, drawing roads only");
        },
    }

    DrawMapEtl::new(user_config, &request.output_path, route.nodes()).process(&graph)?;

    Ok(RunReport {
        route,
        output_path: request.output_path.clone(),
    })
}
