use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use raqote::{DrawOptions, DrawTarget, LineCap, LineJoin, PathBuilder, SolidSource, Source, StrokeStyle};
use serde::Deserialize;

use crate::{
    data::{graph::MapGraph, osm::OsmId},
    errors::{Error, ErrorKind, Result},
    projection::Projector,
    UserConfig,
};

use super::Etl;

pub const ETL_NAME: &str = "draw_map";

use serialize_color::deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Theme {
    #[serde(deserialize_with = "deserialize")]
    pub background_color: SolidSource,

    #[serde(deserialize_with = "deserialize")]
    pub road_color: SolidSource,

    #[serde(deserialize_with = "deserialize")]
    pub route_color: SolidSource,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background_color: SolidSource::from_unpremultiplied_argb(0xff, 0xff, 0xff, 0xff),
            road_color: SolidSource::from_unpremultiplied_argb(0xff, 150, 150, 150),
            route_color: SolidSource::from_unpremultiplied_argb(0xff, 50, 50, 50),
        }
    }
}

mod serialize_color {
    use raqote::SolidSource;
    use serde::{de, Deserializer};
    use serde::de::Visitor;


    struct ColorVisitor;

    impl<'de> Visitor<'de> for ColorVisitor {
        type Value = SolidSource;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(formatter, "a colour string like '#rrggbb' or '#rrggbbaa'")
        }

        fn visit_str<E>(self, string: &str) -> Result<Self::Value, E> where E: de::Error {
            if !string.is_ascii() || !string.starts_with('#') || (string.len() != 7 && string.len() != 9) {
                return Err(de::Error::invalid_value(de::Unexpected::Str(string), &self))
            }
            let r = parse_hex_byte(&self, &string[1..3])?;
            let g = parse_hex_byte(&self, &string[3..5])?;
            let b = parse_hex_byte(&self, &string[5..7])?;
            let a = if string.len() == 9 {
                parse_hex_byte(&self, &string[7..9])?
            } else {
                0xff
            };
            Ok(SolidSource::from_unpremultiplied_argb(a, r, g, b))
        }
    }

    fn parse_hex_byte<E>(visitor: &ColorVisitor, string: &str) -> Result<u8, E> where E: de::Error {
        u8::from_str_radix(string, 16).map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(string), visitor)
        })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SolidSource, D::Error>
        where D: Deserializer<'de> {
        deserializer.deserialize_str(ColorVisitor)
    }
}

/// Anything polylines can be drawn on, in pixel coordinates.
pub trait Canvas {
    /// Draws connected segments through `points`. Fewer than two points draw nothing.
    fn draw_polyline(&mut self, points: &[(i32, i32)], color: &SolidSource, width: f32);
}

fn stroke(width: f32) -> StrokeStyle {
    StrokeStyle {
        cap: LineCap::Round,
        join: LineJoin::Round,
        width,
        miter_limit: 2.0,
        dash_array: Vec::new(),
        dash_offset: 0.0,
    }
}

impl Canvas for DrawTarget {
    fn draw_polyline(&mut self, points: &[(i32, i32)], color: &SolidSource, width: f32) {
        if points.len() < 2 {
            return;
        }
        let mut pb = PathBuilder::new();
        let (x0, y0) = points[0];
        pb.move_to(x0 as f32, y0 as f32);

        for &(x, y) in &points[1..] {
            pb.line_to(x as f32, y as f32);
        }
        let raquote_path = pb.finish();

        self.stroke(
            &raquote_path,
            &Source::Solid(color.clone()),
            &stroke(width),
            &DrawOptions::new(),
        );
    }
}

/// Draws the node sequence `path` as one polyline. Nodes without coordinates or outside the
/// drawable area are left out, which may join or break the line where the map leaves the view.
pub fn render_path<C: Canvas>(
    canvas: &mut C,
    path: &[OsmId],
    graph: &MapGraph,
    projector: &Projector,
    color: &SolidSource,
    width: f32,
) {
    let points: Vec<(i32, i32)> = path.iter()
        .filter_map(|id| graph.nodes.get(id))
        .filter_map(|point| projector.project(*point))
        .collect();
    canvas.draw_polyline(&points, color, width);
}

pub fn render_roads<C: Canvas>(canvas: &mut C, graph: &MapGraph, projector: &Projector, user_config: &UserConfig) {
    for road in &graph.roads {
        render_path(canvas, &road.nodes, graph, projector, &user_config.theme.road_color, user_config.road_width);
    }
}

pub fn render_route<C: Canvas>(
    canvas: &mut C,
    route: &[OsmId],
    graph: &MapGraph,
    projector: &Projector,
    user_config: &UserConfig,
) {
    render_path(canvas, route, graph, projector, &user_config.theme.route_color, user_config.route_width);
}

/// Grey level of a premultiplied ARGB pixel, after undoing the alpha premultiplication.
/// Fully transparent pixels carry no colour and come out white.
fn luma(pixel: u32) -> u8 {
    let a = pixel >> 24;
    if a == 0 {
        return 0xff;
    }
    let unpremultiply = |channel: u32| ((channel * 0xff + a / 2) / a).min(0xff);
    let r = unpremultiply((pixel >> 16) & 0xff);
    let g = unpremultiply((pixel >> 8) & 0xff);
    let b = unpremultiply(pixel & 0xff);
    ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8
}

/// Writes `dt` as a binary greyscale PGM.
pub fn write_pgm(dt: &DrawTarget, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P5\n{} {}\n255\n", dt.width(), dt.height())?;
    let grey: Vec<u8> = dt.get_data().iter().map(|&pixel| luma(pixel)).collect();
    out.write_all(&grey)?;
    out.flush()?;
    Ok(())
}

pub struct Scene<'a> {
    pub graph: &'a MapGraph,
    pub projector: Projector,
}

pub struct DrawMapEtl<'a> {
    user_config: &'a UserConfig,
    output_path: &'a Path,
    route: Option<&'a [OsmId]>,
}

impl<'a> DrawMapEtl<'a> {
    /// `route`, when present, is drawn over the roads in the route colour.
    pub fn new(user_config: &'a UserConfig, output_path: &'a Path, route: Option<&'a [OsmId]>) -> DrawMapEtl<'a> {
        DrawMapEtl {
            user_config,
            output_path,
            route,
        }
    }

    fn is_pgm(&self) -> bool {
        self.output_path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("pgm"))
    }
}

impl<'a> Etl for DrawMapEtl<'a> {
    type Source = &'a MapGraph;
    type Input = Scene<'a>;
    type Output = DrawTarget;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, source: &'a MapGraph) -> Result<Self::Input> {
        Ok(Scene {
            graph: source,
            projector: Projector::new(source.bounds, self.user_config.canvas_size)?,
        })
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let size = input.projector.canvas_size();
        let mut dt = DrawTarget::new(size, size);

        dt.clear(self.user_config.theme.background_color.clone());

        render_roads(&mut dt, input.graph, &input.projector, self.user_config);
        if let Some(route) = self.route {
            render_route(&mut dt, route, input.graph, &input.projector, self.user_config);
        }
        Ok(dt)
    }

    fn load(&mut self, output: &Self::Output) -> Result<()> {
        if self.is_pgm() {
            write_pgm(output, self.output_path)?;
        } else {
            output.write_png(self.output_path).map_err(|err| {
                Error::new(ErrorKind::Io, format!("Couldn't write png: {}", err))
            })?;
        }
        info!(etl_name = ETL_NAME, path:? = self.output_path; "Wrote map image");
        Ok(())
    }
}
