use crate::data::graph::GeoPoint;
use crate::data::osm::BoundingBox;
use crate::errors::{Error, ErrorKind, Result};

/// Smallest canvas with at least one drawable pixel.
pub const MIN_CANVAS_SIZE: i32 = 3;

/// Maps `point` linearly onto a `canvas_size` x `canvas_size` pixel grid spanning `bounds`.
///
/// Pixels on the border or outside the canvas yield `None`: a point is only drawn when both
/// coordinates fall strictly between `0` and `canvas_size - 1`. Points are dropped, never
/// clamped.
///
/// Canvases smaller than [`MIN_CANVAS_SIZE`] have no drawable pixel and yield `None` throughout.
///
/// Panics if `bounds` has no extent on either axis.
pub fn project(point: GeoPoint, bounds: &BoundingBox, canvas_size: i32) -> Option<(i32, i32)> {
    assert!(bounds.is_valid(), "Illegal state: degenerate bounds {:?}", bounds);

    let scale = f64::from(canvas_size.saturating_sub(1));
    let px = (scale * (point.lon - bounds.min_lon) / (bounds.max_lon - bounds.min_lon)).floor();
    let py = (scale * (point.lat - bounds.min_lat) / (bounds.max_lat - bounds.min_lat)).floor();

    if 0.0 < px && px < scale && 0.0 < py && py < scale {
        Some((px as i32, py as i32))
    } else {
        None
    }
}

/// Projector bound to one map, with its bounds checked up front.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    bounds: BoundingBox,
    canvas_size: i32,
}

impl Projector {
    pub fn new(bounds: Option<BoundingBox>, canvas_size: u32) -> Result<Projector> {
        let bounds = bounds.ok_or_else(|| {
            Error::new(ErrorKind::MalformedBounds, "Map has no bounds element")
        })?;
        if !bounds.is_valid() {
            return Err(Error::new(
                ErrorKind::MalformedBounds,
                format!(
                    "Degenerate bounds: lon {}..{}, lat {}..{}",
                    bounds.min_lon, bounds.max_lon, bounds.min_lat, bounds.max_lat
                ),
            ));
        }
        let canvas_size = i32::try_from(canvas_size)
            .ok()
            .filter(|size| *size >= MIN_CANVAS_SIZE)
            .ok_or_else(|| Error::new(ErrorKind::Config, format!("Unsupported canvas size {}", canvas_size)))?;
        Ok(Projector {
            bounds,
            canvas_size,
        })
    }

    pub fn project(&self, point: GeoPoint) -> Option<(i32, i32)> {
        project(point, &self.bounds, self.canvas_size)
    }

    pub fn canvas_size(&self) -> i32 {
        self.canvas_size
    }
}
