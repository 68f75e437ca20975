use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use osm_route::errors::ErrorKind;
use osm_route::route::{Endpoint, RouteResult};
use osm_route::{run, RouteRequest, UserConfig};
use tempfile::TempDir;

const ROUTE_PIXEL: [u8; 4] = [50, 50, 50, 255];
const ROAD_PIXEL: [u8; 4] = [150, 150, 150, 255];
const BACKGROUND_PIXEL: [u8; 4] = [255, 255, 255, 255];

/// Nodes 1-2-3 form road 100 along lat 0.5; nodes 4-5 form road 101 along lat 0.25; node 6
/// only belongs to a footprint that is not a road.
const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="1" lat="0.5" lon="0.25"/>
  <node id="2" lat="0.5" lon="0.5"/>
  <node id="3" lat="0.5" lon="0.75"/>
  <node id="4" lat="0.25" lon="0.25"/>
  <node id="5" lat="0.25" lon="0.75"/>
  <node id="6" lat="0.8" lon="0.8"/>
  <way id="100">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="highway" v="primary"/>
  </way>
  <way id="101">
    <nd ref="4"/>
    <nd ref="5"/>
    <tag k="highway" v="service"/>
  </way>
  <way id="102">
    <nd ref="6"/>
    <nd ref="3"/>
    <tag k="building" v="yes"/>
  </way>
</osm>
"#;

struct Fixture {
    dir: TempDir,
    map_path: PathBuf,
}

impl Fixture {
    fn new(map: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let map_path = dir.path().join("map.osm");
        std::fs::write(&map_path, map).unwrap();
        Fixture { dir, map_path }
    }

    fn request(&self, src: i64, dest: i64, output: &str) -> RouteRequest {
        RouteRequest {
            src,
            dest,
            map_path: self.map_path.clone(),
            output_path: self.dir.path().join(output),
        }
    }
}

struct Png {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Png {
    fn read(path: &Path) -> Png {
        let decoder = png::Decoder::new(File::open(path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut data = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut data).unwrap();
        assert_eq!(info.color_type, png::ColorType::Rgba);
        Png {
            width: info.width,
            height: info.height,
            data,
        }
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = 4 * (y * self.width + x) as usize;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2], self.data[idx + 3]]
    }

    fn contains(&self, rgba: [u8; 4]) -> bool {
        self.data.chunks_exact(4).any(|pixel| close(pixel, &rgba))
    }
}

/// Channel-wise comparison allowing for anti-aliasing rounding.
fn close(actual: &[u8], expected: &[u8]) -> bool {
    actual.len() == expected.len()
        && actual.iter().zip(expected).all(|(a, e)| a.abs_diff(*e) <= 2)
}

fn assert_pixel(image: &Png, x: u32, y: u32, expected: [u8; 4]) {
    let actual = image.pixel(x, y);
    assert!(close(&actual, &expected), "pixel ({}, {}) is {:?}, expected {:?}", x, y, actual, expected);
}

#[test]
fn straight_road_route_is_highlighted() {
    let fixture = Fixture::new(MAP);
    let request = fixture.request(1, 3, "out.png");

    let report = run(&UserConfig::default(), &request).unwrap();

    assert_eq!(report.route, RouteResult::Found(vec![1, 2, 3]));
    let image = Png::read(&report.output_path);
    assert_eq!((image.width, image.height), (1000, 1000));
    assert_pixel(&image, 0, 0, BACKGROUND_PIXEL);
    // Road 100 runs along y = 499 from x = 249 to x = 749.
    assert_pixel(&image, 400, 499, ROUTE_PIXEL);
    // Road 101 is not on the route.
    assert_pixel(&image, 400, 249, ROAD_PIXEL);
}

#[test]
fn disjoint_roads_are_unreachable_but_image_is_saved() {
    let fixture = Fixture::new(MAP);
    let request = fixture.request(1, 5, "out.png");

    let report = run(&UserConfig::default(), &request).unwrap();

    assert_eq!(report.route, RouteResult::Unreachable { src: 1, dest: 5 });
    assert_eq!(report.route.clone().into_result().unwrap_err().kind, ErrorKind::Unreachable);
    let image = Png::read(&report.output_path);
    assert_pixel(&image, 400, 499, ROAD_PIXEL);
    assert_pixel(&image, 400, 249, ROAD_PIXEL);
    assert!(!image.contains(ROUTE_PIXEL));
}

#[test]
fn same_source_and_destination_draws_no_line() {
    let fixture = Fixture::new(MAP);
    let request = fixture.request(2, 2, "out.png");

    let report = run(&UserConfig::default(), &request).unwrap();

    assert_eq!(report.route, RouteResult::Found(vec![2]));
    let image = Png::read(&report.output_path);
    assert_pixel(&image, 400, 499, ROAD_PIXEL);
    assert!(!image.contains(ROUTE_PIXEL));
}

#[test]
fn destination_off_the_road_network_is_invalid() {
    let fixture = Fixture::new(MAP);
    let request = fixture.request(1, 6, "out.png");

    let report = run(&UserConfig::default(), &request).unwrap();

    assert_eq!(report.route, RouteResult::InvalidNode { id: 6, endpoint: Endpoint::Destination });
    let image = Png::read(&report.output_path);
    assert_pixel(&image, 400, 499, ROAD_PIXEL);
    assert!(!image.contains(ROUTE_PIXEL));
}

#[test]
fn unknown_source_is_invalid() {
    let fixture = Fixture::new(MAP);
    let request = fixture.request(999, 3, "out.png");

    let report = run(&UserConfig::default(), &request).unwrap();

    assert_eq!(report.route, RouteResult::InvalidNode { id: 999, endpoint: Endpoint::Source });
    assert!(report.output_path.exists());
}

#[test]
fn missing_map_aborts_without_image() {
    let fixture = Fixture::new(MAP);
    let mut request = fixture.request(1, 3, "out.png");
    request.map_path = fixture.dir.path().join("missing.osm");

    let err = run(&UserConfig::default(), &request).unwrap_err();

    assert_eq!(err.kind, ErrorKind::MapLoad);
    assert!(!request.output_path.exists());
}

#[test]
fn degenerate_bounds_abort_without_image() {
    let map = MAP.replace(r#"maxlon="1""#, r#"maxlon="0""#);
    let fixture = Fixture::new(&map);
    let request = fixture.request(1, 3, "out.png");

    let err = run(&UserConfig::default(), &request).unwrap_err();

    assert_eq!(err.kind, ErrorKind::MalformedBounds);
    assert!(!request.output_path.exists());
}

#[test]
fn xz_compressed_map_and_pgm_output() {
    let fixture = Fixture::new(MAP);
    let xz_path = fixture.dir.path().join("map.osm.xz");
    let mut encoder = xz::write::XzEncoder::new(File::create(&xz_path).unwrap(), 6);
    encoder.write_all(MAP.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let mut request = fixture.request(1, 3, "out.pgm");
    request.map_path = xz_path;
    let config = UserConfig {
        canvas_size: 101,
        ..UserConfig::default()
    };

    let report = run(&config, &request).unwrap();

    assert_eq!(report.route, RouteResult::Found(vec![1, 2, 3]));
    let bytes = std::fs::read(&report.output_path).unwrap();
    let header = b"P5\n101 101\n255\n";
    assert_eq!(&bytes[..header.len()], header);
    let pixels = &bytes[header.len()..];
    // Road 100 runs along y = 50 from x = 25 to x = 75.
    assert!(pixels[50 * 101 + 40].abs_diff(50) <= 2);
    assert!(pixels[25 * 101 + 40].abs_diff(150) <= 2);
    assert_eq!(pixels[0], 255);
}
