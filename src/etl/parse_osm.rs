use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::Path;
use std::str::{self, FromStr};

use log::{info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::data::osm::{BoundingBox, Node, OsmId, Way};
use crate::data::OsmMapData;
use crate::errors::{Error, ErrorKind, Result};
use crate::etl::Etl;

pub const ETL_NAME: &str = "parse_osm";

enum ParserState {
    Top,
    Node,
    Way(Way),
    /// Inside a way whose header could not be read; its children are dropped.
    SkippedWay,
    Relation,
}

pub struct ParseOsmEtl<'a> {
    map_path: &'a Path,
}

impl ParseOsmEtl<'_> {
    pub fn new(map_path: &Path) -> ParseOsmEtl {
        ParseOsmEtl {
            map_path
        }
    }

    fn create_osm_reader(&self) -> Result<Reader<Box<dyn BufRead>>> {
        let file = fs::File::open(self.map_path).map_err(|err| {
            Error::new(
                ErrorKind::MapLoad,
                format!("Could not open file: {} ({})", self.map_path.display(), err),
            )
        })?;
        let file_reader = BufReader::new(file);
        let is_xz = self.map_path.extension().map_or(false, |ext| ext == "xz");
        let buffered: Box<dyn BufRead> = if is_xz {
            Box::new(BufReader::new(XzDecoder::new(file_reader)))
        } else {
            Box::new(file_reader)
        };
        let mut reader = Reader::from_reader(buffered);
        reader.trim_text(true);

        Ok(reader)
    }
}

impl Etl for ParseOsmEtl<'_> {
    type Source = ();
    type Input = Reader<Box<dyn BufRead>>;
    type Output = OsmMapData;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, _source: ()) -> Result<Self::Input> {
        self.create_osm_reader()
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        read_osm(input).map_err(|err| {
            Error::new(
                ErrorKind::MapLoad,
                format!("Could not parse {}: {}", self.map_path.display(), err.message),
            )
        })
    }

    fn load(&mut self, output: &Self::Output) -> Result<()> {
        info!(
            etl_name = ETL_NAME,
            nodes = output.nodes.len(),
            ways = output.ways.len(),
            has_bounds = output.bounds.is_some();
            "Parsed map document"
        );
        Ok(())
    }
}

/// Parses an OSM XML document into typed records.
pub fn parse_osm<R: BufRead>(input: R) -> Result<OsmMapData> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);
    read_osm(reader)
}

fn read_osm<R: BufRead>(mut reader: Reader<R>) -> Result<OsmMapData> {
    let mut buf = Vec::new();
    let mut data = OsmMapData::default();
    let mut state = ParserState::Top;
    let mut depth: usize = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"node" => {
                        push_node(&mut data, &e);
                        state = ParserState::Node;
                    },
                    b"way" => {
                        state = match parse_way_header(&e) {
                            Some(way) => ParserState::Way(way),
                            None => ParserState::SkippedWay,
                        };
                    },
                    b"relation" => state = ParserState::Relation,
                    b"bounds" => set_bounds(&mut data, &e)?,
                    b"nd" | b"tag" => add_way_member(&mut state, &e)?,
                    _ => (),
                }
            },
            Event::Empty(e) => {
                match e.name().as_ref() {
                    b"node" => push_node(&mut data, &e),
                    b"way" => {
                        if let Some(way) = parse_way_header(&e) {
                            data.ways.push(way);
                        }
                    },
                    b"bounds" => set_bounds(&mut data, &e)?,
                    b"nd" | b"tag" => add_way_member(&mut state, &e)?,
                    _ => (),
                }
            },
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                match e.name().as_ref() {
                    b"way" => {
                        if let ParserState::Way(way) = mem::replace(&mut state, ParserState::Top) {
                            data.ways.push(way);
                        }
                    },
                    b"node" | b"relation" => state = ParserState::Top,
                    _ => (),
                }
            },
            // Declarations, whitespace, comments and the like carry nothing we need.
            _ => (),
        }
        // if we don't keep a borrow elsewhere, we can clear the buffer to keep memory usage low
        buf.clear();
    }

    if depth > 0 {
        return Err(Error::new(ErrorKind::MapLoad, "Document ended inside an element"));
    }
    Ok(data)
}

/// Adds an `nd` or `tag` child to the way being read. Elsewhere they are ignored.
fn add_way_member(state: &mut ParserState, el: &BytesStart) -> Result<()> {
    let ParserState::Way(way) = state else {
        return Ok(());
    };
    match el.name().as_ref() {
        b"nd" => {
            if let Some(node_ref) = parse_nd(el) {
                way.node_refs.push(node_ref);
            }
        },
        b"tag" => {
            if let Some((key, value)) = parse_tag(el)? {
                way.tags.insert(key, value);
            }
        },
        _ => (),
    }
    Ok(())
}

fn parse_value<T: FromStr>(value: &[u8]) -> Option<T> {
    str::from_utf8(value).ok()?.trim().parse().ok()
}

fn parse_f64(name: &str, value: &[u8]) -> Result<f64> {
    parse_value(value).ok_or_else(|| {
        Error::new(
            ErrorKind::MapLoad,
            format!("Invalid {} value {:?}", name, String::from_utf8_lossy(value)),
        )
    })
}

fn parse_node(el: &BytesStart) -> Option<Node> {
    let mut id: Option<OsmId> = None;
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attribute_res in el.attributes() {
        let attribute = attribute_res.ok()?;
        match attribute.key.as_ref() {
            b"id" => id = Some(parse_value(&attribute.value)?),
            b"lat" => lat = Some(parse_value(&attribute.value)?),
            b"lon" => lon = Some(parse_value(&attribute.value)?),
            _ => (),
        }
    }

    Some(Node {
        id: id?,
        lat: lat?,
        lon: lon?,
    })
}

fn push_node(data: &mut OsmMapData, el: &BytesStart) {
    match parse_node(el) {
        Some(node) => {
            data.nodes.insert(node.id, node);
        },
        None => warn!("Skipping node without a valid id, lat and lon"),
    }
}

fn parse_way_header(el: &BytesStart) -> Option<Way> {
    let id = el.attributes()
        .filter_map(|attribute_res| attribute_res.ok())
        .find(|attribute| matches!(attribute.key.as_ref(), b"id"))
        .and_then(|attribute| parse_value(&attribute.value));

    match id {
        Some(id) => Some(Way {
            id,
            node_refs: Vec::new(),
            tags: HashMap::new(),
        }),
        None => {
            warn!("Skipping way without a valid id");
            None
        },
    }
}

fn parse_nd(el: &BytesStart) -> Option<OsmId> {
    let node_ref = el.attributes()
        .filter_map(|attribute_res| attribute_res.ok())
        .find(|attribute| matches!(attribute.key.as_ref(), b"ref"))
        .and_then(|attribute| parse_value(&attribute.value));
    if node_ref.is_none() {
        warn!("Skipping way member without a valid ref");
    }
    node_ref
}

fn parse_tag(el: &BytesStart) -> Result<Option<(String, String)>> {
    let mut key: Option<String> = None;
    let mut value = String::new();

    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        match attribute.key.as_ref() {
            b"k" => key = Some(attribute.unescape_value()?.into_owned()),
            b"v" => value = attribute.unescape_value()?.into_owned(),
            _ => (),
        }
    }
    Ok(key.map(|key| (key, value)))
}

fn set_bounds(data: &mut OsmMapData, el: &BytesStart) -> Result<()> {
    if data.bounds.is_some() {
        return Ok(());
    }
    let mut min_lon: Option<f64> = None;
    let mut max_lon: Option<f64> = None;
    let mut min_lat: Option<f64> = None;
    let mut max_lat: Option<f64> = None;

    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        match attribute.key.as_ref() {
            b"minlon" => min_lon = Some(parse_f64("minlon", &attribute.value)?),
            b"maxlon" => max_lon = Some(parse_f64("maxlon", &attribute.value)?),
            b"minlat" => min_lat = Some(parse_f64("minlat", &attribute.value)?),
            b"maxlat" => max_lat = Some(parse_f64("maxlat", &attribute.value)?),
            _ => (),
        }
    }

    let missing = |name: &str| Error::new(ErrorKind::MapLoad, format!("bounds element lacks {}", name));
    data.bounds = Some(BoundingBox {
        min_lon: min_lon.ok_or_else(|| missing("minlon"))?,
        max_lon: max_lon.ok_or_else(|| missing("maxlon"))?,
        min_lat: min_lat.ok_or_else(|| missing("minlat"))?,
        max_lat: max_lat.ok_or_else(|| missing("maxlat"))?,
    });
    Ok(())
}
