use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_route::data::osm::OsmId;
use osm_route::errors::Result;
use osm_route::{load_user_config, run, RouteRequest, UserConfig, DEFAULT_MAP_PATH, DEFAULT_OUTPUT_PATH};

/// Draws the road network of an OSM extract and highlights the route with the fewest road
/// segments between two nodes.
#[derive(Parser)]
#[command(name = "osm_route")]
#[command(version)]
#[command(about, long_about = None)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Id of the node the route starts at
    src: OsmId,

    /// Id of the node the route ends at
    dest: OsmId,

    /// OSM XML file, optionally xz-compressed
    #[arg(default_value = DEFAULT_MAP_PATH)]
    map: PathBuf,

    /// Output image; a .pgm extension writes greyscale PGM, anything else PNG
    #[arg(default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// JSON file with canvas size, line widths and colours
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn execute(cli: Cli) -> Result<bool> {
    let user_config = match &cli.config {
        Some(path) => load_user_config(path)?,
        None => UserConfig::default(),
    };
    let request = RouteRequest {
        src: cli.src,
        dest: cli.dest,
        map_path: cli.map,
        output_path: cli.output,
    };
    let report = run(&user_config, &request)?;
    if let Err(err) = report.route.into_result() {
        eprintln!("{}", err.message);
        return Ok(false);
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            error!(kind:? = err.kind, err = err.message.as_str(); "Run failed");
            eprintln!("{}", err);
            ExitCode::FAILURE
        },
    }
}
