use std::env;
use std::fs::File;
use std::io::{
    self,
    BufReader
};
use std::process::ExitCode;

use log::{
    error,
    info
};

use segstitch::configuration::Configuration;
use segstitch::segment::segment::Segment;
use segstitch::stitching::stitcher::Stitcher;
use segstitch::stitching::stitcherror::StitchError;

fn run(segments_path: String, configuration_path: Option<String>) -> Result<(), StitchError> {
    let configuration = match configuration_path {
        Some(path) => Configuration::from_reader(path)?,
        None => Configuration::new(),
    };
    let reader = BufReader::new(File::open(&segments_path)?);
    let segments: Vec<Segment> = serde_json::from_reader(reader)?;
    info!("read {} segments from {}", segments.len(), segments_path);

    let mut stitcher = Stitcher::new(configuration)?;
    for insertion in stitcher.add_segments(segments)? {
        for superseded in insertion.superseded() {
            info!("segment {} superseded at position {}", superseded.id, superseded.position);
        }
    }
    serde_json::to_writer_pretty(io::stdout().lock(), &stitcher.report())?;
    println!();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(segments_path) = args.next() else {
        eprintln!("usage: segstitch <segments.json> [configuration.json]");
        return ExitCode::from(2);
    };
    match run(segments_path, args.next()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
