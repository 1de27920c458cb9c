//! CLI front-end: wires the decoder, the frame-source chain, and the
//! stabiliser together and drains the pipeline to completion.
//!
//! Grounded on `xrnd-co-il-GyroFlowLive/src/util.rs::init_logging`
//! (`simplelog::TermLogger` setup) and `spec.md` §6's CLI surface
//! description (one positional input path, exit codes `0`/`1`/`2`). Every
//! other tuning knob is a flag over `StabilizerConfig`'s fields rather
//! than a config file format, since `spec.md` specifies none.

use std::time::Instant;

use argh::FromArgs;
use log::LevelFilter;
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};

use fisheye_stabilize::camera::{CameraPreset, OutputCameraParams};
use fisheye_stabilize::decode::ffmpeg::FfmpegDecoder;
use fisheye_stabilize::error::PipelineError;
use fisheye_stabilize::pipeline::stabilizer::StabilizerConfig;
use fisheye_stabilize::pipeline::{Cached, ColorplaneSource, DecodedFrameSource, FrameSource, ProfilingSource, StabilizerSource, SurfaceMapSource};

#[derive(FromArgs)]
/// Stabilise fisheye action-camera footage by reprojecting each frame
/// onto a smoothed rectilinear virtual camera.
struct Args {
    /// input video path
    #[argh(positional)]
    input: String,

    /// look-ahead smoothing radius, in frames
    #[argh(option, default = "15")]
    radius: usize,

    /// output zoom factor (>1.0 crops in, <1.0 widens the field of view)
    #[argh(option, default = "1.0")]
    zoom: f64,

    /// crop the output field of view to the undistorted edge midpoints
    /// instead of the full corner-inclusive bounding box
    #[argh(switch)]
    crop_to_midpoints: bool,

    /// output resolution as a multiple of the input's pixel diagonal
    #[argh(option, default = "1.0")]
    scale: f64,

    /// increase log verbosity (repeatable)
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let _ = TermLogger::init(level, LogConfig::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

fn run(args: &Args) -> Result<u64, PipelineError> {
    let decoder = FfmpegDecoder::open(&args.input)?;
    let decoded = Cached::new(DecodedFrameSource::new(decoder));
    let surface_mapped = Cached::new(SurfaceMapSource::new(decoded)?);
    let colorplaned = Cached::new(ColorplaneSource::new(surface_mapped)?);

    let config = StabilizerConfig {
        preset: CameraPreset::GoProHero4BlackWide169Measured,
        radius: args.radius,
        poly_order: 2,
        output_params: OutputCameraParams { scale: args.scale, zoom: args.zoom, crop_to_midpoints: args.crop_to_midpoints },
    };
    let stabilized = Cached::new(StabilizerSource::new(colorplaned, config)?);
    let mut pipeline = ProfilingSource::new("stabilizer", stabilized);

    let start = Instant::now();
    let mut frame_count = 0u64;
    loop {
        match pipeline.pull()? {
            fisheye_stabilize::PullResult::Frame(_frame) => {
                frame_count += 1;
                log::trace!("emitted frame {frame_count}");
            }
            fisheye_stabilize::PullResult::EndOfStream => break,
        }
    }
    pipeline.report(start.elapsed());
    Ok(frame_count)
}

fn main() {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    match run(&args) {
        Ok(frame_count) => {
            log::info!("stabilised {frame_count} frames from {}", args.input);
            std::process::exit(0);
        }
        Err(PipelineError::Config(detail)) => {
            log::error!("config: {detail}");
            std::process::exit(2);
        }
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    }
}
