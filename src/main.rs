//! `flowfield3d [PARTICLES] [--headless FRAMES]`

use std::process::ExitCode;

use flowfield3d::SimConfig;

const USAGE: &str = "usage: flowfield3d [PARTICLES] [--headless FRAMES]";

#[derive(Debug, PartialEq)]
struct Args {
    particles: Option<u32>,
    headless: Option<u64>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        particles: None,
        headless: None,
    };
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => {
                let frames = args.next().ok_or("--headless needs a frame count")?;
                parsed.headless = Some(
                    frames
                        .parse()
                        .map_err(|_| format!("invalid frame count '{}'", frames))?,
                );
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if parsed.particles.is_none() => {
                parsed.particles = Some(
                    arg.parse()
                        .map_err(|_| format!("invalid particle count '{}'", arg))?,
                );
            }
            _ => return Err(format!("unexpected argument '{}'", arg)),
        }
    }

    Ok(parsed)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    let mut config = SimConfig::new();
    if let Some(count) = args.particles {
        config = config.with_particle_count(count);
    }

    let result = match args.headless {
        Some(frames) => flowfield3d::run_headless(&config, frames)
            .map(|report| {
                log::info!(
                    "{} frames, {} particles, mean speed {:.5}",
                    report.frames,
                    report.particles,
                    report.mean_speed
                );
            })
            .map_err(flowfield3d::SimulationError::from),
        None => flowfield3d::run(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
