//! Entrypoint for CLI
mod clock;
mod error;

use std::{env, error::Error, fs, time::Instant};

use chip8::prelude::*;
use log::{debug, error, info, LevelFilter};

use self::{clock::FramePacer, error::AppError};

static USAGE: &str = r#"
usage: chip8 run FILE [OPTIONS]

commands:
    run     Run the target ROM file headless, then print the display

options:
    --frames N            Number of 60Hz frames to run (default 600)
    --ticks-per-frame N   Instructions executed per frame (default 10)
    --seed N              Seed for the random number generator
    --conf FILE           YAML file with interpreter quirks
    --hold KEY            Hold down keypad key 0-F for the whole run
    --realtime            Pace frames at 60Hz instead of running flat out

examples:
    chip8 run breakout.rom
    chip8 run maze.rom --frames 60 --seed 7
    chip8 run pong.rom --conf vip.yaml --hold 1
"#;

const DEFAULT_FRAMES: u64 = 600;
const DEFAULT_TICKS_PER_FRAME: u64 = 10;

/// Beeper for a headless run, the beep is only logged.
struct LogBeeper;

impl Beeper for LogBeeper {
    fn play(&mut self) {
        info!("beep");
    }
}

fn run_bytecode(args: &RunArgs) -> Result<(), AppError> {
    info!("load rom: {}", args.filepath);
    let bytecode = fs::read(&args.filepath)?;

    let conf = match &args.conf {
        Some(path) => load_conf(path)?,
        None => Chip8Conf::default(),
    };
    debug!("{conf:?}");

    let rng = match args.seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_entropy(),
    };

    let mut vm = Chip8Vm::with_devices(conf, LogBeeper, rng);
    vm.load_bytecode(&bytecode)?;

    for key in &args.hold {
        vm.set_key(*key, true);
    }

    let mut beeps = 0;
    let start = Instant::now();
    let mut pacer = FramePacer::new(args.ticks_per_frame);

    for frame in 0..args.frames {
        for _ in 0..pacer.ticks_per_frame() {
            if vm.tick()? == Flow::KeyWait {
                // Nothing will change until the next frame delivers input.
                break;
            }
        }

        if vm.tick_timers() {
            beeps += 1;
        }

        if frame % 60 == 0 && vm.is_waiting_for_key() {
            debug!("frame {frame}: waiting for key press");
        }

        if args.realtime {
            if let Some(overrun) = pacer.wait() {
                debug!("frame {frame} overran by {overrun:?}");
            }
        }
    }

    let end = Instant::now();
    info!(
        "ran {} frames in {}ms, {} beeps",
        args.frames,
        end.duration_since(start).as_nanos() as f64 / 1000000.0,
        beeps
    );

    print!("{}", vm.dump_display()?);

    Ok(())
}

fn load_conf(filepath: &str) -> Result<Chip8Conf, AppError> {
    info!("load conf: {filepath}");
    let file_bytes = fs::read(filepath)?;
    Ok(serde_yaml::from_slice(&file_bytes)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    let result = parse_args(env::args().skip(1)).and_then(|cmd| match cmd {
        Cmd::Run(args) => run_bytecode(&args),
    });

    if let Err(err) = result {
        error!("{err}");
        if matches!(err.kind, error::ErrorKind::Usage(_)) {
            print_usage();
        }
        std::process::exit(err.exit_code());
    }

    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cmd, AppError> {
    match args.next().as_deref() {
        Some("run") => {
            let filepath = args
                .next()
                .ok_or_else(|| AppError::usage("missing ROM file"))?;
            let mut run = RunArgs::new(filepath);

            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--frames" => run.frames = parse_number(&flag, args.next())?,
                    "--ticks-per-frame" => run.ticks_per_frame = parse_number(&flag, args.next())?,
                    "--seed" => run.seed = Some(parse_number(&flag, args.next())?),
                    "--conf" => run.conf = Some(consume_arg(&flag, args.next())?),
                    "--hold" => run.hold.push(parse_key(&consume_arg(&flag, args.next())?)?),
                    "--realtime" => run.realtime = true,
                    _ => return Err(AppError::usage(format!("unknown option {flag}"))),
                }
            }

            Ok(Cmd::Run(run))
        }
        Some(cmd) => Err(AppError::usage(format!("unknown command {cmd}"))),
        None => Err(AppError::usage("missing command")),
    }
}

/// Consumes the value of an option, failing if it doesn't exist.
fn consume_arg(flag: &str, arg: Option<String>) -> Result<String, AppError> {
    arg.ok_or_else(|| AppError::usage(format!("{flag} expects a value")))
}

fn parse_number(flag: &str, arg: Option<String>) -> Result<u64, AppError> {
    let value = consume_arg(flag, arg)?;
    value
        .parse()
        .map_err(|_| AppError::usage(format!("{flag} expects a number, got {value}")))
}

/// Keys are named by their hexadecimal digit on the keypad.
fn parse_key(value: &str) -> Result<KeyCode, AppError> {
    let key_id = u8::from_str_radix(value, 16)
        .map_err(|_| AppError::usage(format!("invalid key {value}")))?;
    Ok(KeyCode::try_from(key_id)?)
}

fn print_usage() {
    println!("Chip8 v{}", env!("CARGO_PKG_VERSION"));
    println!("{USAGE}");
}

#[derive(Debug)]
enum Cmd {
    /// Run file
    Run(RunArgs),
}

#[derive(Debug)]
struct RunArgs {
    filepath: String,
    frames: u64,
    ticks_per_frame: u64,
    seed: Option<u64>,
    conf: Option<String>,
    hold: Vec<KeyCode>,
    realtime: bool,
}

impl RunArgs {
    fn new(filepath: String) -> Self {
        Self {
            filepath,
            frames: DEFAULT_FRAMES,
            ticks_per_frame: DEFAULT_TICKS_PER_FRAME,
            seed: None,
            conf: None,
            hold: vec![],
            realtime: false,
        }
    }
}
