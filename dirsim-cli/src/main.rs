mod command;

use std::fs::File;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use dirsim_core::config::Config;
use dirsim_core::{ControlCommand, TempoController, UdpSink};

use command::{parse_line, Input, USAGE};

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dirsim")
        .join("dirsim.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/dirsim.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("dirsim: cannot create log file: {}", e);
            return;
        }
    };

    if WriteLogger::init(log_level, simplelog::Config::default(), log_file).is_err() {
        eprintln!("dirsim: logger already initialized");
        return;
    }

    log::info!("dirsim starting (log level: {:?})", log_level);
}

struct Args {
    verbose: bool,
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    midi_port: Option<usize>,
}

fn flag_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a String> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
}

fn parse_args() -> io::Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let invalid = |what: &str, value: &str| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("invalid {} '{}'", what, value))
    };

    let port = match flag_value(&args, &["--port", "-p"]) {
        Some(v) => Some(v.parse().map_err(|_| invalid("port", v))?),
        None => None,
    };
    let midi_port = match flag_value(&args, &["--midi-port"]) {
        Some(v) => Some(v.parse().map_err(|_| invalid("MIDI port", v))?),
        None => None,
    };

    Ok(Args {
        verbose: args.iter().any(|a| a == "--verbose" || a == "-v"),
        config: flag_value(&args, &["--config", "-c"]).map(PathBuf::from),
        host: flag_value(&args, &["--host"]).cloned(),
        port,
        midi_port,
    })
}

fn main() -> io::Result<()> {
    let args = parse_args()?;
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => Config::load_from(path).map_err(io::Error::other)?,
        None => Config::load(),
    };

    let (default_host, default_port) = config.osc_target();
    let host = args.host.clone().unwrap_or(default_host);
    let port = args.port.unwrap_or(default_port);
    let sink = UdpSink::connect(&host, port).map_err(io::Error::other)?;
    log::info!("sending OSC to {}", sink.target());

    let settings = config.controller_settings();
    let poll_interval = settings.dispatch.poll_interval;
    let mut controller = TempoController::new(settings, Arc::new(sink))?;

    #[cfg(feature = "midi")]
    let _midi = match args.midi_port {
        Some(index) => match dirsim_core::midi::MidiBridge::connect(index, controller.producer()) {
            Ok(bridge) => {
                eprintln!("dirsim: forwarding MIDI from {}", bridge.port_name());
                Some(bridge)
            }
            Err(e) => {
                eprintln!("dirsim: {}", e);
                log::warn!("MIDI disabled: {}", e);
                None
            }
        },
        None => None,
    };
    #[cfg(not(feature = "midi"))]
    if args.midi_port.is_some() {
        eprintln!("dirsim: built without MIDI support, ignoring --midi-port");
    }

    let (input_tx, input_rx) = crossbeam_channel::unbounded();
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || read_stdin(input_tx, command_tx))?;

    eprintln!("dirsim -> {}:{}  ({})", host, port, USAGE);
    let started = Instant::now();
    run(&mut controller, &input_rx, &command_rx, started, poll_interval);

    controller.shutdown();
    log::info!(
        "dirsim stopped ({} sent, {} failed)",
        controller.queue().sent_count(),
        controller.queue().failed_count()
    );
    Ok(())
}

/// Parse stdin on its own thread. Control commands travel on their own
/// channel so other producers could share it.
fn read_stdin(inputs: Sender<Input>, commands: Sender<ControlCommand>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("stdin: {}", e);
                break;
            }
        };
        match parse_line(&line) {
            Ok(Some(Input::Control(command))) => {
                if commands.send(command).is_err() {
                    return;
                }
            }
            Ok(Some(input)) => {
                let quit = input == Input::Quit;
                if inputs.send(input).is_err() || quit {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("dirsim: {}", e),
        }
    }
    let _ = inputs.send(Input::Quit);
}

fn run(
    controller: &mut TempoController,
    inputs: &Receiver<Input>,
    commands: &Receiver<ControlCommand>,
    started: Instant,
    poll_interval: std::time::Duration,
) {
    loop {
        let received = inputs.recv_timeout(poll_interval);
        // Commands read before this input are already queued
        controller.apply_pending(commands);
        let now = started.elapsed().as_secs_f64();

        match received {
            Ok(Input::Position(position)) => {
                let bpm = controller.observe_position(position, now);
                println!("{:.1} BPM", bpm);
            }
            Ok(Input::Touch(zone)) => {
                let accepted = controller.observe_touch(zone, now);
                match controller.next_expected() {
                    Some(next) if accepted => {
                        println!("{:.1} BPM, next {}", controller.current_bpm(), next)
                    }
                    Some(next) => println!("ignored {}, expecting {}", zone, next),
                    None => println!("ignored {} in {} mode", zone, controller.mode()),
                }
            }
            Ok(Input::Fingers(reading)) => {
                controller.observe_sliders(reading, now);
                let (primary, secondary) = controller.slider_values();
                println!("volume {:.2} / {:.2}", primary, secondary);
            }
            Ok(Input::Control(command)) => {
                if let Err(e) = controller.apply_command(command) {
                    eprintln!("dirsim: {}", e);
                }
            }
            Ok(Input::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => controller.tick(now),
        }
    }
}
