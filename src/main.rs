mod config;
mod coordinator;
mod ephemeris;
mod link;
mod tracker;

use std::io::BufRead;
use std::process::ExitCode;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::coordinator::{Coordinator, Event, Presenter, UserCommand, ViewState};
use crate::ephemeris::{Body, EphemerisSource, SpkAdapter};
use crate::link::{LinkSession, RunState};
use crate::tracker::Tracker;

#[derive(Parser)]
#[command(name = "moontrack")]
#[command(about = "Antenna mount control for tracking solar system bodies")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current apparent position of a body
    Observe { target: String },
    /// Print horizon crossings over the next 24 hours
    RiseSet { target: String },
    /// Run the tracking loop with the console shell
    Run {
        /// Serial port to connect to at startup
        #[arg(long)]
        port: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Without the kernels there is nothing to track.
    let adapter = match SpkAdapter::load(&config.ephemeris.spk, &config.ephemeris.pck) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error loading ephemeris: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Observe { target } => observe(&config, &adapter, &target),
        Commands::RiseSet { target } => rise_set(&config, &adapter, &target),
        Commands::Run { port } => run(&config, adapter, port),
    }
}

fn observe(config: &Config, adapter: &SpkAdapter, target: &str) -> ExitCode {
    let body = match Body::resolve(target) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match adapter.observe(body, &config.site, Utc::now()) {
        Ok(sample) => {
            println!("{} @ {}", body, sample.timestamp.format("%Y-%m-%dT%H:%M:%SZ"));
            println!("  altitude:  {:.2} deg", sample.altitude_deg);
            println!("  azimuth:   {:.2} deg", sample.azimuth_deg);
            println!("  distance:  {:.0} km", sample.distance_km);
            println!(
                "  horizon:   {}",
                if sample.above_horizon { "above" } else { "below" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Observation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn rise_set(config: &Config, adapter: &SpkAdapter, target: &str) -> ExitCode {
    let body = match Body::resolve(target) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match adapter.rise_set_window(body, &config.site, Utc::now(), Duration::hours(24)) {
        Ok(events) if events.is_empty() => {
            println!("{} has no horizon crossings in the next 24 hours", body);
            ExitCode::SUCCESS
        }
        Ok(events) => {
            for ev in events {
                println!("{}  {}", ev.timestamp.format("%Y-%m-%dT%H:%M:%SZ"), ev.kind);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Rise/set computation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, adapter: SpkAdapter, port: Option<String>) -> ExitCode {
    let initial = match Body::resolve(&config.target) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error in config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (tx, rx) = mpsc::channel();
    let tracker = Tracker::new(Arc::new(adapter), config.site, initial);
    let _tick_loop = tracker.spawn(tx.clone());

    let link = LinkSession::new(config.serial.baud, config.serial.read_timeout, tx.clone());

    if let Some(p) = port.or_else(|| config.serial.port.clone()) {
        let _ = tx.send(Event::User(UserCommand::Connect(p)));
    }

    spawn_shell(tx);

    Coordinator::new(tracker, link, rx, Box::new(ConsolePresenter::default())).run();
    println!("Exiting");
    ExitCode::SUCCESS
}

/// Reads user commands from stdin and forwards them into the event queue.
fn spawn_shell(tx: Sender<Event>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_shell_command(&line) {
                Some(command) => {
                    let quit = command == UserCommand::Quit;
                    if tx.send(Event::User(command)).is_err() || quit {
                        break;
                    }
                }
                None => {
                    println!(
                        "commands: connect <port> | disconnect | target <name> | track | stop | align | quit"
                    );
                    let names: Vec<String> = Body::ALL.iter().map(|b| b.to_string()).collect();
                    println!("targets: {}", names.join(", "));
                }
            }
        }
    });
}

fn parse_shell_command(line: &str) -> Option<UserCommand> {
    let mut words = line.split_whitespace();
    match words.next()? {
        "connect" => Some(UserCommand::Connect(words.next()?.to_string())),
        "disconnect" => Some(UserCommand::Disconnect),
        "target" => Some(UserCommand::SelectTarget(words.next()?.to_string())),
        "track" => Some(UserCommand::Track),
        "stop" => Some(UserCommand::Stop),
        "align" => Some(UserCommand::Align),
        "quit" | "exit" => Some(UserCommand::Quit),
        _ => None,
    }
}

/// Minimal console rendering: print a line whenever a displayed field
/// changes, so the 1 Hz ticks stay quiet between updates.
#[derive(Default)]
struct ConsolePresenter {
    last_link: String,
    last_controller: String,
    last_status: String,
    last_mount: String,
    last_times: String,
    last_controls: String,
}

impl ConsolePresenter {
    fn emit(last: &mut String, line: String) {
        if line != *last {
            println!("{}", line);
            *last = line;
        }
    }
}

impl Presenter for ConsolePresenter {
    fn render(&mut self, view: &ViewState) {
        Self::emit(&mut self.last_link, format!("Comms: {}", view.link.reason));

        let controller = match view.mount_state {
            Some(RunState::Running) => "Tracking",
            Some(RunState::Stopped) => "Stopped",
            None => "----",
        };
        Self::emit(
            &mut self.last_controller,
            format!("Controller: {}", controller),
        );

        if let (Some(az), Some(el)) = (view.mount_azimuth_deg, view.mount_elevation_deg) {
            Self::emit(
                &mut self.last_mount,
                format!("Dish: az {:.2} el {:.2}", az, el),
            );
        }

        let fmt = |t: Option<chrono::DateTime<Utc>>| match t {
            Some(t) => t.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            None => "---".to_string(),
        };
        Self::emit(
            &mut self.last_times,
            format!("Rise: {}  Set: {}", fmt(view.next_rise), fmt(view.next_set)),
        );

        let mut available = Vec::new();
        for (enabled, name) in [
            (view.controls.connect, "connect"),
            (view.controls.disconnect, "disconnect"),
            (view.controls.track, "track"),
            (view.controls.align, "align"),
            (view.controls.stop, "stop"),
        ] {
            if enabled {
                available.push(name);
            }
        }
        Self::emit(
            &mut self.last_controls,
            format!("Available: {}", available.join(" ")),
        );

        if !view.status_text.is_empty() && view.status_text != self.last_status {
            if let Some(sample) = view.target_position {
                println!(
                    "Target: az {:.2} el {:.2} @ {}",
                    sample.azimuth_deg,
                    sample.altitude_deg,
                    sample.timestamp.format("%Y-%m-%dT%H:%M:%SZ")
                );
            }
            println!("{}", view.status_text);
            self.last_status = view.status_text.clone();
        }
    }
}
