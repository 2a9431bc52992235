//! Hibiki audio engine: session model, block scheduler, VST3 plugin
//! hosting, and the length-framed control protocol to the front-end
//! process (spec.md §1).

mod cli;
mod notify;
mod router;
mod scheduler;

use std::io::{stdin, stdout};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hibiki_core::{Session, Sink, OUT_CHANNELS};
use hibiki_media::CpalSink;
use hibiki_plugin_host::Vst3Scanner;

use notify::Notifier;

const DEFAULT_TEMPO_BPM: f64 = 120.0;
const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    if let Some(module_path) = cli.list {
        return run_list(&module_path);
    }

    init_logging();
    info!("starting Hibiki engine");

    let session = Session::new(DEFAULT_TEMPO_BPM, DEFAULT_SAMPLE_RATE);
    let sink = open_sink(&session);

    let stdin = stdin();
    let stdout = stdout();
    let notifier = Notifier::new(Box::new(stdout.lock()));

    std::thread::scope(|scope| {
        let scheduler_handle = sink.map(|mut sink: Box<dyn Sink>| {
            scope.spawn(move || scheduler::run(&session, sink.as_mut(), &notifier))
        });

        let mut reader = stdin.lock();
        router::run(&mut reader, &session, &notifier);

        if let Some(handle) = scheduler_handle {
            if handle.join().is_err() {
                warn!("scheduler thread panicked");
            }
        }
    });

    info!("Hibiki engine exiting");
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hibiki=info,warn")),
        )
        .init();
}

/// Opens the default audio output device and latches its sample rate into
/// the session before the Scheduler's first block. Per spec.md §4.5/§7, a
/// failed or not-ready sink is not fatal: the Scheduler simply never
/// starts and the control thread continues to serve commands.
fn open_sink(session: &Session) -> Option<Box<dyn Sink>> {
    match CpalSink::new(OUT_CHANNELS as u16) {
        Ok(sink) if sink.is_ready() => {
            session.set_sample_rate(sink.sample_rate());
            Some(Box::new(sink))
        }
        Ok(_) => {
            warn!("audio sink reported not ready; running without audio output");
            None
        }
        Err(e) => {
            warn!("failed to open audio sink: {e}; running without audio output");
            None
        }
    }
}

/// Implements `hibiki-engine --list <plugin_module_path>`: scans the module
/// and prints `index:name` for every plugin class found, via the same
/// scanner the `LoadPlugin` command path uses.
fn run_list(module_path: &std::path::Path) -> anyhow::Result<()> {
    let mut scanner = Vst3Scanner::new()?;
    scanner.scan_path(module_path)?;
    for (index, info) in scanner.plugins().iter().enumerate() {
        println!("{index}:{}", info.name);
    }
    Ok(())
}
