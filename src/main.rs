use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use binwarm::advisor::AdvisoryLoop;
use binwarm::cli::Cli;
use binwarm::exec_events::{ExecEventSource, ProcConnector};
use binwarm::freq_table::FreqTable;
use binwarm::monitor::ExecMonitor;
use binwarm::params::MAX_NUM_BINS_PRF;
use binwarm::prefetch::FadviseWillNeed;

/// Set by the signal handler, observed by the advisory loop at its sleep
/// boundary.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Initialize tracing subscriber, defaulting to info-level output on stderr
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn install_signal_handlers() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGINT, &action).context("Failed to install SIGINT handler")?;
        sigaction(Signal::SIGTERM, &action).context("Failed to install SIGTERM handler")?;
    }
    Ok(())
}

/// Feed connector datagrams into the worker channel. Dropped events (full
/// channel, unresolvable pids) degrade the feed silently, never block it.
fn run_event_reader(
    mut source: ProcConnector,
    tx: crossbeam::channel::Sender<Vec<u8>>,
) {
    loop {
        match source.next_event() {
            Ok(Some(event)) => {
                if tx.try_send(event.path).is_err() {
                    debug!("worker channel full, execution event dropped");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%err, "error reading execution events");
                thread::sleep(Duration::from_millis(100));
            }
        }
    }
}

fn run(period_secs: u16) -> Result<()> {
    let table = Arc::new(FreqTable::new());
    let monitor = Arc::new(ExecMonitor::new(Arc::clone(&table)));

    // Setup failures here are the only fatal errors; everything past this
    // point is best-effort.
    let source = ProcConnector::attach().context("Failed to attach to the exec event source")?;
    info!("attached to process execution events");

    let (tx, rx) = crossbeam::channel::bounded::<Vec<u8>>(1024);
    thread::spawn(move || run_event_reader(source, tx));

    // One monitor invocation per event, spread across hardware threads.
    let workers = thread::available_parallelism()
        .map(|n| n.get().min(4))
        .unwrap_or(1);
    for _ in 0..workers {
        let rx = rx.clone();
        let monitor = Arc::clone(&monitor);
        thread::spawn(move || {
            for path in rx.iter() {
                monitor.observe(&path);
            }
        });
    }

    install_signal_handlers()?;

    info!(
        period_secs,
        top_k = MAX_NUM_BINS_PRF,
        "starting advisory loop"
    );
    AdvisoryLoop::new(
        table,
        FadviseWillNeed,
        Duration::from_secs(u64::from(period_secs)),
        MAX_NUM_BINS_PRF,
    )
    .run(&SHUTDOWN);

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let period_secs = cli.period_secs();
    if let Err(err) = run(period_secs) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
