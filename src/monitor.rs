//! Controller loop and the inactivity monitor thread.
//!
//! The main thread polls the input sources and dispatches debounced
//! presses; one background thread runs the inactivity check. Both only
//! touch brightness through the shared state machine, and shutdown is
//! cooperative: signal handlers set a flag, cleanup happens on the
//! normal control-flow path.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::info;
use log::warn;
use smallvec::SmallVec;

use crate::backlight::BacklightPort;
use crate::debounce::Debouncer;
use crate::input::ButtonRole;
use crate::input::InputSource;
use crate::state::StateMachine;

/// Upper bound on a single source poll, so a termination request is
/// honored well within a second.
const POLL_SLICE: Duration = Duration::from_millis(100);

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signal: nix::libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Route SIGINT/SIGTERM into the cooperative shutdown flag. Nothing
/// else happens inside the handler.
pub(crate) fn install_signal_handlers() -> anyhow::Result<()> {
    use nix::sys::signal::sigaction;
    use nix::sys::signal::SaFlags;
    use nix::sys::signal::SigAction;
    use nix::sys::signal::SigHandler;
    use nix::sys::signal::SigSet;
    use nix::sys::signal::Signal;

    let action = SigAction::new(
        SigHandler::Handler(request_shutdown),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: The handler only stores to an atomic, which is
    // async-signal-safe.
    unsafe {
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGTERM, &action)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct InactivityConfig {
    pub timeout: Duration,
    pub check_interval: Duration,
}

/// Run the controller until a termination request. Returns once the
/// inactivity thread is joined and all input sources are released.
pub(crate) fn run<B>(
    machine: Arc<Mutex<StateMachine<B>>>,
    mut sources: SmallVec<[InputSource; 3]>,
    mut debouncer: Debouncer,
    idle: InactivityConfig,
) -> anyhow::Result<()>
where
    B: BacklightPort + Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let dimmer = {
        let machine = Arc::clone(&machine);
        thread::Builder::new()
            .name("inactivity".to_owned())
            .spawn(move || inactivity_loop(&machine, &stop_rx, idle))?
    };

    for source in &sources {
        info!("input: {}", source.describe());
    }
    info!(
        "controller running, auto-dim after {}s idle",
        idle.timeout.as_secs()
    );

    while !SHUTDOWN.load(Ordering::SeqCst) {
        for source in &mut sources {
            match source.poll(POLL_SLICE) {
                Ok(Some(edge)) => {
                    let role = source.role();
                    if let Some(press) = debouncer.accept(edge) {
                        debug!("logical press from {:?} as {role:?}", press.source);
                        let mut machine = machine.lock().unwrap_or_else(|e| e.into_inner());
                        match role {
                            ButtonRole::Cycle => machine.cycle(press.at),
                            ButtonRole::Power => machine.toggle(press.at),
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => warn!("{}: {err}", source.describe()),
            }
            if SHUTDOWN.load(Ordering::SeqCst) {
                break;
            }
        }
    }

    info!("termination requested, stopping");
    // Dropping the sender wakes the inactivity thread even if the
    // send itself is never seen.
    let _ = stop_tx.send(());
    drop(stop_tx);
    if dimmer.join().is_err() {
        warn!("inactivity monitor panicked");
    }
    drop(sources);
    Ok(())
}

fn inactivity_loop<B: BacklightPort>(
    machine: &Arc<Mutex<StateMachine<B>>>,
    stop: &mpsc::Receiver<()>,
    cfg: InactivityConfig,
) {
    loop {
        match stop.recv_timeout(cfg.check_interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                let mut machine = machine.lock().unwrap_or_else(|e| e.into_inner());
                if machine.dim_if_idle(Instant::now(), cfg.timeout) {
                    info!(
                        "auto-dimmed after {}s of inactivity",
                        cfg.timeout.as_secs()
                    );
                }
            }
        }
    }
}
