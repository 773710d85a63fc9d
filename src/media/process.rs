use std::io::Read as _;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::foundation::cancel::CancelToken;

/// Granularity of cancellation checks while waiting on a helper process.
const WAIT_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct SlotState {
    child: Option<Child>,
    closed: bool,
}

/// Holds the helper process a worker thread is currently running so its owner can kill it.
///
/// Once closed, the current child is killed and reaped, and any child installed later is killed
/// on arrival.
#[derive(Debug, Default)]
pub(crate) struct ChildSlot(Mutex<SlotState>);

impl ChildSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Park `child` in the slot; returns `false` (after killing it) when the slot is closed.
    pub(crate) fn install(&self, mut child: Child) -> bool {
        let mut state = self.lock();
        if state.closed {
            drop(state);
            let _ = child.kill();
            let _ = child.wait();
            return false;
        }
        state.child = Some(child);
        true
    }

    /// Take the child back, e.g. to wait on it. `None` when it was killed through the slot.
    pub(crate) fn take(&self) -> Option<Child> {
        self.lock().child.take()
    }

    /// Kill and reap the current child and refuse new ones.
    pub(crate) fn close(&self) {
        let child = {
            let mut state = self.lock();
            state.closed = true;
            state.child.take()
        };
        if let Some(mut c) = child {
            let _ = c.kill();
            let _ = c.wait();
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Exit status and captured output of a helper process.
#[derive(Debug)]
pub(crate) struct Finished {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Run `cmd` to completion with its handle parked in `slot`.
///
/// Returns `Ok(None)` when the slot was closed before or while the child ran.
pub(crate) fn run_in_slot(cmd: &mut Command, slot: &ChildSlot) -> std::io::Result<Option<Finished>> {
    if slot.is_closed() {
        return Ok(None);
    }
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(std::io::Error::other("child pipes were not captured"));
    };
    let stderr_drain = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = stderr.read_to_end(&mut bytes);
        bytes
    });
    if !slot.install(child) {
        let _ = stderr_drain.join();
        return Ok(None);
    }

    let mut out = Vec::new();
    let read = stdout.read_to_end(&mut out);
    let status = slot.take().map(|mut c| c.wait());
    let stderr_bytes = stderr_drain.join().unwrap_or_default();
    let Some(status) = status else {
        return Ok(None);
    };
    read?;
    Ok(Some(Finished {
        status: status?,
        stdout: out,
        stderr: stderr_bytes,
    }))
}

/// How a [`run_bounded`] call ended.
#[derive(Debug)]
pub(crate) enum Bounded<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

/// Run `work` on a named thread, giving it a [`ChildSlot`] for the processes it spawns.
///
/// When `timeout` passes or `cancel` fires first, the slot is closed (killing the process) and the
/// thread is joined before returning, so nothing outlives the call.
pub(crate) fn run_bounded<T, F>(
    name: &str,
    timeout: Duration,
    cancel: &CancelToken,
    work: F,
) -> std::io::Result<Bounded<T>>
where
    T: Send + 'static,
    F: FnOnce(&ChildSlot) -> T + Send + 'static,
{
    let slot = Arc::new(ChildSlot::default());
    let (tx, rx) = mpsc::channel();
    let worker_slot = Arc::clone(&slot);
    let handle = std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            let _ = tx.send(work(&worker_slot));
        })?;

    let deadline = Instant::now() + timeout;
    let outcome = loop {
        if cancel.is_cancelled() {
            break Bounded::Cancelled;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break Bounded::TimedOut;
        }
        match rx.recv_timeout(left.min(WAIT_SLICE)) {
            Ok(value) => break Bounded::Done(value),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                return Err(std::io::Error::other(format!("{name} thread exited without a result")));
            }
        }
    };
    if !matches!(outcome, Bounded::Done(_)) {
        slot.close();
    }
    let _ = handle.join();
    Ok(outcome)
}
