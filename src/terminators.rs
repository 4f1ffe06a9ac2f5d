//! Process-level terminators, carried over from the teacher's own
//! `terminators.rs` almost unchanged: these respond to wall-clock limits and
//! Ctrl-C, independent of the domain-specific checks in [`crate::termination`].
//! The Task Pipeline composes one of these with the Termination Monitor so an
//! interactive run can be interrupted between tasks (§5).

use std::sync::{Arc, atomic::AtomicBool};

use crate::status::TerminationReason;

/// A cooperative terminator: checked between tasks, never mid-solve.
pub trait Terminator {
    fn initialize(&mut self) {}

    fn terminate(&mut self) -> Option<TerminationReason>;
}

/// Terminator that responds to Ctrl-C (SIGINT) or a programmatic interrupt.
///
/// # Note
/// Only one instance can be constructed per process, as it installs a global
/// signal handler. Creating more than one will panic.
pub struct InterruptTerminator {
    interrupted: Arc<AtomicBool>,
}

impl InterruptTerminator {
    pub fn new() -> Self {
        let interrupted = Arc::new(AtomicBool::new(false));
        ctrlc::set_handler({
            let interrupted_clone = interrupted.clone();
            move || {
                interrupted_clone.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        })
        .expect("Error setting Ctrl-C handler");
        Self { interrupted }
    }

    pub fn interrupt(&mut self) {
        self.interrupted.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Default for InterruptTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminator for InterruptTerminator {
    fn terminate(&mut self) -> Option<TerminationReason> {
        if self.interrupted.load(std::sync::atomic::Ordering::SeqCst) {
            Some(TerminationReason::Interrupted)
        } else {
            None
        }
    }
}

/// Terminator that triggers after a specified wall-clock duration.
pub struct TimeOutTerminator {
    max_time_secs: f64,
    start_time: std::time::Instant,
}

impl TimeOutTerminator {
    pub fn new(max_time_secs: f64) -> Self {
        Self {
            max_time_secs,
            start_time: std::time::Instant::now(),
        }
    }
}

impl Terminator for TimeOutTerminator {
    fn initialize(&mut self) {
        self.start_time = std::time::Instant::now();
    }

    fn terminate(&mut self) -> Option<TerminationReason> {
        if self.start_time.elapsed().as_secs_f64() >= self.max_time_secs {
            Some(TerminationReason::TimeLimit)
        } else {
            None
        }
    }
}

/// Combines multiple terminators, triggering on whichever fires first.
pub struct MultipleTerminators {
    terminators: Vec<Box<dyn Terminator>>,
}

impl MultipleTerminators {
    pub fn new(terminators: Vec<Box<dyn Terminator>>) -> Self {
        Self { terminators }
    }
}

impl Terminator for MultipleTerminators {
    fn initialize(&mut self) {
        for terminator in &mut self.terminators {
            terminator.initialize();
        }
    }

    fn terminate(&mut self) -> Option<TerminationReason> {
        for terminator in &mut self.terminators {
            if let Some(reason) = terminator.as_mut().terminate() {
                return Some(reason);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_terminator_fires_after_duration() {
        let mut t = TimeOutTerminator::new(0.0);
        assert_eq!(t.terminate(), Some(TerminationReason::TimeLimit));
    }

    #[test]
    fn multiple_terminators_returns_first_hit() {
        let mut t = MultipleTerminators::new(vec![
            Box::new(TimeOutTerminator::new(1000.0)),
            Box::new(TimeOutTerminator::new(0.0)),
        ]);
        assert_eq!(t.terminate(), Some(TerminationReason::TimeLimit));
    }

    #[cfg(unix)]
    mod platform {
        pub fn send_sigint() {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            let pid = std::process::id() as i32;
            signal::kill(Pid::from_raw(pid), Signal::SIGINT).expect("failed to send SIGINT");
        }
    }

    #[cfg(windows)]
    mod platform {
        pub fn send_sigint() {
            use windows_sys::Win32::System::Console::{CTRL_C_EVENT, GenerateConsoleCtrlEvent};

            unsafe {
                GenerateConsoleCtrlEvent(CTRL_C_EVENT, 0);
            }
        }
    }

    // Installs the real process-wide Ctrl-C handler, so it cannot share a
    // test binary with any other InterruptTerminator construction; run with
    // `cargo test -- --ignored` in isolation.
    #[test]
    #[ignore]
    fn interrupt_terminator_observes_a_real_sigint() {
        let mut terminator = InterruptTerminator::new();

        std::thread::spawn(|| {
            std::thread::sleep(std::time::Duration::from_millis(200));
            platform::send_sigint();
        });

        loop {
            if let Some(reason) = terminator.terminate() {
                assert_eq!(reason, TerminationReason::Interrupted);
                break;
            }
        }
    }
}
