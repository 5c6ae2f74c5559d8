//! Cycle runner, RT setup and sync-pulse ticker.
//!
//! [`CycleRunner`] drives a [`HybridNode`] from its own port:
//!
//! ```text
//! tick():
//!   port.read(input)        ── failure → dropped frame, HARDWARE_FAULT
//!   node.process(input, output)
//!   port.write(output)      ── failure → dropped frame, HARDWARE_FAULT
//!   drift meter ← sync pulse count
//! ```
//!
//! `run_for` / `run_until` pace ticks at one buffer duration with
//! `std::thread::sleep`. With the `rt` feature, [`rt_setup`] locks memory,
//! pins the thread and switches it to SCHED_FIFO before the loop starts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use hybrid_common::consts::{DRIFT_WINDOW_US, SYNC_PULSE_HZ};
use hybrid_common::hal::{HardwarePort, monotonic_us};
use hybrid_common::node::error::NodeError;
use hybrid_common::node::state::NodeLifecycle;
use hybrid_common::transport::{DriftMeter, SyncPulse};
use thiserror::Error;
use tracing::{debug, info};

use crate::node::{CycleOutcome, HybridNode};

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// The node rejected the cycle.
    #[error("node error: {0}")]
    Node(#[from] NodeError),

    /// Background thread could not be started.
    #[error("thread error: {0}")]
    Thread(String),
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), RunnerError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| RunnerError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), RunnerError> {
    Ok(())
}

/// Touch 256 KiB of stack so the cycle never faults it in.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), RunnerError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| RunnerError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| RunnerError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), RunnerError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), RunnerError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(RunnerError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), RunnerError> {
    Ok(())
}

/// Prepare the calling thread for the cycle loop.
///
/// Without the `rt` feature every step except stack prefaulting is a no-op.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), RunnerError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Sync Ticker ────────────────────────────────────────────────────

/// Background thread toggling a [`SyncPulse`] at a fixed rate.
#[derive(Debug)]
pub struct SyncTicker {
    pulse: Arc<SyncPulse>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncTicker {
    /// Enable `pulse` and tick it at `hz` until stopped.
    pub fn spawn(pulse: Arc<SyncPulse>, hz: u32) -> Result<Self, RunnerError> {
        if hz == 0 {
            return Err(RunnerError::Thread("sync pulse rate must be non-zero".into()));
        }
        let period = Duration::from_nanos(1_000_000_000 / hz as u64);
        let stop = Arc::new(AtomicBool::new(false));
        pulse.set_enabled(true);

        let thread_pulse = pulse.clone();
        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name("sync-pulse".into())
            .spawn(move || {
                let mut next = Instant::now() + period;
                while !thread_stop.load(Ordering::Acquire) {
                    thread_pulse.tick();
                    let now = Instant::now();
                    if next > now {
                        std::thread::sleep(next - now);
                    }
                    next += period;
                }
            })
            .map_err(|e| RunnerError::Thread(e.to_string()))?;

        info!("Sync pulse ticking at {hz} Hz");
        Ok(Self {
            pulse,
            stop,
            handle: Some(handle),
        })
    }

    /// The ticked pulse.
    pub fn pulse(&self) -> &Arc<SyncPulse> {
        &self.pulse
    }

    /// Stop and join the thread, then disable the pulse.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.pulse.set_enabled(false);
    }
}

impl Drop for SyncTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Drives one node from its port with pre-allocated buffers.
pub struct CycleRunner<P: HardwarePort> {
    node: HybridNode<P>,
    input: Vec<f32>,
    output: Vec<f32>,
    frames: usize,
    period: Duration,
    pulse: Option<Arc<SyncPulse>>,
    drift: DriftMeter,
}

impl<P: HardwarePort> CycleRunner<P> {
    /// Wrap an initialized node. Buffers are sized from its configuration.
    pub fn new(node: HybridNode<P>) -> Result<Self, RunnerError> {
        if node.lifecycle() == NodeLifecycle::Uninitialized {
            return Err(NodeError::InvalidState("node not initialized").into());
        }
        let config = node.config();
        let layout = config.port_layout();
        let period = Duration::from_nanos((config.buffer_duration_us() * 1_000.0) as u64);
        Ok(Self {
            input: vec![0.0; layout.input_len()],
            output: vec![0.0; layout.output_len()],
            frames: layout.buffer_size,
            period,
            pulse: None,
            drift: DriftMeter::new(SYNC_PULSE_HZ, DRIFT_WINDOW_US),
            node,
        })
    }

    /// Measure drift against `pulse` on every tick.
    pub fn with_sync_pulse(mut self, pulse: Arc<SyncPulse>) -> Self {
        self.pulse = Some(pulse);
        self
    }

    /// One read → process → write pass.
    ///
    /// Returns `None` when the input transfer failed and the frame was
    /// dropped. Only node precondition failures are errors.
    pub fn tick(&mut self) -> Result<Option<CycleOutcome>, RunnerError> {
        if let Err(e) = self.node.port_mut().read(&mut self.input, self.frames) {
            self.node.record_dropped_frame(&e);
            return Ok(None);
        }
        let outcome = self.node.process(&self.input, &mut self.output, self.frames)?;
        if let Err(e) = self.node.port_mut().write(&self.output, self.frames) {
            self.node.record_dropped_frame(&e);
        }
        if let Some(pulse) = &self.pulse {
            if let Some(ppm) = self.drift.sample(pulse.count(), monotonic_us()) {
                self.node.set_drift_ppm(ppm);
            }
        }
        Ok(Some(outcome))
    }

    /// Run up to `cycles` paced ticks. Stops early once the node stops
    /// (e.g. emergency shutdown). Returns the number of ticks executed.
    pub fn run_for(&mut self, cycles: u64) -> Result<u64, RunnerError> {
        let mut done = 0;
        while done < cycles && self.node.is_running() {
            self.paced_tick()?;
            done += 1;
        }
        debug!("Runner executed {done} of {cycles} cycles");
        Ok(done)
    }

    /// Run paced ticks while `running` is set and the node is running.
    pub fn run_until(&mut self, running: &AtomicBool) -> Result<u64, RunnerError> {
        let mut done = 0;
        while running.load(Ordering::SeqCst) && self.node.is_running() {
            self.paced_tick()?;
            done += 1;
        }
        Ok(done)
    }

    fn paced_tick(&mut self) -> Result<(), RunnerError> {
        let start = Instant::now();
        self.tick()?;
        if let Some(remaining) = self.period.checked_sub(start.elapsed()) {
            std::thread::sleep(remaining);
        }
        Ok(())
    }

    pub fn node(&self) -> &HybridNode<P> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut HybridNode<P> {
        &mut self.node
    }

    /// Last output buffer handed to the port.
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Cycle period [µs-accurate duration of one buffer].
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn into_node(self) -> HybridNode<P> {
        self.node
    }
}
