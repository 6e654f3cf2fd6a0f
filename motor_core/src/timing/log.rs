//! Control-cycle checkpoints.
//!
//! Each cycle stamps four checkpoints with the free-running tick counter.
//! A new cycle starting before the previous one reached
//! [`Checkpoint::CtrlDone`] is a missed deadline. Completed cycles feed
//! O(1) statistics and a fixed-capacity latency history.

use heapless::Deque;
use motor_common::motor::error::MotorError;

/// Capacity of the latency history.
pub const LATENCY_HISTORY_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Checkpoint {
    /// Update handler entered for a sampling edge.
    UpdateStart = 0,
    /// Phase currents available.
    CurrentMeas = 1,
    /// DC offset filter fed.
    DcCal = 2,
    /// Control loop finished and timings latched.
    CtrlDone = 3,
}

/// Checkpoint timestamps and latency statistics.
#[derive(Debug, Clone)]
pub struct TimingLog {
    stamps: [u32; 4],
    pending: bool,
    history: Deque<u32, LATENCY_HISTORY_LEN>,
    /// Completed cycles.
    pub cycle_count: u64,
    /// Largest UpdateStart → CtrlDone latency [ticks].
    pub max_latency: u32,
    /// Deadlines missed so far.
    pub deadline_misses: u64,
}

impl Default for TimingLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingLog {
    pub const fn new() -> Self {
        Self {
            stamps: [0; 4],
            pending: false,
            history: Deque::new(),
            cycle_count: 0,
            max_latency: 0,
            deadline_misses: 0,
        }
    }

    /// Start a new cycle at `ticks`.
    ///
    /// The cycle is started either way; the error reports that the previous
    /// one never completed.
    pub fn begin_cycle(&mut self, ticks: u32) -> Result<(), MotorError> {
        let missed = self.pending;
        self.stamps = [ticks, 0, 0, 0];
        self.pending = true;
        if missed {
            self.deadline_misses += 1;
            return Err(MotorError::CONTROL_DEADLINE_MISSED);
        }
        Ok(())
    }

    #[inline]
    pub fn record(&mut self, checkpoint: Checkpoint, ticks: u32) {
        self.stamps[checkpoint as usize] = ticks;
    }

    /// Close the running cycle. Returns its latency, or `None` if no cycle
    /// was running.
    pub fn end_cycle(&mut self, ticks: u32) -> Option<u32> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        self.record(Checkpoint::CtrlDone, ticks);
        let latency = ticks.wrapping_sub(self.stamps[Checkpoint::UpdateStart as usize]);
        if self.history.is_full() {
            self.history.pop_front();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.history.push_back(latency);
        self.cycle_count += 1;
        self.max_latency = self.max_latency.max(latency);
        Some(latency)
    }

    /// A cycle started and has not reached `CtrlDone`.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn stamp(&self, checkpoint: Checkpoint) -> u32 {
        self.stamps[checkpoint as usize]
    }

    /// Latencies of the most recent cycles, oldest first [ticks].
    pub fn latencies(&self) -> impl Iterator<Item = u32> + '_ {
        self.history.iter().copied()
    }

    pub fn last_latency(&self) -> Option<u32> {
        self.history.back().copied()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
