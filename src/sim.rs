//! In-memory simulation of the line-control and timing collaborators.
//!
//! # Description
//! [`SimBus`] models the electrical state of both bus lines and records
//! every direction change, drive, sample, and delay quantum into a bounded
//! trace. It hands out one [`SimLine`] handle per line and a [`SimDelay`]
//! that elapses no wall-clock time, so the engine runs unmodified on a host
//! with neither pins nor timers.
//!
//! A peripheral is simulated two ways: scripted levels presented one per
//! sample while the data line is released ([`SimBus::queue_sda_levels`]),
//! and a persistent held level wired-AND'ed with whatever the engine drives
//! ([`SimBus::hold_sda`]), which models a device clamping the line.

use crate::line::{Direction, Level, Line};
use core::cell::RefCell;
use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec};

/// Identity of a simulated line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LineId {
    Scl,
    Sda,
}

/// One recorded collaborator operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A line was reconfigured.
    Direction { line: LineId, direction: Direction },
    /// A line was driven to a level.
    Drive { line: LineId, level: Level },
    /// A line was sampled, returning the recorded level.
    Sample { line: LineId, level: Level },
    /// One delay quantum elapsed.
    Delay,
}

/// Recorded events per bus. Sized for several framed multi-byte transfers.
const TRACE_CAPACITY: usize = 1024;

/// Scripted peer levels pending on the data line.
const SCRIPT_CAPACITY: usize = 64;

struct LineState {
    direction: Direction,
    driven: Level,
    held: Level,
}

impl LineState {
    /// Lines rest high through the bus pull-ups.
    fn idle() -> Self {
        LineState {
            direction: Direction::Output,
            driven: Level::High,
            held: Level::High,
        }
    }
}

struct Inner {
    scl: LineState,
    sda: LineState,
    script: Deque<Level, SCRIPT_CAPACITY>,
    trace: Vec<TraceEvent, TRACE_CAPACITY>,
}

impl Inner {
    fn line_mut(&mut self, id: LineId) -> &mut LineState {
        match id {
            LineId::Scl => &mut self.scl,
            LineId::Sda => &mut self.sda,
        }
    }

    fn record(&mut self, event: TraceEvent) {
        // Bounded on purpose; events past capacity are dropped.
        self.trace.push(event).ok();
    }
}

/// A simulated two-line bus shared by the engine's collaborator handles.
pub struct SimBus {
    inner: RefCell<Inner>,
}

impl SimBus {
    pub fn new() -> Self {
        SimBus {
            inner: RefCell::new(Inner {
                scl: LineState::idle(),
                sda: LineState::idle(),
                script: Deque::new(),
                trace: Vec::new(),
            }),
        }
    }

    /// Acquire a handle for one of the lines.
    pub fn line(&self, id: LineId) -> SimLine<'_> {
        SimLine { bus: self, id }
    }

    /// Acquire the timing collaborator.
    pub fn delay(&self) -> SimDelay<'_> {
        SimDelay { bus: self }
    }

    /// Script the levels a peripheral presents on the data line, consumed
    /// one per sample while the line is released. Levels beyond the script
    /// capacity are dropped.
    pub fn queue_sda_levels(&self, levels: &[Level]) {
        let mut inner = self.inner.borrow_mut();
        for &level in levels {
            inner.script.push_back(level).ok();
        }
    }

    /// Clamp the data line to a level, as a wedged peripheral would.
    pub fn hold_sda(&self, level: Level) {
        self.inner.borrow_mut().sda.held = level;
    }

    /// A copy of the recorded trace.
    pub fn trace(&self) -> Vec<TraceEvent, TRACE_CAPACITY> {
        self.inner.borrow().trace.clone()
    }
}

/// Simulated line handle. Implements [`Line`] against the shared bus state.
pub struct SimLine<'a> {
    bus: &'a SimBus,
    id: LineId,
}

impl Line for SimLine<'_> {
    fn set_direction(&mut self, direction: Direction) {
        let mut inner = self.bus.inner.borrow_mut();
        inner.line_mut(self.id).direction = direction;
        inner.record(TraceEvent::Direction {
            line: self.id,
            direction,
        });
    }

    fn drive(&mut self, level: Level) {
        let mut inner = self.bus.inner.borrow_mut();
        inner.line_mut(self.id).driven = level;
        inner.record(TraceEvent::Drive {
            line: self.id,
            level,
        });
    }

    fn sample(&mut self) -> Level {
        let mut inner = self.bus.inner.borrow_mut();

        let direction = inner.line_mut(self.id).direction;
        let scripted = if self.id == LineId::Sda && direction == Direction::Input {
            inner.script.pop_front()
        } else {
            None
        };

        let line = inner.line_mut(self.id);
        let level = match scripted {
            Some(level) => level,
            // Wired-AND: whoever drives low wins; a released line rests at
            // the held level.
            None => match line.direction {
                Direction::Output => {
                    if line.driven == Level::Low || line.held == Level::Low {
                        Level::Low
                    } else {
                        Level::High
                    }
                }
                Direction::Input => line.held,
            },
        };

        inner.record(TraceEvent::Sample {
            line: self.id,
            level,
        });
        level
    }
}

/// Simulated timing collaborator: records quanta instead of sleeping.
pub struct SimDelay<'a> {
    bus: &'a SimBus,
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, _ns: u32) {
        self.bus.inner.borrow_mut().record(TraceEvent::Delay);
    }

    fn delay_us(&mut self, _us: u32) {
        self.bus.inner.borrow_mut().record(TraceEvent::Delay);
    }
}
