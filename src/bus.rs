//! The bit-banged bus engine.
//!
//! # Description
//! Implements the five I2C master primitives by sequencing direction
//! changes, level changes, and fixed delays on the two bus lines. The
//! engine tracks the logical transfer state and rejects primitives invoked
//! out of protocol order, turning a silent electrical-level bug class into
//! a reported error.

use crate::line::{Direction, Level, Line};
use embedded_hal::delay::DelayNs;

/// Engine timing configuration.
#[derive(Debug, Copy, Clone)]
pub struct Config {
    /// The delay inserted between line transitions, in microseconds. Its
    /// accuracy bounds the achievable bus clock rate.
    pub quantum_us: u32,
}

impl Default for Config {
    /// A 5 microsecond quantum paces the bus at roughly 100 kHz.
    fn default() -> Self {
        Config { quantum_us: 5 }
    }
}

/// Logical state of the transfer in progress.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BusState {
    /// No transaction in progress; both lines idle high.
    Idle,
    /// A START condition was emitted and the bus is claimed; the engine is
    /// byte-aligned.
    Started,
    /// A byte was clocked out; the peripheral owes an acknowledgment.
    ByteSent,
    /// The acknowledgment window is being clocked and sampled.
    AwaitingAck,
    /// A byte is being clocked in from the peripheral.
    Reading,
}

/// The five bus primitives, named in sequencing-error reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
    WriteByte,
    ReadByte,
    WaitAck,
}

/// Errors the engine can report.
///
/// A NACK is not an error: it is the advisory `bool` returned by
/// [`SoftI2c::wait_ack`], and retry or abort policy belongs to the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// A primitive was invoked out of protocol order.
    Sequence {
        /// The session state at the time of the call.
        state: BusState,
        /// The primitive that was rejected.
        operation: Operation,
    },
    /// The data line was held low at setup and could not be cleared.
    BusStuck,
}

/// Software I2C master engine over two digital lines.
///
/// The engine owns the clock line, the data line, and the delay provider
/// for its entire lifetime. All primitives are synchronous and blocking;
/// callers in a multi-threaded system must serialize whole transactions
/// (START through STOP) around the engine themselves.
pub struct SoftI2c<SCL, SDA, DELAY> {
    scl: SCL,
    sda: SDA,
    delay: DELAY,
    quantum_us: u32,
    state: BusState,
}

impl<SCL, SDA, DELAY> SoftI2c<SCL, SDA, DELAY>
where
    SCL: Line,
    SDA: Line,
    DELAY: DelayNs,
{
    /// Construct the engine and bring the bus to its idle state.
    ///
    /// Both lines are driven high. If the data line then reads low, a
    /// peripheral was abandoned mid-transfer; the clock is pulsed up to 8
    /// times to let it shift out the rest of its byte and release the line.
    ///
    /// # Args
    /// * `scl` - The clock line.
    /// * `sda` - The data line.
    /// * `delay` - The pacing delay provider.
    /// * `config` - Engine timing configuration.
    ///
    /// # Returns
    /// The engine, or [`Error::BusStuck`] if the data line stayed low.
    pub fn new(scl: SCL, sda: SDA, delay: DELAY, config: Config) -> Result<Self, Error> {
        let mut bus = SoftI2c {
            scl,
            sda,
            delay,
            quantum_us: config.quantum_us,
            state: BusState::Idle,
        };

        // Idle both lines high before any transaction.
        bus.sda.set_direction(Direction::Output);
        bus.sda.drive(Level::High);
        bus.scl.set_direction(Direction::Output);
        bus.scl.drive(Level::High);
        bus.quantum();
        bus.quantum();

        if bus.sda.sample() == Level::Low {
            for _ in 0..8 {
                bus.scl.drive(Level::Low);
                bus.quantum();
                bus.scl.drive(Level::High);
                bus.quantum();
            }
        }

        if bus.sda.sample() == Level::Low {
            log::error!("SDA held low; bus clear failed");
            return Err(Error::BusStuck);
        }

        log::info!("bus idle, quantum {} us", bus.quantum_us);
        Ok(bus)
    }

    /// Emit a START condition and claim the bus.
    ///
    /// A falling edge on the data line while the clock is high signals the
    /// start of a transaction; the clock is then held low so that further
    /// data-line changes are plain bits.
    pub fn start(&mut self) -> Result<(), Error> {
        self.check(Operation::Start, BusState::Idle)?;

        self.sda.set_direction(Direction::Output);
        self.sda.drive(Level::High);
        self.scl.set_direction(Direction::Output);
        self.scl.drive(Level::High);
        self.quantum();

        self.sda.drive(Level::Low);
        self.quantum();

        self.scl.drive(Level::Low);
        self.state = BusState::Started;
        Ok(())
    }

    /// Emit a STOP condition and release the bus.
    ///
    /// A rising edge on the data line while the clock is high signals the
    /// end of the transaction.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.check(Operation::Stop, BusState::Started)?;

        self.sda.set_direction(Direction::Output);
        self.sda.drive(Level::Low);
        self.scl.drive(Level::High);
        self.quantum();

        self.sda.drive(Level::High);
        self.quantum();

        self.state = BusState::Idle;
        Ok(())
    }

    /// Clock one byte onto the bus, most-significant bit first.
    ///
    /// The clock is left low afterwards and the data line stays in output
    /// direction; the caller must invoke [`SoftI2c::wait_ack`] next.
    ///
    /// # Args
    /// * `byte` - The value to clock out.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.check(Operation::WriteByte, BusState::Started)?;

        self.sda.set_direction(Direction::Output);
        for bit in (0..8).rev() {
            match byte & (1 << bit) {
                0 => self.sda.drive(Level::Low),
                _ => self.sda.drive(Level::High),
            }
            self.quantum();

            // The peripheral samples SDA on this rising edge.
            self.scl.drive(Level::High);
            self.quantum();
            self.scl.drive(Level::Low);
            self.quantum();
        }

        self.state = BusState::ByteSent;
        Ok(())
    }

    /// Sample the peripheral's acknowledgment of the last written byte.
    ///
    /// The data line is released so the peripheral may pull it low, one
    /// clock pulse is generated, and the line is reclaimed afterwards.
    ///
    /// # Returns
    /// `true` if the peripheral pulled the data line low (ACK), `false` if
    /// the line was left floating high (NACK). A NACK is advisory; one
    /// diagnostic is emitted and the caller decides whether to retry or
    /// abort the transaction.
    pub fn wait_ack(&mut self) -> Result<bool, Error> {
        self.check(Operation::WaitAck, BusState::ByteSent)?;
        self.state = BusState::AwaitingAck;

        self.sda.set_direction(Direction::Input);
        self.quantum();

        self.scl.drive(Level::High);
        self.quantum();
        let ack = self.sda.sample() == Level::Low;
        self.scl.drive(Level::Low);
        self.quantum();

        // Reclaim the data line for the next operation.
        self.sda.set_direction(Direction::Output);
        self.sda.drive(Level::High);
        self.state = BusState::Started;

        if !ack {
            log::warn!("NACK: no acknowledgment from the peripheral");
        }
        Ok(ack)
    }

    /// Clock one byte in from the bus, most-significant bit first, then
    /// report ACK or NACK back to the peripheral.
    ///
    /// # Args
    /// * `send_ack` - `true` drives the acknowledgment bit low (more bytes
    ///   wanted); `false` drives it high (this was the final byte).
    ///
    /// # Returns
    /// The byte assembled from the levels sampled in each clock-high
    /// window.
    pub fn read_byte(&mut self, send_ack: bool) -> Result<u8, Error> {
        self.check(Operation::ReadByte, BusState::Started)?;
        self.state = BusState::Reading;

        // Release the data line; the peripheral drives the bits.
        self.sda.set_direction(Direction::Input);

        let mut byte: u8 = 0;
        for _ in 0..8 {
            self.scl.drive(Level::High);
            self.quantum();

            byte <<= 1;
            if self.sda.sample() == Level::High {
                byte |= 1;
            }

            self.scl.drive(Level::Low);
            self.quantum();
        }

        // Report the acknowledgment on one trailing clock pulse.
        self.sda.set_direction(Direction::Output);
        match send_ack {
            true => self.sda.drive(Level::Low),
            false => self.sda.drive(Level::High),
        }
        self.quantum();
        self.scl.drive(Level::High);
        self.quantum();
        self.scl.drive(Level::Low);
        self.quantum();

        self.state = BusState::Started;
        Ok(byte)
    }

    /// The current session state.
    pub fn state(&self) -> BusState {
        self.state
    }

    /// Dismantle the engine and return the collaborators.
    ///
    /// Both lines are left driven low, matching the bus shutdown of the
    /// surrounding system.
    pub fn free(mut self) -> (SCL, SDA, DELAY) {
        self.sda.set_direction(Direction::Output);
        self.sda.drive(Level::Low);
        self.scl.set_direction(Direction::Output);
        self.scl.drive(Level::Low);
        (self.scl, self.sda, self.delay)
    }

    fn quantum(&mut self) {
        self.delay.delay_us(self.quantum_us);
    }

    fn check(&self, operation: Operation, expected: BusState) -> Result<(), Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::Sequence {
                state: self.state,
                operation,
            })
        }
    }
}
