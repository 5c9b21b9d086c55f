//! Line-level control of the two bus signals.

use embedded_hal::digital::{InputPin, OutputPin};

/// Electrical level of a bus line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Drive direction of a bus line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// The line is released; a peripheral (or the pull-up) sets its level.
    Input,
    /// The engine is the electrical source of the line.
    Output,
}

/// A single bidirectional digital line (the clock or the data signal).
///
/// The engine owns one handle per line for its whole lifetime and assumes
/// nothing else drives them concurrently.
pub trait Line {
    /// Reconfigure the line. Must take effect before the next level
    /// operation.
    fn set_direction(&mut self, direction: Direction);

    /// Set the driven level. Only meaningful in output direction.
    fn drive(&mut self, level: Level);

    /// Read the instantaneous level of the line. Valid in either direction;
    /// the direction determines who is the electrical source.
    fn sample(&mut self) -> Level;
}

/// Adapter for a real pin configured as open-drain.
///
/// On an open-drain line, releasing the pin and driving it high are the same
/// operation: the bus pull-up floats the line and any party may still pull
/// it low. Pin errors are discarded; GPIO writes on the supported targets
/// are infallible.
///
/// # Note
/// The pin must be configured as open-drain (with an external or internal
/// pull-up) before it is handed to the adapter.
pub struct OpenDrain<P> {
    pin: P,
}

impl<P> OpenDrain<P>
where
    P: OutputPin + InputPin,
{
    /// Wrap a pin for use as a bus line.
    ///
    /// # Args
    /// * `pin` - The open-drain pin bonded to the line.
    pub fn new(pin: P) -> Self {
        OpenDrain { pin }
    }

    /// Release the underlying pin.
    pub fn free(self) -> P {
        self.pin
    }
}

impl<P> Line for OpenDrain<P>
where
    P: OutputPin + InputPin,
{
    fn set_direction(&mut self, direction: Direction) {
        if direction == Direction::Input {
            self.pin.set_high().ok();
        }
    }

    fn drive(&mut self, level: Level) {
        match level {
            Level::Low => self.pin.set_low().ok(),
            Level::High => self.pin.set_high().ok(),
        };
    }

    fn sample(&mut self) -> Level {
        if let Ok(true) = self.pin.is_low() {
            Level::Low
        } else {
            Level::High
        }
    }
}
