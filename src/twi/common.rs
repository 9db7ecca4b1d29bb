// Licensed under the Apache-2.0 license

//! Common types for the TWI master driver.
//!
//! Bus speed and prescaler selection, transfer direction, acknowledge policy,
//! wait deadlines, and the driver configuration with its builder.

use fugit::HertzU32;

/// Reference clock of a stock 16 MHz ATmega board.
pub const DEFAULT_REFERENCE_CLOCK: HertzU32 = HertzU32::from_raw(16_000_000);

/// Poll budget used by [`receive_byte`](super::TwiMasterCore::receive_byte).
pub const DEFAULT_RECEIVE_BUDGET: u8 = 60;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum BusSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl BusSpeed {
    #[must_use]
    pub const fn frequency(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// Multiplier applied to the bit-rate divisor.
///
/// The discriminant is the selector written into the two prescaler bits of
/// the status register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Prescaler {
    X1 = 0,
    X4 = 1,
    X16 = 2,
    X64 = 3,
}

impl Prescaler {
    #[must_use]
    pub const fn selector(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn multiplier(self) -> u32 {
        match self {
            Prescaler::X1 => 1,
            Prescaler::X4 => 4,
            Prescaler::X16 => 16,
            Prescaler::X64 => 64,
        }
    }

    /// Decode the two prescaler bits; the upper bits are ignored.
    #[must_use]
    pub const fn from_selector(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Prescaler::X1,
            1 => Prescaler::X4,
            2 => Prescaler::X16,
            _ => Prescaler::X64,
        }
    }
}

/// R/W bit of the address phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Write = 0,
    Read = 1,
}

/// What the master drives on the acknowledge slot after receiving a byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AckPolicy {
    /// More bytes are wanted.
    SendAck,
    /// Last byte of the read.
    SendNack,
}

/// How long a primitive may spin on the interrupt flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Deadline {
    /// Spin until the hardware raises the flag.
    Never,
    /// Give up after this many polls of the control register.
    Polls(u32),
}

/// Outcome of a bounded wait on the interrupt flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The requested SCL rate needs a divisor outside `0..=255`.
    FrequencyOutOfRange,
    /// A zero SCL frequency was requested.
    ZeroFrequency,
}

/// Bit-rate register value for `frequency` at `reference_clock`.
///
/// `(reference_clock / frequency - 16) / (2 * multiplier)` evaluated with a
/// signed intermediate and truncated to eight bits. Combinations outside the
/// register range wrap; use [`try_divisor`] when that matters. A zero
/// frequency yields zero.
#[must_use]
pub fn divisor(reference_clock: HertzU32, frequency: HertzU32, prescaler: Prescaler) -> u8 {
    match raw_divisor(reference_clock, frequency, prescaler) {
        Some(value) => value as u8,
        None => 0,
    }
}

/// Checked variant of [`divisor`].
///
/// # Errors
///
/// Returns [`ConfigurationError`] when the frequency is zero or the divisor
/// does not fit the bit-rate register.
pub fn try_divisor(
    reference_clock: HertzU32,
    frequency: HertzU32,
    prescaler: Prescaler,
) -> Result<u8, ConfigurationError> {
    let value =
        raw_divisor(reference_clock, frequency, prescaler).ok_or(ConfigurationError::ZeroFrequency)?;
    u8::try_from(value).map_err(|_| ConfigurationError::FrequencyOutOfRange)
}

/// SCL rate produced by a divisor and prescaler: `f / (16 + 2 * TWBR * mult)`.
#[must_use]
pub fn scl_frequency(reference_clock: HertzU32, divisor: u8, prescaler: Prescaler) -> HertzU32 {
    let cycles = 16 + 2 * u32::from(divisor) * prescaler.multiplier();
    HertzU32::from_raw(reference_clock.raw() / cycles)
}

fn raw_divisor(reference_clock: HertzU32, frequency: HertzU32, prescaler: Prescaler) -> Option<i64> {
    let ratio = reference_clock.raw().checked_div(frequency.raw())?;
    Some((i64::from(ratio) - 16) / (2 * i64::from(prescaler.multiplier())))
}

pub struct TwiConfig {
    pub reference_clock: HertzU32,
    pub speed: BusSpeed,
    pub prescaler: Prescaler,
    pub receive_budget: u8,
    pub phase_deadline: Deadline,
}

impl Default for TwiConfig {
    fn default() -> Self {
        TwiConfigBuilder::new().build()
    }
}

impl TwiConfig {
    /// Divisor this configuration programs into the bit-rate register.
    #[must_use]
    pub fn divisor(&self) -> u8 {
        divisor(self.reference_clock, self.speed.frequency(), self.prescaler)
    }
}

pub struct TwiConfigBuilder {
    reference_clock: HertzU32,
    speed: BusSpeed,
    prescaler: Prescaler,
    receive_budget: u8,
    phase_deadline: Deadline,
}

impl Default for TwiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TwiConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reference_clock: DEFAULT_REFERENCE_CLOCK,
            speed: BusSpeed::Standard,
            prescaler: Prescaler::X1,
            receive_budget: DEFAULT_RECEIVE_BUDGET,
            phase_deadline: Deadline::Never,
        }
    }
    #[must_use]
    pub fn reference_clock(mut self, clock: HertzU32) -> Self {
        self.reference_clock = clock;
        self
    }
    #[must_use]
    pub fn speed(mut self, speed: BusSpeed) -> Self {
        self.speed = speed;
        self
    }
    #[must_use]
    pub fn prescaler(mut self, prescaler: Prescaler) -> Self {
        self.prescaler = prescaler;
        self
    }
    #[must_use]
    pub fn receive_budget(mut self, polls: u8) -> Self {
        self.receive_budget = polls;
        self
    }
    /// Bound Start, Address and Transmit waits. Unbounded by default.
    #[must_use]
    pub fn phase_deadline(mut self, deadline: Deadline) -> Self {
        self.phase_deadline = deadline;
        self
    }
    #[must_use]
    pub fn build(self) -> TwiConfig {
        TwiConfig {
            reference_clock: self.reference_clock,
            speed: self.speed,
            prescaler: self.prescaler,
            receive_budget: self.receive_budget,
            phase_deadline: self.phase_deadline,
        }
    }
}
