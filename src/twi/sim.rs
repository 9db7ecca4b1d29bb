// Licensed under the Apache-2.0 license

//! Simulated TWI register file.
//!
//! [`SimulatedBus`] implements [`TwiRegisters`] without hardware. Writing the
//! interrupt flag to the control register "kicks" an operation exactly as on
//! the real controller; the simulation classifies it (start, address, data,
//! receive, stop), picks the status the controller would report, and raises
//! the flag after a configurable number of polls.
//!
//! Replies come from a scripted queue ([`SimulatedBus::reply`]). When the
//! queue is empty, an acknowledging bus answers every phase the way a
//! well-behaved peripheral would, and a scripted bus stalls: the flag is never
//! raised, which is what a disconnected bus looks like to the driver.
//!
//! Every register write is logged so tests can assert on the exact sequence
//! the driver produced.

use crate::twi::registers::{Register, TwiRegisters, TWEA, TWEN, TWINT, TWPS_MASK, TWSTA, TWSTO};
use crate::twi::status::{Status, STATUS_MASK};
use heapless::{Deque, Vec};

pub const LOG_CAPACITY: usize = 64;
pub const QUEUE_CAPACITY: usize = 16;

/// Operation started by a control-register write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    /// Address byte including the direction bit.
    Address(u8),
    Transmit(u8),
    Receive { ack: bool },
    Stop,
}

/// Status (and optionally the received byte) the controller reports for the
/// next kicked operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub data: Option<u8>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Writing,
    Reading,
}

#[derive(Copy, Clone, Debug)]
struct Pending {
    reply: Reply,
    polls_left: u32,
}

pub struct SimulatedBus {
    bit_rate: u8,
    status: u8,
    data: u8,
    control: u8,
    phase: Phase,
    acknowledge_all: bool,
    latency: u32,
    pending: Option<Pending>,
    replies: Deque<Reply, QUEUE_CAPACITY>,
    incoming: Deque<u8, QUEUE_CAPACITY>,
    writes: Vec<(Register, u8), LOG_CAPACITY>,
    events: Vec<BusEvent, LOG_CAPACITY>,
    data_reads: usize,
    control_polls: usize,
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBus {
    /// Bus that only answers scripted replies and stalls otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bit_rate: 0,
            status: Status::NO_INFO.code(),
            data: 0xFF,
            control: 0,
            phase: Phase::Idle,
            acknowledge_all: false,
            latency: 0,
            pending: None,
            replies: Deque::new(),
            incoming: Deque::new(),
            writes: Vec::new(),
            events: Vec::new(),
            data_reads: 0,
            control_polls: 0,
        }
    }

    /// Bus with a peripheral that acknowledges every phase.
    #[must_use]
    pub fn acknowledging() -> Self {
        Self {
            acknowledge_all: true,
            ..Self::new()
        }
    }

    /// Queue the status reported for the next kicked operation.
    ///
    /// # Panics
    ///
    /// More than [`QUEUE_CAPACITY`] replies pending.
    pub fn reply(&mut self, status: Status) {
        self.push_reply(Reply { status, data: None });
    }

    /// Queue a status together with the byte left in the data register.
    pub fn reply_with_data(&mut self, status: Status, data: u8) {
        self.push_reply(Reply {
            status,
            data: Some(data),
        });
    }

    /// Byte the acknowledging peripheral sends on the next read.
    ///
    /// # Panics
    ///
    /// More than [`QUEUE_CAPACITY`] bytes pending.
    pub fn send_from_peripheral(&mut self, byte: u8) {
        if self.incoming.push_back(byte).is_err() {
            full("peripheral byte queue", QUEUE_CAPACITY);
        }
    }

    /// Number of polls that see the flag clear before it is raised.
    pub fn set_latency(&mut self, polls: u32) {
        self.latency = polls;
    }

    /// Raise the flag after `polls` clear polls without starting an operation.
    pub fn raise_flag_after(&mut self, polls: u32) {
        self.pending = Some(Pending {
            reply: Reply {
                status: Status::from_register(self.status),
                data: None,
            },
            polls_left: polls,
        });
    }

    /// Current register value, without the side effects of a driver read.
    #[must_use]
    pub fn register(&self, register: Register) -> u8 {
        match register {
            Register::BitRate => self.bit_rate,
            Register::Status => self.status,
            Register::Data => self.data,
            Register::Control => self.control,
        }
    }

    #[must_use]
    pub fn writes(&self) -> &[(Register, u8)] {
        &self.writes
    }

    /// Last value the driver wrote to `register`.
    #[must_use]
    pub fn last_write(&self, register: Register) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(r, _)| *r == register)
            .map(|&(_, value)| value)
    }

    #[must_use]
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    #[must_use]
    pub fn data_reads(&self) -> usize {
        self.data_reads
    }

    #[must_use]
    pub fn control_polls(&self) -> usize {
        self.control_polls
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.events.clear();
        self.data_reads = 0;
        self.control_polls = 0;
    }

    fn push_reply(&mut self, reply: Reply) {
        if self.replies.push_back(reply).is_err() {
            full("reply queue", QUEUE_CAPACITY);
        }
    }

    fn kick(&mut self, control: u8) {
        // Writing one clears the flag; TWSTO self-clears once the stop is out.
        self.control = control & !(TWINT | TWSTO);
        self.pending = None;

        if control & TWEN == 0 {
            return;
        }

        let event = if control & TWSTO != 0 {
            BusEvent::Stop
        } else if control & TWSTA != 0 {
            BusEvent::Start
        } else {
            match self.phase {
                Phase::Started => BusEvent::Address(self.data),
                Phase::Reading => BusEvent::Receive {
                    ack: control & TWEA != 0,
                },
                Phase::Idle | Phase::Writing => BusEvent::Transmit(self.data),
            }
        };
        if self.events.push(event).is_err() {
            full("event log", LOG_CAPACITY);
        }

        let repeated = self.phase != Phase::Idle;
        self.phase = match event {
            BusEvent::Stop => Phase::Idle,
            BusEvent::Start => Phase::Started,
            BusEvent::Address(sla) if sla & 0x01 != 0 => Phase::Reading,
            BusEvent::Address(_) => Phase::Writing,
            BusEvent::Transmit(_) | BusEvent::Receive { .. } => self.phase,
        };

        // The controller does not raise the flag after a stop.
        if event == BusEvent::Stop {
            return;
        }

        let reply = match self.replies.pop_front() {
            Some(reply) => Some(reply),
            None if self.acknowledge_all => Some(self.acknowledge(event, repeated)),
            None => None,
        };
        self.pending = reply.map(|reply| Pending {
            reply,
            polls_left: self.latency,
        });
    }

    fn acknowledge(&mut self, event: BusEvent, repeated: bool) -> Reply {
        let status = match event {
            BusEvent::Start if repeated => Status::REP_START,
            BusEvent::Start => Status::START,
            BusEvent::Address(sla) if sla & 0x01 != 0 => Status::MR_SLA_ACK,
            BusEvent::Address(_) => Status::MT_SLA_ACK,
            BusEvent::Transmit(_) => Status::MT_DATA_ACK,
            BusEvent::Receive { ack: true } => Status::MR_DATA_ACK,
            BusEvent::Receive { ack: false } => Status::MR_DATA_NACK,
            BusEvent::Stop => Status::NO_INFO,
        };
        let data = match event {
            BusEvent::Receive { .. } => Some(self.incoming.pop_front().unwrap_or(0xFF)),
            _ => None,
        };
        Reply { status, data }
    }

    fn poll(&mut self) {
        self.control_polls += 1;
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return;
        }
        let reply = pending.reply;
        self.pending = None;
        self.control |= TWINT;
        self.status = (self.status & TWPS_MASK) | reply.status.code();
        if let Some(byte) = reply.data {
            self.data = byte;
        }
    }
}

/// Log and queue overflow; [`SimulatedBus::clear_log`] empties the logs.
#[cold]
fn full(what: &str, capacity: usize) -> ! {
    panic!("simulated bus {what} full ({capacity} entries)");
}

impl TwiRegisters for SimulatedBus {
    fn read(&mut self, register: Register) -> u8 {
        match register {
            Register::Control => self.poll(),
            Register::Data => self.data_reads += 1,
            Register::BitRate | Register::Status => {}
        }
        self.register(register)
    }

    fn write(&mut self, register: Register, value: u8) {
        if self.writes.push((register, value)).is_err() {
            full("write log", LOG_CAPACITY);
        }
        match register {
            Register::BitRate => self.bit_rate = value,
            Register::Status => self.status = (self.status & STATUS_MASK) | (value & TWPS_MASK),
            Register::Data => self.data = value,
            Register::Control if value & TWINT != 0 => self.kick(value),
            Register::Control => self.control = (self.control & TWINT) | value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_until_set(bus: &mut SimulatedBus, max: usize) -> Option<usize> {
        (1..=max).find(|_| bus.read(Register::Control) & TWINT != 0)
    }

    #[test]
    fn test_scripted_bus_stalls_without_reply() {
        let mut bus = SimulatedBus::new();
        bus.write(Register::Control, TWINT | TWSTA | TWEN);

        assert_eq!(poll_until_set(&mut bus, 100), None);
        assert_eq!(bus.events(), &[BusEvent::Start]);
    }

    #[test]
    fn test_latency_delays_flag() {
        let mut bus = SimulatedBus::new();
        bus.set_latency(3);
        bus.reply(Status::START);
        bus.write(Register::Control, TWINT | TWSTA | TWEN);

        assert_eq!(poll_until_set(&mut bus, 10), Some(4));
        assert_eq!(Status::from_register(bus.read(Register::Status)), Status::START);
    }

    #[test]
    fn test_acknowledging_bus_follows_phases() {
        let mut bus = SimulatedBus::acknowledging();
        bus.send_from_peripheral(0x5A);

        bus.write(Register::Control, TWINT | TWSTA | TWEN);
        poll_until_set(&mut bus, 1);
        assert_eq!(bus.register(Register::Status), Status::START.code());

        bus.write(Register::Data, (0x50 << 1) | 1);
        bus.write(Register::Control, TWINT | TWEN);
        poll_until_set(&mut bus, 1);
        assert_eq!(bus.register(Register::Status), Status::MR_SLA_ACK.code());

        bus.write(Register::Control, TWINT | TWEN);
        poll_until_set(&mut bus, 1);
        assert_eq!(bus.register(Register::Status), Status::MR_DATA_NACK.code());
        assert_eq!(bus.read(Register::Data), 0x5A);

        bus.write(Register::Control, TWINT | TWSTA | TWEN);
        poll_until_set(&mut bus, 1);
        assert_eq!(bus.register(Register::Status), Status::REP_START.code());

        bus.write(Register::Control, TWINT | TWSTO | TWEN);
        assert_eq!(poll_until_set(&mut bus, 5), None);
        assert_eq!(bus.register(Register::Control) & TWSTO, 0);

        assert_eq!(
            bus.events(),
            &[
                BusEvent::Start,
                BusEvent::Address(0xA1),
                BusEvent::Receive { ack: false },
                BusEvent::Start,
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_status_write_only_touches_prescaler_bits() {
        let mut bus = SimulatedBus::new();
        bus.write(Register::Status, 0xFF);
        assert_eq!(bus.register(Register::Status), Status::NO_INFO.code() | 0x03);
        bus.write(Register::Status, 0x01);
        assert_eq!(bus.register(Register::Status), Status::NO_INFO.code() | 0x01);
    }

    #[test]
    #[should_panic(expected = "simulated bus write log full")]
    fn test_write_log_overflow_panics() {
        let mut bus = SimulatedBus::new();
        for value in 0..=LOG_CAPACITY {
            bus.write(Register::BitRate, value as u8);
        }
    }

    #[test]
    #[should_panic(expected = "simulated bus reply queue full")]
    fn test_reply_queue_overflow_panics() {
        let mut bus = SimulatedBus::new();
        for _ in 0..=QUEUE_CAPACITY {
            bus.reply(Status::START);
        }
    }

    #[test]
    fn test_clear_log_frees_capacity() {
        let mut bus = SimulatedBus::new();
        for value in 0..LOG_CAPACITY {
            bus.write(Register::BitRate, value as u8);
        }
        bus.clear_log();
        bus.write(Register::BitRate, 0x48);
        assert_eq!(bus.writes(), &[(Register::BitRate, 0x48)]);
    }

    #[test]
    fn test_control_write_without_flag_does_not_kick() {
        let mut bus = SimulatedBus::acknowledging();
        bus.write(Register::Control, TWEN | TWEA);

        assert!(bus.events().is_empty());
        assert_eq!(bus.register(Register::Control), TWEN | TWEA);
        assert_eq!(bus.last_write(Register::Control), Some(TWEN | TWEA));
    }
}
