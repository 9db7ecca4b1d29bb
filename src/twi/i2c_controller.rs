// Licensed under the Apache-2.0 license

//! embedded-hal I2C controller built from the TWI master primitives.
//!
//! [`TwiController`] turns the hand-sequenced primitives into the
//! `embedded_hal::i2c::I2c` transaction contract so device drivers written
//! against embedded-hal run on the polled controller. Bytes stream straight
//! from and into the caller's buffers, nothing is retried, and a stop
//! condition is issued on every exit path.

use crate::common::{Logger, NoOpLogger};
use crate::twi::common::{AckPolicy, Direction};
use crate::twi::status::Error;
use crate::twi::traits::TwiMasterCore;
use embedded_hal::i2c::{Operation, SevenBitAddress};

pub struct TwiController<H: TwiMasterCore, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub logger: L,
}

impl<H: TwiMasterCore> TwiController<H, NoOpLogger> {
    pub fn new(hardware: H) -> Self {
        Self {
            hardware,
            logger: NoOpLogger,
        }
    }
}

impl<H: TwiMasterCore, L: Logger> TwiController<H, L> {
    pub fn with_logger(hardware: H, logger: L) -> Self {
        Self { hardware, logger }
    }

    fn run(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Error> {
        let mut current: Option<Direction> = None;
        let mut operations = operations.iter_mut();

        while let Some(operation) = operations.next() {
            // Adjacent reads are merged, so only the last byte before a
            // direction change or the stop is NACKed. Empty reads carry no
            // byte to acknowledge.
            let read_follows = operations
                .as_slice()
                .iter()
                .find(|next| !matches!(next, Operation::Read(buffer) if buffer.is_empty()))
                .is_some_and(|next| matches!(next, Operation::Read(_)));

            match operation {
                Operation::Write(bytes) => {
                    self.address_phase(&mut current, address, Direction::Write)?;
                    for &byte in bytes.iter() {
                        self.hardware.transmit_byte(byte)?;
                    }
                }
                Operation::Read(buffer) => {
                    self.address_phase(&mut current, address, Direction::Read)?;
                    let last = buffer.len().saturating_sub(1);
                    for (index, slot) in buffer.iter_mut().enumerate() {
                        let ack = if index == last && !read_follows {
                            AckPolicy::SendNack
                        } else {
                            AckPolicy::SendAck
                        };
                        *slot = self.hardware.receive_byte(ack)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// (Repeated) start plus address, unless already addressed in `direction`.
    fn address_phase(
        &mut self,
        current: &mut Option<Direction>,
        address: u8,
        direction: Direction,
    ) -> Result<(), Error> {
        if *current == Some(direction) {
            return Ok(());
        }
        self.hardware.start()?;
        self.hardware.transmit_address(address, direction)?;
        *current = Some(direction);
        Ok(())
    }
}

impl<H: TwiMasterCore, L: Logger> embedded_hal::i2c::ErrorType for TwiController<H, L> {
    type Error = Error;
}

impl<H: TwiMasterCore, L: Logger> embedded_hal::i2c::I2c for TwiController<H, L> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let result = self.run(address, operations);
        self.hardware.stop();
        if let Err(error) = result {
            self.logger
                .error(format_args!("transaction with 0x{address:02x} failed: {error}"));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twi::common::TwiConfig;
    use crate::twi::master::TwiMaster;
    use crate::twi::sim::{BusEvent, SimulatedBus};
    use crate::twi::status::Status;
    use embedded_hal::i2c::{ErrorKind, I2c, NoAcknowledgeSource};

    fn controller(bus: &mut SimulatedBus) -> TwiController<TwiMaster<&mut SimulatedBus>> {
        TwiController::new(TwiMaster::new(bus, TwiConfig::default()))
    }

    #[test]
    fn test_write() {
        let mut bus = SimulatedBus::acknowledging();
        assert_eq!(controller(&mut bus).write(0x50, &[0x01, 0x02]), Ok(()));
        assert_eq!(
            bus.events(),
            &[
                BusEvent::Start,
                BusEvent::Address(0xA0),
                BusEvent::Transmit(0x01),
                BusEvent::Transmit(0x02),
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_read_nacks_last_byte() {
        let mut bus = SimulatedBus::acknowledging();
        for byte in [0x10, 0x20, 0x30] {
            bus.send_from_peripheral(byte);
        }
        let mut buffer = [0u8; 3];
        assert_eq!(controller(&mut bus).read(0x48, &mut buffer), Ok(()));

        assert_eq!(buffer, [0x10, 0x20, 0x30]);
        assert_eq!(
            bus.events(),
            &[
                BusEvent::Start,
                BusEvent::Address(0x91),
                BusEvent::Receive { ack: true },
                BusEvent::Receive { ack: true },
                BusEvent::Receive { ack: false },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_write_read_uses_repeated_start() {
        let mut bus = SimulatedBus::acknowledging();
        bus.send_from_peripheral(0xBE);
        bus.send_from_peripheral(0xEF);
        let mut buffer = [0u8; 2];
        assert_eq!(
            controller(&mut bus).write_read(0x68, &[0x75], &mut buffer),
            Ok(())
        );

        assert_eq!(buffer, [0xBE, 0xEF]);
        assert_eq!(
            bus.events(),
            &[
                BusEvent::Start,
                BusEvent::Address(0xD0),
                BusEvent::Transmit(0x75),
                BusEvent::Start,
                BusEvent::Address(0xD1),
                BusEvent::Receive { ack: true },
                BusEvent::Receive { ack: false },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_transaction_merges_adjacent_operations() {
        let mut bus = SimulatedBus::acknowledging();
        bus.send_from_peripheral(0x01);
        bus.send_from_peripheral(0x02);
        let mut first = [0u8; 1];
        let mut second = [0u8; 1];
        let mut operations = [
            Operation::Write(&[0xAA]),
            Operation::Write(&[0xBB]),
            Operation::Read(&mut first),
            Operation::Read(&mut second),
        ];
        assert_eq!(controller(&mut bus).transaction(0x20, &mut operations), Ok(()));

        assert_eq!((first, second), ([0x01], [0x02]));
        assert_eq!(
            bus.events(),
            &[
                BusEvent::Start,
                BusEvent::Address(0x40),
                BusEvent::Transmit(0xAA),
                BusEvent::Transmit(0xBB),
                BusEvent::Start,
                BusEvent::Address(0x41),
                BusEvent::Receive { ack: true },
                BusEvent::Receive { ack: false },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_trailing_empty_read_keeps_final_nack() {
        let mut bus = SimulatedBus::acknowledging();
        bus.send_from_peripheral(0x11);
        bus.send_from_peripheral(0x22);
        let mut buffer = [0u8; 2];
        let mut empty = [0u8; 0];
        let mut operations = [Operation::Read(&mut buffer), Operation::Read(&mut empty)];
        assert_eq!(controller(&mut bus).transaction(0x50, &mut operations), Ok(()));

        assert_eq!(buffer, [0x11, 0x22]);
        assert_eq!(
            bus.events(),
            &[
                BusEvent::Start,
                BusEvent::Address(0xA1),
                BusEvent::Receive { ack: true },
                BusEvent::Receive { ack: false },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_empty_read_between_reads_is_skipped() {
        let mut bus = SimulatedBus::acknowledging();
        bus.send_from_peripheral(0x01);
        bus.send_from_peripheral(0x02);
        let mut first = [0u8; 1];
        let mut empty = [0u8; 0];
        let mut second = [0u8; 1];
        let mut operations = [
            Operation::Read(&mut first),
            Operation::Read(&mut empty),
            Operation::Read(&mut second),
        ];
        assert_eq!(controller(&mut bus).transaction(0x50, &mut operations), Ok(()));

        assert_eq!((first, second), ([0x01], [0x02]));
        assert_eq!(
            bus.events(),
            &[
                BusEvent::Start,
                BusEvent::Address(0xA1),
                BusEvent::Receive { ack: true },
                BusEvent::Receive { ack: false },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_empty_write_probes_address() {
        let mut bus = SimulatedBus::acknowledging();
        assert_eq!(controller(&mut bus).write(0x3C, &[]), Ok(()));
        assert_eq!(
            bus.events(),
            &[BusEvent::Start, BusEvent::Address(0x78), BusEvent::Stop]
        );
    }

    #[test]
    fn test_address_nack_still_stops() {
        let mut bus = SimulatedBus::new();
        bus.reply(Status::START);
        bus.reply(Status::MT_SLA_NACK);

        let error = controller(&mut bus).write(0x50, &[0x01]).unwrap_err();

        assert_eq!(error, Error::UnexpectedStatus(Status::MT_SLA_NACK));
        assert_eq!(
            embedded_hal::i2c::Error::kind(&error),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            bus.events(),
            &[BusEvent::Start, BusEvent::Address(0xA0), BusEvent::Stop]
        );
    }

    #[test]
    fn test_receive_timeout_still_stops() {
        let mut bus = SimulatedBus::new();
        bus.reply(Status::START);
        bus.reply(Status::MR_SLA_ACK);

        let mut buffer = [0u8; 2];
        assert_eq!(
            controller(&mut bus).read(0x50, &mut buffer),
            Err(Error::Timeout)
        );
        assert_eq!(bus.events().last(), Some(&BusEvent::Stop));
        assert_eq!(bus.data_reads(), 0);
    }
}
