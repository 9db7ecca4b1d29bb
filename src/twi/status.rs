// Licensed under the Apache-2.0 license

//! Hardware status codes, the driver error type, and the 8-bit status-code
//! domain used by callers that predate [`Error`].

use core::fmt;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Mask selecting the status field of the status register.
pub const STATUS_MASK: u8 = 0xF8;

/// Protocol state reported by the controller after each operation.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Status(u8);

impl Status {
    pub const BUS_ERROR: Status = Status(0x00);
    pub const START: Status = Status(0x08);
    pub const REP_START: Status = Status(0x10);
    pub const MT_SLA_ACK: Status = Status(0x18);
    pub const MT_SLA_NACK: Status = Status(0x20);
    pub const MT_DATA_ACK: Status = Status(0x28);
    pub const MT_DATA_NACK: Status = Status(0x30);
    pub const ARB_LOST: Status = Status(0x38);
    pub const MR_SLA_ACK: Status = Status(0x40);
    pub const MR_SLA_NACK: Status = Status(0x48);
    pub const MR_DATA_ACK: Status = Status(0x50);
    pub const MR_DATA_NACK: Status = Status(0x58);
    pub const NO_INFO: Status = Status(0xF8);

    /// Extract the status field from a raw status register value.
    #[must_use]
    pub const fn from_register(value: u8) -> Self {
        Status(value & STATUS_MASK)
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Status::BUS_ERROR => "bus error",
            Status::START => "start sent",
            Status::REP_START => "repeated start sent",
            Status::MT_SLA_ACK => "SLA+W acked",
            Status::MT_SLA_NACK => "SLA+W nacked",
            Status::MT_DATA_ACK => "data sent, acked",
            Status::MT_DATA_NACK => "data sent, nacked",
            Status::ARB_LOST => "arbitration lost",
            Status::MR_SLA_ACK => "SLA+R acked",
            Status::MR_SLA_NACK => "SLA+R nacked",
            Status::MR_DATA_ACK => "data received, acked",
            Status::MR_DATA_NACK => "data received, nacked",
            Status::NO_INFO => "no state information",
            _ => return None,
        })
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Status(0x{:02x}: {name})", self.0),
            None => write!(f, "Status(0x{:02x})", self.0),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Why a primitive did not complete.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The interrupt flag was not observed before the deadline expired.
    Timeout,
    /// The controller reached a state other than the one the phase expects.
    UnexpectedStatus(Status),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => f.write_str("bus did not become ready"),
            Error::UnexpectedStatus(status) => write!(f, "unexpected bus status {status:?}"),
        }
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match *self {
            Error::UnexpectedStatus(Status::MT_SLA_NACK | Status::MR_SLA_NACK) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            Error::UnexpectedStatus(Status::MT_DATA_NACK) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            Error::UnexpectedStatus(Status::ARB_LOST) => ErrorKind::ArbitrationLoss,
            Error::UnexpectedStatus(Status::BUS_ERROR) => ErrorKind::Bus,
            Error::UnexpectedStatus(_) | Error::Timeout => ErrorKind::Other,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Single-byte status domain: a success sentinel, two driver sentinels, or a
/// raw hardware status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusCode(pub u8);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0xFF);
    pub const BUS_DISCONNECTED: StatusCode = StatusCode(0xD0);
    pub const TRANSMISSION_ERROR: StatusCode = StatusCode(0xD1);

    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }

    /// Code for a Start, Address or Transmit result.
    ///
    /// Unexpected statuses pass through verbatim.
    #[must_use]
    pub fn from_phase(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self::OK,
            Err(error) => error.into(),
        }
    }

    /// Byte-or-status for a Receive result.
    ///
    /// Unexpected statuses collapse to [`StatusCode::TRANSMISSION_ERROR`].
    /// Received bytes share the channel with the sentinels, so a byte equal
    /// to one of them cannot be told apart from it.
    #[must_use]
    pub fn from_receive(result: Result<u8, Error>) -> Self {
        match result {
            Ok(byte) => StatusCode(byte),
            Err(Error::Timeout) => Self::BUS_DISCONNECTED,
            Err(Error::UnexpectedStatus(_)) => Self::TRANSMISSION_ERROR,
        }
    }
}

impl From<Error> for StatusCode {
    fn from(error: Error) -> Self {
        match error {
            Error::Timeout => StatusCode::BUS_DISCONNECTED,
            Error::UnexpectedStatus(status) => StatusCode(status.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::Error as _;

    #[test]
    fn test_status_masks_prescaler_bits() {
        assert_eq!(Status::from_register(0x08 | 0x03), Status::START);
        assert_eq!(Status::from_register(0x5A), Status::MR_DATA_NACK);
    }

    #[test]
    fn test_status_debug_names_known_codes() {
        assert_eq!(format!("{:?}", Status::ARB_LOST), "Status(0x38: arbitration lost)");
        assert_eq!(format!("{:?}", Status::from_register(0xA8)), "Status(0xa8)");
        assert_eq!(format!("{}", Status::MT_SLA_NACK), "0x20");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::UnexpectedStatus(Status::MT_SLA_NACK).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            Error::UnexpectedStatus(Status::MR_SLA_NACK).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            Error::UnexpectedStatus(Status::MT_DATA_NACK).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
        assert_eq!(
            Error::UnexpectedStatus(Status::ARB_LOST).kind(),
            ErrorKind::ArbitrationLoss
        );
        assert_eq!(Error::UnexpectedStatus(Status::BUS_ERROR).kind(), ErrorKind::Bus);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Other);
        assert_eq!(Error::UnexpectedStatus(Status::NO_INFO).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_status_code_for_phases() {
        assert_eq!(StatusCode::from_phase(Ok(())), StatusCode::OK);
        assert!(StatusCode::from_phase(Ok(())).is_ok());
        assert_eq!(
            StatusCode::from_phase(Err(Error::UnexpectedStatus(Status::MT_SLA_NACK))),
            StatusCode(0x20)
        );
        assert_eq!(
            StatusCode::from_phase(Err(Error::Timeout)),
            StatusCode::BUS_DISCONNECTED
        );
    }

    #[test]
    fn test_status_code_for_receive() {
        assert_eq!(StatusCode::from_receive(Ok(0x42)), StatusCode(0x42));
        assert_eq!(
            StatusCode::from_receive(Err(Error::Timeout)),
            StatusCode::BUS_DISCONNECTED
        );
        assert_eq!(
            StatusCode::from_receive(Err(Error::UnexpectedStatus(Status::ARB_LOST))),
            StatusCode::TRANSMISSION_ERROR
        );
    }
}
