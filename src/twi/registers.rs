// Licensed under the Apache-2.0 license

//! Register access for the TWI controller.
//!
//! The driver never dereferences hardware addresses itself. Every access goes
//! through [`TwiRegisters`], so the same driver code runs against the
//! memory-mapped peripheral ([`Mmio`]) or against a simulated register file
//! in tests.

use core::ptr::{read_volatile, write_volatile};

/// TWI Interrupt Flag. Set by hardware when an operation completes; written
/// as one to clear it and start the next operation.
pub const TWINT: u8 = 0x80;
/// TWI Enable Acknowledge.
pub const TWEA: u8 = 0x40;
/// TWI START Condition.
pub const TWSTA: u8 = 0x20;
/// TWI STOP Condition.
pub const TWSTO: u8 = 0x10;
/// TWI Enable.
pub const TWEN: u8 = 0x04;
/// Prescaler bits of the status register.
pub const TWPS_MASK: u8 = 0x03;

/// Named registers of one TWI controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    /// `TWBR`: clock divisor.
    BitRate,
    /// `TWSR`: status field (bits 7..3) and prescaler selector (bits 1..0).
    Status,
    /// `TWDR`: byte being shifted out or in.
    Data,
    /// `TWCR`: interrupt flag and control bits.
    Control,
}

/// Byte-wide access to the controller registers.
pub trait TwiRegisters {
    fn read(&mut self, register: Register) -> u8;

    fn write(&mut self, register: Register, value: u8);

    /// Read-modify-write. Not atomic.
    fn modify<F>(&mut self, register: Register, f: F)
    where
        F: FnOnce(u8) -> u8,
    {
        let value = self.read(register);
        self.write(register, f(value));
    }
}

impl<T: TwiRegisters + ?Sized> TwiRegisters for &mut T {
    fn read(&mut self, register: Register) -> u8 {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u8) {
        (**self).write(register, value);
    }
}

/// Data-space addresses of the TWI registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterMap {
    pub bit_rate: usize,
    pub status: usize,
    pub data: usize,
    pub control: usize,
}

impl RegisterMap {
    /// ATmega48/88/168/328 family.
    pub const ATMEGA328P: RegisterMap = RegisterMap {
        bit_rate: 0xB8,
        status: 0xB9,
        data: 0xBB,
        control: 0xBC,
    };

    /// ATmega64/128 family.
    pub const ATMEGA128: RegisterMap = RegisterMap {
        bit_rate: 0x70,
        status: 0x71,
        data: 0x73,
        control: 0x74,
    };

    #[must_use]
    pub const fn address(&self, register: Register) -> usize {
        match register {
            Register::BitRate => self.bit_rate,
            Register::Status => self.status,
            Register::Data => self.data,
            Register::Control => self.control,
        }
    }
}

/// Volatile access to the memory-mapped controller.
pub struct Mmio {
    map: RegisterMap,
}

impl Mmio {
    /// # Safety
    ///
    /// `map` must describe the TWI registers of the running device, and no
    /// other code may access them while this value exists.
    #[must_use]
    pub const unsafe fn new(map: RegisterMap) -> Self {
        Self { map }
    }

    #[must_use]
    pub const fn map(&self) -> RegisterMap {
        self.map
    }
}

impl TwiRegisters for Mmio {
    fn read(&mut self, register: Register) -> u8 {
        let address = self.map.address(register) as *const u8;
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        unsafe { read_volatile(address) }
    }

    fn write(&mut self, register: Register, value: u8) {
        let address = self.map.address(register) as *mut u8;
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        unsafe { write_volatile(address, value) }
    }
}
