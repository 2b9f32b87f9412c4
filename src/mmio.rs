/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Raw 32-bit register access used by the interrupt controller.
//!
//! Bank registers of the ARM control block are not laid out as one contiguous block per bank
//! (the basic bank's enable register sits after both peripheral banks' ones), so the driver
//! addresses every register individually instead of through a `register_structs!` block.

use tock_registers::{
    interfaces::{Readable, Writeable},
    registers::{ReadOnly, WriteOnly},
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Register access interfaces.
pub mod interface {
    /// Access to device registers by address.
    ///
    /// Relaxed ordering is enough for the interrupt controller: correctness comes from
    /// re-reading status registers, not from ordering between accesses.
    pub trait RegisterAccess {
        /// Read the 32-bit register at `addr`.
        fn read32(&self, addr: usize) -> u32;

        /// Write `value` to the 32-bit register at `addr`.
        fn write32(&self, addr: usize, value: u32);
    }
}

/// Volatile access to memory-mapped device registers.
#[derive(Debug, Copy, Clone)]
pub struct Mmio {
    _private: (),
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl Mmio {
    /// Create an instance.
    ///
    /// # Safety
    ///
    /// Every address later passed to [`interface::RegisterAccess`] methods must be a mapped,
    /// 4-byte aligned device register. No checks are done.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl interface::RegisterAccess for Mmio {
    fn read32(&self, addr: usize) -> u32 {
        let register = unsafe { &*(addr as *const ReadOnly<u32>) };
        register.get()
    }

    fn write32(&self, addr: usize, value: u32) {
        let register = unsafe { &*(addr as *const WriteOnly<u32>) };
        register.set(value)
    }
}

impl<T> interface::RegisterAccess for &T
where
    T: interface::RegisterAccess + ?Sized,
{
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
