/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! ARM control block topology of the BCM2708 family (BCM2835/6/7).
//!
//! The basic bank owns 8 ARM-side lines (timer, mailbox, doorbells, GPU halts, access errors),
//! cascades into the two GPU banks at bits 8 and 9 and carries 11 shortcuts for commonly
//! used GPU lines at bits 10-20. Logical numbering is `bank << 5 | line`.

use crate::armctrl::{
    BankDescriptor, BankRegisters, ConfigError, Controller, ControllerBuilder, ShortcutTarget,
};

/// Cascade bit of the first GPU bank in the basic bank.
pub const BANK1_INDEX: u32 = 8;
/// Cascade bit of the second GPU bank in the basic bank.
pub const BANK2_INDEX: u32 = 9;

/// Offset of the FIQ control register from the ARM control block base.
pub const REG_FIQ_CONTROL: usize = 0x0c;

const BASIC_SOURCES: u32 = 0xff;
const SHORTCUT_MASK: u32 = 0x001f_fc00;

/// Targets of basic bank bits 10 to 20, in bit order.
const SHORTCUTS: [ShortcutTarget; 11] = [
    ShortcutTarget::new(BANK1_INDEX, 7),
    ShortcutTarget::new(BANK1_INDEX, 9),
    ShortcutTarget::new(BANK1_INDEX, 10),
    ShortcutTarget::new(BANK1_INDEX, 18),
    ShortcutTarget::new(BANK1_INDEX, 19),
    ShortcutTarget::new(BANK2_INDEX, 21),
    ShortcutTarget::new(BANK2_INDEX, 22),
    ShortcutTarget::new(BANK2_INDEX, 23),
    ShortcutTarget::new(BANK2_INDEX, 24),
    ShortcutTarget::new(BANK2_INDEX, 25),
    ShortcutTarget::new(BANK2_INDEX, 30),
];

/// Basic pending bank.
pub const fn basic(base: usize) -> BankDescriptor<'static> {
    BankDescriptor::new("armctrl-basic", BankRegisters::at(base, 0x00, 0x18, 0x24), 0)
        .source_mask(BASIC_SOURCES)
        .bank_mask(1 << BANK1_INDEX | 1 << BANK2_INDEX)
        .shortcuts(SHORTCUT_MASK, &SHORTCUTS)
        .fiq_base(64)
}

/// GPU interrupts 0 to 31.
pub const fn bank1(base: usize) -> BankDescriptor<'static> {
    BankDescriptor::new("armctrl-gpu1", BankRegisters::at(base, 0x04, 0x10, 0x1c), 32)
        .bank_index(BANK1_INDEX)
        .fiq_base(0)
}

/// GPU interrupts 32 to 63.
pub const fn bank2(base: usize) -> BankDescriptor<'static> {
    BankDescriptor::new("armctrl-gpu2", BankRegisters::at(base, 0x08, 0x14, 0x20), 64)
        .bank_index(BANK2_INDEX)
        .fiq_base(32)
}

/// Build the controller for an ARM control block mapped at `base`.
pub fn build<R>(base: usize, registers: R) -> Result<Controller<R>, ConfigError> {
    let mut builder = ControllerBuilder::new();
    builder.fiq_control(base + REG_FIQ_CONTROL);

    let root = builder.add_root(&basic(base))?;
    builder.add_child(root, &bank1(base))?;
    builder.add_child(root, &bank2(base))?;
    builder.build(registers)
}

/// Build the controller for the board this crate is compiled for.
///
/// # Safety
///
/// The ARM control block must be mapped 1:1 at its physical address.
#[cfg(any(feature = "rpi1", feature = "rpi3", feature = "rpi4"))]
pub unsafe fn new_controller() -> Result<Controller<crate::mmio::Mmio>, ConfigError> {
    build(
        super::BcmHost::get_armctrl_address(),
        crate::mmio::Mmio::new(),
    )
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
