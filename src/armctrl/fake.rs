/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Test model of the ARM control block: level-sensitive banks whose pending registers show
//! only enabled lines, plus a log of every register access.

use {
    super::{
        BankDescriptor, BankId, BankRegisters, Controller, ControllerBuilder, ShortcutTarget,
    },
    crate::{
        exception::asynchronous::{interface::IrqDispatch, IRQContext, IrqNumber},
        mmio::interface::RegisterAccess,
    },
    std::{cell::RefCell, collections::BTreeMap},
};

/// Register layout of the BCM ARM control block, relative to an arbitrary base.
pub const ROOT_REGS: BankRegisters = BankRegisters::at(0x1000, 0x00, 0x18, 0x24);
pub const BANK1_REGS: BankRegisters = BankRegisters::at(0x1000, 0x04, 0x10, 0x1c);
pub const BANK2_REGS: BankRegisters = BankRegisters::at(0x1000, 0x08, 0x14, 0x20);
pub const FIQ_CONTROL: usize = 0x100c;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Read(usize),
    Write(usize, u32),
}

struct FakeBank {
    registers: BankRegisters,
    raw: u32,
    /// Lines visible to the next read of the pending register only.
    transient: u32,
    enabled: u32,
}

/// Register bus backed by a software model.
///
/// Banks registered with [`FakeBus::add_bank`] behave like the hardware: reading the pending
/// register returns raw status filtered by the enable state, writing the enable or disable
/// register sets or clears enable bits. Any other address is plain memory.
pub struct FakeBus {
    banks: RefCell<Vec<FakeBank>>,
    memory: RefCell<BTreeMap<usize, u32>>,
    log: RefCell<Vec<Access>>,
}

impl FakeBus {
    pub fn new() -> Self {
        let bus = Self {
            banks: RefCell::new(Vec::new()),
            memory: RefCell::new(BTreeMap::new()),
            log: RefCell::new(Vec::new()),
        };
        for registers in [ROOT_REGS, BANK1_REGS, BANK2_REGS] {
            bus.add_bank(registers);
        }
        bus
    }

    /// Model a bank, all lines enabled.
    pub fn add_bank(&self, registers: BankRegisters) {
        self.banks.borrow_mut().push(FakeBank {
            registers,
            raw: 0,
            transient: 0,
            enabled: u32::MAX,
        });
    }

    fn with_bank<T>(&self, pending: usize, f: impl FnOnce(&mut FakeBank) -> T) -> T {
        let mut banks = self.banks.borrow_mut();
        let bank = banks
            .iter_mut()
            .find(|bank| bank.registers.pending == pending)
            .expect("bank is modelled");
        f(bank)
    }

    /// Assert lines of the bank whose pending register is at `pending`.
    pub fn raise(&self, pending: usize, bits: u32) {
        self.with_bank(pending, |bank| bank.raw |= bits);
    }

    /// Assert lines for exactly one read of the pending register.
    pub fn glitch(&self, pending: usize, bits: u32) {
        self.with_bank(pending, |bank| bank.transient |= bits);
    }

    /// Deassert lines.
    pub fn lower(&self, pending: usize, bits: u32) {
        self.with_bank(pending, |bank| bank.raw &= !bits);
    }

    pub fn enabled(&self, pending: usize) -> u32 {
        self.with_bank(pending, |bank| bank.enabled)
    }

    pub fn reads_of(&self, addr: usize) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|access| **access == Access::Read(addr))
            .count()
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|access| match *access {
                Access::Write(addr, value) => Some((addr, value)),
                Access::Read(_) => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }
}

impl RegisterAccess for FakeBus {
    fn read32(&self, addr: usize) -> u32 {
        self.log.borrow_mut().push(Access::Read(addr));
        let mut banks = self.banks.borrow_mut();
        if let Some(bank) = banks.iter_mut().find(|bank| bank.registers.pending == addr) {
            let status = (bank.raw | bank.transient) & bank.enabled;
            bank.transient = 0;
            return status;
        }
        self.memory.borrow().get(&addr).copied().unwrap_or(0)
    }

    fn write32(&self, addr: usize, value: u32) {
        self.log.borrow_mut().push(Access::Write(addr, value));
        let mut banks = self.banks.borrow_mut();
        for bank in banks.iter_mut() {
            if bank.registers.enable == addr {
                bank.enabled |= value;
                return;
            }
            if bank.registers.disable == addr {
                bank.enabled &= !value;
                return;
            }
        }
        self.memory.borrow_mut().insert(addr, value);
    }
}

/// What a device does to the bus when its handler runs.
#[derive(Debug, Copy, Clone)]
pub enum Effect {
    /// The device deasserts its line(s).
    Lower(usize, u32),
    /// Servicing this device makes another line assert.
    Raise(usize, u32),
}

/// Handler layer that logs every dispatch and applies the configured device effects.
pub struct Recorder<'bus> {
    bus: &'bus FakeBus,
    effects: Vec<(IrqNumber, Effect)>,
    seen: RefCell<Vec<IrqNumber>>,
}

impl<'bus> Recorder<'bus> {
    pub fn new(bus: &'bus FakeBus) -> Self {
        Self {
            bus,
            effects: Vec::new(),
            seen: RefCell::new(Vec::new()),
        }
    }

    /// Dispatching `irq` applies `effect`.
    pub fn on(mut self, irq: u32, effect: Effect) -> Self {
        self.effects.push((IrqNumber::new(irq), effect));
        self
    }

    pub fn seen(&self) -> Vec<u32> {
        self.seen.borrow().iter().map(|irq| irq.get()).collect()
    }
}

impl IrqDispatch for Recorder<'_> {
    fn dispatch(&self, irq: IrqNumber, _ctx: &IRQContext<'_>) {
        self.seen.borrow_mut().push(irq);
        for (_, effect) in self.effects.iter().filter(|(target, _)| *target == irq) {
            match *effect {
                Effect::Lower(pending, bits) => self.bus.lower(pending, bits),
                Effect::Raise(pending, bits) => self.bus.raise(pending, bits),
            }
        }
    }
}

/// Three bank tree: root lines 0-7, banks cascaded at root bits 8 and 9, root bit 10 a
/// shortcut to line 2 of the bank at index 8. Logical numbering `bank << 5 | line`.
pub struct Tree<'bus> {
    pub controller: Controller<&'bus FakeBus>,
    pub root: BankId,
    pub bank1: BankId,
    pub bank2: BankId,
}

pub const SHORTCUT_MAP: [ShortcutTarget; 1] = [ShortcutTarget::new(8, 2)];

pub fn scenario_tree(bus: &FakeBus) -> Tree<'_> {
    let mut builder = ControllerBuilder::new();
    builder.fiq_control(FIQ_CONTROL);

    let root = builder
        .add_root(
            &BankDescriptor::new("root", ROOT_REGS, 0)
                .source_mask(0xff)
                .bank_mask(1 << 8 | 1 << 9)
                .shortcuts(1 << 10, &SHORTCUT_MAP)
                .fiq_base(64),
        )
        .expect("valid root");
    let bank1 = builder
        .add_child(
            root,
            &BankDescriptor::new("bank1", BANK1_REGS, 32)
                .bank_index(8)
                .fiq_base(0),
        )
        .expect("valid bank1");
    let bank2 = builder
        .add_child(
            root,
            &BankDescriptor::new("bank2", BANK2_REGS, 64).bank_index(9),
        )
        .expect("valid bank2");

    Tree {
        controller: builder.build(bus).expect("valid tree"),
        root,
        bank1,
        bank2,
    }
}
