/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Cascaded ARM control block interrupt controller.
//!
//! The controller is a tree of banks. Each bank has a pending, an enable and a disable
//! register, and every bit of its pending word is one of:
//!
//! * a source: an interrupt line physically owned by this bank;
//! * a shortcut: an alias of a line owned by a child bank, reported here without the child's
//!   cascade bit being set;
//! * a cascade bit: "some line in this child bank is pending, go read its register".
//!
//! Quirks of the hardware this models:
//!
//! 1. A line that has a shortcut sets the shortcut bit in the parent and its own bit in the
//!    child's pending register, but not the parent's cascade bit for that child.
//! 2. Cascade bits can not be masked, they follow the child's enabled pending lines.
//! 3. Shortcut lines can only be (un)masked in their own bank; writing the parent's
//!    enable/disable registers has no effect on them.
//!
//! The tree is described with [`BankDescriptor`]s, validated and linked by
//! [`ControllerBuilder`] and then frozen into a [`Controller`].

use {
    crate::exception::asynchronous::IrqNumber,
    bit_field::BitField,
    static_assertions::const_assert,
};

pub mod builder;
pub mod dispatch;
pub mod fiq;
pub mod mask;
pub mod topology;

#[cfg(test)]
pub(crate) mod fake;

pub use {
    builder::{ConfigError, ControllerBuilder},
    dispatch::DispatchError,
    fiq::FiqError,
    mask::MaskError,
    topology::{BankDescriptor, BankRegisters, ShortcutTarget},
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Number of bits, and thus lines, in one bank register.
pub const IRQS_PER_BANK: u32 = 32;

/// Capacity of the bank arena of one controller.
pub const MAX_BANKS: usize = 8;

const_assert!(MAX_BANKS > 0);
// Recursion depth of the dispatch engine is bounded by the number of banks.
const_assert!(MAX_BANKS <= IRQS_PER_BANK as usize);

/// Position of a bank in the controller's bank arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BankId(usize);

/// Physical position of an interrupt: the bank owning it and its bit in that bank.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IrqLocation {
    pub bank: BankId,
    pub bit: u32,
}

/// A validated, linked and frozen bank tree together with its register accessor.
///
/// Read-only after construction; shared between interrupt and thread context without locking.
pub struct Controller<R> {
    registers: R,
    banks: [Bank; MAX_BANKS],
    count: usize,
    root: BankId,
    fiq: Option<fiq::FiqRouter>,
}

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// Decoded shortcut: bit `i` of the owning bank aliases line `bit` of child bank `bank`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Shortcut {
    pub bank: u32,
    pub bit: u32,
    /// Arena position of the child once it is linked.
    pub target: Option<BankId>,
}

/// One cascade level.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Bank {
    pub name: &'static str,
    pub registers: BankRegisters,
    pub irq_base: u32,
    /// Cascade bit in the parent, 0 for the root.
    pub bank_index: u32,
    pub parent: Option<BankId>,
    pub source_mask: u32,
    pub shortcut_mask: u32,
    pub bank_mask: u32,
    pub valid_mask: u32,
    pub fiq_base: Option<u32>,
    pub shortcuts: [Shortcut; IRQS_PER_BANK as usize],
    pub children: [Option<BankId>; IRQS_PER_BANK as usize],
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl Shortcut {
    pub const NONE: Self = Self {
        bank: 0,
        bit: 0,
        target: None,
    };
}

impl Bank {
    pub const EMPTY: Self = Self {
        name: "",
        registers: BankRegisters::new(0, 0, 0),
        irq_base: 0,
        bank_index: 0,
        parent: None,
        source_mask: 0,
        shortcut_mask: 0,
        bank_mask: 0,
        valid_mask: 0,
        fiq_base: None,
        shortcuts: [Shortcut::NONE; IRQS_PER_BANK as usize],
        children: [None; IRQS_PER_BANK as usize],
    };

    /// Whether `irq` falls into the 32 identifiers owned by this bank.
    pub fn owns(&self, irq: IrqNumber) -> bool {
        irq.get()
            .checked_sub(self.irq_base)
            .map_or(false, |bit| bit < IRQS_PER_BANK)
    }

    pub fn is_source(&self, bit: u32) -> bool {
        bit < IRQS_PER_BANK && self.source_mask.get_bit(bit as usize)
    }

    pub fn is_shortcut(&self, bit: u32) -> bool {
        bit < IRQS_PER_BANK && self.shortcut_mask.get_bit(bit as usize)
    }

    pub fn is_cascade(&self, bit: u32) -> bool {
        bit < IRQS_PER_BANK && self.bank_mask.get_bit(bit as usize)
    }
}

impl<R> Controller<R> {
    pub(crate) fn bank(&self, id: BankId) -> &Bank {
        // Ids stored inside the arena are created by the builder and always in range.
        &self.banks[id.0]
    }

    fn find_bank(&self, id: BankId) -> Option<&Bank> {
        self.banks[..self.count].get(id.0)
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl BankId {
    /// Arena position of this bank.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl<R> Controller<R> {
    /// The top level bank, serviced by the IRQ vector.
    pub fn root(&self) -> BankId {
        self.root
    }

    /// Name of the top level bank.
    pub fn root_name(&self) -> &'static str {
        self.bank(self.root).name
    }

    /// Number of linked banks.
    pub fn bank_count(&self) -> usize {
        self.count
    }

    /// Bits of `bank` the dispatch engine acts upon.
    pub fn valid_mask(&self, bank: BankId) -> Option<u32> {
        self.find_bank(bank).map(|bank| bank.valid_mask)
    }

    /// Parent of `bank` and the cascade bit `bank` is linked at. `None` for the root.
    pub fn parent(&self, bank: BankId) -> Option<(BankId, u32)> {
        let bank = self.find_bank(bank)?;
        bank.parent.map(|parent| (parent, bank.bank_index))
    }

    /// The child linked at cascade bit `index` of `bank`.
    pub fn child(&self, bank: BankId, index: u32) -> Option<BankId> {
        if index >= IRQS_PER_BANK {
            return None;
        }
        self.find_bank(bank)?.children[index as usize]
    }

    /// Logical identifier of line `bit` in `bank`.
    pub fn translate(&self, bank: BankId, bit: u32) -> Option<IrqNumber> {
        if bit >= IRQS_PER_BANK {
            return None;
        }
        self.find_bank(bank)
            .map(|bank| IrqNumber::new(bank.irq_base + bit))
    }

    /// Physical position of the logical identifier `irq`.
    pub fn locate(&self, irq: IrqNumber) -> Option<IrqLocation> {
        self.banks[..self.count]
            .iter()
            .position(|bank| bank.owns(irq))
            .map(|index| IrqLocation {
                bank: BankId(index),
                bit: irq.get() - self.banks[index].irq_base,
            })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use {super::*, super::fake::FakeBus};

    #[test]
    fn translate_is_linear_per_bank() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        assert_eq!(tree.controller.translate(tree.root, 3), Some(IrqNumber::new(3)));
        assert_eq!(tree.controller.translate(tree.bank1, 2), Some(IrqNumber::new(34)));
        assert_eq!(tree.controller.translate(tree.bank2, 31), Some(IrqNumber::new(95)));
        assert_eq!(tree.controller.translate(tree.bank2, 32), None);
    }

    #[test]
    fn locate_inverts_translate() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        for bank in [tree.root, tree.bank1, tree.bank2] {
            for bit in 0..IRQS_PER_BANK {
                let irq = tree.controller.translate(bank, bit).unwrap();
                assert_eq!(tree.controller.locate(irq), Some(IrqLocation { bank, bit }));
            }
        }
        assert_eq!(tree.controller.locate(IrqNumber::new(96)), None);
    }

    #[test]
    fn children_are_linked_by_cascade_bit() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        assert_eq!(tree.controller.bank_count(), 3);
        assert_eq!(tree.controller.child(tree.root, 8), Some(tree.bank1));
        assert_eq!(tree.controller.child(tree.root, 9), Some(tree.bank2));
        assert_eq!(tree.controller.child(tree.root, 10), None);
        assert_eq!(tree.controller.child(tree.bank1, 8), None);
        assert_eq!(tree.controller.parent(tree.bank2), Some((tree.root, 9)));
        assert_eq!(tree.controller.parent(tree.root), None);
        assert_eq!(tree.controller.root_name(), "root");
    }

    #[test]
    fn valid_mask_covers_sources_linked_banks_and_shortcuts() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        assert_eq!(
            tree.controller.valid_mask(tree.root),
            Some(0xff | 1 << 8 | 1 << 9 | 1 << 10)
        );
        assert_eq!(tree.controller.valid_mask(tree.bank1), Some(u32::MAX));
        assert_eq!(tree.controller.valid_mask(BankId(7)), None);
    }
}
