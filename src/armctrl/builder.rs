/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Validation and linking of bank descriptors into a single rooted tree.

use {
    super::{
        fiq::FiqRouter,
        topology::{self, BankDescriptor},
        Bank, BankId, Controller, IRQS_PER_BANK, MAX_BANKS,
    },
    bit_field::BitField,
    snafu::Snafu,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Topology configuration errors. All of them are fatal to interrupt controller bring-up.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ConfigError {
    #[snafu(display(
        "{}: bank mask overlap (source {:#010x}, bank {:#010x}, shortcut {:#010x})",
        name,
        source_mask,
        bank_mask,
        shortcut_mask
    ))]
    MaskOverlap {
        name: &'static str,
        source_mask: u32,
        bank_mask: u32,
        shortcut_mask: u32,
    },
    #[snafu(display("{}: invalid bank index {}", name, index))]
    InvalidBankIndex { name: &'static str, index: u32 },
    #[snafu(display("{}: duplicate bank index {}", name, index))]
    DuplicateBank { name: &'static str, index: u32 },
    #[snafu(display("{}: invalid shortcut {}: {}->{}", name, bit, bank, line))]
    InvalidShortcutTarget {
        name: &'static str,
        bit: u32,
        bank: u32,
        line: u32,
    },
    #[snafu(display(
        "{}: invalid shortcut map, {} targets for {} shortcut bits",
        name,
        found,
        expected
    ))]
    ShortcutMapMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[snafu(display("{}: multiple top level banks", name))]
    DuplicateRoot { name: &'static str },
    #[snafu(display("No top level bank registered"))]
    MissingRoot,
    #[snafu(display("{}: parent bank is not registered", name))]
    UnknownParent { name: &'static str },
    #[snafu(display("{}: too many banks, at most {} supported", name, MAX_BANKS))]
    TooManyBanks { name: &'static str },
    #[snafu(display("{}: interrupt base {} overflows the irq space", name, base))]
    InvalidIrqBase { name: &'static str, base: u32 },
    #[snafu(display(
        "{}: interrupt range at base {} overlaps with {}",
        name,
        base,
        other
    ))]
    IrqRangeOverlap {
        name: &'static str,
        base: u32,
        other: &'static str,
    },
    #[snafu(display("{}: fiq base {} does not fit the fiq source field", name, base))]
    InvalidFiqBase { name: &'static str, base: u32 },
    #[snafu(display("{}: fiq range at base {} overlaps with {}", name, base, other))]
    FiqRangeOverlap {
        name: &'static str,
        base: u32,
        other: &'static str,
    },
}

pub type Result<T> = ::core::result::Result<T, ConfigError>;

/// Collects bank descriptors, checking each one as it is added.
///
/// A failed `add_*` call leaves the builder exactly as it was before.
pub struct ControllerBuilder {
    banks: [Bank; MAX_BANKS],
    count: usize,
    root: Option<BankId>,
    fiq_control: Option<usize>,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl ControllerBuilder {
    /// Per-bank checks shared by root and child banks.
    fn prepare(&self, desc: &BankDescriptor<'_>) -> Result<Bank> {
        topology::check_partition(desc)?;
        let shortcuts = topology::decode_shortcuts(desc)?;
        topology::check_fiq_window(desc)?;
        self.check_irq_range(desc)?;
        self.check_fiq_range(desc)?;

        if self.count >= MAX_BANKS {
            return Err(ConfigError::TooManyBanks { name: desc.name });
        }

        Ok(Bank {
            name: desc.name,
            registers: desc.registers,
            irq_base: desc.irq_base,
            bank_index: 0,
            parent: None,
            source_mask: desc.source_mask,
            shortcut_mask: desc.shortcut_mask,
            bank_mask: desc.bank_mask,
            valid_mask: desc.source_mask,
            fiq_base: desc.fiq_base,
            shortcuts,
            children: [None; IRQS_PER_BANK as usize],
        })
    }

    /// Every bank owns the 32 identifiers starting at its base; windows must be disjoint.
    fn check_irq_range(&self, desc: &BankDescriptor<'_>) -> Result<()> {
        if desc.irq_base.checked_add(IRQS_PER_BANK - 1).is_none() {
            return Err(ConfigError::InvalidIrqBase {
                name: desc.name,
                base: desc.irq_base,
            });
        }

        match self.banks[..self.count]
            .iter()
            .find(|bank| bank.irq_base.abs_diff(desc.irq_base) < IRQS_PER_BANK)
        {
            Some(other) => Err(ConfigError::IrqRangeOverlap {
                name: desc.name,
                base: desc.irq_base,
                other: other.name,
            }),
            None => Ok(()),
        }
    }

    /// Every FIQ index selects at most one source.
    fn check_fiq_range(&self, desc: &BankDescriptor<'_>) -> Result<()> {
        let Some((first, last)) = topology::fiq_window(desc.fiq_base, desc.source_mask) else {
            return Ok(());
        };

        match self.banks[..self.count].iter().find(|bank| {
            topology::fiq_window(bank.fiq_base, bank.source_mask)
                .map_or(false, |(other_first, other_last)| {
                    first <= other_last && other_first <= last
                })
        }) {
            Some(other) => Err(ConfigError::FiqRangeOverlap {
                name: desc.name,
                base: desc.fiq_base.unwrap_or_default(),
                other: other.name,
            }),
            None => Ok(()),
        }
    }

    /// Linked shortcut bits of `bank` whose target line is not a source of the target bank.
    fn stray_shortcuts(&self, bank: &Bank) -> u32 {
        let mut stray = 0;
        for (bit, shortcut) in bank.shortcuts.iter().enumerate() {
            if !bank.valid_mask.get_bit(bit) || !bank.shortcut_mask.get_bit(bit) {
                continue;
            }
            if let Some(target) = shortcut.target {
                if !self.banks[target.0].is_source(shortcut.bit) {
                    stray.set_bit(bit, true);
                }
            }
        }
        stray
    }

    fn push(&mut self, bank: Bank) -> BankId {
        let id = BankId(self.count);
        self.banks[self.count] = bank;
        self.count += 1;
        id
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerBuilder {
    /// Create an empty builder.
    pub const fn new() -> Self {
        Self {
            banks: [Bank::EMPTY; MAX_BANKS],
            count: 0,
            root: None,
            fiq_control: None,
        }
    }

    /// Address of the FIQ control register, if the controller can route a source to FIQ.
    pub fn fiq_control(&mut self, addr: usize) -> &mut Self {
        self.fiq_control = Some(addr);
        self
    }

    /// Register the top level bank.
    pub fn add_root(&mut self, desc: &BankDescriptor<'_>) -> Result<BankId> {
        if self.root.is_some() {
            return Err(ConfigError::DuplicateRoot { name: desc.name });
        }

        let bank = self.prepare(desc)?;
        let id = self.push(bank);
        self.root = Some(id);

        log::debug!(
            "{}: top level bank, irqs {}..={}, valid {:#010x}",
            desc.name,
            desc.irq_base,
            desc.irq_base + (IRQS_PER_BANK - 1),
            desc.source_mask
        );
        Ok(id)
    }

    /// Register a bank cascaded into `parent` at cascade bit `desc.bank_index`.
    ///
    /// Links the cascade bit and every shortcut of `parent` that targets this bank into the
    /// parent's valid mask.
    pub fn add_child(&mut self, parent: BankId, desc: &BankDescriptor<'_>) -> Result<BankId> {
        let index = desc.bank_index;

        let parent_bank = self.banks[..self.count]
            .get(parent.0)
            .ok_or(ConfigError::UnknownParent { name: desc.name })?;

        if index == 0 || index >= IRQS_PER_BANK || !parent_bank.bank_mask.get_bit(index as usize)
        {
            return Err(ConfigError::InvalidBankIndex {
                name: desc.name,
                index,
            });
        }

        if parent_bank.children[index as usize].is_some() {
            return Err(ConfigError::DuplicateBank {
                name: desc.name,
                index,
            });
        }

        let mut bank = self.prepare(desc)?;
        bank.bank_index = index;
        bank.parent = Some(parent);
        let id = self.push(bank);

        let parent_bank = &mut self.banks[parent.0];
        parent_bank.children[index as usize] = Some(id);
        parent_bank.valid_mask.set_bit(index as usize, true);

        for (bit, shortcut) in parent_bank.shortcuts.iter_mut().enumerate() {
            if parent_bank.shortcut_mask.get_bit(bit) && shortcut.bank == index {
                shortcut.target = Some(id);
                parent_bank.valid_mask.set_bit(bit, true);
            }
        }

        log::debug!(
            "{}: linked as bank {} of {}, irqs {}..={}, parent valid {:#010x}",
            desc.name,
            index,
            parent_bank.name,
            desc.irq_base,
            desc.irq_base + (IRQS_PER_BANK - 1),
            parent_bank.valid_mask
        );
        Ok(id)
    }

    /// Freeze the tree into a controller using `registers` for hardware access.
    pub fn build<R>(self, registers: R) -> Result<Controller<R>> {
        let root = self.root.ok_or(ConfigError::MissingRoot)?;

        let banks = &self.banks[..self.count];
        log::info!(
            "{}: {} banks, {} sources, {} shortcuts",
            banks[root.0].name,
            self.count,
            banks.iter().map(|b| b.source_mask.count_ones()).sum::<u32>(),
            banks.iter().map(|b| b.shortcut_mask.count_ones()).sum::<u32>()
        );

        for bank in banks {
            let dangling = bank.shortcut_mask & !bank.valid_mask;
            if dangling != 0 {
                log::warn!(
                    "{}: shortcut bits {:#010x} target unlinked banks and will be ignored",
                    bank.name,
                    dangling
                );
            }
            let stray = self.stray_shortcuts(bank);
            if stray != 0 {
                log::warn!(
                    "{}: shortcut bits {:#010x} alias lines that are not sources of their bank",
                    bank.name,
                    stray
                );
            }
        }

        Ok(Controller {
            registers,
            banks: self.banks,
            count: self.count,
            root,
            fiq: self.fiq_control.map(FiqRouter::new),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
