/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Static description of one bank of the controller, as handed to the builder.

use {
    super::{ConfigError, Shortcut, IRQS_PER_BANK},
    crate::armctrl::fiq::FIQ_SOURCES,
    bit_field::BitField,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Addresses of the three registers of a bank.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BankRegisters {
    pub pending: usize,
    pub enable: usize,
    pub disable: usize,
}

/// Real location of a shortcut line: the child bank index and the line in that bank.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShortcutTarget {
    pub bank: u32,
    pub bit: u32,
}

/// Build-time description of a bank.
///
/// `source_mask` defaults to all ones: a bank with no other configuration owns all 32 lines.
#[derive(Debug, Copy, Clone)]
pub struct BankDescriptor<'a> {
    pub(crate) name: &'static str,
    pub(crate) registers: BankRegisters,
    pub(crate) irq_base: u32,
    pub(crate) bank_index: u32,
    pub(crate) source_mask: u32,
    pub(crate) bank_mask: u32,
    pub(crate) shortcut_mask: u32,
    pub(crate) shortcut_map: &'a [ShortcutTarget],
    pub(crate) fiq_base: Option<u32>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl BankRegisters {
    /// Create an instance from absolute register addresses.
    pub const fn new(pending: usize, enable: usize, disable: usize) -> Self {
        Self {
            pending,
            enable,
            disable,
        }
    }

    /// Create an instance from offsets into a register block mapped at `base`.
    pub const fn at(base: usize, pending: usize, enable: usize, disable: usize) -> Self {
        Self::new(base + pending, base + enable, base + disable)
    }
}

impl ShortcutTarget {
    /// Create an instance.
    pub const fn new(bank: u32, bit: u32) -> Self {
        Self { bank, bit }
    }
}

impl<'a> BankDescriptor<'a> {
    /// Describe a bank whose line `n` gets the logical identifier `irq_base + n`.
    pub const fn new(name: &'static str, registers: BankRegisters, irq_base: u32) -> Self {
        Self {
            name,
            registers,
            irq_base,
            bank_index: 0,
            source_mask: u32::MAX,
            bank_mask: 0,
            shortcut_mask: 0,
            shortcut_map: &[],
            fiq_base: None,
        }
    }

    /// Cascade bit of this bank in its parent. Ignored for the root.
    pub const fn bank_index(mut self, index: u32) -> Self {
        self.bank_index = index;
        self
    }

    /// Lines owned by this bank.
    pub const fn source_mask(mut self, mask: u32) -> Self {
        self.source_mask = mask;
        self
    }

    /// Cascade bits, one per child bank.
    pub const fn bank_mask(mut self, mask: u32) -> Self {
        self.bank_mask = mask;
        self
    }

    /// Shortcut bits and their targets. `map` is consumed left to right for the set bits of
    /// `mask` in ascending order.
    pub const fn shortcuts(mut self, mask: u32, map: &'a [ShortcutTarget]) -> Self {
        self.shortcut_mask = mask;
        self.shortcut_map = map;
        self
    }

    /// FIQ source index of line 0; line `n` is selected for FIQ as `fiq_base + n`.
    pub const fn fiq_base(mut self, base: u32) -> Self {
        self.fiq_base = Some(base);
        self
    }

    /// Name used in diagnostics.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

//--------------------------------------------------------------------------------------------------
// Crate Code
//--------------------------------------------------------------------------------------------------

/// Source, cascade and shortcut bits must not share a bit.
pub(crate) fn check_partition(desc: &BankDescriptor<'_>) -> Result<(), ConfigError> {
    if (desc.source_mask & desc.bank_mask) != 0
        || (desc.source_mask & desc.shortcut_mask) != 0
        || (desc.bank_mask & desc.shortcut_mask) != 0
    {
        return Err(ConfigError::MaskOverlap {
            name: desc.name,
            source_mask: desc.source_mask,
            bank_mask: desc.bank_mask,
            shortcut_mask: desc.shortcut_mask,
        });
    }
    Ok(())
}

/// Expand the shortcut map into a per-bit table.
pub(crate) fn decode_shortcuts(
    desc: &BankDescriptor<'_>,
) -> Result<[Shortcut; IRQS_PER_BANK as usize], ConfigError> {
    let expected = desc.shortcut_mask.count_ones() as usize;
    if desc.shortcut_map.len() != expected {
        return Err(ConfigError::ShortcutMapMismatch {
            name: desc.name,
            expected,
            found: desc.shortcut_map.len(),
        });
    }

    let mut shortcuts = [Shortcut::NONE; IRQS_PER_BANK as usize];
    let mut targets = desc.shortcut_map.iter();

    for bit in 0..IRQS_PER_BANK as usize {
        if !desc.shortcut_mask.get_bit(bit) {
            continue;
        }
        // Length was checked against the popcount above.
        let Some(target) = targets.next() else { break };

        if target.bank == 0 || target.bank >= IRQS_PER_BANK || target.bit >= IRQS_PER_BANK {
            return Err(ConfigError::InvalidShortcutTarget {
                name: desc.name,
                bit: bit as u32,
                bank: target.bank,
                line: target.bit,
            });
        }

        shortcuts[bit] = Shortcut {
            bank: target.bank,
            bit: target.bit,
            target: None,
        };
    }

    Ok(shortcuts)
}

/// First and last FIQ index used by a bank's sources, `None` if it feeds no FIQ.
pub(crate) fn fiq_window(fiq_base: Option<u32>, source_mask: u32) -> Option<(u32, u32)> {
    let base = fiq_base?;
    if source_mask == 0 {
        return None;
    }
    let lowest = source_mask.trailing_zeros();
    let highest = IRQS_PER_BANK - 1 - source_mask.leading_zeros();
    Some((base.saturating_add(lowest), base.saturating_add(highest)))
}

/// Highest FIQ index used by the bank must fit the FIQ source field.
pub(crate) fn check_fiq_window(desc: &BankDescriptor<'_>) -> Result<(), ConfigError> {
    match fiq_window(desc.fiq_base, desc.source_mask) {
        Some((_, last)) if last >= FIQ_SOURCES => Err(ConfigError::InvalidFiqBase {
            name: desc.name,
            base: desc.fiq_base.unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
