/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Per-source enable and disable.
//!
//! Every call is a single write of one bit to the owning bank's enable or disable register.
//! Nothing is cached, the hardware enable state is the only state.
//!
//! Unmasking takes the FIQ routing lock: the source delivered as FIQ must stay masked on the
//! IRQ side until it is routed back.

use {
    super::{Controller, IrqLocation},
    crate::{exception::asynchronous::IrqNumber, mmio::interface::RegisterAccess},
    core::fmt,
    snafu::Snafu,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Masking errors. No register is written when one is returned.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum MaskError {
    /// The identifier is a shortcut alias, the line must be masked in the bank that owns it.
    #[snafu(display("irq {} can not be masked at this level{}", irq, Owner(*owner)))]
    WrongLevel {
        irq: IrqNumber,
        owner: Option<IrqNumber>,
    },
    #[snafu(display("irq {} is a cascade line and can not be masked", irq))]
    Unmaskable { irq: IrqNumber },
    #[snafu(display("irq {} is not handled by this controller", irq))]
    UnknownIrq { irq: IrqNumber },
    #[snafu(display("irq {} is routed to FIQ and can not be unmasked", irq))]
    RoutedToFiq { irq: IrqNumber },
}

pub type Result<T> = ::core::result::Result<T, MaskError>;

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// Hint naming the real source of a shortcut alias.
struct Owner(Option<IrqNumber>);

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(irq) => write!(f, ", mask irq {} instead", irq),
            None => write!(f, ", its bank is not linked"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl<R> Controller<R> {
    /// Find the bank owning `irq` as a source.
    pub(crate) fn locate_source(&self, irq: IrqNumber) -> Result<IrqLocation> {
        let location = self.locate(irq).ok_or(MaskError::UnknownIrq { irq })?;
        let bank = self.bank(location.bank);

        if bank.is_source(location.bit) {
            return Ok(location);
        }
        if bank.is_shortcut(location.bit) {
            let shortcut = &bank.shortcuts[location.bit as usize];
            let owner = shortcut
                .target
                .map(|target| IrqNumber::new(self.bank(target).irq_base + shortcut.bit));
            return Err(MaskError::WrongLevel { irq, owner });
        }
        if bank.is_cascade(location.bit) {
            return Err(MaskError::Unmaskable { irq });
        }
        Err(MaskError::UnknownIrq { irq })
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<R: RegisterAccess> Controller<R> {
    /// Disable delivery of `irq`.
    ///
    /// Does not take the FIQ routing lock, so routing can mask its source while holding it.
    pub fn mask(&self, irq: IrqNumber) -> Result<()> {
        let location = self.locate_source(irq)?;
        let bank = self.bank(location.bank);
        self.registers
            .write32(bank.registers.disable, 1 << location.bit);
        Ok(())
    }

    /// Enable delivery of `irq`.
    ///
    /// Fails with [`MaskError::RoutedToFiq`] while `irq` is delivered as FIQ.
    pub fn unmask(&self, irq: IrqNumber) -> Result<()> {
        let location = self.locate_source(irq)?;
        let enable = || {
            let bank = self.bank(location.bank);
            self.registers.write32(bank.registers.enable, 1 << location.bit);
        };

        match &self.fiq {
            Some(router) => router.with_routed(|routed| {
                if *routed == Some(irq) {
                    return Err(MaskError::RoutedToFiq { irq });
                }
                enable();
                Ok(())
            }),
            None => {
                enable();
                Ok(())
            }
        }
    }

    /// Acknowledge a level-triggered `irq`: the line stays masked until the handler unmasks it.
    pub fn ack(&self, irq: IrqNumber) -> Result<()> {
        self.mask(irq)
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
