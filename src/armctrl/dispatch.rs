/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Interrupt demultiplexing hot path.
//!
//! Handle each interrupt across the entire interrupt controller. The status register is
//! re-read before handling each interrupt, which is necessary given that a handler may briefly
//! re-enable interrupts and a single cascade bit may stand for several lines of the child.

use {
    super::{BankId, Controller},
    crate::{
        exception::asynchronous::{interface::IrqDispatch, IRQContext, IrqNumber},
        mmio::interface::RegisterAccess,
    },
    snafu::Snafu,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Dispatch errors. Any of them means the system can no longer attribute interrupts.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum DispatchError {
    #[snafu(display(
        "{}: unclassified pending bit {} (pending {:#010x}, valid {:#010x})",
        bank,
        bit,
        pending,
        valid_mask
    ))]
    UnclassifiedPendingBit {
        bank: &'static str,
        bit: u32,
        pending: u32,
        valid_mask: u32,
    },
    #[snafu(display("Interrupt controller is not initialized"))]
    Uninitialized,
}

pub type Result<T> = ::core::result::Result<T, DispatchError>;

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl<R: RegisterAccess> Controller<R> {
    /// Service `id` until its pending register shows no valid bit. Returns dispatch count.
    ///
    /// `cascaded` is set when the parent's cascade bit for this bank was seen pending.
    fn service_bank<D>(
        &self,
        id: BankId,
        cascaded: bool,
        ctx: &IRQContext<'_>,
        dispatcher: &D,
    ) -> Result<usize>
    where
        D: IrqDispatch + ?Sized,
    {
        let bank = self.bank(id);
        let mut handled = 0;

        loop {
            let pending = self.registers.read32(bank.registers.pending);
            let stat = pending & bank.valid_mask;

            if stat == 0 {
                // The parent said this bank has work, yet nothing here is ours: re-reading the
                // parent would see the same cascade bit forever.
                if cascaded && handled == 0 && pending != 0 {
                    return Err(self.unclassified(id, pending.trailing_zeros(), pending));
                }
                if cascaded && handled == 0 {
                    log::trace!("{}: spurious cascade", bank.name);
                }
                return Ok(handled);
            }

            // Lowest bit first.
            let bit = stat.trailing_zeros();

            if bank.is_source(bit) {
                self.dispatch(IrqNumber::new(bank.irq_base + bit), ctx, dispatcher);
                handled += 1;
            } else if bank.is_shortcut(bit) {
                // Never read the target bank here: its status bit for this line is set too, but
                // the shortcut bit is the one cleared on service.
                let shortcut = &bank.shortcuts[bit as usize];
                let Some(target) = shortcut.target else {
                    return Err(self.unclassified(id, bit, pending));
                };
                let irq = IrqNumber::new(self.bank(target).irq_base + shortcut.bit);
                self.dispatch(irq, ctx, dispatcher);
                handled += 1;
            } else if bank.is_cascade(bit) {
                let Some(child) = bank.children[bit as usize] else {
                    return Err(self.unclassified(id, bit, pending));
                };
                handled += self.service_bank(child, true, ctx, dispatcher)?;
            } else {
                return Err(self.unclassified(id, bit, pending));
            }
        }
    }

    fn dispatch<D>(&self, irq: IrqNumber, ctx: &IRQContext<'_>, dispatcher: &D)
    where
        D: IrqDispatch + ?Sized,
    {
        log::trace!("irq {}", irq);
        dispatcher.dispatch(irq, ctx);
    }

    fn unclassified(&self, id: BankId, bit: u32, pending: u32) -> DispatchError {
        let bank = self.bank(id);
        let error = DispatchError::UnclassifiedPendingBit {
            bank: bank.name,
            bit,
            pending,
            valid_mask: bank.valid_mask,
        };
        log::error!("{}", error);
        error
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<R: RegisterAccess> Controller<R> {
    /// One pass over the tree starting at the root: services the root until its pending
    /// register reads zero, descending into child banks as their cascade bits come up.
    ///
    /// Returns the number of dispatches made.
    pub fn service<D>(&self, ctx: &IRQContext<'_>, dispatcher: &D) -> Result<usize>
    where
        D: IrqDispatch + ?Sized,
    {
        self.service_bank(self.root, false, ctx, dispatcher)
    }

    /// Top level interrupt entry: repeat root passes until one finds nothing to do.
    ///
    /// Returns the total number of dispatches made.
    pub fn handle_pending_irqs<D>(&self, ctx: &IRQContext<'_>, dispatcher: &D) -> Result<usize>
    where
        D: IrqDispatch + ?Sized,
    {
        let mut total = 0;
        loop {
            match self.service(ctx, dispatcher)? {
                0 => return Ok(total),
                handled => total += handled,
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
