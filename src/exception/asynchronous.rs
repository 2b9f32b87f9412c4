/*
 * SPDX-License-Identifier: MIT OR BlueOak-1.0.0
 * Copyright (c) 2020-2022 Andre Richter <andre.o.richter@gmail.com>
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 * Original code distributed under MIT, additional changes are under BlueOak-1.0.0
 */

//! Asynchronous exception handling: logical interrupt numbers, the IRQ context token and the
//! global interrupt manager serviced from the architectural IRQ vector.

use {
    crate::{
        armctrl::{ConfigError, Controller, DispatchError},
        mmio::Mmio,
    },
    core::{fmt, marker::PhantomData},
    once_cell::race::OnceRef,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Logical interrupt identifier, the number handlers are registered under.
///
/// Distinct from the (bank, bit) position the interrupt is reported at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IrqNumber(u32);

/// Token proving that the code runs in IRQ context.
///
/// Interrupt handlers receive it by reference and cannot forge one.
#[derive(Clone, Copy)]
pub struct IRQContext<'irq_context> {
    _0: PhantomData<&'irq_context ()>,
}

/// Interrupt handling interfaces.
pub mod interface {
    use super::{IRQContext, IrqNumber};

    /// The logical IRQ layer invoking whatever handler is registered for an identifier.
    pub trait IrqDispatch {
        /// Run the handler registered for `irq`.
        fn dispatch(&self, irq: IrqNumber, ctx: &IRQContext<'_>);
    }
}

/// The interrupt controller installed for the whole system, paired with the handler layer
/// its dispatches go to.
pub struct IrqManager {
    controller: Controller<Mmio>,
    dispatcher: &'static (dyn interface::IrqDispatch + Sync),
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static IRQ_MANAGER: OnceRef<'static, IrqManager> = OnceRef::new();

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl IrqNumber {
    /// Create an instance.
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Return the wrapped number.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for IrqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'irq_context> IRQContext<'irq_context> {
    /// Creates an IRQContext token.
    ///
    /// # Safety
    ///
    /// - This must only be called when the current core is in an interrupt context and will not
    ///   live beyond the end of it. That is, creation is allowed in interrupt vector functions. For
    ///   example, in the ARMv8-A case, in `extern "C" fn current_elx_irq()`.
    /// - Note that the lifetime `'irq_context` of the returned instance is unconstrained. User code
    ///   must not be able to influence the lifetime picked for this type, since that might cause it
    ///   to be inferred to `'static`.
    #[inline(always)]
    pub unsafe fn new() -> Self {
        IRQContext { _0: PhantomData }
    }
}

impl IrqManager {
    /// Create an instance.
    pub const fn new(
        controller: Controller<Mmio>,
        dispatcher: &'static (dyn interface::IrqDispatch + Sync),
    ) -> Self {
        Self {
            controller,
            dispatcher,
        }
    }

    /// The interrupt controller, for masking and FIQ routing.
    pub fn controller(&self) -> &Controller<Mmio> {
        &self.controller
    }

    /// Service every pending interrupt, see [`Controller::handle_pending_irqs`].
    pub fn handle_pending_irqs(&self, ctx: &IRQContext<'_>) -> Result<usize, DispatchError> {
        self.controller.handle_pending_irqs(ctx, self.dispatcher)
    }
}

/// Install the system interrupt manager.
///
/// There is exactly one top level controller; a second installation fails.
pub fn register_irq_manager(manager: &'static IrqManager) -> Result<(), ConfigError> {
    IRQ_MANAGER.set(manager).map_err(|_| {
        log::error!(
            "{}: multiple top level interrupt controllers",
            manager.controller.root_name()
        );
        ConfigError::DuplicateRoot {
            name: manager.controller.root_name(),
        }
    })?;
    log::info!(
        "{}: installed as system interrupt controller",
        manager.controller.root_name()
    );
    Ok(())
}

/// Return a reference to the installed IRQ manager, if any.
pub fn irq_manager() -> Option<&'static IrqManager> {
    IRQ_MANAGER.get()
}

/// Service top-level interrupt. Called from the architectural IRQ vector.
///
/// An error here means the controller saw a pending bit it cannot attribute to any source; the
/// caller is expected to treat it as fatal.
pub fn handle_pending_irqs(ctx: &IRQContext<'_>) -> Result<usize, DispatchError> {
    irq_manager()
        .ok_or(DispatchError::Uninitialized)?
        .handle_pending_irqs(ctx)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
