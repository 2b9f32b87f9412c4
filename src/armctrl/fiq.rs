/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Fast interrupt routing.
//!
//! Exactly one source at a time can be delivered as FIQ instead of IRQ. The source is picked
//! by a 7-bit index in the FIQ control register; banks that can feed FIQ declare the index of
//! their line 0.

use {
    super::{Controller, MaskError},
    crate::{
        exception::asynchronous::IrqNumber,
        mmio::interface::RegisterAccess,
        sync::{interface::Mutex, SpinLock},
    },
    snafu::Snafu,
    static_assertions::const_assert_eq,
    tock_registers::{
        interfaces::{Readable, Writeable},
        register_bitfields,
        registers::InMemoryRegister,
    },
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Number of sources the FIQ control register can select from.
pub const FIQ_SOURCES: u32 = 128;

/// FIQ routing errors.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum FiqError {
    #[snafu(display("No FIQ control register configured"))]
    NotConfigured,
    #[snafu(display("irq {} has no FIQ source index", irq))]
    NoFiqIndex { irq: IrqNumber },
    #[snafu(display("irq {} can not be routed to FIQ, irq {} already is", irq, current))]
    InUse { irq: IrqNumber, current: IrqNumber },
    #[snafu(display("FIQ routing failed: {}", error))]
    Mask { error: MaskError },
    #[snafu(display("FIQ source {} is not an interrupt of this controller", index))]
    UnknownSource { index: u32 },
}

pub type Result<T> = ::core::result::Result<T, FiqError>;

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

register_bitfields! {
    u32,

    /// FIQ control register of the ARM control block.
    FIQ_CONTROL [
        /// Index of the source delivered as FIQ.
        SOURCE OFFSET(0) NUMBITS(7) [],

        /// Deliver the selected source as FIQ.
        ENABLE OFFSET(7) NUMBITS(1) [
            False = 0,
            True = 1
        ]
    ]
}

const_assert_eq!(FIQ_SOURCES, 1 << 7);

/// FIQ control register together with the lock serializing every change of routing.
pub(crate) struct FiqRouter {
    control: usize,
    /// Source currently routed to FIQ.
    routed: SpinLock<Option<IrqNumber>>,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl FiqRouter {
    pub(crate) fn new(control: usize) -> Self {
        Self {
            control,
            routed: SpinLock::new(None),
        }
    }

    /// Run `f` with routing held still.
    pub(crate) fn with_routed<T>(&self, f: impl FnOnce(&mut Option<IrqNumber>) -> T) -> T {
        self.routed.lock(f)
    }
}

impl<R> Controller<R> {
    fn fiq_router(&self) -> Result<&FiqRouter> {
        self.fiq.as_ref().ok_or(FiqError::NotConfigured)
    }

    /// FIQ index of the source `irq`.
    fn fiq_index(&self, irq: IrqNumber) -> Result<u32> {
        let location = self
            .locate_source(irq)
            .map_err(|error| FiqError::Mask { error })?;
        let base = self
            .bank(location.bank)
            .fiq_base
            .ok_or(FiqError::NoFiqIndex { irq })?;
        Ok(base + location.bit)
    }

    /// Source selected by FIQ `index`.
    fn fiq_irq(&self, index: u32) -> Option<IrqNumber> {
        self.banks[..self.count].iter().find_map(|bank| {
            let bit = index.checked_sub(bank.fiq_base?)?;
            bank.is_source(bit).then(|| IrqNumber::new(bank.irq_base + bit))
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<R: RegisterAccess> Controller<R> {
    /// Deliver `irq` as FIQ.
    ///
    /// The source is masked first, otherwise it would be signalled on both IRQ and FIQ. Routing
    /// the source that is already routed is a no-op.
    pub fn route_to_fiq(&self, irq: IrqNumber) -> Result<()> {
        let router = self.fiq_router()?;

        router.routed.lock(|routed| {
            match *routed {
                Some(current) if current == irq => return Ok(()),
                Some(current) => return Err(FiqError::InUse { irq, current }),
                None => {}
            }

            let index = self.fiq_index(irq)?;
            self.mask(irq).map_err(|error| FiqError::Mask { error })?;

            let value = InMemoryRegister::<u32, FIQ_CONTROL::Register>::new(0);
            value.write(FIQ_CONTROL::SOURCE.val(index) + FIQ_CONTROL::ENABLE::True);
            self.registers.write32(router.control, value.get());

            *routed = Some(irq);
            log::info!("irq {} routed to FIQ as source {}", irq, index);
            Ok(())
        })
    }

    /// Return FIQ delivery to nothing.
    ///
    /// Returns the previously routed source, if any. It stays masked until unmasked explicitly.
    pub fn route_to_irq(&self) -> Result<Option<IrqNumber>> {
        let router = self.fiq_router()?;

        router.routed.lock(|routed| {
            self.registers.write32(router.control, 0);
            let previous = routed.take();
            if let Some(irq) = previous {
                log::info!("irq {} no longer routed to FIQ", irq);
            }
            Ok(previous)
        })
    }

    /// Source the hardware currently delivers as FIQ, decoded from the control register.
    pub fn fiq_source(&self) -> Result<Option<IrqNumber>> {
        let router = self.fiq_router()?;

        router.routed.lock(|_| {
            let value = InMemoryRegister::<u32, FIQ_CONTROL::Register>::new(
                self.registers.read32(router.control),
            );
            if !value.is_set(FIQ_CONTROL::ENABLE) {
                return Ok(None);
            }
            let index = value.read(FIQ_CONTROL::SOURCE);
            self.fiq_irq(index)
                .map(Some)
                .ok_or(FiqError::UnknownSource { index })
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::armctrl::{
            fake::{self, FakeBus, BANK1_REGS, FIQ_CONTROL as CONTROL, ROOT_REGS},
            BankDescriptor, ControllerBuilder,
        },
    };

    fn irq(n: u32) -> IrqNumber {
        IrqNumber::new(n)
    }

    #[test]
    fn routing_masks_the_source_first() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        assert_eq!(tree.controller.route_to_fiq(irq(37)), Ok(()));
        assert_eq!(
            bus.writes(),
            vec![(BANK1_REGS.disable, 1 << 5), (CONTROL, 0x80 | 5)]
        );
        assert_eq!(tree.controller.fiq_source(), Ok(Some(irq(37))));
    }

    #[test]
    fn root_sources_use_the_root_fiq_window() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        assert_eq!(tree.controller.route_to_fiq(irq(3)), Ok(()));
        assert_eq!(
            bus.writes(),
            vec![(ROOT_REGS.disable, 1 << 3), (CONTROL, 0x80 | 67)]
        );
    }

    #[test]
    fn second_source_is_refused() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        tree.controller.route_to_fiq(irq(37)).unwrap();
        bus.clear_log();

        assert_eq!(
            tree.controller.route_to_fiq(irq(3)),
            Err(FiqError::InUse {
                irq: irq(3),
                current: irq(37)
            })
        );
        assert_eq!(tree.controller.route_to_fiq(irq(37)), Ok(()));
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn route_to_irq_returns_previous_source_still_masked() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        tree.controller.route_to_fiq(irq(37)).unwrap();
        bus.clear_log();

        assert_eq!(tree.controller.route_to_irq(), Ok(Some(irq(37))));
        assert_eq!(bus.writes(), vec![(CONTROL, 0)]);
        assert_eq!(bus.enabled(BANK1_REGS.pending) & (1 << 5), 0);
        assert_eq!(tree.controller.fiq_source(), Ok(None));

        // Free again.
        assert_eq!(tree.controller.route_to_fiq(irq(3)), Ok(()));
        assert_eq!(tree.controller.route_to_irq(), Ok(Some(irq(3))));
        assert_eq!(tree.controller.route_to_irq(), Ok(None));
    }

    #[test]
    fn bank_without_fiq_window_is_refused() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        assert_eq!(
            tree.controller.route_to_fiq(irq(70)),
            Err(FiqError::NoFiqIndex { irq: irq(70) })
        );
        assert!(bus.writes().is_empty());
        assert_eq!(tree.controller.route_to_irq(), Ok(None));
    }

    #[test]
    fn only_sources_can_be_routed() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        assert_eq!(
            tree.controller.route_to_fiq(irq(8)),
            Err(FiqError::Mask {
                error: MaskError::Unmaskable { irq: irq(8) }
            })
        );
        assert!(matches!(
            tree.controller.route_to_fiq(irq(10)),
            Err(FiqError::Mask {
                error: MaskError::WrongLevel { .. }
            })
        ));
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn unknown_hardware_source_is_reported() {
        let bus = FakeBus::new();
        let tree = fake::scenario_tree(&bus);

        // Root window bit 8 is a cascade line, not a source.
        bus.write32(CONTROL, 0x80 | 72);
        assert_eq!(
            tree.controller.fiq_source(),
            Err(FiqError::UnknownSource { index: 72 })
        );
    }

    #[test]
    fn controller_without_fiq_register() {
        let bus = FakeBus::new();
        let mut builder = ControllerBuilder::new();
        builder
            .add_root(&BankDescriptor::new("root", ROOT_REGS, 0).fiq_base(0))
            .unwrap();
        let controller = builder.build(&bus).unwrap();

        assert_eq!(controller.route_to_fiq(irq(1)), Err(FiqError::NotConfigured));
        assert_eq!(controller.route_to_irq(), Err(FiqError::NotConfigured));
        assert_eq!(controller.fiq_source(), Err(FiqError::NotConfigured));
    }
}
