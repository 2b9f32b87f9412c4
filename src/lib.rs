/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Cascaded interrupt controller driver for the BCM ARM control block.
//!
//! Turns the pending registers of a tree of interrupt banks into an ordered stream of logical
//! interrupt numbers, and masks, unmasks and routes individual sources to FIQ.
//!
//! Diagnostics go through the `log` facade; the embedding kernel installs the logger.

#![cfg_attr(not(test), no_std)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::nonstandard_macro_braces)] // https://github.com/shepmaster/snafu/issues/296

pub mod armctrl;
pub mod exception;
pub mod mmio;
pub mod platform;
pub mod sync;
