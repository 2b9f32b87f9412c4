/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

pub mod bcm2708;

/// See BCM2835-ARM-Peripherals.pdf
/// See <https://www.raspberrypi.org/forums/viewtopic.php?t=186090> for more details.
pub struct BcmHost;

// Per <https://www.raspberrypi.com/documentation/computers/raspberry-pi.html#peripheral-addresses>:
//
// SoC     Peripheral Address   Peripheral Size
// BCM2835 0x20000000           0x01000000
// BCM2836 0x3f000000           0x01000000
// BCM2837 0x3f000000           0x01000000
// BCM2711 0xfe000000           0x01800000

/// Offset of the ARM control block (interrupt controller) from the peripheral base.
pub const ARMCTRL_OFFSET: usize = 0xb200;

cfg_if::cfg_if! {
    if #[cfg(feature = "rpi1")] {
        impl BcmHost {
            /// Name of the hardware device this BcmHost is compiled for.
            pub const fn board_name() -> &'static str {
                "Raspberry Pi 1"
            }

            /// This returns the ARM-side physical address where peripherals are mapped.
            pub const fn get_peripheral_address() -> usize {
                0x2000_0000
            }
        }
    } else if #[cfg(feature = "rpi3")] {
        impl BcmHost {
            /// Name of the hardware device this BcmHost is compiled for.
            pub const fn board_name() -> &'static str {
                "Raspberry Pi 3+"
            }

            /// This returns the ARM-side physical address where peripherals are mapped.
            pub const fn get_peripheral_address() -> usize {
                0x3f00_0000
            }
        }
    } else if #[cfg(feature = "rpi4")] {
        impl BcmHost {
            /// Name of the hardware device this BcmHost is compiled for.
            pub const fn board_name() -> &'static str {
                "Raspberry Pi 4+"
            }

            /// This returns the ARM-side physical address where peripherals are mapped.
            pub const fn get_peripheral_address() -> usize {
                0xfe00_0000
            }
        }
    }
}

#[cfg(any(feature = "rpi1", feature = "rpi3", feature = "rpi4"))]
impl BcmHost {
    /// ARM-side physical address of the ARM control block.
    pub const fn get_armctrl_address() -> usize {
        Self::get_peripheral_address() + ARMCTRL_OFFSET
    }
}
