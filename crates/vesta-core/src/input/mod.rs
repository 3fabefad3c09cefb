// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Backend-agnostic input identifiers: mouse buttons, controllers and gamepad kinds.

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// The left mouse button.
    Left,
    /// The right mouse button.
    Right,
    /// The middle mouse button.
    Middle,
    /// The back mouse button (typically on the side).
    Back,
    /// The forward mouse button (typically on the side).
    Forward,
    /// Another mouse button, identified by a numeric code.
    Other(u16),
}

/// Well-known gamepad families, used to pick button glyphs and layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamepadKind {
    Xbox,
    DualShock4,
    DualShock5,
    Nintendo,
}

const VENDOR_MICROSOFT: u16 = 0x045E;
const VENDOR_SONY: u16 = 0x054C;
const VENDOR_NINTENDO: u16 = 0x057E;

const SONY_DUALSHOCK4: [u16; 2] = [0x05C4, 0x09CC];
const SONY_DUALSENSE: [u16; 2] = [0x0CE6, 0x0DF2];

impl GamepadKind {
    /// Identifies a gamepad family from its USB vendor and product ids.
    ///
    /// Unknown Sony products are treated as DualShock 4; unknown vendors
    /// return `None` and are usually presented with an Xbox layout.
    pub fn from_ids(vendor: u16, product: u16) -> Option<Self> {
        match vendor {
            VENDOR_MICROSOFT => Some(GamepadKind::Xbox),
            VENDOR_NINTENDO => Some(GamepadKind::Nintendo),
            VENDOR_SONY if SONY_DUALSENSE.contains(&product) => Some(GamepadKind::DualShock5),
            VENDOR_SONY if SONY_DUALSHOCK4.contains(&product) => Some(GamepadKind::DualShock4),
            VENDOR_SONY => Some(GamepadKind::DualShock4),
            _ => None,
        }
    }
}

/// Identity of a connected controller, as reported when it connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    /// Slot the controller occupies until it disconnects.
    pub index: u32,
    pub name: String,
    pub button_count: u32,
    pub axis_count: u32,
    /// `true` if the device maps to the standard gamepad layout.
    pub is_gamepad: bool,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

impl ControllerInfo {
    /// The gamepad family, if this controller is a recognized gamepad.
    pub fn gamepad_kind(&self) -> Option<GamepadKind> {
        if self.is_gamepad {
            GamepadKind::from_ids(self.vendor, self.product)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(vendor: u16, product: u16, is_gamepad: bool) -> ControllerInfo {
        ControllerInfo {
            index: 0,
            name: "Test Pad".to_string(),
            button_count: 15,
            axis_count: 6,
            is_gamepad,
            vendor,
            product,
            version: 1,
        }
    }

    #[test]
    fn known_vendors_map_to_families() {
        assert_eq!(GamepadKind::from_ids(0x045E, 0x02EA), Some(GamepadKind::Xbox));
        assert_eq!(GamepadKind::from_ids(0x057E, 0x2009), Some(GamepadKind::Nintendo));
        assert_eq!(GamepadKind::from_ids(0x054C, 0x09CC), Some(GamepadKind::DualShock4));
        assert_eq!(GamepadKind::from_ids(0x054C, 0x0CE6), Some(GamepadKind::DualShock5));
    }

    #[test]
    fn unknown_vendor_has_no_family() {
        assert_eq!(GamepadKind::from_ids(0x1234, 0x0001), None);
    }

    #[test]
    fn joysticks_are_not_gamepads() {
        assert_eq!(controller(0x045E, 0x02EA, false).gamepad_kind(), None);
        assert_eq!(
            controller(0x045E, 0x02EA, true).gamepad_kind(),
            Some(GamepadKind::Xbox)
        );
    }
}
