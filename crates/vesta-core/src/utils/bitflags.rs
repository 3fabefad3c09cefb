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

//! A small declarative macro for flag sets that cross the platform boundary
//! (window flags, clear masks, blend channel masks).

/// Declares a `Copy` flag-set type over an unsigned integer.
///
/// Every declared constant becomes an associated constant of the type, and
/// `all()` is the union of them. Bits outside that union are dropped by
/// `from_bits_truncate` and rejected by `from_bits`.
#[macro_export]
macro_rules! vesta_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// The empty set.
            pub const fn empty() -> Self {
                Self { bits: 0 }
            }

            /// The union of every declared flag.
            pub const fn all() -> Self {
                Self { bits: 0 $(| $flag_value)* }
            }

            /// Builds a set from raw bits, or `None` if unknown bits are present.
            pub const fn from_bits(bits: $ty) -> Option<Self> {
                if bits & !Self::all().bits == 0 {
                    Some(Self { bits })
                } else {
                    None
                }
            }

            /// Builds a set from raw bits, discarding unknown bits.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits: bits & Self::all().bits }
            }

            /// The raw bits of the set.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// `true` if every flag of `other` is set in `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// `true` if at least one flag of `other` is set in `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// Inserts or removes `other` depending on `value`.
            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self::from_bits_truncate(!self.bits)
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::ops::BitAndAssign for $name {
            fn bitand_assign(&mut self, other: Self) {
                self.bits &= other.bits;
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut remaining = self.bits;
                let mut names: Vec<&'static str> = Vec::new();
                $(
                    if ($flag_value != 0) && (remaining & $flag_value) == $flag_value {
                        names.push(stringify!($flag_name));
                        remaining &= !$flag_value;
                    }
                )*
                if names.is_empty() {
                    write!(f, "{}(EMPTY)", stringify!($name))
                } else {
                    write!(f, "{}({})", stringify!($name), names.join(" | "))
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::vesta_bitflags! {
        /// Flags used only to exercise the macro.
        pub struct Channels: u8 {
            const RED = 1 << 0;
            const GREEN = 1 << 1;
            const BLUE = 1 << 2;
        }
    }

    #[test]
    fn all_is_the_union_of_declared_flags() {
        assert_eq!(Channels::all().bits(), 0b111);
        assert!(Channels::all().contains(Channels::RED | Channels::BLUE));
    }

    #[test]
    fn unknown_bits_are_dropped_or_rejected() {
        assert_eq!(Channels::from_bits_truncate(0xFF), Channels::all());
        assert_eq!(Channels::from_bits(0b1000), None);
        assert_eq!(Channels::from_bits(0b010), Some(Channels::GREEN));
    }

    #[test]
    fn insert_remove_and_set() {
        let mut flags = Channels::empty();
        assert!(flags.is_empty());

        flags.insert(Channels::RED);
        flags.set(Channels::BLUE, true);
        assert!(flags.contains(Channels::RED | Channels::BLUE));
        assert!(!flags.intersects(Channels::GREEN));

        flags.set(Channels::RED, false);
        assert_eq!(flags, Channels::BLUE);
    }

    #[test]
    fn not_stays_within_declared_flags() {
        assert_eq!(!Channels::RED, Channels::GREEN | Channels::BLUE);
    }

    #[test]
    fn debug_lists_flag_names() {
        assert_eq!(format!("{:?}", Channels::RED | Channels::BLUE), "Channels(RED | BLUE)");
        assert_eq!(format!("{:?}", Channels::empty()), "Channels(EMPTY)");
    }
}
