//! Macros for defining typed handle types.

/// Macro to define a typed capability handle with a specific prefix.
///
/// This generates a newtype wrapper around a raw capability slot with:
/// - A `PREFIX` constant
/// - `from_slot()` to wrap a slot minted by the backend
/// - `parse()` to parse from string
/// - `Display` and `FromStr` implementations
/// - `Serialize` and `Deserialize` implementations
/// - `Ord`, `Hash`, and other standard traits
///
/// Handles are never minted client-side: the backend owns slot allocation,
/// so there is no `new()`.
///
/// # Example
///
/// ```ignore
/// define_handle!(ImageHandle, "img");
/// define_handle!(RegionHandle, "mem");
///
/// let image = ImageHandle::from_slot(42);
/// let parsed: ImageHandle = "img_0000002a".parse()?;
/// ```
#[macro_export]
macro_rules! define_handle {
    ($name:ident, $prefix:literal) => {
        /// A typed handle for this kernel object type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// The prefix for this handle type.
            pub const PREFIX: &'static str = $prefix;

            /// Wraps a raw capability slot.
            #[must_use]
            pub const fn from_slot(slot: u64) -> Self {
                Self(slot)
            }

            /// Returns the underlying capability slot.
            #[must_use]
            pub const fn slot(&self) -> u64 {
                self.0
            }

            /// Parses a handle from a string.
            ///
            /// The string must be in the format `{prefix}_{slot:08x}`.
            pub fn parse(s: &str) -> Result<Self, $crate::HandleError> {
                if s.is_empty() {
                    return Err($crate::HandleError::Empty);
                }

                let Some((prefix, slot_str)) = s.rsplit_once('_') else {
                    return Err($crate::HandleError::MissingSeparator);
                };

                if prefix != Self::PREFIX {
                    return Err($crate::HandleError::InvalidPrefix {
                        expected: Self::PREFIX,
                        actual: prefix.to_string(),
                    });
                }

                let slot = u64::from_str_radix(slot_str, 16)
                    .map_err(|e| $crate::HandleError::InvalidSlot(e.to_string()))?;

                Ok(Self(slot))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{:08x}", Self::PREFIX, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::HandleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
