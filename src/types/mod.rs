// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fixed-width value types shared by the registry, the node and the CLI.

/// Implements hex parsing/formatting and serde for a fixed-width byte newtype.
///
/// Human-readable formats (JSON) see a `0x`-prefixed lowercase hex string,
/// binary formats (bincode) see the raw byte array.
macro_rules! fixed_bytes {
    ($name:ident, $len:expr) => {
        impl $name {
            /// Width in bytes.
            pub const LEN: usize = $len;

            /// The all-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Builds a value from a slice of exactly `LEN` bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, $crate::error::ParseError> {
                let arr: [u8; $len] =
                    bytes
                        .try_into()
                        .map_err(|_| $crate::error::ParseError::InvalidLength {
                            expected: $len,
                            found: bytes.len(),
                        })?;
                Ok(Self(arr))
            }

            /// `0x`-prefixed lowercase hex.
            pub fn to_hex(&self) -> alloc::string::String {
                let mut s = alloc::string::String::with_capacity(2 + 2 * $len);
                s.push_str("0x");
                s.push_str(&hex::encode(self.0));
                s
            }
        }

        impl core::str::FromStr for $name {
            type Err = $crate::error::ParseError;

            /// Accepts hex with or without a `0x` prefix.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                if digits.len() % 2 != 0 {
                    return Err($crate::error::ParseError::InvalidHex);
                }
                if digits.len() != 2 * $len {
                    return Err($crate::error::ParseError::InvalidLength {
                        expected: $len,
                        found: digits.len() / 2,
                    });
                }
                let mut out = [0u8; $len];
                hex::decode_to_slice(digits, &mut out)
                    .map_err(|_| $crate::error::ParseError::InvalidHex)?;
                Ok(Self(out))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("0x")?;
                for b in self.0.iter() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    serde::Serialize::serialize(&self.0, serializer)
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = <alloc::string::String as serde::Deserialize>::deserialize(deserializer)?;
                    s.parse().map_err(serde::de::Error::custom)
                } else {
                    <[u8; $len] as serde::Deserialize>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

pub mod id;
pub mod digest;
