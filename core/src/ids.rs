// This file is part of Gear.

// Copyright (C) 2021-2025 Gear Technologies Inc.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Base identifiers: code ids, code hashes and account addresses.

use core::{fmt, str::FromStr};
use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use sha2::{Digest, Sha256};

/// Sequential identifier of stored contract code.
pub type CodeId = u64;

/// Length of an account address.
pub const ADDRESS_LENGTH: usize = 20;
/// Length of a code hash.
pub const HASH_LENGTH: usize = 32;

/// Declares a fixed-size byte identifier rendered as `0x`-prefixed hex.
macro_rules! declare_id {
    ($name:ident, $len:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Clone,
            Copy,
            Default,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            parity_scale_codec::Decode,
            parity_scale_codec::Encode,
            scale_info::TypeInfo,
            derive_more::From,
        )]
        pub struct $name([u8; $len]);

        impl $name {
            /// Creates the id from a bytes array.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Returns id as bytes array.
            pub fn into_bytes(self) -> [u8; $len] {
                self.0
            }

            /// Builds the id from a slice of exactly the right length.
            pub fn try_from_slice(slice: &[u8]) -> Option<Self> {
                slice.try_into().ok().map(Self)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
                } else {
                    write!(f, "0x{}", hex::encode(self.0))
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut id = [0u8; $len];
                hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut id)?;

                Ok(Self(id))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(D::Error::custom)
            }
        }
    };
}

declare_id!(Address, ADDRESS_LENGTH, "Account address of a user, a module or a contract.");

impl Address {
    /// Derives the address of the `instance_id`-th contract created from `code_id`.
    ///
    /// `ripemd160(sha256(be_u64((code_id << 32) + instance_id) ++ creator))`
    pub fn contract(code_id: CodeId, instance_id: u64, creator: &Address) -> Self {
        let contract_id = (code_id << 32).wrapping_add(instance_id);

        let mut source = Vec::with_capacity(8 + ADDRESS_LENGTH);
        source.extend(contract_id.to_be_bytes());
        source.extend_from_slice(creator.as_ref());

        let sha = Sha256::digest(&source);
        Self(Ripemd160::digest(sha).into())
    }
}

declare_id!(CodeHash, HASH_LENGTH, "Content hash of contract code.");

impl CodeHash {
    /// Generates the hash of the given code.
    pub fn generate(code: &[u8]) -> Self {
        Self(Sha256::digest(code).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_addresses_are_unique_per_instance() {
        let creator = Address::from([7; ADDRESS_LENGTH]);

        let first = Address::contract(1, 1, &creator);
        let second = Address::contract(1, 2, &creator);
        let other_code = Address::contract(2, 1, &creator);

        assert_ne!(first, second);
        assert_ne!(first, other_code);
        assert_eq!(first, Address::contract(1, 1, &creator));
    }

    #[test]
    fn hex_representation() {
        let addr = Address::from([0xab; ADDRESS_LENGTH]);
        let repr = addr.to_string();

        assert_eq!(repr, format!("0x{}", "ab".repeat(ADDRESS_LENGTH)));
        assert_eq!(repr.parse::<Address>(), Ok(addr));
        assert_eq!(repr[2..].parse::<Address>(), Ok(addr));
        assert!("0x1234".parse::<Address>().is_err());
    }

    #[test]
    fn serde_uses_hex_strings() {
        let hash = CodeHash::generate(b"code");
        let json = serde_json::to_string(&hash).unwrap();

        assert_eq!(json, format!("\"{hash}\""));
        assert_eq!(serde_json::from_str::<CodeHash>(&json).unwrap(), hash);
    }
}
