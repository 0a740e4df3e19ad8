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

//! Ledger store layout.

use compute_core::ids::{Address, CodeHash, CodeId};

const CODE_KEY_PREFIX: u8 = 0x01;
const CONTRACT_KEY_PREFIX: u8 = 0x02;
const CONTRACT_STORE_PREFIX: u8 = 0x03;
const SEQUENCE_KEY_PREFIX: u8 = 0x04;
const CODE_BYTES_PREFIX: u8 = 0x05;
const CONTRACT_ENCLAVE_KEY_PREFIX: u8 = 0x06;
const CONTRACT_LABEL_PREFIX: u8 = 0x07;
const ACCOUNT_PREFIX: u8 = 0x10;
const BALANCE_PREFIX: u8 = 0x11;

fn key(prefix: u8, parts: &[&[u8]]) -> Vec<u8> {
    let mut key = vec![prefix];
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Sequence of the last stored code id.
pub fn last_code_id() -> Vec<u8> {
    key(SEQUENCE_KEY_PREFIX, &[b"lastCodeId"])
}

/// Sequence of the last instantiated contract.
pub fn last_instance_id() -> Vec<u8> {
    key(SEQUENCE_KEY_PREFIX, &[b"lastContractId"])
}

/// Code info of `code_id`.
pub fn code(code_id: CodeId) -> Vec<u8> {
    key(CODE_KEY_PREFIX, &[&code_id.to_be_bytes()])
}

/// Code bytes with the given hash.
pub fn code_bytes(code_hash: &CodeHash) -> Vec<u8> {
    key(CODE_BYTES_PREFIX, &[code_hash.as_ref()])
}

/// Contract info.
pub fn contract(addr: &Address) -> Vec<u8> {
    key(CONTRACT_KEY_PREFIX, &[addr.as_ref()])
}

/// Prefix of the contract's own storage.
pub fn contract_store_prefix(addr: &Address) -> Vec<u8> {
    key(CONTRACT_STORE_PREFIX, &[addr.as_ref()])
}

/// Confidential key of the contract.
pub fn contract_enclave_key(addr: &Address) -> Vec<u8> {
    key(CONTRACT_ENCLAVE_KEY_PREFIX, &[addr.as_ref()])
}

/// Contract address registered under `label`.
pub fn contract_label(label: &str) -> Vec<u8> {
    key(CONTRACT_LABEL_PREFIX, &[label.as_bytes()])
}

/// Account existence marker.
pub fn account(addr: &Address) -> Vec<u8> {
    key(ACCOUNT_PREFIX, &[addr.as_ref()])
}

/// Balance of `denom` held by `addr`.
pub fn balance(addr: &Address, denom: &str) -> Vec<u8> {
    key(BALANCE_PREFIX, &[addr.as_ref(), denom.as_bytes()])
}
