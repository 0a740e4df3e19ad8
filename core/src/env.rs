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

//! Invocation environment passed to the contract runtime.

use crate::{
    ids::{Address, CodeHash},
    message::{Binary, Coin},
};
use serde::{Deserialize, Serialize};

/// Block the transaction is included in.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockInfo {
    /// Block height.
    pub height: u64,
    /// Block time in nanoseconds since the unix epoch.
    pub time: u64,
    /// Chain identifier.
    pub chain_id: String,
    /// Block randomness, if the chain provides one.
    pub random: Option<Binary>,
}

/// Caller of the invocation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    /// Direct sender: a user or the calling contract.
    pub sender: Address,
    /// Funds credited to the contract before the call.
    pub sent_funds: Vec<Coin>,
}

/// Invoked contract.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContractEnv {
    /// Contract address.
    pub address: Address,
    /// Hash of the running code.
    pub code_hash: CodeHash,
}

/// Full environment of one invocation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Env {
    /// Current block.
    pub block: BlockInfo,
    /// Caller and funds.
    pub message: MessageInfo,
    /// Callee.
    pub contract: ContractEnv,
    /// Opaque per-contract confidential key, absent on instantiation.
    pub contract_key: Option<Binary>,
}

/// Signing mode of the transaction that started the call tree.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignMode {
    /// Not specified. Used for replies and callbacks.
    #[default]
    #[serde(rename = "SIGN_MODE_UNSPECIFIED")]
    Unspecified,
    /// Protobuf direct signing.
    #[serde(rename = "SIGN_MODE_DIRECT")]
    Direct,
    /// Legacy amino JSON signing.
    #[serde(rename = "SIGN_MODE_LEGACY_AMINO_JSON")]
    LegacyAminoJson,
}

/// Signature context the runtime uses to authenticate a call.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SigInfo {
    /// Bytes of the signed transaction.
    pub tx_bytes: Binary,
    /// Signing mode.
    pub sign_mode: SignMode,
    /// Encoded signing mode details.
    pub mode_info: Binary,
    /// Public key of the signer.
    pub public_key: Binary,
    /// Signature of the signer.
    pub signature: Binary,
    /// Runtime-issued signature of a contract-originated call.
    pub callback_signature: Binary,
}

impl SigInfo {
    /// Context carrying nothing but an unspecified sign mode.
    pub fn unspecified() -> Self {
        Self::default()
    }

    /// Context of a contract-originated call authorized by `callback_sig`.
    pub fn callback(callback_sig: Binary) -> Self {
        Self {
            callback_signature: callback_sig,
            ..Self::default()
        }
    }
}

/// Entry point of a handle call.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandleType {
    /// `execute` entry point.
    Execute,
    /// `reply` entry point.
    Reply,
}
