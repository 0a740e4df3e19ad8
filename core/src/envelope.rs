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

//! Confidential envelope codec.
//!
//! A contract message is the hex encoded hash of the code it expects to run,
//! followed by the (possibly encrypted) payload. Replies to confidential
//! calls additionally embed reply-routing metadata, see
//! [`DataWithInternalReplyInfo`]. The cryptography itself belongs to the
//! runtime, the host only moves these bytes around.

use crate::{
    ids::{Address, CodeHash, HASH_LENGTH},
    message::Binary,
};
use compute_core_errors::ComputeError;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// Length of the code hash prefix of an envelope.
pub const CODE_HASH_PREFIX_LENGTH: usize = HASH_LENGTH * 2;

/// Builds an envelope addressed to code with the given hash.
pub fn wrap(code_hash: &str, payload: &[u8]) -> Vec<u8> {
    let code_hash = code_hash.strip_prefix("0x").unwrap_or(code_hash);

    let mut msg = Vec::with_capacity(code_hash.len() + payload.len());
    msg.extend_from_slice(code_hash.to_ascii_lowercase().as_bytes());
    msg.extend_from_slice(payload);
    msg
}

/// Splits an envelope into the expected code hash and the payload.
pub fn split(msg: &[u8]) -> Result<(CodeHash, &[u8]), ComputeError> {
    if msg.len() < CODE_HASH_PREFIX_LENGTH {
        return Err(ComputeError::InvalidEnvelope(format!(
            "envelope of {} bytes is shorter than its code hash prefix",
            msg.len()
        )));
    }

    let (prefix, payload) = msg.split_at(CODE_HASH_PREFIX_LENGTH);
    let code_hash = core::str::from_utf8(prefix)
        .ok()
        .and_then(|prefix| prefix.parse().ok())
        .ok_or_else(|| ComputeError::InvalidEnvelope("code hash prefix is not hex".into()))?;

    Ok((code_hash, payload))
}

/// Data of a confidential call together with the metadata routing its reply.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DataWithInternalReplyInfo {
    /// Runtime-issued authentication tag over the reply.
    pub internal_reply_enclave_sig: Binary,
    /// Internal correlation id of the submessage.
    pub internal_msg_id: Binary,
    /// Inner data of the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Binary>,
}

impl DataWithInternalReplyInfo {
    /// Parses the metadata and checks that both routing fields are present.
    pub fn parse(bytes: &[u8]) -> Result<Self, ComputeError> {
        let info: Self = serde_json::from_slice(bytes).map_err(|err| {
            ComputeError::Configuration(format!("cannot parse internal reply info: {err}"))
        })?;

        if info.internal_reply_enclave_sig.is_empty() {
            return Err(ComputeError::Configuration(
                "internal_reply_enclave_sig is empty".into(),
            ));
        }

        if info.internal_msg_id.is_empty() {
            return Err(ComputeError::Configuration(
                "internal_msg_id is empty".into(),
            ));
        }

        Ok(info)
    }

    /// JSON encoding.
    pub fn to_json(&self) -> Result<Vec<u8>, ComputeError> {
        serde_json::to_vec(self).map_err(|err| ComputeError::Configuration(err.to_string()))
    }
}

/// Kind of a contract call, selecting its ledger response wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ContractCallKind {
    /// Contract instantiation.
    #[display("instantiate")]
    Instantiate,
    /// Contract execution.
    #[display("execute")]
    Execute,
    /// Contract migration.
    #[display("migrate")]
    Migrate,
}

/// Ledger response of an instantiation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgInstantiateContractResponse {
    /// Address of the new contract.
    pub address: Address,
    /// Data returned by the contract.
    pub data: Vec<u8>,
}

/// Ledger response of an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgExecuteContractResponse {
    /// Data returned by the contract.
    pub data: Vec<u8>,
}

/// Ledger response of a migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgMigrateContractResponse {
    /// Data returned by the contract.
    pub data: Vec<u8>,
}

/// Recovers the contract data from the ledger response wrapper of `kind`.
pub fn unwrap_response(kind: ContractCallKind, mut bytes: &[u8]) -> Result<Vec<u8>, ComputeError> {
    let decode_err = |err: parity_scale_codec::Error| {
        ComputeError::Configuration(format!("cannot decode {kind} response: {err}"))
    };

    let data = match kind {
        ContractCallKind::Instantiate => {
            MsgInstantiateContractResponse::decode(&mut bytes)
                .map_err(decode_err)?
                .data
        }
        ContractCallKind::Execute => {
            MsgExecuteContractResponse::decode(&mut bytes)
                .map_err(decode_err)?
                .data
        }
        ContractCallKind::Migrate => {
            MsgMigrateContractResponse::decode(&mut bytes)
                .map_err(decode_err)?
                .data
        }
    };

    Ok(data)
}
