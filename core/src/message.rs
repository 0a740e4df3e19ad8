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

//! Messages exchanged with contracts through the runtime boundary.
//!
//! Everything here is serialized as JSON, field names follow the contract
//! standard library so contracts can decode them directly.

use crate::ids::CodeId;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use core::fmt;
use enum_iterator::Sequence;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

/// Opaque bytes, base64 encoded in JSON.
#[derive(
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    derive_more::From,
    derive_more::Into,
    derive_more::Deref,
    derive_more::DerefMut,
)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    /// Returns the inner bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Base64 representation.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl From<&[u8]> for Binary {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Binary {
    fn from(bytes: &[u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for Binary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Binary(0x{})", hex::encode(&self.0))
    }
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map(Self).map_err(D::Error::custom)
    }
}

/// Coin as seen by contracts. The amount is a decimal string.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Coin {
    /// Denomination.
    pub denom: String,
    /// Decimal amount.
    pub amount: String,
}

impl Coin {
    /// New coin with an integer amount.
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Key-value pair of an event.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Attribute {
    /// Key. Encrypted for confidential contracts.
    pub key: String,
    /// Value.
    pub value: String,
}

impl Attribute {
    /// New attribute.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Typed event emitted by the ledger or by a contract.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    /// Event category.
    #[serde(rename = "type")]
    pub ty: String,
    /// Ordered attributes.
    pub attributes: Vec<Attribute>,
}

impl Event {
    /// Category the ledger assigns to generic "message dispatched" events.
    pub const MESSAGE: &'static str = "message";

    /// New event without attributes.
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute.
    pub fn add_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    /// Value of the first attribute with the given key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

/// When the calling contract wants to be resumed with the result of a submessage.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Sequence)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOn {
    /// Always reply.
    Always,
    /// Reply only on error.
    #[serde(rename = "error")]
    OnError,
    /// Reply only on success.
    #[serde(rename = "success")]
    OnSuccess,
    /// Never reply.
    #[default]
    Never,
    /// Any value the contract sent that is not recognized.
    #[serde(other)]
    Unrecognized,
}

/// Ledger transfer actions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BankMsg {
    /// Transfer from the contract account.
    Send {
        /// Recipient address.
        to_address: String,
        /// Coins to transfer.
        amount: Vec<Coin>,
    },
}

/// Contract-to-contract calls.
///
/// `msg` is the confidential envelope for the callee, `code_hash` is the
/// hash the caller expects the callee to run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WasmMsg {
    /// Execute an existing contract.
    Execute {
        /// Callee address.
        contract_addr: String,
        /// Expected code hash of the callee.
        code_hash: String,
        /// Envelope payload.
        msg: Binary,
        /// Funds sent along.
        #[serde(default)]
        send: Vec<Coin>,
        /// Runtime-issued signature authorizing the call.
        #[serde(default)]
        callback_signature: Option<Binary>,
    },
    /// Instantiate a new contract.
    Instantiate {
        /// Code to instantiate.
        code_id: CodeId,
        /// Expected code hash.
        code_hash: String,
        /// Envelope payload.
        msg: Binary,
        /// Funds sent along.
        #[serde(default)]
        send: Vec<Coin>,
        /// Unique human readable label.
        label: String,
        /// Optional admin allowed to migrate the contract.
        #[serde(default)]
        admin: Option<String>,
        /// Runtime-issued signature authorizing the call.
        #[serde(default)]
        callback_signature: Option<Binary>,
    },
    /// Migrate an existing contract to new code.
    Migrate {
        /// Contract to migrate.
        contract_addr: String,
        /// Expected code hash of the new code.
        code_hash: String,
        /// New code.
        code_id: CodeId,
        /// Envelope payload.
        msg: Binary,
        /// Runtime-issued signature authorizing the call.
        #[serde(default)]
        callback_signature: Option<Binary>,
    },
}

/// Action a contract asks the ledger to perform.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CosmosMsg {
    /// Token transfer.
    Bank(BankMsg),
    /// Contract call.
    Wasm(WasmMsg),
    /// Opaque ledger-native message.
    Stargate {
        /// Route of the message.
        type_url: String,
        /// Encoded message.
        value: Binary,
    },
    /// Terminal marker: nothing can be dispatched after it in the same transaction.
    FinalizeTx {},
}

/// Follow-up action requested by a contract.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SubMsg {
    /// Reply correlation token.
    pub id: u64,
    /// Requested action.
    pub msg: CosmosMsg,
    /// Optional ledger gas cap.
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Reply policy.
    #[serde(default)]
    pub reply_on: ReplyOn,
    /// Whether the action payload was a confidential envelope.
    #[serde(default)]
    pub was_msg_encrypted: bool,
}

impl SubMsg {
    /// Fire-and-forget submessage.
    pub fn new(msg: CosmosMsg) -> Self {
        Self {
            id: 0,
            msg,
            gas_limit: None,
            reply_on: ReplyOn::Never,
            was_msg_encrypted: false,
        }
    }

    /// Submessage replying according to `reply_on`.
    pub fn reply_on(msg: CosmosMsg, id: u64, reply_on: ReplyOn) -> Self {
        Self {
            id,
            reply_on,
            ..Self::new(msg)
        }
    }

    /// Caps the gas of the submessage.
    pub fn with_gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    /// Marks the action payload as a confidential envelope.
    pub fn encrypted(mut self) -> Self {
        self.was_msg_encrypted = true;
        self
    }
}

/// Successful submessage execution as reported to the caller.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubMsgResponse {
    /// Events committed by the submessage.
    pub events: Vec<Event>,
    /// Data of the first executed ledger message.
    pub data: Option<Binary>,
}

/// Outcome of a submessage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubMsgResult {
    /// Submessage succeeded.
    Ok(SubMsgResponse),
    /// Submessage failed, with a possibly redacted message.
    #[serde(rename = "error")]
    Err(String),
}

impl SubMsgResult {
    /// Whether the submessage succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Result of a submessage delivered back to the contract that sent it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// Correlation token: decimal submessage id or the internal message id.
    pub id: Binary,
    /// Outcome.
    pub result: SubMsgResult,
    /// Whether the submessage payload was encrypted.
    pub was_orig_msg_encrypted: bool,
    /// Whether this reply travels through the confidential codec.
    pub is_encrypted: bool,
}

/// Successful contract invocation output.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    /// Submessages to dispatch.
    #[serde(default)]
    pub messages: Vec<SubMsg>,
    /// Attributes of the contract `wasm` event.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Custom events, emitted as `wasm-{type}`.
    #[serde(default)]
    pub events: Vec<Event>,
    /// Returned data.
    #[serde(default)]
    pub data: Option<Binary>,
}

impl Response {
    /// Appends a submessage.
    pub fn add_submessage(mut self, msg: SubMsg) -> Self {
        self.messages.push(msg);
        self
    }

    /// Appends an attribute to the `wasm` event.
    pub fn add_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    /// Appends a custom event.
    pub fn add_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Sets returned data.
    pub fn set_data(mut self, data: impl Into<Binary>) -> Self {
        self.data = Some(data.into());
        self
    }
}
