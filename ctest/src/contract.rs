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

//! Scriptable mock contract.
//!
//! Every message is a [`Script`] telling the contract what to do. Replies
//! are recorded in storage under `reply/{id}` and then run the script
//! registered with [`Script::on_reply`].

use crate::mock::{ContractCall, MockContract, MockResult, contract_error};
use compute_core::message::{Attribute, Binary, Event, Reply, Response, SubMsg};
use compute_core_processor::RuntimeError;
use serde::{Deserialize, Serialize};

const ON_REPLY_KEY: &[u8] = b"on_reply";

/// Storage key of the reply recorded for `id`.
pub fn reply_key(id: &[u8]) -> String {
    format!("reply/{}", String::from_utf8_lossy(id))
}

/// Actions of one contract invocation, performed in field order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    /// Storage writes.
    pub store: Vec<(String, String)>,
    /// Script run by the reply entry point.
    pub on_reply: Option<Box<Script>>,
    /// Runtime gas to burn.
    pub burn: u64,
    /// Failure returned after the writes.
    pub fail: Option<String>,
    /// Submessages.
    pub messages: Vec<SubMsg>,
    /// Attributes of the `wasm` event.
    pub attributes: Vec<Attribute>,
    /// Custom events.
    pub events: Vec<Event>,
    /// Returned data.
    pub data: Option<Binary>,
}

impl Script {
    /// Script doing nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` under `key`.
    pub fn store(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.store.push((key.into(), value.into()));
        self
    }

    /// Runs `script` on every following reply.
    pub fn on_reply(mut self, script: Script) -> Self {
        self.on_reply = Some(Box::new(script));
        self
    }

    /// Burns runtime gas.
    pub fn burn(mut self, runtime_gas: u64) -> Self {
        self.burn = runtime_gas;
        self
    }

    /// Fails with `error`.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.fail = Some(error.into());
        self
    }

    /// Sends a submessage.
    pub fn message(mut self, msg: SubMsg) -> Self {
        self.messages.push(msg);
        self
    }

    /// Adds an attribute to the `wasm` event.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    /// Emits a custom event.
    pub fn event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Returns `data`.
    pub fn data(mut self, data: impl Into<Binary>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// JSON payload.
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    fn parse(msg: &[u8]) -> MockResult<Self> {
        if msg.is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_slice(msg).map_err(|err| contract_error(&format!("bad script: {err}")))
    }

    fn run(self, call: &mut ContractCall<'_>) -> MockResult<Response> {
        for (key, value) in &self.store {
            call.set(key.as_bytes(), value.as_bytes())?;
        }

        if let Some(script) = &self.on_reply {
            let json = serde_json::to_vec(script)
                .map_err(|err| RuntimeError::Internal(err.to_string()))?;
            call.set(ON_REPLY_KEY, &json)?;
        }

        call.charge(self.burn)?;

        if let Some(error) = self.fail {
            return Err(contract_error(&error));
        }

        Ok(Response {
            messages: self.messages,
            attributes: self.attributes,
            events: self.events,
            data: self.data,
        })
    }
}

/// Read-only requests of [`Scripted`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptQuery {
    /// Reads a key.
    Get {
        /// Key.
        key: String,
    },
    /// Attempts a write.
    Set {
        /// Key.
        key: String,
        /// Value.
        value: String,
    },
}

impl ScriptQuery {
    /// JSON payload.
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Contract following the [`Script`] it receives.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scripted;

impl MockContract for Scripted {
    fn instantiate(&self, call: &mut ContractCall<'_>, msg: &[u8]) -> MockResult<Response> {
        Script::parse(msg)?.run(call)
    }

    fn execute(&self, call: &mut ContractCall<'_>, msg: &[u8]) -> MockResult<Response> {
        Script::parse(msg)?.run(call)
    }

    fn reply(&self, call: &mut ContractCall<'_>, reply: Reply) -> MockResult<Response> {
        let record = serde_json::to_vec(&reply.result)
            .map_err(|err| RuntimeError::Internal(err.to_string()))?;
        call.set(reply_key(&reply.id).as_bytes(), &record)?;

        let script = match call.get(ON_REPLY_KEY)? {
            Some(json) => Script::parse(&json)?,
            None => Script::default(),
        };

        script.run(call)
    }

    fn migrate(&self, call: &mut ContractCall<'_>, msg: &[u8]) -> MockResult<Response> {
        Script::parse(msg)?.run(call)
    }

    fn query(&self, call: &mut ContractCall<'_>, msg: &[u8]) -> MockResult<Binary> {
        let query: ScriptQuery = serde_json::from_slice(msg)
            .map_err(|err| contract_error(&format!("bad query: {err}")))?;

        match query {
            ScriptQuery::Get { key } => Ok(Binary(call.get(key.as_bytes())?.unwrap_or_default())),
            ScriptQuery::Set { key, value } => {
                call.set(key.as_bytes(), value.as_bytes())?;
                Ok(Binary::default())
            }
        }
    }
}
