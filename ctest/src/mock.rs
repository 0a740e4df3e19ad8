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

//! Mock contract runtime.
//!
//! Contracts are plain Rust objects registered under the hash of some
//! placeholder code. The runtime checks envelopes the way the enclave does,
//! meters runtime gas and produces reply-routing metadata for sealed calls
//! made by other contracts. Nothing is actually encrypted: a sealed payload
//! is the plain payload behind [`SEALED_PREFIX`], and contract errors are
//! base64 encoded.

use compute_core::{
    env::{Env, HandleType, SigInfo},
    envelope::{self, DataWithInternalReplyInfo},
    ids::CodeHash,
    message::{Binary, Reply, Response},
};
use compute_core_processor::{
    CallParams, ContractRuntime, InitResponse, RuntimeError, RuntimeOutput, Storage,
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

/// Runtime gas charged for entering any contract.
pub const CALL_RUNTIME_GAS: u64 = 10_000;

/// Marks the payload of a confidential call.
pub const SEALED_PREFIX: &[u8] = b"sealed:";

/// Prefix of the reply authentication tag issued by the mock runtime.
pub const REPLY_SIG_PREFIX: &[u8] = b"reply:";

/// Prefix of the internal message id issued by the mock runtime.
pub const INTERNAL_MSG_ID_PREFIX: &[u8] = b"msg:";

/// Result of a mock contract entry point.
pub type MockResult<T> = Result<T, RuntimeError>;

/// Error returned by a mock contract, as the enclave would report it.
pub fn contract_error(msg: &str) -> RuntimeError {
    RuntimeError::Encrypted(Binary::from(msg.as_bytes()).to_base64())
}

/// Entry point invocation seen by a mock contract.
pub struct ContractCall<'a> {
    /// Invocation environment.
    pub env: &'a Env,
    /// Signature context.
    pub sig_info: &'a SigInfo,
    storage: &'a mut dyn Storage,
    gas_limit: u64,
    gas_used: u64,
}

impl ContractCall<'_> {
    /// Charges runtime gas.
    pub fn charge(&mut self, runtime_gas: u64) -> MockResult<()> {
        let used = self.gas_used.saturating_add(runtime_gas);
        if used > self.gas_limit {
            self.gas_used = self.gas_limit;
            return Err(RuntimeError::OutOfGas);
        }

        self.gas_used = used;
        Ok(())
    }

    /// Reads contract storage.
    pub fn get(&mut self, key: &[u8]) -> MockResult<Option<Vec<u8>>> {
        Ok(self.storage.get(key)?)
    }

    /// Writes contract storage.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> MockResult<()> {
        Ok(self.storage.set(key, value)?)
    }

    /// Runtime gas used so far.
    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }
}

/// Contract logic run by [`MockRuntime`].
#[allow(unused_variables)]
pub trait MockContract {
    /// Instantiation entry point.
    fn instantiate(&self, call: &mut ContractCall<'_>, msg: &[u8]) -> MockResult<Response>;

    /// Execution entry point.
    fn execute(&self, call: &mut ContractCall<'_>, msg: &[u8]) -> MockResult<Response>;

    /// Reply entry point.
    fn reply(&self, call: &mut ContractCall<'_>, reply: Reply) -> MockResult<Response> {
        Ok(Response::default())
    }

    /// Migration entry point of the new code.
    fn migrate(&self, call: &mut ContractCall<'_>, msg: &[u8]) -> MockResult<Response> {
        Err(contract_error("migrate is not implemented"))
    }

    /// Query entry point.
    fn query(&self, call: &mut ContractCall<'_>, msg: &[u8]) -> MockResult<Binary> {
        Err(contract_error("query is not implemented"))
    }
}

/// Internal reply info the mock runtime issues for a call authorized by
/// `callback_sig`.
pub fn internal_reply_info(callback_sig: &[u8], data: Option<Binary>) -> DataWithInternalReplyInfo {
    DataWithInternalReplyInfo {
        internal_reply_enclave_sig: Binary([REPLY_SIG_PREFIX, callback_sig].concat()),
        internal_msg_id: Binary([INTERNAL_MSG_ID_PREFIX, callback_sig].concat()),
        data,
    }
}

struct Invocation<T> {
    result: MockResult<T>,
    sealed: bool,
    gas_used: u64,
}

/// Runtime dispatching to registered [`MockContract`]s.
#[derive(Default)]
pub struct MockRuntime {
    contracts: RefCell<BTreeMap<CodeHash, Rc<dyn MockContract>>>,
}

impl MockRuntime {
    /// Registers `contract` as the program of `code`.
    pub fn register(&self, code: &[u8], contract: impl MockContract + 'static) -> CodeHash {
        let code_hash = CodeHash::generate(code);
        self.contracts
            .borrow_mut()
            .insert(code_hash, Rc::new(contract));

        code_hash
    }

    fn contract(&self, code_hash: &CodeHash) -> MockResult<Rc<dyn MockContract>> {
        self.contracts
            .borrow()
            .get(code_hash)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal(format!("no contract behind code {code_hash}")))
    }

    fn invoke<T>(
        &self,
        params: CallParams<'_>,
        storage: &mut dyn Storage,
        entry: impl FnOnce(&dyn MockContract, &mut ContractCall<'_>, &[u8]) -> MockResult<T>,
    ) -> Invocation<T> {
        let mut call = ContractCall {
            env: params.env,
            sig_info: params.sig_info,
            storage,
            gas_limit: params.gas_limit,
            gas_used: 0,
        };

        let mut sealed = false;
        let result = (|| {
            let contract = self.contract(params.code_hash)?;

            let (code_hash, payload) = envelope::split(params.msg)?;
            if code_hash != *params.code_hash {
                return Err(RuntimeError::Internal(format!(
                    "failed to verify code hash: expected {code_hash}, running {}",
                    params.code_hash
                )));
            }

            let payload = match payload.strip_prefix(SEALED_PREFIX) {
                Some(payload) => {
                    sealed = true;
                    payload
                }
                None => payload,
            };

            call.charge(CALL_RUNTIME_GAS)?;
            entry(contract.as_ref(), &mut call, payload)
        })();

        log::trace!(
            "mock runtime call of {} used {} runtime gas",
            params.env.contract.address,
            call.gas_used
        );

        Invocation {
            result,
            sealed,
            gas_used: call.gas_used,
        }
    }

    /// Output of a call, with the data of sealed contract-originated calls
    /// moved into reply-routing metadata.
    fn seal_output<T>(
        params: CallParams<'_>,
        invocation: Invocation<T>,
        data: impl FnOnce(&mut T) -> &mut Option<Binary>,
    ) -> RuntimeOutput<T> {
        let Invocation {
            result,
            sealed,
            gas_used,
        } = invocation;

        let callback_sig = &params.sig_info.callback_signature;
        if !sealed || callback_sig.is_empty() {
            return RuntimeOutput {
                result,
                internal_reply: None,
                gas_used,
            };
        }

        match result {
            Ok(mut value) => {
                let slot = data(&mut value);
                let info = internal_reply_info(callback_sig, slot.take());

                match info.to_json() {
                    Ok(json) => {
                        *slot = Some(Binary(json));
                        RuntimeOutput::ok(value, gas_used)
                    }
                    Err(err) => RuntimeOutput::err(err.into(), gas_used),
                }
            }
            Err(err) => RuntimeOutput::err(err, gas_used)
                .with_internal_reply(internal_reply_info(callback_sig, None)),
        }
    }
}

impl ContractRuntime for MockRuntime {
    fn compile(&self, code: &[u8]) -> Result<(), RuntimeError> {
        self.contract(&CodeHash::generate(code)).map(drop)
    }

    fn instantiate(
        &self,
        params: CallParams<'_>,
        storage: &mut dyn Storage,
    ) -> RuntimeOutput<InitResponse> {
        let address = params.env.contract.address;
        let invocation = self.invoke(params, storage, |contract, call, msg| {
            Ok(InitResponse {
                response: contract.instantiate(call, msg)?,
                contract_key: Binary([b"key:".as_slice(), address.as_ref()].concat()),
            })
        });

        Self::seal_output(params, invocation, |init| &mut init.response.data)
    }

    fn execute(
        &self,
        params: CallParams<'_>,
        handle_type: HandleType,
        storage: &mut dyn Storage,
    ) -> RuntimeOutput<Response> {
        let invocation = self.invoke(params, storage, |contract, call, msg| match handle_type {
            HandleType::Execute => contract.execute(call, msg),
            HandleType::Reply => {
                let reply: Reply = serde_json::from_slice(msg)
                    .map_err(|err| RuntimeError::Internal(format!("cannot parse reply: {err}")))?;

                if reply.is_encrypted
                    && !call.sig_info.callback_signature.starts_with(REPLY_SIG_PREFIX)
                {
                    return Err(RuntimeError::Internal(
                        "failed to verify reply signature".into(),
                    ));
                }

                contract.reply(call, reply)
            }
        });

        match handle_type {
            HandleType::Execute => Self::seal_output(params, invocation, |rsp| &mut rsp.data),
            HandleType::Reply => RuntimeOutput {
                result: invocation.result,
                internal_reply: None,
                gas_used: invocation.gas_used,
            },
        }
    }

    fn migrate(&self, params: CallParams<'_>, storage: &mut dyn Storage) -> RuntimeOutput<Response> {
        let invocation = self.invoke(params, storage, |contract, call, msg| {
            contract.migrate(call, msg)
        });

        Self::seal_output(params, invocation, |rsp| &mut rsp.data)
    }

    fn query(&self, params: CallParams<'_>, storage: &mut dyn Storage) -> RuntimeOutput<Binary> {
        let invocation = self.invoke(params, storage, |contract, call, msg| {
            contract.query(call, msg)
        });

        RuntimeOutput {
            result: invocation.result,
            internal_reply: None,
            gas_used: invocation.gas_used,
        }
    }
}
