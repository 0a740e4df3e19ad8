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

//! Compute keeper: contract lifecycle on top of the runtime.
//!
//! The keeper owns the code and contract registries, runs contract calls
//! through the [`GasTrampoline`], and handles the returned responses: events
//! are emitted and submessages are handed to the [`MessageDispatcher`].

use crate::{
    bank::{Bank, LedgerCoin, to_contract_coins},
    configs::ComputeConfig,
    context::Context,
    dispatcher::{DispatchOutcome, MessageDispatcher, Messenger, Replyer},
    gas::GasTrampoline,
    keys,
    msg_server::{ComputeMsg, ComputeMsgHandler, MsgServer},
    router::{LedgerMsgHandler, Router},
    runtime::{CallParams, ContractRuntime, RuntimeError, RuntimeOutput},
    storage::ContractStorage,
};
use compute_core::{
    env::{ContractEnv, Env, HandleType, MessageInfo, SigInfo},
    envelope::CODE_HASH_PREFIX_LENGTH,
    gas::GasMeter,
    ids::{Address, CodeHash, CodeId, HASH_LENGTH},
    message::{Attribute, Binary, CosmosMsg, Event, Reply, Response},
};
use compute_core_errors::ComputeError;
use flate2::read::GzDecoder;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Code hash recorded for code stored during gas estimation.
pub const SIMULATION_CODE_HASH: CodeHash = CodeHash::new([0; HASH_LENGTH]);

/// Stored contract code.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct CodeInfo {
    /// Hash of the uncompressed code.
    pub code_hash: CodeHash,
    /// Uploader.
    pub creator: Address,
    /// Source location.
    pub source: String,
    /// Builder.
    pub builder: String,
}

/// Instantiated contract.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct ContractInfo {
    /// Code the contract runs.
    pub code_id: CodeId,
    /// Instantiator.
    pub creator: Address,
    /// Account allowed to migrate the contract.
    pub admin: Option<Address>,
    /// Unique label.
    pub label: String,
    /// Height of the instantiation block.
    pub created: u64,
}

struct ContractInstance {
    info: ContractInfo,
    code_hash: CodeHash,
    code: Vec<u8>,
    contract_key: Binary,
}

/// Decompresses gzipped code, bounding the output by `limit` bytes.
fn uncompress(code: &[u8], limit: usize) -> Result<Vec<u8>, ComputeError> {
    let code = if code.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(code)
            .take(limit as u64 + 1)
            .read_to_end(&mut decoded)
            .map_err(|err| ComputeError::CreateFailed(format!("cannot uncompress code: {err}")))?;
        decoded
    } else {
        code.to_vec()
    };

    if code.len() > limit {
        return Err(ComputeError::Limit(format!(
            "uncompressed code exceeds {limit} bytes"
        )));
    }

    Ok(code)
}

fn load<T: Decode>(ctx: &Context, key: &[u8]) -> Result<Option<T>, ComputeError> {
    ctx.store()
        .get(key)
        .map(|mut bytes| {
            T::decode(&mut bytes)
                .map_err(|err| ComputeError::Configuration(format!("corrupted store value: {err}")))
        })
        .transpose()
}

fn next_id(ctx: &mut Context, key: Vec<u8>) -> Result<u64, ComputeError> {
    let id = load::<u64>(ctx, &key)?.unwrap_or_default() + 1;
    ctx.store_mut().set(key, id.encode());

    Ok(id)
}

fn sig_info(
    ctx: &Context,
    sender: &Address,
    callback_sig: Option<Binary>,
) -> Result<SigInfo, ComputeError> {
    match callback_sig {
        Some(sig) => Ok(SigInfo::callback(sig)),
        None => ctx.tx().sig_info(sender),
    }
}

fn contract_address_attribute(contract: &Address) -> Attribute {
    Attribute::new("contract_address", contract.to_string())
}

/// Maps a runtime failure onto the error of the call kind.
///
/// Fatal host errors keep their class. Reply-routing metadata of a failed
/// confidential call travels with the error.
fn runtime_failure<T>(
    output: RuntimeOutput<T>,
    failed: fn(String) -> ComputeError,
) -> Result<T, ComputeError> {
    let err = match output.result {
        Ok(value) => return Ok(value),
        Err(RuntimeError::Host(err)) if err.is_fatal() => return Err(err),
        Err(err) => failed(err.to_string()),
    };

    match output.internal_reply {
        Some(info) => Err(err.with_data(info.to_json()?)),
        None => Err(err),
    }
}

/// Compute module keeper.
pub struct Keeper<R> {
    runtime: R,
    config: ComputeConfig,
    trampoline: GasTrampoline,
    router: Router,
}

impl<R: ContractRuntime> Keeper<R> {
    /// New keeper running contracts on `runtime`.
    pub fn new(runtime: R, config: ComputeConfig) -> Self {
        Self {
            trampoline: GasTrampoline::from(&config),
            router: Router::new(config.max_call_depth),
            runtime,
            config,
        }
    }

    /// Registers a ledger-native route.
    pub fn with_route(
        mut self,
        type_url: impl Into<String>,
        handler: impl LedgerMsgHandler + 'static,
    ) -> Self {
        self.router = self.router.with_route(type_url, handler);
        self
    }

    /// Keeper configuration.
    pub fn config(&self) -> &ComputeConfig {
        &self.config
    }

    /// Contract runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Registered code.
    pub fn code_info(&self, ctx: &Context, code_id: CodeId) -> Result<Option<CodeInfo>, ComputeError> {
        load(ctx, &keys::code(code_id))
    }

    /// Instantiated contract.
    pub fn contract_info(
        &self,
        ctx: &Context,
        contract: &Address,
    ) -> Result<Option<ContractInfo>, ComputeError> {
        load(ctx, &keys::contract(contract))
    }

    /// Contract registered under `label`.
    pub fn contract_by_label(
        &self,
        ctx: &Context,
        label: &str,
    ) -> Result<Option<Address>, ComputeError> {
        load(ctx, &keys::contract_label(label))
    }

    fn contract_instance(
        &self,
        ctx: &Context,
        contract: &Address,
    ) -> Result<ContractInstance, ComputeError> {
        let info = self
            .contract_info(ctx, contract)?
            .ok_or_else(|| ComputeError::NotFound(format!("contract {contract}")))?;
        let code_info = self
            .code_info(ctx, info.code_id)?
            .ok_or_else(|| ComputeError::NotFound(format!("code {}", info.code_id)))?;
        let code = ctx
            .store()
            .get(&keys::code_bytes(&code_info.code_hash))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ComputeError::NotFound(format!("code bytes {}", code_info.code_hash)))?;
        let contract_key = ctx
            .store()
            .get(&keys::contract_enclave_key(contract))
            .map(Binary::from)
            .ok_or_else(|| ComputeError::NotFound(format!("enclave key of {contract}")))?;

        Ok(ContractInstance {
            info,
            code_hash: code_info.code_hash,
            code,
            contract_key,
        })
    }

    fn env(
        ctx: &Context,
        contract: &Address,
        code_hash: CodeHash,
        sender: &Address,
        funds: &[LedgerCoin],
        contract_key: Option<Binary>,
    ) -> Env {
        Env {
            block: ctx.block().clone(),
            message: MessageInfo {
                sender: *sender,
                sent_funds: to_contract_coins(funds),
            },
            contract: ContractEnv {
                address: *contract,
                code_hash,
            },
            contract_key,
        }
    }

    fn storage<'a>(&self, ctx: &'a mut Context, contract: &Address) -> ContractStorage<'a> {
        ContractStorage::new(ctx, keys::contract_store_prefix(contract), self.config.kv_gas)
    }

    /// Stores new code, returning its id.
    ///
    /// Gzipped code is decompressed first.
    pub fn create(
        &self,
        ctx: &mut Context,
        creator: &Address,
        code: &[u8],
        source: &str,
        builder: &str,
    ) -> Result<CodeId, ComputeError> {
        let code = uncompress(code, self.config.max_contract_size)?;

        let compile_cost = self
            .config
            .compile_cost_per_byte
            .saturating_mul(code.len() as u64);
        ctx.consume_gas(compile_cost, "Compiling WASM Bytecode")?;

        let code_hash = if ctx.is_simulation() {
            SIMULATION_CODE_HASH
        } else {
            self.runtime
                .compile(&code)
                .map_err(|err| ComputeError::CreateFailed(err.to_string()))?;
            CodeHash::generate(&code)
        };

        ctx.store_mut().set(keys::code_bytes(&code_hash), code);

        let code_id = next_id(ctx, keys::last_code_id())?;
        let info = CodeInfo {
            code_hash,
            creator: *creator,
            source: source.into(),
            builder: builder.into(),
        };
        ctx.store_mut().set(keys::code(code_id), info.encode());

        log::debug!("stored code {code_id} with hash {code_hash}");

        Ok(code_id)
    }

    /// Instantiates a contract from `code_id`, returning its address and data.
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate(
        &self,
        ctx: &mut Context,
        code_id: CodeId,
        creator: &Address,
        admin: Option<Address>,
        init_msg: &[u8],
        label: &str,
        deposit: &[LedgerCoin],
        callback_sig: Option<Binary>,
    ) -> Result<(Address, Option<Binary>), ComputeError> {
        ctx.consume_gas(self.config.instance_cost, "Loading compute module: init")?;
        let sig_info = sig_info(ctx, creator, callback_sig)?;

        if label.is_empty() {
            return Err(ComputeError::Empty("label is required".into()));
        }

        if self.contract_by_label(ctx, label)?.is_some() {
            return Err(ComputeError::AlreadyExists(format!("label {label}")));
        }

        let code_info = self
            .code_info(ctx, code_id)?
            .ok_or_else(|| ComputeError::NotFound(format!("code {code_id}")))?;

        let instance_id = next_id(ctx, keys::last_instance_id())?;
        let contract = Address::contract(code_id, instance_id, creator);

        if Bank::has_account(ctx, &contract) {
            return Err(ComputeError::AlreadyExists(contract.to_string()));
        }

        if deposit.is_empty() {
            Bank::create_account(ctx, &contract);
        } else {
            Bank::send_coins(ctx, creator, &contract, deposit)?;
        }

        let code = ctx
            .store()
            .get(&keys::code_bytes(&code_info.code_hash))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ComputeError::NotFound(format!("code bytes {}", code_info.code_hash)))?;

        let env = Self::env(ctx, &contract, code_info.code_hash, creator, deposit, None);
        let params = CallParams {
            code: &code,
            code_hash: &code_info.code_hash,
            env: &env,
            msg: init_msg,
            sig_info: &sig_info,
            gas_limit: self.trampoline.to_runtime_gas(ctx.gas_meter()),
        };

        let output = self.runtime.instantiate(params, &mut self.storage(ctx, &contract));
        self.trampoline.consume_runtime_gas(ctx, output.gas_used)?;
        let init = runtime_failure(output, ComputeError::InstantiateFailed)?;

        let info = ContractInfo {
            code_id,
            creator: *creator,
            admin,
            label: label.into(),
            created: ctx.block().height,
        };
        ctx.store_mut().set(keys::contract(&contract), info.encode());
        ctx.store_mut()
            .set(keys::contract_enclave_key(&contract), init.contract_key.into_vec());
        ctx.store_mut()
            .set(keys::contract_label(label), contract.encode());

        log::debug!("instantiated {contract} from code {code_id}");

        ctx.emit_event(
            Event::new("instantiate")
                .add_attribute("contract_address", contract.to_string())
                .add_attribute("code_id", code_id.to_string()),
        );

        let data = self
            .handle_contract_response(ctx, &contract, init.response, init_msg, &sig_info)
            .map_err(|err| err.wrap("dispatch"))?;

        Ok((contract, data))
    }

    /// Executes `contract`, returning its data.
    pub fn execute(
        &self,
        ctx: &mut Context,
        contract: &Address,
        caller: &Address,
        msg: &[u8],
        coins: &[LedgerCoin],
        callback_sig: Option<Binary>,
    ) -> Result<Option<Binary>, ComputeError> {
        ctx.consume_gas(self.config.instance_cost, "Loading compute module: execute")?;
        let sig_info = sig_info(ctx, caller, callback_sig)?;

        let instance = self.contract_instance(ctx, contract)?;

        if !coins.is_empty() {
            Bank::send_coins(ctx, caller, contract, coins)?;
        }

        let env = Self::env(
            ctx,
            contract,
            instance.code_hash,
            caller,
            coins,
            Some(instance.contract_key),
        );
        let params = CallParams {
            code: &instance.code,
            code_hash: &instance.code_hash,
            env: &env,
            msg,
            sig_info: &sig_info,
            gas_limit: self.trampoline.to_runtime_gas(ctx.gas_meter()),
        };

        let output =
            self.runtime
                .execute(params, HandleType::Execute, &mut self.storage(ctx, contract));
        self.trampoline.consume_runtime_gas(ctx, output.gas_used)?;
        let response = runtime_failure(output, ComputeError::ExecuteFailed)?;

        ctx.emit_event(
            Event::new("execute").add_attribute("contract_address", contract.to_string()),
        );

        self.handle_contract_response(ctx, contract, response, msg, &sig_info)
            .map_err(|err| err.wrap("dispatch"))
    }

    /// Migrates `contract` to `new_code_id`. Only the admin can migrate.
    pub fn migrate(
        &self,
        ctx: &mut Context,
        contract: &Address,
        caller: &Address,
        new_code_id: CodeId,
        msg: &[u8],
        callback_sig: Option<Binary>,
    ) -> Result<Option<Binary>, ComputeError> {
        ctx.consume_gas(self.config.instance_cost, "Loading compute module: migrate")?;
        let sig_info = sig_info(ctx, caller, callback_sig)?;

        let ContractInstance {
            mut info,
            contract_key,
            ..
        } = self
            .contract_instance(ctx, contract)
            .map_err(|err| err.wrap("unknown contract"))?;
        let code_info = self
            .code_info(ctx, new_code_id)?
            .ok_or_else(|| ComputeError::NotFound(format!("code {new_code_id}")).wrap("unknown code"))?;

        if info.admin != Some(*caller) {
            return Err(ComputeError::MigrateFailed(
                "requires migrate from admin".into(),
            ));
        }

        let code = ctx
            .store()
            .get(&keys::code_bytes(&code_info.code_hash))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ComputeError::NotFound(format!("code bytes {}", code_info.code_hash)))?;

        let env = Self::env(
            ctx,
            contract,
            code_info.code_hash,
            caller,
            &[],
            Some(contract_key),
        );
        let params = CallParams {
            code: &code,
            code_hash: &code_info.code_hash,
            env: &env,
            msg,
            sig_info: &sig_info,
            gas_limit: self.trampoline.to_runtime_gas(ctx.gas_meter()),
        };

        let output = self.runtime.migrate(params, &mut self.storage(ctx, contract));
        self.trampoline.consume_runtime_gas(ctx, output.gas_used)?;
        let response = runtime_failure(output, ComputeError::MigrateFailed)?;

        info.code_id = new_code_id;
        ctx.store_mut().set(keys::contract(contract), info.encode());

        ctx.emit_event(
            Event::new("migrate")
                .add_attribute("code_id", new_code_id.to_string())
                .add_attribute("contract_address", contract.to_string()),
        );

        self.handle_contract_response(ctx, contract, response, msg, &sig_info)
            .map_err(|err| err.wrap("dispatch"))
    }

    /// Runs the query entry point of `contract` over a read-only view.
    ///
    /// With `use_default_gas_limit`, the query runs under its own meter
    /// capped by the configured smart query limit.
    pub fn query_smart(
        &self,
        ctx: &mut Context,
        contract: &Address,
        req: &[u8],
        use_default_gas_limit: bool,
    ) -> Result<Binary, ComputeError> {
        let parent_meter = use_default_gas_limit
            .then(|| ctx.replace_gas_meter(GasMeter::new(self.config.smart_query_gas_limit)));

        let result = self.query_smart_inner(ctx, contract, req);

        if let Some(meter) = parent_meter {
            ctx.replace_gas_meter(meter);
        }

        result
    }

    fn query_smart_inner(
        &self,
        ctx: &mut Context,
        contract: &Address,
        req: &[u8],
    ) -> Result<Binary, ComputeError> {
        ctx.consume_gas(self.config.instance_cost, "Loading compute module: query")?;

        let instance = self.contract_instance(ctx, contract)?;

        let env = Self::env(
            ctx,
            contract,
            instance.code_hash,
            &Address::default(),
            &[],
            Some(instance.contract_key),
        );
        let sig_info = SigInfo::unspecified();
        let params = CallParams {
            code: &instance.code,
            code_hash: &instance.code_hash,
            env: &env,
            msg: req,
            sig_info: &sig_info,
            gas_limit: self.trampoline.to_runtime_gas(ctx.gas_meter()),
        };

        let mut storage = ContractStorage::read_only(
            ctx,
            keys::contract_store_prefix(contract),
            self.config.kv_gas,
        );
        let output = self.runtime.query(params, &mut storage);
        self.trampoline.consume_runtime_gas(ctx, output.gas_used)?;

        runtime_failure(output, ComputeError::QueryFailed)
    }

    /// Emits the events of a contract response and dispatches its submessages.
    ///
    /// Returns the data of the last reply which returned any, or else the
    /// response data.
    fn handle_contract_response(
        &self,
        ctx: &mut Context,
        contract: &Address,
        response: Response,
        og_msg: &[u8],
        sig_info: &SigInfo,
    ) -> Result<Option<Binary>, ComputeError> {
        if !response.attributes.is_empty() {
            let attributes = [contract_address_attribute(contract)]
                .into_iter()
                .chain(response.attributes)
                .collect();

            ctx.emit_event(Event {
                ty: "wasm".into(),
                attributes,
            });
        }

        for event in response.events {
            let ty = event.ty.trim();
            if ty.len() < 2 {
                return Err(ComputeError::InvalidEvent(format!(
                    "event type {:?} is too short",
                    event.ty
                )));
            }

            let attributes = [contract_address_attribute(contract)]
                .into_iter()
                .chain(event.attributes)
                .collect();

            ctx.emit_event(Event {
                ty: format!("wasm-{ty}"),
                attributes,
            });
        }

        let rsp = MessageDispatcher::new(self, self, self.config.redact_errors)
            .dispatch_submessages(ctx, contract, &response.messages, og_msg, sig_info)?;

        Ok(rsp.or(response.data))
    }
}

impl<R: ContractRuntime> ComputeMsgHandler for Keeper<R> {
    fn handle_compute_msg(&self, ctx: &mut Context, msg: ComputeMsg) -> Result<Vec<u8>, ComputeError> {
        MsgServer::new(self).handle(ctx, msg)
    }
}

impl<R: ContractRuntime> Messenger for Keeper<R> {
    fn dispatch_msg(
        &self,
        ctx: &mut Context,
        contract: &Address,
        msg: &CosmosMsg,
    ) -> Result<DispatchOutcome, ComputeError> {
        self.router.dispatch(ctx, contract, msg, self)
    }
}

impl<R: ContractRuntime> Replyer for Keeper<R> {
    fn reply(
        &self,
        ctx: &mut Context,
        contract: &Address,
        reply: Reply,
        og_msg: &[u8],
        sig_info: &SigInfo,
    ) -> Result<Option<Binary>, ComputeError> {
        ctx.consume_gas(self.config.instance_cost, "Loading compute module: reply")?;

        let instance = self.contract_instance(ctx, contract)?;

        let reply = serde_json::to_vec(&reply)
            .map_err(|err| ComputeError::Configuration(format!("cannot encode reply: {err}")))?;
        let prefix = &og_msg[..og_msg.len().min(CODE_HASH_PREFIX_LENGTH)];
        let msg = [prefix, reply.as_slice()].concat();

        let env = Self::env(
            ctx,
            contract,
            instance.code_hash,
            contract,
            &[],
            Some(instance.contract_key),
        );
        let params = CallParams {
            code: &instance.code,
            code_hash: &instance.code_hash,
            env: &env,
            msg: &msg,
            sig_info,
            gas_limit: self.trampoline.to_runtime_gas(ctx.gas_meter()),
        };

        let output =
            self.runtime
                .execute(params, HandleType::Reply, &mut self.storage(ctx, contract));
        self.trampoline.consume_runtime_gas(ctx, output.gas_used)?;
        let response = runtime_failure(output, ComputeError::ReplyFailed)?;

        ctx.emit_event(
            Event::new("reply").add_attribute("contract_address", contract.to_string()),
        );

        self.handle_contract_response(ctx, contract, response, &msg, sig_info)
            .map_err(|err| match err.is_fatal() {
                true => err,
                false => ComputeError::ReplyFailed(err.to_string()),
            })
    }
}
