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

//! Ledger messages of the compute module and their handlers.
//!
//! Handlers return the ledger response wrapper of every call kind. A failed
//! call still returns its wrapper, attached to the error with
//! [`ComputeError::with_data`], so the dispatcher can recover reply-routing
//! metadata of confidential calls.

use crate::{bank::LedgerCoin, context::Context, keeper::Keeper, runtime::ContractRuntime};
use compute_core::{
    envelope::{
        MsgExecuteContractResponse, MsgInstantiateContractResponse, MsgMigrateContractResponse,
    },
    ids::{Address, CodeId},
    message::{Binary, Event},
};
use compute_core_errors::ComputeError;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;

/// Name of the module in ledger events.
pub const MODULE_NAME: &str = "compute";

/// Stores new contract code.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgStoreCode {
    /// Uploader.
    pub sender: Address,
    /// Raw or gzipped code.
    pub wasm_byte_code: Vec<u8>,
    /// Source location of the code.
    pub source: String,
    /// Builder used to compile the code.
    pub builder: String,
}

/// Response of [`MsgStoreCode`].
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgStoreCodeResponse {
    /// Id of the stored code.
    pub code_id: CodeId,
}

/// Instantiates a contract.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgInstantiateContract {
    /// Creator.
    pub sender: Address,
    /// Code to instantiate.
    pub code_id: CodeId,
    /// Unique label.
    pub label: String,
    /// Account allowed to migrate the contract.
    pub admin: Option<Address>,
    /// Confidential envelope.
    pub init_msg: Vec<u8>,
    /// Funds moved to the new contract.
    pub init_funds: Vec<LedgerCoin>,
    /// Signature of a contract-originated call.
    pub callback_sig: Option<Vec<u8>>,
}

/// Executes a contract.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgExecuteContract {
    /// Caller.
    pub sender: Address,
    /// Callee.
    pub contract: Address,
    /// Confidential envelope.
    pub msg: Vec<u8>,
    /// Funds moved to the callee.
    pub sent_funds: Vec<LedgerCoin>,
    /// Signature of a contract-originated call.
    pub callback_sig: Option<Vec<u8>>,
}

/// Migrates a contract to new code.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgMigrateContract {
    /// Admin of the contract.
    pub sender: Address,
    /// Contract to migrate.
    pub contract: Address,
    /// New code.
    pub code_id: CodeId,
    /// Confidential envelope.
    pub msg: Vec<u8>,
    /// Signature of a contract-originated call.
    pub callback_sig: Option<Vec<u8>>,
}

/// Compute module message.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, derive_more::From)]
pub enum ComputeMsg {
    /// See [`MsgStoreCode`].
    StoreCode(MsgStoreCode),
    /// See [`MsgInstantiateContract`].
    Instantiate(MsgInstantiateContract),
    /// See [`MsgExecuteContract`].
    Execute(MsgExecuteContract),
    /// See [`MsgMigrateContract`].
    Migrate(MsgMigrateContract),
}

impl ComputeMsg {
    /// The only signer of the message.
    pub fn signer(&self) -> Address {
        match self {
            Self::StoreCode(msg) => msg.sender,
            Self::Instantiate(msg) => msg.sender,
            Self::Execute(msg) => msg.sender,
            Self::Migrate(msg) => msg.sender,
        }
    }
}

/// Handler of compute module messages.
pub trait ComputeMsgHandler {
    /// Handles `msg`, returning the encoded response wrapper.
    fn handle_compute_msg(&self, ctx: &mut Context, msg: ComputeMsg) -> Result<Vec<u8>, ComputeError>;
}

fn message_event(sender: &Address) -> Event {
    Event::new(Event::MESSAGE)
        .add_attribute("module", MODULE_NAME)
        .add_attribute("sender", sender.to_string())
}

/// Rewraps the data attached to a failed call into the response wrapper.
fn wrap_failure<T: Encode>(err: ComputeError, wrap: impl FnOnce(Vec<u8>) -> T) -> ComputeError {
    let (err, data) = err.split_data();
    err.with_data(wrap(data.unwrap_or_default()).encode())
}

/// Compute module message server.
pub struct MsgServer<'a, R> {
    keeper: &'a Keeper<R>,
}

impl<'a, R: ContractRuntime> MsgServer<'a, R> {
    /// New server over `keeper`.
    pub fn new(keeper: &'a Keeper<R>) -> Self {
        Self { keeper }
    }

    /// Handles [`MsgStoreCode`].
    pub fn store_code(
        &self,
        ctx: &mut Context,
        msg: MsgStoreCode,
    ) -> Result<MsgStoreCodeResponse, ComputeError> {
        let code_id = self
            .keeper
            .create(ctx, &msg.sender, &msg.wasm_byte_code, &msg.source, &msg.builder)?;

        ctx.emit_event(
            message_event(&msg.sender).add_attribute("code_id", code_id.to_string()),
        );

        Ok(MsgStoreCodeResponse { code_id })
    }

    /// Handles [`MsgInstantiateContract`].
    pub fn instantiate_contract(
        &self,
        ctx: &mut Context,
        msg: MsgInstantiateContract,
    ) -> Result<MsgInstantiateContractResponse, ComputeError> {
        let result = self.keeper.instantiate(
            ctx,
            msg.code_id,
            &msg.sender,
            msg.admin,
            &msg.init_msg,
            &msg.label,
            &msg.init_funds,
            msg.callback_sig.map(Binary),
        );

        match result {
            Ok((address, data)) => {
                ctx.emit_event(
                    message_event(&msg.sender)
                        .add_attribute("contract_address", address.to_string()),
                );

                Ok(MsgInstantiateContractResponse {
                    address,
                    data: data.map(Binary::into_vec).unwrap_or_default(),
                })
            }
            Err(err) => Err(wrap_failure(err, |data| MsgInstantiateContractResponse {
                address: Address::default(),
                data,
            })),
        }
    }

    /// Handles [`MsgExecuteContract`].
    pub fn execute_contract(
        &self,
        ctx: &mut Context,
        msg: MsgExecuteContract,
    ) -> Result<MsgExecuteContractResponse, ComputeError> {
        ctx.emit_event(
            message_event(&msg.sender).add_attribute("contract_address", msg.contract.to_string()),
        );

        self.keeper
            .execute(
                ctx,
                &msg.contract,
                &msg.sender,
                &msg.msg,
                &msg.sent_funds,
                msg.callback_sig.map(Binary),
            )
            .map(|data| MsgExecuteContractResponse {
                data: data.map(Binary::into_vec).unwrap_or_default(),
            })
            .map_err(|err| wrap_failure(err, |data| MsgExecuteContractResponse { data }))
    }

    /// Handles [`MsgMigrateContract`].
    pub fn migrate_contract(
        &self,
        ctx: &mut Context,
        msg: MsgMigrateContract,
    ) -> Result<MsgMigrateContractResponse, ComputeError> {
        ctx.emit_event(message_event(&msg.sender));

        self.keeper
            .migrate(
                ctx,
                &msg.contract,
                &msg.sender,
                msg.code_id,
                &msg.msg,
                msg.callback_sig.map(Binary),
            )
            .map(|data| MsgMigrateContractResponse {
                data: data.map(Binary::into_vec).unwrap_or_default(),
            })
            .map_err(|err| wrap_failure(err, |data| MsgMigrateContractResponse { data }))
    }

    /// Handles any compute message, returning the encoded response.
    pub fn handle(&self, ctx: &mut Context, msg: ComputeMsg) -> Result<Vec<u8>, ComputeError> {
        log::trace!("handling compute message from {}", msg.signer());

        match msg {
            ComputeMsg::StoreCode(msg) => self.store_code(ctx, msg).map(|rsp| rsp.encode()),
            ComputeMsg::Instantiate(msg) => {
                self.instantiate_contract(ctx, msg).map(|rsp| rsp.encode())
            }
            ComputeMsg::Execute(msg) => self.execute_contract(ctx, msg).map(|rsp| rsp.encode()),
            ComputeMsg::Migrate(msg) => self.migrate_contract(ctx, msg).map(|rsp| rsp.encode()),
        }
    }
}
