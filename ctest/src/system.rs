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

use crate::{
    DEFAULT_TX_GAS,
    mock::{MockContract, MockRuntime, SEALED_PREFIX},
};
use colored::Colorize;
use compute_core::{
    env::{BlockInfo, SignMode},
    envelope::{self, MsgExecuteContractResponse, MsgInstantiateContractResponse},
    gas::{Gas, GasMeter},
    ids::{Address, CodeHash, CodeId},
    message::{Binary, CosmosMsg, Event, WasmMsg},
};
use compute_core_errors::ComputeError;
use compute_core_processor::{
    Context, Keeper, OverlayStore, SignerInfo, TxInfo,
    bank::{Bank, LedgerCoin},
    configs::ComputeConfig,
    msg_server::{
        ComputeMsg, ComputeMsgHandler, MsgExecuteContract, MsgInstantiateContract,
        MsgMigrateContract, MsgStoreCode, MsgStoreCodeResponse,
    },
};
use env_logger::{Builder, Env};
use parity_scale_codec::{Decode, Encode};
use std::{
    cell::{Cell, RefCell},
    io::Write,
    thread,
};

/// Outcome of one delivered transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    /// Encoded response of every message, or the first failure.
    pub result: Result<Vec<Vec<u8>>, ComputeError>,
    /// Events of a committed transaction.
    pub events: Vec<Event>,
    /// Ledger gas used.
    pub gas_used: Gas,
}

impl TxResult {
    /// Encoded response of the only message.
    pub fn single(self) -> Result<Vec<u8>, ComputeError> {
        self.result.map(|mut data| data.pop().unwrap_or_default())
    }
}

fn decode<T: Decode>(bytes: &[u8]) -> Result<T, ComputeError> {
    T::decode(&mut &bytes[..])
        .map_err(|err| ComputeError::Configuration(format!("cannot decode response: {err}")))
}

/// In-memory ledger running the compute keeper over [`MockRuntime`].
pub struct System {
    keeper: Keeper<MockRuntime>,
    ctx: RefCell<Context>,
    code_nonce: Cell<u64>,
    last_tx: RefCell<Option<TxResult>>,
}

impl Default for System {
    fn default() -> Self {
        Self::with_config(ComputeConfig::default())
    }
}

impl System {
    /// New system with the default config.
    pub fn new() -> Self {
        Default::default()
    }

    /// New system with `config`.
    pub fn with_config(config: ComputeConfig) -> Self {
        let block = BlockInfo {
            height: 1,
            time: 1_000_000_000,
            chain_id: "ctest-1".into(),
            random: None,
        };

        Self {
            keeper: Keeper::new(MockRuntime::default(), config),
            ctx: RefCell::new(
                Context::new(OverlayStore::new(), GasMeter::infinite()).with_block(block),
            ),
            code_nonce: Cell::new(0),
            last_tx: RefCell::new(None),
        }
    }

    /// Installs a logger printing the processor logs.
    pub fn init_logger(&self) {
        let _ = Builder::from_env(Env::default().default_filter_or("compute_core_processor=debug"))
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {}] {}",
                    record.level().to_string().blue(),
                    thread::current().name().unwrap_or("unknown").white(),
                    record.args().to_string().white()
                )
            })
            .format_target(false)
            .format_timestamp(None)
            .try_init();
    }

    /// Compute keeper.
    pub fn keeper(&self) -> &Keeper<MockRuntime> {
        &self.keeper
    }

    /// Moves to a later block.
    pub fn spend_blocks(&self, amount: u64) {
        let mut ctx = self.ctx.borrow_mut();
        let mut block = ctx.block().clone();
        block.height += amount;
        block.time += amount * 5_000_000_000;

        let store = std::mem::take(ctx.store_mut());
        *ctx = Context::new(store, GasMeter::infinite()).with_block(block);
    }

    /// Credits new coins to `addr`.
    pub fn mint(&self, addr: &Address, amount: u128, denom: &str) {
        let mut ctx = self.ctx.borrow_mut();
        if let Err(err) = Bank::mint(&mut ctx, addr, &[LedgerCoin::new(amount, denom)]) {
            panic!("cannot mint {amount}{denom} to {addr}: {err}");
        }
    }

    /// Balance of `denom` held by `addr`.
    pub fn balance(&self, addr: &Address, denom: &str) -> u128 {
        Bank::balance(&self.ctx.borrow(), addr, denom)
    }

    /// Runs `f` over the context outside of any transaction.
    pub fn with_context<T>(&self, f: impl FnOnce(&mut Context) -> T) -> T {
        f(&mut self.ctx.borrow_mut())
    }

    /// Outcome of the last delivered transaction.
    pub fn last_tx(&self) -> Option<TxResult> {
        self.last_tx.borrow().clone()
    }

    /// Events of the last delivered transaction.
    pub fn events(&self) -> Vec<Event> {
        self.last_tx()
            .map(|tx| tx.events)
            .unwrap_or_default()
    }

    /// Delivers a transaction of `msgs` signed by their senders.
    ///
    /// The transaction runs in its own store layer, committed only if every
    /// message succeeds.
    pub fn deliver_tx(&self, msgs: Vec<ComputeMsg>, gas_limit: Gas) -> TxResult {
        let mut ctx = self.ctx.borrow_mut();

        let mut signers: Vec<SignerInfo> = Vec::new();
        for msg in &msgs {
            let address = msg.signer();
            if signers.iter().all(|signer| signer.address != address) {
                signers.push(SignerInfo {
                    address,
                    sign_mode: SignMode::Direct,
                    mode_info: vec![1],
                    public_key: address.as_ref().to_vec(),
                    signature: [b"signed:".as_slice(), address.as_ref()].concat(),
                });
            }
        }

        let tx = TxInfo {
            bytes: msgs.encode(),
            signers,
        };
        ctx.begin_tx(tx, GasMeter::new(gas_limit));

        let layer = ctx.store_mut().begin();
        let mut responses = Vec::with_capacity(msgs.len());
        let mut result = Ok(());

        for msg in msgs {
            if ctx.last_msg_marker() {
                result = Err(ComputeError::LastTx("ledger message".into()));
                break;
            }

            match self.keeper.handle_compute_msg(&mut ctx, msg) {
                Ok(data) => responses.push(data),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        let result = match result {
            Ok(()) => ctx.store_mut().commit(layer).map(|()| responses),
            Err(err) => ctx.store_mut().revert(layer).and(Err(err)),
        };

        let mut events = ctx.take_events();
        if result.is_err() {
            events.clear();
        }

        let tx = TxResult {
            result,
            events,
            gas_used: ctx.gas_meter().consumed(),
        };

        match &tx.result {
            Ok(_) => log::debug!("tx committed, {} gas used", tx.gas_used),
            Err(err) => log::debug!("tx reverted, {} gas used: {err}", tx.gas_used),
        }

        *self.last_tx.borrow_mut() = Some(tx.clone());
        tx
    }

    /// Stores code running `contract`.
    pub fn store_code(
        &self,
        sender: &Address,
        contract: impl MockContract + 'static,
    ) -> Result<CodeId, ComputeError> {
        let nonce = self.code_nonce.get() + 1;
        self.code_nonce.set(nonce);

        let code = format!("mock contract code #{nonce}").into_bytes();
        self.keeper.runtime().register(&code, contract);

        let msg = MsgStoreCode {
            sender: *sender,
            wasm_byte_code: code,
            source: String::new(),
            builder: String::new(),
        };

        let data = self.deliver_tx(vec![msg.into()], DEFAULT_TX_GAS).single()?;
        decode::<MsgStoreCodeResponse>(&data).map(|rsp| rsp.code_id)
    }

    /// Hash of stored code.
    pub fn code_hash(&self, code_id: CodeId) -> CodeHash {
        match self.keeper.code_info(&self.ctx.borrow(), code_id) {
            Ok(Some(info)) => info.code_hash,
            _ => panic!("code {code_id} is not stored"),
        }
    }

    /// Hash of the code `contract` runs.
    pub fn contract_code_hash(&self, contract: &Address) -> CodeHash {
        match self.keeper.contract_info(&self.ctx.borrow(), contract) {
            Ok(Some(info)) => self.code_hash(info.code_id),
            _ => panic!("contract {contract} is not instantiated"),
        }
    }

    /// Envelope of `payload` addressed to code `code_hash`.
    pub fn envelope(code_hash: &CodeHash, payload: &[u8]) -> Vec<u8> {
        envelope::wrap(&code_hash.to_string(), payload)
    }

    /// Contract action calling `contract` with `payload`.
    ///
    /// Sealed calls produce reply-routing metadata in the callee.
    pub fn wasm_execute(&self, contract: &Address, payload: &[u8], sealed: bool) -> CosmosMsg {
        let msg = match sealed {
            true => [SEALED_PREFIX, payload].concat(),
            false => payload.to_vec(),
        };

        CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: contract.to_string(),
            code_hash: self.contract_code_hash(contract).to_string(),
            msg: Binary(msg),
            send: vec![],
            callback_signature: Some(Binary::from(contract.as_ref())),
        })
    }

    /// Instantiates code `code_id`.
    pub fn instantiate(
        &self,
        sender: &Address,
        code_id: CodeId,
        label: &str,
        payload: &[u8],
        funds: Vec<LedgerCoin>,
    ) -> Result<Address, ComputeError> {
        let msg = MsgInstantiateContract {
            sender: *sender,
            code_id,
            label: label.into(),
            admin: Some(*sender),
            init_msg: Self::envelope(&self.code_hash(code_id), payload),
            init_funds: funds,
            callback_sig: None,
        };

        let data = self.deliver_tx(vec![msg.into()], DEFAULT_TX_GAS).single()?;
        decode::<MsgInstantiateContractResponse>(&data).map(|rsp| rsp.address)
    }

    /// Executes `contract`, returning its data.
    pub fn execute(
        &self,
        sender: &Address,
        contract: &Address,
        payload: &[u8],
        funds: Vec<LedgerCoin>,
    ) -> Result<Vec<u8>, ComputeError> {
        self.execute_with_gas(sender, contract, payload, funds, DEFAULT_TX_GAS)
    }

    /// Executes `contract` in a transaction limited to `gas_limit`.
    pub fn execute_with_gas(
        &self,
        sender: &Address,
        contract: &Address,
        payload: &[u8],
        funds: Vec<LedgerCoin>,
        gas_limit: Gas,
    ) -> Result<Vec<u8>, ComputeError> {
        let msg = MsgExecuteContract {
            sender: *sender,
            contract: *contract,
            msg: Self::envelope(&self.contract_code_hash(contract), payload),
            sent_funds: funds,
            callback_sig: None,
        };

        let data = self.deliver_tx(vec![msg.into()], gas_limit).single()?;
        decode::<MsgExecuteContractResponse>(&data).map(|rsp| rsp.data)
    }

    /// Migrates `contract` to code `code_id`.
    pub fn migrate(
        &self,
        sender: &Address,
        contract: &Address,
        code_id: CodeId,
        payload: &[u8],
    ) -> Result<(), ComputeError> {
        let msg = MsgMigrateContract {
            sender: *sender,
            contract: *contract,
            code_id,
            msg: Self::envelope(&self.code_hash(code_id), payload),
            callback_sig: None,
        };

        self.deliver_tx(vec![msg.into()], DEFAULT_TX_GAS)
            .single()
            .map(drop)
    }

    /// Runs a smart query of `contract`.
    pub fn query(&self, contract: &Address, payload: &[u8]) -> Result<Vec<u8>, ComputeError> {
        let req = Self::envelope(&self.contract_code_hash(contract), payload);

        let mut ctx = self.ctx.borrow_mut();
        self.keeper
            .query_smart(&mut ctx, contract, &req, true)
            .map(Binary::into_vec)
    }
}
