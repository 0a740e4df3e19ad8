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

//! Ledger message router.
//!
//! Encodes the actions a contract requests into ledger messages signed by the
//! contract account and routes them to their handlers.

use crate::{
    bank::{MSG_SEND_TYPE_URL, MsgSend, MsgSendHandler, convert_coins},
    context::Context,
    dispatcher::DispatchOutcome,
    msg_server::{
        ComputeMsg, ComputeMsgHandler, MsgExecuteContract, MsgInstantiateContract,
        MsgMigrateContract,
    },
};
use compute_core::{
    envelope,
    ids::Address,
    message::{BankMsg, Binary, CosmosMsg, Event, WasmMsg},
};
use compute_core_errors::ComputeError;
use parity_scale_codec::Encode;
use std::collections::BTreeMap;

/// Handler of a routed ledger-native message.
pub trait LedgerMsgHandler {
    /// Accounts which must sign the encoded message `value`.
    fn signers(&self, value: &[u8]) -> Result<Vec<Address>, ComputeError>;

    /// Executes the encoded message `value`, returning response data.
    fn handle(&self, ctx: &mut Context, value: &[u8]) -> Result<Vec<u8>, ComputeError>;
}

/// Ledger message produced from a contract action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerMsg {
    /// Message of the compute module itself.
    Compute(ComputeMsg),
    /// Message of another module, routed by its type url.
    Routed {
        /// Route.
        type_url: String,
        /// Encoded message.
        value: Vec<u8>,
    },
}

fn parse_address(addr: &str) -> Result<Address, ComputeError> {
    addr.parse()
        .map_err(|_| ComputeError::InvalidAddress(addr.to_string()))
}

fn callback_sig(sig: &Option<Binary>) -> Option<Vec<u8>> {
    sig.as_ref().map(|sig| sig.to_vec())
}

/// Encodes `msg` as ledger messages signed by `contract`.
pub fn encode(contract: &Address, msg: &CosmosMsg) -> Result<Vec<LedgerMsg>, ComputeError> {
    let msg = match msg {
        CosmosMsg::Bank(BankMsg::Send { to_address, amount }) => {
            let send = MsgSend {
                from_address: *contract,
                to_address: parse_address(to_address)?,
                amount: convert_coins(amount)?,
            };

            LedgerMsg::Routed {
                type_url: MSG_SEND_TYPE_URL.into(),
                value: send.encode(),
            }
        }
        CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr,
            code_hash,
            msg,
            send,
            callback_signature,
        }) => LedgerMsg::Compute(
            MsgExecuteContract {
                sender: *contract,
                contract: parse_address(contract_addr)?,
                msg: envelope::wrap(code_hash, msg),
                sent_funds: convert_coins(send)?,
                callback_sig: callback_sig(callback_signature),
            }
            .into(),
        ),
        CosmosMsg::Wasm(WasmMsg::Instantiate {
            code_id,
            code_hash,
            msg,
            send,
            label,
            admin,
            callback_signature,
        }) => {
            let admin = match admin.as_deref() {
                None | Some("") => None,
                Some(admin) => Some(parse_address(admin)?),
            };

            LedgerMsg::Compute(
                MsgInstantiateContract {
                    sender: *contract,
                    code_id: *code_id,
                    label: label.clone(),
                    admin,
                    init_msg: envelope::wrap(code_hash, msg),
                    init_funds: convert_coins(send)?,
                    callback_sig: callback_sig(callback_signature),
                }
                .into(),
            )
        }
        CosmosMsg::Wasm(WasmMsg::Migrate {
            contract_addr,
            code_hash,
            code_id,
            msg,
            callback_signature,
        }) => LedgerMsg::Compute(
            MsgMigrateContract {
                sender: *contract,
                contract: parse_address(contract_addr)?,
                code_id: *code_id,
                msg: envelope::wrap(code_hash, msg),
                callback_sig: callback_sig(callback_signature),
            }
            .into(),
        ),
        CosmosMsg::Stargate { type_url, value } => LedgerMsg::Routed {
            type_url: type_url.clone(),
            value: value.to_vec(),
        },
        CosmosMsg::FinalizeTx {} => {
            return Err(ComputeError::InvalidMsg(
                "terminal marker has no ledger message".into(),
            ));
        }
    };

    Ok(vec![msg])
}

/// Checks that `contract` is the only account signing a message.
pub fn check_signers(contract: &Address, signers: &[Address]) -> Result<(), ComputeError> {
    if let Some(signer) = signers.iter().find(|signer| *signer != contract) {
        return Err(ComputeError::Unauthorized(format!(
            "contract {contract} doesn't have permission to sign for {signer}"
        )));
    }

    Ok(())
}

/// Drops the ledger's generic "message dispatched" events.
pub fn filter_events(events: impl IntoIterator<Item = Event>) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| event.ty != Event::MESSAGE)
        .collect()
}

/// Route table of ledger-native messages.
pub struct Router {
    routes: BTreeMap<String, Box<dyn LedgerMsgHandler>>,
    max_call_depth: u32,
}

impl Router {
    /// Router with the bank transfer route registered.
    pub fn new(max_call_depth: u32) -> Self {
        Self {
            routes: BTreeMap::new(),
            max_call_depth,
        }
        .with_route(MSG_SEND_TYPE_URL, MsgSendHandler)
    }

    /// Registers `handler` under `type_url`, replacing any previous one.
    pub fn with_route(
        mut self,
        type_url: impl Into<String>,
        handler: impl LedgerMsgHandler + 'static,
    ) -> Self {
        self.routes.insert(type_url.into(), Box::new(handler));
        self
    }

    fn handler(&self, type_url: &str) -> Result<&dyn LedgerMsgHandler, ComputeError> {
        self.routes
            .get(type_url)
            .map(|handler| &**handler)
            .ok_or_else(|| ComputeError::UnknownRoute(type_url.to_string()))
    }

    /// Dispatches `msg` on behalf of `contract`.
    ///
    /// Every ledger message runs with its own event collector, so the
    /// outcome holds exactly the events of the executed messages. Data of a
    /// failed message travels with the error.
    pub fn dispatch(
        &self,
        ctx: &mut Context,
        contract: &Address,
        msg: &CosmosMsg,
        compute: &dyn ComputeMsgHandler,
    ) -> Result<DispatchOutcome, ComputeError> {
        ctx.enter_call(self.max_call_depth)?;
        let result = self.dispatch_inner(ctx, contract, msg, compute);
        ctx.leave_call();

        result
    }

    fn dispatch_inner(
        &self,
        ctx: &mut Context,
        contract: &Address,
        msg: &CosmosMsg,
        compute: &dyn ComputeMsgHandler,
    ) -> Result<DispatchOutcome, ComputeError> {
        let mut outcome = DispatchOutcome::default();

        for ledger_msg in encode(contract, msg)? {
            let parent_events = ctx.replace_events(Vec::new());
            let result = self.handle(ctx, contract, ledger_msg, compute);
            let events = ctx.replace_events(parent_events);

            outcome.data.push(result?);
            outcome.events.extend(events);
        }

        Ok(outcome)
    }

    fn handle(
        &self,
        ctx: &mut Context,
        contract: &Address,
        msg: LedgerMsg,
        compute: &dyn ComputeMsgHandler,
    ) -> Result<Vec<u8>, ComputeError> {
        match msg {
            LedgerMsg::Compute(msg) => {
                check_signers(contract, &[msg.signer()])?;
                compute.handle_compute_msg(ctx, msg)
            }
            LedgerMsg::Routed { type_url, value } => {
                let handler = self.handler(&type_url)?;
                check_signers(contract, &handler.signers(&value)?)?;

                log::trace!("routing {type_url} from {contract}");
                handler.handle(ctx, &value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bank::{Bank, LedgerCoin},
        storage::OverlayStore,
    };
    use compute_core::{gas::GasMeter, ids::CodeHash, message::Coin};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingCompute {
        handled: RefCell<Vec<ComputeMsg>>,
    }

    impl ComputeMsgHandler for RecordingCompute {
        fn handle_compute_msg(
            &self,
            ctx: &mut Context,
            msg: ComputeMsg,
        ) -> Result<Vec<u8>, ComputeError> {
            ctx.emit_event(Event::new(Event::MESSAGE));
            ctx.emit_event(Event::new("execute"));
            self.handled.borrow_mut().push(msg);
            Ok(b"response".to_vec())
        }
    }

    struct Echo;

    impl LedgerMsgHandler for Echo {
        fn signers(&self, value: &[u8]) -> Result<Vec<Address>, ComputeError> {
            Address::try_from_slice(value)
                .map(|addr| vec![addr])
                .ok_or_else(|| ComputeError::InvalidRequest("echo".into()))
        }

        fn handle(&self, _ctx: &mut Context, value: &[u8]) -> Result<Vec<u8>, ComputeError> {
            Ok(value.to_vec())
        }
    }

    fn ctx() -> Context {
        Context::new(OverlayStore::new(), GasMeter::infinite())
    }

    const CONTRACT: Address = Address::new([1; 20]);

    #[test]
    fn wasm_execute_is_wrapped_in_envelope() {
        let hash = CodeHash::generate(b"callee");
        let callee = Address::from([2; 20]);
        let msg = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: callee.to_string(),
            code_hash: hash.to_string(),
            msg: Binary::from(b"{}"),
            send: vec![Coin::new(3, "denom")],
            callback_signature: Some(Binary::from(b"sig")),
        });

        let msgs: [LedgerMsg; 1] = encode(&CONTRACT, &msg).unwrap().try_into().unwrap();
        let [LedgerMsg::Compute(ComputeMsg::Execute(execute))] = msgs else {
            panic!("unexpected encoding");
        };

        assert_eq!(execute.sender, CONTRACT);
        assert_eq!(execute.contract, callee);
        assert_eq!(envelope::split(&execute.msg).unwrap(), (hash, &b"{}"[..]));
        assert_eq!(execute.sent_funds, [LedgerCoin::new(3, "denom")]);
        assert_eq!(execute.callback_sig, Some(b"sig".to_vec()));
    }

    #[test]
    fn invalid_actions_are_rejected() {
        let bad_address = CosmosMsg::Bank(BankMsg::Send {
            to_address: "bob".into(),
            amount: vec![],
        });
        assert_eq!(
            encode(&CONTRACT, &bad_address).unwrap_err(),
            ComputeError::InvalidAddress("bob".into())
        );

        let bad_coins = CosmosMsg::Bank(BankMsg::Send {
            to_address: Address::from([2; 20]).to_string(),
            amount: vec![Coin {
                denom: "denom".into(),
                amount: "0.5".into(),
            }],
        });
        assert_eq!(encode(&CONTRACT, &bad_coins).unwrap_err().code(), 10);
    }

    #[test]
    fn contract_signs_only_for_itself() {
        let router = Router::new(10).with_route("/echo", Echo);
        let mut ctx = ctx();

        let foreign = CosmosMsg::Stargate {
            type_url: "/echo".into(),
            value: Binary::from(&[9; 20]),
        };
        let err = router
            .dispatch(&mut ctx, &CONTRACT, &foreign, &RecordingCompute::default())
            .unwrap_err();
        assert_eq!(err.kind(), compute_core_errors::ErrorKind::Ledger);
        assert_eq!(err.code(), 4);

        let own = CosmosMsg::Stargate {
            type_url: "/echo".into(),
            value: Binary::from(CONTRACT.as_ref()),
        };
        let outcome = router
            .dispatch(&mut ctx, &CONTRACT, &own, &RecordingCompute::default())
            .unwrap();
        assert_eq!(outcome.data, [CONTRACT.as_ref().to_vec()]);
        assert_eq!(ctx.call_depth(), 0);
    }

    #[test]
    fn unknown_route() {
        let msg = CosmosMsg::Stargate {
            type_url: "/nowhere".into(),
            value: Binary::default(),
        };

        let err = Router::new(10)
            .dispatch(&mut ctx(), &CONTRACT, &msg, &RecordingCompute::default())
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "unrecognized message route: /nowhere: unknown request"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn events_are_collected_per_message() {
        let mut ctx = ctx();
        ctx.emit_event(Event::new("parent"));
        let compute = RecordingCompute::default();

        let msg = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: Address::from([2; 20]).to_string(),
            code_hash: CodeHash::generate(b"callee").to_string(),
            msg: Binary::default(),
            send: vec![],
            callback_signature: None,
        });
        let outcome = Router::new(10)
            .dispatch(&mut ctx, &CONTRACT, &msg, &compute)
            .unwrap();

        assert_eq!(outcome.data, [b"response".to_vec()]);
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(filter_events(outcome.events), [Event::new("execute")]);
        assert_eq!(ctx.events(), [Event::new("parent")]);
        assert_eq!(compute.handled.borrow().len(), 1);
    }

    #[test]
    fn bank_transfer_is_routed() {
        let mut ctx = ctx();
        let bob = Address::from([2; 20]);
        Bank::mint(&mut ctx, &CONTRACT, &[LedgerCoin::new(10, "denom")]).unwrap();

        let msg = CosmosMsg::Bank(BankMsg::Send {
            to_address: bob.to_string(),
            amount: vec![Coin::new(4, "denom")],
        });
        let outcome = Router::new(10)
            .dispatch(&mut ctx, &CONTRACT, &msg, &RecordingCompute::default())
            .unwrap();

        assert_eq!(Bank::balance(&ctx, &bob, "denom"), 4);
        assert_eq!(filter_events(outcome.events).len(), 3);
    }

    #[test]
    fn call_depth_is_limited() {
        let mut ctx = ctx();
        ctx.enter_call(1).unwrap();

        let msg = CosmosMsg::Stargate {
            type_url: "/echo".into(),
            value: Binary::from(CONTRACT.as_ref()),
        };
        let err = Router::new(1)
            .with_route("/echo", Echo)
            .dispatch(&mut ctx, &CONTRACT, &msg, &RecordingCompute::default())
            .unwrap_err();

        assert_eq!(err, ComputeError::ExceedMaxCallDepth);
        assert_eq!(ctx.call_depth(), 1);
    }
}
