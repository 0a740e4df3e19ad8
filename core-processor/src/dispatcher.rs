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

//! Submessage dispatcher.
//!
//! Every submessage a contract returns runs in a sandbox: a fresh store
//! layer with its own event collector and, optionally, its own gas meter.
//! The sandbox is committed into the parent only if the submessage
//! succeeds. Depending on the reply policy, the outcome is then delivered
//! back to the contract that sent the submessage.

use crate::{
    context::Context,
    redact::{self, RedactedError},
    router::filter_events,
};
use compute_core::{
    env::SigInfo,
    envelope::{self, ContractCallKind, DataWithInternalReplyInfo},
    gas::{Gas, GasMeter},
    ids::Address,
    message::{
        Binary, CosmosMsg, Event, Reply, ReplyOn, SubMsg, SubMsgResponse, SubMsgResult, WasmMsg,
    },
};
use compute_core_errors::ComputeError;

/// Events and data of a dispatched contract action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Events of the executed ledger messages.
    pub events: Vec<Event>,
    /// Response data, one entry per executed ledger message.
    pub data: Vec<Vec<u8>>,
}

/// Dispatches a single contract action.
pub trait Messenger {
    /// Encodes `msg` and dispatches it on behalf of `contract`.
    fn dispatch_msg(
        &self,
        ctx: &mut Context,
        contract: &Address,
        msg: &CosmosMsg,
    ) -> Result<DispatchOutcome, ComputeError>;
}

/// Delivers replies to contracts.
pub trait Replyer {
    /// Runs the reply entry point of `contract`.
    ///
    /// `og_msg` is the envelope of the call which sent the submessage.
    fn reply(
        &self,
        ctx: &mut Context,
        contract: &Address,
        reply: Reply,
        og_msg: &[u8],
        sig_info: &SigInfo,
    ) -> Result<Option<Binary>, ComputeError>;
}

fn call_kind(msg: &CosmosMsg) -> Option<ContractCallKind> {
    match msg {
        CosmosMsg::Wasm(WasmMsg::Instantiate { .. }) => Some(ContractCallKind::Instantiate),
        CosmosMsg::Wasm(WasmMsg::Execute { .. }) => Some(ContractCallKind::Execute),
        CosmosMsg::Wasm(WasmMsg::Migrate { .. }) => Some(ContractCallKind::Migrate),
        _ => None,
    }
}

/// Sorts attributes of every event by key, keeping the order of equal keys.
fn sort_attributes(events: &mut [Event]) {
    for event in events {
        event.attributes.sort_by(|a, b| a.key.cmp(&b.key));
    }
}

fn reply_info(
    kind: ContractCallKind,
    data: Option<&[u8]>,
) -> Result<DataWithInternalReplyInfo, ComputeError> {
    let data = data.ok_or_else(|| {
        ComputeError::Configuration(format!("{kind} response carries no reply info"))
    })?;

    DataWithInternalReplyInfo::parse(&envelope::unwrap_response(kind, data)?)
}

/// Runs submessages and delivers their replies.
pub struct MessageDispatcher<'a, M, R> {
    messenger: &'a M,
    replyer: &'a R,
    redact_errors: bool,
}

impl<'a, M: Messenger, R: Replyer> MessageDispatcher<'a, M, R> {
    /// New dispatcher.
    pub fn new(messenger: &'a M, replyer: &'a R, redact_errors: bool) -> Self {
        Self {
            messenger,
            replyer,
            redact_errors,
        }
    }

    /// Dispatches `msg` under its own gas meter of `gas_limit`.
    ///
    /// Running out of the limit is a recoverable error of the submessage,
    /// which costs the parent the whole limit. Otherwise the parent pays
    /// what the submessage consumed.
    fn dispatch_with_gas_limit(
        &self,
        ctx: &mut Context,
        contract: &Address,
        msg: &CosmosMsg,
        gas_limit: Gas,
    ) -> Result<DispatchOutcome, ComputeError> {
        let parent_meter = ctx.replace_gas_meter(GasMeter::new(gas_limit));
        let result = self.messenger.dispatch_msg(ctx, contract, msg);
        let meter = ctx.replace_gas_meter(parent_meter);

        match result {
            Err(err) if err.is_out_of_gas() => {
                log::debug!("submessage of {contract} hit gas limit {gas_limit}: {err}");

                ctx.consume_gas(gas_limit, "Sub-Message OutOfGas panic")?;
                Err(ComputeError::GasLimitReached("SubMsg hit gas limit".into()))
            }
            result => {
                ctx.consume_gas(meter.consumed(), "From limited Sub-Message")?;
                result
            }
        }
    }

    /// Runs `msg` in a sandbox, committing it only on success.
    ///
    /// Returns the filtered events of the committed sandbox.
    fn dispatch_sandboxed(
        &self,
        ctx: &mut Context,
        contract: &Address,
        msg: &SubMsg,
    ) -> Result<(Vec<Event>, Vec<Vec<u8>>), ComputeError> {
        let remaining = ctx.gas_meter().remaining();
        let gas_limit = msg.gas_limit.filter(|limit| *limit < remaining);

        let layer = ctx.store_mut().begin();
        let parent_events = ctx.replace_events(Vec::new());

        let result = match gas_limit {
            Some(limit) => self.dispatch_with_gas_limit(ctx, contract, &msg.msg, limit),
            None => self.messenger.dispatch_msg(ctx, contract, &msg.msg),
        };

        let sandbox_events = ctx.replace_events(parent_events);

        match result {
            Ok(outcome) => {
                ctx.store_mut().commit(layer)?;

                let events = filter_events(sandbox_events.into_iter().chain(outcome.events));
                Ok((events, outcome.data))
            }
            Err(err) => {
                ctx.store_mut().revert(layer)?;
                Err(err)
            }
        }
    }

    /// Dispatches `msgs` sent by `contract` in order.
    ///
    /// Returns the data of the last reply which returned any.
    pub fn dispatch_submessages(
        &self,
        ctx: &mut Context,
        contract: &Address,
        msgs: &[SubMsg],
        og_msg: &[u8],
        og_sig_info: &SigInfo,
    ) -> Result<Option<Binary>, ComputeError> {
        let mut rsp = None;

        for msg in msgs {
            if ctx.last_msg_marker() {
                return Err(ComputeError::LastTx(format!("submessage {}", msg.id)));
            }

            if let CosmosMsg::FinalizeTx {} = msg.msg {
                log::debug!("{contract} finalized the transaction");
                ctx.set_last_msg_marker();
                break;
            }

            if msg.reply_on == ReplyOn::Unrecognized {
                return Err(ComputeError::Invalid("ReplyOn value".into()));
            }

            let kind = call_kind(&msg.msg);

            let result = match self.dispatch_sandboxed(ctx, contract, msg) {
                Ok((mut events, data)) => {
                    if kind.is_some() {
                        sort_attributes(&mut events);
                    }
                    ctx.emit_events(events.clone());

                    Ok((events, data))
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => Err(err),
            };

            match (result.is_err(), msg.reply_on) {
                (true, ReplyOn::Never | ReplyOn::OnSuccess) => return result.map(|_| None),
                (_, ReplyOn::Never) | (false, ReplyOn::OnError) => continue,
                _ => {}
            }

            let encrypted = kind.is_some() && msg.was_msg_encrypted;

            let (result, info) = match result {
                Ok((events, data)) => {
                    let data = match (kind, data.into_iter().next()) {
                        (Some(kind), Some(data)) => Some(envelope::unwrap_response(kind, &data)?),
                        (_, data) => data,
                    };

                    let (data, info) = match kind.filter(|_| encrypted) {
                        Some(kind) => {
                            let data = data.ok_or_else(|| {
                                ComputeError::Configuration(format!(
                                    "{kind} response carries no reply info"
                                ))
                            })?;
                            let mut info = DataWithInternalReplyInfo::parse(&data)?;
                            (info.data.take(), Some(info))
                        }
                        None => (data.filter(|data| !data.is_empty()).map(Binary), None),
                    };

                    let events = if kind.is_some() { events } else { Vec::new() };
                    (SubMsgResult::Ok(SubMsgResponse { events, data }), info)
                }
                Err(err) => {
                    log::debug!("redacting submessage error: {err}");

                    let RedactedError {
                        message,
                        is_sdk_error,
                    } = redact::redact_error(&err, self.redact_errors);

                    if encrypted && is_sdk_error {
                        return Err(ComputeError::Configuration(format!(
                            "an sdk error occoured while sending a sub-message: {message}"
                        )));
                    }

                    let info = match kind.filter(|_| encrypted) {
                        Some(kind) => Some(reply_info(kind, err.data())?),
                        None => None,
                    };

                    (SubMsgResult::Err(message), info)
                }
            };

            let mut reply = Reply {
                id: Binary(msg.id.to_string().into_bytes()),
                result,
                was_orig_msg_encrypted: msg.was_msg_encrypted,
                is_encrypted: false,
            };
            let mut sig_info = SigInfo::unspecified();

            if let Some(info) = info {
                reply.id = info.internal_msg_id;
                reply.is_encrypted = true;
                sig_info = SigInfo {
                    callback_signature: info.internal_reply_enclave_sig,
                    ..og_sig_info.clone()
                };
            }

            if let Some(data) = self.replyer.reply(ctx, contract, reply, og_msg, &sig_info)? {
                rsp = Some(data);
            }
        }

        Ok(rsp)
    }
}
