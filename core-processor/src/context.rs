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

//! Per-transaction execution context.
//!
//! One [`Context`] is threaded by `&mut` through the whole call tree of a
//! transaction. Sandboxes swap its gas meter and event collector and open a
//! store layer, then restore them.

use crate::storage::OverlayStore;
use compute_core::{
    env::{BlockInfo, SigInfo, SignMode},
    gas::{Gas, GasMeter},
    ids::Address,
    message::{Binary, Event},
};
use compute_core_errors::ComputeError;
use core::mem;

/// Signature of one transaction signer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignerInfo {
    /// Signer address.
    pub address: Address,
    /// Signing mode.
    pub sign_mode: SignMode,
    /// Encoded mode details.
    pub mode_info: Vec<u8>,
    /// Public key.
    pub public_key: Vec<u8>,
    /// Signature over the transaction.
    pub signature: Vec<u8>,
}

/// Transaction the call tree belongs to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxInfo {
    /// Raw transaction bytes.
    pub bytes: Vec<u8>,
    /// Signers of the transaction.
    pub signers: Vec<SignerInfo>,
}

impl TxInfo {
    /// Signature context of `sender`, who must have signed the transaction.
    pub fn sig_info(&self, sender: &Address) -> Result<SigInfo, ComputeError> {
        let signer = self
            .signers
            .iter()
            .find(|signer| signer.address == *sender)
            .ok_or_else(|| {
                ComputeError::SigFailed(format!(
                    "message sender: {sender} is not found in the tx signer set"
                ))
            })?;

        Ok(SigInfo {
            tx_bytes: Binary(self.bytes.clone()),
            sign_mode: signer.sign_mode,
            mode_info: Binary(signer.mode_info.clone()),
            public_key: Binary(signer.public_key.clone()),
            signature: Binary(signer.signature.clone()),
            callback_signature: Binary::default(),
        })
    }
}

/// Execution context of one transaction.
#[derive(Debug)]
pub struct Context {
    store: OverlayStore,
    gas_meter: GasMeter,
    events: Vec<Event>,
    block: BlockInfo,
    tx: TxInfo,
    last_msg_marker: bool,
    call_depth: u32,
    simulation: bool,
}

impl Context {
    /// New context over `store`, metered by `gas_meter`.
    pub fn new(store: OverlayStore, gas_meter: GasMeter) -> Self {
        Self {
            store,
            gas_meter,
            events: Vec::new(),
            block: BlockInfo::default(),
            tx: TxInfo::default(),
            last_msg_marker: false,
            call_depth: 0,
            simulation: false,
        }
    }

    /// Sets the current block.
    pub fn with_block(mut self, block: BlockInfo) -> Self {
        self.block = block;
        self
    }

    /// Marks the context as a read-only gas estimation.
    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.simulation = simulation;
        self
    }

    /// Starts a new top-level transaction, resetting its scoped state.
    pub fn begin_tx(&mut self, tx: TxInfo, gas_meter: GasMeter) {
        self.tx = tx;
        self.gas_meter = gas_meter;
        self.events.clear();
        self.last_msg_marker = false;
        self.call_depth = 0;
    }

    /// Underlying store.
    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    /// Underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut OverlayStore {
        &mut self.store
    }

    /// Active gas meter.
    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas_meter
    }

    /// Swaps the active gas meter, returning the previous one.
    pub fn replace_gas_meter(&mut self, meter: GasMeter) -> GasMeter {
        mem::replace(&mut self.gas_meter, meter)
    }

    /// Charges the active gas meter.
    pub fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), ComputeError> {
        self.gas_meter.consume(amount, descriptor).map_err(Into::into)
    }

    /// Emits an event into the active collector.
    pub fn emit_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Emits events into the active collector, preserving their order.
    pub fn emit_events(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    /// Events of the active collector.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Swaps the active event collector, returning the previous one.
    pub fn replace_events(&mut self, events: Vec<Event>) -> Vec<Event> {
        mem::replace(&mut self.events, events)
    }

    /// Drains the active event collector.
    pub fn take_events(&mut self) -> Vec<Event> {
        mem::take(&mut self.events)
    }

    /// Current block.
    pub fn block(&self) -> &BlockInfo {
        &self.block
    }

    /// Current transaction.
    pub fn tx(&self) -> &TxInfo {
        &self.tx
    }

    /// Whether the context only estimates gas.
    pub fn is_simulation(&self) -> bool {
        self.simulation
    }

    /// Whether the terminal marker was dispatched in this transaction.
    pub fn last_msg_marker(&self) -> bool {
        self.last_msg_marker
    }

    /// Sets the terminal marker for the rest of the transaction.
    pub fn set_last_msg_marker(&mut self) {
        self.last_msg_marker = true;
    }

    /// Current dispatch nesting.
    pub fn call_depth(&self) -> u32 {
        self.call_depth
    }

    /// Enters one more dispatch level.
    pub fn enter_call(&mut self, max_call_depth: u32) -> Result<(), ComputeError> {
        let depth = self.call_depth + 1;
        if depth > max_call_depth {
            return Err(ComputeError::ExceedMaxCallDepth);
        }

        self.call_depth = depth;
        Ok(())
    }

    /// Leaves a dispatch level entered by [`Context::enter_call`].
    pub fn leave_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }
}
