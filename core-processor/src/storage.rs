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

//! Ledger key-value store with nested copy-on-write layers.
//!
//! A layer records every write done after it was opened. Committing a layer
//! folds its writes into the layer below (or into the base map), reverting
//! it drops them. Layers are strictly nested: only the topmost layer can be
//! committed or reverted.

use crate::{configs::KvGasCosts, context::Context};
use compute_core_errors::ComputeError;
use std::collections::BTreeMap;

/// Store key.
pub type Key = Vec<u8>;
/// Store value.
pub type Value = Vec<u8>;

// `None` marks a removal.
type Layer = BTreeMap<Key, Option<Value>>;

/// Handle of an open layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerId(usize);

/// Layered key-value store.
#[derive(Debug, Default, Clone)]
pub struct OverlayStore {
    base: BTreeMap<Key, Value>,
    layers: Vec<Layer>,
}

impl OverlayStore {
    /// New empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.get(key) {
                return value.as_deref();
            }
        }

        self.base.get(key).map(Vec::as_slice)
    }

    /// Whether a value is stored under `key`.
    pub fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Stores `value` under `key` in the topmost layer.
    pub fn set(&mut self, key: Key, value: Value) {
        match self.layers.last_mut() {
            Some(layer) => {
                layer.insert(key, Some(value));
            }
            None => {
                self.base.insert(key, value);
            }
        }
    }

    /// Removes `key` in the topmost layer.
    pub fn remove(&mut self, key: &[u8]) {
        match self.layers.last_mut() {
            Some(layer) => {
                layer.insert(key.to_vec(), None);
            }
            None => {
                self.base.remove(key);
            }
        }
    }

    /// Opens a new layer on top of the store.
    pub fn begin(&mut self) -> LayerId {
        self.layers.push(Layer::new());
        LayerId(self.layers.len() - 1)
    }

    /// Number of open layers.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Folds the topmost layer into the one below.
    pub fn commit(&mut self, id: LayerId) -> Result<(), ComputeError> {
        let layer = self.pop(id)?;

        match self.layers.last_mut() {
            Some(parent) => parent.extend(layer),
            None => {
                for (key, value) in layer {
                    match value {
                        Some(value) => self.base.insert(key, value),
                        None => self.base.remove(&key),
                    };
                }
            }
        }

        Ok(())
    }

    /// Drops the topmost layer with all its writes.
    pub fn revert(&mut self, id: LayerId) -> Result<(), ComputeError> {
        self.pop(id).map(drop)
    }

    fn pop(&mut self, id: LayerId) -> Result<Layer, ComputeError> {
        if id.0 + 1 != self.layers.len() {
            return Err(ComputeError::Configuration(format!(
                "layer {} is not the topmost one (depth {})",
                id.0,
                self.layers.len()
            )));
        }

        self.layers
            .pop()
            .ok_or_else(|| ComputeError::Configuration("no open layer".into()))
    }
}

/// Key-value storage visible to a running contract.
pub trait Storage {
    /// Reads a value.
    fn get(&mut self, key: &[u8]) -> Result<Option<Value>, ComputeError>;
    /// Writes a value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), ComputeError>;
    /// Removes a value.
    fn remove(&mut self, key: &[u8]) -> Result<(), ComputeError>;
}

/// Gas-metered view of one contract's keys.
pub struct ContractStorage<'a> {
    ctx: &'a mut Context,
    prefix: Vec<u8>,
    costs: KvGasCosts,
    read_only: bool,
}

impl<'a> ContractStorage<'a> {
    /// Writable view over keys starting with `prefix`.
    pub fn new(ctx: &'a mut Context, prefix: Vec<u8>, costs: KvGasCosts) -> Self {
        Self {
            ctx,
            prefix,
            costs,
            read_only: false,
        }
    }

    /// View rejecting every write.
    pub fn read_only(ctx: &'a mut Context, prefix: Vec<u8>, costs: KvGasCosts) -> Self {
        Self {
            read_only: true,
            ..Self::new(ctx, prefix, costs)
        }
    }

    fn key(&self, key: &[u8]) -> Key {
        [self.prefix.as_slice(), key].concat()
    }

    fn ensure_writable(&self) -> Result<(), ComputeError> {
        if self.read_only {
            return Err(ComputeError::Unsupported(
                "write to contract storage in read-only context".into(),
            ));
        }

        Ok(())
    }
}

impl Storage for ContractStorage<'_> {
    fn get(&mut self, key: &[u8]) -> Result<Option<Value>, ComputeError> {
        self.ctx.consume_gas(self.costs.read_cost_flat, "ReadFlat")?;

        let value = self.ctx.store().get(&self.key(key)).map(<[u8]>::to_vec);
        if let Some(value) = &value {
            let cost = self.costs.read_cost_per_byte.saturating_mul(value.len() as u64);
            self.ctx.consume_gas(cost, "ReadPerByte")?;
        }

        Ok(value)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), ComputeError> {
        self.ensure_writable()?;

        let bytes = (key.len() + value.len()) as u64;
        self.ctx.consume_gas(self.costs.write_cost_flat, "WriteFlat")?;
        self.ctx.consume_gas(
            self.costs.write_cost_per_byte.saturating_mul(bytes),
            "WritePerByte",
        )?;

        let key = self.key(key);
        self.ctx.store_mut().set(key, value.to_vec());

        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> Result<(), ComputeError> {
        self.ensure_writable()?;

        self.ctx.consume_gas(self.costs.delete_cost, "Delete")?;

        let key = self.key(key);
        self.ctx.store_mut().remove(&key);

        Ok(())
    }
}
