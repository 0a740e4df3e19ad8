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

//! Configurations.

use compute_core::gas::Gas;
use compute_core_errors::ComputeError;
use serde::{Deserialize, Serialize};

/// Runtime gas units per one ledger gas unit.
pub const GAS_MULTIPLIER: u64 = 1_000;
/// Absolute runtime gas ceiling of a single contract call.
pub const MAX_RUNTIME_GAS: u64 = 10_000_000_000;
/// Ledger gas charged before every contract call.
pub const INSTANCE_COST: Gas = 40_000;
/// Ledger gas charged per byte of stored code.
pub const COMPILE_COST_PER_BYTE: Gas = 2;
/// Ledger gas ceiling of a smart query issued outside a transaction.
pub const SMART_QUERY_GAS_LIMIT: Gas = 3_000_000;
/// Max size of decompressed contract code.
pub const MAX_CONTRACT_SIZE: usize = 1_638_400;
/// Max nesting of contract-originated ledger dispatches.
pub const MAX_CALL_DEPTH: u32 = 20;

/// Environment variable selecting the enclave mode.
pub const SGX_MODE_ENV: &str = "SGX_MODE";
/// Software enclave mode, enables verbose errors.
pub const SGX_MODE_SOFTWARE: &str = "SW";

/// Ledger gas costs of contract storage access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvGasCosts {
    /// Cost of a key lookup.
    pub read_cost_flat: Gas,
    /// Cost per byte of a returned value.
    pub read_cost_per_byte: Gas,
    /// Cost of a write.
    pub write_cost_flat: Gas,
    /// Cost per byte of a written key and value.
    pub write_cost_per_byte: Gas,
    /// Cost of a removal.
    pub delete_cost: Gas,
}

impl Default for KvGasCosts {
    fn default() -> Self {
        Self {
            read_cost_flat: 1_000,
            read_cost_per_byte: 3,
            write_cost_flat: 2_000,
            write_cost_per_byte: 30,
            delete_cost: 1_000,
        }
    }
}

/// Compute module configuration.
///
/// Every field has a default, so partial configs are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// Runtime gas units per ledger gas unit.
    pub gas_multiplier: u64,
    /// Runtime gas ceiling of a single contract call.
    pub max_runtime_gas: u64,
    /// Ledger gas charged before every contract call.
    pub instance_cost: Gas,
    /// Ledger gas charged per byte of stored code.
    pub compile_cost_per_byte: Gas,
    /// Ledger gas ceiling of a standalone smart query.
    pub smart_query_gas_limit: Gas,
    /// Max size of decompressed contract code.
    pub max_contract_size: usize,
    /// Max nesting of contract-originated ledger dispatches.
    pub max_call_depth: u32,
    /// Whether non-deterministic submessage errors are redacted.
    pub redact_errors: bool,
    /// Contract storage costs.
    pub kv_gas: KvGasCosts,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            gas_multiplier: GAS_MULTIPLIER,
            max_runtime_gas: MAX_RUNTIME_GAS,
            instance_cost: INSTANCE_COST,
            compile_cost_per_byte: COMPILE_COST_PER_BYTE,
            smart_query_gas_limit: SMART_QUERY_GAS_LIMIT,
            max_contract_size: MAX_CONTRACT_SIZE,
            max_call_depth: MAX_CALL_DEPTH,
            redact_errors: true,
            kv_gas: KvGasCosts::default(),
        }
    }
}

impl ComputeConfig {
    /// Default config adjusted by the process environment.
    ///
    /// Redaction is disabled when the enclave runs in software mode.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if std::env::var(SGX_MODE_ENV).is_ok_and(|mode| mode == SGX_MODE_SOFTWARE) {
            log::warn!("{SGX_MODE_ENV}={SGX_MODE_SOFTWARE}: submessage errors are not redacted");
            config.redact_errors = false;
        }

        config
    }

    /// Checks the invariants the processor relies on.
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.gas_multiplier == 0 {
            return Err(ComputeError::Configuration(
                "gas multiplier must be positive".into(),
            ));
        }

        if self.max_call_depth == 0 {
            return Err(ComputeError::Configuration(
                "max call depth must be positive".into(),
            ));
        }

        Ok(())
    }
}
