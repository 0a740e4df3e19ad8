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

//! Conversion between ledger gas and runtime gas.

use crate::{configs::ComputeConfig, context::Context};
use compute_core::gas::{Gas, GasMeter};
use compute_core_errors::ComputeError;

/// Converts gas at the boundary of every contract call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasTrampoline {
    multiplier: u64,
    max_runtime_gas: u64,
}

impl GasTrampoline {
    /// New trampoline. A zero multiplier is treated as one.
    pub fn new(multiplier: u64, max_runtime_gas: u64) -> Self {
        Self {
            multiplier: multiplier.max(1),
            max_runtime_gas,
        }
    }

    /// Runtime gas budget of a call metered by `meter`.
    pub fn to_runtime_gas(&self, meter: &GasMeter) -> u64 {
        meter
            .remaining()
            .saturating_mul(self.multiplier)
            .min(self.max_runtime_gas)
    }

    /// Ledger gas worth of `runtime_gas`, rounded down.
    pub fn to_ledger_gas(&self, runtime_gas: u64) -> Gas {
        runtime_gas / self.multiplier
    }

    /// Debits the gas a runtime call reported as used.
    ///
    /// A call which used its whole budget exhausts the meter, which is a
    /// fatal out-of-gas even when the meter landed exactly on its limit.
    pub fn consume_runtime_gas(
        &self,
        ctx: &mut Context,
        runtime_gas_used: u64,
    ) -> Result<(), ComputeError> {
        let gas = self.to_ledger_gas(runtime_gas_used);
        log::trace!("runtime used {runtime_gas_used} gas, charging {gas} ledger gas");

        ctx.consume_gas(gas, "wasm contract")?;

        if ctx.gas_meter().is_out_of_gas() {
            return Err(ComputeError::OutOfGas("Wasmer function execution".into()));
        }

        Ok(())
    }
}

impl From<&ComputeConfig> for GasTrampoline {
    fn from(config: &ComputeConfig) -> Self {
        Self::new(config.gas_multiplier, config.max_runtime_gas)
    }
}
