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

//! Ledger gas module.

use compute_core_errors::ComputeError;

/// Amount of ledger gas.
pub type Gas = u64;

/// Out-of-gas condition raised by [`GasMeter::consume`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("out of gas in location: {descriptor}")]
pub struct OutOfGas {
    /// Location of the charge which exhausted the meter.
    pub descriptor: String,
}

impl From<OutOfGas> for ComputeError {
    fn from(err: OutOfGas) -> Self {
        ComputeError::OutOfGas(err.descriptor)
    }
}

/// Ledger gas meter with a fixed limit.
///
/// Consumption past the limit is still recorded, so the meter can report how
/// far over the budget an exhausted call went.
///
/// `Copy` and `Clone` traits aren't implemented for the type in order to make
/// the meter only moveable, preventing implicit forks of the gas budget.
#[derive(Debug, PartialEq, Eq)]
pub struct GasMeter {
    limit: Gas,
    consumed: Gas,
}

impl GasMeter {
    /// New meter with the given limit.
    pub fn new(limit: Gas) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Meter which never runs out.
    pub fn infinite() -> Self {
        Self::new(Gas::MAX)
    }

    /// Account for used gas.
    ///
    /// The amount is always recorded. Returns [`OutOfGas`] if the meter went
    /// past its limit.
    pub fn consume(&mut self, amount: Gas, descriptor: &str) -> Result<(), OutOfGas> {
        self.consumed = self.consumed.saturating_add(amount);

        if self.is_past_limit() {
            log::trace!("out of gas: {descriptor} ({} > {})", self.consumed, self.limit);

            return Err(OutOfGas {
                descriptor: descriptor.into(),
            });
        }

        Ok(())
    }

    /// Gas limit of the meter.
    pub fn limit(&self) -> Gas {
        self.limit
    }

    /// Gas consumed so far, possibly above the limit.
    pub fn consumed(&self) -> Gas {
        self.consumed
    }

    /// Gas consumed so far, capped by the limit.
    pub fn consumed_to_limit(&self) -> Gas {
        self.consumed.min(self.limit)
    }

    /// Gas left before the limit.
    pub fn remaining(&self) -> Gas {
        self.limit.saturating_sub(self.consumed)
    }

    /// Whether the whole budget has been spent.
    pub fn is_out_of_gas(&self) -> bool {
        self.consumed >= self.limit
    }

    /// Whether consumption went strictly past the limit.
    pub fn is_past_limit(&self) -> bool {
        self.consumed > self.limit
    }
}
