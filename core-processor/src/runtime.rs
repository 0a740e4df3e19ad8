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

//! Contract runtime boundary.
//!
//! The runtime executes contract code in isolation. The host hands it the
//! code, the environment, the message, a storage view and a runtime gas
//! budget, and gets back a response together with the runtime gas it used.

use crate::storage::Storage;
use compute_core::{
    env::{Env, HandleType, SigInfo},
    envelope::DataWithInternalReplyInfo,
    ids::CodeHash,
    message::{Binary, Response},
};
use compute_core_errors::ComputeError;

/// Error reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Contract failure, already encrypted for the caller.
    #[error("encrypted: {0}")]
    Encrypted(String),
    /// Failure of the runtime itself.
    #[error("{0}")]
    Internal(String),
    /// Runtime gas budget exhausted.
    #[error("ran out of gas during contract execution")]
    OutOfGas,
    /// Error raised by a host callback, e.g. storage access.
    #[error(transparent)]
    Host(#[from] ComputeError),
}

/// Parameters of one runtime call.
#[derive(Debug, Clone, Copy)]
pub struct CallParams<'a> {
    /// Contract code.
    pub code: &'a [u8],
    /// Hash of the contract code.
    pub code_hash: &'a CodeHash,
    /// Invocation environment.
    pub env: &'a Env,
    /// Confidential envelope.
    pub msg: &'a [u8],
    /// Signature context.
    pub sig_info: &'a SigInfo,
    /// Runtime gas budget.
    pub gas_limit: u64,
}

/// Successful instantiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitResponse {
    /// Contract response.
    pub response: Response,
    /// Confidential key issued for the new contract.
    pub contract_key: Binary,
}

/// Output of one runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOutput<T> {
    /// Call result.
    pub result: Result<T, RuntimeError>,
    /// Reply-routing metadata produced on a failed confidential call.
    pub internal_reply: Option<DataWithInternalReplyInfo>,
    /// Runtime gas used.
    pub gas_used: u64,
}

impl<T> RuntimeOutput<T> {
    /// Successful output.
    pub fn ok(value: T, gas_used: u64) -> Self {
        Self {
            result: Ok(value),
            internal_reply: None,
            gas_used,
        }
    }

    /// Failed output.
    pub fn err(err: RuntimeError, gas_used: u64) -> Self {
        Self {
            result: Err(err),
            internal_reply: None,
            gas_used,
        }
    }

    /// Attaches reply-routing metadata.
    pub fn with_internal_reply(mut self, info: DataWithInternalReplyInfo) -> Self {
        self.internal_reply = Some(info);
        self
    }
}

/// Contract runtime.
pub trait ContractRuntime {
    /// Checks that `code` can run and prepares it.
    fn compile(&self, code: &[u8]) -> Result<(), RuntimeError>;

    /// Runs the instantiation entry point.
    fn instantiate(
        &self,
        params: CallParams<'_>,
        storage: &mut dyn Storage,
    ) -> RuntimeOutput<InitResponse>;

    /// Runs the `execute` or `reply` entry point.
    fn execute(
        &self,
        params: CallParams<'_>,
        handle_type: HandleType,
        storage: &mut dyn Storage,
    ) -> RuntimeOutput<Response>;

    /// Runs the migration entry point of the new code.
    fn migrate(&self, params: CallParams<'_>, storage: &mut dyn Storage) -> RuntimeOutput<Response>;

    /// Runs the query entry point over a read-only view.
    fn query(&self, params: CallParams<'_>, storage: &mut dyn Storage) -> RuntimeOutput<Binary>;
}
