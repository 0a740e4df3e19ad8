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

//! # ctest
//!
//! In-memory test ledger for compute contracts. [`System`] runs the host
//! processor over [`MockRuntime`], where contracts are plain Rust objects
//! implementing [`MockContract`]. [`Scripted`] is a ready-made contract
//! driven by the [`Script`] it receives, enough to exercise submessage
//! dispatch, replies and error redaction end to end.
//!
//! ```no_run
//! use compute_core::ids::Address;
//! use ctest::{Script, Scripted, System};
//!
//! let system = System::new();
//! let owner = Address::new([1; 20]);
//!
//! let code_id = system.store_code(&owner, Scripted).unwrap();
//! let contract = system
//!     .instantiate(&owner, code_id, "demo", &Script::new().to_json(), vec![])
//!     .unwrap();
//!
//! let data = system
//!     .execute(&owner, &contract, &Script::new().data(b"hi").to_json(), vec![])
//!     .unwrap();
//! assert_eq!(data, b"hi");
//! ```

#![warn(missing_docs)]

mod contract;
mod mock;
mod system;

pub use contract::{Script, ScriptQuery, Scripted, reply_key};
pub use mock::{
    CALL_RUNTIME_GAS, ContractCall, INTERNAL_MSG_ID_PREFIX, MockContract, MockResult, MockRuntime,
    REPLY_SIG_PREFIX, SEALED_PREFIX, contract_error, internal_reply_info,
};
pub use system::{System, TxResult};

pub(crate) use constants::*;

/// Module containing constants of the test ledger.
pub mod constants {
    use compute_core::gas::Gas;

    /// Native denomination.
    pub const DENOM: &str = "uscrt";

    /// Ledger gas limit of transactions sent by the helpers of
    /// [`System`](crate::System).
    pub const DEFAULT_TX_GAS: Gas = 10_000_000;
}
