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

//! Compute message processor.
//!
//! Host side of contract execution: runs contract calls through the gas
//! trampoline, dispatches the submessages they return and delivers replies.

#![warn(missing_docs)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod bank;
pub mod configs;
pub mod context;
pub mod dispatcher;
pub mod gas;
pub mod keeper;
pub mod keys;
pub mod msg_server;
pub mod redact;
pub mod router;
pub mod runtime;
pub mod storage;

pub use context::{Context, SignerInfo, TxInfo};
pub use dispatcher::{DispatchOutcome, MessageDispatcher, Messenger, Replyer};
pub use gas::GasTrampoline;
pub use keeper::{CodeInfo, ContractInfo, Keeper};
pub use redact::{RedactedError, redact_error};
pub use router::{LedgerMsg, LedgerMsgHandler, Router};
pub use runtime::{CallParams, ContractRuntime, InitResponse, RuntimeError, RuntimeOutput};
pub use storage::{ContractStorage, OverlayStore, Storage};
