// This file is part of Gear.
//
// Copyright (C) 2022-2025 Gear Technologies Inc.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! System errors.
//!
//! These are produced by the host itself and are deterministic across nodes,
//! so they are never redacted.

use serde::{Deserialize, Serialize};

/// System error reported through the runtime boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum SystemError {
    /// Request could not be parsed.
    #[display("invalid request: {error} - original request: {}", String::from_utf8_lossy(request))]
    InvalidRequest {
        /// Parsing error.
        error: String,
        /// Raw request.
        request: Vec<u8>,
    },
    /// Response could not be parsed.
    #[display("invalid response: {error} - original response: {}", String::from_utf8_lossy(response))]
    InvalidResponse {
        /// Parsing error.
        error: String,
        /// Raw response.
        response: Vec<u8>,
    },
    /// Contract address is unknown.
    #[display("no such contract: {addr}")]
    NoSuchContract {
        /// Requested address.
        addr: String,
    },
    /// Unclassified system failure.
    #[display("unknown system error")]
    Unknown,
    /// Request kind is not supported by the host.
    #[display("unsupported request: {kind}")]
    UnsupportedRequest {
        /// Request kind.
        kind: String,
    },
}

impl std::error::Error for SystemError {}
