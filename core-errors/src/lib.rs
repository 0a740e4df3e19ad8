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

//! Shared errors of the compute core.
//!
//! Every error carries an ABCI-style classification: a `(codespace, code)`
//! pair, which is the only part of a redacted error allowed to reach
//! consensus-visible reply data, and an [`ErrorKind`] that drives the
//! propagation policy of the submessage dispatcher.

#![warn(missing_docs)]

mod system;

pub use system::SystemError;

use enum_iterator::Sequence;

/// Codespace of the errors registered by the compute module.
pub const COMPUTE_CODESPACE: &str = "compute";
/// Codespace of the errors registered by the ledger itself.
pub const SDK_CODESPACE: &str = "sdk";
/// Codespace reported for errors without registration.
pub const UNDEFINED_CODESPACE: &str = "undefined";

/// `Result` type with a predefined error type ([`ComputeError`]).
pub type Result<T, E = ComputeError> = core::result::Result<T, E>;

/// Propagation class of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum ErrorKind {
    /// Deployment or programming bug, e.g. malformed reply-routing metadata.
    Configuration,
    /// Gas meter exhausted.
    OutOfGas,
    /// The invoked contract returned a failure.
    Contract,
    /// A ledger-native action failed.
    Ledger,
    /// Malformed submessage descriptor.
    InvalidRequest,
}

impl ErrorKind {
    /// Whether an error of this kind aborts the whole call tree.
    ///
    /// [`ErrorKind::OutOfGas`] is fatal unless it is caught by a gas-limited
    /// submessage sandbox.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::Configuration | Self::OutOfGas | Self::InvalidRequest
        )
    }
}

/// Common error type of the compute core.
///
/// Display strings follow the ledger wrapping convention: the context goes
/// first and the registered description goes last, separated by `": "`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    /// Storing new contract code failed.
    #[error("{0}: create contract failed")]
    CreateFailed(String),
    /// The runtime failed to instantiate a contract.
    #[error("{0}: instantiate contract failed")]
    InstantiateFailed(String),
    /// The runtime failed to execute a contract.
    #[error("{0}: execute contract failed")]
    ExecuteFailed(String),
    /// The runtime failed to answer a smart query.
    #[error("{0}: query contract failed")]
    QueryFailed(String),
    /// The runtime failed to migrate a contract.
    #[error("{0}: migrate contract failed")]
    MigrateFailed(String),
    /// The runtime failed to process a reply.
    #[error("{0}: reply to contract failed")]
    ReplyFailed(String),
    /// Derived contract address is already occupied.
    #[error("{0}: contract account already exists")]
    AlreadyExists(String),
    /// Missing code or contract.
    #[error("{0}: not found")]
    NotFound(String),
    /// The contract returned an action the ledger cannot encode.
    #[error("{0}: invalid CosmosMsg from the contract")]
    InvalidMsg(String),
    /// Required value is empty.
    #[error("{0}: empty")]
    Empty(String),
    /// Size or count limit exceeded.
    #[error("{0}: exceeds limit")]
    Limit(String),
    /// Generic validation failure.
    #[error("{0}: invalid")]
    Invalid(String),
    /// Unique value is already taken.
    #[error("{0}: duplicate")]
    Duplicate(String),
    /// Transaction signature information is unusable.
    #[error("{0}: parse signature failed")]
    SigFailed(String),
    /// Operation is not supported by the contract.
    #[error("{0}: unsupported for this contract")]
    Unsupported(String),
    /// The contract returned an event the ledger refuses.
    #[error("{0}: invalid event")]
    InvalidEvent(String),
    /// Confidential envelope is malformed.
    #[error("{0}: invalid envelope")]
    InvalidEnvelope(String),
    /// Maximal depth of contract-to-ledger dispatches exceeded.
    #[error("max call depth exceeded")]
    ExceedMaxCallDepth,
    /// Signer of a ledger action is not the acting contract.
    #[error("{0}: unauthorized")]
    Unauthorized(String),
    /// Not enough balance for a transfer.
    #[error("{0}: insufficient funds")]
    InsufficientFunds(String),
    /// Malformed account address.
    #[error("{0}: invalid address")]
    InvalidAddress(String),
    /// Malformed or non-integer coin amount.
    #[error("{0}: invalid coins")]
    InvalidCoins(String),
    /// No handler registered for a ledger action route.
    #[error("unrecognized message route: {0}: unknown request")]
    UnknownRoute(String),
    /// The ledger request itself is malformed.
    #[error("{0}: invalid request")]
    InvalidRequest(String),
    /// Ledger gas meter exhausted.
    #[error("out of gas in location: {0}: out of gas")]
    OutOfGas(String),
    /// Gas-limited submessage exhausted its own limit.
    #[error("{0}: out of gas")]
    GasLimitReached(String),
    /// Dispatch attempted after the terminal marker was set.
    #[error("{0}: cannot dispatch after terminal marker")]
    LastTx(String),
    /// Deployment or programming bug.
    #[error("{0}")]
    Configuration(String),
    /// Whitelisted system error reported by the runtime.
    #[error(transparent)]
    System(#[from] SystemError),
    /// Failure of a ledger message which still produced response data.
    #[error("{source}")]
    WithData {
        /// Response data.
        data: Vec<u8>,
        /// Underlying error.
        #[source]
        source: Box<ComputeError>,
    },
    /// Error with an additional context prefix.
    #[error("{context}: {source}")]
    Wrapped {
        /// Context message.
        context: String,
        /// Wrapped error.
        #[source]
        source: Box<ComputeError>,
    },
}

impl ComputeError {
    /// Prefixes the error with `context`, keeping its classification.
    pub fn wrap(self, context: impl Into<String>) -> Self {
        Self::Wrapped {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Attaches response data to the error.
    pub fn with_data(self, data: Vec<u8>) -> Self {
        Self::WithData {
            data,
            source: Box::new(self),
        }
    }

    /// Response data attached by the outermost [`ComputeError::WithData`].
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::WithData { data, .. } => Some(data),
            Self::Wrapped { source, .. } => source.data(),
            _ => None,
        }
    }

    /// Detaches top-level response data.
    pub fn split_data(self) -> (Self, Option<Vec<u8>>) {
        match self {
            Self::WithData { data, source } => (*source, Some(data)),
            err => (err, None),
        }
    }

    /// Returns the innermost error, skipping every wrapping layer.
    pub fn root(&self) -> &Self {
        match self {
            Self::Wrapped { source, .. } | Self::WithData { source, .. } => source.root(),
            err => err,
        }
    }

    /// Codespace the error is registered in.
    pub fn codespace(&self) -> &'static str {
        use ComputeError::*;

        match self.root() {
            CreateFailed(_) | InstantiateFailed(_) | ExecuteFailed(_) | QueryFailed(_)
            | MigrateFailed(_) | ReplyFailed(_) | AlreadyExists(_) | NotFound(_)
            | InvalidMsg(_) | Empty(_) | Limit(_) | Invalid(_) | Duplicate(_) | SigFailed(_)
            | Unsupported(_) | InvalidEvent(_) | InvalidEnvelope(_) | ExceedMaxCallDepth => {
                COMPUTE_CODESPACE
            }
            Unauthorized(_) | InsufficientFunds(_) | InvalidAddress(_) | InvalidCoins(_)
            | UnknownRoute(_) | InvalidRequest(_) | OutOfGas(_) | GasLimitReached(_)
            | LastTx(_) => SDK_CODESPACE,
            Configuration(_) | System(_) => UNDEFINED_CODESPACE,
            Wrapped { .. } | WithData { .. } => unreachable!("root is never wrapped"),
        }
    }

    /// Code of the error inside its codespace.
    pub fn code(&self) -> u32 {
        use ComputeError::*;

        match self.root() {
            InstantiateFailed(_) => 2,
            ExecuteFailed(_) => 3,
            QueryFailed(_) => 4,
            MigrateFailed(_) => 5,
            AlreadyExists(_) => 6,
            NotFound(_) => 9,
            InvalidMsg(_) => 10,
            Empty(_) => 11,
            Limit(_) => 12,
            Invalid(_) => 13,
            Duplicate(_) => 14,
            CreateFailed(_) => 15,
            SigFailed(_) => 16,
            Unsupported(_) => 17,
            ReplyFailed(_) => 19,
            InvalidEvent(_) => 21,
            ExceedMaxCallDepth => 23,
            InvalidEnvelope(_) => 24,
            Unauthorized(_) => 4,
            InsufficientFunds(_) => 5,
            UnknownRoute(_) => 6,
            InvalidAddress(_) => 7,
            InvalidRequest(_) => 8,
            InvalidCoins(_) => 10,
            OutOfGas(_) | GasLimitReached(_) => 11,
            LastTx(_) => 41,
            Configuration(_) | System(_) => 1,
            Wrapped { .. } | WithData { .. } => unreachable!("root is never wrapped"),
        }
    }

    /// Propagation class of the error.
    pub fn kind(&self) -> ErrorKind {
        use ComputeError::*;

        match self.root() {
            Configuration(_) => ErrorKind::Configuration,
            OutOfGas(_) => ErrorKind::OutOfGas,
            InvalidRequest(_) | LastTx(_) | Invalid(_) => ErrorKind::InvalidRequest,
            Unauthorized(_) | InsufficientFunds(_) | InvalidAddress(_) | InvalidCoins(_)
            | UnknownRoute(_) | ExceedMaxCallDepth => ErrorKind::Ledger,
            _ => ErrorKind::Contract,
        }
    }

    /// Shortcut for `self.kind().is_fatal()`.
    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    /// Whether the error is an out-of-gas condition.
    pub fn is_out_of_gas(&self) -> bool {
        matches!(self.root(), Self::OutOfGas(_))
    }

    /// Whitelisted system error, if the root error is one.
    pub fn as_system(&self) -> Option<&SystemError> {
        match self.root() {
            Self::System(err) => Some(err),
            _ => None,
        }
    }
}
