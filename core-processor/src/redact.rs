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

//! Redaction of submessage errors delivered in replies.
//!
//! Reply data is consensus-visible, while the text of host errors may differ
//! between node builds. Only errors that are deterministic by construction
//! keep their text.

use compute_core_errors::{ComputeError, ErrorKind};

/// Prefix of errors produced inside a confidential contract.
pub const ENCRYPTED_ERROR_PREFIX: &str = "encrypted:";

const ENCRYPTED_ERROR_MARKERS: [&str; 3] = [
    "encrypted: ",
    ": execute contract failed",
    ": instantiate contract failed",
];

/// Error text allowed into reply data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedError {
    /// Error text.
    pub message: String,
    /// Whether the error was raised by the ledger rather than by a contract.
    pub is_sdk_error: bool,
}

/// Generic text replacing a redacted error.
pub fn redacted_message(codespace: &str, code: u32) -> String {
    format!(
        "the error was redacted (codespace: {codespace}, code: {code}). \
         For more info use latest localsecret and reproduce the issue"
    )
}

/// Converts `err` into text allowed into reply data.
///
/// With `redact` unset, non-contract errors keep their text.
pub fn redact_error(err: &ComputeError, redact: bool) -> RedactedError {
    let message = err.to_string();

    if message.starts_with(ENCRYPTED_ERROR_PREFIX) {
        let message = ENCRYPTED_ERROR_MARKERS
            .iter()
            .fold(message, |message, marker| message.replace(marker, ""));

        return RedactedError {
            message,
            is_sdk_error: false,
        };
    }

    if err.as_system().is_some() {
        return RedactedError {
            message,
            is_sdk_error: false,
        };
    }

    if !redact || err.kind() == ErrorKind::Ledger {
        return RedactedError {
            message,
            is_sdk_error: true,
        };
    }

    RedactedError {
        message: redacted_message(err.codespace(), err.code()),
        is_sdk_error: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute_core_errors::SystemError;
    use proptest::prelude::*;

    #[test]
    fn encrypted_errors_are_unwrapped() {
        let err = ComputeError::ExecuteFailed("encrypted: c2VjcmV0".into());
        let redacted = redact_error(&err, true);

        assert_eq!(redacted.message, "c2VjcmV0");
        assert!(!redacted.is_sdk_error);

        let err = ComputeError::InstantiateFailed("encrypted: aW5pdA==".into());
        assert_eq!(redact_error(&err, true).message, "aW5pdA==");
    }

    #[test]
    fn system_errors_pass() {
        let err = ComputeError::from(SystemError::NoSuchContract {
            addr: "0x01".into(),
        })
        .wrap("query");
        let redacted = redact_error(&err, true);

        assert_eq!(redacted.message, "query: no such contract: 0x01");
        assert!(!redacted.is_sdk_error);
    }

    #[test]
    fn ledger_errors_pass() {
        let err = ComputeError::InsufficientFunds(
            "spendable balance 0denom is smaller than 5denom".into(),
        );
        let redacted = redact_error(&err, true);

        assert_eq!(redacted.message, err.to_string());
        assert!(redacted.is_sdk_error);
    }

    #[test]
    fn other_errors_are_redacted() {
        let err = ComputeError::GasLimitReached("SubMsg hit gas limit".into());
        let redacted = redact_error(&err, true);

        assert_eq!(
            redacted.message,
            "the error was redacted (codespace: sdk, code: 11). \
             For more info use latest localsecret and reproduce the issue"
        );
        assert!(redacted.is_sdk_error);

        let verbose = redact_error(&err, false);
        assert_eq!(verbose.message, "SubMsg hit gas limit: out of gas");
        assert!(verbose.is_sdk_error);
    }

    proptest! {
        #[test]
        fn redaction_ignores_error_text(first in "[a-z0-9 ]*", second in "[a-z0-9 ]*") {
            let first = redact_error(&ComputeError::NotFound(first), true);
            let second = redact_error(&ComputeError::NotFound(second), true);

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.message, redacted_message("compute", 9));
        }
    }
}
