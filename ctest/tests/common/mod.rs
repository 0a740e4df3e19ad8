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

#![allow(dead_code)]

use compute_core::{
    ids::{Address, CodeId},
    message::SubMsgResult,
};
use ctest::{Script, ScriptQuery, Scripted, System, constants::DENOM, reply_key};

pub const ALICE: Address = Address::new([0xa1; 20]);
pub const BOB: Address = Address::new([0xb0; 20]);

pub struct Setup {
    pub system: System,
    pub code_id: CodeId,
    pub caller: Address,
    pub callee: Address,
}

pub fn setup() -> Setup {
    setup_with(System::new())
}

pub fn setup_with(system: System) -> Setup {
    system.init_logger();
    system.mint(&ALICE, 1_000, DENOM);

    let code_id = system.store_code(&ALICE, Scripted).unwrap();
    let caller = system
        .instantiate(&ALICE, code_id, "caller", &Script::new().to_json(), vec![])
        .unwrap();
    let callee = system
        .instantiate(&ALICE, code_id, "callee", &Script::new().to_json(), vec![])
        .unwrap();

    Setup {
        system,
        code_id,
        caller,
        callee,
    }
}

impl Setup {
    pub fn run(&self, script: Script) -> Result<Vec<u8>, compute_core_errors::ComputeError> {
        self.system
            .execute(&ALICE, &self.caller, &script.to_json(), vec![])
    }

    pub fn get(&self, contract: &Address, key: &str) -> Vec<u8> {
        let query = ScriptQuery::Get { key: key.into() };
        self.system.query(contract, &query.to_json()).unwrap()
    }

    pub fn reply(&self, id: &[u8]) -> Option<SubMsgResult> {
        let record = self.get(&self.caller, &reply_key(id));
        (!record.is_empty()).then(|| serde_json::from_slice(&record).unwrap())
    }
}
