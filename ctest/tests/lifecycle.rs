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

mod common;

use common::{ALICE, BOB, setup, setup_with};
use compute_core::{
    gas::GasMeter,
    ids::{Address, CodeHash},
    message::{Binary, CosmosMsg, ReplyOn, SubMsg, SubMsgResult, WasmMsg},
};
use compute_core_processor::{
    Context, OverlayStore,
    bank::LedgerCoin,
    configs::ComputeConfig,
    keeper::SIMULATION_CODE_HASH,
    keys,
    msg_server::MsgExecuteContract,
    redact::redacted_message,
};
use ctest::{Script, ScriptQuery, Scripted, System, constants::{DEFAULT_TX_GAS, DENOM}};

#[test]
fn stored_code_is_registered() {
    let system = System::new();

    let code_id = system.store_code(&ALICE, Scripted).unwrap();
    assert_eq!(code_id, 1);
    assert_eq!(
        system.code_hash(code_id),
        CodeHash::generate(b"mock contract code #1")
    );

    let info = system
        .with_context(|ctx| system.keeper().code_info(ctx, code_id))
        .unwrap()
        .expect("code info");
    assert_eq!(info.creator, ALICE);

    assert_eq!(system.store_code(&BOB, Scripted).unwrap(), 2);
}

#[test]
fn instantiation_records_contract() {
    let system = System::new();
    system.spend_blocks(9);

    let code_id = system.store_code(&ALICE, Scripted).unwrap();
    let contract = system
        .instantiate(
            &ALICE,
            code_id,
            "counter",
            &Script::new().store("count", "0").to_json(),
            vec![],
        )
        .unwrap();

    assert_eq!(contract, Address::contract(code_id, 1, &ALICE));

    let info = system
        .with_context(|ctx| system.keeper().contract_info(ctx, &contract))
        .unwrap()
        .expect("contract info");
    assert_eq!(info.code_id, code_id);
    assert_eq!(info.creator, ALICE);
    assert_eq!(info.admin, Some(ALICE));
    assert_eq!(info.label, "counter");
    assert_eq!(info.created, 10);

    let by_label = system
        .with_context(|ctx| system.keeper().contract_by_label(ctx, "counter"))
        .unwrap();
    assert_eq!(by_label, Some(contract));

    let event = system
        .events()
        .into_iter()
        .find(|event| event.ty == "instantiate")
        .expect("instantiate event");
    assert_eq!(
        event.attribute("contract_address"),
        Some(contract.to_string().as_str())
    );
    assert_eq!(event.attribute("code_id"), Some("1"));

    let query = ScriptQuery::Get { key: "count".into() };
    assert_eq!(system.query(&contract, &query.to_json()).unwrap(), b"0");
}

#[test]
fn instantiation_deposit() {
    let s = setup();

    let contract = s
        .system
        .instantiate(
            &ALICE,
            s.code_id,
            "funded",
            &Script::new().to_json(),
            vec![LedgerCoin::new(100, DENOM)],
        )
        .unwrap();

    assert_eq!(s.system.balance(&contract, DENOM), 100);
    assert_eq!(s.system.balance(&ALICE, DENOM), 900);

    let err = s
        .system
        .instantiate(
            &BOB,
            s.code_id,
            "broke",
            &Script::new().to_json(),
            vec![LedgerCoin::new(1, DENOM)],
        )
        .unwrap_err();
    assert_eq!((err.codespace(), err.code()), ("sdk", 5));

    let by_label = s
        .system
        .with_context(|ctx| s.system.keeper().contract_by_label(ctx, "broke"))
        .unwrap();
    assert_eq!(by_label, None);
}

#[test]
fn labels_are_unique_and_required() {
    let s = setup();
    let init = Script::new().to_json();

    let err = s
        .system
        .instantiate(&ALICE, s.code_id, "caller", &init, vec![])
        .unwrap_err();
    assert_eq!(err.code(), 6);

    let err = s
        .system
        .instantiate(&ALICE, s.code_id, "", &init, vec![])
        .unwrap_err();
    assert_eq!(err.code(), 11);
}

#[test]
fn failed_instantiation_frees_label() {
    let s = setup();

    let err = s
        .system
        .instantiate(
            &ALICE,
            s.code_id,
            "retry",
            &Script::new().fail("not yet").to_json(),
            vec![],
        )
        .unwrap_err();
    assert_eq!(err.code(), 2);

    s.system
        .instantiate(&ALICE, s.code_id, "retry", &Script::new().to_json(), vec![])
        .unwrap();
}

#[test]
fn queries_are_read_only() {
    let s = setup();

    s.run(Script::new().store("color", "red")).unwrap();
    assert_eq!(s.get(&s.caller, "color"), b"red");
    assert!(s.get(&s.caller, "missing").is_empty());

    let set = ScriptQuery::Set {
        key: "color".into(),
        value: "blue".into(),
    };
    let err = s.system.query(&s.caller, &set.to_json()).unwrap_err();
    assert_eq!(err.code(), 4);

    assert_eq!(s.get(&s.caller, "color"), b"red");
}

#[test]
fn simulated_code_skips_compilation() {
    let system = System::new();
    let code = b"code nobody registered";

    let mut ctx = Context::new(OverlayStore::new(), GasMeter::infinite()).with_simulation(true);
    let code_id = system.keeper().create(&mut ctx, &ALICE, code, "", "").unwrap();
    assert_eq!(code_id, 1);

    let info = system.keeper().code_info(&ctx, code_id).unwrap().unwrap();
    assert_eq!(info.code_hash, SIMULATION_CODE_HASH);
    assert_eq!(
        ctx.store().get(&keys::code_bytes(&SIMULATION_CODE_HASH)),
        Some(&code[..])
    );

    let mut ctx = Context::new(OverlayStore::new(), GasMeter::infinite());
    let err = system.keeper().create(&mut ctx, &ALICE, code, "", "").unwrap_err();
    assert_eq!(err.code(), 15);
}

#[test]
fn queries_run_under_their_own_gas_limit() {
    let s = setup_with(System::with_config(ComputeConfig {
        smart_query_gas_limit: 40_500,
        ..Default::default()
    }));
    s.run(Script::new().store("color", "red")).unwrap();

    let consumed = || s.system.with_context(|ctx| ctx.gas_meter().consumed());
    let before = consumed();

    let get = ScriptQuery::Get {
        key: "color".into(),
    };
    let err = s.system.query(&s.caller, &get.to_json()).unwrap_err();
    assert!(err.is_out_of_gas());
    assert!(err.to_string().starts_with("out of gas in location"));

    assert_eq!(consumed(), before);
}

#[test]
fn query_of_unknown_contract() {
    let system = System::new();

    let err = system
        .with_context(|ctx| {
            system
                .keeper()
                .query_smart(ctx, &Address::new([9; 20]), b"{}", true)
        })
        .unwrap_err();
    assert_eq!(err.code(), 9);
}

#[test]
fn mismatched_code_hash_is_rejected() {
    let s = setup();

    let msg = MsgExecuteContract {
        sender: ALICE,
        contract: s.caller,
        msg: System::envelope(&CodeHash::generate(b"other"), &Script::new().to_json()),
        sent_funds: vec![],
        callback_sig: None,
    };
    let err = s
        .system
        .deliver_tx(vec![msg.into()], DEFAULT_TX_GAS)
        .single()
        .unwrap_err();

    assert_eq!(err.code(), 3);
}

#[test]
fn storage_access_is_metered() {
    let s = setup();

    let gas = |value: &str| {
        s.run(Script::new().store("key", value)).unwrap();
        s.system.last_tx().expect("delivered tx").gas_used
    };

    assert_eq!(gas("0123456789") - gas("0"), 9 * 30);
}

#[test]
fn admin_migrates_contract() {
    let s = setup();
    s.run(Script::new().store("kept", "yes")).unwrap();

    let new_code = s.system.store_code(&ALICE, Scripted).unwrap();
    s.system
        .migrate(
            &ALICE,
            &s.caller,
            new_code,
            &Script::new().store("migrated", "yes").to_json(),
        )
        .unwrap();

    assert_eq!(
        s.system.contract_code_hash(&s.caller),
        s.system.code_hash(new_code)
    );
    assert_eq!(s.get(&s.caller, "kept"), b"yes");
    assert_eq!(s.get(&s.caller, "migrated"), b"yes");

    let event = s
        .system
        .events()
        .into_iter()
        .find(|event| event.ty == "migrate")
        .expect("migrate event");
    assert_eq!(event.attribute("code_id"), Some(new_code.to_string().as_str()));
}

#[test]
fn only_admin_migrates() {
    let s = setup();
    let new_code = s.system.store_code(&ALICE, Scripted).unwrap();

    let err = s
        .system
        .migrate(&BOB, &s.caller, new_code, &Script::new().to_json())
        .unwrap_err();
    assert_eq!(err.code(), 5);
    assert_eq!(
        s.system.contract_code_hash(&s.caller),
        s.system.code_hash(s.code_id)
    );

    let err = s
        .system
        .migrate(&ALICE, &Address::new([9; 20]), new_code, &Script::new().to_json())
        .unwrap_err();
    assert_eq!(err.code(), 9);
}

#[test]
fn contract_instantiates_contract() {
    let s = setup();

    let instantiate = |label: &str| {
        CosmosMsg::Wasm(WasmMsg::Instantiate {
            code_id: s.code_id,
            code_hash: s.system.code_hash(s.code_id).to_string(),
            msg: Binary(Script::new().store("parent", "caller").to_json()),
            send: vec![],
            label: label.into(),
            admin: None,
            callback_signature: Some(Binary::from(b"sig")),
        })
    };

    s.run(
        Script::new()
            .message(SubMsg::reply_on(instantiate("child"), 1, ReplyOn::Always))
            .message(SubMsg::reply_on(instantiate("child"), 2, ReplyOn::Always)),
    )
    .unwrap();

    let child = s
        .system
        .with_context(|ctx| s.system.keeper().contract_by_label(ctx, "child"))
        .unwrap()
        .expect("child contract");
    assert_eq!(child, Address::contract(s.code_id, 3, &s.caller));
    assert_eq!(s.get(&child, "parent"), b"caller");

    let info = s
        .system
        .with_context(|ctx| s.system.keeper().contract_info(ctx, &child))
        .unwrap()
        .expect("contract info");
    assert_eq!(info.creator, s.caller);
    assert_eq!(info.admin, None);

    match s.reply(b"1") {
        Some(SubMsgResult::Ok(rsp)) => {
            assert!(rsp.events.iter().any(|event| event.ty == "instantiate"));
        }
        other => panic!("expected successful reply, got {other:?}"),
    }

    // The second child collides on its label.
    assert_eq!(
        s.reply(b"2"),
        Some(SubMsgResult::Err(redacted_message("compute", 6)))
    );
}
