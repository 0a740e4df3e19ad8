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

use common::{ALICE, BOB, Setup, setup, setup_with};
use compute_core::{
    ids::Address,
    message::{BankMsg, Binary, Coin, CosmosMsg, Event, ReplyOn, SubMsg, SubMsgResult, WasmMsg},
};
use compute_core_errors::ErrorKind;
use compute_core_processor::{
    bank::{LedgerCoin, MSG_SEND_TYPE_URL, MsgSend},
    configs::ComputeConfig,
    msg_server::MsgExecuteContract,
    redact::redacted_message,
};
use ctest::{Script, System, constants::{DEFAULT_TX_GAS, DENOM}};
use parity_scale_codec::Encode;

fn call(s: &Setup, script: Script) -> CosmosMsg {
    s.system.wasm_execute(&s.callee, &script.to_json(), false)
}

fn sealed_call(s: &Setup, script: Script) -> CosmosMsg {
    s.system.wasm_execute(&s.callee, &script.to_json(), true)
}

fn reply_ok(s: &Setup, id: &[u8]) -> (Vec<Event>, Option<Binary>) {
    match s.reply(id) {
        Some(SubMsgResult::Ok(rsp)) => (rsp.events, rsp.data),
        other => panic!("expected successful reply, got {other:?}"),
    }
}

fn reply_err(s: &Setup, id: &[u8]) -> String {
    match s.reply(id) {
        Some(SubMsgResult::Err(err)) => err,
        other => panic!("expected failed reply, got {other:?}"),
    }
}

#[test]
fn successful_submessage_is_committed() {
    let s = setup();

    let callee = Script::new().store("greeting", "hello").data(b"pong");
    s.run(Script::new().message(SubMsg::reply_on(call(&s, callee), 7, ReplyOn::Always)))
        .unwrap();

    assert_eq!(s.get(&s.callee, "greeting"), b"hello");

    let (events, data) = reply_ok(&s, b"7");
    assert_eq!(data, Some(Binary::from(b"pong")));
    assert!(events.iter().all(|event| event.ty != Event::MESSAGE));

    let execute = events
        .iter()
        .find(|event| event.ty == "execute")
        .expect("callee execute event");
    assert_eq!(
        execute.attribute("contract_address"),
        Some(s.callee.to_string().as_str())
    );
}

#[test]
fn failed_submessage_leaves_no_trace() {
    let s = setup();

    let callee = Script::new().store("greeting", "hello").fail("boom");
    s.run(
        Script::new()
            .store("caller", "ran")
            .message(SubMsg::reply_on(call(&s, callee), 1, ReplyOn::OnError)),
    )
    .unwrap();

    assert!(s.get(&s.callee, "greeting").is_empty());
    assert_eq!(s.get(&s.caller, "caller"), b"ran");

    // Contract errors reach the caller as the encrypted text only.
    assert_eq!(reply_err(&s, b"1"), Binary::from(b"boom").to_base64());

    let events = s.system.events();
    assert!(
        events
            .iter()
            .all(|event| event.attribute("contract_address") != Some(s.callee.to_string().as_str()))
    );
}

#[test]
fn unhandled_failure_reverts_the_transaction() {
    let s = setup();

    for reply_on in [ReplyOn::Never, ReplyOn::OnSuccess] {
        let callee = Script::new().fail("boom");
        let err = s
            .run(
                Script::new()
                    .store("caller", "ran")
                    .message(SubMsg::reply_on(call(&s, callee), 1, reply_on)),
            )
            .unwrap_err();

        assert_eq!(err.code(), 3);
        assert_eq!(err.kind(), ErrorKind::Contract);
        assert!(s.get(&s.caller, "caller").is_empty());
        assert!(s.system.events().is_empty());
    }
}

#[test]
fn reply_policy_selects_outcomes() {
    let s = setup();

    s.run(
        Script::new()
            .message(SubMsg::reply_on(call(&s, Script::new()), 1, ReplyOn::OnSuccess))
            .message(SubMsg::reply_on(call(&s, Script::new()), 2, ReplyOn::OnError))
            .message(SubMsg::reply_on(call(&s, Script::new()), 3, ReplyOn::Never))
            .message(SubMsg::reply_on(
                call(&s, Script::new().fail("boom")),
                4,
                ReplyOn::Always,
            )),
    )
    .unwrap();

    assert!(s.reply(b"1").is_some_and(|reply| reply.is_ok()));
    assert_eq!(s.reply(b"2"), None);
    assert_eq!(s.reply(b"3"), None);
    assert!(s.reply(b"4").is_some_and(|reply| !reply.is_ok()));
}

#[test]
fn failure_stops_remaining_submessages() {
    let s = setup();

    let err = s
        .run(
            Script::new()
                .message(SubMsg::new(call(&s, Script::new().store("first", "1"))))
                .message(SubMsg::new(call(&s, Script::new().fail("boom"))))
                .message(SubMsg::new(call(&s, Script::new().store("third", "3")))),
        )
        .unwrap_err();

    assert_eq!(err.code(), 3);
    assert!(s.get(&s.callee, "first").is_empty());
    assert!(s.get(&s.callee, "third").is_empty());
}

#[test]
fn reply_data_overrides_response_data() {
    let s = setup();

    let data = s
        .run(
            Script::new()
                .on_reply(Script::new().data(b"from reply"))
                .data(b"from execute")
                .message(SubMsg::reply_on(call(&s, Script::new()), 1, ReplyOn::Always)),
        )
        .unwrap();
    assert_eq!(data, b"from reply");

    let data = s
        .run(
            Script::new()
                .on_reply(Script::new())
                .data(b"from execute")
                .message(SubMsg::reply_on(call(&s, Script::new()), 1, ReplyOn::Always)),
        )
        .unwrap();
    assert_eq!(data, b"from execute");
}

#[test]
fn failing_reply_reverts_the_transaction() {
    let s = setup();

    let err = s
        .run(
            Script::new()
                .on_reply(Script::new().fail("nope"))
                .message(SubMsg::reply_on(call(&s, Script::new()), 1, ReplyOn::Always)),
        )
        .unwrap_err();

    assert_eq!(err.code(), 19);
}

#[test]
fn terminal_marker_stops_dispatching() {
    let s = setup();

    s.run(
        Script::new()
            .message(SubMsg::new(CosmosMsg::FinalizeTx {}))
            .message(SubMsg::new(call(&s, Script::new().store("late", "1")))),
    )
    .unwrap();
    assert!(s.get(&s.callee, "late").is_empty());

    // A marker set deeper in the call tree stops the callers as well.
    let finalizing = Script::new().message(SubMsg::new(CosmosMsg::FinalizeTx {}));
    let err = s
        .run(
            Script::new()
                .message(SubMsg::new(call(&s, finalizing)))
                .message(SubMsg::new(call(&s, Script::new().store("late", "1")))),
        )
        .unwrap_err();

    assert_eq!(err.code(), 41);
    assert!(err.is_fatal());
}

#[test]
fn terminal_marker_ends_the_transaction() {
    let s = setup();

    let msg = |script: Script| MsgExecuteContract {
        sender: ALICE,
        contract: s.caller,
        msg: System::envelope(&s.system.contract_code_hash(&s.caller), &script.to_json()),
        sent_funds: vec![],
        callback_sig: None,
    };

    let finalizing = Script::new().message(SubMsg::new(CosmosMsg::FinalizeTx {}));
    let tx = s.system.deliver_tx(
        vec![
            msg(finalizing).into(),
            msg(Script::new().store("late", "1")).into(),
        ],
        DEFAULT_TX_GAS,
    );

    assert_eq!(tx.result.unwrap_err().code(), 41);
    assert!(tx.events.is_empty());

    // The marker does not leak into the next transaction.
    s.run(Script::new().store("late", "1")).unwrap();
    assert_eq!(s.get(&s.caller, "late"), b"1");
}

#[test]
fn gas_limit_caps_submessage() {
    let s = setup();

    let run = |burn: u64| {
        let callee = Script::new().burn(burn);
        s.run(Script::new().message(
            SubMsg::reply_on(call(&s, callee), 1, ReplyOn::OnError).with_gas_limit(60_000),
        ))
        .unwrap();

        s.system.last_tx().expect("delivered tx").gas_used
    };

    let small = run(50_000_000);
    let large = run(500_000_000);

    // The parent pays the whole limit no matter how far the callee went.
    assert_eq!(small, large);
    assert_eq!(reply_err(&s, b"1"), redacted_message("sdk", 11));
}

#[test]
fn gas_limit_tighter_than_instance_cost() {
    let s = setup();

    s.run(Script::new().message(
        SubMsg::reply_on(call(&s, Script::new()), 1, ReplyOn::Always).with_gas_limit(1_000),
    ))
    .unwrap();

    assert_eq!(reply_err(&s, b"1"), redacted_message("sdk", 11));
}

#[test]
fn gas_limit_above_usage_charges_usage() {
    let s = setup();

    let run = |msg: SubMsg| {
        s.run(Script::new().message(msg)).unwrap();
        s.system.last_tx().expect("delivered tx").gas_used
    };

    let callee = || call(&s, Script::new().burn(1_000_000));
    let unlimited = run(SubMsg::new(callee()));
    let limited = run(SubMsg::new(callee()).with_gas_limit(5_000_000));

    assert_eq!(unlimited, limited);
}

#[test]
fn unlimited_submessage_out_of_gas_is_fatal() {
    let s = setup();

    let callee = Script::new().burn(u64::MAX / 2);
    let err = s
        .run(Script::new().message(SubMsg::reply_on(call(&s, callee), 1, ReplyOn::Always)))
        .unwrap_err();

    assert!(err.is_out_of_gas());
    assert_eq!(s.reply(b"1"), None);
}

#[test]
fn transaction_out_of_gas() {
    let s = setup();

    let err = s
        .system
        .execute_with_gas(&ALICE, &s.caller, &Script::new().to_json(), vec![], 10_000)
        .unwrap_err();

    assert!(err.is_out_of_gas());
    assert_eq!(err.codespace(), "sdk");
}

#[test]
fn call_depth_is_limited() {
    let config = ComputeConfig {
        max_call_depth: 3,
        ..Default::default()
    };
    let s = setup_with(System::with_config(config));

    let nested = |depth: usize, key: &str| {
        (0..depth).fold(Script::new().store(key, "reached"), |script, _| {
            Script::new().message(SubMsg::new(call(&s, script)))
        })
    };

    s.run(nested(3, "third")).unwrap();
    assert_eq!(s.get(&s.callee, "third"), b"reached");

    let err = s.run(nested(4, "fourth")).unwrap_err();
    assert_eq!(err.code(), 23);
    assert_eq!(err.kind(), ErrorKind::Ledger);
    assert!(s.get(&s.callee, "fourth").is_empty());
}

#[test]
fn ledger_errors_keep_their_text() {
    let s = setup();

    let unknown_route = CosmosMsg::Stargate {
        type_url: "/foo".into(),
        value: Binary::default(),
    };
    let foreign_send = CosmosMsg::Stargate {
        type_url: MSG_SEND_TYPE_URL.into(),
        value: Binary(
            MsgSend {
                from_address: ALICE,
                to_address: BOB,
                amount: vec![LedgerCoin::new(1, DENOM)],
            }
            .encode(),
        ),
    };
    let overspend = CosmosMsg::Bank(BankMsg::Send {
        to_address: BOB.to_string(),
        amount: vec![Coin::new(5, DENOM)],
    });

    s.run(
        Script::new()
            .message(SubMsg::reply_on(unknown_route, 1, ReplyOn::Always))
            .message(SubMsg::reply_on(foreign_send, 2, ReplyOn::Always))
            .message(SubMsg::reply_on(overspend, 3, ReplyOn::Always)),
    )
    .unwrap();

    assert_eq!(
        reply_err(&s, b"1"),
        "unrecognized message route: /foo: unknown request"
    );
    assert_eq!(
        reply_err(&s, b"2"),
        format!(
            "contract {} doesn't have permission to sign for {ALICE}: unauthorized",
            s.caller
        )
    );
    assert!(reply_err(&s, b"3").ends_with(": insufficient funds"));
    assert_eq!(s.system.balance(&ALICE, DENOM), 1_000);
}

fn missing_contract_call(s: &Setup) -> CosmosMsg {
    CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: Address::new([7; 20]).to_string(),
        code_hash: s.system.contract_code_hash(&s.callee).to_string(),
        msg: Binary::default(),
        send: vec![],
        callback_signature: Some(Binary::from(b"sig")),
    })
}

#[test]
fn host_errors_are_redacted() {
    let s = setup();

    s.run(Script::new().message(SubMsg::reply_on(missing_contract_call(&s), 1, ReplyOn::Always)))
        .unwrap();

    assert_eq!(reply_err(&s, b"1"), redacted_message("compute", 9));
}

#[test]
fn redaction_can_be_disabled() {
    let config = ComputeConfig {
        redact_errors: false,
        ..Default::default()
    };
    let s = setup_with(System::with_config(config));

    s.run(Script::new().message(SubMsg::reply_on(missing_contract_call(&s), 1, ReplyOn::Always)))
        .unwrap();

    assert_eq!(
        reply_err(&s, b"1"),
        format!("contract {}: not found", Address::new([7; 20]))
    );
}

#[test]
fn bank_transfer_submessage() {
    let s = setup();
    s.system.mint(&s.caller, 100, DENOM);

    let send = CosmosMsg::Bank(BankMsg::Send {
        to_address: BOB.to_string(),
        amount: vec![Coin::new(40, DENOM)],
    });
    s.run(Script::new().message(SubMsg::reply_on(send, 1, ReplyOn::Always)))
        .unwrap();

    assert_eq!(s.system.balance(&s.caller, DENOM), 60);
    assert_eq!(s.system.balance(&BOB, DENOM), 40);

    // Ledger messages report neither events nor empty data.
    let (events, data) = reply_ok(&s, b"1");
    assert!(events.is_empty());
    assert_eq!(data, None);

    assert!(s.system.events().iter().any(|event| event.ty == "transfer"));
}

#[test]
fn encrypted_reply_is_rewrapped() {
    let s = setup();

    let callee = Script::new().store("greeting", "hello").data(b"secret pong");
    s.run(Script::new().message(
        SubMsg::reply_on(sealed_call(&s, callee), 1, ReplyOn::Always).encrypted(),
    ))
    .unwrap();

    // Sealed calls are correlated by the runtime-issued id.
    let id = [b"msg:".as_slice(), s.callee.as_ref()].concat();
    assert_eq!(s.reply(b"1"), None);

    let (_, data) = reply_ok(&s, &id);
    assert_eq!(data, Some(Binary::from(b"secret pong")));
    assert_eq!(s.get(&s.callee, "greeting"), b"hello");
}

#[test]
fn encrypted_failure_is_rewrapped() {
    let s = setup();

    let callee = Script::new().fail("boom");
    s.run(Script::new().message(
        SubMsg::reply_on(sealed_call(&s, callee), 1, ReplyOn::OnError).encrypted(),
    ))
    .unwrap();

    let id = [b"msg:".as_slice(), s.callee.as_ref()].concat();
    assert_eq!(reply_err(&s, &id), Binary::from(b"boom").to_base64());
}

#[test]
fn encrypted_submessage_ledger_error_is_fatal() {
    let s = setup();

    let mut msg = sealed_call(&s, Script::new());
    if let CosmosMsg::Wasm(WasmMsg::Execute { send, .. }) = &mut msg {
        send.push(Coin::new(1_000, DENOM));
    }

    let err = s
        .run(Script::new().message(SubMsg::reply_on(msg, 1, ReplyOn::Always).encrypted()))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(
        err.to_string()
            .contains("an sdk error occoured while sending a sub-message")
    );
}

#[test]
fn encrypted_flag_without_routing_info_is_fatal() {
    let s = setup();

    // Plain callee output carries no reply-routing metadata.
    let err = s
        .run(Script::new().message(
            SubMsg::reply_on(call(&s, Script::new().data(b"pong")), 1, ReplyOn::Always)
                .encrypted(),
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn submessage_events_are_sorted() {
    let s = setup();

    let script = || Script::new().attribute("zeta", "1").attribute("alpha", "2");
    s.run(script().message(SubMsg::new(call(&s, script())))).unwrap();

    let wasm_event = |contract: &Address| {
        s.system
            .events()
            .into_iter()
            .find(|event| {
                event.ty == "wasm"
                    && event.attribute("contract_address") == Some(contract.to_string().as_str())
            })
            .expect("wasm event")
    };
    let keys = |event: Event| {
        event
            .attributes
            .into_iter()
            .map(|attr| attr.key)
            .collect::<Vec<_>>()
    };

    assert_eq!(
        keys(wasm_event(&s.caller)),
        ["contract_address", "zeta", "alpha"]
    );
    assert_eq!(
        keys(wasm_event(&s.callee)),
        ["alpha", "contract_address", "zeta"]
    );
}

#[test]
fn custom_events_are_prefixed() {
    let s = setup();

    s.run(Script::new().event(Event::new(" swap ").add_attribute("amount", "5")))
        .unwrap();

    let event = s
        .system
        .events()
        .into_iter()
        .find(|event| event.ty == "wasm-swap")
        .expect("custom event");
    assert_eq!(event.attributes[0].key, "contract_address");
    assert_eq!(event.attribute("amount"), Some("5"));

    let err = s.run(Script::new().event(Event::new("x"))).unwrap_err();
    assert_eq!(err.code(), 21);
}
