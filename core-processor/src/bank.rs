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

//! Ledger bank: accounts, balances and transfers.

use crate::{context::Context, keys, router::LedgerMsgHandler};
use compute_core::{
    ids::Address,
    message::{Coin, Event},
};
use compute_core_errors::ComputeError;
use core::fmt;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;
use std::collections::BTreeMap;

/// Route of [`MsgSend`].
pub const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";

/// Coin in the ledger's native representation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct LedgerCoin {
    /// Denomination.
    pub denom: String,
    /// Integer amount.
    pub amount: u128,
}

impl LedgerCoin {
    /// New coin.
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for LedgerCoin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl TryFrom<&Coin> for LedgerCoin {
    type Error = ComputeError;

    fn try_from(coin: &Coin) -> Result<Self, Self::Error> {
        let amount = coin
            .amount
            .parse()
            .map_err(|_| ComputeError::InvalidCoins(coin.to_string()))?;

        if coin.denom.is_empty() {
            return Err(ComputeError::InvalidCoins(coin.to_string()));
        }

        Ok(Self {
            denom: coin.denom.clone(),
            amount,
        })
    }
}

/// Converts contract coins into ledger coins.
pub fn convert_coins(coins: &[Coin]) -> Result<Vec<LedgerCoin>, ComputeError> {
    coins.iter().map(LedgerCoin::try_from).collect()
}

/// Converts ledger coins into contract coins.
pub fn to_contract_coins(coins: &[LedgerCoin]) -> Vec<Coin> {
    coins
        .iter()
        .map(|coin| Coin::new(coin.amount, coin.denom.clone()))
        .collect()
}

fn format_coins(coins: &[LedgerCoin]) -> String {
    coins
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Ledger-native transfer message.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MsgSend {
    /// Sender, the only signer.
    pub from_address: Address,
    /// Recipient.
    pub to_address: Address,
    /// Transferred coins.
    pub amount: Vec<LedgerCoin>,
}

/// Bank operations over the context store.
pub struct Bank;

impl Bank {
    /// Whether an account exists.
    pub fn has_account(ctx: &Context, addr: &Address) -> bool {
        ctx.store().has(&keys::account(addr))
    }

    /// Creates a zero-balance account.
    pub fn create_account(ctx: &mut Context, addr: &Address) {
        ctx.store_mut().set(keys::account(addr), Vec::new());
    }

    /// Balance of `denom`.
    pub fn balance(ctx: &Context, addr: &Address, denom: &str) -> u128 {
        ctx.store()
            .get(&keys::balance(addr, denom))
            .and_then(|mut bytes| u128::decode(&mut bytes).ok())
            .unwrap_or_default()
    }

    fn set_balance(ctx: &mut Context, addr: &Address, denom: &str, amount: u128) {
        let key = keys::balance(addr, denom);
        if amount == 0 {
            ctx.store_mut().remove(&key);
        } else {
            ctx.store_mut().set(key, amount.encode());
        }
    }

    /// Credits new coins to `addr`.
    pub fn mint(ctx: &mut Context, addr: &Address, coins: &[LedgerCoin]) -> Result<(), ComputeError> {
        if !Self::has_account(ctx, addr) {
            Self::create_account(ctx, addr);
        }

        for coin in coins {
            let balance = Self::balance(ctx, addr, &coin.denom)
                .checked_add(coin.amount)
                .ok_or_else(|| ComputeError::InvalidCoins(format!("{coin} overflows balance")))?;
            Self::set_balance(ctx, addr, &coin.denom, balance);
        }

        Ok(())
    }

    fn pending_balance<'a>(
        ctx: &Context,
        updates: &BTreeMap<(Address, &'a str), u128>,
        addr: &Address,
        denom: &'a str,
    ) -> u128 {
        updates
            .get(&(*addr, denom))
            .copied()
            .unwrap_or_else(|| Self::balance(ctx, addr, denom))
    }

    /// Moves coins between accounts, creating the recipient account if needed.
    pub fn send_coins(
        ctx: &mut Context,
        from: &Address,
        to: &Address,
        coins: &[LedgerCoin],
    ) -> Result<(), ComputeError> {
        let mut updates = BTreeMap::new();

        for coin in coins {
            let denom = coin.denom.as_str();

            let balance = Self::pending_balance(ctx, &updates, from, denom);
            let left = balance.checked_sub(coin.amount).ok_or_else(|| {
                ComputeError::InsufficientFunds(format!(
                    "spendable balance {balance}{denom} is smaller than {coin}"
                ))
            })?;
            updates.insert((*from, denom), left);

            let received = Self::pending_balance(ctx, &updates, to, denom)
                .checked_add(coin.amount)
                .ok_or_else(|| ComputeError::InvalidCoins(format!("{coin} overflows balance")))?;
            updates.insert((*to, denom), received);
        }

        for ((addr, denom), amount) in updates {
            Self::set_balance(ctx, &addr, denom, amount);
        }

        if !Self::has_account(ctx, to) {
            Self::create_account(ctx, to);
        }

        let amount = format_coins(coins);
        log::trace!("transfer {amount} from {from} to {to}");

        ctx.emit_events([
            Event::new("coin_spent")
                .add_attribute("spender", from.to_string())
                .add_attribute("amount", amount.clone()),
            Event::new("coin_received")
                .add_attribute("receiver", to.to_string())
                .add_attribute("amount", amount.clone()),
            Event::new("transfer")
                .add_attribute("recipient", to.to_string())
                .add_attribute("sender", from.to_string())
                .add_attribute("amount", amount),
            Event::new(Event::MESSAGE).add_attribute("sender", from.to_string()),
        ]);

        Ok(())
    }
}

/// Routed handler of [`MsgSend`].
pub struct MsgSendHandler;

impl MsgSendHandler {
    fn decode(mut value: &[u8]) -> Result<MsgSend, ComputeError> {
        MsgSend::decode(&mut value)
            .map_err(|err| ComputeError::InvalidRequest(format!("cannot decode MsgSend: {err}")))
    }
}

impl LedgerMsgHandler for MsgSendHandler {
    fn signers(&self, value: &[u8]) -> Result<Vec<Address>, ComputeError> {
        Ok(vec![Self::decode(value)?.from_address])
    }

    fn handle(&self, ctx: &mut Context, value: &[u8]) -> Result<Vec<u8>, ComputeError> {
        let msg = Self::decode(value)?;
        Bank::send_coins(ctx, &msg.from_address, &msg.to_address, &msg.amount)?;

        Ok(Vec::new())
    }
}
