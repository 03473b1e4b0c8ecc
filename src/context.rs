//! Shared registry for one run: tracked accounts, bot identities, and the
//! full address list. Mutated only during setup and through the simulator's
//! refresh path; behaviours receive `&Context` and never write to it.

use alloy::primitives::Address;

use crate::account::Eip20Account;

#[derive(Debug, Default)]
pub struct Context {
    pub accounts: Vec<Eip20Account>,
    pub bot_accounts: Vec<Address>,
    pub addresses: Vec<Address>,
}

impl Context {
    /// Build a registry where every address is both tracked and bound to a
    /// bot, the usual harness layout.
    pub fn for_addresses(addresses: Vec<Address>) -> Self {
        Self {
            accounts: addresses.iter().copied().map(Eip20Account::new).collect(),
            bot_accounts: addresses.clone(),
            addresses,
        }
    }

    pub fn account(&self, address: Address) -> Option<&Eip20Account> {
        self.accounts.iter().find(|a| a.address() == address)
    }

    pub fn bot_count(&self) -> usize {
        self.bot_accounts.len()
    }
}
