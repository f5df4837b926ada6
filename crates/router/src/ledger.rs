//! In-memory world state of accounts and token balances.

use {
    crate::Revert,
    alloy_primitives::{Address, B256, U256},
    model::Asset,
    std::collections::HashMap,
};

#[derive(Clone, Debug, Default)]
struct State {
    native: HashMap<Address, U256>,
    /// (token, owner)
    erc20: HashMap<(Address, Address), U256>,
    /// (token, owner, spender)
    allowances: HashMap<(Address, Address, Address), U256>,
    /// (contract, id) to owner
    erc721: HashMap<(Address, U256), Address>,
    /// (contract, id, owner)
    erc1155: HashMap<(Address, U256, Address), U256>,
    /// (contract, owner, operator)
    operators: HashMap<(Address, Address, Address), bool>,
    /// (contract, slot)
    storage: HashMap<(Address, B256), B256>,
}

/// Handle to a state snapshot taken by [`Ledger::checkpoint`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Checkpoint(usize);

/// Balances, approvals and contract storage with nested checkpoints.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    state: State,
    snapshots: Vec<State>,
}

impl Ledger {
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.snapshots.push(self.state.clone());
        Checkpoint(self.snapshots.len() - 1)
    }

    /// Keeps all changes since the checkpoint.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        self.snapshots.truncate(checkpoint.0);
    }

    /// Undoes all changes since the checkpoint.
    pub fn revert(&mut self, checkpoint: Checkpoint) {
        if let Some(state) = self.snapshots.get(checkpoint.0) {
            self.state = state.clone();
        }
        self.snapshots.truncate(checkpoint.0);
    }

    pub fn native_balance(&self, account: Address) -> U256 {
        self.state.native.get(&account).copied().unwrap_or_default()
    }

    pub fn mint_native(&mut self, account: Address, amount: U256) {
        *self.state.native.entry(account).or_default() += amount;
    }

    pub fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self.native_balance(from);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(Revert::InsufficientBalance)?;
        self.state.native.insert(from, remaining);
        *self.state.native.entry(to).or_default() += amount;
        Ok(())
    }

    pub fn erc20_balance(&self, token: Address, owner: Address) -> U256 {
        self.state
            .erc20
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn mint_erc20(&mut self, token: Address, owner: Address, amount: U256) {
        *self.state.erc20.entry((token, owner)).or_default() += amount;
    }

    pub fn burn_erc20(
        &mut self,
        token: Address,
        owner: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        let remaining = self
            .erc20_balance(token, owner)
            .checked_sub(amount)
            .ok_or(Revert::InsufficientBalance)?;
        self.state.erc20.insert((token, owner), remaining);
        Ok(())
    }

    pub fn transfer_erc20(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        self.burn_erc20(token, from, amount)?;
        self.mint_erc20(token, to, amount);
        Ok(())
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_allowance(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) {
        self.state
            .allowances
            .insert((token, owner, spender), amount);
    }

    pub fn erc721_owner(&self, contract: Address, id: U256) -> Option<Address> {
        self.state.erc721.get(&(contract, id)).copied()
    }

    pub fn erc721_balance(&self, contract: Address, owner: Address) -> U256 {
        let count = self
            .state
            .erc721
            .iter()
            .filter(|((token, _), holder)| *token == contract && **holder == owner)
            .count();
        U256::from(count)
    }

    pub fn mint_erc721(&mut self, contract: Address, owner: Address, id: U256) {
        self.state.erc721.insert((contract, id), owner);
    }

    pub fn transfer_erc721(
        &mut self,
        contract: Address,
        from: Address,
        to: Address,
        id: U256,
    ) -> Result<(), Revert> {
        if self.erc721_owner(contract, id) != Some(from) {
            return Err(Revert::NotOwner);
        }
        self.state.erc721.insert((contract, id), to);
        Ok(())
    }

    pub fn erc1155_balance(&self, contract: Address, id: U256, owner: Address) -> U256 {
        self.state
            .erc1155
            .get(&(contract, id, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn mint_erc1155(&mut self, contract: Address, owner: Address, id: U256, amount: U256) {
        *self.state.erc1155.entry((contract, id, owner)).or_default() += amount;
    }

    pub fn transfer_erc1155(
        &mut self,
        contract: Address,
        from: Address,
        to: Address,
        id: U256,
        amount: U256,
    ) -> Result<(), Revert> {
        let remaining = self
            .erc1155_balance(contract, id, from)
            .checked_sub(amount)
            .ok_or(Revert::InsufficientBalance)?;
        self.state.erc1155.insert((contract, id, from), remaining);
        self.mint_erc1155(contract, to, id, amount);
        Ok(())
    }

    pub fn is_operator(&self, contract: Address, owner: Address, operator: Address) -> bool {
        self.state
            .operators
            .get(&(contract, owner, operator))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_operator(
        &mut self,
        contract: Address,
        owner: Address,
        operator: Address,
        approved: bool,
    ) {
        self.state
            .operators
            .insert((contract, owner, operator), approved);
    }

    pub fn sload(&self, contract: Address, slot: B256) -> B256 {
        self.state
            .storage
            .get(&(contract, slot))
            .copied()
            .unwrap_or_default()
    }

    pub fn sstore(&mut self, contract: Address, slot: B256, value: B256) {
        self.state.storage.insert((contract, slot), value);
    }

    /// Everything `holder` owns, in a stable order.
    pub fn holdings(&self, holder: Address) -> Vec<(Asset, U256)> {
        let mut holdings = Vec::new();
        let native = self.native_balance(holder);
        if !native.is_zero() {
            holdings.push((Asset::Native, native));
        }
        holdings.extend(
            self.state
                .erc20
                .iter()
                .filter(|((_, owner), amount)| *owner == holder && !amount.is_zero())
                .map(|((token, _), amount)| (Asset::Erc20 { token: *token }, *amount)),
        );
        holdings.extend(
            self.state
                .erc721
                .iter()
                .filter(|(_, owner)| **owner == holder)
                .map(|((contract, id), _)| {
                    (
                        Asset::Erc721 {
                            contract: *contract,
                            id: *id,
                        },
                        U256::from(1),
                    )
                }),
        );
        holdings.extend(
            self.state
                .erc1155
                .iter()
                .filter(|((_, _, owner), amount)| *owner == holder && !amount.is_zero())
                .map(|((contract, id, _), amount)| {
                    (
                        Asset::Erc1155 {
                            contract: *contract,
                            id: *id,
                        },
                        *amount,
                    )
                }),
        );
        holdings.sort();
        holdings
    }
}
