//! Message-call semantics on top of the [`Ledger`].

use {
    crate::{Ledger, Revert},
    alloy_primitives::{Address, B256, Bytes, U256},
    alloy_sol_types::SolCall,
    std::{collections::HashMap, sync::Arc},
};

/// Code deployed at an address.
pub trait Contract: Send + Sync {
    /// Runs a state changing call. Any change made through `env` is rolled
    /// back when this returns an error.
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert>;

    /// Plain native transfer without calldata.
    fn receive(&self, _env: &mut Env<'_>) -> Result<(), Revert> {
        Ok(())
    }

    /// Runs a static call.
    fn view(&self, _chain: &Chain, _this: Address, _input: &[u8]) -> Result<Bytes, Revert> {
        Err(Revert::InvalidCalldata)
    }
}

/// The execution backend: a ledger plus the contracts deployed on it.
pub struct Chain {
    ledger: Ledger,
    contracts: HashMap<Address, Arc<dyn Contract>>,
    chain_id: u64,
    timestamp: u64,
}

impl Chain {
    pub fn new(chain_id: u64, timestamp: u64) -> Self {
        Self {
            ledger: Ledger::default(),
            contracts: HashMap::new(),
            chain_id,
            timestamp,
        }
    }

    pub fn deploy(&mut self, address: Address, contract: impl Contract + 'static) {
        self.contracts.insert(address, Arc::new(contract));
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.contracts.contains_key(&address)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Executes a message call from `from` to `to`. The value is transferred
    /// before any code runs and everything is undone if the call reverts.
    pub fn call(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        let checkpoint = self.ledger.checkpoint();
        let result = self.execute(from, to, value, input);
        match &result {
            Ok(_) => self.ledger.commit(checkpoint),
            Err(err) => {
                tracing::trace!(%from, %to, ?err, "call reverted");
                self.ledger.revert(checkpoint);
            }
        }
        result
    }

    fn execute(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        self.ledger.transfer_native(from, to, value)?;
        let Some(contract) = self.contracts.get(&to).cloned() else {
            if input.is_empty() {
                return Ok(Bytes::new());
            }
            return Err(Revert::custom(format!("call to non-contract {to}")));
        };
        let mut env = Env {
            chain: self,
            this: to,
            caller: from,
            value,
        };
        if input.is_empty() {
            contract.receive(&mut env)?;
            return Ok(Bytes::new());
        }
        contract.call(&mut env, input)
    }

    /// Sends a typed call.
    pub fn transact<C: SolCall>(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        call: &C,
    ) -> Result<C::Return, Revert> {
        let output = self.call(from, to, value, &call.abi_encode())?;
        Ok(C::abi_decode_returns(&output)?)
    }

    /// Executes a static call.
    pub fn view(&self, to: Address, input: &[u8]) -> Result<Bytes, Revert> {
        let contract = self
            .contracts
            .get(&to)
            .ok_or_else(|| Revert::custom(format!("static call to non-contract {to}")))?;
        contract.view(self, to, input)
    }

    pub fn view_call<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return, Revert> {
        let output = self.view(to, &call.abi_encode())?;
        Ok(C::abi_decode_returns(&output)?)
    }
}

impl protocols::ChainState for Chain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn balance(&self, account: Address) -> U256 {
        self.ledger.native_balance(account)
    }

    fn static_call(&self, to: Address, data: &[u8]) -> Result<Bytes, String> {
        self.view(to, data).map_err(|err| err.to_string())
    }
}

/// Execution context of a running contract.
pub struct Env<'a> {
    pub chain: &'a mut Chain,
    /// Address of the running contract.
    pub this: Address,
    pub caller: Address,
    /// Native value sent along with the call.
    pub value: U256,
}

impl Env<'_> {
    pub fn call(&mut self, to: Address, value: U256, input: &[u8]) -> Result<Bytes, Revert> {
        self.chain.call(self.this, to, value, input)
    }

    pub fn call_sol<C: SolCall>(
        &mut self,
        to: Address,
        value: U256,
        call: &C,
    ) -> Result<C::Return, Revert> {
        self.chain.transact(self.this, to, value, call)
    }

    /// Sends native currency from the running contract.
    pub fn send(&mut self, to: Address, amount: U256) -> Result<(), Revert> {
        if amount.is_zero() {
            return Ok(());
        }
        self.call(to, amount, &[]).map(|_| ())
    }

    pub fn view<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return, Revert> {
        self.chain.view_call(to, call)
    }

    pub fn ledger(&mut self) -> &mut Ledger {
        &mut self.chain.ledger
    }

    pub fn balance(&self) -> U256 {
        self.chain.ledger.native_balance(self.this)
    }

    pub fn timestamp(&self) -> u64 {
        self.chain.timestamp
    }

    pub fn sload(&self, slot: B256) -> B256 {
        self.chain.ledger.sload(self.this, slot)
    }

    pub fn sstore(&mut self, slot: B256, value: B256) {
        self.chain.ledger.sstore(self.this, slot, value);
    }
}
