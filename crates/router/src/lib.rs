//! Execution engine: the router, its protocol modules, the approval proxy
//! and the legacy router, running on an in-memory chain.
//!
//! [`Chain`] executes message calls with EVM-like semantics on top of a
//! checkpointed [`Ledger`]: value moves before code runs and a reverting call
//! undoes everything it did, including nested calls. Exchanges are plugged
//! in as [`Contract`]s.

mod approval_proxy;
mod chain;
mod ledger;
pub mod legacy;
mod module;
mod revert;
mod router;
#[cfg(test)]
mod testing;
pub mod tokens;

pub use {
    approval_proxy::ApprovalProxy,
    chain::{Chain, Contract, Env},
    ledger::{Checkpoint, Ledger},
    legacy::LegacyRouter,
    module::ExchangeModule,
    revert::Revert,
    router::Router,
};
