use {
    alloy_primitives::{Address, U256},
    model::Asset,
};

/// Reason a call reverted. A revert undoes every state change of the call
/// and of all calls it made.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Revert {
    #[error("a module execution failed")]
    UnsuccessfulExecution,
    #[error("a fill failed and the batch must not be incomplete")]
    UnsuccessfulFill,
    #[error("{0} is not a registered module")]
    UnknownModule(Address),
    #[error("amount {amount} is below the threshold {threshold}")]
    AmountCheckFailed { amount: U256, threshold: U256 },
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("caller is not authorized")]
    Unauthorized,
    #[error("sender does not own the token")]
    NotOwner,
    #[error("invalid calldata")]
    InvalidCalldata,
    #[error("{holder} kept {amount} of {asset:?}")]
    ResidualBalance {
        holder: Address,
        asset: Asset,
        amount: U256,
    },
    #[error("{0}")]
    Custom(String),
}

impl Revert {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

impl From<alloy_sol_types::Error> for Revert {
    fn from(_: alloy_sol_types::Error) -> Self {
        Self::InvalidCalldata
    }
}
