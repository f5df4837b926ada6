use {
    alloy_primitives::{Address, U256},
    model::ProtocolKind,
};

/// Errors raised while building, signing or filling orders.
///
/// Adapters are pure functions over their inputs, so none of these leave any
/// state behind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("signature mismatch: expected {expected}, recovered {recovered:?}")]
    SignatureMismatch {
        expected: Address,
        recovered: Option<Address>,
    },
    #[error("order is not signed")]
    MissingSignature,
    #[error("order is unfillable: {0}")]
    Unfillable(#[from] Unfillable),
    #[error("requested {requested} but only {remaining} remain fillable")]
    PartialFillShortfall { requested: U256, remaining: U256 },
    #[error("{kind} does not support {operation}")]
    Unsupported {
        kind: ProtocolKind,
        operation: &'static str,
    },
    #[error("no {0} deployment configured")]
    NotDeployed(ProtocolKind),
    #[error(transparent)]
    Fee(#[from] fee::Error),
    #[error(transparent)]
    Signing(#[from] model::signature::Error),
}

impl Error {
    pub(crate) fn params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }
}

impl From<model::signature::SignatureMismatch> for Error {
    fn from(err: model::signature::SignatureMismatch) -> Self {
        Self::SignatureMismatch {
            expected: err.expected,
            recovered: err.recovered,
        }
    }
}

/// Verdict of an off-chain fillability preflight.
///
/// Advisory only: the exchange contract stays authoritative and callers may
/// still attempt the fill.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Unfillable {
    #[error("maker does not own the token")]
    NotOwner,
    #[error("token is not held in escrow by the exchange")]
    NotEscrowed,
    #[error("operator {0} is not approved")]
    MissingApproval(Address),
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("insufficient allowance for {0}")]
    InsufficientAllowance(Address),
    #[error("order expired")]
    Expired,
    #[error("order is not valid yet")]
    NotYetValid,
    #[error("order was cancelled")]
    Cancelled,
    #[error("order was already filled")]
    Filled,
    #[error("nonce or counter does not match the maker's on-chain value")]
    NonceMismatch,
    #[error("on-chain price differs from the order")]
    PriceMismatch,
    #[error("failed to read chain state: {0}")]
    State(String),
}
