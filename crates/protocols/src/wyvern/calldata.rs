//! Transfers through the Wyvern merkle validator.
//!
//! A Wyvern order does not describe the asset it trades, it carries the raw
//! call the maker's proxy executes. Counterparties fill in their part of
//! that call through the order's replacement pattern, a byte mask over the
//! calldata.

use {
    crate::Error,
    alloy_primitives::{Address, B256, Bytes, U256},
    alloy_sol_types::{SolCall, sol},
    model::ContractKind,
};

sol! {
    interface IMerkleValidator {
        function matchERC721UsingCriteria(
            address from,
            address to,
            address token,
            uint256 tokenId,
            bytes32 root,
            bytes32[] proof
        ) external returns (bool);
        function matchERC1155UsingCriteria(
            address from,
            address to,
            address token,
            uint256 tokenId,
            uint256 amount,
            bytes32 root,
            bytes32[] proof
        ) external returns (bool);
    }
}

const SELECTOR_LEN: usize = 4;
const WORD: usize = 32;

/// Parts of the transfer a counterparty may replace.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Field {
    From,
    To,
    TokenId,
    Proof,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Transfer {
    pub contract_kind: ContractKind,
    pub from: Address,
    pub to: Address,
    pub token: Address,
    pub token_id: U256,
    pub amount: U256,
    /// Zero for transfers of a fixed token.
    pub root: B256,
    pub proof: Vec<B256>,
}

impl Transfer {
    pub fn encode(&self) -> Bytes {
        match self.contract_kind {
            ContractKind::Erc721 => IMerkleValidator::matchERC721UsingCriteriaCall {
                from: self.from,
                to: self.to,
                token: self.token,
                tokenId: self.token_id,
                root: self.root,
                proof: self.proof.clone(),
            }
            .abi_encode(),
            ContractKind::Erc1155 => IMerkleValidator::matchERC1155UsingCriteriaCall {
                from: self.from,
                to: self.to,
                token: self.token,
                tokenId: self.token_id,
                amount: self.amount,
                root: self.root,
                proof: self.proof.clone(),
            }
            .abi_encode(),
        }
        .into()
    }

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let invalid = |err: alloy_sol_types::Error| {
            Error::InvalidOrder(format!("unsupported wyvern calldata: {err}"))
        };
        let selector = data.get(..SELECTOR_LEN).unwrap_or_default();
        if selector == IMerkleValidator::matchERC721UsingCriteriaCall::SELECTOR {
            let call =
                IMerkleValidator::matchERC721UsingCriteriaCall::abi_decode(data).map_err(invalid)?;
            Ok(Self {
                contract_kind: ContractKind::Erc721,
                from: call.from,
                to: call.to,
                token: call.token,
                token_id: call.tokenId,
                amount: U256::from(1),
                root: call.root,
                proof: call.proof,
            })
        } else {
            let call = IMerkleValidator::matchERC1155UsingCriteriaCall::abi_decode(data)
                .map_err(invalid)?;
            Ok(Self {
                contract_kind: ContractKind::Erc1155,
                from: call.from,
                to: call.to,
                token: call.token,
                token_id: call.tokenId,
                amount: call.amount,
                root: call.root,
                proof: call.proof,
            })
        }
    }
}

/// Word index of a field in the calldata, after the selector.
fn word(kind: ContractKind, field: Field) -> usize {
    match (field, kind) {
        (Field::From, _) => 0,
        (Field::To, _) => 1,
        (Field::TokenId, _) => 3,
        // Proof elements follow the root, the array offset and its length.
        (Field::Proof, ContractKind::Erc721) => 7,
        (Field::Proof, ContractKind::Erc1155) => 8,
    }
}

/// Replacement pattern over `calldata` covering the given fields.
pub fn mask(kind: ContractKind, calldata: &[u8], fields: &[Field]) -> Bytes {
    let mut mask = vec![0u8; calldata.len()];
    for field in fields {
        let start = SELECTOR_LEN + word(kind, *field) * WORD;
        let end = match field {
            Field::Proof => mask.len(),
            _ => start + WORD,
        };
        if let Some(bytes) = mask.get_mut(start..end) {
            bytes.fill(0xff);
        }
    }
    mask.into()
}

/// Whether the pattern lets a counterparty replace `field`.
pub fn is_replaceable(kind: ContractKind, pattern: &[u8], field: Field) -> bool {
    let start = SELECTOR_LEN + word(kind, field) * WORD;
    pattern.get(start).is_some_and(|byte| *byte == 0xff)
}

/// Replaces the bits of `array` selected by `mask` with the ones of
/// `desired`, the way the exchange merges both sides' calldata.
pub fn guarded_array_replace(array: &[u8], desired: &[u8], mask: &[u8]) -> Result<Bytes, Error> {
    if array.len() != desired.len() || array.len() != mask.len() {
        return Err(Error::InvalidOrder(
            "calldata and replacement pattern lengths differ".to_string(),
        ));
    }
    Ok(array
        .iter()
        .zip(desired)
        .zip(mask)
        .map(|((array, desired), mask)| (array & !mask) | (desired & mask))
        .collect())
}
