//! Read access to chain state for fillability preflights.

use {
    crate::Unfillable,
    alloy_primitives::{Address, Bytes, U256},
    alloy_sol_types::SolCall,
    model::{
        ContractKind,
        abi::{IERC20, IERC721, IERC1155},
    },
};

/// Read-only view of a chain at a given block.
pub trait ChainState {
    fn chain_id(&self) -> u64;

    /// Timestamp of the block the state belongs to.
    fn timestamp(&self) -> u64;

    /// Native balance of an account.
    fn balance(&self, account: Address) -> U256;

    /// Executes a static call and returns its raw return data.
    fn static_call(&self, to: Address, data: &[u8]) -> Result<Bytes, String>;
}

/// Executes a typed static call.
pub fn view<C: SolCall>(
    state: &dyn ChainState,
    to: Address,
    call: C,
) -> Result<C::Return, Unfillable> {
    let output = state
        .static_call(to, &call.abi_encode())
        .map_err(Unfillable::State)?;
    C::abi_decode_returns(&output).map_err(|err| Unfillable::State(err.to_string()))
}

/// Checks that `owner` holds at least `amount` of the token.
pub fn owns(
    state: &dyn ChainState,
    kind: ContractKind,
    contract: Address,
    owner: Address,
    id: U256,
    amount: U256,
) -> Result<(), Unfillable> {
    let owned = match kind {
        ContractKind::Erc721 => {
            view(state, contract, IERC721::ownerOfCall { tokenId: id })? == owner
        }
        ContractKind::Erc1155 => {
            view(state, contract, IERC1155::balanceOfCall { owner, id })? >= amount
        }
    };
    owned.then_some(()).ok_or(Unfillable::NotOwner)
}

/// Checks that `operator` may move any of `owner`'s tokens of `contract`.
pub fn approved(
    state: &dyn ChainState,
    kind: ContractKind,
    contract: Address,
    owner: Address,
    operator: Address,
) -> Result<(), Unfillable> {
    let approved = match kind {
        ContractKind::Erc721 => view(
            state,
            contract,
            IERC721::isApprovedForAllCall { owner, operator },
        )?,
        ContractKind::Erc1155 => view(
            state,
            contract,
            IERC1155::isApprovedForAllCall { owner, operator },
        )?,
    };
    approved
        .then_some(())
        .ok_or(Unfillable::MissingApproval(operator))
}

/// Checks that a bidder holds and approved `amount` of an ERC20 token.
pub fn funded(
    state: &dyn ChainState,
    token: Address,
    owner: Address,
    spender: Address,
    amount: U256,
) -> Result<(), Unfillable> {
    if view(state, token, IERC20::balanceOfCall { owner })? < amount {
        return Err(Unfillable::InsufficientBalance);
    }
    if view(state, token, IERC20::allowanceCall { owner, spender })? < amount {
        return Err(Unfillable::InsufficientAllowance(spender));
    }
    Ok(())
}

/// Checks the maker's side of an NFT-for-payment order: the seller's token
/// and approval for listings, the bidder's funds and allowance for bids.
pub fn maker_side(
    state: &dyn ChainState,
    info: &crate::Info,
    token_id: U256,
    operator: Address,
    spender: Address,
) -> Result<(), Unfillable> {
    match info.side {
        model::Side::Sell => {
            owns(
                state,
                info.contract_kind,
                info.contract,
                info.maker,
                token_id,
                info.amount,
            )?;
            approved(
                state,
                info.contract_kind,
                info.contract,
                info.maker,
                operator,
            )
        }
        model::Side::Buy => funded(state, info.payment_token, info.maker, spender, info.price),
    }
}
