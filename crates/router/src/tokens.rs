//! Token contracts backed by the ledger.
//!
//! Safe transfers do not call receiver hooks, so contracts can always
//! receive NFTs.

use {
    crate::{Chain, Contract, Env, Revert},
    alloy_primitives::{Address, Bytes, U256},
    alloy_sol_types::{SolCall, SolInterface},
    model::{
        Asset,
        ContractKind,
        abi::{IERC20, IERC721, IERC1155, IWETH},
    },
};

#[derive(Clone, Copy, Debug, Default)]
pub struct Erc20;

impl Erc20 {
    fn spend_allowance(
        env: &mut Env<'_>,
        owner: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        if owner == env.caller {
            return Ok(());
        }
        let (token, spender) = (env.this, env.caller);
        let allowance = env.ledger().allowance(token, owner, spender);
        if allowance == U256::MAX {
            return Ok(());
        }
        let remaining = allowance
            .checked_sub(amount)
            .ok_or(Revert::custom("insufficient allowance"))?;
        env.ledger().set_allowance(token, owner, spender, remaining);
        Ok(())
    }

    fn read(chain: &Chain, this: Address, call: &IERC20::IERC20Calls) -> Option<Bytes> {
        let ledger = chain.ledger();
        let output = match call {
            IERC20::IERC20Calls::balanceOf(call) => IERC20::balanceOfCall::abi_encode_returns(
                &ledger.erc20_balance(this, call.owner),
            ),
            IERC20::IERC20Calls::allowance(call) => IERC20::allowanceCall::abi_encode_returns(
                &ledger.allowance(this, call.owner, call.spender),
            ),
            _ => return None,
        };
        Some(output.into())
    }
}

impl Contract for Erc20 {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        let call = IERC20::IERC20Calls::abi_decode(input)?;
        if let Some(output) = Self::read(env.chain, env.this, &call) {
            return Ok(output);
        }
        let token = env.this;
        match call {
            IERC20::IERC20Calls::transfer(call) => {
                let from = env.caller;
                env.ledger()
                    .transfer_erc20(token, from, call.to, call.amount)?;
            }
            IERC20::IERC20Calls::transferFrom(call) => {
                Self::spend_allowance(env, call.from, call.amount)?;
                env.ledger()
                    .transfer_erc20(token, call.from, call.to, call.amount)?;
            }
            IERC20::IERC20Calls::approve(call) => {
                let owner = env.caller;
                env.ledger()
                    .set_allowance(token, owner, call.spender, call.amount);
            }
            _ => return Err(Revert::InvalidCalldata),
        }
        Ok(IERC20::transferCall::abi_encode_returns(&true).into())
    }

    fn view(&self, chain: &Chain, this: Address, input: &[u8]) -> Result<Bytes, Revert> {
        let call = IERC20::IERC20Calls::abi_decode(input)?;
        Self::read(chain, this, &call).ok_or(Revert::InvalidCalldata)
    }
}

/// Wrapped native currency.
#[derive(Clone, Copy, Debug, Default)]
pub struct Weth;

impl Weth {
    fn deposit(env: &mut Env<'_>) {
        let (token, owner, value) = (env.this, env.caller, env.value);
        env.ledger().mint_erc20(token, owner, value);
    }
}

impl Contract for Weth {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        match IWETH::IWETHCalls::abi_decode(input) {
            Ok(IWETH::IWETHCalls::deposit(_)) => {
                Self::deposit(env);
                Ok(Bytes::new())
            }
            Ok(IWETH::IWETHCalls::withdraw(call)) => {
                let (token, owner) = (env.this, env.caller);
                env.ledger().burn_erc20(token, owner, call.amount)?;
                env.send(owner, call.amount)?;
                Ok(Bytes::new())
            }
            Err(_) => Erc20.call(env, input),
        }
    }

    fn receive(&self, env: &mut Env<'_>) -> Result<(), Revert> {
        Self::deposit(env);
        Ok(())
    }

    fn view(&self, chain: &Chain, this: Address, input: &[u8]) -> Result<Bytes, Revert> {
        Erc20.view(chain, this, input)
    }
}

fn authorized(env: &Env<'_>, owner: Address) -> Result<(), Revert> {
    let operator = env.caller;
    if operator == owner || env.chain.ledger().is_operator(env.this, owner, operator) {
        Ok(())
    } else {
        Err(Revert::Unauthorized)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Erc721;

impl Contract for Erc721 {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        let contract = env.this;
        match IERC721::IERC721Calls::abi_decode(input)? {
            IERC721::IERC721Calls::transferFrom(IERC721::transferFromCall {
                from,
                to,
                tokenId,
            })
            | IERC721::IERC721Calls::safeTransferFrom(IERC721::safeTransferFromCall {
                from,
                to,
                tokenId,
            }) => {
                authorized(env, from)?;
                env.ledger().transfer_erc721(contract, from, to, tokenId)?;
            }
            IERC721::IERC721Calls::setApprovalForAll(call) => {
                let owner = env.caller;
                env.ledger()
                    .set_operator(contract, owner, call.operator, call.approved);
            }
            _ => return self.view(env.chain, contract, input),
        }
        Ok(Bytes::new())
    }

    fn view(&self, chain: &Chain, this: Address, input: &[u8]) -> Result<Bytes, Revert> {
        let ledger = chain.ledger();
        let output = match IERC721::IERC721Calls::abi_decode(input)? {
            IERC721::IERC721Calls::ownerOf(call) => {
                let owner = ledger
                    .erc721_owner(this, call.tokenId)
                    .ok_or(Revert::custom("nonexistent token"))?;
                IERC721::ownerOfCall::abi_encode_returns(&owner)
            }
            IERC721::IERC721Calls::balanceOf(call) => IERC721::balanceOfCall::abi_encode_returns(
                &ledger.erc721_balance(this, call.owner),
            ),
            IERC721::IERC721Calls::isApprovedForAll(call) => {
                IERC721::isApprovedForAllCall::abi_encode_returns(&ledger.is_operator(
                    this,
                    call.owner,
                    call.operator,
                ))
            }
            _ => return Err(Revert::InvalidCalldata),
        };
        Ok(output.into())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Erc1155;

impl Contract for Erc1155 {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        let contract = env.this;
        match IERC1155::IERC1155Calls::abi_decode(input)? {
            IERC1155::IERC1155Calls::safeTransferFrom(call) => {
                authorized(env, call.from)?;
                env.ledger().transfer_erc1155(
                    contract,
                    call.from,
                    call.to,
                    call.id,
                    call.amount,
                )?;
            }
            IERC1155::IERC1155Calls::setApprovalForAll(call) => {
                let owner = env.caller;
                env.ledger()
                    .set_operator(contract, owner, call.operator, call.approved);
            }
            _ => return self.view(env.chain, contract, input),
        }
        Ok(Bytes::new())
    }

    fn view(&self, chain: &Chain, this: Address, input: &[u8]) -> Result<Bytes, Revert> {
        let ledger = chain.ledger();
        let output = match IERC1155::IERC1155Calls::abi_decode(input)? {
            IERC1155::IERC1155Calls::balanceOf(call) => IERC1155::balanceOfCall::abi_encode_returns(
                &ledger.erc1155_balance(this, call.id, call.owner),
            ),
            IERC1155::IERC1155Calls::isApprovedForAll(call) => {
                IERC1155::isApprovedForAllCall::abi_encode_returns(&ledger.is_operator(
                    this,
                    call.owner,
                    call.operator,
                ))
            }
            _ => return Err(Revert::InvalidCalldata),
        };
        Ok(output.into())
    }
}

/// Balance of the running contract in `asset`. NFT assets report the held
/// units of that token id.
pub(crate) fn balance_of(env: &Env<'_>, asset: Asset) -> Result<U256, Revert> {
    let owner = env.this;
    match asset {
        Asset::Native => Ok(env.balance()),
        Asset::Erc20 { token } => env.view(token, &IERC20::balanceOfCall { owner }),
        Asset::Erc721 { contract, id } => {
            let held = env
                .view(contract, &IERC721::ownerOfCall { tokenId: id })
                .is_ok_and(|current| current == owner);
            Ok(U256::from(held))
        }
        Asset::Erc1155 { contract, id } => {
            env.view(contract, &IERC1155::balanceOfCall { owner, id })
        }
    }
}

/// Sends `amount` of `asset` from the running contract to `to`.
pub(crate) fn send(
    env: &mut Env<'_>,
    asset: Asset,
    to: Address,
    amount: U256,
) -> Result<(), Revert> {
    if amount.is_zero() {
        return Ok(());
    }
    let from = env.this;
    match asset {
        Asset::Native => env.send(to, amount),
        Asset::Erc20 { token } => env
            .call_sol(token, U256::ZERO, &IERC20::transferCall { to, amount })
            .map(|_| ()),
        Asset::Erc721 { contract, id } => env
            .call_sol(
                contract,
                U256::ZERO,
                &IERC721::safeTransferFromCall {
                    from,
                    to,
                    tokenId: id,
                },
            )
            .map(|_| ()),
        Asset::Erc1155 { contract, id } => env
            .call_sol(
                contract,
                U256::ZERO,
                &IERC1155::safeTransferFromCall {
                    from,
                    to,
                    id,
                    amount,
                    data: Bytes::new(),
                },
            )
            .map(|_| ()),
    }
}

/// Sends everything the running contract holds of `asset` to `to`.
pub(crate) fn sweep(env: &mut Env<'_>, asset: Asset, to: Address) -> Result<U256, Revert> {
    let amount = balance_of(env, asset)?;
    send(env, asset, to, amount)?;
    Ok(amount)
}

/// Approves `operator` for all tokens of an NFT contract.
pub(crate) fn approve_nft(
    env: &mut Env<'_>,
    kind: ContractKind,
    contract: Address,
    operator: Address,
) -> Result<(), Revert> {
    match kind {
        ContractKind::Erc721 => env
            .call_sol(
                contract,
                U256::ZERO,
                &IERC721::setApprovalForAllCall {
                    operator,
                    approved: true,
                },
            )
            .map(|_| ()),
        ContractKind::Erc1155 => env
            .call_sol(
                contract,
                U256::ZERO,
                &IERC1155::setApprovalForAllCall {
                    operator,
                    approved: true,
                },
            )
            .map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(1);
    const BOB: Address = Address::repeat_byte(2);

    #[test]
    fn erc20_allowances() {
        let token = Address::repeat_byte(0x20);
        let mut chain = Chain::new(1, 0);
        chain.deploy(token, Erc20);
        chain.ledger_mut().mint_erc20(token, ALICE, U256::from(100));

        let pull = IERC20::transferFromCall {
            from: ALICE,
            to: BOB,
            amount: U256::from(60),
        };
        assert!(chain.transact(BOB, token, U256::ZERO, &pull).is_err());
        chain
            .transact(
                ALICE,
                token,
                U256::ZERO,
                &IERC20::approveCall {
                    spender: BOB,
                    amount: U256::from(100),
                },
            )
            .unwrap();
        assert!(chain.transact(BOB, token, U256::ZERO, &pull).unwrap());
        assert_eq!(
            chain
                .view_call(
                    token,
                    &IERC20::allowanceCall {
                        owner: ALICE,
                        spender: BOB
                    }
                )
                .unwrap(),
            U256::from(40)
        );
        assert_eq!(
            chain
                .view_call(token, &IERC20::balanceOfCall { owner: BOB })
                .unwrap(),
            U256::from(60)
        );
    }

    #[test]
    fn weth_wraps_and_unwraps() {
        let weth = Address::repeat_byte(0x77);
        let mut chain = Chain::new(1, 0);
        chain.deploy(weth, Weth);
        chain.ledger_mut().mint_native(ALICE, U256::from(10));

        chain.call(ALICE, weth, U256::from(4), &[]).unwrap();
        chain
            .transact(ALICE, weth, U256::from(6), &IWETH::depositCall {})
            .unwrap();
        assert_eq!(chain.ledger().erc20_balance(weth, ALICE), U256::from(10));

        chain
            .transact(
                ALICE,
                weth,
                U256::ZERO,
                &IWETH::withdrawCall {
                    amount: U256::from(3),
                },
            )
            .unwrap();
        assert_eq!(chain.ledger().native_balance(ALICE), U256::from(3));
        assert_eq!(chain.ledger().native_balance(weth), U256::from(7));
    }

    #[test]
    fn nft_operators() {
        let nft = Address::repeat_byte(0x72);
        let mut chain = Chain::new(1, 0);
        chain.deploy(nft, Erc721);
        chain.ledger_mut().mint_erc721(nft, ALICE, U256::from(1));

        let transfer = IERC721::safeTransferFromCall {
            from: ALICE,
            to: BOB,
            tokenId: U256::from(1),
        };
        assert_eq!(
            chain
                .transact(BOB, nft, U256::ZERO, &transfer)
                .map(|_| ()),
            Err(Revert::Unauthorized)
        );
        chain
            .transact(
                ALICE,
                nft,
                U256::ZERO,
                &IERC721::setApprovalForAllCall {
                    operator: BOB,
                    approved: true,
                },
            )
            .unwrap();
        chain.transact(BOB, nft, U256::ZERO, &transfer).unwrap();
        assert_eq!(
            chain
                .view_call(
                    nft,
                    &IERC721::ownerOfCall {
                        tokenId: U256::from(1)
                    }
                )
                .unwrap(),
            BOB
        );
    }

    #[test]
    fn erc1155_balances() {
        let nft = Address::repeat_byte(0x11);
        let mut chain = Chain::new(1, 0);
        chain.deploy(nft, Erc1155);
        chain
            .ledger_mut()
            .mint_erc1155(nft, ALICE, U256::from(7), U256::from(5));

        chain
            .transact(
                ALICE,
                nft,
                U256::ZERO,
                &IERC1155::safeTransferFromCall {
                    from: ALICE,
                    to: BOB,
                    id: U256::from(7),
                    amount: U256::from(2),
                    data: Bytes::new(),
                },
            )
            .unwrap();
        assert_eq!(
            chain
                .view_call(
                    nft,
                    &IERC1155::balanceOfCall {
                        owner: BOB,
                        id: U256::from(7)
                    }
                )
                .unwrap(),
            U256::from(2)
        );
    }
}
