use {
    crate::{Contract, Env, Revert, tokens::sweep},
    alloy_primitives::{Address, Bytes, U256},
    alloy_sol_types::SolInterface,
    indexmap::IndexSet,
    model::{
        Asset,
        abi::{
            self,
            AmountCheckInfo,
            ExecutionInfo,
            IApprovalProxy,
            IERC20,
            IERC721,
            IERC1155,
            IRouter,
        },
        execution::TransferKind,
    },
};

/// Pulls a taker's approved tokens into the modules that need them and runs
/// the router in the same transaction. Takers approve this contract once
/// instead of every module.
///
/// NFTs are moved into the modules up front. ERC20 tokens are held by the
/// proxy and the modules are approved to pull them, so a module only takes
/// the payment of the executions that actually run. Unused tokens go back
/// to the taker.
#[derive(Clone, Copy, Debug)]
pub struct ApprovalProxy {
    pub router: Address,
}

impl ApprovalProxy {
    fn transfer(&self, env: &mut Env<'_>, item: &abi::TransferItem) -> Result<(), Revert> {
        let kind = TransferKind::from_u8(item.itemKind).ok_or(Revert::InvalidCalldata)?;
        let from = env.caller;
        match kind {
            TransferKind::Erc20 => {
                let this = env.this;
                env.call_sol(
                    item.token,
                    U256::ZERO,
                    &IERC20::transferFromCall {
                        from,
                        to: this,
                        amount: item.amount,
                    },
                )?;
                let allowance = env.view(
                    item.token,
                    &IERC20::allowanceCall {
                        owner: this,
                        spender: item.recipient,
                    },
                )?;
                let amount = allowance
                    .checked_add(item.amount)
                    .ok_or(Revert::custom("allowance overflows"))?;
                env.call_sol(
                    item.token,
                    U256::ZERO,
                    &IERC20::approveCall {
                        spender: item.recipient,
                        amount,
                    },
                )?;
            }
            TransferKind::Erc721 => {
                env.call_sol(
                    item.token,
                    U256::ZERO,
                    &IERC721::safeTransferFromCall {
                        from,
                        to: item.recipient,
                        tokenId: item.identifier,
                    },
                )?;
            }
            TransferKind::Erc1155 => {
                env.call_sol(
                    item.token,
                    U256::ZERO,
                    &IERC1155::safeTransferFromCall {
                        from,
                        to: item.recipient,
                        id: item.identifier,
                        amount: item.amount,
                        data: Bytes::new(),
                    },
                )?;
            }
        }
        Ok(())
    }

    fn bulk_transfer_with_execute(
        &self,
        env: &mut Env<'_>,
        items: &[abi::TransferItem],
        executions: Vec<ExecutionInfo>,
        amount_check: Option<AmountCheckInfo>,
    ) -> Result<(), Revert> {
        for item in items {
            self.transfer(env, item)?;
        }
        tracing::debug!(items = items.len(), "moved taker items");

        let value = env.value;
        match amount_check {
            Some(check) => env
                .call_sol(
                    self.router,
                    value,
                    &IRouter::executeWithAmountCheckCall {
                        executionInfos: executions,
                        amountCheckInfo: check,
                    },
                )
                .map(|_| ()),
            None => env
                .call_sol(
                    self.router,
                    value,
                    &IRouter::executeCall {
                        executionInfos: executions,
                    },
                )
                .map(|_| ()),
        }?;

        let caller = env.caller;
        let erc20s = items
            .iter()
            .filter(|item| TransferKind::from_u8(item.itemKind) == Some(TransferKind::Erc20));
        for item in erc20s.clone() {
            env.call_sol(
                item.token,
                U256::ZERO,
                &IERC20::approveCall {
                    spender: item.recipient,
                    amount: U256::ZERO,
                },
            )?;
        }
        for token in erc20s.map(|item| item.token).collect::<IndexSet<_>>() {
            let refund = sweep(env, Asset::Erc20 { token }, caller)?;
            tracing::debug!(%token, %refund, "returned unused tokens");
        }

        let leftover = env.balance();
        env.send(caller, leftover)
    }
}

impl Contract for ApprovalProxy {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        match IApprovalProxy::IApprovalProxyCalls::abi_decode(input)? {
            IApprovalProxy::IApprovalProxyCalls::bulkTransferWithExecute(call) => {
                self.bulk_transfer_with_execute(env, &call.items, call.executionInfos, None)?
            }
            IApprovalProxy::IApprovalProxyCalls::bulkTransferWithExecuteAndAmountCheck(call) => self
                .bulk_transfer_with_execute(
                    env,
                    &call.items,
                    call.executionInfos,
                    Some(call.amountCheckInfo),
                )?,
        }
        Ok(Bytes::new())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{BIDDER, SELLER, TAKER, World},
        alloy_sol_types::SolCall,
        model::{
            abi::{IModule, ListingParams, OfferParams},
            execution::TransferItem,
        },
        number::units::EthUnit,
    };

    fn sell_into_bid(world: &mut World) -> IApprovalProxy::bulkTransferWithExecuteCall {
        let offer = world.bid(5, 1u64.eth());
        world
            .chain
            .ledger_mut()
            .mint_erc721(world.erc721, TAKER, U256::from(5));
        IApprovalProxy::bulkTransferWithExecuteCall {
            items: vec![
                TransferItem {
                    kind: TransferKind::Erc721,
                    token: world.erc721,
                    identifier: U256::from(5),
                    amount: U256::from(1),
                    recipient: world.module,
                }
                .into(),
            ],
            executionInfos: vec![ExecutionInfo {
                module: world.module,
                data: IModule::acceptOffersCall {
                    offers: vec![offer],
                    params: OfferParams {
                        fillTo: TAKER,
                        refundTo: TAKER,
                        revertIfIncomplete: true,
                    },
                    fees: vec![],
                }
                .abi_encode()
                .into(),
                value: U256::ZERO,
            }],
        }
    }

    #[test]
    fn moves_items_then_executes() {
        let mut world = World::new();
        let call = sell_into_bid(&mut world);
        world
            .chain
            .ledger_mut()
            .set_operator(world.erc721, TAKER, world.proxy, true);

        world
            .chain
            .transact(TAKER, world.proxy, U256::ZERO, &call)
            .unwrap();
        assert_eq!(world.owner(5), Some(BIDDER));
        assert_eq!(
            world.chain.ledger().erc20_balance(world.weth, TAKER),
            1u64.eth()
        );
    }

    #[test]
    fn requires_approval() {
        let mut world = World::new();
        let call = sell_into_bid(&mut world);
        assert_eq!(
            world
                .chain
                .transact(TAKER, world.proxy, U256::ZERO, &call)
                .map(|_| ()),
            Err(Revert::Unauthorized)
        );
        assert_eq!(world.owner(5), Some(TAKER));
    }

    #[test]
    fn modules_pull_erc20_payments_per_execution() {
        let mut world = World::new();
        for id in 1..=3 {
            world.list(id);
        }
        let ledger = world.chain.ledger_mut();
        ledger.mint_erc20(world.weth, TAKER, 3.5.eth());
        ledger.set_allowance(world.weth, TAKER, world.proxy, U256::MAX);

        let execution = |id: u64| ExecutionInfo {
            module: world.module,
            data: IModule::acceptListingsCall {
                listings: vec![world.weth_listing(id, 1u64.eth())],
                params: ListingParams {
                    fillTo: TAKER,
                    refundTo: TAKER,
                    revertIfIncomplete: false,
                    token: world.weth,
                    amount: 1u64.eth(),
                    payer: world.proxy,
                },
                fees: vec![],
            }
            .abi_encode()
            .into(),
            value: U256::ZERO,
        };
        let payment = TransferItem {
            kind: TransferKind::Erc20,
            token: world.weth,
            identifier: U256::ZERO,
            amount: 1u64.eth(),
            recipient: world.module,
        };
        let call = IApprovalProxy::bulkTransferWithExecuteAndAmountCheckCall {
            items: vec![payment.into(); 3],
            executionInfos: (1..=3).map(execution).collect(),
            amountCheckInfo: AmountCheckInfo {
                target: world.erc721,
                data: IERC721::balanceOfCall { owner: TAKER }.abi_encode().into(),
                threshold: U256::from(2),
            },
        };
        world
            .chain
            .transact(TAKER, world.proxy, U256::ZERO, &call)
            .unwrap();

        let ledger = world.chain.ledger();
        assert_eq!(world.owner(1), Some(TAKER));
        assert_eq!(world.owner(2), Some(TAKER));
        assert_eq!(world.owner(3), Some(SELLER));
        assert_eq!(ledger.erc20_balance(world.weth, SELLER), 2u64.eth());
        assert_eq!(ledger.erc20_balance(world.weth, TAKER), 1.5.eth());
        assert_eq!(ledger.allowance(world.weth, world.proxy, world.module), U256::ZERO);
        assert!(ledger.holdings(world.proxy).is_empty());
        assert!(ledger.holdings(world.module).is_empty());
    }
}
