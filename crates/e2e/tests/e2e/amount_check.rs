use {
    alloy_primitives::U256,
    e2e::setup::*,
    model::{ContractKind, ProtocolKind, execution::FillPolicy},
    number::units::EthUnit,
    planner::FillDetails,
    protocols::BuildParams,
    router::Revert,
};

/// A Seaport listing of token `id` priced at one WETH.
fn weth_listing(world: &mut World, seller: &TestAccount, id: u64) -> FillDetails {
    world.mint(seller, ContractKind::Erc721, id, 1);
    let operator = world.operator(ProtocolKind::Seaport).unwrap();
    world
        .approve_nfts(seller, ContractKind::Erc721, operator)
        .unwrap();
    let params = BuildParams::listing(
        seller.address(),
        ContractKind::Erc721,
        ERC721,
        U256::from(id),
        1u64.eth(),
    )
    .with_payment_token(world.weth())
    .with_times(LISTING_TIME, None);
    world.sign(ProtocolKind::Seaport, seller, params).unwrap()
}

#[test]
fn amount_checked_batch() {
    run_test(stops_once_enough_tokens_are_bought);
}

fn stops_once_enough_tokens_are_bought(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let listings = (1..=5)
        .map(|id| world.list(ProtocolKind::Seaport, &seller, id, 1u64.eth(), vec![]))
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    world.cancel(&seller, &listings[0]).unwrap();
    world.cancel(&seller, &listings[2]).unwrap();

    let plan = world
        .planner
        .plan_amount_checked(
            &listings,
            taker.address(),
            &FillPolicy::new(taker.address()),
            U256::from(2),
        )
        .unwrap();
    assert_eq!(plan.executions.len(), 5);
    assert_eq!(plan.value, 5u64.eth());
    let tx = world.planner.transaction(&plan);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(2), Some(taker.address()));
    assert_eq!(world.owner_of(4), Some(taker.address()));
    for id in [1, 3, 5] {
        assert_eq!(world.owner_of(id), Some(seller.address()));
    }
    assert_eq!(world.balance(taker.address()), 8u64.eth());
    assert_eq!(world.balance(seller.address()), 12u64.eth());
    world.assert_drained();
}

#[test]
fn amount_checked_batch_below_threshold() {
    run_test(reverts_when_the_threshold_is_not_met);
}

fn reverts_when_the_threshold_is_not_met(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let listings = (1..=3)
        .map(|id| world.list(ProtocolKind::Seaport, &seller, id, 1u64.eth(), vec![]))
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    world.cancel(&seller, &listings[0]).unwrap();
    world.cancel(&seller, &listings[1]).unwrap();

    let plan = world
        .planner
        .plan_amount_checked(
            &listings,
            taker.address(),
            &FillPolicy::new(taker.address()),
            U256::from(2),
        )
        .unwrap();
    let tx = world.planner.transaction(&plan);
    assert_eq!(
        world.send(&taker, &tx),
        Err(Revert::AmountCheckFailed {
            amount: U256::from(1),
            threshold: U256::from(2),
        })
    );

    for id in 1..=3 {
        assert_eq!(world.owner_of(id), Some(seller.address()));
    }
    assert_eq!(world.balance(taker.address()), 10u64.eth());
    world.assert_drained();
}

#[test]
fn amount_checked_erc20_batch() {
    run_test(pays_each_erc20_listing_separately);
}

fn pays_each_erc20_listing_separately(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let proxy = world.config.planner.approval_proxy;
    world.wrap(&taker, 3.5.eth(), proxy).unwrap();
    let listings = (1..=3)
        .map(|id| weth_listing(&mut world, &seller, id))
        .collect::<Vec<_>>();

    let plan = world
        .planner
        .plan_amount_checked(
            &listings,
            taker.address(),
            &FillPolicy::new(taker.address()),
            U256::from(2),
        )
        .unwrap();
    assert_eq!(plan.transfers.len(), 3);
    let tx = world.planner.transaction(&plan);
    assert_eq!(tx.to, proxy);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(1), Some(taker.address()));
    assert_eq!(world.owner_of(2), Some(taker.address()));
    assert_eq!(world.owner_of(3), Some(seller.address()));
    assert_eq!(world.weth_balance(seller.address()), 2u64.eth());
    assert_eq!(world.weth_balance(taker.address()), 1.5.eth());
    world.assert_drained();
}

#[test]
fn amount_checked_erc20_batch_reaching_threshold_on_last_listing() {
    run_test(buys_every_erc20_listing_when_needed);
}

fn buys_every_erc20_listing_when_needed(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let proxy = world.config.planner.approval_proxy;
    world.wrap(&taker, 3u64.eth(), proxy).unwrap();
    let listings = (1..=2)
        .map(|id| weth_listing(&mut world, &seller, id))
        .collect::<Vec<_>>();

    let plan = world
        .planner
        .plan_amount_checked(
            &listings,
            taker.address(),
            &FillPolicy::new(taker.address()),
            U256::from(2),
        )
        .unwrap();
    let tx = world.planner.transaction(&plan);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(1), Some(taker.address()));
    assert_eq!(world.owner_of(2), Some(taker.address()));
    assert_eq!(world.weth_balance(seller.address()), 2u64.eth());
    assert_eq!(world.weth_balance(taker.address()), 1u64.eth());
    world.assert_drained();
}
