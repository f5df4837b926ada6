use {
    alloy_primitives::{Address, U256},
    e2e::setup::*,
    model::{ProtocolKind, execution::FillPolicy},
    number::units::EthUnit,
    protocols::Unfillable,
    router::Revert,
};

const MARKETPLACE: Address = Address::repeat_byte(0xfe);
const REFERRER: Address = Address::repeat_byte(0xfa);

#[test]
fn single_listing() {
    run_test(referrer_and_marketplace_fees);
}

fn referrer_and_marketplace_fees(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let listing = world
        .list(
            ProtocolKind::Seaport,
            &seller,
            1,
            1u64.eth(),
            vec![fee::Fee::bps(MARKETPLACE, 250)],
        )
        .unwrap();
    listing
        .order
        .check_fillability(&world.chain, world.protocols())
        .unwrap();

    tracing::info!("Buying the listing with a referrer fee.");
    let policy = FillPolicy::new(taker.address()).with_referrer(REFERRER, 100);
    let plan = world
        .planner
        .plan_listings(std::slice::from_ref(&listing), taker.address(), &policy)
        .unwrap();
    assert_eq!(plan.value, 1.01.eth());
    let tx = world.planner.transaction(&plan);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(1), Some(taker.address()));
    assert_eq!(world.balance(seller.address()), 10.975.eth());
    assert_eq!(world.balance(MARKETPLACE), 0.025.eth());
    assert_eq!(world.balance(REFERRER), 0.01.eth());
    assert_eq!(world.balance(taker.address()), 8.99.eth());
    assert_eq!(
        listing
            .order
            .check_fillability(&world.chain, world.protocols()),
        Err(Unfillable::Filled)
    );
    world.assert_drained();
}

#[test]
fn batch_with_cancelled_listing() {
    run_test(skips_cancelled_listings);
}

fn skips_cancelled_listings(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let listings = (1..=3)
        .map(|id| world.list(ProtocolKind::Seaport, &seller, id, 1u64.eth(), vec![]))
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    world.cancel(&seller, &listings[1]).unwrap();

    let plan = world
        .planner
        .plan_listings(&listings, taker.address(), &FillPolicy::new(taker.address()))
        .unwrap();
    assert_eq!(plan.value, 3u64.eth());
    let tx = world.planner.transaction(&plan);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(1), Some(taker.address()));
    assert_eq!(world.owner_of(2), Some(seller.address()));
    assert_eq!(world.owner_of(3), Some(taker.address()));
    assert_eq!(world.balance(taker.address()), 8u64.eth());
    assert_eq!(world.balance(seller.address()), 12u64.eth());
    world.assert_drained();
}

#[test]
fn strict_batch_with_cancelled_listing() {
    run_test(reverts_incomplete_batches);
}

fn reverts_incomplete_batches(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let listings = (1..=3)
        .map(|id| world.list(ProtocolKind::Seaport, &seller, id, 1u64.eth(), vec![]))
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    world.cancel(&seller, &listings[1]).unwrap();

    let policy = FillPolicy::new(taker.address()).strict();
    let plan = world
        .planner
        .plan_listings(&listings, taker.address(), &policy)
        .unwrap();
    let tx = world.planner.transaction(&plan);
    assert_eq!(world.send(&taker, &tx), Err(Revert::UnsuccessfulExecution));

    for id in 1..=3 {
        assert_eq!(world.owner_of(id), Some(seller.address()));
    }
    assert_eq!(world.balance(taker.address()), 10u64.eth());
    assert_eq!(world.balance(seller.address()), 10u64.eth());
    world.assert_drained();
}

#[test]
fn erc20_listing() {
    run_test(pays_through_the_approval_proxy);
}

fn pays_through_the_approval_proxy(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let weth = world.weth();
    let proxy = world.config.planner.approval_proxy;
    world.wrap(&taker, 2u64.eth(), proxy).unwrap();

    world.mint(&seller, model::ContractKind::Erc721, 4, 1);
    let operator = world.operator(ProtocolKind::Seaport).unwrap();
    world
        .approve_nfts(&seller, model::ContractKind::Erc721, operator)
        .unwrap();
    let params = protocols::BuildParams::listing(
        seller.address(),
        model::ContractKind::Erc721,
        ERC721,
        U256::from(4),
        1.5.eth(),
    )
    .with_payment_token(weth)
    .with_times(LISTING_TIME, None);
    let listing = world.sign(ProtocolKind::Seaport, &seller, params).unwrap();

    let plan = world
        .planner
        .plan_listings(&[listing], taker.address(), &FillPolicy::new(taker.address()))
        .unwrap();
    assert_eq!(plan.value, U256::ZERO);
    let tx = world.planner.transaction(&plan);
    assert_eq!(tx.to, proxy);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(4), Some(taker.address()));
    assert_eq!(world.weth_balance(seller.address()), 1.5.eth());
    assert_eq!(world.weth_balance(taker.address()), 0.5.eth());
    world.assert_drained();
}
