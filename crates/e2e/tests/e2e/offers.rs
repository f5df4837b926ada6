use {
    alloy_primitives::{Address, U256},
    e2e::setup::*,
    model::{ContractKind, ProtocolKind, execution::FillPolicy},
    number::units::EthUnit,
    planner::FillDetails,
    protocols::{BuildParams, Target},
};

const REFERRER: Address = Address::repeat_byte(0xfa);

/// A WETH bid for token `id` on ZeroEx.
fn bid(world: &mut World, bidder: &TestAccount, id: u64, price: U256) -> FillDetails {
    let exchange = world.operator(ProtocolKind::ZeroExV4).unwrap();
    world.wrap(bidder, price, exchange).unwrap();
    let params = BuildParams::bid(
        bidder.address(),
        ContractKind::Erc721,
        ERC721,
        Target::Token(U256::from(id)),
        world.weth(),
        price,
    )
    .with_times(LISTING_TIME, None);
    world.sign(ProtocolKind::ZeroExV4, bidder, params).unwrap()
}

#[test]
fn single_offer() {
    run_test(sells_into_a_bid);
}

fn sells_into_a_bid(mut world: World) {
    let [bidder, taker] = world.make_accounts(10u64.eth()).unwrap();
    let offer = bid(&mut world, &bidder, 7, 1u64.eth());
    offer
        .order
        .check_fillability(&world.chain, world.protocols())
        .unwrap();

    world.mint(&taker, ContractKind::Erc721, 7, 1);
    let proxy = world.config.planner.approval_proxy;
    world
        .approve_nfts(&taker, ContractKind::Erc721, proxy)
        .unwrap();

    let policy = FillPolicy::new(taker.address()).with_referrer(REFERRER, 100);
    let plan = world
        .planner
        .plan_offers(&[offer], taker.address(), &policy)
        .unwrap();
    assert_eq!(plan.transfers.len(), 1);
    let tx = world.planner.transaction(&plan);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(7), Some(bidder.address()));
    assert_eq!(world.weth_balance(taker.address()), 0.99.eth());
    assert_eq!(world.weth_balance(REFERRER), 0.01.eth());
    assert_eq!(world.weth_balance(bidder.address()), U256::ZERO);
    world.assert_drained();
}

#[test]
fn listing_into_offer() {
    run_test(flips_a_listing_into_a_bid);
}

fn flips_a_listing_into_a_bid(mut world: World) {
    let [seller, bidder, taker] = world.make_accounts(10u64.eth()).unwrap();
    let listing = world
        .list(ProtocolKind::Seaport, &seller, 9, 1u64.eth(), vec![])
        .unwrap();
    let offer = bid(&mut world, &bidder, 9, 1.2.eth());

    let plan = world
        .planner
        .plan_listing_into_offer(
            &listing,
            &offer,
            taker.address(),
            &FillPolicy::new(taker.address()),
        )
        .unwrap();
    assert_eq!(plan.executions.len(), 2);
    assert!(plan.transfers.is_empty());
    let tx = world.planner.transaction(&plan);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(9), Some(bidder.address()));
    assert_eq!(world.balance(taker.address()), 9u64.eth());
    assert_eq!(world.weth_balance(taker.address()), 1.2.eth());
    assert_eq!(world.balance(seller.address()), 11u64.eth());
    world.assert_drained();
}
