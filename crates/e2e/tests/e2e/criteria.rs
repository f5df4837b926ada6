use {
    alloy_primitives::U256,
    e2e::setup::*,
    model::{ContractKind, ProtocolKind, execution::FillPolicy},
    number::units::EthUnit,
    planner::FillDetails,
    protocols::{BuildParams, MatchParams, Target, zeroex},
    router::Revert,
};

const IDS: [u64; 12] = [0, 1, 2, 100, 101, 102, 675, 373, 748, 253, 827, 576];

fn bit_vector_bid(world: &mut World, bidder: &TestAccount) -> FillDetails {
    let exchange = world.operator(ProtocolKind::ZeroExV4).unwrap();
    world.wrap(bidder, 1u64.eth(), exchange).unwrap();
    let params = BuildParams::bid(
        bidder.address(),
        ContractKind::Erc721,
        ERC721,
        Target::BitVector(IDS.into_iter().map(U256::from).collect()),
        world.weth(),
        1u64.eth(),
    )
    .with_times(LISTING_TIME, None);
    world.sign(ProtocolKind::ZeroExV4, bidder, params).unwrap()
}

#[test]
fn bit_vector_bid_in_list() {
    run_test(fills_tokens_in_the_bit_vector);
}

fn fills_tokens_in_the_bit_vector(mut world: World) {
    let [bidder, taker] = world.make_accounts(10u64.eth()).unwrap();
    let offer = bit_vector_bid(&mut world, &bidder).with_token_id(U256::from(827));
    world.mint(&taker, ContractKind::Erc721, 827, 1);
    let proxy = world.config.planner.approval_proxy;
    world
        .approve_nfts(&taker, ContractKind::Erc721, proxy)
        .unwrap();

    let plan = world
        .planner
        .plan_offers(&[offer], taker.address(), &FillPolicy::new(taker.address()))
        .unwrap();
    let tx = world.planner.transaction(&plan);
    world.send(&taker, &tx).unwrap();

    assert_eq!(world.owner_of(827), Some(bidder.address()));
    assert_eq!(world.weth_balance(taker.address()), 1u64.eth());
    world.assert_drained();
}

#[test]
fn bit_vector_bid_not_in_list() {
    run_test(rejects_tokens_outside_the_bit_vector);
}

fn rejects_tokens_outside_the_bit_vector(mut world: World) {
    let [bidder, taker] = world.make_accounts(10u64.eth()).unwrap();
    let offer = bit_vector_bid(&mut world, &bidder).with_token_id(U256::from(103));
    world.mint(&taker, ContractKind::Erc721, 103, 1);

    let planned = world.planner.plan_offers(
        std::slice::from_ref(&offer),
        taker.address(),
        &FillPolicy::new(taker.address()),
    );
    assert!(matches!(
        planned,
        Err(planner::Error::Adapter(protocols::Error::InvalidParams(_)))
    ));

    tracing::info!("Selling directly into the exchange.");
    let exchange = world.operator(ProtocolKind::ZeroExV4).unwrap();
    world
        .approve_nfts(&taker, ContractKind::Erc721, exchange)
        .unwrap();
    let matching = MatchParams::ZeroExV4(zeroex::Matching {
        token_id: U256::from(103),
        amount: U256::from(1),
        recipient: taker.address(),
        value: U256::ZERO,
    });
    let call = offer
        .order
        .fill_with(&matching, world.protocols())
        .unwrap();
    let result = world
        .chain
        .call(taker.address(), call.to, call.value, &call.data);
    assert!(matches!(result, Err(Revert::Custom(reason)) if reason.contains("bit vector")));

    assert_eq!(world.owner_of(103), Some(taker.address()));
    assert_eq!(world.weth_balance(bidder.address()), 1u64.eth());
}
