use {
    alloy_primitives::{Address, U256},
    e2e::setup::*,
    model::{
        ContractKind,
        ProtocolKind,
        abi::{IERC721, ILegacyRouter},
    },
    number::units::EthUnit,
    protocols::{BuildParams, Taker, Target},
};

const REFERRER: Address = Address::repeat_byte(0xfa);

#[test]
fn legacy_listing_fill() {
    run_test(charges_the_referrer_over_the_paid_price);
}

fn charges_the_referrer_over_the_paid_price(mut world: World) {
    let [seller, taker] = world.make_accounts(10u64.eth()).unwrap();
    let legacy = world.legacy_router().unwrap();
    let listing = world
        .list(ProtocolKind::Seaport, &seller, 1, 1u64.eth(), vec![])
        .unwrap();
    let call = listing
        .order
        .fill(&Taker::new(legacy).at(TIMESTAMP), world.protocols())
        .unwrap();

    world
        .transact(
            &taker,
            legacy,
            1.5.eth(),
            &ILegacyRouter::singleERC721ListingFillCall {
                referrer: REFERRER,
                data: call.data,
                exchangeKind: exchange_kind::SEAPORT,
                collection: ERC721,
                tokenId: U256::from(1),
                receiver: taker.address(),
                feeBps: 100,
            },
        )
        .unwrap();

    assert_eq!(world.owner_of(1), Some(taker.address()));
    assert_eq!(world.balance(REFERRER), 0.01.eth());
    assert_eq!(world.balance(seller.address()), 11u64.eth());
    assert_eq!(world.balance(taker.address()), 8.99.eth());
    world.assert_drained();
}

#[test]
fn legacy_bid_fill() {
    run_test(unwraps_the_bid_proceeds);
}

fn unwraps_the_bid_proceeds(mut world: World) {
    let [bidder, taker] = world.make_accounts(10u64.eth()).unwrap();
    let legacy = world.legacy_router().unwrap();
    let exchange = world.operator(ProtocolKind::ZeroExV4).unwrap();
    world.wrap(&bidder, 2u64.eth(), exchange).unwrap();
    let params = BuildParams::bid(
        bidder.address(),
        ContractKind::Erc721,
        ERC721,
        Target::Token(U256::from(5)),
        world.weth(),
        2u64.eth(),
    )
    .with_times(LISTING_TIME, None);
    let bid = world.sign(ProtocolKind::ZeroExV4, &bidder, params).unwrap();
    let call = bid
        .order
        .fill(&Taker::new(legacy).at(TIMESTAMP), world.protocols())
        .unwrap();

    world.mint(&taker, ContractKind::Erc721, 5, 1);
    world
        .transact(
            &taker,
            ERC721,
            U256::ZERO,
            &IERC721::transferFromCall {
                from: taker.address(),
                to: legacy,
                tokenId: U256::from(5),
            },
        )
        .unwrap();
    world
        .transact(
            &taker,
            legacy,
            U256::ZERO,
            &ILegacyRouter::singleERC721BidFillCall {
                referrer: REFERRER,
                data: call.data,
                exchangeKind: exchange_kind::ZEROEX_V4,
                collection: ERC721,
                receiver: taker.address(),
                unwrapWeth: true,
            },
        )
        .unwrap();

    assert_eq!(world.owner_of(5), Some(bidder.address()));
    assert_eq!(world.balance(taker.address()), 12u64.eth());
    assert_eq!(world.weth_balance(bidder.address()), U256::ZERO);
    world.assert_drained();
}
