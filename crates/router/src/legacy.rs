//! The non-modular router generation.
//!
//! Every entry point fills through one of the configured exchanges directly
//! and charges the referrer fee in basis points over what was actually paid.
//! Unlike modules any failed fill reverts the whole call.

use {
    crate::{
        Contract,
        Env,
        Revert,
        tokens::{approve_nft, balance_of, send, sweep},
    },
    alloy_primitives::{Address, Bytes, U256},
    alloy_sol_types::SolInterface,
    model::{
        Asset,
        ContractKind,
        abi::{ILegacyRouter, IWETH},
    },
    number::math::BPS_DENOMINATOR,
    std::collections::HashMap,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Exchange {
    pub address: Address,
    /// Address the exchange pulls NFTs with when filling bids.
    pub operator: Address,
}

#[derive(Clone, Debug)]
pub struct LegacyRouter {
    exchanges: HashMap<u8, Exchange>,
    weth: Address,
}

/// One listing of a listing fill call.
struct ListingFill<'a> {
    data: &'a [u8],
    exchange_kind: u8,
    nft: Asset,
}

struct BidFill<'a> {
    data: &'a [u8],
    exchange_kind: u8,
    kind: ContractKind,
    collection: Address,
    receiver: Address,
    unwrap_weth: bool,
}

impl LegacyRouter {
    pub fn new(exchanges: HashMap<u8, Exchange>, weth: Address) -> Self {
        Self { exchanges, weth }
    }

    fn exchange(&self, kind: u8) -> Result<Exchange, Revert> {
        self.exchanges
            .get(&kind)
            .copied()
            .ok_or_else(|| Revert::custom(format!("unsupported exchange kind {kind}")))
    }

    fn fill_listings(
        &self,
        env: &mut Env<'_>,
        referrer: Address,
        listings: &[ListingFill<'_>],
        receiver: Address,
        fee_bps: u16,
    ) -> Result<(), Revert> {
        let scale = U256::from(BPS_DENOMINATOR);
        let with_fee = scale + U256::from(fee_bps);
        let referrer_fee = |paid| {
            fee::referrer_fee(paid, fee_bps).map_err(|err| Revert::custom(err.to_string()))
        };

        let mut paid = U256::ZERO;
        for (index, listing) in listings.iter().enumerate() {
            let exchange = self.exchange(listing.exchange_kind)?;
            let available = env.balance().saturating_sub(referrer_fee(paid)?);
            let budget = number::math::mul_div(available, scale, with_fee)
                .ok_or(Revert::custom("overflow"))?;

            let before = env.balance();
            env.call(exchange.address, budget, listing.data).map_err(|err| {
                tracing::debug!(index, ?err, "legacy listing fill failed");
                Revert::UnsuccessfulFill
            })?;
            paid += before.saturating_sub(env.balance());
            sweep(env, listing.nft, receiver)?;
        }

        let fee = referrer_fee(paid)?;
        env.send(referrer, fee)?;
        let caller = env.caller;
        let refund = env.balance();
        env.send(caller, refund)?;
        tracing::debug!(%paid, %fee, %refund, "legacy listings filled");
        Ok(())
    }

    fn fill_bid(&self, env: &mut Env<'_>, bid: BidFill<'_>) -> Result<(), Revert> {
        let exchange = self.exchange(bid.exchange_kind)?;
        let weth = Asset::Erc20 { token: self.weth };
        approve_nft(env, bid.kind, bid.collection, exchange.operator)?;

        let before = balance_of(env, weth)?;
        env.call(exchange.address, U256::ZERO, bid.data).map_err(|err| {
            tracing::debug!(?err, "legacy bid fill failed");
            Revert::UnsuccessfulFill
        })?;
        let received = balance_of(env, weth)?.saturating_sub(before);

        if bid.unwrap_weth {
            env.call_sol(self.weth, U256::ZERO, &IWETH::withdrawCall { amount: received })?;
            env.send(bid.receiver, received)?;
        } else {
            send(env, weth, bid.receiver, received)?;
        }
        tracing::debug!(%received, unwrap_weth = bid.unwrap_weth, "legacy bid filled");
        Ok(())
    }
}

fn nft(kind: ContractKind, collection: Address, id: U256) -> Asset {
    Asset::nft(kind, collection, id)
}

impl Contract for LegacyRouter {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        use ILegacyRouter::ILegacyRouterCalls as Calls;

        let erc721 = ContractKind::Erc721;
        let erc1155 = ContractKind::Erc1155;
        match Calls::abi_decode(input)? {
            Calls::singleERC721ListingFill(call) => {
                let listing = ListingFill {
                    data: &call.data,
                    exchange_kind: call.exchangeKind,
                    nft: nft(erc721, call.collection, call.tokenId),
                };
                self.fill_listings(env, call.referrer, &[listing], call.receiver, call.feeBps)?;
            }
            Calls::singleERC1155ListingFill(call) => {
                let listing = ListingFill {
                    data: &call.data,
                    exchange_kind: call.exchangeKind,
                    nft: nft(erc1155, call.collection, call.tokenId),
                };
                self.fill_listings(env, call.referrer, &[listing], call.receiver, call.feeBps)?;
            }
            Calls::batchERC721ListingFill(call) => {
                let n = call.data.len();
                if [call.exchangeKinds.len(), call.collections.len(), call.tokenIds.len()]
                    .iter()
                    .any(|len| *len != n)
                {
                    return Err(Revert::InvalidCalldata);
                }
                let listings = (0..n)
                    .map(|i| ListingFill {
                        data: &call.data[i],
                        exchange_kind: call.exchangeKinds[i],
                        nft: nft(erc721, call.collections[i], call.tokenIds[i]),
                    })
                    .collect::<Vec<_>>();
                self.fill_listings(env, call.referrer, &listings, call.receiver, call.feeBps)?;
            }
            Calls::batchERC1155ListingFill(call) => {
                let n = call.data.len();
                if [
                    call.exchangeKinds.len(),
                    call.collections.len(),
                    call.tokenIds.len(),
                    call.amounts.len(),
                ]
                .iter()
                .any(|len| *len != n)
                {
                    return Err(Revert::InvalidCalldata);
                }
                let listings = (0..n)
                    .map(|i| ListingFill {
                        data: &call.data[i],
                        exchange_kind: call.exchangeKinds[i],
                        nft: nft(erc1155, call.collections[i], call.tokenIds[i]),
                    })
                    .collect::<Vec<_>>();
                self.fill_listings(env, call.referrer, &listings, call.receiver, call.feeBps)?;
            }
            Calls::singleERC721BidFill(call) => self.fill_bid(
                env,
                BidFill {
                    data: &call.data,
                    exchange_kind: call.exchangeKind,
                    kind: erc721,
                    collection: call.collection,
                    receiver: call.receiver,
                    unwrap_weth: call.unwrapWeth,
                },
            )?,
            Calls::singleERC1155BidFill(call) => self.fill_bid(
                env,
                BidFill {
                    data: &call.data,
                    exchange_kind: call.exchangeKind,
                    kind: erc1155,
                    collection: call.collection,
                    receiver: call.receiver,
                    unwrap_weth: call.unwrapWeth,
                },
            )?,
        }
        Ok(Bytes::new())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{BIDDER, REFERRER, SELLER, TAKER, World},
        number::units::EthUnit,
    };

    #[test]
    fn charges_the_referrer_fee_over_the_paid_amount() {
        let mut world = World::new();
        world.list(1);
        world.fund(TAKER, 2u64.eth());

        let call = ILegacyRouter::singleERC721ListingFillCall {
            referrer: REFERRER,
            data: world.buy_call(1, 1u64.eth(), world.legacy).into(),
            exchangeKind: 1,
            collection: world.erc721,
            tokenId: U256::from(1),
            receiver: TAKER,
            feeBps: 100,
        };
        world
            .chain
            .transact(TAKER, world.legacy, 1.5.eth(), &call)
            .unwrap();

        assert_eq!(world.owner(1), Some(TAKER));
        assert_eq!(world.balance(SELLER), 1u64.eth());
        assert_eq!(world.balance(REFERRER), 0.01.eth());
        assert_eq!(world.balance(TAKER), 0.99.eth());
        assert_eq!(world.balance(world.legacy), U256::ZERO);
    }

    #[test]
    fn batches_revert_on_any_failure() {
        let mut world = World::new();
        world.list(1);
        world.list(2);
        world.cancel(2);
        world.fund(TAKER, 3u64.eth());

        let call = ILegacyRouter::batchERC721ListingFillCall {
            referrer: REFERRER,
            data: [1, 2]
                .map(|id| Bytes::from(world.buy_call(id, 1u64.eth(), world.legacy)))
                .to_vec(),
            exchangeKinds: vec![1, 1],
            collections: vec![world.erc721; 2],
            tokenIds: vec![U256::from(1), U256::from(2)],
            receiver: TAKER,
            feeBps: 0,
        };
        assert_eq!(
            world
                .chain
                .transact(TAKER, world.legacy, 2u64.eth(), &call)
                .map(|_| ()),
            Err(Revert::UnsuccessfulFill)
        );
        assert_eq!(world.owner(1), Some(SELLER));
        assert_eq!(world.balance(TAKER), 3u64.eth());
    }

    #[test]
    fn unwraps_bid_proceeds() {
        let mut world = World::new();
        let offer = world.bid(7, 1u64.eth());
        world
            .chain
            .ledger_mut()
            .mint_erc721(world.erc721, world.legacy, U256::from(7));

        let call = ILegacyRouter::singleERC721BidFillCall {
            referrer: REFERRER,
            data: offer.data,
            exchangeKind: 1,
            collection: world.erc721,
            receiver: TAKER,
            unwrapWeth: true,
        };
        world
            .chain
            .transact(TAKER, world.legacy, U256::ZERO, &call)
            .unwrap();

        assert_eq!(world.owner(7), Some(BIDDER));
        assert_eq!(world.balance(TAKER), 1u64.eth());
        assert!(world.chain.ledger().holdings(world.legacy).is_empty());
    }
}
