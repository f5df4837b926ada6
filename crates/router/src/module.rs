//! Protocol modules: the contracts the router delegates fills to.
//!
//! A module talks to exactly one exchange. Listings are bought with the
//! value the module received for the call, or with ERC20 tokens it pulls
//! from the payer of the batch. Offers are accepted with NFTs that were
//! moved into the module beforehand.
//! Whatever is left at the end goes back to `refundTo`.

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
        abi::{Fee, IERC20, IModule, Listing, ListingParams, Offer, OfferParams},
    },
};

#[derive(Clone, Copy, Debug)]
pub struct ExchangeModule {
    pub exchange: Address,
    /// Address the exchange pulls tokens with. This is the exchange itself
    /// for most protocols and a proxy or conduit for the others.
    pub operator: Address,
}

impl ExchangeModule {
    pub fn new(exchange: Address, operator: Address) -> Self {
        Self { exchange, operator }
    }

    fn accept_listings(
        &self,
        env: &mut Env<'_>,
        listings: &[Listing],
        params: &ListingParams,
        fees: &[Fee],
    ) -> Result<(), Revert> {
        let payment = Asset::payment(params.token);
        if let Asset::Erc20 { token } = payment {
            if !params.payer.is_zero() {
                let budget = fees
                    .iter()
                    .try_fold(params.amount, |total, fee| total.checked_add(fee.amount))
                    .ok_or(Revert::custom("listing budget overflows"))?;
                self.pull_erc20(env, token, params.payer, budget)?;
            }
            self.approve_erc20(env, token, params.amount)?;
        }
        let before = balance_of(env, payment)?;

        for (index, listing) in listings.iter().enumerate() {
            match env.call(self.exchange, listing.value, &listing.data) {
                Ok(_) => {
                    let kind = item_kind(listing.itemKind)?;
                    let nft = Asset::nft(kind, listing.collection, listing.tokenId);
                    sweep(env, nft, params.fillTo)?;
                    tracing::debug!(index, exchange = %self.exchange, "filled listing");
                }
                Err(err) if params.revertIfIncomplete => {
                    tracing::debug!(index, ?err, "listing failed");
                    return Err(Revert::UnsuccessfulFill);
                }
                Err(err) => tracing::debug!(index, ?err, "skipped listing"),
            }
        }

        let spent = before.saturating_sub(balance_of(env, payment)?);
        for fee in fees {
            let amount = fee::prorate(fee.amount, spent, params.amount)
                .map_err(|err| Revert::custom(err.to_string()))?;
            send(env, payment, fee.recipient, amount)?;
        }

        if let Asset::Erc20 { token } = payment {
            self.approve_erc20(env, token, U256::ZERO)?;
        }
        let refund = sweep(env, payment, params.refundTo)?;
        tracing::debug!(%spent, %refund, "settled listings");
        Ok(())
    }

    fn accept_offers(
        &self,
        env: &mut Env<'_>,
        offers: &[Offer],
        params: &OfferParams,
        fees: &[Fee],
    ) -> Result<(), Revert> {
        let Some(currency) = offers.first().map(|offer| Asset::payment(offer.currency)) else {
            return Ok(());
        };
        let (mut sold, mut offered) = (U256::ZERO, U256::ZERO);
        for (index, offer) in offers.iter().enumerate() {
            let kind = item_kind(offer.itemKind)?;
            let nft = Asset::nft(kind, offer.collection, offer.tokenId);
            offered += offer.amount;
            approve_nft(env, kind, offer.collection, self.operator)?;

            let held = balance_of(env, nft)?;
            match env.call(self.exchange, U256::ZERO, &offer.data) {
                Ok(_) => {
                    sold += held.saturating_sub(balance_of(env, nft)?);
                    tracing::debug!(index, exchange = %self.exchange, "accepted offer");
                }
                Err(err) if params.revertIfIncomplete => {
                    tracing::debug!(index, ?err, "offer failed");
                    return Err(Revert::UnsuccessfulFill);
                }
                Err(err) => tracing::debug!(index, ?err, "skipped offer"),
            }
        }

        if !sold.is_zero() {
            for fee in fees {
                let amount = fee::prorate(fee.amount, sold, offered)
                    .map_err(|err| Revert::custom(err.to_string()))?;
                send(env, currency, fee.recipient, amount)?;
            }
        }
        let proceeds = sweep(env, currency, params.fillTo)?;
        tracing::debug!(%sold, %proceeds, "settled offers");

        for offer in offers {
            let kind = item_kind(offer.itemKind)?;
            sweep(
                env,
                Asset::nft(kind, offer.collection, offer.tokenId),
                params.refundTo,
            )?;
        }
        Ok(())
    }

    fn pull_erc20(
        &self,
        env: &mut Env<'_>,
        token: Address,
        from: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        let to = env.this;
        env.call_sol(token, U256::ZERO, &IERC20::transferFromCall { from, to, amount })?;
        Ok(())
    }

    fn approve_erc20(&self, env: &mut Env<'_>, token: Address, amount: U256) -> Result<(), Revert> {
        env.call_sol(
            token,
            U256::ZERO,
            &IERC20::approveCall {
                spender: self.operator,
                amount,
            },
        )?;
        Ok(())
    }
}

fn item_kind(kind: u8) -> Result<ContractKind, Revert> {
    ContractKind::from_item_kind(kind).ok_or(Revert::InvalidCalldata)
}

impl Contract for ExchangeModule {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        match IModule::IModuleCalls::abi_decode(input)? {
            IModule::IModuleCalls::acceptListings(call) => {
                self.accept_listings(env, &call.listings, &call.params, &call.fees)?;
                Ok(Bytes::new())
            }
            IModule::IModuleCalls::acceptOffers(call) => {
                if !env.value.is_zero() {
                    return Err(Revert::custom("acceptOffers is not payable"));
                }
                self.accept_offers(env, &call.offers, &call.params, &call.fees)?;
                Ok(Bytes::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{BIDDER, REFERRER, SELLER, TAKER, World},
        alloy_sol_types::SolCall,
        number::units::EthUnit,
    };

    fn listings_call(world: &World, ids: &[u64], revert_if_incomplete: bool) -> Vec<u8> {
        IModule::acceptListingsCall {
            listings: ids.iter().map(|id| world.listing(*id, 1u64.eth())).collect(),
            params: ListingParams {
                fillTo: TAKER,
                refundTo: TAKER,
                revertIfIncomplete: revert_if_incomplete,
                token: Address::ZERO,
                amount: U256::from(ids.len()) * 1u64.eth(),
                payer: Address::ZERO,
            },
            fees: vec![Fee {
                recipient: REFERRER,
                amount: 0.03.eth(),
            }],
        }
        .abi_encode()
    }

    #[test]
    fn skips_unfillable_listings() {
        let mut world = World::new();
        for id in 1..=3 {
            world.list(id);
        }
        world.cancel(2);
        world.fund(TAKER, 10u64.eth());

        let call = listings_call(&world, &[1, 2, 3], false);
        world
            .chain
            .call(TAKER, world.module, 3.03.eth(), &call)
            .unwrap();

        assert_eq!(world.owner(1), Some(TAKER));
        assert_eq!(world.owner(2), Some(SELLER));
        assert_eq!(world.owner(3), Some(TAKER));
        assert_eq!(world.balance(SELLER), 2u64.eth());
        assert_eq!(world.balance(REFERRER), 0.02.eth());
        assert_eq!(world.balance(TAKER), 7.98.eth());
        assert!(world.chain.ledger().holdings(world.module).is_empty());
    }

    #[test]
    fn incomplete_listings_revert() {
        let mut world = World::new();
        for id in 1..=3 {
            world.list(id);
        }
        world.cancel(3);
        world.fund(TAKER, 10u64.eth());

        let call = listings_call(&world, &[1, 2, 3], true);
        assert_eq!(
            world.chain.call(TAKER, world.module, 3.03.eth(), &call),
            Err(Revert::UnsuccessfulFill)
        );
        assert_eq!(world.owner(1), Some(SELLER));
        assert_eq!(world.balance(TAKER), 10u64.eth());
        assert_eq!(world.balance(world.module), U256::ZERO);
    }

    #[test]
    fn accepts_offers_and_returns_unsold_tokens() {
        let mut world = World::new();
        let offers = vec![world.bid(5, 1u64.eth()), world.bid(6, 1u64.eth())];
        world.cancel(6);
        for id in [5, 6] {
            world
                .chain
                .ledger_mut()
                .mint_erc721(world.erc721, world.module, U256::from(id));
        }

        let call = IModule::acceptOffersCall {
            offers,
            params: OfferParams {
                fillTo: TAKER,
                refundTo: TAKER,
                revertIfIncomplete: false,
            },
            fees: vec![Fee {
                recipient: REFERRER,
                amount: 0.2.eth(),
            }],
        };
        world
            .chain
            .transact(TAKER, world.module, U256::ZERO, &call)
            .unwrap();

        let ledger = world.chain.ledger();
        assert_eq!(world.owner(5), Some(BIDDER));
        assert_eq!(world.owner(6), Some(TAKER));
        assert_eq!(ledger.erc20_balance(world.weth, TAKER), 0.9.eth());
        assert_eq!(ledger.erc20_balance(world.weth, REFERRER), 0.1.eth());
        assert!(ledger.holdings(world.module).is_empty());
    }
}
