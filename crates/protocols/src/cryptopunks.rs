//! CryptoPunks market offers.
//!
//! Punks predate ERC721, the market contract is also the token contract. A
//! seller offers a punk on-chain for a minimum price in ETH.

use {
    crate::{
        Adapter,
        ChainState,
        Config,
        Criteria,
        Error,
        ExchangeCall,
        Info,
        Taker,
        Target,
        Unfillable,
        chain,
    },
    alloy_primitives::{Address, B256, U256, keccak256},
    alloy_sol_types::{SolCall, SolValue, sol},
    model::{
        ContractKind,
        ProtocolKind,
        Side,
        signature::{Signature, SigningScheme},
    },
};

sol! {
    interface ICryptoPunksMarket {
        function buyPunk(uint256 punkIndex) external payable;
        function offerPunkForSale(uint256 punkIndex, uint256 minSalePriceInWei) external;
        function transferPunk(address to, uint256 punkIndex) external;
        function punkIndexToAddress(uint256 punkIndex) external view returns (address);
        function punksOfferedForSale(uint256 punkIndex)
            external
            view
            returns (
                bool isForSale,
                uint256 index,
                address seller,
                uint256 minValue,
                address onlySellTo
            );
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub market: Address,
    pub maker: Address,
    pub punk_index: U256,
    pub price: U256,
    /// Zero unless the offer is reserved for a single buyer.
    pub only_sell_to: Address,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matching {
    pub value: U256,
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::CryptoPunks;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.cryptopunks, Self::KIND)?;
        if params.side != Side::Sell {
            return Err(Error::Unsupported {
                kind: Self::KIND,
                operation: "bids",
            });
        }
        let Target::Token(punk_index) = params.target else {
            return Err(Error::params("punk offers are for single punks"));
        };
        if params.contract != deployment.market {
            return Err(Error::params("punks are traded on their market contract"));
        }
        if !params.payment_token.is_zero() || !params.fees.is_empty() {
            return Err(Error::params("punk offers are paid in ETH without fees"));
        }
        Ok(Self {
            market: deployment.market,
            maker: params.maker,
            punk_index,
            price: params.price,
            only_sell_to: Address::ZERO,
        })
    }

    fn info(&self, _: &Config) -> Info {
        Info {
            kind: Self::KIND,
            maker: self.maker,
            side: Side::Sell,
            contract_kind: ContractKind::Erc721,
            contract: self.market,
            criteria: Criteria::Token(self.punk_index),
            payment_token: Address::ZERO,
            price: self.price,
            amount: U256::from(1),
            expiration_time: 0,
        }
    }

    fn hash(&self, _: &Config) -> B256 {
        keccak256((self.market, self.punk_index, self.maker, self.price).abi_encode())
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        self.hash(config)
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::OnChain
    }

    fn build_matching(&self, taker: &Taker, _: &Config) -> Result<Matching, Error> {
        taker.check_amount(U256::from(1))?;
        if !self.only_sell_to.is_zero() && self.only_sell_to != taker.address {
            return Err(Error::params("punk is reserved for another buyer"));
        }
        Ok(Matching { value: self.price })
    }

    fn fill(&self, _: &Signature, matching: &Matching, _: &Config) -> Result<ExchangeCall, Error> {
        Ok(ExchangeCall {
            to: self.market,
            data: ICryptoPunksMarket::buyPunkCall {
                punkIndex: self.punk_index,
            }
            .abi_encode()
            .into(),
            value: matching.value,
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, _: &Config) -> Result<(), Unfillable> {
        let owner = chain::view(
            state,
            self.market,
            ICryptoPunksMarket::punkIndexToAddressCall {
                punkIndex: self.punk_index,
            },
        )?;
        if owner != self.maker {
            return Err(Unfillable::NotOwner);
        }
        let offer = chain::view(
            state,
            self.market,
            ICryptoPunksMarket::punksOfferedForSaleCall {
                punkIndex: self.punk_index,
            },
        )?;
        if !offer.isForSale || offer.seller != self.maker {
            return Err(Unfillable::Cancelled);
        }
        if offer.minValue != self.price {
            return Err(Unfillable::PriceMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{BuildParams, chain::testing::Scripted, testing::signer},
        number::units::EthUnit,
    };

    fn order(config: &Config) -> crate::Order {
        let market = config.cryptopunks.as_ref().unwrap().market;
        let params = BuildParams::listing(
            signer(1).address(),
            ContractKind::Erc721,
            market,
            U256::from(1234),
            50.0.eth(),
        );
        crate::Order::build(ProtocolKind::CryptoPunks, &params, config).unwrap()
    }

    #[test]
    fn buys_punks() {
        let config = Config::mainnet();
        let call = order(&config)
            .fill(&Taker::new(Address::repeat_byte(5)), &config)
            .unwrap();
        let decoded = ICryptoPunksMarket::buyPunkCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.punkIndex, U256::from(1234));
        assert_eq!(call.value, 50.0.eth());
    }

    #[test]
    fn withdrawn_offers_are_unfillable() {
        let config = Config::mainnet();
        let order = order(&config);
        let market = config.cryptopunks.as_ref().unwrap().market;
        let state = |for_sale: bool| {
            Scripted::at(0)
                .on(
                    market,
                    ICryptoPunksMarket::punkIndexToAddressCall {
                        punkIndex: U256::from(1234),
                    },
                    signer(1).address().abi_encode(),
                )
                .on(
                    market,
                    ICryptoPunksMarket::punksOfferedForSaleCall {
                        punkIndex: U256::from(1234),
                    },
                    (
                        for_sale,
                        U256::from(1234),
                        signer(1).address(),
                        50.0.eth(),
                        Address::ZERO,
                    )
                        .abi_encode_params(),
                )
        };
        assert_eq!(order.check_fillability(&state(true), &config), Ok(()));
        assert_eq!(
            order.check_fillability(&state(false), &config),
            Err(Unfillable::Cancelled)
        );
    }
}
