//! Foundation market buy-now prices.
//!
//! Sellers escrow their token in the market and set a buy price on-chain,
//! there is nothing to sign off-chain. The market takes its fee out of the
//! price, so orders can't carry additional fees.

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
    interface IFoundationMarket {
        function buyV2(
            address nftContract,
            uint256 tokenId,
            uint256 maxPrice,
            address referrer
        ) external payable;
        function getBuyPrice(address nftContract, uint256 tokenId)
            external
            view
            returns (address seller, uint256 price);
        function setBuyPrice(address nftContract, uint256 tokenId, uint256 price) external;
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub market: Address,
    pub maker: Address,
    pub contract: Address,
    pub token_id: U256,
    pub price: U256,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matching {
    /// Upper bound on the price the buyer accepts.
    pub max_price: U256,
    pub referrer: Address,
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Foundation;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.foundation, Self::KIND)?;
        let Target::Token(token_id) = params.target else {
            return Err(Error::params("foundation prices single tokens"));
        };
        if params.side != Side::Sell {
            return Err(Error::Unsupported {
                kind: Self::KIND,
                operation: "bids",
            });
        }
        if params.contract_kind != ContractKind::Erc721 || !params.payment_token.is_zero() {
            return Err(Error::params("foundation sells ERC721 tokens for ETH"));
        }
        if !params.fees.is_empty() {
            return Err(Error::params("foundation charges its own fees"));
        }
        Ok(Self {
            market: deployment.market,
            maker: params.maker,
            contract: params.contract,
            token_id,
            price: params.price,
        })
    }

    fn info(&self, _: &Config) -> Info {
        Info {
            kind: Self::KIND,
            maker: self.maker,
            side: Side::Sell,
            contract_kind: ContractKind::Erc721,
            contract: self.contract,
            criteria: Criteria::Token(self.token_id),
            payment_token: Address::ZERO,
            price: self.price,
            amount: U256::from(1),
            expiration_time: 0,
        }
    }

    /// The market keys buy prices by token, a price is identified by the
    /// token, its seller and the amount.
    fn hash(&self, _: &Config) -> B256 {
        keccak256(
            (
                self.market,
                self.contract,
                self.token_id,
                self.maker,
                self.price,
            )
                .abi_encode(),
        )
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        self.hash(config)
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::OnChain
    }

    fn build_matching(&self, taker: &Taker, _: &Config) -> Result<Matching, Error> {
        taker.check_amount(U256::from(1))?;
        Ok(Matching {
            max_price: self.price,
            referrer: Address::ZERO,
        })
    }

    fn fill(&self, _: &Signature, matching: &Matching, _: &Config) -> Result<ExchangeCall, Error> {
        let data = IFoundationMarket::buyV2Call {
            nftContract: self.contract,
            tokenId: self.token_id,
            maxPrice: matching.max_price,
            referrer: matching.referrer,
        }
        .abi_encode();
        Ok(ExchangeCall {
            to: self.market,
            data: data.into(),
            value: self.price,
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, _: &Config) -> Result<(), Unfillable> {
        chain::owns(
            state,
            ContractKind::Erc721,
            self.contract,
            self.market,
            self.token_id,
            U256::from(1),
        )
        .map_err(|err| match err {
            Unfillable::NotOwner => Unfillable::NotEscrowed,
            err => err,
        })?;
        let listed = chain::view(
            state,
            self.market,
            IFoundationMarket::getBuyPriceCall {
                nftContract: self.contract,
                tokenId: self.token_id,
            },
        )?;
        if listed.seller != self.maker {
            return Err(Unfillable::Cancelled);
        }
        if listed.price != self.price {
            return Err(Unfillable::PriceMismatch);
        }
        Ok(())
    }
}
