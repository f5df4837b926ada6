//! LooksRare v1.
//!
//! Prices are denominated in WETH; listings can still be bought with native
//! ETH through `matchAskWithTakerBidUsingETHAndWETH`. Fees are charged by the
//! exchange itself, makers only bound them via `minPercentageToAsk`.

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
        params::time_window,
    },
    alloy_primitives::{Address, B256, Bytes, U256},
    alloy_sol_types::{SolCall, SolStruct, sol},
    model::{
        ContractKind,
        DomainSeparator,
        ProtocolKind,
        Side,
        eip712::hashed_eip712_message,
        signature::{Signature, SigningScheme},
    },
    number::math::BPS_DENOMINATOR,
};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct MakerOrder {
        bool isOrderAsk;
        address signer;
        address collection;
        uint256 price;
        uint256 tokenId;
        uint256 amount;
        address strategy;
        address currency;
        uint256 nonce;
        uint256 startTime;
        uint256 endTime;
        uint256 minPercentageToAsk;
        bytes params;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SignedMakerOrder {
        bool isOrderAsk;
        address signer;
        address collection;
        uint256 price;
        uint256 tokenId;
        uint256 amount;
        address strategy;
        address currency;
        uint256 nonce;
        uint256 startTime;
        uint256 endTime;
        uint256 minPercentageToAsk;
        bytes params;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct TakerOrder {
        bool isOrderAsk;
        address taker;
        uint256 price;
        uint256 tokenId;
        uint256 minPercentageToAsk;
        bytes params;
    }

    interface ILooksRareExchange {
        function matchAskWithTakerBidUsingETHAndWETH(
            TakerOrder takerBid,
            SignedMakerOrder makerAsk
        ) external payable;
        function matchAskWithTakerBid(TakerOrder takerBid, SignedMakerOrder makerAsk) external;
        function matchBidWithTakerAsk(TakerOrder takerAsk, SignedMakerOrder makerBid) external;
        function cancelMultipleMakerOrders(uint256[] orderNonces) external;
        function userMinOrderNonce(address user) external view returns (uint256);
        function isUserOrderNonceExecutedOrCancelled(
            address user,
            uint256 orderNonce
        ) external view returns (bool);
    }
}

/// `minPercentageToAsk` for makers that don't specify their fees.
const DEFAULT_MIN_PERCENTAGE_TO_ASK: u64 = 8_500;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub exchange: Address,
    /// Not part of the signed order, the exchange asks the collection.
    pub contract_kind: ContractKind,
    pub maker: MakerOrder,
}

impl Order {
    fn is_collection_order(&self, config: &Config) -> bool {
        config
            .looks_rare
            .as_ref()
            .is_some_and(|d| d.strategy_collection == self.maker.strategy)
    }

    fn signed(&self, signature: &Signature) -> Result<SignedMakerOrder, Error> {
        let ecdsa = signature
            .ecdsa()
            .ok_or_else(|| Error::InvalidOrder("missing ECDSA signature".to_string()))?;
        let m = self.maker.clone();
        Ok(SignedMakerOrder {
            isOrderAsk: m.isOrderAsk,
            signer: m.signer,
            collection: m.collection,
            price: m.price,
            tokenId: m.tokenId,
            amount: m.amount,
            strategy: m.strategy,
            currency: m.currency,
            nonce: m.nonce,
            startTime: m.startTime,
            endTime: m.endTime,
            minPercentageToAsk: m.minPercentageToAsk,
            params: m.params,
            v: ecdsa.v,
            r: ecdsa.r,
            s: ecdsa.s,
        })
    }
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::LooksRare;
    type Matching = TakerOrder;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.looks_rare, Self::KIND)?;
        params.require_token_listing(Self::KIND)?;

        let (strategy, token_id) = match &params.target {
            Target::Token(id) => (deployment.strategy_standard, *id),
            Target::Collection if params.contract_kind == ContractKind::Erc721 => {
                (deployment.strategy_collection, U256::ZERO)
            }
            _ => return Err(Error::params("unsupported looks-rare criteria")),
        };
        if !params.payment_token.is_zero() && params.payment_token != config.weth {
            return Err(Error::params("looks-rare orders are priced in WETH"));
        }

        let min_percentage_to_ask = if params.fees.is_empty() || params.price.is_zero() {
            U256::from(DEFAULT_MIN_PERCENTAGE_TO_ASK)
        } else {
            let split = params.split()?;
            number::math::mul_div(split.net, U256::from(BPS_DENOMINATOR), params.price)
                .ok_or(Error::Fee(fee::Error::Overflow))?
        };

        Ok(Self {
            exchange: deployment.exchange,
            contract_kind: params.contract_kind,
            maker: MakerOrder {
                isOrderAsk: params.side == Side::Sell,
                signer: params.maker,
                collection: params.contract,
                price: params.price,
                tokenId: token_id,
                amount: params.amount,
                strategy,
                currency: config.weth,
                nonce: params.nonce(),
                startTime: U256::from(params.listing_time()),
                endTime: U256::from(params.expiration_time.unwrap_or(u64::MAX)),
                minPercentageToAsk: min_percentage_to_ask,
                params: Bytes::new(),
            },
        })
    }

    fn info(&self, config: &Config) -> Info {
        let side = if self.maker.isOrderAsk {
            Side::Sell
        } else {
            Side::Buy
        };
        let expiration = u64::try_from(self.maker.endTime).unwrap_or_default();
        Info {
            kind: Self::KIND,
            maker: self.maker.signer,
            side,
            contract_kind: self.contract_kind,
            contract: self.maker.collection,
            criteria: if self.is_collection_order(config) {
                Criteria::Collection
            } else {
                Criteria::Token(self.maker.tokenId)
            },
            // Listings accept native ETH next to WETH.
            payment_token: match side {
                Side::Sell => Address::ZERO,
                Side::Buy => self.maker.currency,
            },
            price: self.maker.price,
            amount: self.maker.amount,
            expiration_time: if expiration == u64::MAX { 0 } else { expiration },
        }
    }

    fn hash(&self, _: &Config) -> B256 {
        self.maker.eip712_hash_struct()
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        let domain = DomainSeparator::new("LooksRareExchange", "1", config.chain_id, self.exchange);
        hashed_eip712_message(&domain, &self.maker.eip712_hash_struct())
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::Eip712
    }

    fn build_matching(&self, taker: &Taker, config: &Config) -> Result<TakerOrder, Error> {
        let info = self.info(config);
        taker.check_amount(info.amount)?;
        if taker.amount != info.amount {
            return Err(Error::params("looks-rare orders can only be filled in full"));
        }
        Ok(TakerOrder {
            isOrderAsk: !self.maker.isOrderAsk,
            taker: taker.address,
            price: self.maker.price,
            tokenId: taker.resolve(&info.criteria)?,
            minPercentageToAsk: self.maker.minPercentageToAsk,
            params: Bytes::new(),
        })
    }

    fn fill(
        &self,
        signature: &Signature,
        matching: &TakerOrder,
        _: &Config,
    ) -> Result<ExchangeCall, Error> {
        let maker = self.signed(signature)?;
        let (data, value) = if self.maker.isOrderAsk {
            let call = ILooksRareExchange::matchAskWithTakerBidUsingETHAndWETHCall {
                takerBid: matching.clone(),
                makerAsk: maker,
            };
            (call.abi_encode(), self.maker.price)
        } else {
            let call = ILooksRareExchange::matchBidWithTakerAskCall {
                takerAsk: matching.clone(),
                makerBid: maker,
            };
            (call.abi_encode(), U256::ZERO)
        };
        Ok(ExchangeCall {
            to: self.exchange,
            data: data.into(),
            value,
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let deployment = config
            .looks_rare
            .as_ref()
            .ok_or_else(|| Unfillable::State("looks-rare is not deployed".to_string()))?;
        let info = self.info(config);
        let start = u64::try_from(self.maker.startTime).unwrap_or(u64::MAX);
        time_window(state.timestamp(), start, info.expiration_time)?;

        let min_nonce = chain::view(
            state,
            self.exchange,
            ILooksRareExchange::userMinOrderNonceCall { user: info.maker },
        )?;
        if self.maker.nonce < min_nonce {
            return Err(Unfillable::Cancelled);
        }
        let used = chain::view(
            state,
            self.exchange,
            ILooksRareExchange::isUserOrderNonceExecutedOrCancelledCall {
                user: info.maker,
                orderNonce: self.maker.nonce,
            },
        )?;
        if used {
            return Err(Unfillable::Cancelled);
        }

        let transfer_manager = match info.contract_kind {
            ContractKind::Erc721 => deployment.transfer_manager_erc721,
            ContractKind::Erc1155 => deployment.transfer_manager_erc1155,
        };
        let info = Info {
            payment_token: self.maker.currency,
            ..info
        };
        chain::maker_side(
            state,
            &info,
            self.maker.tokenId,
            transfer_manager,
            self.exchange,
        )
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            BuildParams,
            testing::{nft, signer},
        },
        number::units::EthUnit,
    };

    #[test]
    fn maker_order_type_hash() {
        let order = MakerOrder {
            isOrderAsk: true,
            signer: Address::ZERO,
            collection: Address::ZERO,
            price: U256::ZERO,
            tokenId: U256::ZERO,
            amount: U256::ZERO,
            strategy: Address::ZERO,
            currency: Address::ZERO,
            nonce: U256::ZERO,
            startTime: U256::ZERO,
            endTime: U256::ZERO,
            minPercentageToAsk: U256::ZERO,
            params: Bytes::new(),
        };
        assert_eq!(
            order.eip712_type_hash(),
            alloy_primitives::b256!(
                "40261ade532fa1d2c7293df30aaadb9b3c616fae525a0b56d3d411c841a85028"
            )
        );
    }

    #[test]
    fn listing_roundtrip() {
        let config = Config::mainnet();
        let params = BuildParams::listing(
            signer(1).address(),
            ContractKind::Erc721,
            nft(),
            U256::from(3),
            1.0.eth(),
        )
        .with_fees(vec![fee::Fee::bps(Address::repeat_byte(9), 200)]);
        let order = crate::Order::build(ProtocolKind::LooksRare, &params, &config)
            .unwrap()
            .signed(&signer(1), &config)
            .unwrap();
        order.verify_signature(&config).unwrap();

        let crate::Raw::LooksRare(looks_rare) = &order.raw else {
            unreachable!()
        };
        assert_eq!(looks_rare.maker.minPercentageToAsk, U256::from(9_800));
        assert_eq!(looks_rare.maker.currency, config.weth);

        let call = order
            .fill(&Taker::new(Address::repeat_byte(5)), &config)
            .unwrap();
        assert_eq!(call.value, 1.0.eth());
        let decoded =
            ILooksRareExchange::matchAskWithTakerBidUsingETHAndWETHCall::abi_decode(&call.data)
                .unwrap();
        assert_eq!(decoded.takerBid.taker, Address::repeat_byte(5));
        assert_eq!(decoded.takerBid.tokenId, U256::from(3));
        assert!(!decoded.takerBid.isOrderAsk);
    }

    #[test]
    fn collection_bid_takes_any_token() {
        let config = Config::mainnet();
        let params = BuildParams::bid(
            signer(2).address(),
            ContractKind::Erc721,
            nft(),
            Target::Collection,
            config.weth,
            1.0.eth(),
        );
        let order = crate::Order::build(ProtocolKind::LooksRare, &params, &config)
            .unwrap()
            .signed(&signer(2), &config)
            .unwrap();
        assert_eq!(order.info(&config).criteria, Criteria::Collection);

        let taker = Taker::new(Address::repeat_byte(5)).with_token_id(U256::from(44));
        let call = order.fill(&taker, &config).unwrap();
        let decoded =
            ILooksRareExchange::matchBidWithTakerAskCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.takerAsk.tokenId, U256::from(44));
        assert!(decoded.takerAsk.isOrderAsk);
        assert_eq!(call.value, U256::ZERO);
    }

    #[test]
    fn rejects_foreign_currencies() {
        let config = Config::mainnet();
        let params = BuildParams::listing(
            signer(1).address(),
            ContractKind::Erc721,
            nft(),
            U256::from(3),
            1.0.eth(),
        )
        .with_payment_token(Address::repeat_byte(3));
        assert!(crate::Order::build(ProtocolKind::LooksRare, &params, &config).is_err());
    }
}
