//! Blur exchange orders.
//!
//! Only single ERC721 tokens trade through the standard matching policy.
//! Fees are rates paid out of the price by the seller. The signed order
//! includes the trader's nonce, which the exchange keeps track of itself, so
//! the call struct doesn't carry it.

use {
    crate::{
        Adapter,
        ChainState,
        Config,
        Criteria,
        Error,
        ExchangeCall,
        Info,
        LISTING_TIME_SKEW,
        Taker,
        Target,
        Unfillable,
        chain,
        params::time_window,
    },
    alloy_primitives::{Address, B256, Bytes, U256},
    alloy_sol_types::{SolCall, SolStruct},
    model::{
        ContractKind,
        DomainSeparator,
        ProtocolKind,
        Side,
        eip712::hashed_eip712_message,
        signature::{Signature, SigningScheme},
    },
};

pub mod abi {
    alloy_sol_types::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct Fee {
            uint16 rate;
            address recipient;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Order {
            address trader;
            uint8 side;
            address matchingPolicy;
            address collection;
            uint256 tokenId;
            uint256 amount;
            address paymentToken;
            uint256 price;
            uint256 listingTime;
            uint256 expirationTime;
            Fee[] fees;
            uint256 salt;
            bytes extraParams;
            uint256 nonce;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct OrderInput {
            address trader;
            uint8 side;
            address matchingPolicy;
            address collection;
            uint256 tokenId;
            uint256 amount;
            address paymentToken;
            uint256 price;
            uint256 listingTime;
            uint256 expirationTime;
            Fee[] fees;
            uint256 salt;
            bytes extraParams;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Input {
            OrderInput order;
            uint8 v;
            bytes32 r;
            bytes32 s;
            bytes extraSignature;
            uint8 signatureVersion;
            uint256 blockNumber;
        }

        interface IBlurExchange {
            function execute(Input sell, Input buy) external payable;
            function nonces(address trader) external view returns (uint256);
            function cancelledOrFilled(bytes32 hash) external view returns (bool);
        }
    }
}

pub mod side {
    pub const BUY: u8 = 0;
    pub const SELL: u8 = 1;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub exchange: Address,
    pub order: abi::OrderInput,
    pub nonce: U256,
}

impl Order {
    fn typed(&self) -> abi::Order {
        let o = self.order.clone();
        abi::Order {
            trader: o.trader,
            side: o.side,
            matchingPolicy: o.matchingPolicy,
            collection: o.collection,
            tokenId: o.tokenId,
            amount: o.amount,
            paymentToken: o.paymentToken,
            price: o.price,
            listingTime: o.listingTime,
            expirationTime: o.expirationTime,
            fees: o.fees,
            salt: o.salt,
            extraParams: o.extraParams,
            nonce: self.nonce,
        }
    }

    fn maker_side(&self) -> Side {
        if self.order.side == side::BUY {
            Side::Buy
        } else {
            Side::Sell
        }
    }
}

fn input(order: abi::OrderInput, signature: Option<&Signature>) -> abi::Input {
    let ecdsa = signature.and_then(Signature::ecdsa);
    abi::Input {
        order,
        v: ecdsa.map(|s| s.v).unwrap_or_default(),
        r: ecdsa.map(|s| s.r).unwrap_or_default(),
        s: ecdsa.map(|s| s.s).unwrap_or_default(),
        extraSignature: Bytes::new(),
        signatureVersion: 0,
        blockNumber: U256::ZERO,
    }
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Blur;
    /// The taker's own order, sent by the taker and therefore unsigned.
    type Matching = abi::OrderInput;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.blur, Self::KIND)?;
        let Target::Token(token_id) = params.target else {
            return Err(Error::params("blur orders are for single tokens"));
        };
        if params.contract_kind != ContractKind::Erc721 {
            return Err(Error::params("blur trades ERC721 tokens"));
        }
        let fees = params
            .fee_bps()?
            .into_iter()
            .map(|(recipient, rate)| abi::Fee { rate, recipient })
            .collect();
        Ok(Self {
            exchange: deployment.exchange,
            order: abi::OrderInput {
                trader: params.maker,
                side: match params.side {
                    Side::Buy => side::BUY,
                    Side::Sell => side::SELL,
                },
                matchingPolicy: deployment.policy_erc721,
                collection: params.contract,
                tokenId: token_id,
                amount: U256::from(1),
                paymentToken: params.payment_token,
                price: params.price,
                listingTime: U256::from(params.listing_time()),
                expirationTime: U256::from(params.expiration_time.unwrap_or_default()),
                fees,
                salt: params.salt(),
                extraParams: Bytes::new(),
            },
            nonce: params.nonce(),
        })
    }

    fn info(&self, _: &Config) -> Info {
        Info {
            kind: Self::KIND,
            maker: self.order.trader,
            side: self.maker_side(),
            contract_kind: ContractKind::Erc721,
            contract: self.order.collection,
            criteria: Criteria::Token(self.order.tokenId),
            payment_token: self.order.paymentToken,
            price: self.order.price,
            amount: self.order.amount,
            expiration_time: u64::try_from(self.order.expirationTime).unwrap_or(u64::MAX),
        }
    }

    /// The exchange tracks cancellations and fills by the struct hash.
    fn hash(&self, _: &Config) -> B256 {
        self.typed().eip712_hash_struct()
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        let domain = DomainSeparator::new("Blur Exchange", "1.0", config.chain_id, self.exchange);
        hashed_eip712_message(&domain, &self.typed().eip712_hash_struct())
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::Eip712
    }

    fn build_matching(&self, taker: &Taker, _: &Config) -> Result<abi::OrderInput, Error> {
        taker.check_amount(self.order.amount)?;
        Ok(abi::OrderInput {
            trader: taker.address,
            side: match self.maker_side() {
                Side::Buy => side::SELL,
                Side::Sell => side::BUY,
            },
            listingTime: U256::from(taker.timestamp.saturating_sub(LISTING_TIME_SKEW)),
            expirationTime: U256::ZERO,
            fees: Vec::new(),
            salt: U256::ZERO,
            ..self.order.clone()
        })
    }

    fn fill(
        &self,
        signature: &Signature,
        matching: &abi::OrderInput,
        _: &Config,
    ) -> Result<ExchangeCall, Error> {
        if signature.ecdsa().is_none() {
            return Err(Error::InvalidOrder("missing ECDSA signature".to_string()));
        }
        let maker = input(self.order.clone(), Some(signature));
        let taker = input(matching.clone(), None);
        let (sell, buy) = match self.maker_side() {
            Side::Sell => (maker, taker),
            Side::Buy => (taker, maker),
        };
        let value = if self.maker_side() == Side::Sell && self.order.paymentToken.is_zero() {
            self.order.price
        } else {
            U256::ZERO
        };
        Ok(ExchangeCall {
            to: self.exchange,
            data: abi::IBlurExchange::executeCall { sell, buy }
                .abi_encode()
                .into(),
            value,
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let deployment = config
            .blur
            .as_ref()
            .ok_or_else(|| Unfillable::State("blur is not deployed".to_string()))?;
        let info = self.info(config);
        time_window(
            state.timestamp(),
            u64::try_from(self.order.listingTime).unwrap_or(u64::MAX),
            info.expiration_time,
        )?;
        let nonce = chain::view(
            state,
            self.exchange,
            abi::IBlurExchange::noncesCall {
                trader: self.order.trader,
            },
        )?;
        if nonce != self.nonce {
            return Err(Unfillable::NonceMismatch);
        }
        let hash = self.hash(config);
        if chain::view(
            state,
            self.exchange,
            abi::IBlurExchange::cancelledOrFilledCall { hash },
        )? {
            return Err(Unfillable::Cancelled);
        }
        chain::maker_side(
            state,
            &info,
            self.order.tokenId,
            deployment.execution_delegate,
            deployment.execution_delegate,
        )
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            BuildParams,
            chain::testing::Scripted,
            testing::{nft, signer},
        },
        alloy_sol_types::SolValue,
        number::units::EthUnit,
    };

    fn listing(config: &Config) -> crate::Order {
        let params = BuildParams::listing(
            signer(1).address(),
            ContractKind::Erc721,
            nft(),
            U256::from(77),
            1.0.eth(),
        )
        .with_fees(vec![fee::Fee::bps(Address::repeat_byte(9), 50)]);
        crate::Order::build(ProtocolKind::Blur, &params, config)
            .unwrap()
            .signed(&signer(1), config)
            .unwrap()
    }

    #[test]
    fn nonce_is_signed_but_not_sent() {
        let config = Config::mainnet();
        let order = listing(&config);
        order.verify_signature(&config).unwrap();
        let crate::Raw::Blur(blur) = &order.raw else {
            unreachable!()
        };
        assert_eq!(
            blur.order.fees,
            vec![abi::Fee {
                rate: 50,
                recipient: Address::repeat_byte(9)
            }]
        );
        let mut bumped = blur.clone();
        bumped.nonce = U256::from(1);
        assert_ne!(bumped.hash(&config), order.hash(&config));
    }

    #[test]
    fn executes_against_an_unsigned_buy() {
        let config = Config::mainnet();
        let order = listing(&config);
        let taker = Taker::new(Address::repeat_byte(5)).at(1_000);
        let call = order.fill(&taker, &config).unwrap();
        assert_eq!(call.value, 1.0.eth());
        let decoded = abi::IBlurExchange::executeCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.buy.order.trader, taker.address);
        assert_eq!(decoded.buy.order.side, side::BUY);
        assert_eq!(decoded.buy.order.listingTime, U256::from(940));
        assert_eq!(decoded.buy.v, 0);
        assert_eq!(decoded.sell.order.trader, signer(1).address());
        assert_ne!(decoded.sell.v, 0);
    }

    #[test]
    fn rejects_collection_bids() {
        let config = Config::mainnet();
        let params = BuildParams::bid(
            signer(2).address(),
            ContractKind::Erc721,
            nft(),
            Target::Collection,
            config.weth,
            1.0.eth(),
        );
        assert!(crate::Order::build(ProtocolKind::Blur, &params, &config).is_err());
    }

    #[test]
    fn cancelled_orders_are_unfillable() {
        let config = Config::mainnet();
        let order = listing(&config);
        let exchange = config.blur.as_ref().unwrap().exchange;
        let state = Scripted::at(u64::MAX / 2)
            .on(
                exchange,
                abi::IBlurExchange::noncesCall {
                    trader: signer(1).address(),
                },
                U256::ZERO.abi_encode(),
            )
            .on(
                exchange,
                abi::IBlurExchange::cancelledOrFilledCall {
                    hash: order.hash(&config),
                },
                true.abi_encode(),
            );
        assert_eq!(
            order.check_fillability(&state, &config),
            Err(Unfillable::Cancelled)
        );
    }
}
