//! Forward bids.
//!
//! Forward only knows bids, paid in WETH at a price per unit. Criteria bids
//! commit to a Merkle root of token ids, the zero root accepting any token of
//! the collection.

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
    alloy_primitives::{Address, B256, U256},
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
        struct Order {
            uint8 itemKind;
            address maker;
            address token;
            uint256 identifierOrCriteria;
            uint256 unitPrice;
            uint128 amount;
            uint256 salt;
            uint256 expiration;
            uint256 counter;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct FillDetails {
            Order order;
            bytes signature;
            uint128 fillAmount;
        }

        interface IForward {
            function fillBid(FillDetails details) external;
            function fillBidWithCriteria(
                FillDetails details,
                uint256 tokenId,
                bytes32[] criteriaProof
            ) external;
            function counters(address maker) external view returns (uint256);
            function orderStatuses(bytes32 orderHash)
                external
                view
                returns (bool cancelled, uint128 filledAmount);
        }
    }
}

pub mod item_kind {
    pub const ERC721: u8 = 0;
    pub const ERC1155: u8 = 1;
    pub const ERC721_WITH_CRITERIA: u8 = 2;
    pub const ERC1155_WITH_CRITERIA: u8 = 3;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub exchange: Address,
    pub order: abi::Order,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matching {
    pub token_id: U256,
    pub amount: u128,
    /// Set for criteria bids, empty for the zero root.
    pub proof: Option<Vec<B256>>,
}

impl Order {
    fn contract_kind(&self) -> ContractKind {
        match self.order.itemKind {
            item_kind::ERC1155 | item_kind::ERC1155_WITH_CRITERIA => ContractKind::Erc1155,
            _ => ContractKind::Erc721,
        }
    }

    fn has_criteria(&self) -> bool {
        matches!(
            self.order.itemKind,
            item_kind::ERC721_WITH_CRITERIA | item_kind::ERC1155_WITH_CRITERIA
        )
    }
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Forward;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.forward, Self::KIND)?;
        if params.side != Side::Buy {
            return Err(Error::Unsupported {
                kind: Self::KIND,
                operation: "listings",
            });
        }
        if params.payment_token != config.weth {
            return Err(Error::params("forward bids are paid in WETH"));
        }
        if !params.fees.is_empty() {
            return Err(Error::params("forward bids carry no fees"));
        }
        let amount = u128::try_from(params.amount)
            .map_err(|_| Error::params("amount does not fit 128 bits"))?;
        let unit_price = params.price / params.amount;
        if unit_price * params.amount != params.price {
            return Err(Error::params("price is not a whole multiple of the amount"));
        }
        let erc721 = params.contract_kind == ContractKind::Erc721;
        let (item_kind, identifier) = match &params.target {
            Target::Token(id) if erc721 => (item_kind::ERC721, *id),
            Target::Token(id) => (item_kind::ERC1155, *id),
            Target::Collection if erc721 => (item_kind::ERC721_WITH_CRITERIA, U256::ZERO),
            Target::Collection => (item_kind::ERC1155_WITH_CRITERIA, U256::ZERO),
            Target::TokenList(ids) => {
                let root = U256::from_be_bytes(merkle::root(ids.iter().copied()).0);
                let kind = if erc721 {
                    item_kind::ERC721_WITH_CRITERIA
                } else {
                    item_kind::ERC1155_WITH_CRITERIA
                };
                (kind, root)
            }
            _ => return Err(Error::params("forward criteria use merkle roots")),
        };
        Ok(Self {
            exchange: deployment.exchange,
            order: abi::Order {
                itemKind: item_kind,
                maker: params.maker,
                token: params.contract,
                identifierOrCriteria: identifier,
                unitPrice: unit_price,
                amount,
                salt: params.salt(),
                expiration: U256::from(params.expiration_time.unwrap_or_default()),
                counter: params.nonce(),
            },
        })
    }

    fn info(&self, config: &Config) -> Info {
        let identifier = self.order.identifierOrCriteria;
        let criteria = match (self.has_criteria(), identifier.is_zero()) {
            (false, _) => Criteria::Token(identifier),
            (true, true) => Criteria::Collection,
            (true, false) => Criteria::MerkleRoot(B256::from(identifier.to_be_bytes::<32>())),
        };
        let amount = U256::from(self.order.amount);
        Info {
            kind: Self::KIND,
            maker: self.order.maker,
            side: Side::Buy,
            contract_kind: self.contract_kind(),
            contract: self.order.token,
            criteria,
            payment_token: config.weth,
            price: self.order.unitPrice * amount,
            amount,
            expiration_time: u64::try_from(self.order.expiration).unwrap_or(u64::MAX),
        }
    }

    /// The exchange tracks order statuses by the struct hash.
    fn hash(&self, _: &Config) -> B256 {
        self.order.eip712_hash_struct()
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        let domain = DomainSeparator::new("Forward", "1.0", config.chain_id, self.exchange);
        hashed_eip712_message(&domain, &self.order.eip712_hash_struct())
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::Eip712
    }

    fn build_matching(&self, taker: &Taker, config: &Config) -> Result<Matching, Error> {
        let info = self.info(config);
        taker.check_amount(info.amount)?;
        let amount = u128::try_from(taker.amount)
            .map_err(|_| Error::params("amount does not fit 128 bits"))?;
        let token_id = taker.resolve(&info.criteria)?;
        let proof = match info.criteria {
            Criteria::MerkleRoot(root) => Some(taker.proof(root, token_id)?),
            Criteria::Collection => Some(Vec::new()),
            _ => None,
        };
        Ok(Matching {
            token_id,
            amount,
            proof,
        })
    }

    fn fill(
        &self,
        signature: &Signature,
        matching: &Matching,
        _: &Config,
    ) -> Result<ExchangeCall, Error> {
        let ecdsa = signature
            .ecdsa()
            .ok_or_else(|| Error::InvalidOrder("missing ECDSA signature".to_string()))?;
        let details = abi::FillDetails {
            order: self.order.clone(),
            signature: ecdsa.to_bytes().to_vec().into(),
            fillAmount: matching.amount,
        };
        let data = match &matching.proof {
            None => abi::IForward::fillBidCall { details }.abi_encode(),
            Some(proof) => abi::IForward::fillBidWithCriteriaCall {
                details,
                tokenId: matching.token_id,
                criteriaProof: proof.clone(),
            }
            .abi_encode(),
        };
        Ok(ExchangeCall {
            to: self.exchange,
            data: data.into(),
            value: U256::ZERO,
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let info = self.info(config);
        time_window(state.timestamp(), 0, info.expiration_time)?;
        let counter = chain::view(
            state,
            self.exchange,
            abi::IForward::countersCall {
                maker: self.order.maker,
            },
        )?;
        if counter != self.order.counter {
            return Err(Unfillable::NonceMismatch);
        }
        let status = chain::view(
            state,
            self.exchange,
            abi::IForward::orderStatusesCall {
                orderHash: self.hash(config),
            },
        )?;
        if status.cancelled {
            return Err(Unfillable::Cancelled);
        }
        if status.filledAmount >= self.order.amount {
            return Err(Unfillable::Filled);
        }
        let remaining = U256::from(self.order.amount - status.filledAmount);
        chain::funded(
            state,
            info.payment_token,
            info.maker,
            self.exchange,
            self.order.unitPrice * remaining,
        )
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            BuildParams,
            config,
            testing::{nft, signer},
        },
        number::units::EthUnit,
    };

    fn config() -> Config {
        Config {
            forward: Some(config::Forward {
                exchange: Address::repeat_byte(0xf0),
            }),
            ..Config::mainnet()
        }
    }

    #[test]
    fn rejects_listings_and_fees() {
        let config = config();
        let listing = BuildParams::listing(
            signer(1).address(),
            ContractKind::Erc721,
            nft(),
            U256::from(1),
            1.0.eth(),
        );
        assert!(matches!(
            crate::Order::build(ProtocolKind::Forward, &listing, &config),
            Err(Error::Unsupported { .. })
        ));

        let bid = BuildParams::bid(
            signer(2).address(),
            ContractKind::Erc721,
            nft(),
            Target::Token(U256::from(1)),
            config.weth,
            1.0.eth(),
        )
        .with_fees(vec![fee::Fee::bps(Address::repeat_byte(9), 100)]);
        assert!(crate::Order::build(ProtocolKind::Forward, &bid, &config).is_err());
    }

    #[test]
    fn criteria_bid_fills_with_a_proof() {
        let config = config();
        let ids = vec![U256::from(4), U256::from(8), U256::from(15)];
        let params = BuildParams::bid(
            signer(2).address(),
            ContractKind::Erc1155,
            nft(),
            Target::TokenList(ids.clone()),
            config.weth,
            3.0.eth(),
        )
        .with_amount(U256::from(3));
        let order = crate::Order::build(ProtocolKind::Forward, &params, &config)
            .unwrap()
            .signed(&signer(2), &config)
            .unwrap();
        order.verify_signature(&config).unwrap();
        let info = order.info(&config);
        assert_eq!(info.unit_price(), 1.0.eth());
        let root = merkle::root(ids.iter().copied());
        assert_eq!(info.criteria, Criteria::MerkleRoot(root));

        let taker = Taker::new(Address::repeat_byte(5))
            .with_token_id(U256::from(8))
            .with_amount(U256::from(2))
            .with_criteria(ids);
        let call = order.fill(&taker, &config).unwrap();
        let decoded = abi::IForward::fillBidWithCriteriaCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.details.fillAmount, 2);
        assert!(merkle::verify(
            root,
            U256::from(8),
            &decoded.criteriaProof,
            2
        ));

        let greedy = taker.with_amount(U256::from(4));
        assert!(matches!(
            order.fill(&greedy, &config),
            Err(Error::PartialFillShortfall { .. })
        ));
    }
}
