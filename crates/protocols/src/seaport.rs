//! Seaport (v1.1 - v1.5).
//!
//! Listings offer the NFT and ask for the price minus fees for the offerer
//! plus one consideration item per fee. Bids offer an ERC20 amount and ask
//! for the NFT plus the fees, which the seller pays out of the proceeds.
//! Criteria bids commit to a Merkle root in `identifierOrCriteria`, the zero
//! root accepting any token of the collection.

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
    alloy_primitives::{Address, B256, Bytes, U256, Uint},
    alloy_sol_types::{SolCall, SolStruct, sol},
    model::{
        ContractKind,
        DomainSeparator,
        ProtocolKind,
        Side,
        eip712::hashed_eip712_message,
        signature::{Signature, SigningScheme},
    },
};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct OfferItem {
        uint8 itemType;
        address token;
        uint256 identifierOrCriteria;
        uint256 startAmount;
        uint256 endAmount;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ConsiderationItem {
        uint8 itemType;
        address token;
        uint256 identifierOrCriteria;
        uint256 startAmount;
        uint256 endAmount;
        address recipient;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct OrderComponents {
        address offerer;
        address zone;
        OfferItem[] offer;
        ConsiderationItem[] consideration;
        uint8 orderType;
        uint256 startTime;
        uint256 endTime;
        bytes32 zoneHash;
        uint256 salt;
        bytes32 conduitKey;
        uint256 counter;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct OrderParameters {
        address offerer;
        address zone;
        OfferItem[] offer;
        ConsiderationItem[] consideration;
        uint8 orderType;
        uint256 startTime;
        uint256 endTime;
        bytes32 zoneHash;
        uint256 salt;
        bytes32 conduitKey;
        uint256 totalOriginalConsiderationItems;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct AdvancedOrder {
        OrderParameters parameters;
        uint120 numerator;
        uint120 denominator;
        bytes signature;
        bytes extraData;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct CriteriaResolver {
        uint256 orderIndex;
        uint8 side;
        uint256 index;
        uint256 identifier;
        bytes32[] criteriaProof;
    }

    interface ISeaport {
        function fulfillAdvancedOrder(
            AdvancedOrder advancedOrder,
            CriteriaResolver[] criteriaResolvers,
            bytes32 fulfillerConduitKey,
            address recipient
        ) external payable returns (bool fulfilled);
        function cancel(OrderComponents[] orders) external returns (bool cancelled);
        function incrementCounter() external returns (uint256 newCounter);
        function getCounter(address offerer) external view returns (uint256 counter);
        function getOrderStatus(bytes32 orderHash) external view returns (
            bool isValidated,
            bool isCancelled,
            uint256 totalFilled,
            uint256 totalSize
        );
    }
}

pub mod item {
    pub const NATIVE: u8 = 0;
    pub const ERC20: u8 = 1;
    pub const ERC721: u8 = 2;
    pub const ERC1155: u8 = 3;
    pub const ERC721_WITH_CRITERIA: u8 = 4;
    pub const ERC1155_WITH_CRITERIA: u8 = 5;
}

pub mod order_type {
    pub const FULL_OPEN: u8 = 0;
    pub const PARTIAL_OPEN: u8 = 1;
}

/// Criteria resolvers refer to consideration items with side `1`.
const CONSIDERATION_SIDE: u8 = 1;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub exchange: Address,
    /// EIP-712 domain version of the exchange.
    pub version: String,
    pub components: OrderComponents,
}

#[derive(Clone, Debug)]
pub struct Matching {
    pub numerator: U256,
    pub denominator: U256,
    pub criteria_resolvers: Vec<CriteriaResolver>,
    pub recipient: Address,
    pub conduit_key: B256,
}

fn nft_item_type(kind: ContractKind, criteria: bool) -> u8 {
    match (kind, criteria) {
        (ContractKind::Erc721, false) => item::ERC721,
        (ContractKind::Erc1155, false) => item::ERC1155,
        (ContractKind::Erc721, true) => item::ERC721_WITH_CRITERIA,
        (ContractKind::Erc1155, true) => item::ERC1155_WITH_CRITERIA,
    }
}

fn nft_kind(item_type: u8) -> Option<(ContractKind, bool)> {
    match item_type {
        item::ERC721 => Some((ContractKind::Erc721, false)),
        item::ERC1155 => Some((ContractKind::Erc1155, false)),
        item::ERC721_WITH_CRITERIA => Some((ContractKind::Erc721, true)),
        item::ERC1155_WITH_CRITERIA => Some((ContractKind::Erc1155, true)),
        _ => None,
    }
}

fn payment_item_type(token: Address) -> u8 {
    if token.is_zero() {
        item::NATIVE
    } else {
        item::ERC20
    }
}

fn payment_item(
    item_type: u8,
    token: Address,
    amount: U256,
    recipient: Address,
) -> ConsiderationItem {
    ConsiderationItem {
        itemType: item_type,
        token,
        identifierOrCriteria: U256::ZERO,
        startAmount: amount,
        endAmount: amount,
        recipient,
    }
}

impl Order {
    fn domain(&self, config: &Config) -> DomainSeparator {
        DomainSeparator::new("Seaport", &self.version, config.chain_id, self.exchange)
    }

    fn is_listing(&self) -> bool {
        self.components
            .offer
            .first()
            .is_some_and(|item| nft_kind(item.itemType).is_some())
    }

    fn nft_item(&self) -> Option<(u8, Address, U256, U256)> {
        let item = if self.is_listing() {
            self.components.offer.first().map(|item| {
                (item.itemType, item.token, item.identifierOrCriteria, item.startAmount)
            })
        } else {
            self.components.consideration.first().map(|item| {
                (item.itemType, item.token, item.identifierOrCriteria, item.startAmount)
            })
        };
        item.filter(|(item_type, ..)| nft_kind(*item_type).is_some())
    }

    /// Total of all payment items, the price paid by the buyer.
    fn payment(&self) -> (Address, U256) {
        if self.is_listing() {
            let token = self
                .components
                .consideration
                .first()
                .map(|item| item.token)
                .unwrap_or_default();
            let total = self
                .components
                .consideration
                .iter()
                .map(|item| item.startAmount)
                .sum();
            (token, total)
        } else {
            self.components
                .offer
                .first()
                .map(|item| (item.token, item.startAmount))
                .unwrap_or_default()
        }
    }

    fn parameters(&self) -> OrderParameters {
        let c = &self.components;
        OrderParameters {
            offerer: c.offerer,
            zone: c.zone,
            offer: c.offer.clone(),
            consideration: c.consideration.clone(),
            orderType: c.orderType,
            startTime: c.startTime,
            endTime: c.endTime,
            zoneHash: c.zoneHash,
            salt: c.salt,
            conduitKey: c.conduitKey,
            totalOriginalConsiderationItems: U256::from(c.consideration.len()),
        }
    }

    /// Rebuilds the signed components from the parameters submitted with a
    /// fill and the offerer's counter.
    pub fn components_from(parameters: &OrderParameters, counter: U256) -> OrderComponents {
        OrderComponents {
            offerer: parameters.offerer,
            zone: parameters.zone,
            offer: parameters.offer.clone(),
            consideration: parameters.consideration.clone(),
            orderType: parameters.orderType,
            startTime: parameters.startTime,
            endTime: parameters.endTime,
            zoneHash: parameters.zoneHash,
            salt: parameters.salt,
            conduitKey: parameters.conduitKey,
            counter,
        }
    }
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Seaport;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.seaport, Self::KIND)?;
        params.require_token_listing(Self::KIND)?;

        let (identifier, criteria) = match &params.target {
            Target::Token(id) => (*id, false),
            Target::Collection => (U256::ZERO, true),
            Target::TokenList(ids) => {
                let root = merkle::root(ids.iter().copied());
                (U256::from_be_bytes(root.0), true)
            }
            _ => return Err(Error::params("seaport criteria have to be merkle token lists")),
        };
        let nft = (
            nft_item_type(params.contract_kind, criteria),
            params.contract,
            identifier,
            params.amount,
        );

        let split = params.split()?;
        let (offer, consideration) = match params.side {
            Side::Sell => {
                let payment = payment_item_type(params.payment_token);
                let offer = vec![OfferItem {
                    itemType: nft.0,
                    token: nft.1,
                    identifierOrCriteria: nft.2,
                    startAmount: nft.3,
                    endAmount: nft.3,
                }];
                let consideration = std::iter::once((params.maker, split.net))
                    .chain(split.fees.iter().copied())
                    .map(|(recipient, amount)| {
                        payment_item(payment, params.payment_token, amount, recipient)
                    })
                    .collect();
                (offer, consideration)
            }
            Side::Buy => {
                let offer = vec![OfferItem {
                    itemType: item::ERC20,
                    token: params.payment_token,
                    identifierOrCriteria: U256::ZERO,
                    startAmount: params.price,
                    endAmount: params.price,
                }];
                let consideration = std::iter::once(ConsiderationItem {
                    itemType: nft.0,
                    token: nft.1,
                    identifierOrCriteria: nft.2,
                    startAmount: nft.3,
                    endAmount: nft.3,
                    recipient: params.maker,
                })
                .chain(split.fees.iter().map(|(recipient, amount)| {
                    payment_item(item::ERC20, params.payment_token, *amount, *recipient)
                }))
                .collect();
                (offer, consideration)
            }
        };

        Ok(Self {
            exchange: deployment.exchange,
            version: deployment.version.clone(),
            components: OrderComponents {
                offerer: params.maker,
                zone: Address::ZERO,
                offer,
                consideration,
                orderType: if params.amount > U256::from(1) {
                    order_type::PARTIAL_OPEN
                } else {
                    order_type::FULL_OPEN
                },
                startTime: U256::from(params.listing_time()),
                endTime: params
                    .expiration_time
                    .map(U256::from)
                    .unwrap_or(U256::MAX),
                zoneHash: B256::ZERO,
                salt: params.salt(),
                conduitKey: deployment.conduit_key,
                counter: params.nonce(),
            },
        })
    }

    fn info(&self, _: &Config) -> Info {
        let (item_type, contract, identifier, amount) = self.nft_item().unwrap_or_default();
        let (contract_kind, is_criteria) = nft_kind(item_type).unwrap_or_default();
        let (payment_token, price) = self.payment();
        Info {
            kind: Self::KIND,
            maker: self.components.offerer,
            side: if self.is_listing() { Side::Sell } else { Side::Buy },
            contract_kind,
            contract,
            criteria: match (is_criteria, identifier) {
                (false, id) => Criteria::Token(id),
                (true, root) if root.is_zero() => Criteria::Collection,
                (true, root) => Criteria::MerkleRoot(B256::from(root.to_be_bytes::<32>())),
            },
            payment_token,
            price,
            amount,
            expiration_time: u64::try_from(self.components.endTime).unwrap_or_default(),
        }
    }

    fn hash(&self, _: &Config) -> B256 {
        self.components.eip712_hash_struct()
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        hashed_eip712_message(&self.domain(config), &self.components.eip712_hash_struct())
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::Eip712
    }

    fn build_matching(&self, taker: &Taker, config: &Config) -> Result<Matching, Error> {
        let deployment = Config::require(&config.seaport, Self::KIND)?;
        let info = self.info(config);
        taker.check_amount(info.amount)?;

        let (numerator, denominator) = if self.components.orderType == order_type::PARTIAL_OPEN {
            (taker.amount, info.amount)
        } else if taker.amount != info.amount {
            return Err(Error::params("order does not allow partial fills"));
        } else {
            (U256::from(1), U256::from(1))
        };

        let criteria_resolvers = match &info.criteria {
            Criteria::Token(_) => Vec::new(),
            criteria => {
                if info.side == Side::Sell {
                    return Err(Error::InvalidOrder("criteria listing".to_string()));
                }
                let id = taker.resolve(criteria)?;
                let root = match criteria {
                    Criteria::MerkleRoot(root) => *root,
                    _ => B256::ZERO,
                };
                vec![CriteriaResolver {
                    orderIndex: U256::ZERO,
                    side: CONSIDERATION_SIDE,
                    index: U256::ZERO,
                    identifier: id,
                    criteriaProof: taker.proof(root, id)?,
                }]
            }
        };

        Ok(Matching {
            numerator,
            denominator,
            criteria_resolvers,
            recipient: taker.recipient,
            conduit_key: deployment.conduit_key,
        })
    }

    fn fill(
        &self,
        signature: &Signature,
        matching: &Matching,
        _: &Config,
    ) -> Result<ExchangeCall, Error> {
        let fraction = |value: U256| {
            u128::try_from(value)
                .map(Uint::<120, 2>::from)
                .map_err(|_| Error::params("fill fraction overflows"))
        };
        let (_, price) = self.payment();
        let value = if self.is_listing() && self.payment().0.is_zero() {
            number::math::mul_div(price, matching.numerator, matching.denominator)
                .ok_or_else(|| Error::params("fill fraction overflows"))?
        } else {
            U256::ZERO
        };

        let call = ISeaport::fulfillAdvancedOrderCall {
            advancedOrder: AdvancedOrder {
                parameters: self.parameters(),
                numerator: fraction(matching.numerator)?,
                denominator: fraction(matching.denominator)?,
                signature: signature.to_bytes().into(),
                extraData: Bytes::new(),
            },
            criteriaResolvers: matching.criteria_resolvers.clone(),
            fulfillerConduitKey: matching.conduit_key,
            recipient: matching.recipient,
        };
        Ok(ExchangeCall {
            to: self.exchange,
            data: call.abi_encode().into(),
            value,
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let deployment = config
            .seaport
            .as_ref()
            .ok_or_else(|| Unfillable::State("seaport is not deployed".to_string()))?;
        let info = self.info(config);
        let start = u64::try_from(self.components.startTime).unwrap_or(u64::MAX);
        time_window(state.timestamp(), start, info.expiration_time)?;

        let counter = chain::view(
            state,
            self.exchange,
            ISeaport::getCounterCall {
                offerer: info.maker,
            },
        )?;
        if counter != self.components.counter {
            return Err(Unfillable::NonceMismatch);
        }
        let status = chain::view(
            state,
            self.exchange,
            ISeaport::getOrderStatusCall {
                orderHash: self.hash(config),
            },
        )?;
        if status.isCancelled {
            return Err(Unfillable::Cancelled);
        }
        if !status.totalSize.is_zero() && status.totalFilled >= status.totalSize {
            return Err(Unfillable::Filled);
        }

        let token_id = match info.criteria {
            Criteria::Token(id) => id,
            _ => U256::ZERO,
        };
        chain::maker_side(state, &info, token_id, deployment.conduit, deployment.conduit)
    }
}
