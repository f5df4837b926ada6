//! Rarible ExchangeV2 orders.
//!
//! An order swaps a make asset for a take asset. Listings make an NFT and
//! take the payment, bids the other way around. Takers fill an order by
//! matching it with their own right-hand order, which needs no signature as
//! long as its maker sends the transaction.
//!
//! The same core serves Universe, a fork that only differs in the order data
//! it understands, see [`universe`](crate::universe).

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
        config,
        params::time_window,
    },
    alloy_primitives::{Address, B256, Bytes, FixedBytes, U256, Uint, keccak256},
    alloy_sol_types::{SolCall, SolStruct, SolValue},
    model::{
        ContractKind,
        DomainSeparator,
        ProtocolKind,
        Side,
        eip712::hashed_eip712_message,
        signature::{Signature, SigningScheme},
    },
    number::math::BPS_DENOMINATOR,
    std::sync::LazyLock,
};

pub mod abi {
    alloy_sol_types::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct AssetType {
            bytes4 assetClass;
            bytes data;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Asset {
            AssetType assetType;
            uint256 value;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Order {
            address maker;
            Asset makeAsset;
            address taker;
            Asset takeAsset;
            uint256 salt;
            uint256 start;
            uint256 end;
            bytes4 dataType;
            bytes data;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Part {
            address account;
            uint96 value;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct DataV1 {
            Part[] payouts;
            Part[] originFees;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct DataV2 {
            Part[] payouts;
            Part[] originFees;
            bool isMakeFill;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct OrderData {
            Part[] revenueSplits;
        }

        interface IExchangeV2 {
            function matchOrders(
                Order orderLeft,
                bytes signatureLeft,
                Order orderRight,
                bytes signatureRight
            ) external payable;
            function cancel(Order order) external;
            function fills(bytes32 hashKey) external view returns (uint256);
        }
    }
}

fn class(name: &str) -> FixedBytes<4> {
    FixedBytes::from_slice(&keccak256(name.as_bytes())[..4])
}

/// Asset class identifiers, the first four bytes of the class name's hash.
pub mod asset_class {
    use super::*;

    pub static ETH: LazyLock<FixedBytes<4>> = LazyLock::new(|| class("ETH"));
    pub static ERC20: LazyLock<FixedBytes<4>> = LazyLock::new(|| class("ERC20"));
    pub static ERC721: LazyLock<FixedBytes<4>> = LazyLock::new(|| class("ERC721"));
    pub static ERC1155: LazyLock<FixedBytes<4>> = LazyLock::new(|| class("ERC1155"));
    /// Any token of an ERC721 collection.
    pub static COLLECTION: LazyLock<FixedBytes<4>> = LazyLock::new(|| class("COLLECTION"));
}

/// Order data formats the exchanges understand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Data {
    V1 {
        payouts: Vec<(Address, u16)>,
        origin_fees: Vec<(Address, u16)>,
    },
    V2 {
        payouts: Vec<(Address, u16)>,
        origin_fees: Vec<(Address, u16)>,
        is_make_fill: bool,
    },
    /// Universe's revenue splits, paid out of the seller's proceeds.
    Universe { revenue_splits: Vec<(Address, u16)> },
}

impl Data {
    pub fn data_type(&self) -> FixedBytes<4> {
        match self {
            Data::V1 { .. } => class("V1"),
            Data::V2 { .. } => class("V2"),
            Data::Universe { .. } => class("ORDER_DATA"),
        }
    }

    pub fn encode(&self) -> Bytes {
        let parts = |parts: &[(Address, u16)]| {
            parts
                .iter()
                .map(|(account, value)| abi::Part {
                    account: *account,
                    value: Uint::<96, 2>::from(*value),
                })
                .collect::<Vec<_>>()
        };
        match self {
            Data::V1 {
                payouts,
                origin_fees,
            } => abi::DataV1 {
                payouts: parts(payouts),
                originFees: parts(origin_fees),
            }
            .abi_encode(),
            Data::V2 {
                payouts,
                origin_fees,
                is_make_fill,
            } => abi::DataV2 {
                payouts: parts(payouts),
                originFees: parts(origin_fees),
                isMakeFill: *is_make_fill,
            }
            .abi_encode(),
            Data::Universe { revenue_splits } => abi::OrderData {
                revenueSplits: parts(revenue_splits),
            }
            .abi_encode(),
        }
        .into()
    }
}

fn nft_asset(kind: ContractKind, contract: Address, id: U256, value: U256) -> abi::Asset {
    let class = match kind {
        ContractKind::Erc721 => *asset_class::ERC721,
        ContractKind::Erc1155 => *asset_class::ERC1155,
    };
    abi::Asset {
        assetType: abi::AssetType {
            assetClass: class,
            data: (contract, id).abi_encode().into(),
        },
        value,
    }
}

fn payment_asset(token: Address, value: U256) -> abi::Asset {
    let asset_type = if token.is_zero() {
        abi::AssetType {
            assetClass: *asset_class::ETH,
            data: Bytes::new(),
        }
    } else {
        abi::AssetType {
            assetClass: *asset_class::ERC20,
            data: token.abi_encode().into(),
        }
    };
    abi::Asset {
        assetType: asset_type,
        value,
    }
}

/// What an asset type denotes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    Payment(Address),
    Nft(ContractKind, Address, U256),
    Collection(Address),
}

fn kind(asset_type: &abi::AssetType) -> Option<Kind> {
    let class = asset_type.assetClass;
    let data = &asset_type.data;
    if class == *asset_class::ETH {
        Some(Kind::Payment(Address::ZERO))
    } else if class == *asset_class::ERC20 {
        Address::abi_decode(data).ok().map(Kind::Payment)
    } else if class == *asset_class::COLLECTION {
        Address::abi_decode(data).ok().map(Kind::Collection)
    } else {
        let kind = if class == *asset_class::ERC721 {
            ContractKind::Erc721
        } else if class == *asset_class::ERC1155 {
            ContractKind::Erc1155
        } else {
            return None;
        };
        let (contract, id) = <(Address, U256)>::abi_decode_params(data).ok()?;
        Some(Kind::Nft(kind, contract, id))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub exchange: Address,
    pub order: abi::Order,
}

/// The taker's right-hand order and the value sent along with the match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matching {
    pub order: abi::Order,
    pub value: U256,
}

impl Order {
    /// Builds an order for a Rarible style exchange with order data derived
    /// from the fees.
    pub(crate) fn build_with(
        params: &crate::BuildParams,
        deployment: &config::Rarible,
        data: impl FnOnce(Vec<(Address, u16)>) -> Data,
    ) -> Result<Self, Error> {
        let fees = params.fee_bps()?;
        let nft = match (params.side, &params.target) {
            (_, Target::Token(id)) => {
                nft_asset(params.contract_kind, params.contract, *id, params.amount)
            }
            (Side::Buy, Target::Collection) if params.contract_kind == ContractKind::Erc721 => {
                abi::Asset {
                    assetType: abi::AssetType {
                        assetClass: *asset_class::COLLECTION,
                        data: params.contract.abi_encode().into(),
                    },
                    value: params.amount,
                }
            }
            (Side::Sell, _) => return Err(Error::params("rarible lists single tokens")),
            _ => return Err(Error::params("rarible bids are for a token or an ERC721 collection")),
        };
        let payment = payment_asset(params.payment_token, params.price);
        let (make_asset, take_asset) = match params.side {
            Side::Sell => (nft, payment),
            Side::Buy => (payment, nft),
        };
        let data = data(fees);
        Ok(Self {
            exchange: deployment.exchange,
            order: abi::Order {
                maker: params.maker,
                makeAsset: make_asset,
                taker: Address::ZERO,
                takeAsset: take_asset,
                salt: params.salt(),
                start: U256::from(params.listing_time()),
                end: U256::from(params.expiration_time.unwrap_or_default()),
                dataType: data.data_type(),
                data: data.encode(),
            },
        })
    }

    fn side(&self) -> Side {
        match kind(&self.order.makeAsset.assetType) {
            Some(Kind::Payment(_)) => Side::Buy,
            _ => Side::Sell,
        }
    }

    pub(crate) fn info_as(&self, protocol: ProtocolKind) -> Info {
        let side = self.side();
        let (nft, payment) = match side {
            Side::Sell => (&self.order.makeAsset, &self.order.takeAsset),
            Side::Buy => (&self.order.takeAsset, &self.order.makeAsset),
        };
        let (contract_kind, contract, criteria) = match kind(&nft.assetType) {
            Some(Kind::Nft(kind, contract, id)) => (kind, contract, Criteria::Token(id)),
            Some(Kind::Collection(contract)) => {
                (ContractKind::Erc721, contract, Criteria::Collection)
            }
            _ => (ContractKind::Erc721, Address::ZERO, Criteria::Collection),
        };
        let payment_token = match kind(&payment.assetType) {
            Some(Kind::Payment(token)) => token,
            _ => Address::ZERO,
        };
        Info {
            kind: protocol,
            maker: self.order.maker,
            side,
            contract_kind,
            contract,
            criteria,
            payment_token,
            price: payment.value,
            amount: nft.value,
            expiration_time: u64::try_from(self.order.end).unwrap_or(u64::MAX),
        }
    }

    /// The key the exchange tracks fills under. Only V2 data is part of it.
    pub fn hash_key(&self) -> B256 {
        let order = &self.order;
        let make = order.makeAsset.assetType.eip712_hash_struct();
        let take = order.takeAsset.assetType.eip712_hash_struct();
        let encoded = if order.dataType == class("V2") {
            (order.maker, make, take, order.salt, order.data.clone()).abi_encode_params()
        } else {
            (order.maker, make, take, order.salt).abi_encode()
        };
        keccak256(encoded)
    }

    pub(crate) fn digest(&self, chain_id: u64) -> B256 {
        let domain = DomainSeparator::new("Exchange", "2", chain_id, self.exchange);
        hashed_eip712_message(&domain, &self.order.eip712_hash_struct())
    }

    /// Builds the right-hand order filling `taker.amount` units.
    pub(crate) fn counter(
        &self,
        taker: &Taker,
        protocol: ProtocolKind,
        data: Data,
    ) -> Result<Matching, Error> {
        let info = self.info_as(protocol);
        taker.check_amount(info.amount)?;
        let payment = match info.side {
            Side::Sell => &self.order.takeAsset,
            Side::Buy => &self.order.makeAsset,
        };
        let paid = payment.value * taker.amount / info.amount;
        if paid * info.amount != payment.value * taker.amount {
            return Err(Error::params("partial fill price is not a whole amount"));
        }
        let payment = abi::Asset {
            assetType: payment.assetType.clone(),
            value: paid,
        };
        let (make_asset, take_asset) = match info.side {
            Side::Sell => {
                let nft = abi::Asset {
                    assetType: self.order.makeAsset.assetType.clone(),
                    value: taker.amount,
                };
                (payment, nft)
            }
            Side::Buy => {
                let id = taker.resolve(&info.criteria)?;
                let nft = nft_asset(info.contract_kind, info.contract, id, taker.amount);
                (nft, payment)
            }
        };
        let value = match kind(&make_asset.assetType) {
            Some(Kind::Payment(token)) if token.is_zero() => make_asset.value,
            _ => U256::ZERO,
        };
        Ok(Matching {
            order: abi::Order {
                maker: taker.address,
                makeAsset: make_asset,
                taker: Address::ZERO,
                takeAsset: take_asset,
                salt: U256::ZERO,
                start: U256::ZERO,
                end: U256::ZERO,
                dataType: data.data_type(),
                data: data.encode(),
            },
            value,
        })
    }

    pub(crate) fn match_orders(
        &self,
        signature: &Signature,
        matching: &Matching,
    ) -> Result<ExchangeCall, Error> {
        let ecdsa = signature
            .ecdsa()
            .ok_or_else(|| Error::InvalidOrder("missing ECDSA signature".to_string()))?;
        let data = abi::IExchangeV2::matchOrdersCall {
            orderLeft: self.order.clone(),
            signatureLeft: ecdsa.to_bytes().to_vec().into(),
            orderRight: matching.order.clone(),
            signatureRight: Bytes::new(),
        }
        .abi_encode();
        Ok(ExchangeCall {
            to: self.exchange,
            data: data.into(),
            value: matching.value,
        })
    }

    pub(crate) fn check_with(
        &self,
        state: &dyn ChainState,
        deployment: &config::Rarible,
        info: &Info,
    ) -> Result<(), Unfillable> {
        time_window(
            state.timestamp(),
            u64::try_from(self.order.start).unwrap_or(u64::MAX),
            info.expiration_time,
        )?;
        let filled = chain::view(
            state,
            self.exchange,
            abi::IExchangeV2::fillsCall {
                hashKey: self.hash_key(),
            },
        )?;
        if filled >= self.order.takeAsset.value {
            return Err(Unfillable::Filled);
        }
        let token_id = match &info.criteria {
            Criteria::Token(id) => *id,
            _ => U256::ZERO,
        };
        chain::maker_side(
            state,
            info,
            token_id,
            deployment.nft_transfer_proxy,
            deployment.erc20_transfer_proxy,
        )
    }
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Rarible;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.rarible, Self::KIND)?;
        Self::build_with(params, deployment, |origin_fees| Data::V2 {
            payouts: Vec::new(),
            origin_fees,
            is_make_fill: false,
        })
    }

    fn info(&self, _: &Config) -> Info {
        self.info_as(Self::KIND)
    }

    fn hash(&self, _: &Config) -> B256 {
        self.hash_key()
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        self.digest(config.chain_id)
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::Eip712
    }

    fn build_matching(&self, taker: &Taker, _: &Config) -> Result<Matching, Error> {
        let bps = u16::try_from(BPS_DENOMINATOR).unwrap_or(u16::MAX);
        self.counter(
            taker,
            Self::KIND,
            Data::V2 {
                payouts: vec![(taker.recipient, bps)],
                origin_fees: Vec::new(),
                is_make_fill: false,
            },
        )
    }

    fn fill(
        &self,
        signature: &Signature,
        matching: &Matching,
        _: &Config,
    ) -> Result<ExchangeCall, Error> {
        self.match_orders(signature, matching)
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let deployment = config
            .rarible
            .as_ref()
            .ok_or_else(|| Unfillable::State("rarible is not deployed".to_string()))?;
        self.check_with(state, deployment, &self.info(config))
    }
}
