//! ZeroEx V4 NFT orders.
//!
//! The maker receives `erc20TokenAmount`, fees are paid on top by the buyer,
//! so the price of an order is the amount plus all fees. Listings paid in
//! native ETH use the `0xeeee..` sentinel as token. Criteria bids carry
//! token properties checked by validator contracts, see [`properties`].

use {
    crate::{
        Adapter,
        ChainState,
        Config,
        Error,
        ExchangeCall,
        Info,
        Taker,
        Target,
        Unfillable,
        chain,
        config,
        params::time_window,
        properties,
    },
    alloy_primitives::{Address, B256, Bytes, U256},
    alloy_sol_types::{SolCall, SolStruct, sol},
    model::{
        ContractKind,
        DomainSeparator,
        NATIVE_TOKEN_SENTINEL,
        ProtocolKind,
        Side,
        eip712::hashed_eip712_message,
        signature::{Signature, SigningScheme},
    },
    number::math::mul_div_ceil,
};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct Fee {
        address recipient;
        uint256 amount;
        bytes feeData;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Property {
        address propertyValidator;
        bytes propertyData;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ERC721Order {
        uint8 direction;
        address maker;
        address taker;
        uint256 expiry;
        uint256 nonce;
        address erc20Token;
        uint256 erc20TokenAmount;
        Fee[] fees;
        address erc721Token;
        uint256 erc721TokenId;
        Property[] erc721TokenProperties;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ERC1155Order {
        uint8 direction;
        address maker;
        address taker;
        uint256 expiry;
        uint256 nonce;
        address erc20Token;
        uint256 erc20TokenAmount;
        Fee[] fees;
        address erc1155Token;
        uint256 erc1155TokenId;
        Property[] erc1155TokenProperties;
        uint128 erc1155TokenAmount;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SignatureData {
        uint8 signatureType;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct OrderInfo {
        bytes32 orderHash;
        uint8 status;
        uint128 orderAmount;
        uint128 remainingAmount;
    }

    interface IZeroEx {
        function buyERC721(
            ERC721Order sellOrder,
            SignatureData signature,
            bytes callbackData
        ) external payable;
        function sellERC721(
            ERC721Order buyOrder,
            SignatureData signature,
            uint256 erc721TokenId,
            bool unwrapNativeToken,
            bytes callbackData
        ) external;
        function buyERC1155(
            ERC1155Order sellOrder,
            SignatureData signature,
            uint128 erc1155BuyAmount,
            bytes callbackData
        ) external payable;
        function sellERC1155(
            ERC1155Order buyOrder,
            SignatureData signature,
            uint256 erc1155TokenId,
            uint128 erc1155SellAmount,
            bool unwrapNativeToken,
            bytes callbackData
        ) external;
        function cancelERC721Order(uint256 orderNonce) external;
        function getERC721OrderStatus(ERC721Order order) external view returns (uint8);
        function getERC1155OrderInfo(ERC1155Order order) external view returns (OrderInfo);
    }
}

pub mod direction {
    pub const SELL: u8 = 0;
    pub const BUY: u8 = 1;
}

/// Order status as reported by the exchange.
pub mod status {
    pub const INVALID: u8 = 0;
    pub const FILLABLE: u8 = 1;
    pub const UNFILLABLE: u8 = 2;
    pub const EXPIRED: u8 = 3;
}

/// `LibSignature.SignatureType.EIP712`.
pub const SIGNATURE_TYPE_EIP712: u8 = 2;

/// Terms shared by all ZeroEx V4 style orders.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Terms {
    pub side: Side,
    pub maker: Address,
    pub taker: Address,
    pub expiry: U256,
    pub nonce: U256,
    pub erc20_token: Address,
    pub erc20_token_amount: U256,
    pub fees: Vec<(Address, U256)>,
    pub contract_kind: ContractKind,
    pub nft: Address,
    pub nft_id: U256,
    pub properties: Vec<properties::Property>,
    /// Offered units, one for ERC721.
    pub amount: U256,
}

impl Terms {
    pub(crate) fn build(
        params: &crate::BuildParams,
        deployment: &config::ZeroEx,
    ) -> Result<Self, Error> {
        let properties = properties::for_target(&params.target, deployment)?;
        let split = params.split()?;
        Ok(Self {
            side: params.side,
            maker: params.maker,
            taker: Address::ZERO,
            expiry: U256::from(params.expiration_time.unwrap_or(u64::MAX)),
            nonce: params.nonce.unwrap_or_else(crate::random_salt),
            erc20_token: if params.payment_token.is_zero() {
                NATIVE_TOKEN_SENTINEL
            } else {
                params.payment_token
            },
            erc20_token_amount: split.net,
            fees: split.fees,
            contract_kind: params.contract_kind,
            nft: params.contract,
            nft_id: params.target.token_id().unwrap_or_default(),
            properties,
            amount: params.amount,
        })
    }

    pub fn price(&self) -> U256 {
        self.fees
            .iter()
            .fold(self.erc20_token_amount, |total, (_, fee)| total + *fee)
    }

    pub fn is_native(&self) -> bool {
        self.erc20_token == NATIVE_TOKEN_SENTINEL
    }

    pub(crate) fn info(&self, kind: ProtocolKind, deployment: Option<&config::ZeroEx>) -> Info {
        let expiry = u64::try_from(self.expiry).unwrap_or_default();
        Info {
            kind,
            maker: self.maker,
            side: self.side,
            contract_kind: self.contract_kind,
            contract: self.nft,
            criteria: match deployment {
                Some(deployment) => {
                    properties::criteria(self.nft_id, &self.properties, deployment)
                }
                None if self.properties.is_empty() => crate::Criteria::Token(self.nft_id),
                None => crate::Criteria::Collection,
            },
            payment_token: if self.is_native() {
                Address::ZERO
            } else {
                self.erc20_token
            },
            price: self.price(),
            amount: self.amount,
            expiration_time: if expiry == u64::MAX { 0 } else { expiry },
        }
    }

    pub(crate) fn direction(&self) -> u8 {
        match self.side {
            Side::Sell => direction::SELL,
            Side::Buy => direction::BUY,
        }
    }

    pub(crate) fn sol_fees(&self) -> Vec<Fee> {
        self.fees
            .iter()
            .map(|(recipient, amount)| Fee {
                recipient: *recipient,
                amount: *amount,
                feeData: Bytes::new(),
            })
            .collect()
    }

    pub(crate) fn sol_properties(&self) -> Vec<self::Property> {
        self.properties
            .iter()
            .map(|property| self::Property {
                propertyValidator: property.validator,
                propertyData: property.data.clone(),
            })
            .collect()
    }

    pub(crate) fn amount_u128(&self) -> u128 {
        u128::try_from(self.amount).unwrap_or(u128::MAX)
    }

    /// Native value needed to buy `amount` units, each component rounded up
    /// the way the exchange prorates partial fills of ERC1155 sell orders.
    pub(crate) fn buy_value(&self, amount: U256) -> Result<U256, Error> {
        if !self.is_native() || self.side != Side::Sell {
            return Ok(U256::ZERO);
        }
        if amount == self.amount {
            return Ok(self.price());
        }
        let prorate = |value: U256| {
            mul_div_ceil(value, amount, self.amount).ok_or(Error::Fee(fee::Error::Overflow))
        };
        self.fees
            .iter()
            .try_fold(prorate(self.erc20_token_amount)?, |total, (_, fee)| {
                Ok(total + prorate(*fee)?)
            })
    }

    pub(crate) fn matching(
        &self,
        taker: &Taker,
        deployment: Option<&config::ZeroEx>,
    ) -> Result<Matching, Error> {
        taker.check_amount(self.amount)?;
        let criteria = self.info(ProtocolKind::ZeroExV4, deployment).criteria;
        let token_id = match self.side {
            Side::Sell => self.nft_id,
            Side::Buy => taker.resolve(&criteria)?,
        };
        Ok(Matching {
            token_id,
            amount: taker.amount,
            recipient: taker.recipient,
            value: self.buy_value(taker.amount)?,
        })
    }

    pub(crate) fn check_maker(
        &self,
        state: &dyn ChainState,
        info: &Info,
        exchange: Address,
    ) -> Result<(), Unfillable> {
        time_window(state.timestamp(), 0, info.expiration_time)?;
        let info = Info {
            payment_token: self.erc20_token,
            ..info.clone()
        };
        chain::maker_side(state, &info, self.nft_id, exchange, exchange)
    }
}

pub(crate) fn signature_data(signature: &Signature) -> Result<SignatureData, Error> {
    let ecdsa = signature
        .ecdsa()
        .ok_or_else(|| Error::InvalidOrder("missing ECDSA signature".to_string()))?;
    Ok(SignatureData {
        signatureType: SIGNATURE_TYPE_EIP712,
        v: ecdsa.v,
        r: ecdsa.r,
        s: ecdsa.s,
    })
}

/// Maps an exchange status to a fillability verdict.
pub(crate) fn check_status(status: u8) -> Result<(), Unfillable> {
    match status {
        status::FILLABLE => Ok(()),
        status::EXPIRED => Err(Unfillable::Expired),
        status::UNFILLABLE => Err(Unfillable::Cancelled),
        _ => Err(Unfillable::State(format!("invalid order status {status}"))),
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matching {
    pub token_id: U256,
    pub amount: U256,
    pub recipient: Address,
    pub value: U256,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub exchange: Address,
    pub terms: Terms,
}

impl Order {
    pub fn erc721_order(&self) -> ERC721Order {
        let t = &self.terms;
        ERC721Order {
            direction: t.direction(),
            maker: t.maker,
            taker: t.taker,
            expiry: t.expiry,
            nonce: t.nonce,
            erc20Token: t.erc20_token,
            erc20TokenAmount: t.erc20_token_amount,
            fees: t.sol_fees(),
            erc721Token: t.nft,
            erc721TokenId: t.nft_id,
            erc721TokenProperties: t.sol_properties(),
        }
    }

    pub fn erc1155_order(&self) -> ERC1155Order {
        let t = &self.terms;
        ERC1155Order {
            direction: t.direction(),
            maker: t.maker,
            taker: t.taker,
            expiry: t.expiry,
            nonce: t.nonce,
            erc20Token: t.erc20_token,
            erc20TokenAmount: t.erc20_token_amount,
            fees: t.sol_fees(),
            erc1155Token: t.nft,
            erc1155TokenId: t.nft_id,
            erc1155TokenProperties: t.sol_properties(),
            erc1155TokenAmount: t.amount_u128(),
        }
    }

    fn struct_hash(&self) -> B256 {
        match self.terms.contract_kind {
            ContractKind::Erc721 => self.erc721_order().eip712_hash_struct(),
            ContractKind::Erc1155 => self.erc1155_order().eip712_hash_struct(),
        }
    }
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::ZeroExV4;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.zeroex_v4, Self::KIND)?;
        params.require_token_listing(Self::KIND)?;
        if matches!(params.target, Target::TokenList(_)) {
            return Err(Error::params("zeroex-v4 criteria use property validators"));
        }
        Ok(Self {
            exchange: deployment.exchange,
            terms: Terms::build(params, deployment)?,
        })
    }

    fn info(&self, config: &Config) -> Info {
        self.terms.info(Self::KIND, config.zeroex_v4.as_ref())
    }

    /// The exchange identifies orders by their full EIP-712 digest.
    fn hash(&self, config: &Config) -> B256 {
        self.signing_hash(config)
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        let domain = DomainSeparator::new("ZeroEx", "1.0.0", config.chain_id, self.exchange);
        hashed_eip712_message(&domain, &self.struct_hash())
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::Eip712
    }

    fn build_matching(&self, taker: &Taker, config: &Config) -> Result<Matching, Error> {
        self.terms.matching(taker, config.zeroex_v4.as_ref())
    }

    fn fill(
        &self,
        signature: &Signature,
        matching: &Matching,
        _: &Config,
    ) -> Result<ExchangeCall, Error> {
        let signature = signature_data(signature)?;
        let amount = u128::try_from(matching.amount)
            .map_err(|_| Error::params("amount does not fit 128 bits"))?;
        let data = match (self.terms.contract_kind, self.terms.side) {
            (ContractKind::Erc721, Side::Sell) => IZeroEx::buyERC721Call {
                sellOrder: self.erc721_order(),
                signature,
                callbackData: Bytes::new(),
            }
            .abi_encode(),
            (ContractKind::Erc721, Side::Buy) => IZeroEx::sellERC721Call {
                buyOrder: self.erc721_order(),
                signature,
                erc721TokenId: matching.token_id,
                unwrapNativeToken: false,
                callbackData: Bytes::new(),
            }
            .abi_encode(),
            (ContractKind::Erc1155, Side::Sell) => IZeroEx::buyERC1155Call {
                sellOrder: self.erc1155_order(),
                signature,
                erc1155BuyAmount: amount,
                callbackData: Bytes::new(),
            }
            .abi_encode(),
            (ContractKind::Erc1155, Side::Buy) => IZeroEx::sellERC1155Call {
                buyOrder: self.erc1155_order(),
                signature,
                erc1155TokenId: matching.token_id,
                erc1155SellAmount: amount,
                unwrapNativeToken: false,
                callbackData: Bytes::new(),
            }
            .abi_encode(),
        };
        Ok(ExchangeCall {
            to: self.exchange,
            data: data.into(),
            value: matching.value,
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let status = match self.terms.contract_kind {
            ContractKind::Erc721 => chain::view(
                state,
                self.exchange,
                IZeroEx::getERC721OrderStatusCall {
                    order: self.erc721_order(),
                },
            )?,
            ContractKind::Erc1155 => {
                let info = chain::view(
                    state,
                    self.exchange,
                    IZeroEx::getERC1155OrderInfoCall {
                        order: self.erc1155_order(),
                    },
                )?;
                if info.status == status::FILLABLE && info.remainingAmount == 0 {
                    return Err(Unfillable::Filled);
                }
                info.status
            }
        };
        check_status(status)?;
        self.terms
            .check_maker(state, &self.info(config), self.exchange)
    }
}
