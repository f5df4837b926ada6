//! Element, a ZeroEx V4 fork.
//!
//! Order terms are the ones of [`zeroex`](crate::zeroex), but the signed
//! structs differ per side and include the maker's `hashNonce`, which the
//! maker bumps on-chain to cancel all of their orders at once. Sell orders
//! never carry properties.

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
        zeroex::{self, Matching, Terms},
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
};

// The typed data structs carry `hashNonce`, the `*Input` call structs don't.
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
    struct NFTSellOrder {
        address maker;
        address taker;
        uint256 expiry;
        uint256 nonce;
        address erc20Token;
        uint256 erc20TokenAmount;
        Fee[] fees;
        address nft;
        uint256 nftId;
        uint256 hashNonce;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct NFTBuyOrder {
        address maker;
        address taker;
        uint256 expiry;
        uint256 nonce;
        address erc20Token;
        uint256 erc20TokenAmount;
        Fee[] fees;
        address nft;
        uint256 nftId;
        Property[] nftProperties;
        uint256 hashNonce;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ERC1155SellOrder {
        address maker;
        address taker;
        uint256 expiry;
        uint256 nonce;
        address erc20Token;
        uint256 erc20TokenAmount;
        Fee[] fees;
        address erc1155Token;
        uint256 erc1155TokenId;
        uint128 erc1155TokenAmount;
        uint256 hashNonce;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ERC1155BuyOrder {
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
        uint256 hashNonce;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SellOrderInput {
        address maker;
        address taker;
        uint256 expiry;
        uint256 nonce;
        address erc20Token;
        uint256 erc20TokenAmount;
        Fee[] fees;
        address nft;
        uint256 nftId;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BuyOrderInput {
        address maker;
        address taker;
        uint256 expiry;
        uint256 nonce;
        address erc20Token;
        uint256 erc20TokenAmount;
        Fee[] fees;
        address nft;
        uint256 nftId;
        Property[] nftProperties;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ERC1155SellOrderInput {
        address maker;
        address taker;
        uint256 expiry;
        uint256 nonce;
        address erc20Token;
        uint256 erc20TokenAmount;
        Fee[] fees;
        address erc1155Token;
        uint256 erc1155TokenId;
        uint128 erc1155TokenAmount;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ERC1155BuyOrderInput {
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

    interface IElement {
        function buyERC721Ex(
            SellOrderInput sellOrder,
            SignatureData signature,
            address taker,
            bytes takerData
        ) external payable;
        function sellERC721(
            BuyOrderInput buyOrder,
            SignatureData signature,
            uint256 erc721TokenId,
            bool unwrapNativeToken,
            bytes takerData
        ) external;
        function buyERC1155Ex(
            ERC1155SellOrderInput sellOrder,
            SignatureData signature,
            address taker,
            uint128 erc1155BuyAmount,
            bytes takerData
        ) external payable;
        function sellERC1155(
            ERC1155BuyOrderInput buyOrder,
            SignatureData signature,
            uint256 erc1155TokenId,
            uint128 erc1155SellAmount,
            bool unwrapNativeToken,
            bytes takerData
        ) external;
        function getHashNonce(address maker) external view returns (uint256);
        function getERC721SellOrderStatus(SellOrderInput order) external view returns (uint8);
        function getERC721BuyOrderStatus(BuyOrderInput order) external view returns (uint8);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub exchange: Address,
    pub terms: Terms,
    pub hash_nonce: U256,
}

impl Order {
    fn fees(&self) -> Vec<Fee> {
        self.terms
            .fees
            .iter()
            .map(|(recipient, amount)| Fee {
                recipient: *recipient,
                amount: *amount,
                feeData: Bytes::new(),
            })
            .collect()
    }

    fn properties(&self) -> Vec<Property> {
        self.terms
            .properties
            .iter()
            .map(|property| Property {
                propertyValidator: property.validator,
                propertyData: property.data.clone(),
            })
            .collect()
    }

    fn struct_hash(&self) -> B256 {
        let t = &self.terms;
        match (t.contract_kind, t.side) {
            (ContractKind::Erc721, Side::Sell) => NFTSellOrder {
                maker: t.maker,
                taker: t.taker,
                expiry: t.expiry,
                nonce: t.nonce,
                erc20Token: t.erc20_token,
                erc20TokenAmount: t.erc20_token_amount,
                fees: self.fees(),
                nft: t.nft,
                nftId: t.nft_id,
                hashNonce: self.hash_nonce,
            }
            .eip712_hash_struct(),
            (ContractKind::Erc721, Side::Buy) => NFTBuyOrder {
                maker: t.maker,
                taker: t.taker,
                expiry: t.expiry,
                nonce: t.nonce,
                erc20Token: t.erc20_token,
                erc20TokenAmount: t.erc20_token_amount,
                fees: self.fees(),
                nft: t.nft,
                nftId: t.nft_id,
                nftProperties: self.properties(),
                hashNonce: self.hash_nonce,
            }
            .eip712_hash_struct(),
            (ContractKind::Erc1155, Side::Sell) => ERC1155SellOrder {
                maker: t.maker,
                taker: t.taker,
                expiry: t.expiry,
                nonce: t.nonce,
                erc20Token: t.erc20_token,
                erc20TokenAmount: t.erc20_token_amount,
                fees: self.fees(),
                erc1155Token: t.nft,
                erc1155TokenId: t.nft_id,
                erc1155TokenAmount: t.amount_u128(),
                hashNonce: self.hash_nonce,
            }
            .eip712_hash_struct(),
            (ContractKind::Erc1155, Side::Buy) => ERC1155BuyOrder {
                maker: t.maker,
                taker: t.taker,
                expiry: t.expiry,
                nonce: t.nonce,
                erc20Token: t.erc20_token,
                erc20TokenAmount: t.erc20_token_amount,
                fees: self.fees(),
                erc1155Token: t.nft,
                erc1155TokenId: t.nft_id,
                erc1155TokenProperties: self.properties(),
                erc1155TokenAmount: t.amount_u128(),
                hashNonce: self.hash_nonce,
            }
            .eip712_hash_struct(),
        }
    }

    pub fn sell_order(&self) -> SellOrderInput {
        let t = &self.terms;
        SellOrderInput {
            maker: t.maker,
            taker: t.taker,
            expiry: t.expiry,
            nonce: t.nonce,
            erc20Token: t.erc20_token,
            erc20TokenAmount: t.erc20_token_amount,
            fees: self.fees(),
            nft: t.nft,
            nftId: t.nft_id,
        }
    }

    pub fn buy_order(&self) -> BuyOrderInput {
        let t = &self.terms;
        BuyOrderInput {
            maker: t.maker,
            taker: t.taker,
            expiry: t.expiry,
            nonce: t.nonce,
            erc20Token: t.erc20_token,
            erc20TokenAmount: t.erc20_token_amount,
            fees: self.fees(),
            nft: t.nft,
            nftId: t.nft_id,
            nftProperties: self.properties(),
        }
    }

    fn erc1155_sell_order(&self) -> ERC1155SellOrderInput {
        let t = &self.terms;
        ERC1155SellOrderInput {
            maker: t.maker,
            taker: t.taker,
            expiry: t.expiry,
            nonce: t.nonce,
            erc20Token: t.erc20_token,
            erc20TokenAmount: t.erc20_token_amount,
            fees: self.fees(),
            erc1155Token: t.nft,
            erc1155TokenId: t.nft_id,
            erc1155TokenAmount: t.amount_u128(),
        }
    }

    fn erc1155_buy_order(&self) -> ERC1155BuyOrderInput {
        let t = &self.terms;
        ERC1155BuyOrderInput {
            maker: t.maker,
            taker: t.taker,
            expiry: t.expiry,
            nonce: t.nonce,
            erc20Token: t.erc20_token,
            erc20TokenAmount: t.erc20_token_amount,
            fees: self.fees(),
            erc1155Token: t.nft,
            erc1155TokenId: t.nft_id,
            erc1155TokenProperties: self.properties(),
            erc1155TokenAmount: t.amount_u128(),
        }
    }
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Element;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.element, Self::KIND)?;
        params.require_token_listing(Self::KIND)?;
        if matches!(params.target, Target::TokenList(_)) {
            return Err(Error::params("element criteria use property validators"));
        }
        Ok(Self {
            exchange: deployment.exchange,
            terms: Terms::build(params, deployment)?,
            // The maker's current hash nonce, zero unless they ever bumped it.
            hash_nonce: U256::ZERO,
        })
    }

    fn info(&self, config: &Config) -> Info {
        self.terms.info(Self::KIND, config.element.as_ref())
    }

    fn hash(&self, config: &Config) -> B256 {
        self.signing_hash(config)
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        let domain = DomainSeparator::new("ElementEx", "1.0.0", config.chain_id, self.exchange);
        hashed_eip712_message(&domain, &self.struct_hash())
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::Eip712
    }

    fn build_matching(&self, taker: &Taker, config: &Config) -> Result<Matching, Error> {
        self.terms.matching(taker, config.element.as_ref())
    }

    fn fill(
        &self,
        signature: &Signature,
        matching: &Matching,
        _: &Config,
    ) -> Result<ExchangeCall, Error> {
        let signature = zeroex::signature_data(signature)?;
        let signature = SignatureData {
            signatureType: signature.signatureType,
            v: signature.v,
            r: signature.r,
            s: signature.s,
        };
        let amount = u128::try_from(matching.amount)
            .map_err(|_| Error::params("amount does not fit 128 bits"))?;
        let data = match (self.terms.contract_kind, self.terms.side) {
            (ContractKind::Erc721, Side::Sell) => IElement::buyERC721ExCall {
                sellOrder: self.sell_order(),
                signature,
                taker: matching.recipient,
                takerData: Bytes::new(),
            }
            .abi_encode(),
            (ContractKind::Erc721, Side::Buy) => IElement::sellERC721Call {
                buyOrder: self.buy_order(),
                signature,
                erc721TokenId: matching.token_id,
                unwrapNativeToken: false,
                takerData: Bytes::new(),
            }
            .abi_encode(),
            (ContractKind::Erc1155, Side::Sell) => IElement::buyERC1155ExCall {
                sellOrder: self.erc1155_sell_order(),
                signature,
                taker: matching.recipient,
                erc1155BuyAmount: amount,
                takerData: Bytes::new(),
            }
            .abi_encode(),
            (ContractKind::Erc1155, Side::Buy) => IElement::sellERC1155Call {
                buyOrder: self.erc1155_buy_order(),
                signature,
                erc1155TokenId: matching.token_id,
                erc1155SellAmount: amount,
                unwrapNativeToken: false,
                takerData: Bytes::new(),
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
        let hash_nonce = chain::view(
            state,
            self.exchange,
            IElement::getHashNonceCall {
                maker: self.terms.maker,
            },
        )?;
        if hash_nonce != self.hash_nonce {
            return Err(Unfillable::NonceMismatch);
        }
        if self.terms.contract_kind == ContractKind::Erc721 {
            let status = match self.terms.side {
                Side::Sell => chain::view(
                    state,
                    self.exchange,
                    IElement::getERC721SellOrderStatusCall {
                        order: self.sell_order(),
                    },
                )?,
                Side::Buy => chain::view(
                    state,
                    self.exchange,
                    IElement::getERC721BuyOrderStatusCall {
                        order: self.buy_order(),
                    },
                )?,
            };
            zeroex::check_status(status)?;
        }
        self.terms
            .check_maker(state, &self.info(config), self.exchange)
    }
}
