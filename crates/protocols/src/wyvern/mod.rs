//! Wyvern V2 and V2.3 orders.
//!
//! Both versions share the order layout and the `atomicMatch_` entry point,
//! they differ in how the order is hashed. V2 hashes the tightly packed
//! order and makers sign it with the `personal_sign` prefix, V2.3 uses
//! EIP-712 and binds the order to the maker's current nonce.
//!
//! Orders transfer NFTs through the merkle validator, see [`calldata`]. A
//! taker fills an order by submitting a matching counter order.

pub mod calldata;

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
        config::{self, WyvernVersion},
        params::time_window,
    },
    alloy_primitives::{Address, B256, Bytes, U256, keccak256},
    alloy_sol_types::{SolCall, sol},
    calldata::{Field, Transfer},
    model::{
        ContractKind,
        DomainSeparator,
        ProtocolKind,
        Side,
        eip712::{hashed_eip712_message, hashed_ethsign_message},
        signature::{Signature, SigningScheme},
    },
    number::math::BPS_DENOMINATOR,
    std::sync::LazyLock,
};

sol! {
    interface IWyvernExchange {
        function atomicMatch_(
            address[14] addrs,
            uint256[18] uints,
            uint8[8] feeMethodsSidesKindsHowToCalls,
            bytes calldataBuy,
            bytes calldataSell,
            bytes replacementPatternBuy,
            bytes replacementPatternSell,
            bytes staticExtradataBuy,
            bytes staticExtradataSell,
            uint8[2] vs,
            bytes32[5] rssMetadata
        ) external payable;
        function cancelledOrFinalized(bytes32 hash) external view returns (bool);
        function nonces(address maker) external view returns (uint256);
    }

    interface IProxyRegistry {
        function proxies(address owner) external view returns (address);
    }
}

pub mod fee_method {
    pub const PROTOCOL_FEE: u8 = 0;
    pub const SPLIT_FEE: u8 = 1;
}

pub mod side {
    pub const BUY: u8 = 0;
    pub const SELL: u8 = 1;
}

pub const SALE_KIND_FIXED_PRICE: u8 = 0;
pub const HOW_TO_CALL_DELEGATE_CALL: u8 = 1;

static ORDER_TYPE_HASH: LazyLock<B256> = LazyLock::new(|| {
    keccak256(
        "Order(address exchange,address maker,address taker,uint256 makerRelayerFee,\
         uint256 takerRelayerFee,uint256 makerProtocolFee,uint256 takerProtocolFee,\
         address feeRecipient,uint8 feeMethod,uint8 side,uint8 saleKind,address target,\
         uint8 howToCall,bytes calldata,bytes replacementPattern,address staticTarget,\
         bytes staticExtradata,address paymentToken,uint256 basePrice,uint256 extra,\
         uint256 listingTime,uint256 expirationTime,uint256 salt,uint256 nonce)",
    )
});

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub exchange: Address,
    pub version: WyvernVersion,
    pub maker: Address,
    pub taker: Address,
    pub maker_relayer_fee: U256,
    pub taker_relayer_fee: U256,
    pub maker_protocol_fee: U256,
    pub taker_protocol_fee: U256,
    pub fee_recipient: Address,
    pub fee_method: u8,
    pub side: u8,
    pub sale_kind: u8,
    pub target: Address,
    pub how_to_call: u8,
    pub calldata: Bytes,
    pub replacement_pattern: Bytes,
    pub static_target: Address,
    pub static_extradata: Bytes,
    /// Zero address for the native currency.
    pub payment_token: Address,
    pub base_price: U256,
    pub extra: U256,
    pub listing_time: U256,
    pub expiration_time: U256,
    pub salt: U256,
    /// Only part of V2.3 order hashes.
    pub nonce: U256,
}

/// The taker's counter order and the value sent along with the match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matching {
    pub order: Order,
    pub value: U256,
}

impl Order {
    pub fn transfer(&self) -> Result<Transfer, Error> {
        Transfer::decode(&self.calldata)
    }

    fn maker_side(&self) -> Side {
        if self.side == side::BUY {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    /// The packed order hash as computed by V2 exchanges.
    fn packed_hash(&self) -> B256 {
        let mut packed = Vec::with_capacity(
            512 + self.calldata.len() * 2 + self.static_extradata.len(),
        );
        packed.extend_from_slice(self.exchange.as_slice());
        packed.extend_from_slice(self.maker.as_slice());
        packed.extend_from_slice(self.taker.as_slice());
        for fee in [
            self.maker_relayer_fee,
            self.taker_relayer_fee,
            self.maker_protocol_fee,
            self.taker_protocol_fee,
        ] {
            packed.extend_from_slice(&fee.to_be_bytes::<32>());
        }
        packed.extend_from_slice(self.fee_recipient.as_slice());
        packed.extend_from_slice(&[self.fee_method, self.side, self.sale_kind]);
        packed.extend_from_slice(self.target.as_slice());
        packed.push(self.how_to_call);
        packed.extend_from_slice(&self.calldata);
        packed.extend_from_slice(&self.replacement_pattern);
        packed.extend_from_slice(self.static_target.as_slice());
        packed.extend_from_slice(&self.static_extradata);
        packed.extend_from_slice(self.payment_token.as_slice());
        for value in [
            self.base_price,
            self.extra,
            self.listing_time,
            self.expiration_time,
            self.salt,
        ] {
            packed.extend_from_slice(&value.to_be_bytes::<32>());
        }
        keccak256(packed)
    }

    fn struct_hash(&self) -> B256 {
        let address = |address: Address| B256::left_padding_from(address.as_slice());
        let small = |value: u8| B256::with_last_byte(value);
        let uint = |value: U256| B256::from(value.to_be_bytes::<32>());
        let words = [
            *ORDER_TYPE_HASH,
            address(self.exchange),
            address(self.maker),
            address(self.taker),
            uint(self.maker_relayer_fee),
            uint(self.taker_relayer_fee),
            uint(self.maker_protocol_fee),
            uint(self.taker_protocol_fee),
            address(self.fee_recipient),
            small(self.fee_method),
            small(self.side),
            small(self.sale_kind),
            address(self.target),
            small(self.how_to_call),
            keccak256(&self.calldata),
            keccak256(&self.replacement_pattern),
            address(self.static_target),
            keccak256(&self.static_extradata),
            address(self.payment_token),
            uint(self.base_price),
            uint(self.extra),
            uint(self.listing_time),
            uint(self.expiration_time),
            uint(self.salt),
            uint(self.nonce),
        ];
        keccak256(words.iter().flat_map(|word| word.0).collect::<Vec<u8>>())
    }

    fn domain(&self, chain_id: u64) -> DomainSeparator {
        DomainSeparator::new("Wyvern Exchange Contract", "2.3", chain_id, self.exchange)
    }

    fn uints(&self) -> [U256; 9] {
        [
            self.maker_relayer_fee,
            self.taker_relayer_fee,
            self.maker_protocol_fee,
            self.taker_protocol_fee,
            self.base_price,
            self.extra,
            self.listing_time,
            self.expiration_time,
            self.salt,
        ]
    }

    fn kinds(&self) -> [u8; 4] {
        [self.fee_method, self.side, self.sale_kind, self.how_to_call]
    }

    fn counter(&self, transfer: &Transfer, taker: &Taker) -> Self {
        let calldata = transfer.encode();
        Self {
            maker: taker.address,
            taker: self.maker,
            fee_recipient: Address::ZERO,
            side: match self.maker_side() {
                Side::Buy => side::SELL,
                Side::Sell => side::BUY,
            },
            replacement_pattern: calldata::mask(transfer.contract_kind, &calldata, &[]),
            calldata,
            listing_time: U256::from(taker.timestamp.saturating_sub(LISTING_TIME_SKEW)),
            expiration_time: U256::ZERO,
            salt: crate::random_salt(),
            nonce: U256::ZERO,
            ..self.clone()
        }
    }
}

/// Wyvern pays all fees to a single recipient, expressed in basis points of
/// the price.
fn relayer_fee(
    params: &crate::BuildParams,
    deployment: &config::Wyvern,
) -> Result<(Address, U256), Error> {
    let Some(first) = params.fees.first() else {
        return Ok((deployment.fee_recipient, U256::ZERO));
    };
    if params.fees.iter().any(|fee| fee.recipient != first.recipient) {
        return Err(Error::params("wyvern supports a single fee recipient"));
    }
    if params.price.is_zero() {
        return Err(Error::params("fees on a zero price"));
    }
    let total = params.split()?.total_fees();
    let denominator = U256::from(BPS_DENOMINATOR);
    let bps = number::math::mul_div(total, denominator, params.price)
        .ok_or(Error::Fee(fee::Error::Overflow))?;
    if number::math::mul_div(bps, params.price, denominator) != Some(total) {
        return Err(Error::params("wyvern fees have to be whole basis points"));
    }
    Ok((first.recipient, bps))
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Wyvern;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.wyvern, Self::KIND)?;
        params.require_token_listing(Self::KIND)?;
        let (fee_recipient, fee) = relayer_fee(params, deployment)?;

        let mut transfer = Transfer {
            contract_kind: params.contract_kind,
            token: params.contract,
            amount: params.amount,
            ..Default::default()
        };
        let replaceable = match (params.side, &params.target) {
            (Side::Sell, Target::Token(id)) => {
                transfer.from = params.maker;
                transfer.token_id = *id;
                vec![Field::To]
            }
            (Side::Buy, Target::Token(id)) => {
                transfer.to = params.maker;
                transfer.token_id = *id;
                vec![Field::From]
            }
            (Side::Buy, Target::Collection) => {
                transfer.to = params.maker;
                vec![Field::From, Field::TokenId]
            }
            (Side::Buy, Target::TokenList(ids)) => {
                let tree = merkle::MerkleTree::new(ids.iter().copied())
                    .map_err(|_| Error::params("empty token list"))?;
                transfer.to = params.maker;
                transfer.root = tree.root();
                transfer.proof = vec![B256::ZERO; tree.depth()];
                vec![Field::From, Field::TokenId, Field::Proof]
            }
            _ => return Err(Error::params("wyvern criteria use merkle roots")),
        };
        let calldata = transfer.encode();

        let (side, maker_relayer_fee, taker_relayer_fee) = match params.side {
            Side::Sell => (side::SELL, fee, U256::ZERO),
            Side::Buy => (side::BUY, U256::ZERO, fee),
        };
        Ok(Self {
            exchange: deployment.exchange,
            version: deployment.version,
            maker: params.maker,
            taker: Address::ZERO,
            maker_relayer_fee,
            taker_relayer_fee,
            maker_protocol_fee: U256::ZERO,
            taker_protocol_fee: U256::ZERO,
            fee_recipient,
            fee_method: fee_method::SPLIT_FEE,
            side,
            sale_kind: SALE_KIND_FIXED_PRICE,
            target: deployment.merkle_validator,
            how_to_call: HOW_TO_CALL_DELEGATE_CALL,
            replacement_pattern: calldata::mask(params.contract_kind, &calldata, &replaceable),
            calldata,
            static_target: Address::ZERO,
            static_extradata: Bytes::new(),
            payment_token: params.payment_token,
            base_price: params.price,
            extra: U256::ZERO,
            listing_time: U256::from(params.listing_time()),
            expiration_time: U256::from(params.expiration_time.unwrap_or_default()),
            salt: params.salt(),
            nonce: params.nonce(),
        })
    }

    fn info(&self, _: &Config) -> Info {
        let transfer = self.transfer().unwrap_or_default();
        let kind = transfer.contract_kind;
        let criteria = if !calldata::is_replaceable(kind, &self.replacement_pattern, Field::TokenId)
        {
            Criteria::Token(transfer.token_id)
        } else if transfer.root.is_zero() {
            Criteria::Collection
        } else {
            Criteria::MerkleRoot(transfer.root)
        };
        Info {
            kind: Self::KIND,
            maker: self.maker,
            side: self.maker_side(),
            contract_kind: kind,
            contract: transfer.token,
            criteria,
            payment_token: self.payment_token,
            price: self.base_price,
            amount: transfer.amount,
            expiration_time: u64::try_from(self.expiration_time).unwrap_or(u64::MAX),
        }
    }

    /// Key of the order in the exchange's `cancelledOrFinalized` mapping.
    fn hash(&self, config: &Config) -> B256 {
        match self.version {
            WyvernVersion::V2 => hashed_ethsign_message(&self.packed_hash()),
            WyvernVersion::V2_3 => self.signing_hash(config),
        }
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        match self.version {
            WyvernVersion::V2 => self.packed_hash(),
            WyvernVersion::V2_3 => {
                hashed_eip712_message(&self.domain(config.chain_id), &self.struct_hash())
            }
        }
    }

    fn signing_scheme(&self) -> SigningScheme {
        match self.version {
            WyvernVersion::V2 => SigningScheme::EthSign,
            WyvernVersion::V2_3 => SigningScheme::Eip712,
        }
    }

    fn build_matching(&self, taker: &Taker, config: &Config) -> Result<Matching, Error> {
        let transfer = self.transfer()?;
        taker.check_amount(transfer.amount)?;
        if taker.amount != transfer.amount {
            return Err(Error::Unsupported {
                kind: Self::KIND,
                operation: "partial fills",
            });
        }
        let counter = match self.maker_side() {
            Side::Sell => Transfer {
                to: taker.recipient,
                ..transfer
            },
            Side::Buy => {
                let token_id = taker.resolve(&self.info(config).criteria)?;
                let proof = taker.proof(transfer.root, token_id)?;
                if proof.len() != transfer.proof.len() {
                    return Err(Error::params("proof length does not match the order"));
                }
                Transfer {
                    from: taker.address,
                    token_id,
                    proof,
                    ..transfer
                }
            }
        };
        let value = if self.maker_side() == Side::Sell && self.payment_token.is_zero() {
            self.base_price
        } else {
            U256::ZERO
        };
        Ok(Matching {
            order: self.counter(&counter, taker),
            value,
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
        let counter = &matching.order;
        // The counter order is sent by its own maker and needs no signature.
        let (buy, sell, vs, rss) = match self.maker_side() {
            Side::Buy => (self, counter, [ecdsa.v, 0], [ecdsa.r, ecdsa.s, B256::ZERO, B256::ZERO]),
            Side::Sell => (counter, self, [0, ecdsa.v], [B256::ZERO, B256::ZERO, ecdsa.r, ecdsa.s]),
        };
        let addrs = [
            buy.exchange,
            buy.maker,
            buy.taker,
            buy.fee_recipient,
            buy.target,
            buy.static_target,
            buy.payment_token,
            sell.exchange,
            sell.maker,
            sell.taker,
            sell.fee_recipient,
            sell.target,
            sell.static_target,
            sell.payment_token,
        ];
        let mut uints = [U256::ZERO; 18];
        uints[..9].copy_from_slice(&buy.uints());
        uints[9..].copy_from_slice(&sell.uints());
        let mut kinds = [0u8; 8];
        kinds[..4].copy_from_slice(&buy.kinds());
        kinds[4..].copy_from_slice(&sell.kinds());

        let data = IWyvernExchange::atomicMatch_Call {
            addrs,
            uints,
            feeMethodsSidesKindsHowToCalls: kinds,
            calldataBuy: buy.calldata.clone(),
            calldataSell: sell.calldata.clone(),
            replacementPatternBuy: buy.replacement_pattern.clone(),
            replacementPatternSell: sell.replacement_pattern.clone(),
            staticExtradataBuy: buy.static_extradata.clone(),
            staticExtradataSell: sell.static_extradata.clone(),
            vs,
            rssMetadata: [rss[0], rss[1], rss[2], rss[3], B256::ZERO],
        }
        .abi_encode();
        Ok(ExchangeCall {
            to: self.exchange,
            data: data.into(),
            value: matching.value,
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let deployment = config
            .wyvern
            .as_ref()
            .ok_or_else(|| Unfillable::State("wyvern is not deployed".to_string()))?;
        time_window(
            state.timestamp(),
            u64::try_from(self.listing_time).unwrap_or(u64::MAX),
            u64::try_from(self.expiration_time).unwrap_or_default(),
        )?;
        let hash = self.hash(config);
        if chain::view(
            state,
            self.exchange,
            IWyvernExchange::cancelledOrFinalizedCall { hash },
        )? {
            return Err(Unfillable::Cancelled);
        }
        if self.version == WyvernVersion::V2_3 {
            let nonce = chain::view(
                state,
                self.exchange,
                IWyvernExchange::noncesCall { maker: self.maker },
            )?;
            if nonce != self.nonce {
                return Err(Unfillable::NonceMismatch);
            }
        }

        let info = self.info(config);
        let transfer = self.transfer().map_err(|err| Unfillable::State(err.to_string()))?;
        let operator = match info.side {
            Side::Sell => {
                let proxy = chain::view(
                    state,
                    deployment.proxy_registry,
                    IProxyRegistry::proxiesCall { owner: self.maker },
                )?;
                if proxy.is_zero() {
                    return Err(Unfillable::MissingApproval(deployment.proxy_registry));
                }
                proxy
            }
            Side::Buy => deployment.token_transfer_proxy,
        };
        chain::maker_side(
            state,
            &info,
            transfer.token_id,
            operator,
            deployment.token_transfer_proxy,
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

    fn config(version: WyvernVersion) -> Config {
        let mut config = Config::mainnet();
        if let Some(wyvern) = &mut config.wyvern {
            wyvern.version = version;
        }
        config
    }

    fn listing(config: &Config) -> crate::Order {
        let params = BuildParams::listing(
            signer(1).address(),
            ContractKind::Erc721,
            nft(),
            U256::from(9),
            1.0.eth(),
        )
        .with_fees(vec![fee::Fee::bps(Address::repeat_byte(7), 250)]);
        crate::Order::build(ProtocolKind::Wyvern, &params, config)
            .unwrap()
            .signed(&signer(1), config)
            .unwrap()
    }

    fn raw(order: &crate::Order) -> &Order {
        let crate::Raw::Wyvern(order) = &order.raw else {
            unreachable!()
        };
        order
    }

    #[test]
    fn versions_hash_and_sign_differently() {
        let v2 = config(WyvernVersion::V2);
        let order = listing(&v2);
        assert_eq!(order.signing_scheme(), SigningScheme::EthSign);
        order.verify_signature(&v2).unwrap();
        assert_eq!(
            order.hash(&v2),
            hashed_ethsign_message(&order.signing_hash(&v2))
        );

        let v2_3 = config(WyvernVersion::V2_3);
        let order = listing(&v2_3);
        assert_eq!(order.signing_scheme(), SigningScheme::Eip712);
        order.verify_signature(&v2_3).unwrap();
        assert_eq!(order.hash(&v2_3), order.signing_hash(&v2_3));

        let mut bumped = raw(&order).clone();
        bumped.nonce = U256::from(1);
        assert_ne!(bumped.hash(&v2_3), order.hash(&v2_3));
    }

    #[test]
    fn listing_fee_is_a_maker_relayer_fee() {
        let config = config(WyvernVersion::V2_3);
        let order = listing(&config);
        let wyvern = raw(&order);
        assert_eq!(wyvern.maker_relayer_fee, U256::from(250));
        assert_eq!(wyvern.fee_recipient, Address::repeat_byte(7));
        assert_eq!(order.info(&config).criteria, Criteria::Token(U256::from(9)));
        assert_eq!(order.info(&config).price, 1.0.eth());

        let params = BuildParams::listing(
            signer(1).address(),
            ContractKind::Erc721,
            nft(),
            U256::from(9),
            1.0.eth(),
        )
        .with_fees(vec![
            fee::Fee::bps(Address::repeat_byte(7), 250),
            fee::Fee::bps(Address::repeat_byte(8), 100),
        ]);
        assert!(crate::Order::build(ProtocolKind::Wyvern, &params, &config).is_err());
    }

    #[test]
    fn relayer_fee_of_large_prices() {
        let price = U256::MAX / U256::from(20_000) * U256::from(10_000);
        let params = BuildParams::listing(
            signer(1).address(),
            ContractKind::Erc721,
            nft(),
            U256::from(9),
            price,
        )
        .with_fees(vec![fee::Fee::bps(Address::repeat_byte(7), 250)]);
        let config = config(WyvernVersion::V2_3);
        let deployment = config.wyvern.as_ref().unwrap();
        assert_eq!(
            relayer_fee(&params, deployment).unwrap(),
            (Address::repeat_byte(7), U256::from(250))
        );
    }

    #[test]
    fn matched_calldata_agrees() {
        let config = config(WyvernVersion::V2_3);
        let order = listing(&config);
        let taker = Taker::new(Address::repeat_byte(5)).with_recipient(Address::repeat_byte(6));
        let crate::MatchParams::Wyvern(matching) = order.build_matching(&taker, &config).unwrap()
        else {
            unreachable!()
        };
        let sell = raw(&order);
        let buy = &matching.order;
        assert_eq!(matching.value, 1.0.eth());
        assert_eq!(buy.fee_recipient, Address::ZERO);
        assert_eq!(buy.maker, taker.address);

        let merged_sell = calldata::guarded_array_replace(
            &sell.calldata,
            &buy.calldata,
            &sell.replacement_pattern,
        )
        .unwrap();
        assert_eq!(merged_sell, buy.calldata);
        assert_eq!(
            Transfer::decode(&merged_sell).unwrap().to,
            Address::repeat_byte(6)
        );

        let call = order.fill(&taker, &config).unwrap();
        let decoded = IWyvernExchange::atomicMatch_Call::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.addrs[1], taker.address);
        assert_eq!(decoded.addrs[8], signer(1).address());
        assert_eq!(decoded.feeMethodsSidesKindsHowToCalls[5], side::SELL);
    }

    #[test]
    fn criteria_bid_takes_a_proof() {
        let config = config(WyvernVersion::V2_3);
        let ids = [0u64, 1, 2, 100, 101, 102, 675, 373, 748, 253, 827, 576]
            .map(U256::from)
            .to_vec();
        let params = BuildParams::bid(
            signer(2).address(),
            ContractKind::Erc721,
            nft(),
            Target::TokenList(ids.clone()),
            config.weth,
            1.0.eth(),
        );
        let order = crate::Order::build(ProtocolKind::Wyvern, &params, &config)
            .unwrap()
            .signed(&signer(2), &config)
            .unwrap();
        let root = merkle::root(ids.iter().copied());
        assert_eq!(order.info(&config).criteria, Criteria::MerkleRoot(root));

        let taker = Taker::new(Address::repeat_byte(5))
            .with_token_id(U256::from(827))
            .with_criteria(ids);
        let crate::MatchParams::Wyvern(matching) = order.build_matching(&taker, &config).unwrap()
        else {
            unreachable!()
        };
        assert_eq!(matching.value, U256::ZERO);
        let buy = raw(&order);
        let merged = calldata::guarded_array_replace(
            &buy.calldata,
            &matching.order.calldata,
            &buy.replacement_pattern,
        )
        .unwrap();
        assert_eq!(merged, matching.order.calldata);
        let transfer = Transfer::decode(&merged).unwrap();
        assert_eq!(transfer.from, taker.address);
        assert_eq!(transfer.to, signer(2).address());
        assert!(merkle::verify(root, U256::from(827), &transfer.proof, 4));

        let outsider = taker.with_token_id(U256::from(103));
        assert!(order.build_matching(&outsider, &config).is_err());
    }

    #[test]
    fn bumped_nonce_is_unfillable() {
        let config = config(WyvernVersion::V2_3);
        let order = listing(&config);
        let exchange = raw(&order).exchange;
        let state = Scripted::at(u64::MAX / 2)
            .on(
                exchange,
                IWyvernExchange::cancelledOrFinalizedCall {
                    hash: order.hash(&config),
                },
                false.abi_encode(),
            )
            .on(
                exchange,
                IWyvernExchange::noncesCall {
                    maker: signer(1).address(),
                },
                U256::from(1).abi_encode(),
            );
        assert_eq!(
            order.check_fillability(&state, &config),
            Err(Unfillable::NonceMismatch)
        );
    }
}
