//! Zora V3 asks.
//!
//! An ask is created on-chain by the seller. Tokens stay with the seller,
//! who approves the ERC721 transfer helper of the Zora module manager.

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
    interface IZoraAsks {
        function fillAsk(
            address _tokenContract,
            uint256 _tokenId,
            address _fillCurrency,
            uint256 _fillAmount,
            address _finder
        ) external payable;
        function askForNFT(address tokenContract, uint256 tokenId)
            external
            view
            returns (
                address seller,
                address sellerFundsRecipient,
                address askCurrency,
                uint16 findersFeeBps,
                uint256 askPrice
            );
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub asks: Address,
    pub maker: Address,
    pub contract: Address,
    pub token_id: U256,
    /// Zero address for the native currency.
    pub currency: Address,
    pub price: U256,
    pub finders_fee_bps: u16,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matching {
    pub finder: Address,
}

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Zora;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.zora, Self::KIND)?;
        if params.side != Side::Sell {
            return Err(Error::Unsupported {
                kind: Self::KIND,
                operation: "bids",
            });
        }
        let Target::Token(token_id) = params.target else {
            return Err(Error::params("zora asks are for single tokens"));
        };
        if params.contract_kind != ContractKind::Erc721 {
            return Err(Error::params("zora asks are for ERC721 tokens"));
        }
        if !params.fees.is_empty() {
            return Err(Error::params("zora asks only pay a finder's fee"));
        }
        Ok(Self {
            asks: deployment.asks,
            maker: params.maker,
            contract: params.contract,
            token_id,
            currency: params.payment_token,
            price: params.price,
            finders_fee_bps: 0,
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
            payment_token: self.currency,
            price: self.price,
            amount: U256::from(1),
            expiration_time: 0,
        }
    }

    fn hash(&self, _: &Config) -> B256 {
        keccak256(
            (
                self.asks,
                self.contract,
                self.token_id,
                self.maker,
                self.currency,
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
            finder: Address::ZERO,
        })
    }

    fn fill(&self, _: &Signature, matching: &Matching, _: &Config) -> Result<ExchangeCall, Error> {
        let data = IZoraAsks::fillAskCall {
            _tokenContract: self.contract,
            _tokenId: self.token_id,
            _fillCurrency: self.currency,
            _fillAmount: self.price,
            _finder: matching.finder,
        }
        .abi_encode();
        Ok(ExchangeCall {
            to: self.asks,
            data: data.into(),
            value: if self.currency.is_zero() {
                self.price
            } else {
                U256::ZERO
            },
        })
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let ask = chain::view(
            state,
            self.asks,
            IZoraAsks::askForNFTCall {
                tokenContract: self.contract,
                tokenId: self.token_id,
            },
        )?;
        if ask.seller != self.maker {
            return Err(Unfillable::Cancelled);
        }
        if ask.askCurrency != self.currency || ask.askPrice != self.price {
            return Err(Unfillable::PriceMismatch);
        }
        let helper = config
            .zora
            .as_ref()
            .map(|zora| zora.erc721_transfer_helper)
            .ok_or_else(|| Unfillable::State("zora is not deployed".to_string()))?;
        chain::maker_side(state, &self.info(config), self.token_id, helper, helper)
    }
}
