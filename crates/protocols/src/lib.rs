//! Order adapters for the supported NFT exchange protocols.
//!
//! Every protocol implements [`Adapter`]: building orders with the
//! protocol's defaults, hashing them exactly like the exchange contract does,
//! deriving what a taker has to submit and encoding the exchange call that
//! fills them. [`Order`] is the closed union over all protocols.

pub mod blur;
pub mod chain;
pub mod config;
pub mod cryptopunks;
pub mod element;
mod error;
pub mod forward;
pub mod foundation;
pub mod looks_rare;
mod params;
pub mod properties;
pub mod rarible;
pub mod seaport;
pub mod universe;
pub mod wyvern;
pub mod zeroex;
pub mod zora;

pub use {
    chain::ChainState,
    config::Config,
    error::{Error, Unfillable},
    params::{
        BuildParams,
        Criteria,
        ExchangeCall,
        Info,
        LISTING_TIME_SKEW,
        Taker,
        Target,
        now,
        random_salt,
    },
};
use {
    alloy_primitives::B256,
    alloy_signer_local::PrivateKeySigner,
    model::{
        ProtocolKind,
        signature::{Signature, SigningScheme},
    },
};

/// The capability set every protocol provides.
pub trait Adapter: Clone + std::fmt::Debug + Sized {
    const KIND: ProtocolKind;

    /// What a taker submits next to the maker order.
    type Matching: Clone + std::fmt::Debug;

    /// Builds an order, filling in the protocol's defaults.
    fn build(params: &BuildParams, config: &Config) -> Result<Self, Error>;

    fn info(&self, config: &Config) -> Info;

    /// Identifier of the order as used by the exchange for cancellations and
    /// fill status.
    fn hash(&self, config: &Config) -> B256;

    /// Message handed to [`Signature::sign`] under [`Adapter::signing_scheme`].
    fn signing_hash(&self, config: &Config) -> B256;

    fn signing_scheme(&self) -> SigningScheme;

    /// Derives the complementary data a taker submits to fill the order.
    fn build_matching(&self, taker: &Taker, config: &Config) -> Result<Self::Matching, Error>;

    /// Encodes the exchange call filling the order with the given matching.
    fn fill(
        &self,
        signature: &Signature,
        matching: &Self::Matching,
        config: &Config,
    ) -> Result<ExchangeCall, Error>;

    /// Off-chain preflight of the maker's side of the order.
    fn check_fillability(&self, state: &dyn ChainState, config: &Config)
    -> Result<(), Unfillable>;
}

/// Protocol specific order payload.
#[derive(Clone, Debug)]
pub enum Raw {
    Seaport(seaport::Order),
    LooksRare(looks_rare::Order),
    ZeroExV4(zeroex::Order),
    Element(element::Order),
    Wyvern(wyvern::Order),
    Foundation(foundation::Order),
    Zora(zora::Order),
    CryptoPunks(cryptopunks::Order),
    Rarible(rarible::Order),
    Universe(universe::Order),
    Blur(blur::Order),
    Forward(forward::Order),
}

/// Protocol specific matching data, see [`Adapter::Matching`].
#[derive(Clone, Debug)]
pub enum MatchParams {
    Seaport(<seaport::Order as Adapter>::Matching),
    LooksRare(<looks_rare::Order as Adapter>::Matching),
    ZeroExV4(<zeroex::Order as Adapter>::Matching),
    Element(<element::Order as Adapter>::Matching),
    Wyvern(<wyvern::Order as Adapter>::Matching),
    Foundation(<foundation::Order as Adapter>::Matching),
    Zora(<zora::Order as Adapter>::Matching),
    CryptoPunks(<cryptopunks::Order as Adapter>::Matching),
    Rarible(<rarible::Order as Adapter>::Matching),
    Universe(<universe::Order as Adapter>::Matching),
    Blur(<blur::Order as Adapter>::Matching),
    Forward(<forward::Order as Adapter>::Matching),
}

macro_rules! dispatch {
    ($raw:expr, $order:ident => $body:expr) => {
        match $raw {
            Raw::Seaport($order) => $body,
            Raw::LooksRare($order) => $body,
            Raw::ZeroExV4($order) => $body,
            Raw::Element($order) => $body,
            Raw::Wyvern($order) => $body,
            Raw::Foundation($order) => $body,
            Raw::Zora($order) => $body,
            Raw::CryptoPunks($order) => $body,
            Raw::Rarible($order) => $body,
            Raw::Universe($order) => $body,
            Raw::Blur($order) => $body,
            Raw::Forward($order) => $body,
        }
    };
}

macro_rules! matching {
    ($raw:expr, $taker:expr, $config:expr, $($variant:ident),*) => {
        match $raw {
            $(Raw::$variant(order) => {
                MatchParams::$variant(order.build_matching($taker, $config)?)
            })*
        }
    };
}

macro_rules! fill {
    ($raw:expr, $matching:expr, $signature:expr, $config:expr, $($variant:ident),*) => {
        match ($raw, $matching) {
            $((Raw::$variant(order), MatchParams::$variant(matching)) => {
                order.fill($signature, matching, $config)
            })*
            _ => Err(Error::InvalidParams(
                "matching parameters belong to another protocol".to_string(),
            )),
        }
    };
}

/// A maker order of any protocol together with its signature.
#[derive(Clone, Debug)]
pub struct Order {
    pub raw: Raw,
    pub signature: Option<Signature>,
}

impl Order {
    /// Builds an unsigned order. Orders that live on-chain carry the
    /// [`Signature::OnChain`] marker right away.
    pub fn build(kind: ProtocolKind, params: &BuildParams, config: &Config) -> Result<Self, Error> {
        params.validate()?;
        let raw = match kind {
            ProtocolKind::Seaport => Raw::Seaport(seaport::Order::build(params, config)?),
            ProtocolKind::LooksRare => Raw::LooksRare(looks_rare::Order::build(params, config)?),
            ProtocolKind::ZeroExV4 => Raw::ZeroExV4(zeroex::Order::build(params, config)?),
            ProtocolKind::Element => Raw::Element(element::Order::build(params, config)?),
            ProtocolKind::Wyvern => Raw::Wyvern(wyvern::Order::build(params, config)?),
            ProtocolKind::Foundation => {
                Raw::Foundation(foundation::Order::build(params, config)?)
            }
            ProtocolKind::Zora => Raw::Zora(zora::Order::build(params, config)?),
            ProtocolKind::CryptoPunks => {
                Raw::CryptoPunks(cryptopunks::Order::build(params, config)?)
            }
            ProtocolKind::Rarible => Raw::Rarible(rarible::Order::build(params, config)?),
            ProtocolKind::Universe => Raw::Universe(universe::Order::build(params, config)?),
            ProtocolKind::Blur => Raw::Blur(blur::Order::build(params, config)?),
            ProtocolKind::Forward => Raw::Forward(forward::Order::build(params, config)?),
        };
        let order = Self::new(raw);
        tracing::debug!(kind = %order.kind(), side = %params.side, "built order");
        Ok(order)
    }

    pub fn new(raw: Raw) -> Self {
        let signature = dispatch!(&raw, order => {
            (order.signing_scheme() == SigningScheme::OnChain).then_some(Signature::OnChain)
        });
        Self { raw, signature }
    }

    pub fn kind(&self) -> ProtocolKind {
        fn kind<A: Adapter>(_: &A) -> ProtocolKind {
            A::KIND
        }
        dispatch!(&self.raw, order => kind(order))
    }

    pub fn info(&self, config: &Config) -> Info {
        dispatch!(&self.raw, order => order.info(config))
    }

    pub fn hash(&self, config: &Config) -> B256 {
        dispatch!(&self.raw, order => order.hash(config))
    }

    pub fn signing_hash(&self, config: &Config) -> B256 {
        dispatch!(&self.raw, order => order.signing_hash(config))
    }

    pub fn signing_scheme(&self) -> SigningScheme {
        dispatch!(&self.raw, order => order.signing_scheme())
    }

    /// Signs the order with the maker's key.
    pub fn sign(&mut self, signer: &PrivateKeySigner, config: &Config) -> Result<(), Error> {
        let Some(scheme) = self.signing_scheme().try_to_ecdsa_scheme() else {
            return Err(Error::Unsupported {
                kind: self.kind(),
                operation: "off-chain signatures",
            });
        };
        if signer.address() != self.info(config).maker {
            return Err(Error::InvalidParams("signer is not the maker".to_string()));
        }
        self.signature = Some(Signature::sign(
            scheme,
            &self.signing_hash(config),
            signer,
        )?);
        Ok(())
    }

    pub fn signed(mut self, signer: &PrivateKeySigner, config: &Config) -> Result<Self, Error> {
        self.sign(signer, config)?;
        Ok(self)
    }

    /// Checks that the order is signed by its maker under the protocol's
    /// signing scheme.
    pub fn verify_signature(&self, config: &Config) -> Result<(), Error> {
        let signature = self.signature.as_ref().ok_or(Error::MissingSignature)?;
        let scheme = self.signing_scheme();
        if signature.scheme() != scheme {
            return Err(Error::InvalidOrder(format!(
                "expected a {scheme:?} signature but got {:?}",
                signature.scheme()
            )));
        }
        if scheme == SigningScheme::OnChain {
            return Ok(());
        }
        Ok(signature.verify(&self.signing_hash(config), self.info(config).maker)?)
    }

    pub fn build_matching(&self, taker: &Taker, config: &Config) -> Result<MatchParams, Error> {
        Ok(matching!(
            &self.raw, taker, config, Seaport, LooksRare, ZeroExV4, Element, Wyvern, Foundation,
            Zora, CryptoPunks, Rarible, Universe, Blur, Forward
        ))
    }

    pub fn fill_with(
        &self,
        matching: &MatchParams,
        config: &Config,
    ) -> Result<ExchangeCall, Error> {
        let signature = self.signature.as_ref().ok_or(Error::MissingSignature)?;
        fill!(
            &self.raw, matching, signature, config, Seaport, LooksRare, ZeroExV4, Element, Wyvern,
            Foundation, Zora, CryptoPunks, Rarible, Universe, Blur, Forward
        )
    }

    /// Builds the matching for `taker` and encodes the exchange call.
    pub fn fill(&self, taker: &Taker, config: &Config) -> Result<ExchangeCall, Error> {
        let matching = self.build_matching(taker, config)?;
        let call = self.fill_with(&matching, config)?;
        tracing::debug!(kind = %self.kind(), ?call, "encoded fill");
        Ok(call)
    }

    pub fn check_fillability(
        &self,
        state: &dyn ChainState,
        config: &Config,
    ) -> Result<(), Unfillable> {
        let result = dispatch!(&self.raw, order => order.check_fillability(state, config));
        if let Err(err) = &result {
            tracing::debug!(kind = %self.kind(), ?err, "order is unfillable");
        }
        result
    }
}
