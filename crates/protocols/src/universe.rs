//! Universe, a fork of Rarible's ExchangeV2.
//!
//! Orders and matching work like [`rarible`], fees are encoded as the
//! revenue splits of the `ORDER_DATA` format.

use {
    crate::{
        Adapter,
        ChainState,
        Config,
        Error,
        ExchangeCall,
        Info,
        Taker,
        Unfillable,
        rarible::{self, Data, Matching},
    },
    alloy_primitives::B256,
    model::{
        ProtocolKind,
        signature::{Signature, SigningScheme},
    },
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order(pub rarible::Order);

impl Adapter for Order {
    const KIND: ProtocolKind = ProtocolKind::Universe;
    type Matching = Matching;

    fn build(params: &crate::BuildParams, config: &Config) -> Result<Self, Error> {
        let deployment = Config::require(&config.universe, Self::KIND)?;
        rarible::Order::build_with(params, deployment, |revenue_splits| Data::Universe {
            revenue_splits,
        })
        .map(Self)
    }

    fn info(&self, _: &Config) -> Info {
        self.0.info_as(Self::KIND)
    }

    fn hash(&self, _: &Config) -> B256 {
        self.0.hash_key()
    }

    fn signing_hash(&self, config: &Config) -> B256 {
        self.0.digest(config.chain_id)
    }

    fn signing_scheme(&self) -> SigningScheme {
        SigningScheme::Eip712
    }

    /// Universe has no payouts, the bought asset goes to the caller.
    fn build_matching(&self, taker: &Taker, _: &Config) -> Result<Matching, Error> {
        self.0.counter(
            taker,
            Self::KIND,
            Data::Universe {
                revenue_splits: Vec::new(),
            },
        )
    }

    fn fill(
        &self,
        signature: &Signature,
        matching: &Matching,
        _: &Config,
    ) -> Result<ExchangeCall, Error> {
        self.0.match_orders(signature, matching)
    }

    fn check_fillability(&self, state: &dyn ChainState, config: &Config) -> Result<(), Unfillable> {
        let deployment = config
            .universe
            .as_ref()
            .ok_or_else(|| Unfillable::State("universe is not deployed".to_string()))?;
        self.0.check_with(state, deployment, &self.info(config))
    }
}
