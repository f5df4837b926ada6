//! Turns fill requests into the executions of one router transaction.
//!
//! Fills are grouped by protocol in the order they first appear and every
//! group becomes a single call into that protocol's module. Repeated fills
//! of one maker order draw from its remaining amount.

mod plan;

pub use plan::{Plan, Transaction};
use {
    alloy_primitives::{Address, B256, U256},
    alloy_sol_types::SolCall,
    indexmap::IndexMap,
    model::{
        ContractKind,
        ProtocolKind,
        Side,
        abi::{
            AmountCheckInfo,
            Fee,
            IERC721,
            IERC1155,
            IModule,
            Listing,
            ListingParams,
            Offer,
            OfferParams,
        },
        execution::{ExecutionInfo, FillPolicy, TransferItem, TransferKind},
    },
    protocols::{Criteria, Order, Taker},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Router deployment the planner targets.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub router: Address,
    pub approval_proxy: Address,
    #[serde(default)]
    pub modules: HashMap<ProtocolKind, Address>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no module configured for {0}")]
    UnknownModule(ProtocolKind),
    #[error(transparent)]
    Adapter(#[from] protocols::Error),
    #[error(transparent)]
    Fee(#[from] fee::Error),
    #[error("fills routed through one module have to share a payment token")]
    MixedPaymentTokens,
    #[error("amount checked fills have to target one token")]
    MixedTargets,
    #[error("expected a {expected} order")]
    WrongSide { expected: Side },
    #[error("{0} is the maker of its own order")]
    SelfFill(Address),
    #[error("nothing to fill")]
    Empty,
}

/// One concrete fill of a maker order.
#[derive(Clone, Debug)]
pub struct FillDetails {
    pub order: Order,
    pub contract_kind: ContractKind,
    pub contract: Address,
    pub token_id: U256,
    pub amount: U256,
    /// Token ids a Merkle criteria order committed to.
    pub criteria: Vec<U256>,
}

impl FillDetails {
    /// Fills one unit of the order's token. Criteria orders still need a
    /// token id, see [`FillDetails::with_token_id`].
    pub fn new(order: Order, config: &protocols::Config) -> Self {
        let info = order.info(config);
        let token_id = match info.criteria {
            Criteria::Token(id) => id,
            _ => U256::ZERO,
        };
        Self {
            order,
            contract_kind: info.contract_kind,
            contract: info.contract,
            token_id,
            amount: U256::from(1),
            criteria: Vec::new(),
        }
    }

    pub fn with_token_id(self, token_id: U256) -> Self {
        Self { token_id, ..self }
    }

    pub fn with_amount(self, amount: U256) -> Self {
        Self { amount, ..self }
    }

    pub fn with_criteria(self, criteria: Vec<U256>) -> Self {
        Self { criteria, ..self }
    }
}

pub struct Planner {
    config: Config,
    protocols: protocols::Config,
    timestamp: Option<u64>,
}

impl Planner {
    pub fn new(config: Config, protocols: protocols::Config) -> Self {
        Self {
            config,
            protocols,
            timestamp: None,
        }
    }

    /// Plans against the given block timestamp instead of the wall clock.
    pub fn at(self, timestamp: u64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..self
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn module(&self, kind: ProtocolKind) -> Result<Address, Error> {
        self.config
            .modules
            .get(&kind)
            .copied()
            .ok_or(Error::UnknownModule(kind))
    }

    /// The module fills on behalf of the taker and receives what the
    /// exchange hands out.
    fn taker(&self, module: Address, fill: &FillDetails) -> Taker {
        let taker = Taker::new(module)
            .with_token_id(fill.token_id)
            .with_amount(fill.amount)
            .with_criteria(fill.criteria.clone());
        match self.timestamp {
            Some(timestamp) => taker.at(timestamp),
            None => taker,
        }
    }

    /// Validates fills and groups them by protocol.
    fn group<'a>(
        &self,
        fills: &'a [FillDetails],
        taker: Address,
        side: Side,
    ) -> Result<IndexMap<ProtocolKind, Vec<&'a FillDetails>>, Error> {
        if fills.is_empty() {
            return Err(Error::Empty);
        }
        let mut remaining = HashMap::<B256, U256>::new();
        let mut groups = IndexMap::<_, Vec<_>>::new();
        for fill in fills {
            let info = fill.order.info(&self.protocols);
            if info.side != side {
                return Err(Error::WrongSide { expected: side });
            }
            if info.maker == taker {
                return Err(Error::SelfFill(taker));
            }
            fill.order.verify_signature(&self.protocols)?;

            let left = remaining
                .entry(fill.order.hash(&self.protocols))
                .or_insert(info.amount);
            *left = left
                .checked_sub(fill.amount)
                .ok_or(protocols::Error::PartialFillShortfall {
                    requested: fill.amount,
                    remaining: *left,
                })?;
            groups.entry(fill.order.kind()).or_default().push(fill);
        }
        Ok(groups)
    }

    fn referrer_fee(policy: &FillPolicy, total: U256) -> Result<Vec<Fee>, Error> {
        Ok(match policy.referrer_fee() {
            Some((recipient, bps)) => vec![Fee {
                recipient,
                amount: fee::referrer_fee(total, bps)?,
            }],
            None => Vec::new(),
        })
    }

    /// One `acceptListings` call buying all fills through the module of
    /// `kind`.
    fn listings(
        &self,
        kind: ProtocolKind,
        fills: &[&FillDetails],
        policy: &FillPolicy,
        plan: &mut Plan,
    ) -> Result<(), Error> {
        let module = self.module(kind)?;
        let mut token = None;
        let mut listings = Vec::with_capacity(fills.len());
        let mut total = U256::ZERO;
        for fill in fills {
            let info = fill.order.info(&self.protocols);
            if *token.get_or_insert(info.payment_token) != info.payment_token {
                return Err(Error::MixedPaymentTokens);
            }
            let call = fill
                .order
                .fill(&self.taker(module, fill), &self.protocols)?;
            total += if info.payment_token.is_zero() {
                call.value
            } else {
                fee::prorate(info.price, fill.amount, info.amount)?
            };
            listings.push(Listing {
                data: call.data,
                value: call.value,
                itemKind: fill.contract_kind.item_kind(),
                collection: fill.contract,
                tokenId: fill.token_id,
                amount: fill.amount,
            });
        }

        let token = token.unwrap_or_default();
        // ERC20 payments are held by the approval proxy and pulled by the
        // module when this execution runs.
        let payer = match token.is_zero() {
            true => Address::ZERO,
            false => self.config.approval_proxy,
        };
        let fees = Self::referrer_fee(policy, total)?;
        let cost = total + fees.iter().map(|fee| fee.amount).sum::<U256>();
        let data = IModule::acceptListingsCall {
            listings,
            params: ListingParams {
                fillTo: policy.fill_to,
                refundTo: policy.refund_to,
                revertIfIncomplete: policy.revert_if_incomplete,
                token,
                amount: total,
                payer,
            },
            fees,
        }
        .abi_encode();

        let value = if token.is_zero() {
            cost
        } else {
            plan.transfers.push(TransferItem {
                kind: TransferKind::Erc20,
                token,
                identifier: U256::ZERO,
                amount: cost,
                recipient: module,
            });
            U256::ZERO
        };
        tracing::debug!(%kind, %module, fills = fills.len(), %total, "planned listings");
        plan.push(ExecutionInfo {
            module,
            data: data.into(),
            value,
        });
        Ok(())
    }

    /// One `acceptOffers` call selling into all fills through the module of
    /// `kind`. `pull` moves the sold tokens from the taker into the module.
    fn offers(
        &self,
        kind: ProtocolKind,
        fills: &[&FillDetails],
        policy: &FillPolicy,
        pull: bool,
        plan: &mut Plan,
    ) -> Result<(), Error> {
        let module = self.module(kind)?;
        let mut currency = None;
        let mut offers = Vec::with_capacity(fills.len());
        let mut proceeds = U256::ZERO;
        for fill in fills {
            let info = fill.order.info(&self.protocols);
            if *currency.get_or_insert(info.payment_token) != info.payment_token {
                return Err(Error::MixedPaymentTokens);
            }
            let call = fill
                .order
                .fill(&self.taker(module, fill), &self.protocols)?;
            proceeds += fee::prorate(info.price, fill.amount, info.amount)?;
            offers.push(Offer {
                data: call.data,
                itemKind: fill.contract_kind.item_kind(),
                collection: fill.contract,
                tokenId: fill.token_id,
                amount: fill.amount,
                currency: info.payment_token,
            });
            if pull {
                plan.transfers.push(TransferItem {
                    kind: fill.contract_kind.into(),
                    token: fill.contract,
                    identifier: fill.token_id,
                    amount: fill.amount,
                    recipient: module,
                });
            }
        }

        let data = IModule::acceptOffersCall {
            offers,
            params: OfferParams {
                fillTo: policy.fill_to,
                refundTo: policy.refund_to,
                revertIfIncomplete: policy.revert_if_incomplete,
            },
            fees: Self::referrer_fee(policy, proceeds)?,
        }
        .abi_encode();
        tracing::debug!(%kind, %module, fills = fills.len(), %proceeds, "planned offers");
        plan.push(ExecutionInfo {
            module,
            data: data.into(),
            value: U256::ZERO,
        });
        Ok(())
    }

    /// Buys listings, one module call per protocol.
    pub fn plan_listings(
        &self,
        fills: &[FillDetails],
        taker: Address,
        policy: &FillPolicy,
    ) -> Result<Plan, Error> {
        let mut plan = Plan::default();
        for (kind, fills) in self.group(fills, taker, Side::Sell)? {
            self.listings(kind, &fills, policy, &mut plan)?;
        }
        Ok(plan)
    }

    /// Sells the taker's tokens into bids. The approval proxy moves the
    /// tokens into the modules first.
    pub fn plan_offers(
        &self,
        fills: &[FillDetails],
        taker: Address,
        policy: &FillPolicy,
    ) -> Result<Plan, Error> {
        let mut plan = Plan::default();
        for (kind, fills) in self.group(fills, taker, Side::Buy)? {
            self.offers(kind, &fills, policy, true, &mut plan)?;
        }
        Ok(plan)
    }

    /// Buys a listing and sells the bought token into a bid in the same
    /// transaction. The listing's module delivers the token to the offer's
    /// module, so the taker never holds it.
    pub fn plan_listing_into_offer(
        &self,
        listing: &FillDetails,
        offer: &FillDetails,
        taker: Address,
        policy: &FillPolicy,
    ) -> Result<Plan, Error> {
        let listings = self.group(std::slice::from_ref(listing), taker, Side::Sell)?;
        let offers = self.group(std::slice::from_ref(offer), taker, Side::Buy)?;
        let offer_module = self.module(offer.order.kind())?;
        let offer = offer.clone().with_token_id(listing.token_id);

        let mut plan = Plan::default();
        let buy = FillPolicy {
            fill_to: offer_module,
            revert_if_incomplete: true,
            ..*policy
        };
        for (kind, fills) in listings {
            self.listings(kind, &fills, &buy, &mut plan)?;
        }
        let sell = FillPolicy {
            referrer: None,
            referrer_fee_bps: None,
            revert_if_incomplete: true,
            ..*policy
        };
        for kind in offers.into_keys() {
            self.offers(kind, &[&offer], &sell, false, &mut plan)?;
        }
        Ok(plan)
    }

    /// Buys listings one module call each, stopping once `fill_to` holds
    /// `threshold` of the listed token and reverting if it never does.
    ///
    /// The threshold applies to the full balance of `fill_to`, including
    /// tokens it held before.
    pub fn plan_amount_checked(
        &self,
        fills: &[FillDetails],
        taker: Address,
        policy: &FillPolicy,
        threshold: U256,
    ) -> Result<Plan, Error> {
        self.group(fills, taker, Side::Sell)?;
        let first = fills.first().ok_or(Error::Empty)?;
        let same_target = |fill: &FillDetails| {
            fill.contract == first.contract
                && fill.contract_kind == first.contract_kind
                && (fill.contract_kind == ContractKind::Erc721 || fill.token_id == first.token_id)
        };
        if !fills.iter().all(same_target) {
            return Err(Error::MixedTargets);
        }

        let policy = FillPolicy {
            revert_if_incomplete: false,
            ..*policy
        };
        let mut plan = Plan::default();
        for fill in fills {
            self.listings(fill.order.kind(), &[fill], &policy, &mut plan)?;
        }

        let owner = policy.fill_to;
        let data = match first.contract_kind {
            ContractKind::Erc721 => IERC721::balanceOfCall { owner }.abi_encode(),
            ContractKind::Erc1155 => IERC1155::balanceOfCall {
                owner,
                id: first.token_id,
            }
            .abi_encode(),
        };
        plan.amount_check = Some(AmountCheckInfo {
            target: first.contract,
            data: data.into(),
            threshold,
        });
        Ok(plan)
    }

    /// Encodes a plan for this planner's router deployment.
    pub fn transaction(&self, plan: &Plan) -> Transaction {
        plan.transaction(self.config.router, self.config.approval_proxy)
    }
}
