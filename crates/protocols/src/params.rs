use {
    crate::Error,
    alloy_primitives::{Address, B256, Bytes, U256},
    model::{ContractKind, ProtocolKind, Side},
    std::fmt::{self, Debug, Formatter},
};

/// Seconds a default listing time lies in the past to tolerate clock skew
/// between the maker and the chain.
pub const LISTING_TIME_SKEW: u64 = 60;

/// Which tokens of a collection an order applies to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Token(U256),
    /// Any token of the collection.
    Collection,
    /// Any token in the list, committed to by a Merkle root.
    TokenList(Vec<U256>),
    /// Any token in the list, committed to as a bit vector.
    BitVector(Vec<U256>),
    /// Any token in the list, committed to as a packed list of ids.
    PackedList(Vec<U256>),
    /// Any token with `start <= id <= end`.
    Range { start: U256, end: U256 },
}

impl Target {
    pub fn token_id(&self) -> Option<U256> {
        match self {
            Target::Token(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_criteria(&self) -> bool {
        !matches!(self, Target::Token(_))
    }
}

/// Criteria an existing order commits to, as far as it can be recovered from
/// the order itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Criteria {
    Token(U256),
    Collection,
    MerkleRoot(B256),
    BitVector(Bytes),
    PackedList(Bytes),
    Range { start: U256, end: U256 },
}

impl Criteria {
    /// Whether `id` satisfies the criteria, `None` if that can't be decided
    /// from the commitment alone.
    pub fn accepts(&self, id: U256) -> Option<bool> {
        match self {
            Criteria::Token(token) => Some(*token == id),
            Criteria::Collection => Some(true),
            Criteria::MerkleRoot(_) => None,
            Criteria::BitVector(bits) => Some(crate::properties::bit_vector_contains(bits, id)),
            Criteria::PackedList(list) => {
                Some(crate::properties::packed_list_contains(list, id).unwrap_or(false))
            }
            Criteria::Range { start, end } => Some(*start <= id && id <= *end),
        }
    }
}

/// Everything needed to build a new order of any protocol.
#[derive(Clone, Debug)]
pub struct BuildParams {
    pub maker: Address,
    pub side: Side,
    pub contract_kind: ContractKind,
    pub contract: Address,
    pub target: Target,
    /// Number of units, always 1 for ERC721.
    pub amount: U256,
    /// Zero address for the native currency.
    pub payment_token: Address,
    /// Total price of all units including fees.
    pub price: U256,
    pub fees: Vec<fee::Fee>,
    pub listing_time: Option<u64>,
    /// `None` for orders that never expire (or the protocol maximum).
    pub expiration_time: Option<u64>,
    pub salt: Option<U256>,
    pub nonce: Option<U256>,
}

impl BuildParams {
    /// A native currency listing of a single token.
    pub fn listing(
        maker: Address,
        contract_kind: ContractKind,
        contract: Address,
        token_id: U256,
        price: U256,
    ) -> Self {
        Self {
            maker,
            side: Side::Sell,
            contract_kind,
            contract,
            target: Target::Token(token_id),
            amount: U256::from(1),
            payment_token: Address::ZERO,
            price,
            fees: Vec::new(),
            listing_time: None,
            expiration_time: None,
            salt: None,
            nonce: None,
        }
    }

    /// A bid paying `price` of `payment_token` for tokens matching `target`.
    pub fn bid(
        maker: Address,
        contract_kind: ContractKind,
        contract: Address,
        target: Target,
        payment_token: Address,
        price: U256,
    ) -> Self {
        Self {
            side: Side::Buy,
            target,
            payment_token,
            ..Self::listing(maker, contract_kind, contract, U256::ZERO, price)
        }
    }

    pub fn with_amount(self, amount: U256) -> Self {
        Self { amount, ..self }
    }

    pub fn with_fees(self, fees: Vec<fee::Fee>) -> Self {
        Self { fees, ..self }
    }

    pub fn with_payment_token(self, payment_token: Address) -> Self {
        Self {
            payment_token,
            ..self
        }
    }

    pub fn with_times(self, listing_time: u64, expiration_time: Option<u64>) -> Self {
        Self {
            listing_time: Some(listing_time),
            expiration_time,
            ..self
        }
    }

    pub fn with_salt(self, salt: U256) -> Self {
        Self {
            salt: Some(salt),
            ..self
        }
    }

    pub fn with_nonce(self, nonce: U256) -> Self {
        Self {
            nonce: Some(nonce),
            ..self
        }
    }

    pub fn listing_time(&self) -> u64 {
        self.listing_time
            .unwrap_or_else(|| now().saturating_sub(LISTING_TIME_SKEW))
    }

    pub fn salt(&self) -> U256 {
        self.salt.unwrap_or_else(random_salt)
    }

    pub fn nonce(&self) -> U256 {
        self.nonce.unwrap_or_default()
    }

    /// Rejects parameters no protocol can express.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.maker.is_zero() {
            return Err(Error::params("maker is the zero address"));
        }
        if self.contract.is_zero() {
            return Err(Error::params("contract is the zero address"));
        }
        if self.amount.is_zero() {
            return Err(Error::params("amount is zero"));
        }
        if self.contract_kind == ContractKind::Erc721 && self.amount != U256::from(1) {
            return Err(Error::params("ERC721 orders are for exactly one token"));
        }
        if self.side == Side::Buy && self.payment_token.is_zero() {
            return Err(Error::params("bids have to be paid in an ERC20 token"));
        }
        Ok(())
    }

    /// Rejects criteria listings for protocols that only list single tokens.
    pub(crate) fn require_token_listing(&self, kind: ProtocolKind) -> Result<(), Error> {
        if self.side == Side::Sell && self.target.is_criteria() {
            return Err(Error::params(format!(
                "{kind} does not support criteria sell orders"
            )));
        }
        Ok(())
    }

    /// Splits the price between the maker and the fee recipients.
    pub(crate) fn split(&self) -> Result<fee::Split, Error> {
        Ok(fee::split(self.price, &self.fees)?)
    }

    /// Fees as basis points of the price, for protocols that store rates.
    pub(crate) fn fee_bps(&self) -> Result<Vec<(Address, u16)>, Error> {
        if self.price.is_zero() && !self.fees.is_empty() {
            return Err(Error::params("fees on a zero price"));
        }
        self.split()?
            .fees
            .into_iter()
            .map(|(recipient, amount)| {
                let denominator = U256::from(number::math::BPS_DENOMINATOR);
                let bps = number::math::mul_div(amount, denominator, self.price)
                    .ok_or(Error::Fee(fee::Error::Overflow))?;
                let exact = number::math::mul_div(bps, self.price, denominator);
                match u16::try_from(bps) {
                    Ok(bps) if exact == Some(amount) => Ok((recipient, bps)),
                    _ => Err(Error::params("fees have to be whole basis points")),
                }
            })
            .collect()
    }
}

/// Taker side of a fill.
#[derive(Clone, Debug)]
pub struct Taker {
    /// Account calling the exchange.
    pub address: Address,
    /// Account receiving the bought token or the bid's payment.
    pub recipient: Address,
    /// Concrete token sold into a criteria bid.
    pub token_id: Option<U256>,
    pub amount: U256,
    /// Token ids a Merkle criteria order committed to, to derive proofs.
    pub criteria: Vec<U256>,
    /// Timestamp used for the taker's own counter order.
    pub timestamp: u64,
}

impl Taker {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            recipient: address,
            token_id: None,
            amount: U256::from(1),
            criteria: Vec::new(),
            timestamp: now(),
        }
    }

    pub fn with_recipient(self, recipient: Address) -> Self {
        Self { recipient, ..self }
    }

    pub fn with_token_id(self, token_id: U256) -> Self {
        Self {
            token_id: Some(token_id),
            ..self
        }
    }

    pub fn with_amount(self, amount: U256) -> Self {
        Self { amount, ..self }
    }

    pub fn with_criteria(self, criteria: Vec<U256>) -> Self {
        Self { criteria, ..self }
    }

    pub fn at(self, timestamp: u64) -> Self {
        Self { timestamp, ..self }
    }

    /// The token id sold into an order with the given criteria.
    pub(crate) fn resolve(&self, criteria: &Criteria) -> Result<U256, Error> {
        let id = match criteria {
            Criteria::Token(id) => return Ok(*id),
            _ => self
                .token_id
                .ok_or_else(|| Error::params("criteria orders need a token id"))?,
        };
        if criteria.accepts(id) == Some(false) {
            return Err(Error::params(format!("token {id} does not match the criteria")));
        }
        Ok(id)
    }

    /// Merkle proof for the resolved token id, empty for the zero root.
    pub(crate) fn proof(&self, root: B256, id: U256) -> Result<Vec<B256>, Error> {
        if root.is_zero() {
            return Ok(Vec::new());
        }
        let tree = merkle::MerkleTree::new(self.criteria.iter().copied())
            .map_err(|_| Error::params("criteria token ids are missing"))?;
        if tree.root() != root {
            return Err(Error::params("criteria token ids do not match the root"));
        }
        tree.proof(id)
            .ok_or_else(|| Error::params(format!("token {id} is not part of the criteria")))
    }

    /// Checks the requested amount against what the order offers.
    pub(crate) fn check_amount(&self, available: U256) -> Result<(), Error> {
        if self.amount.is_zero() {
            return Err(Error::params("amount is zero"));
        }
        if self.amount > available {
            return Err(Error::PartialFillShortfall {
                requested: self.amount,
                remaining: available,
            });
        }
        Ok(())
    }
}

/// Normalised view of an order of any protocol.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Info {
    pub kind: ProtocolKind,
    pub maker: Address,
    pub side: Side,
    pub contract_kind: ContractKind,
    pub contract: Address,
    pub criteria: Criteria,
    /// Zero address for the native currency.
    pub payment_token: Address,
    /// Total price of all units, what the buyer pays including fees.
    pub price: U256,
    pub amount: U256,
    /// Zero for orders that never expire.
    pub expiration_time: u64,
}

impl Info {
    pub fn unit_price(&self) -> U256 {
        if self.amount.is_zero() {
            return self.price;
        }
        self.price / self.amount
    }
}

/// A call into an exchange contract that fills an order.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct ExchangeCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl Debug for ExchangeCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeCall")
            .field("to", &self.to)
            .field("data", &const_hex::encode_prefixed(&self.data))
            .field("value", &self.value)
            .finish()
    }
}

pub fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

pub fn random_salt() -> U256 {
    U256::from_be_bytes(rand::random::<[u8; 32]>())
}

/// Checks an order's validity window against a timestamp; an expiration of
/// zero never expires.
pub(crate) fn time_window(
    timestamp: u64,
    listing_time: u64,
    expiration_time: u64,
) -> Result<(), crate::Unfillable> {
    if timestamp < listing_time {
        return Err(crate::Unfillable::NotYetValid);
    }
    if expiration_time != 0 && timestamp >= expiration_time {
        return Err(crate::Unfillable::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn default_listing_time_tolerates_skew() {
        let params = BuildParams::listing(
            Address::repeat_byte(1),
            ContractKind::Erc721,
            Address::repeat_byte(2),
            U256::from(1),
            U256::from(1),
        );
        let listing_time = params.listing_time();
        assert!(listing_time <= now() - LISTING_TIME_SKEW);
        assert!(listing_time + LISTING_TIME_SKEW + 5 >= now());
    }

    #[test]
    fn validation() {
        let listing = BuildParams::listing(
            Address::repeat_byte(1),
            ContractKind::Erc721,
            Address::repeat_byte(2),
            U256::from(1),
            U256::from(1),
        );
        assert!(listing.validate().is_ok());
        assert!(
            listing
                .clone()
                .with_amount(U256::from(2))
                .validate()
                .is_err()
        );
        let native_bid = BuildParams::bid(
            Address::repeat_byte(1),
            ContractKind::Erc721,
            Address::repeat_byte(2),
            Target::Collection,
            Address::ZERO,
            U256::from(1),
        );
        assert!(native_bid.validate().is_err());
    }

    #[test]
    fn criteria_acceptance() {
        assert_eq!(Criteria::Collection.accepts(U256::from(5)), Some(true));
        assert_eq!(
            Criteria::Range {
                start: U256::from(1),
                end: U256::from(3)
            }
            .accepts(U256::from(4)),
            Some(false)
        );
        assert_eq!(Criteria::MerkleRoot(B256::ZERO).accepts(U256::from(1)), None);
    }

    #[test]
    fn taker_amounts() {
        let taker = Taker::new(Address::repeat_byte(1)).with_amount(U256::from(3));
        assert!(taker.check_amount(U256::from(3)).is_ok());
        assert!(matches!(
            taker.check_amount(U256::from(2)),
            Err(Error::PartialFillShortfall { .. })
        ));
    }

    #[test]
    fn time_windows() {
        assert!(time_window(100, 50, 0).is_ok());
        assert_eq!(time_window(40, 50, 0), Err(crate::Unfillable::NotYetValid));
        assert_eq!(time_window(200, 50, 200), Err(crate::Unfillable::Expired));
    }

    #[rstest]
    #[case::bps(fee::Fee::bps(Address::repeat_byte(9), 250), Some(250))]
    #[case::whole_absolute(fee::Fee::absolute(Address::repeat_byte(9), U256::from(500)), Some(5))]
    #[case::fraction(fee::Fee::absolute(Address::repeat_byte(9), U256::from(1)), None)]
    fn fees_as_basis_points(#[case] fee: fee::Fee, #[case] expected: Option<u16>) {
        let params = BuildParams::listing(
            Address::repeat_byte(1),
            ContractKind::Erc721,
            Address::repeat_byte(2),
            U256::from(1),
            U256::from(1_000_000),
        )
        .with_fees(vec![fee]);
        let bps = params.fee_bps().ok().map(|fees| fees[0].1);
        assert_eq!(bps, expected);
    }

    #[test]
    fn fees_as_basis_points_of_large_prices() {
        let price = U256::MAX / U256::from(20_000) * U256::from(10_000);
        let params = BuildParams::listing(
            Address::repeat_byte(1),
            ContractKind::Erc721,
            Address::repeat_byte(2),
            U256::from(1),
            price,
        )
        .with_fees(vec![fee::Fee::bps(Address::repeat_byte(9), 250)]);
        assert_eq!(params.fee_bps().unwrap(), vec![(Address::repeat_byte(9), 250)]);
    }
}
