//! Fee arithmetic shared by the order adapters, the planner and the router
//! modules.
//!
//! All divisions round down. Partial fills prorate absolute amounts first and
//! only then split, so an order filled in pieces pays the same fees as the
//! exchange computes on-chain for each piece.

use {
    alloy_primitives::{Address, U256},
    number::math::{BPS_DENOMINATOR, mul_div},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum Error {
    #[error("basis point fees add up to {0} which is more than 100%")]
    BpsOverflow(u64),
    #[error("fees of {fees} exceed the price of {price}")]
    ExceedsPrice { fees: U256, price: U256 },
    #[error("cannot prorate over a total amount of zero")]
    ZeroTotal,
    #[error("arithmetic overflow")]
    Overflow,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeeAmount {
    /// Fraction of the price in basis points.
    Bps(u16),
    /// Fixed amount in the payment token.
    Absolute(U256),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Fee {
    pub recipient: Address,
    pub amount: FeeAmount,
}

impl Fee {
    pub fn bps(recipient: Address, bps: u16) -> Self {
        Self {
            recipient,
            amount: FeeAmount::Bps(bps),
        }
    }

    pub fn absolute(recipient: Address, amount: U256) -> Self {
        Self {
            recipient,
            amount: FeeAmount::Absolute(amount),
        }
    }

    /// The amount this fee takes out of `price`.
    pub fn amount_for(&self, price: U256) -> Result<U256, Error> {
        match self.amount {
            FeeAmount::Bps(bps) => number::math::bps(price, bps).ok_or(Error::Overflow),
            FeeAmount::Absolute(amount) => Ok(amount),
        }
    }
}

/// The result of splitting a price between the maker and the fee recipients.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Split {
    pub net: U256,
    pub fees: Vec<(Address, U256)>,
}

impl Split {
    pub fn total_fees(&self) -> U256 {
        self.fees.iter().map(|(_, amount)| *amount).sum()
    }
}

/// Splits `price` into the maker's net proceeds and one amount per fee.
///
/// `net + Σ fees == price` always holds.
pub fn split(price: U256, fees: &[Fee]) -> Result<Split, Error> {
    let total_bps = fees
        .iter()
        .filter_map(|fee| match fee.amount {
            FeeAmount::Bps(bps) => Some(u64::from(bps)),
            FeeAmount::Absolute(_) => None,
        })
        .sum::<u64>();
    if total_bps > BPS_DENOMINATOR {
        return Err(Error::BpsOverflow(total_bps));
    }

    let fees = fees
        .iter()
        .map(|fee| Ok((fee.recipient, fee.amount_for(price)?)))
        .collect::<Result<Vec<_>, Error>>()?;
    let total = fees
        .iter()
        .try_fold(U256::ZERO, |acc, (_, amount)| acc.checked_add(*amount))
        .ok_or(Error::Overflow)?;
    let net = price.checked_sub(total).ok_or(Error::ExceedsPrice {
        fees: total,
        price,
    })?;

    Ok(Split { net, fees })
}

/// `floor(amount * filled / total)`.
pub fn prorate(amount: U256, filled: U256, total: U256) -> Result<U256, Error> {
    if total.is_zero() {
        return Err(Error::ZeroTotal);
    }
    mul_div(amount, filled, total).ok_or(Error::Overflow)
}

/// Splits the price of a partial fill of `filled` out of `total` units.
///
/// Both the price and every absolute fee are prorated before basis point
/// fees are applied to the prorated price.
pub fn split_partial(
    price: U256,
    fees: &[Fee],
    filled: U256,
    total: U256,
) -> Result<Split, Error> {
    let price = prorate(price, filled, total)?;
    let fees = fees
        .iter()
        .map(|fee| {
            Ok(match fee.amount {
                FeeAmount::Absolute(amount) => {
                    Fee::absolute(fee.recipient, prorate(amount, filled, total)?)
                }
                FeeAmount::Bps(_) => *fee,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    split(price, &fees)
}

/// Referrer fee charged on top of the amount actually paid for a batch.
pub fn referrer_fee(paid: U256, bps: u16) -> Result<U256, Error> {
    if u64::from(bps) > BPS_DENOMINATOR {
        return Err(Error::BpsOverflow(bps.into()));
    }
    number::math::bps(paid, bps).ok_or(Error::Overflow)
}

/// Converts a list of fees into absolute amounts for `price`, in order.
pub fn absolute(price: U256, fees: &[Fee]) -> Result<Vec<(Address, U256)>, Error> {
    Ok(split(price, fees)?.fees)
}

#[cfg(test)]
mod tests {
    use {super::*, number::units::EthUnit, rstest::rstest};

    fn recipient(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn protocol_fee_of_a_listing() {
        let split = split(1.0.eth(), &[Fee::bps(recipient(1), 250)]).unwrap();
        assert_eq!(split.net, 0.975.eth());
        assert_eq!(split.fees, vec![(recipient(1), 0.025.eth())]);
    }

    #[rstest]
    #[case::no_fees(U256::from(1_000), vec![])]
    #[case::rounding(U256::from(999), vec![Fee::bps(recipient(1), 333), Fee::bps(recipient(2), 1)])]
    #[case::mixed(
        U256::from(10_001),
        vec![Fee::bps(recipient(1), 5_000), Fee::absolute(recipient(2), U256::from(17))],
    )]
    #[case::everything(U256::from(77), vec![Fee::bps(recipient(1), 10_000)])]
    fn no_wei_is_lost(#[case] price: U256, #[case] fees: Vec<Fee>) {
        let split = split(price, &fees).unwrap();
        assert_eq!(split.net + split.total_fees(), price);
    }

    #[test]
    fn bps_are_rounded_down() {
        let split = split(U256::from(999), &[Fee::bps(recipient(1), 333)]).unwrap();
        // 999 * 333 / 10000 = 33.2667
        assert_eq!(split.fees[0].1, U256::from(33));
        assert_eq!(split.net, U256::from(966));
    }

    #[test]
    fn invalid_fees() {
        assert_eq!(
            split(
                U256::from(100),
                &[Fee::bps(recipient(1), 6_000), Fee::bps(recipient(2), 4_001)]
            ),
            Err(Error::BpsOverflow(10_001))
        );
        assert_eq!(
            split(U256::from(100), &[Fee::absolute(recipient(1), U256::from(101))]),
            Err(Error::ExceedsPrice {
                fees: U256::from(101),
                price: U256::from(100)
            })
        );
        assert_eq!(prorate(U256::from(1), U256::ZERO, U256::ZERO), Err(Error::ZeroTotal));
    }

    #[test]
    fn partial_fill_prorates_before_splitting() {
        // 3 of 7 units, price 1000 and an absolute fee of 100.
        let split = split_partial(
            U256::from(1_000),
            &[
                Fee::absolute(recipient(1), U256::from(100)),
                Fee::bps(recipient(2), 250),
            ],
            U256::from(3),
            U256::from(7),
        )
        .unwrap();
        // floor(1000 * 3 / 7) = 428, floor(100 * 3 / 7) = 42, floor(428 * 250 / 10000) = 10
        assert_eq!(
            split.fees,
            vec![(recipient(1), U256::from(42)), (recipient(2), U256::from(10))]
        );
        assert_eq!(split.net, U256::from(428 - 42 - 10));
    }

    #[test]
    fn referrer_fee_over_paid_amount() {
        assert_eq!(referrer_fee(1.0.eth(), 100).unwrap(), 0.01.eth());
        // Only two of three listings of 1 ETH were bought.
        assert_eq!(referrer_fee(2.0.eth(), 100).unwrap(), 0.02.eth());
        assert_eq!(referrer_fee(1.0.eth(), 10_001), Err(Error::BpsOverflow(10_001)));
    }

    #[test]
    fn serialization() {
        let fee: Fee = serde_json::from_value(serde_json::json!({
            "recipient": "0x0101010101010101010101010101010101010101",
            "amount": { "bps": 250 },
        }))
        .unwrap();
        assert_eq!(fee, Fee::bps(recipient(1), 250));
    }
}
