use alloy_primitives::{
    U256,
    utils::{ParseUnits, Unit, parse_units},
};

pub trait EthUnit: std::marker::Sized {
    /// Returns the current wei amount.
    fn wei(self) -> U256;

    /// Returns the current Gwei amount as wei (i.e. 1e9 wei).
    fn gwei(self) -> U256 {
        self.wei() * Unit::GWEI.wei()
    }

    /// Returns the current Eth amount as wei (i.e. 1e18 wei).
    fn eth(self) -> U256 {
        self.wei() * Unit::ETHER.wei()
    }
}

impl EthUnit for u64 {
    fn wei(self) -> U256 {
        U256::from(self)
    }
}

impl EthUnit for u128 {
    fn wei(self) -> U256 {
        U256::from(self)
    }
}

impl EthUnit for f64 {
    fn wei(self) -> U256 {
        match parse_units(&self.to_string(), "wei") {
            Ok(ParseUnits::U256(val)) => val,
            _ => panic!("could not parse number as u256: {self}"),
        }
    }

    fn gwei(self) -> U256 {
        match parse_units(&self.to_string(), "gwei") {
            Ok(ParseUnits::U256(val)) => val,
            _ => panic!("could not parse number as u256: {self}"),
        }
    }

    fn eth(self) -> U256 {
        match parse_units(&self.to_string(), "ether") {
            Ok(ParseUnits::U256(val)) => val,
            _ => panic!("could not parse number as u256: {self}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_units() {
        assert_eq!(1u64.eth(), U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(0.975.eth(), U256::from(975_000_000_000_000_000u128));
        assert_eq!(2u64.gwei(), U256::from(2_000_000_000u64));
    }
}
