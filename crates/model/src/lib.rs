//! Contains models that are shared between the protocol adapters, the
//! execution planner and the router.

pub mod abi;
pub mod eip712;
pub mod execution;
pub mod signature;

use {
    alloy_primitives::{Address, U256},
    serde::{Deserialize, Serialize},
    strum::{Display, EnumIter, EnumString},
};

pub use eip712::DomainSeparator;

/// Address used by several exchanges in place of a token address to denote
/// the chain's native currency.
pub const NATIVE_TOKEN_SENTINEL: Address = Address::repeat_byte(0xee);

/// The exchange protocol an order originates from.
///
/// Adding a protocol means adding a variant here and an adapter
/// implementation in the `protocols` crate.
#[derive(
    Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProtocolKind {
    Seaport,
    LooksRare,
    #[serde(rename = "zeroex-v4")]
    #[strum(serialize = "zeroex-v4")]
    ZeroExV4,
    Element,
    Wyvern,
    Foundation,
    Zora,
    #[serde(rename = "cryptopunks")]
    #[strum(serialize = "cryptopunks")]
    CryptoPunks,
    Rarible,
    Universe,
    Blur,
    Forward,
}

/// Which side of the trade the maker is on. A `Sell` order is a listing (the
/// maker offers an NFT), a `Buy` order is a bid (the maker offers payment).
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Buy,
    #[default]
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContractKind {
    #[default]
    Erc721,
    Erc1155,
}

impl ContractKind {
    /// Item kind as used by the module ABI (`0` = ERC721, `1` = ERC1155).
    pub fn item_kind(self) -> u8 {
        match self {
            ContractKind::Erc721 => 0,
            ContractKind::Erc1155 => 1,
        }
    }

    pub fn from_item_kind(kind: u8) -> Option<Self> {
        match kind {
            0 => Some(ContractKind::Erc721),
            1 => Some(ContractKind::Erc1155),
            _ => None,
        }
    }
}

/// Anything with a balance that a fill can move around.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Asset {
    Native,
    Erc20 { token: Address },
    Erc721 { contract: Address, id: U256 },
    Erc1155 { contract: Address, id: U256 },
}

impl Asset {
    pub fn nft(kind: ContractKind, contract: Address, id: U256) -> Self {
        match kind {
            ContractKind::Erc721 => Asset::Erc721 { contract, id },
            ContractKind::Erc1155 => Asset::Erc1155 { contract, id },
        }
    }

    /// The payment asset for a payment token address, where the zero address
    /// denotes the native currency.
    pub fn payment(token: Address) -> Self {
        if token.is_zero() || token == NATIVE_TOKEN_SENTINEL {
            Asset::Native
        } else {
            Asset::Erc20 { token }
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::str::FromStr};

    #[test]
    fn protocol_kind_names() {
        assert_eq!(ProtocolKind::LooksRare.to_string(), "looks-rare");
        assert_eq!(ProtocolKind::ZeroExV4.to_string(), "zeroex-v4");
        assert_eq!(
            ProtocolKind::from_str("cryptopunks").unwrap(),
            ProtocolKind::CryptoPunks
        );
        assert_eq!(
            serde_json::to_value(ProtocolKind::ZeroExV4).unwrap(),
            serde_json::json!("zeroex-v4")
        );
    }

    #[test]
    fn payment_assets() {
        assert_eq!(Asset::payment(Address::ZERO), Asset::Native);
        assert_eq!(Asset::payment(NATIVE_TOKEN_SENTINEL), Asset::Native);
        let weth = Address::repeat_byte(1);
        assert_eq!(Asset::payment(weth), Asset::Erc20 { token: weth });
    }
}
