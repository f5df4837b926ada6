//! Per-chain deployment addresses handed to every adapter.

use {
    alloy_primitives::{Address, B256, address, b256},
    model::ProtocolKind,
    serde::{Deserialize, Serialize},
};

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub chain_id: u64,
    /// Wrapped native token used for bids.
    pub weth: Address,
    pub seaport: Option<Seaport>,
    pub looks_rare: Option<LooksRare>,
    pub zeroex_v4: Option<ZeroEx>,
    pub element: Option<ZeroEx>,
    pub wyvern: Option<Wyvern>,
    pub foundation: Option<Foundation>,
    pub zora: Option<Zora>,
    pub cryptopunks: Option<CryptoPunks>,
    pub rarible: Option<Rarible>,
    pub universe: Option<Rarible>,
    pub blur: Option<Blur>,
    pub forward: Option<Forward>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Seaport {
    pub exchange: Address,
    /// EIP-712 domain version, e.g. `1.5`.
    pub version: String,
    /// Operator makers approve, resolved on-chain from `conduit_key`.
    pub conduit: Address,
    pub conduit_key: B256,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LooksRare {
    pub exchange: Address,
    pub transfer_manager_erc721: Address,
    pub transfer_manager_erc1155: Address,
    pub strategy_standard: Address,
    pub strategy_collection: Address,
}

/// Deployment of a ZeroEx V4 style exchange (ZeroEx itself and Element).
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ZeroEx {
    pub exchange: Address,
    #[serde(default)]
    pub bit_vector_validator: Option<Address>,
    #[serde(default)]
    pub packed_list_validator: Option<Address>,
    #[serde(default)]
    pub token_range_validator: Option<Address>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum WyvernVersion {
    /// Packed order hash signed with the `personal_sign` prefix.
    #[serde(rename = "2")]
    V2,
    /// EIP-712 order hash including the maker's nonce.
    #[default]
    #[serde(rename = "2.3")]
    V2_3,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Wyvern {
    pub exchange: Address,
    #[serde(default)]
    pub version: WyvernVersion,
    pub proxy_registry: Address,
    pub token_transfer_proxy: Address,
    pub merkle_validator: Address,
    /// Fee recipient used when a listing carries no fee.
    pub fee_recipient: Address,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Foundation {
    pub market: Address,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Zora {
    pub asks: Address,
    pub erc721_transfer_helper: Address,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CryptoPunks {
    pub market: Address,
}

/// Deployment of a Rarible ExchangeV2 style exchange (Rarible and Universe).
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Rarible {
    pub exchange: Address,
    pub nft_transfer_proxy: Address,
    pub erc20_transfer_proxy: Address,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Blur {
    pub exchange: Address,
    pub execution_delegate: Address,
    pub policy_erc721: Address,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Forward {
    pub exchange: Address,
}

impl Config {
    /// Known Ethereum mainnet deployments.
    pub fn mainnet() -> Self {
        Self {
            chain_id: 1,
            weth: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            seaport: Some(Seaport {
                exchange: address!("00000000000000ADc04C56Bf30aC9d3c0aAF14dC"),
                version: "1.5".to_string(),
                conduit: address!("1E0049783F008A0085193E00003D00cd54003c71"),
                conduit_key: b256!(
                    "0000007b02230091a7ed01230072f7006a004d60a8d4e71d599b8104250f0000"
                ),
            }),
            looks_rare: Some(LooksRare {
                exchange: address!("59728544B08AB483533076417FbBB2fD0B17CE3a"),
                transfer_manager_erc721: address!("f42aa99F011A1fA7CDA90E5E98b277E306BcA83e"),
                transfer_manager_erc1155: address!("FED24eC7E22f573c2e08AEF55aA6797Ca2b3A051"),
                strategy_standard: address!("56244Bb70CbD3EA9Dc8007399F61dFC065190031"),
                strategy_collection: address!("86F909F70813CdB1Bc733f4D97Dc6b03B8e7E8F3"),
            }),
            zeroex_v4: Some(ZeroEx {
                exchange: address!("Def1C0ded9bec7F1a1670819833240f027b25EfF"),
                bit_vector_validator: None,
                packed_list_validator: None,
                token_range_validator: None,
            }),
            element: Some(ZeroEx {
                exchange: address!("20F780A973856B93f63670377900C1d2a50a77c4"),
                bit_vector_validator: None,
                packed_list_validator: None,
                token_range_validator: None,
            }),
            wyvern: Some(Wyvern {
                exchange: address!("7f268357A8c2552623316e2562D90e642bB538E5"),
                version: WyvernVersion::V2_3,
                proxy_registry: address!("a5409ec958C83C3f309868babACA7c86DCB077c1"),
                token_transfer_proxy: address!("E5c783EE536cf5E63E792988335c4255169be4E1"),
                merkle_validator: address!("BAf2127B49fC93CbcA6269FAdE0F7F31dF4c88a7"),
                fee_recipient: address!("5b3256965e7C3cF26E11FCAf296DfC8807C01073"),
            }),
            foundation: Some(Foundation {
                market: address!("cDA72070E455bb31C7690a170224Ce43623d0B6f"),
            }),
            zora: Some(Zora {
                asks: address!("6170B3C3A54C3d8c854934cBC314eD479b2B29A3"),
                erc721_transfer_helper: address!("909e9efE4D87d1a6018C2065aE642b6D0447bc91"),
            }),
            cryptopunks: Some(CryptoPunks {
                market: address!("b47e3cd837dDF8e4c57F05d70Ab865de6e193BBB"),
            }),
            rarible: Some(Rarible {
                exchange: address!("9757F2d2b135150BBeb65308D4a91804107cd8D6"),
                nft_transfer_proxy: address!("4fEE7B061C97C9c496b01DbcE9CDb10c02f0a0Be"),
                erc20_transfer_proxy: address!("b8e4526e0da700e9ef1f879af713d691f81507d8"),
            }),
            universe: None,
            blur: Some(Blur {
                exchange: address!("000000000000Ad05Ccc4F10045630fb830B95127"),
                execution_delegate: address!("00000000000111AbE46ff893f3B2fdF1F759a8A8"),
                policy_erc721: address!("00000000006411739DA1c40B106F8511de5D1FAC"),
            }),
            forward: None,
        }
    }

    /// Presets for a chain, or an empty table that has to be configured
    /// explicitly.
    pub fn for_chain(chain_id: u64) -> Self {
        match chain_id {
            1 => Self::mainnet(),
            _ => Self {
                chain_id,
                ..Default::default()
            },
        }
    }

    pub(crate) fn require<'a, T>(
        deployment: &'a Option<T>,
        kind: ProtocolKind,
    ) -> Result<&'a T, crate::Error> {
        deployment.as_ref().ok_or(crate::Error::NotDeployed(kind))
    }

    /// The exchange contract orders of `kind` are filled against.
    pub fn exchange(&self, kind: ProtocolKind) -> Option<Address> {
        match kind {
            ProtocolKind::Seaport => self.seaport.as_ref().map(|d| d.exchange),
            ProtocolKind::LooksRare => self.looks_rare.as_ref().map(|d| d.exchange),
            ProtocolKind::ZeroExV4 => self.zeroex_v4.as_ref().map(|d| d.exchange),
            ProtocolKind::Element => self.element.as_ref().map(|d| d.exchange),
            ProtocolKind::Wyvern => self.wyvern.as_ref().map(|d| d.exchange),
            ProtocolKind::Foundation => self.foundation.as_ref().map(|d| d.market),
            ProtocolKind::Zora => self.zora.as_ref().map(|d| d.asks),
            ProtocolKind::CryptoPunks => self.cryptopunks.as_ref().map(|d| d.market),
            ProtocolKind::Rarible => self.rarible.as_ref().map(|d| d.exchange),
            ProtocolKind::Universe => self.universe.as_ref().map(|d| d.exchange),
            ProtocolKind::Blur => self.blur.as_ref().map(|d| d.exchange),
            ProtocolKind::Forward => self.forward.as_ref().map(|d| d.exchange),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, strum::IntoEnumIterator};

    #[test]
    fn mainnet_presets() {
        let config = Config::mainnet();
        let missing = ProtocolKind::iter()
            .filter(|kind| config.exchange(*kind).is_none())
            .collect::<Vec<_>>();
        assert_eq!(missing, vec![ProtocolKind::Universe, ProtocolKind::Forward]);
    }

    #[test]
    fn unknown_chains_start_empty() {
        let config = Config::for_chain(5);
        assert_eq!(config.chain_id, 5);
        assert!(config.seaport.is_none());
        assert_eq!(Config::for_chain(1), Config::mainnet());
    }
}
