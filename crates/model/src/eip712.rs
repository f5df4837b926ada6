//! Types and procedures defined by EIP-712.
//!
//! https://eips.ethereum.org/EIPS/eip-712

use {
    alloy_primitives::{Address, B256, U256, keccak256},
    alloy_sol_types::SolValue,
    std::{fmt, str::FromStr, sync::LazyLock},
};

/// domainSeparator as defined by EIP-712.
///
/// The separator binds a typed-data digest to one exchange deployment: the
/// same struct hashes to a different message for every chain id and verifying
/// contract.
///
/// https://eips.ethereum.org/EIPS/eip-712#definition-of-domainseparator
#[derive(Copy, Clone, Default, Eq, Hash, PartialEq)]
pub struct DomainSeparator(pub B256);

impl DomainSeparator {
    pub fn new(name: &str, version: &str, chain_id: u64, verifying_contract: Address) -> Self {
        static DOMAIN_TYPE_HASH: LazyLock<B256> = LazyLock::new(|| {
            keccak256(
                b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
            )
        });

        Self(keccak256(
            (
                *DOMAIN_TYPE_HASH,
                keccak256(name.as_bytes()),
                keccak256(version.as_bytes()),
                U256::from(chain_id),
                verifying_contract,
            )
                .abi_encode(),
        ))
    }
}

impl FromStr for DomainSeparator {
    type Err = const_hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(B256::from_str(s)?))
    }
}

impl fmt::Debug for DomainSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", const_hex::encode(self.0))
    }
}

/// Returns the digest a maker signs for the given struct hash:
/// `keccak256("\x19\x01" ‖ domainSeparator ‖ hashStruct(message))`.
///
/// https://eips.ethereum.org/EIPS/eip-712#specification
pub fn hashed_eip712_message(domain: &DomainSeparator, struct_hash: &B256) -> B256 {
    let mut message = [0u8; 66];
    message[0..2].copy_from_slice(&[0x19, 0x01]);
    message[2..34].copy_from_slice(domain.0.as_slice());
    message[34..66].copy_from_slice(struct_hash.as_slice());
    keccak256(message)
}

/// Returns the EIP-191 `personal_sign` digest for a 32 byte hash:
/// `keccak256("\x19Ethereum Signed Message:\n32" ‖ hash)`.
///
/// https://eips.ethereum.org/EIPS/eip-191
pub fn hashed_ethsign_message(hash: &B256) -> B256 {
    let mut message = [0u8; 60];
    message[..28].copy_from_slice(b"\x19Ethereum Signed Message:\n32");
    message[28..].copy_from_slice(hash.as_slice());
    keccak256(message)
}

#[cfg(test)]
mod tests {
    use {super::*, alloy_primitives::address, hex_literal::hex};

    #[test]
    fn domain_separator_gnosis_protocol_goerli() {
        // Taken from the Gnosis Protocol v2 deployment at
        // 0x9008D19f58AAbD9eD0D60971565AA8510560ab41 on goerli.
        let domain = DomainSeparator::new(
            "Gnosis Protocol",
            "v2",
            5,
            address!("9008D19f58AAbD9eD0D60971565AA8510560ab41"),
        );
        assert_eq!(
            domain,
            DomainSeparator(B256::new(hex!(
                "fb378b35457022ecc5709ae5dafad9393c1387ae6d8ce24913a0c969074c07fb"
            )))
        );
    }

    #[test]
    fn domain_separator_depends_on_chain_and_contract() {
        let contract = Address::repeat_byte(1);
        let mainnet = DomainSeparator::new("Seaport", "1.5", 1, contract);
        let sepolia = DomainSeparator::new("Seaport", "1.5", 11155111, contract);
        let other = DomainSeparator::new("Seaport", "1.5", 1, Address::repeat_byte(2));
        assert_ne!(mainnet, sepolia);
        assert_ne!(mainnet, other);

        let struct_hash = B256::repeat_byte(7);
        assert_ne!(
            hashed_eip712_message(&mainnet, &struct_hash),
            hashed_eip712_message(&sepolia, &struct_hash)
        );
    }

    #[test]
    fn domain_separator_from_str() {
        assert!(
            DomainSeparator::from_str(
                "9d7e07ef92761aa9453ae5ff25083a2b19764131b15295d3c7e89f1f1b8c67d9"
            )
            .is_ok()
        );
    }
}
