use {
    crate::eip712::hashed_ethsign_message,
    alloy_primitives::{Address, B256},
    alloy_signer::SignerSync,
    alloy_signer_local::PrivateKeySigner,
    serde::{Deserialize, Serialize, de},
    std::fmt::{self, Debug, Formatter},
};

/// See [`Signature`].
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
    #[default]
    Eip712,
    EthSign,
    OnChain,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EcdsaSigningScheme {
    Eip712,
    EthSign,
}

impl From<EcdsaSigningScheme> for SigningScheme {
    fn from(scheme: EcdsaSigningScheme) -> Self {
        match scheme {
            EcdsaSigningScheme::Eip712 => Self::Eip712,
            EcdsaSigningScheme::EthSign => Self::EthSign,
        }
    }
}

impl SigningScheme {
    pub fn try_to_ecdsa_scheme(&self) -> Option<EcdsaSigningScheme> {
        match self {
            Self::Eip712 => Some(EcdsaSigningScheme::Eip712),
            Self::EthSign => Some(EcdsaSigningScheme::EthSign),
            Self::OnChain => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ECDSA signature must be 65 bytes long, got {0}")]
    InvalidLength(usize),
    #[error("on-chain orders carry no signature bytes")]
    UnexpectedBytes,
    #[error("unable to recover signer: {0}")]
    Recovery(#[from] alloy_primitives::SignatureError),
    #[error("unable to sign: {0}")]
    Signing(#[from] alloy_signer::Error),
}

/// The recovered signer does not match the expected maker.
#[derive(Debug, thiserror::Error)]
#[error("signature mismatch: expected {expected}, recovered {recovered:?}")]
pub struct SignatureMismatch {
    pub expected: Address,
    pub recovered: Option<Address>,
}

/// Signature over an order.
///
/// The signed message is always derived from the protocol specific order
/// hash; the variant decides whether that hash is signed as is (EIP-712
/// digests) or wrapped in the EIP-191 `personal_sign` prefix first.
#[derive(Eq, PartialEq, Clone, Deserialize, Serialize, Hash)]
#[serde(into = "JsonSignature", try_from = "JsonSignature")]
pub enum Signature {
    /// The order's typed-data digest is signed directly.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712
    Eip712(EcdsaSignature),
    /// The order hash is signed according to EIP-191's personal_sign format.
    ///
    /// https://eips.ethereum.org/EIPS/eip-191
    EthSign(EcdsaSignature),
    /// The order was created by an on-chain transaction of the maker (escrow
    /// listings, asks, punk offers) and has no off-chain signature.
    OnChain,
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Signature::OnChain = self {
            return f.write_str("OnChain");
        }

        let scheme = format!("{:?}", self.scheme());
        let bytes = format!("0x{}", const_hex::encode(self.to_bytes()));
        f.debug_tuple(&scheme).field(&bytes).finish()
    }
}

impl Signature {
    /// Signs `hash` with the given key according to the scheme.
    pub fn sign(
        scheme: EcdsaSigningScheme,
        hash: &B256,
        signer: &PrivateKeySigner,
    ) -> Result<Self, Error> {
        Ok(EcdsaSignature::sign(scheme, hash, signer)?.to_signature(scheme))
    }

    /// Recovers the signer of the specified message.
    ///
    /// Returns `None` for on-chain orders which don't have a signer to
    /// recover.
    pub fn recover(&self, hash: &B256) -> Result<Option<Address>, Error> {
        match self {
            Self::Eip712(signature) => signature
                .recover(EcdsaSigningScheme::Eip712, hash)
                .map(Some),
            Self::EthSign(signature) => signature
                .recover(EcdsaSigningScheme::EthSign, hash)
                .map(Some),
            Self::OnChain => Ok(None),
        }
    }

    /// Checks that `expected` signed `hash`.
    pub fn verify(&self, hash: &B256, expected: Address) -> Result<(), SignatureMismatch> {
        let recovered = self.recover(hash).ok().flatten();
        match recovered {
            Some(recovered) if recovered == expected => Ok(()),
            _ => Err(SignatureMismatch {
                expected,
                recovered,
            }),
        }
    }

    pub fn from_bytes(scheme: SigningScheme, bytes: &[u8]) -> Result<Self, Error> {
        Ok(match scheme.try_to_ecdsa_scheme() {
            Some(ecdsa) => {
                let bytes: [u8; 65] = bytes
                    .try_into()
                    .map_err(|_| Error::InvalidLength(bytes.len()))?;
                EcdsaSignature::from_bytes(&bytes).to_signature(ecdsa)
            }
            None => {
                if !bytes.is_empty() {
                    return Err(Error::UnexpectedBytes);
                }
                Self::OnChain
            }
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Eip712(signature) | Self::EthSign(signature) => signature.to_bytes().to_vec(),
            Self::OnChain => Vec::new(),
        }
    }

    pub fn scheme(&self) -> SigningScheme {
        match self {
            Signature::Eip712(_) => SigningScheme::Eip712,
            Signature::EthSign(_) => SigningScheme::EthSign,
            Signature::OnChain => SigningScheme::OnChain,
        }
    }

    pub fn ecdsa(&self) -> Option<&EcdsaSignature> {
        match self {
            Self::Eip712(signature) | Self::EthSign(signature) => Some(signature),
            Self::OnChain => None,
        }
    }
}

/// An internal type used for deriving `serde` implementations for the
/// `Signature` type.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSignature {
    signing_scheme: SigningScheme,
    signature: alloy_primitives::Bytes,
}

impl From<Signature> for JsonSignature {
    fn from(signature: Signature) -> Self {
        Self {
            signing_scheme: signature.scheme(),
            signature: signature.to_bytes().into(),
        }
    }
}

impl TryFrom<JsonSignature> for Signature {
    type Error = Error;

    fn try_from(json: JsonSignature) -> Result<Self, Self::Error> {
        Self::from_bytes(json.signing_scheme, &json.signature)
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Hash)]
pub struct EcdsaSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

/// Returns the message used for signing and recovery for the specified hash.
fn signing_message(signing_scheme: EcdsaSigningScheme, hash: &B256) -> B256 {
    match signing_scheme {
        EcdsaSigningScheme::Eip712 => *hash,
        EcdsaSigningScheme::EthSign => hashed_ethsign_message(hash),
    }
}

impl EcdsaSignature {
    pub fn to_signature(self, scheme: EcdsaSigningScheme) -> Signature {
        match scheme {
            EcdsaSigningScheme::Eip712 => Signature::Eip712(self),
            EcdsaSigningScheme::EthSign => Signature::EthSign(self),
        }
    }

    /// r + s + v
    pub fn to_bytes(self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        EcdsaSignature {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        }
    }

    pub fn recover(
        &self,
        signing_scheme: EcdsaSigningScheme,
        hash: &B256,
    ) -> Result<Address, Error> {
        let message = signing_message(signing_scheme, hash);
        let signature = alloy_primitives::Signature::from_raw(&self.to_bytes())?;
        Ok(signature.recover_address_from_prehash(&message)?)
    }

    pub fn sign(
        signing_scheme: EcdsaSigningScheme,
        hash: &B256,
        signer: &PrivateKeySigner,
    ) -> Result<Self, Error> {
        let message = signing_message(signing_scheme, hash);
        let signature = signer.sign_hash_sync(&message)?;
        Ok(Self::from_bytes(&signature.as_bytes()))
    }
}

impl Serialize for EcdsaSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&const_hex::encode_prefixed(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for EcdsaSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").ok_or_else(|| {
            de::Error::custom(format!(
                "{s:?} can't be decoded as hex ecdsa signature because it does not start with \
                 '0x'"
            ))
        })?;
        let mut bytes = [0u8; 65];
        const_hex::decode_to_slice(s, &mut bytes).map_err(|err| {
            de::Error::custom(format!("failed to decode {s:?} as hex ecdsa signature: {err}"))
        })?;
        Ok(EcdsaSignature::from_bytes(&bytes))
    }
}
