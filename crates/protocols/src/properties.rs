//! Encodings of the token property validators criteria orders of ZeroEx V4
//! style exchanges point to.
//!
//! * bit vector: bit `id` is set, most significant bit of byte 0 is id 0
//! * packed list: one byte holding the width `w` of every id, followed by
//!   the sorted ids as `w`-byte big endian integers
//! * token range: `abi.encode(uint256 start, uint256 end)`, both inclusive

use {
    crate::{Criteria, Error, Target, config},
    alloy_primitives::{Address, Bytes, U256},
    alloy_sol_types::SolValue,
    itertools::Itertools,
};

/// Largest token id a bit vector is allowed to cover.
const MAX_BIT_VECTOR_ID: u64 = 1 << 24;

pub fn bit_vector(ids: &[U256]) -> Result<Bytes, Error> {
    let ids = ids
        .iter()
        .map(|id| {
            u64::try_from(*id)
                .ok()
                .filter(|id| *id <= MAX_BIT_VECTOR_ID)
                .ok_or_else(|| Error::params(format!("token {id} is too large for a bit vector")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let Some(max) = ids.iter().max() else {
        return Err(Error::params("bit vector without token ids"));
    };

    let mut bits = vec![0u8; usize::try_from(max / 8 + 1).unwrap_or_default()];
    for id in ids {
        bits[usize::try_from(id >> 3).unwrap_or_default()] |= 0x80 >> (id & 7);
    }
    Ok(bits.into())
}

pub fn bit_vector_contains(bits: &[u8], id: U256) -> bool {
    let Ok(id) = usize::try_from(id) else {
        return false;
    };
    bits.get(id >> 3)
        .is_some_and(|byte| byte & (0x80 >> (id & 7)) != 0)
}

pub fn packed_list(ids: &[U256]) -> Result<Bytes, Error> {
    let ids = ids.iter().copied().sorted().dedup().collect::<Vec<_>>();
    let Some(max) = ids.last() else {
        return Err(Error::params("packed list without token ids"));
    };
    let width = max.byte_len().max(1);

    let mut list = Vec::with_capacity(1 + width * ids.len());
    list.push(u8::try_from(width).unwrap_or(32));
    for id in ids {
        list.extend_from_slice(&id.to_be_bytes::<32>()[32 - width..]);
    }
    Ok(list.into())
}

/// `None` if the list is malformed.
pub fn packed_list_contains(list: &[u8], id: U256) -> Option<bool> {
    let (width, ids) = list.split_first()?;
    let width = usize::from(*width);
    if width == 0 || width > 32 || ids.len() % width != 0 {
        return None;
    }
    Some(
        ids.chunks(width)
            .any(|chunk| U256::from_be_slice(chunk) == id),
    )
}

pub fn token_range(start: U256, end: U256) -> Result<Bytes, Error> {
    if start > end {
        return Err(Error::params("token range start is after its end"));
    }
    Ok((start, end).abi_encode().into())
}

/// A property as committed to by an order: the validator contract and the
/// data it validates token ids against. A zero validator accepts any token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    pub validator: Address,
    pub data: Bytes,
}

/// Properties for a criteria target, empty for single token orders.
pub fn for_target(target: &Target, deployment: &config::ZeroEx) -> Result<Vec<Property>, Error> {
    let validator = |validator: Option<Address>, name: &str| {
        validator.ok_or_else(|| Error::params(format!("no {name} validator configured")))
    };
    Ok(match target {
        Target::Token(_) => Vec::new(),
        Target::Collection => vec![Property {
            validator: Address::ZERO,
            data: Bytes::new(),
        }],
        Target::BitVector(ids) => vec![Property {
            validator: validator(deployment.bit_vector_validator, "bit vector")?,
            data: bit_vector(ids)?,
        }],
        Target::PackedList(ids) => vec![Property {
            validator: validator(deployment.packed_list_validator, "packed list")?,
            data: packed_list(ids)?,
        }],
        Target::Range { start, end } => vec![Property {
            validator: validator(deployment.token_range_validator, "token range")?,
            data: token_range(*start, *end)?,
        }],
        Target::TokenList(_) => {
            return Err(Error::params(
                "merkle token lists are not supported, use a bit vector or packed list",
            ));
        }
    })
}

/// Recovers the criteria of an order from its token id and properties.
pub fn criteria(id: U256, properties: &[Property], deployment: &config::ZeroEx) -> Criteria {
    let Some(property) = properties.first() else {
        return Criteria::Token(id);
    };
    if property.validator.is_zero() {
        Criteria::Collection
    } else if Some(property.validator) == deployment.bit_vector_validator {
        Criteria::BitVector(property.data.clone())
    } else if Some(property.validator) == deployment.packed_list_validator {
        Criteria::PackedList(property.data.clone())
    } else if Some(property.validator) == deployment.token_range_validator {
        <(U256, U256)>::abi_decode(&property.data)
            .map(|(start, end)| Criteria::Range { start, end })
            .unwrap_or(Criteria::Collection)
    } else {
        Criteria::Collection
    }
}
