use {
    crate::abi,
    alloy_primitives::{Address, Bytes, U256},
    serde::{Deserialize, Serialize},
    std::fmt::{self, Debug, Formatter},
    strum::Display,
};

/// One planned call of the router into a module.
#[derive(Clone, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    pub module: Address,
    pub data: Bytes,
    pub value: U256,
}

impl Debug for ExecutionInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionInfo")
            .field("module", &self.module)
            .field("data", &const_hex::encode_prefixed(&self.data))
            .field("value", &self.value)
            .finish()
    }
}

impl From<ExecutionInfo> for abi::ExecutionInfo {
    fn from(execution: ExecutionInfo) -> Self {
        Self {
            module: execution.module,
            data: execution.data,
            value: execution.value,
        }
    }
}

impl From<abi::ExecutionInfo> for ExecutionInfo {
    fn from(execution: abi::ExecutionInfo) -> Self {
        Self {
            module: execution.module,
            data: execution.data,
            value: execution.value,
        }
    }
}

/// Token standard of an item the approval proxy moves on the taker's behalf.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransferKind {
    Erc20,
    Erc721,
    Erc1155,
}

impl TransferKind {
    pub fn as_u8(self) -> u8 {
        match self {
            TransferKind::Erc20 => 0,
            TransferKind::Erc721 => 1,
            TransferKind::Erc1155 => 2,
        }
    }

    pub fn from_u8(kind: u8) -> Option<Self> {
        match kind {
            0 => Some(TransferKind::Erc20),
            1 => Some(TransferKind::Erc721),
            2 => Some(TransferKind::Erc1155),
            _ => None,
        }
    }
}

impl From<crate::ContractKind> for TransferKind {
    fn from(kind: crate::ContractKind) -> Self {
        match kind {
            crate::ContractKind::Erc721 => TransferKind::Erc721,
            crate::ContractKind::Erc1155 => TransferKind::Erc1155,
        }
    }
}

/// An approved item moved from the taker to `recipient` before the router
/// executes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferItem {
    pub kind: TransferKind,
    pub token: Address,
    pub identifier: U256,
    pub amount: U256,
    pub recipient: Address,
}

impl From<TransferItem> for abi::TransferItem {
    fn from(item: TransferItem) -> Self {
        Self {
            itemKind: item.kind.as_u8(),
            token: item.token,
            identifier: item.identifier,
            amount: item.amount,
            recipient: item.recipient,
        }
    }
}

/// Where filled items go, where leftovers go and how failures are treated
/// for one router call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillPolicy {
    pub fill_to: Address,
    pub refund_to: Address,
    /// A failing fill reverts the whole transaction instead of being skipped.
    pub revert_if_incomplete: bool,
    #[serde(default)]
    pub referrer: Option<Address>,
    #[serde(default)]
    pub referrer_fee_bps: Option<u16>,
}

impl FillPolicy {
    /// Fills and refunds go to the taker, failing fills are skipped and no
    /// referrer is paid.
    pub fn new(taker: Address) -> Self {
        Self {
            fill_to: taker,
            refund_to: taker,
            revert_if_incomplete: false,
            referrer: None,
            referrer_fee_bps: None,
        }
    }

    pub fn with_referrer(self, referrer: Address, bps: u16) -> Self {
        Self {
            referrer: Some(referrer),
            referrer_fee_bps: Some(bps),
            ..self
        }
    }

    pub fn strict(self) -> Self {
        Self {
            revert_if_incomplete: true,
            ..self
        }
    }

    /// The referrer and its fee, if both are set and the fee is non-zero.
    pub fn referrer_fee(&self) -> Option<(Address, u16)> {
        match (self.referrer, self.referrer_fee_bps) {
            (Some(referrer), Some(bps)) if bps > 0 => Some((referrer, bps)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn referrer_fee_requires_both_fields() {
        let taker = Address::repeat_byte(1);
        let referrer = Address::repeat_byte(2);
        assert_eq!(FillPolicy::new(taker).referrer_fee(), None);
        assert_eq!(
            FillPolicy::new(taker)
                .with_referrer(referrer, 100)
                .referrer_fee(),
            Some((referrer, 100))
        );
        assert_eq!(
            FillPolicy::new(taker)
                .with_referrer(referrer, 0)
                .referrer_fee(),
            None
        );
    }

    #[test]
    fn deserialize_policy_defaults() {
        let policy: FillPolicy = serde_json::from_value(json!({
            "fillTo": "0x0101010101010101010101010101010101010101",
            "refundTo": "0x0202020202020202020202020202020202020202",
            "revertIfIncomplete": true,
        }))
        .unwrap();
        assert_eq!(policy.fill_to, Address::repeat_byte(1));
        assert_eq!(policy.refund_to, Address::repeat_byte(2));
        assert!(policy.revert_if_incomplete);
        assert_eq!(policy.referrer_fee(), None);
    }

    #[test]
    fn transfer_kinds() {
        for kind in [TransferKind::Erc20, TransferKind::Erc721, TransferKind::Erc1155] {
            assert_eq!(TransferKind::from_u8(kind.as_u8()), Some(kind));
        }
        assert_eq!(TransferKind::from_u8(3), None);
        assert_eq!(
            TransferKind::from(crate::ContractKind::Erc1155).to_string(),
            "erc1155"
        );
    }

    #[test]
    fn execution_info_abi_conversion() {
        let execution = ExecutionInfo {
            module: Address::repeat_byte(3),
            data: vec![1, 2, 3].into(),
            value: U256::from(7),
        };
        let abi: abi::ExecutionInfo = execution.clone().into();
        assert_eq!(ExecutionInfo::from(abi), execution);
        assert!(format!("{execution:?}").contains("0x010203"));
    }
}
