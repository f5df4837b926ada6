use {
    alloy_primitives::{Address, Bytes, U256},
    alloy_sol_types::SolCall,
    model::{
        abi::{self, AmountCheckInfo, IApprovalProxy, IRouter},
        execution::{ExecutionInfo, TransferItem},
    },
    std::fmt::{self, Debug, Formatter},
};

/// Executions for one router transaction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Plan {
    pub executions: Vec<ExecutionInfo>,
    /// Native value the transaction has to carry.
    pub value: U256,
    /// Taker tokens the approval proxy moves into modules before executing.
    pub transfers: Vec<TransferItem>,
    pub amount_check: Option<AmountCheckInfo>,
}

impl Plan {
    pub(crate) fn push(&mut self, execution: ExecutionInfo) {
        self.value += execution.value;
        self.executions.push(execution);
    }

    fn abi_executions(&self) -> Vec<abi::ExecutionInfo> {
        self.executions.iter().cloned().map(Into::into).collect()
    }

    /// Encodes the transaction. Plans moving taker tokens go through the
    /// approval proxy, all others call the router directly.
    pub fn transaction(&self, router: Address, approval_proxy: Address) -> Transaction {
        let executions = self.abi_executions();
        let items = self
            .transfers
            .iter()
            .copied()
            .map(Into::into)
            .collect::<Vec<abi::TransferItem>>();
        let (to, data) = match (items.is_empty(), self.amount_check.clone()) {
            (true, None) => (
                router,
                IRouter::executeCall {
                    executionInfos: executions,
                }
                .abi_encode(),
            ),
            (true, Some(check)) => (
                router,
                IRouter::executeWithAmountCheckCall {
                    executionInfos: executions,
                    amountCheckInfo: check,
                }
                .abi_encode(),
            ),
            (false, None) => (
                approval_proxy,
                IApprovalProxy::bulkTransferWithExecuteCall {
                    items,
                    executionInfos: executions,
                }
                .abi_encode(),
            ),
            (false, Some(check)) => (
                approval_proxy,
                IApprovalProxy::bulkTransferWithExecuteAndAmountCheckCall {
                    items,
                    executionInfos: executions,
                    amountCheckInfo: check,
                }
                .abi_encode(),
            ),
        };
        Transaction {
            to,
            data: data.into(),
            value: self.value,
        }
    }
}

/// A transaction the taker sends.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Transaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl Debug for Transaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("to", &self.to)
            .field("data", &const_hex::encode_prefixed(&self.data))
            .field("value", &self.value)
            .finish()
    }
}
