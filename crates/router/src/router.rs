//! The router contract and its amount guard.

use {
    crate::{Contract, Env, Revert},
    alloy_primitives::{Address, Bytes, U256},
    alloy_sol_types::{SolInterface, SolValue},
    indexmap::IndexSet,
    model::abi::{AmountCheckInfo, ExecutionInfo, IRouter},
    std::collections::HashSet,
};

/// Runs executions against registered modules and guarantees that neither
/// the router nor any module it called keeps anything afterwards.
#[derive(Clone, Debug, Default)]
pub struct Router {
    modules: HashSet<Address>,
}

impl Router {
    pub fn new(modules: impl IntoIterator<Item = Address>) -> Self {
        Self {
            modules: modules.into_iter().collect(),
        }
    }

    fn execute(
        &self,
        env: &mut Env<'_>,
        executions: &[ExecutionInfo],
        amount_check: Option<&AmountCheckInfo>,
    ) -> Result<(), Revert> {
        let mut touched = IndexSet::new();
        for (index, execution) in executions.iter().enumerate() {
            if let Some(check) = amount_check {
                let amount = read_amount(env, check)?;
                if amount >= check.threshold {
                    tracing::debug!(index, %amount, "amount check met, stopping early");
                    break;
                }
            }
            if !self.modules.contains(&execution.module) {
                return Err(Revert::UnknownModule(execution.module));
            }
            touched.insert(execution.module);
            env.call(execution.module, execution.value, &execution.data)
                .map_err(|err| {
                    tracing::debug!(index, module = %execution.module, ?err, "execution failed");
                    Revert::UnsuccessfulExecution
                })?;
        }

        if let Some(check) = amount_check {
            let amount = read_amount(env, check)?;
            if amount < check.threshold {
                return Err(Revert::AmountCheckFailed {
                    amount,
                    threshold: check.threshold,
                });
            }
        }

        let leftover = env.balance();
        let caller = env.caller;
        env.send(caller, leftover)?;

        for holder in std::iter::once(env.this).chain(touched) {
            if let Some((asset, amount)) = env.chain.ledger().holdings(holder).into_iter().next() {
                return Err(Revert::ResidualBalance {
                    holder,
                    asset,
                    amount,
                });
            }
        }
        Ok(())
    }
}

/// Reads the guarded amount with a static call, e.g. a `balanceOf`.
fn read_amount(env: &Env<'_>, check: &AmountCheckInfo) -> Result<U256, Revert> {
    let output = env
        .chain
        .view(check.target, &check.data)
        .map_err(|err| Revert::custom(format!("amount check read failed: {err}")))?;
    Ok(U256::abi_decode(&output)?)
}

impl Contract for Router {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        match IRouter::IRouterCalls::abi_decode(input)? {
            IRouter::IRouterCalls::execute(call) => {
                self.execute(env, &call.executionInfos, None)?;
            }
            IRouter::IRouterCalls::executeWithAmountCheck(call) => {
                self.execute(env, &call.executionInfos, Some(&call.amountCheckInfo))?;
            }
        }
        Ok(Bytes::new())
    }
}
