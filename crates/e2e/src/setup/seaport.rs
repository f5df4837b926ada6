//! Reference Seaport: fills advanced orders the way the deployed exchange
//! does, including signature checks against the offerer's counter,
//! fractional fills and criteria resolution.

use {
    super::{load, slot, word},
    alloy_primitives::{Address, B256, Bytes, U256},
    alloy_sol_types::{SolCall, SolInterface, SolStruct},
    model::{
        DomainSeparator,
        abi::{IERC20, IERC721, IERC1155},
        eip712::hashed_eip712_message,
        signature::{Signature, SigningScheme},
    },
    protocols::{
        ChainState,
        seaport::{
            CriteriaResolver,
            ISeaport::{self, ISeaportCalls},
            Order,
            OrderComponents,
            item,
            order_type,
        },
    },
    router::{Chain, Contract, Env, Revert},
};

pub struct Seaport {
    version: String,
}

struct Transfer {
    item_type: u8,
    token: Address,
    id: U256,
    amount: U256,
    from: Address,
    to: Address,
}

impl Seaport {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    fn counter_slot(offerer: Address) -> B256 {
        slot(b"counter", offerer.as_slice())
    }

    fn cancelled_slot(hash: B256) -> B256 {
        slot(b"cancelled", hash.as_slice())
    }

    fn filled_slots(hash: B256) -> (B256, B256) {
        (slot(b"filled", hash.as_slice()), slot(b"size", hash.as_slice()))
    }

    fn fulfill(
        &self,
        env: &mut Env<'_>,
        call: ISeaport::fulfillAdvancedOrderCall,
    ) -> Result<Bytes, Revert> {
        let order = call.advancedOrder;
        let parameters = order.parameters;
        let counter = load(env.sload(Self::counter_slot(parameters.offerer)));
        let hash = Order::components_from(&parameters, counter).eip712_hash_struct();

        let domain =
            DomainSeparator::new("Seaport", &self.version, env.chain.chain_id(), env.this);
        Signature::from_bytes(SigningScheme::Eip712, &order.signature)
            .map_err(|_| Revert::custom("invalid signature"))?
            .verify(&hashed_eip712_message(&domain, &hash), parameters.offerer)
            .map_err(|_| Revert::custom("invalid signer"))?;

        let now = U256::from(env.timestamp());
        if now < parameters.startTime || now >= parameters.endTime {
            return Err(Revert::custom("inactive order"));
        }
        if !env.sload(Self::cancelled_slot(hash)).is_zero() {
            return Err(Revert::custom("order is cancelled"));
        }

        let (numerator, denominator) = (U256::from(order.numerator), U256::from(order.denominator));
        if numerator.is_zero() || numerator > denominator {
            return Err(Revert::custom("bad fraction"));
        }
        if parameters.orderType == order_type::FULL_OPEN && numerator != denominator {
            return Err(Revert::custom("partial fills not enabled"));
        }
        let (filled_slot, size_slot) = Self::filled_slots(hash);
        let (filled, size) = (load(env.sload(filled_slot)), load(env.sload(size_slot)));
        let (filled, size) = if size.is_zero() {
            (numerator, denominator)
        } else {
            (filled * denominator + numerator * size, size * denominator)
        };
        if filled > size {
            return Err(Revert::custom("order is filled"));
        }
        env.sstore(filled_slot, word(filled));
        env.sstore(size_slot, word(size));

        let mut offer = parameters.offer;
        let mut consideration = parameters.consideration;
        for resolver in &call.criteriaResolvers {
            let index = usize::try_from(resolver.index).map_err(|_| Revert::InvalidCalldata)?;
            let (item_type, identifier) = match resolver.side {
                0 => offer
                    .get_mut(index)
                    .map(|item| (&mut item.itemType, &mut item.identifierOrCriteria)),
                _ => consideration
                    .get_mut(index)
                    .map(|item| (&mut item.itemType, &mut item.identifierOrCriteria)),
            }
            .ok_or(Revert::InvalidCalldata)?;
            resolve(item_type, identifier, resolver)?;
        }

        let fulfiller = env.caller;
        let recipient = if call.recipient.is_zero() {
            fulfiller
        } else {
            call.recipient
        };
        let scale = |amount: U256| {
            number::math::mul_div(amount, numerator, denominator)
                .ok_or_else(|| Revert::custom("overflow"))
        };

        for item in &offer {
            transfer(
                env,
                Transfer {
                    item_type: item.itemType,
                    token: item.token,
                    id: item.identifierOrCriteria,
                    amount: scale(item.startAmount)?,
                    from: parameters.offerer,
                    to: recipient,
                },
            )?;
        }
        let mut value = env.value;
        for item in &consideration {
            let amount = scale(item.startAmount)?;
            if item.itemType == item::NATIVE {
                value = value
                    .checked_sub(amount)
                    .ok_or(Revert::InsufficientBalance)?;
                env.send(item.recipient, amount)?;
            } else {
                transfer(
                    env,
                    Transfer {
                        item_type: item.itemType,
                        token: item.token,
                        id: item.identifierOrCriteria,
                        amount,
                        from: fulfiller,
                        to: item.recipient,
                    },
                )?;
            }
        }
        env.send(fulfiller, value)?;

        tracing::debug!(?hash, %numerator, %denominator, "seaport order fulfilled");
        Ok(ISeaport::fulfillAdvancedOrderCall::abi_encode_returns(&true).into())
    }

    fn cancel(env: &mut Env<'_>, orders: &[OrderComponents]) -> Result<Bytes, Revert> {
        for order in orders {
            if env.caller != order.offerer && env.caller != order.zone {
                return Err(Revert::Unauthorized);
            }
            env.sstore(
                Self::cancelled_slot(order.eip712_hash_struct()),
                B256::with_last_byte(1),
            );
        }
        Ok(ISeaport::cancelCall::abi_encode_returns(&true).into())
    }
}

/// Replaces a criteria item's root with the resolved token id.
fn resolve(
    item_type: &mut u8,
    identifier: &mut U256,
    resolver: &CriteriaResolver,
) -> Result<(), Revert> {
    let root = B256::from(identifier.to_be_bytes::<32>());
    let proof = &resolver.criteriaProof;
    if !root.is_zero() && !merkle::verify(root, resolver.identifier, proof, proof.len()) {
        return Err(Revert::custom("invalid criteria proof"));
    }
    *item_type = match *item_type {
        item::ERC721_WITH_CRITERIA => item::ERC721,
        item::ERC1155_WITH_CRITERIA => item::ERC1155,
        _ => return Err(Revert::custom("criteria resolved for a plain item")),
    };
    *identifier = resolver.identifier;
    Ok(())
}

fn transfer(env: &mut Env<'_>, transfer: Transfer) -> Result<(), Revert> {
    let Transfer {
        item_type,
        token,
        id,
        amount,
        from,
        to,
    } = transfer;
    match item_type {
        item::ERC20 => env
            .call_sol(token, U256::ZERO, &IERC20::transferFromCall { from, to, amount })
            .map(|_| ()),
        item::ERC721 => env
            .call_sol(
                token,
                U256::ZERO,
                &IERC721::transferFromCall {
                    from,
                    to,
                    tokenId: id,
                },
            )
            .map(|_| ()),
        item::ERC1155 => env
            .call_sol(
                token,
                U256::ZERO,
                &IERC1155::safeTransferFromCall {
                    from,
                    to,
                    id,
                    amount,
                    data: Bytes::new(),
                },
            )
            .map(|_| ()),
        item::ERC721_WITH_CRITERIA | item::ERC1155_WITH_CRITERIA => {
            Err(Revert::custom("unresolved criteria"))
        }
        _ => Err(Revert::custom(format!("unsupported item type {item_type}"))),
    }
}

impl Contract for Seaport {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        match ISeaportCalls::abi_decode(input)? {
            ISeaportCalls::fulfillAdvancedOrder(call) => self.fulfill(env, call),
            ISeaportCalls::cancel(call) => Self::cancel(env, &call.orders),
            ISeaportCalls::incrementCounter(_) => {
                let slot = Self::counter_slot(env.caller);
                let counter = load(env.sload(slot)) + U256::from(1);
                env.sstore(slot, word(counter));
                Ok(ISeaport::incrementCounterCall::abi_encode_returns(&counter).into())
            }
            ISeaportCalls::getCounter(_) | ISeaportCalls::getOrderStatus(_) => {
                self.view(&*env.chain, env.this, input)
            }
        }
    }

    fn view(&self, chain: &Chain, this: Address, input: &[u8]) -> Result<Bytes, Revert> {
        let ledger = chain.ledger();
        match ISeaportCalls::abi_decode(input)? {
            ISeaportCalls::getCounter(call) => {
                let counter = load(ledger.sload(this, Self::counter_slot(call.offerer)));
                Ok(ISeaport::getCounterCall::abi_encode_returns(&counter).into())
            }
            ISeaportCalls::getOrderStatus(call) => {
                let (filled, size) = Self::filled_slots(call.orderHash);
                let status = ISeaport::getOrderStatusReturn {
                    isValidated: false,
                    isCancelled: !ledger
                        .sload(this, Self::cancelled_slot(call.orderHash))
                        .is_zero(),
                    totalFilled: load(ledger.sload(this, filled)),
                    totalSize: load(ledger.sload(this, size)),
                };
                Ok(ISeaport::getOrderStatusCall::abi_encode_returns(&status).into())
            }
            _ => Err(Revert::InvalidCalldata),
        }
    }
}
