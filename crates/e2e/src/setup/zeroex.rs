//! Reference ZeroEx V4 NFT feature for ERC721 orders and a bit vector
//! property validator.

use {
    super::slot,
    alloy_primitives::{Address, B256, Bytes, U256},
    alloy_sol_types::{SolCall, SolInterface, SolStruct, sol},
    model::{
        DomainSeparator,
        NATIVE_TOKEN_SENTINEL,
        abi::{IERC20, IERC721},
        eip712::hashed_eip712_message,
        signature::{EcdsaSignature, EcdsaSigningScheme},
    },
    protocols::{
        ChainState,
        properties,
        zeroex::{
            ERC721Order,
            IZeroEx::{self, IZeroExCalls},
            SignatureData,
            direction,
            status,
        },
    },
    router::{Chain, Contract, Env, Revert},
};

sol! {
    interface IPropertyValidator {
        function validateProperty(
            address tokenAddress,
            uint256 tokenId,
            bytes propertyData
        ) external view;
    }
}

pub struct ZeroEx;

impl ZeroEx {
    fn nonce_slot(maker: Address, nonce: U256) -> B256 {
        slot(b"nonce", &[maker.as_slice(), &nonce.to_be_bytes::<32>()].concat())
    }

    fn authenticate(
        env: &Env<'_>,
        order: &ERC721Order,
        signature: &SignatureData,
    ) -> Result<(), Revert> {
        if U256::from(env.timestamp()) >= order.expiry {
            return Err(Revert::custom("order expired"));
        }
        if !order.taker.is_zero() && order.taker != env.caller {
            return Err(Revert::Unauthorized);
        }
        let domain = DomainSeparator::new("ZeroEx", "1.0.0", env.chain.chain_id(), env.this);
        let digest = hashed_eip712_message(&domain, &order.eip712_hash_struct());
        let signer = EcdsaSignature {
            r: signature.r,
            s: signature.s,
            v: signature.v,
        }
        .recover(EcdsaSigningScheme::Eip712, &digest)
        .map_err(|_| Revert::custom("invalid signature"))?;
        if signer != order.maker {
            return Err(Revert::custom("invalid signer"));
        }
        if !env.sload(Self::nonce_slot(order.maker, order.nonce)).is_zero() {
            return Err(Revert::custom("order is not fillable"));
        }
        Ok(())
    }

    /// Checks a token against the order's properties, or its token id when
    /// it has none.
    fn validate(env: &Env<'_>, order: &ERC721Order, token_id: U256) -> Result<(), Revert> {
        if order.erc721TokenProperties.is_empty() {
            return if token_id == order.erc721TokenId {
                Ok(())
            } else {
                Err(Revert::custom("token id mismatch"))
            };
        }
        for property in &order.erc721TokenProperties {
            if property.propertyValidator.is_zero() {
                continue;
            }
            env.view(
                property.propertyValidator,
                &IPropertyValidator::validatePropertyCall {
                    tokenAddress: order.erc721Token,
                    tokenId: token_id,
                    propertyData: property.propertyData.clone(),
                },
            )?;
        }
        Ok(())
    }

    fn pay_erc20(
        env: &mut Env<'_>,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        env.call_sol(token, U256::ZERO, &IERC20::transferFromCall { from, to, amount })?;
        Ok(())
    }

    fn move_nft(
        env: &mut Env<'_>,
        order: &ERC721Order,
        id: U256,
        from: Address,
        to: Address,
    ) -> Result<(), Revert> {
        env.call_sol(
            order.erc721Token,
            U256::ZERO,
            &IERC721::transferFromCall {
                from,
                to,
                tokenId: id,
            },
        )?;
        Ok(())
    }

    fn buy(env: &mut Env<'_>, call: IZeroEx::buyERC721Call) -> Result<(), Revert> {
        let order = call.sellOrder;
        if order.direction != direction::SELL {
            return Err(Revert::custom("not a sell order"));
        }
        Self::authenticate(env, &order, &call.signature)?;
        env.sstore(Self::nonce_slot(order.maker, order.nonce), B256::with_last_byte(1));

        let buyer = env.caller;
        Self::move_nft(env, &order, order.erc721TokenId, order.maker, buyer)?;
        if order.erc20Token == NATIVE_TOKEN_SENTINEL {
            let mut value = env
                .value
                .checked_sub(order.erc20TokenAmount)
                .ok_or(Revert::InsufficientBalance)?;
            env.send(order.maker, order.erc20TokenAmount)?;
            for fee in &order.fees {
                value = value
                    .checked_sub(fee.amount)
                    .ok_or(Revert::InsufficientBalance)?;
                env.send(fee.recipient, fee.amount)?;
            }
            env.send(buyer, value)?;
        } else {
            Self::pay_erc20(env, order.erc20Token, buyer, order.maker, order.erc20TokenAmount)?;
            for fee in &order.fees {
                Self::pay_erc20(env, order.erc20Token, buyer, fee.recipient, fee.amount)?;
            }
        }
        tracing::debug!(nonce = %order.nonce, "zeroex sell order filled");
        Ok(())
    }

    fn sell(env: &mut Env<'_>, call: IZeroEx::sellERC721Call) -> Result<(), Revert> {
        let order = call.buyOrder;
        if order.direction != direction::BUY {
            return Err(Revert::custom("not a buy order"));
        }
        if call.unwrapNativeToken {
            return Err(Revert::custom("unwrapping is not supported"));
        }
        Self::authenticate(env, &order, &call.signature)?;
        Self::validate(env, &order, call.erc721TokenId)?;
        env.sstore(Self::nonce_slot(order.maker, order.nonce), B256::with_last_byte(1));

        let seller = env.caller;
        Self::move_nft(env, &order, call.erc721TokenId, seller, order.maker)?;
        Self::pay_erc20(env, order.erc20Token, order.maker, seller, order.erc20TokenAmount)?;
        for fee in &order.fees {
            Self::pay_erc20(env, order.erc20Token, order.maker, fee.recipient, fee.amount)?;
        }
        tracing::debug!(
            nonce = %order.nonce,
            token_id = %call.erc721TokenId,
            "zeroex buy order filled"
        );
        Ok(())
    }
}

impl Contract for ZeroEx {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        match IZeroExCalls::abi_decode(input)? {
            IZeroExCalls::buyERC721(call) => Self::buy(env, call)?,
            IZeroExCalls::sellERC721(call) => Self::sell(env, call)?,
            IZeroExCalls::cancelERC721Order(call) => {
                let slot = Self::nonce_slot(env.caller, call.orderNonce);
                env.sstore(slot, B256::with_last_byte(1));
            }
            IZeroExCalls::getERC721OrderStatus(_) => {
                return self.view(&*env.chain, env.this, input);
            }
            _ => return Err(Revert::custom("only ERC721 orders are supported")),
        }
        Ok(Bytes::new())
    }

    fn view(&self, chain: &Chain, this: Address, input: &[u8]) -> Result<Bytes, Revert> {
        let IZeroExCalls::getERC721OrderStatus(call) = IZeroExCalls::abi_decode(input)? else {
            return Err(Revert::InvalidCalldata);
        };
        let order = call.order;
        let used = !chain
            .ledger()
            .sload(this, Self::nonce_slot(order.maker, order.nonce))
            .is_zero();
        let status = if U256::from(chain.timestamp()) >= order.expiry {
            status::EXPIRED
        } else if used {
            status::UNFILLABLE
        } else {
            status::FILLABLE
        };
        Ok(IZeroEx::getERC721OrderStatusCall::abi_encode_returns(&status).into())
    }
}

/// Accepts token ids whose bit is set in the property data.
pub struct BitVectorValidator;

impl Contract for BitVectorValidator {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        self.view(&*env.chain, env.this, input)
    }

    fn view(&self, _: &Chain, _: Address, input: &[u8]) -> Result<Bytes, Revert> {
        let call = IPropertyValidator::validatePropertyCall::abi_decode(input)?;
        if !properties::bit_vector_contains(&call.propertyData, call.tokenId) {
            return Err(Revert::custom(format!(
                "token {} is not in the bit vector",
                call.tokenId
            )));
        }
        Ok(Bytes::new())
    }
}
