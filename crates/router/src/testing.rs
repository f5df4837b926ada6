//! A minimal marketplace and a deployed router setup for unit tests.

use {
    crate::{ApprovalProxy, Chain, Contract, Env, ExchangeModule, LegacyRouter, Revert, Router},
    alloy_primitives::{Address, B256, Bytes, U256, keccak256},
    alloy_sol_types::{SolCall, SolInterface, SolValue, sol},
    model::abi::{IERC20, IERC721, IERC1155, Listing, Offer},
    std::collections::HashMap,
};

sol! {
    interface IMarket {
        function buy(
            uint8 kind,
            address seller,
            address collection,
            uint256 tokenId,
            uint256 amount,
            address token,
            uint256 price,
            address recipient
        ) external payable;
        function sell(
            uint8 kind,
            address buyer,
            address collection,
            uint256 tokenId,
            uint256 amount,
            address token,
            uint256 price
        ) external;
        function cancel(address collection, uint256 tokenId) external;
    }
}

/// Swaps NFTs for payment between a maker and whoever calls it.
pub struct Market;

impl Market {
    fn slot(collection: Address, id: U256) -> B256 {
        keccak256((collection, id).abi_encode())
    }

    fn ensure_open(env: &Env<'_>, collection: Address, id: U256) -> Result<(), Revert> {
        if env.sload(Self::slot(collection, id)).is_zero() {
            Ok(())
        } else {
            Err(Revert::custom("cancelled"))
        }
    }

    fn move_nft(
        env: &mut Env<'_>,
        kind: u8,
        collection: Address,
        from: Address,
        to: Address,
        id: U256,
        amount: U256,
    ) -> Result<(), Revert> {
        if kind == 0 {
            env.call_sol(
                collection,
                U256::ZERO,
                &IERC721::transferFromCall { from, to, tokenId: id },
            )?;
        } else {
            env.call_sol(
                collection,
                U256::ZERO,
                &IERC1155::safeTransferFromCall { from, to, id, amount, data: Bytes::new() },
            )?;
        }
        Ok(())
    }
}

impl Contract for Market {
    fn call(&self, env: &mut Env<'_>, input: &[u8]) -> Result<Bytes, Revert> {
        match IMarket::IMarketCalls::abi_decode(input)? {
            IMarket::IMarketCalls::buy(call) => {
                Self::ensure_open(env, call.collection, call.tokenId)?;
                let buyer = env.caller;
                if call.token.is_zero() {
                    let excess = env
                        .value
                        .checked_sub(call.price)
                        .ok_or(Revert::InsufficientBalance)?;
                    env.send(call.seller, call.price)?;
                    env.send(buyer, excess)?;
                } else {
                    env.call_sol(
                        call.token,
                        U256::ZERO,
                        &IERC20::transferFromCall {
                            from: buyer,
                            to: call.seller,
                            amount: call.price,
                        },
                    )?;
                }
                Self::move_nft(
                    env,
                    call.kind,
                    call.collection,
                    call.seller,
                    call.recipient,
                    call.tokenId,
                    call.amount,
                )?;
            }
            IMarket::IMarketCalls::sell(call) => {
                Self::ensure_open(env, call.collection, call.tokenId)?;
                let seller = env.caller;
                Self::move_nft(
                    env,
                    call.kind,
                    call.collection,
                    seller,
                    call.buyer,
                    call.tokenId,
                    call.amount,
                )?;
                env.call_sol(
                    call.token,
                    U256::ZERO,
                    &IERC20::transferFromCall {
                        from: call.buyer,
                        to: seller,
                        amount: call.price,
                    },
                )?;
            }
            IMarket::IMarketCalls::cancel(call) => {
                env.sstore(Self::slot(call.collection, call.tokenId), B256::with_last_byte(1));
            }
        }
        Ok(Bytes::new())
    }
}

pub const TAKER: Address = Address::repeat_byte(0xa1);
pub const SELLER: Address = Address::repeat_byte(0xa2);
pub const BIDDER: Address = Address::repeat_byte(0xa3);
pub const REFERRER: Address = Address::repeat_byte(0xa4);

pub struct World {
    pub chain: Chain,
    pub market: Address,
    pub module: Address,
    pub router: Address,
    pub proxy: Address,
    pub legacy: Address,
    pub weth: Address,
    pub erc721: Address,
    pub erc1155: Address,
}

impl World {
    pub fn new() -> Self {
        let world = Self {
            chain: Chain::new(1, 1_700_000_000),
            market: Address::repeat_byte(0x10),
            module: Address::repeat_byte(0x11),
            router: Address::repeat_byte(0x12),
            proxy: Address::repeat_byte(0x13),
            legacy: Address::repeat_byte(0x14),
            weth: Address::repeat_byte(0x15),
            erc721: Address::repeat_byte(0x16),
            erc1155: Address::repeat_byte(0x17),
        };
        let Self { mut chain, .. } = world;
        chain.deploy(world.market, Market);
        chain.deploy(world.module, ExchangeModule::new(world.market, world.market));
        chain.deploy(world.router, Router::new([world.module]));
        chain.deploy(world.proxy, ApprovalProxy { router: world.router });
        chain.deploy(
            world.legacy,
            LegacyRouter::new(
                HashMap::from([(
                    1,
                    crate::legacy::Exchange {
                        address: world.market,
                        operator: world.market,
                    },
                )]),
                world.weth,
            ),
        );
        chain.deploy(world.weth, crate::tokens::Weth);
        chain.deploy(world.erc721, crate::tokens::Erc721);
        chain.deploy(world.erc1155, crate::tokens::Erc1155);
        Self { chain, ..world }
    }

    /// Mints token `id` to the seller and approves the market.
    pub fn list(&mut self, id: u64) {
        let ledger = self.chain.ledger_mut();
        ledger.mint_erc721(self.erc721, SELLER, U256::from(id));
        ledger.set_operator(self.erc721, SELLER, self.market, true);
    }

    pub fn buy_call(&self, id: u64, price: U256, recipient: Address) -> Vec<u8> {
        self.buy_with(Address::ZERO, id, price, recipient)
    }

    fn buy_with(&self, token: Address, id: u64, price: U256, recipient: Address) -> Vec<u8> {
        IMarket::buyCall {
            kind: 0,
            seller: SELLER,
            collection: self.erc721,
            tokenId: U256::from(id),
            amount: U256::from(1),
            token,
            price,
            recipient,
        }
        .abi_encode()
    }

    pub fn listing(&self, id: u64, price: U256) -> Listing {
        Listing {
            data: self.buy_call(id, price, self.module).into(),
            value: price,
            itemKind: 0,
            collection: self.erc721,
            tokenId: U256::from(id),
            amount: U256::from(1),
        }
    }

    /// A listing of token `id` paid in WETH.
    pub fn weth_listing(&self, id: u64, price: U256) -> Listing {
        Listing {
            data: self.buy_with(self.weth, id, price, self.module).into(),
            value: U256::ZERO,
            ..self.listing(id, price)
        }
    }

    /// A WETH bid of the bidder for token `id`.
    pub fn bid(&mut self, id: u64, price: U256) -> Offer {
        let ledger = self.chain.ledger_mut();
        ledger.mint_erc20(self.weth, BIDDER, price);
        ledger.mint_native(self.weth, price);
        ledger.set_allowance(self.weth, BIDDER, self.market, U256::MAX);
        Offer {
            data: IMarket::sellCall {
                kind: 0,
                buyer: BIDDER,
                collection: self.erc721,
                tokenId: U256::from(id),
                amount: U256::from(1),
                token: self.weth,
                price,
            }
            .abi_encode()
            .into(),
            itemKind: 0,
            collection: self.erc721,
            tokenId: U256::from(id),
            amount: U256::from(1),
            currency: self.weth,
        }
    }

    pub fn cancel(&mut self, id: u64) {
        let call = IMarket::cancelCall {
            collection: self.erc721,
            tokenId: U256::from(id),
        };
        self.chain
            .transact(SELLER, self.market, U256::ZERO, &call)
            .unwrap();
    }

    pub fn owner(&self, id: u64) -> Option<Address> {
        self.chain.ledger().erc721_owner(self.erc721, U256::from(id))
    }

    pub fn fund(&mut self, account: Address, amount: U256) {
        self.chain.ledger_mut().mint_native(account, amount);
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.chain.ledger().native_balance(account)
    }
}
