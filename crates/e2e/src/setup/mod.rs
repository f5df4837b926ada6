//! A router deployment on an in-memory chain, configured from TOML the same
//! way a live deployment is, with reference Seaport and ZeroEx exchanges to
//! fill against.

mod seaport;
mod zeroex;

pub use {
    seaport::Seaport,
    zeroex::{BitVectorValidator, ZeroEx},
};
use {
    alloy_primitives::{Address, B256, Bytes, U256, keccak256},
    alloy_signer_local::PrivateKeySigner,
    alloy_sol_types::SolCall,
    anyhow::{Context, Result, bail},
    maplit::hashmap,
    model::{
        ContractKind,
        ProtocolKind,
        abi::{IERC20, IERC721, IERC1155, IWETH},
    },
    planner::{FillDetails, Planner, Transaction},
    protocols::{BuildParams, Order, Raw, seaport::ISeaport, zeroex::IZeroEx},
    router::{
        ApprovalProxy,
        Chain,
        ExchangeModule,
        LegacyRouter,
        Revert,
        Router,
        legacy::Exchange,
        tokens::{Erc721, Erc1155, Weth},
    },
};

/// Block timestamp every test runs at.
pub const TIMESTAMP: u64 = 1_700_000_000;

/// When the orders of the tests were listed.
pub const LISTING_TIME: u64 = TIMESTAMP - 3_600;

pub const ERC721: Address = Address::repeat_byte(0xe7);
pub const ERC1155: Address = Address::repeat_byte(0xe1);

/// Exchange kinds of the legacy router.
pub mod exchange_kind {
    pub const ZEROEX_V4: u8 = 2;
    pub const SEAPORT: u8 = 5;
}

const CONFIG: &str = r#"
chain-id = 1

[protocols.seaport]
exchange = "0x00000000000000ADc04C56Bf30aC9d3c0aAF14dC"
version = "1.5"
conduit = "0x00000000000000ADc04C56Bf30aC9d3c0aAF14dC"
conduit-key = "0x0000000000000000000000000000000000000000000000000000000000000000"

[protocols.zeroex-v4]
exchange = "0xDef1C0ded9bec7F1a1670819833240f027b25EfF"
bit-vector-validator = "0xb1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1"

[router]
router = "0x1111111111111111111111111111111111111111"
approval-proxy = "0x2222222222222222222222222222222222222222"
legacy-router = "0x3333333333333333333333333333333333333333"

[modules]
seaport = "0x5151515151515151515151515151515151515151"
zeroex-v4 = "0x5252525252525252525252525252525252525252"

[log]
filter = "warn,e2e=debug,router=debug,planner=debug,protocols=debug"
"#;

/// Storage slot of `key` in the mapping named `tag`.
pub(crate) fn slot(tag: &[u8], key: &[u8]) -> B256 {
    keccak256([tag, key].concat())
}

pub(crate) fn load(word: B256) -> U256 {
    U256::from_be_bytes(word.0)
}

pub(crate) fn word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

#[derive(Clone, Debug)]
pub struct TestAccount {
    pub signer: PrivateKeySigner,
}

impl TestAccount {
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

struct AccountGenerator {
    id: u64,
}

impl Default for AccountGenerator {
    fn default() -> Self {
        // Keys well away from the small ones unit tests use.
        AccountGenerator { id: 100500 }
    }
}

impl AccountGenerator {
    fn next(&mut self) -> Result<TestAccount> {
        self.id += 1;
        let key = B256::from(U256::from(self.id).to_be_bytes::<32>());
        Ok(TestAccount {
            signer: PrivateKeySigner::from_bytes(&key)?,
        })
    }
}

pub struct World {
    pub chain: Chain,
    pub config: configs::Config,
    pub planner: Planner,
    accounts: AccountGenerator,
}

/// Sets up a fresh deployment with tracing enabled and runs the test on it.
pub fn run_test(test: impl FnOnce(World)) {
    let world = World::new().unwrap();
    observe::tracing::initialize_reentrant(world.config.log.env_filter());
    test(world);
}

impl World {
    pub fn new() -> Result<Self> {
        let config = configs::from_str(CONFIG)?;
        let protocols = &config.protocols;
        let seaport = protocols
            .seaport
            .clone()
            .context("seaport is not configured")?;
        let zeroex = protocols
            .zeroex_v4
            .clone()
            .context("zeroex is not configured")?;

        let mut chain = Chain::new(protocols.chain_id, TIMESTAMP);
        chain.deploy(seaport.exchange, Seaport::new(&seaport.version));
        chain.deploy(zeroex.exchange, ZeroEx);
        if let Some(validator) = zeroex.bit_vector_validator {
            chain.deploy(validator, BitVectorValidator);
        }
        chain.deploy(protocols.weth, Weth);
        chain.deploy(ERC721, Erc721);
        chain.deploy(ERC1155, Erc1155);

        let modules = &config.planner.modules;
        let module = |kind: ProtocolKind| {
            modules
                .get(&kind)
                .copied()
                .with_context(|| format!("no {kind} module configured"))
        };
        chain.deploy(
            module(ProtocolKind::Seaport)?,
            ExchangeModule::new(seaport.exchange, seaport.conduit),
        );
        chain.deploy(
            module(ProtocolKind::ZeroExV4)?,
            ExchangeModule::new(zeroex.exchange, zeroex.exchange),
        );

        let router = config.planner.router;
        chain.deploy(router, Router::new(modules.values().copied()));
        chain.deploy(config.planner.approval_proxy, ApprovalProxy { router });
        if let Some(legacy) = config.legacy_router {
            let exchanges = hashmap! {
                exchange_kind::SEAPORT => Exchange {
                    address: seaport.exchange,
                    operator: seaport.conduit,
                },
                exchange_kind::ZEROEX_V4 => Exchange {
                    address: zeroex.exchange,
                    operator: zeroex.exchange,
                },
            };
            chain.deploy(legacy, LegacyRouter::new(exchanges, protocols.weth));
        }

        let planner = Planner::new(config.planner.clone(), protocols.clone()).at(TIMESTAMP);
        Ok(Self {
            chain,
            config,
            planner,
            accounts: AccountGenerator::default(),
        })
    }

    pub fn protocols(&self) -> &protocols::Config {
        &self.config.protocols
    }

    pub fn weth(&self) -> Address {
        self.config.protocols.weth
    }

    pub fn module(&self, kind: ProtocolKind) -> Address {
        self.config.planner.modules[&kind]
    }

    pub fn legacy_router(&self) -> Result<Address> {
        self.config
            .legacy_router
            .context("legacy router is not configured")
    }

    /// Address makers approve for the exchange of `kind` to move their
    /// tokens.
    pub fn operator(&self, kind: ProtocolKind) -> Result<Address> {
        let protocols = self.protocols();
        match kind {
            ProtocolKind::Seaport => protocols.seaport.as_ref().map(|d| d.conduit),
            ProtocolKind::ZeroExV4 => protocols.zeroex_v4.as_ref().map(|d| d.exchange),
            _ => None,
        }
        .with_context(|| format!("{kind} is not deployed"))
    }

    pub fn make_accounts<const N: usize>(&mut self, native: U256) -> Result<[TestAccount; N]> {
        let mut accounts = Vec::with_capacity(N);
        for _ in 0..N {
            let account = self.accounts.next()?;
            self.chain
                .ledger_mut()
                .mint_native(account.address(), native);
            accounts.push(account);
        }
        accounts
            .try_into()
            .map_err(|_| anyhow::anyhow!("wrong number of accounts"))
    }

    /// Sends a transaction from `from`.
    pub fn send(&mut self, from: &TestAccount, tx: &Transaction) -> Result<Bytes, Revert> {
        tracing::debug!(from = %from.address(), ?tx, "sending transaction");
        self.chain.call(from.address(), tx.to, tx.value, &tx.data)
    }

    pub fn transact<C: SolCall>(
        &mut self,
        from: &TestAccount,
        to: Address,
        value: U256,
        call: &C,
    ) -> Result<C::Return, Revert> {
        self.chain.transact(from.address(), to, value, call)
    }

    pub fn mint(&mut self, owner: &TestAccount, kind: ContractKind, id: u64, amount: u64) {
        let ledger = self.chain.ledger_mut();
        match kind {
            ContractKind::Erc721 => ledger.mint_erc721(ERC721, owner.address(), U256::from(id)),
            ContractKind::Erc1155 => ledger.mint_erc1155(
                ERC1155,
                owner.address(),
                U256::from(id),
                U256::from(amount),
            ),
        }
    }

    pub fn approve_nfts(
        &mut self,
        owner: &TestAccount,
        kind: ContractKind,
        operator: Address,
    ) -> Result<()> {
        match kind {
            ContractKind::Erc721 => self
                .transact(
                    owner,
                    ERC721,
                    U256::ZERO,
                    &IERC721::setApprovalForAllCall {
                        operator,
                        approved: true,
                    },
                )
                .map(|_| ())?,
            ContractKind::Erc1155 => self
                .transact(
                    owner,
                    ERC1155,
                    U256::ZERO,
                    &IERC1155::setApprovalForAllCall {
                        operator,
                        approved: true,
                    },
                )
                .map(|_| ())?,
        }
        Ok(())
    }

    /// Wraps native currency into WETH and lets `spender` use it.
    pub fn wrap(&mut self, owner: &TestAccount, amount: U256, spender: Address) -> Result<()> {
        let weth = self.weth();
        self.transact(owner, weth, amount, &IWETH::depositCall {})?;
        self.transact(
            owner,
            weth,
            U256::ZERO,
            &IERC20::approveCall {
                spender,
                amount: U256::MAX,
            },
        )?;
        Ok(())
    }

    /// Signs an order of `kind` for `maker`.
    pub fn sign(
        &self,
        kind: ProtocolKind,
        maker: &TestAccount,
        params: BuildParams,
    ) -> Result<FillDetails> {
        let protocols = self.protocols();
        let order = Order::build(kind, &params, protocols)?.signed(&maker.signer, protocols)?;
        Ok(FillDetails::new(order, protocols))
    }

    /// Mints token `id` to `maker` and lists it for `price` in the native
    /// currency.
    pub fn list(
        &mut self,
        kind: ProtocolKind,
        maker: &TestAccount,
        id: u64,
        price: U256,
        fees: Vec<fee::Fee>,
    ) -> Result<FillDetails> {
        let operator = self.operator(kind)?;
        self.mint(maker, ContractKind::Erc721, id, 1);
        self.approve_nfts(maker, ContractKind::Erc721, operator)?;
        let params = BuildParams::listing(
            maker.address(),
            ContractKind::Erc721,
            ERC721,
            U256::from(id),
            price,
        )
        .with_times(LISTING_TIME, None)
        .with_fees(fees);
        self.sign(kind, maker, params)
    }

    /// Cancels the order on its exchange.
    pub fn cancel(&mut self, maker: &TestAccount, fill: &FillDetails) -> Result<()> {
        match &fill.order.raw {
            Raw::Seaport(order) => self
                .transact(
                    maker,
                    order.exchange,
                    U256::ZERO,
                    &ISeaport::cancelCall {
                        orders: vec![order.components.clone()],
                    },
                )
                .map(|_| ())?,
            Raw::ZeroExV4(order) => self
                .transact(
                    maker,
                    order.exchange,
                    U256::ZERO,
                    &IZeroEx::cancelERC721OrderCall {
                        orderNonce: order.terms.nonce,
                    },
                )
                .map(|_| ())?,
            _ => bail!("cancelling {} orders is not supported", fill.order.kind()),
        }
        Ok(())
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.chain.ledger().native_balance(account)
    }

    pub fn weth_balance(&self, account: Address) -> U256 {
        self.chain.ledger().erc20_balance(self.weth(), account)
    }

    pub fn owner_of(&self, id: u64) -> Option<Address> {
        self.chain.ledger().erc721_owner(ERC721, U256::from(id))
    }

    /// The router, the approval proxy and every module hold nothing.
    pub fn assert_drained(&self) {
        let planner = &self.config.planner;
        let contracts = [planner.router, planner.approval_proxy]
            .into_iter()
            .chain(planner.modules.values().copied())
            .chain(self.config.legacy_router);
        for contract in contracts {
            let holdings = self.chain.ledger().holdings(contract);
            assert!(holdings.is_empty(), "{contract} holds {holdings:?}");
        }
    }
}
