//! The file format, deserialized as is before it is turned into the domain
//! configuration.

use {
    alloy_primitives::Address,
    model::ProtocolKind,
    protocols::config,
    serde::{Deserialize, Deserializer, de},
    std::collections::HashMap,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(deserialize_with = "integer")]
    chain_id: u64,
    #[serde(default)]
    protocols: Protocols,
    router: Router,
    #[serde(default)]
    modules: HashMap<ProtocolKind, Address>,
    #[serde(default)]
    log: Log,
}

/// Deployments overriding the presets of the configured chain.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Protocols {
    weth: Option<Address>,
    seaport: Option<config::Seaport>,
    looks_rare: Option<config::LooksRare>,
    zeroex_v4: Option<config::ZeroEx>,
    element: Option<config::ZeroEx>,
    wyvern: Option<config::Wyvern>,
    foundation: Option<config::Foundation>,
    zora: Option<config::Zora>,
    cryptopunks: Option<config::CryptoPunks>,
    rarible: Option<config::Rarible>,
    universe: Option<config::Rarible>,
    blur: Option<config::Blur>,
    forward: Option<config::Forward>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Router {
    router: Address,
    approval_proxy: Address,
    legacy_router: Option<Address>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Log {
    #[serde(default = "default_filter")]
    filter: String,
    stderr_threshold: Option<String>,
    #[serde(default)]
    json: bool,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            stderr_threshold: None,
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

/// Accepts integers as TOML integers, decimal strings or `0x` prefixed hex
/// strings.
fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Integer {
        Number(u64),
        String(String),
    }

    match Integer::deserialize(deserializer)? {
        Integer::Number(value) => Ok(value),
        Integer::String(value) => match value.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => value.parse(),
        }
        .map_err(|err| de::Error::custom(format!("invalid integer {value:?}: {err}"))),
    }
}

macro_rules! overrides {
    ($config:expr, $file:expr, $($field:ident),*) => {
        $(
            if let Some(deployment) = $file.$field {
                $config.$field = Some(deployment);
            }
        )*
    };
}

impl Config {
    pub fn into_domain(self) -> anyhow::Result<super::Config> {
        let mut protocols = protocols::Config::for_chain(self.chain_id);
        if let Some(weth) = self.protocols.weth {
            protocols.weth = weth;
        }
        overrides!(
            protocols,
            self.protocols,
            seaport,
            looks_rare,
            zeroex_v4,
            element,
            wyvern,
            foundation,
            zora,
            cryptopunks,
            rarible,
            universe,
            blur,
            forward
        );

        let stderr_threshold = self
            .log
            .stderr_threshold
            .map(|level| level.parse::<tracing::Level>())
            .transpose()
            .map_err(|err| anyhow::anyhow!("invalid stderr threshold: {err}"))?;
        let mut log = observe::Config::default().with_env_filter(&self.log.filter);
        if let Some(level) = stderr_threshold {
            log = log.with_stderr_threshold(level);
        }
        if self.log.json {
            log = log.with_json_format();
        }

        Ok(super::Config {
            protocols,
            planner: planner::Config {
                router: self.router.router,
                approval_proxy: self.router.approval_proxy,
                modules: self.modules,
            },
            legacy_router: self.router.legacy_router,
            log,
        })
    }
}
