//! TOML configuration of a deployment: which chain, where the exchanges
//! live, where the router and its modules are deployed and how to log.
//!
//! ```toml
//! chain-id = "0x1"
//!
//! [protocols.seaport]
//! exchange = "0x00000000000000ADc04C56Bf30aC9d3c0aAF14dC"
//! version = "1.5"
//! conduit = "0x1E0049783F008A0085193E00003D00cd54003c71"
//! conduit-key = "0x0000007b02230091a7ed01230072f7006a004d60a8d4e71d599b8104250f0000"
//!
//! [router]
//! router = "0x..."
//! approval-proxy = "0x..."
//!
//! [modules]
//! seaport = "0x..."
//!
//! [log]
//! filter = "info,router=debug"
//! ```

mod file;

use {
    alloy_primitives::Address,
    anyhow::Context,
    std::path::Path,
};

/// Everything a deployment is configured with.
#[derive(Clone, Debug)]
pub struct Config {
    pub protocols: protocols::Config,
    pub planner: planner::Config,
    pub legacy_router: Option<Address>,
    pub log: observe::Config,
}

/// Loads the configuration from a TOML file.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("I/O error while reading {path:?}"))?;
    from_str(&data).with_context(|| format!("invalid configuration in {path:?}"))
}

/// Parses a TOML configuration.
pub fn from_str(data: &str) -> anyhow::Result<Config> {
    let file: file::Config = toml::from_str(data).context("TOML syntax error")?;
    let config = file.into_domain()?;
    tracing::debug!(
        chain_id = config.protocols.chain_id,
        modules = config.planner.modules.len(),
        "loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use {super::*, model::ProtocolKind, std::io::Write};

    const CONFIG: &str = r#"
chain-id = "0x1"

[protocols]
weth = "0x7777777777777777777777777777777777777777"

[protocols.forward]
exchange = "0x0505050505050505050505050505050505050505"

[router]
router = "0x0101010101010101010101010101010101010101"
approval-proxy = "0x0202020202020202020202020202020202020202"

[modules]
seaport = "0x5151515151515151515151515151515151515151"
zeroex-v4 = "0x5252525252525252525252525252525252525252"

[log]
filter = "debug"
stderr-threshold = "warn"
"#;

    #[test]
    fn overrides_chain_presets() {
        let config = from_str(CONFIG).unwrap();
        let mainnet = protocols::Config::mainnet();

        assert_eq!(config.protocols.chain_id, 1);
        assert_eq!(config.protocols.weth, Address::repeat_byte(0x77));
        assert_eq!(config.protocols.seaport, mainnet.seaport);
        assert_eq!(
            config.protocols.forward.map(|forward| forward.exchange),
            Some(Address::repeat_byte(0x05))
        );
        assert_eq!(config.planner.router, Address::repeat_byte(0x01));
        assert_eq!(
            config.planner.modules.get(&ProtocolKind::ZeroExV4),
            Some(&Address::repeat_byte(0x52))
        );
        assert_eq!(config.legacy_router, None);
        assert_eq!(config.log.env_filter(), "debug");
        assert_eq!(config.log.stderr_threshold(), Some(tracing::Level::WARN));
    }

    #[test]
    fn decimal_chain_ids_without_presets() {
        let config = from_str(
            r#"
chain-id = 5

[router]
router = "0x0101010101010101010101010101010101010101"
approval-proxy = "0x0202020202020202020202020202020202020202"
legacy-router = "0x0303030303030303030303030303030303030303"
"#,
        )
        .unwrap();
        assert_eq!(config.protocols.chain_id, 5);
        assert_eq!(config.protocols.seaport, None);
        assert_eq!(config.legacy_router, Some(Address::repeat_byte(0x03)));
        assert!(config.planner.modules.is_empty());
        assert_eq!(config.log.env_filter(), "info");
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = from_str(&format!("{CONFIG}\nunknown = 1\n")).unwrap_err();
        assert!(format!("{err:#}").contains("unknown"));
        assert!(from_str("chain-id = \"one\"").is_err());
    }

    #[test]
    fn loads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = load(file.path()).unwrap();
        assert_eq!(config.protocols.chain_id, 1);
        assert!(load(Path::new("/nonexistent/config.toml")).is_err());
    }
}
