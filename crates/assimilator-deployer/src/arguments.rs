use {
    crate::{
        driver::{Config, DEFAULT_CONTRACT},
        manifest::WriteMode,
        node::AccountConfig,
    },
    alloy::primitives::Bytes,
    anyhow::{Result, bail},
    clap::Parser,
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
        str::FromStr,
    },
    tracing::level_filters::LevelFilter,
    url::Url,
};

#[derive(Parser)]
pub struct Logging {
    #[clap(long, env, default_value = "warn,assimilator_deployer=info")]
    pub log_filter: String,

    /// Events at this level or more severe are written to stderr.
    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,

    /// Emit log events as JSON.
    #[clap(long, env)]
    pub use_json_logs: bool,
}

impl Logging {
    pub fn observe_config(&self) -> observe::Config {
        let config = observe::Config::default()
            .with_env_filter(&self.log_filter)
            .with_stderr_threshold(self.log_stderr_threshold);
        if self.use_json_logs {
            config.with_json_format()
        } else {
            config
        }
    }
}

#[derive(Parser)]
#[clap(about = "Deploys an assimilator contract and records it in the deployment manifest")]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: Logging,

    /// The Ethereum node URL to connect to.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// Chain ID the node is expected to report. Deployment is aborted on a
    /// mismatch.
    #[clap(long, env)]
    pub chain_id: Option<u64>,

    /// Hex encoded private key of the deployer.
    #[clap(long, env, hide_env_values = true, conflicts_with = "mnemonic")]
    pub private_key: Option<String>,

    /// Mnemonic to derive the deployer key from.
    #[clap(long, env, hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// Derivation index used together with `--mnemonic`.
    #[clap(long, env, default_value = "0")]
    pub account_index: u32,

    /// Name of the compiled contract to deploy.
    #[clap(long, env, default_value = DEFAULT_CONTRACT)]
    pub contract_name: String,

    /// Directory containing the compiled contract artifacts.
    #[clap(long, env, default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Directory holding one `<chain id>/lp.json` manifest per network. The
    /// per-network directory must already exist.
    #[clap(long, env, default_value = "deployments")]
    pub deployments_dir: PathBuf,

    /// Hex encoded, ABI encoded constructor arguments.
    #[clap(long, env, default_value = "0x", value_parser = Bytes::from_str)]
    pub constructor_args: Bytes,

    /// Replace the manifest through a temporary file and rename instead of
    /// rewriting it in place.
    #[clap(long, env)]
    pub atomic_write: bool,
}

impl Arguments {
    pub fn account(&self) -> Result<AccountConfig> {
        match (&self.private_key, &self.mnemonic) {
            (Some(key), _) => Ok(AccountConfig::PrivateKey(key.clone())),
            (None, Some(phrase)) => Ok(AccountConfig::Mnemonic {
                phrase: phrase.clone(),
                index: self.account_index,
            }),
            (None, None) => {
                bail!("no deployer account configured, set --private-key or --mnemonic")
            }
        }
    }

    pub fn config(&self) -> Config {
        Config {
            node_url: self.node_url.clone(),
            expected_chain_id: self.chain_id,
            contract_name: self.contract_name.clone(),
            artifacts_dir: self.artifacts_dir.clone(),
            deployments_dir: self.deployments_dir.clone(),
            constructor_args: self.constructor_args.clone(),
            write_mode: if self.atomic_write {
                WriteMode::Atomic
            } else {
                WriteMode::Overwrite
            },
        }
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            node_url,
            chain_id,
            private_key,
            mnemonic,
            account_index,
            contract_name,
            artifacts_dir,
            deployments_dir,
            constructor_args,
            atomic_write,
        } = self;

        writeln!(f, "log_filter: {}", logging.log_filter)?;
        writeln!(f, "log_stderr_threshold: {}", logging.log_stderr_threshold)?;
        writeln!(f, "use_json_logs: {}", logging.use_json_logs)?;
        writeln!(f, "node_url: {node_url}")?;
        writeln!(f, "chain_id: {chain_id:?}")?;
        writeln!(f, "private_key: {}", secret(private_key))?;
        writeln!(f, "mnemonic: {}", secret(mnemonic))?;
        writeln!(f, "account_index: {account_index}")?;
        writeln!(f, "contract_name: {contract_name}")?;
        writeln!(f, "artifacts_dir: {}", artifacts_dir.display())?;
        writeln!(f, "deployments_dir: {}", deployments_dir.display())?;
        writeln!(f, "constructor_args: {constructor_args}")?;
        writeln!(f, "atomic_write: {atomic_write}")?;
        Ok(())
    }
}

fn secret(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "SECRET",
        None => "None",
    }
}
