use {
    crate::{
        artifact::ContractFactory,
        manifest::{ManifestFile, WriteMode},
        traits::{ChainRead, ContractDeployer, DeployRequest, Deployed},
    },
    alloy::primitives::{Address, Bytes},
    anyhow::{Context, Result, ensure},
    std::path::PathBuf,
    url::Url,
};

/// Name of the contract deployed when none is configured.
pub const DEFAULT_CONTRACT: &str = "UsdoToUsdAssimilator";

/// Everything a deployment run needs, passed explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub node_url: Url,
    /// When set, the run aborts before deploying if the node reports a
    /// different chain.
    pub expected_chain_id: Option<u64>,
    pub contract_name: String,
    pub artifacts_dir: PathBuf,
    pub deployments_dir: PathBuf,
    pub constructor_args: Bytes,
    pub write_mode: WriteMode,
}

/// The network a run deploys to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub url: Url,
    pub chain_id: u64,
}

/// Deploys the configured contract from `deployer` and records its address in
/// the manifest of the target network.
///
/// The manifest is checked before deploying and only written after the
/// contract creation transaction has been mined. If the manifest update still
/// fails the contract exists on chain; its address is logged so it can be
/// recorded by hand.
pub async fn deploy_and_record(
    config: &Config,
    deployer: Address,
    chain: &dyn ChainRead,
    contracts: &dyn ContractDeployer,
) -> Result<Deployed> {
    let network = resolve_network(config, chain).await?;
    tracing::info!("Network: {} (chain {})", network.url, network.chain_id);
    tracing::info!("Deployer: {deployer}");

    let factory = ContractFactory::find(&config.artifacts_dir, &config.contract_name)?;
    tracing::debug!(artifact = %factory.artifact.display(), "resolved contract factory");

    let manifest = ManifestFile::for_chain(
        &config.deployments_dir,
        network.chain_id,
        config.write_mode,
    );
    manifest
        .check_writable()
        .context("deployment manifest cannot be updated")?;

    let deployed = contracts
        .deploy(&DeployRequest {
            name: config.contract_name.clone(),
            deployer,
            factory,
            args: config.constructor_args.clone(),
        })
        .await
        .with_context(|| format!("failed to deploy {}", config.contract_name))?;

    if let Err(err) = manifest.record_assimilator(&deployed.name, deployed.address) {
        tracing::error!(
            name = %deployed.name,
            address = %deployed.address,
            path = %manifest.path().display(),
            "contract deployed but its address was not recorded",
        );
        return Err(err).context("failed to update deployment manifest");
    }
    tracing::info!(
        name = %deployed.name,
        address = %deployed.address,
        path = %manifest.path().display(),
        "recorded deployment",
    );
    Ok(deployed)
}

async fn resolve_network(config: &Config, chain: &dyn ChainRead) -> Result<NetworkConfig> {
    let chain_id = chain.chain_id().await?;
    if let Some(expected) = config.expected_chain_id {
        ensure!(
            chain_id == expected,
            "node at {} is on chain {chain_id}, expected chain {expected}",
            config.node_url
        );
    }
    Ok(NetworkConfig {
        url: config.node_url.clone(),
        chain_id,
    })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            manifest,
            traits::{MockChainRead, MockContractDeployer},
        },
        alloy::primitives::{B256, address, bytes},
        anyhow::anyhow,
        std::fs,
        tempfile::TempDir,
    };

    const DEPLOYER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const FIRST: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
    const SECOND: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");

    struct Workspace {
        root: TempDir,
        config: Config,
    }

    impl Workspace {
        /// Compiled artifact plus a deployments directory for `chain_id`.
        fn new(chain_id: u64) -> Self {
            let root = TempDir::new().unwrap();
            let artifact_dir = root
                .path()
                .join("artifacts/contracts/UsdoToUsdAssimilator.sol");
            fs::create_dir_all(&artifact_dir).unwrap();
            fs::write(
                artifact_dir.join("UsdoToUsdAssimilator.json"),
                serde_json::json!({
                    "contractName": "UsdoToUsdAssimilator",
                    "bytecode": "0x6080604052",
                })
                .to_string(),
            )
            .unwrap();
            fs::create_dir_all(root.path().join("deployments").join(chain_id.to_string()))
                .unwrap();

            let config = Config {
                node_url: "http://localhost:8545".parse().unwrap(),
                expected_chain_id: None,
                contract_name: DEFAULT_CONTRACT.to_string(),
                artifacts_dir: root.path().join("artifacts"),
                deployments_dir: root.path().join("deployments"),
                constructor_args: Bytes::new(),
                write_mode: WriteMode::Overwrite,
            };
            Self { root, config }
        }

        fn manifest_path(&self, chain_id: u64) -> PathBuf {
            manifest::path(&self.root.path().join("deployments"), chain_id)
        }
    }

    fn chain(chain_id: u64) -> MockChainRead {
        let mut chain = MockChainRead::new();
        chain.expect_chain_id().returning(move || Ok(chain_id));
        chain
    }

    fn deploys_at(address: Address) -> MockContractDeployer {
        let mut contracts = MockContractDeployer::new();
        contracts.expect_deploy().times(1).returning(move |request| {
            Ok(Deployed {
                name: request.name.clone(),
                address,
                transaction_hash: B256::repeat_byte(1),
            })
        });
        contracts
    }

    #[tokio::test]
    async fn records_deployment_in_fresh_manifest() {
        let workspace = Workspace::new(1);
        let mut contracts = MockContractDeployer::new();
        contracts
            .expect_deploy()
            .withf(|request| {
                request.name == DEFAULT_CONTRACT
                    && request.deployer == DEPLOYER
                    && request.factory.bytecode == bytes!("6080604052")
                    && request.args.is_empty()
            })
            .times(1)
            .returning(|request| {
                Ok(Deployed {
                    name: request.name.clone(),
                    address: FIRST,
                    transaction_hash: B256::ZERO,
                })
            });

        let deployed = deploy_and_record(&workspace.config, DEPLOYER, &chain(1), &contracts)
            .await
            .unwrap();

        assert_eq!(deployed.address, FIRST);
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(workspace.manifest_path(1)).unwrap())
                .unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "assimilators": { "UsdoToUsdAssimilator": FIRST.to_checksum(None) },
                "curves": {},
            })
        );
    }

    #[tokio::test]
    async fn preserves_unrelated_entries() {
        let workspace = Workspace::new(137);
        let existing = serde_json::json!({
            "assimilators": { "UsdcToUsdAssimilator": "0x0000000000000000000000000000000000000001" },
            "curves": { "usdo": { "weights": [50, 50] } },
        });
        fs::write(workspace.manifest_path(137), existing.to_string()).unwrap();

        deploy_and_record(&workspace.config, DEPLOYER, &chain(137), &deploys_at(FIRST))
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(workspace.manifest_path(137)).unwrap())
                .unwrap();
        assert_eq!(
            written["assimilators"]["UsdcToUsdAssimilator"],
            "0x0000000000000000000000000000000000000001"
        );
        assert_eq!(
            written["assimilators"]["UsdoToUsdAssimilator"],
            FIRST.to_checksum(None)
        );
        assert_eq!(written["curves"], existing["curves"]);
    }

    #[tokio::test]
    async fn failed_deployment_leaves_manifest_alone() {
        let workspace = Workspace::new(1);
        let mut contracts = MockContractDeployer::new();
        contracts
            .expect_deploy()
            .times(1)
            .returning(|_| Err(anyhow!("execution reverted")));

        let result = deploy_and_record(&workspace.config, DEPLOYER, &chain(1), &contracts).await;

        assert!(result.is_err());
        assert!(!workspace.manifest_path(1).exists());
    }

    #[tokio::test]
    async fn failed_deployment_keeps_existing_manifest() {
        let workspace = Workspace::new(1);
        let existing = "{\"assimilators\": {}, \"curves\": {}}";
        fs::write(workspace.manifest_path(1), existing).unwrap();
        let mut contracts = MockContractDeployer::new();
        contracts
            .expect_deploy()
            .returning(|_| Err(anyhow!("execution reverted")));

        let result = deploy_and_record(&workspace.config, DEPLOYER, &chain(1), &contracts).await;

        assert!(result.is_err());
        assert_eq!(
            fs::read_to_string(workspace.manifest_path(1)).unwrap(),
            existing
        );
    }

    #[tokio::test]
    async fn missing_deployments_directory_fails_before_deploying() {
        let workspace = Workspace::new(1);
        let mut contracts = MockContractDeployer::new();
        contracts.expect_deploy().never();

        let result = deploy_and_record(&workspace.config, DEPLOYER, &chain(5), &contracts).await;

        assert!(result.is_err());
        assert!(!workspace.root.path().join("deployments/5").exists());
    }

    #[tokio::test]
    async fn malformed_manifest_fails_before_deploying() {
        let workspace = Workspace::new(1);
        let existing = "{\"assimilators\": {\"Other\": \"0x01\"}}";
        fs::write(workspace.manifest_path(1), existing).unwrap();
        let mut contracts = MockContractDeployer::new();
        contracts.expect_deploy().never();

        let err = deploy_and_record(&workspace.config, DEPLOYER, &chain(1), &contracts)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<manifest::ManifestError>(),
            Some(manifest::ManifestError::Malformed { .. })
        ));
        assert_eq!(
            fs::read_to_string(workspace.manifest_path(1)).unwrap(),
            existing
        );
    }

    #[tokio::test]
    async fn second_deployment_overwrites_the_first() {
        let workspace = Workspace::new(1);

        for address in [FIRST, SECOND] {
            deploy_and_record(&workspace.config, DEPLOYER, &chain(1), &deploys_at(address))
                .await
                .unwrap();
        }

        let manifest = ManifestFile::for_chain(
            &workspace.config.deployments_dir,
            1,
            WriteMode::Overwrite,
        )
        .load()
        .unwrap();
        assert_eq!(
            manifest.assimilator(DEFAULT_CONTRACT),
            Some(SECOND.to_checksum(None).as_str())
        );
    }

    #[tokio::test]
    async fn chain_id_mismatch_aborts_before_deploying() {
        let mut workspace = Workspace::new(1);
        workspace.config.expected_chain_id = Some(100);
        let mut contracts = MockContractDeployer::new();
        contracts.expect_deploy().never();

        let err = deploy_and_record(&workspace.config, DEPLOYER, &chain(1), &contracts)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("expected chain 100"));
    }

    #[tokio::test]
    async fn unknown_contract_is_not_deployed() {
        let mut workspace = Workspace::new(1);
        workspace.config.contract_name = "DoesNotExist".to_string();
        let mut contracts = MockContractDeployer::new();
        contracts.expect_deploy().never();

        let result = deploy_and_record(&workspace.config, DEPLOYER, &chain(1), &contracts).await;

        assert!(result.is_err());
        assert!(!workspace.manifest_path(1).exists());
    }

    #[tokio::test]
    async fn constructor_arguments_are_forwarded() {
        let mut workspace = Workspace::new(1);
        workspace.config.constructor_args =
            bytes!("00000000000000000000000000000000000000000000000000000000000000ff");
        let mut contracts = MockContractDeployer::new();
        contracts
            .expect_deploy()
            .withf(|request| request.args.len() == 32 && request.args[31] == 0xff)
            .returning(|request| {
                Ok(Deployed {
                    name: request.name.clone(),
                    address: FIRST,
                    transaction_hash: B256::ZERO,
                })
            });

        deploy_and_record(&workspace.config, DEPLOYER, &chain(1), &contracts)
            .await
            .unwrap();
    }
}
