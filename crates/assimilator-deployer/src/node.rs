use {
    crate::traits::{ChainRead, ContractDeployer, DeployRequest, Deployed},
    alloy::{
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::TransactionRequest,
        signers::local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
    },
    anyhow::{Context, Result, ensure},
    std::{fmt, str::FromStr},
    url::Url,
};

/// Where the deployer key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum AccountConfig {
    /// Hex encoded secp256k1 private key, with or without `0x` prefix.
    PrivateKey(String),
    /// BIP-39 phrase, derived along the default Ethereum path at `index`.
    Mnemonic { phrase: String, index: u32 },
}

impl AccountConfig {
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        match self {
            Self::PrivateKey(key) => {
                PrivateKeySigner::from_str(key.trim()).context("invalid deployer private key")
            }
            Self::Mnemonic { phrase, index } => MnemonicBuilder::<English>::default()
                .phrase(phrase.trim())
                .index(*index)
                .context("invalid derivation index")?
                .build()
                .context("failed to derive deployer key from mnemonic"),
        }
    }
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey(_) => f.write_str("PrivateKey(SECRET)"),
            Self::Mnemonic { index, .. } => f
                .debug_struct("Mnemonic")
                .field("phrase", &"SECRET")
                .field("index", index)
                .finish(),
        }
    }
}

/// An Ethereum node reached over HTTP, signing with the deployer key.
#[derive(Clone)]
pub struct Node {
    provider: DynProvider,
}

impl Node {
    pub fn new(url: Url, signer: PrivateKeySigner) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect_http(url)
            .erased();
        Self { provider }
    }
}

#[async_trait::async_trait]
impl ChainRead for Node {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .context("failed to fetch chain id")
    }
}

#[async_trait::async_trait]
impl ContractDeployer for Node {
    async fn deploy(&self, request: &DeployRequest) -> Result<Deployed> {
        tracing::info!(name = %request.name, deployer = %request.deployer, "deploying contract");
        let tx = TransactionRequest::default()
            .with_from(request.deployer)
            .with_deploy_code(request.factory.creation_code(&request.args));

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .context("failed to submit contract creation transaction")?;
        let transaction_hash = *pending.tx_hash();
        tracing::debug!(?transaction_hash, "waiting for contract creation receipt");

        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("failed to get receipt of {transaction_hash}"))?;
        ensure!(
            receipt.status(),
            "contract creation transaction {transaction_hash} reverted"
        );
        let address = receipt
            .contract_address()
            .with_context(|| format!("receipt of {transaction_hash} has no contract address"))?;

        tracing::info!(name = %request.name, %address, ?transaction_hash, "contract deployed");
        Ok(Deployed {
            name: request.name.clone(),
            address,
            transaction_hash,
        })
    }
}
