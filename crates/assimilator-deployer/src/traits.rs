//! Trait definitions for the blockchain boundary.
//!
//! The deployment driver only talks to the node through these traits so it can
//! be unit tested with mocks.

use {
    crate::artifact::ContractFactory,
    alloy::primitives::{Address, B256, Bytes},
    anyhow::Result,
};

/// Everything needed to submit one contract creation transaction.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub name: String,
    pub deployer: Address,
    pub factory: ContractFactory,
    /// ABI encoded constructor arguments, appended to the creation code.
    pub args: Bytes,
}

/// Handle to a contract whose creation transaction has been mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployed {
    pub name: String,
    pub address: Address,
    pub transaction_hash: B256,
}

/// Abstracts blockchain read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChainRead: Send + Sync {
    /// Returns the chain ID reported by the connected node.
    async fn chain_id(&self) -> Result<u64>;
}

/// Abstracts contract deployment.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContractDeployer: Send + Sync {
    /// Submits the contract creation transaction and waits until it is mined.
    ///
    /// Fails if the transaction reverts.
    async fn deploy(&self, request: &DeployRequest) -> Result<Deployed>;
}
