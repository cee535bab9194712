pub mod arguments;
pub mod artifact;
pub mod driver;
pub mod manifest;
pub mod node;
pub mod traits;

use {
    anyhow::{Context, Result},
    arguments::Arguments,
    node::Node,
};

pub async fn run(args: Arguments) -> Result<()> {
    let signer = args
        .account()?
        .signer()
        .context("failed to load deployer account")?;
    let deployer = signer.address();
    let config = args.config();
    let node = Node::new(config.node_url.clone(), signer);

    driver::deploy_and_record(&config, deployer, &node, &node).await?;
    Ok(())
}
