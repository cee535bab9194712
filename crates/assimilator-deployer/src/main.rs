use clap::Parser;

#[tokio::main]
async fn main() {
    let args = assimilator_deployer::arguments::Arguments::parse();
    observe::tracing::initialize(&args.logging.observe_config());
    tracing::debug!("running assimilator deployer with validated arguments:\n{}", args);
    if let Err(err) = assimilator_deployer::run(args).await {
        tracing::error!(?err, "deployment failed");
        std::process::exit(1);
    }
}
