use tracing_subscriber::EnvFilter;

mod cli;
mod client_config;
mod error;
mod printer;
mod resource;
mod scheme;
mod state;
mod submitter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hyper=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    cli::execute().await?;

    Ok(())
}
