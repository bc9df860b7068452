use account_resources::config::{Config, DEFAULT_CONFIG_PATH};
use account_resources::logging::init_logging;
use account_resources::{load, write, AccountInfo, Downloader, HttpAccountClient, WriterContext};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

const ENV_CONFIG_PATH: &str = "ACCOUNT_RESOURCES_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_logging();

    let config_path =
        std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    let client = HttpAccountClient::new(&config.account.api_url, config.account.page_size)?
        .with_token(config.api_token.clone());
    let account = AccountInfo {
        name: config.account.name.clone(),
        uuid: config.account.uuid.clone(),
    };
    let downloader = Downloader::new(Arc::new(client), account, config.features)
        .with_max_concurrency(config.account.max_concurrency);

    info!("🚀 Downloading resources of account {}", downloader.account());
    let resources = downloader.download_resources().await?;

    println!("\n📊 Account resources for {}:", downloader.account());
    println!("   Policies: {}", resources.policies.len());
    println!("   Groups: {}", resources.groups.len());
    println!("   Users: {}", resources.users.len());
    if config.features.service_users {
        println!("   Service users: {}", resources.service_users.len());
    }
    if config.features.boundaries {
        println!("   Boundaries: {}", resources.boundaries.len());
    }

    let ctx = WriterContext::new(&config.output.folder, config.output.project.clone())
        .with_features(config.features);
    write(&ctx, &resources)?;
    println!("   Output folder: {}", ctx.target_dir().display());

    let reloaded = load(ctx.target_dir())?;
    if reloaded != resources {
        warn!("Reloading the written files did not reproduce the downloaded resources");
    } else {
        info!("✅ Written files reload to the downloaded resources");
    }

    Ok(())
}
