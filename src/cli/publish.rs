use crate::cli::{PublishFolderArgs, PublishJfrogArgs};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gop_config::Config;
use gop_publish::{FolderPublisher, JfrogCli};

pub async fn folder(args: PublishFolderArgs, config: &Config) -> Result<()> {
    let publisher = FolderPublisher::new(&args.out).with_workers(config.publish_workers);
    let report = publisher.publish_archive(&args.archive).await.or_raise(|| ErrorKind::Publish)?;
    tracing::info!("to use the published folder as the module proxy, run:");
    for hint in report.hints() {
        tracing::info!("  {hint}");
    }
    Ok(())
}

pub async fn jfrog(args: PublishJfrogArgs, config: &Config) -> Result<()> {
    let cli = JfrogCli::discover(config.jfrog_bin.as_deref(), &args.repo).or_raise(|| ErrorKind::Publish)?;
    for line in cli.config_summary().await.or_raise(|| ErrorKind::Publish)? {
        tracing::info!("config: {line}");
    }
    tracing::info!(repository = cli.repository(), "uploading to artifactory");
    gop_publish::jfrog::publish_archive(&cli, &args.archive, config.publish_workers)
        .await
        .or_raise(|| ErrorKind::Publish)?;
    Ok(())
}
