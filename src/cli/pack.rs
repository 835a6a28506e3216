use crate::cli::PackArgs;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gop_config::Config;
use gop_module::ExclusionFilter;
use gop_resolver::{GoToolchain, ResolveOptions, WorkDir};

/// Populate a fresh module cache and pack it into `args.out`.
pub async fn run(args: PackArgs, config: &Config) -> Result<()> {
    if args.out.exists() {
        exn::bail!(ErrorKind::ArchiveExists(args.out));
    }

    let work = WorkDir::new().or_raise(|| ErrorKind::Pack)?;
    let go = GoToolchain::discover(config.go_bin.as_deref(), &work).or_raise(|| ErrorKind::Pack)?;
    tracing::debug!(go = %go.binary().display(), work_dir = %work.path().display(), "prepared workspace");

    match &args.go_mod_file {
        Some(go_mod) => {
            tracing::info!(file = %go_mod.display(), "downloading dependencies of go.mod");
            work.install_go_mod(go_mod).or_raise(|| ErrorKind::Pack)?;
            go.download_all().await.or_raise(|| ErrorKind::Pack)?;
        },
        None => {
            work.write_placeholder_go_mod().or_raise(|| ErrorKind::Pack)?;
            let options = ResolveOptions {
                transitive: args.transitive,
                workers: config.workers,
                exclude: ExclusionFilter::new(config.exclude.iter().cloned()),
            };
            let closure = gop_resolver::resolve(&go, &args.module, &options).await;
            if closure.is_empty() {
                tracing::warn!("no modules were downloaded");
            }
        },
    }

    let compression = args.compression.unwrap_or(config.compression);
    tracing::info!(archive = %args.out.display(), %compression, "creating archive");
    let cache = work.cache().to_path_buf();
    let out = args.out.clone();
    let stats = tokio::task::spawn_blocking(move || gop_archive::pack(&cache, &out, compression))
        .await
        .or_raise(|| ErrorKind::Pack)?
        .or_raise(|| ErrorKind::Pack)?;
    tracing::info!(
        archive = %args.out.display(),
        files = stats.added,
        skipped = stats.skipped,
        bytes = stats.bytes,
        "archive created"
    );
    Ok(())
}
