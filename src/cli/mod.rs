use clap::{ArgGroup, Args, Parser, Subcommand};
use gop_archive::Compression;
use gop_config::Config;
use gop_module::Coordinate;
use std::path::PathBuf;

pub mod pack;
pub mod publish;

pub const DEFAULT_ARCHIVE: &str = "gop_dependencies.zip";

#[derive(Debug, Parser)]
#[command(name = "gop", version, about = "Pack Go module dependencies for air-gapped environments and republish them")]
pub struct Cli {
    /// Verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Full path to the go binary.
    #[arg(long, env = "GOP_GO_BIN", global = true, value_name = "PATH")]
    pub go_bin: Option<PathBuf>,
    /// Configuration file to use instead of the default location.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download modules and pack them into a zip file.
    Pack(PackArgs),
    /// Publish an archive to a folder so it can be used as a proxy source.
    PublishFolder(PublishFolderArgs),
    /// Publish an archive to JFrog Artifactory (requires an installed and configured jfrog-cli).
    PublishJfrog(PublishJfrogArgs),
    /// Show version.
    Version,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["module", "go_mod_file"])))]
pub struct PackArgs {
    /// Module to pack, e.g. github.com/jessevdk/go-flags or github.com/jessevdk/go-flags@v1.4.0.
    #[arg(short, long, value_name = "MODULE")]
    pub module: Vec<Coordinate>,
    /// Pack all dependencies required by a go.mod file.
    #[arg(short = 'g', long, value_name = "FILE")]
    pub go_mod_file: Option<PathBuf>,
    /// Output file name of the zip archive.
    #[arg(short, long, default_value = DEFAULT_ARCHIVE)]
    pub out: PathBuf,
    /// Ensure all transitive dependencies are included.
    #[arg(short, long)]
    pub transitive: bool,
    /// Archive entry compression (stored, deflate, bzip2, zstd).
    #[arg(long)]
    pub compression: Option<Compression>,
}

#[derive(Debug, Args)]
pub struct PublishFolderArgs {
    /// Path to the archive with dependencies.
    #[arg(value_name = "ARCHIVE", default_value = DEFAULT_ARCHIVE)]
    pub archive: PathBuf,
    /// Output folder for the archive.
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct PublishJfrogArgs {
    /// Path to the archive with dependencies.
    #[arg(value_name = "ARCHIVE", default_value = DEFAULT_ARCHIVE)]
    pub archive: PathBuf,
    /// Artifactory Go repository name, e.g. go-local.
    #[arg(short, long)]
    pub repo: String,
    /// Full path to the jfrog-cli binary.
    #[arg(long, env = "GOP_JFROG_BIN", value_name = "PATH")]
    pub jfrog_bin: Option<PathBuf>,
}

impl Cli {
    /// Layer the global flags over the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        config.verbose |= self.verbose;
        if let Some(go_bin) = &self.go_bin {
            config.go_bin = Some(go_bin.clone());
        }
        if let Command::PublishJfrog(PublishJfrogArgs { jfrog_bin: Some(jfrog_bin), .. }) = &self.command {
            config.jfrog_bin = Some(jfrog_bin.clone());
        }
    }
}
