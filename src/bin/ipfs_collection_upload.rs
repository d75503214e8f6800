use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ipfs_collection_uploader::app::Pipeline;
use ipfs_collection_uploader::config::ConfigLoader;
use ipfs_collection_uploader::domain::CollectionName;
use ipfs_collection_uploader::error::UploadError;
use ipfs_collection_uploader::output::{JsonOutput, OutputMode};
use ipfs_collection_uploader::progress::TerminalProgress;
use ipfs_collection_uploader::storage::IpfsHttpClient;

#[derive(Parser)]
#[command(name = "ipfs-collection-upload")]
#[command(about = "Upload ./images and ./metadata to IPFS, pointing each metadata record at its image")]
#[command(version, author)]
struct Cli {
    /// IPFS RPC endpoint, e.g. http://127.0.0.1:5001
    endpoint: String,

    /// Collection folder name; must not exist yet on the node
    collection: String,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<UploadError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &UploadError) -> u8 {
    match error {
        UploadError::DirectoryExists(_)
        | UploadError::InvalidCollectionName(_)
        | UploadError::InvalidEndpoint(_)
        | UploadError::ConfigRead(_)
        | UploadError::ConfigParse(_)
        | UploadError::InvalidConfig(_)
        | UploadError::PairingMismatch { .. } => 2,
        UploadError::StorageHttp(_)
        | UploadError::StorageStatus { .. }
        | UploadError::StorageResponse(_) => 3,
        UploadError::Incomplete { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let collection: CollectionName = cli.collection.parse()?;
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let storage = IpfsHttpClient::new(&cli.endpoint, config.timeout)?;
    let pipeline = Pipeline::new(storage, config);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = pipeline.run(&collection, &JsonOutput)?;
            JsonOutput::print_result(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let progress = TerminalProgress::new();
            let result = pipeline.run(&collection, &progress)?;
            TerminalProgress::print_summary(&result);
        }
    }
    Ok(())
}
