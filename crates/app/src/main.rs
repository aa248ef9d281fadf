#![deny(unsafe_code)]

mod repl;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use docchat_service::{HttpDocumentService, ServiceError};
use docchat_session::{Session, Settings, SettingsError};
use snafu::{ResultExt, Snafu};
use tracing_subscriber::EnvFilter;

/// Terminal chat client for the document question-answering service.
#[derive(Debug, Parser)]
#[command(name = "docchat", version)]
struct Args {
    /// Settings file; defaults to `<config dir>/docchat/settings.json`
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the service address from the settings file
    #[arg(long)]
    base_url: Option<String>,

    /// Writes the effective settings to the settings file and exits
    #[arg(long)]
    init_config: bool,
}

#[derive(Debug, Snafu)]
enum AppError {
    #[snafu(display("failed to set up the service client on `{stage}`: {source}"))]
    BuildService {
        stage: &'static str,
        source: ServiceError,
    },
    #[snafu(display("failed to write settings on `{stage}`: {source}"))]
    PersistSettings {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("failed to read terminal input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they never interleave with the transcript on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", snafu::Report::from_error(error));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let config_path = args.config.unwrap_or_else(Settings::default_config_path);
    let mut settings = Settings::load(&config_path);
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
        settings = settings.normalized();
    }

    if args.init_config {
        settings.persist(&config_path).context(PersistSettingsSnafu {
            stage: "init-config",
        })?;
        println!("wrote {}", config_path.display());
        return Ok(());
    }

    let service = HttpDocumentService::new(&settings.base_url).context(BuildServiceSnafu {
        stage: "build-http-client",
    })?;
    let session = Session::new(Arc::new(service), settings.session_options());

    match session.probe_service().await {
        Ok(true) => tracing::info!(base_url = %settings.base_url, "service is healthy"),
        Ok(false) => tracing::warn!(base_url = %settings.base_url, "service reported unhealthy"),
        Err(error) => {
            tracing::warn!(base_url = %settings.base_url, error = %error, "service health check failed")
        }
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    repl::run(session, stdin).await.context(ReadInputSnafu {
        stage: "read-stdin",
    })
}
