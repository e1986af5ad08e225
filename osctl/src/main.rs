use clap::Parser;
use osctl::config::{Args, Command};
use osctl::{Config, Error, ObjectDescriptor, StorageClient, telemetry};

async fn run(config: &Config, command: Command) -> Result<(), Error> {
    let client = StorageClient::new(config)?;

    match command {
        Command::Token => {
            let token = client.authenticate().await?;
            if let Some(expires) = token.expires() {
                tracing::info!("Token expires at {}", expires);
            }
            println!("{}", token.id());
        }
        Command::Upload { path, name } => {
            let stored = match name {
                Some(name) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .map_err(osctl::UploadError::Staging)?;
                    client.upload(file, Some(name)).await?
                }
                None => client.upload_file(&path).await?,
            };
            let json = serde_json::to_string(&stored).map_err(anyhow::Error::from)?;
            println!("{json}");
        }
        Command::Download { name, address } => {
            let written = client.download(&ObjectDescriptor::new(name, address)).await?;
            println!("{}", written.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before anything else that might build a TLS client
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Parse CLI args
    let args = Args::parse();

    // Load configuration. Telemetry is not up yet, so report straight to stderr.
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;

    tracing::debug!("{:?}", args);
    tracing::debug!(
        "Using container {} with a {} request timeout",
        config.cloud.container,
        humantime::format_duration(config.cloud.request_timeout)
    );

    let Some(command) = args.command else {
        anyhow::bail!("No command given. Run with --help to see available commands.");
    };

    let result = run(&config, command).await;
    telemetry::shutdown_telemetry();

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}
