use clap::Parser;
use member_directory::cli::client::RequestError;
use member_directory::cli::utils::output_error;
use member_directory::cli::{Cli, OutputFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    if let Err(e) = member_directory::cli::run(cli).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => {
                let code = match e.downcast_ref::<RequestError>() {
                    Some(RequestError::Api { code, .. }) => Some(code.as_str()),
                    _ => None,
                };
                output_error(&output_format, &e.to_string(), code)?
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
