//! Command-line entrypoint for sending one command to a bridge host.
//!
//! Prints the result payload as JSON on success; failures are reported
//! on stderr with a non-zero exit status.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;

use tether_client::{ClientError, Connector};
use tether_config::SocketEndpoint;
use tether_protocol::Params;

/// Command-line interface for the tether bridge client.
#[derive(Parser, Debug)]
#[command(name = "tether", about = "Send a command to a tether bridge host")]
struct Cli {
    /// Bridge endpoint to connect to (e.g. tcp://localhost:9876).
    #[arg(long, default_value_t = SocketEndpoint::default())]
    endpoint: SocketEndpoint,
    /// Seconds to wait for the host to respond.
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
    /// Name of the command to invoke.
    command: String,
    /// Command parameters as a JSON object.
    #[arg(default_value = "{}")]
    params: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(result) => {
            match serde_json::to_string_pretty(&result) {
                Ok(rendered) => println!("{rendered}"),
                Err(_) => println!("{result}"),
            }
            ExitCode::SUCCESS
        }
        Err(CliError::Usage(message)) => {
            eprintln!("tether: {message}");
            ExitCode::from(2)
        }
        Err(CliError::Client(error)) => {
            eprintln!("tether: {error}");
            match error {
                ClientError::Command { .. } => ExitCode::FAILURE,
                _ => ExitCode::from(2),
            }
        }
    }
}

enum CliError {
    Usage(String),
    Client(ClientError),
}

fn run(cli: Cli) -> Result<Value, CliError> {
    let params = parse_params(&cli.params)?;
    let mut connector = Connector::new(cli.endpoint)
        .with_receive_timeout(Duration::from_secs(cli.timeout_secs));
    let result = connector
        .send_command(cli.command, params)
        .map_err(CliError::Client)?;
    connector.disconnect();
    Ok(result)
}

fn parse_params(raw: &str) -> Result<Params, CliError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|error| CliError::Usage(format!("params must be valid JSON: {error}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CliError::Usage(format!(
            "params must be a JSON object, got: {other}"
        ))),
    }
}
