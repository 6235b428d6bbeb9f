// SpaceData CLI - operator driver for the attestation workflow

mod api;
mod metadata;
mod pipeline;
mod poll;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use spacedata_attest::AttestationState;

use api::{AttestationApi, FetchStatus, ServerClient};
use pipeline::RunOutcome;
use poll::{PollOutcome, PollPolicy};

/// SpaceData - satellite data attestation tool
#[derive(Parser)]
#[command(name = "spacedata")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the SpaceData server
    #[arg(long, global = true, env = "SPACEDATA_SERVER", default_value = "http://localhost:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the server's chain configuration
    Config,
    /// Compute a request id locally from data-info fields
    RequestId {
        /// Data-info field key=value (dotted keys nest; can be repeated)
        #[arg(short, long = "field", value_name = "KEY=VALUE", conflicts_with = "json")]
        field: Vec<String>,

        /// Read the data-info object from a JSON file instead
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Print the SHA-256 metadata digest (an attestation parameters string) instead
        #[arg(long)]
        digest: bool,
    },
    /// Drive the attestation workflow
    Attest {
        #[command(subcommand)]
        action: AttestAction,
    },
}

#[derive(Subcommand)]
enum AttestAction {
    /// Submit an attestation request on-chain
    Request {
        /// Attestation type, e.g. satellite.observation
        #[arg(long = "type")]
        attestation_type: String,

        /// Parameters string, e.g. a metadata digest
        #[arg(long)]
        params: String,
    },
    /// Ask the DA layer once for a result
    Fetch { request_id: String },
    /// Poll the DA layer until a result is available
    Await {
        request_id: String,

        #[command(flatten)]
        poll: PollArgs,
    },
    /// Verify a proof on-chain (read-only)
    Verify {
        request_id: String,
        attestation_response: String,
        proof: String,
    },
    /// Deliver proven data on-chain
    Deliver {
        request_id: String,
        attestation_response: String,
        proof: String,
    },
    /// Request, await, verify and deliver in one go
    Run {
        #[arg(long = "type")]
        attestation_type: String,

        #[arg(long)]
        params: String,

        #[command(flatten)]
        poll: PollArgs,
    },
}

#[derive(Args)]
struct PollArgs {
    /// Give up after this many seconds of waiting
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// First delay between polls, in seconds
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    initial_delay: u64,

    /// Longest delay between polls, in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    max_delay: u64,

    /// Fraction of each delay randomly added or removed (0 to 1)
    #[arg(long, default_value_t = 0.2)]
    jitter: f64,
}

impl PollArgs {
    fn policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_secs(self.initial_delay),
            max_delay: Duration::from_secs(self.max_delay.max(self.initial_delay)),
            timeout: Duration::from_secs(self.timeout),
            ..PollPolicy::default()
        }
        .with_jitter(self.jitter)
    }
}

/// The DA layer had nothing within the wait budget. Not a failure.
#[derive(Debug)]
struct StillPending {
    request_id: String,
    waited: Duration,
}

impl fmt::Display for StillPending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Result for {} not ready after {}s",
            self.request_id,
            self.waited.as_secs()
        )
    }
}

impl std::error::Error for StillPending {}

fn main() {
    let cli = Cli::parse();
    let client = ServerClient::new(&cli.server);

    let result = match cli.command {
        Commands::Config => handle_config(&client),
        Commands::RequestId { field, json, digest } => handle_request_id(&field, json, digest),
        Commands::Attest { action } => handle_attest(&client, action),
    };

    if let Err(e) = result {
        if let Some(pending) = e.downcast_ref::<StillPending>() {
            println!("{} {}", "…".yellow().bold(), pending.to_string().yellow());
            println!("  Try again later with: spacedata attest await {}", pending.request_id);
            std::process::exit(2);
        }
        eprintln!("{} {}", "✗".red().bold(), e.to_string().red());
        std::process::exit(1);
    }
}

fn handle_config(client: &ServerClient) -> anyhow::Result<()> {
    let config = client.chain_config()?;
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "(not set)".dimmed().to_string());

    println!("  RPC URL:           {}", config.rpc_url);
    println!("  DA layer:          {}", config.da_layer_api);
    println!("  FdcHub:            {}", show(&config.fdc_hub_address));
    println!("  FdcVerification:   {}", show(&config.fdc_verification_address));
    println!("  DataPurchase:      {}", show(&config.data_purchase_contract_address));
    Ok(())
}

fn handle_request_id(fields: &[String], json: Option<PathBuf>, digest: bool) -> anyhow::Result<()> {
    let data_info = match json {
        Some(path) => metadata::read_json_file(&path)?,
        None if fields.is_empty() => {
            return Err(anyhow!("Provide data-info with --field KEY=VALUE or --json FILE"));
        }
        None => metadata::parse_fields(fields)?,
    };

    let output = if digest {
        spacedata_attest::metadata_digest(&data_info)?
    } else {
        spacedata_attest::generate_request_id(&data_info)?
    };
    println!("{}", output);
    Ok(())
}

fn handle_attest(client: &ServerClient, action: AttestAction) -> anyhow::Result<()> {
    match action {
        AttestAction::Request {
            attestation_type,
            params,
        } => {
            let submission = client.request_attestation(&attestation_type, &params)?;
            println!("{} Attestation requested", "✓".green().bold());
            println!("  Transaction: {}", submission.transaction_hash);
            match submission.request_id {
                Some(id) => println!("  Request ID:  {}", id),
                None => println!(
                    "  Request ID:  {}",
                    "(no AttestationRequested event in receipt)".yellow()
                ),
            }
            Ok(())
        }
        AttestAction::Fetch { request_id } => {
            match client.fetch_attestation(&request_id)? {
                FetchStatus::Ready(proof) => print_proof(&proof),
                FetchStatus::Pending => {
                    println!("{} Result for {} not ready yet", "…".yellow().bold(), request_id)
                }
            }
            Ok(())
        }
        AttestAction::Await { request_id, poll } => {
            match pipeline::await_proof(client, &request_id, &poll.policy(), std::thread::sleep)? {
                PollOutcome::Ready { value, attempts } => {
                    println!("{} Proof available after {} attempt(s)", "✓".green().bold(), attempts);
                    print_proof(&value);
                    Ok(())
                }
                PollOutcome::TimedOut { waited, .. } => Err(StillPending { request_id, waited }.into()),
            }
        }
        AttestAction::Verify {
            request_id,
            attestation_response,
            proof,
        } => {
            if client.verify_attestation(&request_id, &attestation_response, &proof)? {
                println!("{} {}", "✓".green().bold(), "Proof verified".green());
                Ok(())
            } else {
                Err(anyhow!("Proof rejected by the verification contract"))
            }
        }
        AttestAction::Deliver {
            request_id,
            attestation_response,
            proof,
        } => {
            let tx = client.deliver_data(&request_id, &attestation_response, &proof)?;
            println!("{} Data delivered", "✓".green().bold());
            println!("  Transaction: {}", tx);
            Ok(())
        }
        AttestAction::Run {
            attestation_type,
            params,
            poll,
        } => handle_run(client, &attestation_type, &params, &poll.policy()),
    }
}

fn handle_run(
    client: &ServerClient,
    attestation_type: &str,
    params: &str,
    policy: &PollPolicy,
) -> anyhow::Result<()> {
    match pipeline::run(client, attestation_type, params, policy, std::thread::sleep)? {
        RunOutcome::MissingRequestId { transaction_hash } => {
            println!(
                "{} Transaction {} succeeded but no request id was emitted; stopping here",
                "!".yellow().bold(),
                transaction_hash
            );
            Ok(())
        }
        RunOutcome::NotReady { request_id, waited } => Err(StillPending { request_id, waited }.into()),
        RunOutcome::Finished(AttestationState::Delivered {
            request_id,
            transaction_hash,
        }) => {
            println!("{} {}", "✓".green().bold(), "Data delivered".green());
            println!();
            println!("  Request ID:  {}", request_id);
            println!("  Transaction: {}", transaction_hash);
            Ok(())
        }
        RunOutcome::Finished(AttestationState::Rejected { request_id }) => {
            Err(anyhow!("Proof for {} rejected; data not delivered", request_id))
        }
        RunOutcome::Finished(state) => Err(anyhow!("Pipeline stopped in state {}", state.name())),
    }
}

fn print_proof(proof: &spacedata_attest::AttestationProof) {
    println!("  Attestation response: {}", proof.attestation_response);
    println!("  Proof:                {}", proof.proof);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_args(extra: &[&str]) -> PollArgs {
        let mut argv = vec!["spacedata", "attest", "await", "0xabc"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Attest {
                action: AttestAction::Await { poll, .. },
            } => poll,
            _ => panic!("expected attest await"),
        }
    }

    #[test]
    fn test_zero_initial_delay_is_rejected() {
        let argv = ["spacedata", "attest", "await", "0xabc", "--initial-delay", "0"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_oversized_max_delay_is_rejected() {
        let argv = ["spacedata", "attest", "await", "0xabc", "--max-delay", "18446744073709551615"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_jitter_flag_reaches_policy() {
        assert_eq!(poll_args(&[]).policy().jitter, 0.2);
        assert_eq!(poll_args(&["--jitter", "0"]).policy().jitter, 0.0);
        assert_eq!(poll_args(&["--jitter", "3"]).policy().jitter, 1.0);
    }

    #[test]
    fn test_max_delay_never_below_initial() {
        let policy = poll_args(&["--initial-delay", "30", "--max-delay", "10"]).policy();
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }
}
