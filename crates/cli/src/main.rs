use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use icn_common::logging::init_logging;
use icn_common::{Configuration, Payload, SignerSet, StaticMembership, ValidatorConfig};
use icn_governance::{GovernanceAction, GovernanceGenesis, GovernanceRecord, GovernanceValidator};
use icn_policy::{validate, ValidationContext, Verdict, Workflow};
use icn_treasury::{Genesis, TreasuryAction, TreasuryRecord, TreasuryValidator};

/// Prefix of environment overrides for the validator configuration
const ENV_PREFIX: &str = "ICN";

#[derive(Parser)]
#[command(name = "icn-validate", author, version, about, long_about = None)]
struct Cli {
    /// Validator configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference time (RFC 3339), overriding the request's reference_time
    #[arg(long, global = true)]
    at: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a proposed transition and print ACCEPT or REJECT
    Validate {
        workflow: WorkflowKind,
        /// Request file (JSON)
        #[arg(long)]
        request: PathBuf,
    },
    /// Print the canonical successor record for a request's action
    Build {
        workflow: WorkflowKind,
        /// Request file (JSON)
        #[arg(long)]
        request: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WorkflowKind {
    Treasury,
    Governance,
}

/// One transition as submitted on the command line
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de>, A: Deserialize<'de>, G: Deserialize<'de>"))]
struct Request<R, A, G> {
    #[serde(default)]
    old: Option<R>,
    action: A,
    #[serde(default)]
    signers: SignerSet,
    #[serde(default)]
    reference_time: u64,
    /// Candidate successor records, as JSON
    #[serde(default)]
    successors: Vec<serde_json::Value>,
    #[serde(default)]
    produced_outputs: Vec<Payload>,
    /// Registry snapshot consulted by governance
    #[serde(default)]
    membership: Option<StaticMembership>,
    /// Bootstrap inputs for `build`
    #[serde(default)]
    genesis: Option<G>,
}

type TreasuryRequest = Request<TreasuryRecord, TreasuryAction, Genesis>;
type GovernanceRequest = Request<GovernanceRecord, GovernanceAction, GovernanceGenesis>;

impl<R, A, G> Request<R, A, G> {
    fn context(&self, at: Option<u64>) -> ValidationContext {
        ValidationContext::new(self.signers.clone(), at.unwrap_or(self.reference_time))
            .with_outputs(self.produced_outputs.clone())
    }

    fn successor_payloads(&self) -> Result<Vec<Payload>> {
        self.successors
            .iter()
            .map(Payload::encode)
            .collect::<icn_common::Result<Vec<_>>>()
            .context("Failed to encode successor records")
    }
}

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse request file {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<ValidatorConfig> {
    match path {
        Some(path) => {
            let mut config = ValidatorConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            config.apply_env(ENV_PREFIX)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(ValidatorConfig::from_env(ENV_PREFIX)?),
    }
}

/// Seconds since the Unix epoch of an RFC 3339 timestamp
fn parse_reference_time(at: &str) -> Result<u64> {
    let parsed = DateTime::parse_from_rfc3339(at).with_context(|| format!("Invalid --at time '{}'", at))?;
    u64::try_from(parsed.timestamp()).map_err(|_| anyhow!("--at time '{}' is before the Unix epoch", at))
}

fn run_validate<W: Workflow, G>(
    workflow: &W,
    request: &Request<W::Record, W::Action, G>,
    at: Option<u64>,
) -> Result<Verdict> {
    let ctx = request.context(at);
    let successors = request.successor_payloads()?;
    Ok(validate(workflow, request.old.as_ref(), &request.action, &ctx, &successors))
}

fn validate_request(
    workflow: WorkflowKind,
    request: &Path,
    config: &ValidatorConfig,
    at: Option<u64>,
) -> Result<Verdict> {
    match workflow {
        WorkflowKind::Treasury => {
            let request: TreasuryRequest = read_request(request)?;
            run_validate(&TreasuryValidator::new(config), &request, at)
        }
        WorkflowKind::Governance => {
            let request: GovernanceRequest = read_request(request)?;
            let registry = request.membership.clone().unwrap_or_default();
            run_validate(&GovernanceValidator::with_registry(config, registry), &request, at)
        }
    }
}

fn build_request(
    workflow: WorkflowKind,
    request: &Path,
    config: &ValidatorConfig,
    at: Option<u64>,
) -> Result<serde_json::Value> {
    match workflow {
        WorkflowKind::Treasury => {
            let request: TreasuryRequest = read_request(request)?;
            let new = icn_treasury::build_successor(
                request.old.as_ref(),
                request.genesis.as_ref(),
                &request.action,
                &request.context(at),
                config.default_required_approvals,
            )
            .context("Failed to build treasury successor")?;
            Ok(serde_json::to_value(new)?)
        }
        WorkflowKind::Governance => {
            let request: GovernanceRequest = read_request(request)?;
            let new = icn_governance::build_successor(
                request.old.as_ref(),
                request.genesis.as_ref(),
                &request.action,
                &request.context(at),
            )
            .context("Failed to build governance successor")?;
            Ok(serde_json::to_value(new)?)
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let _guard = init_logging(&config.log_level, config.log_dir.as_deref())?;
    info!(
        quorum_mode = ?config.quorum_mode,
        vote_deadline = ?config.vote_deadline,
        params_authorization = ?config.params_authorization,
        "configuration loaded"
    );

    let at = cli.at.as_deref().map(parse_reference_time).transpose()?;

    match cli.command {
        Commands::Validate { workflow, request } => {
            debug!(?workflow, request = %request.display(), "validating request");
            let verdict = validate_request(workflow, &request, &config, at)?;
            println!("{}", verdict);
            Ok(if verdict.is_accepted() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Commands::Build { workflow, request } => {
            debug!(?workflow, request = %request.display(), "building successor");
            let successor = build_request(workflow, &request, &config, at)?;
            println!("{}", serde_json::to_string_pretty(&successor)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
