use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, B256};
use anyhow::{anyhow, Context, Result};
use buy_intent_relay::{
    config::DEFAULT_WAIT_BUDGET,
    rpc::JsonRpcEndpoint,
    ChainConfig, Deployment, IntentDefaults, IntentPipeline, LocalKeySigner, RelayConfig,
    SigningCapability, SmartAccountResolver, Sponsorship, WalletSessionSigner,
};
use buy_intent_types::{
    constants::{DEFAULT_AMOUNT_OUT, DEFAULT_MAX_ETH_IN, DEFAULT_MAX_SLIPPAGE_BPS},
    parse_amount, Intent, IntentParams,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Submit buy intents to the intent gateway through a Safe smart account and the relay.
///
/// Environment variables (and a `.env` file) fill in anything not given on the command line.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the smart account bound to the owner, with its balance.
    Account {
        #[command(flatten)]
        owner: OwnerArgs,

        /// Base network RPC URL (defaults to the chain's public endpoint).
        #[arg(long, env = "RPC_URL")]
        rpc_url: Option<String>,
    },

    /// Encode, sign and submit a buy intent; prints the caller report as JSON.
    Submit {
        #[command(flatten)]
        owner: OwnerArgs,

        #[command(flatten)]
        intent: IntentArgs,

        /// Seconds to wait for the relay before reporting the submission as pending.
        #[arg(long, default_value_t = DEFAULT_WAIT_BUDGET.as_secs())]
        timeout_secs: u64,

        /// Ask the relay paymaster to sponsor gas.
        #[arg(long)]
        sponsor: bool,

        /// Paymaster sponsorship policy id (implies `--sponsor`).
        #[arg(long, env = "SPONSORSHIP_POLICY_ID")]
        sponsorship_policy_id: Option<String>,

        /// Also write the report to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the `submitIntent` calldata for an intent without touching the network.
    Calldata {
        #[command(flatten)]
        intent: IntentArgs,
    },
}

#[derive(Args, Debug)]
struct OwnerArgs {
    /// Owner private key (hex string, 0x...).
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Path to a file containing the owner private key.
    #[arg(long, env = "PRIV_KEY_PATH")]
    private_key_path: Option<PathBuf>,

    /// Wallet session RPC URL; signatures are requested with `personal_sign`.
    #[arg(long, requires = "session_address")]
    session_rpc: Option<String>,

    /// Owner address unlocked in the wallet session.
    #[arg(long)]
    session_address: Option<Address>,
}

#[derive(Args, Debug)]
struct IntentArgs {
    /// Token to buy (defaults to MEME_TOKEN_ADDRESS or the built-in token).
    #[arg(long)]
    token: Option<Address>,

    /// Amount of tokens to receive, in whole units.
    #[arg(long, default_value = DEFAULT_AMOUNT_OUT)]
    amount_out: String,

    /// Most native currency to spend, in whole units; also the attached value.
    #[arg(long, default_value = DEFAULT_MAX_ETH_IN)]
    max_eth_in: String,

    #[arg(long, default_value_t = DEFAULT_MAX_SLIPPAGE_BPS)]
    max_slippage_bps: u32,

    #[arg(long)]
    helper_selector: Option<u64>,

    /// Absolute deadline in unix seconds (defaults to now + 600).
    #[arg(long)]
    deadline: Option<u64>,

    #[arg(long)]
    nonce: Option<B256>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let chain = ChainConfig::monad_testnet();

    match cli.command {
        Command::Account { owner, rpc_url } => show_account(&chain, &owner, rpc_url).await,
        Command::Submit {
            owner,
            intent,
            timeout_secs,
            sponsor,
            sponsorship_policy_id,
            output,
        } => {
            let sponsorship = if sponsor || sponsorship_policy_id.is_some() {
                Sponsorship::Paymaster {
                    policy_id: sponsorship_policy_id,
                }
            } else {
                Sponsorship::SelfFunded
            };
            let relay = RelayConfig::from_env(&chain)?
                .with_wait_budget(Duration::from_secs(timeout_secs))
                .with_sponsorship(sponsorship);
            submit(&chain, &owner, &intent, &relay, output.as_deref()).await
        }
        Command::Calldata { intent } => {
            let intent = build_intent(&intent)?;
            let data = buy_intent_relay::encode_intent(&intent);
            println!("to:    {}", Deployment::default().intent_gateway);
            println!("value: {}", intent.max_eth_in());
            println!("data:  0x{}", hex::encode(&data));
            Ok(())
        }
    }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_secs())
}

fn build_intent(args: &IntentArgs) -> Result<Intent> {
    let defaults = IntentDefaults::from_env()?;
    let base = defaults.params();
    let params = IntentParams {
        target_token: args.token.unwrap_or(base.target_token),
        amount_out: parse_amount(&args.amount_out)?,
        max_eth_in: parse_amount(&args.max_eth_in)?,
        max_slippage_bps: args.max_slippage_bps,
        helper_selector: args.helper_selector.unwrap_or(base.helper_selector),
        deadline: args.deadline,
        nonce: args.nonce.unwrap_or(base.nonce),
    };
    Intent::new(params, unix_now()?).context("invalid intent")
}

fn build_signer(args: &OwnerArgs, chain: &ChainConfig) -> Result<Arc<dyn SigningCapability>> {
    if let (Some(url), Some(address)) = (&args.session_rpc, args.session_address) {
        let endpoint = JsonRpcEndpoint::connect(url)?;
        info!(%address, chain = %chain.name, "signing through wallet session");
        return Ok(Arc::new(WalletSessionSigner::new(endpoint, address)));
    }

    let hex_key = if let Some(ref path) = args.private_key_path {
        fs::read_to_string(path)
            .with_context(|| format!("failed reading key file {}", path.display()))?
    } else if let Some(ref key) = args.private_key {
        key.clone()
    } else {
        return Err(anyhow!(
            "missing owner key: provide --private-key-path, --private-key or --session-rpc (or set PRIV_KEY_PATH/PRIVATE_KEY)"
        ));
    };
    Ok(Arc::new(LocalKeySigner::from_hex(&hex_key)?))
}

async fn show_account(chain: &ChainConfig, owner: &OwnerArgs, rpc_url: Option<String>) -> Result<()> {
    let signer = build_signer(owner, chain)?;
    let rpc_url = match rpc_url {
        Some(url) => url,
        None => chain
            .default_rpc_url()
            .ok_or_else(|| anyhow!("chain {} has no rpc url", chain.name))?
            .to_string(),
    };
    let reader = Arc::new(JsonRpcEndpoint::connect(&rpc_url)?);
    let resolver = SmartAccountResolver::new(reader, Deployment::default());
    let account = resolver.resolve(&*signer, chain).await?;

    let report = json!({
        "owner": account.owner,
        "accountAddress": account.address,
        "deployed": account.deployed,
        "balanceWei": account.balance.to_string(),
        "balance": format!("{} {}", chain.format_native(account.balance), chain.native_currency.symbol),
        "explorer": chain.address_url(account.address),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn submit(
    chain: &ChainConfig,
    owner: &OwnerArgs,
    intent: &IntentArgs,
    relay: &RelayConfig,
    output: Option<&Path>,
) -> Result<()> {
    // Validate before anything touches the network.
    let intent = build_intent(intent)?;
    let signer = build_signer(owner, chain)?;
    let pipeline = IntentPipeline::connect(chain.clone(), Deployment::default(), relay)?;

    let report = pipeline.submit_report(signer, &intent).await?;
    let value = serde_json::to_value(&report).context("failed serialising report")?;
    println!("{}", serde_json::to_string_pretty(&value)?);

    if !report.is_pending {
        if let Some(url) = report
            .tx_hash
            .as_deref()
            .and_then(|h| h.parse::<B256>().ok())
            .and_then(|h| chain.tx_url(h))
        {
            info!(%url, "transaction");
        }
    }

    if let Some(path) = output {
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        let record = json!({
            "network": chain.name,
            "chainId": chain.id,
            "submittedAt": now,
            "report": value,
        });
        write_json_atomic(path, &record)?;
    }
    Ok(())
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising report JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
