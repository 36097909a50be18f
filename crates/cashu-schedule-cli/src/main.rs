//! Cashu Schedule command-line front end.
//!
//! Seals a Cashu token into a kind-31923 instruction event, signs it with
//! the sender's key and publishes it for a scheduler service to deliver
//! later.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use cashu_schedule::core::Keys;
use cashu_schedule::relay::WebSocketRelayClient;
use cashu_schedule::{
    open_instruction, EncryptionFormat, Event, FanoutPublisher, PublishOutcome, PublishReport,
    Publisher, RelayUrl, Scheduler, SchedulerConfig,
};

/// Schedule Cashu token delivery over Nostr.
#[derive(Parser, Debug)]
#[command(name = "cashu-schedule")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CASHU_SCHEDULE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log format (plain, json)
    #[arg(long, global = true, env = "CASHU_SCHEDULE_LOG_FORMAT", default_value = "plain")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh identity
    Keygen,

    /// Seal, sign and publish a scheduled delivery
    Schedule {
        /// Sender secret key (nsec1... or hex)
        #[arg(long, env = "CASHU_SCHEDULE_NSEC", hide_env_values = true)]
        nsec: String,

        /// Recipient public key (npub1... or hex)
        #[arg(long)]
        recipient: String,

        /// Cashu token to deliver
        #[arg(long, env = "CASHU_SCHEDULE_TOKEN", hide_env_values = true)]
        token: String,

        /// Delay in minutes (1 to 525600)
        #[arg(long, allow_negative_numbers = true)]
        delay: i64,

        /// Configuration file
        #[arg(short, long, env = "CASHU_SCHEDULE_CONFIG")]
        config: Option<PathBuf>,

        /// Scheduler service public key, overriding the configuration
        #[arg(long, env = "CASHU_SCHEDULE_SCHEDULER")]
        scheduler: Option<String>,

        /// Relay to publish to, overriding the configuration (repeatable)
        #[arg(long = "relay")]
        relays: Vec<String>,

        /// Envelope cipher (nip44, nip04)
        #[arg(long)]
        cipher: Option<EncryptionFormat>,

        /// Print the signed event instead of publishing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Publish an already signed event again
    Publish {
        /// File holding the event JSON, or - for stdin
        #[arg(long)]
        event_file: PathBuf,

        /// Configuration file
        #[arg(short, long, env = "CASHU_SCHEDULE_CONFIG")]
        config: Option<PathBuf>,

        /// Relay to publish to, overriding the configuration (repeatable)
        #[arg(long = "relay")]
        relays: Vec<String>,
    },

    /// Decode an instruction event with the scheduler service's key
    Inspect {
        /// Scheduler service secret key (nsec1... or hex)
        #[arg(long, env = "CASHU_SCHEDULE_SCHEDULER_NSEC", hide_env_values = true)]
        nsec: String,

        /// File holding the event JSON, or - for stdin
        #[arg(long)]
        event_file: PathBuf,
    },
}

fn setup_logging(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("tungstenite=warn".parse()?)
        .add_directive("tokio_tungstenite=warn".parse()?);

    // Logs go to stderr; stdout carries command output.
    match log_format.to_lowercase().as_str() {
        "json" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
        _ => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
    }

    Ok(())
}

fn keygen() -> Result<()> {
    let keys = Keys::generate().context("Failed to generate identity")?;
    let public_key = keys.public_key();
    println!("nsec:   {}", keys.to_bech32()?);
    println!("npub:   {}", public_key.to_bech32()?);
    println!("pubkey: {}", public_key.to_hex());
    Ok(())
}

/// Load the configuration file (or defaults) and apply command-line
/// overrides.
fn build_config(
    path: Option<&Path>,
    scheduler: Option<String>,
    relays: Vec<String>,
    cipher: Option<EncryptionFormat>,
) -> Result<SchedulerConfig> {
    let mut config = match path {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };

    if scheduler.is_some() {
        config.scheduler_pubkey = scheduler;
    }
    if !relays.is_empty() {
        config.relays = relays;
    }
    if let Some(cipher) = cipher {
        config.cipher = cipher;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn schedule(
    nsec: &str,
    recipient: String,
    token: &str,
    delay: i64,
    config: SchedulerConfig,
    dry_run: bool,
) -> Result<()> {
    let mut scheduler = Scheduler::connect(config).context("Failed to start scheduler")?;
    scheduler
        .load_identity(nsec)
        .context("Failed to load sender identity")?;
    scheduler.set_recipient(recipient);

    if dry_run {
        let scheduled = scheduler.prepare(token, delay)?;
        println!("{}", serde_json::to_string_pretty(&scheduled.event)?);
        return Ok(());
    }

    let receipt = scheduler.schedule(token, delay).await?;
    let scheduled = &receipt.scheduled;
    println!("event id:   {}", scheduled.id());
    println!("request id: {}", scheduled.request_id);
    println!("target:     {}", scheduled.target);

    report_outcome(&receipt.report, receipt.event())
}

/// Print how a publish ended. No relay accepting is a warning, not an
/// error: the signed event is echoed so it can be published again.
fn report_outcome(report: &PublishReport, event: &Event) -> Result<()> {
    match report.outcome() {
        PublishOutcome::Delivered { accepted } => {
            println!("published:  {accepted}/{accepted} relays");
        }
        PublishOutcome::Degraded { accepted, total } => {
            println!("published:  {accepted}/{total} relays");
            for (relay, reason) in report.rejected.iter().chain(&report.failed) {
                eprintln!("warning: {relay}: {reason}");
            }
            for relay in &report.timed_out {
                eprintln!("warning: {relay}: no answer");
            }
        }
        PublishOutcome::DeliveryUncertain { total } => {
            warn!(event_id = %report.event_id, total, "no relay accepted the event");
            eprintln!(
                "warning: none of {total} relays accepted the event; \
                 save the event below and retry with `cashu-schedule publish`"
            );
            println!("{}", serde_json::to_string(event)?);
        }
    }
    Ok(())
}

fn read_event(path: &Path) -> Result<Event> {
    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    Event::from_json(json.trim()).context("Failed to parse event")
}

async fn publish(event_file: &Path, config: SchedulerConfig) -> Result<()> {
    let event = read_event(event_file)?;
    let relays = config.relay_urls()?;
    let client = WebSocketRelayClient::new(config.publish.ack_timeout());
    let publisher = FanoutPublisher::new(client).with_timeout(config.publish.timeout());

    let report = republish(&publisher, &event, &relays).await?;
    report_outcome(&report, &event)
}

/// Send an already signed event again, unchanged.
async fn republish<P: Publisher>(
    publisher: &P,
    event: &Event,
    relays: &[RelayUrl],
) -> Result<PublishReport> {
    event.verify().context("Event id or signature is invalid")?;
    let report = publisher.publish(event, relays).await;
    println!("event id:   {}", report.event_id);
    Ok(report)
}

fn inspect(nsec: &str, event_file: &Path) -> Result<()> {
    let keys = Keys::parse(nsec).context("Failed to load scheduler identity")?;
    let event = read_event(event_file)?;

    let instruction = open_instruction(&event, &keys).context("Not a readable instruction")?;
    let inner = instruction.inner_message()?;
    let ephemeral = instruction.ephemeral_keys()?;
    if ephemeral.public_key() != inner.sender() {
        bail!("ephemeral key does not match the inner message author");
    }

    println!("event id:   {}", event.id);
    println!("sender:     {}", event.pubkey);
    println!("request id: {}", event.tag_value("d").unwrap_or("-"));
    println!("target:     {}", instruction.target());
    println!("ephemeral:  {}", ephemeral.public_key());
    println!("recipient:  {}", inner.recipient()?);
    println!("inner message:");
    println!("{}", serde_json::to_string_pretty(inner.as_unsigned())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level, &cli.log_format)?;

    match cli.command {
        Command::Keygen => keygen(),
        Command::Schedule {
            nsec,
            recipient,
            token,
            delay,
            config,
            scheduler,
            relays,
            cipher,
            dry_run,
        } => {
            let config = build_config(config.as_deref(), scheduler, relays, cipher)?;
            info!(relays = config.relays.len(), cipher = %config.cipher, "scheduling");
            schedule(&nsec, recipient, &token, delay, config, dry_run).await
        }
        Command::Publish {
            event_file,
            config,
            relays,
        } => {
            let config = build_config(config.as_deref(), None, relays, None)?;
            publish(&event_file, config).await
        }
        Command::Inspect { nsec, event_file } => inspect(&nsec, &event_file),
    }
}
