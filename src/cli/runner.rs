//! CLI runner - executes commands

use crate::api::{ApiClient, ConnectorSource, LogSource, Resource};
use crate::cli::commands::{Cli, Commands, ConnectorCommand, LogArgs, TailArgs};
use crate::config::{load_profile, Profile};
use crate::engine::{BatchSource, GapPolicy, PollEngine, PollSummary, StopReason};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::{build_writer, OutputSink};
use crate::state::{CursorTracker, StartMode};
use crate::types::{millis_to_rfc3339, parse_point_in_time};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Window of a one-shot `log` command without `--since`
const DEFAULT_LOG_WINDOW: Duration = Duration::from_secs(60 * 60);

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationToken,
}

impl Runner {
    /// Create a runner that stops when `cancel` fires
    pub fn new(cli: Cli, cancel: CancellationToken) -> Self {
        Self { cli, cancel }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let profile = load_profile(self.cli.config.as_deref(), &self.cli.section)?;
        debug!(
            section = %self.cli.section,
            auth = profile.auth.kind(),
            "Loaded profile"
        );
        let client = Arc::new(build_client(&profile)?);

        match &self.cli.command {
            Commands::Log(args) => self.log(&profile, client, args).await,
            Commands::Connector {
                command: ConnectorCommand::List(tail),
            } => {
                if tail.tail {
                    let mut source = ConnectorSource::new(client);
                    self.tail(&profile, &mut source, tail, StartMode::FromStart)
                        .await
                } else {
                    self.list(&client, Resource::Connectors).await
                }
            }
            Commands::Cert { .. } => self.list(&client, Resource::Certificates).await,
            Commands::App { .. } => self.list(&client, Resource::Apps).await,
            Commands::Idp { .. } => self.list(&client, Resource::Idps).await,
            Commands::Directory { .. } => self.list(&client, Resource::Directories).await,
        }
    }

    fn sink(&self) -> Box<dyn OutputSink> {
        build_writer(
            self.cli.format,
            self.cli.fields.clone(),
            !self.cli.no_header,
            std::io::stdout(),
        )
    }

    /// Run a single-shot call, turning Ctrl-C into `Error::Interrupted`
    async fn interruptible<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Interrupted),
            result = call => result,
        }
    }

    async fn list(&self, client: &ApiClient, resource: Resource) -> Result<()> {
        let mut sink = self.sink();
        self.interruptible(client.list(resource, sink.as_mut()))
            .await?;
        Ok(())
    }

    async fn log(&self, profile: &Profile, client: Arc<ApiClient>, args: &LogArgs) -> Result<()> {
        if args.tail.tail {
            let mut source = LogSource::new(client, args.kind);
            return self
                .tail(profile, &mut source, &args.tail, StartMode::FromNow)
                .await;
        }

        let now = Utc::now().timestamp_millis();
        let (since, until) = log_window(args, now)?;
        info!(
            log = %args.kind,
            since = %millis_to_rfc3339(since),
            until = %millis_to_rfc3339(until),
            "Fetching log window"
        );

        let mut sink = self.sink();
        self.interruptible(client.fetch_logs(args.kind, since, Some(until), sink.as_mut()))
            .await?;
        Ok(())
    }

    async fn tail(
        &self,
        profile: &Profile,
        source: &mut dyn BatchSource,
        args: &TailArgs,
        default_start: StartMode,
    ) -> Result<()> {
        let mut config = profile.poll_config().max_items(args.max_items);
        if let Some(secs) = args.interval {
            config.interval = Duration::from_secs(secs);
        }
        if args.strict {
            config = config.gap_policy(GapPolicy::Fail);
        }

        let start = args.start_mode(default_start);
        let tracker = CursorTracker::initialize(&start, Utc::now().timestamp_millis());
        let mut engine = PollEngine::new(config, tracker);
        let mut sink = self.sink();

        let result = engine.run(source, sink.as_mut(), &self.cancel).await;

        // Printed on every exit path so a failed tail can still be resumed
        if let Some(token) = engine.cursor().resume_value() {
            eprintln!("Resume with: --resume {token}");
        }

        report(&result?);
        Ok(())
    }
}

fn build_client(profile: &Profile) -> Result<ApiClient> {
    let http = HttpClient::with_auth(profile.http_config(), profile.auth.clone())?;
    Ok(ApiClient::new(http).with_page_size(profile.page_size))
}

fn report(summary: &PollSummary) {
    let reason = match summary.stop_reason {
        StopReason::Cancelled => "interrupted",
        StopReason::LimitReached => "item limit reached",
    };
    info!(
        polls = summary.polls,
        items = summary.items_emitted,
        duplicates = summary.duplicates_skipped,
        failures = summary.transient_failures,
        truncations = summary.truncations,
        "Tail stopped: {reason}"
    );
}

fn log_window(args: &LogArgs, now: i64) -> Result<(i64, i64)> {
    let since = match &args.since {
        Some(value) => parse_since(value, now)
            .ok_or_else(|| Error::invalid_value("--since", format!("cannot parse '{value}'")))?,
        None => now - DEFAULT_LOG_WINDOW.as_millis() as i64,
    };
    let until = match &args.until {
        Some(value) => parse_point_in_time(value)
            .ok_or_else(|| Error::invalid_value("--until", format!("cannot parse '{value}'")))?,
        None => now,
    };
    if since > until {
        return Err(Error::invalid_value("--since", "is after --until"));
    }
    Ok((since, until))
}

/// Parse `--since`: epoch ms, RFC 3339, or an age such as `90s`, `15m`,
/// `2h`, `1d` counted back from `now` (epoch ms)
pub fn parse_since(input: &str, now: i64) -> Option<i64> {
    let input = input.trim();
    if let Some(ms) = parse_point_in_time(input) {
        return Some(ms);
    }

    let split = input.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = input.split_at(split);
    let amount: i64 = amount.parse().ok()?;
    let unit_ms = match unit {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        _ => return None,
    };
    Some(now - amount.checked_mul(unit_ms)?)
}
