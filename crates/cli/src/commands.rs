//! `waypost` subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;

use waypost_auth::{Identity, Role};
use waypost_core::UserId;
use waypost_gate::{
    ConfigLoader, GateConfig, LoginRedirect, NavigationController, NavigationGate,
    NavigationRequest, TracingNotifier,
};
use waypost_observability::LogFormat;
use waypost_session::{HttpIdentityProvider, IdentityProvider, SessionCache, StaticIdentityProvider};

#[derive(Debug, Parser)]
#[command(name = "waypost", version, about = "Navigation authorization gate")]
pub struct Cli {
    /// TOML configuration file (defaults to ./waypost.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Json)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Pretty => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run each path through the gate and print one decision per line.
    Check {
        #[arg(required = true)]
        paths: Vec<String>,

        /// Path the transitions start from.
        #[arg(long, default_value = "/")]
        origin: String,

        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Explain the decision for a single path.
    Explain {
        path: String,

        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Print where a login page with this query string returns the user to.
    Resume {
        query: String,

        #[arg(long, default_value = "/")]
        fallback: String,
    },
}

/// Where the identity comes from. Without flags the configured backend is asked.
#[derive(Debug, Clone, Args)]
pub struct IdentityArgs {
    /// Act as a logged-in user holding this role (no backend call).
    #[arg(long, conflicts_with = "anonymous")]
    pub as_role: Option<String>,

    /// User id for `--as-role` (defaults to 0).
    #[arg(long, requires = "as_role", value_name = "ID")]
    pub as_user: Option<UserId>,

    /// Act as a visitor who is not logged in (no backend call).
    #[arg(long)]
    pub anonymous: bool,
}

impl IdentityArgs {
    fn provider(&self, config: &GateConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
        if let Some(role) = &self.as_role {
            let id = self.as_user.unwrap_or(UserId::new(0));
            let identity = Identity::new(id, "cli", "CLI", Some(Role::new(role.clone())));
            return Ok(Arc::new(StaticIdentityProvider::logged_in(identity)));
        }
        if self.anonymous {
            return Ok(Arc::new(StaticIdentityProvider::anonymous()));
        }

        let provider = HttpIdentityProvider::with_endpoint(
            &config.identity.base_url,
            &config.identity.endpoint,
            config.identity.timeout(),
        )
        .context("failed to build identity provider")?;
        tracing::debug!(url = provider.url(), "using HTTP identity provider");

        Ok(Arc::new(provider))
    }
}

/// Prints every decision it receives as a JSON line on stdout.
struct StdoutController;

impl NavigationController for StdoutController {
    fn proceed(&self, request: &NavigationRequest) {
        println!(
            "{}",
            json!({
                "decision": "proceed",
                "target_path": request.target_path,
                "origin_path": request.origin_path,
            })
        );
    }

    fn redirect(&self, request: &NavigationRequest, redirect: &LoginRedirect) {
        println!(
            "{}",
            json!({
                "decision": "redirect",
                "target_path": request.target_path,
                "origin_path": request.origin_path,
                "location": redirect.to_url(),
            })
        );
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GateConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_config_path(path);
    }
    loader.load().context("invalid gate configuration")
}

fn build_gate(config: &GateConfig, identity: &IdentityArgs) -> anyhow::Result<NavigationGate> {
    let policy = config.policy().context("invalid access rules")?;
    let session = Arc::new(SessionCache::new(identity.provider(config)?));

    Ok(
        NavigationGate::new(session, policy, Arc::new(StdoutController), Arc::new(TracingNotifier))
            .with_login_target(config.login_target()),
    )
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Check {
            paths,
            origin,
            identity,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let gate = build_gate(&config, &identity)?;

            for path in paths {
                gate.navigate(NavigationRequest::new(path, origin.as_str())).await;
            }
        }
        Command::Explain { path, identity } => {
            let config = load_config(cli.config.as_ref())?;
            let gate = build_gate(&config, &identity)?;

            let identity = gate.session().ensure_loaded().await;
            let explanation = gate.policy().explain(&identity, &path);
            println!(
                "{}",
                serde_json::to_string(&explanation).context("failed to serialize explanation")?
            );
        }
        Command::Resume { query, fallback } => {
            let config = load_config(cli.config.as_ref())?;
            println!("{}", config.login_target().resume_target(&query, &fallback));
        }
    }

    Ok(())
}
