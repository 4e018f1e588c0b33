mod channel_commands;
mod context;
mod session_commands;
mod tenant_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::context::App;

#[derive(Parser)]
#[command(name = "meridian", about = "Meridian, tenant-aware chat from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Directory holding `meridian.toml` (overrides discovery).
    #[arg(long, global = true, env = "MERIDIAN_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session.
    Login(session_commands::LoginArgs),
    /// End the session and forget persisted credentials.
    Logout,
    /// Show the signed-in identity.
    Whoami,
    /// Create an account on the backend.
    Register(session_commands::RegisterArgs),
    /// Change the signed-in user's password.
    Password(session_commands::PasswordArgs),
    /// Tenant directory.
    Tenants {
        #[command(subcommand)]
        action: tenant_commands::TenantAction,
    },
    /// Tenant member directory.
    Members {
        #[command(subcommand)]
        action: tenant_commands::MemberAction,
    },
    /// Channels of the current tenant.
    Channels {
        #[command(subcommand)]
        action: channel_commands::ChannelAction,
    },
    /// Read and post messages.
    Messages {
        #[command(subcommand)]
        action: channel_commands::MessageAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    if let Some(dir) = cli.config_dir.clone() {
        meridian_config::set_config_dir(dir);
    }
    let config = meridian_config::discover_and_load();
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend.base_url,
        external = config.provider.is_usable(),
        "meridian starting"
    );
    let app = App::from_config(&config)?;

    let outcome = match cli.command {
        Commands::Login(args) => session_commands::login(&app, args).await,
        Commands::Logout => session_commands::logout(&app).await,
        Commands::Whoami => session_commands::whoami(&app),
        Commands::Register(args) => session_commands::register(&app, args).await,
        Commands::Password(args) => session_commands::password(&app, args).await,
        Commands::Tenants { action } => tenant_commands::handle_tenants(&app, action).await,
        Commands::Members { action } => tenant_commands::handle_members(&app, action).await,
        Commands::Channels { action } => channel_commands::handle_channels(&app, action).await,
        Commands::Messages { action } => channel_commands::handle_messages(&app, action).await,
    };
    app.settle();
    outcome
}
