//! Command-line walkthrough of the dashboard core.
//!
//! Each invocation builds a context over a file-backed store, so a
//! session started by `login` + `callback` carries over to later runs.
//! Navigations the managers perform are printed instead of rendered.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hostdash::prelude::*;
use hostdash::session::Navigation;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "walkthrough", about = "Drive the hostdash session and tenant managers")]
struct Cli {
    #[arg(long, env = "HOSTDASH_BACKEND_URL", default_value = "http://localhost:8080")]
    backend_url: String,

    #[arg(long, env = "HOSTDASH_STORE", default_value = ".hostdash/session.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the Discord login and print the authorization URL.
    Login {
        #[arg(long)]
        then: Option<String>,
    },
    /// Complete the login with the provider's code and state.
    Callback { code: String, state: String },
    /// Adopt tokens handed over by a backend redirect.
    Tokens {
        access_token: String,
        refresh_token: String,
        #[arg(long, default_value_t = 3600)]
        expires_in: u64,
    },
    /// Fetch and print the signed-in user.
    Whoami,
    /// List the user's tenants.
    Tenants,
    /// List Discord servers that could become tenants.
    Orgs,
    /// Create a tenant from a Discord server.
    Create { guild_id: String },
    /// Select a tenant and go to its dashboard.
    Switch { tenant_id: String },
    /// Set a tenant's default game template.
    Template { tenant_id: String, template: String },
    /// Resynchronize a tenant with its Discord server.
    Sync { tenant_id: String },
    /// Delete a tenant.
    Delete { tenant_id: String },
    /// Run the guards for a route.
    Visit {
        path: String,
        #[arg(long)]
        public: bool,
        #[arg(long)]
        guest: bool,
    },
    /// Sign out.
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {}", e.display_message("request failed"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), HostdashError> {
    let navigator = Arc::new(HistoryNavigator::new());
    let ctx = DashboardContext::<ReqwestTransport>::builder()
        .backend_url(&cli.backend_url)
        .store(Arc::new(FileStore::open(&cli.store)?))
        .navigator(navigator.clone())
        .build(ReqwestTransport::new()?);
    ctx.initialize();

    tracing::debug!(
        store = %cli.store.display(),
        phase = %ctx.session().phase(),
        "context ready"
    );

    match cli.command {
        Command::Login { then } => {
            let options = SignInOptions { callback_url: then };
            ctx.session().sign_in("discord", options).await?;
        }
        Command::Callback { code, state } => {
            ctx.session().handle_callback(&code, &state).await?;
        }
        Command::Tokens {
            access_token,
            refresh_token,
            expires_in,
        } => {
            let user = ctx
                .session()
                .handle_tokens_from_url(&access_token, &refresh_token, expires_in)
                .await?;
            println!("signed in as {}", user.username);
        }
        Command::Whoami => {
            let user = ctx.session().get_current_user().await?;
            println!(
                "{} ({}){}",
                user.username,
                user.id,
                if ctx.session().is_super_admin() { " [superadmin]" } else { "" }
            );
        }
        Command::Tenants => {
            let current = ctx.tenants().current_tenant_id();
            for tenant in ctx.tenants().fetch_user_tenants().await? {
                let marker = if current.as_ref() == Some(&tenant.id) { "*" } else { " " };
                println!("{marker} {}  {}", tenant.id, tenant.name);
            }
        }
        Command::Orgs => {
            for org in ctx.tenants().fetch_available_organizations().await? {
                let owner = if org.owner { " (owner)" } else { "" };
                println!("{}  {}{owner}", org.id, org.name);
            }
        }
        Command::Create { guild_id } => {
            let tenant = ctx.tenants().create_tenant(&guild_id).await?;
            println!("created {} ({})", tenant.name, tenant.id);
        }
        Command::Switch { tenant_id } => {
            let tenant = ctx.tenants().fetch_tenant(&TenantId(tenant_id)).await?;
            ctx.tenants().switch_tenant(&tenant).await;
        }
        Command::Template {
            tenant_id,
            template,
        } => {
            let id = TenantId(tenant_id);
            let mut config = ctx.tenants().fetch_tenant(&id).await?.config;
            config.default_game_template = Some(template);
            ctx.tenants().update_tenant_config(&id, config).await?;
        }
        Command::Sync { tenant_id } => {
            ctx.tenants().sync_tenant(&TenantId(tenant_id)).await?;
        }
        Command::Delete { tenant_id } => {
            ctx.tenants().delete_tenant(&TenantId(tenant_id)).await?;
        }
        Command::Visit {
            path,
            public,
            guest,
        } => {
            let mut route = Route::new(path);
            route.public = public;
            route.guest_only = guest;
            match ctx.navigate(&route).await {
                GuardOutcome::Allow => println!("allowed"),
                GuardOutcome::Redirect(to) => println!("redirected to {to}"),
                GuardOutcome::AccessDenied(message) => println!("access denied: {message}"),
            }
        }
        Command::Logout => ctx.sign_out().await,
    }

    for entry in navigator.entries() {
        match entry {
            Navigation::Push(path) => println!("→ {path}"),
            Navigation::Assign(url) => println!("open in browser: {url}"),
        }
    }
    Ok(())
}
