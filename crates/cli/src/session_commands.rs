use {anyhow::Result, clap::Args, meridian_common::Role};

use crate::context::{App, explain};

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "MERIDIAN_PASSWORD", hide_env_values = true)]
    password: String,
    /// Tenant to sign in to (`tenant-a`, `tenant-b`, `tenant-c` are demo tenants).
    #[arg(long)]
    tenant: String,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "MERIDIAN_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value = "member")]
    role: Role,
    /// Organization the account belongs to.
    #[arg(long)]
    org: String,
}

#[derive(Args)]
pub struct PasswordArgs {
    #[arg(long)]
    current: String,
    #[arg(long = "new")]
    new_password: String,
}

pub async fn login(app: &App, args: LoginArgs) -> Result<()> {
    let session = app
        .store
        .create(&args.email, &args.password, &args.tenant)
        .await
        .map_err(explain)?;
    let identity = session.identity();
    println!(
        "Logged in as {} ({}) in {}",
        identity.display_name, identity.role, identity.tenant_name
    );
    if session.is_demo() {
        println!("Demo tenant: data is local and read-only.");
    }
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    let session = app.store.restore();
    app.store.clear().await;
    if let Some(session) = session {
        app.resolver().disconnect(&session).await;
    }
    println!("Logged out");
    Ok(())
}

pub fn whoami(app: &App) -> Result<()> {
    let session = app.session()?;
    let identity = session.identity();
    println!("user:   {} ({})", identity.display_name, identity.user_id);
    if let Some(email) = &identity.email {
        println!("email:  {email}");
    }
    println!("role:   {}", identity.role);
    println!("tenant: {} ({})", identity.tenant_name, identity.tenant_id);
    Ok(())
}

pub async fn register(app: &App, args: RegisterArgs) -> Result<()> {
    let member = app
        .store
        .register(&args.name, &args.email, &args.password, args.role, &args.org)
        .await
        .map_err(explain)?;
    println!("Registered {} <{}> as {}", member.name, args.email, member.role);
    println!("Run `meridian login` to start a session.");
    Ok(())
}

pub async fn password(app: &App, args: PasswordArgs) -> Result<()> {
    let session = app.session()?;
    app.members
        .change_password(&session, &args.current, &args.new_password)
        .await
        .map_err(explain)?;
    println!("Password changed");
    Ok(())
}
