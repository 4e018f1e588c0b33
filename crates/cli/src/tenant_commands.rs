use {
    anyhow::Result,
    clap::Subcommand,
    meridian_common::Role,
};

use crate::context::{App, explain};

#[derive(Subcommand)]
pub enum TenantAction {
    /// List tenants available to sign in to.
    List,
    /// Create a tenant (requires manage_tenant).
    Create {
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum MemberAction {
    /// List members of the current tenant.
    List,
    /// Change a member's role (requires manage_users).
    SetRole {
        #[arg(long)]
        user: String,
        #[arg(long)]
        role: Role,
    },
}

pub async fn handle_tenants(app: &App, action: TenantAction) -> Result<()> {
    match action {
        TenantAction::List => {
            let session = app.store.restore();
            for tenant in app.tenants.list(session.as_ref()).await {
                let kind = if tenant.is_live { "live" } else { "demo" };
                println!("{:<20} {:<24} {kind}", tenant.id, tenant.display_name);
            }
            Ok(())
        },
        TenantAction::Create { name } => {
            let session = app.session()?;
            let tenant = app
                .tenants
                .create(&session, &name)
                .await
                .map_err(explain)?;
            println!("Created tenant {} ({})", tenant.display_name, tenant.id);
            Ok(())
        },
    }
}

pub async fn handle_members(app: &App, action: MemberAction) -> Result<()> {
    let session = app.session()?;
    match action {
        MemberAction::List => {
            let members = app.members.list(&session).await.map_err(explain)?;
            for member in members {
                println!(
                    "{:<16} {:<24} {:<10} {}",
                    member.id,
                    member.name,
                    member.role,
                    member.email.as_deref().unwrap_or("-")
                );
            }
        },
        MemberAction::SetRole { user, role } => {
            app.members
                .set_role(&session, &user, role)
                .await
                .map_err(explain)?;
            println!("{user} is now {role}");
        },
    }
    Ok(())
}

