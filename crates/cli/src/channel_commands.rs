use {anyhow::Result, clap::Subcommand, meridian_common::Message};

use crate::context::{App, explain, warn_degraded};

#[derive(Subcommand)]
pub enum ChannelAction {
    /// List channels of the current tenant.
    List,
    /// Create a channel (requires manage_channels).
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand)]
pub enum MessageAction {
    /// Show a channel's messages, oldest first.
    List {
        #[arg(long)]
        channel: String,
    },
    /// Post a message to a channel.
    Send {
        #[arg(long)]
        channel: String,
        #[arg(short, long)]
        message: String,
    },
}

pub async fn handle_channels(app: &App, action: ChannelAction) -> Result<()> {
    let session = app.session()?;
    match action {
        ChannelAction::List => {
            let resolved = app
                .resolver()
                .list_channels(&session)
                .await
                .map_err(explain)?;
            warn_degraded(resolved.degraded);
            if resolved.value.is_empty() {
                println!("No channels");
            }
            for channel in resolved.value {
                let unread = match channel.unread_count {
                    0 => String::new(),
                    n => format!("({n} unread)"),
                };
                println!("{:<24} #{:<20} {unread}", channel.id, channel.name);
            }
            println!("source: {}", resolved.source);
        },
        ChannelAction::Create { name, description } => {
            let created = app
                .resolver()
                .create_channel(&session, &name, &description)
                .await
                .map_err(explain)?;
            println!(
                "Created #{} ({}) via {}",
                created.value.name, created.value.id, created.source
            );
        },
    }
    Ok(())
}

pub async fn handle_messages(app: &App, action: MessageAction) -> Result<()> {
    let session = app.session()?;
    match action {
        MessageAction::List { channel } => {
            let resolved = app
                .gateway
                .open(&session, &channel)
                .await
                .map_err(explain)?;
            warn_degraded(resolved.degraded);
            if resolved.value.is_empty() {
                println!("No messages");
            }
            for message in &resolved.value {
                println!("{}", format_message(message));
            }
        },
        MessageAction::Send { channel, message } => {
            let sent = app
                .gateway
                .send(&session, &channel, &message)
                .await
                .map_err(explain)?;
            println!("{}", format_message(&sent));
            if session.is_demo() {
                println!("(demo tenant: message kept locally)");
            }
        },
    }
    Ok(())
}

fn format_message(message: &Message) -> String {
    format!(
        "[{}] {}: {}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        message.author_name,
        message.text
    )
}
