//! One-shot commands answered by the coordinator over the bridge.

use std::io::BufRead;

use anyhow::{Context as _, bail};

use prompto_protocols::{BridgeRequest, ReplyPayload, TransformKind, UsageCounters, UserProfile};

use crate::context::Context;

/// `prompto enhance` / `prompto optimize`.
pub(crate) async fn transform(ctx: &Context, kind: TransformKind, text: String) -> anyhow::Result<()> {
    match ctx.call(BridgeRequest::transform(kind, text)).await? {
        ReplyPayload::Transformed { text } => {
            println!("{}", text);
            Ok(())
        }
        other => unexpected(other),
    }
}

/// `prompto login`.
pub(crate) async fn login(
    ctx: &Context,
    username: String,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    match ctx.call(BridgeRequest::SignIn { username, password }).await? {
        ReplyPayload::SignedIn { user } => {
            println!("Signed in as {}", user.username);
            Ok(())
        }
        other => unexpected(other),
    }
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// `prompto logout`.
pub(crate) async fn logout(ctx: &Context) -> anyhow::Result<()> {
    ctx.call(BridgeRequest::SignOut).await?;
    println!("Signed out");
    Ok(())
}

/// `prompto whoami`.
pub(crate) async fn whoami(ctx: &Context) -> anyhow::Result<()> {
    match ctx.call(BridgeRequest::GetUser).await? {
        ReplyPayload::User { profile } => {
            print_user(&profile);
            Ok(())
        }
        other => unexpected(other),
    }
}

fn print_user(user: &UserProfile) {
    println!("{}", user.username);
    if let Some(email) = &user.email {
        println!("  email: {}", email);
    }
    if let Some(plan) = &user.plan {
        println!("  plan:  {}", plan);
    }
}

/// `prompto stats`.
pub(crate) async fn stats(ctx: &Context) -> anyhow::Result<()> {
    match ctx.call(BridgeRequest::GetUsage).await? {
        ReplyPayload::Usage { counters } => {
            print_usage(&counters);
            Ok(())
        }
        other => unexpected(other),
    }
}

fn print_usage(usage: &UsageCounters) {
    println!("Enhancements:  {}", usage.enhancements);
    println!("Optimizations: {}", usage.optimizations);
    println!("Accepted:      {}", usage.accepted);
    println!("Chars saved:   {}", usage.chars_saved);
    println!("Time saved:    {}m {}s", usage.seconds_saved / 60, usage.seconds_saved % 60);
    match usage.last_used {
        Some(at) => println!("Last used:     {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Last used:     never"),
    }
}

fn unexpected(payload: ReplyPayload) -> anyhow::Result<()> {
    bail!("unexpected reply: {:?}", payload)
}
