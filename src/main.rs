use anyhow::Context;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use janmitr_client::accessors::{IssueAccessor, ProfileReader};
use janmitr_client::views::feed::{filter_counts, recent, HomeStats};
use janmitr_client::{CancelSource, ClientState, Config};

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_flag("JANMITR_LOG_JSON") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("loading configuration")?;
    let state = ClientState::live(&config).context("building backend client")?;

    if let Err(err) = state.session.restore().await {
        warn!(?err, "continuing without a stored session");
    }

    if state.session.user_id().is_none() {
        if let (Ok(email), Ok(password)) = (
            std::env::var("JANMITR_EMAIL"),
            std::env::var("JANMITR_PASSWORD"),
        ) {
            let user = state
                .session
                .sign_in(&email, &password)
                .await
                .context("signing in")?;
            info!(user_id = %user.id, "signed in");
        }
    }

    let source = CancelSource::new();
    let cancel = source.token();
    tokio::spawn(source.cancel_on(tokio::signal::ctrl_c()));

    let issues = IssueAccessor::new(state.clone());
    let profiles = ProfileReader::new(state.clone());

    let all = issues.list_issues(&cancel).await?;
    let profile = profiles.current_profile(&cancel).await?;
    let stats = HomeStats::compute(&all, profile.as_ref());

    let summary = json!({
        "signed_in_as": state.session.current_user().and_then(|u| u.email),
        "stats": stats,
        "filters": filter_counts(&all),
        "recent": recent(&all, 3),
        "level": profile.as_ref().map(|p| p.level()),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
