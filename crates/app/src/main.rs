use anyhow::Context;

use dentalcare_app::pages::{DashboardPage, LoginPage, Shell};
use dentalcare_app::{AppContext, Screen, ScreenState};
use dentalcare_infra::{RemoteConfig, RemoteServices};

const ENV_EMAIL: &str = "DENTALCARE_EMAIL";
const ENV_PASSWORD: &str = "DENTALCARE_PASSWORD";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dentalcare_observability::init();

    let config = RemoteConfig::from_env().context("loading remote service configuration")?;
    let services = RemoteServices::connect(&config).context("building remote service clients")?;
    let ctx = AppContext::new(services, &config);

    ctx.store.initialize();
    let initial = ctx.store.settled().await;
    tracing::info!(authenticated = initial.is_authenticated(), "session ready");

    if !initial.is_authenticated() {
        let (Ok(email), Ok(password)) = (std::env::var(ENV_EMAIL), std::env::var(ENV_PASSWORD)) else {
            anyhow::bail!("not signed in; set {ENV_EMAIL} and {ENV_PASSWORD}");
        };
        LoginPage::new(ctx.clone())
            .submit(&email, &password)
            .await
            .context("signing in")?;
    }

    let shell = Shell::new(ctx.clone());
    println!("{}", serde_json::to_string_pretty(&shell.user())?);
    println!("{}", serde_json::to_string_pretty(&shell.nav())?);

    match ctx.open(Screen::Dashboard) {
        Ok(mount) => {
            let dashboard = DashboardPage::new(ctx.clone(), mount);
            match dashboard.load().await {
                ScreenState::Ready(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                ScreenState::Failed(message) => tracing::warn!(%message, "dashboard failed to load"),
                ScreenState::Loading => {}
            }
        }
        Err(view) => println!("{}", serde_json::to_string_pretty(&view)?),
    }

    ctx.dispose();
    Ok(())
}
