use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use profile_views::{
    settled, ErrorPolicy, GithubClient, ImperativeView, ProfileSource, ReactiveView, SelectorView,
    Settings,
};

/// Mount the imperative and the reactive view side by side and click through names.
#[derive(Parser, Debug)]
#[command(name = "profile-views", version)]
struct Args {
    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API root to look profiles up from
    #[arg(long)]
    api_base: Option<String>,

    /// Artificial delay of the reactive view, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// What the reactive view does when a lookup fails
    #[arg(long, value_enum)]
    error_policy: Option<ErrorPolicy>,

    /// Names to click, in order (repeatable)
    #[arg(short, long = "select")]
    select: Vec<String>,

    /// How long to wait for each view to settle, in seconds
    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,

    /// Print HTML instead of plain text
    #[arg(long)]
    html: bool,
}

impl Args {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::default(),
        };
        if let Some(api_base) = &self.api_base {
            settings.api_base = api_base.clone();
        }
        if let Some(delay_ms) = self.delay_ms {
            settings.reactive_delay_ms = delay_ms;
        }
        if let Some(policy) = self.error_policy {
            settings.error_policy = policy;
        }
        settings.validate()?;
        Ok(settings)
    }
}

async fn show(views: &[(&str, &dyn SelectorView)], limit: Duration, html: bool) {
    for (label, view) in views {
        let tree = match settled(*view, limit).await {
            Some(tree) => tree,
            None => {
                tracing::warn!(view = label, "View did not settle in time");
                view.render()
            }
        };
        let body = if html { tree.to_html() } else { tree.to_string() };
        println!("[{label}]\n{body}\n");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("profile_views=info")),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let settings = args.settings()?;
    let limit = Duration::from_secs(args.timeout_secs);

    let source: Arc<dyn ProfileSource> = Arc::new(GithubClient::new(&settings)?);
    let imperative = ImperativeView::new(Arc::clone(&source), &settings);
    let reactive = ReactiveView::new(source, &settings);
    let views: [(&str, &dyn SelectorView); 2] =
        [("imperative", &imperative), ("reactive", &reactive)];

    for (_, view) in &views {
        view.mount();
    }
    show(&views, limit, args.html).await;

    for name in &args.select {
        tracing::info!(name = %name, "Clicking");
        for (_, view) in &views {
            view.select_name(name);
        }
        show(&views, limit, args.html).await;
    }

    for (_, view) in &views {
        view.unmount();
    }
    Ok(())
}
