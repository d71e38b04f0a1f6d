//! LinkVault demo mode.
//!
//! Runs one scripted session against the bundled SQLite backend: optimistic
//! creates, a change arriving from a second session, a collection delete
//! cascade, and a write that loses to a concurrent delete.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use linkvault::app::App;
use linkvault::database::Database;
use linkvault::managers::bookmark_manager::BookmarkManagerTrait;
use linkvault::services::local_backend::LocalBackend;
use linkvault::services::notifier::ChannelNotifier;
use linkvault::services::remote_service::RemoteDataService;
use linkvault::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use linkvault::types::notification::Notification;
use linkvault::types::session::Session;
use linkvault::types::settings::{LogFormat, LoggingSettings};

/// How long the demo waits for feed echoes to land.
const FEED_SETTLE: Duration = Duration::from_millis(50);

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_env("LINKVAULT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_ansi(false)).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn print_toasts(toasts: &mut UnboundedReceiver<Notification>) {
    while let Ok(toast) = toasts.try_recv() {
        println!("  [toast] {}", toast.message);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = SettingsEngine::new(env::var("LINKVAULT_CONFIG").ok());
    let settings = engine.load()?;
    init_tracing(&settings.logging);

    let db = match &settings.backend.database_path {
        Some(path) => Database::open(path)?,
        None => Database::open_in_memory()?,
    };
    let backend = Arc::new(LocalBackend::new(db).with_channel_capacity(settings.feed.channel_capacity));

    let session = Session::new(settings.backend.demo_user.clone());
    let other_tab = backend.client(&session);
    let (notifier, mut toasts) = ChannelNotifier::new();
    let app = App::new(
        settings,
        session.clone(),
        Arc::new(backend.client(&session)),
        backend.clone(),
        Arc::new(notifier),
    );

    println!();
    println!("LinkVault v{} demo (user: {})", env!("CARGO_PKG_VERSION"), session.user_id);
    println!();

    app.start().await?;

    section("Optimistic create");
    let outcome = app.bookmarks.add_bookmark("example.com", "", None).await;
    tokio::time::sleep(FEED_SETTLE).await;
    let snapshot = app.snapshot();
    println!("  outcome: {:?}", outcome);
    for b in &snapshot.bookmarks {
        println!("  {} | {} | {}", b.id, b.title, b.url);
    }

    section("Change from another session");
    other_tab
        .create_bookmark("https://www.rust-lang.org/learn", "Learn Rust", None)
        .await?;
    tokio::time::sleep(FEED_SETTLE).await;
    println!("  bookmarks visible: {}", app.snapshot().bookmarks.len());

    section("Collection delete cascade");
    app.bookmarks.create_collection("Reading").await;
    let reading = app
        .snapshot()
        .collections
        .iter()
        .find(|c| c.name == "Reading")
        .map(|c| c.id.clone());
    if let Some(cid) = reading {
        let ids: Vec<String> = app.snapshot().bookmarks.iter().map(|b| b.id.clone()).collect();
        for id in &ids {
            app.bookmarks.set_collection(id, Some(cid.as_str())).await;
        }
        println!("  in collection: {}", app.snapshot().bookmarks_in(&cid).len());
        other_tab.delete_collection(&cid).await?;
        tokio::time::sleep(FEED_SETTLE).await;
        println!("  uncategorized after delete: {}", app.snapshot().uncategorized().len());
    }

    section("Edit racing a delete");
    if let Some(target) = app.snapshot().bookmarks.first().map(|b| b.id.clone()) {
        other_tab.delete_bookmark(&target).await?;
        let outcome = app.bookmarks.edit_bookmark(&target, "example.org", "Renamed").await;
        tokio::time::sleep(FEED_SETTLE).await;
        println!("  outcome: {:?}", outcome);
        println!("  still visible: {}", app.snapshot().bookmark(&target).is_some());
    }
    print_toasts(&mut toasts);

    section("Final state");
    println!("{}", serde_json::to_string_pretty(&*app.snapshot())?);
    println!("  stats: {:?}", app.snapshot().stats());

    app.shutdown().await;
    println!();
    Ok(())
}
