//! # assist
//!
//! Terminal chat client. Resolves the Telegram identity, opens the per-user
//! notification socket, and runs the conversation on stdin/stdout.

#![deny(unsafe_code)]

mod commands;
mod render;
mod throttle;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use assist_connection::{ConnectionConfig, ConnectionEvent, ConnectionManager, WsConnector};
use assist_core::{FileIdentityStore, IdentityError, bootstrap_identity};
use assist_session::{ChatSession, ComposerStatus, IngestOutcome};
use assist_settings::AssistSettings;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::commands::Command;
use crate::throttle::ErrorThrottle;

const ERROR_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// assist chat client.
#[derive(Parser, Debug)]
#[command(name = "assist", about = "Terminal client for the assist chat backend")]
struct Cli {
    /// Raw Telegram launch parameters (url-encoded `user=...&auth_date=...&hash=...`).
    #[arg(long)]
    init_data: Option<String>,

    /// Identity cache file (defaults to `~/.assist/identity.json`).
    #[arg(long)]
    identity: Option<PathBuf>,

    /// Settings file (defaults to `~/.assist/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Connect here instead of the per-user endpoint from settings.
    #[arg(long)]
    endpoint: Option<String>,

    /// Log level (overrides settings; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,
}

fn load_settings(path: Option<&PathBuf>) -> Result<AssistSettings> {
    match path {
        Some(path) => assist_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(assist_settings::load_settings().unwrap_or_default()),
    }
}

/// The running client: one connection, one conversation.
struct App {
    manager: ConnectionManager,
    session: ChatSession,
    media_base: String,
    errors: ErrorThrottle,
}

impl App {
    /// Handle one input line. Returns `false` when the user quits.
    fn on_line(&mut self, line: &str) -> bool {
        match Command::parse(line) {
            Command::Empty => {}
            Command::Quit => return false,
            Command::Usage(usage) => println!("{usage}"),
            Command::Actions => match render::actions(&self.session.actions()) {
                Some(menu) => println!("{menu}"),
                None => println!("нет доступных действий"),
            },
            Command::Act(n) => {
                let actions = self.session.actions();
                match actions.get(n - 1) {
                    Some(action) => {
                        let result = self.session.activate(&self.manager, action);
                        self.report_send(result.map(|_| ()));
                    }
                    None => println!("нет действия {n}, см. /actions"),
                }
            }
            Command::Connect => {
                if let Err(e) = self.manager.connect() {
                    println!("не удалось подключиться: {e}");
                }
            }
            Command::Disconnect => self.manager.disconnect(),
            Command::Text(text) => self.send_text(text),
        }
        true
    }

    fn send_text(&mut self, text: String) {
        match self.session.composer_status(self.manager.state()) {
            ComposerStatus::Ready(_) => {
                self.session.set_input(text);
                let result = self.session.send_input(&self.manager);
                self.report_send(result.map(|_| ()));
            }
            status => println!("{}", status.placeholder()),
        }
    }

    fn report_send(&self, result: Result<(), assist_session::SendRejected>) {
        match result {
            Ok(()) => println!("{}", render::TYPING_INDICATOR),
            Err(e) => println!("не отправлено: {e}"),
        }
    }

    fn on_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::StateChanged(state) => {
                let status = self.session.composer_status(state);
                println!("[{state}] {}", status.placeholder());
            }
            ConnectionEvent::Frame(frame) => self.on_frame(&frame),
            ConnectionEvent::Error(e) => {
                if self.errors.allow(Instant::now()) {
                    eprintln!("ошибка соединения: {e}");
                }
            }
            ConnectionEvent::ReconnectScheduled { attempt, delay } => {
                println!("переподключение ({attempt}) через {} с", delay.as_secs_f32());
            }
            ConnectionEvent::ReconnectExhausted => {
                println!("{}. /connect, чтобы попробовать снова", ComposerStatus::Offline);
            }
        }
    }

    fn on_frame(&mut self, frame: &assist_core::Frame) {
        match self.session.ingest(frame) {
            IngestOutcome::Accepted => println!("{}", render::TYPING_INDICATOR),
            IngestOutcome::Answered => {
                if let Some(msg) = self.session.messages().last() {
                    println!("{}", render::message(msg, &self.media_base));
                }
                self.show_actions();
            }
            IngestOutcome::Replayed { count } => {
                debug!(count, "history replaced");
                for msg in self.session.messages() {
                    println!("{}", render::message(msg, &self.media_base));
                }
                self.show_actions();
            }
            outcome => debug!(?outcome, "frame not shown"),
        }
        if self.session.is_pending() {
            println!("{}", render::TYPING_INDICATOR);
        }
    }

    /// Events were dropped before we read them. Frames are replayed from the
    /// manager's latest one; fingerprint dedup makes this a no-op when it was
    /// already ingested.
    fn on_lagged(&mut self, skipped: u64) {
        warn!(skipped, "connection events dropped, replaying the latest frame");
        if let Some(frame) = self.manager.last_frame() {
            self.on_frame(&frame);
        }
    }

    fn show_actions(&self) {
        if let Some(menu) = render::actions(&self.session.actions()) {
            println!("{menu}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Settings first: the log level comes from them.
    let settings = load_settings(args.settings.as_ref())?;
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    if settings.logging.json {
        assist_logging::init_json_subscriber(&level);
    } else {
        assist_logging::init_subscriber(&level);
    }
    if assist_settings::init_settings(settings).is_err() {
        warn!("settings already initialized");
    }
    let settings = assist_settings::get_settings();

    // Identity: fresh launch data wins over the cached one.
    let store = FileIdentityStore::new(
        args.identity
            .clone()
            .unwrap_or_else(FileIdentityStore::default_path),
    );
    let identity = match bootstrap_identity(args.init_data.as_deref(), &store) {
        Ok(identity) => Some(identity),
        Err(IdentityError::NoInitData) => {
            println!("нет данных инициализации");
            None
        }
        Err(e) => return Err(e).context("Failed to read init data"),
    };
    if let Some(identity) = &identity {
        println!(
            "Здравствуйте, {}",
            identity.display_name(&settings.session.default_display_name)
        );
    }

    let endpoint = args.endpoint.clone().or_else(|| {
        identity
            .as_ref()
            .and_then(|i| i.endpoint(&settings.connection.endpoint_template))
    });

    let manager = ConnectionManager::new(
        ConnectionConfig::from(&settings.connection),
        Arc::new(WsConnector),
    );
    let mut events = manager.subscribe();
    let mut app = App {
        manager,
        session: ChatSession::new(settings.session.clone()),
        media_base: settings.media.base_url.clone(),
        errors: ErrorThrottle::new(ERROR_REPORT_INTERVAL),
    };

    match endpoint {
        Some(url) => {
            info!(%url, "starting");
            app.manager.configure(Some(url));
        }
        None => println!("{}", ComposerStatus::Offline),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if !app.on_line(&line) {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(event) => app.on_event(event),
                Err(RecvError::Lagged(skipped)) => app.on_lagged(skipped),
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
        }
    }

    app.manager.disconnect();
    Ok(())
}
