mod app;
mod event;
mod theme;
mod ui;
mod view;

use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use event::UiEvent;
use futures_util::StreamExt;
use matriz_core::config::load_config;
use matriz_core::dispatch::{bridge, DispatchQueue};
use matriz_core::gateway::{Gateway, HttpGateway};
use matriz_core::mirror::MirrorReader;
use matriz_core::prober::{HealthProber, ProbeTick};
use matriz_core::schedule::Scheduler;
use matriz_core::sync::SyncDriver;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;
use view::ViewController;

const LOG_LEVEL_ENV: &str = "MATRIZ_LOG_LEVEL";
const LOG_FILE_ENV: &str = "MATRIZ_LOG_FILE";
const LOG_STDOUT_ENV: &str = "MATRIZ_LOG_STDOUT";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let config = load_config().context("invalid configuration")?;
    info!(
        middleware = %config.middleware_url,
        probe_secs = config.probe_interval.as_secs(),
        sync_secs = config.sync_interval.as_secs(),
        "matriz_dashboard_starting"
    );

    let gateway: Arc<dyn Gateway> = Arc::new(
        HttpGateway::new(config.middleware_url.clone())
            .context("failed to build the middleware http client")?,
    );
    let (bridge, mut queue) = bridge::<UiEvent>();
    let prober = HealthProber::new(gateway.clone(), config.timeouts);
    let driver = SyncDriver::new(gateway.clone(), config.timeouts.sync);
    let controller = ViewController::new(
        MirrorReader::new(gateway, config.timeouts.read),
        bridge.clone(),
    );

    let mut scheduler = Scheduler::new();
    let probe_bridge = bridge.clone();
    scheduler.every("probe", config.probe_interval, move || {
        if prober.tick(&probe_bridge) == ProbeTick::Skipped {
            probe_bridge.dispatch(UiEvent::ProbeSkipped);
        }
    });
    let sync_bridge = bridge;
    scheduler.every("sync", config.sync_interval, move || {
        driver.tick(&sync_bridge)
    });

    let mut terminal = setup_terminal()?;
    let mut app = app::App::new();
    let result = run_app(&mut terminal, &mut app, &mut queue, &controller).await;
    restore_terminal(&mut terminal)?;

    scheduler.shutdown().await;
    queue.close();
    info!("matriz_dashboard_stopped");

    if let Err(err) = result {
        eprintln!("matriz-dashboard: {err}");
    }

    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut app::App,
    queue: &mut DispatchQueue<UiEvent>,
    controller: &ViewController,
) -> Result<()> {
    let mut events = EventStream::new();

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            Some(update) = queue.recv() => {
                let mut requests = app.apply(update);
                for update in queue.drain() {
                    requests.extend(app.apply(update));
                }
                controller.issue_all(requests);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            controller.issue_all(app.handle_key(key));
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => break,
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// The terminal owns stdout, so logs go to `MATRIZ_LOG_FILE` or nowhere
/// unless `MATRIZ_LOG_STDOUT` is set.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    let stdout_enabled = matches!(
        std::env::var(LOG_STDOUT_ENV).ok().as_deref(),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
    );
    if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        return;
    }

    let log_file = std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    match log_file {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}
