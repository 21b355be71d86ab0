use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::app::{App, Effect, Message};
use crate::ports::Scanner;
use crate::signals;
use crate::ui;

type Backend = CrosstermBackend<Stdout>;

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Runs the dashboard until the user quits. The terminal is restored even when
/// the loop fails.
pub async fn run(app: App, scanner: Arc<dyn Scanner>, interval: Duration) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, app, scanner, interval).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn event_loop(
    terminal: &mut Terminal<Backend>,
    mut app: App,
    scanner: Arc<dyn Scanner>,
    interval: Duration,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_input_reader(tx.clone());

    let size = terminal.size()?;
    app.update(Message::Resize {
        width: size.width,
        height: size.height,
    });
    let mut effects = app.start();

    loop {
        for effect in effects.drain(..) {
            match effect {
                Effect::Quit => return Ok(()),
                Effect::Scan => spawn_scan(Arc::clone(&scanner), tx.clone()),
                Effect::ScheduleTick => schedule_tick(interval, tx.clone()),
                Effect::Kill { pid, force } => spawn_kill(pid, force, tx.clone()),
            }
        }

        terminal.draw(|frame| ui::render(frame, &app))?;

        let Some(message) = rx.recv().await else {
            return Ok(());
        };
        effects = app.update(message);
    }
}

fn spawn_scan(scanner: Arc<dyn Scanner>, tx: UnboundedSender<Message>) {
    tokio::spawn(async move {
        let started = Instant::now();
        let result = match tokio::task::spawn_blocking(move || scanner.scan()).await {
            Ok(result) => result,
            Err(err) => Err(anyhow!("scan task failed: {err}")),
        };
        if let Ok(records) = &result {
            log::debug!(
                "scan found {} ports in {:?}",
                records.len(),
                started.elapsed()
            );
        }
        let _ = tx.send(Message::ScanFinished(result));
    });
}

fn schedule_tick(interval: Duration, tx: UnboundedSender<Message>) {
    tokio::spawn(async move {
        tokio::time::sleep(interval).await;
        let _ = tx.send(Message::Tick);
    });
}

fn spawn_kill(pid: u32, force: bool, tx: UnboundedSender<Message>) {
    tokio::task::spawn_blocking(move || {
        let result = signals::terminate(pid, force);
        let _ = tx.send(Message::KillFinished { pid, force, result });
    });
}

/// crossterm's reader blocks, so input lives on its own thread and stops once
/// the loop drops the receiver.
fn spawn_input_reader(tx: UnboundedSender<Message>) {
    thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(INPUT_POLL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(err) => {
                    log::warn!("terminal poll failed: {err}");
                    break;
                }
            }
            let message = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Message::Key(key),
                Ok(Event::Resize(width, height)) => Message::Resize { width, height },
                Ok(_) => continue,
                Err(err) => {
                    log::warn!("terminal read failed: {err}");
                    break;
                }
            };
            if tx.send(message).is_err() {
                break;
            }
        }
    });
}
