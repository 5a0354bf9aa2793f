//! Terminal setup and the loop between crossterm and the session.

use std::{
    io::stdout,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::Context;
use ratatui::crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event,
    },
    execute,
};
use searchbar_core::{session::SessionClosed, Session};
use tokio::sync::mpsc;

use crate::{
    input::{self, Action, Input},
    ui,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the search box until the user quits. Returns the final query.
pub async fn run(session: &Session) -> anyhow::Result<String> {
    let mut terminal = ratatui::init();
    let res = match execute!(stdout(), EnableMouseCapture, EnableFocusChange) {
        Ok(()) => event_loop(&mut terminal, session).await,
        Err(e) => Err(e).context("enabling mouse and focus reporting"),
    };
    if let Err(e) = execute!(stdout(), DisableFocusChange, DisableMouseCapture) {
        log::warn!("Failed to disable mouse and focus reporting: {}", e);
    }
    ratatui::restore();
    res
}

async fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    session: &Session,
) -> anyhow::Result<String> {
    announce(session).await?;

    let (event_tx, mut event_rx) = mpsc::channel(32);
    let running = Arc::new(AtomicBool::new(true));
    let reader = spawn_reader(event_tx, Arc::clone(&running));

    let mut view_rx = session.view();
    let mut view = view_rx.borrow_and_update().clone();
    let mut input = Input::default();

    let res = loop {
        input.sync(&view);
        if let Err(e) = terminal.draw(|frame| ui::draw(frame, &mut input, &view)) {
            break Err(e).context("drawing the terminal");
        }

        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    break Err(anyhow::anyhow!("terminal event reader stopped"));
                };
                match input.handle(event, &view) {
                    Some(Action::Quit) => break Ok(input.text().to_string()),
                    Some(Action::Send(ev)) => {
                        log::trace!("To session: {:?}", ev);
                        if let Err(e) = session.send(ev).await {
                            break Err(e.into());
                        }
                    }
                    None => (),
                }
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break Err(anyhow::anyhow!("the session stopped publishing"));
                }
                view = view_rx.borrow_and_update().clone();
            }
        }
    };

    running.store(false, Ordering::Relaxed);
    drop(event_rx);
    join_reader(reader).await;
    res
}

/// The reader notices the stop flag within one poll interval, which is too
/// long to block a runtime thread for.
async fn join_reader(reader: thread::JoinHandle<anyhow::Result<()>>) {
    match tokio::task::spawn_blocking(move || reader.join()).await {
        Ok(Ok(Ok(()))) => (),
        Ok(Ok(Err(e))) => log::warn!("Terminal event reader failed: {:?}", e),
        Ok(Err(panic)) => std::panic::resume_unwind(panic),
        Err(e) => log::warn!("Could not wait for the terminal event reader: {}", e),
    }
}

/// Tells the session what it would otherwise only learn from the first
/// change the terminal reports.
async fn announce(session: &Session) -> Result<(), SessionClosed> {
    for event in input::startup_events() {
        log::trace!("To session: {:?}", event);
        session.send(event).await?;
    }
    Ok(())
}

/// crossterm reads block, so they get a thread of their own.
fn spawn_reader(
    tx: mpsc::Sender<Event>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<anyhow::Result<()>> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            if event::poll(POLL_INTERVAL)? {
                if tx.blocking_send(event::read()?).is_err() {
                    break;
                }
            }
        }
        Ok(())
    })
}
