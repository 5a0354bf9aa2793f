//! The event loop of one search box.
//!
//! A single task owns every piece of state and handles one event at a time:
//! input from the rendering surface, timer expiries and finished requests.
//! Requests run as separate tasks and report back here, so their answers can
//! arrive in any order without anything needing a lock.

use std::{panic::AssertUnwindSafe, sync::Arc};

use anyhow::Context;
use futures_util::FutureExt;
use protocol::{ItemId, ResultItem, ResultSet};
use tokio::{
    select,
    sync::{mpsc, watch},
    task::{JoinError, JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    client::{SearchClient, SearchError},
    controller::{Command, FetchTicket, Phase, Reaction, SearchController},
    debounce::Debouncer,
    navigator::SelectionNavigator,
    settings::Settings,
    visibility::Visibility,
};

const CHANNEL_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Down,
    Up,
    Enter,
}

/// What the rendering surface reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    TextChanged(String),
    FocusGained,
    FocusLost,
    KeyPressed(Key),
    ItemClicked(ItemId),
}

/// Everything the rendering surface needs to draw the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub query: String,
    /// Bumped whenever the session itself rewrote the query, i.e. when an
    /// item was picked. The surface then replaces its text with `query`.
    pub query_epoch: u64,
    pub results: ResultSet,
    pub selected: Option<usize>,
    pub visible: bool,
    pub phase: Phase,
}

impl Default for View {
    fn default() -> Self {
        Self {
            query: String::new(),
            query_epoch: 0,
            results: ResultSet::default(),
            selected: None,
            visible: false,
            phase: Phase::Idle,
        }
    }
}

impl View {
    pub fn selected_item(&self) -> Option<&ResultItem> {
        self.selected.and_then(|i| self.results.get(i))
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Session exited, can't send")]
pub struct SessionClosed;

/// Handle to a running session task.
pub struct Session {
    events: mpsc::Sender<UiEvent>,
    view: watch::Receiver<View>,
    cancel: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Session {
    /// Starts the session on the current tokio runtime.
    pub fn spawn(client: Arc<dyn SearchClient>, settings: &Settings) -> Self {
        let (events, from_ui) = mpsc::channel(CHANNEL_SIZE);
        let (to_ui, view) = watch::channel(View::default());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(session_actor(
            client,
            settings.clone(),
            from_ui,
            to_ui,
            cancel.child_token(),
        ));
        Self {
            events,
            view,
            cancel,
            handle,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<UiEvent> {
        self.events.clone()
    }

    pub fn view(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    pub async fn send(&self, event: UiEvent) -> Result<(), SessionClosed> {
        self.events.send(event).await.map_err(|_| SessionClosed)
    }

    /// Stops the session and waits for it. Requests still running are
    /// aborted.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.cancel.cancel();
        self.handle.await.context("joining the session task")?
    }
}

/// Runs a session until `cancel` fires or every [`UiEvent`] sender is gone.
pub async fn session_actor(
    client: Arc<dyn SearchClient>,
    settings: Settings,
    from_ui: mpsc::Receiver<UiEvent>,
    to_ui: watch::Sender<View>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    log::info!(
        "Search session started against {} (quiet period {:?})",
        settings.endpoint,
        settings.quiet_period()
    );
    let actor = Actor::new(client, &settings, to_ui);
    actor.run(from_ui, cancel).await;
    log::info!("Search session ended");
    Ok(())
}

enum Wakeup {
    Evaluate(String),
    Hide,
}

type Completion = (FetchTicket, Result<Vec<ResultItem>, SearchError>);

struct Actor {
    client: Arc<dyn SearchClient>,
    controller: SearchController,
    navigator: SelectionNavigator,
    visibility: Visibility,
    debounce: Debouncer<Wakeup>,
    grace: Debouncer<Wakeup>,
    fetches: JoinSet<Completion>,
    query_epoch: u64,
    to_ui: watch::Sender<View>,
}

impl Actor {
    fn new(client: Arc<dyn SearchClient>, settings: &Settings, to_ui: watch::Sender<View>) -> Self {
        Self {
            client,
            controller: SearchController::new(settings),
            navigator: SelectionNavigator::new(),
            visibility: Visibility::new(),
            debounce: Debouncer::new(settings.quiet_period()),
            grace: Debouncer::new(settings.hide_grace()),
            fetches: JoinSet::new(),
            query_epoch: 0,
            to_ui,
        }
    }

    async fn run(mut self, mut from_ui: mpsc::Receiver<UiEvent>, cancel: CancellationToken) {
        loop {
            select! {
                _ = cancel.cancelled() => {
                    log::debug!("Session cancelled");
                    break;
                }
                event = from_ui.recv() => match event {
                    Some(event) => self.handle_ui(event),
                    None => {
                        log::info!("Rendering surface closed its end, exiting...");
                        break;
                    }
                },
                wakeup = self.debounce.fired() => self.handle_wakeup(wakeup),
                wakeup = self.grace.fired() => self.handle_wakeup(wakeup),
                Some(joined) = self.fetches.join_next() => self.handle_joined(joined),
            }
            self.publish();
        }

        if !self.fetches.is_empty() {
            log::debug!("Aborting {} running requests", self.fetches.len());
        }
        self.fetches.shutdown().await;
    }

    fn handle_ui(&mut self, event: UiEvent) {
        log::trace!("UI event: {:?}", event);
        match event {
            UiEvent::TextChanged(text) => {
                self.visibility.text_edited();
                self.navigator.reset();
                let reaction = self.controller.on_query_changed(text);
                self.apply(reaction);
            }
            UiEvent::FocusGained => {
                self.grace.cancel();
                self.visibility.focus_gained();
            }
            UiEvent::FocusLost => {
                self.visibility.focus_lost();
                self.grace.schedule((), |()| Wakeup::Hide);
            }
            UiEvent::KeyPressed(Key::Down) => {
                self.navigator.move_down(self.controller.results().len());
                log::trace!("Highlight moved down to {}", self.navigator.as_signed());
            }
            UiEvent::KeyPressed(Key::Up) => {
                self.navigator.move_up();
                log::trace!("Highlight moved up to {}", self.navigator.as_signed());
            }
            UiEvent::KeyPressed(Key::Enter) => self.confirm(),
            UiEvent::ItemClicked(id) => {
                if self.navigator.select_id(self.controller.results(), &id) {
                    self.confirm();
                } else {
                    log::warn!("Clicked item {} is not among the results", id);
                }
            }
        }
    }

    fn handle_wakeup(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::Evaluate(query) => {
                let reaction = self.controller.on_timer_fired(&query);
                self.apply(reaction);
            }
            Wakeup::Hide => self.visibility.hide(),
        }
    }

    fn handle_joined(&mut self, joined: Result<Completion, JoinError>) {
        match joined {
            Ok((ticket, outcome)) => {
                let reaction = self.controller.on_fetch_completed(&ticket, outcome);
                self.apply(reaction);
            }
            Err(e) => log::error!("Search task failed to join: {}", e),
        }
    }

    /// Picks the highlighted item: it becomes the new query and the list
    /// goes away.
    fn confirm(&mut self) {
        let Some(item) = self.navigator.confirm(self.controller.results()) else {
            return;
        };
        let name = item.name.clone();
        log::info!("Selected '{}' ({})", name, item.id);

        self.visibility.selection_made();
        self.navigator.reset();
        self.query_epoch += 1;
        let reaction = self.controller.on_query_changed(name);
        self.apply(reaction);
    }

    fn apply(&mut self, reaction: Reaction) {
        if reaction.results_replaced {
            self.navigator.reset();
        }

        match reaction.command {
            None => (),
            Some(Command::Schedule(query)) => self.debounce.schedule(query, Wakeup::Evaluate),
            Some(Command::CancelSchedule) => {
                self.debounce.cancel();
            }
            Some(Command::Fetch(ticket)) => self.spawn_fetch(ticket),
        }
    }

    fn spawn_fetch(&mut self, ticket: FetchTicket) {
        log::debug!("Fetching '{}' (#{})", ticket.query(), ticket.id());
        let client = Arc::clone(&self.client);
        self.fetches.spawn(async move {
            let outcome = AssertUnwindSafe(client.search(ticket.query()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(SearchError::Network("search task panicked".to_string())));
            (ticket, outcome)
        });
    }

    fn publish(&mut self) {
        self.navigator.clamp(self.controller.results().len());
        let results = self.controller.results();
        let view = View {
            query: self.controller.query().to_string(),
            query_epoch: self.query_epoch,
            results: results.clone(),
            selected: self.navigator.selected(),
            visible: self.visibility.is_visible(results),
            phase: self.controller.phase(),
        };

        self.to_ui.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        sync::Mutex,
        time::Duration,
    };
    use tokio::time::{sleep, Instant};

    /// Answers from a fixed table after a per-query delay and records every
    /// call.
    #[derive(Default)]
    struct FakeClient {
        answers: HashMap<String, (Duration, Result<Vec<ResultItem>, u16>)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn answer(mut self, query: &str, delay_ms: u64, items: Vec<ResultItem>) -> Self {
            self.answers.insert(
                query.to_string(),
                (Duration::from_millis(delay_ms), Ok(items)),
            );
            self
        }

        fn fail(mut self, query: &str, delay_ms: u64, status: u16) -> Self {
            self.answers.insert(
                query.to_string(),
                (Duration::from_millis(delay_ms), Err(status)),
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchClient for FakeClient {
        async fn search(&self, query: &str) -> Result<Vec<ResultItem>, SearchError> {
            self.calls.lock().unwrap().push(query.to_string());
            let (delay, answer) = self
                .answers
                .get(query)
                .cloned()
                .unwrap_or((Duration::ZERO, Ok(Vec::new())));
            sleep(delay).await;
            answer.map_err(SearchError::Status)
        }
    }

    fn pizzas() -> Vec<ResultItem> {
        vec![
            ResultItem::new(1u64, "Pizza"),
            ResultItem::new(2u64, "Pizza Margherita"),
        ]
    }

    fn start(client: FakeClient) -> (Session, Arc<FakeClient>) {
        let client = Arc::new(client);
        let session = Session::spawn(client.clone(), &Settings::default());
        (session, client)
    }

    async fn wait_for(session: &Session, what: impl FnMut(&View) -> bool) -> View {
        let mut view = session.view();
        let seen = view.wait_for(what).await.expect("session is gone");
        seen.clone()
    }

    async fn type_text(session: &Session, text: &str) {
        session
            .send(UiEvent::TextChanged(text.to_string()))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_keystrokes_fetches_once() {
        let (session, client) = start(FakeClient::default().answer("pizz", 0, pizzas()));
        session.send(UiEvent::FocusGained).await.unwrap();

        let start = Instant::now();
        for text in ["p", "pi", "piz", "pizz"] {
            type_text(&session, text).await;
            sleep(Duration::from_millis(100)).await;
        }
        assert!(client.calls().is_empty());

        let view = wait_for(&session, |v| v.phase == Phase::Ready).await;
        assert!(start.elapsed() >= Duration::from_millis(600));
        assert_eq!(client.calls(), vec!["pizz"]);
        assert_eq!(view.results.len(), 2);
        assert!(view.visible);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(client.calls(), vec!["pizz"]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_query_is_served_from_cache() {
        let (session, client) = start(
            FakeClient::default()
                .answer("piz", 0, pizzas())
                .answer("pizza", 0, vec![ResultItem::new(1u64, "Pizza")]),
        );

        type_text(&session, "piz").await;
        let first = wait_for(&session, |v| v.phase == Phase::Ready && v.query == "piz").await;

        type_text(&session, "pizza").await;
        wait_for(&session, |v| v.phase == Phase::Ready && v.query == "pizza").await;

        let retyped = Instant::now();
        type_text(&session, "piz").await;
        let again = wait_for(&session, |v| v.phase == Phase::Ready && v.query == "piz").await;
        assert!(retyped.elapsed() >= Duration::from_millis(300));

        assert_eq!(client.calls(), vec!["piz", "pizza"]);
        assert!(ResultSet::ptr_eq(&first.results, &again.results));
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_for_old_query_is_ignored() {
        let (session, client) = start(
            FakeClient::default()
                .answer("ab", 1000, vec![ResultItem::new(1u64, "Abba")])
                .answer("abc", 10, vec![ResultItem::new(2u64, "Abcde")]),
        );

        type_text(&session, "ab").await;
        wait_for(&session, |v| v.phase == Phase::Fetching).await;
        type_text(&session, "abc").await;

        let view = wait_for(&session, |v| v.phase == Phase::Ready).await;
        assert_eq!(view.results.query(), "abc");

        // the "ab" answer lands at ~1300ms
        sleep(Duration::from_secs(3)).await;
        let view = session.view().borrow().clone();
        assert_eq!(view.query, "abc");
        assert_eq!(view.results.query(), "abc");
        assert_eq!(view.results.get(0).unwrap().name, "Abcde");
        assert_eq!(client.calls(), vec!["ab", "abc"]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_clears_without_fetching() {
        let (session, client) = start(FakeClient::default().answer("piz", 0, pizzas()));

        type_text(&session, "piz").await;
        wait_for(&session, |v| v.phase == Phase::Ready).await;

        for blank in ["", "   "] {
            type_text(&session, blank).await;
            let view = wait_for(&session, |v| v.phase == Phase::Idle && v.query == blank).await;
            assert!(view.results.is_empty());
            assert_eq!(view.selected, None);
        }

        sleep(Duration::from_secs(2)).await;
        assert_eq!(client.calls(), vec!["piz"]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shows_no_results() {
        let (session, client) = start(FakeClient::default().fail("piz", 0, 500));
        session.send(UiEvent::FocusGained).await.unwrap();

        type_text(&session, "piz").await;
        let view = wait_for(&session, |v| v.phase == Phase::Failed).await;
        assert!(view.results.is_empty());
        assert!(!view.visible);

        // failures are not cached, typing the query again retries
        type_text(&session, "pi").await;
        type_text(&session, "piz").await;
        wait_for(&session, |v| v.phase == Phase::Fetching).await;
        wait_for(&session, |v| v.phase == Phase::Failed).await;
        assert_eq!(client.calls(), vec!["piz", "piz"]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pick_with_keyboard() {
        let (session, client) = start(
            FakeClient::default()
                .answer("piz", 0, pizzas())
                .answer("Pizza Margherita", 0, vec![ResultItem::new(2u64, "Pizza Margherita")]),
        );
        session.send(UiEvent::FocusGained).await.unwrap();

        type_text(&session, "piz").await;
        let view = wait_for(&session, |v| v.phase == Phase::Ready).await;
        assert_eq!(view.results.len(), 2);
        assert_eq!(view.selected, None);
        assert!(view.visible);

        session.send(UiEvent::KeyPressed(Key::Down)).await.unwrap();
        session.send(UiEvent::KeyPressed(Key::Down)).await.unwrap();
        let view = wait_for(&session, |v| v.selected == Some(1)).await;
        assert_eq!(view.selected_item().unwrap().name, "Pizza Margherita");

        session.send(UiEvent::KeyPressed(Key::Enter)).await.unwrap();
        let view = wait_for(&session, |v| v.query_epoch == 1).await;
        assert_eq!(view.query, "Pizza Margherita");
        assert!(!view.visible);
        assert_eq!(view.selected, None);
        assert_eq!(view.phase, Phase::PendingFetch);

        let view = wait_for(&session, |v| v.phase == Phase::Ready).await;
        assert_eq!(view.results.query(), "Pizza Margherita");
        assert!(!view.visible);
        assert_eq!(client.calls(), vec!["piz", "Pizza Margherita"]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_without_selection_does_nothing() {
        let (session, _client) = start(FakeClient::default().answer("piz", 0, pizzas()));
        session.send(UiEvent::FocusGained).await.unwrap();
        type_text(&session, "piz").await;
        wait_for(&session, |v| v.phase == Phase::Ready).await;

        session.send(UiEvent::KeyPressed(Key::Up)).await.unwrap();
        session.send(UiEvent::KeyPressed(Key::Enter)).await.unwrap();
        sleep(Duration::from_secs(1)).await;

        let view = session.view().borrow().clone();
        assert_eq!(view.query, "piz");
        assert_eq!(view.query_epoch, 0);
        assert_eq!(view.selected, None);
        assert!(view.visible);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_results_drop_selection() {
        let (session, _client) = start(
            FakeClient::default()
                .answer("piz", 0, pizzas())
                .answer("pizza", 50, vec![ResultItem::new(1u64, "Pizza")]),
        );
        type_text(&session, "piz").await;
        wait_for(&session, |v| v.phase == Phase::Ready).await;
        session.send(UiEvent::KeyPressed(Key::Down)).await.unwrap();
        wait_for(&session, |v| v.selected == Some(0)).await;

        type_text(&session, "pizza").await;
        let view = wait_for(&session, |v| v.query == "pizza").await;
        assert_eq!(view.selected, None);

        session.send(UiEvent::KeyPressed(Key::Down)).await.unwrap();
        wait_for(&session, |v| v.selected == Some(0)).await;
        let view = wait_for(&session, |v| v.phase == Phase::Ready).await;
        assert_eq!(view.selected, None);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_survives_focus_loss() {
        let (session, _client) = start(FakeClient::default().answer("piz", 0, pizzas()));
        session.send(UiEvent::FocusGained).await.unwrap();
        type_text(&session, "piz").await;
        wait_for(&session, |v| v.phase == Phase::Ready).await;

        session.send(UiEvent::FocusLost).await.unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(session.view().borrow().visible);

        session
            .send(UiEvent::ItemClicked(ItemId::Number(1)))
            .await
            .unwrap();
        let view = wait_for(&session, |v| v.query_epoch == 1).await;
        assert_eq!(view.query, "Pizza");
        assert!(!view.visible);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_loss_hides_after_grace() {
        let (session, _client) = start(FakeClient::default().answer("piz", 0, pizzas()));
        session.send(UiEvent::FocusGained).await.unwrap();
        type_text(&session, "piz").await;
        wait_for(&session, |v| v.visible).await;

        let lost = Instant::now();
        session.send(UiEvent::FocusLost).await.unwrap();
        wait_for(&session, |v| !v.visible).await;
        assert!(lost.elapsed() >= Duration::from_millis(200));

        session.send(UiEvent::FocusGained).await.unwrap();
        wait_for(&session, |v| v.visible).await;
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refocus_cancels_pending_hide() {
        let (session, _client) = start(FakeClient::default().answer("piz", 0, pizzas()));
        session.send(UiEvent::FocusGained).await.unwrap();
        type_text(&session, "piz").await;
        wait_for(&session, |v| v.visible).await;

        session.send(UiEvent::FocusLost).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        session.send(UiEvent::FocusGained).await.unwrap();
        sleep(Duration::from_secs(1)).await;
        assert!(session.view().borrow().visible);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ends_when_surface_hangs_up() {
        let client: Arc<dyn SearchClient> = Arc::new(FakeClient::default());
        let (events, from_ui) = mpsc::channel(8);
        let (to_ui, _view) = watch::channel(View::default());
        let actor = tokio::spawn(session_actor(
            client,
            Settings::default(),
            from_ui,
            to_ui,
            CancellationToken::new(),
        ));

        events.send(UiEvent::FocusGained).await.unwrap();
        drop(events);
        actor.await.unwrap().unwrap();
    }
}
