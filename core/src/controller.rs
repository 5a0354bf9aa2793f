//! The search state machine.
//!
//! Every handler is a plain transition over the controller's fields. Nothing
//! here sleeps or talks to the network; the handlers return a [`Reaction`]
//! that tells the owner which timer to arm or which request to send.

use protocol::{ResultItem, ResultSet};

use crate::{cache::QueryCache, client::SearchError, settings::Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Empty query, no results.
    Idle,
    /// Waiting for the input to settle.
    PendingFetch,
    Fetching,
    Ready,
    /// The last fetch failed, shown as an empty result list.
    Failed,
}

/// One issued request. Only the newest ticket may deliver results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    id: u64,
    query: String,
}

impl FetchTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Arm the debounce timer for this query, replacing any armed one.
    Schedule(String),
    CancelSchedule,
    Fetch(FetchTicket),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[must_use]
pub struct Reaction {
    pub command: Option<Command>,
    /// The result set was swapped out, any highlight must be dropped.
    pub results_replaced: bool,
}

impl Reaction {
    fn nothing() -> Self {
        Self::default()
    }

    fn command(command: Command) -> Self {
        Self {
            command: Some(command),
            results_replaced: false,
        }
    }

    fn replaced(command: Option<Command>) -> Self {
        Self {
            command,
            results_replaced: true,
        }
    }
}

pub struct SearchController {
    query: String,
    phase: Phase,
    results: ResultSet,
    cache: QueryCache,
    in_flight: Option<FetchTicket>,
    next_ticket: u64,
    debounce_cache_hits: bool,
}

impl SearchController {
    pub fn new(settings: &Settings) -> Self {
        Self {
            query: String::new(),
            phase: Phase::Idle,
            results: ResultSet::default(),
            cache: QueryCache::new(),
            in_flight: None,
            next_ticket: 0,
            debounce_cache_hits: settings.debounce_cache_hits,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn in_flight(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref()
    }

    /// The text in the input changed.
    ///
    /// Whatever request is in flight loses its right to deliver. Blank input
    /// clears the results right away, anything else waits for the input to
    /// settle. The previous results stay up in the meantime.
    pub fn on_query_changed(&mut self, text: impl Into<String>) -> Reaction {
        self.query = text.into();
        if let Some(abandoned) = self.in_flight.take() {
            log::trace!("Abandoning request for '{}'", abandoned.query);
        }

        if self.query.trim().is_empty() {
            self.enter(Phase::Idle);
            self.results = ResultSet::empty(self.query.clone());
            return Reaction::replaced(Some(Command::CancelSchedule));
        }

        if !self.debounce_cache_hits {
            if let Some(hit) = self.cache.get(&self.query) {
                log::debug!("Cache hit, skipping the debounce: {}", self.query);
                self.enter(Phase::Ready);
                self.results = hit;
                return Reaction::replaced(Some(Command::CancelSchedule));
            }
        }

        self.enter(Phase::PendingFetch);
        Reaction::command(Command::Schedule(self.query.clone()))
    }

    /// The debounce timer armed for `query` expired.
    pub fn on_timer_fired(&mut self, query: &str) -> Reaction {
        if self.phase != Phase::PendingFetch || query != self.query {
            log::trace!("Ignoring timer for '{}'", query);
            return Reaction::nothing();
        }

        if let Some(hit) = self.cache.get(query) {
            log::debug!("Cache hit: {}", query);
            self.enter(Phase::Ready);
            self.results = hit;
            return Reaction::replaced(None);
        }

        let ticket = FetchTicket {
            id: self.next_ticket,
            query: query.to_string(),
        };
        self.next_ticket += 1;
        self.in_flight = Some(ticket.clone());
        self.enter(Phase::Fetching);
        Reaction::command(Command::Fetch(ticket))
    }

    /// A request finished. Stale answers are dropped without a trace in the
    /// state.
    pub fn on_fetch_completed(
        &mut self,
        ticket: &FetchTicket,
        outcome: Result<Vec<ResultItem>, SearchError>,
    ) -> Reaction {
        if !self.should_accept(ticket) {
            log::trace!(
                "Throwing away an out of date response for '{}' (#{})",
                ticket.query,
                ticket.id
            );
            return Reaction::nothing();
        }
        self.in_flight = None;

        match outcome {
            Ok(items) => {
                log::debug!("Got {} results for '{}'", items.len(), ticket.query);
                let results = ResultSet::new(ticket.query.clone(), items);
                self.cache.put(ticket.query.clone(), results.clone());
                self.results = results;
                self.enter(Phase::Ready);
            }
            Err(e) => {
                log::warn!("Search for '{}' failed: {}", ticket.query, e);
                self.results = ResultSet::empty(ticket.query.clone());
                self.enter(Phase::Failed);
            }
        }
        Reaction::replaced(None)
    }

    fn should_accept(&self, ticket: &FetchTicket) -> bool {
        // in_flight is cleared on every input change, so a match also means
        // the query is still the one that was sent
        self.in_flight.as_ref() == Some(ticket) && ticket.query == self.query
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            log::debug!("Search phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}
