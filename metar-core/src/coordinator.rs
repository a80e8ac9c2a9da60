//! View state for one search box: current airport, METAR/TAF toggle and the
//! fetch state of both resources.
//!
//! The coordinator never performs I/O. It hands out [`FetchTicket`]s when a
//! fetch should start and accepts [`Completion`]s when one finishes; a
//! completion whose session is no longer the latest for its kind is dropped.

use tracing::debug;

use crate::{
    category::{FlightCategory, category_for},
    model::{AirportCode, FetchState, ResourceKind},
    report::{ForecastRecord, MetarRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Metar,
    Taf,
}

impl ViewMode {
    pub fn resource(&self) -> ResourceKind {
        match self {
            ViewMode::Metar => ResourceKind::Metar,
            ViewMode::Taf => ResourceKind::Taf,
        }
    }

    fn toggled(self) -> Self {
        match self {
            ViewMode::Metar => ViewMode::Taf,
            ViewMode::Taf => ViewMode::Metar,
        }
    }
}

/// Identifies one fetch attempt; the sequence number breaks ties when the
/// same code is entered again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    pub code: AirportCode,
    pub seq: u64,
}

/// Instruction to start fetching `kind` for `session.code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub kind: ResourceKind,
    pub session: SessionId,
}

/// Result of a finished fetch, tagged with the session it was started for.
#[derive(Debug, Clone)]
pub enum Completion {
    Metar(SessionId, FetchState<MetarRecord>),
    Taf(SessionId, FetchState<ForecastRecord>),
}

/// Lifecycle of the active resource, for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
struct Slot<R> {
    latest: Option<SessionId>,
    state: Option<FetchState<R>>,
}

impl<R> Default for Slot<R> {
    fn default() -> Self {
        Self {
            latest: None,
            state: None,
        }
    }
}

impl<R> Slot<R> {
    fn start(&mut self, session: SessionId) {
        self.latest = Some(session);
        self.state = Some(FetchState::Loading);
    }

    fn reset(&mut self) {
        self.latest = None;
        self.state = None;
    }

    fn needs_fetch(&self) -> bool {
        match &self.state {
            None => true,
            Some(state) => state.is_failed(),
        }
    }

    fn complete(&mut self, session: SessionId, state: FetchState<R>) -> bool {
        if self.latest.as_ref() != Some(&session) {
            return false;
        }
        self.state = Some(state);
        true
    }
}

/// Read-only copy of the coordinator state handed to renderers.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub input: String,
    pub code: Option<AirportCode>,
    pub mode: ViewMode,
    pub metar: Option<FetchState<MetarRecord>>,
    pub taf: Option<FetchState<ForecastRecord>>,
    pub category: FlightCategory,
    pub phase: Phase,
}

#[derive(Debug, Default)]
pub struct ViewCoordinator {
    input: String,
    code: Option<AirportCode>,
    mode: ViewMode,
    metar: Slot<MetarRecord>,
    taf: Slot<ForecastRecord>,
    next_seq: u64,
}

impl ViewCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw keystroke-level input; only recorded.
    pub fn input_changed(&mut self, raw: &str) {
        self.input = raw.to_string();
    }

    /// Debounced input settled. Returns the fetches to start.
    pub fn settle(&mut self, raw: &str) -> Vec<FetchTicket> {
        self.input = raw.to_string();

        let code = match AirportCode::parse(raw) {
            Ok(code) => code,
            Err(err) => {
                debug!(input = raw, reason = %err, "settled input is not fetchable");
                return Vec::new();
            }
        };

        let session = self.next_session(code.clone());
        self.code = Some(code);

        let mut tickets = vec![FetchTicket {
            kind: ResourceKind::Metar,
            session: session.clone(),
        }];
        self.metar.start(session.clone());

        match self.mode {
            ViewMode::Taf => {
                self.taf.start(session.clone());
                tickets.push(FetchTicket {
                    kind: ResourceKind::Taf,
                    session,
                });
            }
            ViewMode::Metar => self.taf.reset(),
        }

        tickets
    }

    /// Flip between METAR and TAF. Returns a fetch to start if the newly
    /// active resource has nothing usable for the current code.
    pub fn toggle_view(&mut self) -> Option<FetchTicket> {
        self.mode = self.mode.toggled();
        let code = self.code.clone()?;

        let kind = self.mode.resource();
        let needs_fetch = match kind {
            ResourceKind::Metar => self.metar.needs_fetch(),
            ResourceKind::Taf => self.taf.needs_fetch(),
        };
        if !needs_fetch {
            return None;
        }

        let session = self.next_session(code);
        match kind {
            ResourceKind::Metar => self.metar.start(session.clone()),
            ResourceKind::Taf => self.taf.start(session.clone()),
        }
        Some(FetchTicket { kind, session })
    }

    /// Apply a finished fetch. Returns `false` when it was superseded.
    pub fn apply(&mut self, completion: Completion) -> bool {
        let (kind, applied) = match completion {
            Completion::Metar(session, state) => {
                (ResourceKind::Metar, self.metar.complete(session, state))
            }
            Completion::Taf(session, state) => {
                (ResourceKind::Taf, self.taf.complete(session, state))
            }
        };
        if !applied {
            debug!(%kind, "discarding stale completion");
        }
        applied
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn code(&self) -> Option<&AirportCode> {
        self.code.as_ref()
    }

    pub fn metar(&self) -> Option<&FetchState<MetarRecord>> {
        self.metar.state.as_ref()
    }

    pub fn taf(&self) -> Option<&FetchState<ForecastRecord>> {
        self.taf.state.as_ref()
    }

    /// Category for whichever view is active; always METAR-derived.
    pub fn flight_category(&self) -> FlightCategory {
        match &self.code {
            Some(code) => category_for(code.as_str(), self.metar()),
            None => FlightCategory::Unknown,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.mode {
            ViewMode::Metar => phase_of(self.metar()),
            ViewMode::Taf => phase_of(self.taf()),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            input: self.input.clone(),
            code: self.code.clone(),
            mode: self.mode,
            metar: self.metar.state.clone(),
            taf: self.taf.state.clone(),
            category: self.flight_category(),
            phase: self.phase(),
        }
    }

    fn next_session(&mut self, code: AirportCode) -> SessionId {
        self.next_seq += 1;
        SessionId {
            code,
            seq: self.next_seq,
        }
    }
}

fn phase_of<R>(state: Option<&FetchState<R>>) -> Phase {
    match state {
        None => Phase::Idle,
        Some(FetchState::Loading) => Phase::Loading,
        Some(FetchState::Ready(_)) => Phase::Ready,
        Some(FetchState::Failed { .. }) => Phase::Failed,
    }
}
