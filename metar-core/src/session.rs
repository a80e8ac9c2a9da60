use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    coordinator::{Completion, FetchTicket, Snapshot, ViewCoordinator},
    debounce::Debouncer,
    fetcher::{MetarFetcher, TafFetcher},
    model::ResourceKind,
};

/// User-driven events fed into a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search box contents changed.
    Input(String),
    ToggleView,
}

/// Handle to a running session loop.
///
/// Dropping the handle closes the command channel, which stops the loop.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("session loop has stopped"))
    }

    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Close the command channel and wait for the loop to finish.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        let _ = task.await;
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub debounce: Duration,
    /// Seeded as if the user had typed it.
    pub initial_airport: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            debounce: crate::debounce::DEFAULT_WINDOW,
            initial_airport: None,
        }
    }
}

/// Start the event loop wiring input, debouncer, coordinator and fetchers.
pub fn spawn(
    metar: Arc<MetarFetcher>,
    taf: Arc<TafFetcher>,
    options: SessionOptions,
) -> SessionHandle {
    let (commands_tx, commands_rx) = mpsc::channel(32);
    let (snapshots_tx, snapshots_rx) = watch::channel(Snapshot::default());

    let session = Session {
        coordinator: ViewCoordinator::new(),
        metar,
        taf,
        snapshots: snapshots_tx,
    };
    let task = tokio::spawn(session.run(commands_rx, options));

    SessionHandle {
        commands: commands_tx,
        snapshots: snapshots_rx,
        task,
    }
}

struct Session {
    coordinator: ViewCoordinator,
    metar: Arc<MetarFetcher>,
    taf: Arc<TafFetcher>,
    snapshots: watch::Sender<Snapshot>,
}

impl Session {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        options: SessionOptions,
    ) {
        let (debouncer, mut settled) = Debouncer::new(options.debounce);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

        if let Some(initial) = options.initial_airport {
            self.coordinator.input_changed(&initial);
            debouncer.push(initial);
            self.publish();
        }

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Input(raw)) => {
                        self.coordinator.input_changed(&raw);
                        debouncer.push(raw);
                        self.publish();
                    }
                    Some(Command::ToggleView) => {
                        if let Some(ticket) = self.coordinator.toggle_view() {
                            self.dispatch(ticket, &done_tx);
                        }
                        self.publish();
                    }
                    None => break,
                },
                Some(raw) = settled.recv() => {
                    for ticket in self.coordinator.settle(&raw) {
                        self.dispatch(ticket, &done_tx);
                    }
                    self.publish();
                }
                Some(completion) = done_rx.recv() => {
                    if self.coordinator.apply(completion) {
                        self.publish();
                    }
                }
            }
        }

        info!("session loop stopped");
    }

    fn dispatch(&self, ticket: FetchTicket, done: &mpsc::UnboundedSender<Completion>) {
        debug!(
            kind = %ticket.kind,
            code = %ticket.session.code,
            seq = ticket.session.seq,
            "starting fetch"
        );
        let done = done.clone();

        match ticket.kind {
            ResourceKind::Metar => {
                let fetcher = self.metar.clone();
                tokio::spawn(async move {
                    let state = fetcher.fetch(&ticket.session.code).await;
                    let _ = done.send(Completion::Metar(ticket.session, state));
                });
            }
            ResourceKind::Taf => {
                let fetcher = self.taf.clone();
                tokio::spawn(async move {
                    let state = fetcher.fetch(&ticket.session.code).await;
                    let _ = done.send(Completion::Taf(ticket.session, state));
                });
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.coordinator.snapshot());
    }
}
