use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::trace;

/// Default quiescence window for airport-code input.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

/// Delays a changing value until it has been stable for a full window.
///
/// Values are pushed with [`Debouncer::push`]; settled values arrive on the
/// receiver returned by [`Debouncer::new`]. A settled value equal to the last
/// emitted one is not emitted again. Dropping the debouncer aborts its timer.
#[derive(Debug)]
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + std::fmt::Debug + 'static,
{
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input, input_rx) = mpsc::unbounded_channel();
        let (output, output_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(window, input_rx, output));
        (Self { input, task }, output_rx)
    }

    pub fn push(&self, value: T) {
        // Only fails once the task is gone, which means we are tearing down.
        let _ = self.input.send(value);
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T>(
    window: Duration,
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
) where
    T: Clone + PartialEq + std::fmt::Debug,
{
    let timer = time::sleep(window);
    tokio::pin!(timer);

    let mut pending: Option<T> = None;
    let mut last_emitted: Option<T> = None;

    loop {
        tokio::select! {
            incoming = input.recv() => match incoming {
                Some(value) => {
                    if pending.as_ref() != Some(&value) {
                        timer.as_mut().reset(Instant::now() + window);
                        pending = Some(value);
                    }
                }
                None => break,
            },
            _ = &mut timer, if pending.is_some() => {
                let Some(value) = pending.take() else {
                    continue;
                };
                if last_emitted.as_ref() == Some(&value) {
                    continue;
                }
                trace!(?value, "debounced value settled");
                if output.send(value.clone()).is_err() {
                    break;
                }
                last_emitted = Some(value);
            }
        }
    }
}
