// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::Result;
use crate::upload::DispositionBackend;
use crate::watch::settle::SettleTicket;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the settle tracker in response to `RuntimeEvent`s, and delegates
/// the actual upload of settled files to a `DispositionBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from the
/// channel, running settle-check timers and dispatching settled files.
pub struct Runtime<D: DispositionBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    // Weak so that timers alone never keep the channel open.
    timer_tx: mpsc::WeakSender<RuntimeEvent>,
    backend: D,
    // Only the timer carrying the live ticket for a path is kept.
    timers: HashMap<PathBuf, (SettleTicket, JoinHandle<()>)>,
}

impl<D: DispositionBackend> fmt::Debug for Runtime<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

impl<D: DispositionBackend> Runtime<D> {
    /// `event_tx` must be the sender paired with `event_rx`; settle-check
    /// timers feed their events back through it.
    pub fn new(
        core: CoreRuntime,
        event_tx: &mpsc::Sender<RuntimeEvent>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: D,
    ) -> Self {
        Self {
            core,
            event_rx,
            timer_tx: event_tx.downgrade(),
            backend,
            timers: HashMap::new(),
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (timers, dispositions).
    ///
    /// Uploads already handed to the backend are not waited for.
    pub async fn run(mut self) -> Result<()> {
        info!("peertube-monitor runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            if !self.handle_event(event).await? {
                info!("shutdown requested; stopping runtime");
                break;
            }
        }

        for (_, (_, handle)) in self.timers.drain() {
            handle.abort();
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Feed one event through the core and execute the resulting commands.
    /// Returns whether the loop should keep running.
    async fn handle_event(&mut self, event: RuntimeEvent) -> Result<bool> {
        debug!(?event, "runtime received event");

        // The timer that produced this event has finished. Forget its handle,
        // but not one that has replaced it since.
        if let RuntimeEvent::SettleCheckDue { path, ticket } = &event {
            if self.timers.get(path).is_some_and(|(live, _)| live == ticket) {
                self.timers.remove(path);
            }
        }

        let step = self.core.step(event);

        for command in step.commands {
            self.execute_command(command).await?;
        }

        Ok(step.keep_running)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::ScheduleSettleCheck {
                path,
                ticket,
                delay,
            } => {
                self.schedule(path, ticket, delay);
            }
            CoreCommand::CancelSettleCheck { path } => {
                if let Some((_, handle)) = self.timers.remove(&path) {
                    handle.abort();
                }
            }
            CoreCommand::Dispose { path } => {
                self.timers.remove(&path);
                debug!(path = %path.display(), "dispatching settled file");
                self.backend.dispatch(path).await?;
            }
        }
        Ok(())
    }

    fn schedule(&mut self, path: PathBuf, ticket: SettleTicket, delay: Duration) {
        let tx = self.timer_tx.clone();
        let event_path = path.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx
                    .send(RuntimeEvent::SettleCheckDue {
                        path: event_path,
                        ticket,
                    })
                    .await;
            }
        });

        if let Some((_, previous)) = self.timers.insert(path, (ticket, handle)) {
            previous.abort();
        }
    }
}
