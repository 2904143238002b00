//! The smart_vent component
//!
//! One runner task owns the [`VentController`]. Periodic refreshes, refreshes
//! triggered by input changes and the `smart_vent.*` service commands all go
//! through that task, so the controller never runs two things at once.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use sv_config::SmartVentConfig;
use sv_controller::{Clock, VentController, VentError};
use sv_core::{events::StateChangedData, EntityId, ServiceCall, ServiceError};
use sv_event_bus::EventReceiver;
use sv_service_registry::{ServiceDescription, ServiceRegistry};
use sv_state_store::StateStore;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::entities::StatusEntities;
use crate::hass::HomeAssistant;

pub const DOMAIN: &str = "smart_vent";

const COMMAND_QUEUE: usize = 16;

/// Work for the runner besides refreshing
#[derive(Debug)]
enum Command {
    SetMode {
        mode: String,
        reply: oneshot::Sender<Result<(), VentError>>,
    },
    ForceBoost {
        reply: oneshot::Sender<Result<(), VentError>>,
    },
}

/// A running smart_vent component
pub struct SmartVent {
    commands: mpsc::Sender<Command>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
    entities: StatusEntities,
}

impl SmartVent {
    /// Set up the component: refresh once, register services, start the runner
    pub async fn setup(
        hass: &HomeAssistant,
        config: SmartVentConfig,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let entities = StatusEntities::new()?;
        let watched = config
            .watched_entities()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        let check_interval = config.check_interval();

        // Subscribe before the first refresh so no change slips through
        let changes = hass.bus.subscribe::<StateChangedData>();

        let controller = VentController::new(
            config,
            hass.states.clone(),
            hass.services.clone(),
            clock,
        );

        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let mut runner = Runner {
            controller,
            states: hass.states.clone(),
            entities: entities.clone(),
            watched,
            check_interval,
            changes,
            commands: command_rx,
            shutdown_rx,
        };
        runner.refresh().await;

        register_services(&hass.services, commands.clone());

        let task = tokio::spawn(runner.run());
        info!(
            interval_secs = check_interval.as_secs(),
            "Smart Vent controller started"
        );

        Ok(Self {
            commands,
            shutdown_tx,
            task,
            entities,
        })
    }

    /// The presentation entities this component writes
    pub fn entities(&self) -> &StatusEntities {
        &self.entities
    }

    pub async fn set_mode(&self, mode: impl Into<String>) -> Result<(), ServiceError> {
        send_command(&self.commands, |reply| Command::SetMode {
            mode: mode.into(),
            reply,
        })
        .await
    }

    pub async fn force_boost(&self) -> Result<(), ServiceError> {
        send_command(&self.commands, |reply| Command::ForceBoost { reply }).await
    }

    /// Stop the runner and wait for it to finish
    pub async fn stop(self) {
        info!("Stopping Smart Vent controller");
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Smart Vent runner ended abnormally");
        }
    }
}

fn register_services(services: &ServiceRegistry, commands: mpsc::Sender<Command>) {
    let tx = commands.clone();
    services.register(
        ServiceDescription::new(DOMAIN, "set_mode")
            .with_name("Set mode")
            .with_description("Set the ventilation mode, cancelling any boost")
            .with_schema(json!({
                "type": "object",
                "properties": {"mode": {"type": "string"}},
                "required": ["mode"]
            })),
        move |call: ServiceCall| {
            let tx = tx.clone();
            async move {
                let mode: String = call
                    .get("mode")
                    .ok_or_else(|| ServiceError::InvalidData("mode must be a string".into()))?;
                send_command(&tx, |reply| Command::SetMode { mode, reply }).await?;
                Ok(None)
            }
        },
    );

    let tx = commands;
    services.register(
        ServiceDescription::new(DOMAIN, "force_boost")
            .with_name("Force boost")
            .with_description("Run the fan at boost speed for the boost duration"),
        move |_call: ServiceCall| {
            let tx = tx.clone();
            async move {
                send_command(&tx, |reply| Command::ForceBoost { reply }).await?;
                Ok(None)
            }
        },
    );

    info!("Smart Vent services registered");
}

/// Queue a command for the runner and wait for its outcome
async fn send_command(
    tx: &mpsc::Sender<Command>,
    make: impl FnOnce(oneshot::Sender<Result<(), VentError>>) -> Command,
) -> Result<(), ServiceError> {
    let (reply, outcome) = oneshot::channel();
    tx.send(make(reply))
        .await
        .map_err(|_| ServiceError::CallFailed("smart vent is not running".into()))?;

    match outcome.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e @ VentError::InvalidMode(_))) => Err(ServiceError::InvalidData(e.to_string())),
        Ok(Err(e)) => Err(ServiceError::CallFailed(e.to_string())),
        Err(_) => Err(ServiceError::CallFailed(
            "smart vent stopped before answering".into(),
        )),
    }
}

struct Runner {
    controller: VentController,
    states: Arc<StateStore>,
    entities: StatusEntities,
    watched: Vec<EntityId>,
    check_interval: Duration,
    changes: EventReceiver<StateChangedData>,
    commands: mpsc::Receiver<Command>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Runner {
    async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + self.check_interval, self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                change = self.changes.recv() => {
                    match change {
                        Ok(event) => {
                            if self.is_watched(&event.data.entity_id) {
                                debug!(entity_id = %event.data.entity_id, "Input changed");
                                self.drain_changes();
                                self.refresh().await;
                                ticker.reset();
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!("Smart Vent lagged by {} state changes", n);
                            self.refresh().await;
                        }
                        Err(RecvError::Closed) => {
                            info!("Event bus closed, stopping Smart Vent");
                            break;
                        }
                    }
                }
                Some(command) = self.commands.recv() => {
                    self.handle(command).await;
                }
                _ = self.shutdown_rx.recv() => {
                    break;
                }
            }
        }

        info!("Smart Vent controller stopped");
    }

    fn is_watched(&self, entity_id: &EntityId) -> bool {
        self.watched.contains(entity_id)
    }

    /// Drop changes already queued; the refresh that follows reads them all
    fn drain_changes(&mut self) {
        loop {
            match self.changes.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    async fn refresh(&mut self) {
        // Failures are logged by the controller; the entities still show
        // the last known state
        let _ = self.controller.tick().await;
        self.publish();
    }

    async fn handle(&mut self, command: Command) {
        let (outcome, reply) = match command {
            Command::SetMode { mode, reply } => (self.controller.request_mode(&mode).await, reply),
            Command::ForceBoost { reply } => (self.controller.force_boost().await, reply),
        };
        self.publish();
        let _ = reply.send(outcome);
    }

    fn publish(&self) {
        self.entities
            .publish(&self.states, &self.controller.status());
    }
}
