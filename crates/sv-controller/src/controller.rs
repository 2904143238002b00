//! The tick state machine

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use sv_config::SmartVentConfig;
use sv_core::{ServiceCaller, StateReader};
use tracing::{debug, error, info, instrument, warn};

use crate::humidity::{read_humidity, HumidityReading, HUMIDITY_THRESHOLD};
use crate::switch::{decode_switch, SwitchFault, SwitchInput};
use crate::{
    BoostState, Clock, DailyQuota, SpeedActuator, StatusSnapshot, TickResult, VentError, VentMode,
};

/// Owns the run-state of one ventilation fan
///
/// Not thread-safe by itself: the host must serialize calls, which it gets
/// for free by holding the controller as `&mut`.
pub struct VentController {
    config: SmartVentConfig,
    states: Arc<dyn StateReader>,
    clock: Arc<dyn Clock>,
    actuator: SpeedActuator,

    current_mode: VentMode,
    target_speed: u8,
    boost: BoostState,
    quota: DailyQuota,
    last_switch_mode: Option<VentMode>,
    humidity: Option<f64>,
}

impl VentController {
    pub fn new(
        config: SmartVentConfig,
        states: Arc<dyn StateReader>,
        services: Arc<dyn ServiceCaller>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let actuator = SpeedActuator::new(config.fan_entity.clone(), states.clone(), services);
        let current_mode = VentMode::Low;
        Self {
            target_speed: current_mode.speed(&config.speeds),
            quota: DailyQuota::new(config.max_boosts_per_day),
            config,
            states,
            clock,
            actuator,
            current_mode,
            boost: BoostState::Idle,
            last_switch_mode: None,
            humidity: None,
        }
    }

    pub fn current_mode(&self) -> VentMode {
        self.current_mode
    }

    pub fn target_speed(&self) -> u8 {
        self.target_speed
    }

    pub fn boost(&self) -> BoostState {
        self.boost
    }

    pub fn quota(&self) -> &DailyQuota {
        &self.quota
    }

    pub fn last_switch_mode(&self) -> Option<VentMode> {
        self.last_switch_mode
    }

    /// Re-read all inputs and bring the fan in line with them
    #[instrument(skip(self), name = "vent_tick")]
    pub async fn tick(&mut self) -> Result<TickResult, VentError> {
        match self.run_tick().await {
            Ok(result) => {
                debug!(
                    mode = %result.current_mode,
                    speed = result.target_speed,
                    auto_boost_active = result.auto_boost_active,
                    humidity = ?result.humidity,
                    "Tick complete"
                );
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "Error updating smart vent data");
                Err(e)
            }
        }
    }

    async fn run_tick(&mut self) -> Result<TickResult, VentError> {
        let now = self.clock.now();

        let today = self.clock.today();
        if self.quota.roll_over(today) {
            info!(date = %today, "Reset daily auto-boost counter");
        }

        let switch_mode = self.read_switch_mode();
        let humidity = self.read_humidity();
        self.humidity = humidity;

        let timeout_restore = self.expire_boost(now);

        if self.boost.is_manual() {
            if let Some(last) = self.last_switch_mode {
                if last != switch_mode {
                    info!(from = %last, to = %switch_mode, "Switch moved, cancelling manual boost");
                    self.cancel_boost();
                }
            }
        }
        self.last_switch_mode = Some(switch_mode);

        if self.boost.is_manual() {
            debug!("Manual boost active, holding boost speed");
        } else if let Some(restore) = timeout_restore {
            self.apply_mode(restore).await;
        } else {
            match switch_mode {
                VentMode::Low => {
                    if self.boost.is_auto() {
                        self.cancel_boost();
                    }
                    self.apply_mode(VentMode::Low).await;
                }
                VentMode::Boost => {
                    self.cancel_boost();
                    self.apply_mode(VentMode::Boost).await;
                }
                VentMode::Mid => {
                    if self.boost.is_auto() {
                        debug!("Auto-boost active, holding boost speed");
                    } else if self.should_auto_boost(humidity) {
                        self.start_auto_boost(now, humidity).await?;
                    } else {
                        self.apply_mode(VentMode::Mid).await;
                    }
                }
            }
        }

        Ok(TickResult {
            current_mode: self.current_mode,
            target_speed: self.target_speed,
            auto_boost_active: self.boost.is_active(),
            humidity,
        })
    }

    /// Switch to `mode`, cancelling any boost first
    pub async fn set_mode(&mut self, mode: VentMode) {
        self.cancel_boost();
        self.apply_mode(mode).await;
    }

    /// Like [`set_mode`](Self::set_mode) for a mode name coming from outside
    ///
    /// An unknown name changes nothing, not even an active boost.
    pub async fn request_mode(&mut self, raw: &str) -> Result<(), VentError> {
        let mode = raw.parse::<VentMode>().map_err(|e| {
            error!(mode = raw, "Invalid mode requested, must be one of: low, mid, boost");
            e
        })?;
        self.set_mode(mode).await;
        Ok(())
    }

    /// Start a boost that ignores the daily quota
    ///
    /// When it runs out the fan returns to the mode it was in before; if it
    /// replaced another boost, the fan returns to mid.
    pub async fn force_boost(&mut self) -> Result<(), VentError> {
        let now = self.clock.now();
        let ends_at = self.boost_end(now)?;

        let restore_mode = if self.boost.is_active() {
            None
        } else {
            Some(self.current_mode)
        };

        self.cancel_boost();
        self.boost = BoostState::Manual {
            ends_at,
            restore_mode,
        };
        self.drive_boost().await;

        info!(
            until = %ends_at,
            restore = ?restore_mode,
            "Manual boost started"
        );
        Ok(())
    }

    /// A snapshot for presentation
    pub fn status(&self) -> StatusSnapshot {
        let now = self.clock.now();
        let boost_ends_at = self.boost.ends_at();
        StatusSnapshot {
            current_mode: self.current_mode,
            target_speed: self.target_speed,
            auto_boost_active: self.boost.is_active(),
            manual_boost_active: self.boost.is_manual(),
            auto_boost_count_today: self.quota.used(),
            max_boosts_per_day: self.quota.max(),
            humidity: self.humidity,
            boost_ends_at,
            time_remaining: boost_ends_at
                .map(|ends_at| ends_at - now)
                .filter(|remaining| *remaining > Duration::zero()),
        }
    }

    fn read_switch_mode(&self) -> VentMode {
        let input_0 = SwitchInput::from_state(self.states.state(&self.config.input_0).as_ref());
        let input_1 = SwitchInput::from_state(self.states.state(&self.config.input_1).as_ref());
        let decoded = decode_switch(&input_0, &input_1);

        match decoded.fault {
            None => {}
            Some(SwitchFault::Unavailable) => warn!(
                input_0 = ?input_0,
                input_1 = ?input_1,
                "Switch inputs unavailable, defaulting to low"
            ),
            Some(SwitchFault::Unexpected) => warn!(
                input_0 = ?input_0,
                input_1 = ?input_1,
                "Unexpected switch state, defaulting to low"
            ),
            Some(SwitchFault::InvalidCombination) => {
                error!("Invalid switch combination: both inputs on, defaulting to low")
            }
        }

        decoded.mode
    }

    fn read_humidity(&self) -> Option<f64> {
        let sensor = &self.config.humidity_sensor;
        let reading = read_humidity(self.states.state(sensor).as_ref());

        match &reading {
            HumidityReading::Value(_) => {}
            HumidityReading::Missing => warn!(entity_id = %sensor, "Humidity sensor not found"),
            HumidityReading::NoReading(raw) => {
                warn!(entity_id = %sensor, state = %raw, "Humidity sensor unavailable")
            }
            HumidityReading::Malformed(raw) => {
                error!(entity_id = %sensor, state = %raw, "Invalid humidity value")
            }
        }

        reading.value()
    }

    /// Clear a boost whose end time has passed, returning the mode to go back to
    fn expire_boost(&mut self, now: DateTime<Utc>) -> Option<VentMode> {
        if !self.boost.has_expired(now) {
            return None;
        }
        let kind = self.boost.kind();
        let restore = self.boost.restore_mode();
        self.boost = BoostState::Idle;
        if let (Some(kind), Some(restore)) = (kind, restore) {
            info!(%kind, %restore, "Boost timed out");
        }
        restore
    }

    fn should_auto_boost(&self, humidity: Option<f64>) -> bool {
        if self.boost.is_active() {
            return false;
        }
        let Some(humidity) = humidity else {
            return false;
        };
        if humidity <= HUMIDITY_THRESHOLD {
            return false;
        }
        if !self.quota.has_remaining() {
            debug!(
                humidity,
                used = self.quota.used(),
                max = self.quota.max(),
                "Humidity high but daily boost limit reached"
            );
            return false;
        }
        true
    }

    async fn start_auto_boost(
        &mut self,
        now: DateTime<Utc>,
        humidity: Option<f64>,
    ) -> Result<(), VentError> {
        let ends_at = self.boost_end(now)?;
        self.quota.record();
        self.boost = BoostState::Auto { ends_at };
        self.drive_boost().await;

        info!(
            humidity = ?humidity,
            count = self.quota.used(),
            max = self.quota.max(),
            until = %ends_at,
            "Auto-boost started"
        );
        Ok(())
    }

    fn cancel_boost(&mut self) {
        if let Some(kind) = self.boost.kind() {
            info!(%kind, "Boost cancelled");
            self.boost = BoostState::Idle;
        }
    }

    fn boost_end(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, VentError> {
        now.checked_add_signed(self.config.boost_duration())
            .ok_or_else(|| {
                VentError::UpdateFailed(format!(
                    "boost end time out of range ({} + {} minutes)",
                    now, self.config.auto_boost_duration
                ))
            })
    }

    /// Put the fan on boost speed, sending the command even if already there
    async fn drive_boost(&mut self) {
        self.current_mode = VentMode::Boost;
        self.target_speed = VentMode::Boost.speed(&self.config.speeds);
        self.actuator.set_speed(self.target_speed).await;
    }

    async fn apply_mode(&mut self, mode: VentMode) {
        if mode == self.current_mode {
            debug!(%mode, "Mode unchanged");
            return;
        }

        let previous = self.current_mode;
        self.current_mode = mode;
        self.target_speed = mode.speed(&self.config.speeds);
        self.actuator.set_speed(self.target_speed).await;

        info!(from = %previous, to = %mode, speed = self.target_speed, "Ventilation mode changed");
    }
}

impl std::fmt::Debug for VentController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VentController")
            .field("current_mode", &self.current_mode)
            .field("target_speed", &self.target_speed)
            .field("boost", &self.boost)
            .field("quota", &self.quota)
            .field("last_switch_mode", &self.last_switch_mode)
            .field("humidity", &self.humidity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use chrono::TimeZone;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use sv_core::{Context, EntityId, ServiceError, State};

    #[derive(Default)]
    struct Host {
        states: Mutex<HashMap<String, State>>,
        commands: Mutex<Vec<Value>>,
    }

    impl Host {
        fn set(&self, entity_id: &str, value: &str) {
            let id: EntityId = entity_id.parse().unwrap();
            self.states.lock().unwrap().insert(
                entity_id.to_string(),
                State::new(id, value, HashMap::new(), Context::new()),
            );
        }

        fn commands(&self) -> Vec<Value> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl StateReader for Host {
        fn state(&self, entity_id: &EntityId) -> Option<State> {
            self.states
                .lock()
                .unwrap()
                .get(&entity_id.to_string())
                .cloned()
        }
    }

    #[async_trait::async_trait]
    impl ServiceCaller for Host {
        async fn call_service(
            &self,
            _domain: &str,
            _service: &str,
            service_data: Value,
            _context: Context,
        ) -> Result<(), ServiceError> {
            self.commands.lock().unwrap().push(service_data);
            Ok(())
        }
    }

    fn setup() -> (VentController, Arc<Host>, Arc<ManualClock>) {
        let host = Arc::new(Host::default());
        host.set("fan.bathroom", "on");
        host.set("input_boolean.vent_0", "on");
        host.set("input_boolean.vent_1", "off");
        host.set("sensor.bathroom_humidity", "50");

        let clock = Arc::new(ManualClock::at(
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        ));
        let config = SmartVentConfig::new(
            "fan.bathroom".parse().unwrap(),
            "sensor.bathroom_humidity".parse().unwrap(),
            "input_boolean.vent_0".parse().unwrap(),
            "input_boolean.vent_1".parse().unwrap(),
        );
        let controller = VentController::new(config, host.clone(), host.clone(), clock.clone());
        (controller, host, clock)
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (controller, host, _) = setup();
        assert_eq!(controller.current_mode(), VentMode::Low);
        assert_eq!(controller.target_speed(), 30);
        assert_eq!(controller.boost(), BoostState::Idle);
        assert_eq!(controller.last_switch_mode(), None);
        assert!(host.commands().is_empty());
    }

    #[tokio::test]
    async fn test_tick_applies_switch_mode() {
        let (mut controller, host, _) = setup();

        let result = controller.tick().await.unwrap();
        assert_eq!(result.current_mode, VentMode::Mid);
        assert_eq!(result.target_speed, 52);
        assert_eq!(result.humidity, Some(50.0));
        assert_eq!(controller.last_switch_mode(), Some(VentMode::Mid));
        assert_eq!(host.commands().len(), 1);

        // Nothing changed, nothing sent
        controller.tick().await.unwrap();
        assert_eq!(host.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_humidity_at_threshold_does_not_boost() {
        let (mut controller, host, _) = setup();
        host.set("sensor.bathroom_humidity", "80");

        let result = controller.tick().await.unwrap();
        assert_eq!(result.current_mode, VentMode::Mid);
        assert!(!result.auto_boost_active);

        host.set("sensor.bathroom_humidity", "80.1");
        let result = controller.tick().await.unwrap();
        assert_eq!(result.current_mode, VentMode::Boost);
        assert!(result.auto_boost_active);
        assert_eq!(controller.quota().used(), 1);
    }

    #[tokio::test]
    async fn test_request_mode_rejects_unknown_names() {
        let (mut controller, host, _) = setup();
        controller.force_boost().await.unwrap();
        let before = controller.boost();

        let err = controller.request_mode("turbo").await.unwrap_err();
        assert_eq!(err, VentError::InvalidMode("turbo".into()));
        assert_eq!(controller.boost(), before);
        assert_eq!(controller.current_mode(), VentMode::Boost);
        assert_eq!(host.commands().len(), 1);

        controller.request_mode("low").await.unwrap();
        assert_eq!(controller.boost(), BoostState::Idle);
        assert_eq!(controller.current_mode(), VentMode::Low);
    }

    #[tokio::test]
    async fn test_status_time_remaining() {
        let (mut controller, _, clock) = setup();
        controller.force_boost().await.unwrap();

        clock.advance(Duration::minutes(4));
        let status = controller.status();
        assert!(status.auto_boost_active);
        assert!(status.manual_boost_active);
        assert_eq!(status.time_remaining, Some(Duration::minutes(6)));
        assert_eq!(status.time_remaining_minutes(), Some(6.0));

        clock.advance(Duration::minutes(7));
        let status = controller.status();
        assert_eq!(status.time_remaining, None);
        assert!(status.boost_ends_at.is_some());
    }

    #[tokio::test]
    async fn test_boost_end_overflow_is_update_failure() {
        let (mut controller, host, clock) = setup();
        clock.set(DateTime::<Utc>::MAX_UTC);

        let err = controller.force_boost().await.unwrap_err();
        assert!(matches!(err, VentError::UpdateFailed(_)));
        assert_eq!(controller.boost(), BoostState::Idle);
        assert!(host.commands().is_empty());
    }
}
