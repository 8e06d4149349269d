use crate::config::DeviceConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::{hex_text, volume_steps, Command, Frame, StateReport};
use crate::types::{
    DeviceState, Feature, PowerState, Source, Zone, MAX_VOLUME, SUPPORTED_FEATURES,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Session with one Dynaudio Connect hub
///
/// Commands are fire-and-forget: each one opens a connection, writes a frame
/// and closes. If the hub cannot be reached the command is logged and
/// dropped. State is only changed by [`DynaudioDevice::refresh`].
///
/// Clones share the same state and the same I/O lock, so at most one
/// exchange with the hub is in flight per device.
#[derive(Clone)]
pub struct DynaudioDevice {
    name: Arc<str>,
    connection: Connection,
    refresh_timeout: Duration,
    io_lock: Arc<tokio::sync::Mutex<()>>,
    state: Arc<Mutex<DeviceState>>,
}

impl DynaudioDevice {
    /// Create a session targeting zone `1`
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::from_config(
            &DeviceConfig::new(host)
                .with_name(name)
                .with_port(port),
        )
    }

    /// Create a session targeting `zone`
    pub fn with_zone(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        zone: &str,
    ) -> Result<Self> {
        let config = DeviceConfig::new(host)
            .with_name(name)
            .with_port(port)
            .with_zone(Zone::new(zone)?);
        Ok(Self::from_config(&config))
    }

    pub fn from_config(config: &DeviceConfig) -> Self {
        tracing::info!(
            "Dynaudio {} at {}:{} (zone {})",
            config.name,
            config.host,
            config.port,
            config.zone
        );

        Self {
            name: config.name.as_str().into(),
            connection: Connection::new(config.host.clone(), config.port),
            refresh_timeout: config.refresh_timeout(),
            io_lock: Arc::new(tokio::sync::Mutex::new(())),
            state: Arc::new(Mutex::new(DeviceState::new(config.zone.clone()))),
        }
    }

    /// Create a session and read the device state once
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dynaudio_connect::{DeviceConfig, DynaudioDevice};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let device = DynaudioDevice::connect(&DeviceConfig::new("192.168.1.50")).await;
    ///     println!("{} is {}", device.name(), device.power_state());
    /// }
    /// ```
    pub async fn connect(config: &DeviceConfig) -> Self {
        let device = Self::from_config(config);
        device.refresh().await;
        if device.responding() {
            tracing::info!("Dynaudio {} is {}", device.name, device.power_state());
        } else {
            tracing::info!("Dynaudio {} did not answer, assuming it is off", device.name);
        }
        device
    }

    fn lock_state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== State ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        self.connection.host()
    }

    pub fn port(&self) -> u16 {
        self.connection.port()
    }

    /// Zone that commands are currently addressed to
    pub fn zone(&self) -> Zone {
        self.lock_state().zone.clone()
    }

    /// Get a snapshot of the complete device state for rendering
    pub fn state_snapshot(&self) -> DeviceState {
        self.lock_state().clone()
    }

    /// Power state; a device that did not answer the last refresh reports `Off`
    pub fn power_state(&self) -> PowerState {
        self.lock_state().power_state()
    }

    /// Whether the last refresh got an answer.
    ///
    /// Lets callers tell "off" from "unreachable", which `power_state` cannot.
    pub fn responding(&self) -> bool {
        self.lock_state().responding
    }

    /// Volume in `0.0..=1.0`
    pub fn volume_level(&self) -> f64 {
        self.lock_state().volume_level()
    }

    pub fn is_muted(&self) -> bool {
        self.lock_state().muted
    }

    /// Current source name, empty until the device has reported one
    pub fn current_source(&self) -> String {
        self.lock_state().source_name()
    }

    /// Every selectable source name, always in protocol order
    pub fn available_sources(&self) -> Vec<String> {
        Source::names()
    }

    pub fn supported_features(&self) -> &'static [Feature] {
        &SUPPORTED_FEATURES
    }

    /// Query the device and update the cached state.
    ///
    /// Always returns `true`. If nothing comes back (refused, timed out or
    /// closed without data) the device is assumed to be off and every other
    /// field keeps its previous value.
    pub async fn refresh(&self) -> bool {
        let probe = Frame::feedback_probe();

        let received = {
            let _guard = self.io_lock.lock().await;
            tracing::debug!("Probing {}: {}", self.name, probe);
            match self
                .connection
                .query(&probe.to_bytes(), self.refresh_timeout)
                .await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Dynaudio {} refused connection: {}", self.name, e);
                    Vec::new()
                }
            }
        };

        tracing::debug!("Received from {}: [{}]", self.name, hex_text(&received));
        apply_response(&mut self.lock_state(), &received, &self.name);
        true
    }

    // ========== Commands ==========

    /// Frame and send raw payload groups, e.g. `["2F", "A0", "01", "00", "F1"]`.
    ///
    /// A malformed payload is returned as an error; transport failures are
    /// logged and swallowed.
    pub async fn send_command<S: AsRef<str>>(&self, payload: &[S]) -> Result<()> {
        let frame = Frame::from_groups(payload)?;
        self.dispatch(frame).await;
        Ok(())
    }

    pub async fn turn_on(&self) -> Result<()> {
        self.send(Command::TurnOn).await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.send(Command::TurnOff).await
    }

    /// Set the volume from a `0.0..=1.0` level
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use dynaudio_connect::DynaudioDevice;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let device = DynaudioDevice::new("Dynaudio", "192.168.1.50", 1901);
    /// device.set_volume(0.5).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_volume(&self, level: f64) -> Result<()> {
        let steps = volume_steps(level)?;
        tracing::debug!("Volume {:.2} -> step {}/{}", level, steps, MAX_VOLUME);
        self.send(Command::SetVolume(steps)).await
    }

    /// Send the mute command.
    ///
    /// The hub gets the same bytes whether `mute` is true or false; whether it
    /// toggles or sets is unconfirmed, so the argument is not encoded.
    pub async fn set_mute(&self, mute: bool) -> Result<()> {
        tracing::debug!("Mute requested ({}), sending mute command", mute);
        self.send(Command::Mute(mute)).await
    }

    /// Select a source by name.
    ///
    /// Names outside [`DynaudioDevice::available_sources`] fail with
    /// `UnknownSource` and nothing is sent.
    pub async fn select_source(&self, source: &str) -> Result<()> {
        let source: Source = source.parse()?;
        self.send(Command::SelectSource(source)).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        let frame = command.frame(&self.zone())?;
        self.dispatch(frame).await;
        Ok(())
    }

    async fn dispatch(&self, frame: Frame) {
        let _guard = self.io_lock.lock().await;
        tracing::debug!("Sending to {}: {}", self.name, frame);

        if let Err(e) = self.connection.send(&frame.to_bytes()).await {
            tracing::warn!("Dynaudio {} refused connection: {}", self.name, e);
        }
    }
}

/// Fold a probe response into the cached state
fn apply_response(state: &mut DeviceState, response: &[u8], name: &str) {
    if response.is_empty() {
        state.power = false;
        state.responding = false;
        return;
    }
    state.responding = true;

    let report = match StateReport::decode(response) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!("Dynaudio {} sent a truncated response: {}", name, e);
            return;
        }
    };

    state.power = report.power;
    state.volume = report.volume.min(MAX_VOLUME);
    state.muted = report.muted;

    match Source::try_from(report.source_code) {
        Ok(source) => state.source = Some(source),
        Err(e) => tracing::warn!("Dynaudio {}: {}, keeping {:?}", name, e, state.source),
    }

    match Zone::from_byte(report.zone) {
        Ok(zone) => state.zone = zone,
        Err(e) => tracing::warn!("Dynaudio {}: {}, keeping zone {}", name, e, state.zone),
    }
}
