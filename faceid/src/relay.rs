//! Host-mode gate controller
//!
//! A control board sends 3-byte ASCII commands over a serial link. The
//! controller authenticates the person in front of the camera on request,
//! drives a relay through a GPIO pin, and lets an administrator enroll new
//! users.
//!
//! ```text
//! Idle --ON1--> Active --OFF--> Idle
//! Active --003--> authenticate, relay high on success
//! Active --004--> relay low
//! Active --025--> authenticate admin --ok--> AwaitingEnrollment
//! AwaitingEnrollment --026--> enroll "User{n+1}" --> Active
//! ```

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use faceid_core::{AuthenticateStatus, EnrollStatus, Status};
use faceid_transport::Transport;
use faceid_types::AuthenticationRecord;

use crate::authenticator::{AuthenticationCallback, EnrollmentCallback, FaceAuthenticator};
use crate::error::{Error, Result};
use crate::gpio::{Direction, Level, OutputPin};

/// Length of a command frame
pub const FRAME_LEN: usize = 3;

/// Maximum age of a partial frame before it is discarded
pub const DEFAULT_POLL_WINDOW: Duration = Duration::from_millis(2000);

/// Command received from the control board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCommand {
    /// `ON1`
    Activate,
    /// `OFF`
    Deactivate,
    /// `003`: authenticate, then open the gate
    Open,
    /// `004`: close the gate
    Close,
    /// `025`: authenticate the administrator before enrolling
    NewUser,
    /// `026`: enroll the person in front of the camera
    StartEnrollment,
}

impl HostCommand {
    pub const ALL: &'static [HostCommand] = &[
        Self::Activate,
        Self::Deactivate,
        Self::Open,
        Self::Close,
        Self::NewUser,
        Self::StartEnrollment,
    ];

    /// Wire representation
    pub const fn frame(self) -> &'static [u8; FRAME_LEN] {
        match self {
            Self::Activate => b"ON1",
            Self::Deactivate => b"OFF",
            Self::Open => b"003",
            Self::Close => b"004",
            Self::NewUser => b"025",
            Self::StartEnrollment => b"026",
        }
    }

    /// Parse a frame; anything else is not a command
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|command| command.frame().as_slice() == frame)
    }
}

impl FromStr for HostCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_frame(s.as_bytes())
            .ok_or_else(|| faceid_types::Error::Parse(format!("unknown host command {s:?}")).into())
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // frames are ASCII
        f.write_str(std::str::from_utf8(self.frame()).unwrap_or("???"))
    }
}

/// Splits the control board byte stream into command frames
pub struct CommandReader<T: Transport> {
    transport: T,
    buf: BytesMut,
    window: Duration,
    partial_since: Option<Instant>,
}

impl<T: Transport> CommandReader<T> {
    /// Read from an already connected transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buf: BytesMut::with_capacity(64),
            window: DEFAULT_POLL_WINDOW,
            partial_since: None,
        }
    }

    /// Set the partial-frame window
    pub fn with_poll_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Next complete frame, or `None` once the link is closed.
    ///
    /// Bytes of an incomplete frame that do not complete within the poll
    /// window are dropped and the window restarts with the next byte.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if self.buf.len() >= FRAME_LEN {
                let frame = self.buf.split_to(FRAME_LEN).freeze();
                self.partial_since = (!self.buf.is_empty()).then(Instant::now);
                return Ok(Some(frame));
            }

            let wait = match self.partial_since {
                Some(since) => {
                    let elapsed = since.elapsed();
                    if elapsed >= self.window {
                        warn!(
                            "Discarding partial command {} after {:?}",
                            hex::encode(&self.buf),
                            elapsed
                        );
                        self.buf.clear();
                        self.partial_since = None;
                        self.window
                    } else {
                        self.window - elapsed
                    }
                }
                None => self.window,
            };

            match self.transport.receive(wait).await {
                Ok(bytes) => {
                    if !bytes.is_empty() && self.partial_since.is_none() {
                        self.partial_since = Some(Instant::now());
                    }
                    self.buf.extend_from_slice(&bytes);
                }
                Err(faceid_transport::Error::ReadTimeout) => continue,
                Err(faceid_transport::Error::ConnectionClosed) => {
                    debug!("Command link {} closed", self.transport.port_name());
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Next recognised command; unknown frames are skipped
    pub async fn next_command(&mut self) -> Result<Option<HostCommand>> {
        while let Some(frame) = self.next_frame().await? {
            match HostCommand::from_frame(&frame) {
                Some(command) => {
                    debug!(%command, "Host command");
                    return Ok(Some(command));
                }
                None => warn!("Ignoring unknown command {}", hex::encode(&frame)),
            }
        }
        Ok(None)
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Active,
    AwaitingEnrollment,
}

/// Gate controller driving a relay from host commands
pub struct RelayController<A, P> {
    authenticator: A,
    relay: P,
    admin_id: String,
    state: ControllerState,
    last_authenticated: Option<AuthenticationRecord>,
}

impl<A, P> RelayController<A, P>
where
    A: FaceAuthenticator,
    P: OutputPin,
{
    /// Configure `relay` as an output and start idle
    pub fn new(authenticator: A, mut relay: P, admin_id: impl Into<String>) -> Result<Self> {
        relay.set_direction(Direction::Out)?;

        Ok(Self {
            authenticator,
            relay,
            admin_id: admin_id.into(),
            state: ControllerState::Idle,
            last_authenticated: None,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// User of the latest authentication, `None` once an attempt fails
    pub fn last_authenticated(&self) -> Option<&AuthenticationRecord> {
        self.last_authenticated.as_ref()
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    pub fn into_parts(self) -> (A, P) {
        (self.authenticator, self.relay)
    }

    /// Process commands until the link closes or `shutdown` resolves
    pub async fn run<T, S>(&mut self, reader: &mut CommandReader<T>, shutdown: S) -> Result<()>
    where
        T: Transport,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(admin = %self.admin_id, "Relay controller running");

        loop {
            let command = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                command = reader.next_command() => command?,
            };

            match command {
                Some(command) => self.handle(command).await?,
                None => {
                    info!("Command stream ended");
                    return Ok(());
                }
            }
        }
    }

    /// Apply one command.
    ///
    /// Camera-side failures are logged and leave the controller running;
    /// only relay failures are returned.
    pub async fn handle(&mut self, command: HostCommand) -> Result<()> {
        use ControllerState::*;
        use HostCommand::*;

        match (self.state, command) {
            (Idle, Activate) => self.transition(Active),
            (Active, Deactivate) => self.transition(Idle),
            (Active, Open) => {
                self.authenticate(true).await?;
            }
            (Active, Close) => self.relay.set_level(Level::Low)?,
            (Active, NewUser) => {
                let user = self.authenticate(false).await?;
                if user.as_deref() == Some(self.admin_id.as_str()) {
                    info!("Administrator authenticated, waiting for enrollment");
                    self.transition(AwaitingEnrollment);
                } else {
                    info!("New user request not authorised");
                }
            }
            (AwaitingEnrollment, StartEnrollment) => {
                self.enroll_next_user().await;
                self.transition(Active);
            }
            (state, command) => debug!(?state, %command, "Command ignored"),
        }

        Ok(())
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "State change");
        self.state = next;
    }

    /// Authenticate and return the user id on success
    async fn authenticate(&mut self, open_gate: bool) -> Result<Option<String>> {
        self.last_authenticated = None;

        let mut clbk = GateAuthentication {
            relay: &mut self.relay,
            open_gate,
            user_id: None,
            relay_error: None,
        };

        let status = self.authenticator.authenticate(&mut clbk).await;
        let GateAuthentication {
            user_id,
            relay_error,
            ..
        } = clbk;

        if let Some(e) = relay_error {
            return Err(e);
        }

        if status != Status::Ok {
            warn!(%status, "Authentication call failed");
            return Ok(None);
        }

        if let Some(user_id) = &user_id {
            self.last_authenticated = Some(AuthenticationRecord::now(user_id.clone()));
        }

        Ok(user_id)
    }

    async fn enroll_next_user(&mut self) {
        let count = match self.authenticator.query_number_of_users().await {
            Ok(count) => count,
            Err(status) => {
                warn!(%status, "Can not query number of users");
                return;
            }
        };

        let user_id = format!("User{}", count + 1);
        info!(%user_id, "Enrolling new user");

        let mut clbk = EnrollmentLog::default();
        let status = self.authenticator.enroll(&mut clbk, &user_id).await;
        if status != Status::Ok {
            warn!(%status, "Enrollment call failed");
            return;
        }

        match clbk.result {
            Some(EnrollStatus::Success) => info!(%user_id, "Enrolled"),
            Some(result) => warn!(%user_id, %result, "Enrollment failed"),
            None => warn!(%user_id, "Enrollment finished without a result"),
        }
    }
}

struct GateAuthentication<'a, P> {
    relay: &'a mut P,
    open_gate: bool,
    user_id: Option<String>,
    relay_error: Option<Error>,
}

impl<P: OutputPin> AuthenticationCallback for GateAuthentication<'_, P> {
    fn on_result(&mut self, status: AuthenticateStatus, user_id: Option<&str>) {
        let Some(user_id) = user_id.filter(|_| status == AuthenticateStatus::Success) else {
            info!(%status, "Not authenticated");
            return;
        };

        info!(%user_id, "Authenticated");
        self.user_id = Some(user_id.to_string());

        if self.open_gate {
            if let Err(e) = self.relay.set_level(Level::High) {
                self.relay_error = Some(e);
            }
        }
    }
}

#[derive(Default)]
struct EnrollmentLog {
    result: Option<EnrollStatus>,
}

impl EnrollmentCallback for EnrollmentLog {
    fn on_result(&mut self, status: EnrollStatus) {
        self.result = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use mockall::predicate::eq;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use faceid_types::SerialConfig;

    use crate::gpio::MockOutputPin;
    use crate::simulator::SimulatedDevice;

    enum Step {
        Data(&'static [u8]),
        Idle,
    }

    /// Transport replaying a script; closes once the script is exhausted
    struct ScriptedTransport {
        steps: VecDeque<Step>,
        sent: Arc<Mutex<Vec<u8>>>,
    }

    impl ScriptedTransport {
        fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
                sent: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&mut self) -> faceid_transport::Result<()> {
            Ok(())
        }

        async fn disconnect(&mut self) -> faceid_transport::Result<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn send(&mut self, data: &[u8]) -> faceid_transport::Result<()> {
            self.sent.lock().extend_from_slice(data);
            Ok(())
        }

        async fn receive(&mut self, timeout: Duration) -> faceid_transport::Result<BytesMut> {
            match self.steps.pop_front() {
                Some(Step::Data(bytes)) => Ok(BytesMut::from(bytes)),
                Some(Step::Idle) => {
                    tokio::time::sleep(timeout).await;
                    Err(faceid_transport::Error::ReadTimeout)
                }
                None => Err(faceid_transport::Error::ConnectionClosed),
            }
        }

        fn port_name(&self) -> String {
            "scripted".into()
        }
    }

    async fn connected_device() -> SimulatedDevice {
        let mut device = SimulatedDevice::new();
        assert_eq!(device.connect(&SerialConfig::default()).await, Status::Ok);
        device
    }

    fn output_pin() -> MockOutputPin {
        let mut pin = MockOutputPin::new();
        pin.expect_set_direction()
            .with(eq(Direction::Out))
            .times(1)
            .returning(|_| Ok(()));
        pin
    }

    async fn collect(reader: &mut CommandReader<ScriptedTransport>) -> Vec<HostCommand> {
        let mut commands = Vec::new();
        while let Some(command) = reader.next_command().await.unwrap() {
            commands.push(command);
        }
        commands
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(HostCommand::from_frame(b"ON1"), Some(HostCommand::Activate));
        assert_eq!(HostCommand::from_frame(b"026"), Some(HostCommand::StartEnrollment));
        assert_eq!(HostCommand::from_frame(b"on1"), None);
        assert_eq!(HostCommand::from_frame(b"0030"), None);
        assert_eq!("004".parse::<HostCommand>().unwrap(), HostCommand::Close);
        assert!("999".parse::<HostCommand>().is_err());

        for &command in HostCommand::ALL {
            assert_eq!(command.to_string().parse::<HostCommand>().unwrap(), command);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_reassembles_split_frames() {
        let transport = ScriptedTransport::new([
            Step::Data(b"O"),
            Step::Data(b"N1"),
            Step::Data(b"003004"),
            Step::Idle,
            Step::Data(b"OF"),
            Step::Data(b"F"),
        ]);
        let mut reader = CommandReader::new(transport);

        assert_eq!(
            collect(&mut reader).await,
            vec![
                HostCommand::Activate,
                HostCommand::Open,
                HostCommand::Close,
                HostCommand::Deactivate
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_discards_stale_partial_frame() {
        let transport = ScriptedTransport::new([
            Step::Data(b"00"),
            Step::Idle,
            Step::Data(b"004"),
        ]);
        let mut reader = CommandReader::new(transport).with_poll_window(Duration::from_millis(500));

        assert_eq!(collect(&mut reader).await, vec![HostCommand::Close]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_skips_unknown_frames() {
        let transport = ScriptedTransport::new([Step::Data(b"XYZ"), Step::Data(b"ON1")]);
        let mut reader = CommandReader::new(transport);

        assert_eq!(collect(&mut reader).await, vec![HostCommand::Activate]);
        assert!(reader.transport().sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_open_authenticates_and_raises_relay_once() {
        let mut device = connected_device().await;
        device.push_authenticated("alice");

        let mut pin = output_pin();
        pin.expect_set_level()
            .with(eq(Level::High))
            .times(1)
            .returning(|_| Ok(()));

        let mut controller = RelayController::new(device, pin, "noah").unwrap();
        controller.handle(HostCommand::Activate).await.unwrap();
        controller.handle(HostCommand::Open).await.unwrap();

        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(controller.last_authenticated().unwrap().user_id, "alice");
    }

    #[tokio::test]
    async fn test_commands_ignored_while_idle() {
        let mut device = connected_device().await;
        device.push_authenticated("alice");

        let mut pin = output_pin();
        pin.expect_set_level().never();

        let mut controller = RelayController::new(device, pin, "noah").unwrap();
        controller.handle(HostCommand::Open).await.unwrap();
        controller.handle(HostCommand::Close).await.unwrap();

        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(controller.last_authenticated().is_none());
    }

    #[tokio::test]
    async fn test_failed_authentication_keeps_gate_closed() {
        let mut device = connected_device().await;
        device.push_authentication_failure(AuthenticateStatus::Forbidden);
        device.push_authentication_failure(AuthenticateStatus::SerialError);

        let mut pin = output_pin();
        pin.expect_set_level().never();

        let mut controller = RelayController::new(device, pin, "noah").unwrap();
        controller.handle(HostCommand::Activate).await.unwrap();
        controller.handle(HostCommand::Open).await.unwrap();
        controller.handle(HostCommand::Open).await.unwrap();

        assert!(controller.last_authenticated().is_none());
    }

    #[tokio::test]
    async fn test_failed_attempt_clears_previous_user() {
        let mut device = connected_device().await.with_user("noah");
        device.push_authenticated("noah");
        device.push_authentication_failure(AuthenticateStatus::Forbidden);

        let mut pin = output_pin();
        pin.expect_set_level().never();

        let mut controller = RelayController::new(device, pin, "noah").unwrap();
        controller.handle(HostCommand::Activate).await.unwrap();
        controller.handle(HostCommand::NewUser).await.unwrap();
        assert_eq!(controller.last_authenticated().unwrap().user_id, "noah");
        controller.handle(HostCommand::StartEnrollment).await.unwrap();

        controller.handle(HostCommand::NewUser).await.unwrap();
        assert!(controller.last_authenticated().is_none());
        assert_eq!(controller.state(), ControllerState::Active);
    }

    #[tokio::test]
    async fn test_close_lowers_relay() {
        let mut pin = output_pin();
        pin.expect_set_level()
            .with(eq(Level::Low))
            .times(1)
            .returning(|_| Ok(()));

        let mut controller = RelayController::new(connected_device().await, pin, "noah").unwrap();
        controller.handle(HostCommand::Activate).await.unwrap();
        controller.handle(HostCommand::Close).await.unwrap();
    }

    #[tokio::test]
    async fn test_admin_enrolls_next_user() {
        let mut device = connected_device().await.with_user("noah").with_user("alice");
        device.push_authenticated("noah");

        let mut pin = output_pin();
        pin.expect_set_level().never();

        let mut controller = RelayController::new(device, pin, "noah").unwrap();
        controller.handle(HostCommand::Activate).await.unwrap();
        controller.handle(HostCommand::NewUser).await.unwrap();
        assert_eq!(controller.state(), ControllerState::AwaitingEnrollment);

        // only 026 is acted on while waiting
        controller.handle(HostCommand::Deactivate).await.unwrap();
        controller.handle(HostCommand::Open).await.unwrap();
        assert_eq!(controller.state(), ControllerState::AwaitingEnrollment);

        controller.handle(HostCommand::StartEnrollment).await.unwrap();
        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(controller.last_authenticated().unwrap().user_id, "noah");
        assert_eq!(
            controller.authenticator().users().to_vec(),
            vec!["noah", "alice", "User3"]
        );
    }

    #[tokio::test]
    async fn test_non_admin_cannot_enroll() {
        let mut device = connected_device().await;
        device.push_authenticated("alice");

        let mut pin = output_pin();
        pin.expect_set_level().never();

        let mut controller = RelayController::new(device, pin, "noah").unwrap();
        controller.handle(HostCommand::Activate).await.unwrap();
        controller.handle(HostCommand::NewUser).await.unwrap();
        assert_eq!(controller.state(), ControllerState::Active);

        controller.handle(HostCommand::StartEnrollment).await.unwrap();
        assert!(controller.authenticator().users().is_empty());
    }

    #[tokio::test]
    async fn test_relay_failure_is_returned() {
        let mut device = connected_device().await;
        device.push_authenticated("alice");

        let mut pin = output_pin();
        pin.expect_set_level().times(1).returning(|_| {
            Err(Error::Gpio {
                pin: 6,
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        });

        let mut controller = RelayController::new(device, pin, "noah").unwrap();
        controller.handle(HostCommand::Activate).await.unwrap();
        let err = controller.handle(HostCommand::Open).await.unwrap_err();
        assert!(matches!(err, Error::Gpio { pin: 6, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stream_closes() {
        let mut device = connected_device().await;
        device.push_authenticated("alice");

        let mut pin = output_pin();
        pin.expect_set_level()
            .with(eq(Level::High))
            .times(1)
            .returning(|_| Ok(()));
        pin.expect_set_level()
            .with(eq(Level::Low))
            .times(1)
            .returning(|_| Ok(()));

        let transport = ScriptedTransport::new([
            Step::Data(b"ON1"),
            Step::Data(b"003"),
            Step::Idle,
            Step::Data(b"004OFF"),
        ]);
        let mut reader = CommandReader::new(transport);

        let mut controller = RelayController::new(device, pin, "noah").unwrap();
        controller
            .run(&mut reader, std::future::pending())
            .await
            .unwrap();

        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.last_authenticated().unwrap().user_id, "alice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let transport = ScriptedTransport::new(std::iter::repeat_with(|| Step::Idle).take(100));
        let mut reader = CommandReader::new(transport);

        let mut pin = output_pin();
        pin.expect_set_level().never();

        let mut controller = RelayController::new(connected_device().await, pin, "noah").unwrap();
        controller
            .run(&mut reader, tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(controller.state(), ControllerState::Idle);
    }
}
