//! The connection engine.
//!
//! A [`Connection`] owns one duplex session with an IRC server. It is a cheap
//! handle (`Clone` shares the same session) that is passed into every
//! handler, so handlers can send, wait and inspect state without globals.
//!
//! # Lifecycle
//!
//! `Disconnected -> Connecting -> Connected -> Disconnected`. Only
//! [`Connection::start`] and the internal shutdown path change the state, and
//! both do so under the state lock. While `Connected` the session holds the
//! outbound queue, the cancellation token of its pumps and a generation
//! number; shutting down removes all three at once, so "queue exists" and
//! "state is connected" can never disagree.
//!
//! # Tasks
//!
//! Per session: one reader pump, one writer pump and, when enabled, the ping
//! watchdog. Every handler invocation runs in a task of its own.

mod reader;
pub mod transport;
mod watchdog;
mod writer;

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::SinkExt;
use parking_lot::{Mutex, RwLock};
use slirc_proto::{IrcCodec, LineCodec, Message, commands};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, trace, warn};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::dispatch::{Dispatcher, Event, Handler, SpawnPolicy, Trigger};
use crate::error::ClientError;
use crate::frame::Frame;
use crate::split::{estimate_prefix_len, split_text, text_budget};
use crate::telemetry::spans;
use crate::wait::{WaitOutcome, WaitRegistry};

pub use transport::TransportStream;

/// Default delay between two outbound lines.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(500);
/// Default ping watchdog period.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(60);
/// Default bound on each wait of a services negotiation.
pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Tracing target for raw protocol lines.
pub const WIRE_TARGET: &str = "slirc_bot::wire";

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

enum State {
    Disconnected,
    Connecting,
    Connected(Session),
}

struct Session {
    outbound: mpsc::UnboundedSender<String>,
    shutdown: CancellationToken,
    generation: u64,
}

struct Identity {
    /// Nick the bot was configured with; handshakes and recovery aim for it.
    configured_nick: String,
    /// Nick the server currently knows us by.
    nick: String,
    user: String,
    realname: String,
    password: Option<Zeroizing<String>>,
}

struct Settings {
    throttle: Duration,
    ping_interval: Duration,
    negotiation_timeout: Duration,
    ca_file: Option<PathBuf>,
}

struct Shared {
    server: String,
    tls: bool,
    identity: RwLock<Identity>,
    settings: RwLock<Settings>,
    debug: AtomicBool,

    state: Mutex<State>,
    next_generation: AtomicU64,
    waits: WaitRegistry,
    dispatcher: Dispatcher,

    /// Estimated length of our own `nick!user@host` as the server relays it.
    prefix_len: AtomicUsize,
    /// Set by any inbound frame, cleared by each watchdog tick.
    alive: AtomicBool,
    watchdog: AtomicBool,
    nick_attempts: AtomicU32,
    negotiating: AtomicBool,

    errors_tx: mpsc::UnboundedSender<ClientError>,
    errors_rx: Mutex<Option<mpsc::UnboundedReceiver<ClientError>>>,
}

/// Handle to one IRC client connection.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("server", &self.shared.server)
            .field("tls", &self.shared.tls)
            .field("nick", &self.nick())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Create a disconnected connection. Nothing touches the network until
    /// [`start`](Self::start).
    pub fn new(
        nick: impl Into<String>,
        user: impl Into<String>,
        server: impl Into<String>,
        tls: bool,
    ) -> Self {
        let nick = nick.into();
        let user = user.into();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let shared = Shared {
            server: server.into(),
            tls,
            prefix_len: AtomicUsize::new(estimate_prefix_len(&nick, &user)),
            identity: RwLock::new(Identity {
                configured_nick: nick.clone(),
                nick,
                realname: user.clone(),
                user,
                password: None,
            }),
            settings: RwLock::new(Settings {
                throttle: DEFAULT_THROTTLE,
                ping_interval: DEFAULT_PING_INTERVAL,
                negotiation_timeout: DEFAULT_NEGOTIATION_TIMEOUT,
                ca_file: None,
            }),
            debug: AtomicBool::new(false),
            state: Mutex::new(State::Disconnected),
            next_generation: AtomicU64::new(0),
            waits: WaitRegistry::new(),
            dispatcher: Dispatcher::new(),
            alive: AtomicBool::new(false),
            watchdog: AtomicBool::new(false),
            nick_attempts: AtomicU32::new(0),
            negotiating: AtomicBool::new(false),
            errors_tx,
            errors_rx: Mutex::new(Some(errors_rx)),
        };

        let conn = Self {
            shared: Arc::new(shared),
        };
        conn.install_identity_tracking();
        conn
    }

    /// Build a connection from a loaded [`Config`]: identity, timings, TLS
    /// trust and the convenience handlers the `[behavior]` section enables.
    pub fn from_config(config: &Config) -> Self {
        let identity = &config.identity;
        let behavior = &config.behavior;

        let conn = Self::new(
            identity.nick.as_str(),
            identity.user(),
            config.server.address.as_str(),
            config.server.tls,
        );
        conn.set_realname(identity.realname());
        if let Some(password) = &identity.password {
            conn.set_password(password.as_str());
        }
        if let Some(ca) = &config.server.ca_file {
            conn.set_ca_file(ca);
        }
        conn.set_throttle(behavior.throttle());
        conn.set_ping_interval(behavior.ping_interval());
        conn.set_negotiation_timeout(behavior.negotiation_timeout());
        if let Some(limit) = behavior.max_concurrent_handlers {
            conn.set_spawn_policy(SpawnPolicy::Bounded(limit));
        }

        if behavior.ping_pong {
            conn.handle_ping_pong();
        }
        if behavior.recover_nick {
            conn.handle_nick_taken();
        }
        if behavior.log_notices {
            conn.log_notices();
        }
        if !behavior.channels.is_empty() {
            conn.handle_join(behavior.channels.iter().cloned());
        }
        conn
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn server(&self) -> &str {
        &self.shared.server
    }

    pub fn is_tls(&self) -> bool {
        self.shared.tls
    }

    /// Nick the server currently knows us by.
    pub fn nick(&self) -> String {
        self.shared.identity.read().nick.clone()
    }

    /// Nick the connection was created with.
    pub fn configured_nick(&self) -> String {
        self.shared.identity.read().configured_nick.clone()
    }

    pub fn user(&self) -> String {
        self.shared.identity.read().user.clone()
    }

    pub fn realname(&self) -> String {
        self.shared.identity.read().realname.clone()
    }

    pub fn has_password(&self) -> bool {
        self.shared.identity.read().password.is_some()
    }

    pub(crate) fn password(&self) -> Option<Zeroizing<String>> {
        self.shared.identity.read().password.clone()
    }

    pub fn state(&self) -> ConnectionState {
        match &*self.shared.state.lock() {
            State::Disconnected => ConnectionState::Disconnected,
            State::Connecting => ConnectionState::Connecting,
            State::Connected(_) => ConnectionState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.shared.state.lock(), State::Connected(_))
    }

    /// Current estimate of our own prefix length, used to size message chunks.
    pub fn prefix_len(&self) -> usize {
        self.shared.prefix_len.load(Ordering::Acquire)
    }

    pub fn throttle(&self) -> Duration {
        self.shared.settings.read().throttle
    }

    pub fn ping_interval(&self) -> Duration {
        self.shared.settings.read().ping_interval
    }

    pub fn negotiation_timeout(&self) -> Duration {
        self.shared.settings.read().negotiation_timeout
    }

    /// Number of waits currently registered.
    pub fn pending_waits(&self) -> usize {
        self.shared.waits.len()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Delay between consecutive outbound lines. Zero disables throttling.
    pub fn set_throttle(&self, throttle: Duration) {
        self.shared.settings.write().throttle = throttle;
    }

    /// Password sent as `PASS` on connect and used for services recovery.
    pub fn set_password(&self, password: impl Into<String>) {
        let password = password.into();
        self.shared.identity.write().password =
            (!password.is_empty()).then(|| Zeroizing::new(password));
    }

    pub fn set_realname(&self, realname: impl Into<String>) {
        self.shared.identity.write().realname = realname.into();
    }

    /// Period of the ping watchdog. Takes effect on the next session.
    pub fn set_ping_interval(&self, interval: Duration) {
        self.shared.settings.write().ping_interval = interval;
    }

    /// Bound on each wait during nick recovery and identified-join.
    pub fn set_negotiation_timeout(&self, timeout: Duration) {
        self.shared.settings.write().negotiation_timeout = timeout;
    }

    pub fn set_spawn_policy(&self, policy: SpawnPolicy) {
        self.shared.dispatcher.set_spawn_policy(policy);
    }

    /// Extra PEM bundle trusted for TLS, on top of the platform roots.
    pub fn set_ca_file(&self, path: impl Into<PathBuf>) {
        self.shared.settings.write().ca_file = Some(path.into());
    }

    /// Raise raw wire lines from TRACE to DEBUG under [`WIRE_TARGET`].
    pub fn set_debug(&self, enabled: bool) {
        self.shared.debug.store(enabled, Ordering::Relaxed);
    }

    /// Take the receiving end of the error channel. Only the first call gets it.
    ///
    /// Exactly one error arrives per session end, plus one per failed `start`.
    pub fn take_errors(&self) -> Option<mpsc::UnboundedReceiver<ClientError>> {
        self.shared.errors_rx.lock().take()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Run `handler` for every inbound frame matching `event`.
    pub fn add_callback<F, Fut>(&self, event: impl Into<Event>, handler: F)
    where
        F: Fn(Connection, Arc<Frame>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.add_handler(event, handler);
    }

    /// Register any [`Handler`] implementation.
    pub fn add_handler<H: Handler>(&self, event: impl Into<Event>, handler: H) {
        self.shared
            .dispatcher
            .add_callback(event.into(), Arc::new(handler));
    }

    pub fn add_trigger(&self, trigger: Trigger) {
        self.shared.dispatcher.add_trigger(trigger);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connect, register and launch the pumps.
    ///
    /// A no-op when the connection is already connecting or connected. Dial
    /// failures leave the connection disconnected; the error is returned and
    /// also delivered on the error channel.
    pub async fn start(&self) -> Result<(), ClientError> {
        {
            let mut state = self.shared.state.lock();
            if !matches!(*state, State::Disconnected) {
                debug!(server = %self.shared.server, "Start ignored, session already active");
                return Ok(());
            }
            *state = State::Connecting;
        }

        let ca_file = self.shared.settings.read().ca_file.clone();
        info!(server = %self.shared.server, tls = self.shared.tls, "Connecting");

        let stream =
            match transport::dial(&self.shared.server, self.shared.tls, ca_file.as_deref()).await {
                Ok(stream) => stream,
                Err(e) => {
                    *self.shared.state.lock() = State::Disconnected;
                    warn!(server = %self.shared.server, error = %e, "Connect failed");
                    self.report(e.clone());
                    return Err(e);
                }
            };

        let (read_half, write_half) = tokio::io::split(stream);
        let frames = FramedRead::new(read_half, IrcCodec::new());
        let mut sink = FramedWrite::new(write_half, LineCodec::new());

        self.reset_session_identity();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        *self.shared.state.lock() = State::Connected(Session {
            outbound: outbound_tx,
            shutdown: shutdown.clone(),
            generation,
        });
        info!(server = %self.shared.server, nick = %self.nick(), "Connected");

        for line in self.handshake() {
            self.log_wire(">>", &line);
            if let Err(e) = sink.send(line).await {
                let err = ClientError::Write(Arc::new(e));
                self.shutdown(Some(generation), err.clone());
                return Err(err);
            }
        }

        let span = spans::session(&self.shared.server, generation);
        tokio::spawn(
            writer::run(self.clone(), sink, outbound_rx, shutdown.clone(), generation)
                .instrument(span.clone()),
        );
        tokio::spawn(
            reader::run(self.clone(), frames, shutdown.clone(), generation)
                .instrument(span.clone()),
        );
        if self.shared.watchdog.load(Ordering::Acquire) {
            tokio::spawn(watchdog::run(self.clone(), shutdown).instrument(span));
        }

        Ok(())
    }

    /// End the session. Idempotent and safe from any task.
    ///
    /// Pending waits return [`WaitOutcome::Closed`], queued outbound lines
    /// are discarded and [`ClientError::Disconnected`] is reported.
    pub fn disconnect(&self) {
        self.shutdown(None, ClientError::Disconnected);
    }

    /// Tear down the session identified by `generation` (any session when
    /// `None`). Returns false when there was nothing to tear down.
    pub(crate) fn shutdown(&self, generation: Option<u64>, cause: ClientError) -> bool {
        {
            let mut state = self.shared.state.lock();
            let session = match std::mem::replace(&mut *state, State::Disconnected) {
                State::Connected(session) if generation.is_none_or(|g| g == session.generation) => {
                    session
                }
                other => {
                    *state = other;
                    return false;
                }
            };
            session.shutdown.cancel();
            drop(session.outbound);
            self.shared.waits.close_all();
        }

        if cause.is_requested() {
            info!(server = %self.shared.server, "Disconnected");
        } else {
            warn!(server = %self.shared.server, error = %cause, code = cause.error_code(), "Session ended");
        }
        self.report(cause);
        true
    }

    fn report(&self, err: ClientError) {
        // Nobody listening is fine.
        let _ = self.shared.errors_tx.send(err);
    }

    fn handshake(&self) -> Vec<String> {
        let identity = self.shared.identity.read();
        let mut lines = Vec::with_capacity(3);
        if let Some(password) = &identity.password {
            lines.push(Message::pass(password.as_str()).to_string());
        }
        lines.push(Message::user(&identity.user, &identity.realname).to_string());
        lines.push(Message::nick(&identity.nick).to_string());
        lines
    }

    /// Fresh session: aim for the configured nick again and forget what we
    /// learned about our host.
    fn reset_session_identity(&self) {
        let mut identity = self.shared.identity.write();
        identity.nick = identity.configured_nick.clone();
        self.shared.prefix_len.store(
            estimate_prefix_len(&identity.nick, &identity.user),
            Ordering::Release,
        );
        self.shared.alive.store(false, Ordering::Release);
        self.shared.nick_attempts.store(0, Ordering::Relaxed);
        self.shared.negotiating.store(false, Ordering::Release);
    }

    // ========================================================================
    // Senders
    // ========================================================================

    /// Queue a raw line. Dropped silently unless connected.
    pub fn cmd(&self, line: impl Into<String>) {
        let state = self.shared.state.lock();
        if let State::Connected(session) = &*state {
            // The writer only goes away together with the session.
            let _ = session.outbound.send(line.into());
        }
    }

    pub(crate) fn send(&self, message: Message) {
        self.cmd(message.to_string());
    }

    /// Join each channel with its own `JOIN` line.
    pub fn join<I, S>(&self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for channel in channels {
            self.send(Message::join(channel.as_ref()));
        }
    }

    /// Send a PRIVMSG, split into as many lines as the wire limit requires.
    /// Multi-line text is sent line by line.
    pub fn msg(&self, target: &str, text: &str) {
        self.split_send(commands::PRIVMSG, target, text);
    }

    /// Send each line of `lines` with [`msg`](Self::msg), in order.
    pub fn msg_bulk<I, S>(&self, target: &str, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.msg(target, line.as_ref());
        }
    }

    /// Send a NOTICE, split like [`msg`](Self::msg).
    pub fn notice(&self, target: &str, text: &str) {
        self.split_send(commands::NOTICE, target, text);
    }

    /// Each line of `text` becomes its own message, split to fit the budget.
    /// Line breaks themselves are never sent and empty lines are skipped.
    fn split_send(&self, command: &str, target: &str, text: &str) {
        let budget = text_budget(command, target, self.prefix_len());
        let lines = text.split(['\r', '\n']).filter(|line| !line.is_empty());
        for chunk in lines.flat_map(|line| split_text(line, budget)) {
            let message = if command == commands::NOTICE {
                Message::notice(target, chunk)
            } else {
                Message::privmsg(target, chunk)
            };
            self.send(message);
        }
    }

    /// Answer a PING. `token` is echoed back when present.
    pub fn pong(&self, token: Option<&str>) {
        self.send(Message::pong(token));
    }

    /// Send an unsolicited PING carrying the server address.
    pub fn ping(&self) {
        self.send(Message::ping(&self.shared.server));
    }

    /// Ask for a new nick. The tracked nick only changes once the server
    /// confirms it (`NICK` echo or `RPL_WELCOME`).
    pub fn new_nick(&self, nick: &str) {
        self.send(Message::nick(nick));
    }

    /// Reply where `frame` came from: to the sender when it was addressed to
    /// our nick, otherwise to its first parameter.
    pub fn reply(&self, frame: &Frame, text: &str) {
        let Some(target) = frame.param(0) else {
            debug!(command = %frame.command, "Cannot reply to a frame without a target");
            return;
        };
        if target == self.nick() {
            self.msg(frame.sender_nick(), text);
        } else {
            self.msg(target, text);
        }
    }

    // ========================================================================
    // Waiting
    // ========================================================================

    /// Register interest in the next frame accepted by `filter`, run `action`,
    /// then wait for a match.
    ///
    /// Registration happens before `action`, so a frame provoked by the action
    /// cannot be missed. Returns [`WaitOutcome::Closed`] immediately when not
    /// connected, and as soon as the session ends otherwise.
    pub async fn wait_for<F, A>(&self, filter: F, action: A) -> WaitOutcome
    where
        F: FnMut(&Frame) -> bool,
        A: FnOnce(),
    {
        let mut pending = {
            let state = self.shared.state.lock();
            if !matches!(*state, State::Connected(_)) {
                return WaitOutcome::Closed;
            }
            self.shared.waits.register()
        };

        action();
        pending.until(filter).await
    }

    /// [`wait_for`](Self::wait_for) bounded by `timeout`.
    pub async fn wait_for_timeout<F, A>(&self, filter: F, action: A, timeout: Duration) -> WaitOutcome
    where
        F: FnMut(&Frame) -> bool,
        A: FnOnce(),
    {
        tokio::time::timeout(timeout, self.wait_for(filter, action))
            .await
            .unwrap_or(WaitOutcome::TimedOut)
    }

    // ========================================================================
    // Internal state used by pumps and handlers
    // ========================================================================

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    pub(crate) fn waits(&self) -> &WaitRegistry {
        &self.shared.waits
    }

    pub(crate) fn mark_alive(&self) {
        self.shared.alive.store(true, Ordering::Release);
    }

    /// Clear the liveness flag, returning whether it was set.
    pub(crate) fn take_alive(&self) -> bool {
        self.shared.alive.swap(false, Ordering::AcqRel)
    }

    /// Enable the watchdog. Returns false when it already was.
    pub(crate) fn enable_watchdog(&self) -> bool {
        if self.shared.watchdog.swap(true, Ordering::AcqRel) {
            return false;
        }
        let state = self.shared.state.lock();
        if let State::Connected(session) = &*state {
            let span = spans::session(&self.shared.server, session.generation);
            tokio::spawn(watchdog::run(self.clone(), session.shutdown.clone()).instrument(span));
        }
        true
    }

    pub(crate) fn next_nick_attempt(&self) -> u32 {
        self.shared.nick_attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Claim the negotiation slot. Returns false if a negotiation is running.
    pub(crate) fn begin_negotiation(&self) -> bool {
        !self.shared.negotiating.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn end_negotiation(&self) {
        self.shared.negotiating.store(false, Ordering::Release);
    }

    fn set_tracked_nick(&self, nick: &str) {
        let mut identity = self.shared.identity.write();
        let old = identity.nick.len();
        identity.nick = nick.to_string();
        let _ = self
            .shared
            .prefix_len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| {
                Some((len + nick.len()).saturating_sub(old))
            });
    }

    fn set_prefix_len(&self, len: usize) {
        self.shared.prefix_len.store(len, Ordering::Release);
    }

    /// Log a raw protocol line, redacting the password.
    pub(crate) fn log_wire(&self, direction: &str, line: impl fmt::Display) {
        let debug = self.shared.debug.load(Ordering::Relaxed);
        if !debug && !tracing::enabled!(target: WIRE_TARGET, tracing::Level::TRACE) {
            return;
        }

        let mut shown = line.to_string();
        if let Some(password) = &self.shared.identity.read().password
            && shown.contains(password.as_str())
        {
            shown = shown.replace(password.as_str(), "********");
        }

        if debug {
            debug!(target: WIRE_TARGET, server = %self.shared.server, "{} {}", direction, shown);
        } else {
            trace!(target: WIRE_TARGET, server = %self.shared.server, "{} {}", direction, shown);
        }
    }

    /// Keep the tracked nick and prefix estimate in step with what the server
    /// reflects back at us.
    fn install_identity_tracking(&self) {
        // 001 carries the nick the server registered us under.
        self.add_trigger(Trigger::new(
            |conn: &Connection, frame: &Frame| {
                frame.is(commands::RPL_WELCOME)
                    && frame.param(0).is_some_and(|nick| nick != conn.nick())
            },
            |conn: Connection, frame: Arc<Frame>| async move {
                if let Some(nick) = frame.param(0) {
                    debug!(nick = %nick, "Server registered us under a different nick");
                    conn.set_tracked_nick(nick);
                }
            },
        ));

        self.add_trigger(Trigger::new(
            |conn: &Connection, frame: &Frame| {
                frame.is(commands::NICK) && frame.sender_nick() == conn.nick()
            },
            |conn: Connection, frame: Arc<Frame>| async move {
                if let Some(new_nick) = frame.text().filter(|n| !n.is_empty()) {
                    debug!(nick = %new_nick, "Nick changed");
                    conn.set_tracked_nick(new_nick);
                }
            },
        ));

        self.add_trigger(Trigger::new(
            |conn: &Connection, frame: &Frame| {
                frame.is(commands::JOIN) && frame.sender_nick() == conn.nick()
            },
            |conn: Connection, frame: Arc<Frame>| async move {
                if let Some(prefix) = &frame.prefix {
                    trace!(prefix = %prefix, len = prefix.len(), "Observed own prefix");
                    conn.set_prefix_len(prefix.len());
                }
            },
        ));
    }
}
