//! In-process coordination ensemble.
//!
//! [`MemoryEnsemble`] implements [`CoordinationRuntime`] with the service's
//! observable behaviour: versioned nodes, sequential and ephemeral creates,
//! ACLs, one-shot watches, resumable sessions and connectivity transitions.
//! Cluster incidents are simulated with [`MemoryEnsemble::stop`],
//! [`MemoryEnsemble::start`] and [`MemoryEnsemble::expire`].

mod auth;
mod path;
mod tree;


use std::collections::HashMap;
use std::collections::HashSet;
use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rand::Rng;
use tracing::debug;
use tracing::info;
use tracing::trace;

use self::auth::authenticate;
use self::auth::AuthId;
use self::tree::Caller;
use self::tree::DataTree;
use self::tree::Fired;
use super::ClientId;
use super::CoordinationRuntime;
use super::NativeHandle;
use super::RawNotification;
use crate::constants::DEFAULT_SERVERS;
use crate::errors::ErrorCode;
use crate::event::EventType;
use crate::event::SessionState;
use crate::node::Acl;
use crate::node::CreateFlags;
use crate::node::Stat;
use crate::watch::WatchId;

/// Server tick; negotiated session timeouts are clamped to [2, 20] ticks
const TICK: Duration = Duration::from_millis(2_000);
const MIN_SESSION_TICKS: u32 = 2;
const MAX_SESSION_TICKS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    /// Not attached to a server-side session yet
    Connecting,
    Connected(i64),
    /// Terminal: the session ended or its resumption token was rejected
    Expired,
    /// Terminal: credentials were rejected
    AuthFailed,
}

struct Connection {
    context: WatchId,
    /// False when none of the dialed addresses is served by this ensemble
    reachable: bool,
    resume: Option<ClientId>,
    timeout: Duration,
    state: ConnState,
    auth: Vec<AuthId>,
}

struct ServerSession {
    passwd: [u8; 16],
    timeout: Duration,
    connections: HashSet<NativeHandle>,
}

struct EnsembleState {
    running: bool,
    tree: DataTree,
    connections: HashMap<NativeHandle, Connection>,
    sessions: HashMap<i64, ServerSession>,
    next_handle: u64,
    next_session: i64,
}

/// In-process ensemble serving a fixed set of addresses
pub struct MemoryEnsemble {
    servers: Vec<String>,
    state: Mutex<EnsembleState>,
    notify_tx: Sender<RawNotification>,
    notify_rx: Receiver<RawNotification>,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for MemoryEnsemble {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MemoryEnsemble")
            .field("servers", &self.servers)
            .field("shut_down", &self.shut_down.load(Ordering::Acquire))
            .finish()
    }
}

fn parse_servers(servers: &str) -> io::Result<Vec<String>> {
    let invalid = || io::Error::new(io::ErrorKind::InvalidInput, "invalid argument");
    let mut parsed = Vec::new();
    for server in servers.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (host, port) = server.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(invalid());
        }
        parsed.push(server.to_string());
    }
    if parsed.is_empty() {
        return Err(invalid());
    }
    Ok(parsed)
}

fn negotiate_timeout(requested: Duration) -> Duration {
    requested.clamp(TICK * MIN_SESSION_TICKS, TICK * MAX_SESSION_TICKS)
}

impl Default for MemoryEnsemble {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEnsemble {
    /// Ensemble serving the default address
    pub fn new() -> Self {
        Self::with_servers(&[DEFAULT_SERVERS])
    }

    pub fn with_servers(servers: &[&str]) -> Self {
        let (notify_tx, notify_rx) = unbounded();
        let mut rng = rand::thread_rng();
        Self {
            servers: servers.iter().map(|s| s.to_string()).collect(),
            state: Mutex::new(EnsembleState {
                running: true,
                tree: DataTree::new(),
                connections: HashMap::new(),
                sessions: HashMap::new(),
                next_handle: 0,
                next_session: rng.gen_range(1..0xffff) << 40,
            }),
            notify_tx,
            notify_rx,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Comma separated list of the served addresses, suitable for dialing
    pub fn servers(&self) -> String {
        self.servers.join(",")
    }

    fn notify(
        &self,
        context: WatchId,
        event_type: EventType,
        path: &str,
        state: SessionState,
    ) {
        trace!(watch_id = %context, ?event_type, path, ?state, "queue notification");
        let _ = self.notify_tx.send(RawNotification {
            context,
            event_type,
            path: path.to_string(),
            state,
        });
    }

    /// Sends a session event to the connection's context and to every watch it armed
    fn broadcast(
        &self,
        state: &EnsembleState,
        handle: NativeHandle,
        session_state: SessionState,
    ) {
        let Some(conn) = state.connections.get(&handle) else {
            return;
        };
        self.notify(conn.context, EventType::Session, "", session_state);
        for watch in state.tree.watches_of(handle) {
            self.notify(watch, EventType::Session, "", session_state);
        }
    }

    fn deliver_fired(
        &self,
        fired: Vec<Fired>,
    ) {
        for f in fired {
            self.notify(f.watch, f.event_type, &f.path, SessionState::Connected);
        }
    }

    /// Attaches a reachable connection to a server-side session
    fn establish(
        &self,
        state: &mut EnsembleState,
        handle: NativeHandle,
    ) {
        let Some(conn) = state.connections.get(&handle) else {
            return;
        };
        let (resume, timeout, context) = (conn.resume, conn.timeout, conn.context);

        let session_id = match resume {
            Some(client_id) => match state.sessions.get_mut(&client_id.session_id) {
                Some(session) if session.passwd == client_id.passwd => {
                    session.connections.insert(handle);
                    client_id.session_id
                }
                _ => {
                    info!(session_id = %client_id, "resumption rejected; session expired");
                    if let Some(conn) = state.connections.get_mut(&handle) {
                        conn.state = ConnState::Expired;
                    }
                    self.notify(context, EventType::Session, "", SessionState::ExpiredSession);
                    return;
                }
            },
            None => {
                state.next_session += 1;
                let session_id = state.next_session;
                let mut passwd = [0u8; 16];
                rand::thread_rng().fill(&mut passwd);
                state.sessions.insert(
                    session_id,
                    ServerSession {
                        passwd,
                        timeout: negotiate_timeout(timeout),
                        connections: HashSet::from([handle]),
                    },
                );
                session_id
            }
        };

        if let Some(conn) = state.connections.get_mut(&handle) {
            conn.state = ConnState::Connected(session_id);
        }
        info!(session_id, handle = handle.as_raw(), "session established");
        self.notify(context, EventType::Session, "", SessionState::Connected);
    }

    /// Ends a server-side session: ephemerals are removed and every other
    /// connection attached to it observes expiry.
    fn end_session(
        &self,
        state: &mut EnsembleState,
        session_id: i64,
        except: Option<NativeHandle>,
    ) {
        let Some(session) = state.sessions.remove(&session_id) else {
            return;
        };
        for handle in session.connections {
            if Some(handle) == except {
                continue;
            }
            self.broadcast(state, handle, SessionState::ExpiredSession);
            state.tree.remove_watches(handle);
            if let Some(conn) = state.connections.get_mut(&handle) {
                conn.state = ConnState::Expired;
            }
        }
        let mut fired = Vec::new();
        state.tree.remove_ephemerals(session_id, &mut fired);
        self.deliver_fired(fired);
    }

    /// Simulates losing the whole ensemble.
    ///
    /// Attached connections report `Connecting`; operations fail with
    /// connection loss until [`start`](Self::start).
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.running {
            return;
        }
        state.running = false;
        info!("ensemble stopped");
        let attached: Vec<NativeHandle> = state
            .connections
            .iter()
            .filter(|(_, c)| matches!(c.state, ConnState::Connected(_)))
            .map(|(h, _)| *h)
            .collect();
        for handle in attached {
            self.broadcast(&state, handle, SessionState::Connecting);
        }
    }

    /// Brings the ensemble back; sessions are resumed and pending connections attach.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.running {
            return;
        }
        state.running = true;
        info!("ensemble started");
        let mut handles: Vec<NativeHandle> = state.connections.keys().copied().collect();
        handles.sort_by_key(NativeHandle::as_raw);
        for handle in handles {
            let Some((conn_state, reachable)) =
                state.connections.get(&handle).map(|c| (c.state, c.reachable))
            else {
                continue;
            };
            match conn_state {
                ConnState::Connected(_) => self.broadcast(&state, handle, SessionState::Connected),
                ConnState::Connecting if reachable => self.establish(&mut state, handle),
                _ => {}
            }
        }
    }

    /// Expires the server-side session identified by `client_id`.
    ///
    /// Every connection attached to it, and every watch those connections
    /// armed, receives `ExpiredSession`.
    pub fn expire(
        &self,
        client_id: ClientId,
    ) {
        let mut state = self.state.lock();
        info!(session_id = %client_id, "expiring session");
        self.end_session(&mut state, client_id.session_id, None);
    }

    /// Ends the notification stream; `wait_for_watch` returns `None` afterwards.
    pub fn shutdown(&self) {
        debug!("ensemble notification stream shut down");
        self.shut_down.store(true, Ordering::Release);
        // the flag is checked again once the waiter wakes
        self.wake();
    }

    /// Unblocks `wait_for_watch` with a notification addressed to no watch
    fn wake(&self) {
        let _ = self.notify_tx.send(RawNotification {
            context: WatchId::from_raw(0),
            event_type: EventType::NotWatching,
            path: String::new(),
            state: SessionState::Closed,
        });
    }

    /// Negotiated timeout of the session `handle` is attached to
    pub fn session_timeout(
        &self,
        handle: NativeHandle,
    ) -> Option<Duration> {
        let state = self.state.lock();
        match state.connections.get(&handle)?.state {
            ConnState::Connected(id) => state.sessions.get(&id).map(|s| s.timeout),
            _ => None,
        }
    }

    /// Runs `op` against the tree on behalf of an attached connection
    fn with_caller<T>(
        &self,
        handle: NativeHandle,
        op: impl FnOnce(&mut DataTree, &Caller<'_>, &mut Vec<Fired>) -> Result<T, ErrorCode>,
    ) -> Result<T, ErrorCode> {
        let mut fired = Vec::new();
        let result = {
            let mut state = self.state.lock();
            let state = &mut *state;
            let conn = state.connections.get(&handle).ok_or(ErrorCode::InvalidState)?;
            let session_id = match conn.state {
                _ if !conn.reachable => return Err(ErrorCode::ConnectionLoss),
                ConnState::Expired => return Err(ErrorCode::SessionExpired),
                ConnState::AuthFailed => return Err(ErrorCode::AuthFailed),
                _ if !state.running => return Err(ErrorCode::ConnectionLoss),
                ConnState::Connecting => return Err(ErrorCode::ConnectionLoss),
                ConnState::Connected(id) => id,
            };
            let caller = Caller {
                handle,
                session_id,
                auth: &conn.auth,
            };
            op(&mut state.tree, &caller, &mut fired)
        };
        self.deliver_fired(fired);
        result
    }
}

impl CoordinationRuntime for MemoryEnsemble {
    fn connect(
        &self,
        servers: &str,
        recv_timeout: Duration,
        client_id: Option<ClientId>,
        context: WatchId,
    ) -> io::Result<NativeHandle> {
        let requested = parse_servers(servers)?;
        let reachable = requested.iter().any(|s| self.servers.contains(s));

        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = NativeHandle::from_raw(state.next_handle);
        state.connections.insert(
            handle,
            Connection {
                context,
                reachable,
                resume: client_id,
                timeout: recv_timeout,
                state: ConnState::Connecting,
                auth: Vec::new(),
            },
        );
        debug!(handle = handle.as_raw(), servers, reachable, "connection opened");

        if reachable && state.running {
            self.establish(&mut state, handle);
        }
        Ok(handle)
    }

    fn close(
        &self,
        handle: NativeHandle,
    ) -> Result<(), ErrorCode> {
        let mut state = self.state.lock();
        let conn = state.connections.get(&handle).ok_or(ErrorCode::InvalidState)?;
        let conn_state = conn.state;
        state.tree.remove_watches(handle);
        if let ConnState::Connected(session_id) = conn_state {
            self.end_session(&mut state, session_id, Some(handle));
        }
        state.connections.remove(&handle);
        debug!(handle = handle.as_raw(), "connection closed");
        if state.connections.is_empty() {
            self.wake();
        }
        Ok(())
    }

    fn client_id(
        &self,
        handle: NativeHandle,
    ) -> Result<ClientId, ErrorCode> {
        let state = self.state.lock();
        let conn = state.connections.get(&handle).ok_or(ErrorCode::InvalidState)?;
        match conn.state {
            ConnState::Connected(session_id) => state
                .sessions
                .get(&session_id)
                .map(|s| ClientId {
                    session_id,
                    passwd: s.passwd,
                })
                .ok_or(ErrorCode::SessionExpired),
            ConnState::Expired => Err(ErrorCode::SessionExpired),
            ConnState::AuthFailed => Err(ErrorCode::AuthFailed),
            ConnState::Connecting => match conn.resume {
                Some(client_id) => Ok(client_id),
                None => Ok(ClientId {
                    session_id: 0,
                    passwd: [0; 16],
                }),
            },
        }
    }

    fn get(
        &self,
        handle: NativeHandle,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<(Bytes, Stat), ErrorCode> {
        self.with_caller(handle, |tree, caller, _| tree.get(caller, path, watch))
    }

    fn children(
        &self,
        handle: NativeHandle,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<(Vec<String>, Stat), ErrorCode> {
        self.with_caller(handle, |tree, caller, _| tree.children(caller, path, watch))
    }

    fn exists(
        &self,
        handle: NativeHandle,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<Stat, ErrorCode> {
        self.with_caller(handle, |tree, caller, _| tree.exists(caller, path, watch))
    }

    fn create(
        &self,
        handle: NativeHandle,
        path: &str,
        value: &[u8],
        flags: CreateFlags,
        acl: &[Acl],
    ) -> Result<String, ErrorCode> {
        self.with_caller(handle, |tree, caller, fired| {
            tree.create(caller, path, value, flags, acl, fired)
        })
    }

    fn set(
        &self,
        handle: NativeHandle,
        path: &str,
        value: &[u8],
        version: i32,
    ) -> Result<Stat, ErrorCode> {
        self.with_caller(handle, |tree, caller, fired| {
            tree.set(caller, path, value, version, fired)
        })
    }

    fn delete(
        &self,
        handle: NativeHandle,
        path: &str,
        version: i32,
    ) -> Result<(), ErrorCode> {
        self.with_caller(handle, |tree, caller, fired| {
            tree.delete(caller, path, version, fired)
        })
    }

    fn add_auth(
        &self,
        handle: NativeHandle,
        scheme: &str,
        cert: &[u8],
    ) -> Result<(), ErrorCode> {
        // surfaces connectivity and session failures before touching credentials
        self.with_caller(handle, |_, _, _| Ok(()))?;

        let mut state = self.state.lock();
        match authenticate(scheme, cert) {
            Some(id) => {
                if let Some(conn) = state.connections.get_mut(&handle) {
                    if !conn.auth.contains(&id) {
                        conn.auth.push(id);
                    }
                }
                Ok(())
            }
            None => {
                info!(handle = handle.as_raw(), scheme, "authentication failed");
                self.broadcast(&state, handle, SessionState::AuthFailed);
                state.tree.remove_watches(handle);
                if let Some(conn) = state.connections.get_mut(&handle) {
                    conn.state = ConnState::AuthFailed;
                }
                Err(ErrorCode::AuthFailed)
            }
        }
    }

    fn get_acl(
        &self,
        handle: NativeHandle,
        path: &str,
    ) -> Result<(Vec<Acl>, Stat), ErrorCode> {
        self.with_caller(handle, |tree, _, _| tree.get_acl(path))
    }

    fn set_acl(
        &self,
        handle: NativeHandle,
        path: &str,
        acl: &[Acl],
        version: i32,
    ) -> Result<(), ErrorCode> {
        self.with_caller(handle, |tree, caller, _| tree.set_acl(caller, path, acl, version))
    }

    fn wait_for_watch(&self) -> Option<RawNotification> {
        if self.shut_down.load(Ordering::Acquire) {
            return None;
        }
        let notification = self.notify_rx.recv().ok()?;
        if self.shut_down.load(Ordering::Acquire) {
            return None;
        }
        Some(notification)
    }
}
