//! # Supervisor: the application registry and event dispatcher.
//!
//! The [`Supervisor`] owns every [`Application`], routes process-exit and
//! watchdog notifications to the app claiming the PID, enacts the returned
//! fault actions, and arms the soft-to-hard kill escalation timer.
//!
//! ## Architecture
//! ```text
//! commands ──► Supervisor::start()/stop()
//!                   │
//! launcher ──► Supervisor::handle_sigchild(pid, status)
//!                   │         └─► Application::sigchild ──► AppFaultAction
//! watchdog ──► Supervisor::handle_watchdog(pid)
//!                   │         └─► Application::watchdog_expired
//!                   ▼
//!            enact action:
//!              ├─► Ignore      → nothing
//!              ├─► RestartApp  → stop(); restart once Stopped
//!              ├─► StopApp     → stop()
//!              └─► Reboot      → System::reboot()
//!
//! kill timer (per app, 300 ms, one-shot):
//!   armed when a soft kill leaves processes alive; the task holds a weak
//!   registry handle and the app id — on fire it resolves the handle and
//!   hard-kills, or no-ops if the app is gone.
//! ```
//!
//! ## Rules
//! - A PID no application claims is ignored.
//! - An application object is removed from the registry (and destroyed) only
//!   once it has reached Stopped.
//! - The restart of a RestartApp fault is deferred until the app has fully
//!   stopped; the pending disposition rides on the registry entry.
//! - Queries about unknown applications answer Stopped, never an error.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use nix::unistd::Pid;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::app::{basename, AppState, Application, StopOutcome};
use crate::core::ledger::RebootFaultLedger;
use crate::error::AppError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{AppFaultAction, ExitStatus, WatchdogAction};
use crate::ports::{Ports, ProcState};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Opaque handle to a registered application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(u64);

impl AppId {
    /// The raw numeric id.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// What to do with an entry once its application reaches Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopDisposition {
    /// Remove the entry and destroy the application (default).
    Remove,
    /// Start the application again in place (RestartApp fault path).
    Restart,
}

struct AppEntry {
    app: Application,
    disposition: StopDisposition,
}

struct Registry {
    apps: HashMap<AppId, AppEntry>,
    next_id: u64,
}

impl Registry {
    fn insert(&mut self, app: Application) -> AppId {
        self.next_id += 1;
        let id = AppId(self.next_id);
        self.apps.insert(
            id,
            AppEntry {
                app,
                disposition: StopDisposition::Remove,
            },
        );
        id
    }

    fn find_by_name(&self, name: &str) -> Option<AppId> {
        self.apps
            .iter()
            .find(|(_, e)| e.app.name() == name)
            .map(|(id, _)| *id)
    }

    fn find_by_pid(&self, pid: Pid) -> Option<AppId> {
        self.apps
            .iter()
            .find(|(_, e)| e.app.owns_pid(pid))
            .map(|(id, _)| *id)
    }
}

/// Registry of applications and dispatcher for lifecycle events.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    ports: Ports,
    ledger: Arc<RebootFaultLedger>,
    registry: Arc<RwLock<Registry>>,
    subs: Arc<SubscriberSet>,
}

impl Supervisor {
    /// Creates a supervisor with the given config, collaborators, and
    /// subscribers (maybe empty).
    ///
    /// Must be called inside a tokio runtime: this starts the reboot-grace
    /// timer and the subscriber fan-out workers.
    pub fn new(cfg: Config, ports: Ports, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        Self::spawn_subscriber_listener(&bus, &subs);

        let ledger = Arc::new(RebootFaultLedger::new(
            cfg.reboot_fault_record_path.clone(),
            bus.clone(),
        ));
        RebootFaultLedger::spawn_grace_timer(&ledger, cfg.reboot_grace);

        Self {
            cfg,
            bus,
            ports,
            ledger,
            registry: Arc::new(RwLock::new(Registry {
                apps: HashMap::new(),
                next_id: 0,
            })),
            subs,
        }
    }

    /// Constructs and starts the application rooted at `cfg_path`.
    ///
    /// A second start for a name still in the registry is rejected with
    /// [`AppError::AlreadyRunning`]. Construction failures release partial
    /// state and return no handle. A launch failure leaves the entry in place
    /// just long enough to drain the pending kill, then reports
    /// [`AppError::LaunchFailure`].
    pub async fn start(&self, cfg_path: &str) -> Result<AppId, AppError> {
        let mut reg = self.registry.write().await;

        let name = basename(cfg_path);
        if reg.find_by_name(name).is_some() {
            return Err(AppError::AlreadyRunning {
                app: name.to_string(),
            });
        }

        let mut app = Application::create(
            cfg_path,
            &self.cfg,
            self.ports.clone(),
            self.bus.clone(),
            Arc::clone(&self.ledger),
        )?;

        match app.start() {
            Ok(()) => Ok(reg.insert(app)),
            Err(e) => {
                if app.state() == AppState::Running {
                    // Still draining the downgrade-to-stop; keep the entry so
                    // the exits find their way home, then it self-removes.
                    let id = reg.insert(app);
                    self.arm_kill_timer(&mut reg, id);
                }
                Err(e)
            }
        }
    }

    /// Drives the named application toward Stopped.
    ///
    /// Asynchronous in effect: with live processes the transition completes
    /// on the exit event that empties the group. The application object is
    /// removed once Stopped.
    pub async fn stop(&self, name: &str) -> Result<(), AppError> {
        let mut reg = self.registry.write().await;

        let id = reg.find_by_name(name).ok_or_else(|| AppError::NotFound {
            what: name.to_string(),
        })?;

        if let Some(entry) = reg.apps.get_mut(&id) {
            entry.disposition = StopDisposition::Remove;
            if let StopOutcome::Killing = entry.app.stop() {
                self.arm_kill_timer(&mut reg, id);
            }
        }
        self.settle(&mut reg, id);
        Ok(())
    }

    /// Framework shutdown: stops every application, then closes the
    /// subscriber lanes and waits for them to drain what was already
    /// delivered. Exit routing keeps working afterwards; only subscriber
    /// delivery ends.
    pub async fn shutdown(&self) {
        self.stop_all().await;
        self.subs.shutdown().await;
    }

    /// Issues a stop to every running application (framework shutdown sweep).
    pub async fn stop_all(&self) {
        let mut reg = self.registry.write().await;

        let ids: Vec<AppId> = reg.apps.keys().copied().collect();
        for id in ids {
            if let Some(entry) = reg.apps.get_mut(&id) {
                entry.disposition = StopDisposition::Remove;
                if let StopOutcome::Killing = entry.app.stop() {
                    self.arm_kill_timer(&mut reg, id);
                }
            }
            self.settle(&mut reg, id);
        }
    }

    /// Routes one reaped exit to the application owning the PID and enacts
    /// the returned fault action. Unclaimed PIDs are ignored.
    pub async fn handle_sigchild(&self, pid: Pid, status: ExitStatus) -> AppFaultAction {
        let mut reg = self.registry.write().await;

        let id = match reg.find_by_pid(pid) {
            Some(id) => id,
            None => return AppFaultAction::Ignore,
        };

        let action = match reg.apps.get_mut(&id) {
            Some(entry) => entry.app.sigchild(pid, status),
            None => return AppFaultAction::Ignore,
        };

        self.enact(&mut reg, id, action);
        self.settle(&mut reg, id);
        action
    }

    /// Routes a watchdog expiry to the application owning the PID and enacts
    /// app-level actions the same way as exit faults.
    pub async fn handle_watchdog(&self, pid: Pid) -> WatchdogAction {
        let mut reg = self.registry.write().await;

        let id = match reg.find_by_pid(pid) {
            Some(id) => id,
            None => return WatchdogAction::NotFound,
        };

        let action = match reg.apps.get_mut(&id) {
            Some(entry) => entry.app.watchdog_expired(pid),
            None => return WatchdogAction::NotFound,
        };

        match action {
            WatchdogAction::RestartApp => self.enact(&mut reg, id, AppFaultAction::RestartApp),
            WatchdogAction::StopApp => self.enact(&mut reg, id, AppFaultAction::StopApp),
            WatchdogAction::Reboot => self.enact(&mut reg, id, AppFaultAction::Reboot),
            _ => {}
        }
        self.settle(&mut reg, id);
        action
    }

    // ---------------------------
    // Queries
    // ---------------------------

    /// The state of the named application; unknown names read as Stopped.
    pub async fn app_state(&self, name: &str) -> AppState {
        let reg = self.registry.read().await;
        match reg.find_by_name(name) {
            Some(id) => reg
                .apps
                .get(&id)
                .map(|e| e.app.state())
                .unwrap_or(AppState::Stopped),
            None => AppState::Stopped,
        }
    }

    /// The state of one process of the named application; unknown apps and
    /// processes read as Stopped.
    pub async fn proc_state(&self, app_name: &str, proc_name: &str) -> ProcState {
        let reg = self.registry.read().await;
        match reg.find_by_name(app_name) {
            Some(id) => reg
                .apps
                .get(&id)
                .map(|e| e.app.proc_state(proc_name))
                .unwrap_or(ProcState::Stopped),
            None => ProcState::Stopped,
        }
    }

    /// Sorted names of the registered applications.
    pub async fn list(&self) -> Vec<String> {
        let reg = self.registry.read().await;
        let mut names: Vec<String> = reg.apps.values().map(|e| e.app.name().to_string()).collect();
        names.sort_unstable();
        names
    }

    /// A receiver of all future lifecycle events.
    pub fn events(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // ---------------------------
    // Internals
    // ---------------------------

    /// Forwards bus events to the subscriber fan-out set.
    fn spawn_subscriber_listener(bus: &Bus, subs: &Arc<SubscriberSet>) {
        let mut rx = bus.subscribe();
        let set = Arc::clone(subs);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit_arc(Arc::new(ev)),
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });
    }

    /// Enacts one fault action returned by an application handler.
    fn enact(&self, reg: &mut Registry, id: AppId, action: AppFaultAction) {
        match action {
            AppFaultAction::Ignore => {}
            AppFaultAction::RestartApp => {
                if let Some(entry) = reg.apps.get_mut(&id) {
                    entry.disposition = StopDisposition::Restart;
                    if entry.app.state() != AppState::Stopped {
                        if let StopOutcome::Killing = entry.app.stop() {
                            self.arm_kill_timer(reg, id);
                        }
                    }
                }
            }
            AppFaultAction::StopApp => {
                if let Some(entry) = reg.apps.get_mut(&id) {
                    entry.disposition = StopDisposition::Remove;
                    if entry.app.state() != AppState::Stopped {
                        if let StopOutcome::Killing = entry.app.stop() {
                            self.arm_kill_timer(reg, id);
                        }
                    }
                }
            }
            AppFaultAction::Reboot => {
                let mut ev = Event::now(EventKind::RebootRequested);
                if let Some(entry) = reg.apps.get(&id) {
                    ev = ev.with_app(entry.app.name());
                }
                self.bus.publish(ev);
                self.ports.system.reboot();
            }
        }
    }

    /// Applies the entry's disposition once its application has stopped.
    fn settle(&self, reg: &mut Registry, id: AppId) {
        let stopped = reg
            .apps
            .get(&id)
            .map(|e| e.app.state() == AppState::Stopped)
            .unwrap_or(false);
        if !stopped {
            return;
        }

        let disposition = reg
            .apps
            .get(&id)
            .map(|e| e.disposition)
            .unwrap_or(StopDisposition::Remove);

        match disposition {
            StopDisposition::Remove => {
                reg.apps.remove(&id);
            }
            StopDisposition::Restart => {
                if let Some(entry) = reg.apps.get_mut(&id) {
                    // Back to the default so a later natural stop removes it.
                    entry.disposition = StopDisposition::Remove;
                    match entry.app.start() {
                        Ok(()) => {}
                        Err(_) => {
                            if entry.app.state() == AppState::Running {
                                self.arm_kill_timer(reg, id);
                            } else {
                                reg.apps.remove(&id);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Arms the one-shot kill timer for an app unless one is already armed.
    ///
    /// The task holds a weak handle to the registry: if the supervisor (or
    /// the app) is gone when the timer fires, it resolves to a no-op instead
    /// of touching freed state.
    fn arm_kill_timer(&self, reg: &mut Registry, id: AppId) {
        let entry = match reg.apps.get_mut(&id) {
            Some(entry) => entry,
            None => return,
        };
        if entry.app.kill_timer_armed() {
            return;
        }

        let token = CancellationToken::new();
        entry.app.set_kill_timer(token.clone());

        let weak: Weak<RwLock<Registry>> = Arc::downgrade(&self.registry);
        let timeout = self.cfg.kill_timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let registry = match weak.upgrade() {
                        Some(r) => r,
                        None => return,
                    };
                    let mut reg = registry.write().await;
                    if let Some(entry) = reg.apps.get_mut(&id) {
                        entry.app.hard_kill();
                    }
                }
            }
        });
    }
}
