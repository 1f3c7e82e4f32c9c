//! # Application: a named bundle of supervised processes.
//!
//! An [`Application`] owns its [`ProcObject`]s, its resolved identity
//! (uid/gid plus supplementary groups), its sandbox and install paths, and
//! the application-level state machine. It is constructed from a config
//! path, started and stopped as a unit, and consulted by the supervisor on
//! every process exit and watchdog expiry.
//!
//! ## Architecture
//! ```text
//! Supervisor ──► Application::start()
//!                   ├─► sandbox.setup()          (sandboxed apps)
//!                   ├─► limits.apply()
//!                   ├─► install SMACK rules      (self perms, framework, bindings)
//!                   └─► launcher.start*() per process, config order
//!
//! Supervisor ──► Application::stop()             (asynchronous)
//!                   └─► soft kill (SIGTERM)
//!                         ├─► nothing to kill → cleanup → Stopped
//!                         └─► else supervisor arms 300 ms kill timer
//!                               └─► hard kill (SIGKILL) on expiry
//!
//! Supervisor ──► Application::sigchild(pid, status) ──► AppFaultAction
//!                   ├─► classify exit, check fault limit
//!                   ├─► restart in place / escalate to supervisor
//!                   └─► group empty? → cancel timer → cleanup → Stopped
//! ```
//!
//! ## Rules
//! - Processes launch in config order; the first failure stops the app.
//! - Both kill phases freeze the group first so no process misses the
//!   signal, then thaw so the signal can be observed.
//! - A stop handler on a process is planted only by the watchdog path and
//!   cleared by every group kill.
//! - Cleanup (SMACK revoke, sandbox removal, limit clearing) runs on every
//!   transition to Stopped so a later `start()` re-reads fresh config.

use std::path::PathBuf;
use std::sync::Arc;

use nix::sys::signal::Signal;
use nix::unistd::{Gid, Pid, Uid};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::ledger::RebootFaultLedger;
use crate::core::proc::{ProcObject, ProcStopHandler};
use crate::error::AppError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{
    within_fault_window, AppFaultAction, ExitStatus, ProcFaultAction, WatchdogAction,
};
use crate::ports::{AppView, FreezeState, Ports, ProcState, FRAMEWORK_LABEL};

/// Config node holding the sandboxed flag; missing means sandboxed.
const CFG_NODE_SANDBOXED: &str = "sandboxed";
/// Config node listing the app's supplementary groups.
const CFG_NODE_GROUPS: &str = "groups";
/// Config node listing the app's processes.
const CFG_NODE_PROC_LIST: &str = "procs";
/// Config node listing the app's IPC bindings.
const CFG_NODE_BINDINGS: &str = "bindings";
/// Config node holding the app-level watchdog action fallback.
const CFG_NODE_WATCHDOG_ACTION: &str = "watchdogAction";

/// The seven non-empty permission subsets an app gets on its own folders.
const SELF_ACCESS_PERMS: [&str; 7] = ["x", "w", "wx", "r", "rx", "rw", "rwx"];

/// Application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// No monitored process is running.
    Stopped,
    /// At least one monitored process has not been reaped.
    Running,
}

/// What `stop()` observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The app was already stopped; nothing was done.
    AlreadyStopped,
    /// Nothing was left to kill; the app is now Stopped and cleaned up.
    Stopped,
    /// A soft kill was delivered; the caller must arm the kill timer.
    Killing,
}

/// Kill escalation phase.
#[derive(Clone, Copy, PartialEq, Eq)]
enum KillType {
    /// SIGTERM: ask processes to clean up and exit.
    Soft,
    /// SIGKILL: take them down now.
    Hard,
}

/// Result of one group kill.
enum KillOutcome {
    /// At least one process was signalled.
    Signalled,
    /// The group was empty (or the freezer faulted); proceed to cleanup.
    NothingToKill,
}

/// A named bundle of processes with common identity, sandbox, and config.
pub struct Application {
    name: String,
    cfg_path: String,
    sandboxed: bool,
    install_path: PathBuf,
    sandbox_path: PathBuf,
    uid: Uid,
    gid: Gid,
    supplement_gids: Vec<Gid>,
    state: AppState,
    procs: Vec<ProcObject>,
    kill_timer: Option<CancellationToken>,
    cfg: Config,
    ports: Ports,
    bus: Bus,
    ledger: Arc<RebootFaultLedger>,
}

/// Returns the last path segment, tolerating a trailing slash.
pub(crate) fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit('/').next() {
        Some(last) => last,
        None => trimmed,
    }
}

impl Application {
    /// Constructs an application from its config path.
    ///
    /// The name is the basename of `cfg_path`. Identity resolution, sandbox
    /// path lookup, and process-record creation all happen here; any failure
    /// abandons construction and releases partial state.
    pub fn create(
        cfg_path: &str,
        cfg: &Config,
        ports: Ports,
        bus: Bus,
        ledger: Arc<RebootFaultLedger>,
    ) -> Result<Self, AppError> {
        let name = basename(cfg_path).to_string();
        let txn = ports.config.read_txn(cfg_path);

        let sandboxed = txn.get_bool(CFG_NODE_SANDBOXED, true);

        let (uid, gid, supplement_gids) = if sandboxed {
            let user_name = ports.users.app_user_name(&name)?;
            let (uid, gid) = ports.users.ids_of(&user_name)?;

            let groups = txn.children(CFG_NODE_GROUPS);
            if groups.len() > cfg.max_supplementary_groups {
                return Err(AppError::ConfigOverflow {
                    path: format!("{cfg_path}/{CFG_NODE_GROUPS}"),
                });
            }

            let mut gids = Vec::with_capacity(groups.len());
            for group in &groups {
                gids.push(ports.users.create_group(group.name())?);
            }
            (uid, gid, gids)
        } else {
            (Uid::from_raw(0), Gid::from_raw(0), Vec::new())
        };

        let install_path = cfg.apps_install_dir.join(&name);

        let sandbox_path = if sandboxed {
            ports.sandbox.get_path(&name)?
        } else {
            PathBuf::new()
        };

        let mut procs: Vec<ProcObject> = Vec::new();
        for node in txn.children(CFG_NODE_PROC_LIST) {
            match ports.launcher.create(node.path(), &name) {
                Ok(id) => procs.push(ProcObject::new(id)),
                Err(e) => {
                    for po in &procs {
                        ports.launcher.destroy(po.proc());
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            name,
            cfg_path: cfg_path.to_string(),
            sandboxed,
            install_path,
            sandbox_path,
            uid,
            gid,
            supplement_gids,
            state: AppState::Stopped,
            procs,
            kill_timer: None,
            cfg: cfg.clone(),
            ports,
            bus,
            ledger,
        })
    }

    /// Starts the application: sandbox, resource limits, SMACK rules, then
    /// every process in config order.
    ///
    /// A per-process launch failure downgrades to `stop()` and reports the
    /// launch error; the caller must then drive the pending kill like any
    /// other stop.
    pub fn start(&mut self) -> Result<(), AppError> {
        if self.state == AppState::Running {
            return Err(AppError::AlreadyRunning {
                app: self.name.clone(),
            });
        }

        self.bus
            .publish(Event::now(EventKind::AppStarting).with_app(&self.name));

        if self.sandboxed {
            self.ports.sandbox.setup(&self.view())?;
        }
        self.ports.limits.apply(&self.view())?;
        self.install_smack_rules();

        for idx in 0..self.procs.len() {
            if let Err(e) = self.launch_proc(idx) {
                self.bus.publish(
                    Event::now(EventKind::AppStartFailed)
                        .with_app(&self.name)
                        .with_error(e.to_string()),
                );
                // Procs launched so far are live; run the normal stop path.
                self.state = AppState::Running;
                self.stop();
                return Err(e);
            }
            let proc = self.procs[idx].proc();
            let mut ev = Event::now(EventKind::ProcLaunched)
                .with_app(&self.name)
                .with_proc(self.ports.launcher.name(proc));
            if let Some(pid) = self.ports.launcher.pid(proc) {
                ev = ev.with_pid(pid.as_raw());
            }
            self.bus.publish(ev);
        }

        self.state = AppState::Running;
        self.bus
            .publish(Event::now(EventKind::AppStarted).with_app(&self.name));
        Ok(())
    }

    /// Stops the application. Asynchronous: the final Stopped transition
    /// happens on the process-exit event that empties the group, unless there
    /// was nothing to kill in the first place.
    ///
    /// Never fails; stopping a stopped app is a warned no-op.
    pub fn stop(&mut self) -> StopOutcome {
        if self.state == AppState::Stopped {
            self.bus.publish(
                Event::now(EventKind::AppStopping)
                    .with_app(&self.name)
                    .with_error("already_stopped"),
            );
            return StopOutcome::AlreadyStopped;
        }

        self.bus
            .publish(Event::now(EventKind::AppStopping).with_app(&self.name));

        match self.kill_procs(KillType::Soft) {
            KillOutcome::NothingToKill => {
                self.finish_stop();
                StopOutcome::Stopped
            }
            KillOutcome::Signalled => StopOutcome::Killing,
        }
    }

    /// Repeats the kill sequence with SIGKILL. Invoked by the supervisor when
    /// the kill timer expires.
    pub(crate) fn hard_kill(&mut self) {
        self.kill_procs(KillType::Hard);
    }

    /// Handles one reaped exit belonging to this application.
    ///
    /// Returns the single fault action the supervisor must enact (default
    /// [`AppFaultAction::Ignore`]). A PID this app does not own is ignored.
    pub fn sigchild(&mut self, pid: Pid, status: ExitStatus) -> AppFaultAction {
        let mut action = AppFaultAction::Ignore;

        if let Some(idx) = self.find_proc(pid) {
            let proc = self.procs[idx].proc();
            let proc_name = self.ports.launcher.name(proc);

            // The launcher updates the fault time while classifying, so the
            // previous one must be read first.
            let prev_fault_time = self.ports.launcher.fault_time(proc);
            let fault_action = self.ports.launcher.sigchild(proc, status);

            self.bus.publish(
                Event::now(EventKind::ProcExited)
                    .with_app(&self.name)
                    .with_proc(&proc_name)
                    .with_pid(pid.as_raw())
                    .with_action(fault_action.as_label()),
            );

            if self.reached_fault_limit(proc, &proc_name, fault_action, prev_fault_time) {
                self.bus.publish(
                    Event::now(EventKind::FaultLimitReached)
                        .with_app(&self.name)
                        .with_proc(&proc_name)
                        .with_action(fault_action.as_label()),
                );
                action = AppFaultAction::StopApp;
            } else {
                action = self.dispatch_fault(idx, &proc_name, fault_action);
            }
        }

        if self.ports.freezer.is_empty(&self.name) {
            if let Some(timer) = self.kill_timer.take() {
                timer.cancel();
            }
            if self.state == AppState::Running {
                self.finish_stop();
            }
        }

        action
    }

    /// Applies one classified fault, restarting in place where the policy
    /// says so and escalating the rest.
    fn dispatch_fault(
        &mut self,
        idx: usize,
        proc_name: &str,
        fault_action: ProcFaultAction,
    ) -> AppFaultAction {
        match fault_action {
            ProcFaultAction::NoFault => {
                // A deliberate kill. The watchdog may have left a stop
                // handler asking for a relaunch.
                if let Some(ProcStopHandler::Restart) = self.procs[idx].take_stop_handler() {
                    if self.launch_proc(idx).is_ok() {
                        self.publish_restarted(idx, proc_name);
                    } else {
                        return AppFaultAction::StopApp;
                    }
                }
                AppFaultAction::Ignore
            }
            ProcFaultAction::Ignore => {
                self.publish_fault(proc_name, fault_action);
                AppFaultAction::Ignore
            }
            ProcFaultAction::Restart => {
                self.publish_fault(proc_name, fault_action);
                if self.launch_proc(idx).is_ok() {
                    self.publish_restarted(idx, proc_name);
                    AppFaultAction::Ignore
                } else {
                    AppFaultAction::StopApp
                }
            }
            ProcFaultAction::RestartApp => {
                self.publish_fault(proc_name, fault_action);
                AppFaultAction::RestartApp
            }
            ProcFaultAction::StopApp => {
                self.publish_fault(proc_name, fault_action);
                AppFaultAction::StopApp
            }
            ProcFaultAction::Reboot => {
                self.publish_fault(proc_name, fault_action);
                // Recovery after the reboot must observe the record, so it is
                // written before the action is returned.
                self.ledger.write(&self.name, proc_name);
                AppFaultAction::Reboot
            }
        }
    }

    /// Handles a watchdog expiry for a process of this application.
    ///
    /// Process-level remediation (stop, restart, ignore) happens here and
    /// returns [`WatchdogAction::Handled`]; app-level actions are returned
    /// for the supervisor to enact.
    pub fn watchdog_expired(&mut self, pid: Pid) -> WatchdogAction {
        let idx = match self.find_proc(pid) {
            Some(idx) => idx,
            None => return WatchdogAction::NotFound,
        };
        let proc = self.procs[idx].proc();
        let proc_name = self.ports.launcher.name(proc);

        let mut action = self.ports.launcher.watchdog_action(proc);

        // No usable per-process policy: give the app-level config key a
        // chance before falling back.
        if matches!(action, WatchdogAction::NotFound | WatchdogAction::Error) {
            let txn = self.ports.config.read_txn(&self.cfg_path);
            if let Some(s) = txn.get_string(CFG_NODE_WATCHDOG_ACTION) {
                action = WatchdogAction::from_config_str(&s);
            }
        }

        self.bus.publish(
            Event::now(EventKind::WatchdogExpired)
                .with_app(&self.name)
                .with_proc(&proc_name)
                .with_pid(pid.as_raw())
                .with_action(action.as_label()),
        );

        match action {
            WatchdogAction::NotFound => {
                // No policy anywhere; restart the process by default.
                self.bus.publish(
                    Event::now(EventKind::WatchdogExpired)
                        .with_app(&self.name)
                        .with_proc(&proc_name)
                        .with_error("no_watchdog_policy_defaulting_to_restart"),
                );
                self.procs[idx].set_stop_handler(ProcStopHandler::Restart);
                self.stop_proc(idx);
                WatchdogAction::Handled
            }
            WatchdogAction::Ignore => WatchdogAction::Handled,
            WatchdogAction::Stop => {
                self.stop_proc(idx);
                WatchdogAction::Handled
            }
            WatchdogAction::Restart => {
                self.procs[idx].set_stop_handler(ProcStopHandler::Restart);
                self.stop_proc(idx);
                WatchdogAction::Handled
            }
            WatchdogAction::RestartApp | WatchdogAction::StopApp | WatchdogAction::Reboot => action,
            WatchdogAction::Error => {
                self.bus.publish(
                    Event::now(EventKind::WatchdogExpired)
                        .with_app(&self.name)
                        .with_proc(&proc_name)
                        .with_error("watchdog_action_unreadable"),
                );
                WatchdogAction::Handled
            }
            WatchdogAction::Handled => WatchdogAction::Handled,
        }
    }

    // ---------------------------
    // Queries
    // ---------------------------

    /// The application state.
    pub fn state(&self) -> AppState {
        self.state
    }

    /// The state of one named process; Stopped when the app is stopped or
    /// the process is unknown.
    pub fn proc_state(&self, proc_name: &str) -> ProcState {
        if self.state == AppState::Stopped {
            return ProcState::Stopped;
        }
        for po in &self.procs {
            if self.ports.launcher.name(po.proc()) == proc_name {
                return self.ports.launcher.state(po.proc());
            }
        }
        ProcState::Stopped
    }

    /// The application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The application's user id.
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// The application's primary group id.
    pub fn gid(&self) -> Gid {
        self.gid
    }

    /// True for sandboxed applications.
    pub fn is_sandboxed(&self) -> bool {
        self.sandboxed
    }

    /// The install directory path.
    pub fn install_path(&self) -> &std::path::Path {
        &self.install_path
    }

    /// The sandbox root path (empty for unsandboxed apps).
    pub fn sandbox_path(&self) -> &std::path::Path {
        &self.sandbox_path
    }

    /// The application's config path.
    pub fn config_path(&self) -> &str {
        &self.cfg_path
    }

    /// True when one of this app's processes currently has this PID.
    pub fn owns_pid(&self, pid: Pid) -> bool {
        self.find_proc(pid).is_some()
    }

    // ---------------------------
    // Kill timer slot
    // ---------------------------

    /// True while a kill timer is armed for this app.
    pub(crate) fn kill_timer_armed(&self) -> bool {
        self.kill_timer.is_some()
    }

    /// Stores the token of the armed kill timer.
    pub(crate) fn set_kill_timer(&mut self, token: CancellationToken) {
        self.kill_timer = Some(token);
    }

    // ---------------------------
    // Internals
    // ---------------------------

    fn view(&self) -> AppView<'_> {
        AppView {
            name: &self.name,
            uid: self.uid,
            gid: self.gid,
            sandboxed: self.sandboxed,
            install_path: &self.install_path,
            sandbox_path: &self.sandbox_path,
        }
    }

    fn find_proc(&self, pid: Pid) -> Option<usize> {
        self.procs
            .iter()
            .position(|po| self.ports.launcher.pid(po.proc()) == Some(pid))
    }

    /// Launches one process through the entrypoint matching the app's
    /// sandbox mode.
    fn launch_proc(&self, idx: usize) -> Result<(), AppError> {
        let proc = self.procs[idx].proc();
        if self.sandboxed {
            self.ports.launcher.start_sandboxed(
                proc,
                std::path::Path::new("/"),
                self.uid,
                self.gid,
                &self.supplement_gids,
                &self.sandbox_path,
            )
        } else {
            self.ports.launcher.start(proc, &self.install_path)
        }
    }

    /// Installs the app's SMACK rule set: the seven self-permission rules,
    /// the framework pair, and one rw pair per bound server.
    fn install_smack_rules(&self) {
        let label = self.ports.smack.label(&self.name);

        for perms in SELF_ACCESS_PERMS {
            let dir_label = self.ports.smack.access_label(&self.name, perms);
            self.ports.smack.set_rule(&label, perms, &dir_label);
        }

        self.ports.smack.set_rule(FRAMEWORK_LABEL, "w", &label);
        self.ports.smack.set_rule(&label, "rw", FRAMEWORK_LABEL);

        let txn = self.ports.config.read_txn(&self.cfg_path);
        for binding in txn.children(CFG_NODE_BINDINGS) {
            if let Some(server) = binding.get_string("app") {
                if !server.is_empty() {
                    let server_label = self.ports.smack.label(&server);
                    self.ports.smack.set_rule(&label, "rw", &server_label);
                    self.ports.smack.set_rule(&server_label, "rw", &label);
                }
            }
        }
    }

    /// Freezes the group, marks live processes stopping, signals the whole
    /// group, and thaws it.
    fn kill_procs(&mut self, kill: KillType) -> KillOutcome {
        match self.ports.freezer.freeze(&self.name) {
            Ok(()) => {
                let mut settled = false;
                for _ in 0..self.cfg.freeze_poll_max {
                    match self.ports.freezer.state(&self.name) {
                        FreezeState::Frozen => {
                            settled = true;
                            break;
                        }
                        FreezeState::Fault => {
                            self.publish_freezer_fault("freeze_state_fault");
                            settled = true;
                            break;
                        }
                        FreezeState::Freezing | FreezeState::Thawed => {}
                    }
                }
                if !settled {
                    self.publish_freezer_fault("freeze_poll_timeout");
                }
            }
            Err(_) => self.publish_freezer_fault("freeze_failed"),
        }

        // Live processes are about to be killed on purpose: make sure their
        // exits read as kills, and drop any pending restart request.
        for po in &mut self.procs {
            if self.ports.launcher.state(po.proc()) != ProcState::Stopped {
                po.clear_stop_handler();
                self.ports.launcher.stopping(po.proc());
            }
        }

        let (signal, kind) = match kill {
            KillType::Soft => (Signal::SIGTERM, EventKind::SoftKill),
            KillType::Hard => (Signal::SIGKILL, EventKind::HardKill),
        };

        let outcome = match self.ports.freezer.send_signal(&self.name, signal) {
            Ok(0) => KillOutcome::NothingToKill,
            Ok(_) => {
                self.bus
                    .publish(Event::now(kind).with_app(&self.name));
                KillOutcome::Signalled
            }
            Err(_) => {
                self.publish_freezer_fault("send_signal_failed");
                KillOutcome::NothingToKill
            }
        };

        if self.ports.freezer.thaw(&self.name).is_err() {
            self.publish_freezer_fault("thaw_failed");
        }

        outcome
    }

    /// Marks one process stopping and SIGKILLs its PID (watchdog path).
    fn stop_proc(&self, idx: usize) {
        let proc = self.procs[idx].proc();
        self.ports.launcher.stopping(proc);
        if let Some(pid) = self.ports.launcher.pid(proc) {
            self.ports.launcher.kill_hard(pid);
        }
    }

    /// Cleanup + transition to Stopped.
    fn finish_stop(&mut self) {
        self.cleanup();
        self.state = AppState::Stopped;
        self.bus
            .publish(Event::now(EventKind::AppStopped).with_app(&self.name));
    }

    /// Revokes SMACK rules, removes the sandbox, clears resource limits.
    fn cleanup(&mut self) {
        let label = self.ports.smack.label(&self.name);
        self.ports.smack.revoke_subject(&label);

        if self.sandboxed {
            if let Err(e) = self.ports.sandbox.remove(&self.view()) {
                self.bus.publish(
                    Event::now(EventKind::AppStopped)
                        .with_app(&self.name)
                        .with_error(format!("sandbox removal failed: {e}")),
                );
            }
        }

        if let Err(e) = self.ports.limits.clear(&self.view()) {
            self.bus.publish(
                Event::now(EventKind::AppStopped)
                    .with_app(&self.name)
                    .with_error(format!("resource limit cleanup failed: {e}")),
            );
        }
    }

    fn reached_fault_limit(
        &self,
        proc: crate::ports::ProcId,
        proc_name: &str,
        action: ProcFaultAction,
        prev_fault_time: Option<std::time::SystemTime>,
    ) -> bool {
        match action {
            ProcFaultAction::Restart | ProcFaultAction::RestartApp => within_fault_window(
                prev_fault_time,
                self.ports.launcher.fault_time(proc),
                self.cfg.fault_limit_window,
            ),
            ProcFaultAction::Reboot => self.ledger.is_for(&self.name, proc_name),
            _ => false,
        }
    }

    fn publish_fault(&self, proc_name: &str, action: ProcFaultAction) {
        self.bus.publish(
            Event::now(EventKind::FaultDetected)
                .with_app(&self.name)
                .with_proc(proc_name)
                .with_action(action.as_label()),
        );
    }

    fn publish_restarted(&self, idx: usize, proc_name: &str) {
        let mut ev = Event::now(EventKind::ProcRestarted)
            .with_app(&self.name)
            .with_proc(proc_name);
        if let Some(pid) = self.ports.launcher.pid(self.procs[idx].proc()) {
            ev = ev.with_pid(pid.as_raw());
        }
        self.bus.publish(ev);
    }

    fn publish_freezer_fault(&self, reason: &'static str) {
        self.bus.publish(
            Event::now(EventKind::FreezerFault)
                .with_app(&self.name)
                .with_error(reason),
        );
    }
}

impl Drop for Application {
    /// Frees the launcher-side process records, in list order.
    fn drop(&mut self) {
        for po in &self.procs {
            self.ports.launcher.destroy(po.proc());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::basename;

    #[test]
    fn basename_takes_last_segment() {
        assert_eq!(basename("/apps/cam"), "cam");
        assert_eq!(basename("/apps/cam/"), "cam");
        assert_eq!(basename("cam"), "cam");
    }
}
