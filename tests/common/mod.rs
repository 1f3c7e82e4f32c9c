//! In-memory collaborator fakes shared by the integration tests.
//!
//! The fakes record every call so scenarios can assert on what the core
//! actually drove: launches, group signals, SMACK rules, sandbox setups,
//! reboot requests. The launcher and freezer share state so the freezer's
//! group view (liveness, signal counts) tracks the launcher's PIDs.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use nix::sys::signal::Signal;
use nix::unistd::{Gid, Pid, Uid};

use appvisor::policies::classify_exit;
use appvisor::ports::{
    AppView, ConfigTree, ConfigTxn, FreezeState, Freezer, Launcher, Ports, ProcId, ResourceLimits,
    Sandbox, SmackCtl, System, UserDb,
};
use appvisor::{AppError, Config, ExitStatus, FaultAction, ProcFaultAction, ProcState, WatchdogAction};

// ---------------------------
// Config tree
// ---------------------------

#[derive(Default)]
struct TreeData {
    bools: HashMap<(String, String), bool>,
    strings: HashMap<(String, String), String>,
    children: HashMap<(String, String), Vec<String>>,
}

/// Hierarchical config tree with explicit, ordered children.
#[derive(Default)]
pub struct FakeConfigTree {
    data: Arc<Mutex<TreeData>>,
}

impl FakeConfigTree {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_bool(&self, node: &str, key: &str, value: bool) {
        let mut data = self.data.lock().unwrap();
        data.bools.insert((node.to_string(), key.to_string()), value);
    }

    pub fn set_string(&self, node: &str, key: &str, value: &str) {
        let mut data = self.data.lock().unwrap();
        data.strings
            .insert((node.to_string(), key.to_string()), value.to_string());
    }

    /// Registers `node/key/child` and returns its path; children keep
    /// insertion order.
    pub fn add_child(&self, node: &str, key: &str, child: &str) -> String {
        let path = format!("{node}/{key}/{child}");
        let mut data = self.data.lock().unwrap();
        data.children
            .entry((node.to_string(), key.to_string()))
            .or_default()
            .push(path.clone());
        path
    }
}

struct FakeTxn {
    path: String,
    data: Arc<Mutex<TreeData>>,
}

impl ConfigTxn for FakeTxn {
    fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        let data = self.data.lock().unwrap();
        data.bools
            .get(&(self.path.clone(), key.to_string()))
            .copied()
            .unwrap_or(default)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        let data = self.data.lock().unwrap();
        data.strings
            .get(&(self.path.clone(), key.to_string()))
            .cloned()
    }

    fn children(&self, key: &str) -> Vec<Box<dyn ConfigTxn>> {
        let data = self.data.lock().unwrap();
        data.children
            .get(&(self.path.clone(), key.to_string()))
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|path| {
                Box::new(FakeTxn {
                    path,
                    data: Arc::clone(&self.data),
                }) as Box<dyn ConfigTxn>
            })
            .collect()
    }
}

impl ConfigTree for FakeConfigTree {
    fn read_txn(&self, path: &str) -> Box<dyn ConfigTxn> {
        Box::new(FakeTxn {
            path: path.trim_end_matches('/').to_string(),
            data: Arc::clone(&self.data),
        })
    }
}

// ---------------------------
// Launcher
// ---------------------------

struct ProcRec {
    name: String,
    app: String,
    pid: Option<i32>,
    state: ProcState,
    stopping: bool,
    fault_time: Option<SystemTime>,
    policy: FaultAction,
    wdog: WatchdogAction,
}

#[derive(Default)]
struct LauncherData {
    next_proc: u64,
    next_pid: i32,
    procs: HashMap<u64, ProcRec>,
    launches: Vec<String>,
    sandboxed_launches: Vec<String>,
    plain_launches: Vec<String>,
    hard_kills: Vec<i32>,
    destroyed: usize,
    fail_start: HashSet<String>,
    policies: HashMap<String, FaultAction>,
    wdogs: HashMap<String, WatchdogAction>,
    next_fault_time: Option<SystemTime>,
}

/// Launcher fake: hands out PIDs and classifies exits with the shared
/// policy contract. Nothing actually runs; tests deliver the exits.
#[derive(Default)]
pub struct FakeLauncher {
    data: Mutex<LauncherData>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Configures the fault policy the named process is created with.
    pub fn set_policy(&self, proc_name: &str, policy: FaultAction) {
        let mut data = self.data.lock().unwrap();
        data.policies.insert(proc_name.to_string(), policy);
        for rec in data.procs.values_mut() {
            if rec.name == proc_name {
                rec.policy = policy;
            }
        }
    }

    /// Configures the watchdog action the named process is created with.
    pub fn set_watchdog(&self, proc_name: &str, action: WatchdogAction) {
        let mut data = self.data.lock().unwrap();
        data.wdogs.insert(proc_name.to_string(), action);
        for rec in data.procs.values_mut() {
            if rec.name == proc_name {
                rec.wdog = action;
            }
        }
    }

    /// Makes every launch of the named process fail.
    pub fn fail_start(&self, proc_name: &str) {
        let mut data = self.data.lock().unwrap();
        data.fail_start.insert(proc_name.to_string());
    }

    /// Forces the fault time recorded for the next faulty exit.
    pub fn set_next_fault_time(&self, t: SystemTime) {
        self.data.lock().unwrap().next_fault_time = Some(t);
    }

    /// The PID of a running process, by app and process name.
    pub fn pid_of(&self, app: &str, proc_name: &str) -> Pid {
        let data = self.data.lock().unwrap();
        let raw = data
            .procs
            .values()
            .find(|r| r.app == app && r.name == proc_name)
            .and_then(|r| r.pid)
            .expect("process has no pid");
        Pid::from_raw(raw)
    }

    /// How many times the named process has been launched.
    pub fn launch_count(&self, proc_name: &str) -> usize {
        let data = self.data.lock().unwrap();
        data.launches.iter().filter(|n| *n == proc_name).count()
    }

    pub fn sandboxed_launches(&self) -> Vec<String> {
        self.data.lock().unwrap().sandboxed_launches.clone()
    }

    pub fn plain_launches(&self) -> Vec<String> {
        self.data.lock().unwrap().plain_launches.clone()
    }

    pub fn hard_kills(&self) -> Vec<i32> {
        self.data.lock().unwrap().hard_kills.clone()
    }

    pub fn destroyed(&self) -> usize {
        self.data.lock().unwrap().destroyed
    }

    pub fn created(&self) -> usize {
        self.data.lock().unwrap().next_proc as usize
    }

    fn live_pids(&self, app: &str) -> Vec<i32> {
        let data = self.data.lock().unwrap();
        data.procs
            .values()
            .filter(|r| r.app == app)
            .filter_map(|r| r.pid)
            .collect()
    }

    fn launch(&self, proc: ProcId, sandboxed: bool) -> Result<(), AppError> {
        let mut guard = self.data.lock().unwrap();
        let data = &mut *guard;
        data.next_pid += 1;
        let pid = data.next_pid;
        let rec = data.procs.get_mut(&proc.0).expect("unknown proc record");
        if data.fail_start.contains(&rec.name) {
            return Err(AppError::LaunchFailure {
                app: rec.app.clone(),
                proc_name: rec.name.clone(),
            });
        }
        rec.pid = Some(pid);
        rec.state = ProcState::Running;
        rec.stopping = false;
        let name = rec.name.clone();
        data.launches.push(name.clone());
        if sandboxed {
            data.sandboxed_launches.push(name);
        } else {
            data.plain_launches.push(name);
        }
        Ok(())
    }
}

impl Launcher for FakeLauncher {
    fn create(&self, cfg_path: &str, app_name: &str) -> Result<ProcId, AppError> {
        let mut data = self.data.lock().unwrap();
        let name = cfg_path
            .rsplit('/')
            .next()
            .unwrap_or(cfg_path)
            .to_string();
        let policy = data.policies.get(&name).copied().unwrap_or_default();
        let wdog = data
            .wdogs
            .get(&name)
            .copied()
            .unwrap_or(WatchdogAction::NotFound);
        data.next_proc += 1;
        let id = data.next_proc;
        data.procs.insert(
            id,
            ProcRec {
                name,
                app: app_name.to_string(),
                pid: None,
                state: ProcState::Stopped,
                stopping: false,
                fault_time: None,
                policy,
                wdog,
            },
        );
        Ok(ProcId(id))
    }

    fn destroy(&self, proc: ProcId) {
        let mut data = self.data.lock().unwrap();
        data.procs.remove(&proc.0);
        data.destroyed += 1;
    }

    fn name(&self, proc: ProcId) -> String {
        self.data.lock().unwrap().procs[&proc.0].name.clone()
    }

    fn pid(&self, proc: ProcId) -> Option<Pid> {
        self.data.lock().unwrap().procs[&proc.0]
            .pid
            .map(Pid::from_raw)
    }

    fn state(&self, proc: ProcId) -> ProcState {
        self.data.lock().unwrap().procs[&proc.0].state
    }

    fn fault_time(&self, proc: ProcId) -> Option<SystemTime> {
        self.data.lock().unwrap().procs[&proc.0].fault_time
    }

    fn watchdog_action(&self, proc: ProcId) -> WatchdogAction {
        self.data.lock().unwrap().procs[&proc.0].wdog
    }

    fn start(&self, proc: ProcId, _install_path: &Path) -> Result<(), AppError> {
        self.launch(proc, false)
    }

    fn start_sandboxed(
        &self,
        proc: ProcId,
        _working_dir: &Path,
        _uid: Uid,
        _gid: Gid,
        _supplement_gids: &[Gid],
        _sandbox_path: &Path,
    ) -> Result<(), AppError> {
        self.launch(proc, true)
    }

    fn stopping(&self, proc: ProcId) {
        let mut data = self.data.lock().unwrap();
        if let Some(rec) = data.procs.get_mut(&proc.0) {
            rec.stopping = true;
        }
    }

    fn kill_hard(&self, pid: Pid) {
        self.data.lock().unwrap().hard_kills.push(pid.as_raw());
    }

    fn sigchild(&self, proc: ProcId, status: ExitStatus) -> ProcFaultAction {
        let mut data = self.data.lock().unwrap();
        let forced = data.next_fault_time.take();
        let rec = data.procs.get_mut(&proc.0).expect("unknown proc record");
        let action = classify_exit(status, rec.stopping, rec.policy);
        if action != ProcFaultAction::NoFault {
            rec.fault_time = Some(forced.unwrap_or_else(SystemTime::now));
        }
        rec.pid = None;
        rec.state = ProcState::Stopped;
        rec.stopping = false;
        action
    }
}

// ---------------------------
// Freezer
// ---------------------------

#[derive(Default)]
struct FreezerData {
    frozen: HashSet<String>,
    signals: Vec<(String, Signal)>,
    fault_mode: bool,
}

/// Freezer fake backed by the launcher's PID view.
pub struct FakeFreezer {
    launcher: Arc<FakeLauncher>,
    data: Mutex<FreezerData>,
}

impl FakeFreezer {
    pub fn new(launcher: Arc<FakeLauncher>) -> Arc<Self> {
        Arc::new(Self {
            launcher,
            data: Mutex::new(FreezerData::default()),
        })
    }

    /// Makes `state()` report a fault (the kill sequence must continue).
    pub fn set_fault_mode(&self, on: bool) {
        self.data.lock().unwrap().fault_mode = on;
    }

    /// How many times `signal` was delivered to the named group.
    pub fn signal_count(&self, app: &str, signal: Signal) -> usize {
        let data = self.data.lock().unwrap();
        data.signals
            .iter()
            .filter(|(a, s)| a == app && *s == signal)
            .count()
    }
}

impl Freezer for FakeFreezer {
    fn freeze(&self, app_name: &str) -> Result<(), AppError> {
        let mut data = self.data.lock().unwrap();
        data.frozen.insert(app_name.to_string());
        Ok(())
    }

    fn thaw(&self, app_name: &str) -> Result<(), AppError> {
        let mut data = self.data.lock().unwrap();
        data.frozen.remove(app_name);
        Ok(())
    }

    fn state(&self, app_name: &str) -> FreezeState {
        let data = self.data.lock().unwrap();
        if data.fault_mode {
            FreezeState::Fault
        } else if data.frozen.contains(app_name) {
            FreezeState::Frozen
        } else {
            FreezeState::Thawed
        }
    }

    fn send_signal(&self, app_name: &str, signal: Signal) -> Result<usize, AppError> {
        let count = self.launcher.live_pids(app_name).len();
        let mut data = self.data.lock().unwrap();
        data.signals.push((app_name.to_string(), signal));
        Ok(count)
    }

    fn is_empty(&self, app_name: &str) -> bool {
        self.launcher.live_pids(app_name).is_empty()
    }
}

// ---------------------------
// Sandbox / limits / smack / users / system
// ---------------------------

#[derive(Default)]
pub struct FakeSandbox {
    pub setups: Mutex<Vec<String>>,
    pub removes: Mutex<Vec<String>>,
    pub fail_setup: Mutex<bool>,
}

impl FakeSandbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Sandbox for FakeSandbox {
    fn get_path(&self, app_name: &str) -> Result<PathBuf, AppError> {
        Ok(PathBuf::from(format!("/tmp/appvisor/sandboxes/{app_name}")))
    }

    fn setup(&self, app: &AppView<'_>) -> Result<(), AppError> {
        if *self.fail_setup.lock().unwrap() {
            return Err(AppError::SandboxFailure {
                app: app.name.to_string(),
            });
        }
        self.setups.lock().unwrap().push(app.name.to_string());
        Ok(())
    }

    fn remove(&self, app: &AppView<'_>) -> Result<(), AppError> {
        self.removes.lock().unwrap().push(app.name.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLimits {
    pub applies: Mutex<Vec<String>>,
    pub clears: Mutex<Vec<String>>,
}

impl FakeLimits {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl ResourceLimits for FakeLimits {
    fn apply(&self, app: &AppView<'_>) -> Result<(), AppError> {
        self.applies.lock().unwrap().push(app.name.to_string());
        Ok(())
    }

    fn clear(&self, app: &AppView<'_>) -> Result<(), AppError> {
        self.clears.lock().unwrap().push(app.name.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSmack {
    pub rules: Mutex<Vec<(String, String, String)>>,
    pub revoked: Mutex<Vec<String>>,
}

impl FakeSmack {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn has_rule(&self, subject: &str, perms: &str, object: &str) -> bool {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .any(|(s, p, o)| s == subject && p == perms && o == object)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.lock().unwrap().len()
    }
}

impl SmackCtl for FakeSmack {
    fn set_rule(&self, subject: &str, perms: &str, object: &str) {
        self.rules.lock().unwrap().push((
            subject.to_string(),
            perms.to_string(),
            object.to_string(),
        ));
    }

    fn revoke_subject(&self, label: &str) {
        self.revoked.lock().unwrap().push(label.to_string());
        self.rules.lock().unwrap().retain(|(s, _, _)| s != label);
    }
}

#[derive(Default)]
pub struct FakeUserDb {
    pub created_groups: Mutex<Vec<String>>,
    next_gid: AtomicUsize,
}

impl FakeUserDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created_groups: Mutex::new(Vec::new()),
            next_gid: AtomicUsize::new(2000),
        })
    }
}

impl UserDb for FakeUserDb {
    fn ids_of(&self, _user_name: &str) -> Result<(Uid, Gid), AppError> {
        Ok((Uid::from_raw(1000), Gid::from_raw(1000)))
    }

    fn create_group(&self, group_name: &str) -> Result<Gid, AppError> {
        self.created_groups
            .lock()
            .unwrap()
            .push(group_name.to_string());
        let gid = self.next_gid.fetch_add(1, Ordering::Relaxed) as u32;
        Ok(Gid::from_raw(gid))
    }
}

#[derive(Default)]
pub struct FakeSystem {
    reboots: AtomicUsize,
}

impl FakeSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reboots(&self) -> usize {
        self.reboots.load(Ordering::Relaxed)
    }
}

impl System for FakeSystem {
    fn reboot(&self) {
        self.reboots.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------
// World
// ---------------------------

/// The full fake collaborator bundle plus config-building helpers.
pub struct World {
    pub tree: Arc<FakeConfigTree>,
    pub launcher: Arc<FakeLauncher>,
    pub freezer: Arc<FakeFreezer>,
    pub sandbox: Arc<FakeSandbox>,
    pub limits: Arc<FakeLimits>,
    pub smack: Arc<FakeSmack>,
    pub users: Arc<FakeUserDb>,
    pub system: Arc<FakeSystem>,
}

impl World {
    pub fn new() -> Self {
        let launcher = FakeLauncher::new();
        Self {
            tree: FakeConfigTree::new(),
            freezer: FakeFreezer::new(Arc::clone(&launcher)),
            launcher,
            sandbox: FakeSandbox::new(),
            limits: FakeLimits::new(),
            smack: FakeSmack::new(),
            users: FakeUserDb::new(),
            system: FakeSystem::new(),
        }
    }

    pub fn ports(&self) -> Ports {
        Ports {
            config: Arc::clone(&self.tree) as Arc<dyn ConfigTree>,
            sandbox: Arc::clone(&self.sandbox) as Arc<dyn Sandbox>,
            limits: Arc::clone(&self.limits) as Arc<dyn ResourceLimits>,
            smack: Arc::clone(&self.smack) as Arc<dyn SmackCtl>,
            freezer: Arc::clone(&self.freezer) as Arc<dyn Freezer>,
            users: Arc::clone(&self.users) as Arc<dyn UserDb>,
            launcher: Arc::clone(&self.launcher) as Arc<dyn Launcher>,
            system: Arc::clone(&self.system) as Arc<dyn System>,
        }
    }

    /// Registers an app config node with the given processes, returning its
    /// config path.
    pub fn define_app(&self, name: &str, procs: &[&str]) -> String {
        let path = format!("/apps/{name}");
        for p in procs {
            self.tree.add_child(&path, "procs", p);
        }
        path
    }

    /// The live PID of an app's process.
    pub fn pid(&self, app: &str, proc_name: &str) -> Pid {
        self.launcher.pid_of(app, proc_name)
    }
}

/// Config pointing the reboot-fault record into a temp directory.
pub fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        reboot_fault_record_path: dir.path().join("app-reboot-fault"),
        ..Config::default()
    }
}
