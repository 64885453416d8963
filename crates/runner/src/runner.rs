// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestration state machine
//!
//! Lock discipline: all mutable state lives behind one parking_lot mutex,
//! never held across an await. The cancellation token of the in-flight
//! execution is invoked after the lock is released so the cancelled task
//! can broadcast `Cancel` without deadlocking.

use crate::error::RunnerError;
use crate::watch::{self, WatchChannels, WatchHandle};
use indexmap::IndexMap;
use kiln_config::{Config, Profile, Rule};
use kiln_core::{split_resources, Event, FsEvent, Output, OutputKind, RootedDir};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a runner picks its profile.
#[derive(Debug, Default)]
pub enum ProfileChoice {
    /// First matching rule wins.
    #[default]
    Auto,
    /// A named profile from the configuration; rule selection is skipped.
    Named(String),
    /// A profile supplied directly, bypassing the configuration.
    Custom(Profile),
}

/// Construction / reconfiguration options.
pub struct RunnerOptions {
    pub config: Config,
    pub profile: ProfileChoice,
    pub extra_args: Vec<String>,
    pub watch: bool,
    /// Subscribers registered before the `Configure` broadcast.
    pub subscribers: Vec<mpsc::Sender<Event>>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            config: Config::default_config(),
            profile: ProfileChoice::Auto,
            extra_args: Vec::new(),
            watch: false,
            subscribers: Vec::new(),
        }
    }
}

/// One rule that matched during selection, in rule-list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileMatch {
    pub rule_index: usize,
    pub profile_name: String,
}

#[derive(Debug)]
struct State {
    /// Render path, relative to the root, cleaned.
    path: PathBuf,
    profile_name: Option<String>,
    profile: Option<Arc<Profile>>,
    profiles: IndexMap<String, Arc<Profile>>,
    rules: Vec<Rule>,
    extra_args: Vec<String>,
    watch: bool,
    watcher: Option<WatchHandle>,
    watched_files: HashSet<PathBuf>,
    watched_dirs: HashSet<PathBuf>,
    /// Cancel handle of the in-flight execution; replacing it is how a
    /// new run preempts the old one.
    cancel: Option<CancellationToken>,
    subscribers: Vec<mpsc::Sender<Event>>,
}

impl State {
    fn empty() -> Self {
        Self {
            path: PathBuf::new(),
            profile_name: None,
            profile: None,
            profiles: IndexMap::new(),
            rules: Vec::new(),
            extra_args: Vec::new(),
            watch: false,
            watcher: None,
            watched_files: HashSet::new(),
            watched_dirs: HashSet::new(),
            cancel: None,
            subscribers: Vec::new(),
        }
    }

    /// Watched files and directories are registered and cleared together.
    fn remove_watchers(&mut self) {
        if self.watcher.take().is_some() {
            tracing::debug!("dropped file watcher");
        }
        self.watched_files.clear();
        self.watched_dirs.clear();
    }
}

/// The orchestrator: selection, execution, watching, and broadcast.
#[derive(Debug)]
pub struct Runner {
    root: RootedDir,
    state: Mutex<State>,
    /// Self-handle for spawning the event loop and watch-triggered runs.
    weak: std::sync::Weak<Runner>,
}

impl Runner {
    /// Construct a runner and configure it. Configuration-time failures
    /// abort construction; a partial runner is never returned.
    pub async fn new(
        root: RootedDir,
        path: impl AsRef<Path>,
        options: RunnerOptions,
    ) -> Result<Arc<Self>, RunnerError> {
        let runner = Arc::new_cyclic(|weak| Self {
            root,
            state: Mutex::new(State::empty()),
            weak: weak.clone(),
        });
        runner.configure(path, options).await?;
        Ok(runner)
    }

    /// (Re)configure: select the profile for `path`, reset watch
    /// registrations, run init hooks, and broadcast `Configure`.
    pub async fn configure(
        &self,
        path: impl AsRef<Path>,
        options: RunnerOptions,
    ) -> Result<(), RunnerError> {
        let RunnerOptions {
            mut config,
            profile,
            extra_args,
            watch,
            subscribers,
        } = options;
        config.validate()?;
        let profiles: IndexMap<String, Arc<Profile>> = config
            .profiles
            .into_iter()
            .map(|(name, profile)| (name, Arc::new(profile)))
            .collect();
        let rules = config.rules;

        // Path validation: cleaned and stat'ed through the root, so it
        // cannot escape.
        let abs = self.root.resolve(path.as_ref())?;
        self.root.stat(&abs)?;
        let rel = match abs.strip_prefix(self.root.root()) {
            Ok(stripped) => stripped.to_path_buf(),
            Err(_) => path.as_ref().to_path_buf(),
        };

        // Profile resolution.
        let (profile_name, selected) = match profile {
            ProfileChoice::Named(name) => {
                let profile = profiles
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| RunnerError::ProfileUnknown { name: name.clone() })?;
                (Some(name), Some(profile))
            }
            ProfileChoice::Custom(mut custom) => {
                custom.build()?;
                (None, Some(Arc::new(custom)))
            }
            ProfileChoice::Auto => {
                if rules.is_empty() {
                    (None, None)
                } else {
                    let matched = find_profiles_in(&self.root, &rel, &rules)?
                        .into_iter()
                        .next()
                        .ok_or_else(|| RunnerError::NoCommandForPath { path: rel.clone() })?;
                    let profile = profiles.get(&matched.profile_name).cloned().ok_or_else(|| {
                        RunnerError::ProfileUnknown {
                            name: matched.profile_name.clone(),
                        }
                    })?;
                    (Some(matched.profile_name), Some(profile))
                }
            }
        };

        // Extra args clone the selected profile; the shared one stays
        // untouched.
        let selected = match (selected, extra_args.is_empty()) {
            (Some(profile), false) => Some(Arc::new(profile.with_extra_args(extra_args.clone())?)),
            (selected, _) => selected,
        };

        tracing::info!(
            path = %rel.display(),
            profile = profile_name.as_deref().unwrap_or("<custom>"),
            watch,
            "configuring runner"
        );

        let channels = {
            let mut state = self.state.lock();
            state.remove_watchers();
            state.path = rel;
            state.profile_name = profile_name;
            state.profile = selected;
            state.profiles = profiles;
            state.rules = rules;
            state.extra_args = extra_args;
            state.watch = watch;
            state.subscribers.extend(subscribers);
            if watch {
                self.watch_source(&mut state)?
            } else {
                None
            }
        };
        if let Some(channels) = channels {
            if let Some(runner) = self.weak.upgrade() {
                tokio::spawn(runner.run_on_event(channels));
            }
        }

        // Init hooks run once per configuration; failure aborts it.
        let (profile, rel) = {
            let state = self.state.lock();
            (state.profile.clone(), state.path.clone())
        };
        if let Some(profile) = profile {
            let dir = self.root.resolve(&rel)?;
            profile
                .run_init_hooks(&CancellationToken::new(), &dir)
                .await?;
        }

        self.broadcast(Event::Configure).await;
        Ok(())
    }

    /// Register a subscriber. Subscription is append-only; a slow
    /// subscriber backpressures the runner, so size the buffer (or drain
    /// from a dedicated task) accordingly.
    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(capacity);
        self.state.lock().subscribers.push(tx);
        rx
    }

    pub fn path(&self) -> PathBuf {
        self.state.lock().path.clone()
    }

    pub fn root(&self) -> &RootedDir {
        &self.root
    }

    pub fn current_profile_name(&self) -> Option<String> {
        self.state.lock().profile_name.clone()
    }

    pub fn current_profile(&self) -> Option<Arc<Profile>> {
        self.state.lock().profile.clone()
    }

    pub fn get_profile(&self, name: &str) -> Option<Arc<Profile>> {
        self.state.lock().profiles.get(name).cloned()
    }

    pub fn extra_args(&self) -> Vec<String> {
        self.state.lock().extra_args.clone()
    }

    pub fn watch_enabled(&self) -> bool {
        self.state.lock().watch
    }

    /// Snapshot of the watch registrations (files, directories).
    pub fn watched(&self) -> (HashSet<PathBuf>, HashSet<PathBuf>) {
        let state = self.state.lock();
        (state.watched_files.clone(), state.watched_dirs.clone())
    }

    /// All rules matching `path`, in rule-list order.
    pub fn find_profiles(&self, path: impl AsRef<Path>) -> Result<Vec<ProfileMatch>, RunnerError> {
        let rules = {
            let state = self.state.lock();
            state.rules.clone()
        };
        find_profiles_in(&self.root, path.as_ref(), &rules)
    }

    /// The first rule matching `path`.
    pub fn find_profile(&self, path: impl AsRef<Path>) -> Result<ProfileMatch, RunnerError> {
        let path = path.as_ref();
        self.find_profiles(path)?
            .into_iter()
            .next()
            .ok_or_else(|| RunnerError::NoCommandForPath {
                path: path.to_path_buf(),
            })
    }

    /// Execute the current profile against the current path.
    ///
    /// Cancels any in-flight execution first. The returned output is also
    /// broadcast: `Start`, then `End` (or `Cancel` if this run was itself
    /// preempted).
    pub async fn run(&self) -> Output {
        let (profile, rel, cancel) = self.begin(OutputKind::Run).await;
        let mut output = Output::new(OutputKind::Run);

        let dir = match self.resolve_run_dir(&rel) {
            Ok(dir) => dir,
            Err(err) => return self.finish_failed(output.with_error(err)).await,
        };
        let Some(profile) = profile else {
            return self.finish_failed(output.with_error("no profile configured")).await;
        };

        match profile.exec(&cancel, &dir).await {
            Ok(result) => {
                output.stdout = result.stdout;
                output.stderr = result.stderr;
                // A split failure is attached without discarding stdout.
                match split_resources(&output.stdout) {
                    Ok(resources) => output.resources = resources,
                    Err(err) => output.error = Some(err.to_string()),
                }
                self.broadcast(Event::End {
                    output: output.clone(),
                })
                .await;
                output
            }
            Err(err) if err.is_cancelled() => {
                output.error = Some(err.to_string());
                self.broadcast(Event::Cancel).await;
                output
            }
            Err(err) => {
                if let kiln_config::RenderError::Command(kiln_exec::ExecError::Failed {
                    stdout,
                    stderr,
                    ..
                }) = &err
                {
                    output.stdout = stdout.clone();
                    output.stderr = stderr.clone();
                }
                self.finish_failed(output.with_error(err)).await
            }
        }
    }

    /// Execute one of the current profile's plugins by name. Plugin
    /// outputs carry stdout/stderr only; they are never split into
    /// resources.
    pub async fn run_plugin(&self, name: &str) -> Output {
        let (profile, rel, cancel) = self.begin(OutputKind::Plugin).await;
        let mut output = Output::new(OutputKind::Plugin);

        let dir = match self.resolve_run_dir(&rel) {
            Ok(dir) => dir,
            Err(err) => return self.finish_failed(output.with_error(err)).await,
        };
        let Some(profile) = profile else {
            return self.finish_failed(output.with_error("no profile configured")).await;
        };
        let Some(plugin) = profile.get_plugin(name) else {
            let message = format!("unknown plugin {name:?}");
            return self.finish_failed(output.with_error(message)).await;
        };

        match plugin.exec(&cancel, &dir).await {
            Ok(result) => {
                output.stdout = result.stdout;
                output.stderr = result.stderr;
                self.broadcast(Event::End {
                    output: output.clone(),
                })
                .await;
                output
            }
            Err(err) if err.is_cancelled() => {
                output.error = Some(err.to_string());
                self.broadcast(Event::Cancel).await;
                output
            }
            Err(err) => {
                let message = if plugin.description.is_empty() {
                    format!("plugin {name:?}: {err}")
                } else {
                    format!("plugin {name:?} ({}): {err}", plugin.description)
                };
                self.finish_failed(output.with_error(message)).await
            }
        }
    }

    /// Broadcast an event to every subscriber. Delivery is a sequential
    /// blocking send per subscriber; closed subscribers are skipped.
    pub async fn broadcast(&self, event: Event) {
        let subscribers = self.state.lock().subscribers.clone();
        tracing::debug!(event = %event.log_summary(), "broadcast");
        for tx in subscribers {
            if tx.send(event.clone()).await.is_err() {
                tracing::debug!("subscriber channel closed, skipping");
            }
        }
    }

    /// Common run prologue: cancel-and-replace the in-flight token, then
    /// broadcast `Start`.
    async fn begin(&self, kind: OutputKind) -> (Option<Arc<Profile>>, PathBuf, CancellationToken) {
        let (previous, token, profile, rel) = {
            let mut state = self.state.lock();
            let previous = state.cancel.take();
            let token = CancellationToken::new();
            state.cancel = Some(token.clone());
            (previous, token, state.profile.clone(), state.path.clone())
        };
        if let Some(previous) = previous {
            // Invoked outside the lock; the preempted task broadcasts
            // `Cancel` on its own.
            previous.cancel();
        }
        self.broadcast(Event::Start { kind }).await;
        (profile, rel, token)
    }

    fn resolve_run_dir(&self, rel: &Path) -> Result<PathBuf, RunnerError> {
        let dir = self.root.resolve(rel)?;
        self.root.stat(&dir)?;
        Ok(dir)
    }

    async fn finish_failed(&self, output: Output) -> Output {
        self.broadcast(Event::End {
            output: output.clone(),
        })
        .await;
        output
    }

    /// Walk the render path, evaluate the profile's source predicate over
    /// the collected files, and register the matched files' parent
    /// directories with a fresh watcher.
    fn watch_source(&self, state: &mut State) -> Result<Option<WatchChannels>, RunnerError> {
        let Some(profile) = state.profile.clone() else {
            return Ok(None);
        };
        let files = self.root.walk_files(&state.path)?;
        let file_strs: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let dir = self.root.resolve(&state.path)?;
        let (matched, subset) = profile.match_files(&dir.to_string_lossy(), &file_strs);
        if !matched {
            tracing::debug!(path = %dir.display(), "source predicate matched nothing to watch");
            return Ok(None);
        }
        let selected = subset.unwrap_or(file_strs);

        let (mut handle, channels) = watch::create_watcher(64)?;
        for file in &selected {
            let abs = self.root.resolve(Path::new(file))?;
            let Some(parent) = abs.parent() else {
                continue;
            };
            state.watched_files.insert(abs.clone());
            if state.watched_dirs.insert(parent.to_path_buf()) {
                handle.add(parent)?;
            }
        }
        tracing::info!(
            files = state.watched_files.len(),
            dirs = state.watched_dirs.len(),
            "watching source files"
        );
        state.watcher = Some(handle);
        Ok(Some(channels))
    }

    /// The FS event loop: consumes the watcher's event and error channels
    /// until both close (the watcher was dropped by a reconfigure).
    async fn run_on_event(self: Arc<Self>, mut channels: WatchChannels) {
        let mut events_open = true;
        let mut errors_open = true;
        while events_open || errors_open {
            tokio::select! {
                event = channels.events.recv(), if events_open => match event {
                    Some(event) => self.handle_fs_event(event).await,
                    None => events_open = false,
                },
                error = channels.errors.recv(), if errors_open => match error {
                    Some(err) => {
                        let output = Output::new(OutputKind::Run)
                            .with_error(format!("watch error: {err}"));
                        self.broadcast(Event::End { output }).await;
                    }
                    None => errors_open = false,
                },
            }
        }
        tracing::debug!("watch channels closed, event loop exiting");
    }

    async fn handle_fs_event(&self, event: FsEvent) {
        let profile = {
            let state = self.state.lock();
            // Directory watches emit events for unwatched siblings.
            if !state.watched_files.contains(&event.path) {
                return;
            }
            state.profile.clone()
        };
        if event.is_chmod_only() {
            return;
        }
        tracing::debug!(
            path = %event.path.display(),
            op = %event.op_summary(),
            "relevant file event"
        );
        let Some(profile) = profile else {
            let output = Output::new(OutputKind::Run).with_error("no profile configured");
            self.broadcast(Event::End { output }).await;
            return;
        };
        match profile.match_file_event(&event.path.to_string_lossy(), event.op) {
            Ok(true) => {
                // Run on a fresh task so the loop stays responsive and
                // the command remains cancellable.
                if let Some(runner) = self.weak.upgrade() {
                    tokio::spawn(async move {
                        runner.run().await;
                    });
                }
            }
            Ok(false) => {}
            Err(err) => {
                let output =
                    Output::new(OutputKind::Run).with_error(format!("reload predicate: {err}"));
                self.broadcast(Event::End { output }).await;
            }
        }
    }
}

/// Selection over a path: directories use their direct file children,
/// files use their parent directory and a singleton list. Every matching
/// rule is returned in rule-list order.
fn find_profiles_in(
    root: &RootedDir,
    rel: &Path,
    rules: &[Rule],
) -> Result<Vec<ProfileMatch>, RunnerError> {
    let meta = root.stat(rel)?;
    let (dir_rel, files) = if meta.is_dir() {
        let files: Vec<String> = root
            .read_dir(rel)?
            .into_iter()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.path().to_string_lossy().into_owned())
            .collect();
        (rel.to_path_buf(), files)
    } else {
        let abs = root.resolve(rel)?;
        let parent = rel.parent().unwrap_or(Path::new("")).to_path_buf();
        (parent, vec![abs.to_string_lossy().into_owned()])
    };
    let dir = root.resolve(&dir_rel)?;
    let dir_str = dir.to_string_lossy();

    let matches: Vec<ProfileMatch> = rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.match_files(&dir_str, &files))
        .map(|(rule_index, rule)| ProfileMatch {
            rule_index,
            profile_name: rule.profile_name.clone(),
        })
        .collect();

    if matches.is_empty() && !files.is_empty() {
        return Err(RunnerError::NoCommandForPath {
            path: rel.to_path_buf(),
        });
    }
    Ok(matches)
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
