//! Shader source hot-reload.
//!
//! [`ShaderWatcher`] is an explicitly owned service: the application (or a
//! node) creates one, registers the shader source files it cares about,
//! and drains the reload queue once per frame at a safe point. A
//! background thread polls file modification times on a bounded interval
//! and stages [`ShaderReload`] events into a queue; it never touches GPU
//! state, so pipeline recreation always happens on the frame-driving
//! thread. Dropping the watcher stops and joins the thread.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

/// A staged shader-change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReload {
    /// The name the shader was registered under.
    pub name: String,
    /// The source file that changed.
    pub path: PathBuf,
}

/// Watcher tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    /// Interval between modification-time polls.
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl WatchConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

struct WatchedFile {
    name: String,
    path: PathBuf,
    mtime: Option<SystemTime>,
}

#[derive(Default)]
struct WatchState {
    watched: Vec<WatchedFile>,
    reloads: Vec<ShaderReload>,
}

struct Shared {
    stop: AtomicBool,
    state: Mutex<WatchState>,
}

/// Polls registered shader sources and stages reload events.
pub struct ShaderWatcher {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl ShaderWatcher {
    /// Start the watcher's polling thread.
    pub fn new(config: WatchConfig) -> Self {
        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            state: Mutex::new(WatchState::default()),
        });
        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("shader-watcher".to_string())
            .spawn(move || {
                while !thread_shared.stop.load(Ordering::Acquire) {
                    poll_once(&thread_shared);
                    std::thread::sleep(config.poll_interval);
                }
            })
            .ok();
        if thread.is_none() {
            log::warn!("shader watcher thread could not be spawned; hot reload disabled");
        }
        Self { shared, thread }
    }

    /// Register a shader source file. The current modification time is
    /// the baseline; registration alone never stages a reload.
    pub fn watch(&self, name: &str, path: impl Into<PathBuf>) {
        let path = path.into();
        let mtime = modification_time(&path);
        log::info!("watching shader '{name}' at '{}'", path.display());
        self.shared.state.lock().watched.push(WatchedFile {
            name: name.to_string(),
            path,
            mtime,
        });
    }

    /// Take all staged reloads. Called once per frame from the
    /// frame-driving thread; the caller recreates the affected states.
    pub fn drain_reloads(&self) -> Vec<ShaderReload> {
        std::mem::take(&mut self.shared.state.lock().reloads)
    }
}

impl Drop for ShaderWatcher {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn modification_time(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn poll_once(shared: &Shared) {
    let mut state = shared.state.lock();
    let WatchState { watched, reloads } = &mut *state;
    for file in watched.iter_mut() {
        let mtime = modification_time(&file.path);
        if mtime != file.mtime {
            file.mtime = mtime;
            // A file disappearing (editor save-via-rename mid-swap) is
            // not a reload by itself; its reappearance is.
            if mtime.is_some() {
                log::info!("shader '{}' changed on disk", file.name);
                reloads.push(ShaderReload {
                    name: file.name.clone(),
                    path: file.path.clone(),
                });
            }
        }
    }
}
