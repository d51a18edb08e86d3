//! Process-wide hint context and per-call thread context.
//!
//! The original design for this kind of shim leans on TLS caches and global
//! mutable flags; here the thread identity travels in an explicit
//! [`ThreadCx`] passed into each core operation, and the process-wide state
//! is a [`HintContext`] with an explicit `init`/`teardown` lifecycle.
//!
//! The global context is single-assignment at startup: [`init`] succeeds at
//! most once per process. [`teardown`] does not deallocate (decisions may be
//! mid-flight on other threads); it flips the context to disabled, after
//! which every wrapped operation behaves exactly like the unwrapped
//! primitive.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use lockhint_error::HintError;
use lockhint_tables::HintTables;
use lockhint_types::{CpuId, HintConfig, ThreadId};
use tracing::info;

use crate::sys;

// ---------------------------------------------------------------------------
// ThreadCx
// ---------------------------------------------------------------------------

/// Per-call thread context: the identity a core operation publishes under.
///
/// Constructing one queries the OS; callers on a hot path hold one across a
/// batch of operations instead of re-querying per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadCx {
    tid: ThreadId,
}

impl ThreadCx {
    /// Context for an explicitly supplied tid (tests, remote attribution).
    #[must_use]
    pub const fn new(tid: ThreadId) -> Self {
        Self { tid }
    }

    /// Context for the calling thread.
    #[must_use]
    pub fn current() -> Self {
        Self {
            tid: sys::current_tid(),
        }
    }

    /// The thread id this context publishes under.
    #[inline]
    #[must_use]
    pub const fn tid(self) -> ThreadId {
        self.tid
    }

    /// The CPU the thread is on right now (re-queried per call; threads
    /// migrate).
    #[inline]
    #[must_use]
    pub fn cpu(self) -> CpuId {
        sys::current_cpu()
    }
}

// ---------------------------------------------------------------------------
// HintContext
// ---------------------------------------------------------------------------

/// Process-wide shim state: configuration plus the shared tables.
#[derive(Debug)]
pub struct HintContext {
    config: HintConfig,
    tables: Option<Arc<HintTables>>,
    enabled: AtomicBool,
}

impl HintContext {
    /// Build a context. `tables: None` means the mapping collaborator never
    /// provided table regions; the shim then runs in passthrough mode.
    #[must_use]
    pub fn new(config: HintConfig, tables: Option<Arc<HintTables>>) -> Self {
        let enabled = config.enabled && tables.is_some();
        Self {
            config,
            tables,
            enabled: AtomicBool::new(enabled),
        }
    }

    /// The configuration this context was built with.
    #[must_use]
    pub fn config(&self) -> &HintConfig {
        &self.config
    }

    /// The tables and config, iff hinting is currently active.
    ///
    /// `None` means passthrough: tables unavailable, disabled by
    /// configuration, or torn down.
    #[inline]
    #[must_use]
    pub fn active(&self) -> Option<(&HintTables, &HintConfig)> {
        if !self.enabled.load(Ordering::Acquire) {
            return None;
        }
        self.tables.as_deref().map(|t| (t, &self.config))
    }

    /// Shared handle to the tables (for wiring up the scheduling policy).
    #[must_use]
    pub fn tables(&self) -> Option<Arc<HintTables>> {
        self.tables.clone()
    }

    /// Disable hint publication; subsequent operations pass through.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Global lifecycle
// ---------------------------------------------------------------------------

static GLOBAL: OnceLock<HintContext> = OnceLock::new();

/// Install the process-wide context. Call once at startup, before any
/// [`HintedMutex`](crate::HintedMutex) is used.
///
/// # Errors
///
/// [`HintError::AlreadyInitialized`] if a context was already installed.
pub fn init(config: HintConfig, tables: Option<Arc<HintTables>>) -> Result<(), HintError> {
    let ctx = HintContext::new(config, tables);
    let hinting = ctx.active().is_some();
    GLOBAL
        .set(ctx)
        .map_err(|_| HintError::AlreadyInitialized)?;
    info!(hinting, "hint context initialized");
    Ok(())
}

/// Install a context configured from the environment, allocating fresh
/// tables unless hinting is disabled.
///
/// # Errors
///
/// [`HintError::AlreadyInitialized`] if a context was already installed.
pub fn init_from_env() -> Result<(), HintError> {
    let config = HintConfig::from_env();
    let tables = config
        .enabled
        .then(|| Arc::new(HintTables::new(config.hash_salt)));
    init(config, tables)
}

/// The installed context, if any.
#[must_use]
pub fn global() -> Option<&'static HintContext> {
    GLOBAL.get()
}

/// Tables and config of the installed context, iff hinting is active.
#[inline]
#[must_use]
pub fn global_active() -> Option<(&'static HintTables, &'static HintConfig)> {
    GLOBAL.get().and_then(HintContext::active)
}

/// Tear the process-wide context down: hint publication stops, wrapped
/// primitives keep working in passthrough mode. Idempotent.
pub fn teardown() {
    if let Some(ctx) = GLOBAL.get() {
        ctx.disable();
        info!("hint context torn down");
    }
}
