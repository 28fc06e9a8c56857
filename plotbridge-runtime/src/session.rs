//! Runtime session - the one live connection to the embedded runtime
//!
//! At most one session exists per process. Opening acquires a process-wide
//! guard, brings the runtime up and imports the plotting modules; teardown
//! releases the module references, shuts the runtime down and frees the
//! guard. Teardown runs exactly once, from [`Session::close`] or from `Drop`,
//! so every exit path (early returns, `?`, unwinding) is covered.

use crate::dispatch::{self, CallDescriptor};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::logging::{error, info};
use crate::marshal::Marshaller;
use crate::refs::{Borrowed, HandleCell, Owned};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of live sessions in this process (0 or 1)
static ACTIVE_SESSIONS: AtomicUsize = AtomicUsize::new(0);

/// Modules imported by every session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Matplotlib,
    Pyplot,
    Cm,
}

impl Module {
    pub const ALL: [Module; 3] = [Module::Matplotlib, Module::Pyplot, Module::Cm];

    /// Dotted import path
    pub const fn path(self) -> &'static str {
        match self {
            Module::Matplotlib => "matplotlib",
            Module::Pyplot => "matplotlib.pyplot",
            Module::Cm => "matplotlib.cm",
        }
    }
}

/// How a session brings the runtime up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Plotting backend selected with `matplotlib.use` before pyplot loads
    pub backend: Option<String>,
    /// Initialize (and later finalize) the runtime. Turn off when embedding
    /// into a process whose runtime is already running.
    pub initialize_runtime: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            backend: None,
            initialize_runtime: true,
        }
    }
}

impl SessionOptions {
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }
}

/// The live runtime session.
///
/// Borrows the host it drives; every handle obtained through the session
/// borrows the session in turn, so no handle outlives the runtime.
pub struct Session<'h> {
    host: &'h dyn Host,
    matplotlib: HandleCell<'h>,
    pyplot: HandleCell<'h>,
    cm: HandleCell<'h>,
    owns_runtime: bool,
    closed: bool,
}

impl<'h> Session<'h> {
    /// Open the process's session on `host`.
    ///
    /// Fails with [`Error::SessionAlreadyActive`] while another session is
    /// live. Any failure after the guard is taken tears down what was set up
    /// and frees the guard again.
    pub fn open(host: &'h dyn Host, options: &SessionOptions) -> Result<Self> {
        if ACTIVE_SESSIONS
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!(target: "plotbridge::session", "refusing to open a second session");
            return Err(Error::SessionAlreadyActive);
        }

        // From here on `Drop` owns the guard.
        let mut session = Self {
            host,
            matplotlib: HandleCell::empty(),
            pyplot: HandleCell::empty(),
            cm: HandleCell::empty(),
            owns_runtime: false,
            closed: false,
        };

        if options.initialize_runtime {
            host.initialize().map_err(|reason| {
                error!(target: "plotbridge::session", host = host.name(), %reason, "runtime initialization failed");
                Error::HostInit(reason)
            })?;
            session.owns_runtime = true;
        } else if !host.is_initialized() {
            error!(target: "plotbridge::session", host = host.name(), "runtime is not running");
            return Err(Error::SessionNotInitialized);
        }

        session.matplotlib = session.import(Module::Matplotlib)?.into();
        if let Some(backend) = &options.backend {
            session.select_backend(backend)?;
        }
        session.pyplot = session.import(Module::Pyplot)?.into();
        session.cm = session.import(Module::Cm)?.into();

        info!(
            target: "plotbridge::session",
            host = host.name(),
            backend = options.backend.as_deref().unwrap_or("default"),
            owns_runtime = session.owns_runtime,
            "session opened"
        );
        Ok(session)
    }

    fn import(&self, module: Module) -> Result<Owned<'h>> {
        match self.host.import(module.path()) {
            Some(raw) => Owned::adopt(self.host, Some(raw), module.path()),
            None => {
                let reason = self.host.take_error();
                error!(target: "plotbridge::session", module = module.path(), ?reason, "import failed");
                Err(Error::ModuleImport {
                    module: module.path().to_string(),
                    reason,
                })
            }
        }
    }

    fn select_backend(&self, backend: &str) -> Result<()> {
        let matplotlib = self.module(Module::Matplotlib)?;
        let args = Marshaller::new(self).args().arg(backend)?.into_tuple()?;
        dispatch::call(self, CallDescriptor::new("use", matplotlib), Some(&args), None)?;
        Ok(())
    }

    /// The host this session drives, for as long as the session is borrowed
    #[inline]
    pub fn host(&self) -> &dyn Host {
        self.host
    }

    /// Live: not closed, and the runtime is up
    pub fn is_live(&self) -> bool {
        !self.closed && self.host.is_initialized()
    }

    pub fn ensure_live(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(Error::SessionNotInitialized)
        }
    }

    /// Borrow one of the imported modules.
    ///
    /// The module, and everything reached or promoted from it, lives no
    /// longer than this borrow of the session, so nothing can be used or
    /// released after teardown:
    ///
    /// ```compile_fail
    /// use plotbridge_runtime::{Module, RecordingHost, Session, SessionOptions};
    ///
    /// let host = RecordingHost::new();
    /// let escaped = {
    ///     let session = Session::open(&host, &SessionOptions::default()).unwrap();
    ///     session.module(Module::Pyplot).unwrap().promote()
    /// };
    /// drop(escaped);
    /// ```
    pub fn module(&self, module: Module) -> Result<Borrowed<'_, '_>> {
        self.ensure_live()?;
        let cell = match module {
            Module::Matplotlib => &self.matplotlib,
            Module::Pyplot => &self.pyplot,
            Module::Cm => &self.cm,
        };
        cell.borrow().ok_or(Error::SessionNotInitialized)
    }

    /// Whether a session is currently open anywhere in the process
    pub fn is_active() -> bool {
        ACTIVE_SESSIONS.load(Ordering::Acquire) != 0
    }

    /// Release the modules and shut the runtime down. Later calls are no-ops,
    /// as is the eventual drop.
    pub fn close(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // Reverse import order
        self.cm.release();
        self.pyplot.release();
        self.matplotlib.release();

        if self.owns_runtime {
            self.host.finalize();
        }
        ACTIVE_SESSIONS.store(0, Ordering::Release);
        info!(target: "plotbridge::session", host = self.host.name(), "session closed");
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host.name())
            .field("owns_runtime", &self.owns_runtime)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;
    use crate::testing;

    #[test]
    fn test_open_imports_modules() {
        let _guard = testing::lock();
        let host = RecordingHost::new();
        let session = Session::open(&host, &SessionOptions::default()).unwrap();

        assert!(Session::is_active());
        for module in Module::ALL {
            let module = session.module(module).unwrap();
            assert_eq!(module.kind(), crate::host::ObjectKind::Module);
        }
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_backend_selected_before_pyplot() {
        let _guard = testing::lock();
        let host = RecordingHost::new();
        let options = SessionOptions::default().with_backend("Agg");
        let _session = Session::open(&host, &options).unwrap();

        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callable, "use");
        assert_eq!(calls[0].args, vec![serde_json::json!("Agg")]);
    }

    #[test]
    fn test_second_session_is_refused() {
        let _guard = testing::lock();
        let host = RecordingHost::new();
        let first = Session::open(&host, &SessionOptions::default()).unwrap();

        let other = RecordingHost::new();
        let err = Session::open(&other, &SessionOptions::default()).unwrap_err();
        assert_eq!(err, Error::SessionAlreadyActive);
        // The first session is unaffected.
        assert!(first.module(Module::Pyplot).is_ok());

        drop(first);
        let reopened = Session::open(&other, &SessionOptions::default());
        assert!(reopened.is_ok());
    }

    #[test]
    fn test_close_releases_everything() {
        let _guard = testing::lock();
        let host = RecordingHost::new();
        let mut session = Session::open(&host, &SessionOptions::default()).unwrap();
        assert!(host.live_objects() > 0);

        session.close();
        assert!(!Session::is_active());
        assert!(!host.is_initialized());
        assert_eq!(host.live_objects(), 0);
        assert_eq!(session.module(Module::Pyplot).unwrap_err(), Error::SessionNotInitialized);

        session.close();
        drop(session);
        assert!(host.violations().is_empty());
    }

    #[test]
    fn test_module_references_end_with_the_session() {
        let _guard = testing::lock();
        let host = RecordingHost::new();
        let session = Session::open(&host, &SessionOptions::default()).unwrap();
        let baseline = host.live_objects();
        {
            let pyplot = session.module(Module::Pyplot).unwrap();
            let before = pyplot.refcount();
            let kept = pyplot.promote();
            let plot = kept.borrow().attr("plot").unwrap();
            assert_eq!(kept.refcount(), before + 1);
            drop(plot);
            drop(kept);
            assert_eq!(pyplot.refcount(), before);
        }
        assert_eq!(host.live_objects(), baseline);

        drop(session);
        assert!(!host.is_initialized());
        assert_eq!(host.live_objects(), 0);
        assert!(host.violations().is_empty());
    }

    #[test]
    fn test_drop_tears_down() {
        let _guard = testing::lock();
        let host = RecordingHost::new();
        {
            let _session = Session::open(&host, &SessionOptions::default()).unwrap();
        }
        assert!(!Session::is_active());
        assert_eq!(host.live_objects(), 0);
    }

    #[test]
    fn test_embedding_requires_running_runtime() {
        let _guard = testing::lock();
        let host = RecordingHost::new();
        let options = SessionOptions {
            initialize_runtime: false,
            ..SessionOptions::default()
        };
        assert_eq!(
            Session::open(&host, &options).unwrap_err(),
            Error::SessionNotInitialized
        );
        assert!(!Session::is_active());

        host.initialize().unwrap();
        let session = Session::open(&host, &options).unwrap();
        drop(session);
        // Not ours to finalize.
        assert!(host.is_initialized());
    }

    #[test]
    fn test_import_failure_frees_the_guard() {
        let _guard = testing::lock();
        let host = RecordingHost::new().without_module("matplotlib.cm");
        let err = Session::open(&host, &SessionOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ModuleImport { ref module, .. } if module == "matplotlib.cm"));
        assert!(!Session::is_active());
        assert!(!host.is_initialized());
        assert_eq!(host.live_objects(), 0);
    }

    #[test]
    fn test_init_failure() {
        let _guard = testing::lock();
        let host = RecordingHost::new().with_init_failure("no interpreter");
        let err = Session::open(&host, &SessionOptions::default()).unwrap_err();
        assert_eq!(err, Error::HostInit("no interpreter".to_string()));
        assert!(!Session::is_active());
    }
}
