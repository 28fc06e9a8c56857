//! plotbridge - drive matplotlib from Rust through an ownership-safe
//! boundary layer
//!
//! - [`config`] - `plotbridge.toml` and environment overrides
//! - [`ops`] - the closed set of operations and their keyword coercions
//! - [`Plot`], [`Axes`], [`Figure`] - the plotting facade
//!
//! The boundary layer itself lives in [`plotbridge_runtime`], re-exported
//! as [`runtime`].
//!
//! ```
//! use plotbridge::{keywords, Plot, RecordingHost, Session, SessionOptions};
//!
//! let host = RecordingHost::new();
//! let session = Session::open(&host, &SessionOptions::default().with_backend("Agg"))?;
//! let plt = Plot::new(&session);
//! plt.plot(&[1.0, 2.0, 3.0], &[1.0, 4.0, 9.0], "r--", &keywords([("label", "squares")]))?;
//! plt.fill_between(&[0.0, 1.0], &[0.0, 0.0], &[1.0, 2.0], &keywords([("alpha", "0.3")]))?;
//! assert_eq!(host.calls().len(), 3);
//! # Ok::<(), plotbridge::Error>(())
//! ```

pub mod axes;
pub mod config;
pub mod figure;
mod invoke;
pub mod ops;
pub mod plot;

pub use plotbridge_runtime as runtime;

pub use axes::Axes;
pub use config::{Config, ConfigError};
pub use figure::{Figure, SaveOptions};
pub use ops::{Op, OpSpec};
pub use plot::{BarStyle, HistOptions, Plot};
pub use plotbridge_runtime::{keywords, Error, Keywords, Module, RecordingHost, Result, Session, SessionOptions};
#[cfg(feature = "python")]
pub use plotbridge_runtime::PythonHost;

/// Install the tracing subscriber described by `config`
pub fn init_logging(config: &Config) {
    plotbridge_runtime::logging::init_with_config(config.log_config());
}
