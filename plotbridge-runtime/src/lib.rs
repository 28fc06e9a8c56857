//! plotbridge runtime - ownership-safe boundary to an embedded,
//! reference-counted object runtime
//!
//! Layers, leaves first:
//! - [`refs`] - `Owned`, `Borrowed` and `HandleCell`: the decrement obligation as a value
//! - [`host`] - the runtime's C-shaped API ([`Host`]) and its implementations
//! - [`marshal`] - native values into runtime lists, tuples and dicts
//! - [`dispatch`] - the resolve → invoke → result contract
//! - [`session`] - the single live runtime session
//!
//! ```
//! use plotbridge_runtime::{Module, RecordingHost, Session, SessionOptions};
//! use plotbridge_runtime::dispatch::{self, CallDescriptor};
//! use plotbridge_runtime::marshal::Marshaller;
//!
//! let host = RecordingHost::new();
//! let session = Session::open(&host, &SessionOptions::default())?;
//! let args = Marshaller::new(&session).args().arg(&[1.0, 4.0, 9.0])?.into_tuple()?;
//! let pyplot = session.module(Module::Pyplot)?;
//! dispatch::call(&session, CallDescriptor::new("plot", pyplot), Some(&args), None)?;
//! assert_eq!(host.last_call().unwrap().callable, "plot");
//! # Ok::<(), plotbridge_runtime::Error>(())
//! ```

pub mod dispatch;
pub mod error;
pub mod host;
pub mod logging;
pub mod marshal;
pub mod refs;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{CallDescriptor, Dispatcher, Phase};
pub use error::{Error, Result};
pub use host::{CallRecord, Host, ObjectKind, RawHandle, RecordingHost};
#[cfg(feature = "python")]
pub use host::PythonHost;
pub use marshal::{keywords, ArgBuffer, Coercion, CoercionTable, FromForeign, Keywords, Marshaller, ToForeign};
pub use refs::{Borrowed, HandleCell, Owned};
pub use session::{Module, Session, SessionOptions};
