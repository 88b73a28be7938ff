//! Wasmtime host for raindrops modules.
//!
//! A raindrops module exports `convert(n: i32)`, writes the sound of `n` into
//! its linear memory and returns where it put it: either `(offset, len)` as
//! two results or both packed into one `i64` (see [`raindrops::abi`]). This
//! crate compiles such modules, provides their memory when they import it,
//! calls `convert` and decodes the span back into a `String`.
//!
//! ```rust,ignore
//! use raindrops_host::{HostConfig, RaindropsHost};
//!
//! let host = RaindropsHost::new(HostConfig::default())?;
//! let module = host.load_file("raindrops.wasm".as_ref())?;
//! let mut instance = module.instantiate().await?;
//! assert_eq!(instance.convert(105).await?, "PlingPlangPlong");
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod runner;

pub use config::HostConfig;
pub use error::HostError;
pub use host::{RaindropsHost, RaindropsInstance, RaindropsModule, REFERENCE_WAT};
pub use runner::{Record, Runner};
