//! Wires every subsystem store to a workspace root and exposes the
//! orchestration entry points (`identify`/`wake`/`sleep`, the channel
//! bus, stats/context) other processes call into. Not a CLI-arg parser:
//! callers supply identities and content directly.
pub mod error;
pub mod kernel;

pub use error::KernelError;
pub use kernel::Kernel;
