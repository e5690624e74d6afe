//! The five interception points: filesystem, process, network,
//! environment, and module-load. Each wraps its host surface and routes
//! through `Engine::enforce`/`Engine::decide`; none implements policy
//! itself.

pub mod env_guard;
pub mod filesystem;
pub mod module_load;
pub mod network;
pub mod process;

pub use env_guard::EnvGuard;
pub use filesystem::{FileGuard, FileHandle, OpenMode};
pub use module_load::ModuleLoadGuard;
pub use network::NetworkGuard;
pub use process::ProcessGuard;
