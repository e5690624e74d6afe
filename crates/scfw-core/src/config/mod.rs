pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or};
pub use schema::{
    BehavioralPolicy, CommandsPolicy, Config, EnvironmentPolicy, ExceptionsPolicy,
    FilesystemPolicy, GithubApiPolicy, InstallModeMultipliers, Mode, ModuleException,
    ModuleScanPolicy, NetworkPolicy, ObservabilityConfig, Severity, SeverePattern,
};
