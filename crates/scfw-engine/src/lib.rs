//! Policy evaluator, behavior accountant, and interceptors: the part of the
//! firewall that decides and enforces. Depends on `scfw-core` for config,
//! context, audit logging, and the error/observability surface; never the
//! other way around.

pub mod accountant;
pub mod command;
pub mod compiled;
pub mod engine;
pub mod evaluator;
pub mod interceptors;
pub mod matching;
pub mod operation;
pub mod path_rules;
pub mod policy_data;
pub mod scanner;

pub use accountant::Counters;
pub use compiled::CompiledPolicy;
pub use engine::Engine;
pub use evaluator::evaluate;
pub use interceptors::{EnvGuard, FileGuard, FileHandle, ModuleLoadGuard, NetworkGuard, OpenMode, ProcessGuard};
pub use operation::{Metric, Operation, OperationKind, Verdict, ENGINE_CALLER_ORIGIN};
