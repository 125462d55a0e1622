//! Loads fake-SELF/OELF module files into host memory and walks their
//! dependency graph.

mod dependency;
mod module;

pub use module::{EntryPoint, InitProc, LoadedModule, ModuleRegistry, RawSymbol};
