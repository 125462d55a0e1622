//! The host-side symbol table: publishing OELF symbols (and their HLE
//! counterparts) into one lookup a resolved import can be bound against.

mod address;
mod hle;
mod publisher;
mod table;

pub use address::SymbolAddress;
pub use hle::{HleFunction, HleLibrary, HleModule, HlePolicy, HleRegistry, PriorityList};
pub use publisher::publish_symbols;
pub use table::SymbolTable;
