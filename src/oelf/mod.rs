//! Parsing of the Sony-extended ELF64 container ("OELF") once it has been
//! reconstructed into a single contiguous buffer.

pub mod consts;
mod data;
mod dynamic;
mod header;
mod module_table;
mod program_header;
mod rela;
mod strtab;
mod symbol;
#[cfg(test)]
mod testutil;

pub use data::{Oelf, SymbolRecord};
pub use dynamic::{DynamicTable, Elf64Dyn, LibraryInfoValue, ModuleInfoValue};
pub use header::{Elf64Header, SIZEOF_EHDR};
pub use module_table::{LibraryRef, ModuleRef};
pub use program_header::{Elf64ProgramHeader, ProgramHeaderIter, ProgramHeaderTable};
pub use rela::{parse_rela_table, Elf64Rela};
pub use strtab::Strtab;
pub use symbol::{Elf64Sym, SymbolIter, SymbolTable};
