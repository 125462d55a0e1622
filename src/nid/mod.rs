//! Sony's short "NID" symbol names and the static table that expands them.
//!
//! A PS4 OELF exports and imports symbols under an 11-character encoded hash
//! instead of (or alongside) a human-readable name. This module detects that
//! shape, decodes the accompanying module/library ids, and reassembles a
//! full `symbol#module#library` name a host can key a symbol table on.

mod codec;
mod table;

pub use codec::{decode_value, is_encoded, reconstruct_full_nid, NidNameResolver};
pub use table::NidTable;
