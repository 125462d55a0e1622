//! The three-phase symbol publication sequence: low-priority HLE,
//! then LLE (with per-NID HLE overrides), then high-priority HLE.

use crate::loader::{LoadedModule, ModuleRegistry};
use crate::nid;
use crate::nid::NidTable;
use crate::symbols::hle::HleRegistry;
use crate::symbols::table::hle_stub;
use crate::symbols::SymbolTable;

/// Publishes every loaded module's symbols, plus the HLE registry's
/// functions, into `table`. Driven once, after all modules are loaded.
pub fn publish_symbols(
    table: &mut SymbolTable,
    modules: &ModuleRegistry,
    hle: &HleRegistry,
    nid_table: &NidTable,
) {
    for (name, address) in hle.low_priority_entries() {
        table.register_symbol(name, address);
    }

    for module in modules.iter() {
        publish_module_lle(table, module, hle, nid_table);
    }

    for (name, address) in hle.high_priority_entries() {
        table.register_symbol(name, address);
    }
}

fn publish_module_lle(
    table: &mut SymbolTable,
    module: &LoadedModule,
    hle: &HleRegistry,
    nid_table: &NidTable,
) {
    // Locals stay in module.locals; only weak/global bindings are published
    // here. Weak first so a later global registration for the same name
    // overwrites it.
    let mut symbols: Vec<_> = module
        .raw_symbols
        .iter()
        .filter(|s| s.address.is_some() && !s.binding_is_local())
        .collect();
    symbols.sort_by_key(|s| !s.binding_is_weak());

    for sym in symbols {
        let address = sym.address.expect("filtered above");

        if !sym.is_encoded {
            table.register_symbol(sym.name.clone(), address);
            continue;
        }

        let Ok(full_name) = nid::reconstruct_full_nid(module, nid_table, &sym.name) else {
            table.register_symbol(sym.name.clone(), address);
            continue;
        };

        let parts: Vec<&str> = full_name.splitn(3, '#').collect();
        let [symbol_name, module_name, library_name] = parts[..] else {
            table.register_symbol(full_name, address);
            continue;
        };

        if hle.should_load_lle_symbol(symbol_name, module_name, library_name) {
            table.register_symbol(full_name, address);
        } else {
            table.register_symbol(full_name, hle_stub());
        }
    }
}
