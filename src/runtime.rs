//! The owned, explicit alternative to process-global loader state: one
//! `Runtime` value holds everything a load session needs and nothing
//! more, constructed once and dropped once.

use crate::error::LoaderResult;
use crate::loader::ModuleRegistry;
use crate::nid::NidTable;
use crate::symbols::{publish_symbols, HleRegistry, SymbolTable};
use std::path::{Path, PathBuf};

/// Configuration for a loading session.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directories searched, in order, to resolve a dependency by name.
    pub search_dirs: Vec<PathBuf>,
    /// Whether a module's reconstructed OELF source buffer is retained
    /// after mapping, for diagnostics. Default `false`: the mapped copy in
    /// RWX memory is authoritative and the source buffer is just overhead.
    pub keep_self_backing: bool,
}

impl LoaderConfig {
    /// The three conventional PS4 firmware directories, relative to the
    /// directory containing the executable being loaded.
    pub fn with_eboot_dir(eboot_dir: impl AsRef<Path>) -> Self {
        let eboot_dir = eboot_dir.as_ref();
        LoaderConfig {
            search_dirs: vec![
                eboot_dir.join("sce_module"),
                eboot_dir.join("system/common/lib"),
                eboot_dir.join("system/priv/lib"),
            ],
            keep_self_backing: false,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig::with_eboot_dir(".")
    }
}

/// Owns the module registry, the global symbol table, the HLE registry, and
/// the loader configuration for one loading session.
///
/// Field order matters: `symbols` is declared after `modules` so Rust's
/// in-declaration-order `Drop` tears the symbol table down before the RWX
/// page regions it points into are unmapped. Never reorder these fields.
#[derive(Debug)]
pub struct Runtime {
    modules: ModuleRegistry,
    symbols: SymbolTable,
    hle: HleRegistry,
    config: LoaderConfig,
    nid_table: NidTable,
}

impl Runtime {
    pub fn new(config: LoaderConfig, hle: HleRegistry, nid_table: NidTable) -> Self {
        Runtime {
            modules: ModuleRegistry::new(),
            symbols: SymbolTable::new(),
            hle,
            config,
            nid_table,
        }
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads `path` (expected to be the root executable) as module 0.
    pub fn load_file(&mut self, path: &Path) -> LoaderResult<usize> {
        self.modules.load_file(path, self.config.keep_self_backing)
    }

    /// Walks the dependency closure of the module loaded by the first
    /// `load_file` call.
    pub fn load_all_dependencies(&mut self) -> LoaderResult<()> {
        self.modules.load_all_dependencies(&self.config.search_dirs, self.config.keep_self_backing)
    }

    /// Runs the three-phase publication sequence (low-priority HLE, LLE,
    /// high-priority HLE) over every loaded module and the HLE registry.
    pub fn publish_symbols(&mut self) {
        publish_symbols(&mut self.symbols, &self.modules, &self.hle, &self.nid_table);
    }

    /// Applies RELA/JMPREL fix-ups. Currently a documented no-op (Open
    /// Question 3); kept as its own pass so a future relocation engine has
    /// a natural seam.
    pub fn link_modules(&mut self) -> LoaderResult<()> {
        self.modules.link_modules()
    }
}
