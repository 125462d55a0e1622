//! The HLE module registry and the policy deciding, per symbol, whether a
//! host re-implementation or the guest's own binary code should run.

use crate::symbols::SymbolAddress;

/// Whether a library's un-listed functions default to host (`Hle`) or
/// guest (`Lle`) implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlePolicy {
    Hle,
    Lle,
}

/// One host-provided re-implementation of a guest function.
#[derive(Debug, Clone)]
pub struct HleFunction {
    pub name: String,
    pub address: SymbolAddress,
}

/// Which of a library's function lists is authoritative by default.
#[derive(Debug, Clone)]
pub enum PriorityList {
    /// These functions are intended to be overwritable by LLE.
    LowPriority(Vec<HleFunction>),
    /// These functions always win over LLE, even when published later.
    HighPriority(Vec<HleFunction>),
}

/// A single library within an [`HleModule`].
#[derive(Debug, Clone)]
pub struct HleLibrary {
    pub name: String,
    pub default_mode: HlePolicy,
    pub priority: PriorityList,
    /// Escape hatch: symbols that must always use the guest's own binary
    /// implementation even when `default_mode == Hle`.
    pub lle_symbols: Vec<String>,
}

impl HleLibrary {
    fn functions(&self) -> &[HleFunction] {
        match &self.priority {
            PriorityList::LowPriority(fns) => fns,
            PriorityList::HighPriority(fns) => fns,
        }
    }
}

/// One HLE module, grouping the libraries it exports.
#[derive(Debug, Clone)]
pub struct HleModule {
    pub name: String,
    pub default_mode: HlePolicy,
    pub libraries: Vec<HleLibrary>,
}

/// The full set of modules the host re-implements, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct HleRegistry {
    pub modules: Vec<HleModule>,
}

impl HleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_module(&self, name: &str) -> Option<&HleModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    fn find_library<'a>(module: &'a HleModule, name: &str) -> Option<&'a HleLibrary> {
        module.libraries.iter().find(|l| l.name == name)
    }

    /// Decision tree per the HLE policy: whether the guest's own binary
    /// implementation of `symbol_name` should run, as opposed to the host's.
    pub fn should_load_lle_symbol(&self, symbol_name: &str, module_name: &str, library_name: &str) -> bool {
        let Some(module) = self.find_module(module_name) else {
            return true; // unknown modules default to LLE
        };

        let Some(library) = Self::find_library(module, library_name) else {
            return module.default_mode == HlePolicy::Lle;
        };

        if library.default_mode == HlePolicy::Lle {
            return true;
        }

        library.lle_symbols.iter().any(|s| s == symbol_name)
    }

    /// Every `(synthetic_name, address)` pair that should be registered in
    /// the low-priority HLE pass: a library's `low_priority` list, or the
    /// non-listed siblings of a `high_priority` list.
    pub fn low_priority_entries(&self) -> Vec<(String, SymbolAddress)> {
        self.priority_entries(|lib| matches!(lib.priority, PriorityList::LowPriority(_)))
    }

    /// Every `(synthetic_name, address)` pair for the high-priority pass:
    /// a library's `high_priority` list.
    pub fn high_priority_entries(&self) -> Vec<(String, SymbolAddress)> {
        self.priority_entries(|lib| matches!(lib.priority, PriorityList::HighPriority(_)))
    }

    fn priority_entries(&self, wanted: impl Fn(&HleLibrary) -> bool) -> Vec<(String, SymbolAddress)> {
        let mut out = Vec::new();
        for module in &self.modules {
            for library in &module.libraries {
                if wanted(library) {
                    for func in library.functions() {
                        out.push((
                            format!("{}#{}#{}", func.name, module.name, library.name),
                            func.address,
                        ));
                    }
                }
            }
        }
        out
    }
}
