use std::num::NonZeroUsize;

/// An opaque host address for a loaded symbol, always pointing into an RWX
/// page region owned by some [`crate::loader::LoadedModule`].
///
/// Keeping this a newtype instead of a bare `usize` confines the
/// pointer-casting unsafety to [`crate::loader::LoadedModule::function_pointer`]
/// and to construction at load time, rather than letting raw addresses
/// circulate through the symbol table and publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolAddress(NonZeroUsize);

impl SymbolAddress {
    /// Builds a `SymbolAddress` from a raw host pointer value, or `None` if
    /// it's null (mirrors a not-present OELF field: `st_value == 0`, a
    /// zero `DT_INIT`, etc).
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(SymbolAddress)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}
