/// Static lookup from an 11-character NID hash to its canonical symbol name.
///
/// Entries are sorted by hash and searched with `binary_search_by_key`, the
/// same structure the zero-copy table views elsewhere in this crate use for
/// sorted lookup. The full table is generated offline from the ps4libdoc
/// dataset by a tool out of scope for this crate; `builtin()` ships a small
/// representative sample so the codec can be exercised end to end, and
/// `from_entries` lets a host substitute a complete table without touching
/// the loader core.
pub struct NidTable {
    entries: Vec<(String, String)>,
}

impl NidTable {
    /// Builds a table from `(hash, name)` pairs, sorting them for lookup.
    pub fn from_entries<I, H, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (H, N)>,
        H: Into<String>,
        N: Into<String>,
    {
        let mut entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(h, n)| (h.into(), n.into()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        NidTable { entries }
    }

    /// Looks up `hash`, returning the input unchanged on a miss.
    pub fn lookup<'a>(&'a self, hash: &'a str) -> &'a str {
        match self.entries.binary_search_by(|(h, _)| h.as_str().cmp(hash)) {
            Ok(idx) => self.entries[idx].1.as_str(),
            Err(_) => hash,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A small representative sample of well-known libkernel/libc NIDs,
    /// sufficient to exercise the codec end to end. A complete table
    /// produced by an external generator should be loaded with
    /// [`NidTable::from_entries`] instead.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_NIDS.iter().map(|&(h, n)| (h, n)))
    }
}

impl Default for NidTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A small sample of real PS4 NIDs (libkernel and libSceLibcInternal) used
/// as the built-in table. Sourced informally from the well-known ps4libdoc
/// mappings; not exhaustive.
const BUILTIN_NIDS: &[(&str, &str)] = &[
    ("Xjoosiw+XPI", "sceKernelMapNamedFlexibleMemory"),
    ("WB411CIVz5s", "sceKernelGetProcessTime"),
    ("aeEzr5nSlzQ", "sceKernelIsNeoMode"),
    ("b8LwayiiaIU", "sceKernelAllocateMainDirectMemory"),
    ("cWwEJqCbUy8", "sceKernelMapDirectMemory"),
    ("rdIOxvtOjZ0", "sceKernelReleaseDirectMemory"),
    ("WD6BTesJWkg", "sceKernelGetPageTableStats"),
    ("6xVpy0Fdq+I", "memcpy"),
    ("Vxq2SdgR9PM", "memset"),
    ("J4VpLsk+EXo", "strlen"),
];
