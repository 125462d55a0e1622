use super::dynamic::{LibraryInfoValue, ModuleInfoValue};

/// A named `DT_SCE_MODULE_INFO` / `DT_SCE_NEEDED_MODULE` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    pub name: String,
    pub value: ModuleInfoValue,
}

/// A named `DT_SCE_EXPORT_LIB` / `DT_SCE_IMPORT_LIB` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRef {
    pub name: String,
    pub value: LibraryInfoValue,
}
