use crate::align::align_down;
use crate::error::{LoaderError, LoaderResult};
use crate::nid;
use crate::oelf::consts::{PT_LOAD, PT_SCE_RELRO};
use crate::oelf::Oelf;
use crate::page::{self, PageRegion, Protection};
use crate::self_file;
use crate::symbols::SymbolAddress;
use std::collections::HashMap;
use std::ffi::c_void;
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// System-V x86_64 signature for an OELF's `DT_INIT` entry point.
pub type InitProc = unsafe extern "C" fn(usize, *const *const u8, extern "C" fn()) -> i32;
/// System-V x86_64 signature for an OELF's ELF entry point.
pub type EntryPoint = unsafe extern "C" fn(*mut c_void, extern "C" fn()) -> *mut c_void;

/// One symbol as it appears in the OELF's symbol table, before publication.
#[derive(Debug, Clone)]
pub struct RawSymbol {
    pub name: String,
    pub is_encoded: bool,
    pub sym_type: u8,
    pub binding: u8,
    pub address: Option<SymbolAddress>,
}

impl RawSymbol {
    pub fn binding_is_weak(&self) -> bool {
        self.binding == crate::oelf::consts::STB_WEAK
    }

    pub fn binding_is_local(&self) -> bool {
        self.binding == crate::oelf::consts::STB_LOCAL
    }
}

/// A module mapped into host memory, owning its RWX backing pages.
#[derive(Debug)]
pub struct LoadedModule {
    pub id: u16,
    pub name: String,
    pub export_name: String,
    pub dependencies: Vec<String>,
    pub is_lib: bool,
    pub data: PageRegion,
    pub code_section: Range<usize>,
    pub data_section: Range<usize>,
    pub relro_section: Range<usize>,
    pub init_proc: Option<SymbolAddress>,
    pub entry_point: Option<SymbolAddress>,
    pub proc_param: Option<SymbolAddress>,
    pub raw_symbols: Vec<RawSymbol>,
    pub locals: HashMap<String, SymbolAddress>,
    pub module_id_to_name: HashMap<u16, String>,
    pub library_id_to_name: HashMap<u16, String>,
    /// The reconstructed OELF source buffer, kept only when
    /// `LoaderConfig::keep_self_backing` is set.
    pub self_backing: Option<Vec<u8>>,
}

impl LoadedModule {
    pub fn code_section(&self) -> &[u8] {
        &self.data.as_slice()[self.code_section.clone()]
    }

    pub fn data_section(&self) -> &[u8] {
        &self.data.as_slice()[self.data_section.clone()]
    }

    pub fn relro_section(&self) -> &[u8] {
        &self.data.as_slice()[self.relro_section.clone()]
    }

    /// Reinterprets a raw published address as a callable function pointer.
    ///
    /// # Safety
    /// `addr` must genuinely point at code of signature `F`, and `F` must be
    /// a function-pointer type (same size as a `usize`).
    pub unsafe fn function_pointer<F: Copy>(addr: SymbolAddress) -> F {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
        let ptr = addr.get() as *const ();
        std::mem::transmute_copy(&ptr)
    }
}

impl nid::NidNameResolver for LoadedModule {
    fn import_module_name_by_id(&self, id: u16) -> Option<&str> {
        self.module_id_to_name.get(&id).map(String::as_str)
    }

    fn import_library_name_by_id(&self, id: u16) -> Option<&str> {
        self.library_id_to_name.get(&id).map(String::as_str)
    }
}

/// The module registry: an ordered list of loaded modules plus a `name → index`
/// map, keyed by file stem so dependency cycles short-circuit on lookup.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<LoadedModule>,
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LoadedModule> {
        self.modules.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&LoadedModule> {
        self.index.get(name).and_then(|&i| self.modules.get(i))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedModule> {
        self.modules.iter()
    }

    /// Loads `path`, returning its registry index. Idempotent by file stem:
    /// a module already present is returned without re-reading the file.
    /// `keep_self_backing` controls whether the reconstructed OELF source
    /// buffer is retained on the resulting `LoadedModule`.
    pub fn load_file(&mut self, path: &Path, keep_self_backing: bool) -> LoaderResult<usize> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        if let Some(&index) = self.index.get(&stem) {
            return Ok(index);
        }

        let mut file = File::open(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let buffer = if magic == self_file::SELF_MAGIC {
            let mut stream = std::io::Cursor::new({
                let mut rest = Vec::new();
                file.read_to_end(&mut rest).map_err(|source| LoaderError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let mut whole = magic.to_vec();
                whole.extend(rest);
                whole
            });
            self_file::reconstruct(&mut stream)?
        } else if magic == crate::oelf::consts::ELF_MAGIC {
            let mut rest = Vec::new();
            file.read_to_end(&mut rest).map_err(|source| LoaderError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let mut whole = magic.to_vec();
            whole.extend(rest);
            whole
        } else {
            return Err(LoaderError::InvalidSelfOrOElf);
        };

        let oelf = Oelf::parse(buffer)?;

        if oelf.mapped_size == 0 {
            return Err(LoaderError::NothingToLoad);
        }
        if oelf.export_modules.is_empty() {
            return Err(LoaderError::NoModuleInfo);
        }

        // Reserve the slot before population so a dependency cycle observes
        // "already loaded" instead of recursing.
        let index = self.modules.len();
        self.index.insert(stem.clone(), index);
        self.modules.push(placeholder_module(stem.clone()));

        let module = match build_module(stem.clone(), &oelf, keep_self_backing) {
            Ok(module) => module,
            Err(e) => {
                self.modules.pop();
                self.index.remove(&stem);
                return Err(e);
            }
        };

        log::info!(
            "loaded module '{}' (id {:#x}, {} bytes mapped)",
            module.name,
            module.id,
            module.data.len()
        );

        self.modules[index] = module;
        Ok(index)
    }
}

fn placeholder_module(stem: String) -> LoadedModule {
    LoadedModule {
        id: 0,
        name: stem,
        export_name: String::new(),
        dependencies: Vec::new(),
        is_lib: false,
        data: page::alloc(0, Protection::empty()).expect("zero-length placeholder allocation"),
        code_section: 0..0,
        data_section: 0..0,
        relro_section: 0..0,
        init_proc: None,
        entry_point: None,
        proc_param: None,
        raw_symbols: Vec::new(),
        locals: HashMap::new(),
        module_id_to_name: HashMap::new(),
        library_id_to_name: HashMap::new(),
        self_backing: None,
    }
}

fn build_module(stem: String, oelf: &Oelf, keep_self_backing: bool) -> LoaderResult<LoadedModule> {
    let is_lib = oelf.header.is_lib();
    let base = oelf.load_addr_begin;

    let mut data = page::alloc(oelf.mapped_size as usize, Protection::RWX)?;

    let mut code_section: Option<Range<usize>> = None;
    let mut data_section: Option<Range<usize>> = None;
    let mut relro_section: Option<Range<usize>> = None;

    for ph in oelf
        .program_headers
        .iter()
        .filter(|p| p.p_type == PT_LOAD || p.p_type == PT_SCE_RELRO)
    {
        let align = ph.p_align.max(1);
        let dest_start = (align_down(ph.p_vaddr, align) - base) as usize;
        let dest_end = dest_start + ph.p_memsz as usize;

        let src_start = ph.p_offset as usize;
        let src_end = src_start + ph.p_filesz as usize;
        data.as_mut_slice()[dest_start..dest_start + ph.p_filesz as usize]
            .copy_from_slice(&oelf.buffer[src_start..src_end]);

        let range = dest_start..dest_end;
        if ph.p_type == PT_SCE_RELRO {
            if relro_section.is_some() {
                return Err(LoaderError::MoreThanOneRelroSection);
            }
            relro_section = Some(range);
        } else if ph.is_executable() {
            if code_section.is_some() {
                return Err(LoaderError::MoreThanOneCodeSection);
            }
            code_section = Some(range);
        } else if ph.is_readable() {
            if data_section.is_some() {
                return Err(LoaderError::MoreThanOneDataSection);
            }
            data_section = Some(range);
        }
    }

    let code_section = code_section.ok_or(LoaderError::NotAllSectionsArePresent)?;
    let data_section = data_section.ok_or(LoaderError::NotAllSectionsArePresent)?;
    let relro_section = relro_section.ok_or(LoaderError::NotAllSectionsArePresent)?;

    let resolve = |vaddr: u64| -> Option<SymbolAddress> {
        if vaddr == 0 {
            return None;
        }
        SymbolAddress::new(data.as_ptr() as usize + (vaddr - base) as usize)
    };

    let init_proc = oelf.init_proc_offset.and_then(resolve);
    let proc_param = oelf.proc_param_offset.and_then(resolve);
    let entry_point = resolve(oelf.header.e_entry);

    let mut raw_symbols = Vec::with_capacity(oelf.symbols.len());
    let mut locals = HashMap::new();
    for sym in &oelf.symbols {
        let address = resolve(sym.sym.st_value);
        if sym.sym.is_local() {
            if let Some(addr) = address {
                locals.insert(sym.name.clone(), addr);
            }
        }
        raw_symbols.push(RawSymbol {
            name: sym.name.clone(),
            is_encoded: sym.is_encoded(),
            sym_type: sym.sym.sym_type(),
            binding: sym.sym.bind(),
            address,
        });
    }

    let mut module_id_to_name = HashMap::new();
    for module_ref in &oelf.import_modules {
        if module_ref.value.id == 0 {
            return Err(LoaderError::ImportModuleIdNotDefined);
        }
        module_id_to_name.insert(module_ref.value.id, module_ref.name.clone());
    }

    let mut library_id_to_name = HashMap::new();
    for lib_ref in &oelf.import_libraries {
        library_id_to_name.insert(lib_ref.value.id, lib_ref.name.clone());
    }

    let export_module = &oelf.export_modules[0];
    let self_backing = keep_self_backing.then(|| oelf.buffer.clone());

    Ok(LoadedModule {
        id: export_module.value.id,
        name: stem,
        export_name: export_module.name.clone(),
        dependencies: oelf.needed_files.clone(),
        is_lib,
        data,
        code_section,
        data_section,
        relro_section,
        init_proc,
        entry_point,
        proc_param,
        raw_symbols,
        locals,
        module_id_to_name,
        library_id_to_name,
        self_backing,
    })
}

/// Resolves a dependency name to a concrete path via `LoaderConfig::search_dirs`.
/// Matches by extension-insensitive file stem; falls back to the bare name
/// unchanged on a total miss (the subsequent open then errors visibly).
pub fn search_for_module_file(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let wanted_stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    for dir in search_dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let stem_matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case(wanted_stem))
                .unwrap_or(false);
            if stem_matches {
                return path;
            }
        }
    }

    log::error!(
        "couldn't find module '{name}' in any search directory; please make sure you have \
         the PS4 firmware system directory inside the directory with the executable"
    );
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oelf::consts::{PF_R, PF_W, PF_X};
    use crate::oelf::{Elf64Header, Elf64ProgramHeader, Oelf};

    fn empty_oelf() -> Oelf {
        Oelf {
            buffer: vec![0u8; 0x3000],
            header: Elf64Header::default(),
            program_headers: Vec::new(),
            symbols: Vec::new(),
            rela: Vec::new(),
            jmprel: Vec::new(),
            needed_files: Vec::new(),
            export_modules: Vec::new(),
            import_modules: Vec::new(),
            export_libraries: Vec::new(),
            import_libraries: Vec::new(),
            mapped_size: 0x3000,
            load_addr_begin: 0,
            init_proc_offset: None,
            proc_param_offset: None,
        }
    }

    fn code_ph(vaddr: u64) -> Elf64ProgramHeader {
        Elf64ProgramHeader {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_X,
            p_vaddr: vaddr,
            p_memsz: 0x10,
            p_filesz: 0x10,
            p_align: 1,
            ..Default::default()
        }
    }

    fn data_ph(vaddr: u64) -> Elf64ProgramHeader {
        Elf64ProgramHeader {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_W,
            p_vaddr: vaddr,
            p_memsz: 0x10,
            p_filesz: 0x10,
            p_align: 1,
            ..Default::default()
        }
    }

    fn relro_ph(vaddr: u64) -> Elf64ProgramHeader {
        Elf64ProgramHeader {
            p_type: PT_SCE_RELRO,
            p_flags: PF_R,
            p_vaddr: vaddr,
            p_memsz: 0x10,
            p_filesz: 0,
            p_align: 1,
            ..Default::default()
        }
    }

    #[test]
    fn rejects_a_second_code_section() {
        let mut oelf = empty_oelf();
        oelf.program_headers.push(code_ph(0));
        oelf.program_headers.push(code_ph(0x100));

        assert!(matches!(
            build_module("eboot".into(), &oelf, false),
            Err(LoaderError::MoreThanOneCodeSection)
        ));
    }

    #[test]
    fn rejects_a_second_data_section() {
        let mut oelf = empty_oelf();
        oelf.program_headers.push(data_ph(0));
        oelf.program_headers.push(data_ph(0x100));

        assert!(matches!(
            build_module("eboot".into(), &oelf, false),
            Err(LoaderError::MoreThanOneDataSection)
        ));
    }

    #[test]
    fn rejects_a_second_relro_section() {
        let mut oelf = empty_oelf();
        oelf.program_headers.push(relro_ph(0));
        oelf.program_headers.push(relro_ph(0x100));

        assert!(matches!(
            build_module("eboot".into(), &oelf, false),
            Err(LoaderError::MoreThanOneRelroSection)
        ));
    }

    #[test]
    fn rejects_a_module_missing_a_required_section() {
        let mut oelf = empty_oelf();
        oelf.program_headers.push(code_ph(0));
        oelf.program_headers.push(data_ph(0x100));
        // No PT_SCE_RELRO segment.

        assert!(matches!(
            build_module("eboot".into(), &oelf, false),
            Err(LoaderError::NotAllSectionsArePresent)
        ));
    }

    #[test]
    fn rejects_an_import_module_using_the_reserved_id_zero() {
        use crate::oelf::{ModuleInfoValue, ModuleRef};

        let mut oelf = empty_oelf();
        oelf.program_headers.push(code_ph(0));
        oelf.program_headers.push(data_ph(0x100));
        oelf.program_headers.push(relro_ph(0x200));
        oelf.import_modules.push(ModuleRef {
            name: "libkernel".into(),
            value: ModuleInfoValue {
                name_offset: 0,
                version_minor: 0,
                version_major: 1,
                id: 0,
            },
        });

        assert!(matches!(
            build_module("eboot".into(), &oelf, false),
            Err(LoaderError::ImportModuleIdNotDefined)
        ));
    }

    #[test]
    fn search_finds_an_extensioned_dependency_by_stem() {
        let dir = std::env::temp_dir().join(format!("orbis-loader-search-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let target = dir.join("libSceFios2.sprx");
        std::fs::write(&target, b"").unwrap();

        // The dependency name carries an extension, same as a real DT_NEEDED entry.
        let found = search_for_module_file("libSceFios2.sprx", &[dir.clone()]);
        assert_eq!(found, target);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn search_falls_back_to_the_bare_name_on_a_total_miss() {
        let found = search_for_module_file("libSceNotPresent.sprx", &[]);
        assert_eq!(found, PathBuf::from("libSceNotPresent.sprx"));
    }
}
