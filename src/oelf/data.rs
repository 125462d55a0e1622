use super::consts::{dt, PT_DYNAMIC, PT_LOAD, PT_SCE_DYNLIBDATA, PT_SCE_PROCPARAM, PT_SCE_RELRO};
use super::dynamic::{DynamicTable, LibraryInfoValue, ModuleInfoValue};
use super::header::Elf64Header;
use super::module_table::{LibraryRef, ModuleRef};
use super::program_header::{Elf64ProgramHeader, ProgramHeaderTable};
use super::rela::{parse_rela_table, Elf64Rela};
use super::strtab::Strtab;
use super::symbol::{Elf64Sym, SymbolTable};
use crate::align::align_down;
use crate::error::{OelfError, RequiredTable};
use crate::nid;

/// A parsed symbol: the raw on-disk record plus its resolved name.
#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub sym: Elf64Sym,
    pub name: String,
}

impl SymbolRecord {
    pub fn is_encoded(&self) -> bool {
        nid::is_encoded(&self.name)
    }
}

/// The full result of parsing an OELF: the owning buffer plus every view and
/// table a loaded module needs.
#[derive(Debug)]
pub struct Oelf {
    pub buffer: Vec<u8>,
    pub header: Elf64Header,
    pub program_headers: Vec<Elf64ProgramHeader>,
    pub symbols: Vec<SymbolRecord>,
    pub rela: Vec<Elf64Rela>,
    pub jmprel: Vec<Elf64Rela>,
    pub needed_files: Vec<String>,
    pub export_modules: Vec<ModuleRef>,
    pub import_modules: Vec<ModuleRef>,
    pub export_libraries: Vec<LibraryRef>,
    pub import_libraries: Vec<LibraryRef>,
    pub mapped_size: u64,
    pub load_addr_begin: u64,
    pub init_proc_offset: Option<u64>,
    pub proc_param_offset: Option<u64>,
}

#[derive(Default)]
struct RequiredOffsets {
    symtab: Option<u64>,
    symtabsz: Option<u64>,
    strtab: Option<u64>,
    strsz: Option<u64>,
    rela: Option<u64>,
    relasz: Option<u64>,
    jmprel: Option<u64>,
    pltrelsz: Option<u64>,
}

fn set_once(slot: &mut Option<u64>, value: u64, which: RequiredTable) -> Result<(), OelfError> {
    if slot.is_some() {
        return Err(OelfError::MoreThanOne(which));
    }
    *slot = Some(value);
    Ok(())
}

impl Oelf {
    /// Parses `buffer` as an OELF: header, program headers, the one
    /// required `PT_DYNAMIC`/`PT_SCE_DYNLIBDATA` pair, and the dynamic
    /// array's required Sony tags.
    pub fn parse(buffer: Vec<u8>) -> Result<Self, OelfError> {
        let header = Elf64Header::parse(&buffer)?;

        let ph_table = ProgramHeaderTable::new(
            &buffer,
            header.e_phoff as usize,
            header.e_phentsize as usize,
            header.e_phnum as usize,
        );
        let program_headers: Vec<Elf64ProgramHeader> = ph_table.iter().collect();

        // First pass: loadable span, the one PT_DYNAMIC, the one PT_SCE_DYNLIBDATA.
        let mut load_addr_begin: Option<u64> = None;
        let mut load_addr_end: u64 = 0;
        let mut dynamic_bytes: Option<&[u8]> = None;
        let mut dynlib_base: Option<u64> = None;
        let mut proc_param_offset: Option<u64> = None;

        for ph in &program_headers {
            if ph.p_type == PT_LOAD || ph.p_type == PT_SCE_RELRO {
                load_addr_begin = Some(load_addr_begin.map_or(ph.p_vaddr, |b| b.min(ph.p_vaddr)));
                let end = align_down(ph.p_vaddr + ph.p_memsz, ph.p_align.max(1));
                load_addr_end = load_addr_end.max(end);
            }

            if ph.p_type == PT_DYNAMIC {
                if dynamic_bytes.is_some() {
                    return Err(OelfError::MoreThanOne(RequiredTable::Dynamic));
                }
                let start = ph.p_offset as usize;
                let end = start + ph.p_filesz as usize;
                dynamic_bytes = Some(
                    buffer
                        .get(start..end)
                        .ok_or(OelfError::Malformed("PT_DYNAMIC segment out of bounds".into()))?,
                );
            }

            if ph.p_type == PT_SCE_DYNLIBDATA {
                if dynlib_base.is_some() {
                    return Err(OelfError::MoreThanOne(RequiredTable::Dynlib));
                }
                dynlib_base = Some(ph.p_offset);
            }

            if ph.p_type == PT_SCE_PROCPARAM {
                proc_param_offset = Some(ph.p_vaddr);
            }
        }

        let dynamic_bytes =
            dynamic_bytes.ok_or(OelfError::CouldntFind(RequiredTable::Dynamic))?;
        let dynlib_base = dynlib_base.ok_or(OelfError::CouldntFind(RequiredTable::Dynlib))?;

        let load_addr_begin = load_addr_begin.unwrap_or(0);
        let mapped_size = load_addr_end.saturating_sub(load_addr_begin);

        // Single pass over the dynamic array: record required unique
        // offsets/sizes and accumulate the counted reference lists. A
        // second pass purely for pre-counting (as the source does for a
        // fixed-size array) is unnecessary here since `Vec` grows on demand.
        let mut offsets = RequiredOffsets::default();
        let mut needed_tags: Vec<u64> = Vec::new();
        let mut module_info_tags: Vec<(u64, u64)> = Vec::new(); // (tag, d_val)
        let mut init_proc_offset = None;

        for entry in DynamicTable::new(dynamic_bytes).iter() {
            match entry.d_tag {
                dt::DT_NEEDED => needed_tags.push(entry.d_val),
                dt::DT_INIT => init_proc_offset = Some(entry.d_val),
                dt::DT_SCE_SYMTAB => set_once(&mut offsets.symtab, entry.d_val, RequiredTable::SymTab)?,
                dt::DT_SCE_SYMTABSZ => {
                    set_once(&mut offsets.symtabsz, entry.d_val, RequiredTable::SymTabSz)?
                }
                dt::DT_SCE_STRTAB => set_once(&mut offsets.strtab, entry.d_val, RequiredTable::StrTab)?,
                dt::DT_SCE_STRSZ => set_once(&mut offsets.strsz, entry.d_val, RequiredTable::StrSz)?,
                dt::DT_SCE_RELA => set_once(&mut offsets.rela, entry.d_val, RequiredTable::Rela)?,
                dt::DT_SCE_RELASZ => {
                    set_once(&mut offsets.relasz, entry.d_val, RequiredTable::RelaSz)?
                }
                dt::DT_SCE_JMPREL => {
                    set_once(&mut offsets.jmprel, entry.d_val, RequiredTable::JmpRel)?
                }
                dt::DT_SCE_PLTRELSZ => {
                    set_once(&mut offsets.pltrelsz, entry.d_val, RequiredTable::PltRelaSz)?
                }
                dt::DT_SCE_MODULE_INFO
                | dt::DT_SCE_NEEDED_MODULE
                | dt::DT_SCE_EXPORT_LIB
                | dt::DT_SCE_IMPORT_LIB => module_info_tags.push((entry.d_tag, entry.d_val)),
                _ => {}
            }
        }

        let symtab_off = offsets.symtab.ok_or(OelfError::CouldntFind(RequiredTable::SymTab))?;
        let symtab_sz = offsets
            .symtabsz
            .ok_or(OelfError::CouldntFind(RequiredTable::SymTabSz))?;
        let strtab_off = offsets.strtab.ok_or(OelfError::CouldntFind(RequiredTable::StrTab))?;
        let strtab_sz = offsets.strsz.ok_or(OelfError::CouldntFind(RequiredTable::StrSz))?;
        let rela_off = offsets.rela.ok_or(OelfError::CouldntFind(RequiredTable::Rela))?;
        let rela_sz = offsets.relasz.ok_or(OelfError::CouldntFind(RequiredTable::RelaSz))?;
        let jmprel_off = offsets.jmprel.ok_or(OelfError::CouldntFind(RequiredTable::JmpRel))?;
        let pltrelsz = offsets
            .pltrelsz
            .ok_or(OelfError::CouldntFind(RequiredTable::PltRelaSz))?;

        let slice_at = |off: u64, len: u64| -> Result<&[u8], OelfError> {
            let start = (dynlib_base + off) as usize;
            let end = start + len as usize;
            buffer
                .get(start..end)
                .ok_or(OelfError::Malformed(format!(
                    "dynlib-relative table at {start}..{end} is out of bounds"
                )))
        };

        let strtab = Strtab::new(slice_at(strtab_off, strtab_sz)?);
        let symtab = SymbolTable::new(slice_at(symtab_off, symtab_sz)?, symtab_sz as usize);
        let rela = parse_rela_table(slice_at(rela_off, rela_sz)?);
        let jmprel = parse_rela_table(slice_at(jmprel_off, pltrelsz)?);

        let symbols = symtab
            .iter()
            .map(|sym| {
                let name = strtab.get(sym.st_name as usize).unwrap_or_default().to_string();
                SymbolRecord { sym, name }
            })
            .collect();

        let needed_files = needed_tags
            .into_iter()
            .map(|off| strtab.get(off as usize).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        let mut export_modules = Vec::new();
        let mut import_modules = Vec::new();
        let mut export_libraries = Vec::new();
        let mut import_libraries = Vec::new();

        for (tag, d_val) in module_info_tags {
            match tag {
                dt::DT_SCE_MODULE_INFO | dt::DT_SCE_NEEDED_MODULE => {
                    let value = ModuleInfoValue::unpack(d_val);
                    let name = strtab.get(value.name_offset as usize)?.to_string();
                    let entry = ModuleRef { name, value };
                    if tag == dt::DT_SCE_MODULE_INFO {
                        export_modules.push(entry);
                    } else {
                        import_modules.push(entry);
                    }
                }
                dt::DT_SCE_EXPORT_LIB | dt::DT_SCE_IMPORT_LIB => {
                    let value = LibraryInfoValue::unpack(d_val);
                    let name = strtab.get(value.name_offset as usize)?.to_string();
                    let entry = LibraryRef { name, value };
                    if tag == dt::DT_SCE_EXPORT_LIB {
                        export_libraries.push(entry);
                    } else {
                        import_libraries.push(entry);
                    }
                }
                _ => unreachable!(),
            }
        }

        Ok(Oelf {
            buffer,
            header,
            program_headers,
            symbols,
            rela,
            jmprel,
            needed_files,
            export_modules,
            import_modules,
            export_libraries,
            import_libraries,
            mapped_size,
            load_addr_begin,
            init_proc_offset,
            proc_param_offset,
        })
    }

    pub fn code_segment(&self) -> Option<&Elf64ProgramHeader> {
        self.program_headers
            .iter()
            .find(|p| p.p_type == PT_LOAD && p.is_executable())
    }

    pub fn data_segment(&self) -> Option<&Elf64ProgramHeader> {
        self.program_headers
            .iter()
            .find(|p| p.p_type == PT_LOAD && !p.is_executable() && p.is_readable())
    }

    pub fn relro_segment(&self) -> Option<&Elf64ProgramHeader> {
        self.program_headers.iter().find(|p| p.p_type == PT_SCE_RELRO)
    }
}
