//! Typed errors for every subsystem in this crate.
//!
//! Each subsystem gets its own enum instead of one crate-wide grab-bag, so a
//! caller pattern-matching on `OelfError` never has to think about SELF
//! container failures and vice versa. [`LoaderError`] is the top-level enum
//! returned by [`crate::loader`] and wraps the others.

use std::fmt;
use std::io;

/// Errors from reconstructing a fake SELF into a contiguous OELF buffer.
#[derive(Debug)]
pub enum SelfError {
    /// The first four bytes were not the fake-SELF magic.
    InvalidMagic,
    /// The container is a real (encrypted) SELF; only fake SELFs are supported.
    NotFake {
        /// The `ptype` field observed in the extended header.
        ptype: u8,
    },
    /// The stream ended before a header or entry could be fully read.
    Truncated,
    /// Underlying I/O failure while reading the stream.
    Io(io::Error),
}

impl fmt::Display for SelfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfError::InvalidMagic => write!(f, "not a fake SELF: bad magic"),
            SelfError::NotFake { ptype } => {
                write!(f, "SELF is not a fake (decrypted) container: ptype {ptype:#x}")
            }
            SelfError::Truncated => write!(f, "fake SELF container is truncated"),
            SelfError::Io(e) => write!(f, "I/O error while reading fake SELF: {e}"),
        }
    }
}

impl std::error::Error for SelfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SelfError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SelfError {
    fn from(e: io::Error) -> Self {
        SelfError::Io(e)
    }
}

/// Errors from parsing the Sony-extended OELF container.
#[derive(Debug)]
pub enum OelfError {
    /// The buffer did not start with the standard ELF magic.
    BadMagic([u8; 4]),
    /// A required, unique dynamic table or segment was never seen.
    CouldntFind(RequiredTable),
    /// A table/segment that must appear exactly once appeared more than once.
    MoreThanOne(RequiredTable),
    /// A string-table offset pointed at or past the end of the table.
    StringTableOverrun { offset: usize, len: usize },
    /// A symbol, relocation, or dynamic entry could not be read from the buffer.
    Scroll(scroll::Error),
    /// The OELF is otherwise structurally inconsistent.
    Malformed(String),
}

/// The table or segment a [`OelfError::CouldntFind`]/[`OelfError::MoreThanOne`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredTable {
    Dynamic,
    Dynlib,
    SymTab,
    SymTabSz,
    StrTab,
    StrSz,
    Rela,
    RelaSz,
    JmpRel,
    PltRelaSz,
}

impl fmt::Display for RequiredTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequiredTable::Dynamic => "PT_DYNAMIC segment",
            RequiredTable::Dynlib => "PT_SCE_DYNLIBDATA segment",
            RequiredTable::SymTab => "DT_SCE_SYMTAB",
            RequiredTable::SymTabSz => "DT_SCE_SYMTABSZ",
            RequiredTable::StrTab => "DT_SCE_STRTAB",
            RequiredTable::StrSz => "DT_SCE_STRSZ",
            RequiredTable::Rela => "DT_SCE_RELA",
            RequiredTable::RelaSz => "DT_SCE_RELASZ",
            RequiredTable::JmpRel => "DT_SCE_JMPREL",
            RequiredTable::PltRelaSz => "DT_SCE_PLTRELSZ",
        };
        f.write_str(name)
    }
}

impl fmt::Display for OelfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OelfError::BadMagic(m) => write!(f, "invalid ELF magic: {m:02x?}"),
            OelfError::CouldntFind(t) => write!(f, "OELF is missing required {t}"),
            OelfError::MoreThanOne(t) => write!(f, "OELF has more than one {t}"),
            OelfError::StringTableOverrun { offset, len } => write!(
                f,
                "string table offset {offset} is out of range for a table of length {len}"
            ),
            OelfError::Scroll(e) => write!(f, "malformed OELF structure: {e}"),
            OelfError::Malformed(msg) => write!(f, "malformed OELF: {msg}"),
        }
    }
}

impl std::error::Error for OelfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OelfError::Scroll(e) => Some(e),
            _ => None,
        }
    }
}

impl From<scroll::Error> for OelfError {
    fn from(e: scroll::Error) -> Self {
        OelfError::Scroll(e)
    }
}

/// Errors from decoding Sony's short NID symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NidError {
    /// An encoded name did not split into exactly three `#`-separated parts.
    InvalidNid,
    /// A base64-like id string was empty or longer than 11 characters, or
    /// contained a character outside the NID alphabet.
    InvalidEncodedValue,
}

impl fmt::Display for NidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NidError::InvalidNid => write!(f, "encoded symbol name is not of the form hash#mod#lib"),
            NidError::InvalidEncodedValue => {
                write!(f, "NID value string is empty, too long, or has an invalid character")
            }
        }
    }
}

impl std::error::Error for NidError {}

/// Errors from the host page allocator.
#[derive(Debug)]
pub enum PageError {
    /// The host refused to map or protect the requested region.
    Os(io::Error),
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::Os(e) => write!(f, "page allocator failure: {e}"),
        }
    }
}

impl std::error::Error for PageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PageError::Os(e) => Some(e),
        }
    }
}

/// Top-level error returned by [`crate::loader`] operations.
#[derive(Debug)]
pub enum LoaderError {
    /// Neither the fake-SELF nor the bare-ELF magic matched.
    InvalidSelfOrOElf,
    /// The parsed OELF has no loadable content (`mapped_size == 0`).
    NothingToLoad,
    /// The OELF declares no export modules, so it cannot be identified or loaded.
    NoModuleInfo,
    /// An imported module referenced id 0, which is reserved.
    ImportModuleIdNotDefined,
    /// One of the three mandatory segment categories (code/data/relro) is missing.
    NotAllSectionsArePresent,
    /// More than one segment mapped to the code category.
    MoreThanOneCodeSection,
    /// More than one segment mapped to the data category.
    MoreThanOneDataSection,
    /// More than one segment mapped to the relro category.
    MoreThanOneRelroSection,
    /// Failure opening or reading the module file, with the path for context.
    Io { path: std::path::PathBuf, source: io::Error },
    /// Failure reconstructing a fake SELF container.
    Self_(SelfError),
    /// Failure parsing the OELF structures.
    Oelf(OelfError),
    /// Failure allocating the module's RWX page region.
    Page(PageError),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::InvalidSelfOrOElf => {
                write!(f, "file is neither a fake SELF nor a bare ELF")
            }
            LoaderError::NothingToLoad => write!(f, "OELF has no loadable segments"),
            LoaderError::NoModuleInfo => write!(f, "OELF declares no export modules"),
            LoaderError::ImportModuleIdNotDefined => {
                write!(f, "an imported module used the reserved id 0")
            }
            LoaderError::NotAllSectionsArePresent => write!(
                f,
                "module is missing one of the required code/data/relro segments"
            ),
            LoaderError::MoreThanOneCodeSection => write!(f, "module has more than one code segment"),
            LoaderError::MoreThanOneDataSection => write!(f, "module has more than one data segment"),
            LoaderError::MoreThanOneRelroSection => {
                write!(f, "module has more than one relro segment")
            }
            LoaderError::Io { path, source } => write!(
                f,
                "couldn't read '{}': {source}. please make sure you have the PS4 \
                 firmware system directory inside the directory with the executable",
                path.display()
            ),
            LoaderError::Self_(e) => write!(f, "{e}"),
            LoaderError::Oelf(e) => write!(f, "{e}"),
            LoaderError::Page(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoaderError::Io { source, .. } => Some(source),
            LoaderError::Self_(e) => Some(e),
            LoaderError::Oelf(e) => Some(e),
            LoaderError::Page(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SelfError> for LoaderError {
    fn from(e: SelfError) -> Self {
        LoaderError::Self_(e)
    }
}

impl From<OelfError> for LoaderError {
    fn from(e: OelfError) -> Self {
        LoaderError::Oelf(e)
    }
}

impl From<PageError> for LoaderError {
    fn from(e: PageError) -> Self {
        LoaderError::Page(e)
    }
}

pub type SelfResult<T> = Result<T, SelfError>;
pub type OelfResult<T> = Result<T, OelfError>;
pub type NidResult<T> = Result<T, NidError>;
pub type PageResult<T> = Result<T, PageError>;
pub type LoaderResult<T> = Result<T, LoaderError>;
