//! Reconstruction of a contiguous OELF buffer from a "fake" (pre-decrypted)
//! SELF container.
//!
//! Layout: `CommonHeader (8B) | ExtendedHeader (32B) | Entry × num_entries | ELF region`.
//! Only fake SELFs are supported; decrypting a real, signed container is out
//! of scope here.

use crate::error::{SelfError, SelfResult};
use crate::offset_stream::OffsetStream;
use crate::oelf::{Elf64Header, Elf64ProgramHeader, SIZEOF_EHDR};
use scroll::{Pread, SizeWith, LE};
use std::io::{Read, Seek, SeekFrom};

pub const SELF_MAGIC: [u8; 4] = [0x4F, 0x15, 0x3D, 0x1D];

/// Container `mode` value meaning "fake self, already decrypted". Any other
/// value means the container wraps an encrypted image this crate can't read.
pub const SELF_PTYPE_FAKE: u8 = 0x1;

const SIZEOF_PHDR: usize = 56;
const SIZEOF_ENTRY: usize = 32;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pread, Pwrite, SizeWith)]
struct CommonHeader {
    magic: [u8; 4],
    version: u8,
    mode: u8,
    endian: u8,
    attribs: u8,
}

const SIZEOF_COMMON_HEADER: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pread, Pwrite, SizeWith)]
struct ExtendedHeader {
    key_type: u32,
    header_size: u16,
    meta_size: u16,
    file_size: u64,
    num_entries: u16,
    flags: u16,
    _pad: [u8; 4],
    _reserved: [u8; 8],
}

const SIZEOF_EXTENDED_HEADER: usize = 32;

/// A single blob-location entry in the fake SELF's entry table.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pread, Pwrite, SizeWith)]
struct Entry {
    props: u64,
    offset: u64,
    filesz: u64,
    memsz: u64,
}

impl Entry {
    /// Whether this entry carries a real segment blob (as opposed to
    /// metadata like a signature or key, which is ignored).
    fn is_blocked(&self) -> bool {
        self.props & 0x800 != 0
    }

    fn program_header_index(&self) -> usize {
        ((self.props >> 20) & 0xFFF) as usize
    }
}

/// Reconstructs the embedded OELF from a fake SELF container read from `stream`.
pub fn reconstruct<R: Read + Seek>(stream: &mut R) -> SelfResult<Vec<u8>> {
    let mut common_buf = [0u8; SIZEOF_COMMON_HEADER];
    stream.read_exact(&mut common_buf).map_err(|_| SelfError::Truncated)?;
    if common_buf[0..4] != SELF_MAGIC {
        return Err(SelfError::InvalidMagic);
    }
    let common: CommonHeader = common_buf.pread_with(0, LE)?;
    if common.mode != SELF_PTYPE_FAKE {
        return Err(SelfError::NotFake { ptype: common.mode });
    }

    let mut ext_buf = [0u8; SIZEOF_EXTENDED_HEADER];
    stream.read_exact(&mut ext_buf).map_err(|_| SelfError::Truncated)?;
    let ext: ExtendedHeader = ext_buf.pread_with(0, LE)?;

    let entries_offset = (SIZEOF_COMMON_HEADER + SIZEOF_EXTENDED_HEADER) as u64;
    let mut entries_buf = vec![0u8; ext.num_entries as usize * SIZEOF_ENTRY];
    stream.read_exact(&mut entries_buf).map_err(|_| SelfError::Truncated)?;
    let entries: Vec<Entry> = (0..ext.num_entries as usize)
        .map(|i| entries_buf.pread_with::<Entry>(i * SIZEOF_ENTRY, LE))
        .collect::<Result<_, _>>()?;

    let elf_offset = entries_offset + entries_buf.len() as u64;

    let mut elf_stream = OffsetStream::new(&mut *stream, elf_offset).map_err(SelfError::Io)?;
    let mut header_buf = [0u8; SIZEOF_EHDR];
    elf_stream.read_exact(&mut header_buf).map_err(|_| SelfError::Truncated)?;
    let header = Elf64Header::parse(&header_buf).map_err(|_| SelfError::InvalidMagic)?;

    elf_stream
        .seek(SeekFrom::Start(header.e_phoff))
        .map_err(SelfError::Io)?;
    let mut phdr_buf = vec![0u8; header.e_phnum as usize * SIZEOF_PHDR];
    elf_stream.read_exact(&mut phdr_buf).map_err(|_| SelfError::Truncated)?;
    let program_headers: Vec<Elf64ProgramHeader> = (0..header.e_phnum as usize)
        .map(|i| phdr_buf.pread_with::<Elf64ProgramHeader>(i * SIZEOF_PHDR, LE))
        .collect::<Result<_, _>>()?;

    let elf_size = program_headers
        .iter()
        .map(|p| p.p_offset + p.p_filesz)
        .max()
        .unwrap_or(0);

    let clamp_bound = ext.file_size.max(elf_offset) - elf_offset;
    let min_offset = program_headers
        .iter()
        .map(|p| p.p_offset)
        .filter(|&off| off > 0)
        .min()
        .unwrap_or(0)
        .min(clamp_bound);

    let mut elf_data = vec![0u8; elf_size as usize];

    elf_stream.seek(SeekFrom::Start(0)).map_err(SelfError::Io)?;
    elf_stream
        .read_exact(&mut elf_data[..min_offset as usize])
        .map_err(|_| SelfError::Truncated)?;

    for entry in &entries {
        if !entry.is_blocked() {
            continue;
        }
        let index = entry.program_header_index();
        let ph = program_headers
            .get(index)
            .ok_or(SelfError::Truncated)?;

        let start = ph.p_offset as usize;
        let end = start + entry.filesz as usize;
        if end > elf_data.len() {
            return Err(SelfError::Truncated);
        }

        stream.seek(SeekFrom::Start(entry.offset)).map_err(SelfError::Io)?;
        stream
            .read_exact(&mut elf_data[start..end])
            .map_err(|_| SelfError::Truncated)?;
    }

    Ok(elf_data)
}
