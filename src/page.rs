//! Cross-platform RWX page allocation.
//!
//! The module loader needs to materialise guest code into memory the host
//! CPU can execute directly, which means requesting pages with a
//! combination of read/write/execute protection that the regular
//! [`std::alloc`] allocator has no notion of. This is implemented with
//! `mmap`/`mprotect`/`munmap` on POSIX-family hosts and
//! `VirtualAlloc`/`VirtualProtect`/`VirtualFree` on Windows, selected at
//! compile time via `cfg(unix)` / `cfg(windows)`.

use crate::error::PageError;
use bitflags::bitflags;
use std::io;
use std::ptr::NonNull;

bitflags! {
    /// Requested protection for a mapped region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Protection: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

impl Protection {
    pub const RWX: Self = Self::READ.union(Self::WRITE).union(Self::EXECUTE);
}

/// A single aligned, owned page mapping.
///
/// The reported [`PageRegion::len`] is the length the caller asked for, not
/// the page-rounded length actually reserved from the host, so a caller can
/// slice `0..len` without worrying about the rounding this module performs
/// internally.
#[derive(Debug)]
pub struct PageRegion {
    ptr: NonNull<u8>,
    len: usize,
    mapped_len: usize,
}

// The region is exclusively owned by whoever holds the `PageRegion`; there is
// no shared mutable state hiding behind the pointer.
unsafe impl Send for PageRegion {}

impl PageRegion {
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for PageRegion {
    fn drop(&mut self) {
        if self.mapped_len == 0 {
            return;
        }
        if let Err(e) = unsafe { os::free(self.ptr, self.mapped_len) } {
            log::warn!("failed to unmap {} byte page region: {e}", self.mapped_len);
        }
    }
}

fn page_size() -> usize {
    os::page_size()
}

/// Allocates a zero-initialised region at least `len` bytes long, with the
/// given protection, rounded up to the host page size.
pub fn alloc(len: usize, protection: Protection) -> Result<PageRegion, PageError> {
    let page = page_size();
    let mapped_len = crate::align::align_up(len as u64, page as u64) as usize;
    let mapped_len = mapped_len.max(page);

    let ptr = unsafe { os::alloc(mapped_len, protection).map_err(PageError::Os)? };

    Ok(PageRegion {
        ptr,
        len,
        mapped_len,
    })
}

/// Frees the entire region backing `region` in one call.
///
/// Consumes `region`; this exists mainly so callers can free explicitly and
/// observe the error instead of relying on the best-effort `Drop` impl.
pub fn free(region: PageRegion) -> Result<(), PageError> {
    let mut region = region;
    let mapped_len = region.mapped_len;
    region.mapped_len = 0; // disarm Drop, we're freeing it right now
    if mapped_len == 0 {
        return Ok(());
    }
    unsafe { os::free(region.ptr, mapped_len).map_err(PageError::Os) }
}

#[cfg(unix)]
mod os {
    use super::Protection;
    use std::io;
    use std::ptr::NonNull;

    pub fn page_size() -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGESIZE).max(4096) as usize }
    }

    fn to_prot(protection: Protection) -> i32 {
        let mut prot = 0;
        if protection.contains(Protection::READ) {
            prot |= libc::PROT_READ;
        }
        if protection.contains(Protection::WRITE) {
            prot |= libc::PROT_WRITE;
        }
        if protection.contains(Protection::EXECUTE) {
            prot |= libc::PROT_EXEC;
        }
        prot
    }

    pub unsafe fn alloc(len: usize, protection: Protection) -> io::Result<NonNull<u8>> {
        let prot = to_prot(protection);
        let ptr = libc::mmap(
            std::ptr::null_mut(),
            len,
            prot,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        );

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(NonNull::new_unchecked(ptr as *mut u8))
    }

    pub unsafe fn free(ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        if libc::munmap(ptr.as_ptr() as *mut libc::c_void, len) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(windows)]
mod os {
    use super::Protection;
    use std::io;
    use std::ptr::NonNull;
    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_EXECUTE,
        PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE, PAGE_NOACCESS, PAGE_READONLY, PAGE_READWRITE,
    };

    pub fn page_size() -> usize {
        use windows_sys::Win32::System::SystemInformation::GetSystemInfo;
        use windows_sys::Win32::System::SystemInformation::SYSTEM_INFO;
        unsafe {
            let mut info: SYSTEM_INFO = std::mem::zeroed();
            GetSystemInfo(&mut info);
            info.dwPageSize.max(4096) as usize
        }
    }

    fn to_page_protect(protection: Protection) -> u32 {
        let w = protection.contains(Protection::WRITE);
        let x = protection.contains(Protection::EXECUTE);
        let r = protection.contains(Protection::READ);

        // Any combination containing both W and X collapses to RWX.
        match (r, w, x) {
            (_, true, true) => PAGE_EXECUTE_READWRITE,
            (_, true, false) => PAGE_READWRITE,
            (true, false, true) => PAGE_EXECUTE_READ,
            (false, false, true) => PAGE_EXECUTE,
            (true, false, false) => PAGE_READONLY,
            (false, false, false) => PAGE_NOACCESS,
        }
    }

    pub unsafe fn alloc(len: usize, protection: Protection) -> io::Result<NonNull<u8>> {
        let ptr = VirtualAlloc(
            std::ptr::null(),
            len,
            MEM_COMMIT | MEM_RESERVE,
            to_page_protect(protection),
        );

        if ptr.is_null() {
            return Err(io::Error::last_os_error());
        }

        Ok(NonNull::new_unchecked(ptr as *mut u8))
    }

    pub unsafe fn free(ptr: NonNull<u8>, _len: usize) -> io::Result<()> {
        if VirtualFree(ptr.as_ptr() as *mut _, 0, MEM_RELEASE) == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
