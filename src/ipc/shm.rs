use std::num::NonZeroUsize;
use std::ptr::NonNull;

use nix::fcntl::OFlag;
use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap, shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::{close, ftruncate};

use crate::utils::prelude::*;

/// A mapped shared-memory region.
///
/// Created segments own their name: dropping the creator unmaps and
/// unlinks, after which no new process can attach. Attached segments only
/// unmap. Anonymous segments have no name at all and live for the lifetime
/// of the mapping; they exist so tests and single-process embeddings can
/// run the exact same code against private memory.
pub struct Segment {
    ptr: NonNull<libc::c_void>,
    len: usize,
    name: Option<String>,
}

// The raw pointer is to a shared mapping; access discipline is imposed by
// the semaphore protocol layered on top, not by this type.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    /// Creates (or re-creates) the named segment, sizes it, and maps it
    /// read-write. The caller becomes the owner responsible for unlinking.
    pub fn create(name: &str, len: usize) -> Result<Segment> {
        let fd = shm_open(name, OFlag::O_CREAT | OFlag::O_RDWR, Mode::from_bits_truncate(0o666))
            .with_context(|| format!("shm_open({name})"))?;

        let mapped = ftruncate(fd, len as libc::off_t)
            .with_context(|| format!("ftruncate({name}, {len})"))
            .and_then(|_| Self::map(fd, len, true));
        let _ = close(fd);

        match mapped {
            Ok(ptr) => {
                // the name may predate this run; start from all-zero bytes
                unsafe { std::ptr::write_bytes(ptr.as_ptr() as *mut u8, 0, len) };
                Ok(Segment {
                    ptr,
                    len,
                    name: Some(name.to_owned()),
                })
            }
            Err(e) => {
                let _ = shm_unlink(name);
                Err(e)
            }
        }
    }

    /// Attaches an existing named segment, read-only unless `writable`.
    pub fn attach(name: &str, len: usize, writable: bool) -> Result<Segment> {
        let oflag = if writable { OFlag::O_RDWR } else { OFlag::O_RDONLY };
        let fd = shm_open(name, oflag, Mode::empty())
            .with_context(|| format!("shm_open({name})"))?;

        let mapped = Self::map(fd, len, writable);
        let _ = close(fd);

        Ok(Segment {
            ptr: mapped?,
            len,
            name: None,
        })
    }

    /// Maps a fresh zeroed region shared only within this process tree.
    pub fn anonymous(len: usize) -> Result<Segment> {
        let length = NonZeroUsize::new(len).ok_or_else(|| anyhow!("zero-length segment"))?;
        let ptr = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED | MapFlags::MAP_ANONYMOUS,
                -1,
                0,
            )
        }
        .context("mmap(anonymous)")?;
        Ok(Segment {
            ptr: NonNull::new(ptr).ok_or_else(|| anyhow!("mmap returned null"))?,
            len,
            name: None,
        })
    }

    fn map(fd: i32, len: usize, writable: bool) -> Result<NonNull<libc::c_void>> {
        let length = NonZeroUsize::new(len).ok_or_else(|| anyhow!("zero-length segment"))?;
        let mut prot = ProtFlags::PROT_READ;
        if writable {
            prot |= ProtFlags::PROT_WRITE;
        }
        let ptr =
            unsafe { mmap(None, length, prot, MapFlags::MAP_SHARED, fd, 0) }.context("mmap")?;
        NonNull::new(ptr).ok_or_else(|| anyhow!("mmap returned null"))
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr() as *mut u8
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.ptr.as_ptr(), self.len);
        }
        if let Some(name) = &self.name {
            let _ = shm_unlink(name.as_str());
        }
    }
}
