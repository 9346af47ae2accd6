use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tcg_core::{GuestMemory, MemFault};

/// Flat guest RAM mapped at `[base, base + size)`.
///
/// Accesses must be naturally aligned. Shared by all vCPUs; plain
/// loads and stores take the lock only for the copy itself.
#[derive(Debug)]
pub struct GuestRam {
    base: u64,
    data: RwLock<Vec<u8>>,
}

impl GuestRam {
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            data: RwLock::new(vec![0; size]),
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    fn range(&self, len: usize, addr: u64, size: u32) -> Result<std::ops::Range<usize>, MemFault> {
        if size > 1 && addr % u64::from(size) != 0 {
            return Err(MemFault::Misaligned { addr, size });
        }
        let off = addr
            .checked_sub(self.base)
            .map(|o| o as usize)
            .filter(|&o| o.checked_add(size as usize).is_some_and(|end| end <= len))
            .ok_or(MemFault::Unmapped { addr })?;
        Ok(off..off + size as usize)
    }

    /// Copy raw bytes into RAM.
    pub fn write_bytes(&self, addr: u64, bytes: &[u8]) -> Result<(), MemFault> {
        let mut data = self.write();
        let r = self.range(data.len(), addr, 1)?;
        let end = r.start + bytes.len();
        if end > data.len() {
            return Err(MemFault::Unmapped {
                addr: addr + bytes.len() as u64,
            });
        }
        data[r.start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Store big-endian instruction words starting at `addr`.
    pub fn load_words(&self, addr: u64, words: &[u32]) -> Result<(), MemFault> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        self.write_bytes(addr, &bytes)
    }

    pub fn read_u32(&self, addr: u64) -> Result<u32, MemFault> {
        self.load(addr, 4, true).map(|v| v as u32)
    }
}

impl GuestMemory for GuestRam {
    fn load(&self, addr: u64, size: u32, big_endian: bool) -> Result<u64, MemFault> {
        let data = self.read();
        let r = self.range(data.len(), addr, size)?;
        let mut buf = [0u8; 8];
        let bytes = &data[r];
        if big_endian {
            buf[8 - bytes.len()..].copy_from_slice(bytes);
            Ok(u64::from_be_bytes(buf))
        } else {
            buf[..bytes.len()].copy_from_slice(bytes);
            Ok(u64::from_le_bytes(buf))
        }
    }

    fn store(&self, addr: u64, size: u32, big_endian: bool, val: u64) -> Result<(), MemFault> {
        let mut data = self.write();
        let r = self.range(data.len(), addr, size)?;
        let n = size as usize;
        if big_endian {
            data[r].copy_from_slice(&val.to_be_bytes()[8 - n..]);
        } else {
            data[r].copy_from_slice(&val.to_le_bytes()[..n]);
        }
        Ok(())
    }
}
