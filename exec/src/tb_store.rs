use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tcg_core::tb::{TranslationBlock, TB_HASH_SIZE};

use crate::error::ExecError;

/// Default capacity before a flush is required.
pub const MAX_TBS: usize = 65536;

struct Inner {
    tbs: Vec<Arc<TranslationBlock>>,
    /// Bucket heads; chains continue through `hash_next`.
    hash: Vec<Option<usize>>,
}

/// Shared storage and hash-table lookup for TBs.
///
/// TBs are immutable once inserted, apart from their atomic
/// chaining hints, so readers only hold the lock long enough to
/// clone an `Arc`. A flush drops every TB and bumps the
/// generation; per-vCPU caches compare generations to notice.
pub struct TbStore {
    inner: RwLock<Inner>,
    capacity: usize,
    generation: AtomicU64,
}

impl TbStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_TBS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                tbs: Vec::new(),
                hash: vec![None; TB_HASH_SIZE],
            }),
            capacity,
            generation: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, idx: usize) -> Option<Arc<TranslationBlock>> {
        self.read().tbs.get(idx).cloned()
    }

    /// Find a TB by its (pc, flags) key.
    pub fn lookup(&self, pc: u64, flags: u32) -> Option<(usize, Arc<TranslationBlock>)> {
        let inner = self.read();
        Self::lookup_in(&inner, pc, flags)
    }

    fn lookup_in(inner: &Inner, pc: u64, flags: u32) -> Option<(usize, Arc<TranslationBlock>)> {
        let mut cur = inner.hash[TranslationBlock::hash(pc, flags)];
        while let Some(idx) = cur {
            let tb = &inner.tbs[idx];
            if tb.matches(pc, flags) {
                return Some((idx, Arc::clone(tb)));
            }
            cur = tb.hash_next;
        }
        None
    }

    /// Publish a freshly translated TB.
    ///
    /// If another vCPU published the same key in the meantime its
    /// TB is returned and `tb` is dropped.
    pub fn insert(
        &self,
        mut tb: TranslationBlock,
    ) -> Result<(usize, Arc<TranslationBlock>), ExecError> {
        let mut inner = self.write();
        if let Some(found) = Self::lookup_in(&inner, tb.pc, tb.flags) {
            return Ok(found);
        }
        if inner.tbs.len() >= self.capacity {
            return Err(ExecError::TbStoreFull(inner.tbs.len()));
        }
        let bucket = TranslationBlock::hash(tb.pc, tb.flags);
        let idx = inner.tbs.len();
        tb.hash_next = inner.hash[bucket];
        let tb = Arc::new(tb);
        inner.tbs.push(Arc::clone(&tb));
        inner.hash[bucket] = Some(idx);
        Ok((idx, tb))
    }

    /// Drop every TB.
    ///
    /// Must run with all vCPUs outside guest code (in an
    /// exclusive section). Returns false if another flush already
    /// moved past `generation`.
    pub fn flush(&self, generation: u64) -> bool {
        let mut inner = self.write();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        let dropped = inner.tbs.len();
        inner.tbs.clear();
        inner.hash.fill(None);
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(inner);
        tracing::debug!(target: "tcg::exec", dropped, "tb_flush");
        true
    }

    /// Incremented by every flush.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.read().tbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TbStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TbStore")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("generation", &self.generation())
            .finish()
    }
}
