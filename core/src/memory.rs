use thiserror::Error;

/// A failed guest memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemFault {
    #[error("unmapped guest address {addr:#010x}")]
    Unmapped { addr: u64 },
    #[error("misaligned {size}-byte access at {addr:#010x}")]
    Misaligned { addr: u64, size: u32 },
}

/// Guest address space as seen by generated code.
///
/// Values are passed zero-extended in a `u64`; the byte order is
/// selected per access. Implementations must be shareable between
/// vCPU threads.
pub trait GuestMemory: Send + Sync {
    fn load(&self, addr: u64, size: u32, big_endian: bool) -> Result<u64, MemFault>;

    fn store(
        &self,
        addr: u64,
        size: u32,
        big_endian: bool,
        val: u64,
    ) -> Result<(), MemFault>;

    /// Fetch a 32-bit instruction word in guest byte order.
    fn fetch_insn(&self, addr: u64) -> Result<u32, MemFault> {
        self.load(addr, 4, true).map(|v| v as u32)
    }
}
