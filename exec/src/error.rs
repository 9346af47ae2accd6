use tcg_backend::TranslateError;

/// Registry misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CpuListError {
    #[error("cpu index {index} pre-assigned after automatic assignment")]
    IndexAfterAutoAssign { index: u32 },
    #[error("cpu index {index} is already in use")]
    DuplicateIndex { index: u32 },
    #[error("cpu {index} is already registered")]
    AlreadyRegistered { index: u32 },
    #[error("cpu {index} is not the most recently added cpu")]
    RemoveNotTail { index: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("translation block store is full ({0} blocks)")]
    TbStoreFull(usize),
    #[error(transparent)]
    Translate(#[from] TranslateError),
}
