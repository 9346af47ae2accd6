/// A branch target label within a translation block.
///
/// Maps to QEMU's `TCGLabel`. Branches may reference a label
/// before `set_label` places it; the interpreter resolves every
/// label to an op position once per TB.
#[derive(Debug, Clone)]
pub struct Label {
    pub id: u32,
    /// Op index of the `set_label` op, once emitted.
    pub position: Option<usize>,
    /// Number of branches that reference this label.
    pub refs: u32,
}

impl Label {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            position: None,
            refs: 0,
        }
    }

    pub fn is_present(&self) -> bool {
        self.position.is_some()
    }

    /// Whether a branch targets this label but it was never placed.
    pub fn has_pending_uses(&self) -> bool {
        self.refs > 0 && self.position.is_none()
    }
}
