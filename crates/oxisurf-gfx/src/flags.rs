//! Flag sets passed to the render engine.

use bitflags::bitflags;

bitflags! {
    /// Which attachments a view clears at the start of a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u16 {
        const COLOR = 0x0001;
        const DEPTH = 0x0002;
    }
}

bitflags! {
    /// Back buffer reset options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResetFlags: u32 {
        const VSYNC = 0x0000_0080;
    }
}

bitflags! {
    /// Engine debug features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DebugFlags: u32 {
        const TEXT = 0x0000_0008;
    }
}
