//! Access bits requested by method handlers.

use bitflags::bitflags;

bitflags! {
    /// Requested or granted access rights.
    ///
    /// `RECURSIVE` marks operations that affect a whole subtree
    /// (delete, move, copy); it extends the path check to every rule
    /// nested under the target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Access: u8 {
        const READ = 1;
        const WRITE = 1 << 1;
        const RECURSIVE = 1 << 2;
    }
}

impl Access {
    /// ## Summary
    /// Parses the access letters of a policy rule: `""` (no access),
    /// `"r"`, or `"rw"`. Anything else is not a valid rule value.
    #[must_use]
    pub fn from_letters(letters: &str) -> Option<Self> {
        match letters {
            "" => Some(Self::empty()),
            "r" => Some(Self::READ),
            "rw" => Some(Self::READ | Self::WRITE),
            _ => None,
        }
    }

    /// The rule-value rendering of the read/write bits.
    #[must_use]
    pub fn letters(self) -> &'static str {
        let read = self.contains(Self::READ);
        let write = self.contains(Self::WRITE);
        match (read, write) {
            (true, true) => "rw",
            (true, false) => "r",
            (false, true) => "w",
            (false, false) => "",
        }
    }

    /// Just the read/write bits, dropping modifiers.
    #[must_use]
    pub fn rw(self) -> Self {
        self & (Self::READ | Self::WRITE)
    }
}
