use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const CREATE = 1 << 2;
        const EXCL = 1 << 3;
        const TRUNC = 1 << 4;
        const APPEND = 1 << 5;
        const DIRECTORY = 1 << 6;
        const NOFOLLOW = 1 << 7;
        const SYNC = 1 << 8;
    }
}

bitflags! {
    /// Permission probe for `access(2)`-style checks.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AccessMask: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}

impl AccessMask {
    pub fn from_open_flags(flags: OpenFlags) -> Self {
        let mut mask = AccessMask::empty();
        if flags.contains(OpenFlags::READ) {
            mask |= AccessMask::READ;
        }
        if flags.intersects(OpenFlags::WRITE | OpenFlags::TRUNC | OpenFlags::APPEND) {
            mask |= AccessMask::WRITE;
        }
        mask
    }
}

bitflags! {
    /// Per-entry work done by the directory iteration engine.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirIterFlags: u32 {
        /// Resolve each entry and report its current generation.
        const GENERATION = 1 << 0;
        /// Resolve each entry and fetch its attributes (implies `GENERATION`).
        const ATTRIBUTES = 1 << 1;
        /// Hide `.` and `..`, as attribute-namespace listings do.
        const SKIP_DOTS = 1 << 2;
    }
}
