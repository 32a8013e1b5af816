pub mod memory_layout {
    /// Total RAM size in words.
    pub const MEM_SIZE: usize = 2000;

    /// Addresses below this are reserved for the operating image,
    /// including the interrupt vector. The split is a loader convention;
    /// the enforcing mechanism is RB/RL in user mode.
    pub const USER_MEM_START: usize = 300;

    /// The interrupt vector occupies the first nine words: one handler
    /// entry point per interrupt code.
    pub const VECTOR_SIZE: usize = 9;

    /// Handler address reset installs into every vector entry. A RETURN
    /// placed there makes an unhandled interrupt come straight back.
    pub const DEFAULT_HANDLER: usize = 200;
}

pub mod disk_geometry {
    pub const CYLINDERS: usize = 10;
    pub const TRACKS: usize = 10;
    pub const SECTORS: usize = 100;
    /// Words per sector.
    pub const SECTOR_SIZE: usize = 9;
}
