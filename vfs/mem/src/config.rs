#[derive(Clone, Debug)]
pub struct MemStoreConfig {
    /// Most entries returned by one raw directory read. Small values make
    /// iteration cross many reads, which tests use to exercise resumption.
    pub readdir_batch: usize,
    /// Block size reported in attributes and used for space accounting.
    pub block_size: u32,
    /// Capacity in blocks of file data for this store instance.
    pub total_blocks: u64,
    /// Capacity in objects, root and attribute directories included.
    pub total_files: u64,
    pub fsid: u64,
}

impl Default for MemStoreConfig {
    fn default() -> Self {
        Self {
            readdir_batch: 32,
            block_size: 4096,
            total_blocks: 1 << 18,
            total_files: 1 << 16,
            fsid: 0x1e06_0000,
        }
    }
}
