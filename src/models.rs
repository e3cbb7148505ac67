use std::path::Path;

/// One undecoded record, moved by value from stage to stage.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Position among successfully framed records, starting at 0
    pub seq: u64,
    /// Byte offset of the version line in the decompressed stream
    pub offset: u64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Compression::Gzip,
            Some(ext) if ext.eq_ignore_ascii_case("bz2") => Compression::Bzip2,
            _ => Compression::None,
        }
    }
}
