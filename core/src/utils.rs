use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};

use crate::constants::TEMP_SUFFIX;

/// Flatten ordered chunks into a single contiguous buffer.
pub fn concat_chunks(chunks: &[impl AsRef<[u8]>]) -> Bytes {
    let total = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut buf = BytesMut::with_capacity(total);
    for c in chunks {
        buf.extend_from_slice(c.as_ref());
    }
    buf.freeze()
}

/// Read up to `len` bytes, looping over short reads. Returns fewer bytes only at EOF.
pub fn read_exact_or_eof<R: Read>(r: &mut R, len: usize) -> io::Result<Bytes> {
    let mut buf = vec![0u8; len];
    let mut off = 0;

    while off < len {
        match r.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    buf.truncate(off);
    Ok(Bytes::from(buf))
}

/// Sibling path used while an atomic replace is in flight: `<path>.partial`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_exact_or_eof_stops_at_eof() {
        let mut r = Cursor::new(vec![7u8; 10]);
        assert_eq!(read_exact_or_eof(&mut r, 4).unwrap().len(), 4);
        assert_eq!(read_exact_or_eof(&mut r, 4).unwrap().len(), 4);
        assert_eq!(read_exact_or_eof(&mut r, 4).unwrap().len(), 2);
        assert!(read_exact_or_eof(&mut r, 4).unwrap().is_empty());
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let p = temp_path_for(Path::new("/tmp/out.dat"));
        assert_eq!(p, PathBuf::from("/tmp/out.dat.partial"));
    }
}
