use std::fs;
use std::path::Path;

use super::decompress::decompress;
use super::error::{Result, RootError};
use super::key::{Directory, Key, KeyInfo};
use super::rbuffer::Cursor;
use super::th1::{Precision, RawHistogram, read_th1};

/// Files at or above this format version use 64-bit seek pointers.
const LARGE_FILE_VERSION: u32 = 1_000_000;

/// Read-only view of a ROOT file held in memory.
#[derive(Debug)]
pub struct RootFile {
    data: Vec<u8>,
    is_large: bool,
    top: Directory,
}

impl RootFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut c = Cursor::new(&data);
        if c.take(4)? != b"root" {
            return Err(RootError::BadMagic);
        }
        let version = c.read_u32()?;
        let is_large = version >= LARGE_FILE_VERSION;
        let begin = c.read_u32()? as usize;
        let _end = c.read_seek(is_large)?;
        let _seek_free = c.read_seek(is_large)?;
        let _nbytes_free = c.read_u32()?;
        let _n_free = c.read_u32()?;
        let nbytes_name = c.read_u32()? as usize;

        let mut dir = Cursor::at(&data, 0);
        dir.seek(begin + nbytes_name)?;
        let top = Directory::read_streamer(&mut dir, &data, is_large)?;

        Ok(RootFile {
            data,
            is_large,
            top,
        })
    }

    /// Keys of the top-level directory.
    pub fn list_keys(&self) -> Vec<KeyInfo> {
        self.top.keys().iter().map(Key::info).collect()
    }

    /// Read a `TH1D`/`TH1F`. `path` may name nested directories, `dir/sub/h`.
    pub fn get_histogram(&self, path: &str) -> Result<RawHistogram> {
        let key = self.resolve(path)?;
        let precision =
            Precision::for_class(&key.class_name).ok_or_else(|| RootError::UnsupportedClass {
                name: key.name.clone(),
                class: key.class_name.clone(),
            })?;
        let payload = self.read_key_payload(&key)?;
        read_th1(&payload, precision)
    }

    fn resolve(&self, path: &str) -> Result<Key> {
        let mut parts = path.split('/').filter(|p| !p.is_empty()).peekable();
        let mut dir = self.top.clone();
        while let Some(part) = parts.next() {
            let key = dir
                .find(part)
                .cloned()
                .ok_or_else(|| RootError::KeyNotFound(path.to_string()))?;
            if parts.peek().is_none() {
                return Ok(key);
            }
            if !key.is_directory() {
                return Err(RootError::KeyNotFound(path.to_string()));
            }
            dir = self.read_directory(&key)?;
        }
        Err(RootError::KeyNotFound(path.to_string()))
    }

    fn read_directory(&self, key: &Key) -> Result<Directory> {
        let payload = self.read_key_payload(key)?;
        let mut c = Cursor::new(&payload);
        Directory::read_streamer(&mut c, &self.data, self.is_large)
    }

    fn read_key_payload(&self, key: &Key) -> Result<Vec<u8>> {
        let start = key.seek_key as usize + usize::from(key.key_len);
        let stored_len = (key.n_bytes as usize)
            .checked_sub(usize::from(key.key_len))
            .ok_or_else(|| {
                RootError::Malformed(format!(
                    "key '{}' is shorter ({}) than its header ({})",
                    key.name, key.n_bytes, key.key_len
                ))
            })?;
        let mut c = Cursor::at(&self.data, 0);
        c.seek(start)?;
        let stored = c.take(stored_len)?;

        let obj_len = key.obj_len as usize;
        if obj_len == stored_len {
            Ok(stored.to_vec())
        } else {
            decompress(stored, obj_len)
        }
    }
}
