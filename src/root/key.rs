//! `TKey` records and directory key lists.

use super::error::Result;
use super::rbuffer::Cursor;

/// A parsed `TKey` header.
#[derive(Debug, Clone)]
pub(crate) struct Key {
    pub n_bytes: u32,
    pub obj_len: u32,
    pub key_len: u16,
    pub cycle: u16,
    pub seek_key: u64,
    pub class_name: String,
    pub name: String,
    pub title: String,
}

/// Public view of a key, as listed by [`super::RootFile::list_keys`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub name: String,
    pub class_name: String,
    pub title: String,
    pub cycle: u16,
}

impl Key {
    pub(crate) fn read(c: &mut Cursor<'_>, file_is_large: bool) -> Result<Self> {
        let n_bytes = c.read_u32()?;
        let version = c.read_u16()?;
        let obj_len = c.read_u32()?;
        let _datime = c.read_u32()?;
        let key_len = c.read_u16()?;
        let cycle = c.read_u16()?;
        let large = file_is_large || version > 1000;
        let seek_key = c.read_seek(large)?;
        let _seek_pdir = c.read_seek(large)?;
        let class_name = c.read_string()?;
        let name = c.read_string()?;
        let title = c.read_string()?;

        Ok(Key {
            n_bytes,
            obj_len,
            key_len,
            cycle,
            seek_key,
            class_name,
            name,
            title,
        })
    }

    pub(crate) fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectoryFile" | "TDirectory")
    }

    pub(crate) fn info(&self) -> KeyInfo {
        KeyInfo {
            name: self.name.clone(),
            class_name: self.class_name.clone(),
            title: self.title.clone(),
            cycle: self.cycle,
        }
    }
}

/// Ordered key list of one directory.
#[derive(Debug, Clone, Default)]
pub(crate) struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Read the key list stored at `seek_keys`: a `TKey` header for the list
    /// itself, a `u32` count, then that many keys.
    pub(crate) fn read_key_list(data: &[u8], seek_keys: u64, is_large: bool) -> Result<Self> {
        let mut c = Cursor::at(data, 0);
        c.seek(seek_keys as usize)?;
        let _header = Key::read(&mut c, is_large)?;
        let n_keys = c.read_u32()? as usize;
        let keys = (0..n_keys)
            .map(|_| Key::read(&mut c, is_large))
            .collect::<Result<Vec<_>>>()?;
        Ok(Directory { keys })
    }

    /// Parse the `TDirectory` streamer found at the start of a directory
    /// record and follow its `fSeekKeys`.
    pub(crate) fn read_streamer(c: &mut Cursor<'_>, file: &[u8], is_large: bool) -> Result<Self> {
        let version = c.read_u16()?;
        let _ctime = c.read_u32()?;
        let _mtime = c.read_u32()?;
        let _nbytes_keys = c.read_u32()?;
        let _nbytes_name = c.read_u32()?;
        let large = version > 1000;
        let _seek_dir = c.read_seek(large)?;
        let _seek_parent = c.read_seek(large)?;
        let seek_keys = c.read_seek(large)?;
        if seek_keys == 0 {
            return Ok(Directory::default());
        }
        Self::read_key_list(file, seek_keys, is_large)
    }

    pub(crate) fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Highest cycle of `name`.
    pub(crate) fn find(&self, name: &str) -> Option<&Key> {
        self.keys
            .iter()
            .filter(|k| k.name == name)
            .max_by_key(|k| k.cycle)
    }
}
