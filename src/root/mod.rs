//! Native reader for 1D histograms stored in ROOT files.
//!
//! Only the subset needed to pull a `TH1D`/`TH1F` out of a `.root` file is
//! implemented:
//!
//! - file header and top-level key list (small and 64-bit seek layouts)
//! - `TKey` records and compressed payloads (zlib, LZ4, zstd, xz)
//! - `TDirectoryFile` navigation for `dir/sub/name` paths
//! - the `TH1` streamer up to the bin-content array

mod decompress;
mod error;
mod file;
mod key;
mod rbuffer;
mod th1;

pub use error::{Result, RootError};
pub use file::RootFile;
pub use key::KeyInfo;
pub use th1::RawHistogram;

#[cfg(test)]
pub(crate) mod testutil;
