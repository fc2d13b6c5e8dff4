// mcdex-aio/src/lib.rs
//! IO operations for mcdex (filesystem, json, checksums, archives, processes)

pub mod checksum;
pub mod extract;
pub mod fs;
pub mod json_io;
pub mod process;

pub use checksum::sha256_file_sync;
pub use extract::extract_zip_async;
pub use fs::{atomic_write_file, copy_file_atomic, copy_tree};
pub use json_io::{read_json_sync, write_json_sync};
pub use process::run_command_async;
