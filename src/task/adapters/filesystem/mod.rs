//! Filesystem-backed plan artifact and log stores.
//!
//! Both stores are confined to a capability-scoped directory opened once at
//! construction; no path outside it is reachable.

mod log_store;
mod plan_store;

pub use log_store::FsLogStore;
pub use plan_store::FsPlanStore;

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;

fn open_root(root: &Utf8Path, subdir: &str) -> io::Result<Dir> {
    Dir::create_ambient_dir_all(root, ambient_authority())?;
    let dir = Dir::open_ambient_dir(root, ambient_authority())?;
    dir.create_dir_all(subdir)?;
    dir.open_dir(subdir)
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
