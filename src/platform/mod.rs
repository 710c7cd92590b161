pub fn platform() -> &'static dyn PlatformOps {
    &ConcretePlatform
}

use std::io;
use std::path::Path;

pub trait PlatformOps: Sync + Send {
    fn final_binary_name(&self, base: &str) -> String;
    fn make_executable(&self, path: &Path) -> io::Result<()>;
    /// File name of the active-version pointer inside the install root.
    fn pointer_name(&self) -> &'static str;
    /// Create a fresh pointer at `path` naming `version`. `path` must not exist.
    fn write_pointer(&self, path: &Path, version: &str) -> io::Result<()>;
    /// Version named by the pointer at `path`, `None` when there is no pointer.
    fn read_pointer(&self, path: &Path) -> io::Result<Option<String>>;
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UNIX_PLATFORM as ConcretePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WINDOWS_PLATFORM as ConcretePlatform;

/// Catalog key for the host, in the `<arch>-<os>` form used by the Zig index
/// (`x86_64-linux`, `aarch64-macos`, ...).
pub fn platform_key() -> String {
    let arch = match std::env::consts::ARCH {
        "arm" => "armv7a",
        "powerpc64" => "powerpc64le",
        other => other,
    };
    format!("{arch}-{}", std::env::consts::OS)
}

pub fn zig_binary_name() -> String {
    platform().final_binary_name("zig")
}
