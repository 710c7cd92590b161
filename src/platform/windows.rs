use crate::platform::PlatformOps;
use std::io;
use std::path::Path;

pub static WINDOWS_PLATFORM: Windows = Windows;

pub struct Windows;

impl PlatformOps for Windows {
    fn final_binary_name(&self, base: &str) -> String { if base.ends_with(".exe") { base.to_string() } else { format!("{base}.exe") } }
    fn make_executable(&self, _path: &Path) -> io::Result<()> { Ok(()) }
    fn pointer_name(&self) -> &'static str { ".active" }
    fn write_pointer(&self, path: &Path, version: &str) -> io::Result<()> { std::fs::write(path, version) }
    fn read_pointer(&self, path: &Path) -> io::Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(s) if s.trim().is_empty() => Ok(None),
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
