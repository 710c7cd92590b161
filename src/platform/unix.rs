use crate::platform::PlatformOps;
use std::io;
use std::path::Path;

pub static UNIX_PLATFORM: Unix = Unix;

pub struct Unix;

impl PlatformOps for Unix {
    fn final_binary_name(&self, base: &str) -> String {
        base.to_string()
    }
    fn make_executable(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)?;
        Ok(())
    }
    // A relative symlink so `<root>/bin` can go straight onto PATH.
    fn pointer_name(&self) -> &'static str {
        "bin"
    }
    fn write_pointer(&self, path: &Path, version: &str) -> io::Result<()> {
        std::os::unix::fs::symlink(version, path)
    }
    fn read_pointer(&self, path: &Path) -> io::Result<Option<String>> {
        match std::fs::read_link(path) {
            Ok(target) => Ok(target
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            // Something that is not a symlink (e.g. a stray directory) names nothing.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(None),
            Err(e) => Err(e),
        }
    }
}
