use anyhow::Result;
use zvm::Zvm;

pub fn list(zvm: &Zvm, all: bool, vmu: bool) -> Result<()> {
    if vmu {
        let settings = zvm.settings();
        println!("Zig VMU: {}", settings.version_map_url);
        println!("ZLS VMU: {}", settings.zls_version_map_url);
        return Ok(());
    }
    let installed = zvm.list_installed()?;
    if all {
        for version in zvm.list_remote()? {
            let mark = if installed.contains(&version) { " (installed)" } else { "" };
            println!("{version}{mark}");
        }
        return Ok(());
    }
    let current = zvm.current()?;
    if installed.is_empty() {
        println!("No versions installed. Run 'zvm install <version>'.");
    }
    for version in &installed {
        let mark = if current.as_deref() == Some(version.as_str()) { "* " } else { "  " };
        println!("{mark}{version}");
    }
    Ok(())
}
