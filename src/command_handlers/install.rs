use anyhow::Result;
use zvm::installer::InstallOutcome;
use zvm::zls::ZlsCompat;
use zvm::{Component, Zvm};

pub struct InstallArgs<'a> {
    pub version: &'a str,
    pub force: bool,
    pub zls: bool,
    pub full: bool,
}

pub fn run_install(zvm: &Zvm, args: InstallArgs) -> Result<()> {
    let mut components = Vec::new();
    if args.zls {
        let compat = if args.full {
            ZlsCompat::Full
        } else {
            ZlsCompat::OnlyRuntime
        };
        components.push(Component::Zls(compat));
    }
    let report = zvm.resolve_and_install(args.version, args.force, &components)?;
    print_outcome("Zig", &report.zig);
    if let Some(zls) = &report.zls {
        print_outcome("ZLS", zls);
    }
    if zvm.current()?.is_none() {
        eprintln!(
            "No active version yet. Run 'zvm use {}' to select it.",
            zvm::resolver::normalize(args.version)
        );
    }
    Ok(())
}

fn print_outcome(what: &str, outcome: &InstallOutcome) {
    match outcome {
        InstallOutcome::Installed(path) => println!("Installed {what} at {}", path.display()),
        InstallOutcome::Reinstalled(path) => println!("Reinstalled {what} at {}", path.display()),
        InstallOutcome::AlreadyInstalled(path) => {
            println!("{what} already installed at {} (use --force to reinstall)", path.display())
        }
    }
}
