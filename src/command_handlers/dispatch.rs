use crate::cli::Commands;
use crate::command_handlers::{install, list, vmu};
use anyhow::Result;
use std::path::Path;
use zvm::activation::SyncOutcome;
use zvm::executor::StdinConfirm;
use zvm::Zvm;

/// Run one command and return the process exit code.
pub fn dispatch(cmd: Commands, zvm: &Zvm, data_dir: &Path) -> Result<i32> {
    match cmd {
        Commands::Install {
            force,
            zls,
            full,
            version,
        } => {
            let args = install::InstallArgs {
                version: &version,
                force,
                zls,
                full,
            };
            install::run_install(zvm, args)?;
        }
        Commands::Use { sync: true, .. } => match zvm.sync()? {
            SyncOutcome::UpToDate { build } => println!("master is already up to date ({build})"),
            SyncOutcome::Activated { build } => println!("Now using master ({build})"),
            SyncOutcome::Updated { build, previous } => match previous {
                Some(prev) => println!("Updated master {prev} -> {build}"),
                None => println!("Installed master ({build})"),
            },
        },
        Commands::Use { version, .. } => {
            let Some(version) = version else {
                anyhow::bail!("a version is required unless --sync is given");
            };
            zvm.activate(&version)?;
            println!("Now using Zig {}", zvm::resolver::normalize(&version));
        }
        Commands::Run { version, args } => return Ok(zvm.run(&version, &args, &StdinConfirm)?),
        Commands::Exec { args } => return Ok(zvm.run_active(&args)?),
        Commands::List { all, vmu } => list::list(zvm, all, vmu)?,
        Commands::Current => match zvm.current()? {
            Some(version) => println!("{version}"),
            None => println!("No active version. Run 'zvm use <version>'."),
        },
        Commands::Uninstall { version } => {
            zvm.uninstall(&version)?;
            println!("Uninstalled {}", zvm::resolver::normalize(&version));
        }
        Commands::Clean => {
            let report = zvm.clean()?;
            for path in &report.removed {
                println!("Removed {}", path.display());
            }
            for path in &report.skipped_busy {
                eprintln!("Skipped {} (install in progress)", path.display());
            }
            if report.removed.is_empty() && report.skipped_busy.is_empty() {
                println!("Nothing to clean");
            }
        }
        Commands::Vmu { target, url } => vmu::set_vmu(data_dir, target, &url)?,
    }
    Ok(0)
}
