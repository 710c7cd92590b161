use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;

#[derive(Parser, Debug)]
#[command(
    version,
    name = "zvm",
    about = "Zig Version Manager: install, switch between and run Zig toolchains"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored log output for this invocation
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and install a version of Zig.
    /// Examples:
    ///   zvm install 0.11.0          # a tagged release
    ///   zvm install master          # the latest nightly build
    ///   zvm install 0.11.0 --zls    # also install a matching ZLS
    #[command(visible_alias = "i")]
    Install {
        /// Reinstall even if the version is already installed
        #[arg(short, long)]
        force: bool,
        /// Also install ZLS
        #[arg(long)]
        zls: bool,
        /// Ask for a fully compatible ZLS instead of runtime-only compatibility
        #[arg(long, requires = "zls")]
        full: bool,
        #[arg(value_name = "VERSION")]
        version: String,
    },
    /// Switch the active version of Zig
    Use {
        /// Update master to the newest nightly and make it active
        #[arg(long, conflicts_with = "version")]
        sync: bool,
        #[arg(value_name = "VERSION", required_unless_present = "sync")]
        version: Option<String>,
    },
    /// Run a command with the given Zig version, installing it if needed
    Run {
        #[arg(value_name = "VERSION")]
        version: String,
        /// Arguments passed through to zig
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// Run the active Zig version
    Exec {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// List installed versions; --all lists versions available remotely
    #[command(visible_alias = "ls")]
    List {
        /// List remote versions from the configured version map
        #[arg(short, long)]
        all: bool,
        /// Print the configured version map URLs
        #[arg(long, conflicts_with = "all")]
        vmu: bool,
    },
    /// Print the active version
    Current,
    /// Remove an installed version of Zig
    #[command(visible_alias = "rm")]
    Uninstall {
        #[arg(value_name = "VERSION")]
        version: String,
    },
    /// Remove leftover staging directories and downloaded archives
    Clean,
    /// Set the version map URL used for Zig or ZLS downloads.
    /// Examples:
    ///   zvm vmu zig mach                            # mach nominated builds
    ///   zvm vmu zig https://mirror.example/index.json
    ///   zvm vmu zls default
    #[command(visible_alias = "src")]
    Vmu {
        #[arg(value_enum)]
        target: VmuTarget,
        /// A URL, `default`, or `mach` (zig only)
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmuTarget {
    Zig,
    Zls,
}
