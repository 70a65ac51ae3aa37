use clap::{Parser, Subcommand};
use colored::Colorize;
use rebind::commands;

#[derive(Parser)]
#[command(name = "rebind")]
#[command(about = "Migrate Kotlin Android Extensions synthetics to view binding", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate Kotlin sources and their module's build script
    /// Works with both directories and single .kt files
    Migrate {
        /// Path to a Kotlin file or directory (defaults to current directory)
        #[arg(default_value = ".")]
        target: String,
        /// Application package (default: the manifest's package attribute)
        #[arg(long)]
        package: Option<String>,
        /// Descend into subdirectories of a directory target
        #[arg(long)]
        include_subdirs: bool,
        /// Only migrate files whose name matches this regular expression
        #[arg(long)]
        mask: Option<String>,
        /// Report planned changes without writing files
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate {
            target,
            package,
            include_subdirs,
            mask,
            dry_run,
        } => commands::migrate::execute(&target, package, include_subdirs, mask, dry_run),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
