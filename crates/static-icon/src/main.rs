mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "static-icon",
    version,
    about = "Force one static icon onto every File Explorer taskbar button"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default configuration file
    Init,
    /// Check the configuration, the icon and the taskbar symbols
    Doctor,
    /// Resolve the taskbar.dll methods the mod hooks and print their offsets
    Symbols(commands::symbols::SymbolsArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Doctor => commands::doctor::execute(),
        Commands::Symbols(args) => commands::symbols::execute(&args),
    }
}
