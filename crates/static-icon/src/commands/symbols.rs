use clap::Args;

#[derive(Args)]
pub struct SymbolsArgs {
    /// DbgHelp search path to use instead of the configured one
    #[arg(long)]
    pub search_path: Option<String>,
}

/// One taskbar method and its offset from the module base, if found.
#[cfg(windows)]
pub struct Resolved {
    pub name: &'static str,
    pub offset: Option<usize>,
}

/// Resolves the taskbar descriptors against `taskbar.dll` on disk
/// without loading or patching anything.
#[cfg(windows)]
pub fn resolve_taskbar(
    resolver: &static_icon_windows::DbgHelpResolver,
) -> Result<Vec<Resolved>, String> {
    use static_icon_core::hook::SymbolResolver;
    use static_icon_windows::{hooks, runtime};

    let module = runtime::taskbar_on_disk().map_err(|e| e.to_string())?;
    let descriptors = hooks::taskbar_descriptors();
    let signatures: Vec<&str> = descriptors.iter().map(|d| d.signature).collect();
    let addresses = resolver.resolve(&module, &signatures)?;

    Ok(descriptors
        .iter()
        .zip(addresses)
        .map(|(d, address)| Resolved {
            name: d.name,
            offset: address.map(|a| a - module.base),
        })
        .collect())
}

#[cfg(windows)]
pub fn execute(args: &SymbolsArgs) {
    use static_icon_core::config;
    use static_icon_windows::DbgHelpResolver;

    let resolver = match &args.search_path {
        Some(path) => DbgHelpResolver::new(path.as_str()),
        None => DbgHelpResolver::from_config(&config::load().symbols),
    };
    println!("Search path: {}", resolver.search_path());

    let resolved = match resolve_taskbar(&resolver) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut missing = 0;
    for r in &resolved {
        match r.offset {
            Some(offset) => println!("  taskbar.dll+{offset:#010x}  {}", r.name),
            None => {
                missing += 1;
                println!("  {:<22}  {}", "not found", r.name);
            }
        }
    }
    if missing > 0 {
        eprintln!("\n{missing} method(s) not found; this shell build is not supported.");
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
pub fn execute(_args: &SymbolsArgs) {
    eprintln!("Error: resolving taskbar symbols requires Windows.");
    std::process::exit(1);
}
