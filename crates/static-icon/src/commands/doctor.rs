use static_icon_core::config;

/// ANSI escape helpers for doctor output.
const OK: &str = "\x1b[32m[ok]\x1b[0m";
const WARN: &str = "\x1b[33m[warn]\x1b[0m";
const FAIL: &str = "\x1b[31m[fail]\x1b[0m";
const FIXED: &str = "\x1b[36m[fixed]\x1b[0m";

pub fn execute() {
    println!("\n  static-icon v{}\n", env!("CARGO_PKG_VERSION"));
    check_config_dir();
    check_config_file();
    let config = config::load();
    check_log(&config);
    check_platform(&config);
    println!();
}

fn check_config_dir() {
    match config::config_dir() {
        Some(dir) if dir.is_dir() => {
            println!("  {OK} Config directory exists ({})", dir.display());
        }
        Some(dir) => match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                println!("  {FIXED} Created config directory ({})", dir.display());
            }
            Err(e) => {
                println!("  {FAIL} Config directory missing and could not create it: {e}");
            }
        },
        None => {
            println!("  {FAIL} Could not determine home directory");
        }
    }
}

fn check_config_file() {
    let Some(path) = config::config_path() else {
        println!("  {FAIL} Could not determine config path");
        return;
    };
    if !path.exists() {
        println!("  {WARN} config.toml not found (using defaults, run `static-icon init`)");
        return;
    }
    match config::try_load() {
        Ok(config) if config.notices.is_empty() => println!("  {OK} config.toml is valid"),
        Ok(config) => {
            for notice in &config.notices {
                println!("  {WARN} config.toml: {notice}");
            }
        }
        Err(e) => println!("  {FAIL} config.toml: {e}"),
    }
}

fn check_log(config: &config::Config) {
    if config.log.enabled {
        println!(
            "  {OK} Logging enabled (level {}, rotates at {} MB)",
            config.log.level, config.log.max_file_mb
        );
    } else {
        println!("  {WARN} Logging disabled (set [log] enabled = true to diagnose the mod)");
    }
}

#[cfg(windows)]
fn check_platform(config: &config::Config) {
    check_icon(config);
    check_symbols(config);
}

#[cfg(not(windows))]
fn check_platform(_config: &config::Config) {
    println!("  {WARN} Icon and taskbar symbol checks need Windows");
}

#[cfg(windows)]
fn check_icon(config: &config::Config) {
    use static_icon_core::IconStore;
    use static_icon_windows::ShellIcons;

    let settings = config.icon_settings();
    let store = IconStore::new(ShellIcons);
    match store.load(&settings) {
        Ok(()) => println!("  {OK} Icon source {:?} loads", settings.source),
        Err(e) => println!("  {FAIL} Icon source {:?}: {e}", settings.source),
    }
}

#[cfg(windows)]
fn check_symbols(config: &config::Config) {
    use static_icon_windows::DbgHelpResolver;
    use static_icon_windows::symbols::{symbol_server_dll, uses_symbol_server};

    let resolver = DbgHelpResolver::from_config(&config.symbols);
    if uses_symbol_server(resolver.search_path()) {
        match symbol_server_dll() {
            Some(path) => println!("  {OK} symsrv.dll found ({})", path.display()),
            None => println!(
                "  {FAIL} symsrv.dll not found next to dbghelp.dll; \
                 install the Debugging Tools for Windows or set [symbols] search_path to local PDBs"
            ),
        }
    }
    match super::symbols::resolve_taskbar(&resolver) {
        Ok(resolved) => {
            let missing: Vec<_> = resolved
                .iter()
                .filter(|r| r.offset.is_none())
                .map(|r| r.name)
                .collect();
            if missing.is_empty() {
                println!("  {OK} All {} taskbar method(s) resolve", resolved.len());
            } else {
                println!("  {FAIL} Unresolved taskbar methods: {}", missing.join(", "));
            }
        }
        Err(e) => println!("  {FAIL} Taskbar symbols: {e}"),
    }
}
