/// Generates the default `config.toml` contents with explanatory comments.
///
/// This is used by `static-icon init` to create a starter config file
/// that users can immediately edit.
pub fn generate_config() -> String {
    r##"# static-icon configuration
# Location: ~/.config/static-icon/config.toml
#
# Changes are picked up while explorer.exe is running.

[icon]
# Which icon every File Explorer taskbar button shows.
# "explorer": icon 0 of C:\Windows\explorer.exe (default)
# "shell32":  icon 4 of C:\Windows\System32\shell32.dll
# "custom":   the .ico file given by custom_path
source = "explorer"
# Full path to a .ico file, used when source = "custom".
custom_path = ""

[symbols]
# DbgHelp search path used to find taskbar.dll symbols.
# Leave empty to download from the Microsoft symbol server into
# ~/.config/static-icon/symbols. Any srv* path needs symsrv.dll next to
# the dbghelp.dll in use (it ships with the Debugging Tools for Windows,
# not with System32); `static-icon doctor` checks for it.
search_path = ""

[log]
# Write a log file to ~/.config/static-icon/logs/static-icon.log.
enabled = false
# Minimum level: "debug", "info", "warn" or "error".
level = "info"
# Rotate the log file after this many megabytes.
max_file_mb = 10
"##
    .to_string()
}
