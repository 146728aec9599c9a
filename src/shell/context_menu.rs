use std::path::Path;

use crate::common::errors::FixError;

/// Name of the Explorer menu entry, also used as its registry key
pub const MENU_NAME: &str = "Clear SVN Work Queue";

/// Extension whose file type gets the menu entry
pub const STORE_EXTENSION: &str = ".db";

/// Keys under `HKEY_CLASSES_ROOT` for folders and folder backgrounds
pub const DIRECTORY_SHELL_KEYS: [&str; 2] = [r"Directory\shell", r"Directory\Background\shell"];

/// One context-menu registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    /// Parent `shell` key under `HKEY_CLASSES_ROOT`
    pub shell_key: String,
    /// Icon value; the executable itself
    pub icon: String,
    /// Default value of the `command` subkey
    pub command: String,
    /// Whether a missing `shell_key` is an error rather than a skip
    pub required: bool,
}

impl MenuEntry {
    /// Full path of this entry's own key
    pub fn key(&self) -> String {
        format!(r"{}\{}", self.shell_key, MENU_NAME)
    }
}

/// Entries to register for `exe`.
///
/// Folders and folder backgrounds pass `%V` (the clicked folder). The store's
/// file type, when one is registered for `.db`, passes `%1` (the file).
pub fn menu_entries(exe: &Path, db_file_type: Option<&str>) -> Vec<MenuEntry> {
    let exe = exe.display().to_string();
    let mut entries: Vec<MenuEntry> = DIRECTORY_SHELL_KEYS
        .iter()
        .map(|key| MenuEntry {
            shell_key: key.to_string(),
            icon: exe.clone(),
            command: format!("\"{}\" \"%V\"", exe),
            required: true,
        })
        .collect();

    if let Some(file_type) = db_file_type.filter(|t| !t.is_empty()) {
        entries.push(MenuEntry {
            shell_key: format!(r"{}\shell", file_type),
            icon: exe.clone(),
            command: format!("\"{}\" \"%1\"", exe),
            required: false,
        });
    }

    entries
}

/// Register the context menu for the running executable
pub fn install() -> Result<(), FixError> {
    let exe = std::env::current_exe().map_err(|source| FixError::ShellIntegrationFailed {
        action: "install",
        source,
    })?;
    imp::install(&exe)
}

/// Remove every registration made by [`install`]
pub fn uninstall() -> Result<(), FixError> {
    imp::uninstall()
}

#[cfg(windows)]
mod imp {
    use std::io;
    use std::path::Path;

    use winreg::enums::{HKEY_CLASSES_ROOT, KEY_ALL_ACCESS};
    use winreg::RegKey;

    use super::{menu_entries, MenuEntry, DIRECTORY_SHELL_KEYS, MENU_NAME, STORE_EXTENSION};
    use crate::common::errors::FixError;

    fn db_file_type(hkcr: &RegKey) -> Option<String> {
        hkcr.open_subkey(STORE_EXTENSION)
            .ok()?
            .get_value::<String, _>("")
            .ok()
    }

    fn register(hkcr: &RegKey, entry: &MenuEntry) -> io::Result<()> {
        let shell = match hkcr.open_subkey_with_flags(&entry.shell_key, KEY_ALL_ACCESS) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !entry.required => {
                tracing::debug!(key = %entry.shell_key, "shell key absent, skipping");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let (menu, _) = shell.create_subkey(MENU_NAME)?;
        menu.set_value("", &MENU_NAME)?;
        menu.set_value("Icon", &entry.icon)?;
        let (command, _) = menu.create_subkey("command")?;
        command.set_value("", &entry.command)?;
        tracing::info!(key = %entry.key(), "registered context menu");
        Ok(())
    }

    fn unregister(hkcr: &RegKey, shell_key: &str) -> io::Result<()> {
        let shell = match hkcr.open_subkey_with_flags(shell_key, KEY_ALL_ACCESS) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        match shell.delete_subkey_all(MENU_NAME) {
            Ok(()) => {
                tracing::info!(key = %shell_key, "removed context menu");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub(super) fn install(exe: &Path) -> Result<(), FixError> {
        let hkcr = RegKey::predef(HKEY_CLASSES_ROOT);
        let file_type = db_file_type(&hkcr);
        for entry in menu_entries(exe, file_type.as_deref()) {
            register(&hkcr, &entry).map_err(|source| FixError::ShellIntegrationFailed {
                action: "install",
                source,
            })?;
        }
        Ok(())
    }

    pub(super) fn uninstall() -> Result<(), FixError> {
        let hkcr = RegKey::predef(HKEY_CLASSES_ROOT);
        let mut shell_keys: Vec<String> =
            DIRECTORY_SHELL_KEYS.iter().map(|k| k.to_string()).collect();
        if let Some(file_type) = db_file_type(&hkcr).filter(|t| !t.is_empty()) {
            shell_keys.push(format!(r"{}\shell", file_type));
        }
        for key in &shell_keys {
            unregister(&hkcr, key).map_err(|source| FixError::ShellIntegrationFailed {
                action: "uninstall",
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(not(windows))]
mod imp {
    use std::path::Path;

    use crate::common::errors::FixError;

    pub(super) fn install(_exe: &Path) -> Result<(), FixError> {
        Err(FixError::ShellIntegrationUnsupported)
    }

    pub(super) fn uninstall() -> Result<(), FixError> {
        Err(FixError::ShellIntegrationUnsupported)
    }
}
