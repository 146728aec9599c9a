pub mod context_menu;

pub use context_menu::{install, uninstall, MenuEntry, MENU_NAME};
