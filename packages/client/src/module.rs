use std::path::Path;

pub use self::import::Import;

pub mod import;

/// The name of the root module file at a package root.
pub const ROOT_MODULE_FILE_NAME: &str = "arbor.ts";

/// The extension of non-root module files.
pub const MODULE_EXTENSION: &str = ".ar.ts";

#[must_use]
pub fn is_root_module_path(path: &Path) -> bool {
	path.file_name()
		.is_some_and(|name| name == ROOT_MODULE_FILE_NAME)
}

#[must_use]
pub fn is_module_path(path: &Path) -> bool {
	path.file_name().is_some_and(|name| {
		let name = name.to_string_lossy();
		name == ROOT_MODULE_FILE_NAME || name.ends_with(MODULE_EXTENSION)
	})
}
