use futures::future::BoxFuture;
use rand::{Rng as _, distributions::Alphanumeric};
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

pub use self::artifact::Artifact;

/// A temporary path, removed on drop.
pub struct Temp {
	path: PathBuf,
	preserve: bool,
}

impl Temp {
	#[must_use]
	#[allow(clippy::new_without_default)]
	pub fn new() -> Self {
		let name = rand::thread_rng()
			.sample_iter(&Alphanumeric)
			.take(16)
			.map(char::from)
			.collect::<String>();
		let path = std::env::temp_dir().join(name);
		Self {
			path,
			preserve: false,
		}
	}

	#[must_use]
	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn preserve(&mut self) {
		self.preserve = true;
	}

	pub async fn remove(&self) -> std::io::Result<()> {
		tokio::fs::remove_dir_all(&self.path).await
	}
}

impl AsRef<Path> for Temp {
	fn as_ref(&self) -> &Path {
		&self.path
	}
}

impl Drop for Temp {
	fn drop(&mut self) {
		if !self.preserve {
			std::fs::remove_dir_all(&self.path).ok();
		}
	}
}

pub mod artifact {
	use super::{BTreeMap, BoxFuture, Path};
	use futures::FutureExt as _;

	/// A declarative filesystem tree for tests.
	#[derive(Clone, Debug)]
	pub enum Artifact {
		Directory(BTreeMap<String, Artifact>),
		File { contents: String, executable: bool },
		Symlink { target: std::path::PathBuf },
	}

	impl Artifact {
		/// Write the artifact to `path`.
		pub fn to_path<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, std::io::Result<()>> {
			async move {
				match self {
					Artifact::Directory(entries) => {
						tokio::fs::create_dir_all(path).await?;
						for (name, artifact) in entries {
							artifact.to_path(&path.join(name)).await?;
						}
					},
					Artifact::File {
						contents,
						executable,
					} => {
						tokio::fs::write(path, contents).await?;
						if *executable {
							#[cfg(unix)]
							{
								use std::os::unix::fs::PermissionsExt as _;
								let permissions = std::fs::Permissions::from_mode(0o755);
								tokio::fs::set_permissions(path, permissions).await?;
							}
						}
					},
					Artifact::Symlink { target } => {
						#[cfg(unix)]
						tokio::fs::symlink(target, path).await?;
					},
				}
				Ok(())
			}
			.boxed()
		}
	}

	impl From<&str> for Artifact {
		fn from(value: &str) -> Self {
			Self::File {
				contents: value.to_owned(),
				executable: false,
			}
		}
	}

	impl From<String> for Artifact {
		fn from(value: String) -> Self {
			Self::File {
				contents: value,
				executable: false,
			}
		}
	}
}

#[macro_export]
macro_rules! directory {
	{ $($name:expr => $artifact:expr),* $(,)? } => {{
		let mut entries = std::collections::BTreeMap::new();
		$(
			entries.insert($name.to_owned(), $crate::Artifact::from($artifact));
		)*
		$crate::Artifact::Directory(entries)
	}};
}

#[macro_export]
macro_rules! file {
	($contents:expr) => {
		$crate::Artifact::File {
			contents: $contents.to_owned(),
			executable: false,
		}
	};
	($contents:expr, executable = $executable:expr) => {
		$crate::Artifact::File {
			contents: $contents.to_owned(),
			executable: $executable,
		}
	};
}

#[macro_export]
macro_rules! symlink {
	($target:expr) => {
		$crate::Artifact::Symlink {
			target: ::std::path::PathBuf::from($target),
		}
	};
}
