use super::{Directory, File, Node, State, Symlink, Variant};
use arbor_client as ar;
use futures::{FutureExt as _, future::BoxFuture};
use std::path::{Component, Path, PathBuf};

pub(super) async fn try_read_lockfile(root: &Path) -> ar::Result<Option<ar::Lockfile>> {
	let path = root.join(ar::lockfile::LOCKFILE_FILE_NAME);
	let bytes = match tokio::fs::read(&path).await {
		Ok(bytes) => bytes,
		Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
			return Ok(None);
		},
		Err(error) if error.kind() == std::io::ErrorKind::NotADirectory => {
			return Ok(None);
		},
		Err(source) => {
			return Err(ar::error!(!source, "failed to read the lockfile"));
		},
	};
	let lockfile = ar::Lockfile::deserialize(bytes)?;
	Ok(Some(lockfile))
}

/// Discover the filesystem tree under the root, coalescing hard links and
/// resolving symlink targets to nodes.
pub(super) async fn visit(state: &mut State) -> ar::Result<()> {
	let mut inodes = fnv::FnvHashMap::default();
	let root = state.root.clone();
	visit_path(state, &mut inodes, root).await?;
	resolve_symlinks(state)?;
	Ok(())
}

fn visit_path<'a>(
	state: &'a mut State,
	inodes: &'a mut fnv::FnvHashMap<(u64, u64), usize>,
	path: PathBuf,
) -> BoxFuture<'a, ar::Result<usize>> {
	async move {
		let metadata = tokio::fs::symlink_metadata(&path)
			.await
			.map_err(|source| ar::error!(!source, %path = path.display(), "failed to get the metadata"))?;

		// Coalesce hard links to files.
		let inode = inode(&metadata);
		if metadata.is_file() {
			if let Some(index) = inodes.get(&inode) {
				state.paths.insert(path.clone(), *index);
				return Ok(*index);
			}
		}

		let variant = if metadata.is_dir() {
			// Allocate the node before its children so the root gets index
			// zero.
			let index = allocate(state, &path, Variant::Directory(Directory {
				entries: std::collections::BTreeMap::new(),
			}));
			let mut names = Vec::new();
			let mut read_dir = tokio::fs::read_dir(&path)
				.await
				.map_err(|source| ar::error!(!source, %path = path.display(), "failed to read the directory"))?;
			while let Some(entry) = read_dir
				.next_entry()
				.await
				.map_err(|source| ar::error!(!source, "failed to read the directory entry"))?
			{
				let name = entry
					.file_name()
					.into_string()
					.map_err(|_| ar::error!(%path = path.display(), "the entry name is not valid unicode"))?;
				names.push(name);
			}
			names.sort();
			let mut entries = std::collections::BTreeMap::new();
			for name in names {
				validate_name(&name)?;
				if name == ar::lockfile::LOCKFILE_FILE_NAME {
					continue;
				}
				if state.arg.ignore && name == ".git" {
					continue;
				}
				let child = visit_path(state, inodes, path.join(&name)).await?;
				entries.insert(name, child);
			}
			let Variant::Directory(directory) = &mut state.nodes[index].variant else {
				unreachable!();
			};
			directory.entries = entries;
			return Ok(index);
		} else if metadata.is_file() {
			let contents = tokio::fs::read(&path)
				.await
				.map_err(|source| ar::error!(!source, %path = path.display(), "failed to read the file"))?;
			let executable = executable(&metadata);
			let imports = if ar::module::is_module_path(&path) {
				let text = String::from_utf8(contents.clone()).map_err(|source| {
					ar::error!(!source, %path = path.display(), "the module is not valid utf8")
				})?;
				ar::module::import::analyze(&text)?
			} else {
				Vec::new()
			};
			Variant::File(File {
				contents: contents.into(),
				executable,
				imports,
				dependencies: std::collections::BTreeMap::new(),
			})
		} else if metadata.is_symlink() {
			let target = tokio::fs::read_link(&path)
				.await
				.map_err(|source| ar::error!(!source, %path = path.display(), "failed to read the symlink"))?;
			Variant::Symlink(Symlink { target, node: None })
		} else {
			return Err(ar::error!(%path = path.display(), "unsupported file type"));
		};

		let index = allocate(state, &path, variant);
		if metadata.is_file() {
			inodes.insert(inode, index);
		}
		Ok(index)
	}
	.boxed()
}

fn allocate(state: &mut State, path: &Path, variant: Variant) -> usize {
	let index = state.nodes.len();
	state.nodes.push(Node {
		path: path.to_owned(),
		variant,
		data: None,
		id: None,
	});
	state.paths.insert(path.to_owned(), index);
	index
}

fn validate_name(name: &str) -> ar::Result<()> {
	if name.is_empty() || name == "." || name == ".." || name.contains('/') {
		return Err(ar::error!(%name, "invalid path component"));
	}
	Ok(())
}

/// Resolve every symlink whose target lies inside the root to its node.
///
/// Absolute targets stay path-only. Relative targets that escape the root are
/// errors.
fn resolve_symlinks(state: &mut State) -> ar::Result<()> {
	let mut resolutions = Vec::new();
	for (index, node) in state.nodes.iter().enumerate() {
		let Variant::Symlink(symlink) = &node.variant else {
			continue;
		};
		if symlink.target.is_absolute() {
			continue;
		}
		let parent = node
			.path
			.parent()
			.ok_or_else(|| ar::error!("the symlink has no parent"))?;
		let resolved = normalize(&parent.join(&symlink.target));
		if !resolved.starts_with(&state.root) {
			return Err(
				ar::error!(%path = node.path.display(), %target = symlink.target.display(), "the symlink target escapes the root"),
			);
		}
		let target = state.paths.get(&resolved).copied().ok_or_else(|| {
			ar::error!(%path = node.path.display(), %target = symlink.target.display(), "failed to resolve the symlink")
		})?;
		resolutions.push((index, target));
	}
	for (index, target) in resolutions {
		let Variant::Symlink(symlink) = &mut state.nodes[index].variant else {
			unreachable!();
		};
		symlink.node = Some(target);
	}
	Ok(())
}

/// Lexically normalize a path.
pub(super) fn normalize(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => (),
			Component::ParentDir => {
				normalized.pop();
			},
			component => {
				normalized.push(component);
			},
		}
	}
	normalized
}

fn inode(metadata: &std::fs::Metadata) -> (u64, u64) {
	#[cfg(unix)]
	{
		use std::os::unix::fs::MetadataExt as _;
		(metadata.dev(), metadata.ino())
	}
	#[cfg(not(unix))]
	{
		let _ = metadata;
		(0, 0)
	}
}

fn executable(metadata: &std::fs::Metadata) -> bool {
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt as _;
		metadata.permissions().mode() & 0o111 != 0
	}
	#[cfg(not(unix))]
	{
		let _ = metadata;
		false
	}
}
