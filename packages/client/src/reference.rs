use crate as ar;
use std::path::PathBuf;

/// A reference names a dependency: an object by ID, a path, or a tag.
#[derive(
	Clone,
	Debug,
	Eq,
	Hash,
	Ord,
	PartialEq,
	PartialOrd,
	serde_with::DeserializeFromStr,
	serde_with::SerializeDisplay,
)]
pub struct Reference {
	pub item: Item,
	pub options: Options,
}

#[derive(
	Clone,
	Debug,
	Eq,
	Hash,
	Ord,
	PartialEq,
	PartialOrd,
	derive_more::IsVariant,
	derive_more::TryUnwrap,
)]
#[try_unwrap(ref)]
pub enum Item {
	Object(ar::object::Id),
	Path(PathBuf),
	Tag(ar::Tag),
}

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Options {
	pub id: Option<ar::object::Id>,
	pub name: Option<String>,
	pub path: Option<PathBuf>,
}

impl Reference {
	#[must_use]
	pub fn with_object(object: ar::object::Id) -> Self {
		Self {
			item: Item::Object(object),
			options: Options::default(),
		}
	}

	#[must_use]
	pub fn with_path(path: impl Into<PathBuf>) -> Self {
		Self {
			item: Item::Path(path.into()),
			options: Options::default(),
		}
	}

	#[must_use]
	pub fn with_tag(tag: ar::Tag) -> Self {
		Self {
			item: Item::Tag(tag),
			options: Options::default(),
		}
	}

	#[must_use]
	pub fn item(&self) -> &Item {
		&self.item
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.options
	}

	/// The name the reference binds to, if one can be derived.
	#[must_use]
	pub fn name(&self) -> Option<String> {
		if let Some(name) = &self.options.name {
			return Some(name.clone());
		}
		match &self.item {
			Item::Tag(tag) => tag.components().next().map(ToOwned::to_owned),
			Item::Path(path) => path
				.file_name()
				.map(|name| name.to_string_lossy().into_owned()),
			Item::Object(_) => None,
		}
	}
}

impl Options {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.id.is_none() && self.name.is_none() && self.path.is_none()
	}
}

impl std::fmt::Display for Reference {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.item)?;
		if !self.options.is_empty() {
			let mut query = Vec::new();
			if let Some(id) = &self.options.id {
				query.push(format!("id={}", urlencoding::encode(&id.to_string())));
			}
			if let Some(name) = &self.options.name {
				query.push(format!("name={}", urlencoding::encode(name)));
			}
			if let Some(path) = &self.options.path {
				let path = path.to_string_lossy();
				query.push(format!("path={}", urlencoding::encode(&path)));
			}
			write!(f, "?{}", query.join("&"))?;
		}
		Ok(())
	}
}

impl std::fmt::Display for Item {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Object(object) => write!(f, "{object}"),
			Self::Path(path) => write!(f, "{}", path.display()),
			Self::Tag(tag) => write!(f, "{tag}"),
		}
	}
}

impl std::str::FromStr for Reference {
	type Err = ar::Error;

	fn from_str(value: &str) -> ar::Result<Self, Self::Err> {
		let (item, query) = match value.split_once('?') {
			Some((item, query)) => (item, Some(query)),
			None => (value, None),
		};
		if item.is_empty() {
			return Err(ar::error!(%value, "invalid reference"));
		}
		let item = item.parse()?;
		let mut options = Options::default();
		if let Some(query) = query {
			for param in query.split('&') {
				let Some((key, param)) = param.split_once('=') else {
					return Err(ar::error!(%value, "invalid reference"));
				};
				let param = urlencoding::decode(param)
					.map_err(|source| ar::error!(!source, %value, "invalid reference"))?;
				match key {
					"id" => {
						options.id = Some(param.parse()?);
					},
					"name" => {
						options.name = Some(param.into_owned());
					},
					"path" => {
						options.path = Some(param.into_owned().into());
					},
					_ => {
						return Err(ar::error!(%key, "unknown reference option"));
					},
				}
			}
		}
		Ok(Self { item, options })
	}
}

impl std::str::FromStr for Item {
	type Err = ar::Error;

	fn from_str(value: &str) -> ar::Result<Self, Self::Err> {
		if value.starts_with("./") || value.starts_with("../") || value.starts_with('/') {
			return Ok(Self::Path(value.into()));
		}
		if let Ok(object) = value.parse() {
			return Ok(Self::Object(object));
		}
		let tag = value.parse()?;
		Ok(Self::Tag(tag))
	}
}
