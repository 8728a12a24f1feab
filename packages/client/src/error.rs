use std::{collections::BTreeMap, sync::Arc};

/// A result alias that defaults to `Error` as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error.
#[derive(Clone, Debug, derive_more::Display, serde::Deserialize, serde::Serialize)]
#[display("{message}")]
pub struct Error {
	/// The error's message.
	pub message: String,

	/// The location where the error occurred.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<Location>,

	/// A stack trace associated with the error.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<Vec<Location>>,

	/// The error's source.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<Arc<Error>>,

	/// Values associated with the error.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub values: BTreeMap<String, String>,
}

/// An error location.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Location {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub symbol: Option<String>,
	pub path: String,
	pub line: u32,
	pub column: u32,
}

pub struct Trace<'a> {
	pub error: &'a Error,
}

impl Error {
	#[must_use]
	pub fn trace(&self) -> Trace<'_> {
		Trace { error: self }
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.source
			.as_ref()
			.map(|source| source.as_ref() as &(dyn std::error::Error + 'static))
	}
}

impl From<Box<dyn std::error::Error + Send + Sync + 'static>> for Error {
	fn from(value: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
		match value.downcast::<Error>() {
			Ok(error) => *error,
			Err(error) => Self {
				message: error.to_string(),
				location: None,
				stack: None,
				source: error.source().map(|source| {
					Arc::new(Self {
						message: source.to_string(),
						location: None,
						stack: None,
						source: None,
						values: BTreeMap::new(),
					})
				}),
				values: BTreeMap::new(),
			},
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(value: std::io::Error) -> Self {
		let value: Box<dyn std::error::Error + Send + Sync + 'static> = Box::new(value);
		value.into()
	}
}

impl std::fmt::Display for Trace<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut error = Some(self.error);
		let mut first = true;
		while let Some(current) = error {
			if !first {
				write!(f, "\n-> ")?;
			}
			first = false;
			write!(f, "{}", current.message)?;
			if let Some(location) = &current.location {
				write!(f, " ({location})")?;
			}
			for (name, value) in &current.values {
				write!(f, " {name}={value}")?;
			}
			error = current.source.as_deref();
		}
		Ok(())
	}
}

impl std::fmt::Display for Location {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}:{}", self.path, self.line + 1, self.column + 1)?;
		if let Some(symbol) = &self.symbol {
			write!(f, " {symbol}")?;
		}
		Ok(())
	}
}

/// Generate an [Error].
///
/// Usage:
/// ```rust
/// use arbor_client as ar;
/// ar::error!("error message");
/// ar::error!("error message with interpolation {}", 42);
///
/// let name = "value";
/// ar::error!(%name, "error message with a named value (pretty printed)");
/// ar::error!(?name, "error message with a named value (debug printed)");
///
/// let error = std::io::Error::last_os_error();
/// ar::error!(source = error, "an error that wraps an existing error");
/// ```
#[macro_export]
macro_rules! error {
	({ $error:ident }, %$name:ident, $($arg:tt)*) => {
		$error.values.insert(stringify!($name).to_owned(), $name.to_string());
		$crate::error!({ $error }, $($arg)*)
	};
	({ $error:ident }, ?$name:ident, $($arg:tt)*) => {
		$error.values.insert(stringify!($name).to_owned(), format!("{:?}", $name));
		$crate::error!({ $error }, $($arg)*)
	};
	({ $error:ident }, %$name:ident = $value:expr, $($arg:tt)*) => {
		$error.values.insert(stringify!($name).to_owned(), $value.to_string());
		$crate::error!({ $error }, $($arg)*)
	};
	({ $error:ident }, ?$name:ident = $value:expr, $($arg:tt)*) => {
		$error.values.insert(stringify!($name).to_owned(), format!("{:?}", $value));
		$crate::error!({ $error }, $($arg)*)
	};
	({ $error:ident }, !$source:expr, $($arg:tt)*) => {
		$error.source.replace(std::sync::Arc::new({
			let source: Box<dyn std::error::Error + Send + Sync + 'static> = Box::new($source);
			$crate::Error::from(source)
		}));
		$crate::error!({ $error }, $($arg)*)
	};
	({ $error:ident }, source = $source:expr, $($arg:tt)*) => {
		$error.source.replace(std::sync::Arc::new({
			let source: Box<dyn std::error::Error + Send + Sync + 'static> = Box::new($source);
			$crate::Error::from(source)
		}));
		$crate::error!({ $error }, $($arg)*)
	};
	({ $error:ident }, stack = $stack:expr, $($arg:tt)*) => {
		$error.stack.replace($stack);
		$crate::error!({ $error }, $($arg)*)
	};
	({ $error:ident }, $($arg:tt)*) => {
		$error.message = format!($($arg)*);
	};
	($($arg:tt)*) => {{
		let mut __error = $crate::Error {
			message: String::new(),
			location: Some($crate::error::Location {
				symbol: Some($crate::function!().to_owned()),
				path: file!().to_owned(),
				line: line!() - 1,
				column: column!() - 1,
			}),
			source: None,
			stack: None,
			values: std::collections::BTreeMap::new(),
		};
		$crate::error!({ __error }, $($arg)*);
		$crate::Error::from(__error)
	}};
}

#[macro_export]
macro_rules! function {
	() => {{
		struct __Dummy {}
		std::any::type_name::<__Dummy>()
			.strip_suffix("::__Dummy")
			.unwrap()
	}};
}

#[cfg(test)]
mod tests {
	use crate as ar;

	#[test]
	fn error_macro() {
		let foo = "foo";
		let bar = "bar";
		let error = ar::error!(?foo, %bar, %baz = "baz", ?qux = "qux", "{}", "message");
		assert_eq!(error.message, "message");
		assert_eq!(error.values.len(), 4);

		let source = std::io::Error::other("an io error");
		let error = ar::error!(!source, "another error");
		assert_eq!(error.message, "another error");
		assert_eq!(error.source.as_ref().unwrap().message, "an io error");
	}

	#[test]
	fn function_macro() {
		let f = ar::function!();
		assert_eq!(f, "arbor_client::error::tests::function_macro");
	}
}
