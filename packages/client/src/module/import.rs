use crate as ar;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Import {
	pub reference: ar::Reference,
}

impl Import {
	pub fn with_specifier(specifier: &str) -> ar::Result<Self> {
		let reference = specifier
			.parse::<ar::Reference>()
			.map_err(|source| ar::error!(!source, %specifier, "invalid import specifier"))?;
		Ok(Self { reference })
	}
}

/// Extract the import specifiers from a module's text.
///
/// The scanner recognizes `import … from "specifier"`,
/// `export … from "specifier"`, and bare `import "specifier"` statements.
pub fn analyze(text: &str) -> ar::Result<Vec<Import>> {
	let mut imports = Vec::new();
	for line in text.lines() {
		let line = line.trim_start();
		if !(line.starts_with("import") || line.starts_with("export")) {
			continue;
		}
		let Some(specifier) = specifier(line) else {
			continue;
		};
		let import = Import::with_specifier(specifier)?;
		if !imports.contains(&import) {
			imports.push(import);
		}
	}
	Ok(imports)
}

fn specifier(line: &str) -> Option<&str> {
	let rest = if let Some(position) = line.find(" from ") {
		&line[position + " from ".len()..]
	} else if let Some(rest) = line.strip_prefix("import") {
		// A bare import has its specifier immediately after the keyword.
		let rest = rest.trim_start();
		if !(rest.starts_with('"') || rest.starts_with('\'')) {
			return None;
		}
		rest
	} else {
		return None;
	};
	let rest = rest.trim_start();
	let quote = rest.chars().next()?;
	if quote != '"' && quote != '\'' {
		return None;
	}
	let rest = &rest[1..];
	let end = rest.find(quote)?;
	Some(&rest[..end])
}

#[cfg(test)]
mod tests {
	use super::analyze;

	#[test]
	fn imports() {
		let text = r#"
			import * as dep from "./dependency.ar.ts";
			import "./other.ar.ts";
			import * as std from "std/1.0";
			export { f } from "./exported.ar.ts";
			let s = "not an import";
		"#;
		let imports = analyze(text).unwrap();
		let specifiers = imports
			.iter()
			.map(|import| import.reference.to_string())
			.collect::<Vec<_>>();
		assert_eq!(
			specifiers,
			vec![
				"./dependency.ar.ts",
				"./other.ar.ts",
				"std/1.0",
				"./exported.ar.ts",
			],
		);
	}

	#[test]
	fn duplicates_are_coalesced() {
		let text = r#"
			import * as a from "./a.ar.ts";
			import { b } from "./a.ar.ts";
		"#;
		let imports = analyze(text).unwrap();
		assert_eq!(imports.len(), 1);
	}
}
