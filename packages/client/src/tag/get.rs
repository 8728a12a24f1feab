use crate as ar;

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Output {
	pub tag: ar::Tag,
	pub item: ar::tag::Item,
}
