use crate as ar;

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Arg {
	pub item: ar::tag::Item,
}
