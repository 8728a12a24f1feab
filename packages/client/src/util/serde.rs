pub fn is_false(value: &bool) -> bool {
	!*value
}

pub fn is_true(value: &bool) -> bool {
	*value
}

pub fn return_true() -> bool {
	true
}
