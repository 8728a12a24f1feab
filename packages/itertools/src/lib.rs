use either::Either;

pub trait IteratorExt: Iterator {
	fn boxed<'a>(self) -> Box<dyn Iterator<Item = Self::Item> + Send + 'a>
	where
		Self: Sized + Send + 'a,
	{
		Box::new(self)
	}

	fn left_iterator<R>(self) -> Either<Self, R>
	where
		Self: Sized,
		R: Iterator<Item = Self::Item>,
	{
		Either::Left(self)
	}

	fn right_iterator<L>(self) -> Either<L, Self>
	where
		Self: Sized,
		L: Iterator<Item = Self::Item>,
	{
		Either::Right(self)
	}
}

impl<T> IteratorExt for T where T: Iterator {}

#[cfg(test)]
mod tests {
	use super::IteratorExt as _;

	#[test]
	fn left_and_right() {
		let condition = true;
		let iterator = if condition {
			std::iter::once(1).left_iterator()
		} else {
			[1, 2, 3].into_iter().right_iterator()
		};
		assert_eq!(iterator.collect::<Vec<_>>(), vec![1]);
	}

	#[test]
	fn boxed() {
		let iterator = (0..3).boxed();
		assert_eq!(iterator.sum::<u32>(), 3);
	}
}
