use alloc::vec::Vec;

pub trait InsertOrPush<T> {
	fn insert_or_push(&mut self, index: usize, value: T);

	/// Inserts `value` after every element whose key is less than or equal to its own,
	/// so elements sharing a key keep their insertion order. Returns the index it landed on.
	fn insert_sorted_by_key<K, F>(&mut self, value: T, key: F) -> usize
	where
		K: Ord,
		F: Fn(&T) -> K;
}

impl<T> InsertOrPush<T> for Vec<T> {
	fn insert_or_push(&mut self, index: usize, value: T) {
		if index >= self.len() {
			self.push(value);
		} else {
			self.insert(index, value);
		}
	}

	fn insert_sorted_by_key<K, F>(&mut self, value: T, key: F) -> usize
	where
		K: Ord,
		F: Fn(&T) -> K,
	{
		let wanted = key(&value);
		let index = self.partition_point(|existing| key(existing) <= wanted);

		self.insert_or_push(index, value);

		index
	}
}
