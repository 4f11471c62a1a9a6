/// A type that names a slot in an [`IndexedMap`](crate::maps::IndexedMap).
pub trait IndexRef: Copy + Eq {
    fn index(&self) -> usize;
    fn new(input: usize) -> Self;
}
