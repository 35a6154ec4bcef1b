use num_traits::Float;

pub(crate) fn euclidean_distance<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x - *y) * (*x - *y))
        .fold(T::zero(), std::ops::Add::add)
        .sqrt()
}

/// Scales a vector to unit length. Zero vectors are left as they are.
pub fn l2_normalize<T: Float>(vector: &mut [T]) {
    let norm = vector
        .iter()
        .map(|x| *x * *x)
        .fold(T::zero(), std::ops::Add::add)
        .sqrt();
    if norm > T::zero() {
        vector.iter_mut().for_each(|x| *x = *x / norm);
    }
}
