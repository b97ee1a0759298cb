use super::{FloatT, SymmetricEntries};

/// Sparse symmetric matrix in coordinate (COO) list form.
///
/// Only the upper triangle is stored: every entry satisfies `row ≤ col`.
/// When built with regularization support, one slot per diagonal element
/// is reserved at the *start* of the entry list so that regularization
/// values can be overwritten in place without reshuffling indices, which
/// is what allows repeated refactorizations at a fixed sparsity pattern.

#[derive(Debug, Clone)]
pub struct CooSymmetricMatrix<T = f64> {
    dimension: usize,
    capacity: usize,
    row_indices: Vec<usize>,
    column_indices: Vec<usize>,
    values: Vec<T>,
    use_regularization: bool,
}

impl<T> CooSymmetricMatrix<T>
where
    T: FloatT,
{
    /// Allocate an empty matrix.   `capacity` bounds the number of entries
    /// over the whole lifetime of the matrix and must include the
    /// `dimension` regularization slots when `use_regularization` is set.
    pub fn new(dimension: usize, capacity: usize, use_regularization: bool) -> Self {
        let capacity = if use_regularization {
            capacity + dimension
        } else {
            capacity
        };
        let mut matrix = Self {
            dimension,
            capacity,
            row_indices: Vec::with_capacity(capacity),
            column_indices: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            use_regularization,
        };
        if use_regularization {
            matrix.initialize_regularization();
        }
        matrix
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn number_nonzeros(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append the entry `(row, col, value)` with `row ≤ col`.
    ///
    /// # Panics
    /// Panics on a lower-triangular coordinate or when the declared
    /// capacity is exhausted; both are precondition violations.
    pub fn insert(&mut self, row: usize, col: usize, value: T) {
        assert!(row <= col, "COO symmetric entries must satisfy row <= col");
        assert!(
            self.values.len() < self.capacity,
            "COO symmetric matrix capacity ({}) exhausted",
            self.capacity
        );
        self.row_indices.push(row);
        self.column_indices.push(col);
        self.values.push(value);
    }

    /// Column demarcation is meaningless for coordinate storage.
    pub fn finalize_column(&mut self, _col: usize) {}

    /// Empty the matrix, preserving capacity and re-seeding the
    /// regularization slots with zeros.
    pub fn reset(&mut self) {
        self.reset_with_dimension(self.dimension);
    }

    /// Empty the matrix and change its dimension, e.g. when the same
    /// storage serves subproblems of different sizes.   The capacity must
    /// cover the regularization slots of the new dimension.
    pub fn reset_with_dimension(&mut self, dimension: usize) {
        assert!(!self.use_regularization || dimension <= self.capacity);
        self.dimension = dimension;
        self.row_indices.clear();
        self.column_indices.clear();
        self.values.clear();
        if self.use_regularization {
            self.initialize_regularization();
        }
    }

    /// `y += α·A·x` treating the stored upper triangle as symmetric
    pub fn symv(&self, y: &mut [T], x: &[T], α: T) {
        for k in 0..self.values.len() {
            let (r, c, v) = (self.row_indices[k], self.column_indices[k], α * self.values[k]);
            y[r] += v * x[c];
            if r != c {
                y[c] += v * x[r];
            }
        }
    }

    /// Overwrite the reserved diagonal slots with `regularization(i)`.
    ///
    /// # Panics
    /// Panics if the matrix was allocated without regularization slots.
    pub fn set_regularization(&mut self, regularization: impl Fn(usize) -> T) {
        assert!(
            self.use_regularization,
            "regularization slots were not reserved for this matrix"
        );
        for i in 0..self.dimension {
            self.values[i] = regularization(i);
        }
    }

    /// Visit entries in storage order.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, T)) {
        for k in 0..self.values.len() {
            f(self.row_indices[k], self.column_indices[k], self.values[k]);
        }
    }

    fn initialize_regularization(&mut self) {
        for i in 0..self.dimension {
            self.insert(i, i, T::zero());
        }
    }
}

impl<T> SymmetricEntries<T> for CooSymmetricMatrix<T>
where
    T: FloatT,
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn number_nonzeros(&self) -> usize {
        self.values.len()
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(usize, usize, T)) {
        for k in 0..self.values.len() {
            f(self.row_indices[k], self.column_indices[k], self.values[k]);
        }
    }

    fn smallest_diagonal_entry(&self, len: usize) -> T {
        let mut diagonal = vec![T::zero(); len];
        self.for_each(|row, col, value| {
            if row == col && row < len {
                diagonal[row] += value;
            }
        });
        diagonal
            .iter()
            .fold(T::infinity(), |acc, &d| T::min(acc, d))
    }
}
