#![allow(non_snake_case)]

use super::{FloatT, SymmetricEntries};

/// Sparse matrix in standard Compressed Sparse Column (CSC) format.
///
/// Within the solver this type stores factorization output (the lower
/// triangular factor `L`) and the internal permuted copies of symmetric
/// matrices held by the bundled LDLᵀ solver.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CscMatrix<T = f64> {
    /// number of rows
    pub m: usize,
    /// number of columns
    pub n: usize,
    /// column pointer of length `n + 1`, with `colptr[n]` equal to the
    /// number of nonzeros
    pub colptr: Vec<usize>,
    /// row indices
    pub rowval: Vec<usize>,
    /// nonzero values
    pub nzval: Vec<T>,
}

impl<T> CscMatrix<T>
where
    T: FloatT,
{
    pub fn new(m: usize, n: usize, colptr: Vec<usize>, rowval: Vec<usize>, nzval: Vec<T>) -> Self {
        assert_eq!(rowval.len(), nzval.len());
        assert_eq!(colptr.len(), n + 1);
        assert_eq!(colptr[n], rowval.len());
        CscMatrix {
            m,
            n,
            colptr,
            rowval,
            nzval,
        }
    }

    /// allocate space for an `m` x `n` matrix with `nnz` elements
    pub fn spalloc(size: (usize, usize), nnz: usize) -> Self {
        let (m, n) = size;
        let mut colptr = vec![0; n + 1];
        let rowval = vec![0; nnz];
        let nzval = vec![T::zero(); nnz];
        colptr[n] = nnz;

        CscMatrix::new(m, n, colptr, rowval, nzval)
    }

    /// number of nonzeros
    pub fn nnz(&self) -> usize {
        self.colptr[self.n]
    }

    pub fn is_square(&self) -> bool {
        self.m == self.n
    }

    /// `true` if all entries lie on or above the diagonal
    pub fn is_triu(&self) -> bool {
        for col in 0..self.n {
            for &row in &self.rowval[self.colptr[col]..self.colptr[col + 1]] {
                if row > col {
                    return false;
                }
            }
        }
        true
    }
}

/// Sparse symmetric matrix built column by column in CSC form.
///
/// Only the upper triangle is stored.   Columns must be filled in order;
/// [`finalize_column`](CscSymmetricMatrix::finalize_column) closes a column
/// (empty intermediate columns are closed implicitly).   When built with
/// regularization support, the first entry of every column is a reserved
/// diagonal slot written by
/// [`set_regularization`](CscSymmetricMatrix::set_regularization), so the
/// sparsity pattern survives repeated regularization updates.

#[derive(Debug, Clone)]
pub struct CscSymmetricMatrix<T = f64> {
    dimension: usize,
    capacity: usize,
    colptr: Vec<usize>,
    rowval: Vec<usize>,
    nzval: Vec<T>,
    columns_started: usize,
    use_regularization: bool,
}

impl<T> CscSymmetricMatrix<T>
where
    T: FloatT,
{
    pub fn new(dimension: usize, capacity: usize, use_regularization: bool) -> Self {
        let capacity = if use_regularization {
            capacity + dimension
        } else {
            capacity
        };
        Self {
            dimension,
            capacity,
            colptr: Vec::with_capacity(dimension),
            rowval: Vec::with_capacity(capacity),
            nzval: Vec::with_capacity(capacity),
            columns_started: 0,
            use_regularization,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn number_nonzeros(&self) -> usize {
        self.nzval.len()
    }

    /// Append the entry `(row, col, value)` with `row ≤ col`.   Columns are
    /// filled in nondecreasing order of `col`.
    ///
    /// # Panics
    /// Panics on a lower-triangular coordinate, an out-of-order column, or
    /// when the declared capacity is exhausted.
    pub fn insert(&mut self, row: usize, col: usize, value: T) {
        assert!(row <= col, "CSC symmetric entries must satisfy row <= col");
        assert!(col < self.dimension);
        self.start_columns_through(col);
        assert!(
            self.nzval.len() < self.capacity,
            "CSC symmetric matrix capacity ({}) exhausted",
            self.capacity
        );
        self.rowval.push(row);
        self.nzval.push(value);
    }

    /// Close column `col`, implicitly closing any columns before it.
    pub fn finalize_column(&mut self, col: usize) {
        assert!(col < self.dimension);
        self.start_columns_through(col);
    }

    /// Empty the matrix, preserving capacity.
    pub fn reset(&mut self) {
        self.colptr.clear();
        self.rowval.clear();
        self.nzval.clear();
        self.columns_started = 0;
    }

    /// Overwrite the reserved diagonal slots with `regularization(i)`.
    ///
    /// # Panics
    /// Panics if regularization slots were not reserved, or if not all
    /// columns have been started.
    pub fn set_regularization(&mut self, regularization: impl Fn(usize) -> T) {
        assert!(
            self.use_regularization,
            "regularization slots were not reserved for this matrix"
        );
        self.start_columns_through(self.dimension - 1);
        for j in 0..self.dimension {
            let slot = self.colptr[j];
            self.nzval[slot] = regularization(j);
        }
    }

    /// Visit entries column by column as `(row, col, value)`.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, T)) {
        for col in 0..self.columns_started {
            let stop = self.column_end(col);
            for k in self.colptr[col]..stop {
                f(self.rowval[k], col, self.nzval[k]);
            }
        }
    }

    fn column_end(&self, col: usize) -> usize {
        if col + 1 < self.columns_started {
            self.colptr[col + 1]
        } else {
            self.nzval.len()
        }
    }

    fn start_columns_through(&mut self, col: usize) {
        while self.columns_started <= col {
            self.colptr.push(self.nzval.len());
            let j = self.columns_started;
            self.columns_started += 1;
            if self.use_regularization {
                assert!(self.nzval.len() < self.capacity);
                self.rowval.push(j);
                self.nzval.push(T::zero());
            }
        }
    }
}

impl<T> SymmetricEntries<T> for CscSymmetricMatrix<T>
where
    T: FloatT,
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn number_nonzeros(&self) -> usize {
        self.nzval.len()
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(usize, usize, T)) {
        for col in 0..self.columns_started {
            let stop = self.column_end(col);
            for k in self.colptr[col]..stop {
                f(self.rowval[k], col, self.nzval[k]);
            }
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
