#![allow(non_snake_case)]

//! Bundled LDLᵀ solver for sparse symmetric indefinite systems.
//!
//! The factorization is pivotless and up-looking, working on an
//! internally permuted upper-triangular copy of the input matrix.   The
//! signs of the pivots give the matrix inertia, which the augmented
//! system layer uses for its regularization loop; a pivot at or below
//! the zero tolerance aborts the factorization and is reported as rank
//! deficiency rather than patched, so that inertia counts stay honest.

use super::{FactorizationError, Inertia, SymmetricIndefiniteSolver};
use crate::algebra::*;
use core::cmp::{max, min};
use derive_builder::Builder;
use std::iter::zip;

/// Settings for [`LdlSolver`]

#[derive(Builder, Debug, Clone)]
pub struct LdlSettings<T: FloatT> {
    /// scaling of the AMD dense-node threshold
    #[builder(default = "1.0")]
    pub amd_dense_scale: f64,
    /// user-provided fill-reducing ordering; AMD is used when absent
    #[builder(default = "None", setter(strip_option))]
    pub perm: Option<Vec<usize>>,
    /// pivots with magnitude at or below this value abort the
    /// factorization and mark the matrix singular
    #[builder(default = "(1e-14).as_T()")]
    pub zero_pivot_tolerance: T,
}

impl<T> Default for LdlSettings<T>
where
    T: FloatT,
{
    fn default() -> LdlSettings<T> {
        LdlSettingsBuilder::<T>::default().build().unwrap()
    }
}

/// Direct LDLᵀ solver implementing
/// [`SymmetricIndefiniteSolver`](crate::linsolve::SymmetricIndefiniteSolver).

#[derive(Debug)]
pub struct LdlSolver<T: FloatT = f64> {
    settings: LdlSettings<T>,

    // dimension and pattern size fixed at symbolic factorization
    n: usize,
    pattern_entries: usize,

    // permutation and its inverse
    perm: Vec<usize>,
    iperm: Vec<usize>,

    // mapping from input entry order to positions in `triu`;
    // duplicate coordinates map to a shared position and accumulate
    map: Vec<usize>,

    // permuted upper-triangular working copy
    triu: CscMatrix<T>,

    // factors A = LDLᵀ
    L: CscMatrix<T>,
    D: Vec<T>,
    Dinv: Vec<T>,

    // symbolic data and workspaces
    etree: Vec<usize>,
    Lnz: Vec<usize>,
    iwork: Vec<usize>,
    bwork: Vec<bool>,
    fwork: Vec<T>,

    // status of the last numerical factorization
    inertia: Inertia,
    factored_rank: usize,
    singular: bool,
    factorization_ok: bool,
    symbolic_done: bool,
}

impl<T> LdlSolver<T>
where
    T: FloatT,
{
    pub fn new(settings: LdlSettings<T>) -> Self {
        Self {
            settings,
            n: 0,
            pattern_entries: 0,
            perm: Vec::new(),
            iperm: Vec::new(),
            map: Vec::new(),
            triu: CscMatrix::spalloc((0, 0), 0),
            L: CscMatrix::spalloc((0, 0), 0),
            D: Vec::new(),
            Dinv: Vec::new(),
            etree: Vec::new(),
            Lnz: Vec::new(),
            iwork: Vec::new(),
            bwork: Vec::new(),
            fwork: Vec::new(),
            inertia: Inertia::default(),
            factored_rank: 0,
            singular: false,
            factorization_ok: false,
            symbolic_done: false,
        }
    }
}

impl<T> Default for LdlSolver<T>
where
    T: FloatT,
{
    fn default() -> Self {
        Self::new(LdlSettings::default())
    }
}

impl<T> SymmetricIndefiniteSolver<T> for LdlSolver<T>
where
    T: FloatT,
{
    fn do_symbolic_factorization(&mut self, matrix: &dyn SymmetricEntries<T>) {
        // idempotent once the pattern is fixed
        if self.symbolic_done
            && self.n == matrix.dimension()
            && self.pattern_entries == matrix.number_nonzeros()
        {
            return;
        }

        let n = matrix.dimension();
        self.n = n;
        self.pattern_entries = matrix.number_nonzeros();

        // deduplicated upper-triangular pattern in natural order,
        // with a map from input entry order to pattern positions
        let (pattern, dedup_map) = _deduplicate_pattern(matrix);

        // fill-reducing ordering: user supplied, or AMD on the
        // deduplicated pattern with the dense-node threshold scaled per
        // the settings
        if let Some(perm) = self.settings.perm.clone() {
            self.iperm = _invperm(&perm);
            self.perm = perm;
        } else {
            let mut control = amd::Control::default();
            control.dense *= self.settings.amd_dense_scale;
            (self.perm, self.iperm, _) =
                amd::order(n, &pattern.colptr, &pattern.rowval, &control).unwrap();
        }

        // permute to (another) upper triangular pattern, keeping the
        // index mapping from the natural pattern to the permuted one
        let (triu, AtoPAPt) = _permute_symmetric(&pattern, &self.iperm);
        self.triu = triu;

        // compose the two maps so numerical refreshes go straight from
        // input entries to the permuted storage
        self.map = dedup_map.iter().map(|&k| AtoPAPt[k]).collect();

        // elimination tree and column counts of L
        self.etree = vec![0; n];
        self.Lnz = vec![0; n];
        self.iwork = vec![0; 3 * n];
        self.bwork = vec![false; n];
        self.fwork = vec![T::zero(); n];
        _etree(
            n,
            &self.triu.colptr,
            &self.triu.rowval,
            &mut self.iwork,
            &mut self.Lnz,
            &mut self.etree,
        );

        let sumLnz = self.Lnz.iter().sum();
        self.L = CscMatrix::spalloc((n, n), sumLnz);
        self.D = vec![T::zero(); n];
        self.Dinv = vec![T::zero(); n];

        self.factorization_ok = false;
        self.symbolic_done = true;
    }

    fn do_numerical_factorization(
        &mut self,
        matrix: &dyn SymmetricEntries<T>,
    ) -> Result<(), FactorizationError> {
        if !self.symbolic_done {
            return Err(FactorizationError::SymbolicFactorizationMissing);
        }
        if matrix.dimension() != self.n || matrix.number_nonzeros() != self.pattern_entries {
            return Err(FactorizationError::PatternChanged);
        }

        // refresh the permuted copy, accumulating duplicates
        self.triu.nzval.set(T::zero());
        let (nzval, map) = (&mut self.triu.nzval, &self.map);
        let mut k = 0;
        matrix.for_each_entry(&mut |_row, _col, value| {
            nzval[map[k]] += value;
            k += 1;
        });

        let outcome = _factor(
            self.n,
            &self.triu.colptr,
            &self.triu.rowval,
            &self.triu.nzval,
            &mut self.L.colptr,
            &mut self.L.rowval,
            &mut self.L.nzval,
            &mut self.D,
            &mut self.Dinv,
            &self.Lnz,
            &self.etree,
            &mut self.bwork,
            &mut self.iwork,
            &mut self.fwork,
            self.settings.zero_pivot_tolerance,
        );

        match outcome {
            FactorOutcome::Complete { positive, negative } => {
                self.inertia = Inertia {
                    positive,
                    negative,
                    zero: 0,
                };
                self.factored_rank = self.n;
                self.singular = false;
                self.factorization_ok = true;
            }
            FactorOutcome::ZeroPivot {
                at,
                positive,
                negative,
            } => {
                self.inertia = Inertia {
                    positive,
                    negative,
                    zero: self.n - at,
                };
                self.factored_rank = at;
                self.singular = true;
                self.factorization_ok = false;
            }
        }
        Ok(())
    }

    fn solve(&mut self, rhs: &[T], solution: &mut [T]) {
        debug_assert!(self.factorization_ok, "solve called without factorization");
        assert_eq!(rhs.len(), self.n);
        assert_eq!(solution.len(), self.n);

        // gather the rhs into elimination order, solve in place against
        // the factors, then scatter back to the natural order
        for k in 0..self.n {
            self.fwork[k] = rhs[self.perm[k]];
        }
        _lsolve(&self.L.colptr, &self.L.rowval, &self.L.nzval, &mut self.fwork);
        for k in 0..self.n {
            self.fwork[k] *= self.Dinv[k];
        }
        _ltsolve(&self.L.colptr, &self.L.rowval, &self.L.nzval, &mut self.fwork);
        for k in 0..self.n {
            solution[self.perm[k]] = self.fwork[k];
        }
    }

    fn rank(&self) -> usize {
        self.factored_rank
    }

    fn number_negative_eigenvalues(&self) -> usize {
        self.inertia.negative
    }

    fn matrix_is_singular(&self) -> bool {
        self.singular
    }

    fn inertia(&self) -> Inertia {
        self.inertia
    }
}

// -------------------------------------
// pattern preparation
// -------------------------------------

// Build a deduplicated upper-triangular CSC pattern from arbitrary-order
// symmetric entries, returning the pattern and the map from input entry
// order to pattern positions.
fn _deduplicate_pattern<T: FloatT>(
    matrix: &dyn SymmetricEntries<T>,
) -> (CscMatrix<T>, Vec<usize>) {
    let n = matrix.dimension();
    let nnz_in = matrix.number_nonzeros();

    let mut coords = Vec::with_capacity(nnz_in);
    matrix.for_each_entry(&mut |row, col, _| {
        debug_assert!(row <= col && col < n);
        coords.push((col, row));
    });

    // sort entry order by (col, row) so duplicates become adjacent
    let mut order: Vec<usize> = (0..nnz_in).collect();
    order.sort_unstable_by_key(|&k| coords[k]);

    let mut map = vec![0; nnz_in];
    let mut colptr = vec![0; n + 1];
    let mut rowval = Vec::with_capacity(nnz_in);

    let mut previous: Option<(usize, usize)> = None;
    for &k in &order {
        let (col, row) = coords[k];
        if previous != Some((col, row)) {
            rowval.push(row);
            colptr[col + 1] += 1;
            previous = Some((col, row));
        }
        map[k] = rowval.len() - 1;
    }
    for j in 0..n {
        colptr[j + 1] += colptr[j];
    }

    let nzval = vec![T::zero(); rowval.len()];
    (CscMatrix::new(n, n, colptr, rowval, nzval), map)
}

// Construct an inverse permutation from a permutation
fn _invperm(p: &[usize]) -> Vec<usize> {
    let mut b = vec![usize::MAX; p.len()];
    for (i, &j) in p.iter().enumerate() {
        assert!(j < p.len() && b[j] == usize::MAX, "invalid permutation");
        b[j] = i;
    }
    b
}

// Given a sparse symmetric matrix `A` (only upper triangular entries),
// return the permuted symmetric matrix `P` (also upper triangular) for
// the inverse permutation vector `iperm`, together with the entry map
// from `A`'s storage to `P`'s storage.
fn _permute_symmetric<T: FloatT>(A: &CscMatrix<T>, iperm: &[usize]) -> (CscMatrix<T>, Vec<usize>) {
    let n = A.n;
    let mut P = CscMatrix::<T>::spalloc((n, n), A.nnz());
    let mut AtoPAPt = vec![0; A.nnz()];

    // 1. count the entries each column of P will receive
    let mut num_entries = vec![0; n];
    for colA in 0..n {
        let colP = iperm[colA];
        for &rowA in &A.rowval[A.colptr[colA]..A.colptr[colA + 1]] {
            let rowP = iperm[rowA];
            num_entries[max(rowP, colP)] += 1;
        }
    }

    // 2. cumulative sum into the column pointer
    P.colptr[0] = 0;
    let mut acc = 0;
    for (Pckp1, ne) in zip(&mut P.colptr[1..], &num_entries) {
        *Pckp1 = acc + ne;
        acc = *Pckp1;
    }
    num_entries.copy_from_slice(&P.colptr[0..n]);
    let mut row_starts = num_entries;

    // 3. place the permuted entries (columns end up unordered, which the
    // factorization tolerates)
    for colA in 0..n {
        let colP = iperm[colA];
        for kA in A.colptr[colA]..A.colptr[colA + 1] {
            let rowP = iperm[A.rowval[kA]];
            let col_idx = max(colP, rowP);
            let kP = row_starts[col_idx];
            P.rowval[kP] = min(colP, rowP);
            AtoPAPt[kA] = kP;
            row_starts[col_idx] += 1;
        }
    }
    (P, AtoPAPt)
}

// -------------------------------------
// numerical factorization
// -------------------------------------

enum FactorOutcome {
    Complete {
        positive: usize,
        negative: usize,
    },
    ZeroPivot {
        at: usize,
        positive: usize,
        negative: usize,
    },
}

const UNKNOWN: usize = usize::MAX;
const USED: bool = true;
const UNUSED: bool = false;

// Compute the elimination tree for a symmetric matrix in upper
// triangular compressed sparse column form.
fn _etree(
    n: usize,
    Ap: &[usize],
    Ai: &[usize],
    work: &mut [usize],
    Lnz: &mut [usize],
    etree: &mut [usize],
) {
    work[..n].fill(0);
    Lnz.fill(0);
    etree.fill(UNKNOWN);

    for j in 0..n {
        work[j] = j;
        for &istart in &Ai[Ap[j]..Ap[j + 1]] {
            let mut i = istart;
            while work[i] != j {
                if etree[i] == UNKNOWN {
                    etree[i] = j;
                }
                Lnz[i] += 1; // nonzeros in this column
                work[i] = j;
                i = etree[i];
            }
        }
    }
}

//allow too_many_arguments since this follows the classical up-looking
//LDL formulation with explicit workspaces.
#[allow(clippy::too_many_arguments)]
fn _factor<T: FloatT>(
    n: usize,
    Ap: &[usize],
    Ai: &[usize],
    Ax: &[T],
    Lp: &mut [usize],
    Li: &mut [usize],
    Lx: &mut [T],
    D: &mut [T],
    Dinv: &mut [T],
    Lnz: &[usize],
    etree: &[usize],
    bwork: &mut [bool],
    iwork: &mut [usize],
    fwork: &mut [T],
    zero_pivot_tolerance: T,
) -> FactorOutcome {
    let mut positive = 0;
    let mut negative = 0;

    // partition working memory into pieces
    let y_markers = bwork;
    let (y_idx, iwork) = iwork.split_at_mut(n);
    let (elim_buffer, next_colspace) = iwork.split_at_mut(n);
    let y_vals = fwork;

    //set Lp to cumsum(Lnz), starting from zero
    Lp[0] = 0;
    let mut acc = 0;
    for (Lp, Lnz) in zip(&mut Lp[1..], Lnz) {
        *Lp = acc + Lnz;
        acc = *Lp;
    }

    y_markers.fill(UNUSED);
    y_vals.fill(T::zero());
    D.fill(T::zero());
    next_colspace.copy_from_slice(&Lp[0..Lp.len() - 1]);

    for k in 0..n {
        // For each k, solve y = L(0:(k-1),0:(k-1)) \ b, where b is the
        // kth column of A above the diagonal.   y is then the kth row
        // of L, with an implied 1 at the diagonal.

        let mut nnz_y = 0;

        // locate the nonzeros of the kth row of L via the elimination
        // tree, without computing values yet
        for i in Ap[k]..Ap[k + 1] {
            let bidx = Ai[i];

            // the diagonal entry seeds D[k] and takes no part in the
            // elimination of the kth row
            if bidx == k {
                D[k] += Ax[i];
                continue;
            }

            y_vals[bidx] = Ax[i];

            let next_idx = bidx;
            if y_markers[next_idx] == UNUSED {
                y_markers[next_idx] = USED;
                elim_buffer[0] = next_idx;
                let mut nnz_e = 1;

                let mut next_idx = etree[bidx];
                while next_idx != UNKNOWN && next_idx < k {
                    if y_markers[next_idx] == USED {
                        break;
                    }
                    y_markers[next_idx] = USED;
                    elim_buffer[nnz_e] = next_idx;
                    next_idx = etree[next_idx];
                    nnz_e += 1;
                }

                // place the buffered elimination path into the current
                // ordering in reverse
                while nnz_e != 0 {
                    nnz_e -= 1;
                    y_idx[nnz_y] = elim_buffer[nnz_e];
                    nnz_y += 1;
                }
            }
        }

        // compute the values of the kth row of L
        for i in (0..nnz_y).rev() {
            let cidx = y_idx[i];
            let tmp_idx = next_colspace[cidx];
            let y_vals_cidx = y_vals[cidx];

            for j in Lp[cidx]..tmp_idx {
                y_vals[Li[j]] -= Lx[j] * y_vals_cidx;
            }

            Lx[tmp_idx] = y_vals_cidx * Dinv[cidx];
            D[k] -= y_vals_cidx * Lx[tmp_idx];

            Li[tmp_idx] = k;
            next_colspace[cidx] += 1;

            y_vals[cidx] = T::zero();
            y_markers[cidx] = UNUSED;
        }

        // a pivot at the zero tolerance means rank deficiency; stop and
        // report rather than patching the pivot
        if T::abs(D[k]) <= zero_pivot_tolerance {
            return FactorOutcome::ZeroPivot {
                at: k,
                positive,
                negative,
            };
        }
        if D[k] > T::zero() {
            positive += 1;
        } else {
            negative += 1;
        }
        Dinv[k] = T::recip(D[k]);
    }

    FactorOutcome::Complete { positive, negative }
}

// Solves (L+I)x = b, with x replacing b
fn _lsolve<T: FloatT>(Lp: &[usize], Li: &[usize], Lx: &[T], x: &mut [T]) {
    for i in 0..x.len() {
        let xi = x[i];
        let (f, l) = (Lp[i], Lp[i + 1]);
        for (&Lij, &Lxj) in zip(&Li[f..l], &Lx[f..l]) {
            x[Lij] -= Lxj * xi;
        }
    }
}

// Solves (L+I)'x = b, with x replacing b
fn _ltsolve<T: FloatT>(Lp: &[usize], Li: &[usize], Lx: &[T], x: &mut [T]) {
    for i in (0..x.len()).rev() {
        let mut s = T::zero();
        let (f, l) = (Lp[i], Lp[i + 1]);
        for (&Lij, &Lxj) in zip(&Li[f..l], &Lx[f..l]) {
            s += Lxj * x[Lij];
        }
        x[i] -= s;
    }
}

//configure tests of internals
#[path = "test.rs"]
#[cfg(test)]
mod test;
