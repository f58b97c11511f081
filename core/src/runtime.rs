use crate::types::Side;

// OPERATION FAMILIES
// ================================================================================================

/// Coarse operation family, used to shape parallelism and adjust blocksizes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OpFamily {
    /// gemm, hemm, symm, trmm3 and everything else that runs the plain product tree.
    Gemm,
    /// Triangular-output product (gemmt and the rank-k/rank-2k updates built on it).
    Gemmt,
    /// In-place triangular product.
    Trmm,
    /// Triangular solve.
    Trsm,
}

// WAYS
// ================================================================================================

/// Parallelization factors for the five loops. Their product is the total number of workers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ways {
    pub jc: usize,
    pub pc: usize,
    pub ic: usize,
    pub jr: usize,
    pub ir: usize,
}

impl Ways {
    pub const SINGLE: Ways = Ways { jc: 1, pc: 1, ic: 1, jr: 1, ir: 1 };

    pub fn product(&self) -> usize {
        self.jc * self.pc * self.ic * self.jr * self.ir
    }
}

// RUNTIME
// ================================================================================================

/// Mutable per-call execution settings: how many workers to use and, optionally, exactly how to
/// spread them over the loops. When only a thread count is given, the factors are derived per
/// operation by [`Rntm::ways_for_op`].
#[derive(Copy, Clone, Debug)]
pub struct Rntm {
    num_threads: usize,
    explicit: Option<Ways>,
}

impl Default for Rntm {
    fn default() -> Self {
        Self { num_threads: 1, explicit: None }
    }
}

impl Rntm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_threads(nt: usize) -> Self {
        Self { num_threads: nt.max(1), explicit: None }
    }

    /// Pins the per-loop factors exactly. The product overrides the thread count.
    pub fn with_ways(ways: Ways) -> Self {
        Self { num_threads: ways.product().max(1), explicit: Some(ways) }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Distributes the requested threads over the loops for one operation.
    ///
    /// Explicit factors are honored as given. Otherwise the thread count is factored over
    /// JC x IC in proportion to the output aspect ratio (n : m); the register loops and the
    /// KC loop stay serial. Operations with a sequential dependency across IC blocks (trsm)
    /// fold the IC share into JR instead, since only the n dimension partitions freely.
    pub fn ways_for_op(&self, family: OpFamily, _side: Side, m: usize, n: usize) -> Ways {
        if let Some(ways) = self.explicit {
            return ways;
        }
        let nt = self.num_threads;
        if nt <= 1 {
            return Ways::SINGLE;
        }
        let (ic, jc) = factor_by_aspect(nt, m.max(1), n.max(1));
        match family {
            OpFamily::Trsm => Ways { jc, pc: 1, ic: 1, jr: ic, ir: 1 },
            _ => Ways { jc, pc: 1, ic, jr: 1, ir: 1 },
        }
    }
}

/// Factors `nt = a * b` so that `m / a : n / b` stays as close to square as possible. Returns
/// `(a, b)` with `a` partitioning the m dimension.
fn factor_by_aspect(nt: usize, m: usize, n: usize) -> (usize, usize) {
    let mut best = (1, nt);
    let mut best_cost = f64::INFINITY;
    for a in 1..=nt {
        if nt % a != 0 {
            continue;
        }
        let b = nt / a;
        let pm = m as f64 / a as f64;
        let pn = n as f64 / b as f64;
        let cost = if pm > pn { pm / pn } else { pn / pm };
        if cost < best_cost {
            best_cost = cost;
            best = (a, b);
        }
    }
    best
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_thread_shapes_to_unity() {
        let rntm = Rntm::new();
        assert_eq!(rntm.ways_for_op(OpFamily::Gemm, Side::Left, 1000, 1000), Ways::SINGLE);
    }

    #[test]
    fn aspect_biased_factorization() {
        let rntm = Rntm::with_num_threads(4);
        let w = rntm.ways_for_op(OpFamily::Gemm, Side::Left, 4000, 250);
        assert_eq!((w.ic, w.jc), (4, 1));
        let w = rntm.ways_for_op(OpFamily::Gemm, Side::Left, 1000, 1000);
        assert_eq!((w.ic, w.jc), (2, 2));
        assert_eq!(w.product(), 4);
    }

    #[test]
    fn trsm_avoids_ic_parallelism() {
        let rntm = Rntm::with_num_threads(8);
        let w = rntm.ways_for_op(OpFamily::Trsm, Side::Left, 2000, 2000);
        assert_eq!(w.ic, 1);
        assert_eq!(w.pc, 1);
        assert_eq!(w.product(), 8);
    }

    #[test]
    fn explicit_ways_pass_through() {
        let rntm = Rntm::with_ways(Ways { jc: 2, pc: 1, ic: 3, jr: 1, ir: 1 });
        assert_eq!(rntm.num_threads(), 6);
        let w = rntm.ways_for_op(OpFamily::Gemmt, Side::Left, 64, 64);
        assert_eq!((w.jc, w.ic), (2, 3));
    }
}
