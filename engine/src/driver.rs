use lamina_core::{Context, Dir, Error, Obj, ScalarVal, Struc, Uplo};
use smallvec::SmallVec;

use crate::{
    broker::{Broker, BufClass},
    cntl::{CntlNode, KerFamily, PackCntl, PartCntl},
    macrokernel::{gemm_ker, trsm_ker},
    packm::packm_var,
    thread::{L_IC, L_JR, ThrInfo, thread_range, thread_range_weighted},
};

// EXECUTION ENVIRONMENT
// ================================================================================================

/// Read-only references every worker carries through the tree walk.
pub(crate) struct ExecEnv<'e> {
    pub cntx: &'e Context,
    pub broker: &'e Broker,
}

// ITERATION POLICY
// ================================================================================================

/// Half-open index band. Tile membership is decided by the tile's start index; partition
/// boundaries are register-blocksize aligned, so tiles never straddle a band edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Band {
    pub start: usize,
    pub end: usize,
}

impl Band {
    pub const FULL: Band = Band { start: 0, end: usize::MAX };
    pub const EMPTY: Band = Band { start: 0, end: 0 };

    pub fn contains(&self, i: usize) -> bool {
        self.start <= i && i < self.end
    }

    /// The band seen from a sub-view starting at `off`.
    pub fn rebase(&self, off: usize) -> Band {
        Band {
            start: self.start.saturating_sub(off),
            end: if self.end == usize::MAX { usize::MAX } else { self.end.saturating_sub(off) },
        }
    }
}

/// Per-iteration scalars and regions handed down the tree.
///
/// The KC loop rewrites this every iteration: `beta` is applied to tiles inside both bands
/// (the first-touch region), 1 elsewhere; tiles outside an active range are not touched at
/// all (the triangular operand is structurally zero there).
#[derive(Clone, Debug)]
pub(crate) struct PassDown {
    /// Scalar multiplying the `A * B` product at the leaf.
    pub alpha: ScalarVal,
    /// First-touch scalar for C (the caller's beta, or alpha for trsm).
    pub beta: ScalarVal,
    pub row_active: Band,
    pub row_band: Band,
    pub col_active: Band,
    pub col_band: Band,
    /// Whether packed trsm diagonal blocks hold pre-inverted diagonals.
    pub inv_diag: bool,
}

impl PassDown {
    pub fn new(alpha: ScalarVal, beta: ScalarVal) -> Self {
        Self {
            alpha,
            beta,
            row_active: Band::FULL,
            row_band: Band::FULL,
            col_active: Band::FULL,
            col_band: Band::FULL,
            inv_diag: false,
        }
    }
}

// PARTITION HELPERS
// ================================================================================================

/// Forward block boundaries over `[lo, hi)`: default-sized blocks, with a final block extended
/// up to the maximum blocksize when the remainder fits.
fn blocks_fwd(lo: usize, hi: usize, alg: usize, max: usize) -> SmallVec<[(usize, usize); 8]> {
    let mut out = SmallVec::new();
    let mut i = lo;
    while i < hi {
        let b = if hi - i <= max { hi - i } else { alg };
        out.push((i, b));
        i += b;
    }
    out
}

fn blocks_dir(lo: usize, hi: usize, part: &PartCntl) -> SmallVec<[(usize, usize); 8]> {
    let mut v = blocks_fwd(lo, hi, part.bsz.def, part.bsz.max);
    if part.dir == Dir::Bwd {
        v.reverse();
    }
    v
}

fn sub_rows<'a>(o: &Obj<'a>, i: usize, m: usize) -> Obj<'a> {
    let mut s = o.alias();
    s.shift_to(i, 0, m, o.width());
    s
}

fn sub_cols<'a>(o: &Obj<'a>, j: usize, n: usize) -> Obj<'a> {
    let mut s = o.alias();
    s.shift_to(0, j, o.length(), n);
    s
}

// INTERNAL DRIVER
// ================================================================================================

/// Recursively executes one control-tree node on this worker's share of the problem.
pub(crate) fn l3_int(
    node: &CntlNode,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    pd: &PassDown,
    env: &ExecEnv<'_>,
    thr: &mut ThrInfo,
) -> Result<(), Error> {
    match node {
        CntlNode::PartJc { part, child } => {
            let n = c.width();
            let (lo, hi) = if part.weighted && c.struc() != Struc::General {
                thread_range_weighted(n, part.mult, thr.way(0), thr.id(0), c.uplo() == Uplo::Upper)
            } else {
                thread_range(n, part.mult, thr.way(0), thr.id(0))
            };
            for (j, bn) in blocks_dir(lo, hi, part) {
                let b_j = sub_cols(b, j, bn);
                let c_j = sub_cols(c, j, bn);
                l3_int(child, a, &b_j, &c_j, pd, env, thr)?;
            }
            Ok(())
        },

        CntlNode::PartPc { part, trsm, child } => {
            let k = a.width();
            // Structured operands and the solve need KC boundaries aligned from zero, which a
            // thread subrange would break; dispatch keeps PC serial for those.
            debug_assert!(
                thr.way(1) == 1 || (!a.is_triangular() && !b.is_triangular() && !*trsm)
            );
            let (lo, hi) = thread_range(k, 1, thr.way(1), thr.id(1));
            let mut first = true;
            for (p, bk) in blocks_dir(lo, hi, part) {
                let a_p = sub_cols(a, p, bk);
                let b_p = sub_rows(b, p, bk);
                let mut pdi = pd.clone();
                pc_iteration_policy(&mut pdi, a, b, c, p, bk, first, *trsm);
                l3_int(child, &a_p, &b_p, c, &pdi, env, thr)?;
                first = false;
            }
            Ok(())
        },

        CntlNode::PackB { pack, child } => {
            let packed = pack_shared(pack, b, false, BufClass::BPanel, L_IC, env, thr)?;
            l3_int(child, a, &packed, c, pd, env, thr)
        },

        CntlNode::PartIc { part, child } => {
            let m = c.length();
            let (lo, hi) = if part.weighted && c.struc() != Struc::General {
                thread_range_weighted(m, part.mult, thr.way(2), thr.id(2), c.uplo() == Uplo::Lower)
            } else {
                thread_range(m, part.mult, thr.way(2), thr.id(2))
            };
            for (i, bm) in blocks_dir(lo, hi, part) {
                let a_i = sub_rows(a, i, bm);
                let c_i = sub_rows(c, i, bm);
                let mut pdi = pd.clone();
                pdi.row_active = pd.row_active.rebase(i);
                pdi.row_band = pd.row_band.rebase(i);
                l3_int(child, &a_i, b, &c_i, &pdi, env, thr)?;
            }
            Ok(())
        },

        CntlNode::PackA { pack, child } => {
            let packed = pack_shared(pack, a, true, BufClass::ABlock, L_JR, env, thr)?;
            l3_int(child, &packed, b, c, pd, env, thr)
        },

        CntlNode::Ker { family, jr, ir: _ } => {
            match family {
                KerFamily::Trsm => {
                    trsm_ker(a.uplo(), a, b, c, pd.beta, pd.inv_diag, env.cntx, thr);
                },
                _ => {
                    gemm_ker(*family, a, b, c, pd.alpha, pd, jr.weighted, env.cntx, thr);
                },
            }
            Ok(())
        },

        CntlNode::TrsmIc { part, gemm, trsm } => trsm_ic(part, gemm, trsm, a, b, c, pd, env, thr),
    }
}

/// Computes the active/first-touch bands for one KC iteration covering `[p, p + bk)`.
///
/// A triangular A restricts and bands the rows of C; a triangular B restricts and bands its
/// columns; otherwise the whole output is banded exactly once (this thread's first iteration).
/// The trsm schedule uses the uniform first-touch rule: its zero regions are expressed by the
/// gemm/trsm branch split, not by bands.
fn pc_iteration_policy(
    pd: &mut PassDown,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    p: usize,
    bk: usize,
    first: bool,
    trsm: bool,
) {
    if trsm {
        if !first {
            pd.beta = ScalarVal::ONE;
        }
        return;
    }
    if a.is_triangular() {
        let m = c.length();
        let d = a.diag_off();
        let band_lo = (p as isize + d).clamp(0, m as isize) as usize;
        let band_hi = ((p + bk) as isize + d).clamp(0, m as isize) as usize;
        match a.uplo() {
            Uplo::Lower => {
                pd.row_active = Band { start: band_lo, end: m };
            },
            Uplo::Upper => {
                pd.row_active = Band { start: 0, end: band_hi };
            },
        }
        pd.row_band = Band { start: band_lo, end: band_hi };
    } else if b.is_triangular() {
        let n = c.width();
        let d = b.diag_off();
        let band_lo = (p as isize + d).clamp(0, n as isize) as usize;
        let band_hi = ((p + bk) as isize + d).clamp(0, n as isize) as usize;
        match b.uplo() {
            Uplo::Lower => {
                pd.col_active = Band { start: 0, end: band_hi };
            },
            Uplo::Upper => {
                pd.col_active = Band { start: band_lo, end: n };
            },
        }
        pd.col_band = Band { start: band_lo, end: band_hi };
    } else {
        pd.row_band = if first { Band::FULL } else { Band::EMPTY };
        pd.col_band = Band::FULL;
    }
}

/// Runs one packing node: the group chief claims the arena block once per call, the pointer is
/// broadcast, and the group packs panels cooperatively between two barriers.
fn pack_shared(
    pack: &PackCntl,
    src: &Obj<'_>,
    a_side: bool,
    class: BufClass,
    level: usize,
    env: &ExecEnv<'_>,
    thr: &mut ThrInfo,
) -> Result<Obj<'static>, Error> {
    let is_chief = thr.is_chief(level);
    let cached = thr.block_cache[class as usize];
    let my_ptr = if is_chief {
        match cached {
            Some(p) => p,
            None => match env.broker.acquire(class) {
                Ok(mut blk) => {
                    let p = blk.ptr();
                    thr.held.push(blk);
                    p
                },
                Err(_) => core::ptr::null_mut(),
            },
        }
    } else {
        core::ptr::null_mut()
    };
    // The broadcast's leading barrier also guarantees every consumer of the previous contents
    // has arrived before the buffer is overwritten.
    let ptr = thr.comm(level).broadcast(is_chief, my_ptr);
    if ptr.is_null() {
        return Err(Error::ResourceExhausted);
    }
    if is_chief {
        thr.block_cache[class as usize] = Some(ptr);
    }
    let rank = thr.rank_in(level);
    let packed = packm_var(pack, src, a_side, ptr, env.cntx, thr.comm(level), rank)?;
    thr.comm(level).barrier();
    Ok(packed)
}

// TRSM M-LOOP
// ================================================================================================

/// The trsm partition over m: diagonal-intersecting blocks run the trsm branch in dependency
/// order with the whole group cooperating, then the rectangular remainder runs the gemm branch
/// with the update sign folded in.
#[allow(clippy::too_many_arguments)]
fn trsm_ic(
    part: &PartCntl,
    gemm_branch: &CntlNode,
    trsm_branch: &CntlNode,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    pd: &PassDown,
    env: &ExecEnv<'_>,
    thr: &mut ThrInfo,
) -> Result<(), Error> {
    let m = c.length();
    let len = a.width();
    let d = a.diag_off();
    debug_assert!(d <= 0);
    let rd0 = (-d) as usize;
    let rd1 = (rd0 + len).min(m);

    let inv_diag = match trsm_branch {
        CntlNode::PackA { pack, .. } => pack.invert_diag,
        _ => false,
    };

    // Diagonal region: sequential blocks, everyone cooperates, barrier between blocks so the
    // solved rows in the packed B panel are visible before they are consumed.
    for (i, bm) in blocks_dir(rd0, rd1, part) {
        let a_blk = sub_rows(a, i, bm);
        let c_blk = sub_rows(c, i, bm);
        let mut pdi = pd.clone();
        pdi.inv_diag = inv_diag;
        l3_int(trsm_branch, &a_blk, b, &c_blk, &pdi, env, thr)?;
        thr.comm(L_IC).barrier();
    }

    // Rectangular remainder: rows below the diagonal region for a lower solve, above it for an
    // upper solve.
    let (g0, g1) = if a.is_lower() { (rd1, m) } else { (0, rd0) };
    if g0 < g1 {
        let (lo, hi) = thread_range(g1 - g0, part.mult, thr.way(2), thr.id(2));
        for (i, bm) in blocks_dir(g0 + lo, g0 + hi, part) {
            let a_blk = sub_rows(a, i, bm);
            let c_blk = sub_rows(c, i, bm);
            let mut pdi = pd.clone();
            pdi.alpha = ScalarVal::MINUS_ONE;
            l3_int(gemm_branch, &a_blk, b, &c_blk, &pdi, env, thr)?;
        }
    }
    Ok(())
}

// TESTS
// ================================================================================================
