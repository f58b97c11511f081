use std::{
    cell::UnsafeCell,
    sync::{
        Arc, Barrier,
        atomic::{AtomicPtr, Ordering},
    },
};

use lamina_core::{Error, Obj, Scalar, ScalarVal, Struc, Uplo, Ways, dispatch_dt};
use tracing::debug;

use crate::{
    broker::PackBlock,
    cntl::CntlNode,
    driver::{ExecEnv, PassDown, l3_int},
};

// LOOP LEVELS
// ================================================================================================

pub(crate) const L_JC: usize = 0;
pub(crate) const L_PC: usize = 1;
pub(crate) const L_IC: usize = 2;
pub(crate) const L_JR: usize = 3;
pub(crate) const L_IR: usize = 4;

// COMMUNICATORS
// ================================================================================================

/// Barrier-plus-broadcast channel for one thread group.
pub(crate) struct ThrComm {
    nt: usize,
    barrier: Barrier,
    slot: AtomicPtr<u8>,
}

impl ThrComm {
    fn new(nt: usize) -> Self {
        Self { nt, barrier: Barrier::new(nt), slot: AtomicPtr::new(core::ptr::null_mut()) }
    }

    pub fn num_threads(&self) -> usize {
        self.nt
    }

    pub fn barrier(&self) {
        if self.nt > 1 {
            self.barrier.wait();
        }
    }

    /// The chief publishes `ptr`; every member returns it. Two barriers bracket the exchange so
    /// the slot can be reused immediately afterwards.
    pub fn broadcast(&self, is_chief: bool, ptr: *mut u8) -> *mut u8 {
        if self.nt == 1 {
            return ptr;
        }
        if is_chief {
            self.slot.store(ptr, Ordering::Release);
        }
        self.barrier();
        let p = self.slot.load(Ordering::Acquire);
        self.barrier();
        p
    }
}

/// Communicators for every thread group at every loop level.
///
/// `levels[l]` holds one communicator per group of threads that still execute together once
/// the loops above level `l` have been split: `levels[0]` is the whole team, `levels[2]` the
/// groups sharing a (jc, pc) coordinate (the packed-B sharers), `levels[3]` the packed-A
/// sharers, and so on.
pub(crate) struct CommSet {
    ways: Ways,
    levels: [Vec<Arc<ThrComm>>; 5],
}

impl CommSet {
    pub fn new(ways: Ways) -> Self {
        let w = [ways.jc, ways.pc, ways.ic, ways.jr, ways.ir];
        let nt = ways.product();
        let mut levels: [Vec<Arc<ThrComm>>; 5] = Default::default();
        let mut groups = 1usize;
        let mut group_size = nt;
        for l in 0..5 {
            levels[l] = (0..groups).map(|_| Arc::new(ThrComm::new(group_size))).collect();
            groups *= w[l];
            group_size /= w[l];
        }
        Self { ways, levels }
    }
}

/// One worker's coordinates: its id within every loop level plus the communicators of the
/// groups it belongs to. `comms[l]` spans the threads this worker shares level-`l` work with.
pub(crate) struct ThrInfo {
    pub tid: usize,
    pub ids: [usize; 5],
    pub ways: [usize; 5],
    comms: [Arc<ThrComm>; 5],
    /// Arena blocks this worker checked out as a group chief, returned after the walk.
    pub held: Vec<PackBlock>,
    /// Cached block pointers per buffer class, so each group acquires at most once per call.
    pub block_cache: [Option<*mut u8>; 2],
}

impl ThrInfo {
    pub fn new(tid: usize, comms: &CommSet) -> Self {
        let w = [comms.ways.jc, comms.ways.pc, comms.ways.ic, comms.ways.jr, comms.ways.ir];
        let mut ids = [0usize; 5];
        let mut rem = tid;
        for l in (0..5).rev() {
            ids[l] = rem % w[l];
            rem /= w[l];
        }
        let mut group = [0usize; 5];
        let mut acc = 0usize;
        for l in 0..5 {
            group[l] = acc;
            acc = acc * w[l] + ids[l];
        }
        let comm_refs = core::array::from_fn(|l| Arc::clone(&comms.levels[l][group[l]]));
        Self { tid, ids, ways: w, comms: comm_refs, held: Vec::new(), block_cache: [None; 2] }
    }

    pub fn way(&self, l: usize) -> usize {
        self.ways[l]
    }

    pub fn id(&self, l: usize) -> usize {
        self.ids[l]
    }

    /// Communicator of the group sharing work at level `l` (all ids above `l` equal).
    pub fn comm(&self, l: usize) -> &ThrComm {
        &self.comms[l]
    }

    /// True when this worker is the chief of the level-`l` group.
    pub fn is_chief(&self, l: usize) -> bool {
        self.ids[l..].iter().all(|&id| id == 0)
    }

    /// This worker's rank within the level-`l` group.
    pub fn rank_in(&self, l: usize) -> usize {
        let mut r = 0usize;
        for i in l..5 {
            r = r * self.ways[i] + self.ids[i];
        }
        r
    }
}

// WORK RANGES
// ================================================================================================

/// Block-aligned `[start, end)` subrange of `n` units for worker `id` of `nway`, with block
/// boundaries kept on multiples of `mult`.
pub(crate) fn thread_range(n: usize, mult: usize, nway: usize, id: usize) -> (usize, usize) {
    if nway <= 1 {
        return (0, n);
    }
    let blocks = n.div_ceil(mult);
    let base = blocks / nway;
    let rem = blocks % nway;
    let start_block = id * base + id.min(rem);
    let end_block = start_block + base + usize::from(id < rem);
    ((start_block * mult).min(n), (end_block * mult).min(n))
}

/// Workload-weighted variant for triangular output regions: boundaries are placed so every
/// worker receives roughly the same number of flops rather than the same number of columns.
/// `increasing` selects whether the per-unit cost grows with the index (the stored triangle
/// widens) or shrinks.
pub(crate) fn thread_range_weighted(
    n: usize,
    mult: usize,
    nway: usize,
    id: usize,
    increasing: bool,
) -> (usize, usize) {
    if nway <= 1 {
        return (0, n);
    }
    let bound = |share: f64| -> usize {
        let x = if increasing {
            n as f64 * share.sqrt()
        } else {
            n as f64 * (1.0 - (1.0 - share).sqrt())
        };
        let aligned = ((x / mult as f64).round() as usize) * mult;
        aligned.min(n)
    };
    let mut lo = bound(id as f64 / nway as f64);
    let mut hi =
        if id + 1 == nway { n } else { bound((id + 1) as f64 / nway as f64) };
    if hi < lo {
        hi = lo;
    }
    if id == 0 {
        lo = 0;
    }
    (lo, hi)
}

// THREAD DECORATOR
// ================================================================================================

struct TempC {
    mem: UnsafeCell<Vec<u64>>,
}

// Workers index disjoint temp buffers; the decorator only reads them after the scope joins.
unsafe impl Sync for TempC {}

/// Fans `ways.product()` workers out over the control tree and joins them.
///
/// Every worker executes the same tree walk, branching only on its per-loop ids. When the KC
/// loop is parallelized, non-chief KC siblings redirect their output into thread-private
/// buffers (with beta staged to zero) and the decorator combines the partial products into `C`
/// after the join, masked to `C`'s stored region.
pub(crate) fn decorate(
    env: &ExecEnv<'_>,
    ways: Ways,
    root: &CntlNode,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    pd: PassDown,
) -> Result<(), Error> {
    let nt = ways.product();
    let comms = CommSet::new(ways);

    if nt == 1 {
        let mut thr = ThrInfo::new(0, &comms);
        let result = l3_int(root, a, b, c, &pd, env, &mut thr);
        for blk in thr.held.drain(..) {
            env.broker.release(blk);
        }
        return result;
    }

    debug!(nt, jc = ways.jc, pc = ways.pc, ic = ways.ic, jr = ways.jr, ir = ways.ir, "forking workers");

    let m = c.length();
    let n = c.width();
    let es = c.dt().elem_size();
    let n_temps = if ways.pc > 1 { ways.jc * (ways.pc - 1) } else { 0 };
    let temps: Vec<TempC> = (0..n_temps)
        .map(|_| TempC { mem: UnsafeCell::new(vec![0u64; (m * n * es).div_ceil(8)]) })
        .collect();

    let run_worker = |tid: usize| -> Result<(), Error> {
        let mut thr = ThrInfo::new(tid, &comms);
        let mut pd_local = pd.clone();
        let mut c_local = c.alias();
        if ways.pc > 1 && thr.id(L_PC) > 0 {
            let slot = thr.id(L_JC) * (ways.pc - 1) + thr.id(L_PC) - 1;
            let buf = unsafe { (*temps[slot].mem.get()).as_mut_ptr() as *mut u8 };
            let mut t = unsafe { Obj::from_raw_parts(c.dt(), m, n, 1, m as isize, buf) };
            t.set_struc(c.struc());
            t.set_uplo(c.uplo());
            t.set_diag_off(c.diag_off());
            c_local = t;
            pd_local.beta = ScalarVal::ZERO;
        }
        let result = l3_int(root, a, b, &c_local, &pd_local, env, &mut thr);
        for blk in thr.held.drain(..) {
            env.broker.release(blk);
        }
        result
    };

    let mut result = Ok(());
    std::thread::scope(|scope| {
        let rw = &run_worker;
        let handles: Vec<_> = (1..nt).map(|tid| scope.spawn(move || rw(tid))).collect();
        let r0 = rw(0);
        let mut first_err = r0.err();
        for h in handles {
            match h.join() {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    first_err.get_or_insert(e);
                },
                Err(_) => {
                    first_err
                        .get_or_insert(Error::InvalidArgument("worker panicked".into()));
                },
            }
        }
        if let Some(e) = first_err {
            result = Err(e);
        }
    });
    result?;

    if ways.pc > 1 {
        accumulate_partials(c, &temps, ways, root);
    }
    Ok(())
}

/// Adds the non-chief KC siblings' partial products into `C`, column slab by column slab,
/// touching only the stored region of a structured `C`.
fn accumulate_partials(c: &Obj<'_>, temps: &[TempC], ways: Ways, root: &CntlNode) {
    let (jc_mult, jc_weighted) = match root {
        CntlNode::PartJc { part, .. } => (part.mult, part.weighted),
        _ => (1, false),
    };
    let m = c.length();
    let n = c.width();
    for jc_id in 0..ways.jc {
        let (lo, hi) = if jc_weighted && c.struc() != Struc::General {
            thread_range_weighted(n, jc_mult, ways.jc, jc_id, c.uplo() == Uplo::Upper)
        } else {
            thread_range(n, jc_mult, ways.jc, jc_id)
        };
        for pc_rank in 0..ways.pc - 1 {
            let slot = jc_id * (ways.pc - 1) + pc_rank;
            let buf = unsafe { (*temps[slot].mem.get()).as_ptr() as *const u8 };
            dispatch_dt!(c.dt(), T => unsafe {
                add_slab::<T>(c, buf as *const T, m, lo, hi);
            });
        }
    }
}

unsafe fn add_slab<T: Scalar>(c: &Obj<'_>, t: *const T, m: usize, lo: usize, hi: usize) {
    debug_assert_eq!(c.dt(), T::DTYPE);
    let masked = c.struc() != Struc::General;
    for j in lo..hi {
        for i in 0..m {
            if masked {
                let on_stored = match c.uplo() {
                    Uplo::Lower => (j as isize - i as isize) <= c.diag_off(),
                    Uplo::Upper => (j as isize - i as isize) >= c.diag_off(),
                };
                if !on_stored {
                    continue;
                }
            }
            unsafe {
                let p = c.ptr_at::<T>(i, j);
                *p = *p + *t.add(i + j * m);
            }
        }
    }
}

// TESTS
// ================================================================================================
