use lamina_core::{
    Context, Error, Obj, OpFamily, PackSchema, Rntm, ScalarVal, Side, Ways,
};

use crate::{
    cntl::CntlNode,
    driver::{ExecEnv, PassDown},
    elemwise::scalm,
    engine::Engine,
    thread::decorate,
};

pub(crate) mod gemm;
pub(crate) mod gemmt;
pub(crate) mod hemm;
pub(crate) mod rank;
pub(crate) mod trmm;
pub(crate) mod trsm;

// SHARED DISPATCH STEPS
// ================================================================================================

/// Trivial-case short-circuit shared by every operation: returns `true` when the call is
/// complete without running the pipeline. A zero-extent C means nothing to do; a zero alpha or
/// an empty inner product reduces to scaling C by beta (masked to C's stored region).
pub(crate) fn return_early_if_trivial(
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
) -> bool {
    if c.has_zero_dim() {
        return true;
    }
    if alpha.is_zero() || a.has_zero_dim() || b.has_zero_dim() {
        scalm(beta, c);
        return true;
    }
    false
}

/// Assigns the pack schemas consistent with the context's induced method: row panels for the
/// A side, column panels for the B side, switching to the augmented layouts under 1m. The
/// schemas ride in the objects to the tree builder and are reset immediately after it reads
/// them, since unpacked objects must never carry a packed schema.
pub(crate) fn set_schemas(cntx: &Context, a: &mut Obj<'_>, b: &mut Obj<'_>) {
    let one_m = cntx.method() == lamina_core::IndMethod::OneM && a.target_dt().is_complex();
    let (sa, sb) = if one_m {
        (PackSchema::RowPanels1m, PackSchema::ColPanels1m)
    } else {
        (PackSchema::RowPanels, PackSchema::ColPanels)
    };
    a.set_schema(sa);
    b.set_schema(sb);
}

/// Derives the per-loop parallelism for this call. Operations with KC-aligned structure
/// requirements fold explicit KC ways back into JC; the solve additionally folds the
/// dependent loops into JR.
pub(crate) fn shape_ways(
    rntm: &Rntm,
    family: OpFamily,
    side: Side,
    m: usize,
    n: usize,
    structured: bool,
) -> Ways {
    let mut w = rntm.ways_for_op(family, side, m, n);
    if family == OpFamily::Trsm {
        w = Ways { jc: w.jc * w.pc, pc: 1, ic: 1, jr: w.jr * w.ic * w.ir, ir: 1 };
    } else if structured && w.pc > 1 {
        w.jc *= w.pc;
        w.pc = 1;
    }
    w
}

/// Seeds the thread decorator on a built control tree.
pub(crate) fn execute(
    engine: &Engine,
    cntx: &Context,
    ways: Ways,
    cntl: &CntlNode,
    a: &Obj<'_>,
    b: &Obj<'_>,
    c: &Obj<'_>,
    pd: PassDown,
) -> Result<(), Error> {
    let env = ExecEnv { cntx, broker: engine.broker() };
    decorate(&env, ways, cntl, a, b, c, pd)
}
