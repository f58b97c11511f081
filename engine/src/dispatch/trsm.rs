use lamina_core::{Context, Error, Obj, OpFamily, Rntm, ScalarVal, Side};
use tracing::instrument;

use super::{execute, return_early_if_trivial, shape_ways};
use crate::{cntl::trsm_cntl, driver::PassDown, engine::Engine};

impl Engine {
    /// Triangular solve with multiple right-hand sides: overwrites `B` with the solution `X` of
    /// `tri(A) * X = alpha * B` (left side) or `X * tri(A) = alpha * B` (right side).
    ///
    /// The packer pre-inverts the diagonal blocks when the engine is configured to, letting the
    /// micro-solver multiply instead of divide; a unit diagonal is honored via `A`'s tag.
    #[instrument(skip_all, fields(m = b.length(), n = b.width(), side = ?side, dt = ?b.dt()))]
    pub fn trsm(
        &self,
        side: Side,
        alpha: ScalarVal,
        a: &Obj<'_>,
        b: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
    ) -> Result<(), Error> {
        if self.config().error_checking {
            crate::check::trmm_trsm(side, a, b)?;
        }
        if return_early_if_trivial(alpha, a, b, ScalarVal::ZERO, b) {
            return Ok(());
        }

        let rntm_l = rntm.copied().unwrap_or_else(|| self.default_rntm());

        // The fused micro-solver exists only in the native domains; the solve never selects an
        // induced method.
        let cntx = cntx.unwrap_or_else(|| self.context(lamina_core::IndMethod::Native));

        let mut a_l = a.alias();
        let mut b_l = b.alias();
        let mut c_l = b.alias();

        // Only the no-transpose solve is implemented directly; a pending transposition on A is
        // realized in the view, and the upper/lower swap selects the matching traversal.
        a_l.induce_trans();

        // Right-side solves are cast to the left-side form by transposing the whole operation.
        if side == Side::Right {
            a_l.transpose_view();
            b_l.transpose_view();
            c_l.transpose_view();
        }
        b_l.induce_trans();

        // Alpha is applied to each row panel of B on first touch; nothing is folded into the
        // packs.
        let pd = PassDown::new(ScalarVal::ONE, alpha);

        let ways = shape_ways(
            &rntm_l,
            OpFamily::Trsm,
            Side::Left,
            c_l.length(),
            c_l.width(),
            true,
        );

        // The solve packs natively regardless of the context's induced method; the fused
        // micro-solver cannot consume augmented panels.
        a_l.set_schema(lamina_core::PackSchema::RowPanels);
        b_l.set_schema(lamina_core::PackSchema::ColPanels);
        let cntl = trsm_cntl(
            cntx,
            &a_l,
            &b_l,
            &c_l,
            a_l.schema(),
            b_l.schema(),
            self.config().trsm_pre_invert,
        );
        a_l.set_schema(lamina_core::PackSchema::NotPacked);
        b_l.set_schema(lamina_core::PackSchema::NotPacked);
        execute(self, cntx, ways, &cntl, &a_l, &b_l, &c_l, pd)
    }
}

/// [`Engine::trsm`] on the process-wide default engine.
pub fn trsm(side: Side, alpha: ScalarVal, a: &Obj<'_>, b: &Obj<'_>) -> Result<(), Error> {
    Engine::global().trsm(side, alpha, a, b, None, None)
}
