use lamina_core::{Context, Error, IndMethod, Obj, OpFamily, Rntm, ScalarVal, Side};
use tracing::instrument;

use super::{execute, return_early_if_trivial, set_schemas, shape_ways};
use crate::{
    cntl::{KerFamily, gemm_cntl},
    driver::PassDown,
    engine::Engine,
};

impl Engine {
    /// In-place triangular matrix product: `B = alpha * tri(A) * B` (left side) or
    /// `B = alpha * B * tri(A)` (right side). Only the stored triangle of `A` is read; a unit
    /// diagonal is honored via `A`'s diagonal tag.
    #[instrument(skip_all, fields(m = b.length(), n = b.width(), side = ?side, dt = ?b.dt()))]
    pub fn trmm(
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
        // The product overwrites B, so the trivial cases scale it by zero.
        if return_early_if_trivial(alpha, a, b, ScalarVal::ZERO, b) {
            return Ok(());
        }
        self.trmm_common(
            side,
            alpha,
            a,
            b,
            ScalarVal::ZERO,
            b,
            cntx,
            rntm,
            self.config().force_left_trmm,
            true,
        )
    }

    /// Triangular matrix product with separate output:
    /// `C = alpha * tri(A) * B + beta * C` (and the right-side analogue).
    #[instrument(skip_all, fields(m = c.length(), n = c.width(), side = ?side, dt = ?c.dt()))]
    #[allow(clippy::too_many_arguments)]
    pub fn trmm3(
        &self,
        side: Side,
        alpha: ScalarVal,
        a: &Obj<'_>,
        b: &Obj<'_>,
        beta: ScalarVal,
        c: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
    ) -> Result<(), Error> {
        if self.config().error_checking {
            crate::check::trmm3(side, a, b, c)?;
        }
        if return_early_if_trivial(alpha, a, b, beta, c) {
            return Ok(());
        }
        self.trmm_common(
            side,
            alpha,
            a,
            b,
            beta,
            c,
            cntx,
            rntm,
            self.config().force_left_trmm3,
            false,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn trmm_common(
        &self,
        side: Side,
        alpha: ScalarVal,
        a: &Obj<'_>,
        b: &Obj<'_>,
        beta: ScalarVal,
        c: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
        force_left: bool,
        in_place: bool,
    ) -> Result<(), Error> {
        let rntm_l = rntm.copied().unwrap_or_else(|| self.default_rntm());

        let im = if a.dt() == c.dt() && b.dt() == c.dt() && c.is_complex() {
            self.find_induced_method(c.dt())
        } else {
            IndMethod::Native
        };
        let cntx = cntx.unwrap_or_else(|| self.context(im));

        let mut side_l = side;
        let mut a_l = a.alias();
        let mut b_l = b.alias();
        let mut c_l = c.alias();

        // The loop variants only implement the no-transpose triangular case: realize any
        // pending transposition of A in its view. The resulting upper/lower swap yields the
        // correct traversal direction on its own.
        a_l.induce_trans();

        if force_left {
            // Cast right-side execution in terms of the left side by transposing the whole
            // operation.
            if side_l == Side::Right {
                side_l = side_l.toggled();
                a_l.transpose_view();
                b_l.transpose_view();
                c_l.transpose_view();
            }
        } else {
            // Preferred path: execute the right side natively, which keeps the freedom to
            // transpose the operation into the micro-kernel's output orientation.
            if cntx.dislikes_storage_of(&c_l) {
                side_l = side_l.toggled();
                a_l.transpose_view();
                b_l.transpose_view();
                c_l.transpose_view();
            }
            if side_l == Side::Right {
                core::mem::swap(&mut a_l, &mut b_l);
            }
        }
        a_l.induce_trans();
        b_l.induce_trans();

        b_l.set_scalar(alpha);
        let pd = PassDown::new(ScalarVal::ONE, beta);

        let mut ways = shape_ways(
            &rntm_l,
            OpFamily::Trmm,
            side_l,
            c_l.length(),
            c_l.width(),
            true,
        );
        // When the product is in place and the triangular operand sits on the B side, the
        // A-side pack reads output columns outside any one JC slab, so the n dimension cannot
        // be split across groups; shift that parallelism onto the rows.
        if in_place && b_l.is_triangular() {
            ways.ic *= ways.jc;
            ways.jc = 1;
        }

        set_schemas(cntx, &mut a_l, &mut b_l);
        let cntl = gemm_cntl(cntx, KerFamily::Gemm, &a_l, &b_l, &c_l, a_l.schema(), b_l.schema());
        a_l.set_schema(lamina_core::PackSchema::NotPacked);
        b_l.set_schema(lamina_core::PackSchema::NotPacked);
        execute(self, cntx, ways, &cntl, &a_l, &b_l, &c_l, pd)
    }
}

/// [`Engine::trmm`] on the process-wide default engine.
pub fn trmm(side: Side, alpha: ScalarVal, a: &Obj<'_>, b: &Obj<'_>) -> Result<(), Error> {
    Engine::global().trmm(side, alpha, a, b, None, None)
}

/// [`Engine::trmm3`] on the process-wide default engine.
pub fn trmm3(
    side: Side,
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
) -> Result<(), Error> {
    Engine::global().trmm3(side, alpha, a, b, beta, c, None, None)
}
