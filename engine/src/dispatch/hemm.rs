use lamina_core::{Context, Error, IndMethod, Obj, OpFamily, Rntm, ScalarVal, Side};
use tracing::instrument;

use super::{execute, return_early_if_trivial, set_schemas, shape_ways};
use crate::{
    cntl::{KerFamily, gemm_cntl},
    driver::PassDown,
    engine::Engine,
};

impl Engine {
    /// Hermitian matrix product: `C = alpha * A * B + beta * C` with Hermitian `A` applied from
    /// `side`. Only the triangle of `A` selected by its uplo tag is read; the packer supplies
    /// the conjugated mirror.
    #[instrument(skip_all, fields(m = c.length(), n = c.width(), side = ?side, dt = ?c.dt()))]
    pub fn hemm(
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
        self.hemm_symm(side, alpha, a, b, beta, c, cntx, rntm, true)
    }

    /// Symmetric matrix product: `C = alpha * A * B + beta * C` with symmetric `A` applied
    /// from `side`.
    #[instrument(skip_all, fields(m = c.length(), n = c.width(), side = ?side, dt = ?c.dt()))]
    pub fn symm(
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
        self.hemm_symm(side, alpha, a, b, beta, c, cntx, rntm, false)
    }

    #[allow(clippy::too_many_arguments)]
    fn hemm_symm(
        &self,
        side: Side,
        alpha: ScalarVal,
        a: &Obj<'_>,
        b: &Obj<'_>,
        beta: ScalarVal,
        c: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
        hermitian: bool,
    ) -> Result<(), Error> {
        if self.config().error_checking {
            crate::check::hemm_symm(side, a, b, c, hermitian)?;
        }
        if return_early_if_trivial(alpha, a, b, beta, c) {
            return Ok(());
        }

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

        let force_left =
            if hermitian { self.config().force_left_hemm } else { self.config().force_left_symm };

        if force_left {
            // Cast a right-side operation in terms of the left side by transposing the whole
            // operation; needed when the micro-kernel assumes pre-broadcast B packing, which
            // the structured packer does not provide. The transposed view of a Hermitian
            // operand with its triangle flipped already denotes conj(A) = A^T, so no explicit
            // conjugation is required.
            if side_l == Side::Right {
                side_l = side_l.toggled();
                a_l.transpose_view();
                b_l.transpose_view();
                c_l.transpose_view();
            }
        } else {
            // Preferred path: keep the structured matrix on its side natively and use the
            // orientation freedom on the general operands.
            if cntx.dislikes_storage_of(&c_l) {
                side_l = side_l.toggled();
                if hermitian {
                    a_l.toggle_conj();
                }
                b_l.transpose_view();
                c_l.transpose_view();
            }
            // If the structured matrix multiplies from the right, swap the operands so it is
            // packed as the B-side panel.
            if side_l == Side::Right {
                core::mem::swap(&mut a_l, &mut b_l);
            }
        }
        a_l.induce_trans();
        b_l.induce_trans();

        b_l.set_scalar(alpha);
        let pd = PassDown::new(ScalarVal::ONE, beta);

        let ways = shape_ways(
            &rntm_l,
            OpFamily::Gemm,
            side_l,
            c_l.length(),
            c_l.width(),
            false,
        );

        set_schemas(cntx, &mut a_l, &mut b_l);
        let cntl = gemm_cntl(cntx, KerFamily::Gemm, &a_l, &b_l, &c_l, a_l.schema(), b_l.schema());
        a_l.set_schema(lamina_core::PackSchema::NotPacked);
        b_l.set_schema(lamina_core::PackSchema::NotPacked);
        execute(self, cntx, ways, &cntl, &a_l, &b_l, &c_l, pd)
    }
}

/// [`Engine::hemm`] on the process-wide default engine.
pub fn hemm(
    side: Side,
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
) -> Result<(), Error> {
    Engine::global().hemm(side, alpha, a, b, beta, c, None, None)
}

/// [`Engine::symm`] on the process-wide default engine.
pub fn symm(
    side: Side,
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
) -> Result<(), Error> {
    Engine::global().symm(side, alpha, a, b, beta, c, None, None)
}
