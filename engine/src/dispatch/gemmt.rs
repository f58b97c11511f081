use lamina_core::{Context, Error, IndMethod, Obj, OpFamily, Rntm, ScalarVal, Side, Struc};
use tracing::instrument;

use super::{execute, return_early_if_trivial, set_schemas, shape_ways};
use crate::{
    cntl::{KerFamily, gemm_cntl},
    driver::PassDown,
    engine::Engine,
};

impl Engine {
    /// Triangular-output product: `C = alpha * A * B + beta * C`, updating only the triangle of
    /// `C` selected by its uplo tag. The other triangle is left bit-identical.
    #[instrument(skip_all, fields(m = c.length(), dt = ?c.dt(), uplo = ?c.uplo()))]
    pub fn gemmt(
        &self,
        alpha: ScalarVal,
        a: &Obj<'_>,
        b: &Obj<'_>,
        beta: ScalarVal,
        c: &Obj<'_>,
        cntx: Option<&Context>,
        rntm: Option<&Rntm>,
    ) -> Result<(), Error> {
        if self.config().error_checking {
            crate::check::gemmt(a, b, c)?;
        }
        // The trivial-case scaling must respect the stored triangle.
        let mut c_l = c.alias();
        c_l.set_struc(Struc::Triangular);
        if return_early_if_trivial(alpha, a, b, beta, &c_l) {
            return Ok(());
        }

        let rntm_l = rntm.copied().unwrap_or_else(|| self.default_rntm());

        // Unlike gemm, the 1m method is considered only for uniform storage datatypes.
        let im = if a.dt() == c.dt() && b.dt() == c.dt() && c.is_complex() {
            self.find_induced_method(c.dt())
        } else {
            IndMethod::Native
        };
        let cntx = cntx.unwrap_or_else(|| self.context(im));

        let mut a_l = a.alias();
        let mut b_l = b.alias();

        if cntx.dislikes_storage_of(&c_l) {
            core::mem::swap(&mut a_l, &mut b_l);
            a_l.transpose_view();
            b_l.transpose_view();
            c_l.transpose_view();
        }
        a_l.induce_trans();
        b_l.induce_trans();

        b_l.set_scalar(alpha);
        let pd = PassDown::new(ScalarVal::ONE, beta);

        let ways = shape_ways(
            &rntm_l,
            OpFamily::Gemmt,
            Side::Left,
            c_l.length(),
            c_l.width(),
            true,
        );

        set_schemas(cntx, &mut a_l, &mut b_l);
        let cntl =
            gemm_cntl(cntx, KerFamily::Gemmt, &a_l, &b_l, &c_l, a_l.schema(), b_l.schema());
        a_l.set_schema(lamina_core::PackSchema::NotPacked);
        b_l.set_schema(lamina_core::PackSchema::NotPacked);
        execute(self, cntx, ways, &cntl, &a_l, &b_l, &c_l, pd)
    }
}

/// [`Engine::gemmt`] on the process-wide default engine.
pub fn gemmt(
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
) -> Result<(), Error> {
    Engine::global().gemmt(alpha, a, b, beta, c, None, None)
}
