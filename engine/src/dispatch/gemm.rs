use lamina_core::{Context, Error, IndMethod, Obj, OpFamily, Rntm, ScalarVal, Side};
use tracing::instrument;

use super::{execute, return_early_if_trivial, set_schemas, shape_ways};
use crate::{
    cntl::{KerFamily, gemm_cntl},
    driver::PassDown,
    elemwise::xpbym,
    engine::Engine,
    md::gemm_md,
    sup::gemmsup,
};

impl Engine {
    /// General matrix product: `C = alpha * A * B + beta * C`.
    ///
    /// All sixteen storage-datatype combinations are accepted; heterogeneous calls run through
    /// the mixed-datatype staging. `cntx` and `rntm` override the engine defaults when given.
    #[instrument(skip_all, fields(m = c.length(), n = c.width(), dt = ?c.dt()))]
    pub fn gemm(
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
            crate::check::gemm(a, b, c)?;
        }
        if return_early_if_trivial(alpha, a, b, beta, c) {
            return Ok(());
        }

        // The small/unpacked handler may decline, in which case execution proceeds to the
        // conventional blocked implementation.
        if self.config().enable_sup
            && gemmsup(alpha, a, b, beta, c, self.config().sup_thresholds)
        {
            return Ok(());
        }

        let rntm_l = rntm.copied().unwrap_or_else(|| self.default_rntm());

        // The general product permits the 1m method even under mixed precision, as long as
        // every operand is complex.
        let im = if Engine::all_complex(a, b, c) {
            self.find_induced_method(c.dt())
        } else {
            IndMethod::Native
        };
        let cntx = cntx.unwrap_or_else(|| self.context(im));

        let mut a_l = a.alias();
        let mut b_l = b.alias();
        let mut c_l = c.alias();

        // If the micro-kernel dislikes C's storage orientation, transpose the whole operation.
        if cntx.dislikes_storage_of(&c_l) {
            core::mem::swap(&mut a_l, &mut b_l);
            a_l.transpose_view();
            b_l.transpose_view();
            c_l.transpose_view();
        }
        a_l.induce_trans();
        b_l.induce_trans();

        // Mixed-datatype staging may retarget the packs and swap in a temporary output.
        let mut beta_l = beta;
        let temp = gemm_md(&mut a_l, &mut b_l, &mut beta_l, &mut c_l, self.config().md_extra_mem)?;

        // Fold alpha into the B pack and carry beta via the first-touch policy, so the packer
        // applies alpha for free and the macro-kernel applies beta exactly once.
        b_l.set_scalar(alpha);
        let pd = PassDown::new(ScalarVal::ONE, beta_l);

        let ways = shape_ways(
            &rntm_l,
            OpFamily::Gemm,
            Side::Left,
            c_l.length(),
            c_l.width(),
            false,
        );

        match temp {
            Some(mut t) => {
                {
                    let c_exec = t.obj();
                    set_schemas(cntx, &mut a_l, &mut b_l);
                    let cntl = gemm_cntl(
                        cntx,
                        KerFamily::Gemm,
                        &a_l,
                        &b_l,
                        &c_exec,
                        a_l.schema(),
                        b_l.schema(),
                    );
                    a_l.set_schema(lamina_core::PackSchema::NotPacked);
                    b_l.set_schema(lamina_core::PackSchema::NotPacked);
                    execute(self, cntx, ways, &cntl, &a_l, &b_l, &c_exec, pd)?;
                }
                // Accumulate the staged product back into C with the caller's beta.
                xpbym(&t.obj(), beta, &c_l);
            },
            None => {
                set_schemas(cntx, &mut a_l, &mut b_l);
                let cntl =
                    gemm_cntl(cntx, KerFamily::Gemm, &a_l, &b_l, &c_l, a_l.schema(), b_l.schema());
                a_l.set_schema(lamina_core::PackSchema::NotPacked);
                b_l.set_schema(lamina_core::PackSchema::NotPacked);
                execute(self, cntx, ways, &cntl, &a_l, &b_l, &c_l, pd)?;
            },
        }
        Ok(())
    }
}

/// [`Engine::gemm`] on the process-wide default engine.
pub fn gemm(
    alpha: ScalarVal,
    a: &Obj<'_>,
    b: &Obj<'_>,
    beta: ScalarVal,
    c: &Obj<'_>,
) -> Result<(), Error> {
    Engine::global().gemm(alpha, a, b, beta, c, None, None)
}
