use std::sync::OnceLock;

use lamina_core::{Context, DType, IndMethod, Obj, Precision, Rntm};

use crate::{broker::Broker, sup::SupThresholds};

// CONFIGURATION
// ================================================================================================

/// Process-wide enablements, fixed at engine construction.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Verify operand preconditions before dispatching. When off, violations are the caller's
    /// problem.
    pub error_checking: bool,
    /// Enable the 1m induced method per complex precision (single, double). When off, complex
    /// operations execute natively.
    pub enable_1m: [bool; 2],
    /// Pre-invert triangular diagonals while packing for trsm, trading a division per
    /// micro-solve for reduced numerical fidelity on ill-conditioned diagonals.
    pub trsm_pre_invert: bool,
    /// Force right-side hemm/symm/trmm/trmm3 to be cast to the left-side form by transposing
    /// the whole operation, for micro-kernels that require pre-broadcast B packing.
    pub force_left_hemm: bool,
    pub force_left_symm: bool,
    pub force_left_trmm: bool,
    pub force_left_trmm3: bool,
    /// Enable the small/unpacked gemm path.
    pub enable_sup: bool,
    pub sup_thresholds: SupThresholds,
    /// Allow the mixed-datatype path to allocate a temporary output matrix.
    pub md_extra_mem: bool,
    /// Bound on simultaneously outstanding pack blocks per buffer class.
    pub pool_cap: Option<usize>,
    /// Default worker count when the caller supplies no runtime.
    pub num_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_checking: true,
            enable_1m: [false, false],
            trsm_pre_invert: true,
            force_left_hemm: false,
            force_left_symm: false,
            force_left_trmm: false,
            force_left_trmm3: false,
            enable_sup: true,
            sup_thresholds: SupThresholds::default(),
            md_extra_mem: true,
            pool_cap: None,
            num_threads: 1,
        }
    }
}

// ENGINE
// ================================================================================================

/// Owner of everything one operation call needs: the contexts (one per induced method), the
/// packing-memory broker, and the configuration. Construct one explicitly, or use
/// [`Engine::global`] for the lazily-initialized process default.
pub struct Engine {
    config: EngineConfig,
    cntx_native: Context,
    cntx_1m: Context,
    broker: Broker,
}

static GLOBAL: OnceLock<Engine> = OnceLock::new();

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let cntx_native = lamina_kernels::native_context();
        let cntx_1m = lamina_kernels::context_1m();
        let broker = Broker::new(&[&cntx_native, &cntx_1m], config.pool_cap);
        Self { config, cntx_native, cntx_1m, broker }
    }

    /// The process-wide default engine.
    pub fn global() -> &'static Engine {
        GLOBAL.get_or_init(|| Engine::new(EngineConfig::default()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn context(&self, method: IndMethod) -> &Context {
        match method {
            IndMethod::Native => &self.cntx_native,
            IndMethod::OneM => &self.cntx_1m,
        }
    }

    /// Induced-method selection for an operation whose operands are uniformly complex of
    /// datatype `dt`. Native execution is the fallback whenever 1m is not enabled.
    pub(crate) fn find_induced_method(&self, dt: DType) -> IndMethod {
        if !dt.is_complex() {
            return IndMethod::Native;
        }
        let idx = match dt.precision() {
            Precision::Single => 0,
            Precision::Double => 1,
        };
        if self.config.enable_1m[idx] { IndMethod::OneM } else { IndMethod::Native }
    }

    /// True when all three operands are complex (the 1m precondition for the general product,
    /// which tolerates mixed precision).
    pub(crate) fn all_complex(a: &Obj<'_>, b: &Obj<'_>, c: &Obj<'_>) -> bool {
        a.is_complex() && b.is_complex() && c.is_complex()
    }

    pub(crate) fn default_rntm(&self) -> Rntm {
        Rntm::with_num_threads(self.config.num_threads)
    }
}
