use std::sync::Mutex;

use lamina_core::{BszId, Context, DType, Error, IndMethod};
use tracing::trace;

// BUFFER CLASSES
// ================================================================================================

/// Class of a packed-operand buffer. The broker pools blocks separately per class because the
/// two classes have very different footprints and reuse cadences.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BufClass {
    /// An `MC x KC` block of packed A micro-panels.
    ABlock,
    /// A `KC x NC` panel of packed B micro-panels.
    BPanel,
}

impl BufClass {
    const fn index(self) -> usize {
        match self {
            BufClass::ABlock => 0,
            BufClass::BPanel => 1,
        }
    }
}

// MEMORY BROKER
// ================================================================================================

/// Arena-page pool for packed operands.
///
/// Blocks are fixed-size per class, sized at engine construction for the worst-case packed
/// footprint over all datatypes and contexts, and 8-byte aligned (the strictest element
/// alignment in the table). A thread group's chief checks a block out on first use, shares the
/// pointer with its siblings, and returns it when the decorator unwinds; workers never touch
/// the general-purpose heap inside the loop nest.
pub struct Broker {
    pools: [Mutex<Vec<Vec<u64>>>; 2],
    block_words: [usize; 2],
    cap: Option<usize>,
    outstanding: [Mutex<usize>; 2],
}

/// A checked-out arena page. Returned to the broker with [`Broker::release`].
pub struct PackBlock {
    class: BufClass,
    mem: Vec<u64>,
}

impl PackBlock {
    pub fn ptr(&mut self) -> *mut u8 {
        self.mem.as_mut_ptr() as *mut u8
    }

    pub fn len_bytes(&self) -> usize {
        self.mem.len() * 8
    }
}

impl Broker {
    /// Sizes the pools for the given contexts. `cap`, when set, bounds the number of
    /// simultaneously outstanding blocks per class.
    pub fn new(contexts: &[&Context], cap: Option<usize>) -> Self {
        let mut a_bytes = 0usize;
        let mut b_bytes = 0usize;
        for cntx in contexts {
            for dt in DType::ALL {
                let es = dt.elem_size();
                let mr = cntx.blksz_def(dt, BszId::Mr);
                let nr = cntx.blksz_def(dt, BszId::Nr);
                let mc = cntx.blksz_max(dt, BszId::Mc);
                let kc = cntx.blksz_max(dt, BszId::Kc);
                let nc = cntx.blksz_max(dt, BszId::Nc);
                // Panel counts are rounded up so a ragged final panel still fits. Under the 1m
                // method the A-side micro-panels double along both axes (2x2 real embedding),
                // doubling their byte footprint; the B side only doubles its length, which the
                // halved complex KC already accounts for.
                let a_mult =
                    if cntx.method() == IndMethod::OneM && dt.is_complex() { 2 } else { 1 };
                let a_panels = mc.div_ceil(mr);
                let b_panels = nc.div_ceil(nr);
                a_bytes = a_bytes.max(a_panels * mr * kc * es * a_mult);
                b_bytes = b_bytes.max(b_panels * nr * kc * es);
            }
        }
        Self {
            pools: [Mutex::new(Vec::new()), Mutex::new(Vec::new())],
            block_words: [a_bytes.div_ceil(8), b_bytes.div_ceil(8)],
            cap,
            outstanding: [Mutex::new(0), Mutex::new(0)],
        }
    }

    /// Number of bytes in one block of the given class.
    pub fn block_bytes(&self, class: BufClass) -> usize {
        self.block_words[class.index()] * 8
    }

    /// Checks a block out, reusing a pooled page when one is available.
    pub fn acquire(&self, class: BufClass) -> Result<PackBlock, Error> {
        let idx = class.index();
        if let Some(cap) = self.cap {
            let mut n = self.outstanding[idx].lock().unwrap();
            if *n >= cap {
                return Err(Error::ResourceExhausted);
            }
            *n += 1;
        }
        let pooled = self.pools[idx].lock().unwrap().pop();
        let mem = match pooled {
            Some(mem) => mem,
            None => {
                trace!(?class, words = self.block_words[idx], "allocating fresh pack block");
                vec![0u64; self.block_words[idx]]
            },
        };
        Ok(PackBlock { class, mem })
    }

    /// Returns a block to its pool.
    pub fn release(&self, block: PackBlock) {
        let idx = block.class.index();
        if self.cap.is_some() {
            *self.outstanding[idx].lock().unwrap() -= 1;
        }
        self.pools[idx].lock().unwrap().push(block.mem);
    }
}

// TESTS
// ================================================================================================
