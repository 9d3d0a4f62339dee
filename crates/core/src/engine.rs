//! Hash engine registry
//!
//! A fixed table maps `(algorithm family, variant index)` to one compiled
//! kernel. Resolution is a pure lookup and touches no shared state.

use core::fmt;
use core::str::FromStr;

use crate::context::HashContext;
use crate::cryptonight::cryptonight;
use crate::error::EngineError;
use crate::params::{CRYPTONIGHT, CRYPTONIGHT_LITE, MemoryProfile};
use crate::primitives::{HardAes, SoftAes};

/// Common signature of every compiled kernel:
/// `(input, per-lane input size, output of 32 × lanes bytes, scratch context)`
pub type HashFn = fn(input: &[u8], size: usize, output: &mut [u8], ctx: &mut HashContext);

/// Proof-of-work algorithm family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Standard CryptoNight (2 MB)
    CryptoNight,
    /// CryptoNight-Lite (1 MB)
    CryptoNightLite,
}

impl Algorithm {
    /// Memory-hardness profile of this family
    pub const fn profile(self) -> &'static MemoryProfile {
        match self {
            Algorithm::CryptoNight => &CRYPTONIGHT,
            Algorithm::CryptoNightLite => &CRYPTONIGHT_LITE,
        }
    }

    /// Canonical name used in configuration files
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::CryptoNight => "cryptonight",
            Algorithm::CryptoNightLite => "cryptonight-lite",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cryptonight" | "cn" => Ok(Algorithm::CryptoNight),
            "cryptonight-lite" | "cryptonight-light" | "cn-lite" => Ok(Algorithm::CryptoNightLite),
            _ => Err(EngineError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Variant selector, by position in the registry table (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// 1: single lane, hardware AES
    Single = 1,
    /// 2: two lanes, hardware AES
    Double = 2,
    /// 3: single lane, software AES
    SoftSingle = 3,
    /// 4: two lanes, software AES
    SoftDouble = 4,
    /// 5: three lanes, hardware AES
    Triple = 5,
    /// 6: same table entry as 5
    TripleAlt = 6,
    /// 7: five lanes, hardware AES
    Penta = 7,
}

impl Variant {
    /// All variants in table order
    pub const ALL: [Variant; 7] = [
        Variant::Single,
        Variant::Double,
        Variant::SoftSingle,
        Variant::SoftDouble,
        Variant::Triple,
        Variant::TripleAlt,
        Variant::Penta,
    ];

    /// Look up a variant by its 1-based index
    pub fn from_index(index: i32) -> Result<Self, EngineError> {
        if !(1..=7).contains(&index) {
            return Err(EngineError::InvalidVariant(index));
        }
        Ok(Self::ALL[(index - 1) as usize])
    }

    /// 1-based table index
    pub const fn index(self) -> i32 {
        self as i32
    }

    /// Kernel compiled into this table slot
    pub const fn kernel(self) -> Kernel {
        match self {
            Variant::Single => Kernel::HardSingle,
            Variant::Double => Kernel::HardDouble,
            Variant::SoftSingle => Kernel::SoftSingle,
            Variant::SoftDouble => Kernel::SoftDouble,
            Variant::Triple | Variant::TripleAlt => Kernel::HardTriple,
            Variant::Penta => Kernel::HardPenta,
        }
    }

    /// Lanes hashed per engine call
    pub const fn lanes(self) -> usize {
        self.kernel().lanes()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.kernel())
    }
}

/// Compiled code path: lane count × AES strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    HardSingle,
    HardDouble,
    SoftSingle,
    SoftDouble,
    HardTriple,
    HardPenta,
}

impl Kernel {
    pub const fn lanes(self) -> usize {
        match self {
            Kernel::HardSingle | Kernel::SoftSingle => 1,
            Kernel::HardDouble | Kernel::SoftDouble => 2,
            Kernel::HardTriple => 3,
            Kernel::HardPenta => 5,
        }
    }

    pub const fn soft_aes(self) -> bool {
        matches!(self, Kernel::SoftSingle | Kernel::SoftDouble)
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aes = if self.soft_aes() { "soft-aes" } else { "aes-ni" };
        write!(f, "{}x {}", self.lanes(), aes)
    }
}

macro_rules! kernel_fn {
    ($name:ident, $aes:ty, $lanes:literal, $profile:expr) => {
        fn $name(input: &[u8], size: usize, output: &mut [u8], ctx: &mut HashContext) {
            cryptonight::<$aes, $lanes>(&$profile, input, size, output, ctx)
        }
    };
}

kernel_fn!(cn_single_hw, HardAes, 1, CRYPTONIGHT);
kernel_fn!(cn_double_hw, HardAes, 2, CRYPTONIGHT);
kernel_fn!(cn_single_soft, SoftAes, 1, CRYPTONIGHT);
kernel_fn!(cn_double_soft, SoftAes, 2, CRYPTONIGHT);
kernel_fn!(cn_triple_hw, HardAes, 3, CRYPTONIGHT);
kernel_fn!(cn_penta_hw, HardAes, 5, CRYPTONIGHT);

kernel_fn!(cn_lite_single_hw, HardAes, 1, CRYPTONIGHT_LITE);
kernel_fn!(cn_lite_double_hw, HardAes, 2, CRYPTONIGHT_LITE);
kernel_fn!(cn_lite_single_soft, SoftAes, 1, CRYPTONIGHT_LITE);
kernel_fn!(cn_lite_double_soft, SoftAes, 2, CRYPTONIGHT_LITE);
kernel_fn!(cn_lite_triple_hw, HardAes, 3, CRYPTONIGHT_LITE);
kernel_fn!(cn_lite_penta_hw, HardAes, 5, CRYPTONIGHT_LITE);

/// Standard family, indexed by `variant - 1`. Slot 6 repeats slot 5.
const CRYPTONIGHT_TABLE: [HashFn; 7] = [
    cn_single_hw,
    cn_double_hw,
    cn_single_soft,
    cn_double_soft,
    cn_triple_hw,
    cn_triple_hw,
    cn_penta_hw,
];

/// Lite family, same shape as the standard table
const CRYPTONIGHT_LITE_TABLE: [HashFn; 7] = [
    cn_lite_single_hw,
    cn_lite_double_hw,
    cn_lite_single_soft,
    cn_lite_double_soft,
    cn_lite_triple_hw,
    cn_lite_triple_hw,
    cn_lite_penta_hw,
];

/// A resolved hash engine: an owned handle to one compiled kernel.
///
/// Engines are cheap to copy and are handed explicitly to each worker.
#[derive(Clone, Copy)]
pub struct Engine {
    algorithm: Algorithm,
    variant: Variant,
    hash_fn: HashFn,
}

impl Engine {
    /// Algorithm family
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Table slot this engine was resolved from
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Lanes hashed per call
    pub fn lanes(&self) -> usize {
        self.variant.lanes()
    }

    /// Allocate a scratch context sized for this engine
    pub fn context(&self) -> HashContext {
        HashContext::new(self.algorithm, self.lanes())
    }

    /// Hash `lanes()` back-to-back inputs of `size` bytes into
    /// `32 × lanes()` bytes of `output`
    #[inline(always)]
    pub fn hash(&self, input: &[u8], size: usize, output: &mut [u8], ctx: &mut HashContext) {
        (self.hash_fn)(input, size, output, ctx)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("algorithm", &self.algorithm)
            .field("variant", &self.variant)
            .finish()
    }
}

/// Resolve `(algorithm, variant index)` to a concrete engine.
///
/// Fails for an index outside `[1, 7]`.
pub fn resolve(algorithm: Algorithm, variant: i32) -> Result<Engine, EngineError> {
    let variant = Variant::from_index(variant)?;
    let table = match algorithm {
        Algorithm::CryptoNight => &CRYPTONIGHT_TABLE,
        Algorithm::CryptoNightLite => &CRYPTONIGHT_LITE_TABLE,
    };

    Ok(Engine {
        algorithm,
        variant,
        hash_fn: table[(variant.index() - 1) as usize],
    })
}
