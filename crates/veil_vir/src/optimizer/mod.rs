//! Method-level optimizations and fixups, applied between well-formedness
//! checking and lowering. Each pass is semantics-preserving on well-formed
//! methods, so they can be toggled independently.

pub mod dead_blocks;
pub mod fixup;
pub mod folding;
pub mod trivial_asserts;

use crate::cfg::CfgMethod;
use veil_common::config::{CfgSimplification, PassOptions};

pub fn optimize_method(mut method: CfgMethod, options: &PassOptions) -> CfgMethod {
    if options.simplify_cfg == CfgSimplification::Enabled {
        method = dead_blocks::simplify_cfg(method);
    }
    if options.remove_redundant_folds {
        method = folding::remove_redundant_folds(method);
    }
    if options.remove_trivial_assertions {
        method = trivial_asserts::remove_trivial_assertions(method);
    }
    if options.run_fixups {
        method = fixup::patch_positions(method);
        method = fixup::normalize_expirations(method);
    }
    method
}
