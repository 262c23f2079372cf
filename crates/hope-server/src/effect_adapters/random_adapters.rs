// SPDX-License-Identifier: Apache-2.0

use hope_core::{ID_SUFFIX_MAX, ID_SUFFIX_MIN};
use rand::Rng;

/// Six-digit suffix for account and room ids.
pub(crate) fn id_suffix() -> u32 {
    rand::thread_rng().gen_range(ID_SUFFIX_MIN..=ID_SUFFIX_MAX)
}
