// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Resolver configuration.
///
/// Injected by reference into every resolution call; the library holds no global configuration
/// state.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Config {
    /// Fan wildcard nodes out over the caller-supplied permission universe during export.
    pub apply_wildcards: bool,

    /// Expand shorthand permission syntax during export.
    pub apply_shorthand: bool,

    /// Treat `R=`-prefixed server and world bindings as regular expressions.
    pub applying_regex: bool,

    /// Whether nodes without a server or world binding apply by default when building a query
    /// context from this configuration.
    pub including_global_perms: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apply_wildcards: true,
            apply_shorthand: true,
            applying_regex: true,
            including_global_perms: true,
        }
    }
}
