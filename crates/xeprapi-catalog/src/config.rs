/// Controls member synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Evaluate zero-argument, all-upper-case, returning entries once at
    /// open time and serve the cached value afterwards.
    pub constant_constants: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            constant_constants: true,
        }
    }
}
