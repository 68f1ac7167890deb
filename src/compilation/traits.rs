//! Port interfaces for the compile pipeline

use async_trait::async_trait;

use crate::compilation::codegen::GeneratedSource;
use crate::compilation::errors::FetchError;
use crate::core::error::Result;
use crate::core::module::{ModuleId, ResolvedReferences};
use crate::runtime::program::CompiledUnit;

/// Retrieves the binary content of a reference module
#[async_trait]
pub trait ModuleFetcher: Send + Sync {
    async fn fetch(&self, module: &ModuleId) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Compiles generated source against resolved references.
///
/// Implementations must not keep state between calls that changes the
/// outcome of a later compilation.
pub trait CompilerBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Compile `source` into an in-memory unit, or fail with every diagnostic
    fn compile(
        &self,
        source: &GeneratedSource,
        references: &ResolvedReferences,
    ) -> Result<CompiledUnit>;
}
