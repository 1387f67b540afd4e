//! bracken-core: module resolution, loaders, code generation, bundling.
//!
//! The pipeline is strictly left to right:
//!
//! ```text
//! file bytes -> [loaders?] -> lexer -> parser -> AST -> generator -> module body
//! ```
//!
//! The bundler drives that pipeline once per discovered module and
//! concatenates the generated bodies behind a runtime `require` shim.
//! Everything is synchronous and single-threaded; one `Bundle` value is
//! threaded through resolution and generation, and the first error
//! aborts the run with no partial output.

pub mod bundler;
pub mod codegen;
pub mod css;
pub mod loader;
pub mod resolver;

pub use bundler::{bundle, Bundle, BundleError, ModuleRecord};
pub use codegen::generate_program;
pub use css::CssLoader;
pub use loader::{Loader, LoaderError};
pub use resolver::{ResolveError, Resolver};
