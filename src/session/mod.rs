// Public API
pub use registry::SessionRegistry;

// Internal modules
mod registry;
