pub mod management;
pub mod sync;

pub use management::serve_management;
pub use sync::serve_sync;
