//! Built-in plugins.

pub mod copy;
pub mod document;
pub mod ruler;
pub mod select;
pub mod workspace;

pub use copy::CopyPlugin;
pub use document::DocumentPlugin;
pub use ruler::RulerPlugin;
pub use select::SelectPlugin;
pub use workspace::WorkspacePlugin;
