pub mod registry;

pub use agent_types::Tool;
pub use registry::ToolRegistry;
