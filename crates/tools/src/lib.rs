//! Built-in tool implementations for LoreAgent.
//!
//! Tools give the agent the ability to act: check the time, look up
//! crypto prices, and generate images. Remote tool sets fetched from a
//! protocol peer live here too.

pub mod crypto_price;
pub mod current_time;
pub mod generate_image;
pub mod remote;

pub use crypto_price::CryptoPriceTool;
pub use current_time::CurrentTimeTool;
pub use generate_image::GenerateImageTool;
pub use remote::RemoteToolSet;

use loreagent_core::tool::ToolRegistry;
use std::sync::Arc;

/// Create a registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CurrentTimeTool));
    registry.register(Arc::new(CryptoPriceTool::new()));
    registry.register(Arc::new(GenerateImageTool));
    registry
}
