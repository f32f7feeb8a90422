pub mod claude_md;
pub mod config;
pub mod detect;
pub mod import;
pub mod launch;
pub mod mcp;
pub mod project;
pub mod scene;
pub mod skill;
pub mod trash;
