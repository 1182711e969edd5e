// Model Context Protocol transport

pub mod server;
pub mod tools;

pub use server::McpServer;
