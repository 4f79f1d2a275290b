// Library interface for marketlens modules
// This allows tests and the binary to import modules

pub mod fallback;
pub mod llm;
pub mod mock;
pub mod news;
