//! Client for the external text-generation oracle used by the classifier
//! and proposal generator.
//!
//! The oracle is treated as a single capability — `generate(prompt) -> String`
//! — with three interchangeable concrete backends selected by configuration:
//! a hosted OpenAI-compatible endpoint, Gemini, or a local Llama-compatible
//! HTTP endpoint (also OpenAI-compatible on the wire). Credential validation
//! happens once, at construction time, never on the first call.
//!
//! # Thread Safety
//!
//! Every concrete client is `Clone + Send + Sync` and shares a pooled HTTP
//! client connection across calls.
//!
//! # Example
//!
//! ```no_run
//! use wts_config::OracleConfig;
//! use wts_oracle::build_oracle;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OracleConfig::from_env()?;
//! let oracle = build_oracle(&config)?;
//! let proposal_text = oracle.generate("classify this folder...").await?;
//! println!("{proposal_text}");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod models;

pub use client::{build_oracle, ChatCompletionsClient, GeminiClient, Oracle};
pub use error::{OracleError, OracleResult};
pub use models::ChatMessage;
