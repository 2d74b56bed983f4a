//! Concrete model providers.

mod openai;

pub use openai::{OpenAiConfig, OpenAiProvider};
