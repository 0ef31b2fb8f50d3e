//! AI provider implementations

pub mod anthropic;
pub mod openai;

use super::bridge::AIProvider;
use anyhow::Result;

/// Factory function to create AI providers
pub fn create_provider(
    provider_name: &str,
    api_key: Option<String>,
    model: Option<String>,
) -> Result<Box<dyn AIProvider>> {
    match provider_name {
        "openai" => {
            let provider = openai::OpenAIProvider::new(api_key);
            Ok(Box::new(match model {
                Some(model) => provider.with_model(model),
                None => provider,
            }))
        }
        "anthropic" => {
            let provider = anthropic::AnthropicProvider::new(api_key);
            Ok(Box::new(match model {
                Some(model) => provider.with_model(model),
                None => provider,
            }))
        }
        _ => anyhow::bail!("Unknown AI provider: {}", provider_name),
    }
}
