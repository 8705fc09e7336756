//! Prompts for VLM-based offer extraction.
//!
//! Every instruction sent to the model lives here so a change to the target
//! schema touches exactly one file, and unit tests can inspect the prompt
//! without a live model.
//!
//! Callers can override the system prompt via
//! [`crate::config::ExtractionConfig::system_prompt`]; the constants here are
//! used only when no override is provided.

use crate::pipeline::encode::EncodedImage;
use crate::pipeline::llm::PromptMessage;

/// Default system prompt: extraction rules plus the target JSON schema.
///
/// The key names are the contract with [`crate::pipeline::normalize`]; keep
/// them in sync.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an assistant specialised in reading retail offers in images (banners, flyers, social posts).
Extract every distinct product shown in the image and return ONLY JSON matching the schema below.

Rules:
- For each product identify: "marca_nome" (brand + product name), "marca" (brand, if visible), "produto" (product name/model),
  "preco_brl" (price as a number in Brazilian reais, using a dot as decimal separator) and "preco_brl_texto" (the price exactly as printed, e.g. "R$ 29,90").
- In "condicoes" list items as {"tipo": "desconto|data|outro", "valor": "text"}.
- When several products and prices appear, associate each price with the correct product.
- When information is missing, leave the field as an empty string or omit the optional key. Never invent data.
- Do not add comments or any text outside the JSON. Return ONLY the JSON object.

Target JSON schema:
{
  "products": [
    {
      "marca_nome": "string",
      "marca": "optional string",
      "produto": "optional string",
      "preco_brl": 0.0,
      "preco_brl_texto": "optional string",
      "condicoes": [
        {"tipo": "desconto|data|outro", "valor": "string"}
      ]
    }
  ]
}"#;

/// Short directive sent alongside the image in the user turn.
pub const USER_DIRECTIVE: &str = "Extract the products from this image and return only the JSON.";

/// Build the two-message exchange for one image.
///
/// 1. **System message**: `system_prompt` (the default rules or an override)
/// 2. **User message**: [`USER_DIRECTIVE`] with the encoded image attached
pub fn build_messages(system_prompt: &str, image: EncodedImage) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(system_prompt),
        PromptMessage::user_with_image(USER_DIRECTIVE, image),
    ]
}
