//! LLM 层：Model Gateway 抽象与实现（OpenAI 兼容 / Mock）、嵌入、超时装饰

pub mod embedding;
pub mod mock;
pub mod openai;
pub mod timeout;
pub mod traits;

pub use embedding::{cosine_similarity, create_embedder_from_config, EmbeddingProvider, OpenAiEmbedder};
pub use mock::{MockEmbedder, MockGateway};
pub use openai::OpenAiGateway;
pub use timeout::{TimeoutEmbedder, TimeoutGateway};
pub use traits::{GatewayReply, LlmError, ModelGateway, ToolRequest};
