//! Adapters for the ports.

mod echo;
mod memory_store;
mod openai;
#[cfg(feature = "redis")]
mod redis_store;

pub use self::echo::EchoProvider;
pub use self::memory_store::InMemoryTaskStore;
pub use self::openai::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, OpenAiProvider};
#[cfg(feature = "redis")]
pub use self::redis_store::{DEFAULT_KEY_PREFIX, RedisTaskStore};
