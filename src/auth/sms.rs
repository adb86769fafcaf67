use crate::auth::CodeChannel;
use crate::CrawlerError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

/// SMS code channel backed by Redis
///
/// Whatever forwards the SMS to the crawler writes the code under
/// `{prefix}{phone}`; this channel only reads it.
#[derive(Clone)]
pub struct RedisCodeChannel {
    connection: ConnectionManager,
}

impl RedisCodeChannel {
    pub async fn connect(url: &str) -> Result<Self, CrawlerError> {
        let client = redis::Client::open(url)
            .map_err(|e| CrawlerError::CodeChannel(format!("invalid redis url {}: {}", url, e)))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CrawlerError::CodeChannel(format!("connecting to {}: {}", url, e)))?;
        info!("Connected to code channel at {}", url);
        Ok(Self { connection })
    }
}

#[async_trait]
impl CodeChannel for RedisCodeChannel {
    async fn get(&self, key: &str) -> Result<Option<String>, CrawlerError> {
        let mut connection = self.connection.clone();
        connection
            .get(key)
            .await
            .map_err(|e| CrawlerError::CodeChannel(format!("GET {}: {}", key, e)))
    }
}
