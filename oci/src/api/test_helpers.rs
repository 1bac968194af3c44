//! Test helpers for the OCI API

use super::{Client, ClientConfig, RetryConfig};

/// Client pointed at a mock server, with fast retries
pub fn create_test_client(url: &str) -> Client {
    let config = ClientConfig::new("us-phoenix-1", "test-token")
        .with_endpoint(url)
        .with_retry(RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        });
    Client::new(config).unwrap()
}

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
    }

    #[test]
    fn test_connection_pool_config() {
        use pool::ConnectionPoolConfig;

        let config = ConnectionPoolConfig::default();
        assert_eq!(config.max_idle_connections, 10);
        assert_eq!(config.idle_timeout.as_secs(), 90);
        assert_eq!(config.connection_timeout.as_secs(), 10);
        assert_eq!(config.request_timeout.as_secs(), 60);
        assert_eq!(config.tcp_keepalive.unwrap().as_secs(), 30);
    }

    #[tokio::test]
    async fn test_connection_stats() {
        use pool::{ConnectionPoolConfig, ConnectionPoolManager};

        let manager = ConnectionPoolManager::new(ConnectionPoolConfig::default());

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.failed_requests, 0);

        manager.record_request(true).await;
        manager.record_request(false).await;
        manager.record_retry().await;

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.retried_requests, 1);
        assert!(stats.last_request.is_some());
    }

    #[test]
    fn test_api_error_formatting() {
        let error = ApiError::ApiError {
            status: 409,
            code: "IncorrectState".to_string(),
            message: "VCN is not empty".to_string(),
        };

        let error_str = error.to_string();
        assert!(error_str.contains("HTTP 409"));
        assert!(error_str.contains("IncorrectState"));
        assert!(error_str.contains("VCN is not empty"));
        assert!(!error.is_not_found());
        assert!(ApiError::NotFound("gone".to_string()).is_not_found());
    }
}
