//! Remote channel setup and retry policy

use std::time::Duration;

use tonic::transport::{Channel, ClientTlsConfig};
use tracing::{debug, warn};

use gantry_core::error::InfrastructureError;

use super::proto::longrunning::operations_client::OperationsClient;
use super::proto::rev2::action_cache_client::ActionCacheClient;
use super::proto::rev2::capabilities_client::CapabilitiesClient;
use super::proto::rev2::content_addressable_storage_client::ContentAddressableStorageClient;
use super::proto::rev2::execution_client::ExecutionClient;

/// Exponential backoff for transient gRPC failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// First delay
    pub initial: Duration,
    /// Delay cap
    pub max: Duration,
    /// Total attempts (first try included)
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(4),
            attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// A single-attempt policy (no retries)
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Default::default()
        }
    }
}

/// Whether a status is worth retrying for cache/CAS operations
pub fn is_transient(code: tonic::Code) -> bool {
    matches!(code, tonic::Code::Unavailable | tonic::Code::DeadlineExceeded)
}

/// Retry an operation on transient status codes with exponential backoff
pub async fn retry_status<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut f: F,
) -> Result<T, tonic::Status>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, tonic::Status>>,
{
    let mut delay = policy.initial;
    let mut attempt = 1u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(status) if is_transient(status.code()) && attempt < policy.attempts => {
                warn!(
                    operation = what,
                    attempt,
                    code = ?status.code(),
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.max);
                attempt += 1;
            }
            Err(status) => return Err(status),
        }
    }
}

/// The per-endpoint client bundle. tonic clients multiplex one channel.
#[derive(Clone)]
pub struct RemoteClients {
    /// Execution service
    pub execution: ExecutionClient<Channel>,
    /// ActionCache service
    pub action_cache: ActionCacheClient<Channel>,
    /// ContentAddressableStorage service
    pub cas: ContentAddressableStorageClient<Channel>,
    /// Capabilities service
    pub capabilities: CapabilitiesClient<Channel>,
    /// Long-running operations service (cancellation)
    pub operations: OperationsClient<Channel>,
}

impl RemoteClients {
    /// Establish the channel and wrap every service client around it
    pub async fn connect(
        endpoint: &str,
        use_tls: bool,
        timeout: Duration,
    ) -> Result<Self, InfrastructureError> {
        let scheme = if use_tls { "https" } else { "http" };
        let uri = format!("{}://{}", scheme, endpoint);
        debug!(endpoint = %uri, "connecting to remote execution endpoint");

        let mut builder = Channel::from_shared(uri.clone())
            .map_err(|e| InfrastructureError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout);

        if use_tls {
            builder = builder
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| InfrastructureError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
        }

        let channel = builder
            .connect()
            .await
            .map_err(|e| InfrastructureError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            execution: ExecutionClient::new(channel.clone()),
            action_cache: ActionCacheClient::new(channel.clone()),
            cas: ContentAddressableStorageClient::new(channel.clone()),
            capabilities: CapabilitiesClient::new(channel.clone()),
            operations: OperationsClient::new(channel),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_codes() {
        assert!(is_transient(tonic::Code::Unavailable));
        assert!(is_transient(tonic::Code::DeadlineExceeded));
        assert!(!is_transient(tonic::Code::NotFound));
        assert!(!is_transient(tonic::Code::InvalidArgument));
        assert!(!is_transient(tonic::Code::PermissionDenied));
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let policy = RetryPolicy {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(2),
            attempts: 3,
        };

        let mut calls = 0u32;
        let result: Result<(), tonic::Status> = retry_status(&policy, "probe", || {
            calls += 1;
            async { Err(tonic::Status::unavailable("down")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let policy = RetryPolicy::default();
        let mut calls = 0u32;
        let result: Result<(), tonic::Status> = retry_status(&policy, "probe", || {
            calls += 1;
            async { Err(tonic::Status::not_found("miss")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retry_returns_success() {
        let policy = RetryPolicy {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(1),
            attempts: 5,
        };

        let mut calls = 0u32;
        let result = retry_status(&policy, "probe", || {
            calls += 1;
            let ok = calls >= 2;
            async move {
                if ok {
                    Ok(7)
                } else {
                    Err(tonic::Status::unavailable("down"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_connect_failure_is_infrastructure_error() {
        // Port 1 is essentially never listening
        let result =
            RemoteClients::connect("127.0.0.1:1", false, Duration::from_secs(1)).await;
        assert!(matches!(
            result,
            Err(InfrastructureError::ConnectFailed { .. })
        ));
    }
}
