//! Remote Execution API v2 executor
//!
//! Builds an RE v2 Action per task, probes the ActionCache, uploads missing
//! blobs to CAS, and drives the Execution service's long-running operation
//! stream. Falls back to local execution when the channel cannot be
//! established and the configuration permits.

pub mod action;
pub mod client;
pub mod digest;
pub mod proto;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use gantry_core::config::RemoteExecutionConfig;
use gantry_tasks::{ExecutionPlan, Task, TaskGraph};

use crate::executor::{execute_layered, ExecutorOptions, TaskExecutor, TaskRunner};
use crate::local::LocalExecutor;
use crate::reporter::{TaskEvent, TaskReporter};
use crate::result::{ExecutionResults, TaskResult, TaskResultBuilder, TaskStatus, TIMEOUT_EXIT_CODE};

use action::{build_action, build_command, effective_platform};
use client::{is_transient, retry_status, RemoteClients, RetryPolicy};
use digest::{build_input_tree, digest_message};
use proto::longrunning::{operation, CancelOperationRequest, Operation};
use proto::rev2::{
    ActionResult, BatchReadBlobsRequest, BatchUpdateBlobsRequest, Digest, DigestFunction,
    ExecuteRequest, ExecuteResponse, FindMissingBlobsRequest, GetActionResultRequest,
    GetCapabilitiesRequest, batch_update_blobs_request,
};

/// google.rpc code for DEADLINE_EXCEEDED
const RPC_DEADLINE_EXCEEDED: i32 = 4;

/// Endpoint settings a task resolves to
#[derive(Debug, Clone)]
struct EndpointSettings {
    address: String,
    instance_name: String,
    use_tls: bool,
    timeout: Duration,
    platform: BTreeMap<String, String>,
}

/// Why a remote execution attempt did not produce a task result
enum RemoteFailure {
    /// Channel/CAS/AC trouble; eligible for local fallback
    Infrastructure(String),
    /// The task itself cannot be executed remotely
    Task(String),
}

/// Remote Execution v2 executor
pub struct RemoteExecutor {
    options: ExecutorOptions,
    config: RemoteExecutionConfig,
    retry: RetryPolicy,
    reporter: Arc<dyn TaskReporter>,
    local: LocalExecutor,
    /// Connected client bundles per endpoint address; `None` records an
    /// endpoint that exhausted its connect budget.
    clients: tokio::sync::Mutex<HashMap<String, Option<RemoteClients>>>,
}

impl RemoteExecutor {
    /// Create a remote executor. Tasks that opt out of remote execution
    /// run through the embedded local executor.
    pub fn new(
        options: ExecutorOptions,
        config: RemoteExecutionConfig,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        let local = LocalExecutor::new(options.clone(), reporter.clone());
        Self {
            options,
            config,
            retry: RetryPolicy::default(),
            reporter,
            local,
            clients: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn resolve_endpoint(&self, task: &Task) -> EndpointSettings {
        let mut settings = EndpointSettings {
            address: self.config.default_endpoint.clone(),
            instance_name: self.config.default_instance_name.clone(),
            use_tls: self.config.use_tls,
            timeout: Duration::from_secs(self.config.default_timeout_seconds),
            platform: self.config.default_platform.clone(),
        };

        let named = task
            .target
            .remote_execution
            .as_ref()
            .and_then(|o| o.endpoint.as_deref())
            .and_then(|name| self.config.endpoints.get(name));

        if let Some(endpoint) = named {
            settings.address = endpoint.endpoint.clone();
            if let Some(instance) = &endpoint.instance_name {
                settings.instance_name = instance.clone();
            }
            if let Some(use_tls) = endpoint.use_tls {
                settings.use_tls = use_tls;
            }
            if let Some(timeout) = endpoint.timeout_seconds {
                settings.timeout = Duration::from_secs(timeout);
            }
            for (key, value) in &endpoint.platform {
                settings.platform.insert(key.clone(), value.clone());
            }
        }

        if let Some(timeout) = task.target.options.timeout_secs {
            settings.timeout = Duration::from_secs(timeout);
        }
        settings
    }

    /// Connect (once) to an endpoint, retrying per policy. A failed budget
    /// is remembered so later tasks fail fast.
    async fn clients_for(&self, settings: &EndpointSettings) -> Option<RemoteClients> {
        let mut cache = self.clients.lock().await;
        if let Some(existing) = cache.get(&settings.address) {
            return existing.clone();
        }

        let mut delay = self.retry.initial;
        let mut connected = None;
        for attempt in 1..=self.retry.attempts {
            match RemoteClients::connect(&settings.address, settings.use_tls, settings.timeout)
                .await
            {
                Ok(clients) => {
                    self.probe_capabilities(&clients, settings).await;
                    connected = Some(clients);
                    break;
                }
                Err(e) => {
                    warn!(endpoint = %settings.address, attempt, error = %e, "connect failed");
                    if attempt < self.retry.attempts {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(self.retry.max);
                    }
                }
            }
        }

        cache.insert(settings.address.clone(), connected.clone());
        connected
    }

    /// Best-effort capability check on a fresh channel: logs what the
    /// server advertises and warns when SHA-256 is not among its digest
    /// functions.
    async fn probe_capabilities(&self, clients: &RemoteClients, settings: &EndpointSettings) {
        let response = clients
            .capabilities
            .clone()
            .get_capabilities(GetCapabilitiesRequest {
                instance_name: settings.instance_name.clone(),
            })
            .await;

        match response {
            Ok(response) => {
                let capabilities = response.into_inner();
                let exec_enabled = capabilities
                    .execution_capabilities
                    .as_ref()
                    .map(|e| e.exec_enabled)
                    .unwrap_or(false);
                let sha256 = capabilities
                    .cache_capabilities
                    .as_ref()
                    .map(|c| c.digest_functions.contains(&(DigestFunction::Sha256 as i32)))
                    .unwrap_or(true);
                debug!(endpoint = %settings.address, exec_enabled, "server capabilities");
                if !sha256 {
                    warn!(endpoint = %settings.address,
                          "server does not advertise SHA-256; cache lookups may always miss");
                }
            }
            Err(status) => {
                debug!(endpoint = %settings.address, error = %status, "capabilities probe failed");
            }
        }
    }

    async fn execute_remote(
        &self,
        clients: &RemoteClients,
        settings: &EndpointSettings,
        task: &Task,
    ) -> Result<TaskResult, RemoteFailure> {
        let id = task.id.to_string();
        let builder = TaskResult::start(&id);

        self.reporter.report(&TaskEvent::TaskStarted {
            id: id.clone(),
            command: format!("[remote] {}", task.target.options.commands.join(" && ")),
        });

        // Action construction
        let project_dir = self.options.workspace_root.join(&task.project_root);
        let input_tree = build_input_tree(&project_dir, &task.target.inputs)
            .map_err(|e| RemoteFailure::Task(format!("input root: {}", e)))?;

        let platform = effective_platform(&settings.platform, task);
        let command = build_command(task, &platform);
        let (command_digest, command_bytes) = digest_message(&command);
        let action = build_action(
            command_digest.clone(),
            input_tree.root_digest.clone(),
            settings.timeout,
            !task.target.cache,
            &platform,
        );
        let (action_digest, action_bytes) = digest_message(&action);

        // Cache probe
        let probe = retry_status(&self.retry, "GetActionResult", || {
            let mut ac = clients.action_cache.clone();
            let request = GetActionResultRequest {
                instance_name: settings.instance_name.clone(),
                action_digest: Some(action_digest.clone()),
                inline_stdout: true,
                inline_stderr: true,
            };
            async move { ac.get_action_result(request).await }
        })
        .await;

        match probe {
            Ok(response) => {
                debug!(task = %id, "action cache hit");
                let cached = response.into_inner();
                let stdout = self.fetch_log(clients, settings, &cached.stdout_raw, &cached.stdout_digest).await;
                let stderr = self.fetch_log(clients, settings, &cached.stderr_raw, &cached.stderr_digest).await;
                return Ok(finish_from_action_result(builder, &cached, true, stdout, stderr));
            }
            Err(status) if status.code() == tonic::Code::NotFound => {
                debug!(task = %id, "action cache miss");
            }
            Err(status) if is_transient(status.code()) => {
                return Err(RemoteFailure::Infrastructure(format!(
                    "action cache unavailable: {}",
                    status
                )));
            }
            Err(status) => {
                return Err(RemoteFailure::Task(format!("action cache: {}", status)));
            }
        }

        // Upload whatever the server is missing
        let mut all_blobs: Vec<(Digest, Vec<u8>)> = input_tree.blobs;
        all_blobs.push((command_digest, command_bytes));
        all_blobs.push((action_digest.clone(), action_bytes));
        self.upload_missing(clients, settings, all_blobs).await?;

        // Execute and drain the operation stream
        self.drive_execution(clients, settings, task, builder, action_digest)
            .await
    }

    async fn upload_missing(
        &self,
        clients: &RemoteClients,
        settings: &EndpointSettings,
        blobs: Vec<(Digest, Vec<u8>)>,
    ) -> Result<(), RemoteFailure> {
        let digests: Vec<Digest> = blobs.iter().map(|(d, _)| d.clone()).collect();

        let missing = retry_status(&self.retry, "FindMissingBlobs", || {
            let mut cas = clients.cas.clone();
            let request = FindMissingBlobsRequest {
                instance_name: settings.instance_name.clone(),
                blob_digests: digests.clone(),
            };
            async move { cas.find_missing_blobs(request).await }
        })
        .await
        .map_err(|s| RemoteFailure::Infrastructure(format!("FindMissingBlobs: {}", s)))?
        .into_inner();

        let wanted: HashSet<String> = missing
            .missing_blob_digests
            .into_iter()
            .map(|d| d.hash)
            .collect();
        if wanted.is_empty() {
            return Ok(());
        }

        let requests: Vec<batch_update_blobs_request::Request> = blobs
            .into_iter()
            .filter(|(digest, _)| wanted.contains(&digest.hash))
            .map(|(digest, data)| batch_update_blobs_request::Request {
                digest: Some(digest),
                data,
            })
            .collect();
        debug!(blobs = requests.len(), "uploading missing blobs");

        let response = retry_status(&self.retry, "BatchUpdateBlobs", || {
            let mut cas = clients.cas.clone();
            let request = BatchUpdateBlobsRequest {
                instance_name: settings.instance_name.clone(),
                requests: requests.clone(),
            };
            async move { cas.batch_update_blobs(request).await }
        })
        .await
        .map_err(|s| RemoteFailure::Infrastructure(format!("BatchUpdateBlobs: {}", s)))?
        .into_inner();

        for blob in response.responses {
            if let Some(status) = blob.status {
                if status.code != 0 {
                    return Err(RemoteFailure::Task(format!(
                        "blob upload rejected: {}",
                        status.message
                    )));
                }
            }
        }
        Ok(())
    }

    async fn drive_execution(
        &self,
        clients: &RemoteClients,
        settings: &EndpointSettings,
        task: &Task,
        builder: TaskResultBuilder,
        action_digest: Digest,
    ) -> Result<TaskResult, RemoteFailure> {
        let id = task.id.to_string();
        let mut attempt = 1u32;
        let mut delay = self.retry.initial;

        'execute: loop {
            let request = ExecuteRequest {
                instance_name: settings.instance_name.clone(),
                skip_cache_lookup: false,
                action_digest: Some(action_digest.clone()),
            };

            let mut stream = match clients.execution.clone().execute(request).await {
                Ok(response) => response.into_inner(),
                // Execute is only retried while the server never accepted it
                Err(status)
                    if status.code() == tonic::Code::Unavailable
                        && attempt < self.retry.attempts =>
                {
                    warn!(task = %id, attempt, "execute rejected, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.retry.max);
                    attempt += 1;
                    continue 'execute;
                }
                Err(status) => {
                    return Err(RemoteFailure::Infrastructure(format!("Execute: {}", status)))
                }
            };

            let mut accepted = false;
            let mut operation_name = String::new();

            loop {
                let next = tokio::select! {
                    next = stream.message() => next,
                    _ = self.options.cancellation.cancelled() => {
                        if !operation_name.is_empty() {
                            let _ = clients
                                .operations
                                .clone()
                                .cancel_operation(CancelOperationRequest {
                                    name: operation_name.clone(),
                                })
                                .await;
                        }
                        return Ok(builder.failed(None, "cancelled", String::new(), String::new()));
                    }
                };

                match next {
                    Ok(Some(op)) => {
                        accepted = true;
                        operation_name = op.name.clone();
                        if op.done {
                            return self
                                .finish_operation(clients, settings, builder, op)
                                .await;
                        }
                    }
                    Ok(None) => {
                        return Err(RemoteFailure::Infrastructure(
                            "execution stream closed before the operation finished".to_string(),
                        ));
                    }
                    Err(status)
                        if !accepted
                            && status.code() == tonic::Code::Unavailable
                            && attempt < self.retry.attempts =>
                    {
                        warn!(task = %id, attempt, "stream dropped before acceptance, retrying");
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(self.retry.max);
                        attempt += 1;
                        continue 'execute;
                    }
                    Err(status) => {
                        return Err(RemoteFailure::Infrastructure(format!(
                            "execution stream: {}",
                            status
                        )));
                    }
                }
            }
        }
    }

    async fn finish_operation(
        &self,
        clients: &RemoteClients,
        settings: &EndpointSettings,
        builder: TaskResultBuilder,
        op: Operation,
    ) -> Result<TaskResult, RemoteFailure> {
        match op.result {
            Some(operation::Result::Error(status)) => Ok(builder.failed(
                None,
                format!("remote operation failed: {}", status.message),
                String::new(),
                String::new(),
            )),
            Some(operation::Result::Response(any)) => {
                let response = ExecuteResponse::decode_any(&any)
                    .map_err(|e| RemoteFailure::Task(format!("undecodable response: {}", e)))?;

                if let Some(status) = &response.status {
                    if status.code != 0 {
                        if status.code == RPC_DEADLINE_EXCEEDED {
                            return Ok(builder.failed(
                                Some(TIMEOUT_EXIT_CODE),
                                "remote execution timed out",
                                String::new(),
                                String::new(),
                            ));
                        }
                        return Ok(builder.failed(
                            None,
                            format!("remote execution failed: {}", status.message),
                            String::new(),
                            String::new(),
                        ));
                    }
                }

                let Some(action_result) = response.result else {
                    return Err(RemoteFailure::Task(
                        "execute response carried no result".to_string(),
                    ));
                };

                let stdout = self
                    .fetch_log(clients, settings, &action_result.stdout_raw, &action_result.stdout_digest)
                    .await;
                let stderr = self
                    .fetch_log(clients, settings, &action_result.stderr_raw, &action_result.stderr_digest)
                    .await;

                Ok(finish_from_action_result(
                    builder,
                    &action_result,
                    response.cached_result,
                    stdout,
                    stderr,
                ))
            }
            None => Err(RemoteFailure::Infrastructure(
                "operation finished without a result".to_string(),
            )),
        }
    }

    /// Inline log bytes when present, otherwise fetch the digest from CAS.
    /// Log retrieval is best-effort.
    async fn fetch_log(
        &self,
        clients: &RemoteClients,
        settings: &EndpointSettings,
        raw: &[u8],
        digest: &Option<Digest>,
    ) -> String {
        if !raw.is_empty() {
            return String::from_utf8_lossy(raw).to_string();
        }
        let Some(digest) = digest else {
            return String::new();
        };
        if digest.size_bytes == 0 {
            return String::new();
        }

        let read = retry_status(&self.retry, "BatchReadBlobs", || {
            let mut cas = clients.cas.clone();
            let request = BatchReadBlobsRequest {
                instance_name: settings.instance_name.clone(),
                digests: vec![digest.clone()],
            };
            async move { cas.batch_read_blobs(request).await }
        })
        .await;

        match read {
            Ok(response) => response
                .into_inner()
                .responses
                .into_iter()
                .next()
                .map(|r| String::from_utf8_lossy(&r.data).to_string())
                .unwrap_or_default(),
            Err(status) => {
                warn!(error = %status, "log fetch failed");
                String::new()
            }
        }
    }

    fn report_outcome(&self, result: &TaskResult) {
        match result.status {
            TaskStatus::Completed | TaskStatus::Cached => {
                self.reporter.report(&TaskEvent::TaskCompleted {
                    id: result.id.clone(),
                    duration: result.duration,
                    from_cache: result.from_cache,
                });
            }
            TaskStatus::Failed => {
                self.reporter.report(&TaskEvent::TaskFailed {
                    id: result.id.clone(),
                    duration: result.duration,
                    reason: result.failure.clone().unwrap_or_default(),
                });
            }
            _ => {}
        }
    }
}

/// Convert a terminal ActionResult into a task record
fn finish_from_action_result(
    builder: TaskResultBuilder,
    action_result: &ActionResult,
    from_cache: bool,
    stdout: String,
    stderr: String,
) -> TaskResult {
    if action_result.exit_code == 0 {
        if from_cache {
            builder.cached(0, stdout, stderr)
        } else {
            builder.completed(0, stdout, stderr)
        }
    } else {
        let mut result = builder.failed(
            Some(action_result.exit_code),
            format!("command exited with code {}", action_result.exit_code),
            stdout,
            stderr,
        );
        result.from_cache = from_cache;
        result
    }
}

impl ExecuteResponse {
    /// Decode an ExecuteResponse out of an Operation's response Any
    fn decode_any(any: &prost_types::Any) -> Result<Self, prost::DecodeError> {
        use prost::Message;
        Self::decode(any.value.as_slice())
    }
}

#[async_trait]
impl TaskRunner for RemoteExecutor {
    async fn run_task(&self, task: &Task, verbose: bool) -> TaskResult {
        let opted_out = !self.config.enabled
            || task
                .target
                .remote_execution
                .as_ref()
                .and_then(|o| o.enabled)
                == Some(false);
        if opted_out {
            debug!(task = %task.id, "running locally (remote opt-out)");
            return self.local.run_task(task, verbose).await;
        }

        let settings = self.resolve_endpoint(task);
        let Some(clients) = self.clients_for(&settings).await else {
            if self.config.fallback_to_local {
                warn!(task = %task.id, endpoint = %settings.address,
                      "remote endpoint unreachable, falling back to local execution");
                return self.local.run_task(task, verbose).await;
            }
            let result = TaskResult::start(task.id.to_string()).failed(
                None,
                format!("remote endpoint '{}' unreachable", settings.address),
                String::new(),
                String::new(),
            );
            self.report_outcome(&result);
            return result;
        };

        match self.execute_remote(&clients, &settings, task).await {
            Ok(result) => {
                if verbose {
                    for line in result.stdout.lines() {
                        self.reporter.report(&TaskEvent::Output {
                            id: result.id.clone(),
                            line: line.to_string(),
                            is_stderr: false,
                        });
                    }
                }
                self.report_outcome(&result);
                result
            }
            Err(RemoteFailure::Infrastructure(reason)) if self.config.fallback_to_local => {
                warn!(task = %task.id, reason, "remote infrastructure failure, falling back to local");
                self.local.run_task(task, verbose).await
            }
            Err(RemoteFailure::Infrastructure(reason)) | Err(RemoteFailure::Task(reason)) => {
                let result = TaskResult::start(task.id.to_string()).failed(
                    None,
                    reason,
                    String::new(),
                    String::new(),
                );
                self.report_outcome(&result);
                result
            }
        }
    }
}

#[async_trait]
impl TaskExecutor for RemoteExecutor {
    async fn execute(
        &self,
        graph: &TaskGraph,
        plan: &ExecutionPlan,
        verbose: bool,
    ) -> ExecutionResults {
        execute_layered(
            self,
            graph,
            plan,
            &self.options,
            self.reporter.as_ref(),
            verbose,
        )
        .await
    }
}
