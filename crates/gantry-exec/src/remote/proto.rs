//! Remote Execution API v2 protocol bindings
//!
//! Hand-maintained prost message definitions and tonic client stubs for the
//! subset of the `build.bazel.remote.execution.v2` surface the remote
//! executor uses, plus the `google.longrunning` and `google.rpc` types it
//! touches. Kept in step with the published remote-apis protos and checked
//! in so the build needs no protoc.

/// google.rpc
pub mod rpc {
    /// The canonical RPC status message
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Status {
        #[prost(int32, tag = "1")]
        pub code: i32,
        #[prost(string, tag = "2")]
        pub message: String,
        #[prost(message, repeated, tag = "3")]
        pub details: Vec<::prost_types::Any>,
    }
}

/// google.protobuf.Empty (not re-exported by the pinned prost-types version)
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Empty {}

/// google.longrunning
pub mod longrunning {
    /// A long-running operation returned by Execution.Execute
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Operation {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(message, optional, tag = "2")]
        pub metadata: Option<::prost_types::Any>,
        #[prost(bool, tag = "3")]
        pub done: bool,
        #[prost(oneof = "operation::Result", tags = "4, 5")]
        pub result: Option<operation::Result>,
    }

    /// Nested types for [`Operation`]
    pub mod operation {
        /// Terminal outcome of the operation
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            /// The operation failed
            #[prost(message, tag = "4")]
            Error(super::super::rpc::Status),
            /// The operation succeeded; holds an ExecuteResponse
            #[prost(message, tag = "5")]
            Response(::prost_types::Any),
        }
    }

    /// Request for Operations.CancelOperation
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CancelOperationRequest {
        #[prost(string, tag = "1")]
        pub name: String,
    }

    /// Client for google.longrunning.Operations
    pub mod operations_client {
        #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
        use tonic::codegen::*;

        #[derive(Debug, Clone)]
        pub struct OperationsClient<T> {
            inner: tonic::client::Grpc<T>,
        }

        impl OperationsClient<tonic::transport::Channel> {
            /// Attempt to create a new client by connecting to a given endpoint.
            pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
            where
                D: TryInto<tonic::transport::Endpoint>,
                D::Error: Into<StdError>,
            {
                let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
                Ok(Self::new(conn))
            }
        }

        impl<T> OperationsClient<T>
        where
            T: tonic::client::GrpcService<tonic::body::BoxBody>,
            T::Error: Into<StdError>,
            T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
            <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
        {
            pub fn new(inner: T) -> Self {
                let inner = tonic::client::Grpc::new(inner);
                Self { inner }
            }

            pub async fn cancel_operation(
                &mut self,
                request: impl tonic::IntoRequest<super::CancelOperationRequest>,
            ) -> std::result::Result<tonic::Response<super::super::Empty>, tonic::Status>
            {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/google.longrunning.Operations/CancelOperation",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "google.longrunning.Operations",
                    "CancelOperation",
                ));
                self.inner.unary(req, path, codec).await
            }
        }
    }
}

/// build.bazel.remote.execution.v2
pub mod rev2 {
    /// A content digest: lowercase SHA-256 hex plus the blob size
    #[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
    pub struct Digest {
        #[prost(string, tag = "1")]
        pub hash: String,
        #[prost(int64, tag = "2")]
        pub size_bytes: i64,
    }

    /// An executable action: the command, its input root, and caching policy
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Action {
        #[prost(message, optional, tag = "1")]
        pub command_digest: Option<Digest>,
        #[prost(message, optional, tag = "2")]
        pub input_root_digest: Option<Digest>,
        #[prost(message, optional, tag = "6")]
        pub timeout: Option<::prost_types::Duration>,
        #[prost(bool, tag = "7")]
        pub do_not_cache: bool,
        #[prost(bytes = "vec", tag = "9")]
        pub salt: Vec<u8>,
        #[prost(message, optional, tag = "10")]
        pub platform: Option<Platform>,
    }

    /// The command to run and its declared outputs
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Command {
        #[prost(string, repeated, tag = "1")]
        pub arguments: Vec<String>,
        #[prost(message, repeated, tag = "2")]
        pub environment_variables: Vec<EnvironmentVariable>,
        #[prost(string, repeated, tag = "3")]
        pub output_files: Vec<String>,
        #[prost(string, repeated, tag = "4")]
        pub output_directories: Vec<String>,
        #[prost(message, optional, tag = "5")]
        pub platform: Option<Platform>,
        #[prost(string, tag = "6")]
        pub working_directory: String,
        #[prost(string, repeated, tag = "7")]
        pub output_paths: Vec<String>,
    }

    /// One environment variable
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct EnvironmentVariable {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub value: String,
    }

    /// Worker platform requirements
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Platform {
        #[prost(message, repeated, tag = "1")]
        pub properties: Vec<PlatformProperty>,
    }

    /// One platform property (name sorted before value per spec)
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PlatformProperty {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub value: String,
    }

    /// A directory node in the input Merkle tree
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Directory {
        #[prost(message, repeated, tag = "1")]
        pub files: Vec<FileNode>,
        #[prost(message, repeated, tag = "2")]
        pub directories: Vec<DirectoryNode>,
        #[prost(message, repeated, tag = "3")]
        pub symlinks: Vec<SymlinkNode>,
    }

    /// A file entry
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FileNode {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(message, optional, tag = "2")]
        pub digest: Option<Digest>,
        #[prost(bool, tag = "4")]
        pub is_executable: bool,
    }

    /// A subdirectory entry referencing its Directory message by digest
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DirectoryNode {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(message, optional, tag = "2")]
        pub digest: Option<Digest>,
    }

    /// A symlink entry
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SymlinkNode {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub target: String,
    }

    /// The result of executing an action
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ActionResult {
        #[prost(message, repeated, tag = "2")]
        pub output_files: Vec<OutputFile>,
        #[prost(message, repeated, tag = "3")]
        pub output_directories: Vec<OutputDirectory>,
        #[prost(int32, tag = "4")]
        pub exit_code: i32,
        #[prost(bytes = "vec", tag = "5")]
        pub stdout_raw: Vec<u8>,
        #[prost(message, optional, tag = "6")]
        pub stdout_digest: Option<Digest>,
        #[prost(bytes = "vec", tag = "7")]
        pub stderr_raw: Vec<u8>,
        #[prost(message, optional, tag = "8")]
        pub stderr_digest: Option<Digest>,
        #[prost(message, optional, tag = "9")]
        pub execution_metadata: Option<ExecutedActionMetadata>,
    }

    /// Metadata about where and when the action executed
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExecutedActionMetadata {
        #[prost(string, tag = "1")]
        pub worker: String,
    }

    /// An output file produced by the action
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct OutputFile {
        #[prost(string, tag = "1")]
        pub path: String,
        #[prost(message, optional, tag = "2")]
        pub digest: Option<Digest>,
        #[prost(bool, tag = "4")]
        pub is_executable: bool,
    }

    /// An output directory, referenced through its Tree digest
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct OutputDirectory {
        #[prost(string, tag = "1")]
        pub path: String,
        #[prost(message, optional, tag = "3")]
        pub tree_digest: Option<Digest>,
    }

    /// Request for Execution.Execute
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExecuteRequest {
        #[prost(string, tag = "1")]
        pub instance_name: String,
        #[prost(bool, tag = "3")]
        pub skip_cache_lookup: bool,
        #[prost(message, optional, tag = "6")]
        pub action_digest: Option<Digest>,
    }

    /// Terminal payload of a successful execute Operation
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExecuteResponse {
        #[prost(message, optional, tag = "1")]
        pub result: Option<ActionResult>,
        #[prost(bool, tag = "2")]
        pub cached_result: bool,
        #[prost(message, optional, tag = "3")]
        pub status: Option<super::rpc::Status>,
        #[prost(string, tag = "5")]
        pub message: String,
    }

    /// Execution progress stage
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum ExecutionStage {
        Unknown = 0,
        CacheCheck = 1,
        Queued = 2,
        Executing = 3,
        Completed = 4,
    }

    /// Metadata attached to an execute Operation
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExecuteOperationMetadata {
        #[prost(enumeration = "ExecutionStage", tag = "1")]
        pub stage: i32,
        #[prost(message, optional, tag = "2")]
        pub action_digest: Option<Digest>,
    }

    /// Request for Execution.WaitExecution
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WaitExecutionRequest {
        #[prost(string, tag = "1")]
        pub name: String,
    }

    /// Request for ActionCache.GetActionResult
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetActionResultRequest {
        #[prost(string, tag = "1")]
        pub instance_name: String,
        #[prost(message, optional, tag = "2")]
        pub action_digest: Option<Digest>,
        #[prost(bool, tag = "3")]
        pub inline_stdout: bool,
        #[prost(bool, tag = "4")]
        pub inline_stderr: bool,
    }

    /// Request for ActionCache.UpdateActionResult
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct UpdateActionResultRequest {
        #[prost(string, tag = "1")]
        pub instance_name: String,
        #[prost(message, optional, tag = "2")]
        pub action_digest: Option<Digest>,
        #[prost(message, optional, tag = "3")]
        pub action_result: Option<ActionResult>,
    }

    /// Request for ContentAddressableStorage.FindMissingBlobs
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FindMissingBlobsRequest {
        #[prost(string, tag = "1")]
        pub instance_name: String,
        #[prost(message, repeated, tag = "2")]
        pub blob_digests: Vec<Digest>,
    }

    /// Response for ContentAddressableStorage.FindMissingBlobs
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FindMissingBlobsResponse {
        #[prost(message, repeated, tag = "2")]
        pub missing_blob_digests: Vec<Digest>,
    }

    /// Request for ContentAddressableStorage.BatchUpdateBlobs
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchUpdateBlobsRequest {
        #[prost(string, tag = "1")]
        pub instance_name: String,
        #[prost(message, repeated, tag = "2")]
        pub requests: Vec<batch_update_blobs_request::Request>,
    }

    /// Nested types for [`BatchUpdateBlobsRequest`]
    pub mod batch_update_blobs_request {
        /// One blob upload
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Request {
            #[prost(message, optional, tag = "1")]
            pub digest: Option<super::Digest>,
            #[prost(bytes = "vec", tag = "2")]
            pub data: Vec<u8>,
        }
    }

    /// Response for ContentAddressableStorage.BatchUpdateBlobs
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchUpdateBlobsResponse {
        #[prost(message, repeated, tag = "1")]
        pub responses: Vec<batch_update_blobs_response::Response>,
    }

    /// Nested types for [`BatchUpdateBlobsResponse`]
    pub mod batch_update_blobs_response {
        /// Per-blob upload status
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Response {
            #[prost(message, optional, tag = "1")]
            pub digest: Option<super::Digest>,
            #[prost(message, optional, tag = "2")]
            pub status: Option<super::super::rpc::Status>,
        }
    }

    /// Request for ContentAddressableStorage.BatchReadBlobs
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchReadBlobsRequest {
        #[prost(string, tag = "1")]
        pub instance_name: String,
        #[prost(message, repeated, tag = "2")]
        pub digests: Vec<Digest>,
    }

    /// Response for ContentAddressableStorage.BatchReadBlobs
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchReadBlobsResponse {
        #[prost(message, repeated, tag = "1")]
        pub responses: Vec<batch_read_blobs_response::Response>,
    }

    /// Nested types for [`BatchReadBlobsResponse`]
    pub mod batch_read_blobs_response {
        /// Per-blob contents
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Response {
            #[prost(message, optional, tag = "1")]
            pub digest: Option<super::Digest>,
            #[prost(bytes = "vec", tag = "2")]
            pub data: Vec<u8>,
            #[prost(message, optional, tag = "3")]
            pub status: Option<super::super::rpc::Status>,
        }
    }

    /// Request for Capabilities.GetCapabilities
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetCapabilitiesRequest {
        #[prost(string, tag = "1")]
        pub instance_name: String,
    }

    /// Digest function identifiers
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum DigestFunction {
        Unknown = 0,
        Sha256 = 1,
        Sha1 = 2,
        Md5 = 3,
    }

    /// Server capability advertisement
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ServerCapabilities {
        #[prost(message, optional, tag = "1")]
        pub cache_capabilities: Option<CacheCapabilities>,
        #[prost(message, optional, tag = "2")]
        pub execution_capabilities: Option<ExecutionCapabilities>,
    }

    /// CAS / ActionCache capabilities
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CacheCapabilities {
        #[prost(enumeration = "DigestFunction", repeated, tag = "1")]
        pub digest_functions: Vec<i32>,
        #[prost(int64, tag = "4")]
        pub max_batch_total_size_bytes: i64,
    }

    /// Execution service capabilities
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExecutionCapabilities {
        #[prost(enumeration = "DigestFunction", tag = "1")]
        pub digest_function: i32,
        #[prost(bool, tag = "2")]
        pub exec_enabled: bool,
    }

    /// Client for build.bazel.remote.execution.v2.Execution
    pub mod execution_client {
        #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
        use tonic::codegen::*;

        #[derive(Debug, Clone)]
        pub struct ExecutionClient<T> {
            inner: tonic::client::Grpc<T>,
        }

        impl ExecutionClient<tonic::transport::Channel> {
            /// Attempt to create a new client by connecting to a given endpoint.
            pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
            where
                D: TryInto<tonic::transport::Endpoint>,
                D::Error: Into<StdError>,
            {
                let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
                Ok(Self::new(conn))
            }
        }

        impl<T> ExecutionClient<T>
        where
            T: tonic::client::GrpcService<tonic::body::BoxBody>,
            T::Error: Into<StdError>,
            T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
            <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
        {
            pub fn new(inner: T) -> Self {
                let inner = tonic::client::Grpc::new(inner);
                Self { inner }
            }

            pub async fn execute(
                &mut self,
                request: impl tonic::IntoRequest<super::ExecuteRequest>,
            ) -> std::result::Result<
                tonic::Response<
                    tonic::codec::Streaming<super::super::longrunning::Operation>,
                >,
                tonic::Status,
            > {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.Execution/Execute",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "build.bazel.remote.execution.v2.Execution",
                    "Execute",
                ));
                self.inner.server_streaming(req, path, codec).await
            }

            pub async fn wait_execution(
                &mut self,
                request: impl tonic::IntoRequest<super::WaitExecutionRequest>,
            ) -> std::result::Result<
                tonic::Response<
                    tonic::codec::Streaming<super::super::longrunning::Operation>,
                >,
                tonic::Status,
            > {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.Execution/WaitExecution",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "build.bazel.remote.execution.v2.Execution",
                    "WaitExecution",
                ));
                self.inner.server_streaming(req, path, codec).await
            }
        }
    }

    /// Client for build.bazel.remote.execution.v2.ActionCache
    pub mod action_cache_client {
        #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
        use tonic::codegen::*;

        #[derive(Debug, Clone)]
        pub struct ActionCacheClient<T> {
            inner: tonic::client::Grpc<T>,
        }

        impl ActionCacheClient<tonic::transport::Channel> {
            /// Attempt to create a new client by connecting to a given endpoint.
            pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
            where
                D: TryInto<tonic::transport::Endpoint>,
                D::Error: Into<StdError>,
            {
                let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
                Ok(Self::new(conn))
            }
        }

        impl<T> ActionCacheClient<T>
        where
            T: tonic::client::GrpcService<tonic::body::BoxBody>,
            T::Error: Into<StdError>,
            T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
            <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
        {
            pub fn new(inner: T) -> Self {
                let inner = tonic::client::Grpc::new(inner);
                Self { inner }
            }

            pub async fn get_action_result(
                &mut self,
                request: impl tonic::IntoRequest<super::GetActionResultRequest>,
            ) -> std::result::Result<tonic::Response<super::ActionResult>, tonic::Status>
            {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.ActionCache/GetActionResult",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "build.bazel.remote.execution.v2.ActionCache",
                    "GetActionResult",
                ));
                self.inner.unary(req, path, codec).await
            }

            pub async fn update_action_result(
                &mut self,
                request: impl tonic::IntoRequest<super::UpdateActionResultRequest>,
            ) -> std::result::Result<tonic::Response<super::ActionResult>, tonic::Status>
            {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.ActionCache/UpdateActionResult",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "build.bazel.remote.execution.v2.ActionCache",
                    "UpdateActionResult",
                ));
                self.inner.unary(req, path, codec).await
            }
        }
    }

    /// Client for build.bazel.remote.execution.v2.ContentAddressableStorage
    pub mod content_addressable_storage_client {
        #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
        use tonic::codegen::*;

        #[derive(Debug, Clone)]
        pub struct ContentAddressableStorageClient<T> {
            inner: tonic::client::Grpc<T>,
        }

        impl ContentAddressableStorageClient<tonic::transport::Channel> {
            /// Attempt to create a new client by connecting to a given endpoint.
            pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
            where
                D: TryInto<tonic::transport::Endpoint>,
                D::Error: Into<StdError>,
            {
                let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
                Ok(Self::new(conn))
            }
        }

        impl<T> ContentAddressableStorageClient<T>
        where
            T: tonic::client::GrpcService<tonic::body::BoxBody>,
            T::Error: Into<StdError>,
            T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
            <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
        {
            pub fn new(inner: T) -> Self {
                let inner = tonic::client::Grpc::new(inner);
                Self { inner }
            }

            pub async fn find_missing_blobs(
                &mut self,
                request: impl tonic::IntoRequest<super::FindMissingBlobsRequest>,
            ) -> std::result::Result<
                tonic::Response<super::FindMissingBlobsResponse>,
                tonic::Status,
            > {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.ContentAddressableStorage/FindMissingBlobs",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "build.bazel.remote.execution.v2.ContentAddressableStorage",
                    "FindMissingBlobs",
                ));
                self.inner.unary(req, path, codec).await
            }

            pub async fn batch_update_blobs(
                &mut self,
                request: impl tonic::IntoRequest<super::BatchUpdateBlobsRequest>,
            ) -> std::result::Result<
                tonic::Response<super::BatchUpdateBlobsResponse>,
                tonic::Status,
            > {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.ContentAddressableStorage/BatchUpdateBlobs",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "build.bazel.remote.execution.v2.ContentAddressableStorage",
                    "BatchUpdateBlobs",
                ));
                self.inner.unary(req, path, codec).await
            }

            pub async fn batch_read_blobs(
                &mut self,
                request: impl tonic::IntoRequest<super::BatchReadBlobsRequest>,
            ) -> std::result::Result<
                tonic::Response<super::BatchReadBlobsResponse>,
                tonic::Status,
            > {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.ContentAddressableStorage/BatchReadBlobs",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "build.bazel.remote.execution.v2.ContentAddressableStorage",
                    "BatchReadBlobs",
                ));
                self.inner.unary(req, path, codec).await
            }
        }
    }

    /// Client for build.bazel.remote.execution.v2.Capabilities
    pub mod capabilities_client {
        #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
        use tonic::codegen::*;

        #[derive(Debug, Clone)]
        pub struct CapabilitiesClient<T> {
            inner: tonic::client::Grpc<T>,
        }

        impl CapabilitiesClient<tonic::transport::Channel> {
            /// Attempt to create a new client by connecting to a given endpoint.
            pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
            where
                D: TryInto<tonic::transport::Endpoint>,
                D::Error: Into<StdError>,
            {
                let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
                Ok(Self::new(conn))
            }
        }

        impl<T> CapabilitiesClient<T>
        where
            T: tonic::client::GrpcService<tonic::body::BoxBody>,
            T::Error: Into<StdError>,
            T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
            <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
        {
            pub fn new(inner: T) -> Self {
                let inner = tonic::client::Grpc::new(inner);
                Self { inner }
            }

            pub async fn get_capabilities(
                &mut self,
                request: impl tonic::IntoRequest<super::GetCapabilitiesRequest>,
            ) -> std::result::Result<tonic::Response<super::ServerCapabilities>, tonic::Status>
            {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/build.bazel.remote.execution.v2.Capabilities/GetCapabilities",
                );
                let mut req = request.into_request();
                req.extensions_mut().insert(GrpcMethod::new(
                    "build.bazel.remote.execution.v2.Capabilities",
                    "GetCapabilities",
                ));
                self.inner.unary(req, path, codec).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::rev2::*;
    use prost::Message;

    #[test]
    fn test_digest_round_trip() {
        let digest = Digest {
            hash: "a".repeat(64),
            size_bytes: 42,
        };
        let bytes = digest.encode_to_vec();
        let decoded = Digest::decode(bytes.as_slice()).unwrap();
        assert_eq!(digest, decoded);
    }

    #[test]
    fn test_execute_response_via_any() {
        let response = ExecuteResponse {
            result: Some(ActionResult {
                exit_code: 0,
                stdout_raw: b"ok".to_vec(),
                ..Default::default()
            }),
            cached_result: true,
            status: None,
            message: String::new(),
        };

        let any = prost_types::Any {
            type_url: "type.googleapis.com/build.bazel.remote.execution.v2.ExecuteResponse"
                .to_string(),
            value: response.encode_to_vec(),
        };

        let decoded = ExecuteResponse::decode(any.value.as_slice()).unwrap();
        assert!(decoded.cached_result);
        assert_eq!(decoded.result.unwrap().stdout_raw, b"ok");
    }

    #[test]
    fn test_operation_oneof() {
        use super::longrunning::{operation, Operation};

        let op = Operation {
            name: "operations/123".to_string(),
            metadata: None,
            done: true,
            result: Some(operation::Result::Error(super::rpc::Status {
                code: 14,
                message: "unavailable".to_string(),
                details: Vec::new(),
            })),
        };

        let bytes = op.encode_to_vec();
        let decoded = Operation::decode(bytes.as_slice()).unwrap();
        assert!(decoded.done);
        match decoded.result.unwrap() {
            operation::Result::Error(status) => assert_eq!(status.code, 14),
            operation::Result::Response(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        // An ActionResult with fields this binding does not model (e.g.
        // output symlinks, tag 12) must still decode.
        let mut bytes = ActionResult {
            exit_code: 7,
            ..Default::default()
        }
        .encode_to_vec();
        // tag 12, wire type 2 (length-delimited), 3 bytes payload
        bytes.extend_from_slice(&[0x62, 0x03, 0x01, 0x02, 0x03]);

        let decoded = ActionResult::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.exit_code, 7);
    }
}
