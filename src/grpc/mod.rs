//! gRPC over streams: message framing, headers and the gRPC stream surface.

pub mod client;
pub mod codec;
pub mod headers;

pub use client::{GrpcClient, GrpcStream, GrpcStreamPrototype};
pub use codec::{encode_message, GrpcCodecError, GrpcMessageDecoder, GRPC_PREFIX_LENGTH};
pub use headers::{grpc_message, grpc_status, GrpcRequestHeadersBuilder};
