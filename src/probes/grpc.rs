//! gRPC keyword driver (§4.5, REDESIGN FLAG in §9/§11) — calls a unary
//! method with a raw byte payload and scans the raw response bytes for a
//! keyword, rather than decoding it through `.proto`-derived types. Full
//! dynamic reflection would need `prost-reflect` plus the server's
//! descriptor set, which isn't always available; a raw-bytes codec over
//! `tonic`'s generic `Client` gets the same "is the service alive and
//! saying the right thing" signal without that dependency.

use async_trait::async_trait;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::Status as GrpcStatus;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

#[derive(Debug, Clone, Default)]
struct RawBytesCodec;

impl Codec for RawBytesCodec {
    type Encode = Vec<u8>;
    type Decode = Vec<u8>;
    type Encoder = RawBytesCodec;
    type Decoder = RawBytesCodec;

    fn encoder(&mut self) -> Self::Encoder {
        RawBytesCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawBytesCodec
    }
}

impl Encoder for RawBytesCodec {
    type Item = Vec<u8>;
    type Error = GrpcStatus;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put_slice(&item);
        Ok(())
    }
}

impl Decoder for RawBytesCodec {
    type Item = Vec<u8>;
    type Error = GrpcStatus;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let len = src.remaining();
        let mut buf = vec![0u8; len];
        src.copy_to_slice(&mut buf);
        Ok(Some(buf))
    }
}

pub struct GrpcKeywordDriver;

#[async_trait]
impl ProbeDriver for GrpcKeywordDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::GrpcKeyword(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a grpc probe".into()));
        };

        let scheme = if config.tls { "https" } else { "http" };
        let endpoint = tonic::transport::Endpoint::from_shared(format!("{scheme}://{}:{}", config.host, config.port))
            .map_err(|e| CoreError::Config(e.to_string()))?
            .timeout(ctx.timeout);

        let channel = tokio::time::timeout(ctx.timeout, endpoint.connect())
            .await
            .map_err(|_| CoreError::Cancelled(ctx.timeout.as_secs_f64()))?
            .map_err(|e| CoreError::Network(e.to_string()))?;

        let path = tonic::codegen::http::uri::PathAndQuery::from_maybe_shared(config.method.clone().into_bytes())
            .map_err(|e| CoreError::Config(e.to_string()))?;
        let mut client = tonic::client::Grpc::new(channel);
        client.ready().await.map_err(|e| CoreError::Network(e.to_string()))?;

        let request = tonic::Request::new(config.request_bytes.clone());
        let response = client
            .unary(request, path, RawBytesCodec)
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;

        let body = response.into_inner();
        let text = String::from_utf8_lossy(&body);
        let found = text.contains(&config.keyword);
        let passed = found != config.invert_keyword;

        if passed {
            Ok(ProbeOutcome::up(format!("keyword \"{}\" {}", config.keyword, if found { "found" } else { "not found, as expected" })))
        } else {
            Ok(ProbeOutcome::down(format!("keyword \"{}\" {}", config.keyword, if found { "found but expected absent" } else { "not found" })))
        }
    }
}
