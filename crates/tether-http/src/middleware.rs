//! Ordered request/response middleware.

use std::sync::Arc;

use async_trait::async_trait;

use tether_core::Result;

use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;

/// One step of the request pipeline.
///
/// A middleware may edit the request, decide not to call `next`, call it
/// once, or call it again to replay. The request is passed by `&mut` so
/// outer layers can see what inner layers attached.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: &mut ApiRequest, next: Next<'_>) -> Result<ApiResponse>;
}

/// The rest of the chain after the current middleware.
///
/// `Next` is `Copy`: running it twice replays the request through every
/// remaining layer.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub fn new(middleware: &'a [Arc<dyn Middleware>], transport: &'a dyn Transport) -> Self {
        Self {
            middleware,
            transport,
        }
    }

    /// Pass the request to the next layer, or to the transport at the end.
    pub async fn run(self, request: &mut ApiRequest) -> Result<ApiResponse> {
        match self.middleware.split_first() {
            Some((current, rest)) => {
                current
                    .handle(request, Next::new(rest, self.transport))
                    .await
            }
            None => self.transport.send(request).await,
        }
    }
}
