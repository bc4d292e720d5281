//! Executes one encoded request and interprets the reply

use crate::client::encoder::WireRequest;
use crate::client::transport::{Transport, WireResponse};
use crate::common::{Error, Result, Value};
use reqwest::StatusCode;
use std::sync::Arc;

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Run a read; the body of a 200 reply is the value.
    pub async fn execute_read(&self, request: &WireRequest) -> Result<Value> {
        let resp = self.execute(request).await?;
        Ok(resp.body)
    }

    /// Run a write; a 200 reply is the acknowledgement.
    pub async fn execute_write(&self, request: &WireRequest) -> Result<()> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, request: &WireRequest) -> Result<WireResponse> {
        let resp = match self.transport.round_trip(request).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!("{}", e);
                tracing::error!("{:?}", request.dump());
                tracing::error!("{}", request.url);
                return Err(e);
            }
        };

        tracing::debug!(status = %resp.status, url = %request.url, "{:?}", resp.dump());

        if resp.status != StatusCode::OK {
            tracing::error!(
                "{} {} returned {}: {:?}",
                request.method,
                request.url,
                resp.status,
                resp.dump()
            );
            return Err(Error::Status {
                url: request.url.clone(),
                status: resp.status.as_u16(),
            });
        }

        Ok(resp)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
