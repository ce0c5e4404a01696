//! Event dispatch for the gateway.
//!
//! Every invocation of the gateway arrives as a [`GatewayEvent`], dispatched
//! through one async entry point that returns a result value instead of
//! relying on implicit completion signaling.

use arkalia_client::Request;
use arkalia_core::Error;

use crate::gateway::{ControlMessage, Gateway};
use crate::strategy::GatewayResponse;

/// One invocation of the gateway.
#[derive(Debug)]
pub enum GatewayEvent {
    /// Provision and precache the current store.
    Install,
    /// Delete stale stores and begin serving.
    Activate,
    /// An intercepted network request.
    Fetch(Request),
    /// Out-of-band control message from the host.
    Message(ControlMessage),
    /// Periodic eviction sweep tick.
    Sweep,
}

/// Result of a dispatched event.
#[derive(Debug)]
pub enum EventOutcome {
    /// Lifecycle, message, or sweep event completed.
    Done,
    /// A fetch event resolved to a response.
    Response(GatewayResponse),
}

impl Gateway {
    /// Dispatch one event to its handler.
    pub async fn dispatch(&self, event: GatewayEvent) -> Result<EventOutcome, Error> {
        match event {
            GatewayEvent::Install => {
                self.install().await?;
                Ok(EventOutcome::Done)
            }
            GatewayEvent::Activate => {
                self.activate().await?;
                Ok(EventOutcome::Done)
            }
            GatewayEvent::Fetch(request) => {
                let response = self.handle(request).await?;
                Ok(EventOutcome::Response(response))
            }
            GatewayEvent::Message(message) => {
                self.on_message(message).await?;
                Ok(EventOutcome::Done)
            }
            GatewayEvent::Sweep => {
                self.cleanup().await?;
                Ok(EventOutcome::Done)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockNetwork, test_config};
    use arkalia_core::CacheDb;
    use std::sync::Arc;
    use url::Url;

    #[tokio::test]
    async fn test_dispatch_full_lifecycle() {
        let mock = Arc::new(MockNetwork::new());
        let config = test_config();
        for path in &config.precache_manifest {
            mock.respond(
                &format!("http://127.0.0.1:8000{path}"),
                200,
                Some("text/html"),
                b"<html/>".to_vec(),
            );
        }

        let db = CacheDb::open_in_memory().await.unwrap();
        let gateway = Gateway::new(config, db, mock.clone());

        assert!(matches!(gateway.dispatch(GatewayEvent::Install).await.unwrap(), EventOutcome::Done));
        assert!(matches!(gateway.dispatch(GatewayEvent::Activate).await.unwrap(), EventOutcome::Done));

        let request =
            arkalia_client::Request::navigation(Url::parse("http://127.0.0.1:8000/quick-start/").unwrap());
        let outcome = gateway.dispatch(GatewayEvent::Fetch(request)).await.unwrap();
        match outcome {
            EventOutcome::Response(response) => assert_eq!(response.status, 200),
            other => panic!("expected a response, got {other:?}"),
        }

        assert!(matches!(gateway.dispatch(GatewayEvent::Sweep).await.unwrap(), EventOutcome::Done));
    }
}
