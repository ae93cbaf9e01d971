use crate::service::GatewayService;
use crate::transport::{EventStream, GatewayRequest, GatewayResponse, GatewayTransport, SubscribeRequest};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use vantage_execution::exchange::Exchange;

type CallEnvelope = (GatewayRequest, oneshot::Sender<Result<GatewayResponse, tonic::Status>>);
type SubscribeEnvelope = (SubscribeRequest, oneshot::Sender<Result<EventStream, tonic::Status>>);

/// The one concrete [`GatewayTransport`] this repo ships: an in-process
/// handle backed by `tokio::mpsc`, so a `trader` binary can talk to a
/// `gateway` binary's [`GatewayService`] in the same process (a single
/// combined binary, or tests) without a protobuf schema.
#[derive(Clone)]
pub struct ChannelTransport {
    calls: mpsc::UnboundedSender<CallEnvelope>,
    subscriptions: mpsc::UnboundedSender<SubscribeEnvelope>,
}

impl std::fmt::Debug for ChannelTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTransport").finish_non_exhaustive()
    }
}

impl ChannelTransport {
    /// Spawn the dispatch loops that serve `service` over this handle. Each
    /// inbound request is handled on its own task so one slow unary call
    /// cannot stall another client's request.
    pub fn serve<E: Exchange>(service: GatewayService<E>) -> Self {
        let (call_tx, mut call_rx) = mpsc::unbounded_channel::<CallEnvelope>();
        let (sub_tx, mut sub_rx) = mpsc::unbounded_channel::<SubscribeEnvelope>();

        let call_service = service.clone();
        tokio::spawn(async move {
            while let Some((request, reply)) = call_rx.recv().await {
                let service = call_service.clone();
                tokio::spawn(async move {
                    let _ = reply.send(service.call(request).await);
                });
            }
        });

        tokio::spawn(async move {
            while let Some((request, reply)) = sub_rx.recv().await {
                let service = service.clone();
                tokio::spawn(async move {
                    let _ = reply.send(service.subscribe(request).await);
                });
            }
        });

        Self { calls: call_tx, subscriptions: sub_tx }
    }
}

impl GatewayTransport for ChannelTransport {
    fn call(&self, request: GatewayRequest) -> impl Future<Output = Result<GatewayResponse, tonic::Status>> + Send {
        let calls = self.calls.clone();
        async move {
            let (reply_tx, reply_rx) = oneshot::channel();
            calls
                .send((request, reply_tx))
                .map_err(|_| tonic::Status::unavailable("gateway service is no longer running"))?;
            reply_rx.await.map_err(|_| tonic::Status::unavailable("gateway service dropped the request"))?
        }
    }

    fn subscribe(&self, request: SubscribeRequest) -> impl Future<Output = Result<EventStream, tonic::Status>> + Send {
        let subscriptions = self.subscriptions.clone();
        async move {
            let (reply_tx, reply_rx) = oneshot::channel();
            subscriptions
                .send((request, reply_tx))
                .map_err(|_| tonic::Status::unavailable("gateway service is no longer running"))?;
            reply_rx.await.map_err(|_| tonic::Status::unavailable("gateway service dropped the request"))?
        }
    }
}
