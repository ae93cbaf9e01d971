use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use vantage_gateway::{EventStream, GatewayEvent};

const FORWARD_CAPACITY: usize = 256;

/// Spawn a background task that reads a gateway subscription and forwards
/// the items matched by `extract` into a freshly returned stream (spec
/// §4.2: "Stream methods spawn one background task per subscription").
///
/// The task exits as soon as the returned stream is dropped: the forwarding
/// channel's `Sender::closed` future resolves the instant the `Receiver`
/// side is gone, so teardown does not wait for the next upstream item.
pub fn spawn_forwarder<T: Send + 'static>(
    mut upstream: EventStream,
    mut extract: impl FnMut(GatewayEvent) -> Option<T> + Send + 'static,
) -> BoxStream<'static, T> {
    let (tx, rx) = mpsc::channel(FORWARD_CAPACITY);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = tx.closed() => break,
                next = upstream.next() => {
                    let Some(event) = next else { break };
                    if let Some(item) = extract(event) {
                        if tx.send(item).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });
    ReceiverStream::new(rx).boxed()
}
