use link_cache::{MediaLink, Stream, Subtitle};
use tokio::sync::mpsc;
use tracing::trace;

/// Producer side of an extraction: every pushed link is delivered to the
/// consumer in order. Dropping all sinks ends the consumer's stream.
#[derive(Debug, Clone)]
pub struct LinkSink {
    tx: mpsc::Sender<MediaLink>,
}

/// Creates a bounded link channel. A full channel makes producers wait for
/// the consumer instead of growing without limit.
pub fn link_channel(capacity: usize) -> (LinkSink, mpsc::Receiver<MediaLink>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LinkSink { tx }, rx)
}

impl LinkSink {
    /// Returns `false` once the consumer is gone, e.g. after cancellation.
    pub async fn send(&self, link: MediaLink) -> bool {
        let delivered = self.tx.send(link).await.is_ok();
        if !delivered {
            trace!("link consumer closed, dropping link");
        }
        delivered
    }

    pub async fn stream(&self, stream: Stream) -> bool {
        self.send(MediaLink::Stream(stream)).await
    }

    pub async fn subtitle(&self, subtitle: Subtitle) -> bool {
        self.send(MediaLink::Subtitle(subtitle)).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
