use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// The application side of a recognition session.
///
/// Implementations are called from the read loop, never from the audio
/// thread.
pub trait SessionHost: Send + Sync {
    /// Whether the call leg behind `session_id` still exists.
    fn is_session_alive(&self, session_id: &str) -> bool;
    /// Deliver one event payload for the leg.
    fn deliver(&self, session_id: &str, payload: &str, stream_tag: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub session_id: String,
    pub payload: String,
    pub stream_tag: String,
}

/// A [`SessionHost`] that forwards deliveries onto a channel.
///
/// Sessions must be [`attach`](Self::attach)ed to count as alive.
pub struct ChannelHost {
    sender: mpsc::UnboundedSender<Delivery>,
    live: Mutex<HashSet<String>>,
}

impl ChannelHost {
    pub fn new(sender: mpsc::UnboundedSender<Delivery>) -> Self {
        Self {
            sender,
            live: Mutex::new(HashSet::new()),
        }
    }

    pub fn attach(&self, session_id: &str) {
        if let Ok(mut live) = self.live.lock() {
            live.insert(session_id.to_string());
        }
    }

    /// Mark the call leg as gone; later deliveries for it are dropped.
    pub fn hang_up(&self, session_id: &str) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(session_id);
        }
    }
}

impl SessionHost for ChannelHost {
    fn is_session_alive(&self, session_id: &str) -> bool {
        self.live
            .lock()
            .map(|live| live.contains(session_id))
            .unwrap_or(false)
    }

    fn deliver(&self, session_id: &str, payload: &str, stream_tag: &str) {
        let delivery = Delivery {
            session_id: session_id.to_string(),
            payload: payload.to_string(),
            stream_tag: stream_tag.to_string(),
        };
        if self.sender.send(delivery).is_err() {
            tracing::debug!(session_id, "delivery receiver dropped");
        }
    }
}
