//! Event streaming for the Actor+Relay architecture.
//!
//! A Relay is the sending half of an unbounded channel. Views and other domains
//! hold clones of the relay; exactly one actor owns the receiving stream.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

#[derive(Clone, Debug)]
pub struct Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    sender: UnboundedSender<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    ChannelClosed,
}

impl<T> Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        (Relay { sender }, receiver)
    }

    /// Events sent after the owning actor is gone are dropped.
    pub fn send(&self, value: T) {
        let _ = self.sender.unbounded_send(value);
    }

    pub fn try_send(&self, value: T) -> Result<(), RelayError> {
        self.sender
            .unbounded_send(value)
            .map_err(|_| RelayError::ChannelClosed)
    }
}

impl<T> Default for Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        let (relay, _receiver) = Self::new();
        relay
    }
}

pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    Relay::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_relay_delivers_in_order() {
        let (relay, mut stream) = relay::<u32>();

        relay.send(1);
        relay.send(2);

        assert_eq!(stream.next().await, Some(1));
        assert_eq!(stream.next().await, Some(2));
    }

    #[tokio::test]
    async fn test_relay_clones_share_the_stream() {
        let (relay, mut stream) = relay::<String>();
        let from_view = relay.clone();

        relay.send("domain".to_string());
        from_view.send("view".to_string());

        assert_eq!(stream.next().await, Some("domain".to_string()));
        assert_eq!(stream.next().await, Some("view".to_string()));
    }

    #[tokio::test]
    async fn test_relay_try_send_after_drop() {
        let (relay, stream) = Relay::<&'static str>::new();
        assert!(relay.try_send("open").is_ok());

        drop(stream);

        assert_eq!(relay.try_send("late"), Err(RelayError::ChannelClosed));
        relay.send("ignored");
    }
}
