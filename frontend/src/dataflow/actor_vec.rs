//! Collection Actor.
//!
//! Same contract as [`Actor`](super::Actor), backed by a `MutableVec<T>` so views
//! can render items incrementally with `items_signal_vec`.

use std::future::Future;
use std::sync::Arc;
use zoon::{MutableVec, Signal, SignalExt, SignalVec, SignalVecExt, Task, TaskHandle};

#[derive(Clone, Debug)]
pub struct ActorVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    vec: MutableVec<T>,
    #[allow(dead_code)]
    task_handle: Arc<TaskHandle>,
}

impl<T> ActorVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(initial_items: Vec<T>, processor: F) -> Self
    where
        F: FnOnce(MutableVec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let vec = MutableVec::new_with_values(initial_items);
        let task_handle = Arc::new(Task::start_droppable(processor(vec.clone())));
        Self { vec, task_handle }
    }

    pub fn signal_vec(&self) -> impl SignalVec<Item = T> {
        self.vec.signal_vec_cloned()
    }

    pub fn len_signal(&self) -> impl Signal<Item = usize> {
        self.vec.signal_vec_cloned().len().dedupe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::relay;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_actor_vec_push_and_retain() {
        let (added_relay, mut added_stream) = relay::<u32>();

        let items = ActorVec::new(vec![], async move |items| {
            while let Some(item) = added_stream.next().await {
                let mut items = items.lock_mut();
                items.retain(|existing| *existing != item);
                items.push_cloned(item);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        added_relay.send(1);
        added_relay.send(2);
        added_relay.send(1);
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        let len = items.len_signal().to_stream().next().await.unwrap();
        assert_eq!(len, 2);
        let collected = items.signal_vec().to_signal_cloned().to_stream().next().await.unwrap();
        assert_eq!(collected, vec![2, 1]);
    }
}
