//! Single-value Actor for reactive state.
//!
//! The processor future owns whatever the domain needs (controllers, relay
//! streams) and publishes into the actor's `Mutable<T>`. Views only read
//! through signals.

use std::future::Future;
use std::sync::Arc;
use zoon::{Mutable, Signal, Task, TaskHandle};

#[derive(Clone, Debug)]
pub struct Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    state: Mutable<T>,
    #[allow(dead_code)]
    task_handle: Arc<TaskHandle>,
}

impl<T> Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(initial_state: T, processor: F) -> Self
    where
        F: FnOnce(Mutable<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let state = Mutable::new(initial_state);
        let task_handle = Arc::new(Task::start_droppable(processor(state.clone())));
        Self { state, task_handle }
    }

    pub fn signal(&self) -> impl Signal<Item = T> {
        self.state.signal_cloned()
    }

    pub fn signal_ref<U>(&self, f: impl Fn(&T) -> U + Send + Sync + 'static) -> impl Signal<Item = U>
    where
        U: PartialEq + Send + Sync + 'static,
    {
        self.state.signal_ref(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::relay;
    use futures::{StreamExt, select};
    use zoon::SignalExt;

    #[tokio::test]
    async fn test_actor_applies_events_in_order() {
        let (append_relay, mut append_stream) = relay();

        let actor = Actor::new(String::new(), async move |state| {
            while let Some(part) = append_stream.next().await {
                state.lock_mut().push_str(part);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        append_relay.send("ab");
        append_relay.send("cd");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        let value = actor.signal().to_stream().next().await.unwrap();
        assert_eq!(value, "abcd");
    }

    #[tokio::test]
    async fn test_actor_owns_non_clone_state() {
        let (toggle_relay, mut toggle_stream) = relay::<String>();
        let (clear_relay, mut clear_stream) = relay::<()>();

        let selected_count = Actor::new(0usize, async move |count| {
            let mut selection = shared::selection::SelectionStore::new();
            loop {
                select! {
                    Some(name) = toggle_stream.next() => {
                        selection.toggle(&name);
                    }
                    Some(()) = clear_stream.next() => {
                        selection.clear();
                    }
                    complete => break,
                }
                count.set_neq(selection.count());
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        toggle_relay.send("temp".to_string());
        toggle_relay.send("pressure".to_string());
        toggle_relay.send("temp".to_string());
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        let count = selected_count.signal_ref(|count| *count).to_stream().next().await.unwrap();
        assert_eq!(count, 1);

        clear_relay.send(());
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        let count = selected_count.signal().to_stream().next().await.unwrap();
        assert_eq!(count, 0);
    }
}
