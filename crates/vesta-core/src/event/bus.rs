// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


/// A typed, multi-producer event channel.
///
/// Producers (window systems, test injectors) hold cloned senders; the owner
/// drains the receiver synchronously, so events are delivered on the thread
/// that polls.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a new EventBus with an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Sends an event, logging an error if the receiver is disconnected.
    ///
    /// ## Arguments
    /// * `event` - The event to be queued.
    pub fn publish(&self, event: T) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Removes every queued event, oldest first, without blocking.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.receiver.try_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;
    use std::{thread, time::Duration};

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Resized { width: u32, height: u32 },
        Text(String),
        Quit,
    }

    #[test]
    fn event_bus_starts_empty() {
        let bus = EventBus::<TestEvent>::new();
        assert!(bus.is_empty());
        assert_eq!(bus.receiver().try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn drain_preserves_publish_order() {
        let bus = EventBus::<TestEvent>::new();
        bus.publish(TestEvent::Resized {
            width: 1,
            height: 1,
        });
        bus.publish(TestEvent::Text("a".to_string()));
        bus.publish(TestEvent::Quit);

        let received: Vec<_> = bus.drain().collect();
        assert_eq!(
            received,
            vec![
                TestEvent::Resized {
                    width: 1,
                    height: 1
                },
                TestEvent::Text("a".to_string()),
                TestEvent::Quit,
            ]
        );
        assert!(bus.is_empty());
    }

    #[test]
    fn send_from_thread() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();

        let handle = thread::spawn(move || {
            sender.send(TestEvent::Quit).expect("Send from thread failed");
        });

        match bus.receiver().recv_timeout(Duration::from_secs(1)) {
            Ok(event) => assert_eq!(event, TestEvent::Quit),
            Err(e) => panic!("Failed to receive event from thread: {e:?}"),
        }
        handle.join().expect("Thread join failed");
    }

    #[test]
    fn publish_after_receiver_drop_does_not_panic() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();
        drop(bus);
        assert!(sender.send(TestEvent::Quit).is_err());
    }
}
