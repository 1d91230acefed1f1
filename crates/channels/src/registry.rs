//! Interface registry — manages all active delivery surfaces.
//!
//! Outbound messages are queued first and then handed to the named
//! interface, so a delivery failure never loses the message content.

use std::collections::HashMap;
use std::sync::Arc;

use loreagent_core::interface::Interface;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A message queued for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub interface: String,
    pub conversation_id: String,
    pub text: String,
    pub image_url: Option<String>,
}

/// Central registry holding all enabled interface adapters plus the
/// outbound queue.
pub struct InterfaceRegistry {
    interfaces: Mutex<HashMap<String, Arc<dyn Interface>>>,
    outbound: Mutex<Vec<OutboundMessage>>,
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self {
            interfaces: Mutex::new(HashMap::new()),
            outbound: Mutex::new(Vec::new()),
        }
    }

    /// Register an interface adapter. Re-registering a name replaces
    /// the previous adapter.
    pub async fn register(&self, interface: Arc<dyn Interface>) {
        let name = interface.name().to_string();
        info!(interface = %name, "Registered interface");
        self.interfaces.lock().await.insert(name, interface);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Interface>> {
        self.interfaces.lock().await.get(name).cloned()
    }

    pub async fn list(&self) -> Vec<String> {
        self.interfaces.lock().await.keys().cloned().collect()
    }

    /// Queue a message and deliver it through the named interface.
    /// Returns whether delivery happened. An unknown interface or a
    /// delivery error is logged and reported as `false`; the message
    /// stays in the queue either way.
    pub async fn send_to(
        &self,
        interface_name: &str,
        conversation_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> bool {
        self.outbound.lock().await.push(OutboundMessage {
            interface: interface_name.to_string(),
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            image_url: image_url.map(str::to_string),
        });

        let interface = match self.get(interface_name).await {
            Some(i) => i,
            None => {
                warn!(interface = %interface_name, "No such interface, message queued only");
                return false;
            }
        };

        match interface.deliver(conversation_id, text, image_url).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!(interface = %interface_name, error = %e, "Delivery failed");
                false
            }
        }
    }

    /// Drain and return everything queued so far.
    pub async fn drain_outbound(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.outbound.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loreagent_core::error::ChannelError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockInterface {
        name: String,
        delivered: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockInterface {
        fn new(name: &str) -> Self {
            Self {
                name: name.into(),
                delivered: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Interface for MockInterface {
        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(
            &self,
            _conversation_id: &str,
            _text: &str,
            _image_url: Option<&str>,
        ) -> Result<bool, ChannelError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ChannelError::DeliveryFailed {
                    channel: self.name.clone(),
                    reason: "mock failure".into(),
                });
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[tokio::test]
    async fn register_and_list() {
        let reg = InterfaceRegistry::new();
        reg.register(Arc::new(MockInterface::new("telegram"))).await;
        reg.register(Arc::new(MockInterface::new("terminal"))).await;

        let names = reg.list().await;
        assert!(names.contains(&"telegram".to_string()));
        assert!(names.contains(&"terminal".to_string()));
    }

    #[tokio::test]
    async fn send_to_delivers_and_queues() {
        let reg = InterfaceRegistry::new();
        let iface = Arc::new(MockInterface::new("test"));
        reg.register(iface.clone()).await;

        assert!(reg.send_to("test", "chat1", "Hello", None).await);
        assert_eq!(iface.delivered.load(Ordering::SeqCst), 1);

        let queued = reg.drain_outbound().await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].text, "Hello");
        assert_eq!(queued[0].interface, "test");
    }

    #[tokio::test]
    async fn unknown_interface_queues_but_reports_false() {
        let reg = InterfaceRegistry::new();
        assert!(!reg.send_to("nonexistent", "chat1", "Hello", None).await);

        // Message content is not lost.
        let queued = reg.drain_outbound().await;
        assert_eq!(queued.len(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_reports_false() {
        let reg = InterfaceRegistry::new();
        let iface = Arc::new(MockInterface::new("flaky"));
        iface.fail.store(true, Ordering::SeqCst);
        reg.register(iface.clone()).await;

        assert!(!reg.send_to("flaky", "chat1", "Hello", None).await);
        assert_eq!(iface.delivered.load(Ordering::SeqCst), 0);
        assert_eq!(reg.drain_outbound().await.len(), 1);
    }

    #[tokio::test]
    async fn reregistering_replaces() {
        let reg = InterfaceRegistry::new();
        let first = Arc::new(MockInterface::new("test"));
        let second = Arc::new(MockInterface::new("test"));
        reg.register(first.clone()).await;
        reg.register(second.clone()).await;

        reg.send_to("test", "chat1", "Hello", None).await;
        assert_eq!(first.delivered.load(Ordering::SeqCst), 0);
        assert_eq!(second.delivered.load(Ordering::SeqCst), 1);
    }
}
