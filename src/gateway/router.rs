//! # Outbound Router
//!
//! Owns the outbound routing table and the gateways of destination queues.
//! Direct bindings yield one target, fanout bindings every listed target,
//! topic bindings their targets only when the predicate holds. There is no
//! fallback: a message no binding routes is not sent anywhere.

use futures::future::try_join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::binding::Binding;
use super::errors::{GatewayError, GatewayResult};
use super::traits::Publisher;
use crate::broker::JobHandle;
use crate::messaging::Envelope;

/// One delivery made by [`OutboundRouter::route`]
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedJob {
    pub queue: String,
    pub job: JobHandle,
}

#[derive(Default)]
pub struct OutboundRouter {
    bindings: RwLock<Vec<Binding>>,
    gateways: RwLock<HashMap<String, Arc<dyn Publisher>>>,
}

impl std::fmt::Debug for OutboundRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundRouter")
            .field("bindings", &self.bindings.read().len())
            .field("gateways", &self.gateways.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OutboundRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binding(&self, binding: Binding) -> GatewayResult<()> {
        if binding.is_inbound() || binding.route.is_none() {
            return Err(GatewayError::invalid_binding(format!(
                "router only takes outbound bindings, got inbound binding for {}",
                binding.message_type
            )));
        }
        self.bindings.write().push(binding);
        Ok(())
    }

    /// Register the gateway that delivers to `queue`
    pub fn register_gateway(&self, queue: impl Into<String>, gateway: Arc<dyn Publisher>) {
        self.gateways.write().insert(queue.into(), gateway);
    }

    /// Destination queues for `envelope`, deduplicated, in binding order
    pub fn resolve(&self, envelope: &Envelope) -> Vec<String> {
        let bindings = self.bindings.read();
        let mut targets: Vec<String> = Vec::new();

        for binding in bindings.iter().filter(|binding| binding.matches(envelope)) {
            let Some(route) = &binding.route else {
                continue;
            };
            for queue in route.targets(envelope) {
                if !targets.iter().any(|existing| existing == queue) {
                    targets.push(queue.to_string());
                }
            }
        }

        targets
    }

    /// Publish `envelope` through the gateway of every resolved queue
    ///
    /// Destinations are published to concurrently and each one's allow-list
    /// still applies. Every destination gateway must be registered before
    /// anything is sent; the first publish failure is returned.
    pub async fn route(&self, envelope: &Envelope) -> GatewayResult<Vec<RoutedJob>> {
        let targets = self.resolve(envelope);
        if targets.is_empty() {
            debug!(
                message_type = %envelope.message_type,
                message_id = %envelope.id,
                "No outbound binding matched; message not routed"
            );
            return Ok(Vec::new());
        }

        let publishers = {
            let gateways = self.gateways.read();
            targets
                .into_iter()
                .map(|queue| {
                    gateways
                        .get(&queue)
                        .cloned()
                        .map(|gateway| (queue.clone(), gateway))
                        .ok_or_else(|| GatewayError::unknown_queue(queue))
                })
                .collect::<GatewayResult<Vec<_>>>()?
        };

        let jobs = try_join_all(
            publishers
                .iter()
                .map(|(_, gateway)| gateway.publish_or_send(envelope)),
        )
        .await?;

        Ok(publishers
            .into_iter()
            .zip(jobs)
            .map(|((queue, _), job)| RoutedJob { queue, job })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(total: i64) -> Envelope {
        Envelope::new(
            "com.acme.order.created",
            "t-1",
            "checkout",
            json!({"total": total}),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_resolution_by_route_kind() {
        let router = OutboundRouter::new();
        router
            .add_binding(Binding::direct("com.acme.order.created", "billing"))
            .unwrap();
        router
            .add_binding(Binding::fanout(
                "com.acme.order.created",
                ["analytics", "billing"],
            ))
            .unwrap();
        router
            .add_binding(Binding::topic(
                "com.acme.order.created",
                |envelope: &Envelope| envelope.data["total"].as_i64().unwrap_or(0) > 1000,
                ["fraud-review"],
            ))
            .unwrap();
        router
            .add_binding(Binding::direct("com.acme.user.created", "crm"))
            .unwrap();

        assert_eq!(router.resolve(&order(10)), vec!["billing", "analytics"]);
        assert_eq!(
            router.resolve(&order(5000)),
            vec!["billing", "analytics", "fraud-review"]
        );
    }

    #[test]
    fn test_unmatched_topic_routes_nowhere() {
        let router = OutboundRouter::new();
        router
            .add_binding(Binding::topic(
                "com.acme.order.created",
                |_: &Envelope| false,
                ["audit"],
            ))
            .unwrap();
        assert!(router.resolve(&order(1)).is_empty());
    }

    #[test]
    fn test_inbound_binding_is_rejected() {
        let router = OutboundRouter::new();
        assert!(router.add_binding(Binding::inbound("com.acme.order.created")).is_err());
    }
}
