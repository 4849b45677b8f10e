use broadcast_config::Config;
use std::sync::Arc;

use crate::push::PushGateway;
use crate::store::BroadcastStore;

/// Application context containing shared dependencies
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn BroadcastStore>,
    pub push: Arc<dyn PushGateway>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn BroadcastStore>,
        push: Arc<dyn PushGateway>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            push,
            config,
        }
    }
}
