use std::sync::Arc;

use crate::client_config::ConfigFlags;

#[derive(Clone)]
pub struct State {
    pub config_flags: Arc<ConfigFlags>,
}

impl State {
    pub fn new(config_flags: ConfigFlags) -> Self {
        Self {
            config_flags: Arc::new(config_flags),
        }
    }
}
