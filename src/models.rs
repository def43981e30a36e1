use std::sync::Arc;

use crate::config::Config;
use crate::session::Session;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: Arc<Session>,
}

impl AppState {
    pub fn new(config: Config, session: Session) -> Self {
        Self {
            config,
            session: Arc::new(session),
        }
    }
}
