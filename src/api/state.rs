use std::sync::Arc;

use crate::{
    auth::AuthTokens, payments::PaymentService, realtime::RealtimeHub,
    repository::UserRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<AuthTokens>,
    pub hub: Arc<RealtimeHub>,
}

impl AppState {
    pub fn new(
        payments: Arc<PaymentService>,
        users: Arc<dyn UserRepository>,
        tokens: Arc<AuthTokens>,
        hub: Arc<RealtimeHub>,
    ) -> Self {
        Self {
            payments,
            users,
            tokens,
            hub,
        }
    }
}
