//! In-memory HubClient for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::models::{
    NativeNotification, NativeRegistration, NotificationOutcome, NotificationOutcomeState,
    RegistrationDescription,
};
use super::{HubClient, HubError};

pub struct FakeHubClient {
    next_error: Mutex<Option<HubError>>,
    outcome: Mutex<NotificationOutcomeState>,
    registrations: Mutex<Vec<RegistrationDescription>>,
    upserts: Mutex<Vec<NativeRegistration>>,
    sends: Mutex<Vec<NativeNotification>>,
    deletes: Mutex<Vec<String>>,
    list_calls: Mutex<Vec<u32>>,
}

impl Default for FakeHubClient {
    fn default() -> Self {
        Self {
            next_error: Mutex::new(None),
            outcome: Mutex::new(NotificationOutcomeState::Enqueued),
            registrations: Mutex::new(Vec::new()),
            upserts: Mutex::new(Vec::new()),
            sends: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            list_calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeHubClient {
    /// Make the next call fail with `error`
    pub fn fail_next(&self, error: HubError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn set_outcome(&self, state: NotificationOutcomeState) {
        *self.outcome.lock().unwrap() = state;
    }

    pub fn set_registrations(&self, registrations: Vec<RegistrationDescription>) {
        *self.registrations.lock().unwrap() = registrations;
    }

    pub fn upserts(&self) -> Vec<NativeRegistration> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<NativeNotification> {
        self.sends.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<u32> {
        self.list_calls.lock().unwrap().clone()
    }

    fn take_error(&self) -> Result<(), HubError> {
        match self.next_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HubClient for FakeHubClient {
    async fn create_registration_id(&self) -> Result<String, HubError> {
        self.take_error()?;
        Ok("8455316718418236227-1".to_string())
    }

    async fn create_or_update_registration(
        &self,
        registration: &NativeRegistration,
    ) -> Result<(), HubError> {
        self.take_error()?;
        self.upserts.lock().unwrap().push(registration.clone());
        Ok(())
    }

    async fn delete_registration(&self, registration_id: &str) -> Result<(), HubError> {
        self.take_error()?;
        self.deletes.lock().unwrap().push(registration_id.to_string());
        Ok(())
    }

    async fn send_notification(
        &self,
        notification: &NativeNotification,
    ) -> Result<NotificationOutcome, HubError> {
        self.take_error()?;
        self.sends.lock().unwrap().push(notification.clone());
        Ok(NotificationOutcome::with_state(*self.outcome.lock().unwrap()))
    }

    async fn get_registrations(
        &self,
        top: u32,
    ) -> Result<Vec<RegistrationDescription>, HubError> {
        self.take_error()?;
        self.list_calls.lock().unwrap().push(top);
        Ok(self.registrations.lock().unwrap().clone())
    }
}
