//! TypeRegistry - app id と具象型の対応表
//!
//! Built once at startup, then shared read-only (`Arc<TypeRegistry>`) with
//! the engine. Restoring a snapshot looks up each record's `app_id` here to
//! get a zero-valued app, which then loads its own state.

use std::collections::HashMap;

use super::app::{Application, HostedApp};

/// Produces a fresh, zero-valued application.
pub type AppFactory = fn() -> Box<dyn Application>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("application id '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<String, AppFactory>,
}

fn create_default<A: HostedApp>() -> Box<dyn Application> {
    Box::new(A::default())
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<A: HostedApp>(&mut self) -> Result<(), RegistryError> {
        self.register_factory(A::APP_ID, create_default::<A>)
    }

    pub fn register_factory(
        &mut self,
        app_id: impl Into<String>,
        factory: AppFactory,
    ) -> Result<(), RegistryError> {
        let app_id = app_id.into();
        if self.factories.contains_key(&app_id) {
            return Err(RegistryError::AlreadyRegistered(app_id));
        }
        self.factories.insert(app_id, factory);
        Ok(())
    }

    pub fn create(&self, app_id: &str) -> Option<Box<dyn Application>> {
        self.factories.get(app_id).map(|factory| factory())
    }

    pub fn contains(&self, app_id: &str) -> bool {
        self.factories.contains_key(app_id)
    }

    /// Registered ids, sorted.
    pub fn registered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Counter, Recorder};

    #[test]
    fn register_and_create() {
        let mut registry = TypeRegistry::new();
        registry.register::<Recorder>().unwrap();

        assert!(registry.contains(Recorder::APP_ID));
        assert!(registry.create(Recorder::APP_ID).is_some());
        assert!(registry.create("nobody.registered.v1").is_none());
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register::<Recorder>().unwrap();
        let result = registry.register::<Recorder>();
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(id)) if id == Recorder::APP_ID));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registered_ids_are_sorted() {
        let mut registry = TypeRegistry::new();
        registry.register::<Recorder>().unwrap();
        registry.register::<Counter>().unwrap();

        let mut expected = vec![Recorder::APP_ID.to_string(), Counter::APP_ID.to_string()];
        expected.sort();
        assert_eq!(registry.registered_ids(), expected);
    }
}
