#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use profile_views::{Error, Profile, ProfileSource, Result};
use tokio::sync::Semaphore;

pub const NAMES: [&str; 3] = ["junegunn", "gaearon", "benlesh"];

pub fn profile(name: &str) -> Profile {
    Profile {
        login: name.to_string(),
        avatar_url: format!("http://x/{name}.png"),
    }
}

/// In-memory profile source whose lookups can be held until released.
#[derive(Default)]
pub struct ScriptedSource {
    profiles: Mutex<HashMap<String, Profile>>,
    failing: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    /// Knows every demo name.
    pub fn new() -> Arc<Self> {
        let source = Self::default();
        for name in NAMES {
            source.insert(profile(name));
        }
        Arc::new(source)
    }

    pub fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.login.clone(), profile);
    }

    pub fn insert_as(&self, name: &str, profile: Profile) {
        self.profiles.lock().unwrap().insert(name.to_string(), profile);
    }

    /// Lookups for `name` fail from now on.
    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().push(name.to_string());
    }

    /// Lookups for `name` wait until [`release`](Self::release).
    pub fn hold(&self, name: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let one held lookup for `name` complete.
    pub fn release(&self, name: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(name) {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.calls().iter().filter(|n| *n == name).count()
    }
}

#[async_trait]
impl ProfileSource for ScriptedSource {
    async fn fetch(&self, name: &str) -> Result<Profile> {
        self.calls.lock().unwrap().push(name.to_string());

        let gate = self.gates.lock().unwrap().get(name).cloned();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        if self.failing.lock().unwrap().iter().any(|n| n == name) {
            return Err(Error::Status {
                name: name.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            });
        }

        let found = self.profiles.lock().unwrap().get(name).cloned();
        found.ok_or_else(|| Error::Status {
            name: name.to_string(),
            status: reqwest::StatusCode::NOT_FOUND,
        })
    }
}
