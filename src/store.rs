use std::{fs, io, path::{Path, PathBuf}, sync::{Mutex, PoisonError, RwLock}};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{ApplicationPatch, LeaveApplication, LeaveBalance};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to access store file")]
    Io(#[from] io::Error),
    #[error("store file is corrupted")]
    Json(#[from] serde_json::Error),
}

/// Everything the service remembers about applications and balance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub applications: Vec<LeaveApplication>,
    pub balance: Option<LeaveBalance>,
}

#[derive(Debug, Clone)]
pub enum Action {
    Upsert(LeaveApplication),
    Patch { id: String, patch: ApplicationPatch },
    Remove(String),
    SetBalance(Option<LeaveBalance>),
    Hydrate { applications: Vec<LeaveApplication>, balance: Option<LeaveBalance> },
    Reset,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Upsert(_) => "upsert",
            Action::Patch { .. } => "patch",
            Action::Remove(_) => "remove",
            Action::SetBalance(_) => "set_balance",
            Action::Hydrate { .. } => "hydrate",
            Action::Reset => "reset",
        }
    }
}

impl AppState {
    /// Next state after `action`. Applications stay ordered newest first.
    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::Upsert(application) => {
                match self.applications.iter_mut().find(|a| a.id == application.id) {
                    Some(existing) => *existing = application,
                    None => self.applications.insert(0, application),
                }
                sort_newest_first(&mut self.applications);
            }
            Action::Patch { id, patch } => {
                if let Some(existing) = self.applications.iter_mut().find(|a| a.id == id) {
                    patch.apply_to(existing);
                    sort_newest_first(&mut self.applications);
                }
            }
            Action::Remove(id) => {
                self.applications.retain(|a| a.id != id);
            }
            Action::SetBalance(balance) => {
                self.balance = balance;
            }
            Action::Hydrate { mut applications, balance } => {
                sort_newest_first(&mut applications);
                self.applications = applications;
                self.balance = balance;
            }
            Action::Reset => return AppState::default(),
        }

        self
    }
}

fn sort_newest_first(applications: &mut [LeaveApplication]) {
    applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[derive(Serialize, Deserialize)]
struct Persisted {
    version: u32,
    state: AppState,
}

/// Shared container around [`AppState`], optionally backed by a JSON file
#[derive(Debug)]
pub struct Store {
    state: RwLock<AppState>,
    path: Option<PathBuf>,
    /// Serializes file writes so they never hold up readers of `state`
    persist: Mutex<()>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self { state: RwLock::new(AppState::default()), path: None, persist: Mutex::new(()) }
    }

    /// Opens the store at `path`, starting empty when the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = load(&path)?;

        info!(path = %path.display(), applications = state.applications.len(), "Store loaded");

        Ok(Self { state: RwLock::new(state), path: Some(path), persist: Mutex::new(()) })
    }

    pub fn snapshot(&self) -> AppState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Applies `action` and persists the result. A failed write is logged and
    /// the in-memory state is kept.
    pub fn dispatch(&self, action: Action) -> AppState {
        let name = action.name();

        let next = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let next = std::mem::take(&mut *guard).reduce(action);
            *guard = next.clone();
            next
        };

        debug!(action = name, applications = next.applications.len(), "Store updated");

        if let Some(path) = &self.path {
            let _persisting = self.persist.lock().unwrap_or_else(PoisonError::into_inner);

            // Another dispatch may have landed since, the file gets the latest state
            if let Err(err) = save(path, &self.snapshot()) {
                warn!(error = %err, path = %path.display(), "Unable to persist store");
            }
        }

        next
    }
}

fn load(path: &Path) -> Result<AppState, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(AppState::default()),
        Err(err) => return Err(err.into()),
    };

    let persisted: Persisted = serde_json::from_str(&text)?;
    if persisted.version != STORE_VERSION {
        warn!(found = persisted.version, expected = STORE_VERSION, "Discarding store with unknown version");
        return Ok(AppState::default());
    }

    Ok(persisted.state)
}

fn save(path: &Path, state: &AppState) -> Result<(), StoreError> {
    let persisted = Persisted { version: STORE_VERSION, state: state.clone() };
    let tmp = path.with_extension("tmp");

    fs::write(&tmp, serde_json::to_vec_pretty(&persisted)?)?;
    fs::rename(&tmp, path)?;

    Ok(())
}
