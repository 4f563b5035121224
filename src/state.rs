use crate::shell::Shell;
use crate::store::Store;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const MAX_SESSIONS: usize = 1024;

/// Open sessions, oldest evicted first once the cap is reached.
#[derive(Default)]
pub struct Sessions {
    shells: HashMap<Uuid, Arc<Mutex<Shell>>>,
    order: VecDeque<Uuid>,
}

impl Sessions {
    pub fn insert(&mut self, shell: Shell) -> (Uuid, Arc<Mutex<Shell>>) {
        while self.order.len() >= MAX_SESSIONS {
            if let Some(oldest) = self.order.pop_front() {
                self.shells.remove(&oldest);
            }
        }
        let id = Uuid::new_v4();
        let shell = Arc::new(Mutex::new(shell));
        self.shells.insert(id, Arc::clone(&shell));
        self.order.push_back(id);
        (id, shell)
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Mutex<Shell>>> {
        self.shells.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<Mutex<Sessions>>,
    pub mock_host: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mock_host: bool) -> Self {
        Self {
            store,
            sessions: Arc::new(Mutex::new(Sessions::default())),
            mock_host,
        }
    }
}
