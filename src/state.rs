use crate::client::PageSource;
use crate::config::Settings;
use crate::directory::ResponsibleDirectory;
use crate::models::TaskListResponse;
use crate::refresh::InFlight;
use crate::session::Session;
use crate::storage::KeyValueStore;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub source: Arc<dyn PageSource>,
    pub session: Session,
    pub directory: Arc<Mutex<ResponsibleDirectory>>,
    pub latest: Arc<Mutex<Option<TaskListResponse>>>,
    pub in_flight: InFlight,
}

impl AppState {
    pub async fn new(settings: Settings, source: Arc<dyn PageSource>, store: Arc<dyn KeyValueStore>) -> Self {
        let directory = ResponsibleDirectory::load(Arc::clone(&store)).await;
        let session = Session::new(store, settings.credentials.clone());
        Self {
            settings: Arc::new(settings),
            source,
            session,
            directory: Arc::new(Mutex::new(directory)),
            latest: Arc::new(Mutex::new(None)),
            in_flight: InFlight::new(),
        }
    }
}
