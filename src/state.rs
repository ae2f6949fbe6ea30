use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::model::holiday::HolidayCalendar;
use crate::store::Store;
use crate::utils::email_filter::EmailFilter;
use crate::utils::profile_cache::ProfileCache;

/// Shared handles injected into every handler as `web::Data<AppState>`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub profiles: ProfileCache,
    pub emails: EmailFilter,
    pub holidays: Arc<dyn HolidayCalendar>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, holidays: Arc<dyn HolidayCalendar>, config: &Config) -> Self {
        Self {
            store,
            profiles: ProfileCache::new(Duration::from_secs(config.profile_cache_ttl_secs)),
            emails: EmailFilter::new(),
            holidays,
        }
    }
}
