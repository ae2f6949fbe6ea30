use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use autoscale_cuckoo_filter::CuckooFilter;

use crate::model::user::normalize_email;
use crate::store::Store;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Fast negative check for "is this email registered".
///
/// A miss is authoritative; a hit must be confirmed against the store.
pub struct EmailFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for EmailFilter {
    fn default() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }
}

impl EmailFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if an email might be taken (false positives possible)
    pub fn might_exist(&self, email: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize_email(email))
    }

    pub fn insert(&self, email: &str) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&normalize_email(email));
    }

    /// Only call for emails that were inserted; cuckoo removal of an absent
    /// item can evict a colliding fingerprint.
    pub fn remove(&self, email: &str) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize_email(email));
    }

    fn insert_batch(&self, emails: &[String]) {
        let mut filter = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for email in emails {
            filter.add(email);
        }
    }

    /// Loads every known email, in batches to keep the write lock short.
    pub async fn warmup(&self, store: &dyn Store, batch_size: usize) -> Result<usize> {
        let emails = store.all_emails().await?;
        let total = emails.len();

        for chunk in emails.chunks(batch_size.max(1)) {
            let normalized: Vec<String> = chunk.iter().map(|e| normalize_email(e)).collect();
            self.insert_batch(&normalized);
        }

        log::info!("Email filter warmup complete: {} users", total);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_emails_are_reported_case_insensitively() {
        let filter = EmailFilter::new();
        assert!(!filter.might_exist("asha@example.com"));
        filter.insert("Asha@Example.com");
        assert!(filter.might_exist("asha@example.com"));
        filter.remove("ASHA@example.com");
        assert!(!filter.might_exist("asha@example.com"));
    }
}
