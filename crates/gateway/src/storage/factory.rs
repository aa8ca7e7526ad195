//! Startup-time backend selection

use std::sync::Arc;

use log::info;

use super::{
    FileStore, InMemoryWebhookStore, MessageStore, NoopMessageStore, SqliteStore, StoreError,
    StoreResult, WebhookStore,
};
use crate::settings::{StorageConfig, StorageKind};

/// The resolved pair of stores the rest of the gateway works against
#[derive(Clone)]
pub struct Backend {
    pub messages: Arc<dyn MessageStore>,
    pub webhooks: Arc<dyn WebhookStore>,
}

impl Backend {
    /// Close both halves; shared backends tolerate the second close
    pub fn close(&self) -> StoreResult<()> {
        self.messages.close()?;
        self.webhooks.close()
    }
}

/// Open the backend named by `config`
///
/// `sqlite` and `filesystem` serve messages and webhooks from one instance.
/// With `none`, messages are discarded but subscriptions are kept in memory.
pub fn open_backend(config: &StorageConfig) -> StoreResult<Backend> {
    let require_path = || {
        config
            .path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| StoreError::invalid(format!("storage kind {} needs a path", config.kind)))
    };

    match config.kind {
        StorageKind::None => {
            info!("[STORE] Persistence disabled, webhooks kept in memory");
            Ok(Backend {
                messages: Arc::new(NoopMessageStore::new()),
                webhooks: Arc::new(InMemoryWebhookStore::new()),
            })
        }
        StorageKind::Sqlite => {
            let path = require_path()?;
            info!("[STORE] Opening SQLite store at {}", path.display());
            let store = Arc::new(SqliteStore::open(path)?);
            Ok(Backend {
                messages: store.clone(),
                webhooks: store,
            })
        }
        StorageKind::Filesystem => {
            let path = require_path()?;
            info!("[STORE] Opening file store at {}", path.display());
            let store = Arc::new(FileStore::new(path)?);
            Ok(Backend {
                messages: store.clone(),
                webhooks: store,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, MessageQuery, MessageStatus, WebhookConfig};
    use tempfile::tempdir;

    fn storage(kind: StorageKind, path: Option<std::path::PathBuf>) -> StorageConfig {
        StorageConfig { kind, path }
    }

    #[test]
    fn test_none_discards_messages_but_keeps_webhooks() {
        let backend = open_backend(&storage(StorageKind::None, None)).unwrap();

        backend.messages.save(&Message::builder("m1").build()).unwrap();
        assert!(backend.messages.get(&MessageQuery::all()).unwrap().is_empty());

        let hook = WebhookConfig::with_id("wh_1", "http://localhost/hook", [MessageStatus::Bounce]);
        backend.webhooks.create(&hook).unwrap();
        assert_eq!(backend.webhooks.list().unwrap(), vec![hook]);
    }

    #[test]
    fn test_sqlite_shares_one_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("gateway.db");
        let backend = open_backend(&storage(StorageKind::Sqlite, Some(path.clone()))).unwrap();

        backend.messages.save(&Message::builder("m1").build()).unwrap();
        backend
            .webhooks
            .create(&WebhookConfig::with_id("wh_1", "http://localhost/hook", []))
            .unwrap();
        assert!(path.is_file());

        backend.close().unwrap();
        backend.close().unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(MessageStore::get(&reopened, &MessageQuery::all()).unwrap().len(), 1);
        assert_eq!(WebhookStore::list(&reopened).unwrap().len(), 1);
    }

    #[test]
    fn test_filesystem_uses_root_and_webhook_subdirectory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        let backend =
            open_backend(&storage(StorageKind::Filesystem, Some(root.clone()))).unwrap();

        backend.messages.save(&Message::builder("m1").build()).unwrap();
        backend
            .webhooks
            .create(&WebhookConfig::with_id("wh_1", "http://localhost/hook", []))
            .unwrap();

        assert!(root.join("m1.json").is_file());
        assert!(root.join("webhooks").join("wh_1.json").is_file());
    }

    #[test]
    fn test_persistent_kinds_require_path() {
        for kind in [StorageKind::Sqlite, StorageKind::Filesystem] {
            let err = open_backend(&storage(kind, None)).err().unwrap();
            assert!(matches!(err, StoreError::InvalidArgument { .. }));

            let err = open_backend(&storage(kind, Some("".into()))).err().unwrap();
            assert!(matches!(err, StoreError::InvalidArgument { .. }));
        }
    }
}
