use std::{collections::HashMap, future::Future};

use tokio::sync::RwLock;

/// Key-value persistence for the tracker's JSON blobs.
///
/// Mirrors browser local storage: string keys, string values, last write wins.
pub trait Storage {
    fn get_item(&self, key: &str) -> impl Future<Output = anyhow::Result<Option<String>>>;
    fn set_item(&self, key: &str, value: &str) -> impl Future<Output = anyhow::Result<()>>;
}

/// Storage kept in process memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            items: RwLock::new(
                items
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl Storage for MemoryStorage {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_overwrites_values() -> anyhow::Result<()> {
        let storage = MemoryStorage::with_items([("membersData", "[]")]);
        assert_eq!(storage.get_item("membersData").await?.as_deref(), Some("[]"));
        assert_eq!(storage.get_item("projectsData").await?, None);

        storage.set_item("membersData", "[1]").await?;
        assert_eq!(storage.get_item("membersData").await?.as_deref(), Some("[1]"));
        Ok(())
    }
}
