use anyhow::Result;
use etcd_client::{Client, PutOptions};

use crate::types::CacheStore;

/// etcd-backed store; each expiring write gets its own lease.
/// Each call works on its own clone of the client.
#[derive(Clone)]
pub struct EtcdCacheStore {
    client: Client,
}

impl EtcdCacheStore {
    pub async fn connect(endpoints: &[String]) -> Result<Self> {
        let c = Client::connect(endpoints, None).await?;
        Ok(Self { client: c })
    }

    fn lease_seconds(ttl_secs: u64) -> i64 {
        ttl_secs.clamp(1, i64::MAX as u64) as i64
    }
}

#[async_trait::async_trait]
impl CacheStore for EtcdCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut cli = self.client.clone();
        let resp = cli.get(key, None).await?;
        Ok(resp.kvs().first().map(|kv| kv.value().to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<()> {
        let mut cli = self.client.clone();

        let mut opts = PutOptions::new();
        if let Some(ttl_secs) = ttl_secs {
            let lease = cli.lease_grant(Self::lease_seconds(ttl_secs), None).await?;
            opts = opts.with_lease(lease.id());
        }

        cli.put(key, value, Some(opts)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut cli = self.client.clone();
        cli.delete(key, None).await?;
        Ok(())
    }
}
