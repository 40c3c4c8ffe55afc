use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use grid_common::{Capacity, CapacityResult, Dmi, NodeVersion};

/// Live request/response channel to a node, addressed by twin id.
///
/// Implementations must bound every call with a timeout; callers treat any
/// error as "node unreachable".
#[async_trait]
pub trait NodeProbe: Send + Sync {
    async fn counters(&self, twin_id: u32) -> anyhow::Result<CapacityResult>;
    async fn version(&self, twin_id: u32) -> anyhow::Result<NodeVersion>;
    async fn hypervisor(&self, twin_id: u32) -> anyhow::Result<String>;
    async fn dmi(&self, twin_id: u32) -> anyhow::Result<Dmi>;
}

const CMD_STATISTICS: &str = "zos.statistics.get";
const CMD_VERSION: &str = "zos.system.version";
const CMD_HYPERVISOR: &str = "zos.system.hypervisor";
const CMD_DMI: &str = "zos.system.dmi";

#[derive(Serialize)]
struct RpcRequest<'a> {
    twin: u32,
    command: &'a str,
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RpcReply {
    fn into_result<T: DeserializeOwned>(self, command: &str) -> anyhow::Result<T> {
        if let Some(err) = self.error.filter(|e| !e.is_empty()) {
            return Err(anyhow!("{command} failed on node: {err}"));
        }
        let value = self
            .result
            .ok_or_else(|| anyhow!("{command} reply has no result"))?;
        serde_json::from_value(value).with_context(|| format!("invalid {command} reply"))
    }
}

#[derive(Deserialize)]
struct Counters {
    total: Capacity,
    used: Capacity,
}

/// Probe that reaches nodes through the message relay's HTTP endpoint.
#[derive(Clone)]
pub struct RelayNodeProbe {
    rpc_url: String,
    http: reqwest::Client,
}

impl RelayNodeProbe {
    pub fn new(relay_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3).min(timeout))
            .timeout(timeout)
            .build()
            .context("failed to build relay http client")?;
        Ok(Self {
            rpc_url: format!("{}/rpc", relay_url.trim_end_matches('/')),
            http,
        })
    }

    async fn call<T: DeserializeOwned>(&self, twin_id: u32, command: &str) -> anyhow::Result<T> {
        let resp = self
            .http
            .post(&self.rpc_url)
            .json(&RpcRequest {
                twin: twin_id,
                command,
                data: serde_json::Value::Null,
            })
            .send()
            .await
            .with_context(|| format!("{command}: relay request to twin {twin_id} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{command}: relay returned {status}: {body}"));
        }

        let reply: RpcReply = resp
            .json()
            .await
            .with_context(|| format!("{command}: undecodable relay reply"))?;
        reply.into_result(command)
    }
}

#[async_trait]
impl NodeProbe for RelayNodeProbe {
    async fn counters(&self, twin_id: u32) -> anyhow::Result<CapacityResult> {
        let c: Counters = self.call(twin_id, CMD_STATISTICS).await?;
        Ok(CapacityResult {
            total: c.total,
            used: c.used,
        })
    }

    async fn version(&self, twin_id: u32) -> anyhow::Result<NodeVersion> {
        self.call(twin_id, CMD_VERSION).await
    }

    async fn hypervisor(&self, twin_id: u32) -> anyhow::Result<String> {
        self.call(twin_id, CMD_HYPERVISOR).await
    }

    async fn dmi(&self, twin_id: u32) -> anyhow::Result<Dmi> {
        self.call(twin_id, CMD_DMI).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_with_result() {
        let reply: RpcReply = serde_json::from_str(
            r#"{"result": {"total": {"cru": 4, "mru": 8}, "used": {"cru": 1}}}"#,
        )
        .unwrap();
        let c: Counters = reply.into_result(CMD_STATISTICS).unwrap();
        assert_eq!(c.total.cru, 4);
        assert_eq!(c.total.mru, 8);
        assert_eq!(c.used.cru, 1);
        assert_eq!(c.used.sru, 0);
    }

    #[test]
    fn test_reply_with_error() {
        let reply: RpcReply =
            serde_json::from_str(r#"{"error": "twin 7 did not answer"}"#).unwrap();
        let err = reply.into_result::<String>(CMD_HYPERVISOR).unwrap_err();
        assert!(err.to_string().contains("twin 7 did not answer"));
    }

    #[test]
    fn test_reply_without_result() {
        let reply: RpcReply = serde_json::from_str("{}").unwrap();
        assert!(reply.into_result::<NodeVersion>(CMD_VERSION).is_err());
    }
}
