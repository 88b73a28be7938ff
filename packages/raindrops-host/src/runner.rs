//! Turns raw input lines into JSON records for the command line front end.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::HostError;
use crate::host::{RaindropsInstance, RaindropsModule};

/// One output line: the input and either its sound or the failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Record {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Drives conversions either on one reused instance or on a fresh instance
/// per input.
pub enum Runner {
    Reused(RaindropsInstance),
    Fresh(RaindropsModule),
}

impl Runner {
    pub async fn new(module: RaindropsModule, fresh: bool) -> Result<Self, HostError> {
        if fresh {
            return Ok(Self::Fresh(module));
        }
        Ok(Self::Reused(module.instantiate().await?))
    }

    /// Convert one raw input. Surrounding whitespace is ignored.
    pub async fn run(&mut self, raw: &str) -> Record {
        let raw = raw.trim();
        let n: u32 = match raw.parse() {
            Ok(n) => n,
            Err(e) => {
                warn!(input = raw, "not a number");
                return Record {
                    input: Value::String(raw.to_string()),
                    sound: None,
                    error: Some(format!("not a positive 32-bit integer: {e}")),
                };
            }
        };

        let result = match self {
            Self::Reused(instance) => instance.convert(n).await,
            Self::Fresh(module) => module.convert(n).await,
        };
        match result {
            Ok(sound) => Record {
                input: Value::from(n),
                sound: Some(sound),
                error: None,
            },
            Err(e) => {
                warn!(n, error = %e, "conversion failed");
                Record {
                    input: Value::from(n),
                    sound: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::host::RaindropsHost;

    async fn runner(fresh: bool) -> Runner {
        let host = RaindropsHost::new(HostConfig::default()).unwrap();
        let module = host.load_reference().unwrap();
        match Runner::new(module, fresh).await {
            Ok(runner) => runner,
            Err(e) => panic!("runner: {e}"),
        }
    }

    #[tokio::test]
    async fn sound_record_serializes_without_error_field() {
        let record = runner(false).await.run("105").await;
        assert!(!record.is_error());
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"input":105,"sound":"PlingPlangPlong"}"#
        );
    }

    #[tokio::test]
    async fn fresh_and_reused_runners_agree() {
        let mut reused = runner(false).await;
        let mut fresh = runner(true).await;
        for raw in ["1", "8", " 35 ", "3125"] {
            assert_eq!(reused.run(raw).await, fresh.run(raw).await);
        }
    }

    #[tokio::test]
    async fn unparsable_input_keeps_raw_text() {
        let record = runner(false).await.run("-3").await;
        assert!(record.is_error());
        assert_eq!(record.input, Value::String("-3".to_string()));
        assert_eq!(record.sound, None);
    }

    #[tokio::test]
    async fn zero_produces_error_record() {
        let record = runner(false).await.run("0").await;
        assert_eq!(record.input, Value::from(0u32));
        assert!(record.error.unwrap().contains("positive"));
    }
}
