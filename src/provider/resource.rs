//! Resource and data source traits plus the helpers every adapter shares

use super::ProviderContext;
use crate::azure::ArmError;
use crate::schema::Schema;
use crate::state::ResourceData;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// A managed resource type: schema plus CRUD functions
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Check an ID handed to import parses as this resource's ID type
    fn validate_import_id(&self, id: &str) -> Result<()>;

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    /// Refresh `data` from the API; clear its ID when the resource is gone
    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    async fn update(&self, _ctx: &ProviderContext, _data: &mut ResourceData) -> Result<()> {
        bail!("{} does not support in-place updates", self.type_name())
    }

    async fn delete(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<()>;
}

/// A read-only lookup
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            read: Duration::from_secs(5 * 60),
            ..Timeouts::default()
        }
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    fn key(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-operation deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::minutes(30, 5, 30, 30)
    }
}

impl Timeouts {
    pub const fn minutes(create: u64, read: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            read: Duration::from_secs(read * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
        }
    }

    pub fn get(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    /// Apply overrides from the `timeouts` attribute, e.g. `{ "create": "1h30m" }`
    pub fn with_overrides(mut self, data: &ResourceData) -> Result<Self> {
        for operation in [Operation::Create, Operation::Read, Operation::Update, Operation::Delete] {
            let Some(raw) = data.get_str(&format!("timeouts.{}", operation.key())) else {
                continue;
            };
            let duration = parse_duration(raw).with_context(|| format!("parsing `timeouts.{operation}`"))?;
            match operation {
                Operation::Create => self.create = duration,
                Operation::Read => self.read = duration,
                Operation::Update => self.update = duration,
                Operation::Delete => self.delete = duration,
            }
        }
        Ok(self)
    }
}

/// Parse durations such as `45m`, `1h30m`, `90s` or `1h0m0.5s`
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        bail!("empty duration");
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| anyhow!("missing unit in duration {input:?}"))?;
        if number_len == 0 {
            bail!("invalid duration {input:?}");
        }
        let value: f64 = rest[..number_len]
            .parse()
            .with_context(|| format!("invalid duration {input:?}"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 0.001,
            unit => bail!("unknown unit {unit:?} in duration {input:?}"),
        };
        rest = &rest[unit_len..];
        total += value * seconds;
    }

    Ok(Duration::from_secs_f64(total))
}

/// Run `future` under the deadline for `operation`
pub async fn with_timeout<T>(
    operation: Operation,
    timeouts: &Timeouts,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    let limit = timeouts.get(operation);
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("timed out after {:?} waiting for {} to finish", limit, operation)),
    }
}

/// The error raised when create finds the resource already exists
pub fn import_as_exists_error(type_name: &str, id: &str) -> anyhow::Error {
    anyhow!(
        "A resource with the ID {id:?} already exists - to be managed this resource needs to be \
         imported into the State. Please see the resource documentation for {type_name:?} for more information."
    )
}

/// Turn the result of a pre-create GET into "needs import" / "go ahead" / error
pub fn ensure_not_exists<T>(type_name: &str, id: &str, existing: Result<T, ArmError>) -> Result<()> {
    match existing {
        Ok(_) => Err(import_as_exists_error(type_name, id)),
        Err(err) if err.was_not_found() => Ok(()),
        Err(err) => Err(anyhow::Error::new(err).context(format!("checking for presence of existing {id}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("45m").unwrap(), Duration::from_secs(45 * 60));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(90 * 60));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(90 * 60));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("m").is_err());
    }

    #[test]
    fn test_overrides() {
        let data = ResourceData::new(
            json!({ "timeouts": { "create": "2h", "delete": "5m" } })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let timeouts = Timeouts::default().with_overrides(&data).unwrap();
        assert_eq!(timeouts.create, Duration::from_secs(7200));
        assert_eq!(timeouts.read, Duration::from_secs(300));
        assert_eq!(timeouts.delete, Duration::from_secs(300));

        let bad = ResourceData::new(json!({ "timeouts": { "read": "soon" } }).as_object().cloned().unwrap());
        assert!(Timeouts::default().with_overrides(&bad).is_err());
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let timeouts = Timeouts {
            read: Duration::from_millis(10),
            ..Timeouts::default()
        };
        let result: Result<()> = with_timeout(Operation::Read, &timeouts, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }

    #[test]
    fn test_ensure_not_exists() {
        assert!(ensure_not_exists("azurerm_x", "X", Ok(())).is_err());

        let missing: Result<(), ArmError> = Err(ArmError::Api {
            status: StatusCode::NOT_FOUND,
            code: "ResourceNotFound".to_string(),
            message: "gone".to_string(),
        });
        assert!(ensure_not_exists("azurerm_x", "X", missing).is_ok());

        let denied: Result<(), ArmError> = Err(ArmError::Api {
            status: StatusCode::FORBIDDEN,
            code: "AuthorizationFailed".to_string(),
            message: "no".to_string(),
        });
        let err = ensure_not_exists("azurerm_x", "X", denied).unwrap_err();
        assert!(format!("{err:#}").starts_with("checking for presence of existing X"));
    }
}
