//! Azure cloud environments and their endpoints

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEnvironment {
    pub name: &'static str,
    /// Resource Manager endpoint, e.g. `https://management.azure.com`
    pub resource_manager: String,
    /// Login endpoint used for client credential tokens
    pub active_directory: String,
    /// Audience tokens are requested for
    pub token_audience: String,
}

impl CloudEnvironment {
    pub fn public() -> Self {
        Self {
            name: "public",
            resource_manager: "https://management.azure.com".to_string(),
            active_directory: "https://login.microsoftonline.com".to_string(),
            token_audience: "https://management.azure.com".to_string(),
        }
    }

    pub fn us_government() -> Self {
        Self {
            name: "usgovernment",
            resource_manager: "https://management.usgovcloudapi.net".to_string(),
            active_directory: "https://login.microsoftonline.us".to_string(),
            token_audience: "https://management.usgovcloudapi.net".to_string(),
        }
    }

    pub fn china() -> Self {
        Self {
            name: "china",
            resource_manager: "https://management.chinacloudapi.cn".to_string(),
            active_directory: "https://login.chinacloudapi.cn".to_string(),
            token_audience: "https://management.chinacloudapi.cn".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "" | "public" => Ok(Self::public()),
            "usgovernment" => Ok(Self::us_government()),
            "china" => Ok(Self::china()),
            other => bail!(
                "unknown environment {other:?}: expected one of \"public\", \"usgovernment\" or \"china\""
            ),
        }
    }

    /// Point Resource Manager calls somewhere else (tests, private clouds)
    pub fn with_resource_manager(mut self, endpoint: &str) -> Self {
        self.resource_manager = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_active_directory(mut self, endpoint: &str) -> Self {
        self.active_directory = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// OAuth2 scope for Resource Manager tokens
    pub fn scope(&self) -> String {
        format!("{}/.default", self.token_audience.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(CloudEnvironment::from_name("Public").unwrap(), CloudEnvironment::public());
        assert_eq!(CloudEnvironment::from_name("").unwrap().name, "public");
        assert_eq!(CloudEnvironment::from_name("china").unwrap().name, "china");
        assert!(CloudEnvironment::from_name("germany").is_err());
    }

    #[test]
    fn test_scope() {
        assert_eq!(CloudEnvironment::public().scope(), "https://management.azure.com/.default");
    }

    #[test]
    fn test_with_resource_manager_trims() {
        let env = CloudEnvironment::public().with_resource_manager("http://127.0.0.1:8080/");
        assert_eq!(env.resource_manager, "http://127.0.0.1:8080");
    }
}
