use base64::Engine;
use std::fmt;

/// Organization, project and personal access token supplied at login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    organization: String,
    project: String,
    pat: String,
}

impl Credential {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        pat: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            pat: pat.into(),
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// `Basic` header value with an empty user name and the PAT as password.
    pub fn basic_auth_header(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{}", self.pat));
        format!("Basic {encoded}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("pat", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_header_has_empty_username() {
        let cred = Credential::new("acme", "web", "secret");
        // base64(":secret")
        assert_eq!(cred.basic_auth_header(), "Basic OnNlY3JldA==");
    }

    #[test]
    fn debug_redacts_pat() {
        let cred = Credential::new("acme", "web", "secret");
        let printed = format!("{cred:?}");
        assert!(printed.contains("acme"));
        assert!(!printed.contains("secret"));
    }
}
