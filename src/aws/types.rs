//! AWS lookup and launch types

/// Outcome of a control-plane lookup that can legitimately find nothing.
///
/// Distinguishes "the call succeeded but the resource is absent" from a
/// transport or permission failure, which surfaces as the `Err` side of the
/// enclosing `Result`. This replaces sentinel checks on empty strings or the
/// provider's textual "None".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The resource exists
    Found(T),
    /// The call succeeded but no resource matched
    Missing,
}

impl<T> Lookup<T> {
    /// Convert to an `Option`, discarding the found/missing distinction.
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Lookup::Missing)
    }
}

/// Configuration for launching the application instance
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Unique deploy identifier for tagging
    pub deploy_id: String,
    /// Resolved AMI id
    pub image_id: String,
    /// EC2 instance type (e.g., "t3.micro")
    pub instance_type: String,
    /// Key-pair name for SSH access
    pub key_name: String,
    /// Security group id to attach
    pub security_group_id: String,
    /// User data script (will be base64 encoded)
    pub user_data: String,
    /// Value for the instance `Name` tag
    pub name_tag: String,
}

/// Outcome of creating-or-finding the security group.
///
/// Tagging happens only at creation time, so the pipeline needs to know
/// which path produced the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityGroupOutcome {
    /// Group was freshly created (tags applied at creation)
    Created(String),
    /// Group already existed and was located by name
    Found(String),
}

impl SecurityGroupOutcome {
    pub fn id(&self) -> &str {
        match self {
            SecurityGroupOutcome::Created(id) | SecurityGroupOutcome::Found(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_found_converts_to_some() {
        assert_eq!(Lookup::Found("ami-1").found(), Some("ami-1"));
        assert_eq!(Lookup::<&str>::Missing.found(), None);
        assert!(Lookup::<String>::Missing.is_missing());
    }

    #[test]
    fn security_group_outcome_exposes_id() {
        assert_eq!(
            SecurityGroupOutcome::Created("sg-1".into()).id(),
            "sg-1"
        );
        assert_eq!(SecurityGroupOutcome::Found("sg-2".into()).id(), "sg-2");
    }
}
