//! # Access Policy
//!
//! Decides what a [`Principal`] may do. Pure checks, no lookups.
//!
//! ```text
//! ┌──────────────┬───────────────────────────┬────────────────────────────┐
//! │ Role         │ create / update / complete│ read                       │
//! ├──────────────┼───────────────────────────┼────────────────────────────┤
//! │ tenant_admin │ own tenant only           │ own tenant only            │
//! │ system_admin │ forbidden                 │ every tenant               │
//! │ (inactive)   │ rejected                  │ rejected                   │
//! └──────────────┴───────────────────────────┴────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{Principal, Role};

/// Which tenants' records a read may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadScope {
    /// Only the named tenant.
    Tenant(String),
    /// Every tenant.
    AllTenants,
}

impl ReadScope {
    /// Returns the tenant filter, or `None` for an unrestricted scope.
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            ReadScope::Tenant(id) => Some(id),
            ReadScope::AllTenants => None,
        }
    }

    /// Whether a record owned by `tenant_id` is visible in this scope.
    pub fn allows(&self, tenant_id: &str) -> bool {
        match self {
            ReadScope::Tenant(id) => id == tenant_id,
            ReadScope::AllTenants => true,
        }
    }
}

fn require_active(principal: &Principal) -> CoreResult<()> {
    if principal.is_active {
        Ok(())
    } else {
        Err(CoreError::InactiveAccount {
            tenant_id: principal.tenant_id.clone(),
        })
    }
}

/// Checks that `principal` may write invoices and returns the tenant they write to.
///
/// `operation` names the attempted action for the error message.
pub fn require_invoice_writer<'a>(
    principal: &'a Principal,
    operation: &'static str,
) -> CoreResult<&'a str> {
    require_active(principal)?;
    match principal.role {
        Role::TenantAdmin => Ok(&principal.tenant_id),
        Role::SystemAdmin => Err(CoreError::ForbiddenRole {
            role: principal.role,
            operation,
        }),
    }
}

/// Returns the scope `principal` may read invoices in.
pub fn read_scope(principal: &Principal) -> CoreResult<ReadScope> {
    require_active(principal)?;
    Ok(match principal.role {
        Role::TenantAdmin => ReadScope::Tenant(principal.tenant_id.clone()),
        Role::SystemAdmin => ReadScope::AllTenants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_admin_writes_own_tenant() {
        let principal = Principal::tenant_admin("t-1");
        assert_eq!(require_invoice_writer(&principal, "create invoices").unwrap(), "t-1");
        assert_eq!(read_scope(&principal).unwrap(), ReadScope::Tenant("t-1".into()));
    }

    #[test]
    fn test_system_admin_reads_everything_writes_nothing() {
        let principal = Principal::system_admin("ops");
        let err = require_invoice_writer(&principal, "create invoices").unwrap_err();
        assert!(matches!(
            err,
            CoreError::ForbiddenRole { role: Role::SystemAdmin, .. }
        ));
        assert_eq!(read_scope(&principal).unwrap(), ReadScope::AllTenants);
    }

    #[test]
    fn test_inactive_principal_rejected() {
        let principal = Principal::tenant_admin("t-1").deactivated();
        assert!(matches!(
            require_invoice_writer(&principal, "complete invoices"),
            Err(CoreError::InactiveAccount { .. })
        ));
        assert!(matches!(
            read_scope(&principal),
            Err(CoreError::InactiveAccount { .. })
        ));
    }

    #[test]
    fn test_scope_allows() {
        assert!(ReadScope::AllTenants.allows("anyone"));
        assert!(ReadScope::Tenant("t-1".into()).allows("t-1"));
        assert!(!ReadScope::Tenant("t-1".into()).allows("t-2"));
        assert_eq!(ReadScope::AllTenants.tenant_id(), None);
    }
}
