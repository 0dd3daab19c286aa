//! Permission names carried in token claims.
//!
//! Permissions are `resource:action` strings. The `admin` role bypasses
//! every check.

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const WRITE: &'static str = "write";
    pub const BULK: &'static str = "bulk";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const ITEMS: &'static str = "items";
    pub const BOMS: &'static str = "boms";
}

/// Builds `resource:action`.
pub fn permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Items
    pub const ITEMS_READ: &str = "items:read";
    pub const ITEMS_WRITE: &str = "items:write";
    pub const ITEMS_BULK: &str = "items:bulk";

    // BOM lines
    pub const BOMS_READ: &str = "boms:read";
    pub const BOMS_WRITE: &str = "boms:write";
    pub const BOMS_BULK: &str = "boms:bulk";

    pub const ADMIN_ROLE: &str = "admin";
}

/// Every permission the service checks.
pub fn all_permissions() -> Vec<String> {
    [Resources::ITEMS, Resources::BOMS]
        .iter()
        .flat_map(|resource| {
            [Actions::READ, Actions::WRITE, Actions::BULK]
                .iter()
                .map(move |action| permission(resource, action))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_builder() {
        assert_eq!(permission(Resources::ITEMS, Actions::READ), consts::ITEMS_READ);
        assert_eq!(permission(Resources::BOMS, Actions::BULK), consts::BOMS_BULK);
    }

    #[test]
    fn all_permissions_lists_six_entries() {
        let all = all_permissions();
        assert_eq!(all.len(), 6);
        assert!(all.contains(&consts::ITEMS_WRITE.to_string()));
        assert!(all.contains(&consts::BOMS_WRITE.to_string()));
    }
}
