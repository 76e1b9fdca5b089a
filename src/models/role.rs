string_enum! {
    /// Account level role, used for display and coarse permission hints.
    pub enum UserRole {
        Admin => ("admin", "Admin"),
        Manager => ("manager", "Manager"),
        Developer => ("developer", "Developer"),
        Member => ("member", "Member"),
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Member
    }
}

string_enum! {
    /// Role held on a team or project membership row.
    pub enum MemberRole {
        Owner => ("owner", "Owner"),
        Admin => ("admin", "Admin"),
        Member => ("member", "Member"),
    }
}

impl MemberRole {
    pub fn is_owner(&self) -> bool {
        matches!(self, MemberRole::Owner)
    }

    /// Owners carry every admin right.
    pub fn is_admin(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl Default for MemberRole {
    fn default() -> Self {
        MemberRole::Member
    }
}

string_enum! {
    pub enum Priority {
        High => ("high", "High"),
        Medium => ("medium", "Medium"),
        Low => ("low", "Low"),
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_counts_as_admin() {
        assert!(MemberRole::Owner.is_admin());
        assert!(MemberRole::Admin.is_admin());
        assert!(!MemberRole::Member.is_admin());
        assert!(!MemberRole::Admin.is_owner());
    }

    #[test]
    fn parses_stored_values() {
        assert_eq!("developer".parse::<UserRole>(), Ok(UserRole::Developer));
        assert!("superuser".parse::<UserRole>().is_err());
        assert_eq!(MemberRole::choices(), "owner, admin, member");
        assert_eq!(Priority::High.label(), "High");
    }
}
