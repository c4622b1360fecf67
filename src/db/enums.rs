use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Parent,
}

impl Role {
    /// Position in the static hierarchy. Parents sit outside the staff/student
    /// ladder and are only admitted by routes that ask for `Role::Parent` exactly.
    pub fn rank(self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Teacher => 2,
            Role::Student => 1,
            Role::Parent => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }
}

pub fn has_permission(role: Role, required: Role) -> bool {
    role.rank() >= required.rank()
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

macro_rules! status_enum {
    ($name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum!(ConsultationStatus {
    Pending => "pending",
    Contacted => "contacted",
    Completed => "completed",
    Cancelled => "cancelled",
});

status_enum!(RegistrationStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

status_enum!(PaymentStatus {
    Ready => "ready",
    Paid => "paid",
    Failed => "failed",
    Cancelled => "cancelled",
});

status_enum!(CourseStatus {
    Draft => "draft",
    Published => "published",
    Closed => "closed",
});

status_enum!(NewsCategory {
    Notice => "notice",
    Event => "event",
    Press => "press",
    Education => "education",
});

status_enum!(NewsletterStatus {
    Draft => "draft",
    Sending => "sending",
    Sent => "sent",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(has_permission(Role::Admin, Role::Teacher));
        assert!(has_permission(Role::Admin, Role::Admin));
        assert!(has_permission(Role::Teacher, Role::Student));
        assert!(!has_permission(Role::Student, Role::Admin));
        assert!(!has_permission(Role::Teacher, Role::Admin));
        assert!(!has_permission(Role::Parent, Role::Student));
    }

    #[test]
    fn test_role_parse_and_serde() {
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Parent).unwrap(), "\"parent\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_status_strings_match_serde() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Cancelled).unwrap(),
            format!("\"{}\"", PaymentStatus::Cancelled)
        );
        let status: ConsultationStatus = serde_json::from_str("\"contacted\"").unwrap();
        assert_eq!(status, ConsultationStatus::Contacted);
        assert!(serde_json::from_str::<CourseStatus>("\"archived\"").is_err());
    }
}
