//! Role, capability and route policy tables.
//!
//! This is the single source of truth for who may do what. The edge gate
//! ([`super::middleware`]), navigation filtering and in-page checks all read from
//! here; nothing else in the crate holds a copy of these tables.
//!
//! ```text
//! Role ──permissions_for──▶ [capability]      "view:dashboard", "manage:users", ...
//! path ──allowed_roles────▶ [Role]            longest protected prefix wins
//! ```

use serde::Serialize;

use super::models::{Role, User};

pub const VIEW_DASHBOARD: &str = "view:dashboard";
pub const VIEW_OWN_COURSES: &str = "view:own-courses";
pub const SUBMIT_ASSIGNMENTS: &str = "submit:assignments";
pub const VIEW_OWN_GRADES: &str = "view:own-grades";
pub const CREATE_COURSES: &str = "create:courses";
pub const EDIT_OWN_COURSES: &str = "edit:own-courses";
pub const GRADE_ASSIGNMENTS: &str = "grade:assignments";
pub const VIEW_STUDENTS: &str = "view:students";
pub const MANAGE_OWN_STUDENTS: &str = "manage:own-students";
pub const VIEW_ALL_COURSES: &str = "view:all-courses";
pub const EDIT_ALL_COURSES: &str = "edit:all-courses";
pub const DELETE_COURSES: &str = "delete:courses";
pub const VIEW_ALL_USERS: &str = "view:all-users";
pub const MANAGE_USERS: &str = "manage:users";
pub const MANAGE_ROLES: &str = "manage:roles";
pub const VIEW_ANALYTICS: &str = "view:analytics";
pub const MANAGE_SYSTEM: &str = "manage:system";

const STUDENT_PERMISSIONS: &[&str] = &[
    VIEW_DASHBOARD,
    VIEW_OWN_COURSES,
    SUBMIT_ASSIGNMENTS,
    VIEW_OWN_GRADES,
];

const TEACHER_PERMISSIONS: &[&str] = &[
    VIEW_DASHBOARD,
    VIEW_OWN_COURSES,
    CREATE_COURSES,
    EDIT_OWN_COURSES,
    GRADE_ASSIGNMENTS,
    VIEW_STUDENTS,
    MANAGE_OWN_STUDENTS,
];

const ADMIN_PERMISSIONS: &[&str] = &[
    VIEW_DASHBOARD,
    VIEW_ALL_COURSES,
    CREATE_COURSES,
    EDIT_ALL_COURSES,
    DELETE_COURSES,
    VIEW_ALL_USERS,
    MANAGE_USERS,
    MANAGE_ROLES,
    VIEW_ANALYTICS,
    MANAGE_SYSTEM,
];

const EVERYONE: &[Role] = &[Role::Student, Role::Teacher, Role::Admin];
const STAFF: &[Role] = &[Role::Teacher, Role::Admin];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Protected path prefixes and the roles allowed to enter them.
pub const ROUTE_POLICY: &[(&str, &[Role])] = &[
    ("/dashboard", EVERYONE),
    ("/admin/dashboard", ADMIN_ONLY),
    ("/teacher/dashboard", STAFF),
    ("/student/dashboard", EVERYONE),
    ("/courses", EVERYONE),
    ("/students", STAFF),
    ("/assignments", EVERYONE),
    ("/analytics", ADMIN_ONLY),
    ("/users", ADMIN_ONLY),
    ("/settings", EVERYONE),
    ("/profile", EVERYONE),
];

/// Paths reachable without a session. Matched as path prefixes.
pub const PUBLIC_PREFIXES: &[&str] = &["/login", "/signup", "/api/auth", "/unauthorized"];

/// The landing page. Public only as an exact match, never as a prefix.
pub const LANDING: &str = "/";

pub fn permissions_for(role: Role) -> &'static [&'static str] {
    match role {
        Role::Student => STUDENT_PERMISSIONS,
        Role::Teacher => TEACHER_PERMISSIONS,
        Role::Admin => ADMIN_PERMISSIONS,
    }
}

/// `false` for an absent user, otherwise a membership test on the user's role.
pub fn has_permission(user: Option<&User>, capability: &str) -> bool {
    user.is_some_and(|u| permissions_for(u.role).contains(&capability))
}

pub fn is_role(user: Option<&User>, role: Role) -> bool {
    user.is_some_and(|u| u.role == role)
}

/// `/courses` matches `/courses` and `/courses/42`, but not `/coursesx`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

pub fn is_public(path: &str) -> bool {
    path == LANDING || PUBLIC_PREFIXES.iter().any(|p| matches_prefix(path, p))
}

/// The policy entry governing `path`, if any. The longest matching prefix wins.
pub fn route_policy(path: &str) -> Option<(&'static str, &'static [Role])> {
    ROUTE_POLICY
        .iter()
        .filter(|(prefix, _)| matches_prefix(path, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .copied()
}

/// Roles allowed under `path`; `None` when the path is not protected.
pub fn allowed_roles(path: &str) -> Option<&'static [Role]> {
    route_policy(path).map(|(_, roles)| roles)
}

/// Whether the edge gate would let `role` into `route`. Unprotected routes are open.
pub fn has_route_permission(role: Role, route: &str) -> bool {
    allowed_roles(route).map_or(true, |roles| roles.contains(&role))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

const fn nav(
    label: &'static str,
    href: &'static str,
    permission: Option<&'static str>,
    role: Option<Role>,
) -> NavItem {
    NavItem {
        label,
        href,
        permission,
        role,
    }
}

pub const NAV_ITEMS: &[NavItem] = &[
    nav("Dashboard", "/dashboard", Some(VIEW_DASHBOARD), None),
    nav("Courses", "/courses", Some(VIEW_OWN_COURSES), None),
    nav("Students", "/students", Some(VIEW_STUDENTS), Some(Role::Teacher)),
    nav("Assignments", "/assignments", Some(SUBMIT_ASSIGNMENTS), None),
    nav("Calendar", "/calendar", Some(VIEW_DASHBOARD), None),
    nav("User Management", "/users", Some(MANAGE_USERS), Some(Role::Admin)),
    nav("Analytics", "/analytics", Some(VIEW_ANALYTICS), Some(Role::Admin)),
    nav("Settings", "/settings", Some(VIEW_DASHBOARD), None),
    nav("Profile", "/profile", Some(VIEW_DASHBOARD), None),
];

/// Navigation entries the user should see. Advisory only; the edge gate decides access.
pub fn visible_nav(user: Option<&User>) -> Vec<NavItem> {
    user.map(|u| nav_for_role(u.role)).unwrap_or_default()
}

pub fn nav_for_role(role: Role) -> Vec<NavItem> {
    NAV_ITEMS
        .iter()
        .filter(|item| item.permission.map_or(true, |p| permissions_for(role).contains(&p)))
        .filter(|item| item.role.map_or(true, |r| r == role))
        .filter(|item| has_route_permission(role, item.href))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "1".into(),
            email: format!("{role}@school.io"),
            role,
            name: None,
        }
    }

    const ALL_CAPABILITIES: &[&str] = &[
        VIEW_DASHBOARD,
        VIEW_OWN_COURSES,
        SUBMIT_ASSIGNMENTS,
        VIEW_OWN_GRADES,
        CREATE_COURSES,
        EDIT_OWN_COURSES,
        GRADE_ASSIGNMENTS,
        VIEW_STUDENTS,
        MANAGE_OWN_STUDENTS,
        VIEW_ALL_COURSES,
        EDIT_ALL_COURSES,
        DELETE_COURSES,
        VIEW_ALL_USERS,
        MANAGE_USERS,
        MANAGE_ROLES,
        VIEW_ANALYTICS,
        MANAGE_SYSTEM,
    ];

    #[test]
    fn has_permission_matches_table_for_every_role() {
        for role in Role::ALL {
            let u = user(role);
            for cap in ALL_CAPABILITIES {
                assert_eq!(
                    has_permission(Some(&u), cap),
                    permissions_for(role).contains(cap),
                    "{role} / {cap}"
                );
            }
        }
    }

    #[test]
    fn absent_user_has_nothing() {
        for cap in ALL_CAPABILITIES {
            assert!(!has_permission(None, cap));
        }
        assert!(!is_role(None, Role::Student));
        assert!(visible_nav(None).is_empty());
    }

    #[test]
    fn tables_are_total() {
        for role in Role::ALL {
            assert!(!permissions_for(role).is_empty());
        }
        for (prefix, roles) in ROUTE_POLICY {
            assert!(!roles.is_empty(), "{prefix} has no roles");
        }
        assert_eq!(permissions_for(Role::Student).len(), 4);
        assert_eq!(permissions_for(Role::Teacher).len(), 7);
        assert_eq!(permissions_for(Role::Admin).len(), 10);
    }

    #[test]
    fn each_protected_prefix_appears_once() {
        for (i, (a, _)) in ROUTE_POLICY.iter().enumerate() {
            for (b, _) in &ROUTE_POLICY[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn prefix_matching_is_segment_aware() {
        assert_eq!(allowed_roles("/students"), Some(STAFF));
        assert_eq!(allowed_roles("/students/7"), Some(STAFF));
        assert_eq!(allowed_roles("/student/dashboard"), Some(EVERYONE));
        assert_eq!(allowed_roles("/courses/42/edit"), Some(EVERYONE));
        assert_eq!(allowed_roles("/coursesx"), None);
        assert_eq!(allowed_roles("/calendar"), None);
    }

    #[test]
    fn longest_prefix_wins() {
        assert_eq!(
            route_policy("/admin/dashboard/reports"),
            Some(("/admin/dashboard", ADMIN_ONLY))
        );
    }

    #[test]
    fn landing_is_public_only_as_exact_match() {
        assert!(is_public("/"));
        assert!(is_public("/login"));
        assert!(is_public("/api/auth/login"));
        assert!(is_public("/unauthorized"));
        assert!(!is_public("/dashboard"));
        assert!(!is_public("/loginx"));
    }

    #[test]
    fn route_permissions() {
        assert!(has_route_permission(Role::Admin, "/admin/dashboard"));
        assert!(!has_route_permission(Role::Teacher, "/admin/dashboard"));
        assert!(has_route_permission(Role::Teacher, "/teacher/dashboard"));
        assert!(!has_route_permission(Role::Student, "/students"));
        assert!(has_route_permission(Role::Student, "/calendar"));
        assert!(has_route_permission(Role::Student, "/courses/42"));
    }

    #[test]
    fn nav_never_links_past_the_gate() {
        for role in Role::ALL {
            for item in nav_for_role(role) {
                assert!(has_route_permission(role, item.href), "{role}: {}", item.href);
            }
        }
    }

    #[test]
    fn nav_filters_by_capability_and_role() {
        let labels = |role| {
            visible_nav(Some(&user(role)))
                .into_iter()
                .map(|i| i.label)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            labels(Role::Student),
            ["Dashboard", "Courses", "Assignments", "Calendar", "Settings", "Profile"]
        );
        assert_eq!(
            labels(Role::Teacher),
            ["Dashboard", "Courses", "Students", "Calendar", "Settings", "Profile"]
        );
        assert_eq!(
            labels(Role::Admin),
            ["Dashboard", "Calendar", "User Management", "Analytics", "Settings", "Profile"]
        );
    }
}
