use serde::Serialize;

use crate::auth::repo_types::{Principal, Role, User};
use crate::weights::repo_types::WeightRecord;
use crate::weights::trend::{sort_by_date, TrendSummary};

#[derive(Debug, Serialize)]
pub struct RosterEntry {
    pub user: Principal,
    /// "first last", or "N/A" unless both names are present.
    pub full_name: String,
    pub records: Vec<WeightRecord>,
    pub summary: TrendSummary,
}

/// Admins see everyone but other admins; doctors see patients only.
pub fn is_visible_to(viewer: Role, target: Role) -> bool {
    match viewer {
        Role::Admin => target != Role::Admin,
        Role::Doctor | Role::User => target == Role::User,
    }
}

fn full_name(user: &User) -> Option<String> {
    match (user.first_name.as_deref(), user.last_name.as_deref()) {
        (Some(f), Some(l)) if !f.is_empty() && !l.is_empty() => Some(format!("{f} {l}")),
        _ => None,
    }
}

fn matches_search(user: &User, needle: &str) -> bool {
    let name = format!(
        "{} {}",
        user.first_name.as_deref().unwrap_or(""),
        user.last_name.as_deref().unwrap_or("")
    )
    .to_lowercase();
    name.contains(needle) || user.email.to_lowercase().contains(needle)
}

/// Filters by the viewer's role and the search term, newest account first.
pub fn build_roster(
    viewer: Role,
    rows: Vec<(User, Vec<WeightRecord>)>,
    search: Option<&str>,
) -> Vec<RosterEntry> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut visible: Vec<_> = rows
        .into_iter()
        .filter(|(u, _)| is_visible_to(viewer, u.role))
        .filter(|(u, _)| needle.as_deref().map_or(true, |n| matches_search(u, n)))
        .collect();
    visible.sort_by(|(a, _), (b, _)| b.created_at.cmp(&a.created_at));

    visible
        .into_iter()
        .map(|(user, mut records)| {
            sort_by_date(&mut records);
            RosterEntry {
                full_name: full_name(&user).unwrap_or_else(|| "N/A".into()),
                summary: TrendSummary::from_sorted(&records),
                user: Principal::from(&user),
                records,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn user(email: &str, role: Role, names: Option<(&str, &str)>, age_days: i64) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: String::new(),
            role,
            first_name: names.map(|n| n.0.to_string()),
            last_name: names.map(|n| n.1.to_string()),
            created_at: OffsetDateTime::UNIX_EPOCH + Duration::days(1000 - age_days),
        }
    }

    fn rows() -> Vec<(User, Vec<WeightRecord>)> {
        let pat = user("pat@example.com", Role::User, Some(("Pat", "Lee")), 10);
        let sam = user("sam@example.com", Role::User, None, 1);
        let doc = user("doc@example.com", Role::Doctor, None, 5);
        let admin = user("root@example.com", Role::Admin, None, 20);
        let pat_records = vec![
            WeightRecord {
                user_id: pat.id,
                date: date!(2024 - 05 - 02),
                weight: 70.0,
            },
            WeightRecord {
                user_id: pat.id,
                date: date!(2024 - 04 - 01),
                weight: 72.0,
            },
        ];
        vec![
            (pat, pat_records),
            (sam, vec![]),
            (doc, vec![]),
            (admin, vec![]),
        ]
    }

    #[test]
    fn visibility_by_viewer_role() {
        assert!(is_visible_to(Role::Admin, Role::Doctor));
        assert!(is_visible_to(Role::Admin, Role::User));
        assert!(!is_visible_to(Role::Admin, Role::Admin));
        assert!(is_visible_to(Role::Doctor, Role::User));
        assert!(!is_visible_to(Role::Doctor, Role::Doctor));
        assert!(!is_visible_to(Role::Doctor, Role::Admin));
    }

    #[test]
    fn admin_roster_sorted_newest_first() {
        let roster = build_roster(Role::Admin, rows(), None);
        let emails: Vec<_> = roster.iter().map(|e| e.user.email.as_str()).collect();
        assert_eq!(
            emails,
            vec!["sam@example.com", "doc@example.com", "pat@example.com"]
        );
    }

    #[test]
    fn doctor_roster_only_patients_with_sorted_records() {
        let roster = build_roster(Role::Doctor, rows(), None);
        assert_eq!(roster.len(), 2);
        let pat = roster
            .iter()
            .find(|e| e.user.email == "pat@example.com")
            .unwrap();
        assert_eq!(pat.full_name, "Pat Lee");
        assert_eq!(pat.records[0].date, date!(2024 - 04 - 01));
        assert_eq!(pat.summary.change, Some(-2.0));

        let sam = roster
            .iter()
            .find(|e| e.user.email == "sam@example.com")
            .unwrap();
        assert_eq!(sam.full_name, "N/A");
    }

    #[test]
    fn search_matches_name_or_email_case_insensitively() {
        let by_name = build_roster(Role::Doctor, rows(), Some("pAT l"));
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].user.email, "pat@example.com");

        let by_email = build_roster(Role::Admin, rows(), Some("DOC@"));
        assert_eq!(by_email.len(), 1);

        let blank = build_roster(Role::Doctor, rows(), Some("  "));
        assert_eq!(blank.len(), 2);
    }
}
