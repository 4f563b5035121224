use crate::errors::{ActionError, Operation};
use crate::models::{DEFAULT_DAILY_GOAL, Profile};
use crate::schema;
use crate::store::{Store, Table};
use serde_json::Value;
use tracing::info;

/// Base-10, strictly positive. Anything else is `None`.
pub fn parse_goal(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|goal| *goal > 0)
}

pub fn parse_goal_value(value: &Value) -> Option<u32> {
    match value {
        Value::String(s) => parse_goal(s),
        Value::Number(n) => n.as_u64().and_then(|n| parse_goal(&n.to_string())),
        _ => None,
    }
}

/// `round(total / goal * 100)` clamped to 0..=100. A zero goal counts as
/// the default goal.
pub fn progress_percentage(total: u64, goal: u32) -> u8 {
    let goal = if goal == 0 { DEFAULT_DAILY_GOAL } else { goal };
    let percent = (total as f64 / f64::from(goal) * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Persist a new goal. Returns `Ok(None)` without touching the store when
/// `raw` is not a valid goal.
pub async fn set_goal(
    store: &dyn Store,
    user_id: &str,
    raw: &str,
) -> Result<Option<Profile>, ActionError> {
    let Some(goal) = parse_goal(raw) else {
        return Ok(None);
    };
    update_goal(store, user_id, goal).await.map(Some)
}

pub async fn update_goal(
    store: &dyn Store,
    user_id: &str,
    goal: u32,
) -> Result<Profile, ActionError> {
    let rows = store
        .update(
            Table::Profiles,
            &schema::profile_key(user_id),
            schema::goal_patch(goal),
        )
        .await?;
    let row = rows.into_iter().next().ok_or(ActionError::NoRow {
        operation: Operation::Update,
        table: Table::Profiles.name(),
    })?;
    let profile = schema::decode_profile(Operation::Update, row)?;

    info!(user_id, goal = profile.daily_goal, "daily goal updated");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::profile::reconcile;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn percentage_examples() {
        assert_eq!(progress_percentage(0, 2000), 0);
        assert_eq!(progress_percentage(1000, 2000), 50);
        assert_eq!(progress_percentage(750, 2000), 38);
        assert_eq!(progress_percentage(2500, 2000), 100);
        assert_eq!(progress_percentage(1000, 0), 50);
    }

    #[test]
    fn percentage_is_monotonic_in_total() {
        let mut last = 0;
        for total in (0..5000).step_by(7) {
            let pct = progress_percentage(total, 3000);
            assert!(pct >= last);
            assert!(pct <= 100);
            last = pct;
        }
    }

    #[test]
    fn goal_parsing() {
        assert_eq!(parse_goal("3000"), Some(3000));
        assert_eq!(parse_goal(" 1500 "), Some(1500));
        assert_eq!(parse_goal("abc"), None);
        assert_eq!(parse_goal("0"), None);
        assert_eq!(parse_goal("-10"), None);
        assert_eq!(parse_goal("12.5"), None);
        assert_eq!(parse_goal_value(&json!(2500)), Some(2500));
        assert_eq!(parse_goal_value(&json!("2500")), Some(2500));
        assert_eq!(parse_goal_value(&json!(true)), None);
    }

    #[tokio::test]
    async fn set_goal_writes_only_valid_input() {
        let store = MemoryStore::new();
        let identity = Identity {
            id: 1,
            first_name: "A".into(),
            last_name: None,
            username: None,
            photo_url: None,
        };
        reconcile(&store, &identity).await.unwrap();
        let writes = store.write_count();

        assert_eq!(set_goal(&store, "1", "abc").await.unwrap(), None);
        assert_eq!(store.write_count(), writes);

        let updated = set_goal(&store, "1", "3000").await.unwrap().unwrap();
        assert_eq!(updated.daily_goal, 3000);
        assert_eq!(store.write_count(), writes + 1);
        assert_eq!(progress_percentage(750, updated.daily_goal), 25);
    }

    #[tokio::test]
    async fn missing_profile_is_no_row() {
        let store = MemoryStore::new();
        assert!(matches!(
            update_goal(&store, "404", 1000).await,
            Err(ActionError::NoRow { .. })
        ));
    }
}
