//! Planning of automatic income allocation to savings goals.
//!
//! The planner is pure: it takes the income and the candidate goals and
//! returns how much each goal receives. Persistence lives in `ops::goals`.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Goal, Money};

/// Default share of each income moved to every auto-allocate goal (10%).
pub const DEFAULT_ALLOCATION_RATE_BPS: u32 = 1_000;

/// Order in which goals are served and how a capped pool is shared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Oldest goal first.
    #[default]
    Fifo,
    /// Highest `priority` first, oldest first on ties.
    Priority,
    /// Every goal receives the same fraction of its ask.
    Proportional,
}

impl TryFrom<&str> for AllocationStrategy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "priority" => Ok(Self::Priority),
            "proportional" => Ok(Self::Proportional),
            other => Err(EngineError::InvalidAmount(format!(
                "unknown allocation strategy: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationPolicy {
    /// Rate applied to goals without their own `allocation_rate_bps`.
    pub rate_bps: u32,
    pub strategy: AllocationStrategy,
    /// Upper bound on the total moved out of one income, if any.
    pub max_total_bps: Option<u32>,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            rate_bps: DEFAULT_ALLOCATION_RATE_BPS,
            strategy: AllocationStrategy::default(),
            max_total_bps: None,
        }
    }
}

/// Amount planned for one goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationShare {
    pub goal_id: Uuid,
    pub amount: Money,
}

impl AllocationPolicy {
    /// Splits `income` across the auto-allocate goals.
    ///
    /// Each goal asks for `min(income * rate, target - current)`. Without a
    /// cap every ask is granted. With a cap smaller than the sum of the asks,
    /// `fifo`/`priority` serve goals in order until the pool is empty and
    /// `proportional` scales every ask by `pool / sum`.
    ///
    /// Shares are returned in service order; zero shares are omitted.
    #[must_use]
    pub fn plan(&self, income: Money, goals: &[Goal]) -> Vec<AllocationShare> {
        if !income.is_positive() {
            return Vec::new();
        }

        let mut ordered: Vec<&Goal> = goals.iter().filter(|g| g.auto_allocate).collect();
        match self.strategy {
            AllocationStrategy::Fifo | AllocationStrategy::Proportional => {
                ordered.sort_by_key(|g| (g.created_at, g.id));
            }
            AllocationStrategy::Priority => {
                ordered.sort_by_key(|g| (Reverse(g.priority), g.created_at, g.id));
            }
        }

        let asks: Vec<Money> = ordered
            .iter()
            .map(|goal| {
                let rate = goal.allocation_rate_bps.unwrap_or(self.rate_bps);
                income.scale_bps(rate).min(goal.remaining()).max(Money::ZERO)
            })
            .collect();

        let requested: i128 = asks.iter().map(|m| i128::from(m.minor())).sum();
        let granted = match self.max_total_bps.map(|bps| income.scale_bps(bps)) {
            Some(pool) if requested > i128::from(pool.minor()) => match self.strategy {
                AllocationStrategy::Fifo | AllocationStrategy::Priority => fill_in_order(&asks, pool),
                AllocationStrategy::Proportional => scale_to_pool(&asks, pool, requested),
            },
            _ => asks,
        };

        ordered
            .iter()
            .zip(granted)
            .filter(|(_, amount)| amount.is_positive())
            .map(|(goal, amount)| AllocationShare {
                goal_id: goal.id,
                amount,
            })
            .collect()
    }
}

fn fill_in_order(asks: &[Money], pool: Money) -> Vec<Money> {
    let mut left = pool;
    asks.iter()
        .map(|ask| {
            let give = (*ask).min(left);
            left = left - give;
            give
        })
        .collect()
}

fn scale_to_pool(asks: &[Money], pool: Money, requested: i128) -> Vec<Money> {
    let pool_minor = i128::from(pool.minor());
    let mut shares: Vec<i64> = asks
        .iter()
        .map(|ask| {
            let share = i128::from(ask.minor()) * pool_minor / requested;
            i64::try_from(share).unwrap_or(0)
        })
        .collect();

    // Floor division leaves a few minor units; hand them out in order.
    let mut leftover = pool.minor() - shares.iter().sum::<i64>();
    for (share, ask) in shares.iter_mut().zip(asks) {
        if leftover <= 0 {
            break;
        }
        let extra = (ask.minor() - *share).min(leftover);
        *share += extra;
        leftover -= extra;
    }

    shares.into_iter().map(Money::new).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::*;

    fn goal(target: i64, current: i64, age_days: i64, priority: i32) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            name: format!("goal-{age_days}"),
            target_minor: target,
            current_minor: current,
            deadline: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            auto_allocate: true,
            priority,
            allocation_rate_bps: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() - Duration::days(age_days),
        }
    }

    fn amounts(shares: &[AllocationShare]) -> Vec<i64> {
        shares.iter().map(|s| s.amount.minor()).collect()
    }

    #[test]
    fn ten_percent_of_income_goes_to_each_goal() {
        let goals = vec![goal(1_000_000, 0, 0, 0)];
        let shares = AllocationPolicy::default().plan(Money::new(100_000), &goals);
        assert_eq!(amounts(&shares), vec![10_000]);
        assert_eq!(shares[0].goal_id, goals[0].id);
    }

    #[test]
    fn allocation_is_capped_by_remaining_capacity() {
        let goals = vec![goal(10_000, 9_500, 0, 0), goal(10_000, 10_000, 1, 0)];
        let shares = AllocationPolicy::default().plan(Money::new(100_000), &goals);
        assert_eq!(amounts(&shares), vec![500]);
    }

    #[test]
    fn goals_without_auto_allocate_are_skipped() {
        let mut manual = goal(1_000_000, 0, 0, 0);
        manual.auto_allocate = false;
        let shares = AllocationPolicy::default().plan(Money::new(100_000), &[manual]);
        assert!(shares.is_empty());
    }

    #[test]
    fn per_goal_rate_overrides_default() {
        let mut g = goal(1_000_000, 0, 0, 0);
        g.allocation_rate_bps = Some(2_500);
        let shares = AllocationPolicy::default().plan(Money::new(100_000), &[g]);
        assert_eq!(amounts(&shares), vec![25_000]);
    }

    #[test]
    fn without_cap_every_strategy_grants_the_same_amounts() {
        let goals = vec![goal(1_000_000, 0, 2, 0), goal(5_000, 0, 1, 9)];
        for strategy in [
            AllocationStrategy::Fifo,
            AllocationStrategy::Priority,
            AllocationStrategy::Proportional,
        ] {
            let policy = AllocationPolicy {
                strategy,
                ..AllocationPolicy::default()
            };
            let mut got = amounts(&policy.plan(Money::new(100_000), &goals));
            got.sort_unstable();
            assert_eq!(got, vec![5_000, 10_000], "{strategy:?}");
        }
    }

    #[test]
    fn fifo_fills_oldest_goal_first_under_cap() {
        let older = goal(1_000_000, 0, 10, 0);
        let newer = goal(1_000_000, 0, 1, 0);
        let policy = AllocationPolicy {
            max_total_bps: Some(1_500),
            ..AllocationPolicy::default()
        };
        let shares = policy.plan(Money::new(100_000), &[newer.clone(), older.clone()]);
        assert_eq!(shares[0].goal_id, older.id);
        assert_eq!(amounts(&shares), vec![10_000, 5_000]);
    }

    #[test]
    fn priority_serves_highest_priority_first_under_cap() {
        let low = goal(1_000_000, 0, 10, 1);
        let high = goal(1_000_000, 0, 1, 5);
        let policy = AllocationPolicy {
            strategy: AllocationStrategy::Priority,
            max_total_bps: Some(1_000),
            ..AllocationPolicy::default()
        };
        let shares = policy.plan(Money::new(100_000), &[low, high.clone()]);
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].goal_id, high.id);
        assert_eq!(shares[0].amount, Money::new(10_000));
    }

    #[test]
    fn proportional_scales_asks_to_the_pool() {
        let a = goal(1_000_000, 0, 2, 0);
        let b = goal(1_000_000, 0, 1, 0);
        let policy = AllocationPolicy {
            strategy: AllocationStrategy::Proportional,
            max_total_bps: Some(1_001),
            ..AllocationPolicy::default()
        };
        let shares = policy.plan(Money::new(100_000), &[a, b]);
        let total: i64 = amounts(&shares).iter().sum();
        assert_eq!(total, 10_010);
        assert_eq!(amounts(&shares), vec![5_005, 5_005]);
    }

    #[test]
    fn planned_amounts_never_exceed_remaining_capacity() {
        let goals = vec![
            goal(1_000, 999, 3, 0),
            goal(50_000, 49_000, 2, 0),
            goal(7, 0, 1, 0),
        ];
        for income in [1, 99, 10_000, 1_000_000, 987_654_321] {
            let shares = AllocationPolicy::default().plan(Money::new(income), &goals);
            for share in shares {
                let g = goals.iter().find(|g| g.id == share.goal_id).unwrap();
                assert!(share.amount <= g.remaining());
            }
        }
    }

    #[test]
    fn non_positive_income_plans_nothing() {
        let goals = vec![goal(1_000_000, 0, 0, 0)];
        assert!(AllocationPolicy::default().plan(Money::ZERO, &goals).is_empty());
    }

    #[test]
    fn strategy_parses_from_config_strings() {
        assert_eq!(
            AllocationStrategy::try_from(" Priority ").unwrap(),
            AllocationStrategy::Priority
        );
        assert!(AllocationStrategy::try_from("random").is_err());
    }
}
