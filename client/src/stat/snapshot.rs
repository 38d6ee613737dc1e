use super::error::GatewayError;
use super::sync::{Gateway, Identity};
use xp_stat::*;

/// Everything one fetch cycle shows: who is signed in and the aggregates of
/// their XP feed. Rebuilt from scratch on every refresh.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub identity: Identity,
    pub series: CumulativeSeries,
    pub projects: Vec<ProjectTotal>,
    pub milestones: Milestones,
}

impl Snapshot {
    pub fn build(identity: Identity, transactions: &[RawTransaction]) -> Self {
        let series = build_cumulative_series(transactions);
        let projects = build_grouped_totals(&series.points);
        let milestones = compute_milestones(&series.points);
        Self {
            identity,
            series,
            projects,
            milestones,
        }
    }

    pub async fn fetch(gateway: &Gateway) -> Result<Self, GatewayError> {
        let identity = gateway.fetch_identity().await?;
        let transactions = gateway.fetch_transactions().await?;
        Ok(Self::build(identity, &transactions))
    }

    pub fn top_projects(&self, n: usize) -> &[ProjectTotal] {
        &self.projects[..n.min(self.projects.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xp_stat::sample_data::sample_transactions;

    fn identity() -> Identity {
        Identity {
            id: 42,
            display_name: "jdoe".into(),
            email: "jdoe@example.com".into(),
        }
    }

    #[test]
    fn build_runs_all_three_aggregations() {
        let snap = Snapshot::build(identity(), &sample_transactions());
        let project_sum: f64 = snap.projects.iter().map(|p| p.total_xp).sum();
        assert_eq!(project_sum, snap.series.total);
        assert_eq!(snap.milestones.distinct_entity_count, snap.projects.len());
        assert_eq!(snap.projects[0].entity_name, "alpha");
    }

    #[test]
    fn top_projects_truncates_without_panicking() {
        let snap = Snapshot::build(identity(), &sample_transactions());
        assert_eq!(snap.top_projects(2).len(), 2);
        assert_eq!(snap.top_projects(100).len(), snap.projects.len());

        let empty = Snapshot::build(identity(), &[]);
        assert!(empty.top_projects(12).is_empty());
        assert!(empty.milestones.is_empty());
    }
}
