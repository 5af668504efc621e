//! Replication / cluster topology snapshot, as collected by the topology probe.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TopologyKind
// ---------------------------------------------------------------------------

/// How the target server participates in replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopologyKind {
    Standalone,
    AsyncReplica,
    SemiSyncReplica,
    Galera,
    #[serde(rename = "GROUP_REPL")]
    GroupReplication,
    AuroraWriter,
    AuroraReader,
}

impl TopologyKind {
    /// Human-readable label for renderers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Standalone => "Standalone",
            Self::AsyncReplica => "Async replica",
            Self::SemiSyncReplica => "Semi-sync replica",
            Self::Galera => "Galera / PXC cluster",
            Self::GroupReplication => "Group Replication",
            Self::AuroraWriter => "Aurora writer",
            Self::AuroraReader => "Aurora reader",
        }
    }

    /// Returns `true` for either Aurora role.
    pub fn is_aurora(&self) -> bool {
        matches!(self, Self::AuroraWriter | Self::AuroraReader)
    }

    /// Returns `true` for replica roles fed by a primary.
    pub fn is_replica_kind(&self) -> bool {
        matches!(self, Self::AsyncReplica | Self::SemiSyncReplica)
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Galera / Group Replication detail enums
// ---------------------------------------------------------------------------

/// Galera online-schema-upgrade method (`wsrep_OSU_method`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OsuMethod {
    /// Total Order Isolation: DDL runs on every node in the same order.
    Toi,
    /// Rolling Schema Upgrade: DDL runs one node at a time.
    Rsu,
}

/// Group Replication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupReplicationMode {
    #[serde(rename = "SINGLE-PRIMARY")]
    SinglePrimary,
    #[serde(rename = "MULTI-PRIMARY")]
    MultiPrimary,
}

// ---------------------------------------------------------------------------
// TopologyInfo
// ---------------------------------------------------------------------------

/// Read-only topology snapshot for one analysis.
///
/// `kind = Standalone` makes the topology overlay a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyInfo {
    #[serde(rename = "type")]
    pub kind: TopologyKind,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_replica: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_lag_secs: Option<u64>,

    // -- Galera --------------------------------------------------------------
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub galera_cluster_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub galera_osu_method: Option<OsuMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub galera_node_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wsrep_max_ws_size: Option<u64>,
    /// Fraction of time flow control was paused, in `[0, 1]`.
    #[serde(default)]
    pub flow_control_paused: f64,
    /// Pre-formatted percentage for display (e.g. `"12.5%"`).
    #[serde(default)]
    pub flow_control_paused_pct: String,

    // -- Group Replication ---------------------------------------------------
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gr_mode: Option<GroupReplicationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gr_member_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gr_member_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gr_transaction_limit: Option<u64>,

    // -- Cloud ---------------------------------------------------------------
    #[serde(default)]
    pub is_cloud_managed: bool,
    /// Provider hint (`aws-rds`, `aws-aurora`, ...); empty when unknown.
    #[serde(default)]
    pub cloud_provider: String,
}

impl Default for TopologyInfo {
    fn default() -> Self {
        Self {
            kind: TopologyKind::Standalone,
            read_only: false,
            is_primary: true,
            is_replica: false,
            replica_lag_secs: None,
            galera_cluster_size: None,
            galera_osu_method: None,
            galera_node_state: None,
            wsrep_max_ws_size: None,
            flow_control_paused: 0.0,
            flow_control_paused_pct: String::new(),
            gr_mode: None,
            gr_member_count: None,
            gr_member_role: None,
            gr_transaction_limit: None,
            is_cloud_managed: false,
            cloud_provider: String::new(),
        }
    }
}

impl TopologyInfo {
    /// A standalone topology (the overlay no-op).
    pub fn standalone() -> Self {
        Self::default()
    }

    /// Returns `true` when the cluster kind routes COPY operations away
    /// from gh-ost (Galera and both Aurora roles).
    pub fn forces_ptosc(&self) -> bool {
        self.kind == TopologyKind::Galera || self.kind.is_aurora()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_standalone_primary() {
        let t = TopologyInfo::default();
        assert_eq!(t.kind, TopologyKind::Standalone);
        assert!(t.is_primary);
        assert!(!t.is_replica);
        assert!(!t.forces_ptosc());
    }

    #[test]
    fn galera_and_aurora_force_ptosc() {
        let mut t = TopologyInfo::default();
        t.kind = TopologyKind::Galera;
        assert!(t.forces_ptosc());
        t.kind = TopologyKind::AuroraWriter;
        assert!(t.forces_ptosc());
        t.kind = TopologyKind::AuroraReader;
        assert!(t.forces_ptosc());
        t.kind = TopologyKind::GroupReplication;
        assert!(!t.forces_ptosc());
    }

    #[test]
    fn kind_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&TopologyKind::AuroraWriter).unwrap(),
            r#""AURORA_WRITER""#
        );
        assert_eq!(
            serde_json::to_string(&TopologyKind::GroupReplication).unwrap(),
            r#""GROUP_REPL""#
        );
        assert_eq!(
            serde_json::to_string(&TopologyKind::SemiSyncReplica).unwrap(),
            r#""SEMI_SYNC_REPLICA""#
        );
    }

    #[test]
    fn replica_kinds() {
        assert!(TopologyKind::AsyncReplica.is_replica_kind());
        assert!(TopologyKind::SemiSyncReplica.is_replica_kind());
        assert!(!TopologyKind::Galera.is_replica_kind());
        assert!(!TopologyKind::AuroraReader.is_replica_kind());
    }
}
