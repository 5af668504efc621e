//! Topology and version probes.
//!
//! The probe gathers raw server variables/status into a [`TopologySample`];
//! classification into a [`TopologyInfo`] is a pure function over that
//! sample so the decision rules are testable without a server.

use std::collections::HashMap;

use mysql::prelude::Queryable;
use mysql::Conn;

use dbsafe_core::topology::{GroupReplicationMode, OsuMethod, TopologyInfo, TopologyKind};
use dbsafe_core::version::ServerVersion;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Version probe
// ---------------------------------------------------------------------------

/// Reads and parses the server version, with Aurora detection.
pub fn probe_version(conn: &mut Conn) -> Result<ServerVersion> {
    let version: String = conn
        .query_first("SELECT VERSION()")?
        .unwrap_or_default();
    let mut parsed = ServerVersion::parse(&version);

    // aurora_version() only exists on Aurora; an error simply means "not
    // Aurora".
    if let Ok(Some(av)) = conn.query_first::<String, _>("SELECT aurora_version()") {
        parsed.flavor = dbsafe_core::version::ServerFlavor::AuroraMysql;
        parsed.aurora_version = Some(av);
    } else if let Ok(Some(comment)) = conn.query_first::<String, _>("SELECT @@version_comment") {
        let comment = comment.to_ascii_lowercase();
        if comment.contains("percona") {
            parsed.flavor = dbsafe_core::version::ServerFlavor::Percona;
        } else if comment.contains("mariadb") {
            parsed.flavor = dbsafe_core::version::ServerFlavor::Mariadb;
        }
    }

    tracing::debug!(version = %parsed, flavor = %parsed.flavor, "probed server version");
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Topology sample
// ---------------------------------------------------------------------------

/// Raw values the classifier works from. All optional: most servers expose
/// only a handful of these.
#[derive(Debug, Clone, Default)]
pub struct TopologySample {
    pub read_only: bool,
    pub innodb_read_only: bool,
    pub aurora_version: Option<String>,
    pub basedir: String,

    pub wsrep_on: bool,
    pub wsrep_cluster_size: Option<u32>,
    pub wsrep_osu_method: Option<String>,
    pub wsrep_local_state_comment: Option<String>,
    pub wsrep_max_ws_size: Option<u64>,
    pub wsrep_flow_control_paused: Option<f64>,

    pub gr_group_name: Option<String>,
    pub gr_single_primary_mode: Option<bool>,
    pub gr_member_count: Option<u32>,
    pub gr_member_role: Option<String>,
    pub gr_transaction_size_limit: Option<u64>,

    pub replica_io_running: bool,
    pub replica_lag_secs: Option<u64>,
    pub semi_sync_replica: bool,
}

/// Collects the sample from a live connection.
pub fn collect_sample(conn: &mut Conn) -> Result<TopologySample> {
    let mut sample = TopologySample {
        read_only: query_flag(conn, "SELECT @@global.read_only"),
        innodb_read_only: query_flag(conn, "SELECT @@global.innodb_read_only"),
        basedir: conn
            .query_first::<String, _>("SELECT @@basedir")?
            .unwrap_or_default(),
        ..Default::default()
    };

    if let Ok(Some(av)) = conn.query_first::<String, _>("SELECT aurora_version()") {
        sample.aurora_version = Some(av);
    }

    let wsrep_vars = show_like(conn, "SHOW GLOBAL VARIABLES LIKE 'wsrep%'");
    let wsrep_status = show_like(conn, "SHOW GLOBAL STATUS LIKE 'wsrep%'");
    sample.wsrep_on = wsrep_vars
        .get("wsrep_on")
        .is_some_and(|v| v.eq_ignore_ascii_case("ON"));
    sample.wsrep_cluster_size = wsrep_status
        .get("wsrep_cluster_size")
        .and_then(|v| v.parse().ok());
    sample.wsrep_osu_method = wsrep_vars.get("wsrep_osu_method").cloned();
    sample.wsrep_local_state_comment = wsrep_status.get("wsrep_local_state_comment").cloned();
    sample.wsrep_max_ws_size = wsrep_vars
        .get("wsrep_max_ws_size")
        .and_then(|v| v.parse().ok());
    sample.wsrep_flow_control_paused = wsrep_status
        .get("wsrep_flow_control_paused")
        .and_then(|v| v.parse().ok());

    let gr_vars = show_like(conn, "SHOW GLOBAL VARIABLES LIKE 'group_replication%'");
    sample.gr_group_name = gr_vars
        .get("group_replication_group_name")
        .filter(|v| !v.is_empty())
        .cloned();
    sample.gr_single_primary_mode = gr_vars
        .get("group_replication_single_primary_mode")
        .map(|v| v.eq_ignore_ascii_case("ON"));
    sample.gr_transaction_size_limit = gr_vars
        .get("group_replication_transaction_size_limit")
        .and_then(|v| v.parse().ok());
    if sample.gr_group_name.is_some() {
        sample.gr_member_count = conn
            .query_first("SELECT COUNT(*) FROM performance_schema.replication_group_members")
            .unwrap_or(None);
        sample.gr_member_role = conn
            .query_first(
                "SELECT MEMBER_ROLE FROM performance_schema.replication_group_members \
                 WHERE MEMBER_ID = @@server_uuid",
            )
            .unwrap_or(None);
    }

    // SHOW REPLICA STATUS returns no rows on a non-replica.
    if let Ok(rows) = conn.query::<mysql::Row, _>("SHOW REPLICA STATUS") {
        if let Some(row) = rows.into_iter().next() {
            sample.replica_io_running = row
                .get::<String, _>("Replica_IO_Running")
                .is_some_and(|v| v.eq_ignore_ascii_case("Yes"));
            // NULL while the SQL thread is stopped.
            sample.replica_lag_secs = row
                .get::<Option<u64>, _>("Seconds_Behind_Source")
                .flatten();
        }
    }
    let semi_sync = show_like(conn, "SHOW GLOBAL VARIABLES LIKE 'rpl_semi_sync_replica_enabled'");
    sample.semi_sync_replica = semi_sync
        .values()
        .next()
        .is_some_and(|v| v.eq_ignore_ascii_case("ON"));

    Ok(sample)
}

/// System flags surface as ints or as ON/OFF strings depending on the
/// variable and server; accept both.
fn query_flag(conn: &mut Conn, query: &str) -> bool {
    conn.query_first::<mysql::Value, _>(query)
        .ok()
        .flatten()
        .is_some_and(|v| match v {
            mysql::Value::Int(n) => n != 0,
            mysql::Value::UInt(n) => n != 0,
            mysql::Value::Bytes(b) => b.as_slice() == b"1" || b.eq_ignore_ascii_case(b"ON"),
            _ => false,
        })
}

fn show_like(conn: &mut Conn, query: &str) -> HashMap<String, String> {
    conn.query::<(String, String), _>(query)
        .map(|rows| {
            rows.into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect()
        })
        .unwrap_or_default()
}

/// Probes and classifies the server's topology in one call.
pub fn probe_topology(conn: &mut Conn) -> Result<TopologyInfo> {
    let sample = collect_sample(conn)?;
    Ok(classify_topology(&sample))
}

// ---------------------------------------------------------------------------
// Pure classification
// ---------------------------------------------------------------------------

/// Classifies a raw sample into the topology snapshot the engine consumes.
pub fn classify_topology(sample: &TopologySample) -> TopologyInfo {
    let mut info = TopologyInfo::standalone();
    info.read_only = sample.read_only;

    if sample.aurora_version.is_some() {
        info.kind = if sample.innodb_read_only || sample.read_only {
            TopologyKind::AuroraReader
        } else {
            TopologyKind::AuroraWriter
        };
        info.is_primary = info.kind == TopologyKind::AuroraWriter;
        info.is_replica = info.kind == TopologyKind::AuroraReader;
        info.is_cloud_managed = true;
        info.cloud_provider = "aws-aurora".into();
        info.replica_lag_secs = sample.replica_lag_secs;
        return info;
    }

    if sample.wsrep_on {
        info.kind = TopologyKind::Galera;
        info.galera_cluster_size = sample.wsrep_cluster_size;
        info.galera_osu_method = sample
            .wsrep_osu_method
            .as_deref()
            .and_then(|m| match m.to_ascii_uppercase().as_str() {
                "TOI" => Some(OsuMethod::Toi),
                "RSU" => Some(OsuMethod::Rsu),
                _ => None,
            });
        info.galera_node_state = sample.wsrep_local_state_comment.clone();
        info.wsrep_max_ws_size = sample.wsrep_max_ws_size;
        info.flow_control_paused = sample.wsrep_flow_control_paused.unwrap_or(0.0);
        info.flow_control_paused_pct = format!("{:.1}%", info.flow_control_paused * 100.0);
        return info;
    }

    if sample.gr_group_name.is_some() {
        info.kind = TopologyKind::GroupReplication;
        info.gr_mode = sample.gr_single_primary_mode.map(|single| {
            if single {
                GroupReplicationMode::SinglePrimary
            } else {
                GroupReplicationMode::MultiPrimary
            }
        });
        info.gr_member_count = sample.gr_member_count;
        info.gr_member_role = sample.gr_member_role.clone();
        info.gr_transaction_limit = sample.gr_transaction_size_limit;
        info.is_primary = sample
            .gr_member_role
            .as_deref()
            .is_none_or(|r| r.eq_ignore_ascii_case("PRIMARY"));
        info.is_replica = !info.is_primary;
        return info;
    }

    if sample.replica_io_running || sample.replica_lag_secs.is_some() {
        info.kind = if sample.semi_sync_replica {
            TopologyKind::SemiSyncReplica
        } else {
            TopologyKind::AsyncReplica
        };
        info.is_primary = false;
        info.is_replica = true;
        info.replica_lag_secs = sample.replica_lag_secs;
    }

    // RDS leaves its mark on basedir even for otherwise-vanilla servers.
    if sample.basedir.contains("rdsdbbin") {
        info.is_cloud_managed = true;
        info.cloud_provider = "aws-rds".into();
    }

    info
}
