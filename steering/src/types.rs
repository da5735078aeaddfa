// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::net::IpAddr;

use id::Id;
use net_api::NeutronPortId;
use serde::{Deserialize, Serialize};

/// TCP, per the steering-rule `protocol` field.
pub const PROTO_TCP: u8 = 6;
/// UDP, per the steering-rule `protocol` field.
pub const PROTO_UDP: u8 = 17;

/// IPv4 ethertype, as stamped onto steering rules for IPv4 PVNs.
pub const ETHERTYPE_IPV4: u16 = 0x0800;
/// IPv6 ethertype, as stamped onto steering rules for IPv6 PVNs.
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

pub type SteeringRuleId = Id<SteeringRule>;

/// A persisted port-steering rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteeringRule {
    pub id: SteeringRuleId,
    pub project_id: String,
    pub src_neutron_port: NeutronPortId,
    pub dest_neutron_port: Option<NeutronPortId>,
    pub src_ip: Option<IpAddr>,
    pub dest_ip: Option<IpAddr>,
    pub src_port: Option<u16>,
    pub dest_port: Option<u16>,
    pub ethertype: Option<u16>,
    pub protocol: Option<u8>,
}

/// Fields supplied by a caller creating a new rule; `id` is assigned by the
/// store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSteeringRule {
    pub project_id: String,
    pub src_neutron_port: NeutronPortId,
    pub dest_neutron_port: Option<NeutronPortId>,
    pub src_ip: Option<IpAddr>,
    pub dest_ip: Option<IpAddr>,
    pub src_port: Option<u16>,
    pub dest_port: Option<u16>,
    pub ethertype: Option<u16>,
    pub protocol: Option<u8>,
}

/// A rule enriched with the destination port's MAC, as published on the bus
/// and returned from `get_port_steering`. `overwrite_mac` is `None` for a
/// bare-port DROP rule (no `dest_neutron_port`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteeringRuleRecord {
    #[serde(flatten)]
    pub rule: SteeringRule,
    pub overwrite_mac: Option<String>,
}

/// A query-string filter value, after "null"/"none" literal coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue<T> {
    Value(T),
    IsNull,
}

impl FilterValue<NeutronPortId> {
    /// Coerces the case-insensitive literals `"null"`/`"none"` to the null
    /// sentinel; anything else is taken as a literal port id.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("none") {
            FilterValue::IsNull
        } else {
            FilterValue::Value(NeutronPortId(raw.to_string()))
        }
    }
}

/// Filters accepted by `SteeringStore::list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub project_id: Option<String>,
    pub src_neutron_port: Option<FilterValue<NeutronPortId>>,
    pub dest_neutron_port: Option<FilterValue<NeutronPortId>>,
}

impl ListFilters {
    pub fn matches(&self, rule: &SteeringRule) -> bool {
        if let Some(project_id) = &self.project_id {
            if &rule.project_id != project_id {
                return false;
            }
        }
        if let Some(filter) = &self.src_neutron_port {
            match filter {
                FilterValue::IsNull => return false, // src_neutron_port is never null
                FilterValue::Value(id) => {
                    if &rule.src_neutron_port != id {
                        return false;
                    }
                }
            }
        }
        if let Some(filter) = &self.dest_neutron_port {
            match filter {
                FilterValue::IsNull => {
                    if rule.dest_neutron_port.is_some() {
                        return false;
                    }
                }
                FilterValue::Value(id) => {
                    if rule.dest_neutron_port.as_ref() != Some(id) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Pagination parameters for `SteeringStore::list`.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub limit: Option<usize>,
    pub marker: Option<SteeringRuleId>,
    pub page_reverse: bool,
}
