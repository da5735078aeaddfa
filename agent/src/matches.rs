// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Translates a steering rule into one or more OpenFlow matches.

use std::net::IpAddr;

use steering::{SteeringRuleRecord, ETHERTYPE_IPV4, ETHERTYPE_IPV6, PROTO_TCP, PROTO_UDP};

use crate::flow_table::FlowMatch;

/// Builds the matches for `rule` on the given `ofport`. A rule with no
/// `ethertype` fans out into one IPv4 and one IPv6 match, so unspecified
/// L2 traffic (ARP and similar) is never accidentally steered.
pub fn prepare_matches(rule: &SteeringRuleRecord, ofport: u32) -> Vec<FlowMatch> {
    let ethertypes: Vec<u16> = match rule.rule.ethertype {
        Some(et) => vec![et],
        None => vec![ETHERTYPE_IPV4, ETHERTYPE_IPV6],
    };

    ethertypes
        .into_iter()
        .map(|eth_type| build_match(rule, ofport, eth_type))
        .collect()
}

fn build_match(rule: &SteeringRuleRecord, ofport: u32, eth_type: u16) -> FlowMatch {
    let mut m = FlowMatch {
        in_port: ofport,
        eth_type,
        ipv4_src: None,
        ipv4_dst: None,
        ipv6_src: None,
        ipv6_dst: None,
        tcp_src: None,
        tcp_dst: None,
        udp_src: None,
        udp_dst: None,
    };

    if eth_type == ETHERTYPE_IPV4 {
        m.ipv4_src = rule.rule.src_ip.and_then(as_v4);
        m.ipv4_dst = rule.rule.dest_ip.and_then(as_v4);
    } else {
        m.ipv6_src = rule.rule.src_ip.and_then(as_v6);
        m.ipv6_dst = rule.rule.dest_ip.and_then(as_v6);
    }

    match rule.rule.protocol {
        Some(PROTO_TCP) => {
            m.tcp_src = rule.rule.src_port;
            m.tcp_dst = rule.rule.dest_port;
        }
        Some(PROTO_UDP) => {
            m.udp_src = rule.rule.src_port;
            m.udp_dst = rule.rule.dest_port;
        }
        _ => {}
    }

    m
}

fn as_v4(ip: IpAddr) -> Option<std::net::Ipv4Addr> {
    match ip {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    }
}

fn as_v6(ip: IpAddr) -> Option<std::net::Ipv6Addr> {
    match ip {
        IpAddr::V6(v6) => Some(v6),
        IpAddr::V4(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_api::NeutronPortId;
    use steering::SteeringRule;
    use id::Id;

    fn rule_with(ethertype: Option<u16>) -> SteeringRuleRecord {
        SteeringRuleRecord {
            rule: SteeringRule {
                id: Id::new(),
                project_id: "default".into(),
                src_neutron_port: NeutronPortId("p0".into()),
                dest_neutron_port: Some(NeutronPortId("p1".into())),
                src_ip: Some("10.0.0.1".parse().unwrap()),
                dest_ip: Some("10.0.0.2".parse().unwrap()),
                src_port: Some(1234),
                dest_port: Some(80),
                ethertype,
                protocol: Some(PROTO_TCP),
            },
            overwrite_mac: Some("fa:16:3e:00:00:01".into()),
        }
    }

    #[test]
    fn null_ethertype_expands_to_two_matches_with_identical_remaining_fields() {
        let rule = rule_with(None);
        let matches = prepare_matches(&rule, 7);
        assert_eq!(matches.len(), 2);
        let eth_types: Vec<u16> = matches.iter().map(|m| m.eth_type).collect();
        assert!(eth_types.contains(&ETHERTYPE_IPV4));
        assert!(eth_types.contains(&ETHERTYPE_IPV6));
        for m in &matches {
            assert_eq!(m.in_port, 7);
            assert_eq!(m.tcp_src, Some(1234));
            assert_eq!(m.tcp_dst, Some(80));
        }
    }

    #[test]
    fn ipv4_rule_only_sets_ipv4_fields() {
        let rule = rule_with(Some(ETHERTYPE_IPV4));
        let matches = prepare_matches(&rule, 3);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].ipv4_src.is_some());
        assert!(matches[0].ipv6_src.is_none());
    }

    #[test]
    fn udp_rule_sets_udp_fields_not_tcp() {
        let mut rule = rule_with(Some(ETHERTYPE_IPV4));
        rule.rule.protocol = Some(PROTO_UDP);
        let matches = prepare_matches(&rule, 3);
        assert!(matches[0].udp_src.is_some());
        assert!(matches[0].tcp_src.is_none());
    }
}
