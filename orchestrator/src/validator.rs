// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Schema and semantic validation of a submitted PVN description, including
//! the per-chain DAG check.
//!
//! Validation runs in two passes, mirroring the upstream `jsonschema.validate`
//! followed by hand-written semantic checks: [`RawDescription::try_into`]
//! does the structural pass (shapes, required fields, numeric ranges) and
//! rejects malformed input before any semantic reasoning runs; [`validate`]
//! then runs the free-standing semantic checks over the parsed
//! [`Description`].

use std::collections::HashSet;

use net_api::AppSpec;
use serde::Deserialize;
use thiserror::Error;

/// The end-user (ingress) sentinel app index.
pub const END_USER_INDEX: i64 = -1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("validation failed: {0}")]
    Malformed(String),
    #[error("apps must be a non-empty array")]
    EmptyApps,
    #[error("chains must be a non-empty array")]
    EmptyChains,
    #[error("chain with origin {0} has no edges")]
    EmptyEdges(i64),
    #[error("source_port/destination_port requires protocol in {{6, 17}}")]
    PortWithoutProtocol,
    #[error("chain origins must be pairwise distinct, {0} appears more than once")]
    DuplicateChainOrigin(i64),
    #[error("index {0} is out of range")]
    IndexOutOfRange(i64),
    #[error("destination {0} cannot be the egress gateway")]
    DestinationIsEgressGateway(i64),
    #[error("chain with origin at the egress gateway must specify destination on every edge")]
    EgressChainEdgeMissingDestination,
    #[error("Must have an app chain with an origin at the end user")]
    MissingEndUserChain,
    #[error("chain with origin {0} is not a DAG.")]
    NotADag(i64),
    #[error("chain with origin {0} has an edge never reached from its origin")]
    OrphanEdge(i64),
}

/// Raw JSON shape of a submitted app entry: either a bare image name or an
/// object with an image and optional args.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawApp {
    Bare(String),
    Full { image: String, #[serde(default)] args: Vec<String> },
}

#[derive(Debug, Deserialize)]
pub struct RawEdge {
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub destination: Option<i64>,
    #[serde(default)]
    pub protocol: Option<u8>,
    #[serde(default)]
    pub source_port: Option<u16>,
    #[serde(default)]
    pub destination_port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct RawChain {
    pub origin: i64,
    pub edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
pub struct RawDescription {
    apps: Vec<RawApp>,
    chains: Vec<RawChain>,
}

/// A single chain edge: `from -> to`, optionally qualified by `destination`
/// and an L3/L4 match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: i64,
    pub to: i64,
    pub destination: Option<i64>,
    pub protocol: Option<u8>,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub origin: i64,
    pub edges: Vec<Edge>,
}

/// A structurally valid PVN description, ready for semantic validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub apps: Vec<AppSpec>,
    pub chains: Vec<Chain>,
}

impl TryFrom<RawDescription> for Description {
    type Error = ValidationError;

    fn try_from(raw: RawDescription) -> Result<Self, Self::Error> {
        if raw.apps.is_empty() {
            return Err(ValidationError::EmptyApps);
        }
        if raw.chains.is_empty() {
            return Err(ValidationError::EmptyChains);
        }
        let apps: Vec<AppSpec> = raw
            .apps
            .into_iter()
            .map(|a| match a {
                RawApp::Bare(image) => AppSpec { image, args: Vec::new() },
                RawApp::Full { image, args } => AppSpec { image, args },
            })
            .collect();

        let mut chains = Vec::with_capacity(raw.chains.len());
        for chain in raw.chains {
            if chain.edges.is_empty() {
                return Err(ValidationError::EmptyEdges(chain.origin));
            }
            let mut edges = Vec::with_capacity(chain.edges.len());
            for e in chain.edges {
                if e.source_port.is_some() || e.destination_port.is_some() {
                    match e.protocol {
                        Some(6) | Some(17) => {}
                        _ => return Err(ValidationError::PortWithoutProtocol),
                    }
                }
                edges.push(Edge {
                    from: e.from,
                    to: e.to,
                    destination: e.destination,
                    protocol: e.protocol,
                    source_port: e.source_port,
                    destination_port: e.destination_port,
                });
            }
            chains.push(Chain { origin: chain.origin, edges });
        }
        Ok(Description { apps, chains })
    }
}

/// Runs every semantic check over an already structurally valid description.
pub fn validate(description: &Description) -> Result<(), ValidationError> {
    let max_app_index = description.apps.len() as i64;

    check_distinct_origins(description)?;
    check_index_bounds(description, max_app_index)?;
    check_egress_chains_specify_destination(description, max_app_index)?;
    check_end_user_chain_present(description)?;
    for chain in &description.chains {
        check_dag(chain)?;
    }
    Ok(())
}

fn check_distinct_origins(description: &Description) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for chain in &description.chains {
        if !seen.insert(chain.origin) {
            return Err(ValidationError::DuplicateChainOrigin(chain.origin));
        }
    }
    Ok(())
}

fn check_index_bounds(description: &Description, max_app_index: i64) -> Result<(), ValidationError> {
    for chain in &description.chains {
        check_index_in_from_to_range(chain.origin, max_app_index)?;
        for edge in &chain.edges {
            check_index_in_from_to_range(edge.from, max_app_index)?;
            check_index_in_from_to_range(edge.to, max_app_index)?;
            if let Some(dest) = edge.destination {
                if dest < END_USER_INDEX || dest > max_app_index {
                    return Err(ValidationError::IndexOutOfRange(dest));
                }
                if dest == max_app_index {
                    return Err(ValidationError::DestinationIsEgressGateway(dest));
                }
            }
        }
    }
    Ok(())
}

fn check_index_in_from_to_range(index: i64, max_app_index: i64) -> Result<(), ValidationError> {
    if index < END_USER_INDEX || index > max_app_index {
        return Err(ValidationError::IndexOutOfRange(index));
    }
    Ok(())
}

fn check_egress_chains_specify_destination(
    description: &Description,
    max_app_index: i64,
) -> Result<(), ValidationError> {
    for chain in &description.chains {
        if chain.origin == max_app_index {
            for edge in &chain.edges {
                if edge.destination.is_none() {
                    return Err(ValidationError::EgressChainEdgeMissingDestination);
                }
            }
        }
    }
    Ok(())
}

fn check_end_user_chain_present(description: &Description) -> Result<(), ValidationError> {
    if description.chains.iter().filter(|c| c.origin == END_USER_INDEX).count() != 1 {
        return Err(ValidationError::MissingEndUserChain);
    }
    Ok(())
}

/// Depth-first walk from `chain.origin`, carrying a visited-nodes set copied
/// per branch so siblings cannot see each other's visits (diamonds allowed
/// across siblings; a node revisited along a single path is a cycle).
/// Every listed edge must be visited at least once; an edge whose `from` is
/// never reached is an orphan.
fn check_dag(chain: &Chain) -> Result<(), ValidationError> {
    let mut visited_edges = vec![false; chain.edges.len()];
    walk(chain.origin, &HashSet::from([chain.origin]), chain, &mut visited_edges)?;
    if visited_edges.iter().any(|v| !v) {
        return Err(ValidationError::OrphanEdge(chain.origin));
    }
    Ok(())
}

fn walk(
    node: i64,
    visited_path: &HashSet<i64>,
    chain: &Chain,
    visited_edges: &mut [bool],
) -> Result<(), ValidationError> {
    for (i, edge) in chain.edges.iter().enumerate() {
        if edge.from != node {
            continue;
        }
        visited_edges[i] = true;
        if visited_path.contains(&edge.to) {
            return Err(ValidationError::NotADag(chain.origin));
        }
        let mut next_visited = visited_path.clone();
        next_visited.insert(edge.to);
        walk(edge.to, &next_visited, chain, visited_edges)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> Description {
        let raw: RawDescription = serde_json::from_str(json).unwrap();
        Description::try_from(raw).unwrap()
    }

    #[test]
    fn simple_chain_validates() {
        let description = parse(
            r#"{"apps":["u"],"chains":[{"origin":-1,"edges":[{"from":-1,"to":0},{"from":0,"to":1}]}]}"#,
        );
        assert!(validate(&description).is_ok());
    }

    #[test]
    fn missing_end_user_chain_is_rejected() {
        let description = parse(r#"{"apps":["u"],"chains":[{"origin":0,"edges":[{"from":0,"to":1}]}]}"#);
        assert_eq!(validate(&description), Err(ValidationError::MissingEndUserChain));
    }

    #[test]
    fn non_dag_is_rejected() {
        let description = parse(
            r#"{"apps":["u","v"],"chains":[{"origin":-1,"edges":[{"from":-1,"to":0},{"from":0,"to":1},{"from":1,"to":0}]}]}"#,
        );
        assert_eq!(validate(&description), Err(ValidationError::NotADag(-1)));
    }

    #[test]
    fn diamond_topology_across_siblings_is_allowed() {
        // origin -1 -> 0, origin -1 -> 1, both 0 and 1 -> 2 (diamond, not a cycle)
        let description = parse(
            r#"{"apps":["a","b","c"],"chains":[{"origin":-1,"edges":[
                {"from":-1,"to":0},{"from":-1,"to":1},{"from":0,"to":2},{"from":1,"to":2}
            ]}]}"#,
        );
        assert!(validate(&description).is_ok());
    }

    #[test]
    fn destination_cannot_be_egress_gateway() {
        let description = parse(
            r#"{"apps":["u"],"chains":[{"origin":-1,"edges":[{"from":-1,"to":0,"destination":1}]}]}"#,
        );
        assert_eq!(
            validate(&description),
            Err(ValidationError::DestinationIsEgressGateway(1))
        );
    }

    #[test]
    fn egress_chain_requires_destination_on_every_edge() {
        let description = parse(
            r#"{"apps":["u"],"chains":[
                {"origin":-1,"edges":[{"from":-1,"to":0}]},
                {"origin":1,"edges":[{"from":1,"to":0}]}
            ]}"#,
        );
        assert_eq!(
            validate(&description),
            Err(ValidationError::EgressChainEdgeMissingDestination)
        );
    }

    #[test]
    fn port_without_protocol_is_rejected_at_schema_layer() {
        let raw: RawDescription = serde_json::from_str(
            r#"{"apps":["u"],"chains":[{"origin":-1,"edges":[{"from":-1,"to":0,"source_port":80}]}]}"#,
        )
        .unwrap();
        assert_eq!(Description::try_from(raw), Err(ValidationError::PortWithoutProtocol));
    }

    #[test]
    fn duplicate_origin_is_rejected() {
        let description = parse(
            r#"{"apps":["u"],"chains":[
                {"origin":-1,"edges":[{"from":-1,"to":0}]},
                {"origin":-1,"edges":[{"from":-1,"to":0}]}
            ]}"#,
        );
        assert_eq!(validate(&description), Err(ValidationError::DuplicateChainOrigin(-1)));
    }
}
