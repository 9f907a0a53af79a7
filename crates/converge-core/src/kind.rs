use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The resource types a manifest may declare.
///
/// Each kind is handled by a provider adapter; the engine itself never
/// looks inside a kind beyond using it as part of the lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    Subnet,
    InternetGateway,
    NatGateway,
    ElasticIp,
    RouteTable,
    Route,
    SecurityGroup,
    LaunchTemplate,
    AutoScalingGroup,
    ScalingPolicy,
    LoadBalancer,
    TargetGroup,
    Listener,
    Alarm,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 15] = [
        Self::Vpc,
        Self::Subnet,
        Self::InternetGateway,
        Self::NatGateway,
        Self::ElasticIp,
        Self::RouteTable,
        Self::Route,
        Self::SecurityGroup,
        Self::LaunchTemplate,
        Self::AutoScalingGroup,
        Self::ScalingPolicy,
        Self::LoadBalancer,
        Self::TargetGroup,
        Self::Listener,
        Self::Alarm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "internet_gateway",
            Self::NatGateway => "nat_gateway",
            Self::ElasticIp => "elastic_ip",
            Self::RouteTable => "route_table",
            Self::Route => "route",
            Self::SecurityGroup => "security_group",
            Self::LaunchTemplate => "launch_template",
            Self::AutoScalingGroup => "auto_scaling_group",
            Self::ScalingPolicy => "scaling_policy",
            Self::LoadBalancer => "load_balancer",
            Self::TargetGroup => "target_group",
            Self::Listener => "listener",
            Self::Alarm => "alarm",
        }
    }

    /// Short prefix used when a provider has to mint an id for this kind,
    /// e.g. `nat` for `nat-0a1b2c`.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "igw",
            Self::NatGateway => "nat",
            Self::ElasticIp => "eipalloc",
            Self::RouteTable => "rtb",
            Self::Route => "route",
            Self::SecurityGroup => "sg",
            Self::LaunchTemplate => "lt",
            Self::AutoScalingGroup => "asg",
            Self::ScalingPolicy => "policy",
            Self::LoadBalancer => "alb",
            Self::TargetGroup => "tg",
            Self::Listener => "listener",
            Self::Alarm => "alarm",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}
