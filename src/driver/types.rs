//! @acp:module "Driver Types"
//! @acp:summary "Cloud resource records exchanged with drivers"
//! @acp:domain cloud
//! @acp:layer model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A region a driver can operate in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Display name, e.g. "South China (Guangzhou)"
    pub name: String,
    /// Region identifier, e.g. "ap-guangzhou"
    pub region: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub china_mainland: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub zone: String,
}

/// Lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Pending,
    LaunchFailed,
    #[default]
    Running,
    Stopped,
    Starting,
    Stopping,
    Rebooting,
    Shutdown,
    Terminating,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InstanceState::Pending => "PENDING",
            InstanceState::LaunchFailed => "LAUNCH_FAILED",
            InstanceState::Running => "RUNNING",
            InstanceState::Stopped => "STOPPED",
            InstanceState::Starting => "STARTING",
            InstanceState::Stopping => "STOPPING",
            InstanceState::Rebooting => "REBOOTING",
            InstanceState::Shutdown => "SHUTDOWN",
            InstanceState::Terminating => "TERMINATING",
        };
        f.write_str(text)
    }
}

/// Full description of one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub cpu: u32,
    /// Memory in GB
    #[serde(default)]
    pub memory: u32,
    #[serde(default)]
    pub os_name: String,
    #[serde(default)]
    pub platform: String,
    /// System disk in GB
    #[serde(default)]
    pub disk: u32,
    #[serde(default)]
    pub public_ip: String,
    #[serde(default)]
    pub private_ip: String,
    /// Bandwidth in Mbit/s
    #[serde(default)]
    pub bandwidth: u32,
    #[serde(default)]
    pub state: InstanceState,
    #[serde(default = "Utc::now")]
    pub created_time: DateTime<Utc>,
    #[serde(default)]
    pub expired_time: Option<DateTime<Utc>>,
}

/// Monthly traffic package usage, in bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficPackage {
    pub instance_id: String,
    pub used: u64,
    pub total: u64,
    pub remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotState {
    #[default]
    Normal,
    Creating,
    Rollbacking,
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SnapshotState::Normal => "NORMAL",
            SnapshotState::Creating => "CREATING",
            SnapshotState::Rollbacking => "ROLLBACKING",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    /// Instance the snapshot was taken from
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub state: SnapshotState,
    /// Creation progress, 0..=100
    #[serde(default)]
    pub percent: u8,
    #[serde(default = "Utc::now")]
    pub created_time: DateTime<Utc>,
}

/// Operating system family filter for blueprint listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformType {
    #[default]
    All,
    LinuxUnix,
    Windows,
}

impl FromStr for PlatformType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(PlatformType::All),
            "linux" | "linux_unix" => Ok(PlatformType::LinuxUnix),
            "win" | "window" | "windows" => Ok(PlatformType::Windows),
            other => Err(format!("unknown platform '{}' (expected all, linux, win)", other)),
        }
    }
}

/// Blueprint (image) category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlueprintType {
    #[default]
    All,
    AppOs,
    PureOs,
    Private,
    Shared,
}

impl FromStr for BlueprintType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(BlueprintType::All),
            "app" => Ok(BlueprintType::AppOs),
            "system" | "pure" => Ok(BlueprintType::PureOs),
            "private" => Ok(BlueprintType::Private),
            "shared" => Ok(BlueprintType::Shared),
            other => Err(format!(
                "unknown image type '{}' (expected all, app, system, private, shared)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub os_name: String,
    #[serde(default)]
    pub platform: PlatformType,
    #[serde(default, rename = "type")]
    pub kind: BlueprintType,
    /// Minimum disk in GB
    #[serde(default)]
    pub required_disk_size: u32,
    /// Minimum memory in GB
    #[serde(default)]
    pub required_memory: u32,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleProtocol {
    Tcp,
    Udp,
    Icmp,
    All,
}

impl fmt::Display for RuleProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleProtocol::Tcp => "TCP",
            RuleProtocol::Udp => "UDP",
            RuleProtocol::Icmp => "ICMP",
            RuleProtocol::All => "ALL",
        })
    }
}

impl FromStr for RuleProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TCP" => Ok(RuleProtocol::Tcp),
            "UDP" => Ok(RuleProtocol::Udp),
            "ICMP" => Ok(RuleProtocol::Icmp),
            "ALL" => Ok(RuleProtocol::All),
            other => Err(format!("unknown protocol '{}' (expected TCP, UDP, ICMP, ALL)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    #[default]
    Accept,
    Drop,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleAction::Accept => "ACCEPT",
            RuleAction::Drop => "DROP",
        })
    }
}

impl FromStr for RuleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACCEPT" => Ok(RuleAction::Accept),
            "DROP" => Ok(RuleAction::Drop),
            other => Err(format!("unknown action '{}' (expected ACCEPT, DROP)", other)),
        }
    }
}

/// One inbound firewall rule of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub protocol: RuleProtocol,
    pub port: String,
    pub cidr_block: String,
    #[serde(default)]
    pub action: RuleAction,
    #[serde(default)]
    pub description: String,
}

impl FirewallRule {
    /// Two rules address the same traffic when everything but the description matches
    pub fn same_traffic(&self, other: &FirewallRule) -> bool {
        self.protocol == other.protocol
            && self.port == other.port
            && self.cidr_block == other.cidr_block
            && self.action == other.action
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub associated_instance_ids: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_time: DateTime<Utc>,
    /// Only populated right after creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}
