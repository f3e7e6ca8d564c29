//! Candidate port sets for a scan

use crate::config::{PortMode, ScanConfig};
use crate::error::ScanError;
use std::iter::Copied;
use std::ops::RangeInclusive;
use std::slice;
use std::str::FromStr;

/// Lowest probeable TCP port
pub const MIN_PORT: u16 = 1;

/// Highest probeable TCP port
pub const MAX_PORT: u16 = u16::MAX;

/// Named port lists that can seed `common_ports`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortListType {
    Common,
    Web,
    Database,
    Mail,
    Development,
}

impl PortListType {
    pub const ALL: [PortListType; 5] = [
        PortListType::Common,
        PortListType::Web,
        PortListType::Database,
        PortListType::Mail,
        PortListType::Development,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PortListType::Common => "common",
            PortListType::Web => "web",
            PortListType::Database => "database",
            PortListType::Mail => "mail",
            PortListType::Development => "development",
        }
    }
}

impl FromStr for PortListType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PortListType::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ScanError::ConfigError(format!("Unknown port list '{}'", s)))
    }
}

/// Get the ports of a named list
pub fn get_port_list(list_type: PortListType) -> Vec<u16> {
    match list_type {
        PortListType::Common => get_common_service_ports(),
        PortListType::Web => get_web_ports(),
        PortListType::Database => get_database_ports(),
        PortListType::Mail => get_mail_ports(),
        PortListType::Development => get_development_ports(),
    }
}

/// Get common service ports
pub fn get_common_service_ports() -> Vec<u16> {
    vec![
        21, 22, 23,              // FTP, SSH, Telnet
        25, 53, 80, 110, 143,    // Mail, DNS, HTTP, POP3, IMAP
        443, 993, 995,           // HTTPS, IMAPS, POP3S
        135, 139, 445,           // Windows networking
        389, 636,                // LDAP, LDAPS
        1433, 3306, 5432,        // Databases
        3389,                    // RDP
        5900, 5901,              // VNC
        6379,                    // Redis
        8080, 8443,              // Alternative web
    ]
}

/// Get web server ports
pub fn get_web_ports() -> Vec<u16> {
    vec![
        80, 443,                 // HTTP, HTTPS
        8000, 8008, 8080, 8081,  // Alternative HTTP
        8443, 8888,              // Alternative HTTPS, proxies
        3000, 5000, 9000,        // App servers
    ]
}

/// Get database ports
pub fn get_database_ports() -> Vec<u16> {
    vec![
        3306,        // MySQL
        5432,        // PostgreSQL
        1433, 1434,  // SQL Server
        1521,        // Oracle
        27017,       // MongoDB
        6379,        // Redis
        11211,       // Memcached
        9200, 9300,  // Elasticsearch
        5984,        // CouchDB
        8086,        // InfluxDB
        9042,        // Cassandra
    ]
}

/// Get mail service ports
pub fn get_mail_ports() -> Vec<u16> {
    vec![
        25,          // SMTP
        110,         // POP3
        143,         // IMAP
        993,         // IMAPS
        995,         // POP3S
        587,         // SMTP Submission
        465,         // SMTPS
    ]
}

/// Get development/testing ports
pub fn get_development_ports() -> Vec<u16> {
    vec![
        3000, 3001,  // React, Next.js
        4000, 4200,  // Node.js apps, Angular
        5000, 5173,  // Flask, Vite
        8000, 8080,  // Django, general web
        8089,        // Local services
        8888,        // Jupyter
        9090,        // CI/CD tools
    ]
}

/// The ports probed on every enumerated address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSet {
    /// 1..=65535, ascending
    Full,
    /// A caller-supplied list, kept as given
    List(Vec<u16>),
}

impl PortSet {
    pub fn from_config(config: &ScanConfig) -> Self {
        match config.port_mode {
            PortMode::Full => PortSet::Full,
            PortMode::Common => PortSet::List(config.common_ports.clone()),
        }
    }

    pub fn iter(&self) -> PortIter<'_> {
        match self {
            PortSet::Full => PortIter::Range(MIN_PORT..=MAX_PORT),
            PortSet::List(ports) => PortIter::List(ports.iter().copied()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PortSet::Full => usize::from(MAX_PORT - MIN_PORT) + 1,
            PortSet::List(ports) => ports.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> IntoIterator for &'a PortSet {
    type Item = u16;
    type IntoIter = PortIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`PortSet`]
#[derive(Debug, Clone)]
pub enum PortIter<'a> {
    Range(RangeInclusive<u16>),
    List(Copied<slice::Iter<'a, u16>>),
}

impl Iterator for PortIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            PortIter::Range(range) => range.next(),
            PortIter::List(ports) => ports.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            PortIter::Range(range) => range.size_hint(),
            PortIter::List(ports) => ports.size_hint(),
        }
    }
}
