//! Client-side vtund.conf rendering

use std::net::Ipv4Addr;
use std::path::PathBuf;

use meshnode_proto::{RepositoryError, Tunnel, TunnelRepository};
use thiserror::Error;
use tracing::debug;

/// First virtual interface number handed out
const INTERFACE_BASE: u32 = 100;

const CONF_HEADER: &str = r#"# This file is generated by the mesh node manager.
# Do not edit this file directly.
options {
    timeout 60;
    syslog daemon;
    ip /sbin/ip;
    firewall /sbin/iptables;
}"#;

const TUNNEL_SECTION: &str = r#"${NAME}-${DASHED_NET} {
    passwd ${PWD};
    device tun${TUN};
    persist yes;
    up {
        ip "addr add ${IP_PLUS_1} peer ${IP_PLUS_2} dev %%";
        ip "link set dev %% up";
        ip "route add ${NET}/30 via ${IP_PLUS_1} mtu 1450";
        firewall "-A FORWARD -i %% -o eth0 -d 10.0.0.0/8 -j ACCEPT";
        firewall "-A FORWARD -i %% -o eth0 -j REJECT";
        firewall "-A FORWARD -i eth0 -o %% -s 10.0.0.0/8 -j ACCEPT";
        firewall "-A FORWARD -i eth0 -o %% -j REJECT";
        ${EXTRA_UP_RULES}
    };
    down {
        ${EXTRA_DOWN_RULES}
        firewall "-D FORWARD -i %% -o eth0 -d 10.0.0.0/8 -j ACCEPT";
        firewall "-D FORWARD -i eth0 -o %% -s 10.0.0.0/8 -j ACCEPT";
        firewall "-D FORWARD -i %% -o eth0 -j REJECT";
        firewall "-D FORWARD -i eth0 -o %% -j REJECT";
        ip "route del ${NET}/30 via ${IP_PLUS_1}";
        ip "link set dev %% down";
        ip "addr del ${IP_PLUS_2} dev %%";
    };
}"#;

const WIREGUARD_UP_RULES: &str = r#"firewall "-A FORWARD -i wg0 -o %% -m conntrack --ctstate ESTABLISHED,RELATED -j ACCEPT";
        firewall "-A FORWARD -i %% -o wg0 -m conntrack --ctstate ESTABLISHED,RELATED -j ACCEPT";
        firewall "-A FORWARD -i wg0 -o %% -j ACCEPT";
        firewall "-A FORWARD -i %% -o wg0 -j ACCEPT";
        ip "route add ${WG_TAP_PLUS_1}/32 dev wg0";"#;

const WIREGUARD_DOWN_RULES: &str = r#"firewall "-D FORWARD -i wg0 -o %% -j ACCEPT";
        firewall "-D FORWARD -i %% -o wg0 -j ACCEPT";
        firewall "-D FORWARD -i wg0 -o %% -m conntrack --ctstate ESTABLISHED,RELATED -j ACCEPT";
        firewall "-D FORWARD -i %% -o wg0 -m conntrack --ctstate ESTABLISHED,RELATED -j ACCEPT";"#;

/// Errors surfaced by config generation
#[derive(Debug, Error)]
pub enum VtunError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Tunnel {hostname} has an invalid subnet address: {ip}")]
    InvalidSubnet { hostname: String, ip: String },

    #[error("Rendered an empty config for {name}")]
    EmptyRender { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Generator settings
#[derive(Debug, Clone)]
pub struct VtunClientConfig {
    /// This node's name, used as the tunnel section prefix
    pub server_name: String,
    /// WireGuard overlay base address; when set, overlay firewall and
    /// routing rules are inserted into every document
    pub wireguard_tap_address: Option<Ipv4Addr>,
    /// Directory the vtund-*.conf files are written to
    pub output_dir: PathBuf,
}

impl VtunClientConfig {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            wireguard_tap_address: None,
            output_dir: PathBuf::from("/etc"),
        }
    }
}

struct TunnelGroup {
    tunnel: Tunnel,
    interface_number: u32,
}

/// Render and write one config file per distinct (hostname, subnet)
/// client tunnel group. The first render or write failure aborts the
/// remaining files.
pub async fn generate_and_save(
    config: &VtunClientConfig,
    repository: &dyn TunnelRepository,
) -> Result<(), VtunError> {
    let tunnels = repository.list_client_tunnels().await?;

    for (name, group) in group_tunnels(&tunnels) {
        let conf = generate_client(config, &group)?;
        if conf.trim().is_empty() {
            return Err(VtunError::EmptyRender { name });
        }

        let path = config.output_dir.join(format!("vtund-{name}.conf"));
        debug!(path = %path.display(), "writing vtun client config");
        std::fs::write(&path, conf)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))?;
        }
    }

    Ok(())
}

/// Group client tunnels by (hostname, dashed subnet), preserving
/// repository order. The first record wins a group; interface numbers
/// start at [`INTERFACE_BASE`] and advance once per distinct group.
fn group_tunnels(tunnels: &[Tunnel]) -> Vec<(String, TunnelGroup)> {
    let mut groups: Vec<(String, TunnelGroup)> = Vec::new();
    let mut next_interface = INTERFACE_BASE;

    for tunnel in tunnels {
        let key = format!(
            "{}-{}",
            tunnel.hostname.replace(':', "-"),
            tunnel.dashed_subnet()
        );
        if groups.iter().any(|(existing, _)| *existing == key) {
            continue;
        }
        groups.push((
            key,
            TunnelGroup {
                tunnel: tunnel.clone(),
                interface_number: next_interface,
            },
        ));
        next_interface += 1;
    }

    groups
}

fn generate_client(config: &VtunClientConfig, group: &TunnelGroup) -> Result<String, VtunError> {
    let tunnel = &group.tunnel;
    let subnet = tunnel.subnet().ok_or_else(|| VtunError::InvalidSubnet {
        hostname: tunnel.hostname.clone(),
        ip: tunnel.ip.clone(),
    })?;
    let base_plus_1 = offset_last_octet(subnet, 1);
    let base_plus_2 = offset_last_octet(subnet, 2);

    let (extra_up, extra_down) = match config.wireguard_tap_address {
        Some(tap) => {
            let tap_plus_1 = offset_last_octet(tap, 1).to_string();
            (
                shell_replace(WIREGUARD_UP_RULES, &[("WG_TAP_PLUS_1", &tap_plus_1)]),
                shell_replace(WIREGUARD_DOWN_RULES, &[("WG_TAP_PLUS_1", &tap_plus_1)]),
            )
        }
        None => (String::new(), String::new()),
    };

    let section = shell_replace(
        TUNNEL_SECTION,
        &[
            ("NAME", &config.server_name),
            ("DASHED_NET", &tunnel.dashed_subnet()),
            ("PWD", tunnel.password.trim()),
            ("TUN", &group.interface_number.to_string()),
            ("IP_PLUS_1", &base_plus_1.to_string()),
            ("IP_PLUS_2", &base_plus_2.to_string()),
            ("NET", &tunnel.ip),
            ("EXTRA_UP_RULES", &extra_up),
            ("EXTRA_DOWN_RULES", &extra_down),
        ],
    );

    Ok(format!("{CONF_HEADER}\n\n{section}"))
}

fn offset_last_octet(addr: Ipv4Addr, offset: u8) -> Ipv4Addr {
    let octets = addr.octets();
    Ipv4Addr::new(
        octets[0],
        octets[1],
        octets[2],
        octets[3].wrapping_add(offset),
    )
}

/// Substitute `${KEY}` placeholders in a template
fn shell_replace(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("${{{key}}}"), value)
    })
}
